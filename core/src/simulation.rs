//! Monte Carlo engine.
//!
//! EXECUTION ORDER (per request):
//!   1. Resolve worker count and master seed.
//!   2. Split the trials into one contiguous range per worker.
//!   3. Each worker runs its range with its own FastRng.
//!   4. Per-worker samples are concatenated in worker order.
//!
//! RULES:
//!   - A trial clones the caller's state and starts a fresh Collection.
//!   - Workers share only the immutable Banner.
//!   - Percentiles are computed after the merge, never per worker.

use crate::{
    banner::Banner,
    config::{PoolKind, SimConfig},
    error::{GachaError, GachaResult},
    rng::{FastRng, RngBank},
    state::{Collection, PullState},
    types::{Pulls, Returns},
};
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrialOutcome {
    pub pulls:   Pulls,
    pub returns: Returns,
}

/// Merged outcome of every trial of one request.
#[derive(Debug, Clone)]
pub struct SimulationSample {
    pub pulls:       Vec<Pulls>,
    /// Present only for pools that track duplicate returns.
    pub returns:     Option<Vec<Returns>>,
    pub master_seed: u64,
}

/// One full run: acquire `target_count` targets in sequence.
pub fn simulate_run(
    banner: &Banner,
    initial: &PullState,
    target_count: u32,
    up_full_copy: bool,
    rng: &mut FastRng,
) -> TrialOutcome {
    let mut state = initial.for_simulation();
    let mut collection = Collection::new();
    let mut outcome = TrialOutcome { pulls: 0, returns: 0.0 };
    for _ in 0..target_count {
        let (pulls, returns) = banner.pulls_for_one_target(&mut state, rng, &mut collection, up_full_copy);
        outcome.pulls += pulls;
        outcome.returns += returns;
    }
    outcome
}

pub struct SimEngine<'a> {
    banner: &'a Banner,
    config: &'a SimConfig,
}

impl<'a> SimEngine<'a> {
    pub fn new(banner: &'a Banner, config: &'a SimConfig) -> Self {
        Self { banner, config }
    }

    pub fn trial_count(&self) -> usize {
        self.config.trials_for(self.banner.config.kind)
    }

    pub fn run(&self, initial: &PullState, target_count: u32, up_full_copy: bool) -> GachaResult<SimulationSample> {
        if target_count == 0 {
            return Err(GachaError::InvalidTargetCount(target_count));
        }
        self.banner.check_state(initial)?;

        let trials = self.trial_count();
        let workers = self.config.worker_count().clamp(1, trials.max(1));
        let master_seed = self.config.seed.unwrap_or_else(rand::random);
        let bank = RngBank::new(master_seed, self.config.rng_buffer_len);

        log::info!(
            "{}: {trials} trials x {target_count} targets on {workers} workers (seed {master_seed:#x})",
            self.banner.key()
        );

        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("gacha-worker-{i}"))
            .build()
            .map_err(|e| anyhow::anyhow!("cannot build worker pool: {e}"))?;

        let per_worker = trials.div_ceil(workers);
        let chunks: Vec<Vec<TrialOutcome>> = pool.install(|| {
            (0..workers)
                .into_par_iter()
                .map(|worker| {
                    let start = worker * per_worker;
                    let end = (start + per_worker).min(trials);
                    let mut rng = bank.for_worker(worker as u64);
                    (start..end)
                        .map(|_| simulate_run(self.banner, initial, target_count, up_full_copy, &mut rng))
                        .collect()
                })
                .collect()
        });

        let outcomes: Vec<TrialOutcome> = chunks.into_iter().flatten().collect();
        let pulls = outcomes.iter().map(|o| o.pulls).collect();
        let returns = match self.banner.config.kind {
            PoolKind::Character => Some(outcomes.iter().map(|o| o.returns).collect()),
            PoolKind::Equipment => None,
        };

        Ok(SimulationSample {
            pulls,
            returns,
            master_seed: bank.master_seed(),
        })
    }
}
