//! Decoded request / response objects and the mode dispatcher.

use crate::{
    banner::Banner,
    config::{CounterRule, SimConfig},
    error::{GachaError, GachaResult},
    expectation,
    registry::{self, BannerRegistry},
    simulation::SimEngine,
    state::PullState,
    stats::{self, PercentileSummary},
    types::banner_key,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    #[default]
    Expectation,
    Distribution,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitialState {
    pub pity:              u32,
    pub is_guaranteed:     bool,
    #[serde(default)]
    pub fate_point:        Option<u8>,
    #[serde(default)]
    pub mingguang_counter: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    pub game:          String,
    pub pool:          String,
    #[serde(default)]
    pub mode:          Mode,
    pub target_count:  u32,
    pub initial_state: InitialState,
    #[serde(default, rename = "up4C6")]
    pub up4_c6:        bool,
    #[serde(default)]
    pub budget:        Option<f64>,
}

impl Request {
    pub fn key(&self) -> String {
        banner_key(&self.game, &self.pool)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionResponse {
    pub pulls:        PercentileSummary<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success_rate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub returns:      Option<PercentileSummary<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Response {
    Distribution(DistributionResponse),
    Expectation { mean: f64 },
}

/// Map the request's loose state fields onto the banner's own counter.
pub fn pull_state_for(banner: &Banner, initial: &InitialState) -> PullState {
    let key = banner.key();
    let (counter, ignored) = match banner.config.counter {
        CounterRule::FatePoint { .. } => (initial.fate_point, initial.mingguang_counter.map(|_| "mingguangCounter")),
        CounterRule::LossStreak { .. } => (initial.mingguang_counter, initial.fate_point.map(|_| "fatePoint")),
        CounterRule::None => (
            None,
            initial
                .fate_point
                .map(|_| "fatePoint")
                .or(initial.mingguang_counter.map(|_| "mingguangCounter")),
        ),
    };
    if let Some(field) = ignored {
        log::warn!("{key}: ignoring initialState.{field}, not used by this banner");
    }
    PullState::new(initial.pity, initial.is_guaranteed, counter.unwrap_or(0))
}

/// Run a request against the built-in registry.
pub fn run(request: &Request, config: &SimConfig) -> GachaResult<Response> {
    run_with(registry::global()?, request, config)
}

pub fn run_with(registry: &BannerRegistry, request: &Request, config: &SimConfig) -> GachaResult<Response> {
    if request.target_count == 0 {
        return Err(GachaError::InvalidTargetCount(request.target_count));
    }
    config.validate()?;
    let banner = registry.get(&request.key())?;
    let initial = pull_state_for(banner, &request.initial_state);
    banner.check_state(&initial)?;

    match request.mode {
        Mode::Expectation => {
            let mean = expectation::expected_pulls(banner, &initial, request.target_count)?;
            log::info!("{}: expectation mean={mean:.4}", banner.key());
            Ok(Response::Expectation { mean })
        }
        Mode::Distribution => {
            let sample = SimEngine::new(banner, config).run(&initial, request.target_count, request.up4_c6)?;
            let pulls = stats::summarize_pulls(&sample.pulls)
                .ok_or_else(|| GachaError::InvalidConfig("simulation produced no trials".into()))?;
            let success_rate = request.budget.map(|budget| stats::success_rate(&sample.pulls, budget));
            let returns = sample.returns.as_deref().and_then(stats::summarize_returns);
            log::info!(
                "{}: distribution mean={:.4} p50={} seed={:#x}",
                banner.key(),
                pulls.mean,
                pulls.p50,
                sample.master_seed
            );
            Ok(Response::Distribution(DistributionResponse {
                pulls,
                success_rate,
                returns,
            }))
        }
    }
}
