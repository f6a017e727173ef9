//! Banner probability model.
//!
//! RULE: One Banner per registry key. The matrix builder and the
//! single-pull simulator read the same rule functions below, so the
//! exact chain and the Monte Carlo walk cannot drift apart.
//!
//! State encoding (exact path): (pity, guaranteed, counter) with
//!   index = pity + hard_pity * (guaranteed + 2 * counter).
//! The secondary-tier fields of PullState are not part of the chain.

use crate::{
    config::{BannerConfig, TopPayout},
    error::{GachaError, GachaResult},
    markov::{self, ChainTables},
    rng::FastRng,
    state::{Collection, PullState},
    types::{Pulls, Returns, SECONDARY_PITY},
};
use std::sync::OnceLock;

/// One decoded chain state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainState {
    pub pity:       u32,
    pub guaranteed: bool,
    pub counter:    u8,
}

impl ChainState {
    pub fn zero(counter: u8) -> Self {
        Self { pity: 0, guaranteed: false, counter }
    }
}

impl From<&PullState> for ChainState {
    fn from(state: &PullState) -> Self {
        Self {
            pity:       state.pity,
            guaranteed: state.is_guaranteed,
            counter:    state.counter,
        }
    }
}

/// Bijection between chain states and `[0, len)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateSpace {
    pub hard_pity:      u32,
    pub counter_values: usize,
}

impl StateSpace {
    pub fn len(&self) -> usize {
        self.hard_pity as usize * 2 * self.counter_values
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn index(&self, state: ChainState) -> usize {
        let pity_len = self.hard_pity as usize;
        state.pity as usize + pity_len * (usize::from(state.guaranteed) + 2 * usize::from(state.counter))
    }

    pub fn decode(&self, index: usize) -> ChainState {
        let pity_len = self.hard_pity as usize;
        let rest = index / pity_len;
        ChainState {
            pity:       (index % pity_len) as u32,
            guaranteed: rest % 2 == 1,
            counter:    (rest / 2) as u8,
        }
    }

    pub fn contains(&self, state: ChainState) -> bool {
        state.pity < self.hard_pity && usize::from(state.counter) < self.counter_values
    }
}

/// Outgoing probability mass of one chain state for a single pull.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StateTransitions {
    /// No top drop: (next state index, probability).
    pub advance: Option<(usize, f64)>,
    /// Off-target top drop: (reset-to-loss state index, probability).
    pub loss:    Option<(usize, f64)>,
    /// Target won, absorbing: (counter value carried out, probability).
    pub win:     Option<(u8, f64)>,
}

impl StateTransitions {
    pub fn total(&self) -> f64 {
        self.advance.map_or(0.0, |(_, p)| p)
            + self.loss.map_or(0.0, |(_, p)| p)
            + self.win.map_or(0.0, |(_, p)| p)
    }
}

/// Result of one simulated pull.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PullOutcome {
    pub returns:    Returns,
    pub target_won: bool,
}

pub struct Banner {
    pub config: BannerConfig,
    space:      StateSpace,
    tables:     OnceLock<Result<ChainTables, String>>,
}

impl Banner {
    pub fn new(config: BannerConfig) -> GachaResult<Self> {
        config.validate()?;
        let space = StateSpace {
            hard_pity:      config.curve.hard_pity,
            counter_values: config.counter.cardinality(),
        };
        Ok(Self {
            config,
            space,
            tables: OnceLock::new(),
        })
    }

    pub fn key(&self) -> String {
        self.config.key()
    }

    pub fn state_space(&self) -> StateSpace {
        self.space
    }

    pub fn probability_of_top_rarity(&self, pity: u32) -> f64 {
        self.config.curve.probability(pity)
    }

    /// (pWin, pLose) for a top-rarity drop.
    pub fn win_lose_probability(&self, guaranteed: bool, counter: u8) -> (f64, f64) {
        let rule = &self.config.counter;
        if guaranteed || rule.forces_win(counter) {
            return (1.0, 0.0);
        }
        let bonus = rule.bonus_chance();
        let win = self.config.win_rate;
        (bonus + (1.0 - bonus) * win, (1.0 - bonus) * (1.0 - win))
    }

    pub fn state_to_index(&self, state: ChainState) -> usize {
        self.space.index(state)
    }

    pub fn index_to_state(&self, index: usize) -> ChainState {
        self.space.decode(index)
    }

    pub fn transitions(&self, index: usize) -> StateTransitions {
        let state = self.space.decode(index);
        let p5 = self.probability_of_top_rarity(state.pity);
        let (p_win, p_lose) = self.win_lose_probability(state.guaranteed, state.counter);
        let rule = &self.config.counter;

        let mut out = StateTransitions::default();
        if p5 < 1.0 {
            let next = ChainState { pity: state.pity + 1, ..state };
            out.advance = Some((self.space.index(next), 1.0 - p5));
        }
        if p5 > 0.0 && p_lose > 0.0 {
            let lost = ChainState {
                pity:       0,
                guaranteed: true,
                counter:    rule.after_loss(state.guaranteed, state.counter),
            };
            out.loss = Some((self.space.index(lost), p5 * p_lose));
        }
        if p5 > 0.0 && p_win > 0.0 {
            out.win = Some((rule.after_win(state.guaranteed, state.counter), p5 * p_win));
        }
        out
    }

    /// True when the counter survives into the next target, so later targets
    /// need the absorption distribution instead of the zero state.
    pub fn has_carryover(&self) -> bool {
        self.config.counter.carries_over()
    }

    /// Solved tables, computed at most once per banner.
    pub fn tables(&self) -> GachaResult<&ChainTables> {
        self.tables
            .get_or_init(|| markov::solve(self).map_err(|e| e.to_string()))
            .as_ref()
            .map_err(|reason| GachaError::Numerical {
                banner: self.key(),
                reason: reason.clone(),
            })
    }

    /// Check a caller-supplied state against this banner's state space.
    pub fn check_state(&self, state: &PullState) -> GachaResult<()> {
        let chain = ChainState::from(state);
        if self.space.contains(chain) {
            return Ok(());
        }
        Err(GachaError::InvalidState {
            banner: self.key(),
            reason: format!(
                "pity {} must be below {} and counter {} below {}",
                chain.pity,
                self.space.hard_pity,
                chain.counter,
                self.space.counter_values
            ),
        })
    }

    // ── Simulation ─────────────────────────────────────────────────

    /// Advance `state` by one pull and return what it paid out.
    pub fn simulate_one_pull(
        &self,
        state: &mut PullState,
        rng: &mut FastRng,
        collection: &mut Collection,
        up_full_copy: bool,
    ) -> PullOutcome {
        state.pity += 1;
        state.pity4 += 1;
        let p5 = self.probability_of_top_rarity(state.pity - 1);

        if rng.next() < p5 {
            let was_guaranteed = state.is_guaranteed;
            let (p_win, _) = self.win_lose_probability(was_guaranteed, state.counter);
            let target_won = rng.next() < p_win;
            state.pity = 0;
            state.pity4 = 0;

            let returns = self.top_rarity_return(target_won, collection, rng);
            let rule = &self.config.counter;
            if target_won {
                state.counter = rule.after_win(was_guaranteed, state.counter);
                state.is_guaranteed = false;
            } else {
                state.counter = rule.after_loss(was_guaranteed, state.counter);
                state.is_guaranteed = true;
            }
            return PullOutcome { returns, target_won };
        }

        let no_top = if p5 < 1.0 { 1.0 - p5 } else { 0.99 };
        if state.pity4 >= SECONDARY_PITY || rng.next() < self.config.secondary.base_rate / no_top {
            let returns = self.secondary_pull(state, rng, collection, up_full_copy);
            return PullOutcome { returns, target_won: false };
        }
        PullOutcome { returns: 0.0, target_won: false }
    }

    /// Pull until the current target is won: (pulls, returns).
    pub fn pulls_for_one_target(
        &self,
        state: &mut PullState,
        rng: &mut FastRng,
        collection: &mut Collection,
        up_full_copy: bool,
    ) -> (Pulls, Returns) {
        let mut pulls = 0;
        let mut returns = 0.0;
        loop {
            pulls += 1;
            let outcome = self.simulate_one_pull(state, rng, collection, up_full_copy);
            returns += outcome.returns;
            if outcome.target_won {
                return (pulls, returns);
            }
        }
    }

    fn top_rarity_return(&self, featured: bool, collection: &mut Collection, rng: &mut FastRng) -> f64 {
        match self.config.top_payout {
            TopPayout::Flat { value } => value,
            TopPayout::Collected { featured: table, .. } if featured => {
                table.payout(collection.add_featured_top())
            }
            TopPayout::Collected { standard, standard_pool, .. } => {
                let slot = rng.next_index(standard_pool);
                standard.payout(collection.add_standard_top(slot))
            }
        }
    }

    fn secondary_pull(
        &self,
        state: &mut PullState,
        rng: &mut FastRng,
        collection: &mut Collection,
        up_full_copy: bool,
    ) -> f64 {
        let secondary = &self.config.secondary;
        state.pity4 = 0;

        if state.is_guaranteed4 || rng.next() < secondary.featured_share {
            state.is_guaranteed4 = false;
            return if up_full_copy {
                secondary.featured_full_copy_value
            } else {
                secondary.featured_value
            };
        }

        state.is_guaranteed4 = true;
        if rng.next() < secondary.character_share {
            let slot = rng.next_index(secondary.standard_characters);
            secondary.character_dupes.payout(collection.add_standard_secondary(slot))
        } else {
            secondary.other_value
        }
    }
}
