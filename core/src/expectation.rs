//! Exact expected pulls for a run of several sequential targets.
//!
//! Target #1 starts from the caller's state. Every later target starts
//! from pity 0, no guarantee, and whatever counter value the previous win
//! left behind: a fixed 0 for banners without carryover, otherwise a
//! distribution propagated through the absorption table.

use crate::{
    banner::{Banner, ChainState},
    error::{GachaError, GachaResult},
    state::PullState,
};

/// Counter-distribution entries below this mass are skipped.
const NEGLIGIBLE_MASS: f64 = 1e-9;

pub fn expected_pulls(banner: &Banner, initial: &PullState, target_count: u32) -> GachaResult<f64> {
    if target_count == 0 {
        return Err(GachaError::InvalidTargetCount(target_count));
    }
    banner.check_state(initial)?;

    let tables = banner.tables()?;
    let start = banner.state_to_index(ChainState::from(initial));
    let mut total = tables.expected_at(start);
    if target_count == 1 {
        return Ok(total);
    }

    let remaining = f64::from(target_count - 1);
    let Some(mut distribution) = tables.absorption_row(start) else {
        let zero = banner.state_to_index(ChainState::zero(0));
        return Ok(total + remaining * tables.expected_at(zero));
    };

    for _ in 1..target_count {
        let mut next = vec![0.0; distribution.len()];
        for (counter, &mass) in distribution.iter().enumerate() {
            if mass <= NEGLIGIBLE_MASS {
                continue;
            }
            let index = banner.state_to_index(ChainState::zero(counter as u8));
            total += mass * tables.expected_at(index);
            if let Some(row) = tables.absorption_row(index) {
                for (slot, p) in next.iter_mut().zip(row) {
                    *slot += mass * p;
                }
            }
        }
        distribution = next;
    }

    log::debug!(
        "{}: expectation for {target_count} targets from {:?} = {total:.4}",
        banner.key(),
        ChainState::from(initial)
    );
    Ok(total)
}
