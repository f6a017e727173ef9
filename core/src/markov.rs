//! Absorbing-chain solver.
//!
//! Expected pulls: A·x = b with A = I - (non-absorbing transitions), b = 1.
//! Winning contributes nothing to future pulls, so only the advance and
//! loss edges appear in A.
//!
//! Absorption: with Q the same non-absorbing block and R[i, v] the mass of
//! winning from i while carrying counter value v out, B = (I - Q)⁻¹·R.
//! B is computed as the solution of (I - Q)·B = R; no inverse is formed.

use crate::{
    banner::Banner,
    error::{GachaError, GachaResult},
};
use nalgebra::{DMatrix, DVector};

/// Solved tables for one banner. Read-only once built.
#[derive(Debug, Clone)]
pub struct ChainTables {
    /// Expected remaining pulls until the target, per state index.
    pub expected:   Vec<f64>,
    /// Row per state index, column per counter value: distribution of the
    /// counter at the moment the target is won. Only for carryover banners.
    pub absorption: Option<DMatrix<f64>>,
}

impl ChainTables {
    pub fn expected_at(&self, index: usize) -> f64 {
        self.expected[index]
    }

    pub fn absorption_row(&self, index: usize) -> Option<Vec<f64>> {
        self.absorption
            .as_ref()
            .map(|b| b.row(index).iter().copied().collect())
    }
}

/// (A, b) for the expected-pulls system.
pub fn build_transition_system(banner: &Banner) -> (DMatrix<f64>, DVector<f64>) {
    let n = banner.state_space().len();
    let mut a = DMatrix::<f64>::identity(n, n);
    let b = DVector::<f64>::from_element(n, 1.0);

    for i in 0..n {
        let t = banner.transitions(i);
        if let Some((next, p)) = t.advance {
            a[(i, next)] -= p;
        }
        if let Some((lost, p)) = t.loss {
            a[(i, lost)] -= p;
        }
    }
    (a, b)
}

/// (Q, R) for the absorption-outcome system.
pub fn build_absorption_system(banner: &Banner) -> (DMatrix<f64>, DMatrix<f64>) {
    let space = banner.state_space();
    let n = space.len();
    let mut q = DMatrix::<f64>::zeros(n, n);
    let mut r = DMatrix::<f64>::zeros(n, space.counter_values);

    for i in 0..n {
        let t = banner.transitions(i);
        if let Some((next, p)) = t.advance {
            q[(i, next)] += p;
        }
        if let Some((lost, p)) = t.loss {
            q[(i, lost)] += p;
        }
        if let Some((carried, p)) = t.win {
            r[(i, usize::from(carried))] += p;
        }
    }
    (q, r)
}

pub fn solve(banner: &Banner) -> GachaResult<ChainTables> {
    let key = banner.key();
    let numerical = |reason: &str| GachaError::Numerical {
        banner: key.clone(),
        reason: reason.to_string(),
    };

    let (a, b) = build_transition_system(banner);
    let expected = a
        .lu()
        .solve(&b)
        .ok_or_else(|| numerical("singular transition matrix"))?;
    if expected.iter().any(|x| !x.is_finite() || *x < 0.0) {
        return Err(numerical("expected pulls not finite and non-negative"));
    }

    let absorption = if banner.has_carryover() {
        let (q, r) = build_absorption_system(banner);
        let n = q.nrows();
        let fundamental = DMatrix::<f64>::identity(n, n) - q;
        let b = fundamental
            .lu()
            .solve(&r)
            .ok_or_else(|| numerical("singular fundamental matrix"))?;
        if b.iter().any(|x| !x.is_finite()) {
            return Err(numerical("absorption probabilities not finite"));
        }
        Some(b)
    } else {
        None
    };

    log::debug!(
        "solved chain for {key}: {} states, E[zero]={:.4}, absorption={}",
        expected.len(),
        expected[0],
        absorption.is_some()
    );

    Ok(ChainTables {
        expected: expected.iter().copied().collect(),
        absorption,
    })
}
