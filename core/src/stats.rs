//! Percentile summaries of simulated samples.

use serde::{Deserialize, Serialize};

/// Mean plus fixed percentiles. `T` is the reported percentile type:
/// whole pulls for pull counts, floats for returns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PercentileSummary<T> {
    pub mean: f64,
    pub p25:  T,
    pub p50:  T,
    pub p75:  T,
    pub p90:  T,
    pub p95:  T,
}

/// Linear interpolation between closest ranks, `q` in [0, 100].
/// `sorted` must be ascending and non-empty.
pub fn percentile(sorted: &[f64], q: f64) -> f64 {
    let rank = (q / 100.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

fn summarize<T>(sample: &[f64], cast: impl Fn(f64) -> T) -> Option<PercentileSummary<T>> {
    if sample.is_empty() {
        return None;
    }
    let mut sorted = sample.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mean = sorted.iter().sum::<f64>() / sorted.len() as f64;
    Some(PercentileSummary {
        mean,
        p25: cast(percentile(&sorted, 25.0)),
        p50: cast(percentile(&sorted, 50.0)),
        p75: cast(percentile(&sorted, 75.0)),
        p90: cast(percentile(&sorted, 90.0)),
        p95: cast(percentile(&sorted, 95.0)),
    })
}

/// Pull-count summary. Percentiles truncate toward zero.
pub fn summarize_pulls(pulls: &[u32]) -> Option<PercentileSummary<u32>> {
    let sample: Vec<f64> = pulls.iter().map(|&p| f64::from(p)).collect();
    summarize(&sample, |v| v as u32)
}

pub fn summarize_returns(returns: &[f64]) -> Option<PercentileSummary<f64>> {
    summarize(returns, |v| v)
}

/// Percentage of trials finishing within `budget` pulls.
pub fn success_rate(pulls: &[u32], budget: f64) -> f64 {
    if pulls.is_empty() {
        return 0.0;
    }
    let hits = pulls.iter().filter(|&&p| f64::from(p) <= budget).count();
    hits as f64 / pulls.len() as f64 * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interpolates_between_ranks() {
        let sorted = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(percentile(&sorted, 0.0), 1.0);
        assert_eq!(percentile(&sorted, 50.0), 2.5);
        assert_eq!(percentile(&sorted, 100.0), 4.0);
        assert!((percentile(&sorted, 25.0) - 1.75).abs() < 1e-12);
    }

    #[test]
    fn pull_percentiles_truncate() {
        let summary = summarize_pulls(&[10, 11, 12, 13]).unwrap();
        assert_eq!(summary.p50, 11); // 11.5 truncated
        assert_eq!(summary.mean, 11.5);
    }

    #[test]
    fn empty_sample_has_no_summary() {
        assert!(summarize_pulls(&[]).is_none());
        assert_eq!(success_rate(&[], 10.0), 0.0);
    }

    #[test]
    fn success_rate_counts_inclusive_budget() {
        assert_eq!(success_rate(&[5, 10, 15, 20], 10.0), 50.0);
        assert_eq!(success_rate(&[5, 10, 15, 20], f64::INFINITY), 100.0);
        assert_eq!(success_rate(&[5, 10, 15, 20], 0.0), 0.0);
    }
}
