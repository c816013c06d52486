//! Robust summary statistics for outcome sample sets.
//!
//! The optimizer scores candidates by trimmed mean, which keeps a handful of
//! rare top-tier draws from dominating the score, and penalizes risk by the
//! sample standard deviation. An empty sample set summarizes to all zeros.

/// Trimmed mean where `proportion` is the share removed across *both* tails.
///
/// `floor(n * proportion / 2)` values are dropped from each end of the sorted
/// samples and the rest are averaged. With `[1, 2, ..., 10]` and a proportion
/// of 0.3 one value is cut from each side and the result is 5.5.
pub fn trimmed_mean(samples: &[f64], proportion: f64) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }

    let mut sorted = samples.to_vec();
    sorted.sort_by(f64::total_cmp);
    trimmed_mean_sorted(&sorted, proportion)
}

fn trimmed_mean_sorted(sorted: &[f64], proportion: f64) -> f64 {
    let n = sorted.len();
    let per_tail = ((n as f64 * proportion.clamp(0.0, 1.0)) / 2.0).floor() as usize;
    // Always keep at least one value.
    let per_tail = per_tail.min((n - 1) / 2);

    let kept = &sorted[per_tail..n - per_tail];
    kept.iter().sum::<f64>() / kept.len() as f64
}

/// Bessel-corrected sample standard deviation; zero below two samples.
pub fn sample_std_dev(samples: &[f64]) -> f64 {
    let n = samples.len();
    if n < 2 {
        return 0.0;
    }

    let mean = samples.iter().sum::<f64>() / n as f64;
    let variance = samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
    variance.sqrt()
}

/// Summary of one outcome sample set.
///
/// Only `trimmed_mean` and `std_dev` drive acceptance; the rest are
/// diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct OutcomeStats {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
    pub trimmed_mean: f64,
    pub std_dev: f64,
}

impl OutcomeStats {
    /// Compute statistics from a sample.
    pub fn from_samples(samples: &[f64], trim_proportion: f64) -> Self {
        if samples.is_empty() {
            return Self::default();
        }

        let mut sorted = samples.to_vec();
        sorted.sort_by(f64::total_cmp);

        let n = sorted.len();
        let mean = sorted.iter().sum::<f64>() / n as f64;
        let median = if n % 2 == 0 {
            (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
        } else {
            sorted[n / 2]
        };

        Self {
            count: n,
            mean,
            median,
            min: sorted[0],
            max: sorted[n - 1],
            trimmed_mean: trimmed_mean_sorted(&sorted, trim_proportion),
            std_dev: sample_std_dev(&sorted),
        }
    }
}
