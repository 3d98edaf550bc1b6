//! Statistical utility functions.

use crate::error::{PipelineError, Result};
use statrs::distribution::{ContinuousCDF, Normal};

/// Two-sided normal multiplier for a confidence `level`.
///
/// Returns `z` such that `P(|Z| <= z) = level`, i.e. about 1.96 at 0.95.
///
/// # Example
/// ```
/// use anofox_ensemble::utils::normal_multiplier;
///
/// let z = normal_multiplier(0.95).unwrap();
/// assert!((z - 1.96).abs() < 0.01);
/// ```
pub fn normal_multiplier(level: f64) -> Result<f64> {
    if !(level > 0.0 && level < 1.0) {
        return Err(PipelineError::InvalidParameter(format!(
            "confidence level must be in (0, 1), got {}",
            level
        )));
    }
    let normal = Normal::new(0.0, 1.0)
        .map_err(|e| PipelineError::ComputationError(e.to_string()))?;
    Ok(normal.inverse_cdf((1.0 + level) / 2.0))
}

/// Calculate the mean of a slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Calculate the variance of a slice (sample variance with n-1 denominator).
pub fn variance(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return f64::NAN;
    }
    let m = mean(values);
    let sum_sq: f64 = values.iter().map(|x| (x - m).powi(2)).sum();
    sum_sq / (values.len() - 1) as f64
}

/// Calculate the standard deviation of a slice.
pub fn std_dev(values: &[f64]) -> f64 {
    variance(values).sqrt()
}

/// Split-conformal quantile of non-negative `scores`.
///
/// Returns the `ceil((n + 1) * level)`-th smallest score, clamped to the
/// largest one, so that a new score falls at or below it with probability
/// at least `level` under exchangeability.
pub fn conformal_quantile(scores: &[f64], level: f64) -> f64 {
    if scores.is_empty() {
        return f64::NAN;
    }
    let mut sorted = scores.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let n = sorted.len();
    let rank = ((n as f64 + 1.0) * level.clamp(0.0, 1.0)).ceil() as usize;
    sorted[rank.clamp(1, n) - 1]
}
