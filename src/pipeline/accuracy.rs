//! Accuracy metrics computed from calibration records.

use crate::error::{PipelineError, Result};
use crate::registry::{CalibrationRecord, ModelId, Registry};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A metric value, or `NotDefined` when its denominator is zero for the
/// window (e.g. MAPE with a zero actual). Serializes as a number or `null`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Metric {
    Value(f64),
    NotDefined,
}

impl Metric {
    pub fn value(self) -> Option<f64> {
        match self {
            Metric::Value(v) => Some(v),
            Metric::NotDefined => None,
        }
    }

    /// The value, or `MetricUndefined` naming the metric.
    pub fn require(self, name: &'static str) -> Result<f64> {
        self.value().ok_or(PipelineError::MetricUndefined(name))
    }

    pub fn is_defined(self) -> bool {
        matches!(self, Metric::Value(_))
    }
}

impl From<Option<f64>> for Metric {
    fn from(value: Option<f64>) -> Self {
        value.map_or(Metric::NotDefined, Metric::Value)
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metric::Value(v) => write!(f, "{:.4}", v),
            Metric::NotDefined => f.write_str("n/a"),
        }
    }
}

/// Accuracy metrics for evaluating forecast performance.
///
/// MAPE and SMAPE are fractions, not percentages.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AccuracyMetrics {
    /// Number of observations
    pub n: usize,
    /// Mean Absolute Error
    pub mae: f64,
    /// Mean Squared Error
    pub mse: f64,
    /// Root Mean Squared Error
    pub rmse: f64,
    /// Mean Absolute Percentage Error (not defined if any actual is zero)
    pub mape: Metric,
    /// Symmetric Mean Absolute Percentage Error
    pub smape: f64,
    /// Mean Absolute Scaled Error against the in-window naive forecast
    pub mase: Metric,
    /// R-squared (not defined for a constant window)
    pub r_squared: Metric,
}

impl AccuracyMetrics {
    /// Reduce one model's calibration records.
    pub fn from_records(records: &[CalibrationRecord]) -> Result<Self> {
        let actual: Vec<f64> = records.iter().map(|r| r.actual).collect();
        let predicted: Vec<f64> = records.iter().map(|r| r.predicted).collect();
        calculate_metrics(&actual, &predicted)
    }
}

/// Accuracy of one registry entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccuracyRecord {
    pub model_id: ModelId,
    pub label: String,
    #[serde(flatten)]
    pub metrics: AccuracyMetrics,
}

/// One accuracy record per calibrated entry, in registry order.
///
/// Entries without calibration records (never calibrated, or failed) are
/// omitted rather than zero-filled.
pub fn accuracy(registry: &Registry) -> Vec<AccuracyRecord> {
    registry
        .iter()
        .filter_map(|entry| {
            let calibration = entry.calibration().calibration()?;
            let metrics = AccuracyMetrics::from_records(calibration.records()).ok()?;
            Some(AccuracyRecord {
                model_id: entry.id(),
                label: entry.label().to_string(),
                metrics,
            })
        })
        .collect()
}

/// Calculate accuracy metrics between actual and predicted values.
pub fn calculate_metrics(actual: &[f64], predicted: &[f64]) -> Result<AccuracyMetrics> {
    if actual.is_empty() || predicted.is_empty() {
        return Err(PipelineError::EmptyData);
    }

    if actual.len() != predicted.len() {
        return Err(PipelineError::DimensionMismatch {
            expected: actual.len(),
            got: predicted.len(),
        });
    }

    let n = actual.len() as f64;
    let residuals: Vec<f64> = actual
        .iter()
        .zip(predicted.iter())
        .map(|(a, p)| a - p)
        .collect();

    let mae = residuals.iter().map(|r| r.abs()).sum::<f64>() / n;
    let ss_res: f64 = residuals.iter().map(|r| r * r).sum();
    let mse = ss_res / n;
    let rmse = mse.sqrt();

    // MAPE (only if no zeros in actual)
    let mape = if actual.contains(&0.0) {
        Metric::NotDefined
    } else {
        let sum: f64 = residuals
            .iter()
            .zip(actual.iter())
            .map(|(r, a)| (r / a).abs())
            .sum();
        Metric::Value(sum / n)
    };

    let smape = actual
        .iter()
        .zip(predicted.iter())
        .map(|(a, p)| {
            let denom = a.abs() + p.abs();
            if denom == 0.0 {
                0.0
            } else {
                2.0 * (a - p).abs() / denom
            }
        })
        .sum::<f64>()
        / n;

    let mase = calculate_mase(actual, mae).into();

    let mean_actual = actual.iter().sum::<f64>() / n;
    let ss_tot: f64 = actual.iter().map(|a| (a - mean_actual).powi(2)).sum();
    let r_squared = if ss_tot == 0.0 {
        Metric::NotDefined
    } else {
        Metric::Value(1.0 - ss_res / ss_tot)
    };

    Ok(AccuracyMetrics {
        n: actual.len(),
        mae,
        mse,
        rmse,
        mape,
        smape,
        mase,
        r_squared,
    })
}

/// MASE = MAE / MAE_naive, where MAE_naive is the one-step naive forecast
/// error inside the same window.
fn calculate_mase(actual: &[f64], forecast_mae: f64) -> Option<f64> {
    let n = actual.len();
    if n < 2 {
        return None;
    }

    let naive_mae: f64 = actual
        .windows(2)
        .map(|w| (w[1] - w[0]).abs())
        .sum::<f64>()
        / (n - 1) as f64;

    if naive_mae == 0.0 {
        return None;
    }
    Some(forecast_mae / naive_mae)
}
