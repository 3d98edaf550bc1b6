//! Deterministic backends for unit tests.

use crate::core::{Observation, Prediction};
use crate::error::{PipelineError, Result};
use crate::models::traits::{FitRequest, FittedModel, ModelBackend};
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::ops::Range;

pub fn day(i: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::days(i)
}

pub fn observed(range: Range<i64>, f: impl Fn(i64) -> f64) -> Vec<Observation> {
    range.map(|i| Observation::new(day(i), f(i))).collect()
}

fn days_since(origin: DateTime<Utc>, t: DateTime<Utc>) -> f64 {
    (t - origin).num_seconds() as f64 / 86_400.0
}

/// Least-squares line through the training rows, plus a constant bias.
#[derive(Debug, Clone, Default)]
pub struct TrendBackend {
    bias: f64,
    native_width: Option<f64>,
    truncate: bool,
}

impl TrendBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bias(mut self, bias: f64) -> Self {
        self.bias = bias;
        self
    }

    pub fn with_native_interval(mut self, width: f64) -> Self {
        self.native_width = Some(width);
        self
    }

    /// Return one value fewer than requested.
    pub fn truncating(mut self) -> Self {
        self.truncate = true;
        self
    }
}

#[derive(Debug)]
struct TrendFit {
    origin: DateTime<Utc>,
    intercept: f64,
    slope: f64,
    config: TrendBackend,
}

impl ModelBackend for TrendBackend {
    fn name(&self) -> &str {
        "trend"
    }

    fn fit(&self, _request: &FitRequest, rows: &[Observation]) -> Result<Box<dyn FittedModel>> {
        let origin = rows[0].timestamp;
        let xs: Vec<f64> = rows.iter().map(|r| days_since(origin, r.timestamp)).collect();
        let ys = crate::core::actuals(rows)?;
        let n = xs.len() as f64;
        let mx = xs.iter().sum::<f64>() / n;
        let my = ys.iter().sum::<f64>() / n;
        let sxx: f64 = xs.iter().map(|x| (x - mx).powi(2)).sum();
        let sxy: f64 = xs.iter().zip(&ys).map(|(x, y)| (x - mx) * (y - my)).sum();
        let slope = if sxx > 0.0 { sxy / sxx } else { 0.0 };
        Ok(Box::new(TrendFit {
            origin,
            intercept: my - slope * mx,
            slope,
            config: self.clone(),
        }))
    }
}

impl FittedModel for TrendFit {
    fn predict(&self, rows: &[Observation]) -> Result<Prediction> {
        let take = if self.config.truncate {
            rows.len().saturating_sub(1)
        } else {
            rows.len()
        };
        let point: Vec<f64> = rows[..take]
            .iter()
            .map(|r| self.intercept + self.slope * days_since(self.origin, r.timestamp) + self.config.bias)
            .collect();
        match self.config.native_width {
            Some(w) => Prediction::from_values_with_intervals(
                point.clone(),
                point.iter().map(|p| p - w).collect(),
                point.iter().map(|p| p + w).collect(),
            ),
            None => Ok(Prediction::from_values(point)),
        }
    }
}

/// Backend that fails at a chosen point.
#[derive(Debug, Clone)]
pub struct FailingBackend {
    fit_limit: Option<usize>,
    predict_fails: bool,
    non_finite: bool,
}

impl FailingBackend {
    pub fn on_fit() -> Self {
        Self {
            fit_limit: Some(0),
            predict_fails: false,
            non_finite: false,
        }
    }

    /// Fits up to `rows` rows, fails to converge on anything larger.
    pub fn beyond(rows: usize) -> Self {
        Self {
            fit_limit: Some(rows),
            predict_fails: false,
            non_finite: false,
        }
    }

    pub fn on_predict() -> Self {
        Self {
            fit_limit: None,
            predict_fails: true,
            non_finite: false,
        }
    }

    /// Predicts NaN for every row.
    pub fn non_finite() -> Self {
        Self {
            fit_limit: None,
            predict_fails: false,
            non_finite: true,
        }
    }
}

impl ModelBackend for FailingBackend {
    fn name(&self) -> &str {
        "failing"
    }

    fn fit(&self, _request: &FitRequest, rows: &[Observation]) -> Result<Box<dyn FittedModel>> {
        if let Some(limit) = self.fit_limit {
            if rows.len() > limit {
                return Err(PipelineError::ComputationError(
                    "optimizer did not converge".to_string(),
                ));
            }
        }
        Ok(Box::new(self.clone()))
    }
}

impl FittedModel for FailingBackend {
    fn predict(&self, rows: &[Observation]) -> Result<Prediction> {
        if self.predict_fails {
            return Err(PipelineError::ComputationError("forecast diverged".to_string()));
        }
        if self.non_finite {
            return Ok(Prediction::from_values(vec![f64::NAN; rows.len()]));
        }
        Ok(Prediction::from_values(vec![0.0; rows.len()]))
    }
}

/// Backend whose predictions take a fixed amount of wall time.
#[derive(Debug, Clone)]
pub struct SlowBackend(pub std::time::Duration);

impl ModelBackend for SlowBackend {
    fn name(&self) -> &str {
        "slow"
    }

    fn fit(&self, _request: &FitRequest, _rows: &[Observation]) -> Result<Box<dyn FittedModel>> {
        Ok(Box::new(self.clone()))
    }
}

impl FittedModel for SlowBackend {
    fn predict(&self, rows: &[Observation]) -> Result<Prediction> {
        std::thread::sleep(self.0);
        Ok(Prediction::from_values(vec![1.0; rows.len()]))
    }
}

/// Backend that panics on predict.
#[derive(Debug, Clone)]
pub struct PanickingBackend;

impl ModelBackend for PanickingBackend {
    fn name(&self) -> &str {
        "panicking"
    }

    fn fit(&self, _request: &FitRequest, _rows: &[Observation]) -> Result<Box<dyn FittedModel>> {
        Ok(Box::new(PanickingBackend))
    }
}

impl FittedModel for PanickingBackend {
    fn predict(&self, _rows: &[Observation]) -> Result<Prediction> {
        panic!("singular matrix in backend");
    }
}
