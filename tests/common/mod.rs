//! Backends and data helpers shared by the integration tests.

#![allow(dead_code)]

use anofox_ensemble::prelude::*;
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::sync::Arc;

pub fn day(i: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap() + Duration::days(i)
}

/// Observed rows for days `range`, valued by `f`.
pub fn series(range: std::ops::Range<i64>, f: impl Fn(i64) -> f64) -> Vec<Observation> {
    range.map(|i| Observation::new(day(i), f(i))).collect()
}

pub fn horizon(range: std::ops::Range<i64>) -> Vec<Observation> {
    range.map(|i| Observation::unobserved(day(i))).collect()
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn days_since(origin: DateTime<Utc>, t: DateTime<Utc>) -> f64 {
    (t - origin).num_seconds() as f64 / 86_400.0
}

/// Least-squares line over days since the first training row, plus a bias.
#[derive(Debug, Clone, Default)]
pub struct LinearBackend {
    pub bias: f64,
}

impl LinearBackend {
    pub fn shared(bias: f64) -> SharedBackend {
        Arc::new(Self { bias })
    }
}

#[derive(Debug)]
struct LinearFit {
    origin: DateTime<Utc>,
    intercept: f64,
    slope: f64,
    bias: f64,
}

impl ModelBackend for LinearBackend {
    fn name(&self) -> &str {
        "linear"
    }

    fn fit(&self, _request: &FitRequest, rows: &[Observation]) -> Result<Box<dyn FittedModel>> {
        let origin = rows[0].timestamp;
        let xs: Vec<f64> = rows.iter().map(|r| days_since(origin, r.timestamp)).collect();
        let ys = anofox_ensemble::core::actuals(rows)?;
        let n = xs.len() as f64;
        let mx = xs.iter().sum::<f64>() / n;
        let my = ys.iter().sum::<f64>() / n;
        let sxx: f64 = xs.iter().map(|x| (x - mx).powi(2)).sum();
        let sxy: f64 = xs.iter().zip(&ys).map(|(x, y)| (x - mx) * (y - my)).sum();
        let slope = if sxx > 0.0 { sxy / sxx } else { 0.0 };
        Ok(Box::new(LinearFit {
            origin,
            intercept: my - slope * mx,
            slope,
            bias: self.bias,
        }))
    }
}

impl FittedModel for LinearFit {
    fn predict(&self, rows: &[Observation]) -> Result<Prediction> {
        Ok(Prediction::from_values(
            rows.iter()
                .map(|r| self.intercept + self.slope * days_since(self.origin, r.timestamp) + self.bias)
                .collect(),
        ))
    }
}

/// Predicts the same value for every row.
#[derive(Debug, Clone)]
pub struct ConstantBackend(pub f64);

impl ModelBackend for ConstantBackend {
    fn name(&self) -> &str {
        "constant"
    }

    fn fit(&self, _request: &FitRequest, _rows: &[Observation]) -> Result<Box<dyn FittedModel>> {
        Ok(Box::new(self.clone()))
    }
}

impl FittedModel for ConstantBackend {
    fn predict(&self, rows: &[Observation]) -> Result<Prediction> {
        Ok(Prediction::from_values(vec![self.0; rows.len()]))
    }
}

/// Fits anything, fails every prediction.
#[derive(Debug, Clone)]
pub struct BrokenPredictBackend;

impl ModelBackend for BrokenPredictBackend {
    fn name(&self) -> &str {
        "broken"
    }

    fn fit(&self, _request: &FitRequest, _rows: &[Observation]) -> Result<Box<dyn FittedModel>> {
        Ok(Box::new(BrokenPredictBackend))
    }
}

impl FittedModel for BrokenPredictBackend {
    fn predict(&self, _rows: &[Observation]) -> Result<Prediction> {
        Err(PipelineError::ComputationError("Hessian not invertible".to_string()))
    }
}

/// Registry numbered from `first_id`, one ETS(A,A,N) linear model per bias.
pub fn linear_registry(first_id: u32, biases: &[f64], training: &[Observation]) -> Registry {
    let mut registry = Registry::starting_at(first_id);
    for &bias in biases {
        registry
            .fit_and_register(LinearBackend::shared(bias), FitRequest::new(ETSSpec::aan()), training, None)
            .unwrap();
    }
    registry
}
