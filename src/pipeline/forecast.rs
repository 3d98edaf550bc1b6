//! Point forecasts with residual-sized prediction intervals.

use crate::core::{validate_ordering, Observation, Prediction, Scale};
use crate::error::{ModelFailure, PipelineError, Result, Stage};
use crate::pipeline::executor::Executor;
use crate::registry::{Calibration, ModelId, Registry, RegistryEntry};
use crate::utils::stats::{conformal_quantile, std_dev};
use crate::utils::normal_multiplier;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

/// How the half-width of a prediction interval is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntervalMethod {
    /// Sample standard deviation of the calibration residuals times the
    /// two-sided normal multiplier for the level. Models with a single
    /// residual fail with `InsufficientData`.
    #[default]
    ResidualStdDev,
    /// Split-conformal quantile of the absolute calibration residuals.
    EmpiricalQuantile,
    /// The backend's own interval, or `ResidualStdDev` when it has none.
    Native,
}

/// Interval settings for a forecast run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForecastOptions {
    pub level: f64,
    pub method: IntervalMethod,
}

impl ForecastOptions {
    pub fn new(level: f64, method: IntervalMethod) -> Self {
        Self { level, method }
    }
}

impl Default for ForecastOptions {
    fn default() -> Self {
        Self {
            level: 0.95,
            method: IntervalMethod::ResidualStdDev,
        }
    }
}

/// Forecast of one model at one timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastRecord {
    pub model_id: ModelId,
    pub timestamp: DateTime<Utc>,
    /// Observed value, when the target rows carry one.
    pub actual: Option<f64>,
    pub point: f64,
    pub lower: f64,
    pub upper: f64,
}

/// Forecast records of every model that produced one, on an explicit scale.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastSet {
    scale: Scale,
    level: f64,
    labels: Vec<(ModelId, String)>,
    records: Vec<ForecastRecord>,
    failures: Vec<ModelFailure>,
}

impl ForecastSet {
    pub fn scale(&self) -> Scale {
        self.scale
    }

    pub fn level(&self) -> f64 {
        self.level
    }

    /// Records grouped by model in registry order, then by timestamp.
    pub fn records(&self) -> &[ForecastRecord] {
        &self.records
    }

    /// Models that failed to forecast, with their cause.
    pub fn failures(&self) -> &[ModelFailure] {
        &self.failures
    }

    /// Ids of the models that produced records.
    pub fn model_ids(&self) -> Vec<ModelId> {
        self.labels.iter().map(|(id, _)| *id).collect()
    }

    pub fn label(&self, model_id: ModelId) -> Option<&str> {
        self.labels
            .iter()
            .find(|(id, _)| *id == model_id)
            .map(|(_, label)| label.as_str())
    }

    pub fn for_model(&self, model_id: ModelId) -> Vec<ForecastRecord> {
        self.records
            .iter()
            .filter(|r| r.model_id == model_id)
            .copied()
            .collect()
    }

    /// Distinct timestamps in ascending order.
    pub fn timestamps(&self) -> Vec<DateTime<Utc>> {
        let mut timestamps: Vec<_> = self.records.iter().map(|r| r.timestamp).collect();
        timestamps.sort();
        timestamps.dedup();
        timestamps
    }

    /// Fraction of records with an actual that falls inside their interval.
    ///
    /// `None` when no record carries an actual.
    pub fn coverage(&self) -> Option<f64> {
        let observed: Vec<_> = self
            .records
            .iter()
            .filter_map(|r| r.actual.map(|a| (a, r)))
            .collect();
        if observed.is_empty() {
            return None;
        }
        let inside = observed
            .iter()
            .filter(|(a, r)| r.lower <= *a && *a <= r.upper)
            .count();
        Some(inside as f64 / observed.len() as f64)
    }

    /// Same models and failures, with `records` on another scale.
    pub(crate) fn rescaled(&self, scale: Scale, records: Vec<ForecastRecord>) -> Self {
        Self {
            scale,
            level: self.level,
            labels: self.labels.clone(),
            records,
            failures: self.failures.clone(),
        }
    }
}

/// Forecast `rows` with every calibrated model of `registry`.
///
/// `scale` tags the records with the scale the models were fit on. Models
/// without calibration residuals are reported as `NotCalibrated` failures.
/// Fails with `AllForecastsFailed` when no model produced a forecast.
pub fn forecast(
    registry: &Registry,
    rows: &[Observation],
    scale: Scale,
    options: &ForecastOptions,
    executor: &Executor,
) -> Result<ForecastSet> {
    if registry.is_empty() || rows.is_empty() {
        return Err(PipelineError::EmptyData);
    }
    validate_ordering(rows)?;
    let z = normal_multiplier(options.level)?;

    info!(
        models = registry.len(),
        rows = rows.len(),
        level = options.level,
        method = ?options.method,
        "forecasting registry"
    );

    let mut failures = Vec::new();
    let mut calibrated: Vec<(RegistryEntry, Arc<Calibration>)> = Vec::new();
    for entry in registry.iter() {
        match registry.calibration(entry.id()) {
            Ok(calibration) => calibrated.push((entry.clone(), calibration)),
            Err(err) => failures.push(ModelFailure::new(entry.id(), entry.label(), Stage::Forecast, err)),
        }
    }

    let entries: Vec<RegistryEntry> = calibrated.iter().map(|(e, _)| e.clone()).collect();
    let task_rows = Arc::new(rows.to_vec());
    let results = executor.run(&entries, move |handle| handle.predict(&task_rows));

    let mut labels = Vec::new();
    let mut records = Vec::with_capacity(entries.len() * rows.len());
    for ((entry, calibration), (_, result)) in calibrated.iter().zip(results) {
        let built = result.and_then(|p| build_records(entry.id(), rows, &p, calibration, z, options));
        match built {
            Ok(model_records) => {
                labels.push((entry.id(), entry.label().to_string()));
                records.extend(model_records);
            }
            Err(err) => failures.push(ModelFailure::new(entry.id(), entry.label(), Stage::Forecast, err)),
        }
    }

    for failure in &failures {
        warn!(
            model_id = %failure.model_id,
            label = %failure.label,
            error = %failure.error,
            "forecast failed"
        );
    }

    if labels.is_empty() {
        return Err(PipelineError::AllForecastsFailed {
            count: registry.len(),
        });
    }

    // keep failures in registry order
    let order = registry.ids();
    failures.sort_by_key(|f| order.iter().position(|id| *id == f.model_id));

    Ok(ForecastSet {
        scale,
        level: options.level,
        labels,
        records,
        failures,
    })
}

fn build_records(
    model_id: ModelId,
    rows: &[Observation],
    prediction: &Prediction,
    calibration: &Calibration,
    z: f64,
    options: &ForecastOptions,
) -> Result<Vec<ForecastRecord>> {
    if let Some(i) = prediction.first_non_finite() {
        return Err(PipelineError::ComputationError(format!(
            "non-finite forecast at {}",
            rows[i].timestamp
        )));
    }

    let native = options.method == IntervalMethod::Native && prediction.has_intervals();
    let half_width = if native {
        0.0
    } else {
        residual_half_width(calibration, z, options)?
    };

    rows.iter()
        .zip(prediction.point())
        .enumerate()
        .map(|(i, (row, &point))| {
            let (lower, upper) = match prediction.interval_at(i) {
                Some((lower, upper)) if native => {
                    if !(lower <= point && point <= upper) {
                        return Err(PipelineError::ComputationError(format!(
                            "native interval [{}, {}] does not contain point {} at {}",
                            lower, upper, point, row.timestamp
                        )));
                    }
                    (lower, upper)
                }
                _ => (point - half_width, point + half_width),
            };
            Ok(ForecastRecord {
                model_id,
                timestamp: row.timestamp,
                actual: row.value,
                point,
                lower,
                upper,
            })
        })
        .collect()
}

/// Half-width from calibration residuals.
///
/// A sample standard deviation needs two residuals; fewer is
/// `InsufficientData` for the model.
fn residual_half_width(calibration: &Calibration, z: f64, options: &ForecastOptions) -> Result<f64> {
    let residuals = calibration.residuals();
    match options.method {
        IntervalMethod::EmpiricalQuantile => {
            if residuals.is_empty() {
                return Err(PipelineError::InsufficientData { needed: 1, got: 0 });
            }
            let scores: Vec<f64> = residuals.iter().map(|r| r.abs()).collect();
            Ok(conformal_quantile(&scores, options.level))
        }
        IntervalMethod::ResidualStdDev | IntervalMethod::Native => {
            if residuals.len() < 2 {
                return Err(PipelineError::InsufficientData {
                    needed: 2,
                    got: residuals.len(),
                });
            }
            Ok(std_dev(&residuals) * z)
        }
    }
}
