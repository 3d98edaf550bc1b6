//! Error types for the anofox-ensemble pipeline.

use crate::core::Scale;
use crate::registry::ModelId;
use crate::transform::TransformKind;
use chrono::{DateTime, Utc};
use std::fmt;
use thiserror::Error;

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Errors that can occur while building, calibrating or forecasting a registry.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    /// Input data is empty.
    #[error("empty input data")]
    EmptyData,

    /// Insufficient data points for the operation.
    #[error("insufficient data: need at least {needed}, got {got}")]
    InsufficientData { needed: usize, got: usize },

    /// Invalid parameter value.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Dimension mismatch between data structures.
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    /// Timestamp-related error.
    #[error("timestamp error: {0}")]
    TimestampError(String),

    /// A row that must carry an observed value has none.
    #[error("missing actual value at {0}")]
    MissingActual(DateTime<Utc>),

    /// Computation error (e.g., numerical issues).
    #[error("computation error: {0}")]
    ComputationError(String),

    /// No registry entry with this id.
    #[error("unknown model: {0}")]
    UnknownModel(ModelId),

    /// The backend rejected the hyperparameters or failed to converge.
    #[error("fit failed: {0}")]
    FitFailure(String),

    /// Prediction over the holdout window failed or was not finite.
    #[error("calibration failed: {0}")]
    CalibrationFailure(String),

    /// A ratio metric has a zero denominator for this window.
    #[error("metric {0} is not defined for this window")]
    MetricUndefined(&'static str),

    /// Forecast requested for a model without calibration residuals.
    #[error("model {0} has not been calibrated")]
    NotCalibrated(ModelId),

    /// Two combined registries share a model id.
    #[error("duplicate model id {0} across combined registries")]
    DuplicateModelId(ModelId),

    /// Every entry of the registry failed calibration.
    #[error("all {count} models failed calibration")]
    AllCalibrationsFailed { count: usize },

    /// Every entry of the registry failed to refit.
    #[error("all {count} models failed to refit")]
    AllRefitsFailed { count: usize },

    /// Every entry of the registry failed to forecast.
    #[error("all {count} models failed to forecast")]
    AllForecastsFailed { count: usize },

    /// A declared transform step lacks one of its parameters.
    #[error("transform step {step} ({kind}) is missing parameter '{parameter}'")]
    MissingTransformParameters {
        step: usize,
        kind: TransformKind,
        parameter: &'static str,
    },

    /// A transform step cannot be inverted monotonically.
    #[error("transform step {step} ({kind}) is not invertible: {reason}")]
    NonInvertibleTransform {
        step: usize,
        kind: TransformKind,
        reason: String,
    },

    /// Values are on a different scale than the operation expects.
    #[error("scale mismatch: expected {expected} values, got {got}")]
    ScaleMismatch { expected: Scale, got: Scale },

    /// A single model call exceeded its time budget.
    #[error("model call timed out after {limit_ms} ms")]
    Timeout { limit_ms: u64 },

    /// A backend panicked while fitting or predicting.
    #[error("backend panicked: {0}")]
    BackendPanicked(String),

    /// The artifact bundle could not be read or is malformed.
    #[error("artifact bundle error: {0}")]
    Bundle(String),
}

/// Pipeline stage in which a single model failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Calibration,
    Refit,
    Forecast,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Calibration => "calibration",
            Stage::Refit => "refit",
            Stage::Forecast => "forecast",
        };
        f.write_str(name)
    }
}

/// A failure scoped to one registry entry, reported next to the
/// results of its siblings.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelFailure {
    pub model_id: ModelId,
    pub label: String,
    pub stage: Stage,
    pub error: PipelineError,
}

impl ModelFailure {
    pub fn new(model_id: ModelId, label: impl Into<String>, stage: Stage, error: PipelineError) -> Self {
        Self {
            model_id,
            label: label.into(),
            stage,
            error,
        }
    }
}

impl fmt::Display for ModelFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "model {} ({}) failed during {}: {}",
            self.model_id, self.label, self.stage, self.error
        )
    }
}
