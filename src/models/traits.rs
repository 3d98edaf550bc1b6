//! Backend contract implemented by external model families.

use crate::core::{Observation, Prediction};
use crate::error::Result;
use crate::models::spec::ModelSpec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Everything a backend needs to (re)fit a model: the target column, the
/// regressor columns it consumes, and its hyperparameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitRequest {
    pub target: String,
    #[serde(default)]
    pub regressors: Vec<String>,
    pub spec: ModelSpec,
}

impl FitRequest {
    /// Request for a univariate fit of the `value` column.
    pub fn new(spec: impl Into<ModelSpec>) -> Self {
        Self {
            target: "value".to_string(),
            regressors: Vec::new(),
            spec: spec.into(),
        }
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = target.into();
        self
    }

    pub fn with_regressors<I, S>(mut self, regressors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.regressors = regressors.into_iter().map(Into::into).collect();
        self
    }

    pub fn uses_regressors(&self) -> bool {
        !self.regressors.is_empty()
    }
}

/// A model family implementation able to fit a [`FitRequest`] on training rows.
///
/// Backends are shared across threads by the pipeline and must not keep
/// per-call mutable state.
pub trait ModelBackend: Send + Sync + fmt::Debug {
    /// Short name used in logs and failure reports.
    fn name(&self) -> &str;

    /// Fit a model on time-ordered, fully observed rows.
    fn fit(&self, request: &FitRequest, rows: &[Observation]) -> Result<Box<dyn FittedModel>>;
}

/// A fitted model able to predict arbitrary rows after its training window.
pub trait FittedModel: Send + Sync + fmt::Debug {
    /// Predict one value per row, optionally with the backend's own interval.
    fn predict(&self, rows: &[Observation]) -> Result<Prediction>;
}

/// Type alias for shared backend trait objects.
pub type SharedBackend = Arc<dyn ModelBackend>;
