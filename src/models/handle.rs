//! Fitted model handles owned by registry entries.

use crate::core::{validate_ordering, Observation, Prediction};
use crate::error::{PipelineError, Result};
use crate::models::spec::{ModelFamily, ModelSpec};
use crate::models::traits::{FitRequest, FittedModel, SharedBackend};
use std::sync::Arc;

/// Opaque fitted model exposing exactly `refit` and `predict`.
///
/// Cloning is cheap: the backend, the request and the fitted state are
/// shared immutably.
#[derive(Debug, Clone)]
pub struct ModelHandle {
    backend: SharedBackend,
    request: Arc<FitRequest>,
    fitted: Arc<dyn FittedModel>,
}

impl ModelHandle {
    /// Fit `request` on `rows` through `backend`.
    ///
    /// Every error raised while fitting surfaces as `FitFailure`, except
    /// timeouts and panics which keep their own variants.
    pub fn fit(backend: SharedBackend, request: FitRequest, rows: &[Observation]) -> Result<Self> {
        let fitted = fit_with(&backend, &request, rows).map_err(|err| match err {
            PipelineError::FitFailure(_)
            | PipelineError::Timeout { .. }
            | PipelineError::BackendPanicked(_) => err,
            other => PipelineError::FitFailure(format!("{}: {}", backend.name(), other)),
        })?;

        Ok(Self {
            backend,
            request: Arc::new(request),
            fitted: Arc::from(fitted),
        })
    }

    /// Fit a fresh model with the same backend and hyperparameters on new rows.
    pub fn refit(&self, rows: &[Observation]) -> Result<Self> {
        Self::fit(Arc::clone(&self.backend), (*self.request).clone(), rows)
    }

    /// Predict `rows`, checking declared regressors and the output length.
    pub fn predict(&self, rows: &[Observation]) -> Result<Prediction> {
        check_regressors(&self.request, rows)?;
        let prediction = self.fitted.predict(rows)?;
        if prediction.len() != rows.len() {
            return Err(PipelineError::DimensionMismatch {
                expected: rows.len(),
                got: prediction.len(),
            });
        }
        Ok(prediction)
    }

    pub fn request(&self) -> &FitRequest {
        &self.request
    }

    pub fn spec(&self) -> &ModelSpec {
        &self.request.spec
    }

    pub fn family(&self) -> ModelFamily {
        self.request.spec.family()
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }
}

fn fit_with(
    backend: &SharedBackend,
    request: &FitRequest,
    rows: &[Observation],
) -> Result<Box<dyn FittedModel>> {
    if rows.is_empty() {
        return Err(PipelineError::EmptyData);
    }
    request.spec.validate()?;
    validate_ordering(rows)?;
    for row in rows {
        row.actual()?;
    }
    check_regressors(request, rows)?;
    backend.fit(request, rows)
}

fn check_regressors(request: &FitRequest, rows: &[Observation]) -> Result<()> {
    if !request.uses_regressors() {
        return Ok(());
    }
    for name in &request.regressors {
        if let Some(row) = rows.iter().find(|r| r.regressor(name).is_none()) {
            return Err(PipelineError::InvalidParameter(format!(
                "row at {} is missing regressor '{}'",
                row.timestamp, name
            )));
        }
    }
    Ok(())
}
