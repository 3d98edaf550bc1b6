//! Registry entries and the calibration state they carry.

use crate::error::PipelineError;
use crate::models::ModelHandle;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Identifier of a registry entry, unique within its registry.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ModelId(u32);

impl ModelId {
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Actual, prediction and residual of one model at one holdout timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationRecord {
    pub model_id: ModelId,
    pub timestamp: DateTime<Utc>,
    pub actual: f64,
    pub predicted: f64,
    /// `actual - predicted`
    pub residual: f64,
}

impl CalibrationRecord {
    pub fn new(model_id: ModelId, timestamp: DateTime<Utc>, actual: f64, predicted: f64) -> Self {
        Self {
            model_id,
            timestamp,
            actual,
            predicted,
            residual: actual - predicted,
        }
    }
}

/// Immutable set of calibration records for one model.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Calibration {
    records: Vec<CalibrationRecord>,
}

impl Calibration {
    pub fn new(records: Vec<CalibrationRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[CalibrationRecord] {
        &self.records
    }

    pub fn residuals(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.residual).collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Calibration status of a registry entry.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CalibrationState {
    #[default]
    Uncalibrated,
    Calibrated(Arc<Calibration>),
    /// Predict over the holdout window failed; the cause is kept.
    Failed(PipelineError),
}

impl CalibrationState {
    pub fn calibration(&self) -> Option<&Calibration> {
        match self {
            CalibrationState::Calibrated(c) => Some(c),
            _ => None,
        }
    }

    pub fn is_calibrated(&self) -> bool {
        matches!(self, CalibrationState::Calibrated(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, CalibrationState::Failed(_))
    }
}

/// One fitted model in a registry.
#[derive(Debug, Clone)]
pub struct RegistryEntry {
    id: ModelId,
    label: String,
    handle: ModelHandle,
    calibration: CalibrationState,
}

impl RegistryEntry {
    pub(crate) fn new(id: ModelId, label: String, handle: ModelHandle) -> Self {
        Self {
            id,
            label,
            handle,
            calibration: CalibrationState::Uncalibrated,
        }
    }

    pub fn id(&self) -> ModelId {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn handle(&self) -> &ModelHandle {
        &self.handle
    }

    pub fn calibration(&self) -> &CalibrationState {
        &self.calibration
    }

    pub(crate) fn with_id(&self, id: ModelId) -> Self {
        Self {
            id,
            ..self.clone()
        }
    }

    pub(crate) fn with_calibration(&self, calibration: CalibrationState) -> Self {
        Self {
            calibration,
            ..self.clone()
        }
    }

    pub(crate) fn with_handle(&self, handle: ModelHandle) -> Self {
        Self {
            id: self.id,
            label: self.label.clone(),
            handle,
            calibration: CalibrationState::Uncalibrated,
        }
    }
}
