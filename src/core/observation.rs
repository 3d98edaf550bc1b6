//! Timestamped rows of the input dataset.

use crate::error::{PipelineError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One row of the dataset: a timestamp, the target value when observed,
/// and any number of named regressor columns (event flags, Fourier terms).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub timestamp: DateTime<Utc>,
    /// Target value. `None` on future-horizon rows.
    #[serde(default)]
    pub value: Option<f64>,
    #[serde(default)]
    pub regressors: BTreeMap<String, f64>,
}

impl Observation {
    /// Create an observed row.
    pub fn new(timestamp: DateTime<Utc>, value: f64) -> Self {
        Self {
            timestamp,
            value: Some(value),
            regressors: BTreeMap::new(),
        }
    }

    /// Create a row without ground truth.
    pub fn unobserved(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            value: None,
            regressors: BTreeMap::new(),
        }
    }

    pub fn with_regressor(mut self, name: impl Into<String>, value: f64) -> Self {
        self.regressors.insert(name.into(), value);
        self
    }

    pub fn regressor(&self, name: &str) -> Option<f64> {
        self.regressors.get(name).copied()
    }

    pub fn is_observed(&self) -> bool {
        self.value.is_some()
    }

    /// The observed value, or `MissingActual` for horizon rows.
    pub fn actual(&self) -> Result<f64> {
        self.value
            .ok_or(PipelineError::MissingActual(self.timestamp))
    }
}

/// Check that timestamps are strictly increasing (no duplicates, no reordering).
pub fn validate_ordering(rows: &[Observation]) -> Result<()> {
    for pair in rows.windows(2) {
        if pair[1].timestamp <= pair[0].timestamp {
            return Err(PipelineError::TimestampError(format!(
                "timestamps must be strictly increasing: {} follows {}",
                pair[1].timestamp, pair[0].timestamp
            )));
        }
    }
    Ok(())
}

/// Extract the observed values of `rows`, failing on the first row without one.
pub fn actuals(rows: &[Observation]) -> Result<Vec<f64>> {
    rows.iter().map(Observation::actual).collect()
}
