//! Persisted input bundle: dataset, split, future horizon and transform chain.
//!
//! Loaded once and validated on load; every accessor hands out read-only
//! views.
//!
//! ```json
//! {
//!   "dataset": [{"timestamp": "2024-01-01T00:00:00Z", "value": 7.1}, ...],
//!   "split": {"training": [...], "testing": [...]},
//!   "future": [{"timestamp": "2024-03-01T00:00:00Z", "regressors": {"promo": 1.0}}],
//!   "transform": [{"kind": "log", "base": 2.718281828459045}]
//! }
//! ```

use crate::core::{validate_ordering, Observation, Split};
use crate::error::{PipelineError, Result};
use crate::transform::TransformChain;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::debug;

/// Validated artifact bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BundleDocument", into = "BundleDocument")]
pub struct ArtifactBundle {
    dataset: Vec<Observation>,
    split: Split,
    transform: TransformChain,
}

#[derive(Serialize, Deserialize)]
struct BundleDocument {
    dataset: Vec<Observation>,
    split: SplitDocument,
    #[serde(default)]
    future: Vec<Observation>,
    #[serde(default)]
    transform: TransformChain,
}

#[derive(Serialize, Deserialize)]
struct SplitDocument {
    training: Vec<Observation>,
    testing: Vec<Observation>,
}

impl TryFrom<BundleDocument> for ArtifactBundle {
    type Error = PipelineError;

    fn try_from(doc: BundleDocument) -> Result<Self> {
        let split = Split::new(doc.split.training, doc.split.testing, doc.future)?;
        ArtifactBundle::new(doc.dataset, split, doc.transform)
    }
}

impl From<ArtifactBundle> for BundleDocument {
    fn from(bundle: ArtifactBundle) -> Self {
        Self {
            dataset: bundle.dataset,
            split: SplitDocument {
                training: bundle.split.training().to_vec(),
                testing: bundle.split.testing().to_vec(),
            },
            future: bundle.split.horizon().to_vec(),
            transform: bundle.transform,
        }
    }
}

impl ArtifactBundle {
    /// Assemble a bundle, checking that the dataset is time-ordered and
    /// that every split row is drawn from it.
    pub fn new(dataset: Vec<Observation>, split: Split, transform: TransformChain) -> Result<Self> {
        if dataset.is_empty() {
            return Err(PipelineError::EmptyData);
        }
        validate_ordering(&dataset)?;

        let known: HashSet<DateTime<Utc>> = dataset.iter().map(|r| r.timestamp).collect();
        if let Some(row) = split.full().iter().find(|r| !known.contains(&r.timestamp)) {
            return Err(PipelineError::Bundle(format!(
                "split row at {} is not part of the dataset",
                row.timestamp
            )));
        }

        Ok(Self {
            dataset,
            split,
            transform,
        })
    }

    /// Parse a JSON bundle.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let bundle: Self =
            serde_json::from_reader(reader).map_err(|e| PipelineError::Bundle(e.to_string()))?;
        debug!(
            rows = bundle.dataset.len(),
            training = bundle.split.training().len(),
            testing = bundle.split.testing().len(),
            horizon = bundle.split.horizon().len(),
            transform_steps = bundle.transform.len(),
            "loaded artifact bundle"
        );
        Ok(bundle)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .map_err(|e| PipelineError::Bundle(format!("{}: {}", path.display(), e)))?;
        Self::from_reader(BufReader::new(file))
    }

    pub fn dataset(&self) -> &[Observation] {
        &self.dataset
    }

    pub fn split(&self) -> &Split {
        &self.split
    }

    /// Future horizon rows (timestamps and regressors only).
    pub fn future(&self) -> &[Observation] {
        self.split.horizon()
    }

    pub fn transform(&self) -> &TransformChain {
        &self.transform
    }

    /// Every observed dataset row, for the refit stage.
    ///
    /// Covers training and testing plus any rows observed after the testing
    /// window.
    pub fn full_dataset(&self) -> Vec<Observation> {
        self.dataset
            .iter()
            .filter(|r| r.value.is_some())
            .cloned()
            .collect()
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| PipelineError::Bundle(e.to_string()))
    }
}
