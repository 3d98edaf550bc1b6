//! Model registry: the ordered table of fitted models every pipeline stage
//! consumes and produces.
//!
//! Entries are immutable once registered. Stages never patch a registry in
//! place; they return a new one (calibrated, refit, combined).
//!
//! # Example
//!
//! ```ignore
//! use anofox_ensemble::models::{ARIMASpec, FitRequest};
//! use anofox_ensemble::registry::Registry;
//!
//! let mut registry = Registry::new();
//! let id = registry.fit_and_register(backend, FitRequest::new(ARIMASpec::new(1, 1, 1)), split.training(), None)?;
//! assert_eq!(registry.get(id)?.spec().to_string(), "ARIMA(1,1,1)");
//! ```

mod entry;

pub use entry::{Calibration, CalibrationRecord, CalibrationState, ModelId, RegistryEntry};

use crate::core::Observation;
use crate::error::{ModelFailure, PipelineError, Result, Stage};
use crate::models::{FitRequest, ModelHandle, SharedBackend};
use std::sync::Arc;

/// Ordered collection of fitted models with unique ids.
#[derive(Debug, Clone)]
pub struct Registry {
    entries: Vec<RegistryEntry>,
    next_id: u32,
}

impl Registry {
    /// Create an empty registry whose first id is 1.
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    /// Create an empty registry whose first id is `first_id`.
    ///
    /// Registries built independently and combined later need disjoint id
    /// ranges; the combiner never renumbers.
    pub fn starting_at(first_id: u32) -> Self {
        Self {
            entries: Vec::new(),
            next_id: first_id,
        }
    }

    pub(crate) fn from_entries(entries: Vec<RegistryEntry>, next_id: u32) -> Self {
        Self { entries, next_id }
    }

    /// Register a fitted model and return its newly assigned id.
    ///
    /// Fails with `InvalidParameter` once the id space is exhausted.
    pub fn register(&mut self, handle: ModelHandle, label: impl Into<String>) -> Result<ModelId> {
        let id = ModelId::new(self.next_id);
        self.next_id = id_after(self.next_id)?;
        self.entries.push(RegistryEntry::new(id, label.into(), handle));
        Ok(id)
    }

    /// Fit `request` on `rows` and register the result.
    ///
    /// The label defaults to the model spec's conventional name, e.g.
    /// `ARIMA(1,1,1)(0,1,1)[12]`.
    pub fn fit_and_register(
        &mut self,
        backend: SharedBackend,
        request: FitRequest,
        rows: &[Observation],
        label: Option<&str>,
    ) -> Result<ModelId> {
        let label = label
            .map(str::to_string)
            .unwrap_or_else(|| request.spec.to_string());
        let handle = ModelHandle::fit(backend, request, rows)?;
        self.register(handle, label)
    }

    pub fn get(&self, id: ModelId) -> Result<&ModelHandle> {
        self.entry(id).map(RegistryEntry::handle)
    }

    pub fn entry(&self, id: ModelId) -> Result<&RegistryEntry> {
        self.entries
            .iter()
            .find(|e| e.id() == id)
            .ok_or(PipelineError::UnknownModel(id))
    }

    /// Entries in display order.
    pub fn list(&self) -> &[RegistryEntry] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &RegistryEntry> {
        self.entries.iter()
    }

    pub fn ids(&self) -> Vec<ModelId> {
        self.entries.iter().map(RegistryEntry::id).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The id the next `register` call will assign.
    pub fn next_id(&self) -> ModelId {
        ModelId::new(self.next_id)
    }

    /// Copy of this registry with ids reassigned sequentially from `first_id`,
    /// keeping order, labels and calibration state.
    pub fn renumbered(&self, first_id: u32) -> Result<Registry> {
        let next_id = u32::try_from(self.entries.len())
            .ok()
            .and_then(|n| first_id.checked_add(n))
            .ok_or_else(|| {
                PipelineError::InvalidParameter(format!(
                    "{} models do not fit in the id range starting at {}",
                    self.entries.len(),
                    first_id
                ))
            })?;
        let entries: Vec<RegistryEntry> = self
            .entries
            .iter()
            .zip(first_id..next_id)
            .map(|(entry, id)| entry.with_id(ModelId::new(id)))
            .collect();
        Ok(Registry::from_entries(entries, next_id))
    }

    /// Copy of this registry whose entries take the calibration of the
    /// entry with the same id in `source`.
    ///
    /// Used after a refit to size future intervals from the holdout
    /// residuals of the pre-refit models. Ids absent from `source`, or not
    /// calibrated there, become uncalibrated.
    pub fn adopt_calibration(&self, source: &Registry) -> Registry {
        let entries = self
            .entries
            .iter()
            .map(|entry| {
                let state = match source.entry(entry.id()) {
                    Ok(other) if other.calibration().is_calibrated() => {
                        other.calibration().clone()
                    }
                    _ => CalibrationState::Uncalibrated,
                };
                entry.with_calibration(state)
            })
            .collect();
        Registry::from_entries(entries, self.next_id)
    }

    /// All calibration records, grouped by entry in registry order.
    pub fn calibration_records(&self) -> Vec<CalibrationRecord> {
        self.entries
            .iter()
            .filter_map(|e| e.calibration().calibration())
            .flat_map(|c| c.records().iter().copied())
            .collect()
    }

    /// Calibration records of a single model.
    pub fn calibration(&self, id: ModelId) -> Result<Arc<Calibration>> {
        match self.entry(id)?.calibration() {
            CalibrationState::Calibrated(c) => Ok(Arc::clone(c)),
            _ => Err(PipelineError::NotCalibrated(id)),
        }
    }

    /// Entries whose calibration failed, with their captured cause.
    pub fn calibration_failures(&self) -> Vec<ModelFailure> {
        self.entries
            .iter()
            .filter_map(|e| match e.calibration() {
                CalibrationState::Failed(err) => Some(ModelFailure::new(
                    e.id(),
                    e.label(),
                    Stage::Calibration,
                    err.clone(),
                )),
                _ => None,
            })
            .collect()
    }

    /// Number of entries carrying calibration records.
    pub fn calibrated_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.calibration().is_calibrated())
            .count()
    }
}

/// The id following `id`, or `InvalidParameter` at the end of the id space.
pub(crate) fn id_after(id: u32) -> Result<u32> {
    id.checked_add(1).ok_or_else(|| {
        PipelineError::InvalidParameter(format!("model id space exhausted after {}", id))
    })
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
