//! Union of independently built registries.

use crate::error::{PipelineError, Result};
use crate::registry::{id_after, Registry, RegistryEntry};
use std::collections::HashSet;
use tracing::debug;

/// Merge `registries` in argument order.
///
/// Entries keep their ids, labels and calibration state. Any id present in
/// two inputs fails the whole combination with `DuplicateModelId`; use
/// [`Registry::renumbered`] first when the inputs were numbered from the
/// same start.
pub fn combine(registries: &[&Registry]) -> Result<Registry> {
    if registries.is_empty() {
        return Err(PipelineError::EmptyData);
    }

    let capacity = registries.iter().map(|r| r.len()).sum();
    let mut seen = HashSet::with_capacity(capacity);
    let mut entries: Vec<RegistryEntry> = Vec::with_capacity(capacity);

    for registry in registries {
        for entry in registry.iter() {
            if !seen.insert(entry.id()) {
                return Err(PipelineError::DuplicateModelId(entry.id()));
            }
            entries.push(entry.clone());
        }
    }

    let mut next_id = registries.iter().map(|r| r.next_id().get()).max().unwrap_or(1);
    for entry in &entries {
        next_id = next_id.max(id_after(entry.id().get())?);
    }

    debug!(
        inputs = registries.len(),
        models = entries.len(),
        "combined registries"
    );
    Ok(Registry::from_entries(entries, next_id))
}
