//! Refit every model with its original hyperparameters on an expanded dataset.

use crate::core::{validate_ordering, Observation};
use crate::error::{ModelFailure, PipelineError, Result, Stage};
use crate::pipeline::executor::Executor;
use crate::registry::{ModelId, Registry, RegistryEntry};
use std::sync::Arc;
use tracing::{info, warn};

/// Refitted registry plus the models that could not be refit.
#[derive(Debug, Clone)]
pub struct RefitOutcome {
    /// Successfully refit models under their original ids and labels.
    pub registry: Registry,
    /// One failure per model dropped from `registry`, in registry order.
    pub dropped: Vec<ModelFailure>,
}

impl RefitOutcome {
    pub fn dropped_ids(&self) -> Vec<ModelId> {
        self.dropped.iter().map(|f| f.model_id).collect()
    }
}

/// Refit each entry of `registry` on `dataset`.
///
/// The returned registry carries no calibration state. Fails with
/// `AllRefitsFailed` when no entry could be refit.
pub fn refit(registry: &Registry, dataset: &[Observation], executor: &Executor) -> Result<RefitOutcome> {
    if registry.is_empty() || dataset.is_empty() {
        return Err(PipelineError::EmptyData);
    }
    validate_ordering(dataset)?;

    info!(models = registry.len(), rows = dataset.len(), "refitting registry");

    let rows = Arc::new(dataset.to_vec());
    let results = executor.run(registry.list(), move |handle| handle.refit(&rows));

    let mut entries: Vec<RegistryEntry> = Vec::with_capacity(registry.len());
    let mut dropped = Vec::new();
    for (entry, (_, result)) in registry.list().iter().zip(results) {
        match result {
            Ok(handle) => entries.push(entry.with_handle(handle)),
            Err(err) => {
                warn!(model_id = %entry.id(), label = entry.label(), error = %err, "refit failed");
                dropped.push(ModelFailure::new(entry.id(), entry.label(), Stage::Refit, err));
            }
        }
    }

    if entries.is_empty() {
        return Err(PipelineError::AllRefitsFailed {
            count: registry.len(),
        });
    }

    Ok(RefitOutcome {
        registry: Registry::from_entries(entries, registry.next_id().get()),
        dropped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::testing::{observed, FailingBackend, TrendBackend};
    use crate::models::{ARIMASpec, FitRequest, SharedBackend};
    use crate::pipeline::calibrate::calibrate;

    fn registry_of(backends: Vec<SharedBackend>) -> Registry {
        let mut registry = Registry::new();
        for backend in backends {
            registry
                .fit_and_register(backend, FitRequest::new(ARIMASpec::new(0, 1, 1)), &observed(0..10, |i| i as f64), None)
                .unwrap();
        }
        registry
    }

    #[test]
    fn refit_preserves_ids_and_labels() {
        let registry = registry_of(vec![
            Arc::new(TrendBackend::new()) as SharedBackend,
            Arc::new(TrendBackend::new().with_bias(1.0)) as SharedBackend,
        ]);
        let calibrated = calibrate(&registry, &observed(10..14, |i| i as f64), &Executor::sequential()).unwrap();

        let outcome = refit(&calibrated, &observed(0..14, |i| 2.0 * i as f64), &Executor::parallel()).unwrap();

        assert!(outcome.dropped.is_empty());
        assert_eq!(outcome.registry.ids(), calibrated.ids());
        assert_eq!(outcome.registry.list()[1].label(), calibrated.list()[1].label());
        assert_eq!(outcome.registry.calibrated_count(), 0);
        assert_eq!(outcome.registry.next_id(), calibrated.next_id());

        let p = outcome.registry.get(ModelId::new(1)).unwrap().predict(&observed(14..15, |_| 0.0)).unwrap();
        approx::assert_relative_eq!(p.point()[0], 28.0, epsilon = 1e-9);
    }

    #[test]
    fn refit_reports_exactly_the_failed_ids() {
        let registry = registry_of(vec![
            Arc::new(TrendBackend::new()) as SharedBackend,
            Arc::new(FailingBackend::beyond(10)) as SharedBackend,
            Arc::new(TrendBackend::new()) as SharedBackend,
        ]);

        let outcome = refit(&registry, &observed(0..14, |i| i as f64), &Executor::sequential()).unwrap();

        assert_eq!(outcome.dropped_ids(), vec![ModelId::new(2)]);
        assert_eq!(outcome.dropped[0].stage, Stage::Refit);
        assert!(matches!(outcome.dropped[0].error, PipelineError::FitFailure(_)));
        assert_eq!(outcome.registry.ids(), vec![ModelId::new(1), ModelId::new(3)]);
    }

    #[test]
    fn all_failures_abort_the_stage() {
        let registry = registry_of(vec![
            Arc::new(FailingBackend::beyond(10)) as SharedBackend,
            Arc::new(FailingBackend::beyond(10)) as SharedBackend,
        ]);
        assert_eq!(
            refit(&registry, &observed(0..12, |_| 1.0), &Executor::sequential()).unwrap_err(),
            PipelineError::AllRefitsFailed { count: 2 }
        );
    }

    #[test]
    fn refit_rejects_unordered_data() {
        let registry = registry_of(vec![Arc::new(TrendBackend::new()) as SharedBackend]);
        let mut rows = observed(0..5, |i| i as f64);
        rows.swap(1, 2);
        assert!(matches!(
            refit(&registry, &rows, &Executor::sequential()),
            Err(PipelineError::TimestampError(_))
        ));
    }
}
