//! Holdout calibration: predict the testing window with every model and
//! keep actual/predicted/residual triples.

use crate::core::{actuals, validate_ordering, Observation};
use crate::error::{PipelineError, Result};
use crate::pipeline::executor::Executor;
use crate::registry::{Calibration, CalibrationRecord, CalibrationState, Registry, RegistryEntry};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Calibrate every entry of `registry` against the `testing` window.
///
/// Returns a new registry whose entries carry either their calibration
/// records or the captured cause of their failure. Prior calibration state
/// is replaced. Fails with `AllCalibrationsFailed` only when no entry
/// could be calibrated.
pub fn calibrate(
    registry: &Registry,
    testing: &[Observation],
    executor: &Executor,
) -> Result<Registry> {
    if registry.is_empty() || testing.is_empty() {
        return Err(PipelineError::EmptyData);
    }
    validate_ordering(testing)?;
    let observed = actuals(testing)?;

    info!(
        models = registry.len(),
        rows = testing.len(),
        "calibrating registry on testing window"
    );

    let rows = Arc::new(testing.to_vec());
    let task_rows = Arc::clone(&rows);
    let results = executor.run(registry.list(), move |handle| handle.predict(&task_rows));

    let entries: Vec<RegistryEntry> = registry
        .list()
        .iter()
        .zip(results)
        .map(|(entry, (_, result))| {
            let built = result
                .map_err(|err| as_calibration_failure(entry, err))
                .and_then(|p| build_records(entry, &rows, &observed, p.point()));
            let state = match built {
                Ok(records) => {
                    debug!(model_id = %entry.id(), records = records.len(), "model calibrated");
                    CalibrationState::Calibrated(Arc::new(Calibration::new(records)))
                }
                Err(err) => {
                    warn!(model_id = %entry.id(), label = entry.label(), error = %err, "calibration failed");
                    CalibrationState::Failed(err)
                }
            };
            entry.with_calibration(state)
        })
        .collect();

    let calibrated = Registry::from_entries(entries, registry.next_id().get());
    if calibrated.calibrated_count() == 0 {
        return Err(PipelineError::AllCalibrationsFailed {
            count: registry.len(),
        });
    }
    Ok(calibrated)
}

/// Backend errors surface as `CalibrationFailure`; timeouts and panics keep
/// their own variants.
fn as_calibration_failure(entry: &RegistryEntry, err: PipelineError) -> PipelineError {
    match err {
        PipelineError::CalibrationFailure(_)
        | PipelineError::Timeout { .. }
        | PipelineError::BackendPanicked(_) => err,
        other => PipelineError::CalibrationFailure(format!(
            "{}: {}",
            entry.handle().backend_name(),
            other
        )),
    }
}

fn build_records(
    entry: &RegistryEntry,
    rows: &[Observation],
    observed: &[f64],
    predicted: &[f64],
) -> Result<Vec<CalibrationRecord>> {
    rows.iter()
        .zip(observed)
        .zip(predicted)
        .map(|((row, &actual), &prediction)| {
            if !prediction.is_finite() {
                return Err(PipelineError::CalibrationFailure(format!(
                    "non-finite prediction {} at {}",
                    prediction, row.timestamp
                )));
            }
            Ok(CalibrationRecord::new(entry.id(), row.timestamp, actual, prediction))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::testing::{observed, FailingBackend, PanickingBackend, TrendBackend};
    use crate::models::{ETSSpec, FitRequest, SharedBackend};
    use crate::registry::ModelId;

    fn registry_of(backends: Vec<SharedBackend>) -> Registry {
        let mut registry = Registry::new();
        for backend in backends {
            registry
                .fit_and_register(backend, FitRequest::new(ETSSpec::aan()), &observed(0..10, |i| i as f64), None)
                .unwrap();
        }
        registry
    }

    #[test]
    fn calibrate_records_one_triple_per_timestamp() {
        let registry = registry_of(vec![Arc::new(TrendBackend::new().with_bias(1.0)) as SharedBackend]);
        let testing = observed(10..14, |i| i as f64 + 0.5);

        let calibrated = calibrate(&registry, &testing, &Executor::sequential()).unwrap();
        let records = calibrated.calibration_records();

        assert_eq!(records.len(), 4);
        for (record, row) in records.iter().zip(&testing) {
            assert_eq!(record.model_id, ModelId::new(1));
            assert_eq!(record.timestamp, row.timestamp);
            approx::assert_relative_eq!(record.residual, -0.5, epsilon = 1e-9);
            approx::assert_relative_eq!(record.actual - record.predicted, record.residual);
        }
        // input registry is untouched
        assert_eq!(registry.calibrated_count(), 0);
    }

    #[test]
    fn failing_model_is_isolated() {
        let registry = registry_of(vec![
            Arc::new(TrendBackend::new()) as SharedBackend,
            Arc::new(FailingBackend::on_predict()) as SharedBackend,
            Arc::new(FailingBackend::non_finite()) as SharedBackend,
        ]);
        let testing = observed(10..13, |i| i as f64);

        let calibrated = calibrate(&registry, &testing, &Executor::parallel()).unwrap();
        assert_eq!(calibrated.calibrated_count(), 1);

        let failures = calibrated.calibration_failures();
        let failed_ids: Vec<_> = failures.iter().map(|f| f.model_id).collect();
        assert_eq!(failed_ids, vec![ModelId::new(2), ModelId::new(3)]);
        assert!(matches!(&failures[0].error, PipelineError::CalibrationFailure(msg) if msg.contains("forecast diverged")));
        assert!(matches!(failures[1].error, PipelineError::CalibrationFailure(_)));
    }

    #[test]
    fn panics_keep_their_own_variant() {
        let registry = registry_of(vec![
            Arc::new(TrendBackend::new()) as SharedBackend,
            Arc::new(PanickingBackend) as SharedBackend,
        ]);
        let calibrated = calibrate(&registry, &observed(10..12, |i| i as f64), &Executor::sequential()).unwrap();
        let failures = calibrated.calibration_failures();
        assert!(matches!(&failures[0].error, PipelineError::BackendPanicked(msg) if msg.contains("singular matrix")));
    }

    #[test]
    fn all_failures_abort_the_stage() {
        let registry = registry_of(vec![
            Arc::new(FailingBackend::on_predict()) as SharedBackend,
            Arc::new(FailingBackend::on_predict()) as SharedBackend,
        ]);
        let result = calibrate(&registry, &observed(10..12, |_| 1.0), &Executor::sequential());
        assert_eq!(result.unwrap_err(), PipelineError::AllCalibrationsFailed { count: 2 });
    }

    #[test]
    fn recalibration_replaces_previous_records() {
        let registry = registry_of(vec![Arc::new(TrendBackend::new()) as SharedBackend]);
        let first = calibrate(&registry, &observed(10..13, |i| i as f64), &Executor::sequential()).unwrap();
        let second = calibrate(&first, &observed(10..12, |i| i as f64 + 2.0), &Executor::sequential()).unwrap();

        let residuals = second.calibration(ModelId::new(1)).unwrap().residuals();
        assert_eq!(residuals.len(), 2);
        assert!(residuals.iter().all(|r| (r - 2.0).abs() < 1e-9));
    }

    #[test]
    fn testing_rows_must_be_observed() {
        let registry = registry_of(vec![Arc::new(TrendBackend::new()) as SharedBackend]);
        let mut testing = observed(10..12, |i| i as f64);
        testing[1].value = None;
        assert!(matches!(
            calibrate(&registry, &testing, &Executor::sequential()),
            Err(PipelineError::MissingActual(_))
        ));
        assert_eq!(
            calibrate(&registry, &[], &Executor::sequential()).unwrap_err(),
            PipelineError::EmptyData
        );
    }
}
