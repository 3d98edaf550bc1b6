//! Pipeline stages: calibrate, score, combine, refit, forecast, invert.
//!
//! Each stage is a pure function from a prior artifact plus its input to a
//! new artifact. [`Pipeline`] binds them to one [`PipelineConfig`].
//!
//! # Example
//!
//! ```ignore
//! use anofox_ensemble::prelude::*;
//!
//! let bundle = ArtifactBundle::from_path("revenue.json")?;
//! let mut registry = Registry::new();
//! registry.fit_and_register(arima_backend, FitRequest::new(ARIMASpec::auto(5, 2, 5)), bundle.split().training(), None)?;
//! registry.fit_and_register(ets_backend, FitRequest::new(ETSSpec::aadn()), bundle.split().training(), None)?;
//!
//! let report = Pipeline::new(PipelineConfig::default())?.run(&registry, &bundle)?;
//! for record in &report.accuracy {
//!     println!("{} rmse={:.3} mape={}", record.label, record.metrics.rmse, record.metrics.mape);
//! }
//! ```

pub mod accuracy;
pub mod calibrate;
pub mod combine;
pub mod executor;
pub mod forecast;
pub mod refit;

pub use accuracy::{accuracy, calculate_metrics, AccuracyMetrics, AccuracyRecord, Metric};
pub use calibrate::calibrate;
pub use combine::combine;
pub use executor::Executor;
pub use forecast::{forecast, ForecastOptions, ForecastRecord, ForecastSet, IntervalMethod};
pub use refit::{refit, RefitOutcome};

use crate::bundle::ArtifactBundle;
use crate::config::PipelineConfig;
use crate::core::{Observation, Scale, Split};
use crate::error::{ModelFailure, Result};
use crate::registry::Registry;
use crate::transform::TransformChain;
use tracing::info;

/// Stage driver bound to one configuration.
#[derive(Debug, Clone, Copy)]
pub struct Pipeline {
    config: PipelineConfig,
    executor: Executor,
}

/// Artifacts of a full [`Pipeline::run`].
#[derive(Debug, Clone)]
pub struct PipelineReport {
    /// Registry calibrated on the testing window.
    pub calibrated: Registry,
    /// Holdout accuracy, one record per calibrated model.
    pub accuracy: Vec<AccuracyRecord>,
    /// Holdout forecast on the original scale, with actuals.
    pub holdout: ForecastSet,
    /// Models refit on the full dataset.
    pub refit: Registry,
    /// Models that could not be refit.
    pub refit_failures: Vec<ModelFailure>,
    /// Future-horizon forecast on the original scale; `None` without a horizon.
    pub future: Option<ForecastSet>,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            executor: config.executor(),
            config,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn executor(&self) -> &Executor {
        &self.executor
    }

    /// Calibrate `registry` on the testing window of `split`.
    pub fn calibrate(&self, registry: &Registry, split: &Split) -> Result<Registry> {
        calibrate(registry, split.testing(), &self.executor)
    }

    pub fn accuracy(&self, registry: &Registry) -> Vec<AccuracyRecord> {
        accuracy(registry)
    }

    pub fn combine(&self, registries: &[&Registry]) -> Result<Registry> {
        combine(registries)
    }

    pub fn refit(&self, registry: &Registry, dataset: &[Observation]) -> Result<RefitOutcome> {
        refit(registry, dataset, &self.executor)
    }

    /// Forecast `rows` on the transformed scale the models were fit on.
    pub fn forecast(&self, registry: &Registry, rows: &[Observation]) -> Result<ForecastSet> {
        forecast(
            registry,
            rows,
            Scale::Transformed,
            &self.config.forecast_options(),
            &self.executor,
        )
    }

    pub fn invert(&self, set: &ForecastSet, chain: &TransformChain) -> Result<ForecastSet> {
        chain.invert(set)
    }

    /// Run every stage over a registry fit on the bundle's training window.
    ///
    /// Future intervals are sized from the holdout residuals of the
    /// pre-refit models.
    pub fn run(&self, registry: &Registry, bundle: &ArtifactBundle) -> Result<PipelineReport> {
        let split = bundle.split();
        let chain = bundle.transform();

        let calibrated = self.calibrate(registry, split)?;
        let accuracy = self.accuracy(&calibrated);
        let holdout = self.invert(&self.forecast(&calibrated, split.testing())?, chain)?;

        let RefitOutcome {
            registry: refit,
            dropped: refit_failures,
        } = self.refit(&calibrated, &bundle.full_dataset())?;

        let future = if bundle.future().is_empty() {
            None
        } else {
            let adopted = refit.adopt_calibration(&calibrated);
            Some(self.invert(&self.forecast(&adopted, bundle.future())?, chain)?)
        };

        info!(
            models = registry.len(),
            calibrated = calibrated.calibrated_count(),
            refit = refit.len(),
            future_records = future.as_ref().map_or(0, |f| f.records().len()),
            "pipeline run complete"
        );

        Ok(PipelineReport {
            calibrated,
            accuracy,
            holdout,
            refit,
            refit_failures,
            future,
        })
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        let config = PipelineConfig::default();
        Self {
            executor: config.executor(),
            config,
        }
    }
}
