//! # anofox-ensemble
//!
//! Multi-model calibration and ensembling pipeline for time series
//! forecasts.
//!
//! Heterogeneous fitted models (ARIMA, Prophet and exponential smoothing
//! variants behind one backend contract) are collected in a registry,
//! calibrated on a holdout window, scored with uniform accuracy metrics,
//! combined across registries, refit on the full dataset and forecast over
//! a future horizon. Forecasts are finally mapped back through the
//! preprocessing transform chain to the original scale.

// Allow some clippy warnings for cleaner code in specific cases
#![allow(clippy::upper_case_acronyms)]
#![allow(clippy::too_many_arguments)]
#![allow(clippy::type_complexity)]

pub mod bundle;
pub mod config;
pub mod core;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod registry;
pub mod transform;
pub mod utils;

pub use error::{PipelineError, Result};

pub mod prelude {
    pub use crate::bundle::ArtifactBundle;
    pub use crate::config::PipelineConfig;
    pub use crate::core::{Observation, Prediction, Scale, Split};
    pub use crate::error::{ModelFailure, PipelineError, Result, Stage};
    pub use crate::models::{
        ARIMASpec, ETSSpec, FitRequest, FittedModel, ModelBackend, ModelHandle, ModelSpec,
        ProphetSpec, SharedBackend,
    };
    pub use crate::pipeline::{
        AccuracyRecord, Executor, ForecastSet, IntervalMethod, Metric, Pipeline, PipelineReport,
    };
    pub use crate::registry::{ModelId, Registry};
    pub use crate::transform::{TransformChain, TransformStep};
}
