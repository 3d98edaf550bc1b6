//! Utility functions shared by the pipeline stages.

pub mod stats;

pub use stats::normal_multiplier;
