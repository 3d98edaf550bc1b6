//! Core data structures: observation rows, the train/test/horizon split,
//! backend predictions and the scale tag carried by forecast output.

mod observation;
mod prediction;
mod scale;
mod split;

pub use observation::{actuals, validate_ordering, Observation};
pub use prediction::Prediction;
pub use scale::Scale;
pub use split::Split;
