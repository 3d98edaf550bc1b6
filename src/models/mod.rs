//! Model handles, family specifications and the backend contract.

mod handle;
mod spec;
mod traits;

#[cfg(test)]
pub(crate) mod testing;

pub use handle::ModelHandle;
pub use spec::{
    ARIMASpec, ETSSpec, ErrorType, Growth, ModelFamily, ModelSpec, ProphetSpec, SeasonalOrder,
    SeasonalType, SeasonalityMode, TrendType,
};
pub use traits::{FitRequest, FittedModel, ModelBackend, SharedBackend};
