//! Preprocessing transform chains.
//!
//! Models are fit on a transformed target (e.g. log then standardize). A
//! [`TransformChain`] declares those steps so forecasts can be mapped back
//! to the original scale. Every invertible step is monotone increasing, so
//! inversion keeps `lower <= point <= upper`.
//!
//! # Example
//!
//! ```
//! use anofox_ensemble::transform::{TransformChain, TransformStep};
//!
//! let chain = TransformChain::identity()
//!     .then(TransformStep::natural_log())
//!     .then(TransformStep::standardize(7.5, 0.4));
//!
//! let scaled = chain.apply(&[1800.0]).unwrap();
//! let restored = chain.inverse(&scaled).unwrap();
//! assert!((restored[0] - 1800.0).abs() < 1e-9);
//! ```

mod chain;
mod step;

pub use chain::TransformChain;
pub use step::{TransformKind, TransformStep};
