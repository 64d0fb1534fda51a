//! Parameter models and drift-adjusted values for parametric geometry.
//!
//! A parametric model records every parameter twice: the value it had when the
//! geometry was exported (`initial_params`) and the value it has now
//! (`current_params`). The difference between the two is the parameter's
//! drift, and [`compute_adjusted_value`] shifts a base value by that drift.

mod adjust;
mod error;
mod model;

pub mod params;

pub use adjust::{adjusted_or_nan, compute_adjusted_value, drift};
pub use error::{ParamError, ParamSide};
pub use model::{ParamModel, ParametricModel};
pub use params::{ParamMap, Params};
