//! Length units and parametric transformation rules for `ondemand` models.
//!
//! Geometry exported from a parametric design is made adjustable by attaching
//! [`Transform`] rules to each vertex coordinate. A rule shifts a coordinate
//! in proportion to the drift of one parameter, so changing the parameter on
//! an [`ondemand_core::ParametricModel`] reshapes the geometry.
//!
//! Rules are either authored by hand ([`BoundedRules`]) or derived by
//! comparing a base export with one in which a single parameter was changed
//! (see [`derive`]). The [`export`] module reads OBJ and STL exports into
//! vertex nodes, attaches derived rules, and writes them back out for a given
//! model.

mod config;
mod geometry;
mod rule;

pub mod derive;
pub mod export;
pub mod units;

pub use config::{ConfigError, DeriveConfig};
pub use geometry::{Axis, Vertex};
pub use rule::{BoundedRules, Bounds, Rule, Rules, Transform};
pub use units::{LengthUnit, UnitError};
