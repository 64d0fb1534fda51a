//! Derivation of transformation rules from comparison exports.
//!
//! A design is exported twice: once with every parameter at its initial value
//! and once more per parameter, with only that parameter moved to its
//! comparison value. Any coordinate that differs between the two exports
//! depends on the parameter, and the size of the difference relative to the
//! parameter change gives the rule's factor.
//!
//! Exports are compared vertex by vertex, so both must list the same vertices
//! in the same order.
//!
//! Factors keep their sign for negative coordinates. Earlier generators
//! negated the factor when the base coordinate was below zero; here a rule
//! applied at the comparison value always lands on the comparison export's
//! coordinate.

use std::collections::BTreeMap;

use ondemand_core::{ParametricModel, Params};
use thiserror::Error;
use tracing::{debug, warn};

use crate::{
    config::DeriveConfig,
    geometry::{Axis, Vertex},
    rule::{Rule, Rules, Transform},
    units::{LengthUnit, convert},
};

/// The definition of a design parameter.
///
/// Values are given in `units` when set, and taken to already be in geometry
/// units otherwise.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde-derive", derive(serde::Serialize, serde::Deserialize))]
pub struct ParameterDef {
    pub initial_value: f64,
    pub comparison_value: f64,
    #[cfg_attr(feature = "serde-derive", serde(default))]
    pub units: Option<LengthUnit>,
}

impl ParameterDef {
    #[must_use]
    pub fn new(initial_value: f64, comparison_value: f64) -> Self {
        Self {
            initial_value,
            comparison_value,
            units: None,
        }
    }

    /// Returns a copy whose values are expressed in `units`.
    #[must_use]
    pub fn with_units(self, units: LengthUnit) -> Self {
        Self {
            units: Some(units),
            ..self
        }
    }

    /// Returns the initial value converted to `units`.
    #[must_use]
    pub fn initial_in(&self, units: LengthUnit) -> f64 {
        self.convert_to(self.initial_value, units)
    }

    /// Returns the comparison value converted to `units`.
    #[must_use]
    pub fn comparison_in(&self, units: LengthUnit) -> f64 {
        self.convert_to(self.comparison_value, units)
    }

    fn convert_to(&self, value: f64, units: LengthUnit) -> f64 {
        match self.units {
            Some(from) => convert(value, from, units),
            None => value,
        }
    }
}

/// Errors that can occur when deriving rules.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeriveError {
    /// The parameter's comparison value equals its initial value, so no
    /// factor can be derived.
    #[error("parameter `{param}` has the same initial and comparison value")]
    ZeroChange { param: String },

    #[error("comparison export for `{param}` has {actual} vertices, expected {expected}")]
    VertexCountMismatch {
        param: String,
        expected: usize,
        actual: usize,
    },

    #[error("comparison export given for undefined parameter `{0}`")]
    UnknownParam(String),
}

/// Derives the rules for a single vertex.
///
/// # Errors
///
/// Returns [`DeriveError::ZeroChange`] if the parameter does not change
/// between its initial and comparison values.
pub fn derive_rules(
    param: &str,
    def: &ParameterDef,
    base: &Vertex,
    comparison: &Vertex,
    config: &DeriveConfig,
) -> Result<Rules, DeriveError> {
    let change = parameter_change(param, def, config)?;
    Ok(vertex_rules(param, change, base, comparison, config))
}

/// Derives the rules for every vertex of a base export.
///
/// The result holds one [`Rules`] per base vertex, in order.
///
/// # Errors
///
/// Returns an error if the exports differ in length or the parameter does not
/// change.
pub fn derive_all(
    param: &str,
    def: &ParameterDef,
    base: &[Vertex],
    comparison: &[Vertex],
    config: &DeriveConfig,
) -> Result<Vec<Rules>, DeriveError> {
    if base.len() != comparison.len() {
        return Err(DeriveError::VertexCountMismatch {
            param: param.to_owned(),
            expected: base.len(),
            actual: comparison.len(),
        });
    }
    let change = parameter_change(param, def, config)?;

    Ok(base
        .iter()
        .zip(comparison)
        .map(|(base, comparison)| vertex_rules(param, change, base, comparison, config))
        .collect())
}

/// Derives and merges the rules of every parameter with a comparison export.
///
/// Defined parameters without a comparison export contribute no rules.
///
/// # Errors
///
/// Returns an error if a comparison export names an undefined parameter, or
/// if deriving any parameter's rules fails.
pub fn derive_model(
    defs: &BTreeMap<String, ParameterDef>,
    base: &[Vertex],
    comparisons: &BTreeMap<String, Vec<Vertex>>,
    config: &DeriveConfig,
) -> Result<Vec<Rules>, DeriveError> {
    let mut merged = vec![Rules::new(); base.len()];

    for (param, comparison) in comparisons {
        let def = defs
            .get(param)
            .ok_or_else(|| DeriveError::UnknownParam(param.clone()))?;
        let derived = derive_all(param, def, base, comparison, config)?;
        for (rules, new) in merged.iter_mut().zip(derived) {
            rules.extend(new);
        }
    }

    debug!(
        params = comparisons.len(),
        vertices = base.len(),
        "derived rules for model"
    );
    Ok(merged)
}

/// Builds a model with every parameter at its initial value, in geometry units.
#[must_use]
pub fn initial_model(
    defs: &BTreeMap<String, ParameterDef>,
    config: &DeriveConfig,
) -> ParametricModel {
    let units = config.geometry_units();
    ParametricModel::new(
        defs
            .iter()
            .map(|(name, def)| (name.as_str(), def.initial_in(units)))
            .collect::<Params>(),
    )
}

fn parameter_change(
    param: &str,
    def: &ParameterDef,
    config: &DeriveConfig,
) -> Result<f64, DeriveError> {
    let units = config.geometry_units();
    let change = def.comparison_in(units) - def.initial_in(units);

    if change == 0.0 {
        warn!(param, "comparison value equals initial value");
        return Err(DeriveError::ZeroChange {
            param: param.to_owned(),
        });
    }
    Ok(change)
}

fn vertex_rules(
    param: &str,
    change: f64,
    base: &Vertex,
    comparison: &Vertex,
    config: &DeriveConfig,
) -> Rules {
    Axis::ALL
        .into_iter()
        .filter_map(|axis| {
            let moved = comparison.get(axis) - base.get(axis);
            if moved.abs() <= config.tolerance() {
                return None;
            }
            let factor = moved / change;
            debug!(param, %axis, factor, "derived transform");
            Some(Rule::new(axis, Transform::add(param, factor)))
        })
        .collect()
}
