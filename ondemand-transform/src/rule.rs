use std::collections::{BTreeMap, btree_map};

use ondemand_core::{ParamError, ParamModel, compute_adjusted_value, drift};
use tracing::trace;

use crate::geometry::{Axis, Vertex};

/// An instruction for adjusting a single coordinate value.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serde-derive",
    derive(serde::Serialize, serde::Deserialize),
    serde(tag = "use", rename_all = "snake_case")
)]
pub enum Transform {
    /// Adds `factor` times the drift of `param` to the value.
    Add { param: String, factor: f64 },
}

impl Transform {
    /// Creates a [`Transform::Add`] instruction.
    pub fn add(param: impl Into<String>, factor: f64) -> Self {
        Self::Add {
            param: param.into(),
            factor,
        }
    }

    /// Returns the name of the parameter this transform depends on.
    #[must_use]
    pub fn param(&self) -> &str {
        match self {
            Self::Add { param, .. } => param,
        }
    }

    /// Applies the transform to `value` using the parameters of `model`.
    ///
    /// A unit factor is exactly [`compute_adjusted_value`].
    ///
    /// # Errors
    ///
    /// Returns a [`ParamError`] if the parameter is missing from the model.
    pub fn apply<M>(&self, model: &M, value: f64) -> Result<f64, ParamError>
    where
        M: ParamModel + ?Sized,
    {
        match self {
            Self::Add { param, factor } if *factor == 1.0 => {
                compute_adjusted_value(model, value, param)
            }
            Self::Add { param, factor } => Ok(value + factor * drift(model, param)?),
        }
    }
}

/// A transform bound to the axis it adjusts.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde-derive", derive(serde::Serialize, serde::Deserialize))]
pub struct Rule {
    pub axis: Axis,
    #[cfg_attr(feature = "serde-derive", serde(flatten))]
    pub transform: Transform,
}

impl Rule {
    #[must_use]
    pub fn new(axis: Axis, transform: Transform) -> Self {
        Self { axis, transform }
    }

    /// Returns the rule's key, `"{axis}_by_{param}"`.
    #[must_use]
    pub fn key(&self) -> String {
        format!("{}_by_{}", self.axis, self.transform.param())
    }
}

/// The rules attached to one vertex, keyed by [`Rule::key`].
///
/// At most one rule exists per axis and parameter pair. Deserialized maps are
/// re-keyed, so hand-written names such as `"legs"` are replaced by the rule's
/// key and a later entry for the same axis and parameter wins.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(
    feature = "serde-derive",
    derive(serde::Serialize, serde::Deserialize),
    serde(from = "BTreeMap<String, Rule>", into = "BTreeMap<String, Rule>")
)]
pub struct Rules(BTreeMap<String, Rule>);

impl Rules {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a rule, returning the rule it replaced if one had the same key.
    pub fn insert(&mut self, rule: Rule) -> Option<Rule> {
        self.0.insert(rule.key(), rule)
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Rule> {
        self.0.get(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Rule)> {
        self.0.iter().map(|(key, rule)| (key.as_str(), rule))
    }

    /// Applies every rule to the vertex.
    ///
    /// Contributions on the same axis accumulate.
    ///
    /// # Errors
    ///
    /// Returns the first [`ParamError`] raised by a rule whose parameter is
    /// missing from the model.
    pub fn apply<M>(&self, model: &M, vertex: Vertex) -> Result<Vertex, ParamError>
    where
        M: ParamModel + ?Sized,
    {
        let mut out = vertex;
        for (key, rule) in &self.0 {
            let before = out.get(rule.axis);
            let after = rule.transform.apply(model, before)?;
            trace!(rule = %key, before, after, "applied transform");
            out.set(rule.axis, after);
        }
        Ok(out)
    }
}

impl FromIterator<Rule> for Rules {
    fn from_iter<I: IntoIterator<Item = Rule>>(iter: I) -> Self {
        let mut rules = Self::new();
        rules.extend(iter);
        rules
    }
}

impl Extend<Rule> for Rules {
    fn extend<I: IntoIterator<Item = Rule>>(&mut self, iter: I) {
        for rule in iter {
            self.insert(rule);
        }
    }
}

impl From<BTreeMap<String, Rule>> for Rules {
    fn from(named: BTreeMap<String, Rule>) -> Self {
        named.into_values().collect()
    }
}

impl From<Rules> for BTreeMap<String, Rule> {
    fn from(rules: Rules) -> Self {
        rules.0
    }
}

impl IntoIterator for Rules {
    type Item = Rule;
    type IntoIter = btree_map::IntoValues<String, Rule>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_values()
    }
}

/// Inclusive coordinate limits, each axis optional.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(
    feature = "serde-derive",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct Bounds {
    pub x: Option<(f64, f64)>,
    pub y: Option<(f64, f64)>,
    pub z: Option<(f64, f64)>,
}

impl Bounds {
    /// Creates bounds that contain every vertex.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy limited to `[min, max]` along `axis`.
    #[must_use]
    pub fn with(mut self, axis: Axis, min: f64, max: f64) -> Self {
        let range = Some((min, max));
        match axis {
            Axis::X => self.x = range,
            Axis::Y => self.y = range,
            Axis::Z => self.z = range,
        }
        self
    }

    fn range(&self, axis: Axis) -> Option<(f64, f64)> {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z,
        }
    }

    /// Returns `true` if the vertex lies within every bounded axis.
    #[must_use]
    pub fn contains(&self, vertex: &Vertex) -> bool {
        Axis::ALL.into_iter().all(|axis| match self.range(axis) {
            Some((min, max)) => (min..=max).contains(&vertex.get(axis)),
            None => true,
        })
    }
}

/// Hand-authored rules that apply to vertices inside a region.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde-derive", derive(serde::Serialize, serde::Deserialize))]
pub struct BoundedRules {
    #[cfg_attr(feature = "serde-derive", serde(default))]
    pub bounds: Bounds,
    pub rules: Rules,
}

impl BoundedRules {
    #[must_use]
    pub fn new(bounds: Bounds, rules: Rules) -> Self {
        Self { bounds, rules }
    }

    /// Applies the rules if the vertex lies within the bounds, and returns
    /// it unchanged otherwise.
    ///
    /// # Errors
    ///
    /// Returns a [`ParamError`] if an applicable rule's parameter is missing
    /// from the model.
    pub fn apply<M>(&self, model: &M, vertex: Vertex) -> Result<Vertex, ParamError>
    where
        M: ParamModel + ?Sized,
    {
        if !self.bounds.contains(&vertex) {
            trace!(?vertex, "vertex outside bounds");
            return Ok(vertex);
        }
        self.rules.apply(model, vertex)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;
    use ondemand_core::{ParamSide, ParametricModel, Params};

    fn table(height: f64, width: f64) -> ParametricModel {
        let mut model = ParametricModel::new(Params::from([("height", 72.0), ("width", 120.0)]));
        model.set("height", height).unwrap();
        model.set("width", width).unwrap();
        model
    }

    #[test]
    fn add_scales_drift_by_factor() {
        let model = table(80.0, 120.0);

        let half = Transform::add("height", 0.5);
        assert_relative_eq!(half.apply(&model, 10.0).unwrap(), 14.0);

        let unit = Transform::add("height", 1.0);
        assert_relative_eq!(unit.apply(&model, 10.0).unwrap(), 18.0);
    }

    #[test]
    fn rule_key_names_axis_and_param() {
        let rule = Rule::new(Axis::Z, Transform::add("height", 1.0));

        assert_eq!(rule.key(), "z_by_height");
    }

    #[test]
    fn rules_accumulate_on_same_axis() {
        let model = table(80.0, 130.0);
        let rules: Rules = [
            Rule::new(Axis::X, Transform::add("height", 1.0)),
            Rule::new(Axis::X, Transform::add("width", 0.5)),
            Rule::new(Axis::Z, Transform::add("height", -1.0)),
        ]
        .into_iter()
        .collect();

        let moved = rules.apply(&model, Vertex::new(1.0, 2.0, 3.0)).unwrap();

        assert_relative_eq!(moved.x, 1.0 + 8.0 + 5.0);
        assert_relative_eq!(moved.y, 2.0);
        assert_relative_eq!(moved.z, 3.0 - 8.0);
    }

    #[test]
    fn inserting_same_key_replaces_rule() {
        let mut rules = Rules::new();
        rules.insert(Rule::new(Axis::Y, Transform::add("width", 1.0)));

        let replaced = rules.insert(Rule::new(Axis::Y, Transform::add("width", 2.0)));

        assert!(replaced.is_some());
        assert_eq!(rules.len(), 1);
        assert_eq!(
            rules.get("y_by_width").map(|rule| &rule.transform),
            Some(&Transform::add("width", 2.0))
        );
    }

    #[test]
    fn missing_parameter_fails_application() {
        let model = table(72.0, 120.0);
        let rules: Rules = [Rule::new(Axis::X, Transform::add("depth", 1.0))]
            .into_iter()
            .collect();

        let error = rules.apply(&model, Vertex::default()).unwrap_err();

        assert_eq!(
            error,
            ParamError::Missing {
                name: "depth".into(),
                side: ParamSide::Initial,
            }
        );
    }

    #[test]
    fn bounds_are_inclusive() {
        let bounds = Bounds::new().with(Axis::Y, 0.0, 10.0);

        assert!(bounds.contains(&Vertex::new(-100.0, 0.0, 5.0)));
        assert!(bounds.contains(&Vertex::new(0.0, 10.0, 0.0)));
        assert!(!bounds.contains(&Vertex::new(0.0, 10.5, 0.0)));
        assert!(Bounds::new().contains(&Vertex::new(1e9, -1e9, 0.0)));
    }

    #[test]
    fn bounded_rules_skip_vertices_outside_region() {
        let model = table(80.0, 120.0);
        let legs = BoundedRules::new(
            Bounds::new().with(Axis::Z, 0.0, 50.0),
            [Rule::new(Axis::Z, Transform::add("height", 1.0))]
                .into_iter()
                .collect(),
        );

        let inside = legs.apply(&model, Vertex::new(0.0, 0.0, 40.0)).unwrap();
        let outside = legs.apply(&model, Vertex::new(0.0, 0.0, 72.0)).unwrap();

        assert_relative_eq!(inside.z, 48.0);
        assert_eq!(outside, Vertex::new(0.0, 0.0, 72.0));
    }

    #[test]
    fn rule_collections_are_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}

        assert_send_sync::<Rule>();
        assert_send_sync::<Rules>();
        assert_send_sync::<BoundedRules>();
    }

    #[test]
    fn named_map_is_rekeyed() {
        let named = BTreeMap::from([(
            "legs".to_owned(),
            Rule::new(Axis::Z, Transform::add("height", 1.0)),
        )]);

        let rules = Rules::from(named);

        assert!(rules.get("legs").is_none());
        assert!(rules.get("z_by_height").is_some());
    }

    #[cfg(feature = "serde-derive")]
    #[test]
    fn deserialized_rules_keep_one_rule_per_axis_and_param() {
        let json = r#"{
            "legs": { "axis": "z", "use": "add", "param": "height", "factor": 1.0 }
        }"#;
        let mut rules: Rules = serde_json::from_str(json).unwrap();

        assert!(rules.get("z_by_height").is_some());

        let replaced = rules.insert(Rule::new(Axis::Z, Transform::add("height", 1.0)));
        assert!(replaced.is_some());
        assert_eq!(rules.len(), 1);

        let model = table(80.0, 120.0);
        let moved = rules.apply(&model, Vertex::new(0.0, 0.0, 72.0)).unwrap();
        assert_relative_eq!(moved.z, 80.0);
    }

    #[cfg(feature = "serde-derive")]
    #[test]
    fn rules_serialize_under_their_keys() {
        let rules: Rules = [Rule::new(Axis::X, Transform::add("width", 0.5))]
            .into_iter()
            .collect();

        let value = serde_json::to_value(&rules).unwrap();

        assert_eq!(
            value,
            serde_json::json!({
                "x_by_width": { "axis": "x", "use": "add", "param": "width", "factor": 0.5 }
            })
        );
    }

    #[cfg(feature = "serde-derive")]
    #[test]
    fn bounded_rules_from_json() {
        let json = r#"{
            "bounds": { "z": [0.0, 50.0] },
            "rules": {
                "z_by_height": { "axis": "z", "use": "add", "param": "height", "factor": 1.0 }
            }
        }"#;

        let parsed: BoundedRules = serde_json::from_str(json).unwrap();

        assert_eq!(parsed.bounds, Bounds::new().with(Axis::Z, 0.0, 50.0));
        assert_eq!(
            parsed.rules.get("z_by_height"),
            Some(&Rule::new(Axis::Z, Transform::add("height", 1.0)))
        );
    }
}
