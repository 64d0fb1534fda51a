//! Named parameter maps.

use std::{
    collections::{BTreeMap, HashMap},
    hash::BuildHasher,
};

/// A read-only mapping from parameter name to numeric value.
///
/// Implemented for the standard string-keyed maps and for [`Params`], so a
/// model can store its parameters in whichever container suits it.
pub trait ParamMap {
    /// Returns the value of the named parameter, or `None` if it is absent.
    fn get(&self, name: &str) -> Option<f64>;
}

impl<S: BuildHasher> ParamMap for HashMap<String, f64, S> {
    fn get(&self, name: &str) -> Option<f64> {
        HashMap::get(self, name).copied()
    }
}

impl ParamMap for BTreeMap<String, f64> {
    fn get(&self, name: &str) -> Option<f64> {
        BTreeMap::get(self, name).copied()
    }
}

impl<M: ParamMap + ?Sized> ParamMap for &M {
    fn get(&self, name: &str) -> Option<f64> {
        (**self).get(name)
    }
}

/// An ordered set of named parameter values.
///
/// # Example
///
/// ```
/// use ondemand_core::Params;
///
/// let mut params = Params::from([("height", 72.0), ("width", 120.0)]);
/// params.insert("depth", 60.0);
///
/// assert_eq!(params.get("height"), Some(72.0));
/// assert_eq!(params.len(), 3);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(
    feature = "serde-derive",
    derive(serde::Serialize, serde::Deserialize),
    serde(transparent)
)]
pub struct Params(BTreeMap<String, f64>);

impl Params {
    /// Creates an empty parameter set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a parameter, returning its previous value if there was one.
    pub fn insert(&mut self, name: impl Into<String>, value: f64) -> Option<f64> {
        self.0.insert(name.into(), value)
    }

    /// Returns the value of the named parameter.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<f64> {
        self.0.get(name).copied()
    }

    /// Returns `true` if the named parameter is present.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over parameters in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(name, value)| (name.as_str(), *value))
    }
}

impl ParamMap for Params {
    fn get(&self, name: &str) -> Option<f64> {
        self.0.get(name).copied()
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for Params {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(name, value)| (name.into(), value))
                .collect(),
        )
    }
}

impl<K: Into<String>, const N: usize> From<[(K, f64); N]> for Params {
    fn from(entries: [(K, f64); N]) -> Self {
        entries.into_iter().collect()
    }
}
