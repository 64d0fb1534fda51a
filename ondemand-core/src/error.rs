use std::fmt;

use thiserror::Error;

/// Identifies which of a model's two parameter maps a lookup was made against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamSide {
    Initial,
    Current,
}

impl fmt::Display for ParamSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Initial => write!(f, "initial"),
            Self::Current => write!(f, "current"),
        }
    }
}

/// Errors that may occur when reading parameters from a model.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParamError {
    /// The named parameter is not a key of the given parameter map.
    #[error("parameter `{name}` is missing from the {side} parameters")]
    Missing { name: String, side: ParamSide },
}

impl ParamError {
    pub(crate) fn missing(name: &str, side: ParamSide) -> Self {
        Self::Missing {
            name: name.to_owned(),
            side,
        }
    }

    /// Returns the name of the parameter that caused the error.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Missing { name, .. } => name,
        }
    }
}
