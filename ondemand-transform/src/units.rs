//! Conversion between the length units used by design tools.

use std::{fmt, str::FromStr};

use thiserror::Error;
use uom::si::{
    f64::Length,
    length::{centimeter, inch, millimeter},
};

/// A length unit accepted for parameter values and geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde-derive",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "String", into = "&'static str")
)]
pub enum LengthUnit {
    Millimeter,
    Centimeter,
    Inch,
}

/// Errors that can occur when parsing a [`LengthUnit`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnitError {
    #[error("unsupported length unit `{0}`")]
    Unknown(String),
}

impl LengthUnit {
    /// Returns the short symbol for this unit.
    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Millimeter => "mm",
            Self::Centimeter => "cm",
            Self::Inch => "in",
        }
    }

    fn length(self, value: f64) -> Length {
        match self {
            Self::Millimeter => Length::new::<millimeter>(value),
            Self::Centimeter => Length::new::<centimeter>(value),
            Self::Inch => Length::new::<inch>(value),
        }
    }

    fn value_of(self, length: Length) -> f64 {
        match self {
            Self::Millimeter => length.get::<millimeter>(),
            Self::Centimeter => length.get::<centimeter>(),
            Self::Inch => length.get::<inch>(),
        }
    }
}

/// Converts a length value from one unit to another.
///
/// Values pass through unchanged when the units match.
///
/// # Example
///
/// ```
/// use ondemand_transform::units::{LengthUnit, convert};
///
/// let mm = convert(2.0, LengthUnit::Inch, LengthUnit::Millimeter);
/// assert!((mm - 50.8).abs() < 1e-12);
/// ```
#[must_use]
pub fn convert(value: f64, from: LengthUnit, to: LengthUnit) -> f64 {
    if from == to {
        return value;
    }
    to.value_of(from.length(value))
}

/// Parses a unit name.
///
/// Accepts `mm`, `cm`, and any name beginning with `in` (`in`, `inch`,
/// `inches`).
impl FromStr for LengthUnit {
    type Err = UnitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mm" => Ok(Self::Millimeter),
            "cm" => Ok(Self::Centimeter),
            name if name.starts_with("in") => Ok(Self::Inch),
            other => Err(UnitError::Unknown(other.to_owned())),
        }
    }
}

impl TryFrom<String> for LengthUnit {
    type Error = UnitError;

    fn try_from(name: String) -> Result<Self, Self::Error> {
        name.parse()
    }
}

impl From<LengthUnit> for &'static str {
    fn from(unit: LengthUnit) -> Self {
        unit.symbol()
    }
}

impl fmt::Display for LengthUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}
