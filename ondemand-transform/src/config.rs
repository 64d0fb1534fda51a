use thiserror::Error;

use crate::units::LengthUnit;

/// Configuration for deriving transformation rules.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeriveConfig {
    geometry_units: LengthUnit,
    tolerance: f64,
}

/// Errors that can occur when validating a [`DeriveConfig`].
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    #[error("tolerance must be finite and non-negative")]
    Tolerance,
}

impl Default for DeriveConfig {
    fn default() -> Self {
        Self {
            geometry_units: LengthUnit::Centimeter,
            tolerance: 0.0,
        }
    }
}

impl DeriveConfig {
    /// Creates a new config with a validated tolerance.
    ///
    /// A coordinate counts as changed between exports when it moves by more
    /// than `tolerance`, in `geometry_units`.
    ///
    /// # Errors
    ///
    /// Returns an error if the tolerance is negative or non-finite.
    pub fn new(geometry_units: LengthUnit, tolerance: f64) -> Result<Self, ConfigError> {
        if !tolerance.is_finite() || tolerance < 0.0 {
            return Err(ConfigError::Tolerance);
        }

        Ok(Self {
            geometry_units,
            tolerance,
        })
    }

    /// Returns the units the geometry is expressed in.
    #[must_use]
    pub fn geometry_units(&self) -> LengthUnit {
        self.geometry_units
    }

    /// Returns the minimum coordinate change treated as movement.
    #[must_use]
    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }
}
