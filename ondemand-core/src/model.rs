use crate::{
    error::{ParamError, ParamSide},
    params::{ParamMap, Params},
};

/// A model that records each parameter's initial and current value.
///
/// The model is owned by the caller. Computations in this crate only borrow it
/// for the duration of a call and never mutate it.
pub trait ParamModel {
    type Params: ParamMap + ?Sized;

    /// Parameter values at the reference point, typically when the geometry
    /// was exported.
    fn initial_params(&self) -> &Self::Params;

    /// Present parameter values.
    fn current_params(&self) -> &Self::Params;
}

impl<M: ParamModel + ?Sized> ParamModel for &M {
    type Params = M::Params;

    fn initial_params(&self) -> &Self::Params {
        (**self).initial_params()
    }

    fn current_params(&self) -> &Self::Params {
        (**self).current_params()
    }
}

/// A parametric model backed by two [`Params`] maps.
///
/// Current values start out equal to the initial values and are changed with
/// [`ParametricModel::set`]. Only parameters that exist in the initial map can
/// be set, which keeps both maps on the same key domain.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde-derive", derive(serde::Serialize, serde::Deserialize))]
pub struct ParametricModel {
    initial_params: Params,
    current_params: Params,
}

impl ParametricModel {
    /// Creates a model whose current values equal its initial values.
    #[must_use]
    pub fn new(initial: Params) -> Self {
        Self {
            current_params: initial.clone(),
            initial_params: initial,
        }
    }

    /// Creates a model from separately recorded initial and current values.
    ///
    /// The maps are taken as given, so a key may be present in one and not
    /// the other.
    #[must_use]
    pub fn with_current(initial: Params, current: Params) -> Self {
        Self {
            initial_params: initial,
            current_params: current,
        }
    }

    /// Sets the current value of a known parameter.
    ///
    /// # Errors
    ///
    /// Returns [`ParamError::Missing`] if the parameter has no initial value.
    pub fn set(&mut self, name: &str, value: f64) -> Result<(), ParamError> {
        if !self.initial_params.contains(name) {
            return Err(ParamError::missing(name, ParamSide::Initial));
        }
        self.current_params.insert(name, value);
        Ok(())
    }

    /// Restores every current value to its initial value.
    pub fn reset(&mut self) {
        self.current_params = self.initial_params.clone();
    }
}

impl ParamModel for ParametricModel {
    type Params = Params;

    fn initial_params(&self) -> &Params {
        &self.initial_params
    }

    fn current_params(&self) -> &Params {
        &self.current_params
    }
}
