use crate::{
    error::{ParamError, ParamSide},
    model::ParamModel,
    params::ParamMap,
};

/// Returns `value` shifted by the drift of the named parameter.
///
/// Computes `value + current - initial`, where `initial` and `current` are the
/// parameter's entries in the model's initial and current maps. The model is
/// only read.
///
/// # Errors
///
/// Returns [`ParamError::Missing`] if the parameter is absent from either map.
/// The initial map is checked first.
///
/// # Example
///
/// ```
/// use ondemand_core::{ParametricModel, Params, compute_adjusted_value};
///
/// let mut model = ParametricModel::new(Params::from([("temp", 10.0)]));
/// model.set("temp", 15.0)?;
///
/// assert_eq!(compute_adjusted_value(&model, 100.0, "temp")?, 105.0);
/// # Ok::<(), ondemand_core::ParamError>(())
/// ```
pub fn compute_adjusted_value<M>(model: &M, value: f64, name: &str) -> Result<f64, ParamError>
where
    M: ParamModel + ?Sized,
{
    let (initial, current) = lookup(model, name)?;
    Ok(value + current - initial)
}

/// Like [`compute_adjusted_value`], but yields `NaN` for a missing parameter.
///
/// Callers using this form must check the result with [`f64::is_nan`].
#[must_use]
pub fn adjusted_or_nan<M>(model: &M, value: f64, name: &str) -> f64
where
    M: ParamModel + ?Sized,
{
    compute_adjusted_value(model, value, name).unwrap_or(f64::NAN)
}

/// Returns the signed change of the named parameter, `current - initial`.
///
/// # Errors
///
/// Returns [`ParamError::Missing`] if the parameter is absent from either map.
pub fn drift<M>(model: &M, name: &str) -> Result<f64, ParamError>
where
    M: ParamModel + ?Sized,
{
    let (initial, current) = lookup(model, name)?;
    Ok(current - initial)
}

fn lookup<M>(model: &M, name: &str) -> Result<(f64, f64), ParamError>
where
    M: ParamModel + ?Sized,
{
    let initial = model
        .initial_params()
        .get(name)
        .ok_or_else(|| ParamError::missing(name, ParamSide::Initial))?;
    let current = model
        .current_params()
        .get(name)
        .ok_or_else(|| ParamError::missing(name, ParamSide::Current))?;
    Ok((initial, current))
}
