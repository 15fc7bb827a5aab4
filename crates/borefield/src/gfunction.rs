//! G-functions: the oracle that computes them and the cache that serves them.
//!
//! A g-function is the dimensionless step response of a borefield. The engine
//! samples it on a fixed [`TimeGrid`] for a handful of depths, keeps those in a
//! [`GFunctionCache`], and interpolates in depth between them. Any type that
//! implements [`GFunctionOracle`] can provide the samples; [`FiniteLineSource`]
//! is the built-in reference.

mod cache;
mod dataset;
mod error;
mod fls;
mod time_grid;

pub use cache::{CacheOptions, GFunctionCache};
pub use dataset::GFunctionDataset;
pub use error::GFunctionError;
pub use fls::FiniteLineSource;
pub use time_grid::TimeGrid;

use crate::geometry::BoreholeField;

/// Computes g-functions for a borefield.
pub trait GFunctionOracle {
    /// Values of the g-function of `field` at each of `times` [s], for ground
    /// of thermal `diffusivity` [m²/s].
    ///
    /// # Errors
    ///
    /// Returns an error if the field is not supported or the computation
    /// fails.
    fn compute(
        &self,
        field: &BoreholeField,
        diffusivity: f64,
        times: &[f64],
    ) -> Result<Vec<f64>, GFunctionError>;

    /// Computes a dataset over `depths` on a common time vector.
    ///
    /// # Errors
    ///
    /// Returns the first failing depth's error.
    fn precompute(
        &self,
        field: &BoreholeField,
        diffusivity: f64,
        times: &[f64],
        depths: &[f64],
    ) -> Result<GFunctionDataset, GFunctionError> {
        let mut depths = depths.to_vec();
        depths.sort_by(f64::total_cmp);
        depths.dedup();
        let values = depths
            .iter()
            .map(|&depth| self.compute(&field.with_depth(depth), diffusivity, times))
            .collect::<Result<Vec<_>, _>>()?;
        GFunctionDataset::new(
            field.fingerprint(&[diffusivity]),
            times.to_vec(),
            depths,
            values,
        )
    }
}

impl<F> GFunctionOracle for F
where
    F: Fn(&BoreholeField, f64, &[f64]) -> Result<Vec<f64>, GFunctionError>,
{
    fn compute(
        &self,
        field: &BoreholeField,
        diffusivity: f64,
        times: &[f64],
    ) -> Result<Vec<f64>, GFunctionError> {
        self(field, diffusivity, times)
    }
}

/// Checks an oracle's answer for length and finiteness.
pub(crate) fn check_values(times: &[f64], values: &[f64]) -> Result<(), GFunctionError> {
    if values.len() != times.len() {
        return Err(GFunctionError::LengthMismatch {
            expected: times.len(),
            actual: values.len(),
        });
    }
    match times.iter().zip(values).find(|(_, v)| !v.is_finite()) {
        Some((&time, &value)) => Err(GFunctionError::NonFinite { time, value }),
        None => Ok(()),
    }
}
