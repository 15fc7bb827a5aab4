use serde::{Deserialize, Serialize};

use crate::{interpolation::resample, load::HOURS_PER_YEAR};

use super::GFunctionError;

/// Geometric time grid on which g-functions are stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeGrid {
    times: Vec<f64>,
}

impl TimeGrid {
    /// First grid point, one hour.
    pub const START: f64 = 3600.0;

    pub const POINTS_PER_DECADE: usize = 10;

    /// Grid from one hour to one year past a `years` simulation.
    #[must_use]
    pub fn for_period(years: usize) -> Self {
        let end = (years + 1) as f64 * HOURS_PER_YEAR as f64 * 3600.0;
        let decades = (end / Self::START).log10();
        let steps = (decades * Self::POINTS_PER_DECADE as f64).ceil() as usize;
        let times = (0..=steps)
            .map(|i| Self::START * 10f64.powf(i as f64 / Self::POINTS_PER_DECADE as f64))
            .collect();
        Self { times }
    }

    /// Grid from explicit times.
    ///
    /// # Errors
    ///
    /// Returns an error unless `times` is non-empty, positive and strictly
    /// increasing.
    pub fn from_times(times: Vec<f64>) -> Result<Self, GFunctionError> {
        let increasing = times.windows(2).all(|w| w[0] < w[1]);
        let positive = times.iter().all(|t| t.is_finite() && *t > 0.0);
        if times.is_empty() || !increasing || !positive {
            return Err(GFunctionError::InvalidTimeGrid);
        }
        Ok(Self { times })
    }

    #[must_use]
    pub fn times(&self) -> &[f64] {
        &self.times
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.times.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Resamples grid `values` at `at` [s], linearly in `ln t`.
    ///
    /// Queries outside the grid take the end values.
    ///
    /// # Errors
    ///
    /// Returns an error if `values` does not match the grid.
    pub fn resample(&self, values: &[f64], at: &[f64]) -> Result<Vec<f64>, GFunctionError> {
        if values.len() != self.times.len() {
            return Err(GFunctionError::LengthMismatch {
                expected: self.times.len(),
                actual: values.len(),
            });
        }
        let ln_grid: Vec<f64> = self.times.iter().map(|t| t.ln()).collect();
        let ln_at: Vec<f64> = at.iter().map(|t| t.max(f64::MIN_POSITIVE).ln()).collect();
        Ok(resample(&ln_grid, values, &ln_at)?)
    }
}
