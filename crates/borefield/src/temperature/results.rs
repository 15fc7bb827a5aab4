use serde::{Deserialize, Serialize};

use crate::{
    load::{FluidTemperatures, HOURS_PER_YEAR, MONTHS_PER_YEAR},
    setup::{Quadrant, TemperatureLimits},
};

/// Temperatures of a monthly simulation, one value per month, in °C.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyResults {
    pub borehole_wall: Vec<f64>,
    pub peak_extraction: Vec<f64>,
    pub peak_injection: Vec<f64>,
    pub baseload_extraction: Vec<f64>,
    pub baseload_injection: Vec<f64>,
    /// `Rb*` used for the run [m·K/W].
    pub resistance: f64,
    pub ground_temperature: f64,
    pub years: usize,
}

/// Temperatures of an hourly simulation, one value per hour, in °C.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyResults {
    pub borehole_wall: Vec<f64>,
    pub fluid: Vec<f64>,
    pub resistance: f64,
    pub ground_temperature: f64,
    pub years: usize,
}

/// Output of a temperature simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Results {
    Monthly(MonthlyResults),
    Hourly(HourlyResults),
}

impl Results {
    #[must_use]
    pub fn years(&self) -> usize {
        match self {
            Self::Monthly(results) => results.years,
            Self::Hourly(results) => results.years,
        }
    }

    #[must_use]
    pub fn ground_temperature(&self) -> f64 {
        match self {
            Self::Monthly(results) => results.ground_temperature,
            Self::Hourly(results) => results.ground_temperature,
        }
    }

    #[must_use]
    pub fn resistance(&self) -> f64 {
        match self {
            Self::Monthly(results) => results.resistance,
            Self::Hourly(results) => results.resistance,
        }
    }

    #[must_use]
    pub fn borehole_wall(&self) -> &[f64] {
        match self {
            Self::Monthly(results) => &results.borehole_wall,
            Self::Hourly(results) => &results.borehole_wall,
        }
    }

    /// Lowest mean fluid temperature over the whole period.
    #[must_use]
    pub fn min_temperature(&self) -> f64 {
        self.lower_series().iter().copied().fold(f64::INFINITY, f64::min)
    }

    /// Highest mean fluid temperature over the whole period.
    #[must_use]
    pub fn max_temperature(&self) -> f64 {
        self.upper_series()
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max)
    }

    /// Step index and value of the extreme fluid temperature watched by
    /// `quadrant`, within its first or last simulated year. Ties resolve to
    /// the earliest step.
    #[must_use]
    pub fn critical(&self, quadrant: Quadrant) -> (usize, f64) {
        let per_year = match self {
            Self::Monthly(_) => MONTHS_PER_YEAR,
            Self::Hourly(_) => HOURS_PER_YEAR,
        };
        let year = if quadrant.first_year() {
            0
        } else {
            self.years() - 1
        };
        let start = year * per_year;
        let (series, sign) = if quadrant.watches_max() {
            (self.upper_series(), 1.0)
        } else {
            (self.lower_series(), -1.0)
        };

        let mut best = (start, series[start]);
        for (k, &value) in series.iter().enumerate().take(start + per_year).skip(start) {
            if sign * value > sign * best.1 {
                best = (k, value);
            }
        }
        best
    }

    /// Distance to the limit watched by `quadrant`; negative when violated.
    #[must_use]
    pub fn slack(&self, quadrant: Quadrant, limits: &TemperatureLimits) -> f64 {
        let (_, value) = self.critical(quadrant);
        if quadrant.watches_max() {
            limits.max() - value
        } else {
            value - limits.min()
        }
    }

    /// The temperature that sets the operating point: the critical value of
    /// `quadrant` if known, otherwise the extreme furthest from the ground.
    #[must_use]
    pub fn binding_temperature(&self, quadrant: Option<Quadrant>) -> f64 {
        if let Some(quadrant) = quadrant {
            return self.critical(quadrant).1;
        }
        let tg = self.ground_temperature();
        let (min, max) = (self.min_temperature(), self.max_temperature());
        if max - tg >= tg - min { max } else { min }
    }

    /// Per-step temperatures for efficiency curves.
    #[must_use]
    pub fn fluid_temperatures(&self) -> FluidTemperatures<'_> {
        match self {
            Self::Monthly(results) => FluidTemperatures::Monthly {
                extraction: &results.baseload_extraction,
                injection: &results.baseload_injection,
            },
            Self::Hourly(results) => FluidTemperatures::Hourly(&results.fluid),
        }
    }

    fn lower_series(&self) -> &[f64] {
        match self {
            Self::Monthly(results) => &results.peak_extraction,
            Self::Hourly(results) => &results.fluid,
        }
    }

    fn upper_series(&self) -> &[f64] {
        match self {
            Self::Monthly(results) => &results.peak_injection,
            Self::Hourly(results) => &results.fluid,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;

    fn monthly(years: usize) -> Results {
        let steps = years * MONTHS_PER_YEAR;
        let ramp: Vec<f64> = (0..steps).map(|k| k as f64 * 0.1).collect();
        Results::Monthly(MonthlyResults {
            borehole_wall: vec![10.0; steps],
            peak_extraction: ramp.iter().map(|v| 5.0 - v).collect(),
            peak_injection: ramp.iter().map(|v| 12.0 + v).collect(),
            baseload_extraction: vec![9.0; steps],
            baseload_injection: vec![11.0; steps],
            resistance: 0.1,
            ground_temperature: 10.0,
            years,
        })
    }

    #[test]
    fn extremes_cover_the_whole_period() {
        let results = monthly(2);
        assert_relative_eq!(results.min_temperature(), 5.0 - 2.3, epsilon = 1e-12);
        assert_relative_eq!(results.max_temperature(), 12.0 + 2.3, epsilon = 1e-12);
    }

    #[test]
    fn critical_steps_stay_in_their_year() {
        let results = monthly(3);
        assert_eq!(results.critical(Quadrant::Three).0, 11);
        assert_eq!(results.critical(Quadrant::Two).0, 11);
        assert_eq!(results.critical(Quadrant::Four).0, 35);
        let (k, value) = results.critical(Quadrant::One);
        assert_eq!(k, 35);
        assert_relative_eq!(value, 15.5, epsilon = 1e-12);
    }

    #[test]
    fn slack_is_negative_when_violated() {
        let results = monthly(1);
        let limits = TemperatureLimits::from_celsius(0.0, 13.0).unwrap();
        assert_relative_eq!(results.slack(Quadrant::Three, &limits), 3.9, epsilon = 1e-12);
        assert_relative_eq!(results.slack(Quadrant::Two, &limits), -0.1, epsilon = 1e-12);
    }

    #[test]
    fn binding_temperature_prefers_the_larger_excursion() {
        let results = monthly(1);
        assert_relative_eq!(results.binding_temperature(None), 5.0 - 1.1, epsilon = 1e-12);
        assert_relative_eq!(
            results.binding_temperature(Some(Quadrant::Two)),
            13.1,
            epsilon = 1e-12
        );
    }
}
