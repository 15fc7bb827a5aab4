use ghe_core::FixedPointProblem;

use crate::{
    Error,
    setup::{Quadrant, TemperatureLimits},
    temperature::Results,
};

/// Fluid temperatures within this margin of a limit count as feasible [K].
const FEASIBILITY_TOLERANCE: f64 = 1e-3;

/// Model output seen by the sizing loop.
#[derive(Debug, Clone)]
pub(crate) enum Reading {
    /// A full simulation.
    Full(Results),
    /// A single binding fluid temperature.
    Point {
        ground_temperature: f64,
        temperature: f64,
        resistance: f64,
    },
}

impl Reading {
    pub fn ground_temperature(&self) -> f64 {
        match self {
            Self::Full(results) => results.ground_temperature(),
            Self::Point {
                ground_temperature, ..
            } => *ground_temperature,
        }
    }

    /// Fluid temperature watched by `quadrant`.
    pub fn temperature(&self, quadrant: Quadrant) -> f64 {
        match self {
            Self::Full(results) => results.critical(quadrant).1,
            Self::Point { temperature, .. } => *temperature,
        }
    }

    pub fn resistance(&self) -> f64 {
        match self {
            Self::Full(results) => results.resistance(),
            Self::Point { resistance, .. } => *resistance,
        }
    }
}

/// Scales the depth by the ratio of the achieved to the allowed excursion of
/// the watched fluid temperature from the ground temperature.
///
/// Fluid temperature excursions shrink roughly as `1/H`, so the update lands
/// close to the depth where the excursion exactly fills the allowed band.
pub(crate) struct QuadrantProblem {
    pub quadrant: Quadrant,
    pub limits: TemperatureLimits,
}

impl QuadrantProblem {
    /// Excursions towards the watched limit: achieved and allowed.
    fn excursions(&self, reading: &Reading) -> (f64, f64) {
        let tg = reading.ground_temperature();
        let t = reading.temperature(self.quadrant);
        if self.quadrant.watches_max() {
            (t - tg, self.limits.max() - tg)
        } else {
            (tg - t, tg - self.limits.min())
        }
    }

    fn within_limit(&self, reading: &Reading) -> bool {
        let t = reading.temperature(self.quadrant);
        if self.quadrant.watches_max() {
            t <= self.limits.max() + FEASIBILITY_TOLERANCE
        } else {
            t >= self.limits.min() - FEASIBILITY_TOLERANCE
        }
    }
}

impl FixedPointProblem for QuadrantProblem {
    type Input = f64;
    type Output = Reading;
    type Error = Error;

    fn input(&self, x: f64) -> Result<f64, Error> {
        Ok(x)
    }

    fn update(&self, x: f64, _depth: &f64, reading: &Reading) -> Result<f64, Error> {
        let (achieved, allowed) = self.excursions(reading);
        if achieved <= 0.0 && self.within_limit(reading) {
            // Load pulls away from the limit; any depth will do.
            return Ok(0.0);
        }
        if allowed <= 0.0 {
            // The ground itself is beyond the limit.
            return Ok(f64::MAX);
        }
        Ok(x * achieved / allowed)
    }

    fn is_feasible(&self, _depth: &f64, reading: &Reading) -> bool {
        self.within_limit(reading)
    }
}
