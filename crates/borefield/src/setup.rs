//! Calculation setup and temperature limits.
//!
//! Every tunable of the engine lives in [`CalculationSetup`]; there are no
//! process-wide defaults.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uom::si::{f64::ThermodynamicTemperature, thermodynamic_temperature::degree_celsius};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SetupError {
    #[error("{name} must be positive and finite, got {value}")]
    NotPositive { name: &'static str, value: f64 },

    #[error("{name} must be non-negative and finite, got {value}")]
    Negative { name: &'static str, value: f64 },

    #[error("simulation period must be at least one year")]
    ZeroPeriod,

    #[error("max_iterations must be at least 1")]
    ZeroIterations,

    #[error("min_depth {min} m must be below max_depth {max} m")]
    DepthRange { min: f64, max: f64 },

    #[error("minimum fluid temperature {min} °C must be below maximum {max} °C")]
    TemperatureRange { min: f64, max: f64 },

    #[error("no backup to restore")]
    NoBackup,
}

/// Sizing fidelity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Method {
    /// Three characteristic pulses.
    L2,
    /// Monthly convolution.
    #[default]
    L3,
    /// Hourly convolution.
    L4,
}

/// Which corner of the temperature band drives sizing.
///
/// Numbers 1 and 2 watch the maximum fluid temperature, 3 and 4 the minimum.
/// The numbering matches established sizing tools, so forced quadrants carry
/// over from their reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Quadrant {
    /// Maximum fluid temperature in the last year.
    One,
    /// Maximum fluid temperature in the first year.
    Two,
    /// Minimum fluid temperature in the first year.
    Three,
    /// Minimum fluid temperature in the last year.
    Four,
}

impl Quadrant {
    pub const ALL: [Quadrant; 4] = [Self::One, Self::Two, Self::Three, Self::Four];

    /// True if the quadrant is bounded by the maximum fluid temperature.
    #[must_use]
    pub fn watches_max(self) -> bool {
        matches!(self, Self::One | Self::Two)
    }

    /// True if the binding moment lies in the first simulation year.
    #[must_use]
    pub fn first_year(self) -> bool {
        matches!(self, Self::Two | Self::Three)
    }

    /// The quadrant for a side of the band and a year.
    #[must_use]
    pub fn from_parts(watches_max: bool, first_year: bool) -> Self {
        match (watches_max, first_year) {
            (true, false) => Self::One,
            (true, true) => Self::Two,
            (false, true) => Self::Three,
            (false, false) => Self::Four,
        }
    }

    /// The 1-based quadrant number.
    #[must_use]
    pub fn number(self) -> u8 {
        match self {
            Self::One => 1,
            Self::Two => 2,
            Self::Three => 3,
            Self::Four => 4,
        }
    }
}

/// Quadrant selection: automatic or forced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum QuadrantSizing {
    #[default]
    Auto,
    Forced(Quadrant),
}

impl QuadrantSizing {
    /// Maps `0` to automatic and `1..=4` to a forced quadrant.
    #[must_use]
    pub fn from_number(number: u8) -> Option<Self> {
        match number {
            0 => Some(Self::Auto),
            1 => Some(Self::Forced(Quadrant::One)),
            2 => Some(Self::Forced(Quadrant::Two)),
            3 => Some(Self::Forced(Quadrant::Three)),
            4 => Some(Self::Forced(Quadrant::Four)),
            _ => None,
        }
    }
}

/// Engine tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculationSetup {
    pub method: Method,
    pub quadrant_sizing: QuadrantSizing,
    /// Evaluate a dynamic resistance model once instead of at every step.
    pub use_constant_rb: bool,
    /// Freeze the ground temperature at the starting depth.
    pub use_constant_tg: bool,
    /// Heating peak duration in hours.
    pub peak_duration_heating: f64,
    /// Cooling peak duration in hours.
    pub peak_duration_cooling: f64,
    /// Simulation period in years.
    pub simulation_period: usize,
    pub min_depth: f64,
    pub max_depth: f64,
    /// Absolute depth tolerance in metres.
    pub atol: f64,
    /// Relative depth tolerance.
    pub rtol: f64,
    pub max_iterations: usize,
    /// L4 sizing evaluates only the critical hour until a final full check.
    pub speed_up: bool,
    /// Keep earlier g-functions in the cache when a new depth is computed.
    pub store_previous_values: bool,
    /// Largest relative gap between cached depths that is interpolated.
    /// `None` interpolates across any gap.
    pub interpolation_threshold: Option<f64>,
}

impl Default for CalculationSetup {
    fn default() -> Self {
        Self {
            method: Method::L3,
            quadrant_sizing: QuadrantSizing::Auto,
            use_constant_rb: true,
            use_constant_tg: false,
            peak_duration_heating: 6.0,
            peak_duration_cooling: 6.0,
            simulation_period: 20,
            min_depth: 15.0,
            max_depth: 500.0,
            atol: 0.01,
            rtol: 1e-4,
            max_iterations: 40,
            speed_up: false,
            store_previous_values: true,
            interpolation_threshold: Some(0.25),
        }
    }
}

impl CalculationSetup {
    /// Checks ranges of every field.
    ///
    /// # Errors
    ///
    /// Returns the first invalid field.
    pub fn validate(&self) -> Result<(), SetupError> {
        for (name, value) in [
            ("peak_duration_heating", self.peak_duration_heating),
            ("peak_duration_cooling", self.peak_duration_cooling),
            ("min_depth", self.min_depth),
            ("max_depth", self.max_depth),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(SetupError::NotPositive { name, value });
            }
        }
        for (name, value) in [("atol", self.atol), ("rtol", self.rtol)] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(SetupError::Negative { name, value });
            }
        }
        if let Some(value) = self.interpolation_threshold
            && !(value.is_finite() && value >= 0.0)
        {
            return Err(SetupError::Negative {
                name: "interpolation_threshold",
                value,
            });
        }
        if self.simulation_period == 0 {
            return Err(SetupError::ZeroPeriod);
        }
        if self.max_iterations == 0 {
            return Err(SetupError::ZeroIterations);
        }
        if self.min_depth >= self.max_depth {
            return Err(SetupError::DepthRange {
                min: self.min_depth,
                max: self.max_depth,
            });
        }
        Ok(())
    }

    /// Peak duration in hours for the given side of the band.
    #[must_use]
    pub fn peak_duration(&self, watches_max: bool) -> f64 {
        if watches_max {
            self.peak_duration_cooling
        } else {
            self.peak_duration_heating
        }
    }
}

/// Bounds on the mean fluid temperature, in °C.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TemperatureLimits {
    min: f64,
    max: f64,
}

impl Default for TemperatureLimits {
    fn default() -> Self {
        Self {
            min: 0.0,
            max: 16.0,
        }
    }
}

impl TemperatureLimits {
    /// Creates limits with `min < max`.
    ///
    /// # Errors
    ///
    /// Returns an error if `min` is not below `max` or either is not finite.
    pub fn new(
        min: ThermodynamicTemperature,
        max: ThermodynamicTemperature,
    ) -> Result<Self, SetupError> {
        Self::from_celsius(min.get::<degree_celsius>(), max.get::<degree_celsius>())
    }

    /// Creates limits from plain °C values.
    ///
    /// # Errors
    ///
    /// See [`TemperatureLimits::new`].
    pub fn from_celsius(min: f64, max: f64) -> Result<Self, SetupError> {
        if !(min.is_finite() && max.is_finite()) || min >= max {
            return Err(SetupError::TemperatureRange { min, max });
        }
        Ok(Self { min, max })
    }

    #[must_use]
    pub fn min(&self) -> f64 {
        self.min
    }

    #[must_use]
    pub fn max(&self) -> f64 {
        self.max
    }

    /// The bound watched by `quadrant`.
    #[must_use]
    pub fn bound(&self, quadrant: Quadrant) -> f64 {
        if quadrant.watches_max() {
            self.max
        } else {
            self.min
        }
    }
}
