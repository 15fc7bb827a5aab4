//! Thermal load profiles.
//!
//! A [`LoadProfile`] holds ground (or building) demand at monthly or hourly
//! resolution, for one year that is tiled over the simulation period or for
//! every simulated year. Consumers read it through [`MonthlyView`] and
//! [`HourlyView`], which expose a random-access sequence over the whole
//! simulation period without materializing the tiling.
//!
//! Both extraction and injection are non-negative. Net heat into the ground is
//! injection minus extraction.

mod building;
mod reader;
mod error;
mod profile;

pub use building::{BuildingLoad, Efficiency, FluidTemperatures};
pub use reader::{CsvOptions, PowerUnit, read_hourly_csv, read_hourly_csv_path};
pub use error::LoadError;
pub use profile::{HourlyLoad, HourlyView, LoadProfile, MonthlyLoad, MonthlyView, Resolution};

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

pub const MONTHS_PER_YEAR: usize = 12;
pub const HOURS_PER_YEAR: usize = 8760;

/// Hours in the uniform month used for monthly averages.
pub const UNIFORM_MONTH_HOURS: f64 = 730.0;

/// Hours per calendar month of a non-leap year.
pub const CALENDAR_MONTH_HOURS: [usize; MONTHS_PER_YEAR] =
    [744, 672, 744, 720, 744, 720, 744, 744, 720, 744, 720, 744];

/// Load seen by the engine: either ground load directly or building demand
/// converted through a heat pump efficiency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Load {
    Geothermal(LoadProfile),
    Building(BuildingLoad),
}

impl Load {
    /// The profile whose resolution and period drive the simulation.
    #[must_use]
    pub fn profile(&self) -> &LoadProfile {
        match self {
            Self::Geothermal(profile) => profile,
            Self::Building(building) => building.demand(),
        }
    }

    /// True if the ground load depends on fluid temperatures.
    #[must_use]
    pub fn depends_on_temperature(&self) -> bool {
        matches!(self, Self::Building(building) if building.efficiency().depends_on_temperature())
    }

    /// The same load with its profile replaced by `f(profile)`. Building loads
    /// keep their efficiency.
    #[must_use]
    pub fn map_profile(&self, f: impl FnOnce(&LoadProfile) -> LoadProfile) -> Self {
        match self {
            Self::Geothermal(profile) => Self::Geothermal(f(profile)),
            Self::Building(building) => Self::Building(BuildingLoad::new(
                f(building.demand()),
                building.efficiency().clone(),
            )),
        }
    }

    /// Ground load for `years` of simulation.
    ///
    /// # Errors
    ///
    /// Returns an error if the efficiency tables cannot be evaluated or the
    /// temperatures do not cover the simulation period.
    pub fn ground_profile(
        &self,
        years: usize,
        temperatures: &FluidTemperatures<'_>,
    ) -> Result<Cow<'_, LoadProfile>, LoadError> {
        match self {
            Self::Geothermal(profile) => Ok(Cow::Borrowed(profile)),
            Self::Building(building) => building.ground_profile(years, temperatures).map(Cow::Owned),
        }
    }
}

impl From<LoadProfile> for Load {
    fn from(profile: LoadProfile) -> Self {
        Self::Geothermal(profile)
    }
}

impl From<BuildingLoad> for Load {
    fn from(building: BuildingLoad) -> Self {
        Self::Building(building)
    }
}
