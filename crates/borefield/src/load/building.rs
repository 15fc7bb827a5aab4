use serde::{Deserialize, Serialize};

use crate::interpolation::LinearTable;

use super::{
    CALENDAR_MONTH_HOURS, HOURS_PER_YEAR, LoadError, LoadProfile, MONTHS_PER_YEAR, Resolution,
};

/// Heat pump efficiency converting building demand to ground load.
///
/// Ground extraction is `heating · (1 − 1/COP)` and ground injection is
/// `cooling · (1 + 1/EER)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Efficiency {
    /// Seasonal averages.
    Seasonal { scop: f64, seer: f64 },
    /// COP and EER as functions of the mean fluid temperature in °C.
    Curves { cop: LinearTable, eer: LinearTable },
}

impl Efficiency {
    /// Constant seasonal efficiencies.
    ///
    /// # Errors
    ///
    /// Returns an error if `scop < 1` or `seer <= 0`.
    pub fn seasonal(scop: f64, seer: f64) -> Result<Self, LoadError> {
        check_cop(scop)?;
        check_eer(seer)?;
        Ok(Self::Seasonal { scop, seer })
    }

    /// Temperature-dependent efficiencies.
    ///
    /// # Errors
    ///
    /// Returns an error if any tabulated COP is below 1 or any EER is not
    /// positive.
    pub fn curves(cop: LinearTable, eer: LinearTable) -> Result<Self, LoadError> {
        cop.y().iter().try_for_each(|&value| check_cop(value))?;
        eer.y().iter().try_for_each(|&value| check_eer(value))?;
        Ok(Self::Curves { cop, eer })
    }

    #[must_use]
    pub fn depends_on_temperature(&self) -> bool {
        matches!(self, Self::Curves { .. })
    }
}

fn check_cop(value: f64) -> Result<(), LoadError> {
    if value.is_finite() && value >= 1.0 {
        Ok(())
    } else {
        Err(LoadError::Efficiency {
            name: "COP",
            min: 1.0,
            value,
        })
    }
}

fn check_eer(value: f64) -> Result<(), LoadError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(LoadError::Efficiency {
            name: "EER",
            min: 0.0,
            value,
        })
    }
}

/// Building heating (extraction side) and cooling (injection side) demand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildingLoad {
    demand: LoadProfile,
    efficiency: Efficiency,
}

impl BuildingLoad {
    #[must_use]
    pub fn new(demand: LoadProfile, efficiency: Efficiency) -> Self {
        Self { demand, efficiency }
    }

    #[must_use]
    pub fn demand(&self) -> &LoadProfile {
        &self.demand
    }

    #[must_use]
    pub fn efficiency(&self) -> &Efficiency {
        &self.efficiency
    }

    /// Converts the demand to ground load over `years`.
    ///
    /// Seasonal efficiencies ignore `temperatures`. Efficiency curves are
    /// evaluated per step, at the extraction temperature for COP and the
    /// injection temperature for EER.
    ///
    /// # Errors
    ///
    /// Returns an error if a multi-year demand does not cover `years` or the
    /// temperatures do not match the demand resolution.
    pub fn ground_profile(
        &self,
        years: usize,
        temperatures: &FluidTemperatures<'_>,
    ) -> Result<LoadProfile, LoadError> {
        if let Some(data_years) = self.demand.data_years()
            && data_years != years
        {
            return Err(LoadError::PeriodMismatch {
                data_years,
                simulation_years: years,
            });
        }
        match &self.efficiency {
            Efficiency::Seasonal { scop, seer } => {
                Ok(self.demand.scaled(1.0 - 1.0 / scop, 1.0 + 1.0 / seer))
            }
            Efficiency::Curves { cop, eer } => {
                let demand = self.demand.expanded(years);
                let (extraction, injection) =
                    temperatures.series(years, demand.resolution())?;
                let cop = cop.eval_many(&extraction)?;
                let eer = eer.eval_many(&injection)?;
                Ok(demand.map_steps(
                    |k, v| v * (1.0 - 1.0 / cop[k]),
                    |k, v| v * (1.0 + 1.0 / eer[k]),
                ))
            }
        }
    }
}

/// Mean fluid temperatures at which efficiency curves are evaluated, in °C.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FluidTemperatures<'a> {
    /// One temperature for every step.
    Uniform(f64),
    /// Per-month temperatures for the extraction and injection sides.
    Monthly {
        extraction: &'a [f64],
        injection: &'a [f64],
    },
    /// Per-hour temperatures, shared by both sides.
    Hourly(&'a [f64]),
}

impl FluidTemperatures<'_> {
    /// Extraction and injection temperatures for every step of `years` at
    /// `resolution`. Shorter series are tiled.
    fn series(
        &self,
        years: usize,
        resolution: Resolution,
    ) -> Result<(Vec<f64>, Vec<f64>), LoadError> {
        let steps = match resolution {
            Resolution::Monthly => years * MONTHS_PER_YEAR,
            Resolution::Hourly => years * HOURS_PER_YEAR,
        };
        match (*self, resolution) {
            (Self::Uniform(t), _) => Ok((vec![t; steps], vec![t; steps])),
            (
                Self::Monthly {
                    extraction,
                    injection,
                },
                Resolution::Monthly,
            ) => Ok((
                tile("extraction", extraction, MONTHS_PER_YEAR, steps)?,
                tile("injection", injection, MONTHS_PER_YEAR, steps)?,
            )),
            (
                Self::Monthly {
                    extraction,
                    injection,
                },
                Resolution::Hourly,
            ) => {
                let extraction = tile("extraction", extraction, MONTHS_PER_YEAR, steps)?;
                let injection = tile("injection", injection, MONTHS_PER_YEAR, steps)?;
                let months = hour_to_month(years);
                Ok((
                    months.iter().map(|&m| extraction[m]).collect(),
                    months.iter().map(|&m| injection[m]).collect(),
                ))
            }
            (Self::Hourly(hourly), Resolution::Hourly) => {
                let series = tile("hourly", hourly, HOURS_PER_YEAR, steps)?;
                Ok((series.clone(), series))
            }
            (Self::Hourly(hourly), Resolution::Monthly) => {
                let hourly = tile("hourly", hourly, HOURS_PER_YEAR, years * HOURS_PER_YEAR)?;
                let mut monthly = Vec::with_capacity(steps);
                let mut start = 0;
                for _ in 0..years {
                    for hours in CALENDAR_MONTH_HOURS {
                        let sum: f64 = hourly[start..start + hours].iter().sum();
                        monthly.push(sum / hours as f64);
                        start += hours;
                    }
                }
                Ok((monthly.clone(), monthly))
            }
        }
    }
}

/// Repeats `values` to `steps`, requiring a whole number of years of data.
fn tile(
    name: &'static str,
    values: &[f64],
    per_year: usize,
    steps: usize,
) -> Result<Vec<f64>, LoadError> {
    if values.is_empty() || values.len() % per_year != 0 || values.len() > steps {
        return Err(LoadError::LengthMismatch {
            name,
            expected: steps,
            actual: values.len(),
        });
    }
    Ok(values.iter().copied().cycle().take(steps).collect())
}

/// Absolute month index of every hour in `years`.
fn hour_to_month(years: usize) -> Vec<usize> {
    let mut months = Vec::with_capacity(years * HOURS_PER_YEAR);
    for year in 0..years {
        for (month, hours) in CALENDAR_MONTH_HOURS.into_iter().enumerate() {
            months.extend(std::iter::repeat_n(year * MONTHS_PER_YEAR + month, hours));
        }
    }
    months
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;

    fn demand() -> LoadProfile {
        LoadProfile::monthly([1000.0; 12], [500.0; 12], [10.0; 12], [5.0; 12]).unwrap()
    }

    #[test]
    fn seasonal_conversion() {
        let building = BuildingLoad::new(demand(), Efficiency::seasonal(4.0, 5.0).unwrap());
        let ground = building
            .ground_profile(2, &FluidTemperatures::Uniform(10.0))
            .unwrap();
        let view = ground.monthly_view(2).unwrap();

        assert_relative_eq!(view.baseload_extraction(3), 750.0);
        assert_relative_eq!(view.baseload_injection(3), 600.0);
        assert_relative_eq!(view.peak_extraction(20), 7.5);
        assert_relative_eq!(view.peak_injection(20), 6.0);
    }

    #[test]
    fn curves_follow_fluid_temperature() {
        let cop = LinearTable::new(vec![0.0, 10.0], vec![2.0, 4.0]).unwrap();
        let eer = LinearTable::new(vec![10.0, 30.0], vec![8.0, 2.0]).unwrap();
        let building = BuildingLoad::new(demand(), Efficiency::curves(cop, eer).unwrap());
        assert!(building.efficiency().depends_on_temperature());

        let mut extraction = [10.0; 12];
        extraction[0] = 0.0;
        let injection = [30.0; 12];
        let ground = building
            .ground_profile(
                1,
                &FluidTemperatures::Monthly {
                    extraction: &extraction,
                    injection: &injection,
                },
            )
            .unwrap();
        let view = ground.monthly_view(1).unwrap();

        // COP 2 in January, 4 afterwards.
        assert_relative_eq!(view.baseload_extraction(0), 500.0);
        assert_relative_eq!(view.baseload_extraction(1), 750.0);
        // EER 2 everywhere.
        assert_relative_eq!(view.baseload_injection(5), 750.0);
    }

    #[test]
    fn rejects_invalid_efficiency() {
        assert!(matches!(
            Efficiency::seasonal(0.5, 3.0),
            Err(LoadError::Efficiency { name: "COP", .. })
        ));
        let cop = LinearTable::new(vec![0.0], vec![3.0]).unwrap();
        let eer = LinearTable::new(vec![0.0, 1.0], vec![2.0, 0.0]).unwrap();
        assert!(matches!(
            Efficiency::curves(cop, eer),
            Err(LoadError::Efficiency { name: "EER", .. })
        ));
    }

    #[test]
    fn temperature_series_must_cover_whole_years() {
        let cop = LinearTable::new(vec![0.0], vec![3.0]).unwrap();
        let eer = LinearTable::new(vec![0.0], vec![3.0]).unwrap();
        let building = BuildingLoad::new(demand(), Efficiency::curves(cop, eer).unwrap());
        let short = [5.0; 7];
        assert!(matches!(
            building.ground_profile(
                1,
                &FluidTemperatures::Monthly {
                    extraction: &short,
                    injection: &short,
                },
            ),
            Err(LoadError::LengthMismatch { .. })
        ));
    }
}
