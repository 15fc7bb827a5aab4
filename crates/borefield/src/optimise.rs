//! Load optimisation on a fixed field.
//!
//! The field keeps its depth. Extraction and injection are each capped at a
//! fraction of their maximum power, and the largest fractions that keep the
//! fluid temperatures within the limits are found by bisection. The two sides
//! interact through the ground, so they are fitted alternately until the
//! fractions settle. Whatever the cap removes is left to an external source.

use ghe_core::{EquationProblem, Model};
use ghe_solvers::equation::bisection::{self, Action, Event};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{
    Borefield, Error,
    gfunction::GFunctionOracle,
    load::{
        Load, LoadError, LoadProfile, MONTHS_PER_YEAR, MonthlyLoad, Resolution,
        UNIFORM_MONTH_HOURS,
    },
    setup::{Quadrant, TemperatureLimits},
    temperature::{Results, Simulator},
};

/// Stop alternating once neither fraction moves by more than this.
const FRACTION_TOLERANCE: f64 = 1e-3;

/// Binding fluid temperatures within this margin of a limit are accepted [K].
const TEMPERATURE_TOLERANCE: f64 = 0.05;

const MAX_ROUNDS: usize = 10;
const MAX_BISECTIONS: usize = 60;

/// A load split between the field and an external source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadSplit {
    /// Extraction cap as a fraction of the maximum extraction power.
    pub extraction_fraction: f64,
    /// Injection cap as a fraction of the maximum injection power.
    pub injection_fraction: f64,
    /// Load served by the field.
    pub served: Load,
    /// Load left to the external source, in the units of the input profile.
    pub external: LoadProfile,
    /// Temperatures with the served load.
    pub results: Results,
}

impl<O: GFunctionOracle> Borefield<O> {
    /// Caps the load power so that the field just stays within its limits at
    /// the current depth.
    ///
    /// A fraction `α` does not scale the whole load. It clips every step of
    /// its side at `α` times that side's maximum power, so the field keeps
    /// the base load and only the peaks above the cap go to the external
    /// source. Monthly energy is clipped at the cap held for a 730 h month.
    ///
    /// The engine load is replaced by the served part.
    ///
    /// # Errors
    ///
    /// Returns an error if no load is set or temperatures cannot be evaluated.
    pub fn optimise_load_power(&mut self) -> Result<LoadSplit, Error> {
        self.optimise_with(Capping::Power)
    }

    /// Caps monthly energy like [`Borefield::optimise_load_power`], but first
    /// moves energy above the cap to months of the same year that have room
    /// below it.
    ///
    /// Hourly loads are aggregated to months. The engine load is replaced by
    /// the served part.
    ///
    /// # Errors
    ///
    /// Returns an error if no load is set or temperatures cannot be evaluated.
    pub fn optimise_load_energy(&mut self) -> Result<LoadSplit, Error> {
        self.optimise_with(Capping::Energy)
    }

    fn optimise_with(&mut self, capping: Capping) -> Result<LoadSplit, Error> {
        self.setup().validate()?;
        let split = {
            let load = self.load().ok_or(LoadError::Missing)?;
            let years = self.setup().simulation_period;
            let demand = match capping {
                Capping::Power => load.profile().clone(),
                Capping::Energy => {
                    LoadProfile::multi_year_monthly(load.profile().monthly_view(years)?.to_load())
                }
            };
            let resolution = demand.resolution();
            let optimiser = Optimiser {
                borefield: self,
                load,
                maxima: demand.max_power(),
                demand,
                capping,
                resolution,
                depth: self.depth(),
                limits: *self.limits(),
            };
            optimiser.run()?
        };

        info!(
            extraction = split.extraction_fraction,
            injection = split.injection_fraction,
            "load optimised"
        );
        self.set_load(split.served.clone());
        self.store(split.results.clone(), None);
        Ok(split)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Capping {
    Power,
    Energy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Extraction,
    Injection,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Fractions {
    extraction: f64,
    injection: f64,
}

impl Fractions {
    /// Fractions with `side` at `value` and the other side at `other`.
    fn with(side: Side, value: f64, other: f64) -> Self {
        match side {
            Side::Extraction => Self {
                extraction: value,
                injection: other,
            },
            Side::Injection => Self {
                extraction: other,
                injection: value,
            },
        }
    }
}

struct Optimiser<'b, O> {
    borefield: &'b Borefield<O>,
    load: &'b Load,
    demand: LoadProfile,
    maxima: (f64, f64),
    capping: Capping,
    resolution: Resolution,
    depth: f64,
    limits: TemperatureLimits,
}

impl<O: GFunctionOracle> Optimiser<'_, O> {
    fn run(&self) -> Result<LoadSplit, Error> {
        let mut fractions = Fractions {
            extraction: 1.0,
            injection: 1.0,
        };
        for round in 1..=MAX_ROUNDS {
            let extraction = self.fit(Side::Extraction, fractions.injection)?;
            let injection = self.fit(Side::Injection, extraction)?;
            let change = (extraction - fractions.extraction)
                .abs()
                .max((injection - fractions.injection).abs());
            fractions = Fractions {
                extraction,
                injection,
            };
            debug!(round, extraction, injection, "load fractions");
            if change < FRACTION_TOLERANCE {
                break;
            }
        }

        let (served, external) = self.split(fractions);
        let served = self.load.map_profile(|_| served);
        let results = self.evaluate_load(&served)?;
        Ok(LoadSplit {
            extraction_fraction: fractions.extraction,
            injection_fraction: fractions.injection,
            served,
            external,
            results,
        })
    }

    /// Largest fraction on `side` that keeps its limit, with the other side
    /// held at `other`.
    fn fit(&self, side: Side, other: f64) -> Result<f64, Error> {
        let margin_at = |value: f64| -> Result<f64, Error> {
            let results = self.evaluate(Fractions::with(side, value, other))?;
            Ok(margin(side, &results, &self.limits))
        };
        if margin_at(1.0)? >= 0.0 {
            return Ok(1.0);
        }
        if margin_at(0.0)? < 0.0 {
            warn!(?side, "limit violated without any load on this side");
            return Ok(0.0);
        }

        let config = bisection::Config::new(
            MAX_BISECTIONS,
            FRACTION_TOLERANCE,
            0.0,
            TEMPERATURE_TOLERANCE,
        )
        .map_err(|err| Error::Solver(Box::new(err)))?;
        let problem = MarginProblem {
            side,
            other,
            limits: self.limits,
        };
        let solution = bisection::solve(
            &SplitModel { optimiser: self },
            &problem,
            [0.0, 1.0],
            &config,
            |event: &Event<'_, Fractions, Results>| -> Option<Action> {
                debug!(
                    iteration = event.iter,
                    fraction = event.x(),
                    margin = event.residual(),
                    ?side,
                    "load fraction"
                );
                None
            },
        )?;
        Ok(solution.x)
    }

    fn evaluate(&self, fractions: Fractions) -> Result<Results, Error> {
        let (served, _) = self.split(fractions);
        self.evaluate_load(&self.load.map_profile(|_| served))
    }

    fn evaluate_load(&self, load: &Load) -> Result<Results, Error> {
        let depth = self.depth;
        let ((), results) = self.borefield.with_consistent_state(
            load,
            depth,
            self.resolution,
            |_: &Simulator<'_, O>| Ok::<_, Error>(((), depth, None::<Quadrant>)),
        )?;
        Ok(results)
    }

    /// Served and external parts of the demand for the given caps.
    fn split(&self, fractions: Fractions) -> (LoadProfile, LoadProfile) {
        let (max_extraction, max_injection) = self.maxima;
        let extraction = fractions.extraction * max_extraction;
        let injection = fractions.injection * max_injection;
        match self.capping {
            Capping::Power => {
                let served = self.demand.capped(extraction, injection);
                let external = self.demand.remainder(&served);
                (served, external)
            }
            Capping::Energy => match &self.demand {
                LoadProfile::Monthly(load) | LoadProfile::MultiYearMonthly(load) => {
                    let (served, external) = shift_energy(load, extraction, injection);
                    (
                        LoadProfile::multi_year_monthly(served),
                        LoadProfile::multi_year_monthly(external),
                    )
                }
                LoadProfile::Hourly(_) | LoadProfile::MultiYearHourly(_) => {
                    let served = self.demand.capped(extraction, injection);
                    let external = self.demand.remainder(&served);
                    (served, external)
                }
            },
        }
    }
}

/// Distance of the fluid temperatures to the limit on `side`; negative when
/// violated.
fn margin(side: Side, results: &Results, limits: &TemperatureLimits) -> f64 {
    match side {
        Side::Extraction => results.min_temperature() - limits.min(),
        Side::Injection => limits.max() - results.max_temperature(),
    }
}

/// Caps monthly energy at `power` held for a uniform month and peaks at
/// `power`. Energy above the cap moves to months of the same year with room
/// below it, in proportion to that room; what does not fit stays external.
fn shift_energy(load: &MonthlyLoad, extraction: f64, injection: f64) -> (MonthlyLoad, MonthlyLoad) {
    let (served_extraction, external_extraction) =
        shift_side(load.baseload_extraction(), extraction * UNIFORM_MONTH_HOURS);
    let (served_injection, external_injection) =
        shift_side(load.baseload_injection(), injection * UNIFORM_MONTH_HOURS);
    let (peak_extraction, external_peak_extraction) = cap_side(load.peak_extraction(), extraction);
    let (peak_injection, external_peak_injection) = cap_side(load.peak_injection(), injection);
    (
        MonthlyLoad::from_parts_unchecked(
            served_extraction,
            served_injection,
            peak_extraction,
            peak_injection,
        ),
        MonthlyLoad::from_parts_unchecked(
            external_extraction,
            external_injection,
            external_peak_extraction,
            external_peak_injection,
        ),
    )
}

fn shift_side(energy: &[f64], cap: f64) -> (Vec<f64>, Vec<f64>) {
    let mut served = Vec::with_capacity(energy.len());
    let mut external = Vec::with_capacity(energy.len());
    for year in energy.chunks(MONTHS_PER_YEAR) {
        let excess: f64 = year.iter().map(|&v| (v - cap).max(0.0)).sum();
        let room: f64 = year.iter().map(|&v| (cap - v).max(0.0)).sum();
        let moved = excess.min(room);
        let fill = if room > 0.0 { moved / room } else { 0.0 };
        let kept = if excess > 0.0 { 1.0 - moved / excess } else { 0.0 };
        for &v in year {
            served.push(v.min(cap) + (cap - v).max(0.0) * fill);
            external.push((v - cap).max(0.0) * kept);
        }
    }
    (served, external)
}

fn cap_side(power: &[f64], cap: f64) -> (Vec<f64>, Vec<f64>) {
    power
        .iter()
        .map(|&v| (v.min(cap), (v - cap).max(0.0)))
        .unzip()
}

struct SplitModel<'o, 'b, O> {
    optimiser: &'o Optimiser<'b, O>,
}

impl<O: GFunctionOracle> Model for SplitModel<'_, '_, O> {
    type Input = Fractions;
    type Output = Results;
    type Error = Error;

    fn call(&self, fractions: &Fractions) -> Result<Results, Error> {
        self.optimiser.evaluate(*fractions)
    }
}

/// Residual is the margin to the limit on `side`.
struct MarginProblem {
    side: Side,
    other: f64,
    limits: TemperatureLimits,
}

impl EquationProblem<1> for MarginProblem {
    type Input = Fractions;
    type Output = Results;
    type Error = Error;

    fn input(&self, x: &[f64; 1]) -> Result<Fractions, Error> {
        Ok(Fractions::with(self.side, x[0], self.other))
    }

    fn residuals(&self, _: &Fractions, results: &Results) -> Result<[f64; 1], Error> {
        Ok([margin(self.side, results, &self.limits)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;
    use uom::si::{
        f64::{Length, ThermalConductivity, ThermodynamicTemperature, VolumetricHeatCapacity},
        length::meter,
        thermal_conductivity::watt_per_meter_kelvin,
        thermodynamic_temperature::degree_celsius,
        volumetric_heat_capacity::joule_per_cubic_meter_kelvin,
    };

    use crate::{
        geometry::{BoreholeField, BoreholeSpec},
        gfunction::GFunctionError,
        ground::Ground,
        resistance::BoreholeResistance,
        setup::CalculationSetup,
    };

    type Oracle = fn(&BoreholeField, f64, &[f64]) -> Result<Vec<f64>, GFunctionError>;

    fn oracle(field: &BoreholeField, _: f64, times: &[f64]) -> Result<Vec<f64>, GFunctionError> {
        let spread = 1.0 + 0.3 * (field.len() as f64).ln();
        Ok(times
            .iter()
            .map(|t| 0.5 + 5.0 * spread * (1.0 - (-(t / 3600.0).ln().max(0.0) / 7.0).exp()))
            .collect())
    }

    fn engine() -> Borefield<Oracle> {
        let m = Length::new::<meter>;
        let spec = BoreholeSpec::new(m(80.0), m(4.0), m(0.075)).unwrap();
        let field = BoreholeField::rectangle(3, 2, m(6.0), m(6.0), spec).unwrap();
        let ground = Ground::constant(
            ThermalConductivity::new::<watt_per_meter_kelvin>(2.5),
            VolumetricHeatCapacity::new::<joule_per_cubic_meter_kelvin>(2.4e6),
            ThermodynamicTemperature::new::<degree_celsius>(11.0),
        )
        .unwrap();
        let mut borefield = Borefield::new(field, ground, oracle as Oracle);
        borefield.set_resistance(BoreholeResistance::constant(0.12).unwrap());
        borefield
            .set_setup(CalculationSetup {
                simulation_period: 10,
                ..CalculationSetup::default()
            })
            .unwrap();
        borefield
    }

    fn load(scale: f64) -> LoadProfile {
        LoadProfile::monthly(
            [6000.0, 5000.0, 4000.0, 2000.0, 500.0, 0.0, 0.0, 0.0, 500.0, 2000.0, 4000.0, 5500.0],
            [0.0, 0.0, 200.0, 400.0, 800.0, 1200.0, 1400.0, 1200.0, 500.0, 0.0, 0.0, 0.0],
            [30.0, 27.0, 22.0, 15.0, 5.0, 0.0, 0.0, 0.0, 5.0, 15.0, 22.0, 28.0],
            [0.0, 0.0, 2.0, 4.0, 6.0, 8.0, 9.0, 8.0, 4.0, 0.0, 0.0, 0.0],
        )
        .unwrap()
        .scaled(scale, scale)
    }

    fn assert_touches_limits(split: &LoadSplit, limits: &TemperatureLimits) {
        for (side, fraction) in [
            (Side::Extraction, split.extraction_fraction),
            (Side::Injection, split.injection_fraction),
        ] {
            assert!((0.0..=1.0).contains(&fraction));
            let margin = margin(side, &split.results, limits);
            assert!(margin >= -0.1, "{side:?} violated by {margin}");
            if fraction > 0.0 && fraction < 1.0 {
                assert!(margin <= 0.1, "{side:?} left {margin} K unused");
            }
        }
    }

    #[test]
    fn load_that_fits_is_served_entirely() {
        let mut borefield = engine();
        borefield.set_load(load(0.2));

        let split = borefield.optimise_load_power().unwrap();
        assert_relative_eq!(split.extraction_fraction, 1.0);
        assert_relative_eq!(split.injection_fraction, 1.0);
        assert!(split.external.is_zero());
        assert_eq!(split.served.profile(), &load(0.2));
    }

    #[test]
    fn power_cap_touches_the_limit() {
        let mut borefield = engine();
        borefield.set_load(load(3.0));

        let split = borefield.optimise_load_power().unwrap();
        assert!(split.extraction_fraction < 1.0);
        assert_touches_limits(&split, borefield.limits());

        // Steps are clipped at the cap, not scaled by the fraction.
        let demand = load(3.0);
        let cap = split.extraction_fraction * demand.max_power().0;
        let LoadProfile::Monthly(served) = split.served.profile() else {
            panic!("expected a monthly load");
        };
        let LoadProfile::Monthly(demand) = &demand else {
            unreachable!()
        };
        for (served, demand) in served.peak_extraction().iter().zip(demand.peak_extraction()) {
            assert_relative_eq!(*served, demand.min(cap), epsilon = 1e-9);
        }
        for (served, demand) in served
            .baseload_extraction()
            .iter()
            .zip(demand.baseload_extraction())
        {
            assert_relative_eq!(*served, demand.min(cap * 730.0), epsilon = 1e-9);
        }
        assert_eq!(borefield.load(), Some(&split.served));
        assert_eq!(borefield.results(), Some(&split.results));
    }

    #[test]
    fn energy_shift_conserves_energy() {
        let mut borefield = engine();
        borefield.set_load(load(3.0));

        let split = borefield.optimise_load_energy().unwrap();
        assert_touches_limits(&split, borefield.limits());

        let years = borefield.setup().simulation_period;
        let served = split.served.profile().monthly_view(years).unwrap();
        let external = split.external.monthly_view(years).unwrap();
        let demand = load(3.0);
        let demand = demand.monthly_view(years).unwrap();
        let total = |view: &crate::load::MonthlyView<'_>| -> f64 {
            (0..view.months()).map(|k| view.baseload_extraction(k)).sum()
        };
        assert_relative_eq!(total(&served) + total(&external), total(&demand), max_relative = 1e-9);

        let (max_extraction, _) = load(3.0).max_power();
        let cap = split.extraction_fraction * max_extraction * UNIFORM_MONTH_HOURS;
        for k in 0..served.months() {
            assert!(served.baseload_extraction(k) <= cap + 1e-6);
        }
    }

    #[test]
    fn excess_energy_fills_months_with_room() {
        let energy = [
            900.0, 700.0, 500.0, 100.0, 0.0, 0.0, 0.0, 0.0, 0.0, 100.0, 500.0, 800.0,
        ];
        let (served, external) = shift_side(&energy, 600.0);

        assert_relative_eq!(served[0], 600.0);
        assert_relative_eq!(external.iter().sum::<f64>(), 0.0);
        assert_relative_eq!(served.iter().sum::<f64>(), energy.iter().sum::<f64>());
        assert!(served.iter().all(|&v| v <= 600.0 + 1e-9));
    }

    #[test]
    fn optimisation_needs_a_load() {
        let mut borefield = engine();
        assert!(matches!(
            borefield.optimise_load_power(),
            Err(Error::InvalidLoad(LoadError::Missing))
        ));
    }
}
