//! Depth sizing.
//!
//! Every method runs the same clamped fixed-point iteration on the borehole
//! depth: evaluate the fluid temperature watched by a quadrant, scale the
//! depth by the ratio of achieved to allowed excursion, repeat.
//!
//! - L2 evaluates three load pulses and, in automatic mode, sizes all four
//!   quadrants and keeps the deepest.
//! - L3 runs the monthly convolution. In automatic mode the side of the band
//!   follows the yearly imbalance, the year follows a first evaluation, and
//!   the result is checked against the other quadrants.
//! - L4 starts from the L3 depth and repeats the procedure on the hourly
//!   convolution, optionally on the critical hour only.

mod models;
mod problem;

use ghe_core::Model;
use ghe_solvers::fixed_point::{self, Action, Bound, Event, Solution, Status};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{
    Borefield, Error,
    gfunction::GFunctionOracle,
    load::{LoadError, Resolution},
    setup::{Method, Quadrant, QuadrantSizing, TemperatureLimits},
    temperature::Simulator,
};

use models::{ConvolutionModel, CriticalHourModel, PulseModel};
use problem::{Reading, QuadrantProblem};

/// Limit violations smaller than this [K] are accepted when checking a
/// sized depth.
const VERIFY_TOLERANCE: f64 = 1e-2;

/// Re-sizing rounds when the critical hour moves.
const MAX_CRITICAL_HOUR_ROUNDS: usize = 5;

/// How a sizing run ended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SizingOutcome {
    /// The limits are met at `depth`.
    Converged { depth: f64 },
    /// The maximum depth still violates a limit by `violation` kelvin.
    Clamped {
        depth: f64,
        violation: f64,
        temperature: f64,
        iteration: usize,
    },
    /// The iteration cap was hit; `depth` is the last evaluated depth.
    DidNotConverge {
        depth: f64,
        history: Vec<SizingStep>,
    },
}

impl SizingOutcome {
    #[must_use]
    pub fn depth(&self) -> f64 {
        match self {
            Self::Converged { depth }
            | Self::Clamped { depth, .. }
            | Self::DidNotConverge { depth, .. } => *depth,
        }
    }

    #[must_use]
    pub fn is_converged(&self) -> bool {
        matches!(self, Self::Converged { .. })
    }
}

/// One evaluated depth.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SizingStep {
    pub iteration: usize,
    pub depth: f64,
    /// Fluid temperature watched by the quadrant being sized [°C].
    pub temperature: f64,
    /// `Rb*` at this depth [m·K/W].
    pub resistance: f64,
}

/// Result of a sizing run with its diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SizingReport {
    pub outcome: SizingOutcome,
    /// Quadrant that limits the depth; `None` when no load constrains it.
    pub quadrant: Option<Quadrant>,
    pub method: Method,
    pub iterations: usize,
    pub history: Vec<SizingStep>,
}

impl SizingReport {
    #[must_use]
    pub fn depth(&self) -> f64 {
        self.outcome.depth()
    }

    /// The sized depth, or the matching error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FieldTooSmall`] for a clamped outcome and
    /// [`Error::SizingDidNotConverge`] if the iteration cap was hit.
    pub fn into_result(self) -> Result<f64, Error> {
        match self.outcome {
            SizingOutcome::Converged { depth } => Ok(depth),
            SizingOutcome::Clamped {
                depth,
                temperature,
                iteration,
                ..
            } => Err(Error::FieldTooSmall {
                iteration,
                depth,
                temperature,
            }),
            SizingOutcome::DidNotConverge { depth, history } => Err(Error::SizingDidNotConverge {
                iteration: history.len(),
                depth,
                temperature: history.last().map_or(f64::NAN, |step| step.temperature),
            }),
        }
    }
}

impl<O: GFunctionOracle> Borefield<O> {
    /// Sizes the depth with the configured method and returns it.
    ///
    /// The engine keeps the reached depth and its temperatures even when
    /// sizing fails.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FieldTooSmall`] if the limits cannot be met below the
    /// maximum depth, [`Error::SizingDidNotConverge`] if the iteration cap is
    /// hit, or any error raised while evaluating temperatures.
    pub fn size(&mut self) -> Result<f64, Error> {
        let method = self.setup().method;
        self.size_with(method)?.into_result()
    }

    /// Sizes with three load pulses.
    ///
    /// # Errors
    ///
    /// Returns an error if no load is set or temperatures cannot be evaluated.
    pub fn size_l2(&mut self) -> Result<SizingReport, Error> {
        self.size_with(Method::L2)
    }

    /// Sizes with the monthly convolution.
    ///
    /// # Errors
    ///
    /// Returns an error if no load is set or temperatures cannot be evaluated.
    pub fn size_l3(&mut self) -> Result<SizingReport, Error> {
        self.size_with(Method::L3)
    }

    /// Sizes with the hourly convolution.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::HourlyDataRequired`] for monthly loads, or an
    /// error if temperatures cannot be evaluated.
    pub fn size_l4(&mut self) -> Result<SizingReport, Error> {
        self.size_with(Method::L4)
    }

    pub(crate) fn size_with(&mut self, method: Method) -> Result<SizingReport, Error> {
        self.setup().validate()?;
        let load = self.load().ok_or(LoadError::Missing)?;
        let resolution = match method {
            Method::L4 => Resolution::Hourly,
            Method::L2 | Method::L3 => Resolution::Monthly,
        };
        if resolution == Resolution::Hourly && load.profile().resolution() != Resolution::Hourly {
            return Err(LoadError::HourlyDataRequired.into());
        }

        let setup = self.setup();
        let start = self.depth().clamp(setup.min_depth, setup.max_depth);
        let limits = *self.limits();
        let mut x0 = start;
        let (report, results) =
            self.with_consistent_state(load, start, resolution, |simulator| {
                let report = Sizer::new(simulator, limits)?.size(method, x0)?;
                x0 = report.depth();
                let (depth, quadrant) = (report.depth(), report.quadrant);
                Ok((report, depth, quadrant))
            })?;

        let depth = report.depth();
        self.set_depth(depth);
        self.store(results, report.quadrant);
        match &report.outcome {
            SizingOutcome::Converged { .. } => info!(
                depth,
                quadrant = report.quadrant.map(Quadrant::number),
                iterations = report.iterations,
                "sizing converged"
            ),
            SizingOutcome::Clamped {
                violation,
                temperature,
                ..
            } => warn!(depth, violation, temperature, "field too small at maximum depth"),
            SizingOutcome::DidNotConverge { .. } => {
                warn!(depth, iterations = report.iterations, "sizing did not converge");
            }
        }
        Ok(report)
    }
}

/// Temperature evaluation each sizing iteration relies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fidelity {
    Pulses,
    Monthly,
    Hourly,
}

/// Sizing on one simulator, i.e. for fixed `Rb*` and fluid temperature
/// estimates.
struct Sizer<'s, 'a, O: ?Sized> {
    simulator: &'s Simulator<'a, O>,
    limits: TemperatureLimits,
    config: fixed_point::Config,
    bounds: [f64; 2],
}

impl<'s, 'a, O: GFunctionOracle + ?Sized> Sizer<'s, 'a, O> {
    fn new(simulator: &'s Simulator<'a, O>, limits: TemperatureLimits) -> Result<Self, Error> {
        let setup = simulator.setup;
        let config = fixed_point::Config::new(setup.max_iterations, setup.atol, setup.rtol)
            .map_err(|err| Error::Solver(Box::new(err)))?;
        Ok(Self {
            simulator,
            limits,
            config,
            bounds: [setup.min_depth, setup.max_depth],
        })
    }

    fn size(&self, method: Method, x0: f64) -> Result<SizingReport, Error> {
        if self.simulator.load.is_zero() {
            warn!(depth = x0, "load is zero, keeping the starting depth");
            return Ok(SizingReport {
                outcome: SizingOutcome::Converged { depth: x0 },
                quadrant: None,
                method,
                iterations: 0,
                history: Vec::new(),
            });
        }

        let mut history = Vec::new();
        let (outcome, quadrant) = match method {
            Method::L2 => self.size_fidelity(Fidelity::Pulses, x0, &mut history)?,
            Method::L3 => self.size_fidelity(Fidelity::Monthly, x0, &mut history)?,
            Method::L4 => {
                let (warm, _) = self.size_fidelity(Fidelity::Monthly, x0, &mut history)?;
                debug!(depth = warm.depth(), "monthly warm start");
                self.size_fidelity(Fidelity::Hourly, warm.depth(), &mut history)?
            }
        };
        Ok(SizingReport {
            outcome,
            quadrant,
            method,
            iterations: history.len(),
            history,
        })
    }

    fn size_fidelity(
        &self,
        fidelity: Fidelity,
        x0: f64,
        history: &mut Vec<SizingStep>,
    ) -> Result<(SizingOutcome, Option<Quadrant>), Error> {
        match (self.simulator.setup.quadrant_sizing, fidelity) {
            (QuadrantSizing::Forced(quadrant), _) => {
                let outcome = self.size_quadrant(fidelity, quadrant, x0, history)?;
                Ok((outcome, Some(quadrant)))
            }
            (QuadrantSizing::Auto, Fidelity::Pulses) => self.deepest_quadrant(x0, history),
            (QuadrantSizing::Auto, _) => self.detected_quadrant(fidelity, x0, history),
        }
    }

    /// Sizes every quadrant and keeps the deepest.
    fn deepest_quadrant(
        &self,
        x0: f64,
        history: &mut Vec<SizingStep>,
    ) -> Result<(SizingOutcome, Option<Quadrant>), Error> {
        let mut deepest: Option<(SizingOutcome, Quadrant)> = None;
        for quadrant in Quadrant::ALL {
            let outcome = self.size_quadrant(Fidelity::Pulses, quadrant, x0, history)?;
            if !outcome.is_converged() {
                return Ok((outcome, Some(quadrant)));
            }
            match &deepest {
                Some((best, _)) if best.depth() >= outcome.depth() => {}
                _ => deepest = Some((outcome, quadrant)),
            }
        }
        Ok(match deepest {
            Some((outcome, quadrant)) => (outcome, Some(quadrant)),
            None => (SizingOutcome::Converged { depth: x0 }, None),
        })
    }

    /// Sizes the quadrant picked from the imbalance and a first evaluation,
    /// then re-sizes any other quadrant that the result violates.
    fn detected_quadrant(
        &self,
        fidelity: Fidelity,
        x0: f64,
        history: &mut Vec<SizingStep>,
    ) -> Result<(SizingOutcome, Option<Quadrant>), Error> {
        let resolution = match fidelity {
            Fidelity::Hourly => Resolution::Hourly,
            Fidelity::Pulses | Fidelity::Monthly => Resolution::Monthly,
        };
        let watches_max = self.simulator.load.imbalance() > 0.0;
        let first = Quadrant::from_parts(watches_max, true);
        let last = Quadrant::from_parts(watches_max, false);
        let initial = self.simulator.run(x0, resolution)?;
        let quadrant = if initial.slack(first, &self.limits) < initial.slack(last, &self.limits) {
            first
        } else {
            last
        };
        debug!(quadrant = quadrant.number(), "detected quadrant");

        let mut depth = match self.size_quadrant(fidelity, quadrant, x0, history)? {
            SizingOutcome::Converged { depth } => depth,
            other => return Ok((other, Some(quadrant))),
        };
        let mut sized = vec![quadrant];
        loop {
            let results = self.simulator.run(depth, resolution)?;
            let slack = |q: Quadrant| results.slack(q, &self.limits);
            let violated = Quadrant::ALL
                .into_iter()
                .filter(|q| !sized.contains(q))
                .find(|&q| slack(q) < -VERIFY_TOLERANCE);

            let Some(next) = violated else {
                let binding = Quadrant::ALL
                    .into_iter()
                    .min_by(|a, b| slack(*a).total_cmp(&slack(*b)));
                return Ok((SizingOutcome::Converged { depth }, binding));
            };
            debug!(quadrant = next.number(), depth, "limit violated, re-sizing");
            sized.push(next);
            match self.size_quadrant(fidelity, next, depth, history)? {
                SizingOutcome::Converged { depth: resized } => depth = depth.max(resized),
                other => return Ok((other, Some(next))),
            }
        }
    }

    fn size_quadrant(
        &self,
        fidelity: Fidelity,
        quadrant: Quadrant,
        x0: f64,
        history: &mut Vec<SizingStep>,
    ) -> Result<SizingOutcome, Error> {
        let simulator = self.simulator;
        match fidelity {
            Fidelity::Pulses => self.solve(
                &PulseModel {
                    simulator,
                    quadrant,
                },
                quadrant,
                x0,
                history,
            ),
            Fidelity::Monthly => self.solve(
                &ConvolutionModel {
                    simulator,
                    resolution: Resolution::Monthly,
                },
                quadrant,
                x0,
                history,
            ),
            Fidelity::Hourly if simulator.setup.speed_up => {
                self.size_critical_hour(quadrant, x0, history)
            }
            Fidelity::Hourly => self.solve(
                &ConvolutionModel {
                    simulator,
                    resolution: Resolution::Hourly,
                },
                quadrant,
                x0,
                history,
            ),
        }
    }

    /// Sizes on the hour that is critical at the current depth, then checks
    /// the full hourly run and moves to the new critical hour if needed.
    fn size_critical_hour(
        &self,
        quadrant: Quadrant,
        x0: f64,
        history: &mut Vec<SizingStep>,
    ) -> Result<SizingOutcome, Error> {
        let simulator = self.simulator;
        let mut depth = x0;
        let (mut hour, _) = simulator.run(depth, Resolution::Hourly)?.critical(quadrant);
        for round in 1..=MAX_CRITICAL_HOUR_ROUNDS {
            let model = CriticalHourModel { simulator, hour };
            depth = match self.solve(&model, quadrant, depth, history)? {
                SizingOutcome::Converged { depth } => depth,
                other => return Ok(other),
            };
            let results = simulator.run(depth, Resolution::Hourly)?;
            if results.slack(quadrant, &self.limits) >= -VERIFY_TOLERANCE {
                return Ok(SizingOutcome::Converged { depth });
            }
            let (critical, _) = results.critical(quadrant);
            debug!(round, from = hour, to = critical, "critical hour moved");
            hour = critical;
        }
        debug!(depth, "critical hour did not settle, sizing on the full run");
        let model = ConvolutionModel {
            simulator,
            resolution: Resolution::Hourly,
        };
        self.solve(&model, quadrant, depth, history)
    }

    fn solve<M>(
        &self,
        model: &M,
        quadrant: Quadrant,
        x0: f64,
        history: &mut Vec<SizingStep>,
    ) -> Result<SizingOutcome, Error>
    where
        M: Model<Input = f64, Output = Reading, Error = Error>,
    {
        let problem = QuadrantProblem {
            quadrant,
            limits: self.limits,
        };
        let offset = history.len();
        let observer = |event: &Event<'_, f64, Reading>| -> Option<Action> {
            let step = SizingStep {
                iteration: offset + event.iter,
                depth: event.x,
                temperature: event.snapshot.output.temperature(quadrant),
                resistance: event.snapshot.output.resistance(),
            };
            debug!(
                iteration = step.iteration,
                depth = step.depth,
                binding = step.temperature,
                quadrant = quadrant.number(),
                "sizing iteration"
            );
            history.push(step);
            None
        };
        let solution = fixed_point::solve(model, &problem, x0, self.bounds, &self.config, observer)?;
        Ok(self.outcome(&solution, quadrant, history))
    }

    fn outcome(
        &self,
        solution: &Solution<f64, Reading>,
        quadrant: Quadrant,
        history: &[SizingStep],
    ) -> SizingOutcome {
        match solution.status {
            Status::Converged | Status::Oscillating | Status::Clamped(Bound::Lower) => {
                SizingOutcome::Converged { depth: solution.x }
            }
            Status::Clamped(Bound::Upper) => {
                let temperature = solution.snapshot.output.temperature(quadrant);
                let violation = if quadrant.watches_max() {
                    temperature - self.limits.max()
                } else {
                    self.limits.min() - temperature
                };
                SizingOutcome::Clamped {
                    depth: solution.x,
                    violation,
                    temperature,
                    iteration: history.len(),
                }
            }
            Status::MaxIters | Status::StoppedByObserver => SizingOutcome::DidNotConverge {
                depth: solution.x,
                history: history.to_vec(),
            },
        }
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
        load::LoadProfile,
        resistance::BoreholeResistance,
        setup::CalculationSetup,
    };

    type Oracle = fn(&BoreholeField, f64, &[f64]) -> Result<Vec<f64>, GFunctionError>;

    /// Saturating response that grows with field size and, slowly, depth.
    fn oracle(field: &BoreholeField, _: f64, times: &[f64]) -> Result<Vec<f64>, GFunctionError> {
        let spread = 1.0 + 0.3 * (field.len() as f64).ln();
        let horizon = 6.0 + field.depth() / 100.0;
        Ok(times
            .iter()
            .map(|t| 0.5 + 5.0 * spread * (1.0 - (-(t / 3600.0).ln().max(0.0) / horizon).exp()))
            .collect())
    }

    fn engine(years: usize) -> Borefield<Oracle> {
        let m = Length::new::<meter>;
        let spec = BoreholeSpec::new(m(100.0), m(4.0), m(0.075)).unwrap();
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
                simulation_period: years,
                ..CalculationSetup::default()
            })
            .unwrap();
        borefield
    }

    fn heating_dominated() -> LoadProfile {
        LoadProfile::monthly(
            [6000.0, 5000.0, 4000.0, 2000.0, 500.0, 0.0, 0.0, 0.0, 500.0, 2000.0, 4000.0, 5500.0],
            [0.0, 0.0, 200.0, 400.0, 800.0, 1200.0, 1400.0, 1200.0, 500.0, 0.0, 0.0, 0.0],
            [30.0, 27.0, 22.0, 15.0, 5.0, 0.0, 0.0, 0.0, 5.0, 15.0, 22.0, 28.0],
            [0.0, 0.0, 2.0, 4.0, 6.0, 8.0, 9.0, 8.0, 4.0, 0.0, 0.0, 0.0],
        )
        .unwrap()
    }

    fn hourly() -> LoadProfile {
        use std::f64::consts::PI;
        let season = |h: usize| (2.0 * PI * h as f64 / 8760.0).cos();
        let day = |h: usize| (2.0 * PI * h as f64 / 24.0).sin();
        let extraction = (0..8760)
            .map(|h| (14.0 * season(h) + 4.0 * day(h)).max(0.0))
            .collect();
        let injection = (0..8760)
            .map(|h| (-10.0 * season(h) + 3.0 * day(h)).max(0.0))
            .collect();
        LoadProfile::hourly(extraction, injection).unwrap()
    }

    #[test]
    fn sized_depth_meets_the_limits() {
        let mut borefield = engine(10);
        borefield.set_load(heating_dominated());

        let depth = borefield.size().unwrap();
        assert!((15.0..500.0).contains(&depth));
        assert_relative_eq!(borefield.depth(), depth);

        let results = borefield.results().unwrap();
        assert!(results.min_temperature() >= -1e-2);
        assert!(results.max_temperature() <= 16.0 + 1e-2);
        // The binding limit is touched.
        assert!(results.min_temperature() < 0.05);
    }

    #[test]
    fn detected_quadrant_binds_the_result() {
        let mut borefield = engine(10);
        borefield.set_load(heating_dominated());

        let report = borefield.size_l3().unwrap();
        let quadrant = report.quadrant.unwrap();
        assert!(!quadrant.watches_max());
        assert_eq!(borefield.limiting_quadrant(), Some(quadrant));

        let results = borefield.results().unwrap();
        let slack = results.slack(quadrant, borefield.limits());
        for other in Quadrant::ALL {
            assert!(results.slack(other, borefield.limits()) >= slack);
        }
        assert!(slack.abs() < 0.05);
    }

    #[test]
    fn forced_quadrant_is_honoured() {
        let mut borefield = engine(10);
        borefield.set_load(heating_dominated());
        let auto = borefield.size().unwrap();

        let mut setup = borefield.setup().clone();
        setup.quadrant_sizing = QuadrantSizing::Forced(Quadrant::Three);
        borefield.set_setup(setup).unwrap();
        let report = borefield.size_l3().unwrap();

        assert_eq!(report.quadrant, Some(Quadrant::Three));
        // The first year of an extraction-dominated field is the mildest.
        assert!(report.depth() < auto);
    }

    #[test]
    fn l2_keeps_the_deepest_quadrant() {
        let mut borefield = engine(10);
        borefield.set_load(heating_dominated());
        let auto = borefield.size_l2().unwrap();

        let mut deepest: f64 = 0.0;
        for quadrant in Quadrant::ALL {
            let mut setup = borefield.setup().clone();
            setup.quadrant_sizing = QuadrantSizing::Forced(quadrant);
            borefield.set_setup(setup).unwrap();
            deepest = deepest.max(borefield.size_l2().unwrap().depth());
        }
        assert_relative_eq!(auto.depth(), deepest, max_relative = 1e-3);
    }

    #[test]
    fn too_small_field_reports_the_violation() {
        let mut borefield = engine(10);
        borefield.set_load(heating_dominated().scaled(20.0, 20.0));
        let mut setup = borefield.setup().clone();
        setup.max_depth = 60.0;
        borefield.set_setup(setup).unwrap();

        let report = borefield.size_l3().unwrap();
        match &report.outcome {
            SizingOutcome::Clamped {
                depth, violation, ..
            } => {
                assert_relative_eq!(*depth, 60.0);
                assert!(*violation > 0.0);
            }
            other => panic!("expected a clamped outcome, got {other:?}"),
        }
        assert_relative_eq!(borefield.depth(), 60.0);
        assert!(borefield.results().is_some());
        assert!(matches!(
            borefield.size(),
            Err(Error::FieldTooSmall { depth, .. }) if depth == 60.0
        ));
    }

    #[test]
    fn iteration_cap_is_reported() {
        let mut borefield = engine(10);
        borefield.set_load(heating_dominated());
        let mut setup = borefield.setup().clone();
        setup.max_iterations = 1;
        setup.quadrant_sizing = QuadrantSizing::Forced(Quadrant::Four);
        borefield.set_setup(setup).unwrap();

        assert!(matches!(
            borefield.size(),
            Err(Error::SizingDidNotConverge { iteration: 1, .. })
        ));
    }

    #[test]
    fn zero_load_keeps_the_starting_depth() {
        let mut borefield = engine(5);
        borefield.set_load(heating_dominated().scaled(0.0, 0.0));

        let report = borefield.size_l3().unwrap();
        assert_relative_eq!(report.depth(), 100.0);
        assert_eq!(report.quadrant, None);
        assert_eq!(report.iterations, 0);
    }

    #[test]
    fn hourly_sizing_needs_hourly_data() {
        let mut borefield = engine(5);
        borefield.set_load(heating_dominated());
        assert!(matches!(
            borefield.size_l4(),
            Err(Error::InvalidLoad(LoadError::HourlyDataRequired))
        ));
    }

    #[test]
    fn critical_hour_matches_full_hourly_sizing() {
        let mut borefield = engine(2);
        borefield.set_load(hourly());
        let full = borefield.size_l4().unwrap();
        assert!(full.outcome.is_converged());

        let mut setup = borefield.setup().clone();
        setup.speed_up = true;
        borefield.set_setup(setup).unwrap();
        let fast = borefield.size_l4().unwrap();

        assert_eq!(fast.quadrant, full.quadrant);
        assert_relative_eq!(fast.depth(), full.depth(), max_relative = 1e-2);
    }

    #[test]
    fn history_records_every_iteration() {
        let mut borefield = engine(5);
        borefield.set_load(heating_dominated());
        let report = borefield.size_l3().unwrap();

        assert_eq!(report.history.len(), report.iterations);
        for (k, step) in report.history.iter().enumerate() {
            assert_eq!(step.iteration, k + 1);
            assert_relative_eq!(step.resistance, 0.12);
        }
    }
}
