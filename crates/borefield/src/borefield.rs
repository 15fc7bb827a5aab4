//! The borefield engine.
//!
//! A [`Borefield`] owns a layout, a ground model, a load, temperature limits,
//! a borehole resistance source and a [`CalculationSetup`], plus the
//! g-function cache for the current layout. Sizing, load optimisation and
//! geometry search are implemented on it in their own modules.

use std::{cell::RefCell, path::Path};

use tracing::{debug, info, warn};

use crate::{
    Error,
    geometry::BoreholeField,
    gfunction::{
        CacheOptions, FiniteLineSource, GFunctionCache, GFunctionDataset, GFunctionError,
        GFunctionOracle, TimeGrid,
    },
    ground::Ground,
    load::{FluidTemperatures, Load, LoadError, Resolution},
    resistance::{BoreholeResistance, ResistanceState},
    setup::{CalculationSetup, Quadrant, SetupError, TemperatureLimits},
    temperature::{GFunctionSource, ResistanceMode, Results, Simulator},
};

/// Outer rounds that reconcile depth with temperature-dependent inputs.
const MAX_CONSISTENCY_ROUNDS: usize = 10;

/// Change of the fluid temperature estimate [K] below which it is settled.
const TEMPERATURE_TOLERANCE: f64 = 0.01;

/// Polynomial investment cost in the total borehole length.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InvestmentCost {
    /// Cost per metre of borehole.
    pub per_metre: f64,
    /// Cost independent of length.
    pub fixed: f64,
}

impl Default for InvestmentCost {
    fn default() -> Self {
        Self {
            per_metre: 35.0,
            fixed: 0.0,
        }
    }
}

/// Ground heat exchanger engine.
///
/// Not thread-safe: parallel scenarios need one engine each.
#[derive(Debug)]
pub struct Borefield<O = FiniteLineSource> {
    oracle: O,
    field: BoreholeField,
    ground: Ground,
    load: Option<Load>,
    limits: TemperatureLimits,
    resistance: BoreholeResistance,
    setup: CalculationSetup,
    backup: Option<CalculationSetup>,
    cost: InvestmentCost,
    cache: RefCell<GFunctionCache>,
    results: Option<Results>,
    limiting_quadrant: Option<Quadrant>,
}

impl Borefield<FiniteLineSource> {
    /// Engine with the built-in finite line source oracle.
    #[must_use]
    pub fn with_finite_line_source(field: BoreholeField, ground: Ground) -> Self {
        Self::new(field, ground, FiniteLineSource::new())
    }
}

impl<O: GFunctionOracle> Borefield<O> {
    /// Creates an engine with default limits, resistance and setup and no
    /// load.
    pub fn new(field: BoreholeField, ground: Ground, oracle: O) -> Self {
        Self {
            oracle,
            field,
            ground,
            load: None,
            limits: TemperatureLimits::default(),
            resistance: BoreholeResistance::default(),
            setup: CalculationSetup::default(),
            backup: None,
            cost: InvestmentCost::default(),
            cache: RefCell::new(GFunctionCache::new()),
            results: None,
            limiting_quadrant: None,
        }
    }

    /// Sets the load. A multi-year profile also sets the simulation period.
    pub fn set_load(&mut self, load: impl Into<Load>) {
        let load = load.into();
        if let Some(years) = load.profile().data_years()
            && years != self.setup.simulation_period
        {
            info!(years, "simulation period follows the multi-year load");
            self.setup.simulation_period = years;
        }
        self.load = Some(load);
        self.invalidate_results();
    }

    /// Replaces the layout and drops every cached g-function.
    pub fn set_borefield(&mut self, field: BoreholeField) {
        self.field = field;
        self.cache.get_mut().clear();
        self.invalidate_results();
    }

    pub fn set_ground(&mut self, ground: Ground) {
        if ground.diffusivity() != self.ground.diffusivity() {
            self.cache.get_mut().clear();
        }
        self.ground = ground;
        self.invalidate_results();
    }

    pub fn set_limits(&mut self, limits: TemperatureLimits) {
        self.limits = limits;
        self.invalidate_results();
    }

    pub fn set_resistance(&mut self, resistance: BoreholeResistance) {
        self.resistance = resistance;
        self.invalidate_results();
    }

    pub fn set_investment_cost(&mut self, cost: InvestmentCost) {
        self.cost = cost;
    }

    #[must_use]
    pub fn setup(&self) -> &CalculationSetup {
        &self.setup
    }

    /// Replaces the setup after validating it.
    ///
    /// # Errors
    ///
    /// Returns an error if the setup is invalid or its period disagrees with a
    /// multi-year load.
    pub fn set_setup(&mut self, setup: CalculationSetup) -> Result<(), Error> {
        setup.validate()?;
        if let Some(data_years) = self.load.as_ref().and_then(|l| l.profile().data_years())
            && data_years != setup.simulation_period
        {
            return Err(LoadError::PeriodMismatch {
                data_years,
                simulation_years: setup.simulation_period,
            }
            .into());
        }
        self.setup = setup;
        self.invalidate_results();
        Ok(())
    }

    /// Saves the current setup for [`restore_backup`](Self::restore_backup).
    pub fn make_backup(&mut self) {
        self.backup = Some(self.setup.clone());
    }

    /// Restores the setup saved by [`make_backup`](Self::make_backup).
    ///
    /// # Errors
    ///
    /// Returns [`SetupError::NoBackup`] if no backup was made.
    pub fn restore_backup(&mut self) -> Result<(), Error> {
        let backup = self.backup.take().ok_or(SetupError::NoBackup)?;
        self.setup = backup;
        self.invalidate_results();
        Ok(())
    }

    /// The g-function oracle.
    #[must_use]
    pub fn oracle(&self) -> &O {
        &self.oracle
    }

    #[must_use]
    pub fn field(&self) -> &BoreholeField {
        &self.field
    }

    #[must_use]
    pub fn ground(&self) -> &Ground {
        &self.ground
    }

    #[must_use]
    pub fn load(&self) -> Option<&Load> {
        self.load.as_ref()
    }

    #[must_use]
    pub fn limits(&self) -> &TemperatureLimits {
        &self.limits
    }

    /// Current borehole depth [m].
    #[must_use]
    pub fn depth(&self) -> f64 {
        self.field.depth()
    }

    #[must_use]
    pub fn number_of_boreholes(&self) -> usize {
        self.field.len()
    }

    /// Total borehole length [m].
    #[must_use]
    pub fn total_length(&self) -> f64 {
        self.field.total_length()
    }

    #[must_use]
    pub fn investment_cost(&self) -> f64 {
        self.cost.fixed + self.cost.per_metre * self.total_length()
    }

    /// Undisturbed ground temperature at the current depth [°C].
    #[must_use]
    pub fn ground_temperature(&self) -> f64 {
        self.ground.temperature_at(self.depth())
    }

    /// G-function of the field at `depth` for `times` [s].
    ///
    /// # Errors
    ///
    /// Returns an error if the oracle fails or `depth` is not positive.
    pub fn gfunction(&self, times: &[f64], depth: f64) -> Result<Vec<f64>, Error> {
        Ok(self.gfunction_source().at(depth, times)?)
    }

    /// Computes g-functions at `depths` and replaces the cache with them.
    ///
    /// # Errors
    ///
    /// Returns the oracle's error.
    pub fn create_custom_dataset(&mut self, depths: &[f64]) -> Result<(), Error> {
        let diffusivity = self.ground.diffusivity();
        let grid = self.time_grid();
        info!(depths = depths.len(), "creating custom g-function dataset");
        let dataset = self
            .oracle
            .precompute(&self.field, diffusivity, grid.times(), depths)?;
        self.cache
            .get_mut()
            .load(dataset, &self.field, diffusivity, &grid);
        Ok(())
    }

    /// Writes the cached g-functions to `path` as JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the cache is empty or the file cannot be written.
    pub fn save_dataset(&self, path: impl AsRef<Path>) -> Result<(), Error> {
        let dataset = self
            .cache
            .borrow()
            .to_dataset()
            .ok_or(GFunctionError::InvalidDataset("no g-functions are cached"))?;
        dataset.save(path)
    }

    /// Loads a dataset written by [`save_dataset`](Self::save_dataset).
    ///
    /// Returns `false` and keeps the cache if the dataset was computed for a
    /// different layout, ground or simulation period.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not a valid dataset.
    pub fn load_dataset(&mut self, path: impl AsRef<Path>) -> Result<bool, Error> {
        let dataset = GFunctionDataset::load(path)?;
        let grid = self.time_grid();
        let accepted =
            self.cache
                .get_mut()
                .load(dataset, &self.field, self.ground.diffusivity(), &grid);
        if !accepted {
            warn!("g-function dataset does not match the borefield, discarded");
        }
        Ok(accepted)
    }

    /// Simulates the current depth at the given resolution and stores the
    /// results.
    ///
    /// # Errors
    ///
    /// Returns an error if no load is set, hourly results are requested for a
    /// monthly load, or a g-function or resistance cannot be evaluated.
    pub fn calculate_temperatures(&mut self, resolution: Resolution) -> Result<&Results, Error> {
        self.setup.validate()?;
        let load = self.load.as_ref().ok_or(LoadError::Missing)?;
        let depth = self.depth();
        let ((), results) =
            self.with_consistent_state(load, depth, resolution, |_| Ok(((), depth, None)))?;
        Ok(self.results.insert(results))
    }

    /// Results of the last simulation or sizing.
    #[must_use]
    pub fn results(&self) -> Option<&Results> {
        self.results.as_ref()
    }

    /// Quadrant that limited the last sizing, if it had one.
    #[must_use]
    pub fn limiting_quadrant(&self) -> Option<Quadrant> {
        self.limiting_quadrant
    }

    pub(crate) fn setup_mut(&mut self) -> &mut CalculationSetup {
        &mut self.setup
    }

    pub(crate) fn set_depth(&mut self, depth: f64) {
        self.field.set_depth(depth);
    }

    pub(crate) fn store(&mut self, results: Results, quadrant: Option<Quadrant>) {
        self.results = Some(results);
        self.limiting_quadrant = quadrant;
    }

    fn invalidate_results(&mut self) {
        self.results = None;
        self.limiting_quadrant = None;
    }

    fn time_grid(&self) -> TimeGrid {
        TimeGrid::for_period(self.setup.simulation_period)
    }

    fn gfunction_source(&self) -> GFunctionSource<'_, O> {
        GFunctionSource {
            oracle: &self.oracle,
            cache: &self.cache,
            field: &self.field,
            diffusivity: self.ground.diffusivity(),
            grid: self.time_grid(),
            options: CacheOptions {
                store_previous_values: self.setup.store_previous_values,
                interpolation_threshold: self.setup.interpolation_threshold,
            },
        }
    }

    /// `Rb*` source for a run starting at `start` with fluid temperature
    /// estimate `temperature`.
    fn resistance_mode(&self, start: f64, temperature: f64) -> Result<ResistanceMode<'_>, Error> {
        Ok(match &self.resistance {
            BoreholeResistance::Constant(value) => ResistanceMode::Fixed(*value),
            model if self.setup.use_constant_rb => {
                ResistanceMode::Fixed(model.evaluate(&ResistanceState {
                    depth: start,
                    fluid_temperature: self.ground.temperature_at(start),
                })?)
            }
            model => ResistanceMode::AtTemperature { model, temperature },
        })
    }

    /// True if the ground load or `Rb*` follows the fluid temperature.
    fn depends_on_temperature(&self, load: &Load) -> bool {
        load.depends_on_temperature()
            || (!self.setup.use_constant_rb && self.resistance.depends_on_temperature())
    }

    /// Runs `pass` until depth and fluid temperature estimate agree.
    ///
    /// `pass` receives a simulator built from the current estimate and returns
    /// a value, the depth it settled on and the quadrant that binds there. The
    /// fluid temperatures at that depth feed the next round. Without
    /// temperature-dependent inputs a single round is run.
    pub(crate) fn with_consistent_state<T>(
        &self,
        load: &Load,
        start: f64,
        resolution: Resolution,
        mut pass: impl FnMut(&Simulator<'_, O>) -> Result<(T, f64, Option<Quadrant>), Error>,
    ) -> Result<(T, Results), Error> {
        let years = self.setup.simulation_period;
        let frozen = self
            .setup
            .use_constant_tg
            .then(|| self.ground.temperature_at(start));
        let iterate = self.depends_on_temperature(load);

        let mut estimate = self.ground.temperature_at(start);
        let mut previous: Option<Results> = None;
        let mut last_depth = f64::NAN;
        let mut round = 1;
        loop {
            let profile = {
                let temperatures = previous
                    .as_ref()
                    .map_or(FluidTemperatures::Uniform(estimate), Results::fluid_temperatures);
                load.ground_profile(years, &temperatures)?
            };
            let simulator = Simulator {
                source: self.gfunction_source(),
                ground: &self.ground,
                setup: &self.setup,
                load: &*profile,
                resistance: self.resistance_mode(start, estimate)?,
                frozen_ground_temperature: frozen,
            };

            let (value, depth, quadrant) = pass(&simulator)?;
            let results = simulator.run(depth, resolution)?;
            let next = results.binding_temperature(quadrant);

            let settled = (depth - last_depth).abs() <= self.setup.atol
                && (next - estimate).abs() < TEMPERATURE_TOLERANCE;
            if !iterate || settled {
                return Ok((value, results));
            }
            if round == MAX_CONSISTENCY_ROUNDS {
                warn!(
                    depth,
                    temperature = next,
                    "fluid temperature estimate did not settle"
                );
                return Ok((value, results));
            }
            debug!(round, depth, temperature = next, "updating fluid temperature estimate");
            estimate = next;
            last_depth = depth;
            previous = Some(results);
            round += 1;
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
        geometry::BoreholeSpec,
        load::{BuildingLoad, Efficiency, LoadProfile},
        resistance::ResistanceError,
    };

    type Oracle = fn(&BoreholeField, f64, &[f64]) -> Result<Vec<f64>, GFunctionError>;

    fn oracle(field: &BoreholeField, _: f64, times: &[f64]) -> Result<Vec<f64>, GFunctionError> {
        let n = field.len() as f64;
        Ok(times
            .iter()
            .map(|t| (1.0 + 0.2 * n.ln()) * (t / 3600.0).ln().max(0.0) / 2.0 + 1.0)
            .collect())
    }

    fn engine() -> Borefield<Oracle> {
        let m = Length::new::<meter>;
        let spec = BoreholeSpec::new(m(100.0), m(4.0), m(0.075)).unwrap();
        let field = BoreholeField::rectangle(3, 2, m(6.0), m(6.0), spec).unwrap();
        let ground = Ground::constant(
            ThermalConductivity::new::<watt_per_meter_kelvin>(2.5),
            VolumetricHeatCapacity::new::<joule_per_cubic_meter_kelvin>(2.4e6),
            ThermodynamicTemperature::new::<degree_celsius>(11.0),
        )
        .unwrap();
        Borefield::new(field, ground, oracle as Oracle)
    }

    fn load() -> LoadProfile {
        LoadProfile::monthly([3000.0; 12], [1000.0; 12], [20.0; 12], [10.0; 12]).unwrap()
    }

    #[test]
    fn reports_field_quantities() {
        let mut borefield = engine();
        assert_eq!(borefield.number_of_boreholes(), 6);
        assert_relative_eq!(borefield.total_length(), 600.0);
        assert_relative_eq!(borefield.ground_temperature(), 11.0);

        borefield.set_investment_cost(InvestmentCost {
            per_metre: 40.0,
            fixed: 1000.0,
        });
        assert_relative_eq!(borefield.investment_cost(), 25_000.0);
    }

    #[test]
    fn backup_restores_the_setup() {
        let mut borefield = engine();
        assert!(matches!(
            borefield.restore_backup(),
            Err(Error::InvalidSetup(SetupError::NoBackup))
        ));

        borefield.make_backup();
        let mut setup = borefield.setup().clone();
        setup.simulation_period = 5;
        borefield.set_setup(setup).unwrap();
        assert_eq!(borefield.setup().simulation_period, 5);

        borefield.restore_backup().unwrap();
        assert_eq!(borefield.setup().simulation_period, 20);
    }

    #[test]
    fn multi_year_load_sets_the_period() {
        let mut borefield = engine();
        let two_years = load().expanded(2);
        borefield.set_load(two_years);
        assert_eq!(borefield.setup().simulation_period, 2);

        let mut setup = borefield.setup().clone();
        setup.simulation_period = 3;
        assert!(matches!(
            borefield.set_setup(setup),
            Err(Error::InvalidLoad(LoadError::PeriodMismatch { .. }))
        ));
    }

    #[test]
    fn temperatures_need_a_load() {
        let mut borefield = engine();
        assert!(matches!(
            borefield.calculate_temperatures(Resolution::Monthly),
            Err(Error::InvalidLoad(LoadError::Missing))
        ));

        borefield.set_load(load());
        let results = borefield.calculate_temperatures(Resolution::Monthly).unwrap();
        assert!(results.min_temperature() < 11.0);
        assert!(borefield.results().is_some());
        assert!(matches!(
            borefield.calculate_temperatures(Resolution::Hourly),
            Err(Error::InvalidLoad(LoadError::HourlyDataRequired))
        ));
    }

    #[test]
    fn gfunction_is_served_from_the_cache() {
        let borefield = engine();
        let g = borefield.gfunction(&[3600.0, 36_000.0], 100.0).unwrap();
        assert_relative_eq!(g[0], 1.0, epsilon = 1e-12);
        assert!(g[1] > g[0]);
        assert_eq!(borefield.cache.borrow().len(), 1);
    }

    #[test]
    fn temperature_dependent_resistance_settles() {
        let mut borefield = engine();
        borefield.set_load(load());
        borefield.set_resistance(BoreholeResistance::dynamic(|s: &ResistanceState| {
            Ok::<_, ResistanceError>(0.1 + 0.005 * (s.fluid_temperature - 11.0).abs())
        }));
        let mut setup = borefield.setup().clone();
        setup.use_constant_rb = false;
        setup.simulation_period = 5;
        borefield.set_setup(setup).unwrap();

        let results = borefield
            .calculate_temperatures(Resolution::Monthly)
            .unwrap()
            .clone();
        let expected = 0.1 + 0.005 * (results.min_temperature() - 11.0).abs();
        assert_relative_eq!(results.resistance(), expected, epsilon = 1e-3);
    }

    #[test]
    fn building_load_is_converted_before_simulation() {
        let mut borefield = engine();
        let demand = LoadProfile::monthly([4000.0; 12], [0.0; 12], [20.0; 12], [0.0; 12]).unwrap();
        borefield.set_load(BuildingLoad::new(demand, Efficiency::seasonal(4.0, 5.0).unwrap()));

        let building = borefield
            .calculate_temperatures(Resolution::Monthly)
            .unwrap()
            .clone();

        let ground = LoadProfile::monthly([3000.0; 12], [0.0; 12], [15.0; 12], [0.0; 12]).unwrap();
        borefield.set_load(ground);
        let direct = borefield.calculate_temperatures(Resolution::Monthly).unwrap();
        assert_relative_eq!(
            building.min_temperature(),
            direct.min_temperature(),
            epsilon = 1e-9
        );
    }
}
