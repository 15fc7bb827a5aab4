//! Temperature solver.
//!
//! Borehole wall temperatures follow from temporal superposition of the net
//! ground load with the g-function step response:
//!
//! ```text
//! Tb_k = Tg(H) + Σ_{j≤k} q_j · (g_{k−j} − g_{k−j−1}) / (2π k_s N H)
//! ```
//!
//! Fluid temperatures add the step's load times `Rb* / (N H)`. Monthly runs
//! stress each month with its peak and average powers, where a peak also
//! adds the ground response to its excess over the month average during the
//! peak duration; hourly runs use the hourly load directly.

mod convolution;
mod results;

pub use results::{HourlyResults, MonthlyResults, Results};

use std::{cell::RefCell, f64::consts::PI};

use crate::{
    Error,
    geometry::BoreholeField,
    gfunction::{CacheOptions, GFunctionCache, GFunctionError, GFunctionOracle, TimeGrid},
    ground::Ground,
    load::{HOURS_PER_YEAR, LoadProfile, MONTHS_PER_YEAR, Resolution, UNIFORM_MONTH_HOURS},
    resistance::{BoreholeResistance, ResistanceState},
    setup::{CalculationSetup, Quadrant},
};

const SECONDS_PER_HOUR: f64 = 3600.0;

/// G-function lookup through the engine cache for one layout.
pub(crate) struct GFunctionSource<'a, O: ?Sized> {
    pub oracle: &'a O,
    pub cache: &'a RefCell<GFunctionCache>,
    pub field: &'a BoreholeField,
    pub diffusivity: f64,
    pub grid: TimeGrid,
    pub options: CacheOptions,
}

impl<O: GFunctionOracle + ?Sized> GFunctionSource<'_, O> {
    /// G-function of the field at `depth`, resampled at `times` [s].
    pub fn at(&self, depth: f64, times: &[f64]) -> Result<Vec<f64>, GFunctionError> {
        let field = self.field.with_depth(depth);
        let values = self.cache.borrow_mut().values(
            self.oracle,
            &field,
            self.diffusivity,
            &self.grid,
            self.options,
        )?;
        self.grid.resample(&values, times)
    }
}

/// Where `Rb*` comes from during a run.
#[derive(Clone, Copy)]
pub(crate) enum ResistanceMode<'a> {
    /// A value fixed for the whole run.
    Fixed(f64),
    /// Evaluated at each depth for a fluid temperature estimate.
    AtTemperature {
        model: &'a BoreholeResistance,
        temperature: f64,
    },
}

/// Everything needed to compute temperatures at a trial depth.
pub(crate) struct Simulator<'a, O: ?Sized> {
    pub source: GFunctionSource<'a, O>,
    pub ground: &'a Ground,
    pub setup: &'a CalculationSetup,
    pub load: &'a LoadProfile,
    pub resistance: ResistanceMode<'a>,
    /// Ground temperature frozen at the starting depth, if any.
    pub frozen_ground_temperature: Option<f64>,
}

impl<O: GFunctionOracle + ?Sized> Simulator<'_, O> {
    pub fn years(&self) -> usize {
        self.setup.simulation_period
    }

    pub fn ground_temperature(&self, depth: f64) -> f64 {
        self.frozen_ground_temperature
            .unwrap_or_else(|| self.ground.temperature_at(depth))
    }

    pub fn resistance(&self, depth: f64) -> Result<f64, Error> {
        match self.resistance {
            ResistanceMode::Fixed(value) => Ok(value),
            ResistanceMode::AtTemperature { model, temperature } => Ok(model.evaluate(
                &ResistanceState {
                    depth,
                    fluid_temperature: temperature,
                },
            )?),
        }
    }

    fn total_length(&self, depth: f64) -> f64 {
        self.source.field.len() as f64 * depth
    }

    /// Wall temperature rise per unit of convolved load [K/W].
    fn wall_scale(&self, depth: f64) -> f64 {
        1.0 / (2.0 * PI * self.ground.conductivity() * self.total_length(depth))
    }

    pub fn run(&self, depth: f64, resolution: Resolution) -> Result<Results, Error> {
        match resolution {
            Resolution::Monthly => self.monthly(depth).map(Results::Monthly),
            Resolution::Hourly => self.hourly(depth).map(Results::Hourly),
        }
    }

    /// Monthly convolution with peak and average stressing.
    pub fn monthly(&self, depth: f64) -> Result<MonthlyResults, Error> {
        let years = self.years();
        let view = self.load.monthly_view(years)?;
        let months = view.months();
        let times: Vec<f64> = (1..=months)
            .map(|k| k as f64 * UNIFORM_MONTH_HOURS * SECONDS_PER_HOUR)
            .collect();
        let g = self.source.at(depth, &times)?;
        let response = convolution::causal(&view.net_powers(), &convolution::increments(&g));

        let tg = self.ground_temperature(depth);
        let rb = self.resistance(depth)?;
        let scale = self.wall_scale(depth);
        let fluid_scale = 1000.0 * rb / self.total_length(depth);

        let borehole_wall: Vec<f64> = response.iter().map(|r| tg + r * scale).collect();
        let stressed = |power: &dyn Fn(usize) -> f64, sign: f64| -> Vec<f64> {
            borehole_wall
                .iter()
                .enumerate()
                .map(|(k, tb)| tb + sign * power(k) * fluid_scale)
                .collect()
        };

        // A peak sits on top of its month's average power for the configured
        // duration, so the ground sees the excess as a short pulse.
        let peak_durations = [
            self.setup.peak_duration(false) * SECONDS_PER_HOUR,
            self.setup.peak_duration(true) * SECONDS_PER_HOUR,
        ];
        let g_peak = self.source.at(depth, &peak_durations)?;
        let pulse_scale = [1000.0 * g_peak[0] * scale, 1000.0 * g_peak[1] * scale];
        let peaked = |peak: &dyn Fn(usize) -> f64,
                      baseload: &dyn Fn(usize) -> f64,
                      sign: f64,
                      pulse_scale: f64|
         -> Vec<f64> {
            borehole_wall
                .iter()
                .enumerate()
                .map(|(k, tb)| {
                    let excess = (peak(k) - baseload(k) / UNIFORM_MONTH_HOURS).max(0.0);
                    tb + sign * (peak(k) * fluid_scale + excess * pulse_scale)
                })
                .collect()
        };

        Ok(MonthlyResults {
            peak_extraction: peaked(
                &|k| view.peak_extraction(k),
                &|k| view.baseload_extraction(k),
                -1.0,
                pulse_scale[0],
            ),
            peak_injection: peaked(
                &|k| view.peak_injection(k),
                &|k| view.baseload_injection(k),
                1.0,
                pulse_scale[1],
            ),
            baseload_extraction: stressed(
                &|k| view.baseload_extraction(k) / UNIFORM_MONTH_HOURS,
                -1.0,
            ),
            baseload_injection: stressed(
                &|k| view.baseload_injection(k) / UNIFORM_MONTH_HOURS,
                1.0,
            ),
            borehole_wall,
            resistance: rb,
            ground_temperature: tg,
            years,
        })
    }

    /// Hourly convolution.
    pub fn hourly(&self, depth: f64) -> Result<HourlyResults, Error> {
        let years = self.years();
        let view = self.load.hourly_view(years)?;
        let q = view.net_powers();
        let g = self.source.at(depth, &hour_ends(q.len()))?;
        let response = convolution::causal(&q, &convolution::increments(&g));

        let tg = self.ground_temperature(depth);
        let rb = self.resistance(depth)?;
        let scale = self.wall_scale(depth);
        let fluid_scale = rb / self.total_length(depth);

        let borehole_wall: Vec<f64> = response.iter().map(|r| tg + r * scale).collect();
        let fluid = borehole_wall
            .iter()
            .zip(&q)
            .map(|(tb, q)| tb + q * fluid_scale)
            .collect();

        Ok(HourlyResults {
            borehole_wall,
            fluid,
            resistance: rb,
            ground_temperature: tg,
            years,
        })
    }

    /// Fluid temperature at a single `hour` of the hourly simulation.
    pub fn hourly_at(&self, depth: f64, hour: usize) -> Result<f64, Error> {
        let view = self.load.hourly_view(self.years())?;
        let hour = hour.min(view.hours().saturating_sub(1));
        let q: Vec<f64> = (0..=hour).map(|h| view.net_power(h)).collect();
        let g = self.source.at(depth, &hour_ends(hour + 1))?;
        let response = convolution::at(&q, &convolution::increments(&g), hour);

        let rb = self.resistance(depth)?;
        Ok(self.ground_temperature(depth)
            + response * self.wall_scale(depth)
            + q[hour] * rb / self.total_length(depth))
    }

    /// Fluid temperature from three load pulses, for the side and year of
    /// `quadrant`.
    ///
    /// The critical month is the one with the highest peak on that side. A
    /// peak of the configured duration follows a month at that month's net
    /// load, which follows the long-term imbalance: the months before the
    /// critical one for the first year, or the whole period at its mean
    /// imbalance for the last year.
    pub fn pulses(&self, depth: f64, quadrant: Quadrant) -> Result<f64, Error> {
        let years = self.years();
        let view = self.load.monthly_view(years)?;
        let watches_max = quadrant.watches_max();
        let side = if watches_max { 1.0 } else { -1.0 };
        let peak = |k: usize| {
            if watches_max {
                view.peak_injection(k)
            } else {
                view.peak_extraction(k)
            }
        };

        let start = if quadrant.first_year() {
            0
        } else {
            (years - 1) * MONTHS_PER_YEAR
        };
        let mut critical = start;
        for k in start..start + MONTHS_PER_YEAR {
            if peak(k) > peak(critical) {
                critical = k;
            }
        }

        let q_peak = peak(critical) * 1000.0;
        let q_month = side * view.net_power(critical);
        let (t_prior, q_prior) = if quadrant.first_year() {
            let before = critical - start;
            let mean = (0..before).map(|k| view.net_power(k)).sum::<f64>() / before.max(1) as f64;
            (
                before as f64 * UNIFORM_MONTH_HOURS * SECONDS_PER_HOUR,
                side * mean,
            )
        } else {
            let mean = view.net_powers().iter().sum::<f64>() / view.months() as f64;
            (
                (years * HOURS_PER_YEAR) as f64 * SECONDS_PER_HOUR,
                side * mean,
            )
        };

        let t_peak = self.setup.peak_duration(watches_max) * SECONDS_PER_HOUR;
        let t_month = UNIFORM_MONTH_HOURS * SECONDS_PER_HOUR;
        let mut times = vec![t_peak, t_peak + t_month];
        if t_prior > 0.0 {
            times.push(t_peak + t_month + t_prior);
        }
        let g = self.source.at(depth, &times)?;
        let r_peak = g[0];
        let r_month = g[1] - g[0];
        let r_prior = g.get(2).map_or(0.0, |g2| g2 - g[1]);

        let rb = self.resistance(depth)?;
        let length = self.total_length(depth);
        let rise = (q_prior * r_prior + q_month * r_month + q_peak * r_peak)
            / (2.0 * PI * self.ground.conductivity())
            + q_peak * rb;
        Ok(self.ground_temperature(depth) + side * rise / length)
    }
}

/// End times of the first `hours` hours [s].
fn hour_ends(hours: usize) -> Vec<f64> {
    (1..=hours).map(|h| h as f64 * SECONDS_PER_HOUR).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::{assert_abs_diff_eq, assert_relative_eq};
    use uom::si::{
        f64::{Length, ThermalConductivity, ThermodynamicTemperature, VolumetricHeatCapacity},
        length::meter,
        thermal_conductivity::watt_per_meter_kelvin,
        thermodynamic_temperature::degree_celsius,
        volumetric_heat_capacity::joule_per_cubic_meter_kelvin,
    };

    use crate::{geometry::BoreholeSpec, load::MonthlyLoad};

    type Oracle = fn(&BoreholeField, f64, &[f64]) -> Result<Vec<f64>, GFunctionError>;

    /// Grows like a line source and saturates like a finite field.
    fn oracle(_: &BoreholeField, _: f64, times: &[f64]) -> Result<Vec<f64>, GFunctionError> {
        Ok(times
            .iter()
            .map(|t| 6.0 * (1.0 - (-(t / 3600.0).ln().max(0.0) / 8.0).exp()) + 1.0)
            .collect())
    }

    struct Fixture {
        field: BoreholeField,
        ground: Ground,
        setup: CalculationSetup,
        cache: RefCell<GFunctionCache>,
    }

    impl Fixture {
        fn new(years: usize) -> Self {
            let m = Length::new::<meter>;
            let spec = BoreholeSpec::new(m(100.0), m(4.0), m(0.075)).unwrap();
            let ground = Ground::constant(
                ThermalConductivity::new::<watt_per_meter_kelvin>(2.0),
                VolumetricHeatCapacity::new::<joule_per_cubic_meter_kelvin>(2.4e6),
                ThermodynamicTemperature::new::<degree_celsius>(10.0),
            )
            .unwrap();
            Self {
                field: BoreholeField::rectangle(2, 2, m(6.0), m(6.0), spec).unwrap(),
                ground,
                setup: CalculationSetup {
                    simulation_period: years,
                    ..CalculationSetup::default()
                },
                cache: RefCell::new(GFunctionCache::new()),
            }
        }

        fn simulator<'a>(&'a self, load: &'a LoadProfile) -> Simulator<'a, Oracle> {
            const ORACLE: Oracle = oracle;
            Simulator {
                source: GFunctionSource {
                    oracle: &ORACLE,
                    cache: &self.cache,
                    field: &self.field,
                    diffusivity: self.ground.diffusivity(),
                    grid: TimeGrid::for_period(self.setup.simulation_period),
                    options: CacheOptions::default(),
                },
                ground: &self.ground,
                setup: &self.setup,
                load,
                resistance: ResistanceMode::Fixed(0.1),
                frozen_ground_temperature: None,
            }
        }
    }

    fn monthly_load(extraction: f64, injection: f64, peak: f64) -> LoadProfile {
        LoadProfile::monthly(
            [extraction; 12],
            [injection; 12],
            [peak; 12],
            [peak; 12],
        )
        .unwrap()
    }

    #[test]
    fn zero_load_stays_at_ground_temperature() {
        let fixture = Fixture::new(3);
        let load = monthly_load(0.0, 0.0, 0.0);
        let results = fixture.simulator(&load).monthly(100.0).unwrap();
        for series in [
            &results.borehole_wall,
            &results.peak_extraction,
            &results.peak_injection,
        ] {
            for t in series {
                assert_abs_diff_eq!(*t, 10.0, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn symmetric_load_envelope_depends_only_on_resistance() {
        let fixture = Fixture::new(2);
        let load = monthly_load(5000.0, 5000.0, 20.0);
        let simulator = fixture.simulator(&load);
        let results = Results::Monthly(simulator.monthly(100.0).unwrap());

        // 20 kW over 400 m at 0.1 m·K/W, plus the 6 h pulse of the excess
        // over the 5000 kWh month.
        let g_peak = simulator.source.at(100.0, &[6.0 * 3600.0]).unwrap()[0];
        let pulse = (20.0 - 5000.0 / 730.0) * 1000.0 * g_peak / (2.0 * PI * 2.0 * 400.0);
        assert_relative_eq!(results.max_temperature(), 15.0 + pulse, epsilon = 1e-9);
        assert_relative_eq!(results.min_temperature(), 5.0 - pulse, epsilon = 1e-9);
    }

    #[test]
    fn longer_peaks_stress_the_fluid_further() {
        let mut fixture = Fixture::new(2);
        let load = monthly_load(2000.0, 1000.0, 25.0);
        let short = fixture.simulator(&load).monthly(100.0).unwrap();

        fixture.setup.peak_duration_heating = 12.0;
        fixture.setup.peak_duration_cooling = 12.0;
        let long = fixture.simulator(&load).monthly(100.0).unwrap();

        for (s, l) in short.peak_extraction.iter().zip(&long.peak_extraction) {
            assert!(l < s);
        }
        for (s, l) in short.peak_injection.iter().zip(&long.peak_injection) {
            assert!(l > s);
        }
        assert_eq!(short.borehole_wall, long.borehole_wall);
        assert_eq!(short.baseload_extraction, long.baseload_extraction);
    }

    #[test]
    fn constant_load_follows_the_step_response() {
        let fixture = Fixture::new(2);
        let load = monthly_load(0.0, 730.0, 1.0);
        let simulator = fixture.simulator(&load);
        let results = simulator.monthly(100.0).unwrap();

        // 1 kW of net injection from the first month on.
        let times: Vec<f64> = (1..=24).map(|k| k as f64 * 730.0 * 3600.0).collect();
        let g = simulator.source.at(100.0, &times).unwrap();
        let scale = 1000.0 / (2.0 * PI * 2.0 * 400.0);
        for (tb, g) in results.borehole_wall.iter().zip(&g) {
            assert_relative_eq!(*tb, 10.0 + g * scale, max_relative = 1e-12);
        }
    }

    #[test]
    fn temperatures_superpose() {
        let fixture = Fixture::new(2);
        let a = LoadProfile::monthly(
            [3000.0, 2000.0, 1000.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1000.0, 2000.0, 3000.0],
            [0.0, 0.0, 0.0, 500.0, 1500.0, 2500.0, 3000.0, 2500.0, 1000.0, 0.0, 0.0, 0.0],
            [10.0; 12],
            [8.0; 12],
        )
        .unwrap();
        let b = monthly_load(1200.0, 400.0, 5.0);
        let sum = LoadProfile::multi_year_monthly(
            MonthlyLoad::new(
                combine(&a, &b, |l| l.baseload_extraction().to_vec()),
                combine(&a, &b, |l| l.baseload_injection().to_vec()),
                combine(&a, &b, |l| l.peak_extraction().to_vec()),
                combine(&a, &b, |l| l.peak_injection().to_vec()),
            )
            .unwrap(),
        );

        let wall = |load: &LoadProfile| {
            fixture.simulator(load).monthly(90.0).unwrap().borehole_wall
        };
        let (ta, tb) = (wall(&a), wall(&b));
        for ((ta, tb), tab) in ta.iter().zip(&tb).zip(wall(&sum)) {
            assert_abs_diff_eq!(tab - 10.0, (ta - 10.0) + (tb - 10.0), epsilon = 1e-9);
        }
    }

    fn combine(
        a: &LoadProfile,
        b: &LoadProfile,
        part: impl Fn(&MonthlyLoad) -> Vec<f64>,
    ) -> Vec<f64> {
        let tiled = |profile: &LoadProfile| match profile.expanded(2) {
            LoadProfile::MultiYearMonthly(load) => part(&load),
            _ => unreachable!(),
        };
        tiled(a).iter().zip(tiled(b)).map(|(x, y)| x + y).collect()
    }

    #[test]
    fn hourly_point_matches_the_full_run() {
        let fixture = Fixture::new(1);
        let extraction: Vec<f64> = (0..8760).map(|h| 10.0 + (h % 24) as f64).collect();
        let injection: Vec<f64> = (0..8760).map(|h| ((h / 730) % 3) as f64 * 7.0).collect();
        let load = LoadProfile::hourly(extraction, injection).unwrap();
        let simulator = fixture.simulator(&load);

        let full = simulator.hourly(120.0).unwrap();
        for hour in [0, 17, 4000, 8759] {
            assert_relative_eq!(
                simulator.hourly_at(120.0, hour).unwrap(),
                full.fluid[hour],
                max_relative = 1e-9
            );
        }
    }

    #[test]
    fn pulses_bracket_the_ground_temperature() {
        let fixture = Fixture::new(5);
        let load = LoadProfile::monthly(
            [2000.0; 12],
            [500.0; 12],
            [30.0, 25.0, 20.0, 10.0, 5.0, 0.0, 0.0, 0.0, 5.0, 10.0, 20.0, 28.0],
            [0.0, 0.0, 0.0, 5.0, 10.0, 15.0, 20.0, 15.0, 5.0, 0.0, 0.0, 0.0],
        )
        .unwrap();
        let simulator = fixture.simulator(&load);

        let first = simulator.pulses(100.0, Quadrant::Three).unwrap();
        let last = simulator.pulses(100.0, Quadrant::Four).unwrap();
        assert!(first < 10.0);
        // Extraction dominates, so the last year is colder.
        assert!(last < first);
        assert!(simulator.pulses(150.0, Quadrant::Four).unwrap() > last);
    }
}
