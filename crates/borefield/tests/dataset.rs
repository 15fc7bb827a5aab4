//! G-function datasets written by one engine and read by another.

use std::{cell::Cell, path::PathBuf};

use approx::assert_relative_eq;
use ghe_borefield::{
    Borefield, Error,
    geometry::{BoreholeField, BoreholeSpec},
    gfunction::{GFunctionError, GFunctionOracle},
    ground::Ground,
};
use uom::si::{
    f64::{Length, ThermalConductivity, ThermodynamicTemperature, VolumetricHeatCapacity},
    length::meter,
    thermal_conductivity::watt_per_meter_kelvin,
    thermodynamic_temperature::degree_celsius,
    volumetric_heat_capacity::joule_per_cubic_meter_kelvin,
};

/// Counts how often it is asked for a g-function.
#[derive(Debug, Default)]
struct Counting {
    calls: Cell<usize>,
}

impl GFunctionOracle for Counting {
    fn compute(
        &self,
        field: &BoreholeField,
        _diffusivity: f64,
        times: &[f64],
    ) -> Result<Vec<f64>, GFunctionError> {
        self.calls.set(self.calls.get() + 1);
        let scale = 1.0 + field.depth() / 200.0;
        Ok(times
            .iter()
            .map(|t| 1.0 + scale * (t / 3600.0).ln().max(0.0) / 2.0)
            .collect())
    }
}

fn engine(n1: usize, n2: usize) -> Borefield<Counting> {
    let m = Length::new::<meter>;
    let spec = BoreholeSpec::new(m(100.0), m(4.0), m(0.075)).unwrap();
    let field = BoreholeField::rectangle(n1, n2, m(6.0), m(6.0), spec).unwrap();
    let ground = Ground::constant(
        ThermalConductivity::new::<watt_per_meter_kelvin>(2.5),
        VolumetricHeatCapacity::new::<joule_per_cubic_meter_kelvin>(2.4e6),
        ThermodynamicTemperature::new::<degree_celsius>(11.0),
    )
    .unwrap();
    Borefield::new(field, ground, Counting::default())
}

fn scratch(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("ghe-{name}-{}.json", std::process::id()))
}

#[test]
fn saved_dataset_serves_another_engine() {
    let path = scratch("serves");
    let times = [3600.0, 86_400.0, 2.6e6, 3.15e7];

    let mut source = engine(2, 2);
    source.create_custom_dataset(&[50.0, 100.0, 150.0]).unwrap();
    source.save_dataset(&path).unwrap();
    let expected = source.gfunction(&times, 100.0).unwrap();

    let mut target = engine(2, 2);
    assert!(target.load_dataset(&path).unwrap());
    let served = target.gfunction(&times, 100.0).unwrap();
    assert_eq!(target_calls(&target), 0);
    for (a, b) in served.iter().zip(&expected) {
        assert_relative_eq!(a, b, max_relative = 1e-12);
    }

    std::fs::remove_file(&path).unwrap();
}

#[test]
fn dataset_for_another_layout_is_discarded() {
    let path = scratch("discarded");

    let mut source = engine(2, 2);
    source.create_custom_dataset(&[80.0, 120.0]).unwrap();
    source.save_dataset(&path).unwrap();

    let mut target = engine(3, 2);
    assert!(!target.load_dataset(&path).unwrap());
    target.gfunction(&[3600.0], 100.0).unwrap();
    assert_eq!(target_calls(&target), 1);

    std::fs::remove_file(&path).unwrap();
}

#[test]
fn empty_cache_cannot_be_saved() {
    let borefield = engine(1, 1);
    assert!(matches!(
        borefield.save_dataset(scratch("empty")),
        Err(Error::GFunctionUnavailable(GFunctionError::InvalidDataset(_)))
    ));
}

#[test]
fn missing_file_is_an_io_error() {
    let mut borefield = engine(1, 1);
    assert!(matches!(
        borefield.load_dataset(scratch("missing")),
        Err(Error::Io(_))
    ));
}

fn target_calls(borefield: &Borefield<Counting>) -> usize {
    borefield.oracle().calls.get()
}
