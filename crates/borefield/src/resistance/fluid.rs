use serde::{Deserialize, Serialize};
use uom::si::{
    dynamic_viscosity::pascal_second,
    f64::{DynamicViscosity, SpecificHeatCapacity, ThermalConductivity},
    specific_heat_capacity::joule_per_kilogram_kelvin,
    thermal_conductivity::watt_per_meter_kelvin,
};

use crate::interpolation::LinearTable;

use super::ResistanceError;

/// Heat transfer fluid properties in SI units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FluidState {
    /// W/(m·K)
    pub conductivity: f64,
    /// J/(kg·K)
    pub heat_capacity: f64,
    /// Pa·s
    pub viscosity: f64,
}

impl FluidState {
    /// Creates a validated state.
    ///
    /// # Errors
    ///
    /// Returns an error if a property is not positive.
    pub fn new(
        conductivity: ThermalConductivity,
        heat_capacity: SpecificHeatCapacity,
        viscosity: DynamicViscosity,
    ) -> Result<Self, ResistanceError> {
        let state = Self {
            conductivity: conductivity.get::<watt_per_meter_kelvin>(),
            heat_capacity: heat_capacity.get::<joule_per_kilogram_kelvin>(),
            viscosity: viscosity.get::<pascal_second>(),
        };
        state.validate()?;
        Ok(state)
    }

    fn validate(&self) -> Result<(), ResistanceError> {
        for (name, value) in [
            ("fluid conductivity", self.conductivity),
            ("fluid heat capacity", self.heat_capacity),
            ("fluid viscosity", self.viscosity),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ResistanceError::InvalidParameter { name, value });
            }
        }
        Ok(())
    }

    /// Prandtl number.
    #[must_use]
    pub fn prandtl(&self) -> f64 {
        self.viscosity * self.heat_capacity / self.conductivity
    }
}

/// Fluid properties as a function of temperature in °C.
pub trait FluidProperties {
    /// # Errors
    ///
    /// Returns an error if the properties cannot be evaluated at `temperature`.
    fn state(&self, temperature: f64) -> Result<FluidState, ResistanceError>;

    fn depends_on_temperature(&self) -> bool;
}

/// Temperature-independent fluid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConstantFluid(FluidState);

impl ConstantFluid {
    #[must_use]
    pub fn new(state: FluidState) -> Self {
        Self(state)
    }

    /// Water at about 10 °C.
    #[must_use]
    pub fn water() -> Self {
        Self(FluidState {
            conductivity: 0.58,
            heat_capacity: 4192.0,
            viscosity: 1.31e-3,
        })
    }
}

impl FluidProperties for ConstantFluid {
    fn state(&self, _temperature: f64) -> Result<FluidState, ResistanceError> {
        Ok(self.0)
    }

    fn depends_on_temperature(&self) -> bool {
        false
    }
}

/// Fluid with properties interpolated from temperature tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TabulatedFluid {
    conductivity: LinearTable,
    heat_capacity: LinearTable,
    viscosity: LinearTable,
}

impl TabulatedFluid {
    /// Tables keyed by temperature in °C, values in SI units.
    ///
    /// # Errors
    ///
    /// Returns an error if any tabulated value is not positive.
    pub fn new(
        conductivity: LinearTable,
        heat_capacity: LinearTable,
        viscosity: LinearTable,
    ) -> Result<Self, ResistanceError> {
        for (name, table) in [
            ("fluid conductivity", &conductivity),
            ("fluid heat capacity", &heat_capacity),
            ("fluid viscosity", &viscosity),
        ] {
            if let Some(&value) = table.y().iter().find(|v| !(v.is_finite() && **v > 0.0)) {
                return Err(ResistanceError::InvalidParameter { name, value });
            }
        }
        Ok(Self {
            conductivity,
            heat_capacity,
            viscosity,
        })
    }
}

impl FluidProperties for TabulatedFluid {
    fn state(&self, temperature: f64) -> Result<FluidState, ResistanceError> {
        Ok(FluidState {
            conductivity: self.conductivity.eval(temperature)?,
            heat_capacity: self.heat_capacity.eval(temperature)?,
            viscosity: self.viscosity.eval(temperature)?,
        })
    }

    fn depends_on_temperature(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;

    #[test]
    fn tabulated_fluid_interpolates() {
        let fluid = TabulatedFluid::new(
            LinearTable::new(vec![0.0, 20.0], vec![0.56, 0.60]).unwrap(),
            LinearTable::new(vec![0.0], vec![4200.0]).unwrap(),
            LinearTable::new(vec![0.0, 20.0], vec![1.8e-3, 1.0e-3]).unwrap(),
        )
        .unwrap();

        let state = fluid.state(10.0).unwrap();
        assert_relative_eq!(state.conductivity, 0.58, epsilon = 1e-12);
        assert_relative_eq!(state.heat_capacity, 4200.0);
        assert_relative_eq!(state.viscosity, 1.4e-3, epsilon = 1e-15);
        assert!(fluid.depends_on_temperature());
    }

    #[test]
    fn rejects_non_positive_properties() {
        let ok = LinearTable::new(vec![0.0], vec![1.0]).unwrap();
        let bad = LinearTable::new(vec![0.0, 1.0], vec![1.0, 0.0]).unwrap();
        assert!(matches!(
            TabulatedFluid::new(ok.clone(), ok, bad),
            Err(ResistanceError::InvalidParameter {
                name: "fluid viscosity",
                ..
            })
        ));
    }

    #[test]
    fn water_prandtl_number() {
        let water = ConstantFluid::water().state(10.0).unwrap();
        assert_relative_eq!(water.prandtl(), 9.47, max_relative = 1e-2);
    }
}
