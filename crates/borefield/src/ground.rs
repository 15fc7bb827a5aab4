use serde::{Deserialize, Serialize};
use thiserror::Error;
use uom::si::{
    f64::{HeatFluxDensity, ThermalConductivity, ThermodynamicTemperature, VolumetricHeatCapacity},
    heat_flux_density::watt_per_square_meter,
    thermal_conductivity::watt_per_meter_kelvin,
    thermodynamic_temperature::degree_celsius,
    volumetric_heat_capacity::joule_per_cubic_meter_kelvin,
};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum GroundError {
    #[error("{name} must be positive and finite, got {value}")]
    NotPositive { name: &'static str, value: f64 },
    #[error("{name} must be finite, got {value}")]
    NotFinite { name: &'static str, value: f64 },
}

/// How the undisturbed ground temperature depends on borehole depth.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum GroundTemperature {
    /// A single temperature in °C.
    Constant { temperature: f64 },
    /// Geothermal heat flux `flux` [W/m²] below a surface at `surface` [°C].
    Flux { surface: f64, flux: f64 },
    /// Linear increase of `gradient` [K per 100 m] below `surface` [°C].
    Gradient { surface: f64, gradient: f64 },
}

/// Ground thermal properties and undisturbed temperature model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ground {
    conductivity: f64,
    volumetric_heat_capacity: f64,
    temperature: GroundTemperature,
}

impl Ground {
    /// Ground with a depth-independent temperature.
    ///
    /// # Errors
    ///
    /// Returns an error if conductivity or heat capacity is not positive.
    pub fn constant(
        conductivity: ThermalConductivity,
        volumetric_heat_capacity: VolumetricHeatCapacity,
        temperature: ThermodynamicTemperature,
    ) -> Result<Self, GroundError> {
        Self::new(
            conductivity,
            volumetric_heat_capacity,
            GroundTemperature::Constant {
                temperature: temperature.get::<degree_celsius>(),
            },
        )
    }

    /// Ground heated from below by a geothermal flux.
    ///
    /// # Errors
    ///
    /// Returns an error if conductivity or heat capacity is not positive.
    pub fn flux(
        conductivity: ThermalConductivity,
        volumetric_heat_capacity: VolumetricHeatCapacity,
        surface: ThermodynamicTemperature,
        flux: HeatFluxDensity,
    ) -> Result<Self, GroundError> {
        Self::new(
            conductivity,
            volumetric_heat_capacity,
            GroundTemperature::Flux {
                surface: surface.get::<degree_celsius>(),
                flux: flux.get::<watt_per_square_meter>(),
            },
        )
    }

    /// Ground with a fixed gradient in K per 100 m.
    ///
    /// # Errors
    ///
    /// Returns an error if conductivity or heat capacity is not positive.
    pub fn gradient(
        conductivity: ThermalConductivity,
        volumetric_heat_capacity: VolumetricHeatCapacity,
        surface: ThermodynamicTemperature,
        gradient_per_100m: f64,
    ) -> Result<Self, GroundError> {
        Self::new(
            conductivity,
            volumetric_heat_capacity,
            GroundTemperature::Gradient {
                surface: surface.get::<degree_celsius>(),
                gradient: gradient_per_100m,
            },
        )
    }

    /// Creates ground from a temperature model.
    ///
    /// # Errors
    ///
    /// Returns an error if conductivity or heat capacity is not positive, or a
    /// temperature parameter is not finite.
    pub fn new(
        conductivity: ThermalConductivity,
        volumetric_heat_capacity: VolumetricHeatCapacity,
        temperature: GroundTemperature,
    ) -> Result<Self, GroundError> {
        let ground = Self {
            conductivity: conductivity.get::<watt_per_meter_kelvin>(),
            volumetric_heat_capacity: volumetric_heat_capacity
                .get::<joule_per_cubic_meter_kelvin>(),
            temperature,
        };
        ground.validate()?;
        Ok(ground)
    }

    fn validate(&self) -> Result<(), GroundError> {
        for (name, value) in [
            ("conductivity", self.conductivity),
            ("volumetric_heat_capacity", self.volumetric_heat_capacity),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(GroundError::NotPositive { name, value });
            }
        }
        let params = match self.temperature {
            GroundTemperature::Constant { temperature } => [("temperature", temperature); 2],
            GroundTemperature::Flux { surface, flux } => [("surface", surface), ("flux", flux)],
            GroundTemperature::Gradient { surface, gradient } => {
                [("surface", surface), ("gradient", gradient)]
            }
        };
        for (name, value) in params {
            if !value.is_finite() {
                return Err(GroundError::NotFinite { name, value });
            }
        }
        Ok(())
    }

    /// Conductivity `k_s` in W/(m·K).
    #[must_use]
    pub fn conductivity(&self) -> f64 {
        self.conductivity
    }

    /// Volumetric heat capacity `ρc` in J/(m³·K).
    #[must_use]
    pub fn volumetric_heat_capacity(&self) -> f64 {
        self.volumetric_heat_capacity
    }

    /// Thermal diffusivity `α = k_s / ρc` in m²/s.
    #[must_use]
    pub fn diffusivity(&self) -> f64 {
        self.conductivity / self.volumetric_heat_capacity
    }

    #[must_use]
    pub fn temperature_model(&self) -> GroundTemperature {
        self.temperature
    }

    /// Mean undisturbed temperature along a borehole of `depth` metres.
    #[must_use]
    pub fn temperature_at(&self, depth: f64) -> f64 {
        match self.temperature {
            GroundTemperature::Constant { temperature } => temperature,
            GroundTemperature::Flux { surface, flux } => {
                surface + flux * depth / (2.0 * self.conductivity)
            }
            GroundTemperature::Gradient { surface, gradient } => surface + gradient * depth / 200.0,
        }
    }

    /// True if the undisturbed temperature varies with depth.
    #[must_use]
    pub fn depends_on_depth(&self) -> bool {
        !matches!(self.temperature, GroundTemperature::Constant { .. })
    }
}
