//! Effective borehole thermal resistance `Rb*`.
//!
//! The engine asks a [`BoreholeResistance`] for `Rb*` at a depth and mean fluid
//! temperature. A constant resistance ignores both; a dynamic one delegates to
//! any [`ResistanceModel`], such as [`SingleUTube`] or a closure.

mod error;
mod fluid;
mod u_tube;

pub use error::ResistanceError;
pub use fluid::{ConstantFluid, FluidProperties, FluidState, TabulatedFluid};
pub use u_tube::{SingleUTube, UTubeLayout};

use std::{fmt, sync::Arc};

/// Conditions at which a dynamic resistance is evaluated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResistanceState {
    /// Borehole depth in metres.
    pub depth: f64,
    /// Mean fluid temperature in °C.
    pub fluid_temperature: f64,
}

/// Computes `Rb*` in m·K/W.
pub trait ResistanceModel {
    /// # Errors
    ///
    /// Returns an error if the resistance cannot be computed at `state`.
    fn effective_resistance(&self, state: &ResistanceState) -> Result<f64, ResistanceError>;

    /// True if the result depends on the fluid temperature.
    fn depends_on_temperature(&self) -> bool {
        true
    }
}

impl<F> ResistanceModel for F
where
    F: Fn(&ResistanceState) -> Result<f64, ResistanceError>,
{
    fn effective_resistance(&self, state: &ResistanceState) -> Result<f64, ResistanceError> {
        self(state)
    }
}

/// Borehole resistance source used by the engine.
#[derive(Clone)]
pub enum BoreholeResistance {
    Constant(f64),
    Dynamic(Arc<dyn ResistanceModel + Send + Sync>),
}

impl fmt::Debug for BoreholeResistance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Constant(value) => f.debug_tuple("Constant").field(value).finish(),
            Self::Dynamic(_) => f.write_str("Dynamic(..)"),
        }
    }
}

impl Default for BoreholeResistance {
    fn default() -> Self {
        Self::Constant(0.12)
    }
}

impl BoreholeResistance {
    /// A fixed resistance in m·K/W.
    ///
    /// # Errors
    ///
    /// Returns an error if `value` is not positive and finite.
    pub fn constant(value: f64) -> Result<Self, ResistanceError> {
        if value.is_finite() && value > 0.0 {
            Ok(Self::Constant(value))
        } else {
            Err(ResistanceError::InvalidParameter {
                name: "borehole resistance",
                value,
            })
        }
    }

    pub fn dynamic(model: impl ResistanceModel + Send + Sync + 'static) -> Self {
        Self::Dynamic(Arc::new(model))
    }

    #[must_use]
    pub fn is_constant(&self) -> bool {
        matches!(self, Self::Constant(_))
    }

    /// True if the resistance changes with the fluid temperature.
    #[must_use]
    pub fn depends_on_temperature(&self) -> bool {
        match self {
            Self::Constant(_) => false,
            Self::Dynamic(model) => model.depends_on_temperature(),
        }
    }

    /// `Rb*` at `state`.
    ///
    /// # Errors
    ///
    /// Returns the model's error, or an error if the result is not positive.
    pub fn evaluate(&self, state: &ResistanceState) -> Result<f64, ResistanceError> {
        let value = match self {
            Self::Constant(value) => *value,
            Self::Dynamic(model) => model.effective_resistance(state)?,
        };
        if value.is_finite() && value > 0.0 {
            Ok(value)
        } else {
            Err(ResistanceError::NotPositive {
                value,
                depth: state.depth,
                temperature: state.fluid_temperature,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;

    fn state(depth: f64) -> ResistanceState {
        ResistanceState {
            depth,
            fluid_temperature: 10.0,
        }
    }

    #[test]
    fn constant_ignores_state() {
        let rb = BoreholeResistance::constant(0.2).unwrap();
        assert_relative_eq!(rb.evaluate(&state(50.0)).unwrap(), 0.2);
        assert_relative_eq!(rb.evaluate(&state(250.0)).unwrap(), 0.2);
        assert!(!rb.depends_on_temperature());
        assert!(BoreholeResistance::constant(-0.1).is_err());
    }

    #[test]
    fn closures_are_models() {
        let rb = BoreholeResistance::dynamic(|s: &ResistanceState| {
            Ok::<_, ResistanceError>(0.1 + s.depth * 1e-4)
        });
        assert!(!rb.is_constant());
        assert_relative_eq!(rb.evaluate(&state(100.0)).unwrap(), 0.11, epsilon = 1e-12);
        assert_eq!(format!("{rb:?}"), "Dynamic(..)");
    }

    #[test]
    fn rejects_non_positive_results() {
        let rb = BoreholeResistance::dynamic(|_: &ResistanceState| {
            Ok::<_, ResistanceError>(0.0)
        });
        assert!(matches!(
            rb.evaluate(&state(80.0)),
            Err(ResistanceError::NotPositive { depth, .. }) if depth == 80.0
        ));
    }
}
