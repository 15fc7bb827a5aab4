use std::error::Error as StdError;

use ghe_solvers::{
    equation::{EvalError, bisection},
    fixed_point,
};
use thiserror::Error;

use crate::{
    geometry::GeometryError, gfunction::GFunctionError, ground::GroundError, load::LoadError,
    resistance::ResistanceError, setup::SetupError,
};

/// Errors surfaced by the borefield engine.
///
/// Sizing failures carry the iteration, the depth reached and the binding
/// fluid temperature at that depth.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid geometry: {0}")]
    InvalidGeometry(#[from] GeometryError),

    #[error("invalid ground: {0}")]
    InvalidGround(#[from] GroundError),

    #[error("invalid load: {0}")]
    InvalidLoad(#[from] LoadError),

    #[error("invalid setup: {0}")]
    InvalidSetup(#[from] SetupError),

    #[error(
        "sizing did not converge after {iteration} iterations (depth {depth} m, binding temperature {temperature} °C)"
    )]
    SizingDidNotConverge {
        iteration: usize,
        depth: f64,
        temperature: f64,
    },

    #[error(
        "field too small: temperature limit still violated at {depth} m after {iteration} iterations (binding temperature {temperature} °C)"
    )]
    FieldTooSmall {
        iteration: usize,
        depth: f64,
        temperature: f64,
    },

    #[error("g-function unavailable: {0}")]
    GFunctionUnavailable(#[from] GFunctionError),

    #[error("borehole resistance: {0}")]
    RbModelError(#[from] ResistanceError),

    #[error("i/o: {0}")]
    Io(#[from] std::io::Error),

    #[error("dataset: {0}")]
    Dataset(#[from] serde_json::Error),

    #[error("solver failed")]
    Solver(#[source] Box<dyn StdError + Send + Sync>),
}

impl Error {
    /// Recovers an engine error boxed by a solver.
    fn unbox(boxed: Box<dyn StdError + Send + Sync>) -> Self {
        match boxed.downcast::<Self>() {
            Ok(err) => *err,
            Err(other) => Self::Solver(other),
        }
    }
}

impl From<fixed_point::Error> for Error {
    fn from(err: fixed_point::Error) -> Self {
        match err {
            fixed_point::Error::Model(boxed) | fixed_point::Error::Problem(boxed) => {
                Self::unbox(boxed)
            }
            other => Self::Solver(Box::new(other)),
        }
    }
}

impl From<bisection::Error> for Error {
    fn from(err: bisection::Error) -> Self {
        match err {
            bisection::Error::Evaluation(
                EvalError::Model { source, .. } | EvalError::Problem { source, .. },
            ) => Self::unbox(source),
            other => Self::Solver(Box::new(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn solver_errors_unwrap_engine_errors() {
        let err: Error = fixed_point::Error::Model(Box::new(Error::from(
            GFunctionError::Unsupported("inclined boreholes"),
        )))
        .into();
        assert!(matches!(
            err,
            Error::GFunctionUnavailable(GFunctionError::Unsupported(_))
        ));

        let err: Error = bisection::Error::NoSuccessfulEvaluation.into();
        assert!(matches!(err, Error::Solver(_)));

        let err: Error = bisection::Error::from(EvalError::Problem {
            x: 40.0,
            source: Box::new(Error::from(GFunctionError::Unsupported("inclined boreholes"))),
        })
        .into();
        assert!(matches!(err, Error::GFunctionUnavailable(_)));

        let err: Error = bisection::Error::from(EvalError::NonFiniteResidual {
            x: 0.0,
            residual: f64::NAN,
        })
        .into();
        assert!(matches!(err, Error::Solver(_)));
    }
}
