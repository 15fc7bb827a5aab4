use std::error::Error as StdError;

use ghe_core::{EquationProblem, Model, Snapshot};
use thiserror::Error;

/// One point of a scalar equation problem: where it was evaluated, the
/// residual there, and the model call that produced it.
#[derive(Debug, Clone)]
pub struct Evaluation<I, O> {
    pub x: f64,
    pub residual: f64,
    pub snapshot: Snapshot<I, O>,
}

/// A point that could not be evaluated.
///
/// Model and problem failures are boxed so callers can recover their own
/// error type by downcasting.
#[derive(Debug, Error)]
pub enum EvalError {
    #[error("model call failed at x = {x}")]
    Model {
        x: f64,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },

    #[error("problem failed at x = {x}")]
    Problem {
        x: f64,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },

    #[error("non-finite residual {residual} at x = {x}")]
    NonFiniteResidual { x: f64, residual: f64 },
}

impl EvalError {
    /// The boxed model or problem error, if that is what failed.
    #[must_use]
    pub fn into_source(self) -> Option<Box<dyn StdError + Send + Sync>> {
        match self {
            Self::Model { source, .. } | Self::Problem { source, .. } => Some(source),
            Self::NonFiniteResidual { .. } => None,
        }
    }
}

/// Evaluates a scalar equation problem at `x`.
///
/// # Errors
///
/// Returns an error if the problem cannot map `x` or compute the residual,
/// the model call fails, or the residual is not finite.
pub fn evaluate<M, P>(
    model: &M,
    problem: &P,
    x: f64,
) -> Result<Evaluation<M::Input, M::Output>, EvalError>
where
    M: Model,
    P: EquationProblem<1, Input = M::Input, Output = M::Output>,
{
    let problem_failed = move |err: P::Error| EvalError::Problem {
        x,
        source: Box::new(err),
    };
    let input = problem.input(&[x]).map_err(problem_failed)?;
    let output = model.call(&input).map_err(|err| EvalError::Model {
        x,
        source: Box::new(err),
    })?;
    let [residual] = problem
        .residuals(&input, &output)
        .map_err(problem_failed)?;
    if !residual.is_finite() {
        return Err(EvalError::NonFiniteResidual { x, residual });
    }

    Ok(Evaluation {
        x,
        residual,
        snapshot: Snapshot::new(input, output),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::convert::Infallible;

    #[derive(Debug, Error)]
    #[error("negative depth")]
    struct NegativeDepth;

    /// Margin of a linear temperature profile to a 4 °C limit.
    struct Margin;

    impl Model for Margin {
        type Input = f64;
        type Output = f64;
        type Error = NegativeDepth;

        fn call(&self, depth: &f64) -> Result<f64, NegativeDepth> {
            if *depth < 0.0 {
                return Err(NegativeDepth);
            }
            Ok(10.0 - 600.0 / depth)
        }
    }

    struct ToLimit;

    impl EquationProblem<1> for ToLimit {
        type Input = f64;
        type Output = f64;
        type Error = Infallible;

        fn input(&self, x: &[f64; 1]) -> Result<f64, Infallible> {
            Ok(x[0])
        }

        fn residuals(&self, _: &f64, temperature: &f64) -> Result<[f64; 1], Infallible> {
            Ok([temperature - 4.0])
        }
    }

    #[test]
    fn records_the_residual_and_snapshot() {
        let eval = evaluate(&Margin, &ToLimit, 100.0).expect("valid depth");
        assert_eq!(eval.x, 100.0);
        assert_eq!(eval.residual, 0.0);
        assert_eq!(eval.snapshot.output, 4.0);
    }

    #[test]
    fn model_failure_is_boxed_with_its_point() {
        let err = evaluate(&Margin, &ToLimit, -1.0).unwrap_err();
        assert!(matches!(err, EvalError::Model { x, .. } if x == -1.0));
        let source = err.into_source().expect("model error");
        assert!(source.downcast_ref::<NegativeDepth>().is_some());
    }

    #[test]
    fn zero_depth_gives_a_non_finite_residual() {
        let err = evaluate(&Margin, &ToLimit, 0.0).unwrap_err();
        assert!(matches!(err, EvalError::NonFiniteResidual { x, .. } if x == 0.0));
        assert!(err.into_source().is_none());
    }
}
