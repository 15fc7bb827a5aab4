//! Bisection for scalar equations on a bracketed interval.
//!
//! The solver evaluates both endpoints, checks that their residuals change
//! sign, then halves the bracket until either the bracket width or the
//! residual satisfies the configured tolerances.
//!
//! # Observer Events
//!
//! The solver emits one [`Event`] per midpoint evaluation. Observers can return
//! [`Action::StopEarly`] to halt and receive the best evaluation so far.

mod action;
mod best;
mod bracket;
mod config;
mod error;
mod event;
mod solution;

pub use action::Action;
pub use bracket::{Bracket, BracketError, Sign};
pub use config::{Config, ConfigError};
pub use error::Error;
pub use event::Event;
pub use solution::{Solution, Status};

use ghe_core::{EquationProblem, Model, Observer};

use crate::equation::evaluate;

use best::Best;
use bracket::Bounds;

/// Finds a root of the equation using the bisection method.
///
/// Observers see each midpoint evaluation together with the current bracket.
///
/// # Errors
///
/// Returns an error if the config or bracket is invalid, the endpoint residuals
/// do not change sign, or the model or problem fails during evaluation.
pub fn solve<M, P, Obs>(
    model: &M,
    problem: &P,
    bracket: [f64; 2],
    config: &Config,
    mut observer: Obs,
) -> Result<Solution<M::Input, M::Output>, Error>
where
    M: Model,
    P: EquationProblem<1, Input = M::Input, Output = M::Output>,
    Obs: for<'a> Observer<Event<'a, M::Input, M::Output>, Action>,
{
    config.validate()?;
    let bounds = Bounds::new(bracket)?;
    let [left, right] = bounds.as_array();

    let left_eval = evaluate(model, problem, left)?;
    let left_residual = left_eval.residual;
    if left_residual.abs() <= config.residual_tol() {
        return Ok(Solution::from_eval(left_eval, Status::Converged, 0));
    }

    let right_eval = evaluate(model, problem, right)?;
    let right_residual = right_eval.residual;
    if right_residual.abs() <= config.residual_tol() {
        return Ok(Solution::from_eval(right_eval, Status::Converged, 0));
    }

    let mut bracket = Bracket::new(bounds, Sign::of(left_residual), Sign::of(right_residual))
        .map_err(|_| Error::NoSignChange {
            left,
            right,
            left_residual,
            right_residual,
        })?;

    let mut best = Best::empty();
    best.update(left_eval);
    best.update(right_eval);

    for iter in 1..=config.max_iters() {
        let mid = bracket.midpoint();
        let mid_eval = evaluate(model, problem, mid)?;
        let mid_residual = mid_eval.residual;

        let event = Event {
            iter,
            bracket: &bracket,
            eval: &mid_eval,
        };
        if let Some(Action::StopEarly) = observer.observe(&event) {
            best.update(mid_eval);
            return best.finish(Status::StoppedByObserver, iter);
        }

        bracket.shrink(mid, Sign::of(mid_residual));

        if mid_residual.abs() <= config.residual_tol()
            || bracket.is_x_converged(config.x_abs_tol(), config.x_rel_tol())
        {
            return Ok(Solution::from_eval(mid_eval, Status::Converged, iter));
        }

        best.update(mid_eval);
    }

    best.finish(Status::MaxIters, config.max_iters())
}

/// Runs bisection without observation.
///
/// # Errors
///
/// Returns an error if the bracket is invalid, the endpoint residuals do not
/// change sign, or the model or problem fails during evaluation.
pub fn solve_unobserved<M, P>(
    model: &M,
    problem: &P,
    bracket: [f64; 2],
    config: &Config,
) -> Result<Solution<M::Input, M::Output>, Error>
where
    M: Model,
    P: EquationProblem<1, Input = M::Input, Output = M::Output>,
{
    solve(model, problem, bracket, config, ())
}
