//! Clamped fixed-point iteration for monotone scalar sizing problems.
//!
//! Each iteration evaluates the model at `x`, asks the problem for a proposal,
//! and clamps it into `[lower, upper]`. The solver stops when successive values
//! agree within tolerance, when the proposal keeps pushing against a bound,
//! when the last three values alternate, or when the iteration cap is hit.
//!
//! # Oscillation
//!
//! When `x_n ≈ x_{n-2}` but `x_n` and `x_{n-1}` still differ, the iteration is
//! cycling between two points. The smallest feasible of those two is reported
//! (or the largest one if neither is feasible).

mod config;
mod error;
mod event;
mod solution;

pub use config::{Config, ConfigError};
pub use error::Error;
pub use event::{Action, Event};
pub use solution::{Bound, Iterate, Solution, Status};

use std::collections::VecDeque;

use ghe_core::{FixedPointProblem, Model, Observer, Snapshot};

/// A point the solver evaluated, kept for oscillation handling.
struct Evaluated<I, O> {
    x: f64,
    feasible: bool,
    snapshot: Snapshot<I, O>,
}

/// Iterates `x ← clamp(update(x))` until it settles.
///
/// # Errors
///
/// Returns an error if the config or bounds are invalid, the start point is not
/// finite, an update is not finite, or the model or problem fails.
pub fn solve<M, P, Obs>(
    model: &M,
    problem: &P,
    x0: f64,
    bounds: [f64; 2],
    config: &Config,
    mut observer: Obs,
) -> Result<Solution<M::Input, M::Output>, Error>
where
    M: Model,
    P: FixedPointProblem<Input = M::Input, Output = M::Output>,
    Obs: for<'a> Observer<Event<'a, M::Input, M::Output>, Action>,
{
    config.validate()?;
    let [lower, upper] = bounds;
    if !(lower.is_finite() && upper.is_finite()) || lower > upper {
        return Err(Error::InvalidBounds { lower, upper });
    }
    if !x0.is_finite() {
        return Err(Error::NonFiniteStart { x0 });
    }

    let mut x = x0.clamp(lower, upper);
    let mut history = Vec::new();
    let mut recent: VecDeque<Evaluated<M::Input, M::Output>> = VecDeque::with_capacity(3);

    for iter in 1..=config.max_iters() {
        let input = problem.input(x).map_err(|e| Error::Problem(Box::new(e)))?;
        let output = model.call(&input).map_err(|e| Error::Model(Box::new(e)))?;
        let proposal = problem
            .update(x, &input, &output)
            .map_err(|e| Error::Problem(Box::new(e)))?;
        if !proposal.is_finite() {
            return Err(Error::NonFiniteUpdate { x, proposal });
        }
        let feasible = problem.is_feasible(&input, &output);
        let snapshot = Snapshot::new(input, output);

        history.push(Iterate {
            x,
            proposal,
            feasible,
        });

        let event = Event {
            iter,
            x,
            proposal,
            feasible,
            snapshot: &snapshot,
        };
        if let Some(Action::StopEarly) = observer.observe(&event) {
            return Ok(Solution::new(
                Status::StoppedByObserver,
                x,
                snapshot,
                history,
            ));
        }

        #[allow(clippy::float_cmp)]
        if x == upper && proposal > upper {
            return Ok(Solution::new(
                Status::Clamped(Bound::Upper),
                x,
                snapshot,
                history,
            ));
        }
        #[allow(clippy::float_cmp)]
        if x == lower && proposal < lower {
            return Ok(Solution::new(
                Status::Clamped(Bound::Lower),
                x,
                snapshot,
                history,
            ));
        }

        let next = proposal.clamp(lower, upper);
        if config.is_converged(x, next) {
            return Ok(Solution::new(Status::Converged, x, snapshot, history));
        }

        if recent.len() == 3 {
            recent.pop_front();
        }
        recent.push_back(Evaluated {
            x,
            feasible,
            snapshot,
        });

        if let Some(pick) = oscillation_pick(&recent, next, config) {
            let chosen = recent
                .into_iter()
                .nth(pick)
                .ok_or(Error::NoSuccessfulEvaluation)?;
            return Ok(Solution::new(
                Status::Oscillating,
                chosen.x,
                chosen.snapshot,
                history,
            ));
        }

        x = next;
    }

    let last = recent.pop_back().ok_or(Error::NoSuccessfulEvaluation)?;
    Ok(Solution::new(Status::MaxIters, last.x, last.snapshot, history))
}

/// Runs the fixed-point iteration without observation.
///
/// # Errors
///
/// See [`solve`].
pub fn solve_unobserved<M, P>(
    model: &M,
    problem: &P,
    x0: f64,
    bounds: [f64; 2],
    config: &Config,
) -> Result<Solution<M::Input, M::Output>, Error>
where
    M: Model,
    P: FixedPointProblem<Input = M::Input, Output = M::Output>,
{
    solve(model, problem, x0, bounds, config, ())
}

/// Returns the index in `recent` of the point to report if the iteration is
/// cycling, i.e. the next value returns to the one evaluated two steps ago.
fn oscillation_pick<I, O>(
    recent: &VecDeque<Evaluated<I, O>>,
    next: f64,
    config: &Config,
) -> Option<usize> {
    let n = recent.len();
    if n < 2 {
        return None;
    }
    let (prev, last) = (&recent[n - 2], &recent[n - 1]);
    if !config.is_converged(prev.x, next) {
        return None;
    }

    let pair = [(n - 2, prev), (n - 1, last)];
    let smallest_feasible = pair
        .iter()
        .filter(|(_, e)| e.feasible)
        .min_by(|(_, a), (_, b)| a.x.total_cmp(&b.x))
        .map(|(i, _)| *i);

    smallest_feasible.or_else(|| {
        pair.iter()
            .max_by(|(_, a), (_, b)| a.x.total_cmp(&b.x))
            .map(|(i, _)| *i)
    })
}
