use crate::equation::Evaluation;

use super::Bracket;

/// Midpoint evaluation emitted once per bisection iteration.
///
/// `bracket` is the interval before it is shrunk around `eval`.
#[derive(Debug)]
pub struct Event<'a, I, O> {
    pub iter: usize,
    pub bracket: &'a Bracket,
    pub eval: &'a Evaluation<I, O>,
}

impl<I, O> Event<'_, I, O> {
    #[must_use]
    pub fn x(&self) -> f64 {
        self.eval.x
    }

    #[must_use]
    pub fn residual(&self) -> f64 {
        self.eval.residual
    }
}
