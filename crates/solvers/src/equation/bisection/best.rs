use crate::equation::Evaluation;

use super::{Error, Solution, Status};

/// Tracks the best evaluation encountered so far.
///
/// The best evaluation is defined by minimum residual magnitude.
pub(super) struct Best<I, O> {
    eval: Option<Evaluation<I, O>>,
}

impl<I, O> Best<I, O> {
    /// Creates an empty best tracker.
    pub(super) fn empty() -> Self {
        Self { eval: None }
    }

    /// Updates the best evaluation if the residual magnitude improves.
    pub(super) fn update(&mut self, eval: Evaluation<I, O>) {
        if let Some(best) = self.eval.as_ref()
            && eval.residual.abs() >= best.residual.abs()
        {
            return;
        }
        self.eval = Some(eval);
    }

    /// Finalizes the solver using the best available evaluation.
    ///
    /// # Errors
    ///
    /// Returns `Error::NoSuccessfulEvaluation` if no evaluation is stored.
    pub(super) fn finish(self, status: Status, iters: usize) -> Result<Solution<I, O>, Error> {
        let eval = self.eval.ok_or(Error::NoSuccessfulEvaluation)?;
        Ok(Solution::from_eval(eval, status, iters))
    }
}
