use ghe_core::Snapshot;

/// Which solver bound stopped the iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    Lower,
    Upper,
}

/// Why the solver stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Converged,
    /// The iterate sat on a bound and the next proposal pointed further out.
    Clamped(Bound),
    /// The iteration alternated between two values.
    Oscillating,
    MaxIters,
    StoppedByObserver,
}

/// One evaluated iterate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Iterate {
    pub x: f64,
    /// The unclamped value proposed by the problem.
    pub proposal: f64,
    pub feasible: bool,
}

/// The result of a fixed-point solve.
#[derive(Debug, Clone)]
pub struct Solution<I, O> {
    pub status: Status,
    pub x: f64,
    /// Model input and output at `x`.
    pub snapshot: Snapshot<I, O>,
    /// Every evaluated iterate in order.
    pub history: Vec<Iterate>,
}

impl<I, O> Solution<I, O> {
    pub(super) fn new(
        status: Status,
        x: f64,
        snapshot: Snapshot<I, O>,
        history: Vec<Iterate>,
    ) -> Self {
        Self {
            status,
            x,
            snapshot,
            history,
        }
    }

    /// Number of model evaluations.
    #[must_use]
    pub fn iters(&self) -> usize {
        self.history.len()
    }
}
