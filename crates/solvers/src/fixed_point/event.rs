use ghe_core::Snapshot;

/// Control actions supported by the fixed-point solver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Stop and report the point just evaluated.
    StopEarly,
}

/// Emitted once per evaluation, before the proposal is clamped.
#[derive(Debug)]
pub struct Event<'a, I, O> {
    pub iter: usize,
    pub x: f64,
    pub proposal: f64,
    pub feasible: bool,
    pub snapshot: &'a Snapshot<I, O>,
}
