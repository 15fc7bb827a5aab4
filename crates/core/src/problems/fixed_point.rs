/// Defines a scalar fixed-point problem for monotone sizing.
///
/// A fixed-point problem maps a scalar `x` (a borehole depth in the engine)
/// into a model input, and proposes the next `x` from the model input and
/// output. Solvers repeat this until successive values agree.
///
/// The problem also reports whether an evaluated point satisfies its
/// constraint. Solvers use that to pick the smallest feasible point when the
/// iteration oscillates instead of settling.
pub trait FixedPointProblem {
    type Input;
    type Output;
    type Error: std::error::Error + Send + Sync + 'static;

    /// Maps the scalar `x` into a model input.
    ///
    /// # Errors
    ///
    /// Returns [`Self::Error`] if the input cannot be constructed from `x`.
    fn input(&self, x: f64) -> Result<Self::Input, Self::Error>;

    /// Proposes the next value of `x` from a model evaluation.
    ///
    /// The proposal may lie outside the solver bounds; the solver clamps it.
    ///
    /// # Errors
    ///
    /// Returns [`Self::Error`] if the update cannot be computed.
    fn update(&self, x: f64, input: &Self::Input, output: &Self::Output)
    -> Result<f64, Self::Error>;

    /// Returns true if the evaluation satisfies the problem constraint.
    fn is_feasible(&self, input: &Self::Input, output: &Self::Output) -> bool;
}
