/// Defines an equation problem to be solved.
///
/// An equation problem maps solver variables into a model input, then computes
/// residuals from the model input and output. Solvers drive the residuals
/// toward zero.
///
/// The load optimiser is an equation problem with `N = 1`: the variable is a
/// load scaling factor and the residual is the margin between the binding
/// fluid temperature and its limit.
pub trait EquationProblem<const N: usize> {
    type Input;
    type Output;
    type Error: std::error::Error + Send + Sync + 'static;

    /// Maps solver variables (`x`) into a model input.
    ///
    /// # Errors
    ///
    /// Returns [`Self::Error`] if the input cannot be constructed from `x`.
    fn input(&self, x: &[f64; N]) -> Result<Self::Input, Self::Error>;

    /// Computes residuals from model input/output.
    ///
    /// # Errors
    ///
    /// Returns [`Self::Error`] if the residuals cannot be computed.
    fn residuals(
        &self,
        input: &Self::Input,
        output: &Self::Output,
    ) -> Result<[f64; N], Self::Error>;
}
