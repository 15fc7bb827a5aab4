use thiserror::Error;

/// Errors from [`Config::new`].
#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum ConfigError {
    #[error("{name} must be finite and non-negative, got {value}")]
    InvalidTolerance { name: &'static str, value: f64 },
    #[error("max_iters must be at least 1")]
    ZeroIterations,
}

/// Configuration for the fixed-point solver.
///
/// Two successive values `a` and `b` agree when
/// `|b - a| <= x_abs_tol + x_rel_tol * |a|`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Config {
    max_iters: usize,
    x_abs_tol: f64,
    x_rel_tol: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_iters: 40,
            x_abs_tol: 1e-2,
            x_rel_tol: 1e-4,
        }
    }
}

impl Config {
    /// Creates a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if `max_iters` is zero or a tolerance is negative or
    /// non-finite.
    pub fn new(max_iters: usize, x_abs_tol: f64, x_rel_tol: f64) -> Result<Self, ConfigError> {
        let config = Self {
            max_iters,
            x_abs_tol,
            x_rel_tol,
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks the iteration cap and tolerances.
    ///
    /// # Errors
    ///
    /// Returns the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_iters == 0 {
            return Err(ConfigError::ZeroIterations);
        }
        for (name, value) in [("x_abs_tol", self.x_abs_tol), ("x_rel_tol", self.x_rel_tol)] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidTolerance { name, value });
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn max_iters(&self) -> usize {
        self.max_iters
    }

    #[must_use]
    pub fn x_abs_tol(&self) -> f64 {
        self.x_abs_tol
    }

    #[must_use]
    pub fn x_rel_tol(&self) -> f64 {
        self.x_rel_tol
    }

    /// Returns true if `next` agrees with `x` within tolerance.
    #[must_use]
    pub fn is_converged(&self, x: f64, next: f64) -> bool {
        (next - x).abs() <= self.x_abs_tol + self.x_rel_tol * x.abs()
    }
}
