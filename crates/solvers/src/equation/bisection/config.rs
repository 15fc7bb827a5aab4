use thiserror::Error;

/// Errors from [`Config::new`].
#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum ConfigError {
    #[error("{name} must be finite and non-negative, got {value}")]
    InvalidTolerance { name: &'static str, value: f64 },
}

/// Configuration for the bisection solver.
///
/// The load optimiser bisects a load factor in `[0, 1]`, so the defaults
/// stop well before floating-point resolution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Config {
    max_iters: usize,
    x_abs_tol: f64,
    x_rel_tol: f64,
    residual_tol: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_iters: 100,
            x_abs_tol: 1e-12,
            x_rel_tol: 1e-12,
            residual_tol: 1e-12,
        }
    }
}

impl Config {
    /// Creates a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any tolerance is negative or non-finite.
    pub fn new(
        max_iters: usize,
        x_abs_tol: f64,
        x_rel_tol: f64,
        residual_tol: f64,
    ) -> Result<Self, ConfigError> {
        let config = Self {
            max_iters,
            x_abs_tol,
            x_rel_tol,
            residual_tol,
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks that all tolerances are finite and non-negative.
    ///
    /// # Errors
    ///
    /// Returns the first offending tolerance.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("x_abs_tol", self.x_abs_tol),
            ("x_rel_tol", self.x_rel_tol),
            ("residual_tol", self.residual_tol),
        ] {
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

    #[must_use]
    pub fn residual_tol(&self) -> f64 {
        self.residual_tol
    }
}
