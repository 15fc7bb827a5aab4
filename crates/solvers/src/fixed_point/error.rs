use std::error::Error as StdError;

use thiserror::Error;

use super::ConfigError;

/// Errors that can occur during a fixed-point solve.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid config: {0}")]
    InvalidConfig(#[from] ConfigError),

    #[error("invalid bounds [{lower}, {upper}]")]
    InvalidBounds { lower: f64, upper: f64 },

    #[error("non-finite start value {x0}")]
    NonFiniteStart { x0: f64 },

    #[error("non-finite update {proposal} at x = {x}")]
    NonFiniteUpdate { x: f64, proposal: f64 },

    #[error("no successful evaluations")]
    NoSuccessfulEvaluation,

    #[error("problem error")]
    Problem(#[source] Box<dyn StdError + Send + Sync>),

    #[error("model call failed")]
    Model(#[source] Box<dyn StdError + Send + Sync>),
}
