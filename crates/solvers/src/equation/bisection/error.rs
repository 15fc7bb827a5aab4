use thiserror::Error;

use crate::equation::EvalError;

use super::{bracket::BracketError, config::ConfigError};

/// Why a bracketed search could not produce a root.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid bracket: {0}")]
    InvalidBracket(#[from] BracketError),

    #[error("invalid config: {0}")]
    InvalidConfig(#[from] ConfigError),

    /// Both ends sit on the same side of the limit, so the root is not
    /// inside the bracket.
    #[error(
        "no root between x = {left} (residual {left_residual}) and x = {right} (residual {right_residual})"
    )]
    NoSignChange {
        left: f64,
        right: f64,
        left_residual: f64,
        right_residual: f64,
    },

    #[error("no point was evaluated")]
    NoSuccessfulEvaluation,

    #[error(transparent)]
    Evaluation(#[from] EvalError),
}
