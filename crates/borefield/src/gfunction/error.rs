use std::error::Error as StdError;

use thiserror::Error;

use crate::interpolation::InterpError;

/// Errors raised while computing, caching or loading g-functions.
#[derive(Debug, Error)]
pub enum GFunctionError {
    #[error("the g-function oracle does not support {0}")]
    Unsupported(&'static str),

    #[error("oracle returned {actual} values for {expected} times")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("g-function value {value} at t = {time} s is not finite")]
    NonFinite { time: f64, value: f64 },

    #[error("time grid must be positive and strictly increasing")]
    InvalidTimeGrid,

    #[error("invalid dataset: {0}")]
    InvalidDataset(&'static str),

    #[error("depth {depth} m is not positive and finite")]
    InvalidDepth { depth: f64 },

    #[error(transparent)]
    Interpolation(#[from] InterpError),

    #[error("oracle failed")]
    Oracle(#[source] Box<dyn StdError + Send + Sync>),
}
