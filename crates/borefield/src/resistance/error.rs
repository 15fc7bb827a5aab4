use std::error::Error as StdError;

use thiserror::Error;

use crate::interpolation::InterpError;

/// Errors raised by borehole resistance models.
#[derive(Debug, Error)]
pub enum ResistanceError {
    #[error("{name} must be positive and finite, got {value}")]
    InvalidParameter { name: &'static str, value: f64 },

    #[error("pipe layout does not fit: {0}")]
    Layout(&'static str),

    #[error("resistance {value} mK/W at depth {depth} m and {temperature} °C is not positive")]
    NotPositive {
        value: f64,
        depth: f64,
        temperature: f64,
    },

    #[error("fluid property table: {0}")]
    Table(#[from] InterpError),

    #[error("resistance model failed")]
    Model(#[source] Box<dyn StdError + Send + Sync>),
}
