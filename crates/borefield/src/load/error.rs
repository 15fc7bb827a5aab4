use thiserror::Error;

use crate::interpolation::InterpError;

/// Errors raised when a load is ingested or converted.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("{name} has {actual} values, expected {expected}")]
    LengthMismatch {
        name: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("{name} has {len} values, which is not a positive multiple of {of}")]
    NotMultiple {
        name: &'static str,
        len: usize,
        of: usize,
    },

    #[error("{name}[{index}] = {value} must be finite and non-negative")]
    Negative {
        name: &'static str,
        index: usize,
        value: f64,
    },

    #[error("load covers {data_years} years but the simulation runs {simulation_years}")]
    PeriodMismatch {
        data_years: usize,
        simulation_years: usize,
    },

    #[error("hourly load data is required")]
    HourlyDataRequired,

    #[error("no load has been set")]
    Missing,

    #[error("{name} must be at least {min}, got {value}")]
    Efficiency {
        name: &'static str,
        min: f64,
        value: f64,
    },

    #[error("performance table: {0}")]
    Table(#[from] InterpError),

    #[error("csv: {0}")]
    Csv(#[from] csv::Error),

    #[error("row {row}, column {column}: cannot parse {value:?}")]
    Parse {
        row: usize,
        column: usize,
        value: String,
    },

    #[error("row {row} has no column {column}")]
    MissingColumn { row: usize, column: usize },
}
