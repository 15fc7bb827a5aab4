//! Core traits shared by the ground heat exchanger solvers and engine.
//!
//! This crate defines the abstractions that the numerical solvers and the
//! borefield engine build on:
//!
//! - [`Model`]: a callable that maps a typed input to a typed output, such as
//!   a borehole depth to a fluid temperature profile
//! - [`Snapshot`]: a captured input/output pair from a model call
//! - [`Observer`]: receives solver events and optionally returns control actions
//! - [`EquationProblem`], [`FixedPointProblem`]: problem traits that adapt
//!   solver variables to model inputs and extract residuals or updates from
//!   outputs

mod model;
mod observer;
mod problems;

pub use model::{Model, Snapshot};
pub use observer::Observer;
pub use problems::{EquationProblem, FixedPointProblem};
