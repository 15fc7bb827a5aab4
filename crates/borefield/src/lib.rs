//! Sizing and temperature simulation of vertical ground heat exchanger
//! borefields.
//!
//! A [`Borefield`] combines a borehole layout, a ground model, a thermal load
//! and a borehole resistance with temperature limits on the heat carrier
//! fluid. It can:
//!
//! - compute fluid and borehole wall temperatures over the simulation period
//!   at monthly or hourly resolution,
//! - size the common borehole depth so the fluid stays within its limits
//!   (methods L2, L3 and L4),
//! - split a load into a part the field can serve and an external remainder,
//! - search rectangular layouts that fit a plot.
//!
//! Thermal response comes from a pluggable [`GFunctionOracle`](gfunction::GFunctionOracle);
//! the engine caches its answers per layout and interpolates across depths.

mod borefield;
mod error;
mod optimise;
mod search;
mod sizing;

pub mod geometry;
pub mod gfunction;
pub mod ground;
pub mod interpolation;
pub mod load;
pub mod resistance;
pub mod setup;
pub mod temperature;

pub use borefield::{Borefield, InvestmentCost};
pub use error::Error;
pub use optimise::LoadSplit;
pub use search::{GeometryCandidate, PlotBounds};
pub use sizing::{SizingOutcome, SizingReport, SizingStep};
