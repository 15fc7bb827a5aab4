//! Numerical solvers for ground heat exchanger sizing.
//!
//! Solvers are generic over [`ghe_core::Model`] and the problem traits in
//! [`ghe_core`], so the same iteration drives every sizing method.

pub mod equation;
pub mod fixed_point;
