//! Piecewise-linear tables with clamped extrapolation.
//!
//! Used for g-function resampling in `ln t`, heat pump performance curves and
//! tabulated fluid properties.

use ndarray::Array1;
use ninterp::{
    error::{InterpolateError, ValidateError},
    prelude::{Interp1DOwned, Interpolator},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum InterpError {
    #[error(transparent)]
    Validation(#[from] ValidateError),
    #[error(transparent)]
    Interpolation(#[from] InterpolateError),
    #[error("table needs at least one point")]
    Empty,
    #[error("table has {x} abscissae but {y} values")]
    LengthMismatch { x: usize, y: usize },
}

type Linear = Interp1DOwned<f64, ninterp::strategy::Linear>;

/// A linear table that clamps queries to its end values.
///
/// A single-point table is constant.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "TablePoints", into = "TablePoints")]
pub struct LinearTable {
    points: TablePoints,
    /// Built once from `points`; `None` for a constant table.
    interp: Option<Linear>,
}

/// Serialized form of a [`LinearTable`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TablePoints {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

impl LinearTable {
    /// Creates a table from strictly increasing `x` and matching `y`.
    ///
    /// # Errors
    ///
    /// Returns an error if the table is empty, lengths differ, or `x` is not
    /// strictly increasing.
    pub fn new(x: Vec<f64>, y: Vec<f64>) -> Result<Self, InterpError> {
        if x.len() != y.len() {
            return Err(InterpError::LengthMismatch {
                x: x.len(),
                y: y.len(),
            });
        }
        if x.is_empty() {
            return Err(InterpError::Empty);
        }
        let interp = if x.len() < 2 {
            None
        } else {
            Some(Interp1DOwned::new(
                Array1::from(x.clone()),
                Array1::from(y.clone()),
                ninterp::strategy::Linear,
                ninterp::interpolator::Extrapolate::Clamp,
            )?)
        };
        Ok(Self {
            points: TablePoints { x, y },
            interp,
        })
    }

    /// Evaluates the table at `x`.
    ///
    /// # Errors
    ///
    /// Returns an error if `x` is NaN.
    pub fn eval(&self, x: f64) -> Result<f64, InterpError> {
        match &self.interp {
            Some(interp) => Ok(interp.interpolate(&[x])?),
            None => Ok(self.points.y[0]),
        }
    }

    /// Evaluates the table at each of `xs`.
    ///
    /// # Errors
    ///
    /// Returns an error if any query is NaN.
    pub fn eval_many(&self, xs: &[f64]) -> Result<Vec<f64>, InterpError> {
        xs.iter().map(|&x| self.eval(x)).collect()
    }

    #[must_use]
    pub fn x(&self) -> &[f64] {
        &self.points.x
    }

    #[must_use]
    pub fn y(&self) -> &[f64] {
        &self.points.y
    }
}

impl PartialEq for LinearTable {
    fn eq(&self, other: &Self) -> bool {
        self.points == other.points
    }
}

impl TryFrom<TablePoints> for LinearTable {
    type Error = InterpError;

    fn try_from(points: TablePoints) -> Result<Self, Self::Error> {
        Self::new(points.x, points.y)
    }
}

impl From<LinearTable> for TablePoints {
    fn from(table: LinearTable) -> Self {
        table.points
    }
}

/// Resamples `(x, y)` at each of `at`, clamping outside the data.
///
/// # Errors
///
/// Returns an error if the data is not a valid table or a query is NaN.
pub fn resample(x: &[f64], y: &[f64], at: &[f64]) -> Result<Vec<f64>, InterpError> {
    LinearTable::new(x.to_vec(), y.to_vec())?.eval_many(at)
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;

    #[test]
    fn interpolates_and_clamps() {
        let table = LinearTable::new(vec![0.0, 10.0, 20.0], vec![3.0, 4.0, 6.0]).unwrap();

        assert_relative_eq!(table.eval(5.0).unwrap(), 3.5);
        assert_relative_eq!(table.eval(15.0).unwrap(), 5.0);
        assert_relative_eq!(table.eval(-5.0).unwrap(), 3.0);
        assert_relative_eq!(table.eval(100.0).unwrap(), 6.0);
    }

    #[test]
    fn repeated_queries_share_one_curve() {
        let table = LinearTable::new(vec![0.0, 2.0, 4.0], vec![1.0, 5.0, 3.0]).unwrap();
        let copy = table.clone();
        let xs = [-1.0, 0.5, 2.0, 3.0, 9.0];

        let many = table.eval_many(&xs).unwrap();
        assert_eq!(many, vec![1.0, 2.0, 5.0, 4.0, 3.0]);
        for (x, expected) in xs.iter().zip(&many) {
            assert_relative_eq!(copy.eval(*x).unwrap(), *expected);
        }
        assert_eq!(copy, table);
    }

    #[test]
    fn single_point_is_constant() {
        let table = LinearTable::new(vec![7.0], vec![4.2]).unwrap();
        assert_relative_eq!(table.eval(-40.0).unwrap(), 4.2);
        assert_relative_eq!(table.eval(40.0).unwrap(), 4.2);
    }

    #[test]
    fn rejects_bad_tables() {
        assert!(matches!(
            LinearTable::new(vec![], vec![]),
            Err(InterpError::Empty)
        ));
        assert!(matches!(
            LinearTable::new(vec![0.0, 1.0], vec![1.0]),
            Err(InterpError::LengthMismatch { x: 2, y: 1 })
        ));
        assert!(LinearTable::new(vec![1.0, 0.0], vec![1.0, 2.0]).is_err());
    }

    #[test]
    fn serializes_as_points() {
        let table = LinearTable::new(vec![0.0, 1.0], vec![2.0, 4.0]).unwrap();
        let json = serde_json::to_string(&table).unwrap();
        assert_eq!(json, r#"{"x":[0.0,1.0],"y":[2.0,4.0]}"#);

        let back: LinearTable = serde_json::from_str(&json).unwrap();
        assert_eq!(back, table);
        assert_relative_eq!(back.eval(0.25).unwrap(), 2.5);
    }
}
