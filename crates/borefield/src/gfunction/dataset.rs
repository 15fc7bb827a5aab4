use std::{
    fs::File,
    io::{BufReader, BufWriter, Read, Write},
    path::Path,
};

use serde::{Deserialize, Serialize};

use crate::Error;

use super::GFunctionError;

/// G-function samples for one borefield layout at several depths.
///
/// `fingerprint` identifies the layout and ground diffusivity the values were
/// computed for; `values[d][t]` is the g-function at `depths[d]` and
/// `time_grid[t]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GFunctionDataset {
    fingerprint: u64,
    time_grid: Vec<f64>,
    depths: Vec<f64>,
    values: Vec<Vec<f64>>,
}

impl GFunctionDataset {
    /// Creates a validated dataset.
    ///
    /// # Errors
    ///
    /// Returns an error if depths are not strictly increasing and positive,
    /// or the value table does not match the depths and time grid.
    pub fn new(
        fingerprint: u64,
        time_grid: Vec<f64>,
        depths: Vec<f64>,
        values: Vec<Vec<f64>>,
    ) -> Result<Self, GFunctionError> {
        let dataset = Self {
            fingerprint,
            time_grid,
            depths,
            values,
        };
        dataset.validate()?;
        Ok(dataset)
    }

    fn validate(&self) -> Result<(), GFunctionError> {
        if self.depths.is_empty() {
            return Err(GFunctionError::InvalidDataset("no depths"));
        }
        if !self.depths.iter().all(|d| d.is_finite() && *d > 0.0)
            || !self.depths.windows(2).all(|w| w[0] < w[1])
        {
            return Err(GFunctionError::InvalidDataset(
                "depths must be positive and strictly increasing",
            ));
        }
        if self.values.len() != self.depths.len() {
            return Err(GFunctionError::InvalidDataset("one row of values per depth"));
        }
        for row in &self.values {
            super::check_values(&self.time_grid, row)?;
        }
        Ok(())
    }

    #[must_use]
    pub fn fingerprint(&self) -> u64 {
        self.fingerprint
    }

    #[must_use]
    pub fn time_grid(&self) -> &[f64] {
        &self.time_grid
    }

    #[must_use]
    pub fn depths(&self) -> &[f64] {
        &self.depths
    }

    #[must_use]
    pub fn values(&self) -> &[Vec<f64>] {
        &self.values
    }

    pub(crate) fn into_rows(self) -> impl Iterator<Item = (f64, Vec<f64>)> {
        self.depths.into_iter().zip(self.values)
    }

    /// Writes the dataset as JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the writer fails.
    pub fn write_json<W: Write>(&self, writer: W) -> Result<(), Error> {
        serde_json::to_writer(writer, self)?;
        Ok(())
    }

    /// Reads and validates a JSON dataset.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or the content is invalid.
    pub fn read_json<R: Read>(reader: R) -> Result<Self, Error> {
        let dataset: Self = serde_json::from_reader(reader)?;
        dataset.validate()?;
        Ok(dataset)
    }

    /// Saves the dataset to `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), Error> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.write_json(&mut writer)?;
        writer.flush()?;
        Ok(())
    }

    /// Loads a dataset from `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not a valid dataset.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        Self::read_json(BufReader::new(File::open(path)?))
    }
}
