use tracing::{debug, info};

use crate::geometry::BoreholeField;

use super::{GFunctionDataset, GFunctionError, GFunctionOracle, TimeGrid, check_values};

/// How the cache treats depths it has not computed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CacheOptions {
    /// Keep earlier depths when a new one is computed.
    pub store_previous_values: bool,
    /// Largest relative gap between bracketing depths that is interpolated.
    pub interpolation_threshold: Option<f64>,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            store_previous_values: true,
            interpolation_threshold: Some(0.25),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct CacheKey {
    fingerprint: u64,
    grid: TimeGrid,
}

/// G-function samples on a time grid, keyed by depth, for one layout.
///
/// Entries are sorted by depth. A change of layout, diffusivity or time grid
/// empties the cache on the next query.
#[derive(Debug, Clone, Default)]
pub struct GFunctionCache {
    key: Option<CacheKey>,
    entries: Vec<(f64, Vec<f64>)>,
}

const SAME_DEPTH: f64 = 1e-9;

impl GFunctionCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.key = None;
        self.entries.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Depths with stored samples, ascending.
    #[must_use]
    pub fn depths(&self) -> Vec<f64> {
        self.entries.iter().map(|(depth, _)| *depth).collect()
    }

    /// Samples on `grid` for `field` at its current depth.
    ///
    /// Stored depths are returned as is. Depths between two stored ones are
    /// interpolated linearly unless the gap exceeds the threshold, in which
    /// case, as for depths outside the stored range, the oracle is asked.
    ///
    /// # Errors
    ///
    /// Returns the oracle's error, or an error if its answer is malformed.
    pub fn values<O: GFunctionOracle + ?Sized>(
        &mut self,
        oracle: &O,
        field: &BoreholeField,
        diffusivity: f64,
        grid: &TimeGrid,
        options: CacheOptions,
    ) -> Result<Vec<f64>, GFunctionError> {
        let depth = field.depth();
        if !(depth.is_finite() && depth > 0.0) {
            return Err(GFunctionError::InvalidDepth { depth });
        }
        self.rekey(CacheKey {
            fingerprint: field.fingerprint(&[diffusivity]),
            grid: grid.clone(),
        });

        if let Some(values) = self.lookup(depth, options.interpolation_threshold) {
            return Ok(values);
        }

        info!(depth, boreholes = field.len(), "computing g-function");
        let values = oracle.compute(field, diffusivity, grid.times())?;
        check_values(grid.times(), &values)?;
        if !options.store_previous_values {
            self.entries.clear();
        }
        self.insert(depth, values.clone());
        Ok(values)
    }

    /// Replaces the cache content with `dataset` if it matches `field`,
    /// `diffusivity` and `grid`. Returns whether the dataset was accepted.
    pub fn load(
        &mut self,
        dataset: GFunctionDataset,
        field: &BoreholeField,
        diffusivity: f64,
        grid: &TimeGrid,
    ) -> bool {
        let fingerprint = field.fingerprint(&[diffusivity]);
        if dataset.fingerprint() != fingerprint || dataset.time_grid() != grid.times() {
            return false;
        }
        self.key = Some(CacheKey {
            fingerprint,
            grid: grid.clone(),
        });
        self.entries = dataset.into_rows().collect();
        true
    }

    /// Exports the cache as a dataset, or `None` if it is empty.
    #[must_use]
    pub fn to_dataset(&self) -> Option<GFunctionDataset> {
        let key = self.key.as_ref()?;
        let (depths, values) = self.entries.iter().cloned().unzip();
        GFunctionDataset::new(key.fingerprint, key.grid.times().to_vec(), depths, values).ok()
    }

    fn rekey(&mut self, key: CacheKey) {
        if self.key.as_ref() != Some(&key) {
            if !self.entries.is_empty() {
                debug!("borefield changed, clearing g-function cache");
            }
            self.entries.clear();
            self.key = Some(key);
        }
    }

    fn lookup(&self, depth: f64, threshold: Option<f64>) -> Option<Vec<f64>> {
        let upper = self.entries.partition_point(|(d, _)| *d < depth);
        if let Some((d, values)) = self.entries.get(upper)
            && (d - depth).abs() <= SAME_DEPTH * depth
        {
            return Some(values.clone());
        }
        if upper > 0
            && let Some((d, values)) = self.entries.get(upper - 1)
            && (d - depth).abs() <= SAME_DEPTH * depth
        {
            return Some(values.clone());
        }
        if upper == 0 || upper == self.entries.len() {
            return None;
        }

        let (d0, g0) = &self.entries[upper - 1];
        let (d1, g1) = &self.entries[upper];
        if let Some(threshold) = threshold
            && (d1 - d0) / d0 > threshold
        {
            return None;
        }
        let w = (depth - d0) / (d1 - d0);
        Some(
            g0.iter()
                .zip(g1)
                .map(|(a, b)| a + w * (b - a))
                .collect(),
        )
    }

    fn insert(&mut self, depth: f64, values: Vec<f64>) {
        let at = self.entries.partition_point(|(d, _)| *d < depth);
        self.entries.insert(at, (depth, values));
    }
}
