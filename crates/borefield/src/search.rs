//! Rectangular layout search within a plot.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uom::si::{f64::Length, length::meter};

use crate::{
    Borefield, Error,
    geometry::{BoreholeField, BoreholeSpec, GeometryError, positive},
    gfunction::GFunctionOracle,
    load::LoadError,
};

/// Plot dimensions and the spacings to try.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlotBounds {
    /// Plot extent along x [m].
    pub length: f64,
    /// Plot extent along y [m].
    pub width: f64,
    pub min_spacing: f64,
    pub max_spacing: f64,
    pub spacing_step: f64,
}

impl PlotBounds {
    /// Creates validated plot bounds.
    ///
    /// # Errors
    ///
    /// Returns an error if a plot dimension is negative, a spacing or the step
    /// is not positive, or the spacing range is reversed.
    pub fn new(
        length: Length,
        width: Length,
        min_spacing: Length,
        max_spacing: Length,
        spacing_step: Length,
    ) -> Result<Self, GeometryError> {
        let bounds = Self {
            length: length.get::<meter>(),
            width: width.get::<meter>(),
            min_spacing: min_spacing.get::<meter>(),
            max_spacing: max_spacing.get::<meter>(),
            spacing_step: spacing_step.get::<meter>(),
        };
        for (name, value) in [("length", bounds.length), ("width", bounds.width)] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(GeometryError::Negative { name, value });
            }
        }
        positive("min_spacing", bounds.min_spacing)?;
        positive("max_spacing", bounds.max_spacing)?;
        positive("spacing_step", bounds.spacing_step)?;
        if bounds.min_spacing > bounds.max_spacing {
            return Err(GeometryError::SpacingRange {
                min: bounds.min_spacing,
                max: bounds.max_spacing,
            });
        }
        Ok(bounds)
    }

    /// Spacings from `min_spacing` to `max_spacing` in steps of
    /// `spacing_step`.
    fn spacings(&self) -> impl Iterator<Item = f64> + '_ {
        let steps = ((self.max_spacing - self.min_spacing) / self.spacing_step + 1e-9).floor();
        (0..=steps as usize).map(|k| self.min_spacing + k as f64 * self.spacing_step)
    }

    /// Largest borehole count along an extent for a spacing.
    fn count(extent: f64, spacing: f64) -> usize {
        (extent / spacing + 1e-9).floor() as usize + 1
    }
}

/// A sized rectangular layout.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeometryCandidate {
    pub n1: usize,
    pub n2: usize,
    pub spacing: f64,
    pub depth: f64,
    pub total_length: f64,
}

impl<O: GFunctionOracle> Borefield<O> {
    /// Sizes every `n1 × n2` rectangle with square spacing that fits the plot
    /// and keeps the one with the least total borehole length. Ties go to the
    /// layout with fewer boreholes.
    ///
    /// Boreholes take the buried depth and radius of the current field. The
    /// engine ends up holding the winning layout, sized.
    ///
    /// # Errors
    ///
    /// Returns the last sizing error if no layout meets the limits, or any
    /// other error raised while sizing. The original layout is restored when
    /// nothing fits.
    pub fn size_by_length_and_width(
        &mut self,
        bounds: &PlotBounds,
    ) -> Result<GeometryCandidate, Error> {
        self.setup().validate()?;
        if self.load().is_none() {
            return Err(LoadError::Missing.into());
        }
        let original = self.field().clone();
        let spec = BoreholeSpec {
            depth: self.depth(),
            buried_depth: original.buried_depth(),
            radius: original.radius(),
        };
        let min_depth = self.setup().min_depth;

        let mut best: Option<(GeometryCandidate, BoreholeField)> = None;
        let mut last_error = None;
        for spacing in bounds.spacings() {
            let length = Length::new::<meter>(spacing);
            for n1 in 1..=PlotBounds::count(bounds.length, spacing) {
                for n2 in 1..=PlotBounds::count(bounds.width, spacing) {
                    // No depth can beat the best total length.
                    if let Some((candidate, _)) = &best
                        && (n1 * n2) as f64 * min_depth >= candidate.total_length
                    {
                        continue;
                    }
                    let field = BoreholeField::rectangle(n1, n2, length, length, spec)?;
                    self.set_borefield(field.clone());
                    let method = self.setup().method;
                    let report = self.size_with(method)?;
                    if !report.outcome.is_converged() {
                        debug!(n1, n2, spacing, "layout cannot meet the limits");
                        last_error = report.into_result().err();
                        continue;
                    }
                    let candidate = GeometryCandidate {
                        n1,
                        n2,
                        spacing,
                        depth: report.depth(),
                        total_length: report.depth() * (n1 * n2) as f64,
                    };
                    debug!(
                        n1,
                        n2,
                        spacing,
                        depth = candidate.depth,
                        total_length = candidate.total_length,
                        "sized layout"
                    );
                    if best
                        .as_ref()
                        .is_none_or(|(current, _)| candidate.is_better_than(current))
                    {
                        best = Some((candidate, field));
                    }
                }
            }
        }

        let Some((candidate, field)) = best else {
            self.set_borefield(original);
            return Err(last_error.unwrap_or(Error::FieldTooSmall {
                iteration: 0,
                depth: self.setup().max_depth,
                temperature: f64::NAN,
            }));
        };
        self.set_borefield(field);
        let method = self.setup().method;
        self.size_with(method)?;
        info!(
            n1 = candidate.n1,
            n2 = candidate.n2,
            spacing = candidate.spacing,
            depth = candidate.depth,
            "layout selected"
        );
        Ok(candidate)
    }
}

impl GeometryCandidate {
    fn is_better_than(&self, other: &Self) -> bool {
        const LENGTH_TOLERANCE: f64 = 1e-6;
        let difference = self.total_length - other.total_length;
        difference < -LENGTH_TOLERANCE
            || (difference.abs() <= LENGTH_TOLERANCE && self.n1 * self.n2 < other.n1 * other.n2)
    }
}
