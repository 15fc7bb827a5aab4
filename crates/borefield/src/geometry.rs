//! Borefield geometry.
//!
//! A [`BoreholeField`] is an ordered set of boreholes that share one depth.
//! The sizing engine changes that depth in lockstep; every other change to the
//! field produces a new structural [`fingerprint`](BoreholeField::fingerprint).

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uom::si::{f64::Length, length::meter};

/// Errors raised when building a borefield.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GeometryError {
    #[error("a borefield needs at least one borehole")]
    Empty,

    #[error("{name} must be positive and finite, got {value}")]
    NotPositive { name: &'static str, value: f64 },

    #[error("{name} must be non-negative and finite, got {value}")]
    Negative { name: &'static str, value: f64 },

    #[error("{name} must be finite, got {value}")]
    NotFinite { name: &'static str, value: f64 },

    #[error("boreholes {first} and {second} overlap ({distance} m apart)")]
    Overlapping {
        first: usize,
        second: usize,
        distance: f64,
    },

    #[error("boreholes must share one depth, found {first} m and {other} m")]
    MixedDepths { first: f64, other: f64 },

    #[error("minimum spacing {min} m exceeds maximum spacing {max} m")]
    SpacingRange { min: f64, max: f64 },
}

/// A single borehole. Lengths in metres, angles in radians.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Borehole {
    pub depth: f64,
    pub buried_depth: f64,
    pub radius: f64,
    pub x: f64,
    pub y: f64,
    /// Inclination from vertical.
    pub tilt: f64,
    pub orientation: f64,
}

impl Borehole {
    /// Creates a vertical borehole at `(x, y)`.
    #[must_use]
    pub fn vertical(spec: BoreholeSpec, x: f64, y: f64) -> Self {
        Self {
            depth: spec.depth,
            buried_depth: spec.buried_depth,
            radius: spec.radius,
            x,
            y,
            tilt: 0.0,
            orientation: 0.0,
        }
    }

    /// Horizontal distance between borehole heads.
    #[must_use]
    pub fn distance(&self, other: &Borehole) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    #[must_use]
    pub fn is_vertical(&self) -> bool {
        self.tilt.abs() < 1e-9
    }
}

/// Depth, buried depth and radius shared by the boreholes of a layout.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoreholeSpec {
    pub depth: f64,
    pub buried_depth: f64,
    pub radius: f64,
}

impl BoreholeSpec {
    /// Creates a validated spec from lengths.
    ///
    /// # Errors
    ///
    /// Returns an error if depth or radius is not positive, or the buried depth
    /// is negative.
    pub fn new(depth: Length, buried_depth: Length, radius: Length) -> Result<Self, GeometryError> {
        let spec = Self {
            depth: depth.get::<meter>(),
            buried_depth: buried_depth.get::<meter>(),
            radius: radius.get::<meter>(),
        };
        spec.validate()?;
        Ok(spec)
    }

    fn validate(&self) -> Result<(), GeometryError> {
        positive("depth", self.depth)?;
        positive("radius", self.radius)?;
        non_negative("buried_depth", self.buried_depth)
    }
}

/// Borehole layout in the horizontal plane.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoreholeField {
    boreholes: Vec<Borehole>,
}

impl BoreholeField {
    /// Creates a field from explicit borehole records.
    ///
    /// # Errors
    ///
    /// Returns an error if the list is empty, any dimension is invalid, depths
    /// differ, or two boreholes overlap.
    pub fn custom(boreholes: Vec<Borehole>) -> Result<Self, GeometryError> {
        let first = boreholes.first().ok_or(GeometryError::Empty)?;
        let depth = first.depth;
        for b in &boreholes {
            BoreholeSpec {
                depth: b.depth,
                buried_depth: b.buried_depth,
                radius: b.radius,
            }
            .validate()?;
            if (b.depth - depth).abs() > 1e-9 * depth {
                return Err(GeometryError::MixedDepths {
                    first: depth,
                    other: b.depth,
                });
            }
            for (name, value) in [("x", b.x), ("y", b.y), ("tilt", b.tilt)] {
                if !value.is_finite() {
                    return Err(GeometryError::NotFinite { name, value });
                }
            }
        }
        for (i, a) in boreholes.iter().enumerate() {
            for (j, b) in boreholes.iter().enumerate().skip(i + 1) {
                let distance = a.distance(b);
                if distance < a.radius + b.radius {
                    return Err(GeometryError::Overlapping {
                        first: i,
                        second: j,
                        distance,
                    });
                }
            }
        }
        Ok(Self { boreholes })
    }

    /// Creates an `n1 × n2` rectangular grid with spacings `b1` (x) and `b2` (y).
    ///
    /// # Errors
    ///
    /// Returns an error if a count is zero, a spacing is not positive, or the
    /// spacing is too small for the borehole radius.
    pub fn rectangle(
        n1: usize,
        n2: usize,
        b1: Length,
        b2: Length,
        spec: BoreholeSpec,
    ) -> Result<Self, GeometryError> {
        let (b1, b2) = grid_spacing(n1, n2, b1, b2)?;
        let positions = (0..n2)
            .flat_map(|j| (0..n1).map(move |i| (i, j)))
            .map(|(i, j)| (i as f64 * b1, j as f64 * b2));
        Self::from_positions(spec, positions)
    }

    /// Creates an L-shaped field: one row of `n1` along x and one column of
    /// `n2` along y sharing the corner borehole.
    ///
    /// # Errors
    ///
    /// See [`BoreholeField::rectangle`].
    pub fn l_shaped(
        n1: usize,
        n2: usize,
        b1: Length,
        b2: Length,
        spec: BoreholeSpec,
    ) -> Result<Self, GeometryError> {
        let (b1, b2) = grid_spacing(n1, n2, b1, b2)?;
        let row = (0..n1).map(|i| (i as f64 * b1, 0.0));
        let column = (1..n2).map(|j| (0.0, j as f64 * b2));
        Self::from_positions(spec, row.chain(column))
    }

    /// Creates a U-shaped field: a row of `n1` along x with columns of `n2`
    /// rising from both ends.
    ///
    /// # Errors
    ///
    /// See [`BoreholeField::rectangle`].
    pub fn u_shaped(
        n1: usize,
        n2: usize,
        b1: Length,
        b2: Length,
        spec: BoreholeSpec,
    ) -> Result<Self, GeometryError> {
        let (b1, b2) = grid_spacing(n1, n2, b1, b2)?;
        let right = (n1 - 1) as f64 * b1;
        let row = (0..n1).map(|i| (i as f64 * b1, 0.0));
        let sides = (1..n2).flat_map(|j| {
            let y = j as f64 * b2;
            if n1 > 1 {
                vec![(0.0, y), (right, y)]
            } else {
                vec![(0.0, y)]
            }
        });
        Self::from_positions(spec, row.chain(sides))
    }

    /// Creates the perimeter of an `n1 × n2` rectangle.
    ///
    /// # Errors
    ///
    /// See [`BoreholeField::rectangle`].
    pub fn box_shaped(
        n1: usize,
        n2: usize,
        b1: Length,
        b2: Length,
        spec: BoreholeSpec,
    ) -> Result<Self, GeometryError> {
        let (b1, b2) = grid_spacing(n1, n2, b1, b2)?;
        let positions = (0..n2)
            .flat_map(|j| (0..n1).map(move |i| (i, j)))
            .filter(|&(i, j)| i == 0 || j == 0 || i == n1 - 1 || j == n2 - 1)
            .map(|(i, j)| (i as f64 * b1, j as f64 * b2));
        Self::from_positions(spec, positions)
    }

    /// Creates `n` boreholes evenly spaced on a circle of radius `radius`.
    ///
    /// # Errors
    ///
    /// Returns an error if `n` is zero, the radius is not positive while
    /// `n > 1`, or neighbouring boreholes overlap.
    pub fn circle(n: usize, radius: Length, spec: BoreholeSpec) -> Result<Self, GeometryError> {
        if n == 0 {
            return Err(GeometryError::Empty);
        }
        let radius = radius.get::<meter>();
        if n > 1 {
            positive("circle radius", radius)?;
        }
        let positions = (0..n).map(|i| {
            let angle = 2.0 * PI * i as f64 / n as f64;
            (radius * angle.cos(), radius * angle.sin())
        });
        Self::from_positions(spec, positions)
    }

    fn from_positions(
        spec: BoreholeSpec,
        positions: impl Iterator<Item = (f64, f64)>,
    ) -> Result<Self, GeometryError> {
        spec.validate()?;
        Self::custom(
            positions
                .map(|(x, y)| Borehole::vertical(spec, x, y))
                .collect(),
        )
    }

    #[must_use]
    pub fn boreholes(&self) -> &[Borehole] {
        &self.boreholes
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.boreholes.len()
    }

    /// Always false; construction rejects empty fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.boreholes.is_empty()
    }

    /// The common borehole depth in metres.
    #[must_use]
    pub fn depth(&self) -> f64 {
        self.boreholes[0].depth
    }

    #[must_use]
    pub fn buried_depth(&self) -> f64 {
        self.boreholes[0].buried_depth
    }

    #[must_use]
    pub fn radius(&self) -> f64 {
        self.boreholes[0].radius
    }

    /// Total installed borehole length `N · H`.
    #[must_use]
    pub fn total_length(&self) -> f64 {
        self.boreholes.iter().map(|b| b.depth).sum()
    }

    #[must_use]
    pub fn is_vertical(&self) -> bool {
        self.boreholes.iter().all(Borehole::is_vertical)
    }

    /// Sets every borehole to `depth`.
    pub fn set_depth(&mut self, depth: f64) {
        for borehole in &mut self.boreholes {
            borehole.depth = depth;
        }
    }

    /// Returns a copy of the field at `depth`.
    #[must_use]
    pub fn with_depth(&self, depth: f64) -> Self {
        let mut field = self.clone();
        field.set_depth(depth);
        field
    }

    /// Stable FNV-1a hash of everything but depth, mixed with `extra` words.
    ///
    /// Two fields with the same fingerprint have the same g-function at every
    /// depth, given the same ground diffusivity passed in `extra`.
    #[must_use]
    pub fn fingerprint(&self, extra: &[f64]) -> u64 {
        let mut hash = Fnv1a::new();
        hash.write_u64(self.boreholes.len() as u64);
        for b in &self.boreholes {
            for value in [b.buried_depth, b.radius, b.x, b.y, b.tilt, b.orientation] {
                hash.write_f64(value);
            }
        }
        for &value in extra {
            hash.write_f64(value);
        }
        hash.finish()
    }
}

struct Fnv1a(u64);

impl Fnv1a {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;

    fn new() -> Self {
        Self(Self::OFFSET)
    }

    fn write_u64(&mut self, value: u64) {
        for byte in value.to_le_bytes() {
            self.0 ^= u64::from(byte);
            self.0 = self.0.wrapping_mul(Self::PRIME);
        }
    }

    fn write_f64(&mut self, value: f64) {
        // Collapse -0.0 so mirrored layouts hash alike.
        let value = if value == 0.0 { 0.0 } else { value };
        self.write_u64(value.to_bits());
    }

    fn finish(&self) -> u64 {
        self.0
    }
}

fn grid_spacing(
    n1: usize,
    n2: usize,
    b1: Length,
    b2: Length,
) -> Result<(f64, f64), GeometryError> {
    if n1 == 0 || n2 == 0 {
        return Err(GeometryError::Empty);
    }
    let (b1, b2) = (b1.get::<meter>(), b2.get::<meter>());
    if n1 > 1 {
        positive("b1", b1)?;
    }
    if n2 > 1 {
        positive("b2", b2)?;
    }
    Ok((b1, b2))
}

pub(crate) fn positive(name: &'static str, value: f64) -> Result<(), GeometryError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(GeometryError::NotPositive { name, value })
    }
}

fn non_negative(name: &'static str, value: f64) -> Result<(), GeometryError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(GeometryError::Negative { name, value })
    }
}
