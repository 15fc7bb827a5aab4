use std::{collections::BTreeMap, f64::consts::PI};

use statrs::function::erf::erf;

use crate::geometry::BoreholeField;

use super::{GFunctionError, GFunctionOracle};

/// Uniform heat flux finite line source with image sources.
///
/// Each borehole is a line segment of the field depth starting at the buried
/// depth. The response of segment `j` averaged over segment `i` at distance `d`
/// is
///
/// ```text
/// h(d, t) = 1/(2H) ∫_{1/√(4αt)}^{∞} exp(−d²s²)/s² Σₖ pₖ erfint(qₖ s) ds
/// ```
///
/// and the g-function is the field average `Σᵢ Σⱼ h / N`. The integral is
/// evaluated with Simpson's rule in `ln s`, accumulated over decreasing lower
/// limits so that one sweep serves the whole time vector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FiniteLineSource {
    samples_per_unit: usize,
}

impl Default for FiniteLineSource {
    fn default() -> Self {
        Self {
            samples_per_unit: 64,
        }
    }
}

/// Integrand below `exp(-49)` is dropped.
const CUTOFF: f64 = 7.0;

/// Distances closer than this share a response.
const DISTANCE_RESOLUTION: f64 = 1e-6;

impl FiniteLineSource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the number of quadrature intervals per unit of `ln s`.
    #[must_use]
    pub fn with_resolution(samples_per_unit: usize) -> Self {
        Self {
            samples_per_unit: samples_per_unit.max(4),
        }
    }

    /// Segment-to-segment response at each of `times`, for segments of length
    /// `depth` buried `buried` below the surface.
    fn segment_response(
        &self,
        distance: f64,
        depth: f64,
        buried: f64,
        diffusivity: f64,
        times: &[f64],
    ) -> Vec<f64> {
        let (h, d) = (depth, buried);
        let q = [h, 0.0, h, 0.0, 2.0 * d + h, 2.0 * d, 2.0 * d + h, 2.0 * d + 2.0 * h];
        let integrand = |u: f64| {
            let s = u.exp();
            let sum: f64 = q
                .iter()
                .enumerate()
                .map(|(k, q)| {
                    let sign = if k % 2 == 0 { 1.0 } else { -1.0 };
                    sign * erfint(q * s)
                })
                .sum();
            // ds = s du
            (-(distance * s).powi(2)).exp() / s * sum
        };

        let upper = (CUTOFF / distance).ln();
        let mut order: Vec<usize> = (0..times.len()).collect();
        order.sort_by(|&a, &b| times[a].total_cmp(&times[b]));

        let mut out = vec![0.0; times.len()];
        let mut integral = 0.0;
        let mut from = upper;
        for i in order {
            let lower = (1.0 / (4.0 * diffusivity * times[i]).sqrt()).ln();
            if lower < from {
                integral += simpson(&integrand, lower, from, self.samples_per_unit);
                from = lower;
            }
            out[i] = integral / (2.0 * h);
        }
        out
    }
}

impl GFunctionOracle for FiniteLineSource {
    fn compute(
        &self,
        field: &BoreholeField,
        diffusivity: f64,
        times: &[f64],
    ) -> Result<Vec<f64>, GFunctionError> {
        if !field.is_vertical() {
            return Err(GFunctionError::Unsupported("inclined boreholes"));
        }
        let boreholes = field.boreholes();
        let radius = field.radius();

        let mut pairs: BTreeMap<i64, (f64, usize)> = BTreeMap::new();
        for (i, a) in boreholes.iter().enumerate() {
            for (j, b) in boreholes.iter().enumerate().skip(i) {
                let distance = a.distance(b).max(radius);
                let key = (distance / DISTANCE_RESOLUTION).round() as i64;
                let weight = if i == j { 1 } else { 2 };
                pairs.entry(key).or_insert((distance, 0)).1 += weight;
            }
        }

        let mut g = vec![0.0; times.len()];
        for (distance, count) in pairs.into_values() {
            let h = self.segment_response(
                distance,
                field.depth(),
                field.buried_depth(),
                diffusivity,
                times,
            );
            for (g, h) in g.iter_mut().zip(h) {
                *g += count as f64 * h;
            }
        }
        let n = boreholes.len() as f64;
        Ok(g.into_iter().map(|g| g / n).collect())
    }
}

/// `∫₀ˣ erf(u) du = x·erf(x) − (1 − exp(−x²))/√π`.
fn erfint(x: f64) -> f64 {
    x * erf(x) - (1.0 - (-x * x).exp()) / PI.sqrt()
}

/// Composite Simpson's rule on `[a, b]` with about `per_unit` intervals per unit.
fn simpson(f: &impl Fn(f64) -> f64, a: f64, b: f64, per_unit: usize) -> f64 {
    let mut n = ((b - a) * per_unit as f64).ceil() as usize;
    n = n.max(2);
    if n % 2 == 1 {
        n += 1;
    }
    let step = (b - a) / n as f64;
    let mut sum = f(a) + f(b);
    for k in 1..n {
        let weight = if k % 2 == 1 { 4.0 } else { 2.0 };
        sum += weight * f(a + k as f64 * step);
    }
    sum * step / 3.0
}
