use rustfft::{FftPlanner, num_complex::Complex};

/// Inputs at most this long are convolved directly.
const DIRECT_LIMIT: usize = 512;

/// Step-response increments `w_k = g_k − g_{k−1}` with `g_{−1} = 0`.
pub(crate) fn increments(g: &[f64]) -> Vec<f64> {
    let mut previous = 0.0;
    g.iter()
        .map(|&value| {
            let w = value - previous;
            previous = value;
            w
        })
        .collect()
}

/// Causal convolution `r_k = Σ_{j≤k} q_j · w_{k−j}`, truncated to `q.len()`.
pub(crate) fn causal(q: &[f64], w: &[f64]) -> Vec<f64> {
    let n = q.len().min(w.len());
    if n == 0 {
        return Vec::new();
    }
    if n <= DIRECT_LIMIT {
        return causal_direct(&q[..n], &w[..n]);
    }

    // Zero padding to 2n keeps the circular wrap out of the first n outputs.
    let fft_size = (2 * n).next_power_of_two();
    let mut planner = FftPlanner::<f64>::new();
    let fft = planner.plan_fft_forward(fft_size);
    let ifft = planner.plan_fft_inverse(fft_size);

    let padded = |values: &[f64]| -> Vec<Complex<f64>> {
        values[..n]
            .iter()
            .map(|&x| Complex::new(x, 0.0))
            .chain(std::iter::repeat_n(Complex::new(0.0, 0.0), fft_size - n))
            .collect()
    };
    let mut signal = padded(q);
    let mut kernel = padded(w);
    fft.process(&mut signal);
    fft.process(&mut kernel);
    for (s, k) in signal.iter_mut().zip(&kernel) {
        *s *= k;
    }
    ifft.process(&mut signal);

    let scale = 1.0 / fft_size as f64;
    signal[..n].iter().map(|c| c.re * scale).collect()
}

fn causal_direct(q: &[f64], w: &[f64]) -> Vec<f64> {
    (0..q.len()).map(|k| at(q, w, k)).collect()
}

/// A single output `r_k` of [`causal`].
pub(crate) fn at(q: &[f64], w: &[f64], k: usize) -> f64 {
    (0..=k).map(|j| q[j] * w[k - j]).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_abs_diff_eq;

    #[test]
    fn increments_difference_the_step_response() {
        assert_eq!(increments(&[1.0, 3.0, 4.0]), vec![1.0, 2.0, 1.0]);
    }

    #[test]
    fn unit_step_reproduces_the_response() {
        let g: Vec<f64> = (1..=40).map(|k| (k as f64).ln() + 1.0).collect();
        let r = causal(&[1.0; 40], &increments(&g));
        for (r, g) in r.iter().zip(&g) {
            assert_abs_diff_eq!(r, g, epsilon = 1e-12);
        }
    }

    #[test]
    fn fft_matches_direct() {
        let n = 3000;
        let q: Vec<f64> = (0..n).map(|i| (i as f64 * 0.01).sin() * 1e4).collect();
        let w: Vec<f64> = (0..n).map(|i| 1.0 / (1.0 + i as f64)).collect();

        let fast = causal(&q, &w);
        for k in [0, 1, 511, 512, 1777, n - 1] {
            assert_abs_diff_eq!(fast[k], at(&q, &w, k), epsilon = 1e-6);
        }
    }
}
