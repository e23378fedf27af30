//! One-dimensional interpolants for a single scan row.
//!
//! Linear rows use straight segments between samples. Cubic and quintic rows
//! use an interpolating B-spline of that degree with not-a-knot end
//! conditions. Interior knots are the sample positions with the `(k + 1) / 2`
//! sites nearest each end left out; the coefficients solve the collocation
//! system `B c = y`.

use nalgebra::{DMatrix, DVector};

use super::{Kernel, SENTINEL};
use crate::error::{ReconError, Result};

/// Interpolant through the finite samples of one row.
#[derive(Debug, Clone)]
pub struct RowInterpolant {
    xs: Vec<f64>,
    shape: Shape,
}

#[derive(Debug, Clone)]
enum Shape {
    Linear { ys: Vec<f64> },
    BSpline { knots: Vec<f64>, coeffs: Vec<f64>, degree: usize },
}

impl RowInterpolant {
    /// Fit an interpolant through `(x, y)` pairs in any order.
    ///
    /// Pairs with a non-finite coordinate or value are dropped, as are later
    /// repeats of an already-seen position.
    pub fn fit(x: &[f64], y: &[f64], kernel: Kernel) -> Result<Self> {
        if x.len() != y.len() {
            return Err(ReconError::LengthMismatch {
                what: "row positions",
                expected: y.len(),
                actual: x.len(),
            });
        }
        let (xs, ys) = sorted_points(x, y);

        let degree = kernel.spline_degree();
        let needed = degree + 1;
        if xs.len() < needed {
            return Err(ReconError::InsufficientPoints {
                kernel: kernel.name(),
                needed,
                got: xs.len(),
            });
        }

        let shape = match kernel {
            Kernel::Linear => Shape::Linear { ys },
            Kernel::Cubic | Kernel::Quintic => {
                let knots = not_a_knot(&xs, degree);
                let coeffs = solve_collocation(&xs, &ys, &knots, degree)?;
                Shape::BSpline {
                    knots,
                    coeffs,
                    degree,
                }
            }
        };
        Ok(RowInterpolant { xs, shape })
    }

    /// Range of positions covered by the fitted samples.
    pub fn domain(&self) -> (f64, f64) {
        (self.xs[0], self.xs[self.xs.len() - 1])
    }

    /// Evaluate at `x`; [`SENTINEL`] outside [`Self::domain`].
    pub fn eval(&self, x: f64) -> f64 {
        let (lo, hi) = self.domain();
        if !(lo..=hi).contains(&x) {
            return SENTINEL;
        }
        match &self.shape {
            Shape::Linear { ys } => {
                let i = self.xs.partition_point(|&v| v < x);
                if self.xs[i] == x {
                    return ys[i];
                }
                let (x0, x1) = (self.xs[i - 1], self.xs[i]);
                let t = (x - x0) / (x1 - x0);
                ys[i - 1] + t * (ys[i] - ys[i - 1])
            }
            Shape::BSpline {
                knots,
                coeffs,
                degree,
            } => {
                let span = find_span(knots, *degree, coeffs.len(), x);
                basis_functions(knots, *degree, span, x)
                    .iter()
                    .enumerate()
                    .map(|(r, b)| coeffs[span - degree + r] * b)
                    .sum()
            }
        }
    }
}

fn sorted_points(x: &[f64], y: &[f64]) -> (Vec<f64>, Vec<f64>) {
    let mut pairs: Vec<(f64, f64)> = x
        .iter()
        .zip(y)
        .filter(|(a, b)| a.is_finite() && b.is_finite())
        .map(|(&a, &b)| (a, b))
        .collect();
    // Stable sort keeps the first of equal positions in front for dedup.
    pairs.sort_by(|a, b| a.0.total_cmp(&b.0));
    pairs.dedup_by(|later, first| later.0 == first.0);
    pairs.into_iter().unzip()
}

/// Not-a-knot knot vector for degree `k` (odd) through the sites `xs`.
fn not_a_knot(xs: &[f64], k: usize) -> Vec<f64> {
    let n = xs.len();
    let m = (k - 1) / 2;
    let first = xs[0];
    let last = xs[n - 1];

    let mut knots = Vec::with_capacity(n + k + 1);
    knots.extend(std::iter::repeat(first).take(k + 1));
    knots.extend_from_slice(&xs[m + 1..n - m - 1]);
    knots.extend(std::iter::repeat(last).take(k + 1));
    knots
}

/// Index `l` in `[k, n - 1]` with `knots[l] <= x < knots[l + 1]`; the right
/// end of the domain belongs to the last span.
fn find_span(knots: &[f64], k: usize, n: usize, x: f64) -> usize {
    let count = knots[k..=n].partition_point(|&t| t <= x);
    (k + count).saturating_sub(1).clamp(k, n - 1)
}

/// The `k + 1` B-spline basis functions that are non-zero on `span`.
fn basis_functions(knots: &[f64], k: usize, span: usize, x: f64) -> Vec<f64> {
    let mut basis = vec![0.0; k + 1];
    let mut left = vec![0.0; k + 1];
    let mut right = vec![0.0; k + 1];
    basis[0] = 1.0;
    for j in 1..=k {
        left[j] = x - knots[span + 1 - j];
        right[j] = knots[span + j] - x;
        let mut saved = 0.0;
        for r in 0..j {
            let temp = basis[r] / (right[r + 1] + left[j - r]);
            basis[r] = saved + right[r + 1] * temp;
            saved = left[j - r] * temp;
        }
        basis[j] = saved;
    }
    basis
}

fn solve_collocation(xs: &[f64], ys: &[f64], knots: &[f64], k: usize) -> Result<Vec<f64>> {
    let n = xs.len();
    let mut matrix = DMatrix::<f64>::zeros(n, n);
    for (i, &x) in xs.iter().enumerate() {
        let span = find_span(knots, k, n, x);
        for (r, b) in basis_functions(knots, k, span, x).into_iter().enumerate() {
            matrix[(i, span - k + r)] = b;
        }
    }
    let rhs = DVector::from_column_slice(ys);
    matrix
        .lu()
        .solve(&rhs)
        .map(|c| c.iter().copied().collect())
        .ok_or(ReconError::SingularSystem)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() < tol
    }

    #[test]
    fn linear_hits_samples_exactly() {
        let x = [0.3, 1.7, 2.2, 4.0];
        let y = [1.0, -2.0, 5.0, 0.5];
        let f = RowInterpolant::fit(&x, &y, Kernel::Linear).unwrap();
        for (xi, yi) in x.iter().zip(&y) {
            assert_eq!(f.eval(*xi), *yi);
        }
        assert!(close(f.eval(1.0), -0.5, 1e-12));
    }

    #[test]
    fn outside_the_samples_is_sentinel() {
        let f = RowInterpolant::fit(&[0.0, 1.0, 2.0, 3.0], &[0.0; 4], Kernel::Cubic).unwrap();
        assert!(f.eval(-0.01).is_nan());
        assert!(f.eval(3.01).is_nan());
        assert!(f.eval(f64::NAN).is_nan());
        assert_eq!(f.domain(), (0.0, 3.0));
    }

    #[test]
    fn unsorted_input_with_duplicates_and_gaps() {
        let x = [2.0, 0.0, f64::NAN, 1.0, 2.0];
        let y = [4.0, 0.0, 99.0, 1.0, 7.0];
        let f = RowInterpolant::fit(&x, &y, Kernel::Linear).unwrap();
        assert_eq!(f.domain(), (0.0, 2.0));
        assert_eq!(f.eval(2.0), 4.0);
        assert!(close(f.eval(1.5), 2.5, 1e-12));
    }

    #[test]
    fn cubic_reproduces_a_cubic() {
        let x: Vec<f64> = vec![0.0, 0.4, 1.1, 1.5, 2.6, 3.0, 3.7];
        let p = |t: f64| t * t * t - 2.0 * t * t + 0.5 * t + 1.0;
        let y: Vec<f64> = x.iter().map(|&t| p(t)).collect();
        let f = RowInterpolant::fit(&x, &y, Kernel::Cubic).unwrap();
        for t in [0.0, 0.2, 0.9, 1.3, 2.0, 3.3, 3.7] {
            assert!(close(f.eval(t), p(t), 1e-9), "at {t}: {} vs {}", f.eval(t), p(t));
        }
    }

    #[test]
    fn quintic_reproduces_a_quintic() {
        let x: Vec<f64> = (0..9).map(|i| i as f64 * 0.5 + 0.1 * (i % 2) as f64).collect();
        let p = |t: f64| t.powi(5) - 3.0 * t.powi(3) + t;
        let y: Vec<f64> = x.iter().map(|&t| p(t)).collect();
        let f = RowInterpolant::fit(&x, &y, Kernel::Quintic).unwrap();
        for t in [0.0, 0.75, 1.9, 3.05, 3.95] {
            assert!(close(f.eval(t), p(t), 1e-7), "at {t}: {} vs {}", f.eval(t), p(t));
        }
    }

    #[test]
    fn spline_passes_through_samples() {
        let x = [0.0, 1.0, 2.5, 3.0, 4.5, 6.0];
        let y = [0.0, 1.0, 0.0, -1.0, 0.0, 2.0];
        let f = RowInterpolant::fit(&x, &y, Kernel::Cubic).unwrap();
        for (xi, yi) in x.iter().zip(&y) {
            assert!(close(f.eval(*xi), *yi, 1e-10));
        }
    }

    #[test]
    fn too_few_points() {
        let err = RowInterpolant::fit(&[0.0, 1.0, 2.0], &[0.0; 3], Kernel::Cubic).unwrap_err();
        assert!(matches!(
            err,
            ReconError::InsufficientPoints { needed: 4, got: 3, .. }
        ));
    }

    #[test]
    fn knot_vector_length() {
        let xs: Vec<f64> = (0..10).map(f64::from).collect();
        for k in [3, 5] {
            assert_eq!(not_a_knot(&xs, k).len(), xs.len() + k + 1);
        }
    }
}
