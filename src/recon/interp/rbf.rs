//! Radial basis function surface through scattered `(x, y, value)` samples.
//!
//! `s(p) = Σ w_i φ(|p - p_i|) + P(p)` with a low-degree polynomial tail `P`.
//! The weights solve the dense saddle-point system
//! `[Φ P; Pᵀ 0] [w; a] = [f; 0]`, so fitting is O(n³) in the sample count.

use nalgebra::{DMatrix, DVector};

use super::Kernel;
use crate::error::{ReconError, Result};

#[derive(Debug, Clone)]
pub struct ScatteredInterpolant {
    kernel: Kernel,
    centers: Vec<[f64; 2]>,
    weights: Vec<f64>,
    poly: Vec<f64>,
    /// Polynomial terms are evaluated in coordinates shifted and scaled to
    /// roughly [-1, 1] to keep the system well conditioned.
    shift: [f64; 2],
    scale: [f64; 2],
}

fn phi(kernel: Kernel, r: f64) -> f64 {
    match kernel {
        Kernel::Linear => -r,
        Kernel::Cubic => r * r * r,
        Kernel::Quintic => -(r * r * r * r * r),
    }
}

fn poly_degree(kernel: Kernel) -> usize {
    match kernel {
        Kernel::Linear | Kernel::Cubic => 1,
        Kernel::Quintic => 2,
    }
}

fn poly_terms(degree: usize, u: f64, v: f64) -> Vec<f64> {
    match degree {
        1 => vec![1.0, u, v],
        _ => vec![1.0, u, v, u * u, u * v, v * v],
    }
}

impl ScatteredInterpolant {
    /// Fit through every sample whose position and value are finite.
    /// Repeated positions keep their first value.
    pub fn fit(x: &[f64], y: &[f64], values: &[f64], kernel: Kernel) -> Result<Self> {
        let mut points: Vec<([f64; 2], f64)> = x
            .iter()
            .zip(y)
            .zip(values)
            .filter(|((a, b), v)| a.is_finite() && b.is_finite() && v.is_finite())
            .map(|((&a, &b), &v)| ([a, b], v))
            .collect();
        points.sort_by(|p, q| p.0[0].total_cmp(&q.0[0]).then(p.0[1].total_cmp(&q.0[1])));
        points.dedup_by(|later, first| later.0 == first.0);

        let degree = poly_degree(kernel);
        let m = poly_terms(degree, 0.0, 0.0).len();
        let n = points.len();
        if n < m + 1 {
            return Err(ReconError::InsufficientPoints {
                kernel: kernel.name(),
                needed: m + 1,
                got: n,
            });
        }

        let (shift, scale) = normalization(&points);
        let scaled = |p: [f64; 2]| ((p[0] - shift[0]) / scale[0], (p[1] - shift[1]) / scale[1]);

        // The tail must be determined by the samples, e.g. not all on one line.
        let tail = DMatrix::from_fn(n, m, |i, k| {
            let (u, v) = scaled(points[i].0);
            poly_terms(degree, u, v)[k]
        });
        if tail.rank(1e-10) < m {
            return Err(ReconError::SingularSystem);
        }

        let size = n + m;
        let mut a = DMatrix::<f64>::zeros(size, size);
        let mut rhs = DVector::<f64>::zeros(size);
        for (i, (pi, fi)) in points.iter().enumerate() {
            for (j, (pj, _)) in points.iter().enumerate().skip(i) {
                let value = phi(kernel, distance(*pi, *pj));
                a[(i, j)] = value;
                a[(j, i)] = value;
            }
            for k in 0..m {
                a[(i, n + k)] = tail[(i, k)];
                a[(n + k, i)] = tail[(i, k)];
            }
            rhs[i] = *fi;
        }

        let solution = a.lu().solve(&rhs).ok_or(ReconError::SingularSystem)?;
        if solution.iter().any(|c| !c.is_finite()) {
            return Err(ReconError::SingularSystem);
        }

        Ok(ScatteredInterpolant {
            kernel,
            centers: points.iter().map(|(p, _)| *p).collect(),
            weights: solution.rows(0, n).iter().copied().collect(),
            poly: solution.rows(n, m).iter().copied().collect(),
            shift,
            scale,
        })
    }

    /// Number of samples the surface passes through.
    pub fn len(&self) -> usize {
        self.centers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.centers.is_empty()
    }

    pub fn eval(&self, x: f64, y: f64) -> f64 {
        let radial: f64 = self
            .centers
            .iter()
            .zip(&self.weights)
            .map(|(c, w)| w * phi(self.kernel, distance(*c, [x, y])))
            .sum();
        let u = (x - self.shift[0]) / self.scale[0];
        let v = (y - self.shift[1]) / self.scale[1];
        let tail: f64 = poly_terms(poly_degree(self.kernel), u, v)
            .iter()
            .zip(&self.poly)
            .map(|(t, a)| t * a)
            .sum();
        radial + tail
    }
}

fn distance(p: [f64; 2], q: [f64; 2]) -> f64 {
    (p[0] - q[0]).hypot(p[1] - q[1])
}

/// Centre and half-span of the sample cloud per axis (half-span 1 when flat).
fn normalization(points: &[([f64; 2], f64)]) -> ([f64; 2], [f64; 2]) {
    let mut shift = [0.0; 2];
    let mut scale = [1.0; 2];
    for axis in 0..2 {
        let (lo, hi) = points.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), (p, _)| {
            (lo.min(p[axis]), hi.max(p[axis]))
        });
        shift[axis] = 0.5 * (lo + hi);
        let half = 0.5 * (hi - lo);
        if half > 0.0 {
            scale[axis] = half;
        }
    }
    (shift, scale)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cloud() -> (Vec<f64>, Vec<f64>) {
        let mut xs = Vec::new();
        let mut ys = Vec::new();
        for j in 0..5 {
            for i in 0..6 {
                xs.push(i as f64 * 1.3 + 0.07 * (j % 2) as f64);
                ys.push(j as f64 * 0.9 - 0.05 * (i % 3) as f64);
            }
        }
        (xs, ys)
    }

    #[test]
    fn passes_through_every_sample() {
        let (xs, ys) = cloud();
        let values: Vec<f64> = xs.iter().zip(&ys).map(|(x, y)| (x * 0.7).sin() + y * y).collect();
        for kernel in [Kernel::Linear, Kernel::Cubic, Kernel::Quintic] {
            let s = ScatteredInterpolant::fit(&xs, &ys, &values, kernel).unwrap();
            assert_eq!(s.len(), 30);
            for ((x, y), v) in xs.iter().zip(&ys).zip(&values) {
                assert!((s.eval(*x, *y) - v).abs() < 1e-6, "{kernel} at ({x}, {y})");
            }
        }
    }

    #[test]
    fn quintic_reproduces_quadratics() {
        let (xs, ys) = cloud();
        let q = |x: f64, y: f64| 1.0 + x - 2.0 * y + 0.5 * x * y - 0.25 * y * y;
        let values: Vec<f64> = xs.iter().zip(&ys).map(|(x, y)| q(*x, *y)).collect();
        let s = ScatteredInterpolant::fit(&xs, &ys, &values, Kernel::Quintic).unwrap();
        for (x, y) in [(1.0, 1.0), (3.3, 2.1), (5.0, 0.4)] {
            assert!((s.eval(x, y) - q(x, y)).abs() < 1e-6);
        }
    }

    #[test]
    fn non_finite_and_repeated_samples_are_skipped() {
        let xs = [0.0, 1.0, 0.0, 1.0, 0.0, f64::NAN];
        let ys = [0.0, 0.0, 1.0, 1.0, 0.0, 5.0];
        let vs = [1.0, 2.0, 3.0, 4.0, 100.0, 7.0];
        let s = ScatteredInterpolant::fit(&xs, &ys, &vs, Kernel::Linear).unwrap();
        assert_eq!(s.len(), 4);
        assert!((s.eval(0.0, 0.0) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn collinear_samples_are_singular() {
        let xs = [0.0, 1.0, 2.0, 3.0];
        let ys = [0.0, 1.0, 2.0, 3.0];
        let vs = [0.0, 1.0, 0.0, 1.0];
        assert!(matches!(
            ScatteredInterpolant::fit(&xs, &ys, &vs, Kernel::Cubic),
            Err(ReconError::SingularSystem)
        ));
    }

    #[test]
    fn too_few_samples() {
        assert!(matches!(
            ScatteredInterpolant::fit(&[0.0, 1.0], &[0.0, 1.0], &[1.0, 2.0], Kernel::Linear),
            Err(ReconError::InsufficientPoints { .. })
        ));
    }
}
