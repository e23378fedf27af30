//! Resampling of fly-scan data onto the ideal grid.
//!
//! Two independent strategies:
//! * [`interp1d_scan`] works row by row on a reshaped image, along the fast
//!   axis only. Cheap; meant for interactive use.
//! * [`interp2d_scan`] fits one surface through every sample and evaluates it
//!   on the full grid. The dense solve grows cubically with the number of
//!   samples, so keep it for small scans or offline reprocessing.

use std::fmt;
use std::str::FromStr;

use ndarray::Array2;

use super::grid::build_grid;
use super::metadata::resolve_dimensions;
use super::reshape::reshape;
use crate::data::model::ScanHeader;
use crate::error::{ReconError, Result};

pub mod rbf;
pub mod spline;

pub use rbf::ScatteredInterpolant;
pub use spline::RowInterpolant;

/// Value returned where an interpolant has no data to stand on.
pub const SENTINEL: f64 = f64::NAN;

/// Interpolation kernel, shared by both strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kernel {
    Linear,
    Cubic,
    Quintic,
}

impl Kernel {
    pub fn name(self) -> &'static str {
        match self {
            Kernel::Linear => "linear",
            Kernel::Cubic => "cubic",
            Kernel::Quintic => "quintic",
        }
    }

    /// Degree of the 1D spline used for this kernel.
    pub fn spline_degree(self) -> usize {
        match self {
            Kernel::Linear => 1,
            Kernel::Cubic => 3,
            Kernel::Quintic => 5,
        }
    }
}

impl FromStr for Kernel {
    type Err = ReconError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "linear" => Ok(Kernel::Linear),
            "cubic" => Ok(Kernel::Cubic),
            "quintic" => Ok(Kernel::Quintic),
            _ => Err(ReconError::UnsupportedInterpolationKernel(s.to_string())),
        }
    }
}

impl fmt::Display for Kernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// 1D: per-row resampling along the fast axis
// ---------------------------------------------------------------------------

/// Resample every row of `image` onto the ideal fast-axis grid.
///
/// `x_data` are the measured fast-axis positions in acquisition order; they
/// are reshaped (and pyramid-corrected) the same way `image` was. Grid points
/// outside a row's measured range come back as [`SENTINEL`].
pub fn interp1d_scan(
    header: &ScanHeader,
    x_data: &[f64],
    image: &Array2<f64>,
    kernel: Kernel,
) -> Result<Array2<f64>> {
    let grid = build_grid(header)?;
    let positions = reshape(header, x_data)?.ok_or_else(|| ReconError::ShapeMismatch {
        expected: image.dim(),
        actual: x_data.len(),
    })?;
    resample_rows(&positions, image, &grid.x, kernel)
}

/// Row-by-row resampling given per-sample positions laid out like `image`.
pub fn resample_rows(
    positions: &Array2<f64>,
    image: &Array2<f64>,
    grid_x: &[f64],
    kernel: Kernel,
) -> Result<Array2<f64>> {
    if positions.dim() != image.dim() {
        return Err(ReconError::ShapeMismatch {
            expected: image.dim(),
            actual: positions.len(),
        });
    }
    let (rows, cols) = image.dim();
    if grid_x.len() != cols {
        return Err(ReconError::LengthMismatch {
            what: "fast-axis grid",
            expected: cols,
            actual: grid_x.len(),
        });
    }

    let mut out = Array2::from_elem((rows, cols), SENTINEL);
    for (row, mut out_row) in out.rows_mut().into_iter().enumerate() {
        let xs = positions.row(row).to_vec();
        let ys = image.row(row).to_vec();
        match RowInterpolant::fit(&xs, &ys, kernel) {
            Ok(f) => {
                for (dst, &gx) in out_row.iter_mut().zip(grid_x) {
                    *dst = f.eval(gx);
                }
            }
            Err(ReconError::InsufficientPoints { needed, got, .. }) => {
                log::warn!("Row {row}: {got} usable points, {kernel} needs {needed}; left empty");
            }
            Err(err) => return Err(err),
        }
    }
    Ok(out)
}

// ---------------------------------------------------------------------------
// 2D: scattered-data surface over the whole scan
// ---------------------------------------------------------------------------

/// Fit one surface through all `(x, y, value)` samples and evaluate it on the
/// ideal grid. Returns a flat, row-major (`y` slow) sequence of `nx * ny`
/// values, ready for reshaping.
pub fn interp2d_scan(
    header: &ScanHeader,
    x_data: &[f64],
    y_data: &[f64],
    spectrum: &[f64],
    kernel: Kernel,
) -> Result<Vec<f64>> {
    for (what, len) in [("x positions", x_data.len()), ("y positions", y_data.len())] {
        if len != spectrum.len() {
            return Err(ReconError::LengthMismatch {
                what,
                expected: spectrum.len(),
                actual: len,
            });
        }
    }

    let dims = resolve_dimensions(header)?;
    let grid = build_grid(header)?;
    let surface = ScatteredInterpolant::fit(x_data, y_data, spectrum, kernel)?;
    log::debug!(
        "2D {kernel} surface through {} points, evaluating {} grid points",
        surface.len(),
        dims.total_points()
    );

    let mut out = Vec::with_capacity(dims.total_points());
    for &gy in &grid.y {
        for &gx in &grid.x {
            out.push(surface.eval(gx, gy));
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn header(fly_type: &str) -> ScanHeader {
        ScanHeader::from_json(json!({
            "dimensions": [5, 4],
            "scan_range": [[0.0, 10.0], [0.0, 8.0]],
            "scan_starts": [0.0, 0.0],
            "fly_type": fly_type,
        }))
        .unwrap()
    }

    #[test]
    fn kernel_names() {
        assert_eq!("linear".parse::<Kernel>().unwrap(), Kernel::Linear);
        assert_eq!("Cubic".parse::<Kernel>().unwrap(), Kernel::Cubic);
        assert_eq!("quintic".parse::<Kernel>().unwrap(), Kernel::Quintic);
        match "nearest".parse::<Kernel>() {
            Err(ReconError::UnsupportedInterpolationKernel(name)) => assert_eq!(name, "nearest"),
            other => panic!("expected UnsupportedInterpolationKernel, got {other:?}"),
        }
    }

    #[test]
    fn linear_rows_land_on_the_grid() {
        // Measured positions are the grid shifted by 0.1; value == position.
        let grid = build_grid(&header("raster")).unwrap();
        let x_data: Vec<f64> = grid.tiled_x().iter().map(|x| x - 0.1).collect();
        let values = x_data.clone();
        let image = reshape(&header("raster"), &values).unwrap().unwrap();

        let out = interp1d_scan(&header("raster"), &x_data, &image, Kernel::Linear).unwrap();
        for row in out.rows() {
            for (v, gx) in row.iter().zip(&grid.x) {
                if *gx <= grid.x[4] - 0.1 {
                    assert!((v - gx).abs() < 1e-9);
                } else {
                    assert!(v.is_nan(), "past the last sample must be the sentinel");
                }
            }
        }
    }

    #[test]
    fn pyramid_positions_are_flipped_with_the_image() {
        let h = header("pyramid");
        let grid = build_grid(&h).unwrap();
        // Acquisition order: odd rows travel backwards.
        let mut x_data = Vec::new();
        for row in 0..4 {
            let mut xs = grid.x.clone();
            if row % 2 == 1 {
                xs.reverse();
            }
            x_data.extend(xs);
        }
        let values: Vec<f64> = x_data.iter().map(|x| 2.0 * x).collect();
        let image = reshape(&h, &values).unwrap().unwrap();

        let out = interp1d_scan(&h, &x_data, &image, Kernel::Cubic).unwrap();
        for row in out.rows() {
            for (v, gx) in row.iter().zip(&grid.x) {
                assert!((v - 2.0 * gx).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn rows_without_enough_points_are_sentinel() {
        let positions = ndarray::array![[0.0, 1.0, f64::NAN], [0.0, 1.0, 2.0]];
        let image = ndarray::array![[1.0, 2.0, 0.0], [1.0, 2.0, 3.0]];
        let out = resample_rows(&positions, &image, &[0.0, 1.0, 2.0], Kernel::Cubic).unwrap();
        assert!(out.row(0).iter().all(|v| v.is_nan()));
        assert!(out.row(1).iter().all(|v| v.is_nan()));

        let out = resample_rows(&positions, &image, &[0.0, 0.5, 2.0], Kernel::Linear).unwrap();
        assert!((out[[0, 1]] - 1.5).abs() < 1e-12);
        assert!(out[[0, 2]].is_nan());
        assert!((out[[1, 2]] - 3.0).abs() < 1e-12);
    }

    #[test]
    fn interp2d_reproduces_a_plane() {
        let h = header("raster");
        let grid = build_grid(&h).unwrap();
        // Jittered samples covering slightly more than the grid.
        let mut xs = Vec::new();
        let mut ys = Vec::new();
        for (j, &gy) in grid.y.iter().enumerate() {
            for (i, &gx) in grid.x.iter().enumerate() {
                xs.push(gx + 0.05 * ((i + j) % 3) as f64);
                ys.push(gy - 0.04 * ((i * j) % 2) as f64);
            }
        }
        let values: Vec<f64> = xs.iter().zip(&ys).map(|(x, y)| 3.0 + 2.0 * x - y).collect();

        let flat = interp2d_scan(&h, &xs, &ys, &values, Kernel::Linear).unwrap();
        assert_eq!(flat.len(), 20);
        for (k, v) in flat.iter().enumerate() {
            let (gx, gy) = (grid.x[k % 5], grid.y[k / 5]);
            assert!((v - (3.0 + 2.0 * gx - gy)).abs() < 1e-6, "at ({gx}, {gy}) got {v}");
        }
    }

    #[test]
    fn interp2d_rejects_mismatched_lengths() {
        let err = interp2d_scan(&header("raster"), &[0.0; 3], &[0.0; 2], &[0.0; 3], Kernel::Linear)
            .unwrap_err();
        assert!(matches!(err, ReconError::LengthMismatch { .. }));
    }
}
