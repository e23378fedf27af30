//! Flat acquisition order → (rows, columns) image, with serpentine
//! correction.

use ndarray::Array2;

use super::metadata::resolve_dimensions;
use crate::data::model::{ScanHeader, Trajectory};
use crate::error::{ReconError, Result};

/// Reshape a flat spectrum to `(ny, nx)` and undo the pyramid row reversal.
///
/// A length that does not match `nx * ny` is not fatal: it is logged and
/// `Ok(None)` is returned so the caller can fall back to the flat data.
/// A header that does not describe a 2D scan is still an error.
pub fn reshape(header: &ScanHeader, spectrum: &[f64]) -> Result<Option<Array2<f64>>> {
    reshape_as(header, header.trajectory(), spectrum)
}

/// [`reshape`] with the trajectory chosen by the caller.
pub fn reshape_as(
    header: &ScanHeader,
    trajectory: Trajectory,
    spectrum: &[f64],
) -> Result<Option<Array2<f64>>> {
    let dims = resolve_dimensions(header)?;
    match to_image(spectrum, dims.shape()) {
        Ok(mut image) => {
            if trajectory == Trajectory::Pyramid {
                log::debug!("Pyramid scan. Flipping odd rows.");
                flip_odd_rows(&mut image);
            }
            Ok(Some(image))
        }
        Err(err) => {
            log::warn!("Unable to reshape data to ({}, {}) ({err})", dims.nx, dims.ny);
            Ok(None)
        }
    }
}

/// Row-major reshape without any trajectory correction.
pub fn to_image(spectrum: &[f64], shape: (usize, usize)) -> Result<Array2<f64>> {
    Array2::from_shape_vec(shape, spectrum.to_vec()).map_err(|_| ReconError::ShapeMismatch {
        expected: shape,
        actual: spectrum.len(),
    })
}

/// Reverse every odd row (1, 3, 5, …) along the fast axis. Applying it
/// twice restores the input.
pub fn flip_odd_rows(image: &mut Array2<f64>) {
    for mut row in image.rows_mut().into_iter().skip(1).step_by(2) {
        let n = row.len();
        for j in 0..n / 2 {
            row.swap(j, n - 1 - j);
        }
    }
}
