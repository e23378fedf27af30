use super::metadata::{resolve_dimensions, scan_range, scan_starts};
use crate::data::model::ScanHeader;
use crate::error::Result;

/// Ideal sampling positions of a 2D fly scan.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    /// Fast-axis coordinates, one per column.
    pub x: Vec<f64>,
    /// Slow-axis coordinates, one per row.
    pub y: Vec<f64>,
}

impl Grid {
    /// Fast-axis coordinate of every point in row-major order (`y` slow).
    pub fn tiled_x(&self) -> Vec<f64> {
        self.y.iter().flat_map(|_| self.x.iter().copied()).collect()
    }
}

/// Compute the ideal grid a 2D fly scan was meant to sample.
///
/// Each axis runs from its start offset to `start + width + step / 2`, where
/// `step = width / n`. The half-step past the nominal end is kept as recorded
/// by the acquisition software.
pub fn build_grid(header: &ScanHeader) -> Result<Grid> {
    let dims = resolve_dimensions(header)?;
    let ((x0, x1), (y0, y1)) = scan_range(header)?;
    let (start_x, start_y) = scan_starts(header)?;

    let width = x1 - x0;
    let height = y1 - y0;
    let dx = width / dims.nx as f64;
    let dy = height / dims.ny as f64;

    Ok(Grid {
        x: linspace(start_x, start_x + width + dx / 2.0, dims.nx),
        y: linspace(start_y, start_y + height + dy / 2.0, dims.ny),
    })
}

/// `n` evenly spaced values from `start` to `stop`, both inclusive.
pub fn linspace(start: f64, stop: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (n - 1) as f64;
            let mut out: Vec<f64> = (0..n).map(|i| start + step * i as f64).collect();
            out[n - 1] = stop;
            out
        }
    }
}
