//! End-to-end reconstruction of one scan channel.
//!
//! ```text
//!  ScanCache ──► channel ──► normalize? ──► align ──► interp2d? ──► reshape ──► interp1d? ──► image
//! ```

use ndarray::Array2;

use super::align::{align, align_with};
use super::grid::{build_grid, Grid};
use super::interp::{interp2d_scan, resample_rows, Kernel};
use super::metadata::resolve_dimensions;
use super::normalize::normalize;
use super::reshape::{reshape, reshape_as};
use crate::cache::ScanCache;
use crate::config::ReconstructOptions;
use crate::data::channel::ChannelSelector;
use crate::data::loader::DataStore;
use crate::data::model::{ScanHeader, ScanId, ScanRef, Trajectory};
use crate::display::{ColorLimits, Extent};
use crate::error::{ReconError, Result};

/// Pixel data of a reconstruction.
#[derive(Debug, Clone, PartialEq)]
pub enum ImageData {
    /// `(ny, nx)` image, rows along the slow axis.
    Shaped(Array2<f64>),
    /// The flat spectrum, when it could not be reshaped.
    ///
    /// [`reconstruct`] aligns the spectrum to `nx * ny` before reshaping, so
    /// a well-formed header always yields [`ImageData::Shaped`]; this arm is
    /// the soft-failure path of [`reshape`] should the two ever disagree.
    Unshaped(Vec<f64>),
}

impl ImageData {
    pub fn as_image(&self) -> Option<&Array2<f64>> {
        match self {
            ImageData::Shaped(image) => Some(image),
            ImageData::Unshaped(_) => None,
        }
    }
}

/// Result of [`reconstruct`]: the pixels plus what is needed to label them.
#[derive(Debug, Clone)]
pub struct ReconstructedImage {
    pub scan_id: ScanId,
    /// The requested element or channel.
    pub channel: String,
    pub selector: ChannelSelector,
    pub normalized_by: Option<String>,
    /// Scan start, seconds since the epoch, when the header records it.
    pub start_time: Option<f64>,
    pub x_channel: String,
    pub y_channel: String,
    pub data: ImageData,
    /// Ideal grid the image is laid out on.
    pub grid: Grid,
    pub color_limits: Option<ColorLimits>,
    pub extent: Option<Extent>,
}

impl ReconstructedImage {
    pub fn image(&self) -> Option<&Array2<f64>> {
        self.data.as_image()
    }

    pub fn title(&self) -> String {
        let mut title = match &self.normalized_by {
            Some(norm) => format!("Scan id {}. {} (normalized to {norm})", self.scan_id, self.channel),
            None => format!("Scan id {}. {}", self.scan_id, self.channel),
        };
        if let Some(t) = self.start_time {
            title.push_str(&format!("    Start time: {t}"));
        }
        title
    }
}

/// Reconstruct the 2D image of `channel` for `scan`.
///
/// The scan is fetched through `cache`, so repeated calls for the same scan
/// hit the store once. Missing channels, non-2D headers, unknown kernels and
/// a spectrum longer than the grid abort the call. A spectrum that cannot be
/// reshaped yields [`ImageData::Unshaped`] instead.
///
/// With `interp_2d` set, the surface is evaluated directly on the ideal grid,
/// so the result is already in spatial order: pyramid scans are *not* row
/// flipped after the 2D stage, and a following `interp_1d` pass resamples
/// against the grid positions rather than the measured ones.
pub fn reconstruct<S: DataStore + ?Sized>(
    cache: &mut ScanCache,
    store: &S,
    scan: ScanRef,
    channel: &str,
    opts: &ReconstructOptions,
) -> Result<ReconstructedImage> {
    let kernel_1d = opts.interp_1d.as_deref().map(str::parse::<Kernel>).transpose()?;
    let kernel_2d = opts.interp_2d.as_deref().map(str::parse::<Kernel>).transpose()?;

    let (scan_id, cached) = cache.get(store, scan, opts.fill_events)?;
    let header = &cached.header;
    let table = &cached.table;

    let selector = ChannelSelector::resolve(table, channel, &opts.roi_detectors);
    let mut spectrum = selector.spectrum(table)?;

    let x_channel = position_channel(opts.x_channel.as_deref(), header.fast_axis(), "x")?;
    let y_channel = position_channel(opts.y_channel.as_deref(), header.slow_axis(), "y")?;
    let x_data = table.numeric(&x_channel)?;
    let y_data = table.numeric(&y_channel)?;

    if let Some(monitor) = &opts.normalize_by {
        spectrum = normalize(&spectrum, table.numeric(monitor)?);
    }

    let dims = resolve_dimensions(header)?;
    let total_points = dims.total_points();
    let grid = build_grid(header)?;

    let color_limits = opts
        .color_limits
        .map(ColorLimits::from)
        .or_else(|| ColorLimits::from_data(&spectrum));
    let extent = Extent::from_positions(x_data, y_data);

    log::info!("Scan {scan_id}: {channel} ({} of {total_points} points)", spectrum.len());

    let spectrum = align(spectrum, total_points)?;
    let x_padded = align_with(x_data.to_vec(), total_points, f64::NAN)?;
    let y_padded = align_with(y_data.to_vec(), total_points, f64::NAN)?;

    let data = match kernel_2d {
        Some(kernel) => {
            log::info!("Using 2D {kernel} interpolation...");
            let gridded = interp2d_scan(header, &x_padded, &y_padded, &spectrum, kernel)?;
            // Already in spatial order on the ideal grid.
            match reshape_as(header, Trajectory::Raster, &gridded)? {
                Some(image) => {
                    let image = match kernel_1d {
                        Some(kernel) => resample_on_grid(&image, &grid, kernel)?,
                        None => image,
                    };
                    ImageData::Shaped(image)
                }
                None => ImageData::Unshaped(gridded),
            }
        }
        None => match reshape(header, &spectrum)? {
            Some(image) => {
                let image = match kernel_1d {
                    Some(kernel) => resample_measured(header, &x_padded, &image, &grid, kernel)?,
                    None => image,
                };
                ImageData::Shaped(image)
            }
            None => ImageData::Unshaped(spectrum),
        },
    };

    Ok(ReconstructedImage {
        scan_id,
        channel: channel.to_string(),
        selector,
        normalized_by: opts.normalize_by.clone(),
        start_time: header.time,
        x_channel,
        y_channel,
        data,
        grid,
        color_limits,
        extent,
    })
}

fn position_channel(explicit: Option<&str>, from_header: Option<&str>, axis: &str) -> Result<String> {
    explicit
        .or(from_header)
        .map(str::to_string)
        .ok_or_else(|| ReconError::MissingChannel {
            attempted: vec![format!("<{axis} positioner: none given, none in header>")],
        })
}

/// 1D stage on measured positions, reshaped like the image.
fn resample_measured(
    header: &ScanHeader,
    x_padded: &[f64],
    image: &Array2<f64>,
    grid: &Grid,
    kernel: Kernel,
) -> Result<Array2<f64>> {
    log::info!("Using 1D {kernel} interpolation...");
    let positions = reshape(header, x_padded)?.ok_or(ReconError::ShapeMismatch {
        expected: image.dim(),
        actual: x_padded.len(),
    })?;
    resample_rows(&positions, image, &grid.x, kernel)
}

/// 1D stage after the 2D stage: samples already sit on the grid.
fn resample_on_grid(image: &Array2<f64>, grid: &Grid, kernel: Kernel) -> Result<Array2<f64>> {
    log::debug!("1D {kernel} pass over 2D-gridded data uses grid positions");
    let positions = Array2::from_shape_fn(image.dim(), |(_, col)| grid.x[col]);
    resample_rows(&positions, image, &grid.x, kernel)
}
