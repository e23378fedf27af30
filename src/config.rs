use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::data::channel::DEFAULT_ROI_DETECTORS;

/// Per-call reconstruction settings.
///
/// Kernel names stay strings here; an unknown name is reported when the
/// reconstruction runs, as `UnsupportedInterpolationKernel`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReconstructOptions {
    /// Monitor channel to divide the signal by.
    pub normalize_by: Option<String>,
    /// Fast-axis position channel; defaults to the header's first motor.
    pub x_channel: Option<String>,
    /// Slow-axis position channel; defaults to the header's second motor.
    pub y_channel: Option<String>,
    /// `(min, max)` for the colour scale; defaults to the data range.
    pub color_limits: Option<(f64, f64)>,
    /// Kernel for per-row resampling along the fast axis.
    pub interp_1d: Option<String>,
    /// Kernel for full 2D scattered-data resampling (slow).
    pub interp_2d: Option<String>,
    /// Detector numbers summed when an element has no channel of its own.
    pub roi_detectors: Vec<u32>,
    /// Materialise reference columns when fetching the event table.
    pub fill_events: bool,
}

impl Default for ReconstructOptions {
    fn default() -> Self {
        Self {
            normalize_by: None,
            x_channel: None,
            y_channel: None,
            color_limits: None,
            interp_1d: None,
            interp_2d: None,
            roi_detectors: DEFAULT_ROI_DETECTORS.to_vec(),
            fill_events: false,
        }
    }
}

/// Read options from a JSON file. Missing keys take their defaults.
pub fn load_options(path: &Path) -> Result<ReconstructOptions> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading options {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing options {}", path.display()))
}
