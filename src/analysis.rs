//! Helpers for 1D step scans: derivative, edge and mass centres.

use crate::cache::ScanCache;
use crate::config::ReconstructOptions;
use crate::data::channel::ChannelSelector;
use crate::data::loader::DataStore;
use crate::data::model::{ScanId, ScanRef};
use crate::error::{ReconError, Result};
use crate::recon::normalize::normalize;

/// One channel of a 1D scan against its scanned axis.
#[derive(Debug, Clone)]
pub struct Profile {
    pub scan_id: ScanId,
    pub element: String,
    pub x_channel: String,
    /// Scan start, seconds since the epoch, when the header records it.
    pub start_time: Option<f64>,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

impl Profile {
    pub fn title(&self) -> String {
        let mut title = format!("Scan {}: {} vs {}", self.scan_id, self.element, self.x_channel);
        if let Some(t) = self.start_time {
            title.push_str(&format!("    Start time: {t}"));
        }
        title
    }

    /// Slope of the profile at the midpoints between samples.
    pub fn derivative(&self) -> (Vec<f64>, Vec<f64>) {
        derivative(&self.x, &self.y)
    }

    /// Position of the steepest rise/fall midpoint, see [`edge_center`].
    pub fn edge_center(&self) -> Option<f64> {
        edge_center(&self.x, &self.y)
    }

    /// Position at the intensity-weighted centre index.
    pub fn mass_center(&self) -> Option<f64> {
        mass_center(&self.y).and_then(|i| self.x.get(i).copied())
    }
}

/// Load `element` of a 1D scan against `x_channel` (default: the header's
/// scanned motor). Same channel and normalization rules as 2D images.
pub fn profile<S: DataStore + ?Sized>(
    cache: &mut ScanCache,
    store: &S,
    scan: ScanRef,
    element: &str,
    x_channel: Option<&str>,
    opts: &ReconstructOptions,
) -> Result<Profile> {
    let (scan_id, cached) = cache.get(store, scan, opts.fill_events)?;
    let table = &cached.table;

    let x_channel = x_channel
        .or(cached.header.scanned_axis())
        .map(str::to_string)
        .ok_or_else(|| ReconError::MissingChannel {
            attempted: vec!["<scanned axis: none given, none in header>".to_string()],
        })?;
    let x = table.numeric(&x_channel)?.to_vec();

    let selector = ChannelSelector::resolve(table, element, &opts.roi_detectors);
    let mut y = selector.spectrum(table)?;
    if let Some(monitor) = &opts.normalize_by {
        y = normalize(&y, table.numeric(monitor)?);
    }
    if y.len() != x.len() {
        return Err(ReconError::LengthMismatch {
            what: "scanned axis",
            expected: y.len(),
            actual: x.len(),
        });
    }

    Ok(Profile {
        scan_id,
        element: element.to_string(),
        x_channel,
        start_time: cached.header.time,
        x,
        y,
    })
}

/// Finite-difference slopes `(y[i+1] - y[i]) / (x[i+1] - x[i])`, each
/// placed at the midpoint `(x[i] + x[i+1]) / 2`.
///
/// Repeated positions give infinite or NaN slopes; they are not filtered.
pub fn derivative(x: &[f64], y: &[f64]) -> (Vec<f64>, Vec<f64>) {
    x.windows(2)
        .zip(y.windows(2))
        .map(|(xw, yw)| (0.5 * (xw[0] + xw[1]), (yw[1] - yw[0]) / (xw[1] - xw[0])))
        .unzip()
}

/// Plain successive differences `y[i+1] - y[i]`.
pub fn differences(y: &[f64]) -> Vec<f64> {
    y.windows(2).map(|w| w[1] - w[0]).collect()
}

/// Edge position of a knife-edge style scan: the sample halfway between the
/// largest rise and the largest fall of `y`, located by sample index
/// through [`differences`].
///
/// `None` for fewer than two samples or NaN-only differences.
pub fn edge_center(x: &[f64], y: &[f64]) -> Option<f64> {
    let steps = differences(y);
    let i_max = first_extreme(&steps, |a, b| a > b)?;
    let i_min = first_extreme(&steps, |a, b| a < b)?;
    let index = ((i_max + i_min) as f64 / 2.0).round_ties_even() as usize + 1;
    x.get(index).copied()
}

/// Rounded intensity-weighted index of `values`. `None` when the total is
/// zero or not finite.
pub fn mass_center(values: &[f64]) -> Option<usize> {
    let total: f64 = values.iter().sum();
    if total == 0.0 || !total.is_finite() {
        return None;
    }
    let moment: f64 = values.iter().enumerate().map(|(i, v)| i as f64 * v).sum();
    let center = (moment / total).round_ties_even();
    (center >= 0.0 && (center as usize) < values.len()).then_some(center as usize)
}

/// Index of the first value that no other value beats under `better`.
fn first_extreme(values: &[f64], better: impl Fn(f64, f64) -> bool) -> Option<usize> {
    values
        .iter()
        .enumerate()
        .filter(|(_, v)| !v.is_nan())
        .fold(None, |best: Option<(usize, f64)>, (i, &v)| match best {
            Some((_, b)) if !better(v, b) => best,
            _ => Some((i, v)),
        })
        .map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derivative_is_slope_at_midpoints() {
        let (xs, d) = derivative(&[0.0, 2.0, 4.0], &[0.0, 4.0, 4.0]);
        assert_eq!(xs, vec![1.0, 3.0]);
        assert_eq!(d, vec![2.0, 0.0]);

        let (xs, d) = derivative(&[0.0, 0.5, 2.0], &[1.0, 2.0, -1.0]);
        assert_eq!(xs, vec![0.25, 1.25]);
        assert_eq!(d, vec![2.0, -2.0]);

        let (xs, d) = derivative(&[0.0], &[5.0]);
        assert!(xs.is_empty() && d.is_empty());
    }

    #[test]
    fn differences_ignore_positions() {
        assert_eq!(differences(&[1.0, 4.0, 4.0, 2.0]), vec![3.0, 0.0, -2.0]);
        assert!(differences(&[1.0]).is_empty());
    }

    #[test]
    fn edge_center_of_a_bump() {
        // Rise between 2 and 3, fall between 6 and 7.
        let x: Vec<f64> = (0..10).map(|i| i as f64 * 0.5).collect();
        let y = [0.0, 0.0, 0.0, 5.0, 5.0, 5.0, 5.0, 0.0, 0.0, 0.0];
        // diff max at 2, min at 6 → round(4) + 1 = 5
        assert_eq!(edge_center(&x, &y), Some(2.5));
    }

    #[test]
    fn edge_center_ties_take_the_first() {
        let x = [0.0, 1.0, 2.0, 3.0, 4.0];
        let y = [0.0, 1.0, 2.0, 3.0, 0.0];
        // diff = [1, 1, 1, -3]: max at 0, min at 3 → round(1.5) + 1 = 3
        assert_eq!(edge_center(&x, &y), Some(3.0));
        assert_eq!(edge_center(&[1.0], &[1.0]), None);
    }

    #[test]
    fn mass_center_rounds() {
        assert_eq!(mass_center(&[0.0, 1.0, 0.0]), Some(1));
        assert_eq!(mass_center(&[1.0, 1.0, 1.0, 1.0]), Some(2));
        assert_eq!(mass_center(&[0.0, 1.0, 3.0]), Some(2));
        assert_eq!(mass_center(&[0.0, 0.0]), None);
        assert_eq!(mass_center(&[]), None);
    }
}
