use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Display hints handed to the presentation layer
// ---------------------------------------------------------------------------

/// Extents below this are treated as a scan that did not move.
const MIN_EXTENT: f64 = 0.001;

/// Intensity range mapped onto the colour scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColorLimits {
    pub min: f64,
    pub max: f64,
}

impl ColorLimits {
    /// Min/max over the finite values, or `None` when there are none.
    pub fn from_data(values: &[f64]) -> Option<Self> {
        let (min, max) = values
            .iter()
            .filter(|v| !v.is_nan())
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });
        (min <= max).then_some(ColorLimits { min, max })
    }
}

impl From<(f64, f64)> for ColorLimits {
    fn from((min, max): (f64, f64)) -> Self {
        ColorLimits { min, max }
    }
}

/// Physical bounds of the image as `(left, right, bottom, top)`: the slow
/// axis grows downwards, so `bottom` is the largest position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Extent {
    pub left: f64,
    pub right: f64,
    pub bottom: f64,
    pub top: f64,
}

impl Extent {
    /// Bounds of the measured positions, ignoring NaN. `None` when either
    /// axis spans less than 0.001 (or has no finite samples).
    pub fn from_positions(x: &[f64], y: &[f64]) -> Option<Self> {
        let xl = ColorLimits::from_data(x)?;
        let yl = ColorLimits::from_data(y)?;
        let extent = Extent {
            left: xl.min,
            right: xl.max,
            bottom: yl.max,
            top: yl.min,
        };
        let degenerate = (extent.left - extent.right).abs() <= MIN_EXTENT
            || (extent.bottom - extent.top).abs() <= MIN_EXTENT;
        (!degenerate).then_some(extent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limits_skip_nan() {
        let lim = ColorLimits::from_data(&[3.0, f64::NAN, -1.0, 7.5]).unwrap();
        assert_eq!((lim.min, lim.max), (-1.0, 7.5));
        assert_eq!(ColorLimits::from_data(&[f64::NAN]), None);
        assert_eq!(ColorLimits::from_data(&[]), None);
    }

    #[test]
    fn extent_orders_slow_axis_top_down() {
        let e = Extent::from_positions(&[0.0, 2.0, 1.0], &[5.0, 4.0, 6.0]).unwrap();
        assert_eq!((e.left, e.right, e.bottom, e.top), (0.0, 2.0, 6.0, 4.0));
    }

    #[test]
    fn degenerate_extent_is_dropped() {
        assert!(Extent::from_positions(&[1.0, 1.0005], &[0.0, 3.0]).is_none());
        assert!(Extent::from_positions(&[0.0, 3.0], &[2.0, 2.0]).is_none());
    }
}
