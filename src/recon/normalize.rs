/// Added to the monitor before dividing so a dead monitor never divides by zero.
pub const MONITOR_EPSILON: f64 = 1e-8;

/// Elementwise `signal / (monitor + 1e-8)`.
///
/// Large ratios from a near-zero monitor are passed through unclamped.
/// Both channels come from the same event table and have equal length.
pub fn normalize(signal: &[f64], monitor: &[f64]) -> Vec<f64> {
    debug_assert_eq!(signal.len(), monitor.len());
    signal
        .iter()
        .zip(monitor)
        .map(|(s, m)| s / (m + MONITOR_EPSILON))
        .collect()
}
