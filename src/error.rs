use thiserror::Error;

/// Failures surfaced by the reconstruction core.
///
/// Metadata and channel errors are fatal: they mean the caller asked for
/// something the scan does not contain. A reshape that cannot be satisfied is
/// not reported through this type at all; see [`crate::recon::reshape`].
#[derive(Debug, Error)]
pub enum ReconError {
    #[error("Not a 2D flyscan: {reason}")]
    NotTwoDimensionalScan { reason: String },

    #[error("Channel(s) not found in scan table: {}", attempted.join(", "))]
    MissingChannel { attempted: Vec<String> },

    #[error("Channel '{name}' does not hold numeric data")]
    NonNumericChannel { name: String },

    #[error("Unable to reshape {actual} points to {expected:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        actual: usize,
    },

    #[error("Unsupported interpolation kernel: '{0}' (expected linear, cubic or quintic)")]
    UnsupportedInterpolationKernel(String),

    #[error("Spectrum has {len} points but the scan only has {total_points}")]
    OversizedSpectrum { len: usize, total_points: usize },

    #[error("Scan header has no usable 'scan_range'")]
    MissingScanRange,

    #[error("Scan header has neither 'scan_starts' nor 'subscan_0.macros'")]
    MissingScanStarts,

    #[error("Malformed scan macros: {0}")]
    MalformedMacros(String),

    #[error("{what}: expected {expected} values, got {actual}")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Need at least {needed} finite points for {kernel} interpolation, got {got}")]
    InsufficientPoints {
        kernel: &'static str,
        needed: usize,
        got: usize,
    },

    #[error("Interpolation system is singular (duplicate or collinear sample positions?)")]
    SingularSystem,

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

pub type Result<T, E = ReconError> = std::result::Result<T, E>;
