/// Reconstruction core: fly-scan samples → regular 2D image.
///
/// Architecture:
/// ```text
///   ScanHeader ──► metadata ──► grid          (dimensions, range, starts → ideal grid)
///        │
///   spectrum ──► normalize ──► align ──► interp (2D) ──► reshape ──► interp (1D)
/// ```
///
/// `pipeline::reconstruct` strings the stages together; each stage is also
/// usable on its own.

pub mod align;
pub mod grid;
pub mod interp;
pub mod metadata;
pub mod normalize;
pub mod pipeline;
pub mod reshape;
