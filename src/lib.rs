//! Reconstruction of 2D images from fly-scan acquisitions.
//!
//! A fly scan records detector and positioner values continuously while the
//! stage moves along a fast axis and steps along a slow one. The samples land
//! close to, but not exactly on, the grid the scan was programmed for. This
//! crate turns the recorded event table back into a regular `(ny, nx)` image.
//!
//! ```no_run
//! use flyscan_recon::{reconstruct, FileStore, ReconstructOptions, ScanCache, ScanRef};
//!
//! let store = FileStore::new("scans");
//! let mut cache = ScanCache::new();
//! let out = reconstruct(&mut cache, &store, ScanRef(-1), "Pt", &ReconstructOptions::default())?;
//! println!("{}", out.title());
//! # Ok::<(), flyscan_recon::ReconError>(())
//! ```

pub mod analysis;
pub mod cache;
pub mod config;
pub mod data;
pub mod display;
pub mod error;
pub mod recon;

pub use cache::ScanCache;
pub use config::{load_options, ReconstructOptions};
pub use data::loader::{DataStore, FileStore};
pub use data::model::{ScanHeader, ScanRef, ScanTable};
pub use error::{ReconError, Result};
pub use recon::align::align;
pub use recon::grid::build_grid;
pub use recon::interp::{interp1d_scan, interp2d_scan, Kernel};
pub use recon::metadata::resolve_dimensions;
pub use recon::normalize::normalize;
pub use recon::pipeline::{reconstruct, ImageData, ReconstructedImage};
pub use recon::reshape::reshape;
