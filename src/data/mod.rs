/// Data layer: scan headers, event tables, and channel selection.
///
/// Architecture:
/// ```text
///  scan_<id>.header.json + scan_<id>.parquet / .csv / .json
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  DataStore: resolve → ScanHeader, fetch_table → ScanTable
///   └──────────┘
///        │
///        ▼
///   ┌──────────────┐
///   │  ScanTable    │  named columns, one row per acquisition event
///   └──────────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  channel  │  direct channel or summed ROI channels → spectrum
///   └──────────┘
/// ```

pub mod channel;
pub mod loader;
pub mod model;
