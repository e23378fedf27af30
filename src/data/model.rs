use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;
use serde_json::Value as JsonValue;

use crate::error::{ReconError, Result};

/// Canonical (resolved) scan number.
pub type ScanId = i64;

// ---------------------------------------------------------------------------
// ScanRef – what the caller asks for
// ---------------------------------------------------------------------------

/// A caller-supplied scan identifier.
///
/// Positive values name a scan directly. Zero and negative values are
/// relative to the newest scan in the store: `-1` is the most recent one,
/// `-2` the one before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ScanRef(pub i64);

impl ScanRef {
    pub fn is_relative(self) -> bool {
        self.0 <= 0
    }
}

impl From<i64> for ScanRef {
    fn from(id: i64) -> Self {
        ScanRef(id)
    }
}

impl fmt::Display for ScanRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Trajectory
// ---------------------------------------------------------------------------

/// How the stage sweeps the fast axis from one row to the next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Trajectory {
    /// Every row is acquired in the same direction.
    #[default]
    Raster,
    /// Serpentine: odd rows are acquired right-to-left.
    Pyramid,
}

impl Trajectory {
    pub fn from_fly_type(fly_type: Option<&str>) -> Self {
        match fly_type {
            Some("pyramid") => Trajectory::Pyramid,
            _ => Trajectory::Raster,
        }
    }
}

// ---------------------------------------------------------------------------
// ScanHeader – the scan's start document
// ---------------------------------------------------------------------------

/// Start offsets as they appear in headers: either a bare `[x, y]` pair or
/// one pair per sub-scan.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ScanStarts {
    Pair([f64; 2]),
    PerSubscan(Vec<[f64; 2]>),
}

impl ScanStarts {
    /// The offsets of the first (or only) sub-scan.
    pub fn first(&self) -> Option<(f64, f64)> {
        match self {
            ScanStarts::Pair([x, y]) => Some((*x, *y)),
            ScanStarts::PerSubscan(pairs) => pairs.first().map(|[x, y]| (*x, *y)),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Subscan {
    /// Literal mapping text written by the acquisition macros.
    #[serde(default)]
    pub macros: Option<String>,
}

/// Immutable metadata of one scan.
///
/// `dimensions` and `shape` are kept as raw JSON so that a malformed header
/// is reported as "not a 2D scan" by the resolver instead of failing to load.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ScanHeader {
    #[serde(default)]
    pub scan_id: Option<ScanId>,
    /// Start time, seconds since the epoch.
    #[serde(default)]
    pub time: Option<f64>,
    #[serde(default)]
    pub dimensions: Option<JsonValue>,
    #[serde(default)]
    pub shape: Option<JsonValue>,
    #[serde(default)]
    pub scan_range: Option<Vec<[f64; 2]>>,
    #[serde(default)]
    pub scan_starts: Option<ScanStarts>,
    #[serde(default)]
    pub subscan_0: Option<Subscan>,
    #[serde(default)]
    pub fly_type: Option<String>,
    #[serde(default)]
    pub motor: Option<String>,
    #[serde(default)]
    pub motor1: Option<String>,
    #[serde(default)]
    pub motor2: Option<String>,
    #[serde(default)]
    pub motors: Vec<String>,
}

impl ScanHeader {
    pub fn from_json(value: JsonValue) -> serde_json::Result<Self> {
        serde_json::from_value(value)
    }

    pub fn trajectory(&self) -> Trajectory {
        Trajectory::from_fly_type(self.fly_type.as_deref())
    }

    /// Positioner recorded on the fast axis of a 2D scan.
    pub fn fast_axis(&self) -> Option<&str> {
        self.motor1
            .as_deref()
            .or_else(|| self.motors.first().map(String::as_str))
    }

    /// Positioner recorded on the slow axis of a 2D scan.
    pub fn slow_axis(&self) -> Option<&str> {
        self.motor2
            .as_deref()
            .or_else(|| self.motors.get(1).map(String::as_str))
    }

    /// Positioner of a 1D scan.
    pub fn scanned_axis(&self) -> Option<&str> {
        self.motor
            .as_deref()
            .or_else(|| self.motors.first().map(String::as_str))
    }
}

// ---------------------------------------------------------------------------
// ScanTable – the as-acquired sample stream
// ---------------------------------------------------------------------------

/// One column of the event table.
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    Numeric(Vec<f64>),
    /// Non-numeric payload, typically a reference to externally stored data.
    Reference(Vec<String>),
}

impl Column {
    pub fn len(&self) -> usize {
        match self {
            Column::Numeric(v) => v.len(),
            Column::Reference(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Event table of one scan, one row per acquisition event.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanTable {
    columns: BTreeMap<String, Column>,
    rows: usize,
}

impl ScanTable {
    /// Build a table from named columns, all of which must have the same length.
    pub fn from_columns(columns: BTreeMap<String, Column>) -> anyhow::Result<Self> {
        let rows = columns.values().next().map(Column::len).unwrap_or(0);
        if let Some((name, col)) = columns.iter().find(|(_, c)| c.len() != rows) {
            anyhow::bail!(
                "Column '{name}' has {} rows, expected {rows}",
                col.len()
            );
        }
        Ok(ScanTable { columns, rows })
    }

    /// Number of acquired events.
    pub fn len(&self) -> usize {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    pub fn contains(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.get(name)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    /// Numeric values of a channel. Absent and non-numeric channels are
    /// distinct errors; a present-but-empty channel is an empty slice.
    pub fn numeric(&self, name: &str) -> Result<&[f64]> {
        match self.columns.get(name) {
            Some(Column::Numeric(values)) => Ok(values),
            Some(Column::Reference(_)) => Err(ReconError::NonNumericChannel {
                name: name.to_string(),
            }),
            None => Err(ReconError::MissingChannel {
                attempted: vec![name.to_string()],
            }),
        }
    }

    /// Convert reference columns whose every value parses as a number.
    pub fn materialize_references(&mut self) -> usize {
        let mut converted = 0;
        for col in self.columns.values_mut() {
            let Column::Reference(texts) = col else {
                continue;
            };
            let parsed: Option<Vec<f64>> =
                texts.iter().map(|t| t.trim().parse::<f64>().ok()).collect();
            if let Some(values) = parsed {
                *col = Column::Numeric(values);
                converted += 1;
            }
        }
        converted
    }
}
