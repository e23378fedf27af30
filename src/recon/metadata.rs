//! Scan geometry as recorded in the header: grid shape, physical range and
//! start offsets.

use serde_json::Value as JsonValue;

use crate::data::model::ScanHeader;
use crate::error::{ReconError, Result};

/// Number of points along each scan axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    /// Fast-axis count (points per row).
    pub nx: usize,
    /// Slow-axis count (rows).
    pub ny: usize,
}

impl Dimensions {
    pub fn total_points(&self) -> usize {
        self.nx * self.ny
    }

    /// Array shape of the reconstructed image, `(rows, columns)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.ny, self.nx)
    }
}

/// Read `(nx, ny)` from `dimensions`, falling back to `shape` when the
/// header has no `dimensions` field.
pub fn resolve_dimensions(header: &ScanHeader) -> Result<Dimensions> {
    let (field, value) = match (&header.dimensions, &header.shape) {
        (Some(dims), _) => ("dimensions", dims),
        (None, Some(shape)) => ("shape", shape),
        (None, None) => {
            return Err(ReconError::NotTwoDimensionalScan {
                reason: "header has neither 'dimensions' nor 'shape'".into(),
            })
        }
    };

    let not_2d = |reason: String| ReconError::NotTwoDimensionalScan { reason };
    let items = value
        .as_array()
        .ok_or_else(|| not_2d(format!("'{field}' is not a list: {value}")))?;
    if items.len() != 2 {
        return Err(not_2d(format!(
            "'{field}' has {} axes, expected 2",
            items.len()
        )));
    }

    let count = |v: &JsonValue| -> Result<usize> {
        axis_count(v).ok_or_else(|| not_2d(format!("'{field}' entry {v} is not a positive count")))
    };
    Ok(Dimensions {
        nx: count(&items[0])?,
        ny: count(&items[1])?,
    })
}

fn axis_count(v: &JsonValue) -> Option<usize> {
    let n = match v.as_u64() {
        Some(n) => n,
        None => {
            let f = v.as_f64()?;
            if f.fract() != 0.0 || f < 0.0 {
                return None;
            }
            f as u64
        }
    };
    (n > 0).then_some(n as usize)
}

/// Physical `(min, max)` extents of the fast and slow axes.
pub fn scan_range(header: &ScanHeader) -> Result<((f64, f64), (f64, f64))> {
    match header.scan_range.as_deref() {
        Some([[x0, x1], [y0, y1], ..]) => Ok(((*x0, *x1), (*y0, *y1))),
        _ => Err(ReconError::MissingScanRange),
    }
}

/// Absolute start offsets `(start_x, start_y)`.
///
/// Read from `scan_starts` when present, otherwise from the literal mapping
/// stored in `subscan_0.macros`.
pub fn scan_starts(header: &ScanHeader) -> Result<(f64, f64)> {
    if let Some(starts) = &header.scan_starts {
        return starts
            .first()
            .ok_or_else(|| ReconError::MalformedMacros("'scan_starts' is an empty list".into()));
    }
    let macros = header
        .subscan_0
        .as_ref()
        .and_then(|s| s.macros.as_deref())
        .ok_or(ReconError::MissingScanStarts)?;
    parse_macro_scan_starts(macros)
}

// ---------------------------------------------------------------------------
// Strict parser for the `scan_starts` entry of the macro mapping
// ---------------------------------------------------------------------------

/// Extract the two start offsets from macro text such as
/// `{'scan_starts': array([ 1.5, -2. ]), 'num': 3}`.
///
/// Only the `scan_starts` entry is looked at. Its value must be a bracketed
/// list of exactly two numbers, optionally wrapped in `array(...)` or
/// `np.array(...)`. Nothing else in the text is interpreted.
pub fn parse_macro_scan_starts(text: &str) -> Result<(f64, f64)> {
    let value_at = find_key(text, "scan_starts")
        .ok_or_else(|| ReconError::MalformedMacros("no 'scan_starts' entry".into()))?;

    let mut cur = Cursor::new(&text[value_at..]);
    let wrapped = cur.eat("np.array(") || cur.eat("numpy.array(") || cur.eat("array(");
    cur.skip_ws();
    cur.expect('[')?;

    let mut values = Vec::with_capacity(2);
    loop {
        cur.skip_ws();
        if cur.eat("]") {
            break;
        }
        values.push(cur.number()?);
        cur.skip_ws();
        if cur.eat(",") {
            continue;
        }
        cur.expect(']')?;
        break;
    }

    if wrapped {
        cur.skip_ws();
        cur.expect(')')?;
    }

    match values.as_slice() {
        [x, y] => Ok((*x, *y)),
        other => Err(ReconError::MalformedMacros(format!(
            "'scan_starts' has {} values, expected 2",
            other.len()
        ))),
    }
}

/// Byte offset just past `'key':` (either quote style), with whitespace skipped.
fn find_key(text: &str, key: &str) -> Option<usize> {
    for quote in ['\'', '"'] {
        let needle = format!("{quote}{key}{quote}");
        let mut from = 0;
        while let Some(pos) = text[from..].find(&needle) {
            let after = from + pos + needle.len();
            let rest = &text[after..];
            let trimmed = rest.trim_start();
            if let Some(value) = trimmed.strip_prefix(':') {
                let value_start = text.len() - value.len();
                return Some(value_start + (value.len() - value.trim_start().len()));
            }
            from = after;
        }
    }
    None
}

struct Cursor<'a> {
    rest: &'a str,
}

impl<'a> Cursor<'a> {
    fn new(text: &'a str) -> Self {
        Cursor { rest: text }
    }

    fn skip_ws(&mut self) {
        self.rest = self.rest.trim_start();
    }

    fn eat(&mut self, token: &str) -> bool {
        match self.rest.strip_prefix(token) {
            Some(rest) => {
                self.rest = rest;
                true
            }
            None => false,
        }
    }

    fn expect(&mut self, c: char) -> Result<()> {
        match self.rest.strip_prefix(c) {
            Some(rest) => {
                self.rest = rest;
                Ok(())
            }
            None => Err(ReconError::MalformedMacros(format!(
                "expected '{c}' in 'scan_starts' near {:?}",
                self.rest.chars().take(16).collect::<String>()
            ))),
        }
    }

    fn number(&mut self) -> Result<f64> {
        let end = self
            .rest
            .find(|c: char| !(c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E')))
            .unwrap_or(self.rest.len());
        let token = &self.rest[..end];
        let value = token
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| {
                ReconError::MalformedMacros(format!("'{token}' is not a number in 'scan_starts'"))
            })?;
        self.rest = &self.rest[end..];
        Ok(value)
    }
}
