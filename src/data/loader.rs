use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use arrow::array::{
    Array, AsArray, BooleanArray, Float32Array, Float64Array, Int32Array, Int64Array,
    StringArray, UInt32Array, UInt64Array,
};
use arrow::datatypes::DataType;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::{Column, ScanHeader, ScanId, ScanRef, ScanTable};

// ---------------------------------------------------------------------------
// DataStore – where headers and event tables come from
// ---------------------------------------------------------------------------

/// Source of scan headers and event tables.
pub trait DataStore {
    /// Resolve a (possibly relative) scan reference to its header. The
    /// returned header must carry its canonical `scan_id`; the cache rejects
    /// headers without one.
    fn resolve(&self, scan: ScanRef) -> Result<ScanHeader>;

    /// Fetch the event table of a resolved scan. With `fill_events`,
    /// reference columns are materialised where possible.
    fn fetch_table(&self, header: &ScanHeader, fill_events: bool) -> Result<ScanTable>;
}

/// Table file extensions, in lookup order.
const TABLE_EXTENSIONS: [&str; 4] = ["parquet", "pq", "csv", "json"];
const HEADER_SUFFIX: &str = ".header.json";

/// A directory of `scan_<id>.header.json` + `scan_<id>.<ext>` pairs.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        FileStore { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn header_path(&self, id: ScanId) -> PathBuf {
        self.root.join(format!("scan_{id}{HEADER_SUFFIX}"))
    }

    /// First existing table file for `id`.
    pub fn table_path(&self, id: ScanId) -> Option<PathBuf> {
        TABLE_EXTENSIONS
            .iter()
            .map(|ext| self.root.join(format!("scan_{id}.{ext}")))
            .find(|p| p.is_file())
    }

    /// All scan ids that have a header, ascending.
    pub fn scan_ids(&self) -> Result<Vec<ScanId>> {
        let mut ids = Vec::new();
        let entries = std::fs::read_dir(&self.root)
            .with_context(|| format!("listing scan store {}", self.root.display()))?;
        for entry in entries {
            let entry = entry.context("reading scan store entry")?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            let id = name
                .strip_prefix("scan_")
                .and_then(|rest| rest.strip_suffix(HEADER_SUFFIX))
                .and_then(|id| id.parse::<ScanId>().ok());
            if let Some(id) = id {
                ids.push(id);
            }
        }
        ids.sort_unstable();
        Ok(ids)
    }

    fn lookup_id(&self, scan: ScanRef) -> Result<ScanId> {
        if !scan.is_relative() {
            return Ok(scan.0);
        }
        if scan.0 == 0 {
            bail!("Scan reference 0 is not valid (use -1 for the most recent scan)");
        }
        let ids = self.scan_ids()?;
        let back = scan.0.unsigned_abs() as usize;
        ids.len()
            .checked_sub(back)
            .map(|i| ids[i])
            .with_context(|| {
                format!("Scan {scan} not found: store only holds {} scans", ids.len())
            })
    }
}

impl DataStore for FileStore {
    fn resolve(&self, scan: ScanRef) -> Result<ScanHeader> {
        let id = self.lookup_id(scan)?;
        let path = self.header_path(id);
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("Scan {id} not found ({})", path.display()))?;
        let value: JsonValue = serde_json::from_str(&text).context("parsing scan header JSON")?;
        let mut header = ScanHeader::from_json(value)
            .with_context(|| format!("decoding header of scan {id}"))?;
        if let Some(declared) = header.scan_id.filter(|&declared| declared != id) {
            log::warn!("Header of scan {id} declares scan_id {declared}; using {id}");
        }
        header.scan_id = Some(id);
        Ok(header)
    }

    fn fetch_table(&self, header: &ScanHeader, fill_events: bool) -> Result<ScanTable> {
        let id = header
            .scan_id
            .context("Header has no scan_id; resolve it through the store first")?;
        let path = self
            .table_path(id)
            .with_context(|| format!("No event table for scan {id} in {}", self.root.display()))?;
        let mut table = load_table(&path)?;
        if fill_events {
            let n = table.materialize_references();
            log::debug!("Scan {id}: filled {n} reference column(s)");
        }
        Ok(table)
    }
}

// ---------------------------------------------------------------------------
// Table loading: dispatch by extension
// ---------------------------------------------------------------------------

/// Load an event table from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.parquet` – one scalar column per channel (recommended)
/// * `.json`    – `[{ "zpssx": 0.1, "Det1_Pt": 12, ... }, ...]`
/// * `.csv`     – header row of channel names, one row per event
pub fn load_table(path: &Path) -> Result<ScanTable> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "parquet" | "pq" => load_parquet(path),
        "json" => load_json(path),
        "csv" => load_csv(path),
        other => bail!("Unsupported file extension: .{other}"),
    }
}

/// One cell before its column's type is settled.
#[derive(Debug, Clone, PartialEq)]
enum Cell {
    Number(f64),
    Text(String),
    Null,
}

/// Collects cells column by column and settles each column's type at the end:
/// numeric when no cell is text, otherwise a reference column.
#[derive(Default)]
struct ColumnAccumulator {
    cells: BTreeMap<String, Vec<Cell>>,
}

impl ColumnAccumulator {
    fn push(&mut self, name: &str, cell: Cell) {
        self.cells.entry(name.to_string()).or_default().push(cell);
    }

    fn extend(&mut self, name: &str, cells: impl IntoIterator<Item = Cell>) {
        self.cells.entry(name.to_string()).or_default().extend(cells);
    }

    fn finish(self) -> Result<ScanTable> {
        let columns = self
            .cells
            .into_iter()
            .map(|(name, cells)| {
                let numeric = cells.iter().all(|c| !matches!(c, Cell::Text(_)));
                let col = if numeric {
                    Column::Numeric(
                        cells
                            .iter()
                            .map(|c| match c {
                                Cell::Number(v) => *v,
                                _ => f64::NAN,
                            })
                            .collect(),
                    )
                } else {
                    Column::Reference(
                        cells
                            .into_iter()
                            .map(|c| match c {
                                Cell::Number(v) => v.to_string(),
                                Cell::Text(s) => s,
                                Cell::Null => String::new(),
                            })
                            .collect(),
                    )
                };
                (name, col)
            })
            .collect();
        ScanTable::from_columns(columns)
    }
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented, `df.to_json(orient='records')`).
/// A key missing from a record reads as null.
fn load_json(path: &Path) -> Result<ScanTable> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let root: JsonValue = serde_json::from_str(&text).context("parsing JSON")?;

    let records = root.as_array().context("Expected top-level JSON array")?;

    let mut names: Vec<String> = Vec::new();
    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .with_context(|| format!("Row {i} is not a JSON object"))?;
        for key in obj.keys() {
            if !names.contains(key) {
                names.push(key.clone());
            }
        }
    }

    let mut acc = ColumnAccumulator::default();
    for rec in records {
        for name in &names {
            let cell = rec.get(name).map(json_to_cell).unwrap_or(Cell::Null);
            acc.push(name, cell);
        }
    }
    acc.finish()
}

fn json_to_cell(val: &JsonValue) -> Cell {
    match val {
        JsonValue::Number(n) => n.as_f64().map(Cell::Number).unwrap_or(Cell::Null),
        JsonValue::Bool(b) => Cell::Number(if *b { 1.0 } else { 0.0 }),
        JsonValue::String(s) => Cell::Text(s.clone()),
        JsonValue::Null => Cell::Null,
        other => Cell::Text(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout: header row with channel names, one row per event.
fn load_csv(path: &Path) -> Result<ScanTable> {
    let mut reader = csv::Reader::from_path(path).context("opening CSV")?;
    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let mut acc = ColumnAccumulator::default();
    for name in &headers {
        acc.extend(name, std::iter::empty());
    }

    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        if record.len() != headers.len() {
            bail!(
                "CSV row {row_no}: {} fields but {} headers",
                record.len(),
                headers.len()
            );
        }
        for (name, value) in headers.iter().zip(record.iter()) {
            acc.push(name, guess_cell(value));
        }
    }
    acc.finish()
}

fn guess_cell(s: &str) -> Cell {
    let s = s.trim();
    if s.is_empty() {
        return Cell::Null;
    }
    if let Ok(f) = s.parse::<f64>() {
        return Cell::Number(f);
    }
    match s {
        "true" | "True" => Cell::Number(1.0),
        "false" | "False" => Cell::Number(0.0),
        _ => Cell::Text(s.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet event table. Every top-level column is one channel;
/// batches are concatenated in file order. Nulls in numeric columns read
/// as NaN.
fn load_parquet(path: &Path) -> Result<ScanTable> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;
    let reader = builder.build().context("building parquet reader")?;

    let mut acc = ColumnAccumulator::default();
    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        let schema = batch.schema();
        for (idx, field) in schema.fields().iter().enumerate() {
            let cells = extract_cells(batch.column(idx))
                .with_context(|| format!("reading column '{}'", field.name()))?;
            acc.extend(field.name(), cells);
        }
    }
    acc.finish()
}

// -- Parquet / Arrow helpers --

fn downcast<'a, T: 'static>(col: &'a Arc<dyn Array>) -> Result<&'a T> {
    col.as_any()
        .downcast_ref::<T>()
        .with_context(|| format!("unexpected array layout for {:?}", col.data_type()))
}

fn numeric_cells<I>(col: &Arc<dyn Array>, values: I) -> Vec<Cell>
where
    I: Iterator<Item = f64>,
{
    values
        .enumerate()
        .map(|(row, v)| {
            if col.is_null(row) {
                Cell::Null
            } else {
                Cell::Number(v)
            }
        })
        .collect()
}

/// Convert an Arrow column into cells. Unknown types become text so the
/// channel stays visible as a reference column.
fn extract_cells(col: &Arc<dyn Array>) -> Result<Vec<Cell>> {
    let cells = match col.data_type() {
        DataType::Float64 => {
            let arr = downcast::<Float64Array>(col)?;
            numeric_cells(col, arr.values().iter().copied())
        }
        DataType::Float32 => {
            let arr = downcast::<Float32Array>(col)?;
            numeric_cells(col, arr.values().iter().map(|&v| v as f64))
        }
        DataType::Int32 => {
            let arr = downcast::<Int32Array>(col)?;
            numeric_cells(col, arr.values().iter().map(|&v| v as f64))
        }
        DataType::Int64 => {
            let arr = downcast::<Int64Array>(col)?;
            numeric_cells(col, arr.values().iter().map(|&v| v as f64))
        }
        DataType::UInt32 => {
            let arr = downcast::<UInt32Array>(col)?;
            numeric_cells(col, arr.values().iter().map(|&v| v as f64))
        }
        DataType::UInt64 => {
            let arr = downcast::<UInt64Array>(col)?;
            numeric_cells(col, arr.values().iter().map(|&v| v as f64))
        }
        DataType::Boolean => {
            let arr = downcast::<BooleanArray>(col)?;
            numeric_cells(col, (0..arr.len()).map(|i| if arr.value(i) { 1.0 } else { 0.0 }))
        }
        DataType::Utf8 => {
            let arr = downcast::<StringArray>(col)?;
            arr.iter()
                .map(|v| v.map(|s| Cell::Text(s.to_string())).unwrap_or(Cell::Null))
                .collect()
        }
        DataType::LargeUtf8 => col
            .as_string::<i64>()
            .iter()
            .map(|v| v.map(|s| Cell::Text(s.to_string())).unwrap_or(Cell::Null))
            .collect(),
        other => {
            log::debug!("Keeping {other:?} column as text");
            (0..col.len())
                .map(|_| Cell::Text(format!("{other:?}")))
                .collect()
        }
    };
    Ok(cells)
}
