//! Write a small synthetic fly-scan store for trying out `flyscan-recon`.
//!
//! ```text
//! cargo run --bin generate_sample -- scans/
//! flyscan-recon image scans/ -1 Pt
//! ```
//!
//! * scan 101: pyramid 2D scan of a Pt disc, complete.
//! * scan 102: raster 2D scan, aborted early; starts only in the macros text.
//! * scan 103: 1D knife-edge scan across a Pt edge.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use arrow::util::pretty::pretty_format_batches;
use clap::Parser;
use parquet::arrow::ArrowWriter;
use serde_json::json;

/// Deterministic splitmix64 generator, enough for jitter and counting noise.
struct Rng(u64);

impl Rng {
    fn next_u64(&mut self) -> u64 {
        self.0 = self.0.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.0;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }

    /// Uniform in [-1, 1).
    fn symmetric(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 52) as f64 - 1.0
    }
}

/// Acquired samples of one scan, column by column.
#[derive(Default)]
struct Events {
    x: Vec<f64>,
    y: Vec<f64>,
    pt: [Vec<f64>; 3],
    fe: [Vec<f64>; 3],
    monitor: Vec<f64>,
}

impl Events {
    fn push(&mut self, x: f64, y: f64, pt: f64, fe: f64, monitor: f64, rng: &mut Rng) {
        self.x.push(x);
        self.y.push(y);
        // Each detector sees roughly a third of the fluorescence.
        for det in 0..3 {
            let share = 1.0 / 3.0 + 0.02 * rng.symmetric();
            self.pt[det].push((pt * share * monitor).max(0.0));
            self.fe[det].push((fe * share * monitor).max(0.0));
        }
        self.monitor.push(monitor);
    }

    fn len(&self) -> usize {
        self.x.len()
    }

    fn to_batch(&self, x_name: &str, y_name: Option<&str>) -> RecordBatch {
        let mut fields = vec![Field::new("seq_num", DataType::Int64, false)];
        let mut columns: Vec<ArrayRef> = vec![Arc::new(Int64Array::from_iter_values(
            1..=self.len() as i64,
        ))];

        let mut float = |name: String, values: &[f64]| {
            fields.push(Field::new(name, DataType::Float64, false));
            columns.push(Arc::new(Float64Array::from(values.to_vec())));
        };
        float(x_name.to_string(), &self.x);
        if let Some(y_name) = y_name {
            float(y_name.to_string(), &self.y);
        }
        for (det, (pt, fe)) in self.pt.iter().zip(&self.fe).enumerate() {
            float(format!("Det{}_Pt", det + 1), pt);
            float(format!("Det{}_Fe", det + 1), fe);
        }
        float("sclr1_ch4".to_string(), &self.monitor);

        // Area-detector frames are stored elsewhere; the table only references them.
        fields.push(Field::new("merlin1", DataType::Utf8, false));
        columns.push(Arc::new(StringArray::from_iter_values(
            (0..self.len()).map(|i| format!("frame-{i:06}")),
        )));

        RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)
            .expect("columns match the schema")
    }
}

fn pt_disc(x: f64, y: f64) -> f64 {
    let r = (x - 1.0).hypot(y + 0.5);
    100.0 / (1.0 + ((r - 2.0) / 0.3).exp())
}

fn fe_background(x: f64, y: f64) -> f64 {
    5.0 + 0.5 * x - 0.25 * y
}

fn monitor(rng: &mut Rng) -> f64 {
    1.0e4 * (1.0 + 0.05 * rng.symmetric())
}

/// Fly a 2D scan over `range` starting at `starts`, `nx` by `ny` points,
/// stopping after `acquired` events.
fn fly_2d(
    range: [[f64; 2]; 2],
    starts: [f64; 2],
    (nx, ny): (usize, usize),
    pyramid: bool,
    acquired: usize,
    rng: &mut Rng,
) -> Events {
    let dx = (range[0][1] - range[0][0]) / nx as f64;
    let dy = (range[1][1] - range[1][0]) / ny as f64;
    let mut events = Events::default();
    'rows: for row in 0..ny {
        for i in 0..nx {
            if events.len() == acquired {
                break 'rows;
            }
            let col = if pyramid && row % 2 == 1 { nx - 1 - i } else { i };
            let x = starts[0] + col as f64 * dx + 0.15 * dx * rng.symmetric();
            let y = starts[1] + row as f64 * dy + 0.05 * dy * rng.symmetric();
            let m = monitor(rng);
            events.push(x, y, pt_disc(x, y), fe_background(x, y), m, rng);
        }
    }
    events
}

fn knife_edge(start: f64, stop: f64, n: usize, rng: &mut Rng) -> Events {
    let step = (stop - start) / (n - 1) as f64;
    let mut events = Events::default();
    for i in 0..n {
        let x = start + i as f64 * step;
        let edge = 50.0 / (1.0 + (-(x - 0.35) / 0.08).exp());
        let m = monitor(rng);
        events.push(x, 0.0, edge + 0.5 * rng.symmetric(), 1.0, m, rng);
    }
    events
}

fn write_scan(dir: &Path, id: i64, header: serde_json::Value, batch: &RecordBatch) {
    let header_path = dir.join(format!("scan_{id}.header.json"));
    let text = serde_json::to_string_pretty(&header).expect("header serializes");
    std::fs::write(&header_path, text).expect("Failed to write header");

    let table_path = dir.join(format!("scan_{id}.parquet"));
    let file = std::fs::File::create(&table_path).expect("Failed to create table file");
    let mut writer = ArrowWriter::try_new(file, batch.schema(), None).expect("Failed to create writer");
    writer.write(batch).expect("Failed to write batch");
    writer.close().expect("Failed to close writer");

    println!("Wrote scan {id}: {} events → {}", batch.num_rows(), table_path.display());
    let preview = batch.slice(0, batch.num_rows().min(3));
    match pretty_format_batches(&[preview]) {
        Ok(table) => println!("{table}"),
        Err(err) => eprintln!("(no preview: {err})"),
    }
}

#[derive(Parser)]
#[command(about = "Write a synthetic fly-scan store", long_about = None)]
struct Args {
    /// Output directory (created if missing)
    #[arg(default_value = "scans")]
    dir: PathBuf,
}

fn main() {
    let dir = Args::parse().dir;
    std::fs::create_dir_all(&dir).expect("Failed to create output directory");

    let mut rng = Rng(0x5EED);
    let time = 1_700_000_000.0;

    let range = [[-2.0, 4.0], [-3.0, 2.0]];
    let starts = [-2.0, -3.0];

    let (nx, ny) = (30, 25);
    let scan = fly_2d(range, starts, (nx, ny), true, nx * ny, &mut rng);
    let header = json!({
        "scan_id": 101,
        "time": time,
        "dimensions": [nx, ny],
        "scan_range": range,
        "scan_starts": starts,
        "fly_type": "pyramid",
        "motor1": "zpssx",
        "motor2": "zpssy",
        "motors": ["zpssx", "zpssy"],
    });
    write_scan(&dir, 101, header, &scan.to_batch("zpssx", Some("zpssy")));

    let (nx, ny) = (20, 16);
    let scan = fly_2d(range, starts, (nx, ny), false, nx * ny - 27, &mut rng);
    let header = json!({
        "scan_id": 102,
        "time": time + 600.0,
        "shape": [nx, ny],
        "scan_range": range,
        "subscan_0": {
            "macros": format!(
                "{{'scan_starts': array([{:.1}, {:.1}]), 'exposure_time': 0.05}}",
                starts[0], starts[1]
            ),
        },
        "motors": ["zpssx", "zpssy"],
    });
    write_scan(&dir, 102, header, &scan.to_batch("zpssx", Some("zpssy")));

    let scan = knife_edge(0.0, 0.7, 71, &mut rng);
    let header = json!({
        "scan_id": 103,
        "time": time + 900.0,
        "motor": "zpssx",
    });
    write_scan(&dir, 103, header, &scan.to_batch("zpssx", None));
}
