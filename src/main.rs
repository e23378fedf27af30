use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use flyscan_recon::analysis::{self, Profile};
use flyscan_recon::{
    load_options, reconstruct, FileStore, ImageData, ReconstructOptions, ReconstructedImage,
    ScanCache, ScanRef,
};

#[derive(Parser)]
#[command(author, version, about = "Reconstruct 2D images from fly-scan event tables", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconstruct a 2D scan and print it as tab-separated rows
    Image {
        /// Directory holding scan_<id>.header.json and the event tables
        store: PathBuf,

        /// Scan id, or 0/-1/-2... for the most recent scans
        #[arg(allow_hyphen_values = true)]
        scan: i64,

        /// Element or channel name (e.g. Pt, Det1_Pt)
        element: String,

        /// JSON file with reconstruction options
        options: Option<PathBuf>,
    },

    /// Edge and mass centres of a 1D scan
    Profile {
        /// Directory holding scan_<id>.header.json and the event tables
        store: PathBuf,

        /// Scan id, or 0/-1/-2... for the most recent scans
        #[arg(allow_hyphen_values = true)]
        scan: i64,

        /// Element or channel name
        element: String,

        /// Scanned positioner (default: the header's motor)
        x_channel: Option<String>,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Image {
            store,
            scan,
            element,
            options,
        } => {
            let opts = match options {
                Some(path) => load_options(&path)?,
                None => ReconstructOptions::default(),
            };
            let store = FileStore::new(store);
            let mut cache = ScanCache::new();
            let out = reconstruct(&mut cache, &store, ScanRef(scan), &element, &opts)?;
            print_summary(&out);
            write_rows(&out.data)
        }
        Commands::Profile {
            store,
            scan,
            element,
            x_channel,
        } => {
            let store = FileStore::new(store);
            let mut cache = ScanCache::new();
            let profile = analysis::profile(
                &mut cache,
                &store,
                ScanRef(scan),
                &element,
                x_channel.as_deref(),
                &ReconstructOptions::default(),
            )?;
            write_profile(&profile)
        }
    }
}

fn print_summary(out: &ReconstructedImage) {
    println!("# {}", out.title());
    println!("# channels: {}", out.selector.channel_names().join(" + "));
    println!("# axes: x = {}, y = {}", out.x_channel, out.y_channel);
    if let Some(lim) = out.color_limits {
        println!("# color limits: {} .. {}", lim.min, lim.max);
    }
    match out.extent {
        Some(e) => println!(
            "# extent: left {} right {} bottom {} top {}",
            e.left, e.right, e.bottom, e.top
        ),
        None => println!("# extent: none (degenerate scan range)"),
    }
    match &out.data {
        ImageData::Shaped(image) => println!("# shape: {} x {}", image.nrows(), image.ncols()),
        ImageData::Unshaped(flat) => println!("# unshaped: {} values", flat.len()),
    }
}

fn write_rows(data: &ImageData) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .from_writer(io::stdout().lock());
    match data {
        ImageData::Shaped(image) => {
            for row in image.rows() {
                writer.write_record(row.iter().map(|v| v.to_string()))?;
            }
        }
        ImageData::Unshaped(flat) => {
            writer.write_record(flat.iter().map(|v| v.to_string()))?;
        }
    }
    writer.flush().context("writing image rows")?;
    Ok(())
}

fn write_profile(profile: &Profile) -> Result<()> {
    println!("# {}", profile.title());
    match profile.edge_center() {
        Some(c) => println!("# edge center: {c}"),
        None => println!("# edge center: n/a"),
    }
    match profile.mass_center() {
        Some(c) => println!("# mass center: {c}"),
        None => println!("# mass center: n/a"),
    }

    // Samples first, then the derivative at the midpoints between them.
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .flexible(true)
        .from_writer(io::stdout().lock());
    writer.write_record([profile.x_channel.as_str(), profile.element.as_str()])?;
    for (x, y) in profile.x.iter().zip(&profile.y) {
        writer.write_record([x.to_string(), y.to_string()])?;
    }
    let (midpoints, slopes) = profile.derivative();
    writer.write_record([profile.x_channel.as_str(), "derivative"])?;
    for (x, slope) in midpoints.iter().zip(&slopes) {
        writer.write_record([x.to_string(), slope.to_string()])?;
    }
    writer.flush().context("writing profile")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_accepts_relative_scan_and_options() {
        let cli = Cli::try_parse_from(["flyscan-recon", "image", "scans", "-1", "Pt", "opts.json"])
            .unwrap();
        match cli.command {
            Commands::Image {
                store,
                scan,
                element,
                options,
            } => {
                assert_eq!(store, PathBuf::from("scans"));
                assert_eq!(scan, -1);
                assert_eq!(element, "Pt");
                assert_eq!(options, Some(PathBuf::from("opts.json")));
            }
            Commands::Profile { .. } => panic!("parsed as profile"),
        }
    }

    #[test]
    fn profile_x_channel_is_optional() {
        let cli = Cli::try_parse_from(["flyscan-recon", "profile", "scans", "103", "Pt"]).unwrap();
        match cli.command {
            Commands::Profile {
                scan, x_channel, ..
            } => {
                assert_eq!(scan, 103);
                assert_eq!(x_channel, None);
            }
            Commands::Image { .. } => panic!("parsed as image"),
        }
    }

    #[test]
    fn malformed_invocations_are_rejected() {
        assert!(Cli::try_parse_from(["flyscan-recon"]).is_err());
        assert!(Cli::try_parse_from(["flyscan-recon", "image", "scans", "latest", "Pt"]).is_err());
        assert!(Cli::try_parse_from(["flyscan-recon", "image", "scans", "-1"]).is_err());
    }
}
