use crate::config::OverwritePolicy;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "grid-heat-processor")]
#[command(about = "Daily gridded temperature and dew point rasters to a partitioned heat-index dataset")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true, help = "TOML configuration file")]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true, help = "Enable verbose logging")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Log file path")]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Read, join and partition paired raster archives
    Ingest {
        #[arg(long, help = "Directory of daily temperature rasters")]
        temperature_dir: PathBuf,

        #[arg(long, help = "Directory of daily dew point rasters")]
        dewpoint_dir: PathBuf,

        #[arg(short, long, help = "Dataset root [default: output/partitions]")]
        destination_root: Option<PathBuf>,

        #[arg(long, value_enum)]
        overwrite_policy: Option<OverwritePolicy>,

        #[arg(long, help = "First date to ingest (YYYYMMDD)")]
        start_date: Option<String>,

        #[arg(long, help = "Last date to ingest (YYYYMMDD)")]
        end_date: Option<String>,

        #[arg(long)]
        max_workers: Option<usize>,

        #[arg(long)]
        compression: Option<String>,

        #[arg(long, help = "Write the ingest report as JSON to this path")]
        report: Option<PathBuf>,
    },

    /// Compute relative humidity and heat index for an ingested dataset
    Derive {
        #[arg(long, help = "Root of the joined dataset")]
        source_root: PathBuf,

        #[arg(long, help = "Root for the derived partitions")]
        output_root: PathBuf,

        #[arg(long, help = "Input temperatures are in Kelvin")]
        kelvin: bool,

        #[arg(long, help = "Apply the high-humidity heat index adjustment")]
        high_humidity_adjustment: bool,

        #[arg(long, value_enum)]
        overwrite_policy: Option<OverwritePolicy>,
    },

    /// Display statistics about a partitioned dataset
    Info {
        #[arg(short, long)]
        root: PathBuf,

        #[arg(long, help = "Include relative humidity and heat index columns")]
        derived: bool,

        #[arg(short, long, default_value = "10")]
        sample: usize,
    },
}
