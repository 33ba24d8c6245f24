use crate::analyzers::DatasetAnalyzer;
use crate::cli::args::{Cli, Commands};
use crate::cli::init_tracing;
use crate::config::{DateRange, PipelineConfig};
use crate::error::{ProcessingError, Result};
use crate::models::{ColumnarRecord, DerivedRow, JoinedRow};
use crate::processors::{DerivedMetricEngine, IngestOrchestrator, TemperatureUnit};
use crate::readers::{list_partitions, partition_info, partition_schema, partitions, read_partition};
use crate::utils::archive::{list_rasters, paths};
use crate::utils::progress::ProgressReporter;
use crate::writers::PartitionWriter;
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use tracing::{info, warn};

const OPEN_START: &str = "00010101";
const OPEN_END: &str = "99991231";

pub async fn run(cli: Cli) -> Result<()> {
    init_tracing(cli.verbose, cli.log_file.as_deref())?;
    let mut config = PipelineConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Ingest {
            temperature_dir,
            dewpoint_dir,
            destination_root,
            overwrite_policy,
            start_date,
            end_date,
            max_workers,
            compression,
            report,
        } => {
            if let Some(root) = destination_root {
                config.destination_root = root;
            }
            if let Some(policy) = overwrite_policy {
                config.overwrite_policy = policy;
            }
            if let Some(workers) = max_workers {
                config.max_workers = workers;
            }
            if let Some(compression) = compression {
                config.compression = compression;
            }
            config.date_range = merge_date_range(config.date_range.take(), start_date, end_date)?;
            config.check()?;

            ingest(config, &temperature_dir, &dewpoint_dir, report).await?;
        }

        Commands::Derive {
            source_root,
            output_root,
            kelvin,
            high_humidity_adjustment,
            overwrite_policy,
        } => {
            if kelvin {
                config.input_unit = TemperatureUnit::Kelvin;
            }
            if high_humidity_adjustment {
                config.high_humidity_adjustment = true;
            }
            if let Some(policy) = overwrite_policy {
                config.overwrite_policy = policy;
            }
            config.check()?;

            let written = tokio::task::spawn_blocking(move || {
                derive(&config, &source_root, &output_root)
            })
            .await??;
            println!("Derived {} partitions into output root", written);
        }

        Commands::Info {
            root,
            derived,
            sample,
        } => {
            info_command(&config, &root, derived, sample)?;
        }
    }

    Ok(())
}

/// CLI dates override the corresponding end of the configured range
fn merge_date_range(
    configured: Option<DateRange>,
    start: Option<String>,
    end: Option<String>,
) -> Result<Option<DateRange>> {
    if start.is_none() && end.is_none() {
        return Ok(configured);
    }

    let (configured_start, configured_end) = match configured {
        Some(range) => (range.start, range.end),
        None => (OPEN_START.to_string(), OPEN_END.to_string()),
    };
    let start = start.unwrap_or(configured_start);
    let end = end.unwrap_or(configured_end);
    DateRange::new(&start, &end).map(Some)
}

async fn ingest(
    config: PipelineConfig,
    temperature_dir: &Path,
    dewpoint_dir: &Path,
    report_path: Option<PathBuf>,
) -> Result<()> {
    let range = config.date_range.as_ref();
    let temperature_files = paths(&list_rasters(temperature_dir, range)?);
    let dewpoint_files = paths(&list_rasters(dewpoint_dir, range)?);

    println!("Ingesting gridded rasters...");
    println!("Temperature directory: {}", temperature_dir.display());
    println!("Dew point directory: {}", dewpoint_dir.display());
    println!("Destination: {}", config.destination_root.display());
    println!(
        "Workers: {}, Policy: {}",
        config.max_workers, config.overwrite_policy
    );

    let orchestrator = IngestOrchestrator::from_config(&config)?;

    let cancel = orchestrator.cancel_flag();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, finishing partitions in progress");
            cancel.store(true, Ordering::SeqCst);
        }
    });

    let destination = config.destination_root.clone();
    let report = tokio::task::spawn_blocking(move || {
        let progress =
            ProgressReporter::new(temperature_files.len() as u64, "Ingesting pairs...", false);
        orchestrator.run(
            &temperature_files,
            &dewpoint_files,
            &destination,
            Some(&progress),
        )
    })
    .await??;

    println!("\n{}", report.summary());

    if let Some(path) = report_path {
        std::fs::write(&path, report.to_json()?)?;
        info!("Report written to {}", path.display());
    }

    if report.cancelled > 0 {
        return Err(ProcessingError::Cancelled);
    }
    if report.is_clean() {
        println!("Ingest complete!");
    } else {
        println!("Ingest finished with {} failed pairs", report.failures.len());
    }

    Ok(())
}

/// Derive every partition under `source_root` into `output_root`
fn derive(config: &PipelineConfig, source_root: &Path, output_root: &Path) -> Result<usize> {
    let engine = DerivedMetricEngine::from_config(config);
    let writer = PartitionWriter::from_config(config)?;
    let dates = list_partitions(source_root)?;

    let progress = ProgressReporter::new(dates.len() as u64, "Deriving heat index...", false);
    let mut written = 0;

    for partition in partitions::<JoinedRow>(source_root)? {
        let (date, rows) = partition?;
        progress.set_message(&format!("Deriving {}...", date));
        let derived = engine.derive_table(&rows);
        let outcome = writer.write(
            &derived,
            &date,
            output_root,
            config.overwrite_policy,
        )?;
        if outcome.is_written() {
            written += 1;
        }
        progress.increment(1);
    }

    progress.finish_with_message(&format!("Derived {} of {} partitions", written, dates.len()));
    Ok(written)
}

fn info_command(config: &PipelineConfig, root: &Path, derived: bool, sample: usize) -> Result<()> {
    println!("Analyzing dataset: {}", root.display());

    let dates = list_partitions(root)?;
    let Some(first) = dates.first() else {
        println!("No partitions found");
        return Ok(());
    };

    let stores_derived = partition_schema(root, first)?.fields().len()
        == DerivedRow::schema().fields().len();

    let spinner = ProgressReporter::new_spinner("Analyzing partitions...", false);
    let analyzer = DatasetAnalyzer::new();
    let stats = if stores_derived {
        analyzer.analyze_derived(root)?
    } else if derived {
        let engine = DerivedMetricEngine::from_config(config);
        analyzer.analyze(root, Some(&engine))?
    } else {
        analyzer.analyze(root, None)?
    };
    spinner.finish_with_message(&format!("Analyzed {} partitions", stats.partitions));
    println!("\n{}", stats.summary());

    let mut total_size = 0u64;
    let mut row_groups = 0usize;
    for date in &dates {
        let info = partition_info(root, date)?;
        total_size += info.file_size;
        row_groups += info.row_groups;
    }
    println!("\nStorage Details:");
    println!("- Partitions: {}", dates.len());
    println!("- Row groups: {}", row_groups);
    println!("- Size: {:.2} MB", total_size as f64 / 1_048_576.0);

    if sample > 0 {
        println!("\nSample Rows from {} (showing up to {}):", first, sample);
        if stores_derived {
            let rows: Vec<DerivedRow> = read_partition(root, first)?;
            for (i, row) in rows.iter().take(sample).enumerate() {
                println!(
                    "{}. ({}, {}) T={} Td={} RH={} HI={}",
                    i + 1,
                    row.x,
                    row.y,
                    fmt_value(row.temperature),
                    fmt_value(row.dew_point),
                    fmt_value(row.relative_humidity),
                    fmt_value(row.heat_index)
                );
            }
        } else {
            let rows: Vec<JoinedRow> = read_partition(root, first)?;
            for (i, row) in rows.iter().take(sample).enumerate() {
                println!(
                    "{}. ({}, {}) T={} Td={}",
                    i + 1,
                    row.x,
                    row.y,
                    fmt_value(row.temperature),
                    fmt_value(row.dew_point)
                );
            }
        }
    }

    Ok(())
}

fn fmt_value(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{:.2}", v))
}
