mod common;

use common::{write_band, write_day, DEWPOINT_PREFIX, TEMPERATURE_PREFIX};
use grid_heat_processor::analyzers::DatasetAnalyzer;
use grid_heat_processor::config::{OverwritePolicy, PipelineConfig};
use grid_heat_processor::error::{ProcessingError, Result};
use grid_heat_processor::models::{DerivedRow, JoinedRow};
use grid_heat_processor::processors::{DerivedMetricEngine, IngestOrchestrator, PairJoiner};
use grid_heat_processor::readers::{list_partitions, read_partition, GridReader};
use grid_heat_processor::utils::archive::{list_rasters, paths};
use grid_heat_processor::writers::PartitionWriter;
use pretty_assertions::assert_eq;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

fn config(root: &std::path::Path, policy: OverwritePolicy) -> PipelineConfig {
    PipelineConfig {
        destination_root: root.to_path_buf(),
        overwrite_policy: policy,
        max_workers: 2,
        ..PipelineConfig::default()
    }
}

fn days(dir: &std::path::Path, dates: &[&str]) -> (Vec<PathBuf>, Vec<PathBuf>) {
    dates
        .iter()
        .enumerate()
        .map(|(i, date)| write_day(dir, date, 25.0 + i as f32))
        .unzip()
}

#[test]
fn test_batch_with_one_corrupt_file() -> Result<()> {
    let input = TempDir::new()?;
    let output = TempDir::new()?;
    let dates = ["20200701", "20200702", "20200703", "20200704"];
    let (temperature, dewpoint) = days(input.path(), &dates);

    // Truncate one dew-point file
    fs::write(&dewpoint[2], b"II*\0")?;

    let orchestrator =
        IngestOrchestrator::from_config(&config(output.path(), OverwritePolicy::default()))?;
    let report = orchestrator.run(&temperature, &dewpoint, output.path(), None)?;

    assert_eq!(report.successes.len(), 3);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].index, 2);
    assert_eq!(report.failures[0].dewpoint_file, dewpoint[2]);
    assert_eq!(
        list_partitions(output.path())?,
        vec!["20200701", "20200702", "20200704"]
    );
    Ok(())
}

#[test]
fn test_ingest_round_trip() -> Result<()> {
    let input = TempDir::new()?;
    let output = TempDir::new()?;
    let (temperature, dewpoint) = days(input.path(), &["20200715"]);

    let config = config(output.path(), OverwritePolicy::default());
    IngestOrchestrator::from_config(&config)?.run(
        &temperature,
        &dewpoint,
        output.path(),
        None,
    )?;

    let reader = GridReader::from_config(&config)?;
    let expected = PairJoiner::new()
        .join(&reader.read(&temperature[0])?, &reader.read(&dewpoint[0])?)?;
    let stored: Vec<JoinedRow> = read_partition(output.path(), "20200715")?;

    assert_eq!(stored, expected.rows);
    assert_eq!(stored.len(), 6);
    assert_eq!(stored.iter().filter(|r| r.dew_point.is_none()).count(), 1);
    assert_eq!(stored[0].x, 5.05);
    assert_eq!(stored[0].y, 51.95);
    Ok(())
}

#[test]
fn test_overwrite_is_byte_identical() -> Result<()> {
    let input = TempDir::new()?;
    let output = TempDir::new()?;
    let (temperature, dewpoint) = days(input.path(), &["20200715"]);
    let file = output
        .path()
        .join("date=20200715")
        .join("part-00000.parquet");

    let orchestrator =
        IngestOrchestrator::from_config(&config(output.path(), OverwritePolicy::Overwrite))?;
    orchestrator.run(&temperature, &dewpoint, output.path(), None)?;
    let first = fs::read(&file)?;
    let report = orchestrator.run(&temperature, &dewpoint, output.path(), None)?;

    assert_eq!(report.written(), 1);
    assert_eq!(fs::read(&file)?, first);
    Ok(())
}

#[test]
fn test_overwrite_policies() -> Result<()> {
    let input = TempDir::new()?;
    let output = TempDir::new()?;
    let (temperature, dewpoint) = days(input.path(), &["20200715"]);

    let run = |policy| {
        IngestOrchestrator::from_config(&config(output.path(), policy))?.run(
            &temperature,
            &dewpoint,
            output.path(),
            None,
        )
    };

    assert_eq!(run(OverwritePolicy::SkipIfExists)?.written(), 1);
    assert_eq!(run(OverwritePolicy::SkipIfExists)?.skipped(), 1);

    let failed = run(OverwritePolicy::FailIfExists)?;
    assert_eq!(failed.failures.len(), 1);
    assert_eq!(failed.failures[0].kind, "partition_exists");

    assert_eq!(run(OverwritePolicy::Overwrite)?.written(), 1);
    Ok(())
}

#[test]
fn test_pairing_error_before_any_work() -> Result<()> {
    let input = TempDir::new()?;
    let output = TempDir::new()?;
    let (temperature, dewpoint) = days(input.path(), &["20200701", "20200702"]);

    let err =
        IngestOrchestrator::from_config(&config(output.path(), OverwritePolicy::default()))?
            .run(&temperature, &dewpoint[..1], output.path(), None)
            .unwrap_err();

    assert!(matches!(err, ProcessingError::Pairing { .. }));
    assert!(list_partitions(output.path())?.is_empty());
    Ok(())
}

#[test]
fn test_left_join_counts() -> Result<()> {
    let input = TempDir::new()?;
    let temperature = input.path().join("t_20200801.tif");
    let dewpoint = input.path().join("d_20200801.tif");
    // Dew point covers only the first row of the temperature grid
    write_band(
        &temperature,
        &format!("{}_20200801", TEMPERATURE_PREFIX),
        2,
        2,
        &[30.0, 31.0, 32.0, 33.0],
    );
    write_band(
        &dewpoint,
        &format!("{}_20200801", DEWPOINT_PREFIX),
        2,
        1,
        &[20.0, 21.0],
    );

    let reader = GridReader::from_config(&PipelineConfig::default())?;
    let table =
        PairJoiner::new().join(&reader.read(&temperature)?, &reader.read(&dewpoint)?)?;

    assert_eq!(table.len(), 4);
    assert_eq!(table.complete_rows(), 2);
    Ok(())
}

#[test]
fn test_archive_listing_pairs_by_date() -> Result<()> {
    let temperature_dir = TempDir::new()?;
    let dewpoint_dir = TempDir::new()?;
    for (i, date) in ["20200703", "20200701", "20200702"].iter().enumerate() {
        let (t, d) = write_day(temperature_dir.path(), date, 20.0 + i as f32);
        fs::rename(&d, dewpoint_dir.path().join(d.file_name().unwrap()))?;
        assert!(t.exists());
    }

    let temperature = paths(&list_rasters(temperature_dir.path(), None)?);
    let dewpoint = paths(&list_rasters(dewpoint_dir.path(), None)?);
    let output = TempDir::new()?;
    let report =
        IngestOrchestrator::from_config(&config(output.path(), OverwritePolicy::default()))?
            .run(&temperature, &dewpoint, output.path(), None)?;

    assert!(report.is_clean());
    let dates: Vec<_> = report.successes.iter().map(|s| s.date.as_str()).collect();
    assert_eq!(dates, vec!["20200701", "20200702", "20200703"]);
    Ok(())
}

#[test]
fn test_derive_and_analyze() -> Result<()> {
    let input = TempDir::new()?;
    let joined = TempDir::new()?;
    let derived_root = TempDir::new()?;
    let (temperature, dewpoint) = days(input.path(), &["20200701", "20200702"]);

    let config = config(joined.path(), OverwritePolicy::default());
    IngestOrchestrator::from_config(&config)?.run(
        &temperature,
        &dewpoint,
        joined.path(),
        None,
    )?;

    let engine = DerivedMetricEngine::from_config(&config);
    let writer = PartitionWriter::from_config(&config)?;
    for date in list_partitions(joined.path())? {
        let rows: Vec<JoinedRow> = read_partition(joined.path(), &date)?;
        writer.write(
            &engine.derive_table(&rows),
            &date,
            derived_root.path(),
            OverwritePolicy::default(),
        )?;
    }

    let derived: Vec<DerivedRow> = read_partition(derived_root.path(), "20200701")?;
    assert_eq!(derived.len(), 6);
    assert_eq!(derived.iter().filter(|r| r.heat_index.is_none()).count(), 1);
    assert!(derived.iter().all(|r| r.temperature_f.is_some()));

    let stats = DatasetAnalyzer::new().analyze_derived(derived_root.path())?;
    let computed = DatasetAnalyzer::new().analyze(joined.path(), Some(&engine))?;
    assert_eq!(stats.total_rows, 12);
    assert_eq!(stats.columns, computed.columns);
    assert_eq!(stats.column("heat_index").unwrap().missing, 2);
    Ok(())
}
