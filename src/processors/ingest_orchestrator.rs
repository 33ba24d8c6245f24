use crate::config::{OverwritePolicy, PipelineConfig};
use crate::error::{ProcessingError, Result};
use crate::processors::pair_joiner::PairJoiner;
use crate::readers::GridReader;
use crate::utils::progress::ProgressReporter;
use crate::writers::{PartitionWriter, WriteOutcome};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PairSuccess {
    pub index: usize,
    pub date: String,
    #[serde(flatten)]
    pub outcome: WriteOutcome,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PairFailure {
    pub index: usize,
    pub temperature_file: PathBuf,
    pub dewpoint_file: PathBuf,
    pub kind: String,
    pub message: String,
}

/// Outcome of one ingest run, in input order
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IngestReport {
    pub successes: Vec<PairSuccess>,
    pub failures: Vec<PairFailure>,
    /// Pairs never started because the run was cancelled
    pub cancelled: usize,
}

impl IngestReport {
    pub fn total(&self) -> usize {
        self.successes.len() + self.failures.len() + self.cancelled
    }

    pub fn written(&self) -> usize {
        self.successes
            .iter()
            .filter(|s| s.outcome.is_written())
            .count()
    }

    pub fn skipped(&self) -> usize {
        self.successes.len() - self.written()
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.cancelled == 0
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn summary(&self) -> String {
        let mut summary = format!(
            "Ingest Summary:\n\
            - Pairs: {}\n\
            - Written: {}\n\
            - Skipped: {}\n\
            - Failed: {}\n\
            - Cancelled: {}",
            self.total(),
            self.written(),
            self.skipped(),
            self.failures.len(),
            self.cancelled
        );
        for failure in &self.failures {
            summary.push_str(&format!(
                "\n  #{} {} [{}] {}",
                failure.index,
                failure.temperature_file.display(),
                failure.kind,
                failure.message
            ));
        }
        summary
    }
}

enum PairResult {
    Success(PairSuccess),
    Failure(PairFailure),
    Cancelled,
}

/// Runs read, join and write for each (temperature, dew point) file pair.
///
/// A failing pair is recorded and never stops its siblings. Pairs run on a
/// bounded rayon pool and each date can be claimed by one pair only per run.
pub struct IngestOrchestrator {
    reader: GridReader,
    joiner: PairJoiner,
    writer: PartitionWriter,
    policy: OverwritePolicy,
    max_workers: usize,
    cancel: Arc<AtomicBool>,
}

impl IngestOrchestrator {
    pub fn new(reader: GridReader, writer: PartitionWriter) -> Self {
        Self {
            reader,
            joiner: PairJoiner::new(),
            writer,
            policy: OverwritePolicy::default(),
            max_workers: num_cpus::get(),
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Result<Self> {
        Ok(Self::new(
            GridReader::from_config(config)?,
            PartitionWriter::from_config(config)?,
        )
        .with_policy(config.overwrite_policy)
        .with_max_workers(config.max_workers))
    }

    pub fn with_policy(mut self, policy: OverwritePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers.max(1);
        self
    }

    pub fn with_cancel_flag(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = cancel;
        self
    }

    /// Setting this flag stops the run before the next pair starts
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    pub fn run(
        &self,
        temperature_files: &[PathBuf],
        dewpoint_files: &[PathBuf],
        destination_root: &Path,
        progress: Option<&ProgressReporter>,
    ) -> Result<IngestReport> {
        if temperature_files.len() != dewpoint_files.len() {
            return Err(ProcessingError::Pairing {
                temperature: temperature_files.len(),
                dewpoint: dewpoint_files.len(),
            });
        }

        info!(
            "Ingesting {} pairs into {} ({} workers, {})",
            temperature_files.len(),
            destination_root.display(),
            self.max_workers,
            self.policy
        );

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.max_workers)
            .build()
            .map_err(|e| ProcessingError::Config(e.to_string()))?;

        let claimed: Mutex<HashSet<String>> = Mutex::new(HashSet::new());
        let pairs: Vec<(usize, (&PathBuf, &PathBuf))> = temperature_files
            .iter()
            .zip(dewpoint_files)
            .enumerate()
            .collect();

        let results: Vec<PairResult> = pool.install(|| {
            pairs
                .par_iter()
                .map(|&(index, (temperature, dewpoint))| {
                    if self.cancel.load(Ordering::SeqCst) {
                        return PairResult::Cancelled;
                    }

                    let result =
                        self.process_pair(temperature, dewpoint, destination_root, &claimed);
                    if let Some(p) = progress {
                        p.increment(1);
                    }

                    match result {
                        Ok((date, outcome)) => PairResult::Success(PairSuccess {
                            index,
                            date,
                            outcome,
                        }),
                        Err(e) => {
                            warn!(
                                "Pair {} ({} / {}) failed: {}",
                                index,
                                temperature.display(),
                                dewpoint.display(),
                                e
                            );
                            PairResult::Failure(PairFailure {
                                index,
                                temperature_file: temperature.clone(),
                                dewpoint_file: dewpoint.clone(),
                                kind: e.kind().to_string(),
                                message: e.to_string(),
                            })
                        }
                    }
                })
                .collect()
        });

        let mut report = IngestReport::default();
        for result in results {
            match result {
                PairResult::Success(s) => report.successes.push(s),
                PairResult::Failure(f) => report.failures.push(f),
                PairResult::Cancelled => report.cancelled += 1,
            }
        }

        if let Some(p) = progress {
            p.finish_with_message(&format!(
                "Ingested {} of {} pairs",
                report.successes.len(),
                report.total()
            ));
        }
        info!(
            "Ingest finished: {} written, {} skipped, {} failed, {} cancelled",
            report.written(),
            report.skipped(),
            report.failures.len(),
            report.cancelled
        );

        Ok(report)
    }

    fn process_pair(
        &self,
        temperature: &Path,
        dewpoint: &Path,
        destination_root: &Path,
        claimed: &Mutex<HashSet<String>>,
    ) -> Result<(String, WriteOutcome)> {
        let temperature_cells = self.reader.read(temperature)?;
        let dewpoint_cells = self.reader.read(dewpoint)?;
        let table = self.joiner.join(&temperature_cells, &dewpoint_cells)?;

        {
            let mut dates = claimed.lock().unwrap_or_else(|e| e.into_inner());
            if !dates.insert(table.date.clone()) {
                return Err(ProcessingError::DuplicateDate(table.date));
            }
        }

        if table.complete_rows() == 0 {
            warn!("No dew-point values matched temperature cells for {}", table.date);
        }
        debug!(
            "Joined {} rows for {} ({} complete)",
            table.len(),
            table.date,
            table.complete_rows()
        );

        let outcome = self
            .writer
            .write(&table.rows, &table.date, destination_root, self.policy)?;
        Ok((table.date, outcome))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{write_geotiff, Band};
    use crate::utils::identifier::IdentifierPattern;
    use tempfile::TempDir;

    fn orchestrator() -> IngestOrchestrator {
        let reader = GridReader::new(&IdentifierPattern::default(), 5).unwrap();
        IngestOrchestrator::new(reader, PartitionWriter::new()).with_max_workers(2)
    }

    fn pair(dir: &Path, date: &str) -> (PathBuf, PathBuf) {
        let temperature = dir.join(format!("t_{}.tif", date));
        let dewpoint = dir.join(format!("d_{}.tif", date));
        let t_id = format!("AgERA5_Temperature-Air-2m-Mean-24h_{}", date);
        let d_id = format!("AgERA5_Dew-Point-Temperature-2m-Mean_{}", date);
        let t_band = Band::new(Some(t_id.as_str()), vec![30.0, 31.0, 32.0, 33.0]);
        let d_band = Band::new(Some(d_id.as_str()), vec![20.0, 21.0, 22.0, 23.0]);
        write_geotiff(&temperature, 2, 2, (0.0, 1.0), 0.5, None, &[t_band]);
        write_geotiff(&dewpoint, 2, 2, (0.0, 1.0), 0.5, None, &[d_band]);
        (temperature, dewpoint)
    }

    #[test]
    fn test_unequal_lengths_is_pairing_error() {
        let out = TempDir::new().unwrap();
        let err = orchestrator()
            .run(&[PathBuf::from("a.tif")], &[], out.path(), None)
            .unwrap_err();
        assert!(matches!(
            err,
            ProcessingError::Pairing {
                temperature: 1,
                dewpoint: 0
            }
        ));
        assert_eq!(std::fs::read_dir(out.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_failure_does_not_stop_siblings() -> Result<()> {
        let input = TempDir::new()?;
        let out = TempDir::new()?;
        let (t1, d1) = pair(input.path(), "20200101");
        let (t3, d3) = pair(input.path(), "20200103");
        let broken = input.path().join("t_20200102.tif");
        std::fs::write(&broken, b"corrupt")?;

        let report = orchestrator().run(
            &[t1, broken.clone(), t3],
            &[d1.clone(), d1, d3],
            out.path(),
            None,
        )?;

        assert_eq!(report.successes.len(), 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].index, 1);
        assert_eq!(report.failures[0].temperature_file, broken);
        assert_eq!(report.failures[0].kind, "format");
        assert_eq!(report.successes[0].date, "20200101");
        assert_eq!(report.successes[1].date, "20200103");
        assert!(out.path().join("date=20200101").exists());
        assert!(out.path().join("date=20200103").exists());
        assert!(!report.is_clean());
        Ok(())
    }

    #[test]
    fn test_duplicate_date_in_one_run() -> Result<()> {
        let input = TempDir::new()?;
        let out = TempDir::new()?;
        let (t, d) = pair(input.path(), "20200101");

        let report = orchestrator()
            .with_max_workers(1)
            .run(&[t.clone(), t], &[d.clone(), d], out.path(), None)?;

        assert_eq!(report.successes.len(), 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].kind, "duplicate_date");
        Ok(())
    }

    #[test]
    fn test_misaligned_pair_is_failure() -> Result<()> {
        let input = TempDir::new()?;
        let out = TempDir::new()?;
        let (_, d2) = pair(input.path(), "20200102");
        let (t3, _) = pair(input.path(), "20200103");

        let report = orchestrator().run(&[t3], &[d2], out.path(), None)?;

        assert!(report.successes.is_empty());
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].kind, "multiple_dates");
        assert!(!out.path().join("date=20200103").exists());
        Ok(())
    }

    #[test]
    fn test_cancelled_before_start() -> Result<()> {
        let input = TempDir::new()?;
        let out = TempDir::new()?;
        let (t, d) = pair(input.path(), "20200101");

        let orchestrator = orchestrator();
        orchestrator.cancel_flag().store(true, Ordering::SeqCst);
        let report = orchestrator.run(&[t], &[d], out.path(), None)?;

        assert_eq!(report.cancelled, 1);
        assert!(report.successes.is_empty());
        assert!(!out.path().join("date=20200101").exists());
        Ok(())
    }

    #[test]
    fn test_rerun_with_skip_policy() -> Result<()> {
        let input = TempDir::new()?;
        let out = TempDir::new()?;
        let (t, d) = pair(input.path(), "20200101");

        let first = orchestrator().run(&[t.clone()], &[d.clone()], out.path(), None)?;
        let second = orchestrator().run(&[t], &[d], out.path(), None)?;
        assert_eq!(first.written(), 1);
        assert_eq!(second.skipped(), 1);
        Ok(())
    }

    #[test]
    fn test_report_serialises() -> Result<()> {
        let report = IngestReport {
            successes: vec![PairSuccess {
                index: 0,
                date: "20200101".into(),
                outcome: WriteOutcome::Written {
                    path: PathBuf::from("out/date=20200101"),
                    rows: 4,
                },
            }],
            failures: vec![],
            cancelled: 0,
        };

        let json: serde_json::Value = serde_json::from_str(&report.to_json()?)?;
        assert_eq!(json["successes"][0]["status"], "written");
        assert_eq!(json["successes"][0]["rows"], 4);
        assert_eq!(json["cancelled"], 0);
        Ok(())
    }
}
