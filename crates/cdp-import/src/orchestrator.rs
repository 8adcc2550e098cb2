//! Import orchestrator
//!
//! Drives each dataset through fetch, decompression, parsing, filtering and
//! reconciliation. Courts run fully before judges so position-derived joins
//! downstream can resolve court identifiers; the ordering can be relaxed by
//! configuration. Checkpoints and progress reports are written on a timer,
//! not per record.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::checkpoint::CheckpointManager;
use crate::config::ImportConfig;
use crate::error::ImportError;
use crate::fetch::ArchiveFetcher;
use crate::filter::JurisdictionFilter;
use crate::models::Dataset;
use crate::parser::parse_line;
use crate::reconcile::Reconciler;
use crate::stats::{ImportStats, ProgressReporter};
use crate::store::{EntityStore, UpsertOutcome};
use crate::stream::LineStream;

/// Lifecycle of one dataset within a run
///
/// `Failed` is reachable only from `Fetching` (fetch or decompression fatal
/// errors) or from a setup error before streaming begins. Once streaming,
/// per-record errors keep the machine in `Streaming`; the dataset reaches
/// `Completed` only when the line sequence is exhausted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetState {
    Idle,
    Fetching,
    Streaming,
    Completed,
    Failed,
}

impl fmt::Display for DatasetState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DatasetState::Idle => "idle",
            DatasetState::Fetching => "fetching",
            DatasetState::Streaming => "streaming",
            DatasetState::Completed => "completed",
            DatasetState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Run-mode flags, the CLI surface of the pipeline
#[derive(Debug, Clone, Copy, Default)]
pub struct RunMode {
    pub courts_only: bool,
    pub judges_only: bool,
    pub resume: bool,
    pub skip_download: bool,
}

impl RunMode {
    /// Datasets selected by this mode, in referential order
    pub fn datasets(&self) -> Result<Vec<Dataset>, ImportError> {
        match (self.courts_only, self.judges_only) {
            (true, true) => Err(ImportError::Configuration(
                "courts-only and judges-only are mutually exclusive".to_string(),
            )),
            (true, false) => Ok(vec![Dataset::Courts]),
            (false, true) => Ok(vec![Dataset::Judges]),
            (false, false) => Ok(Dataset::all().to_vec()),
        }
    }
}

/// Outcome of one dataset's run
#[derive(Debug, Clone)]
pub struct DatasetReport {
    pub dataset: Dataset,
    pub state: DatasetState,
    pub stats: ImportStats,
    /// Checkpoint line this run resumed from (0 = fresh start)
    pub resumed_from: u64,
    /// Highest line fully processed by this run
    pub last_processed_line: u64,
    /// Whether the dataset was stopped by cooperative cancellation
    pub interrupted: bool,
    pub error: Option<String>,
}

/// Aggregated outcome of a whole run
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub reports: Vec<DatasetReport>,
}

impl RunSummary {
    /// Whether any dataset reached the `Failed` state
    ///
    /// Per-record errors alone never flip a run to failure.
    pub fn failed(&self) -> bool {
        self.reports
            .iter()
            .any(|r| r.state == DatasetState::Failed)
    }

    pub fn interrupted(&self) -> bool {
        self.reports.iter().any(|r| r.interrupted)
    }

    /// Counters merged across datasets
    pub fn totals(&self) -> ImportStats {
        let mut totals = ImportStats::default();
        for report in &self.reports {
            totals.merge(&report.stats);
        }
        totals
    }
}

/// Sequences datasets and drives the component chain to completion
pub struct ImportOrchestrator {
    config: ImportConfig,
    fetcher: ArchiveFetcher,
    filter: JurisdictionFilter,
    store: Arc<dyn EntityStore>,
    cancel: CancellationToken,
}

impl ImportOrchestrator {
    pub fn new(
        config: ImportConfig,
        store: Arc<dyn EntityStore>,
        cancel: CancellationToken,
    ) -> Result<Self, ImportError> {
        config.validate()?;
        let fetcher = ArchiveFetcher::new(&config)?;
        let filter = JurisdictionFilter::new(config.jurisdiction.clone());

        Ok(Self {
            config,
            fetcher,
            filter,
            store,
            cancel,
        })
    }

    /// Run the selected datasets and aggregate their reports
    pub async fn run(&self, mode: RunMode) -> Result<RunSummary, ImportError> {
        let datasets = mode.datasets()?;

        let reports = if self.config.concurrent_datasets && datasets.len() > 1 {
            warn!("Referential ordering relaxed by configuration: datasets run concurrently");
            futures::future::join_all(
                datasets.into_iter().map(|dataset| self.run_dataset(dataset, mode)),
            )
            .await
        } else {
            let mut reports = Vec::with_capacity(datasets.len());
            for dataset in datasets {
                reports.push(self.run_dataset(dataset, mode).await);
                if self.cancel.is_cancelled() {
                    break;
                }
            }
            reports
        };

        Ok(RunSummary { reports })
    }

    /// Run one dataset through the full component chain
    async fn run_dataset(&self, dataset: Dataset, mode: RunMode) -> DatasetReport {
        info!(dataset = %dataset, "Starting dataset import");

        // Idle -> Fetching
        let archive = match self.fetcher.fetch(dataset, mode.skip_download).await {
            Ok(path) => path,
            Err(e) => {
                error!(dataset = %dataset, error = %e, "Dataset failed during fetch");
                return Self::failed_report(dataset, e);
            },
        };

        let mut checkpoints = CheckpointManager::new(
            &self.config.cache_dir,
            Duration::from_secs(self.config.checkpoint_interval_secs),
        );
        let resumed_from = if mode.resume {
            checkpoints
                .load(dataset)
                .map(|c| c.last_processed_line)
                .unwrap_or(0)
        } else {
            0
        };
        if resumed_from > 0 {
            info!(dataset = %dataset, resumed_from, "Resuming from checkpoint");
        }

        let stream = match LineStream::open(&archive) {
            Ok(stream) => stream,
            Err(e) => {
                error!(dataset = %dataset, error = %e, "Dataset failed opening archive");
                return Self::failed_report(dataset, e);
            },
        };

        // Fetching -> Streaming
        let mut reporter = ProgressReporter::new(
            dataset,
            Duration::from_secs(self.config.progress_interval_secs),
        );
        let reconciler = Reconciler::new(
            self.store.clone(),
            self.config.max_retries,
            Duration::from_millis(self.config.retry_delay_ms),
        );

        let mut last_processed_line = resumed_from;
        let mut interrupted = false;
        let mut fatal: Option<ImportError> = None;

        for item in stream {
            let raw = match item {
                Ok(raw) => raw,
                Err(e) => {
                    error!(dataset = %dataset, error = %e, "Dataset failed mid-stream");
                    fatal = Some(e);
                    break;
                },
            };

            // Lines at or below the checkpoint were reconciled by a previous
            // run; the reader still has to advance through them.
            if raw.ordinal <= resumed_from {
                continue;
            }
            last_processed_line = raw.ordinal;

            if !raw.text.trim().is_empty() {
                reporter.record_processed();
                match parse_line(dataset, &raw) {
                    Err(e) => {
                        warn!(dataset = %dataset, error = %e, "Skipping malformed line");
                        reporter.record_parse_error();
                    },
                    Ok(record) => {
                        if !self.filter.included(&record) {
                            reporter.record_skipped();
                        } else {
                            match reconciler.reconcile(&record).await {
                                Ok(UpsertOutcome::Created) => reporter.record_created(),
                                Ok(UpsertOutcome::Updated) => reporter.record_updated(),
                                Err(e) => {
                                    error!(
                                        dataset = %dataset,
                                        error = %e,
                                        "Dropping record after failed persistence"
                                    );
                                    reporter.record_persistence_error();
                                },
                            }
                        }
                    },
                }
            }

            // The checkpoint only advances once this line's reconciliation
            // has completed, and only on the save interval.
            if let Err(e) = checkpoints.maybe_save(dataset, raw.ordinal) {
                warn!(dataset = %dataset, error = %e, "Failed to save checkpoint");
            }
            reporter.maybe_report();

            if self.cancel.is_cancelled() {
                info!(
                    dataset = %dataset,
                    line = raw.ordinal,
                    "Cancellation requested, stopping after current line"
                );
                interrupted = true;
                break;
            }
        }

        if let Err(e) = checkpoints.finalize(dataset, last_processed_line) {
            warn!(dataset = %dataset, error = %e, "Failed to finalize checkpoint");
        }

        let stats = reporter.finish();
        let (state, error) = match fatal {
            Some(e) => (DatasetState::Failed, Some(e.to_string())),
            // Cancelled mid-stream: the sequence was not exhausted
            None if interrupted => (DatasetState::Streaming, None),
            None => (DatasetState::Completed, None),
        };

        DatasetReport {
            dataset,
            state,
            stats,
            resumed_from,
            last_processed_line,
            interrupted,
            error,
        }
    }

    fn failed_report(dataset: Dataset, error: ImportError) -> DatasetReport {
        DatasetReport {
            dataset,
            state: DatasetState::Failed,
            stats: ImportStats::default(),
            resumed_from: 0,
            last_processed_line: 0,
            interrupted: false,
            error: Some(error.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_mode_selects_datasets_in_referential_order() {
        let all = RunMode::default().datasets().unwrap();
        assert_eq!(all, vec![Dataset::Courts, Dataset::Judges]);

        let courts = RunMode {
            courts_only: true,
            ..Default::default()
        };
        assert_eq!(courts.datasets().unwrap(), vec![Dataset::Courts]);

        let judges = RunMode {
            judges_only: true,
            ..Default::default()
        };
        assert_eq!(judges.datasets().unwrap(), vec![Dataset::Judges]);
    }

    #[test]
    fn test_run_mode_rejects_conflicting_flags() {
        let mode = RunMode {
            courts_only: true,
            judges_only: true,
            ..Default::default()
        };
        let err = mode.datasets().unwrap_err();
        assert!(matches!(err, ImportError::Configuration(_)));
    }

    #[test]
    fn test_summary_fails_only_on_failed_dataset() {
        let ok = DatasetReport {
            dataset: Dataset::Courts,
            state: DatasetState::Completed,
            stats: ImportStats {
                parse_errors: 5,
                persistence_errors: 2,
                ..Default::default()
            },
            resumed_from: 0,
            last_processed_line: 100,
            interrupted: false,
            error: None,
        };
        // Recoverable errors do not fail the run
        let summary = RunSummary {
            reports: vec![ok.clone()],
        };
        assert!(!summary.failed());

        let failed = DatasetReport {
            state: DatasetState::Failed,
            error: Some("corrupt archive".to_string()),
            ..ok
        };
        let summary = RunSummary {
            reports: vec![failed],
        };
        assert!(summary.failed());
    }

    #[test]
    fn test_summary_totals_merge_datasets() {
        let make = |processed, created| DatasetReport {
            dataset: Dataset::Courts,
            state: DatasetState::Completed,
            stats: ImportStats {
                processed,
                created,
                ..Default::default()
            },
            resumed_from: 0,
            last_processed_line: processed,
            interrupted: false,
            error: None,
        };
        let summary = RunSummary {
            reports: vec![make(10, 3), make(20, 7)],
        };
        let totals = summary.totals();
        assert_eq!(totals.processed, 30);
        assert_eq!(totals.created, 10);
    }
}
