//! Import statistics and progress reporting
//!
//! Counters are owned by the dataset run and mutated only through the
//! reporter's event methods; nothing in the filter or reconciler reads them.

use std::fmt;
use std::time::{Duration, Instant};
use tracing::info;

use crate::models::Dataset;

/// Per-dataset counters for one import run
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ImportStats {
    /// Lines that reached the parser (post-resume, non-empty)
    pub processed: u64,
    /// Entities newly inserted into the store
    pub created: u64,
    /// Entities updated in place
    pub updated: u64,
    /// Records excluded by the jurisdiction filter
    pub skipped: u64,
    /// Malformed lines recovered from
    pub parse_errors: u64,
    /// Store writes that failed after retries
    pub persistence_errors: u64,
}

impl ImportStats {
    /// Merge another dataset's counters into this one
    pub fn merge(&mut self, other: &ImportStats) {
        self.processed += other.processed;
        self.created += other.created;
        self.updated += other.updated;
        self.skipped += other.skipped;
        self.parse_errors += other.parse_errors;
        self.persistence_errors += other.persistence_errors;
    }

    /// Total recoverable errors
    pub fn errors(&self) -> u64 {
        self.parse_errors + self.persistence_errors
    }
}

impl fmt::Display for ImportStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "processed={} created={} updated={} skipped={} parse_errors={} persistence_errors={}",
            self.processed,
            self.created,
            self.updated,
            self.skipped,
            self.parse_errors,
            self.persistence_errors
        )
    }
}

/// Aggregates events into [`ImportStats`] and surfaces progress on a timer
pub struct ProgressReporter {
    dataset: Dataset,
    interval: Duration,
    started: Instant,
    last_report: Instant,
    stats: ImportStats,
}

impl ProgressReporter {
    pub fn new(dataset: Dataset, interval: Duration) -> Self {
        let now = Instant::now();
        Self {
            dataset,
            interval,
            started: now,
            last_report: now,
            stats: ImportStats::default(),
        }
    }

    pub fn record_processed(&mut self) {
        self.stats.processed += 1;
    }

    pub fn record_created(&mut self) {
        self.stats.created += 1;
    }

    pub fn record_updated(&mut self) {
        self.stats.updated += 1;
    }

    pub fn record_skipped(&mut self) {
        self.stats.skipped += 1;
    }

    pub fn record_parse_error(&mut self) {
        self.stats.parse_errors += 1;
    }

    pub fn record_persistence_error(&mut self) {
        self.stats.persistence_errors += 1;
    }

    pub fn stats(&self) -> &ImportStats {
        &self.stats
    }

    /// Emit a progress line if the report interval has elapsed
    pub fn maybe_report(&mut self) {
        if self.last_report.elapsed() < self.interval {
            return;
        }
        info!(
            dataset = %self.dataset,
            processed = self.stats.processed,
            created = self.stats.created,
            updated = self.stats.updated,
            skipped = self.stats.skipped,
            errors = self.stats.errors(),
            "Import progress"
        );
        self.last_report = Instant::now();
    }

    /// Emit the final per-dataset summary and return the counters
    ///
    /// Always logged, whether or not recoverable errors occurred, so partial
    /// success is observable rather than silent.
    pub fn finish(self) -> ImportStats {
        info!(
            dataset = %self.dataset,
            processed = self.stats.processed,
            created = self.stats.created,
            updated = self.stats.updated,
            skipped = self.stats.skipped,
            parse_errors = self.stats.parse_errors,
            persistence_errors = self.stats.persistence_errors,
            duration_secs = self.started.elapsed().as_secs_f64(),
            "Dataset complete"
        );
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_accumulate() {
        let mut reporter = ProgressReporter::new(Dataset::Courts, Duration::from_secs(10));
        reporter.record_processed();
        reporter.record_processed();
        reporter.record_created();
        reporter.record_updated();
        reporter.record_skipped();
        reporter.record_parse_error();
        reporter.record_persistence_error();

        let stats = reporter.finish();
        assert_eq!(stats.processed, 2);
        assert_eq!(stats.created, 1);
        assert_eq!(stats.updated, 1);
        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.parse_errors, 1);
        assert_eq!(stats.persistence_errors, 1);
        assert_eq!(stats.errors(), 2);
    }

    #[test]
    fn test_merge() {
        let mut total = ImportStats::default();
        let a = ImportStats {
            processed: 10,
            created: 4,
            updated: 3,
            skipped: 2,
            parse_errors: 1,
            persistence_errors: 0,
        };
        let b = ImportStats {
            processed: 5,
            created: 1,
            updated: 0,
            skipped: 4,
            parse_errors: 0,
            persistence_errors: 2,
        };
        total.merge(&a);
        total.merge(&b);

        assert_eq!(total.processed, 15);
        assert_eq!(total.created, 5);
        assert_eq!(total.updated, 3);
        assert_eq!(total.skipped, 6);
        assert_eq!(total.errors(), 3);
    }

    #[test]
    fn test_display_includes_all_counters() {
        let stats = ImportStats {
            processed: 7,
            created: 2,
            updated: 1,
            skipped: 3,
            parse_errors: 1,
            persistence_errors: 0,
        };
        let rendered = stats.to_string();
        assert!(rendered.contains("processed=7"));
        assert!(rendered.contains("persistence_errors=0"));
    }
}
