//! Upsert reconciler
//!
//! Takes an included record and merges it into the entity store by external
//! identifier, retrying transient store failures with bounded backoff. A
//! record that still fails after the retry budget is logged and counted; it
//! never aborts the dataset.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::ImportError;
use crate::models::ParsedRecord;
use crate::store::{EntityStore, UpsertOutcome};

/// Reconciles parsed records into the entity store
pub struct Reconciler {
    store: Arc<dyn EntityStore>,
    max_retries: u32,
    retry_delay: Duration,
}

impl Reconciler {
    pub fn new(store: Arc<dyn EntityStore>, max_retries: u32, retry_delay: Duration) -> Self {
        Self {
            store,
            max_retries,
            retry_delay,
        }
    }

    /// Upsert one record, with bounded retry on transient store failures
    pub async fn reconcile(&self, record: &ParsedRecord) -> Result<UpsertOutcome, ImportError> {
        let external_id = record.external_id();

        for attempt in 1..=self.max_retries {
            match self.upsert(record).await {
                Ok(outcome) => {
                    debug!(external_id, outcome = ?outcome, "Record reconciled");
                    return Ok(outcome);
                },
                Err(e) => {
                    if attempt < self.max_retries {
                        let delay = self.retry_delay * attempt;
                        warn!(
                            external_id,
                            attempt,
                            max = self.max_retries,
                            error = %e,
                            "Store write failed, retrying in {:.1}s",
                            delay.as_secs_f64()
                        );
                        tokio::time::sleep(delay).await;
                    } else {
                        return Err(ImportError::Persistence {
                            external_id: external_id.to_string(),
                            attempts: self.max_retries,
                            reason: format!("{e:#}"),
                        });
                    }
                },
            }
        }

        unreachable!("Retry loop should always return")
    }

    async fn upsert(&self, record: &ParsedRecord) -> anyhow::Result<UpsertOutcome> {
        match record {
            ParsedRecord::Court { record, payload } => {
                self.store.upsert_court(record, payload).await
            },
            ParsedRecord::Judge { record, payload } => {
                self.store.upsert_judge(record, payload).await
            },
        }
    }
}
