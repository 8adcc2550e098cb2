//! Error taxonomy for the import pipeline
//!
//! Fatal errors (`Fetch`, `Decompression`, `Configuration`) stop the affected
//! dataset; everything else is recovered locally and counted.

use std::path::PathBuf;
use thiserror::Error;

use crate::models::Dataset;

/// Result type alias for import operations
pub type Result<T> = std::result::Result<T, ImportError>;

/// Error type for the import pipeline
#[derive(Error, Debug)]
pub enum ImportError {
    /// Network or storage failure while retrieving an archive. Fatal for the
    /// dataset once the bounded retry budget is exhausted.
    #[error("failed to fetch {dataset} archive from {url}: {reason}")]
    Fetch {
        dataset: Dataset,
        url: String,
        reason: String,
    },

    /// Corrupt or unreadable archive. Fatal for the dataset, no retry: all
    /// lines after the failure point are unrecoverable.
    #[error("corrupt archive {}: {source}", .path.display())]
    Decompression {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Malformed line. Recovered: logged, counted, stream continues.
    #[error("malformed record at line {line}: {detail}")]
    Parse { line: u64, detail: String },

    /// Store write failure after bounded retry. Recovered: logged, counted,
    /// stream continues.
    #[error("failed to persist {external_id} after {attempts} attempts: {reason}")]
    Persistence {
        external_id: String,
        attempts: u32,
        reason: String,
    },

    /// Missing credentials or invalid flags. Fatal before any dataset starts.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl ImportError {
    /// Whether this error terminates the dataset it occurred in
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ImportError::Fetch { .. }
                | ImportError::Decompression { .. }
                | ImportError::Configuration(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        let fetch = ImportError::Fetch {
            dataset: Dataset::Courts,
            url: "http://example.com/courts.jsonl.gz".to_string(),
            reason: "connection refused".to_string(),
        };
        assert!(fetch.is_fatal());

        let parse = ImportError::Parse {
            line: 7,
            detail: "expected value".to_string(),
        };
        assert!(!parse.is_fatal());

        let persistence = ImportError::Persistence {
            external_id: "cal".to_string(),
            attempts: 3,
            reason: "pool timed out".to_string(),
        };
        assert!(!persistence.is_fatal());

        assert!(ImportError::Configuration("missing DATABASE_URL".to_string()).is_fatal());
    }

    #[test]
    fn test_parse_error_message_carries_ordinal() {
        let err = ImportError::Parse {
            line: 42,
            detail: "trailing characters".to_string(),
        };
        assert!(err.to_string().contains("line 42"));
    }
}
