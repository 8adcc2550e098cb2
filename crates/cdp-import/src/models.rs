//! Record types for the bulk snapshot datasets
//!
//! Upstream records arrive as newline-delimited JSON. Each line is kept
//! verbatim as an opaque payload alongside the typed fields the pipeline
//! actually reads, so fields we do not model survive round trips.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// A bulk snapshot dataset published by the upstream provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dataset {
    Courts,
    Judges,
}

impl Dataset {
    /// All datasets in referential order (courts before judges, since judge
    /// positions reference court identifiers)
    pub fn all() -> [Dataset; 2] {
        [Dataset::Courts, Dataset::Judges]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Dataset::Courts => "courts",
            Dataset::Judges => "judges",
        }
    }

    /// File name of the compressed snapshot archive for this dataset
    pub fn archive_name(&self) -> String {
        format!("{}.jsonl.gz", self.as_str())
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One textual unit from the decompressed stream
///
/// `ordinal` is the 1-based physical line number within the dataset, used
/// for checkpointing and parse diagnostics. Ephemeral; never persisted.
#[derive(Debug, Clone)]
pub struct RawLine {
    pub ordinal: u64,
    pub text: String,
}

/// Typed fields of an upstream court record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourtRecord {
    /// Stable provider-assigned external identifier
    pub id: String,

    /// Display name
    #[serde(default)]
    pub full_name: Option<String>,

    /// Jurisdiction code (e.g., "CA", "F")
    #[serde(default)]
    pub jurisdiction: Option<String>,

    /// Court-level classification (e.g., "appellate", "trial")
    #[serde(default)]
    pub court_level: Option<String>,

    /// Location / address text
    #[serde(default)]
    pub location: Option<String>,

    /// Court website
    #[serde(default)]
    pub website: Option<String>,
}

/// Typed fields of an upstream judge record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JudgeRecord {
    /// Stable provider-assigned external identifier
    pub id: String,

    /// Full display name
    #[serde(default)]
    pub name_full: Option<String>,

    /// Ordered position history, oldest first as delivered upstream
    #[serde(default)]
    pub positions: Vec<PositionRecord>,
}

/// One entry in a judge's position history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionRecord {
    /// External identifier of the court this position is tied to
    #[serde(default)]
    pub court_id: Option<String>,

    /// Role text (e.g., "Judge", "Chief Justice")
    #[serde(default)]
    pub position_type: Option<String>,

    /// Start marker as delivered upstream (not interpreted)
    #[serde(default)]
    pub date_start: Option<String>,

    /// End marker; `None` means the position is current
    #[serde(default)]
    pub date_termination: Option<String>,
}

/// A parsed snapshot record: typed fields plus the verbatim upstream payload
#[derive(Debug, Clone)]
pub enum ParsedRecord {
    Court { record: CourtRecord, payload: Value },
    Judge { record: JudgeRecord, payload: Value },
}

impl ParsedRecord {
    /// The upsert key for this record
    pub fn external_id(&self) -> &str {
        match self {
            ParsedRecord::Court { record, .. } => &record.id,
            ParsedRecord::Judge { record, .. } => &record.id,
        }
    }

    pub fn dataset(&self) -> Dataset {
        match self {
            ParsedRecord::Court { .. } => Dataset::Courts,
            ParsedRecord::Judge { .. } => Dataset::Judges,
        }
    }
}
