//! Record parser
//!
//! Converts one raw line into a typed record for its dataset. The full JSON
//! value is retained verbatim as the opaque payload so unmodeled upstream
//! fields are preserved through reconciliation. Parse failures are tagged
//! with the line ordinal and a truncated excerpt, and never stop the stream.

use serde_json::Value;

use crate::error::ImportError;
use crate::models::{CourtRecord, Dataset, JudgeRecord, ParsedRecord, RawLine};

/// Maximum excerpt length carried in parse diagnostics
const EXCERPT_MAX_CHARS: usize = 120;

/// Parse one line of the given dataset
pub fn parse_line(dataset: Dataset, raw: &RawLine) -> Result<ParsedRecord, ImportError> {
    let payload: Value =
        serde_json::from_str(&raw.text).map_err(|e| parse_error(raw, &e.to_string()))?;

    if !payload.is_object() {
        return Err(parse_error(raw, "expected a JSON object"));
    }

    match dataset {
        Dataset::Courts => {
            let record: CourtRecord = serde_json::from_value(payload.clone())
                .map_err(|e| parse_error(raw, &e.to_string()))?;
            if record.id.trim().is_empty() {
                return Err(parse_error(raw, "missing external identifier"));
            }
            Ok(ParsedRecord::Court { record, payload })
        },
        Dataset::Judges => {
            let record: JudgeRecord = serde_json::from_value(payload.clone())
                .map_err(|e| parse_error(raw, &e.to_string()))?;
            if record.id.trim().is_empty() {
                return Err(parse_error(raw, "missing external identifier"));
            }
            Ok(ParsedRecord::Judge { record, payload })
        },
    }
}

fn parse_error(raw: &RawLine, detail: &str) -> ImportError {
    ImportError::Parse {
        line: raw.ordinal,
        detail: format!("{} (excerpt: {})", detail, excerpt(&raw.text)),
    }
}

/// Truncate a line to a diagnostic-sized excerpt on a char boundary
fn excerpt(text: &str) -> String {
    if text.chars().count() <= EXCERPT_MAX_CHARS {
        text.to_string()
    } else {
        let truncated: String = text.chars().take(EXCERPT_MAX_CHARS).collect();
        format!("{truncated}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(ordinal: u64, text: &str) -> RawLine {
        RawLine {
            ordinal,
            text: text.to_string(),
        }
    }

    #[test]
    fn test_parse_court_record() {
        let raw = line(
            1,
            r#"{"id": "calsuper_alameda", "full_name": "Superior Court of Alameda County",
               "jurisdiction": "CA", "court_level": "trial",
               "location": "Oakland, CA", "website": "https://alameda.courts.ca.gov"}"#,
        );

        let parsed = parse_line(Dataset::Courts, &raw).unwrap();
        match parsed {
            ParsedRecord::Court { record, payload } => {
                assert_eq!(record.id, "calsuper_alameda");
                assert_eq!(
                    record.full_name.as_deref(),
                    Some("Superior Court of Alameda County")
                );
                assert_eq!(payload["jurisdiction"], "CA");
            },
            ParsedRecord::Judge { .. } => panic!("expected a court record"),
        }
    }

    #[test]
    fn test_parse_judge_record_with_positions() {
        let raw = line(
            5,
            r#"{"id": "j-301", "name_full": "Jane Roe",
               "positions": [{"court_id": "ca9", "position_type": "Judge",
                              "date_start": "1998-03-01", "date_termination": "2004-06-30"}]}"#,
        );

        let parsed = parse_line(Dataset::Judges, &raw).unwrap();
        match parsed {
            ParsedRecord::Judge { record, .. } => {
                assert_eq!(record.id, "j-301");
                assert_eq!(record.positions.len(), 1);
                assert_eq!(record.positions[0].court_id.as_deref(), Some("ca9"));
            },
            ParsedRecord::Court { .. } => panic!("expected a judge record"),
        }
    }

    #[test]
    fn test_unmodeled_fields_survive_in_payload() {
        let raw = line(
            2,
            r#"{"id": "cal", "full_name": "Supreme Court of California",
               "citation_string": "Cal.", "pacer_court_id": 12,
               "nested": {"anything": [1, 2, 3]}}"#,
        );

        let parsed = parse_line(Dataset::Courts, &raw).unwrap();
        match parsed {
            ParsedRecord::Court { payload, .. } => {
                assert_eq!(payload["citation_string"], "Cal.");
                assert_eq!(payload["pacer_court_id"], 12);
                assert_eq!(payload["nested"]["anything"][1], 2);
            },
            ParsedRecord::Judge { .. } => panic!("expected a court record"),
        }
    }

    #[test]
    fn test_malformed_line_is_a_tagged_parse_error() {
        let raw = line(17, "{not valid json");
        let err = parse_line(Dataset::Courts, &raw).unwrap_err();
        match &err {
            ImportError::Parse { line, detail } => {
                assert_eq!(*line, 17);
                assert!(detail.contains("{not valid json"));
            },
            other => panic!("expected a parse error, got {other:?}"),
        }
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_missing_identifier_is_a_parse_error() {
        let raw = line(3, r#"{"full_name": "Court Without Id"}"#);
        assert!(parse_line(Dataset::Courts, &raw).is_err());

        let raw = line(4, r#"{"id": "  ", "full_name": "Blank Id"}"#);
        assert!(parse_line(Dataset::Courts, &raw).is_err());
    }

    #[test]
    fn test_non_object_line_is_a_parse_error() {
        let raw = line(9, r#"["an", "array"]"#);
        assert!(parse_line(Dataset::Judges, &raw).is_err());
    }

    #[test]
    fn test_excerpt_is_truncated() {
        let long = "z".repeat(500);
        let raw = line(1, &long);
        let err = parse_line(Dataset::Courts, &raw).unwrap_err();
        match err {
            ImportError::Parse { detail, .. } => {
                assert!(detail.len() < 300);
                assert!(detail.contains("..."));
            },
            other => panic!("expected a parse error, got {other:?}"),
        }
    }
}
