//! Jurisdiction filter
//!
//! A pure predicate deciding whether a parsed record belongs to the target
//! jurisdiction. No I/O, no shared mutable state: evaluation is identical
//! regardless of run order or resume state.
//!
//! Court rules are checked in precedence order, most specific first, and
//! short-circuit on the first match:
//!
//! 1. identifier begins with the configured state prefix
//! 2. identifier is in the federal-court allow-list
//! 3. jurisdiction field equals the target code
//! 4. display name contains the state name token (case-insensitive)
//! 5. location text contains the state abbreviation as a word
//!
//! A judge is included when any position, current or past, references a
//! court identifier satisfying rules 1-2. Position-derived inclusion only
//! consults the identifier rules; it never re-fetches court records.

use crate::config::JurisdictionConfig;
use crate::models::{CourtRecord, JudgeRecord, ParsedRecord};

/// Inclusion predicate for one target jurisdiction
#[derive(Debug, Clone)]
pub struct JurisdictionFilter {
    config: JurisdictionConfig,
}

impl JurisdictionFilter {
    pub fn new(config: JurisdictionConfig) -> Self {
        Self { config }
    }

    /// Whether a parsed record belongs to the target jurisdiction
    pub fn included(&self, record: &ParsedRecord) -> bool {
        match record {
            ParsedRecord::Court { record, .. } => self.court_included(record),
            ParsedRecord::Judge { record, .. } => self.judge_included(record),
        }
    }

    /// Court inclusion: any rule match wins, checked in precedence order
    pub fn court_included(&self, court: &CourtRecord) -> bool {
        if self.court_id_included(&court.id) {
            return true;
        }

        if let Some(jurisdiction) = &court.jurisdiction {
            if jurisdiction == &self.config.jurisdiction_code {
                return true;
            }
        }

        if let Some(name) = &court.full_name {
            if name
                .to_lowercase()
                .contains(&self.config.state_name.to_lowercase())
            {
                return true;
            }
        }

        if let Some(location) = &court.location {
            if contains_word(location, &self.config.state_abbreviation) {
                return true;
            }
        }

        false
    }

    /// Identifier-only rules (prefix, then federal allow-list)
    pub fn court_id_included(&self, court_id: &str) -> bool {
        if court_id.starts_with(&self.config.state_prefix) {
            return true;
        }
        self.config
            .federal_court_ids
            .iter()
            .any(|id| id == court_id)
    }

    /// Judge inclusion: any position ties them to a qualifying court
    pub fn judge_included(&self, judge: &JudgeRecord) -> bool {
        judge.positions.iter().any(|position| {
            position
                .court_id
                .as_deref()
                .is_some_and(|id| self.court_id_included(id))
        })
    }
}

/// Case-sensitive whole-word containment, splitting on non-alphanumerics
fn contains_word(text: &str, word: &str) -> bool {
    text.split(|c: char| !c.is_alphanumeric())
        .any(|token| token == word)
}
