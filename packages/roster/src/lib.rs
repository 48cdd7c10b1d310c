#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Club roster loading and finisher name matching.
//!
//! A [`Roster`] holds one [`NamePredicate`] per club member. A finisher
//! record matches the roster when *some* member's first and last name both
//! appear in it as whole words.

pub mod loader;

use race_results_models::{FinisherRecord, ResultBody, RosterEntry};
use regex::{Regex, RegexBuilder};

pub use loader::{RosterError, load_roster};

/// Word-bounded, case-insensitive patterns for one member's names.
///
/// Both patterns must match the same candidate text. A lone last name is
/// never enough ("Ed Ford" must not match everyone from "New Bedford").
#[derive(Debug, Clone)]
pub struct NamePredicate {
    first: Regex,
    last: Regex,
}

impl NamePredicate {
    /// Builds the predicate for a roster entry.
    ///
    /// Names are wrapped in `\b` anchors as-is. A name that is not a valid
    /// pattern on its own (stray parenthesis, etc.) is matched literally
    /// instead.
    #[must_use]
    pub fn new(entry: &RosterEntry) -> Self {
        Self {
            first: name_pattern(&entry.first_name),
            last: name_pattern(&entry.last_name),
        }
    }

    /// Returns `true` if both names occur in `text`.
    #[must_use]
    pub fn matches(&self, text: &str) -> bool {
        self.first.is_match(text) && self.last.is_match(text)
    }
}

fn name_pattern(name: &str) -> Regex {
    let raw = format!(r"\b{name}\b");
    build_case_insensitive(&raw).unwrap_or_else(|e| {
        log::warn!("Name {name:?} is not a valid pattern ({e}), matching it literally");
        let escaped = format!(r"\b{}\b", regex::escape(name));
        build_case_insensitive(&escaped).unwrap_or_else(|_| unreachable!())
    })
}

fn build_case_insensitive(pattern: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(pattern).case_insensitive(true).build()
}

/// Builds one predicate per roster entry.
#[must_use]
pub fn build_predicates(entries: &[RosterEntry]) -> Vec<NamePredicate> {
    entries.iter().map(NamePredicate::new).collect()
}

/// The full set of club-member predicates for a run.
#[derive(Debug, Clone, Default)]
pub struct Roster {
    predicates: Vec<NamePredicate>,
}

impl Roster {
    /// Compiles predicates for every entry.
    #[must_use]
    pub fn new(entries: &[RosterEntry]) -> Self {
        Self {
            predicates: build_predicates(entries),
        }
    }

    /// Number of members on the roster.
    #[must_use]
    pub fn len(&self) -> usize {
        self.predicates.len()
    }

    /// Returns `true` if the roster has no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    /// Returns `true` if any member's names both occur in `text`.
    #[must_use]
    pub fn matches_text(&self, text: &str) -> bool {
        self.predicates.iter().any(|p| p.matches(text))
    }

    /// Matches a record, using the cell at `name_column` for table rows.
    #[must_use]
    pub fn matches_record(&self, record: &FinisherRecord, name_column: usize) -> bool {
        record
            .candidate_text(name_column)
            .is_some_and(|text| !text.trim().is_empty() && self.matches_text(text))
    }

    /// Keeps the records of `records` that match, in their original order.
    #[must_use]
    pub fn filter_records(
        &self,
        records: Vec<FinisherRecord>,
        name_column: usize,
    ) -> Vec<FinisherRecord> {
        records
            .into_iter()
            .filter(|record| self.matches_record(record, name_column))
            .collect()
    }

    /// Reduces an extracted body to the roster's members.
    ///
    /// Archive bodies pass through untouched: the search that produced them
    /// was already scoped to the club.
    #[must_use]
    pub fn filter_body(&self, body: ResultBody) -> ResultBody {
        match body {
            ResultBody::Preformatted { banner, records } => ResultBody::Preformatted {
                banner,
                records: self.filter_records(records, 0),
            },
            ResultBody::Table {
                header,
                name_column,
                records,
            } => ResultBody::Table {
                header,
                name_column,
                records: self.filter_records(records, name_column),
            },
            archive @ ResultBody::Archive(_) => archive,
        }
    }
}
