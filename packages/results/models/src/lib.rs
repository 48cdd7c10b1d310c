#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Shared types for the race results toolchain.
//!
//! Every stage of the pipeline (fetch, classify, extract, filter, render,
//! append) exchanges the types defined here, so the stage crates only
//! depend on this crate and not on each other.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// A race-result website with its own markup dialects.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Site {
    /// bestrace.com
    BestRace,
    /// coolrunning.com (including Cape Cod Road Runners pages)
    CoolRunning,
    /// New York Road Runners results archive
    Nyrr,
}

/// The markup dialect a race page was written in.
///
/// Computed per page by the classifier and never stored.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MarkupVariant {
    /// Results as lines inside a `<pre>` block.
    Vanilla,
    /// Results as rows of a table nested four tables deep.
    CapeCodTable,
    /// NYRR team-search result page.
    NyrrArchive,
    /// BestRace `<pre>` block with a `<b><u>` column banner.
    BestRaceBanner,
    /// No known fingerprint matched.
    Unknown,
}

/// A club member.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterEntry {
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
}

impl RosterEntry {
    /// Creates a new roster entry.
    #[must_use]
    pub fn new(first_name: &str, last_name: &str) -> Self {
        Self {
            first_name: first_name.trim().to_owned(),
            last_name: last_name.trim().to_owned(),
        }
    }
}

/// A fetched race page, consumed once by the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RacePage {
    /// Site whose strategy applies to this page.
    pub site: Site,
    /// URL the page was downloaded from. `None` for local files, in which
    /// case no provenance link is rendered.
    pub url: Option<String>,
    /// Date under which the crawl discovered the page.
    pub discovered_on: Option<NaiveDate>,
    /// The (tidied) document markup.
    pub markup: String,
}

impl RacePage {
    /// Creates a page for the given site from already-decoded markup.
    #[must_use]
    pub fn new(site: Site, markup: String) -> Self {
        Self {
            site,
            url: None,
            discovered_on: None,
            markup,
        }
    }

    /// Records the URL the page came from.
    #[must_use]
    pub fn with_url(mut self, url: &str) -> Self {
        self.url = Some(url.to_owned());
        self
    }

    /// Records the date under which the crawl found this page.
    #[must_use]
    pub const fn with_discovered_on(mut self, date: NaiveDate) -> Self {
        self.discovered_on = Some(date);
        self
    }
}

/// One table row: the text of every cell plus the row's original markup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRow {
    /// Trimmed text content of each `<td>`/`<th>`, in column order.
    pub cells: Vec<String>,
    /// Serialized `<tr>` element, reproduced verbatim in the output.
    pub html: String,
}

/// One finisher's result as it appeared in the source page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinisherRecord {
    /// A line of preformatted text (markup, not decoded text).
    Line(String),
    /// A structured table row.
    Row(TableRow),
}

impl FinisherRecord {
    /// Returns the text the roster should be matched against.
    ///
    /// Rows are matched on the cell at `name_column` only; a row without
    /// that column yields `None`.
    #[must_use]
    pub fn candidate_text(&self, name_column: usize) -> Option<&str> {
        match self {
            Self::Line(line) => Some(line),
            Self::Row(row) => row.cells.get(name_column).map(String::as_str),
        }
    }
}

/// The NYRR result tables, kept whole because the search that produced
/// them was already scoped to the club's team code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveTable {
    /// Serialized child elements describing the race (name, date, place).
    pub metadata: Vec<String>,
    /// Serialized `<tr>` elements of the results table; the first one is the
    /// column header row.
    pub rows: Vec<String>,
}

/// Everything an extractor produced for one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultBody {
    /// Preformatted lines plus the column banner that precedes them.
    Preformatted {
        /// Header text before the first finisher line, if located.
        banner: Option<String>,
        /// Candidate finisher lines.
        records: Vec<FinisherRecord>,
    },
    /// Structured rows plus the table's header row.
    Table {
        /// First row of the table, always emitted ahead of matched rows.
        header: TableRow,
        /// Index of the cell holding the runner's full name.
        name_column: usize,
        /// Candidate finisher rows.
        records: Vec<FinisherRecord>,
    },
    /// NYRR result tables, not filtered row by row.
    Archive(ArchiveTable),
}

impl ResultBody {
    /// Returns `true` if there are no finisher records to report.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Preformatted { records, .. } | Self::Table { records, .. } => records.is_empty(),
            Self::Archive(table) => table.rows.len() < 2,
        }
    }

    /// Returns the number of finisher records.
    #[must_use]
    pub fn record_count(&self) -> usize {
        match self {
            Self::Preformatted { records, .. } | Self::Table { records, .. } => records.len(),
            Self::Archive(table) => table.rows.len().saturating_sub(1),
        }
    }
}

/// Credit line for sites that ask for attribution instead of a link back
/// to the page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Courtesy {
    /// Organization named in the credit line.
    pub name: String,
    /// Organization home page.
    pub url: String,
}

/// What the renderer needs to know about a page besides its results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageMetadata {
    /// Site the page came from; selects how the race header is located.
    pub site: Site,
    /// Dialect the page was classified as.
    pub variant: MarkupVariant,
    /// URL the page was downloaded from, linked as "Complete results here".
    pub source_url: Option<String>,
    /// Site name used in the provenance sentence.
    pub source_label: String,
    /// Credit line rendered in place of the provenance link.
    pub courtesy: Option<Courtesy>,
}

/// Normalized HTML for one race, ready to be appended to the report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultFragment {
    /// Serialized `<div class="race">` element.
    pub html: String,
}

impl ResultFragment {
    /// Returns the fragment markup.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.html
    }
}
