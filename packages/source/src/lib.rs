#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Race site definitions, crawlers and the shared result pipeline.
//!
//! Every site runs the same pipeline per page (tidy, classify, extract,
//! filter by roster, render, append); what differs is captured by its
//! [`SiteDefinition`](site_def::SiteDefinition), loaded from embedded TOML
//! by the [`registry`]. The [`crawl`] module discovers race pages for a
//! date window and feeds them through [`pipeline::process_page`].

pub mod crawl;
pub mod pipeline;
pub mod progress;
pub mod registry;
pub mod site_def;

use chrono::{Datelike, NaiveDate};
use race_results_extract::ExtractError;
use race_results_models::MarkupVariant;
use race_results_report::{RenderError, ReportError};
use race_results_roster::RosterError;
use race_results_scraper::ScrapeError;

/// Errors that can occur while crawling or processing a page.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Fetching a page failed.
    #[error(transparent)]
    Scrape(#[from] ScrapeError),

    /// The page could not be parsed at all.
    #[error(transparent)]
    Extract(#[from] ExtractError),

    /// The page lacks an element its dialect guarantees.
    #[error(transparent)]
    Render(#[from] RenderError),

    /// The output document could not be updated.
    #[error(transparent)]
    Report(#[from] ReportError),

    /// The roster could not be loaded.
    #[error(transparent)]
    Roster(#[from] RosterError),

    /// I/O error (file read/write).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid site definition or run configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// What happened to one race page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageOutcome {
    /// A fragment was appended to the report.
    Appended {
        /// Dialect the page was classified as.
        variant: MarkupVariant,
        /// Number of matched finisher records.
        records: usize,
    },
    /// Results were found but no roster member was among them.
    NoMatch {
        /// Dialect the page was classified as.
        variant: MarkupVariant,
    },
    /// The page had no results to filter.
    NoResults {
        /// Dialect the page was classified as.
        variant: MarkupVariant,
    },
    /// The page's producer is on the skip list.
    Skipped {
        /// The page's author meta value.
        author: String,
        /// Why pages from this producer are skipped.
        reason: String,
    },
}

/// Per-run page counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Pages run through the pipeline, including failures.
    pub pages: u64,
    /// Fragments appended to the report.
    pub appended: u64,
    /// Pages whose results matched nobody on the roster.
    pub no_match: u64,
    /// Pages without results.
    pub no_results: u64,
    /// Pages from skip-listed producers.
    pub skipped: u64,
    /// Pages that failed to fetch, parse or render.
    pub failed: u64,
}

impl RunSummary {
    /// Counts one page's result, logging failures. Never aborts the run.
    pub fn record(&mut self, what: &str, result: Result<PageOutcome, SourceError>) {
        self.pages += 1;
        match result {
            Ok(PageOutcome::Appended { .. }) => self.appended += 1,
            Ok(PageOutcome::NoMatch { .. }) => self.no_match += 1,
            Ok(PageOutcome::NoResults { .. }) => self.no_results += 1,
            Ok(PageOutcome::Skipped { .. }) => self.skipped += 1,
            Err(e) => {
                self.failed += 1;
                match &e {
                    SourceError::Extract(_) | SourceError::Render(_) => {
                        log::warn!("Skipping {what}: {e}");
                    }
                    _ => log::error!("Failed to process {what}: {e}"),
                }
            }
        }
    }

    /// Counts a page that failed before reaching the pipeline. The caller
    /// has already logged why.
    pub const fn failed_page(&mut self) {
        self.pages += 1;
        self.failed += 1;
    }
}

impl std::fmt::Display for RunSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} pages: {} appended, {} without club members, {} without results, \
             {} skipped, {} failed",
            self.pages, self.appended, self.no_match, self.no_results, self.skipped, self.failed
        )
    }
}

/// Inclusive range of race dates to crawl.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    start: NaiveDate,
    stop: NaiveDate,
}

impl DateWindow {
    /// Creates a window from `start` to `stop`, both included.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Config`] if `start` is after `stop`.
    pub fn new(start: NaiveDate, stop: NaiveDate) -> Result<Self, SourceError> {
        if start > stop {
            return Err(SourceError::Config(format!(
                "Start date {start} is after stop date {stop}"
            )));
        }
        Ok(Self { start, stop })
    }

    /// First day of the window.
    #[must_use]
    pub const fn start(&self) -> NaiveDate {
        self.start
    }

    /// Last day of the window.
    #[must_use]
    pub const fn stop(&self) -> NaiveDate {
        self.stop
    }

    /// Returns `true` if `date` falls inside the window.
    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.stop
    }

    /// Every day of the window, in order.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.start.iter_days().take_while(|day| *day <= self.stop)
    }

    /// Every day of the window that falls in `year`.
    pub fn days_in_year(&self, year: i32) -> impl Iterator<Item = NaiveDate> + '_ {
        self.days().filter(move |day| day.year() == year)
    }

    /// Every calendar year the window touches.
    #[must_use]
    pub fn years(&self) -> std::ops::RangeInclusive<i32> {
        self.start.year()..=self.stop.year()
    }
}
