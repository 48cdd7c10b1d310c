#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Markup dialect classification and finisher extraction.
//!
//! Every race site publishes results in one of a handful of HTML dialects.
//! [`classify`] decides which one a page uses from structural fingerprints
//! and the page's `<meta name="Author">`, then the matching extractor pulls
//! out the candidate finisher records as a [`ResultBody`].
//!
//! Missing structure is never an error here: a page without the expected
//! `<pre>` or table simply has no results. Only a document with no markup
//! at all is rejected, as [`ExtractError::MalformedDocument`].

pub mod cape_cod;
pub mod classify;
pub mod nyrr;
pub mod vanilla;

use std::sync::LazyLock;

use race_results_models::{MarkupVariant, ResultBody};
use scraper::{ElementRef, Html, Selector};

pub use classify::{Classification, ClassifierRules, SkipRule, classify};
pub use nyrr::NyrrLayout;

/// Errors that can occur while classifying or extracting a page.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    /// The page contains nothing that parses as HTML.
    #[error("Malformed document: {0}")]
    MalformedDocument(String),
}

/// How a site's pages are classified and extracted.
#[derive(Debug, Clone)]
pub enum VariantStrategy {
    /// CoolRunning family: author meta tag plus nested-table fingerprints.
    Fingerprint(ClassifierRules),
    /// BestRace: one document-level `<pre>` with a `<b><u>` banner.
    BestRace,
    /// NYRR team search results, with candidate table layouts in priority
    /// order.
    NyrrArchive(Vec<NyrrLayout>),
}

/// What came out of one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractOutcome {
    /// Candidate finisher records were found.
    Results {
        /// Dialect the page was classified as.
        variant: MarkupVariant,
        /// The extracted records.
        body: ResultBody,
    },
    /// The dialect's structure was absent, or the page reports no results.
    NoResults {
        /// Dialect the page was classified as.
        variant: MarkupVariant,
    },
    /// The page comes from a producer on the skip list.
    Skipped {
        /// The page's author meta value.
        author: String,
        /// Why pages from this producer are skipped.
        reason: String,
    },
}

/// A parsed race page.
pub struct ParsedPage {
    document: Html,
}

impl std::fmt::Debug for ParsedPage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParsedPage").finish_non_exhaustive()
    }
}

static ANY_ELEMENT: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("*").unwrap_or_else(|_| unreachable!()));

static META: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("meta").unwrap_or_else(|_| unreachable!()));

/// Elements the parser synthesizes for any input, markup or not.
const SKELETON: &[&str] = &["html", "head", "body"];

impl ParsedPage {
    /// Parses a page.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::MalformedDocument`] if `markup` is empty or
    /// contains no elements beyond the skeleton the parser synthesizes.
    pub fn parse(markup: &str) -> Result<Self, ExtractError> {
        if markup.trim().is_empty() {
            return Err(ExtractError::MalformedDocument("empty document".to_owned()));
        }

        let document = Html::parse_document(markup);
        let has_content = document
            .select(&ANY_ELEMENT)
            .any(|el| !SKELETON.contains(&el.value().name()));
        if !has_content {
            return Err(ExtractError::MalformedDocument(
                "no HTML elements found".to_owned(),
            ));
        }

        Ok(Self { document })
    }

    /// Returns the parsed document.
    #[must_use]
    pub const fn document(&self) -> &Html {
        &self.document
    }

    /// Returns the content of `<meta name="Author">`, in either attribute
    /// order and any case.
    #[must_use]
    pub fn author(&self) -> Option<String> {
        self.document
            .select(&META)
            .find(|meta| {
                meta.value()
                    .attr("name")
                    .is_some_and(|name| name.trim().eq_ignore_ascii_case("author"))
            })
            .and_then(|meta| meta.value().attr("content"))
            .map(|content| content.trim().to_owned())
    }

    /// Returns the whitespace-collapsed text of the whole document.
    #[must_use]
    pub fn text(&self) -> String {
        collapse_whitespace(&self.document.root_element().text().collect::<String>())
    }
}

/// Classifies a page and runs the matching extractor.
///
/// Pages that match no known dialect are still run through the vanilla
/// extractor, since many unclassified pages are vanilla shaped.
#[must_use]
pub fn classify_and_extract(page: &ParsedPage, strategy: &VariantStrategy) -> ExtractOutcome {
    let classification = classify(page, strategy);
    log::debug!("Classified page as {classification:?}");

    let (variant, body) = match classification {
        Classification::Skip { author, reason } => {
            log::info!("Skipping {author} page ({reason})");
            return ExtractOutcome::Skipped { author, reason };
        }
        Classification::Unrecognized { author } => {
            log::warn!(
                "Unknown pattern ({}), trying vanilla parsing",
                author.as_deref().unwrap_or("no author")
            );
            (MarkupVariant::Unknown, vanilla::extract(page))
        }
        Classification::Known(variant) => {
            let body = match variant {
                MarkupVariant::Vanilla | MarkupVariant::Unknown => vanilla::extract(page),
                MarkupVariant::BestRaceBanner => vanilla::extract_best_race(page),
                MarkupVariant::CapeCodTable => cape_cod::extract(page),
                MarkupVariant::NyrrArchive => match strategy {
                    VariantStrategy::NyrrArchive(layouts) => nyrr::extract(page, layouts),
                    _ => nyrr::extract(page, &NyrrLayout::defaults()),
                },
            };
            (variant, body)
        }
    };

    match body {
        Some(body) => ExtractOutcome::Results { variant, body },
        None => ExtractOutcome::NoResults { variant },
    }
}

/// Trimmed text content of an element.
#[must_use]
pub fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_owned()
}

/// Direct child elements of an element.
pub fn child_elements(element: ElementRef<'_>) -> impl Iterator<Item = ElementRef<'_>> {
    element.children().filter_map(ElementRef::wrap)
}

/// The `<td>`/`<th>` cells of a row.
#[must_use]
pub fn row_cells(row: ElementRef<'_>) -> Vec<ElementRef<'_>> {
    child_elements(row)
        .filter(|el| matches!(el.value().name(), "td" | "th"))
        .collect()
}

/// The rows that belong to `table` itself, not to tables nested inside it.
#[must_use]
pub fn table_rows(table: ElementRef<'_>) -> Vec<ElementRef<'_>> {
    let mut rows = Vec::new();
    for child in child_elements(table) {
        match child.value().name() {
            "tr" => rows.push(child),
            "thead" | "tbody" | "tfoot" => {
                rows.extend(child_elements(child).filter(|el| el.value().name() == "tr"));
            }
            _ => {}
        }
    }
    rows
}

/// Collapses runs of whitespace into single spaces and trims.
#[must_use]
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
