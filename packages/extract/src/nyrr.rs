//! NYRR team-search result extraction.
//!
//! A result page is a stack of layout tables. One of them describes the
//! race (name, date, location) and a later one holds the results, whose
//! header row links every column for sorting. Which indices those are has
//! drifted across site revisions, so the positions are tried from a list of
//! [`NyrrLayout`] candidates.

use std::sync::LazyLock;

use race_results_models::{ArchiveTable, ResultBody};
use scraper::{ElementRef, Selector};
use serde::{Deserialize, Serialize};

use crate::{ParsedPage, child_elements, row_cells, table_rows};

/// Text NYRR prints when the team search matched nobody.
pub const NO_MATCH_MARKER: &str = "Your search returns no match.";

/// Index of the cell holding the race description in the metadata table.
const METADATA_CELL: usize = 2;

/// Number of race-description elements carried into the report.
const METADATA_ELEMENTS: usize = 4;

/// Minimum number of tables on a result page.
const MIN_TABLES: usize = 3;

static TABLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("table").unwrap_or_else(|_| unreachable!()));

static TD: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("td").unwrap_or_else(|_| unreachable!()));

static ANCHOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a").unwrap_or_else(|_| unreachable!()));

/// Positions (in document order, nested tables included) of the metadata
/// and results tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NyrrLayout {
    /// Index of the table describing the race.
    pub metadata_table: usize,
    /// Index of the table holding the results.
    pub results_table: usize,
}

impl NyrrLayout {
    /// Known layouts, newest first.
    #[must_use]
    pub fn defaults() -> Vec<Self> {
        vec![
            Self {
                metadata_table: 1,
                results_table: 3,
            },
            Self {
                metadata_table: 0,
                results_table: 2,
            },
        ]
    }
}

/// Returns `true` if the page is a team-search result page, with or
/// without results.
#[must_use]
pub fn is_archive_page(page: &ParsedPage) -> bool {
    reports_no_match(page) || page.document().select(&TABLE).count() >= MIN_TABLES
}

/// Returns `true` if NYRR says the search matched nobody.
#[must_use]
pub fn reports_no_match(page: &ParsedPage) -> bool {
    page.text().contains(NO_MATCH_MARKER)
}

/// Extracts the metadata and results tables.
///
/// Returns `None` if the page reports no match, has too few tables, or no
/// candidate layout fits.
#[must_use]
pub fn extract(page: &ParsedPage, layouts: &[NyrrLayout]) -> Option<ResultBody> {
    if reports_no_match(page) {
        log::info!("Search returned no match");
        return None;
    }

    let tables = page.document().select(&TABLE).collect::<Vec<_>>();
    if tables.len() < MIN_TABLES {
        log::debug!("Only {} tables on the page", tables.len());
        return None;
    }

    let Some(layout) = detect_layout(&tables, layouts) else {
        log::warn!("No NYRR table layout fits this page ({} tables)", tables.len());
        return None;
    };
    log::debug!("Using NYRR layout {layout:?}");

    let metadata = tables[layout.metadata_table]
        .select(&TD)
        .nth(METADATA_CELL)
        .map(|td| {
            child_elements(td)
                .take(METADATA_ELEMENTS)
                .map(|el| el.html())
                .collect()
        })
        .unwrap_or_default();

    let rows = table_rows(tables[layout.results_table])
        .into_iter()
        .map(|tr| tr.html())
        .collect();

    Some(ResultBody::Archive(ArchiveTable { metadata, rows }))
}

/// Picks the first layout whose results table has a linked header row.
#[must_use]
pub fn detect_layout(tables: &[ElementRef<'_>], layouts: &[NyrrLayout]) -> Option<NyrrLayout> {
    layouts.iter().copied().find(|layout| {
        layout.metadata_table < tables.len()
            && tables
                .get(layout.results_table)
                .is_some_and(|table| has_linked_header(*table))
    })
}

/// The first two header cells of a sortable results table are links.
fn has_linked_header(table: ElementRef<'_>) -> bool {
    let Some(header) = table_rows(table).into_iter().next() else {
        return false;
    };
    let cells = row_cells(header);
    cells.len() >= 2
        && cells[..2]
            .iter()
            .all(|cell| cell.select(&ANCHOR).next().is_some())
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESULT_PAGE: &str = r##"<html><body>
        <table><tr><td>NYRR logo</td></tr></table>
        <table><tr><td>nav</td><td>spacer</td><td>
            <span class="race">Joe Kleinerman 10K</span><br>
            <span class="date">December 15, 2012</span>
            <span class="place">Central Park, NY</span>
            <span class="extra">ignored</span>
        </td></tr></table>
        <table><tr><td>search again</td></tr></table>
        <table>
            <tr><td><a href="?sort=last">Last Name</a></td><td><a href="?sort=first">First Name</a></td><td>Time</td></tr>
            <tr><td>Petit</td><td>Ron</td><td>45:10</td></tr>
        </table>
    </body></html>"##;

    #[test]
    fn extracts_metadata_and_results_tables() {
        let page = ParsedPage::parse(RESULT_PAGE).unwrap();
        let Some(ResultBody::Archive(table)) = extract(&page, &NyrrLayout::defaults()) else {
            panic!("expected archive body");
        };
        assert_eq!(table.metadata.len(), 4);
        assert!(table.metadata[0].contains("Joe Kleinerman 10K"));
        assert!(table.metadata[1].starts_with("<br"));
        assert_eq!(table.rows.len(), 2);
        assert!(table.rows[1].contains("Petit"));
    }

    #[test]
    fn falls_back_to_older_layout() {
        let markup = r##"<html><body>
            <table><tr><td>a</td><td>b</td><td><h3>Race</h3><p>Date</p></td></tr></table>
            <table><tr><td>search</td></tr></table>
            <table>
                <tr><td><a href="#">Last</a></td><td><a href="#">First</a></td></tr>
                <tr><td>Petit</td><td>Ron</td></tr>
            </table>
        </body></html>"##;
        let page = ParsedPage::parse(markup).unwrap();
        let tables = page.document().select(&TABLE).collect::<Vec<_>>();
        assert_eq!(
            detect_layout(&tables, &NyrrLayout::defaults()),
            Some(NyrrLayout {
                metadata_table: 0,
                results_table: 2
            })
        );
    }

    #[test]
    fn no_match_marker_means_no_results() {
        let markup = "<html><body><table><tr><td>x</td></tr></table>\
            <font color=red>Your search returns\n   no match.</font></body></html>";
        let page = ParsedPage::parse(markup).unwrap();
        assert!(is_archive_page(&page));
        assert_eq!(extract(&page, &NyrrLayout::defaults()), None);
    }

    #[test]
    fn too_few_tables_means_no_results() {
        let page = ParsedPage::parse("<html><body><table><tr><td>x</td></tr></table></body></html>")
            .unwrap();
        assert!(!is_archive_page(&page));
        assert_eq!(extract(&page, &NyrrLayout::defaults()), None);
    }
}
