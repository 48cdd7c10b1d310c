//! Cape Cod Road Runners table extraction.
//!
//! These pages wrap the results table four tables deep:
//!
//! ```text
//! body/table/tr/td/table/tr/td/table/tr/td/div/table/tr
//! ```
//!
//! The first row of the innermost table is the column header; the runner's
//! name is in the second cell of every data row.

use std::sync::LazyLock;

use race_results_models::{FinisherRecord, ResultBody, TableRow};
use scraper::{ElementRef, Selector};

use crate::{ParsedPage, element_text, row_cells};

/// Column holding the runner's full name.
pub const NAME_COLUMN: usize = 1;

/// Minimum number of cells in a data row.
const MIN_CELLS: usize = 3;

static RESULT_ROWS: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(
        "body > table > tbody > tr > td > table > tbody > tr > td > table > tbody > tr > td \
         > div > table > tbody > tr",
    )
    .unwrap_or_else(|_| unreachable!())
});

/// Returns `true` if the page has the Cape Cod nested-table path.
#[must_use]
pub fn has_fingerprint(page: &ParsedPage) -> bool {
    page.document().select(&RESULT_ROWS).next().is_some()
}

/// Extracts the result rows.
///
/// Returns `None` if the nested-table path is absent.
#[must_use]
pub fn extract(page: &ParsedPage) -> Option<ResultBody> {
    let mut rows = page.document().select(&RESULT_ROWS);
    let header = to_table_row(rows.next()?);

    let records = rows
        .filter_map(|tr| {
            let row = to_table_row(tr);
            let qualifies = row.cells.len() >= MIN_CELLS
                && row.cells.get(NAME_COLUMN).is_some_and(|name| !name.is_empty());
            qualifies.then_some(FinisherRecord::Row(row))
        })
        .collect::<Vec<_>>();

    log::debug!("Found {} Cape Cod result rows", records.len());

    Some(ResultBody::Table {
        header,
        name_column: NAME_COLUMN,
        records,
    })
}

fn to_table_row(tr: ElementRef<'_>) -> TableRow {
    TableRow {
        cells: row_cells(tr).into_iter().map(element_text).collect(),
        html: tr.html(),
    }
}
