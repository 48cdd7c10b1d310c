//! HTML tidying.
//!
//! Race pages are hand-edited or exported from spreadsheets, so they are
//! re-serialised through the HTML5 parser once on download. Unclosed
//! elements get closed, bare `&` becomes `&amp;` and stray end tags
//! disappear, which lets the structural lookups downstream assume clean
//! markup.

use std::path::Path;

use scraper::Html;

use crate::{ScrapeError, decode_body};

/// Returns `markup` re-serialised as well-formed HTML.
#[must_use]
pub fn tidy_markup(markup: &str) -> String {
    Html::parse_document(markup).html()
}

/// Tidies the HTML file at `path` in place and returns the tidied markup.
///
/// # Errors
///
/// Returns [`ScrapeError::Io`] if the file cannot be read or written.
pub fn tidy(path: &Path) -> Result<String, ScrapeError> {
    let markup = decode_body(std::fs::read(path)?);
    let tidied = tidy_markup(&markup);
    std::fs::write(path, tidied.as_bytes())?;
    log::debug!("Tidied {}", path.display());
    Ok(tidied)
}
