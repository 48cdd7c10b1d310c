//! Preformatted (`<pre>`) result extraction.
//!
//! Most timing companies paste a fixed-width text dump into a single
//! `<pre>` block: a few banner lines (race name, column headings), then one
//! line per finisher starting with the overall place.

use std::sync::LazyLock;

use race_results_models::{FinisherRecord, ResultBody};
use regex::Regex;
use scraper::{ElementRef, Selector};

use crate::{ParsedPage, child_elements};

static NESTED_PRE: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("body table table table pre").unwrap_or_else(|_| unreachable!())
});

static PRE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("pre").unwrap_or_else(|_| unreachable!()));

static BOLD: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("b").unwrap_or_else(|_| unreachable!()));

/// First place: leading whitespace, then a lone `1`.
static FIRST_PLACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*1\b").unwrap_or_else(|_| unreachable!()));

/// Extracts the lines of the results `<pre>`.
///
/// The block under the nested-table path is preferred; otherwise the first
/// `<pre>` in the document is used. Returns `None` if there is no `<pre>`.
#[must_use]
pub fn extract(page: &ParsedPage) -> Option<ResultBody> {
    let document = page.document();
    let pre = document
        .select(&NESTED_PRE)
        .next()
        .or_else(|| document.select(&PRE).next())?;

    let lines = pre_lines(pre);
    let (banner, records) = match split_banner(&lines) {
        Some((banner, rest)) => (Some(banner), rest.to_vec()),
        None => (None, lines),
    };

    Some(ResultBody::Preformatted {
        banner,
        records: records.into_iter().map(FinisherRecord::Line).collect(),
    })
}

/// Extracts a BestRace page: every line of the document's `<pre>`, with the
/// `<b>…<u>…</u></b>` column heading as the banner.
#[must_use]
pub fn extract_best_race(page: &ParsedPage) -> Option<ResultBody> {
    let document = page.document();
    let pre = document.select(&PRE).next()?;

    Some(ResultBody::Preformatted {
        banner: best_race_banner(page),
        records: pre_lines(pre).into_iter().map(FinisherRecord::Line).collect(),
    })
}

/// The first `<b>` element with a `<u>` child, serialized.
#[must_use]
pub fn best_race_banner(page: &ParsedPage) -> Option<String> {
    page.document()
        .select(&BOLD)
        .find(|b| child_elements(*b).any(|child| child.value().name() == "u"))
        .map(|b| b.html())
}

/// Splits a block's lines into the banner and the lines from first place
/// onward.
///
/// The banner is every line before the first line matching `^\s*1\b`, each
/// followed by a newline. Returns `None` if no line looks like first place.
#[must_use]
pub fn split_banner(lines: &[String]) -> Option<(String, &[String])> {
    let first = lines.iter().position(|line| FIRST_PLACE.is_match(line))?;
    let banner = lines[..first]
        .iter()
        .map(|line| format!("{line}\n"))
        .collect::<String>();
    Some((banner, &lines[first..]))
}

/// The serialized content of a `<pre>`, one entry per line.
fn pre_lines(pre: ElementRef<'_>) -> Vec<String> {
    pre.inner_html()
        .lines()
        .map(|line| line.trim_end_matches('\r').to_owned())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const VANILLA: &str = "<html><head><title>3rd Annual Turkey Trot</title></head><body>\
        <h1>3rd Annual Turkey Trot</h1><h2>Plymouth, MA - November 24, 2012</h2>\
        <table><tr><td><table><tr><td><table><tr><td><pre>\n\
        \x20                   3rd Annual Turkey Trot 5K\n\
        Place Name                  Ag S City            Time\n\
        \x20  1 Sean Spalding         34 M Plymouth MA    16:01\n\
        \x20  2 Pat O'Leary & Co      40 M Kingston MA    16:40\n\
        \x20 10 Caleb Gartner         28 M Duxbury MA     18:12\n\
        </pre></td></tr></table></td></tr></table></td></tr></table></body></html>";

    #[test]
    fn splits_banner_from_results() {
        let page = ParsedPage::parse(VANILLA).unwrap();
        let Some(ResultBody::Preformatted { banner, records }) = extract(&page) else {
            panic!("expected preformatted body");
        };
        let banner = banner.unwrap();
        assert!(banner.contains("3rd Annual Turkey Trot 5K"));
        assert!(banner.contains("Place Name"));
        assert!(!banner.contains("Spalding"));
        assert_eq!(records.len(), 3);
        assert!(matches!(&records[0], FinisherRecord::Line(l) if l.contains("Sean Spalding")));
        assert!(matches!(&records[1], FinisherRecord::Line(l) if l.contains("&amp; Co")));
    }

    #[test]
    fn place_ten_does_not_end_the_banner() {
        let lines = vec![
            " 10K Road Race".to_owned(),
            "   1 Winner".to_owned(),
        ];
        let (banner, rest) = split_banner(&lines).unwrap();
        assert_eq!(banner, " 10K Road Race\n");
        assert_eq!(rest.len(), 1);
    }

    #[test]
    fn block_without_first_place_has_no_banner() {
        let page =
            ParsedPage::parse("<html><body><pre>just text\nmore text</pre></body></html>").unwrap();
        let Some(ResultBody::Preformatted { banner, records }) = extract(&page) else {
            panic!("expected preformatted body");
        };
        assert_eq!(banner, None);
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn page_without_pre_has_no_results() {
        let page = ParsedPage::parse("<html><body><p>Results coming soon</p></body></html>").unwrap();
        assert_eq!(extract(&page), None);
    }

    #[test]
    fn best_race_banner_is_bold_underline() {
        let page = ParsedPage::parse(
            "<html><head><title>  Viking 5K     - December 2, 2012   </title></head><body><pre>\
             <b>                 VIKING 5K\n<u>PLACE NAME            TIME</u></b>\n\
             \x20  1 MARK STRAWN      17:01\n\
             \x20  2 MICHAEL CARR     17:30\n</pre></body></html>",
        )
        .unwrap();
        let Some(ResultBody::Preformatted { banner, records }) = extract_best_race(&page) else {
            panic!("expected preformatted body");
        };
        let banner = banner.unwrap();
        assert!(banner.starts_with("<b>"));
        assert!(banner.contains("<u>PLACE NAME"));
        assert!(records
            .iter()
            .any(|r| matches!(r, FinisherRecord::Line(l) if l.contains("MARK STRAWN"))));
    }
}
