//! Fragment rendering.
//!
//! Every fragment has the same shape:
//!
//! ```text
//! <div class="race">
//!   <hr class="race_header" />
//!   header        h1/h2, the cleaned <title>, or NYRR race metadata
//!   provenance    "Complete results here on <Site>." or a courtesy line
//!   body          <pre class="actual_results"> or a <table>
//! </div>
//! ```

use std::sync::LazyLock;

use race_results_models::{
    ArchiveTable, FinisherRecord, MarkupVariant, PageMetadata, ResultBody, ResultFragment, Site,
    TableRow,
};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::RenderError;
use crate::markup::{
    escape_attr, escape_bare_ampersands, escape_text, is_well_formed, normalize_fragment,
};

static TITLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("title").unwrap_or_else(|_| unreachable!()));

static H1: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h1").unwrap_or_else(|_| unreachable!()));

static H2: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h2").unwrap_or_else(|_| unreachable!()));

static TR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("tr").unwrap_or_else(|_| unreachable!()));

static ANCHOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a").unwrap_or_else(|_| unreachable!()));

/// A BestRace title: the race name, then ` - Month D, YYYY`.
static DATED_TITLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^\s*(?P<title>.*?)\s*-\s+\w*\s\d+,\s+\d{4}\s*$")
        .unwrap_or_else(|_| unreachable!())
});

/// Renders one race's matched results as a `<div class="race">` fragment.
///
/// `document` is the page the results were extracted from; the race
/// header is read from it.
///
/// # Errors
///
/// Returns [`RenderError::UnparseableTemplate`] if the header elements for
/// the page's site are missing, if a `<pre>` dialect that always carries a
/// banner has none, or if NYRR race metadata is missing.
pub fn render(
    document: &Html,
    metadata: &PageMetadata,
    body: &ResultBody,
) -> Result<ResultFragment, RenderError> {
    let mut html = String::from(r#"<div class="race"><hr class="race_header" />"#);

    match body {
        ResultBody::Archive(table) => {
            html.push_str(&archive_header(table)?);
            html.push_str(&provenance(metadata));
            html.push_str(&archive_table(table)?);
        }
        ResultBody::Preformatted { banner, records } => {
            html.push_str(&page_header(document, metadata.site)?);
            html.push_str(&provenance(metadata));
            html.push_str(&preformatted(metadata.variant, banner.as_deref(), records)?);
        }
        ResultBody::Table {
            header, records, ..
        } => {
            html.push_str(&page_header(document, metadata.site)?);
            html.push_str(&provenance(metadata));
            html.push_str(&table(header, records));
        }
    }

    html.push_str("</div>");
    Ok(ResultFragment { html })
}

/// Race name and date from the page itself.
fn page_header(document: &Html, site: Site) -> Result<String, RenderError> {
    match site {
        Site::BestRace => {
            let title = document
                .select(&TITLE)
                .next()
                .map(|el| el.text().collect::<String>())
                .ok_or_else(|| RenderError::UnparseableTemplate("no <title> element".to_owned()))?;
            let name = race_name_from_title(&title).ok_or_else(|| {
                RenderError::UnparseableTemplate(format!("no date in title {title:?}"))
            })?;
            Ok(format!("<h1>{}</h1>", escape_text(name)))
        }
        Site::CoolRunning | Site::Nyrr => {
            let first_text = |selector: &Selector| {
                document
                    .select(selector)
                    .next()
                    .map(|el| el.text().collect::<String>().trim().to_owned())
            };
            let (Some(h1), Some(h2)) = (first_text(&H1), first_text(&H2)) else {
                return Err(RenderError::UnparseableTemplate(
                    "could not find H1/H2 tags".to_owned(),
                ));
            };
            Ok(format!(
                "<h1>{}</h1><h2>{}</h2>",
                escape_text(&h1),
                escape_text(&h2)
            ))
        }
    }
}

/// Strips the ` - Month D, YYYY` suffix from a BestRace page title.
#[must_use]
pub fn race_name_from_title(title: &str) -> Option<&str> {
    DATED_TITLE
        .captures(title)
        .and_then(|caps| caps.name("title"))
        .map(|m| m.as_str())
}

/// Link back to the source page, or the site's courtesy line.
fn provenance(metadata: &PageMetadata) -> String {
    if let Some(courtesy) = &metadata.courtesy {
        return format!(
            r#"<div class="provenance"><span>Results courtesy of </span><a href="{}">{}</a><span>.</span></div>"#,
            escape_attr(&courtesy.url),
            escape_text(&courtesy.name),
        );
    }

    metadata.source_url.as_deref().map_or_else(String::new, |url| {
        format!(
            r#"<p><span>Complete results </span><a href="{}">here</a><span> on {}.</span></p>"#,
            escape_attr(url),
            escape_text(&metadata.source_label),
        )
    })
}

fn preformatted(
    variant: MarkupVariant,
    banner: Option<&str>,
    records: &[FinisherRecord],
) -> Result<String, RenderError> {
    let needs_banner = matches!(
        variant,
        MarkupVariant::Vanilla | MarkupVariant::BestRaceBanner
    );
    if needs_banner && banner.is_none() {
        return Err(RenderError::UnparseableTemplate(format!(
            "no result banner in {variant} page"
        )));
    }

    let mut text = String::new();
    if let Some(banner) = banner {
        text.push_str(banner);
        if !banner.ends_with('\n') {
            text.push('\n');
        }
    }
    let lines = records
        .iter()
        .map(|record| match record {
            FinisherRecord::Line(line) => line.clone(),
            FinisherRecord::Row(row) => escape_text(&row.cells.join(" ")),
        })
        .collect::<Vec<_>>();
    text.push_str(&lines.join("\n"));
    text.push('\n');

    let mut text = escape_bare_ampersands(&text);
    if !is_well_formed(&text) {
        log::debug!("Result lines are not balanced markup, normalizing");
        text = normalize_fragment(&text);
    }

    // The parser drops one newline right after <pre>.
    Ok(format!("<pre class=\"actual_results\">\n{text}</pre>"))
}

fn table(header: &TableRow, records: &[FinisherRecord]) -> String {
    let mut html = String::from("<table>");
    html.push_str(&header.html);
    for record in records {
        match record {
            FinisherRecord::Row(row) => html.push_str(&row.html),
            FinisherRecord::Line(line) => {
                html.push_str(&format!("<tr><td>{}</td></tr>", escape_bare_ampersands(line)));
            }
        }
    }
    html.push_str("</table>");
    html
}

/// NYRR race description: name, date and place, as they appeared.
fn archive_header(table: &ArchiveTable) -> Result<String, RenderError> {
    if table.metadata.is_empty() {
        return Err(RenderError::UnparseableTemplate(
            "no NYRR race metadata".to_owned(),
        ));
    }
    Ok(format!("<div>{}</div>", table.metadata.concat()))
}

/// The NYRR results table with the sort links stripped from its header.
fn archive_table(table: &ArchiveTable) -> Result<String, RenderError> {
    let Some((header, rows)) = table.rows.split_first() else {
        return Err(RenderError::UnparseableTemplate(
            "empty NYRR results table".to_owned(),
        ));
    };

    let mut html = String::from(r#"<table cellpadding="3" cellspacing="0" border="1">"#);
    html.push_str(&sanitize_header(header));
    for row in rows {
        html.push_str(row);
    }
    html.push_str("</table>");
    Ok(html)
}

/// Rebuilds the header row with plain text in place of the first two
/// cells' sort links.
fn sanitize_header(row: &str) -> String {
    let fragment = Html::parse_fragment(&format!("<table>{row}</table>"));
    let Some(tr) = fragment.select(&TR).next() else {
        return row.to_owned();
    };

    let mut html = String::from(r##"<tr bgcolor="#EEEEEE">"##);
    let cells = tr
        .children()
        .filter_map(ElementRef::wrap)
        .filter(|el| matches!(el.value().name(), "td" | "th"));
    for (index, cell) in cells.enumerate() {
        if index < 2 {
            let text = cell
                .select(&ANCHOR)
                .next()
                .unwrap_or(cell)
                .text()
                .collect::<String>();
            html.push_str(&format!("<td>{}</td>", escape_text(text.trim())));
        } else {
            html.push_str(&cell.html());
        }
    }
    html.push_str("</tr>");
    html
}

#[cfg(test)]
mod tests {
    use race_results_models::Courtesy;

    use super::*;

    fn metadata(site: Site, variant: MarkupVariant, url: Option<&str>) -> PageMetadata {
        PageMetadata {
            site,
            variant,
            source_url: url.map(str::to_owned),
            source_label: "Coolrunning".to_owned(),
            courtesy: None,
        }
    }

    fn lines(lines: &[&str]) -> Vec<FinisherRecord> {
        lines
            .iter()
            .map(|l| FinisherRecord::Line((*l).to_owned()))
            .collect()
    }

    const COOLRUNNING_PAGE: &str = "<html><body><h1>3rd Annual Turkey Trot</h1>\
        <h2>Plymouth, MA - November 24, 2012</h2><pre></pre></body></html>";

    #[test]
    fn renders_preformatted_fragment_with_header_and_provenance() {
        let document = Html::parse_document(COOLRUNNING_PAGE);
        let body = ResultBody::Preformatted {
            banner: Some("Place Name                  Ag S City\n".to_owned()),
            records: lines(&[
                "   1 Sean Spalding         34 M Plymouth MA",
                "  10 Caleb Gartner         28 M Duxbury MA",
            ]),
        };
        let fragment = render(
            &document,
            &metadata(
                Site::CoolRunning,
                MarkupVariant::Vanilla,
                Some("http://www.coolrunning.com/results/12/ma/Nov24_Turkey.shtml"),
            ),
            &body,
        )
        .unwrap();
        let html = fragment.as_str();

        assert!(html.starts_with(r#"<div class="race"><hr class="race_header" /><h1>3rd Annual Turkey Trot</h1>"#));
        assert!(html.contains("<h2>Plymouth, MA - November 24, 2012</h2>"));
        assert!(html.contains(
            r#"<a href="http://www.coolrunning.com/results/12/ma/Nov24_Turkey.shtml">here</a><span> on Coolrunning.</span>"#
        ));
        assert!(html.contains("<pre class=\"actual_results\">\nPlace Name"));
        assert!(html.contains("Sean Spalding"));
        assert!(html.contains("Caleb Gartner"));
        assert!(is_well_formed(html));
    }

    #[test]
    fn local_pages_have_no_provenance_link() {
        let document = Html::parse_document(COOLRUNNING_PAGE);
        let body = ResultBody::Preformatted {
            banner: None,
            records: lines(&["  1 Sean Spalding"]),
        };
        let fragment = render(
            &document,
            &metadata(Site::CoolRunning, MarkupVariant::Unknown, None),
            &body,
        )
        .unwrap();
        assert!(!fragment.as_str().contains("Complete results"));
    }

    #[test]
    fn bare_ampersands_are_escaped() {
        let document = Html::parse_document(COOLRUNNING_PAGE);
        let body = ResultBody::Preformatted {
            banner: Some("Banner\n".to_owned()),
            records: lines(&["  1 Pat O'Leary & Co&nbsp;Team"]),
        };
        let fragment = render(
            &document,
            &metadata(Site::CoolRunning, MarkupVariant::Vanilla, None),
            &body,
        )
        .unwrap();
        assert!(fragment.as_str().contains("Pat O'Leary &amp; Co&nbsp;Team"));
        assert!(is_well_formed(fragment.as_str()));
    }

    #[test]
    fn missing_headings_are_unparseable() {
        let document = Html::parse_document("<html><body><h1>Only h1</h1></body></html>");
        let body = ResultBody::Preformatted {
            banner: Some("Banner\n".to_owned()),
            records: lines(&["  1 Sean Spalding"]),
        };
        let result = render(
            &document,
            &metadata(Site::CoolRunning, MarkupVariant::Vanilla, None),
            &body,
        );
        assert!(matches!(result, Err(RenderError::UnparseableTemplate(_))));
    }

    #[test]
    fn vanilla_without_banner_is_unparseable() {
        let document = Html::parse_document(COOLRUNNING_PAGE);
        let body = ResultBody::Preformatted {
            banner: None,
            records: lines(&["  1 Sean Spalding"]),
        };
        let result = render(
            &document,
            &metadata(Site::CoolRunning, MarkupVariant::Vanilla, None),
            &body,
        );
        assert!(matches!(result, Err(RenderError::UnparseableTemplate(_))));
    }

    #[test]
    fn best_race_title_loses_its_date() {
        assert_eq!(
            race_name_from_title("  Viking 5K     - December 2, 2012   "),
            Some("Viking 5K")
        );
        assert_eq!(
            race_name_from_title("Run-For-Fun 10K - May 5, 2012"),
            Some("Run-For-Fun 10K")
        );
        assert_eq!(race_name_from_title("No date here"), None);
    }

    #[test]
    fn best_race_fragment_uses_title() {
        let document = Html::parse_document(
            "<html><head><title>  Viking 5K     - December 2, 2012   </title></head>\
             <body><pre></pre></body></html>",
        );
        let body = ResultBody::Preformatted {
            banner: Some("<b>           VIKING 5K\n<u>PLACE NAME   TIME</u></b>".to_owned()),
            records: lines(&["   2 MICHAEL CARR     17:30"]),
        };
        let mut meta = metadata(
            Site::BestRace,
            MarkupVariant::BestRaceBanner,
            Some("http://www.bestrace.com/results/12/121202VIKIN.HTM"),
        );
        meta.source_label = "BestRace".to_owned();
        let fragment = render(&document, &meta, &body).unwrap();
        let html = fragment.as_str();
        assert!(html.contains("<h1>Viking 5K</h1>"));
        assert!(html.contains("<u>PLACE NAME   TIME</u></b>\n   2 MICHAEL CARR"));
        assert!(html.contains("on BestRace."));
        assert!(is_well_formed(html));
    }

    #[test]
    fn renders_header_row_ahead_of_matched_rows() {
        let document = Html::parse_document(COOLRUNNING_PAGE);
        let header = TableRow {
            cells: vec!["Place".to_owned(), "Name".to_owned(), "Time".to_owned()],
            html: "<tr><td>Place</td><td>Name</td><td>Time</td></tr>".to_owned(),
        };
        let norton = FinisherRecord::Row(TableRow {
            cells: vec!["2".to_owned(), "MIKE NORTON".to_owned(), "16:02".to_owned()],
            html: "<tr><td>2</td><td>MIKE NORTON</td><td>16:02</td></tr>".to_owned(),
        });
        let body = ResultBody::Table {
            header,
            name_column: 1,
            records: vec![norton],
        };
        let fragment = render(
            &document,
            &metadata(Site::CoolRunning, MarkupVariant::CapeCodTable, None),
            &body,
        )
        .unwrap();

        let reparsed = Html::parse_fragment(fragment.as_str());
        let rows = reparsed
            .select(&TR)
            .map(|tr| tr.text().collect::<String>())
            .collect::<Vec<_>>();
        assert_eq!(rows, vec!["PlaceNameTime", "2MIKE NORTON16:02"]);
    }

    #[test]
    fn nyrr_table_is_sanitized_and_credited() {
        let document = Html::parse_document("<html><body></body></html>");
        let table = ArchiveTable {
            metadata: vec![
                r#"<span class="race">Joe Kleinerman 10K</span>"#.to_owned(),
                "<br>".to_owned(),
                r#"<span class="date">December 15, 2012</span>"#.to_owned(),
                r#"<span class="place">Central Park, NY</span>"#.to_owned(),
            ],
            rows: vec![
                r#"<tr><td><a href="?sort=last">Last Name</a></td><td><a href="?sort=first">First Name</a></td><td>Time</td></tr>"#.to_owned(),
                "<tr><td>Petit</td><td>Ron</td><td>45:10</td></tr>".to_owned(),
            ],
        };
        let meta = PageMetadata {
            site: Site::Nyrr,
            variant: MarkupVariant::NyrrArchive,
            source_url: Some("http://web2.nyrrc.org/cgi-bin/htmlos.cgi/x".to_owned()),
            source_label: "NYRR".to_owned(),
            courtesy: Some(Courtesy {
                name: "New York Road Runners".to_owned(),
                url: "http://www.nyrr.org".to_owned(),
            }),
        };
        let fragment = render(&document, &meta, &ResultBody::Archive(table)).unwrap();
        let html = fragment.as_str();

        assert!(html.contains("Joe Kleinerman 10K"));
        assert!(html.contains(
            r#"<span>Results courtesy of </span><a href="http://www.nyrr.org">New York Road Runners</a>"#
        ));
        assert!(!html.contains("Complete results"));
        assert!(html.contains(
            r##"<tr bgcolor="#EEEEEE"><td>Last Name</td><td>First Name</td><td>Time</td></tr>"##
        ));
        assert!(!html.contains("?sort="));
        assert!(html.contains("<td>Petit</td>"));
    }

    #[test]
    fn nyrr_without_metadata_is_unparseable() {
        let document = Html::parse_document("<html><body></body></html>");
        let table = ArchiveTable {
            metadata: vec![],
            rows: vec!["<tr><td>a</td></tr>".to_owned(), "<tr><td>b</td></tr>".to_owned()],
        };
        let meta = metadata(Site::Nyrr, MarkupVariant::NyrrArchive, None);
        assert!(matches!(
            render(&document, &meta, &ResultBody::Archive(table)),
            Err(RenderError::UnparseableTemplate(_))
        ));
    }
}
