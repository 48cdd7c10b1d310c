//! The cumulative output document.
//!
//! The document is plain file state: every append reads it back, adds the
//! fragment as the last child of `<body>` and rewrites it. Writes go to a
//! sibling `.tmp` file that is then renamed over the output, so an
//! interrupted run never leaves a half-written report.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use race_results_models::ResultFragment;
use scraper::{Html, Selector};

use crate::ReportError;
use crate::markup::escape_attr;
use crate::pretty::pretty_print;

static HEAD: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("head").unwrap_or_else(|_| unreachable!()));

static BODY: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("body").unwrap_or_else(|_| unreachable!()));

/// Creates the output document: a stylesheet link and an empty body.
///
/// # Errors
///
/// Returns [`ReportError::Io`] if the document cannot be written.
pub fn initialize(path: &Path, stylesheet: &str) -> Result<(), ReportError> {
    log::info!("Initializing report {}", path.display());
    let markup = format!(
        r#"<html><head><link rel="stylesheet" href="{}" type="text/css"></head><body></body></html>"#,
        escape_attr(stylesheet)
    );
    write_document(path, &Html::parse_document(&markup))
}

/// Appends a fragment to the end of the output document's `<body>`.
///
/// # Errors
///
/// Returns [`ReportError::Io`] if the document cannot be read or rewritten.
pub fn append(path: &Path, fragment: &ResultFragment) -> Result<(), ReportError> {
    let existing = std::fs::read_to_string(path).map_err(|e| ReportError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    let document = Html::parse_document(&existing);

    let inner = |selector: &Selector| {
        document
            .select(selector)
            .next()
            .map(|el| el.inner_html())
            .unwrap_or_default()
    };
    let combined = format!(
        "<html><head>{}</head><body>{}{}</body></html>",
        inner(&HEAD),
        inner(&BODY),
        fragment.as_str()
    );

    write_document(path, &Html::parse_document(&combined))?;
    log::debug!("Appended {} bytes to {}", fragment.as_str().len(), path.display());
    Ok(())
}

fn write_document(path: &Path, document: &Html) -> Result<(), ReportError> {
    let tmp_path = tmp_path(path);

    std::fs::write(&tmp_path, pretty_print(document)).map_err(|e| ReportError::Io {
        path: tmp_path.display().to_string(),
        source: e,
    })?;

    std::fs::rename(&tmp_path, path).map_err(|e| ReportError::Io {
        path: path.display().to_string(),
        source: e,
    })
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".tmp");
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "race_results_report_{name}_{}",
            std::process::id()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir.join("results.html")
    }

    fn fragment(name: &str) -> ResultFragment {
        ResultFragment {
            html: format!(
                "<div class=\"race\"><hr class=\"race_header\" /><h1>{name}</h1>\
                 <pre class=\"actual_results\">\n  1 Sean Spalding  16:01\n</pre></div>"
            ),
        }
    }

    #[test]
    fn initialize_writes_the_skeleton() {
        let path = scratch("init");
        initialize(&path, "rr.css").unwrap();
        let written = std::fs::read_to_string(&path).unwrap();

        assert!(written.contains("<link "));
        assert!(written.contains(r#"href="rr.css""#));
        assert!(written.contains(r#"rel="stylesheet""#));
        assert!(written.contains("<body>\n  </body>"));
        assert!(!tmp_path(&path).exists());
        std::fs::remove_dir_all(path.parent().unwrap()).ok();
    }

    #[test]
    fn initialize_fails_for_unwritable_path() {
        let path = std::env::temp_dir()
            .join("race_results_report_missing_dir")
            .join("nested")
            .join("results.html");
        assert!(matches!(
            initialize(&path, "rr.css"),
            Err(ReportError::Io { .. })
        ));
    }

    #[test]
    fn appends_grow_the_body_in_order() {
        let path = scratch("append");
        initialize(&path, "rr.css").unwrap();
        append(&path, &fragment("First Race")).unwrap();
        let after_first = std::fs::read_to_string(&path).unwrap();
        append(&path, &fragment("Second Race")).unwrap();
        let after_second = std::fs::read_to_string(&path).unwrap();

        let first = after_second.find("First Race").unwrap();
        let second = after_second.find("Second Race").unwrap();
        assert!(first < second);
        assert_eq!(after_second.matches("<div class=\"race\">").count(), 2);
        assert!(after_second.contains("rr.css"));

        let prefix_end = after_first.find("  </body>").unwrap();
        assert!(after_second.starts_with(&after_first[..prefix_end]));
        std::fs::remove_dir_all(path.parent().unwrap()).ok();
    }

    #[test]
    fn later_appends_keep_blank_line_at_start_of_pre() {
        let path = scratch("blank_led");
        initialize(&path, "rr.css").unwrap();
        let blank_led = ResultFragment {
            html: "<div class=\"race\"><hr class=\"race_header\" /><h1>Blank-led 5K</h1>\
                   <pre class=\"actual_results\">\n\n        Blank-led 5K\n   1 Caleb Gartner  18:12\n</pre></div>"
                .to_owned(),
        };
        append(&path, &blank_led).unwrap();
        let after_first = std::fs::read_to_string(&path).unwrap();
        let start = after_first.find("<pre").unwrap();
        let end = after_first.find("</pre>").unwrap();
        let first_pre = &after_first[start..end];
        assert!(first_pre.starts_with("<pre class=\"actual_results\">\n\n        Blank-led 5K"));

        append(&path, &fragment("Second Race")).unwrap();
        append(&path, &fragment("Third Race")).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.starts_with(&after_first[..end]));
        assert!(written.contains(first_pre));
        std::fs::remove_dir_all(path.parent().unwrap()).ok();
    }

    #[test]
    fn same_fragment_appended_twice_appears_twice() {
        let path = scratch("twice");
        initialize(&path, "rr.css").unwrap();
        append(&path, &fragment("Repeat Race")).unwrap();
        append(&path, &fragment("Repeat Race")).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written.matches("Repeat Race").count(), 2);
        std::fs::remove_dir_all(path.parent().unwrap()).ok();
    }

    #[test]
    fn append_to_missing_document_fails() {
        let path = std::env::temp_dir().join("race_results_report_absent.html");
        std::fs::remove_file(&path).ok();
        assert!(matches!(
            append(&path, &fragment("Nowhere")),
            Err(ReportError::Io { .. })
        ));
    }
}
