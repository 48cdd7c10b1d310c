//! Race page discovery.
//!
//! Each site lists its races differently: CoolRunning has a per-state
//! index, BestRace a yearly schedule, and NYRR a searchable archive. The
//! crawlers find the race pages inside a [`DateWindow`] and hand each one
//! to the shared pipeline in listing order. A page that fails to download
//! or process is counted and skipped; it never ends the crawl.

pub mod bestrace;
pub mod coolrunning;
pub mod nyrr;

use std::sync::LazyLock;

use race_results_scraper::{Session, resolve_against};
use scraper::{Html, Selector};

use crate::pipeline::RunContext;
use crate::site_def::CrawlConfig;
use crate::{DateWindow, RunSummary, SourceError};

static FORM: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("form").unwrap_or_else(|_| unreachable!()));

/// Per-run crawl settings supplied on the command line.
#[derive(Debug, Clone, Default)]
pub struct CrawlOptions {
    /// States whose CoolRunning indexes are crawled. Empty means the
    /// site's defaults.
    pub states: Vec<String>,
    /// NYRR team code the search is scoped to.
    pub team: Option<String>,
}

/// Crawls the context's site for races inside `window`.
///
/// # Errors
///
/// Returns [`SourceError::Config`] if the run lacks a setting the site
/// needs (a team code for NYRR, at least one state for CoolRunning).
pub fn crawl(
    ctx: &RunContext<'_>,
    session: &Session,
    window: &DateWindow,
    options: &CrawlOptions,
) -> Result<RunSummary, SourceError> {
    log::info!(
        "Crawling {} from {} to {}",
        ctx.site.name,
        window.start(),
        window.stop()
    );

    let summary = match &ctx.site.crawl {
        CrawlConfig::StateIndex {
            index_url,
            default_states,
        } => {
            let states = if options.states.is_empty() {
                default_states
            } else {
                &options.states
            };
            if states.is_empty() {
                return Err(SourceError::Config(format!(
                    "{} needs at least one state",
                    ctx.site.name
                )));
            }
            coolrunning::crawl(ctx, session, window, index_url, states)
        }
        CrawlConfig::Schedule {
            schedule_url,
            results_url,
        } => bestrace::crawl(ctx, session, window, schedule_url, results_url),
        CrawlConfig::TeamSearch {
            archive_url,
            event_url,
            items_per_page,
        } => {
            let team = options.team.as_deref().ok_or_else(|| {
                SourceError::Config(format!("{} needs a team code", ctx.site.name))
            })?;
            let search = nyrr::TeamSearch {
                archive_url,
                event_url,
                team,
                items_per_page: *items_per_page,
            };
            nyrr::crawl(ctx, session, window, &search)
        }
    };

    ctx.progress.finish(summary.to_string());
    Ok(summary)
}

/// The last path segment of `url`, safe to use as a local file name.
#[must_use]
pub fn file_name_of(url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or_default();
    let name = path.rsplit('/').next().unwrap_or_default();
    if name.is_empty() {
        return "index.html".to_owned();
    }
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// The resolved action of the first POST form in `markup`.
///
/// With `named_only`, forms without a `name` attribute are ignored.
#[must_use]
pub fn post_form_action(markup: &str, base_url: &str, named_only: bool) -> Option<String> {
    let document = Html::parse_document(markup);
    let action = document
        .select(&FORM)
        .filter(|form| {
            form.value()
                .attr("method")
                .is_some_and(|method| method.eq_ignore_ascii_case("post"))
        })
        .find(|form| !named_only || form.value().attr("name").is_some())
        .and_then(|form| form.value().attr("action"))?;

    match resolve_against(base_url, action.trim()) {
        Ok(url) => Some(url),
        Err(e) => {
            log::warn!("Unusable form action {action:?}: {e}");
            None
        }
    }
}

/// Removes repeated entries, keeping first occurrences in order.
fn dedup_in_order<T: Ord + Clone>(items: impl IntoIterator<Item = T>) -> Vec<T> {
    let mut seen = std::collections::BTreeSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_names_come_from_the_last_segment() {
        assert_eq!(
            file_name_of("http://www.coolrunning.com/results/07/ma/Jan16_Coloni_set1.shtml"),
            "Jan16_Coloni_set1.shtml"
        );
        assert_eq!(
            file_name_of("http://x/startup.html?result.id=a1&result.year=2012"),
            "startup.html"
        );
        assert_eq!(file_name_of("http://x/"), "index.html");
    }

    #[test]
    fn finds_first_post_form() {
        let markup = r#"<html><body>
            <form method="get" action="/search"></form>
            <form method=POST action="htmlos.cgi/1234/results.html"></form>
            </body></html>"#;
        assert_eq!(
            post_form_action(markup, "http://web2.nyrrc.org/cgi-bin/start.cgi/event.html", false)
                .as_deref(),
            Some("http://web2.nyrrc.org/cgi-bin/start.cgi/htmlos.cgi/1234/results.html")
        );
    }

    #[test]
    fn named_only_skips_anonymous_forms() {
        let markup = r#"<html><body>
            <form method="post" action="/anonymous"></form>
            <form name="findyear" method="post" action="/by-year"></form>
            <form name="findrace" method="post" action="/by-race"></form>
            </body></html>"#;
        assert_eq!(
            post_form_action(markup, "http://x/archive.htm", true).as_deref(),
            Some("http://x/by-year")
        );
        assert_eq!(post_form_action("<p>no form</p>", "http://x/", false), None);
    }

    #[test]
    fn dedup_keeps_first_occurrence() {
        let items = ["b", "a", "b", "c", "a"].map(str::to_owned);
        assert_eq!(dedup_in_order(items), vec!["b", "a", "c"]);
    }
}
