//! CoolRunning crawl.
//!
//! Each state has a yearly index page (`/results/<yy>/<state>.shtml`)
//! linking every race file as `/results/<yy>/<state>/<Mon><day>_<name>.shtml`.
//! Large races are split across several files (`..._set1.shtml`,
//! `..._set2.shtml`), linked from each other as `./<base><n>.shtml`.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use chrono::{Datelike, NaiveDate};
use race_results_scraper::{Session, resolve_against};
use regex::Regex;
use scraper::{Html, Selector};

use super::{dedup_in_order, file_name_of};
use crate::pipeline::{RunContext, fetch_and_process};
use crate::site_def::fill_template;
use crate::{DateWindow, RunSummary};

static ANCHOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").unwrap_or_else(|_| unreachable!()));

/// Crawls every state's index for each year the window touches.
pub fn crawl(
    ctx: &RunContext<'_>,
    session: &Session,
    window: &DateWindow,
    index_url: &str,
    states: &[String],
) -> RunSummary {
    let mut summary = RunSummary::default();
    let mut total = 0_u64;

    for year in window.years() {
        for state in states {
            let url = fill_template(index_url, year, Some(state));
            let path = ctx
                .work_dir
                .join(format!("{state}{:02}.shtml", year.rem_euclid(100)));

            let index = match session.fetch_to_file(&url, None, &path) {
                Ok(index) => index,
                Err(e) => {
                    log::error!("Failed to download state index {url}: {e}");
                    summary.failed_page();
                    continue;
                }
            };

            let links = race_links(&index, year, state, window);
            log::info!("{} {state} races in {year} fall in the window", links.len());
            total += links.len() as u64;
            ctx.progress.set_total(total);

            for (link, race_date) in links {
                match session.resolve(&link) {
                    Ok(race_url) => crawl_race(ctx, session, &race_url, race_date, &mut summary),
                    Err(e) => {
                        log::error!("Skipping race link {link}: {e}");
                        summary.failed_page();
                    }
                }
            }
        }
    }

    summary
}

/// Processes a race file, then the other files of the same race.
fn crawl_race(
    ctx: &RunContext<'_>,
    session: &Session,
    race_url: &str,
    race_date: NaiveDate,
    summary: &mut RunSummary,
) {
    let file_name = file_name_of(race_url);
    let Some(page) = fetch_and_process(ctx, session, race_url, None, &file_name, race_date, summary)
    else {
        return;
    };

    for secondary_url in secondary_links(&page.markup, race_url) {
        let file_name = file_name_of(&secondary_url);
        fetch_and_process(ctx, session, &secondary_url, None, &file_name, race_date, summary);
    }
}

/// Race links in a state index for the window's days in `year`, each with
/// its race day.
#[must_use]
pub fn race_links(
    index: &str,
    year: i32,
    state: &str,
    window: &DateWindow,
) -> Vec<(String, NaiveDate)> {
    let days = window
        .days_in_year(year)
        .map(|day| (format!("{}{}", day.format("%b"), day.day()), day))
        .collect::<BTreeMap<_, _>>();
    if days.is_empty() {
        return Vec::new();
    }

    let pattern = format!(
        r#"/results/{:02}/{}/(?P<day>{})_[^"'\s<>]*\.shtml"#,
        year.rem_euclid(100),
        regex::escape(state),
        days.keys().map(String::as_str).collect::<Vec<_>>().join("|")
    );
    log::debug!("Race link pattern is {pattern}");
    let Ok(regex) = Regex::new(&pattern) else {
        log::warn!("Could not build race link pattern for {state}");
        return Vec::new();
    };

    let links = regex.captures_iter(index).filter_map(|caps| {
        let day = days.get(&caps["day"])?;
        Some((caps[0].to_owned(), *day))
    });
    dedup_in_order(links)
}

/// Links from a race file to the other files of the same race.
///
/// For `Jan16_Coloni_set1.shtml` these are anchors `./Jan16_Coloni_set<n>.shtml`,
/// excluding the file itself.
#[must_use]
pub fn secondary_links(markup: &str, race_url: &str) -> Vec<String> {
    let file_name = file_name_of(race_url);
    let Some(stem) = file_name.strip_suffix(".shtml") else {
        return Vec::new();
    };
    let mut base = stem.chars();
    base.next_back();
    let base = base.as_str();
    if base.is_empty() {
        return Vec::new();
    }

    let Ok(pattern) = Regex::new(&format!(r"^\./{}\d+\.shtml$", regex::escape(base))) else {
        return Vec::new();
    };

    let document = Html::parse_document(markup);
    let links = document
        .select(&ANCHOR)
        .filter_map(|a| a.value().attr("href"))
        .map(str::trim)
        .filter(|href| pattern.is_match(href) && href[2..] != file_name)
        .filter_map(|href| resolve_against(race_url, href).ok());

    dedup_in_order(links)
}
