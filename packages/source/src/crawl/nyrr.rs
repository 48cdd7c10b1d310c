//! NYRR crawl.
//!
//! NYRR results live behind two form posts. The archive page's year search
//! lists every event of the year with its date; each event page then has a
//! search form that, given a team code, returns only that club's finishers.
//! The cookie store of the [`Session`] carries the server-side search
//! session between the posts.

use std::sync::LazyLock;

use chrono::NaiveDate;
use race_results_scraper::{Session, tidy_markup};
use regex::Regex;

use super::post_form_action;
use crate::pipeline::{RunContext, fetch_and_process};
use crate::{DateWindow, RunSummary};

/// Form tags in the event listing, which nests them invalidly.
static FORM_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(</?)form\b").unwrap_or_else(|_| unreachable!()));

/// Team-search settings for one crawl.
#[derive(Debug, Clone, Copy)]
pub struct TeamSearch<'a> {
    /// Archive page holding the year search form.
    pub archive_url: &'a str,
    /// Event page URL, without its query string.
    pub event_url: &'a str,
    /// Team code results are restricted to.
    pub team: &'a str,
    /// Results requested per search.
    pub items_per_page: u32,
}

/// One event from the yearly listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RaceEvent {
    /// Event page URL.
    pub url: String,
    /// Event identifier from the URL.
    pub id: String,
    /// Event name as listed.
    pub name: String,
    /// Race date.
    pub date: NaiveDate,
}

/// Crawls the archive for each year the window touches.
pub fn crawl(
    ctx: &RunContext<'_>,
    session: &Session,
    window: &DateWindow,
    search: &TeamSearch<'_>,
) -> RunSummary {
    let mut summary = RunSummary::default();

    let archive_path = ctx.work_dir.join("resultsarchive.html");
    let archive = match session.fetch_to_file(search.archive_url, None, &archive_path) {
        Ok(archive) => archive,
        Err(e) => {
            log::error!("Failed to download results archive: {e}");
            summary.failed_page();
            return summary;
        }
    };

    let Some(year_search_url) = post_form_action(&archive, search.archive_url, true) else {
        log::error!("Results archive has no year search form");
        summary.failed_page();
        return summary;
    };

    let mut total = 0_u64;
    for year in window.years() {
        let year_param = year.to_string();
        let form = [
            ("NYRRYEAR", year_param.as_str()),
            ("AESTIVACVNLIST", "NYRRYEAR"),
        ];
        let listing = match session.fetch_text(&year_search_url, Some(&form)) {
            Ok(listing) => tidy_markup(&defang_forms(&listing)),
            Err(e) => {
                log::error!("Failed to list {year} events: {e}");
                summary.failed_page();
                continue;
            }
        };
        let listing_path = ctx.work_dir.join(format!("nyrrraces{year}.html"));
        if let Err(e) = std::fs::write(&listing_path, &listing) {
            log::debug!("Could not keep {}: {e}", listing_path.display());
        }

        let events = race_events(&listing, search.event_url)
            .into_iter()
            .filter(|event| {
                let keep = window.contains(event.date);
                log::info!(
                    "{} {} ({})",
                    if keep { "Keeping" } else { "Skipping" },
                    event.name,
                    event.date
                );
                keep
            })
            .collect::<Vec<_>>();
        total += events.len() as u64;
        ctx.progress.set_total(total);

        for event in &events {
            process_event(ctx, session, event, search, &mut summary);
        }
    }

    summary
}

/// Runs an event's team search and processes the result page.
fn process_event(
    ctx: &RunContext<'_>,
    session: &Session,
    event: &RaceEvent,
    search: &TeamSearch<'_>,
    summary: &mut RunSummary,
) {
    let event_page = match session.fetch_text(&event.url, None) {
        Ok(page) => page,
        Err(e) => {
            log::error!("Failed to download event {}: {e}", event.name);
            summary.failed_page();
            return;
        }
    };

    let Some(search_url) = post_form_action(&event_page, &event.url, false) else {
        log::warn!("Unable to find the team search form for {}", event.name);
        summary.failed_page();
        return;
    };

    let items = search.items_per_page.to_string();
    let form = team_search_form(search.team, &items);
    let file_name = format!("nyrr_{}.html", event.id);
    fetch_and_process(
        ctx,
        session,
        &search_url,
        Some(&form),
        &file_name,
        event.date,
        summary,
    );
}

/// Form fields of a team-scoped event search.
#[must_use]
pub fn team_search_form<'a>(team: &'a str, items_per_page: &'a str) -> Vec<(&'a str, &'a str)> {
    vec![
        ("search.method", "search.team"),
        ("input.lname", ""),
        ("input.fname", ""),
        ("input.bib", ""),
        ("overalltype", "All"),
        ("input.agegroup.m", "12 to 19"),
        ("input.agegroup.f", "12 to 19"),
        ("teamgender", ""),
        ("team_code", team),
        ("items.display", items_per_page),
        (
            "AESTIVACVNLIST",
            "overalltype,input.agegroup.m,input.agegroup.f,teamgender,team_code",
        ),
    ]
}

/// Turns `<form>` tags into `<div>`s.
#[must_use]
pub fn defang_forms(markup: &str) -> String {
    FORM_TAG.replace_all(markup, "${1}div").into_owned()
}

/// Events in a tidied yearly listing: an anchor to the event page followed
/// by an `MM/DD/YY` date.
#[must_use]
pub fn race_events(listing: &str, event_url: &str) -> Vec<RaceEvent> {
    let pattern = format!(
        r#"(?s)<a\s+href="(?P<url>{}\?result\.id=(?P<id>[0-9A-Za-z]*)&amp;result\.year=\d{{4}})"[^>]*>(?P<name>.*?)</a>\s*(?P<month>\d\d)/(?P<day>\d\d)/(?P<year>\d\d)"#,
        regex::escape(event_url)
    );
    let Ok(regex) = Regex::new(&pattern) else {
        log::warn!("Could not build event pattern for {event_url}");
        return Vec::new();
    };

    regex
        .captures_iter(listing)
        .filter_map(|caps| {
            let number = |name: &str| caps.name(name)?.as_str().parse::<u32>().ok();
            let year = i32::try_from(number("year")?).ok()? + 2000;
            let Some(date) = NaiveDate::from_ymd_opt(year, number("month")?, number("day")?)
            else {
                log::debug!("Ignoring event with impossible date: {}", &caps[0]);
                return None;
            };
            Some(RaceEvent {
                url: caps["url"].replace("&amp;", "&"),
                id: caps["id"].to_owned(),
                name: race_results_extract::collapse_whitespace(&caps["name"]),
                date,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const EVENT_URL: &str = "http://web2.nyrrc.org/cgi-bin/start.cgi/aes-programs/results/startup.html";

    #[test]
    fn lists_events_with_dates() {
        let listing = format!(
            r#"<html><body><table><tr><td>
            <a href="{EVENT_URL}?result.id=b21215&amp;result.year=2012">
                Joe Kleinerman 10K
            </a> 12/15/12<br>
            <a href="{EVENT_URL}?result.id=b21208&amp;result.year=2012">Ted Corbitt 15K</a>
            12/08/12<br>
            <a href="http://elsewhere/?result.id=x&amp;result.year=2012">Other</a> 12/01/12
            </td></tr></table></body></html>"#
        );
        let events = race_events(&listing, EVENT_URL);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].name, "Joe Kleinerman 10K");
        assert_eq!(events[0].id, "b21215");
        assert_eq!(events[0].date, NaiveDate::from_ymd_opt(2012, 12, 15).unwrap());
        assert_eq!(
            events[0].url,
            format!("{EVENT_URL}?result.id=b21215&result.year=2012")
        );
        assert_eq!(events[1].date, NaiveDate::from_ymd_opt(2012, 12, 8).unwrap());
    }

    #[test]
    fn impossible_dates_are_ignored() {
        let listing =
            format!(r#"<a href="{EVENT_URL}?result.id=a&amp;result.year=2012">Bad</a> 13/45/12"#);
        assert!(race_events(&listing, EVENT_URL).is_empty());
    }

    #[test]
    fn forms_become_divs() {
        assert_eq!(
            defang_forms(r#"<FORM name="x" method=post><p>information</p></form>"#),
            r#"<div name="x" method=post><p>information</p></div>"#
        );
    }

    #[test]
    fn team_search_is_scoped_to_the_team() {
        let form = team_search_form("RARI", "500");
        assert!(form.contains(&("team_code", "RARI")));
        assert!(form.contains(&("items.display", "500")));
        assert!(form.contains(&("search.method", "search.team")));
    }
}
