//! BestRace crawl.
//!
//! The yearly schedule (`/<yyyy>schedule.html`) links each result page as
//! `/results/<yy>/<yy><mm><dd><NAME>.HTM`, so the race date is part of the
//! URL.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use race_results_scraper::Session;
use regex::Regex;

use super::{dedup_in_order, file_name_of};
use crate::pipeline::{RunContext, fetch_and_process};
use crate::site_def::fill_template;
use crate::{DateWindow, RunSummary};

/// Crawls the schedule of each year the window touches.
pub fn crawl(
    ctx: &RunContext<'_>,
    session: &Session,
    window: &DateWindow,
    schedule_url: &str,
    results_url: &str,
) -> RunSummary {
    let mut summary = RunSummary::default();
    let mut total = 0_u64;

    for year in window.years() {
        let url = fill_template(schedule_url, year, None);
        let path = ctx.work_dir.join(file_name_of(&url));
        let schedule = match session.fetch_to_file(&url, None, &path) {
            Ok(schedule) => schedule,
            Err(e) => {
                log::error!("Failed to download schedule {url}: {e}");
                summary.failed_page();
                continue;
            }
        };

        let links = race_links(&schedule, &fill_template(results_url, year, None), window, year);
        log::info!("{} BestRace races in {year} fall in the window", links.len());
        total += links.len() as u64;
        ctx.progress.set_total(total);

        for (link, race_date) in links {
            let file_name = file_name_of(&link);
            fetch_and_process(ctx, session, &link, None, &file_name, race_date, &mut summary);
        }
    }

    summary
}

/// Result page URLs in a schedule for the window's days in `year`, each
/// with its race day.
#[must_use]
pub fn race_links(
    schedule: &str,
    results_dir: &str,
    window: &DateWindow,
    year: i32,
) -> Vec<(String, NaiveDate)> {
    let days = window
        .days_in_year(year)
        .map(|day| (day.format("%y%m%d").to_string(), day))
        .collect::<BTreeMap<_, _>>();
    if days.is_empty() {
        return Vec::new();
    }

    let pattern = format!(
        r"{}(?P<day>{})\w+\.HTM",
        regex::escape(results_dir),
        days.keys().map(String::as_str).collect::<Vec<_>>().join("|")
    );
    log::debug!("Race link pattern is {pattern}");
    let Ok(regex) = Regex::new(&pattern) else {
        log::warn!("Could not build race link pattern for {year}");
        return Vec::new();
    };

    let links = regex.captures_iter(schedule).filter_map(|caps| {
        let day = days.get(&caps["day"])?;
        Some((caps[0].to_owned(), *day))
    });
    dedup_in_order(links)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCHEDULE: &str = r#"<html><body><table>
        <tr><td>12/01</td><td><a href="http://www.bestrace.com/results/12/121201JINGL.HTM">Jingle Bell Run</a></td></tr>
        <tr><td>12/02</td><td><a href="http://www.bestrace.com/results/12/121202VIKIN.HTM">Viking 5K</a></td></tr>
        <tr><td>12/02</td><td><a href="http://www.bestrace.com/results/12/121202VIKIN.HTM">Viking 5K (photos)</a></td></tr>
        <tr><td>12/09</td><td><a href="http://www.bestrace.com/results/12/121209HOLLY.HTM">Holly Jolly</a></td></tr>
        <tr><td>12/09</td><td><a href="http://www.bestrace.com/results/12/121209HOLLY.pdf">Holly Jolly PDF</a></td></tr>
        </table></body></html>"#;

    #[test]
    fn finds_result_pages_inside_the_window() {
        let window = DateWindow::new(
            NaiveDate::from_ymd_opt(2012, 12, 2).unwrap(),
            NaiveDate::from_ymd_opt(2012, 12, 9).unwrap(),
        )
        .unwrap();
        let links = race_links(
            SCHEDULE,
            "http://www.bestrace.com/results/12/",
            &window,
            2012,
        );
        let urls = links.iter().map(|(url, _)| url.as_str()).collect::<Vec<_>>();
        assert_eq!(
            urls,
            vec![
                "http://www.bestrace.com/results/12/121202VIKIN.HTM",
                "http://www.bestrace.com/results/12/121209HOLLY.HTM",
            ]
        );
        assert_eq!(links[1].1, NaiveDate::from_ymd_opt(2012, 12, 9).unwrap());
    }
}
