//! The per-page pipeline shared by every site.
//!
//! ```text
//! markup -> parse -> classify/extract -> roster filter -> render -> append
//! ```
//!
//! A page that yields no roster matches never reaches the renderer, so the
//! report only ever grows by non-empty fragments.

use std::path::Path;
use std::sync::Arc;

use chrono::NaiveDate;
use race_results_extract::{ExtractOutcome, ParsedPage, VariantStrategy, classify_and_extract};
use race_results_models::{PageMetadata, RacePage};
use race_results_roster::Roster;
use race_results_scraper::{Session, decode_body, tidy, tidy_markup};

use crate::progress::{ProgressCallback, null_progress};
use crate::site_def::SiteDefinition;
use crate::{PageOutcome, RunSummary, SourceError};

/// Everything a run needs besides the pages themselves.
pub struct RunContext<'a> {
    /// The site whose strategy applies.
    pub site: &'a SiteDefinition,
    /// Club members to report on.
    pub roster: &'a Roster,
    /// The cumulative output document.
    pub output: &'a Path,
    /// Where downloaded pages are stored.
    pub work_dir: &'a Path,
    /// Receives per-page progress.
    pub progress: Arc<dyn ProgressCallback>,
    strategy: VariantStrategy,
}

impl<'a> RunContext<'a> {
    /// Creates a run context with silent progress.
    #[must_use]
    pub fn new(
        site: &'a SiteDefinition,
        roster: &'a Roster,
        output: &'a Path,
        work_dir: &'a Path,
    ) -> Self {
        Self {
            site,
            roster,
            output,
            work_dir,
            progress: null_progress(),
            strategy: site.variant_strategy(),
        }
    }

    /// Reports progress to `progress`.
    #[must_use]
    pub fn with_progress(mut self, progress: Arc<dyn ProgressCallback>) -> Self {
        self.progress = progress;
        self
    }
}

/// Runs one page through classification, extraction, roster filtering,
/// rendering and appending.
///
/// # Errors
///
/// Returns [`SourceError::Extract`] if the page is not HTML,
/// [`SourceError::Render`] if it lacks an element its dialect guarantees,
/// or [`SourceError::Report`] if the output document cannot be updated.
pub fn process_page(ctx: &RunContext<'_>, page: &RacePage) -> Result<PageOutcome, SourceError> {
    let parsed = ParsedPage::parse(&page.markup)?;

    let (variant, body) = match classify_and_extract(&parsed, &ctx.strategy) {
        ExtractOutcome::Skipped { author, reason } => {
            return Ok(PageOutcome::Skipped { author, reason });
        }
        ExtractOutcome::NoResults { variant } => {
            log::info!("No results found in {variant} page");
            return Ok(PageOutcome::NoResults { variant });
        }
        ExtractOutcome::Results { variant, body } => (variant, body),
    };

    let candidates = body.record_count();
    let matched = ctx.roster.filter_body(body);
    if matched.is_empty() {
        log::debug!("None of {candidates} results matched the roster");
        return Ok(PageOutcome::NoMatch { variant });
    }

    let metadata = PageMetadata {
        site: ctx.site.site,
        variant,
        source_url: page.url.clone(),
        source_label: ctx.site.provenance_label.clone(),
        courtesy: ctx.site.courtesy.clone(),
    };
    let fragment = race_results_report::render(parsed.document(), &metadata, &matched)?;
    race_results_report::append(ctx.output, &fragment)?;

    let records = matched.record_count();
    match page.discovered_on {
        Some(date) => log::info!("Appended {records} of {candidates} results for the {date} race"),
        None => log::info!("Appended {records} of {candidates} results"),
    }
    Ok(PageOutcome::Appended { variant, records })
}

/// Downloads a page into the work directory, tidies it, and returns it
/// ready for [`process_page`]. `race_date` is the day the listing put the
/// race on.
///
/// # Errors
///
/// Returns [`SourceError::Scrape`] if the download or the tidy fails.
pub fn download_page(
    ctx: &RunContext<'_>,
    session: &Session,
    url: &str,
    form: Option<&[(&str, &str)]>,
    file_name: &str,
    race_date: NaiveDate,
) -> Result<RacePage, SourceError> {
    let path = ctx.work_dir.join(file_name);
    session.fetch_to_file(url, form, &path)?;
    let markup = tidy(&path)?;
    Ok(RacePage::new(ctx.site.site, markup)
        .with_url(url)
        .with_discovered_on(race_date))
}

/// Downloads a page and runs it through the pipeline, recording the result
/// in `summary`. Failures are logged and counted, never returned.
///
/// Returns the downloaded page so crawlers can follow links in it.
pub fn fetch_and_process(
    ctx: &RunContext<'_>,
    session: &Session,
    url: &str,
    form: Option<&[(&str, &str)]>,
    file_name: &str,
    race_date: NaiveDate,
    summary: &mut RunSummary,
) -> Option<RacePage> {
    ctx.progress.set_message(url.to_owned());
    let page = match download_page(ctx, session, url, form, file_name, race_date) {
        Ok(page) => page,
        Err(e) => {
            summary.record(url, Err(e));
            ctx.progress.inc(1);
            return None;
        }
    };
    summary.record(url, process_page(ctx, &page));
    ctx.progress.inc(1);
    Some(page)
}

/// Runs every file named in `race_list` (one path per line) through the
/// pipeline, without provenance links.
///
/// # Errors
///
/// Returns [`SourceError::Io`] if the race list itself cannot be read.
/// Unreadable race files are logged and skipped.
pub fn compile_local_results(
    ctx: &RunContext<'_>,
    race_list: &Path,
) -> Result<RunSummary, SourceError> {
    let list = std::fs::read_to_string(race_list)?;
    let files = list
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>();

    log::info!("Compiling {} local race files", files.len());
    ctx.progress.set_total(files.len() as u64);

    let mut summary = RunSummary::default();
    for file in files {
        ctx.progress.set_message(file.to_owned());
        match std::fs::read(file) {
            Ok(bytes) => {
                let markup = tidy_markup(&decode_body(bytes));
                let page = RacePage::new(ctx.site.site, markup);
                summary.record(file, process_page(ctx, &page));
            }
            Err(e) => {
                log::debug!("Could not read {file}: {e}");
                summary.failed_page();
            }
        }
        ctx.progress.inc(1);
    }

    ctx.progress.finish(summary.to_string());
    Ok(summary)
}
