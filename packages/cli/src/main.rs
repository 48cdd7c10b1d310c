#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for compiling club race results.
//!
//! Each site subcommand crawls that site for races inside a date window and
//! appends the club's finishers to one HTML report. `local` runs already
//! downloaded pages through the same pipeline.

use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use race_results_cli_utils::{IndicatifProgress, LevelFilter, MultiProgress, init_logger};
use race_results_roster::{Roster, load_roster};
use race_results_scraper::{Session, SessionConfig};
use race_results_source::crawl::{CrawlOptions, crawl};
use race_results_source::pipeline::{RunContext, compile_local_results};
use race_results_source::registry::{all_sites, site_by_id};
use race_results_source::{DateWindow, RunSummary};

#[derive(Parser)]
#[command(name = "race_results", about = "Compile club members' race results")]
struct Cli {
    /// Log debug output (ignored when `RUST_LOG` is set)
    #[arg(long, short, global = true, conflicts_with = "quiet")]
    verbose: bool,
    /// Only log warnings and errors (ignored when `RUST_LOG` is set)
    #[arg(long, short, global = true)]
    quiet: bool,
    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    const fn log_level(&self) -> LevelFilter {
        if self.verbose {
            LevelFilter::Debug
        } else if self.quiet {
            LevelFilter::Warn
        } else {
            LevelFilter::Info
        }
    }
}

/// Settings every run needs.
#[derive(Args)]
struct ReportArgs {
    /// Membership list, one `last,first` member per line
    #[arg(long)]
    members: PathBuf,
    /// HTML report to create
    #[arg(long)]
    output: PathBuf,
    /// Stylesheet linked from the report
    #[arg(long, default_value = "rr.css")]
    stylesheet: String,
}

/// Settings for crawling a site.
#[derive(Args)]
struct CrawlArgs {
    #[command(flatten)]
    report: ReportArgs,
    /// First race day to include (YYYY-MM-DD)
    #[arg(long)]
    start: NaiveDate,
    /// Last race day to include (YYYY-MM-DD)
    #[arg(long)]
    stop: NaiveDate,
    /// Directory downloaded pages are stored in
    #[arg(long, default_value = ".")]
    work_dir: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Crawl the BestRace schedule
    Bestrace {
        #[command(flatten)]
        args: CrawlArgs,
    },
    /// Crawl `CoolRunning` state indexes
    Coolrunning {
        #[command(flatten)]
        args: CrawlArgs,
        /// Comma-separated state codes (e.g., "ma,ri"). Defaults to the
        /// site's configured states.
        #[arg(long)]
        states: Option<String>,
    },
    /// Search the NYRR results archive for one team
    Nyrr {
        #[command(flatten)]
        args: CrawlArgs,
        /// Team code the search is restricted to (e.g., "RARI")
        #[arg(long)]
        team: String,
    },
    /// Run already downloaded race pages through the pipeline
    Local {
        #[command(flatten)]
        report: ReportArgs,
        /// File listing one race page path per line
        #[arg(long)]
        race_list: PathBuf,
        /// Site whose rules apply to the pages (e.g., "coolrunning")
        #[arg(long, default_value = "coolrunning")]
        site: String,
    },
    /// List the configured sites
    Sites,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let multi = init_logger(cli.log_level());

    let start = Instant::now();
    let summary = match cli.command {
        Commands::Sites => {
            println!("{:<14} {:<14} BASE URL", "ID", "NAME");
            println!("{}", "-".repeat(60));
            for site in all_sites()? {
                println!("{:<14} {:<14} {}", site.id, site.name, site.base_url);
            }
            return Ok(());
        }
        Commands::Bestrace { args } => {
            run_crawl(&multi, "bestrace", &args, &CrawlOptions::default())?
        }
        Commands::Coolrunning { args, states } => {
            let options = CrawlOptions {
                states: split_list(states.as_deref()),
                team: None,
            };
            run_crawl(&multi, "coolrunning", &args, &options)?
        }
        Commands::Nyrr { args, team } => {
            let options = CrawlOptions {
                states: Vec::new(),
                team: Some(team),
            };
            run_crawl(&multi, "nyrr", &args, &options)?
        }
        Commands::Local {
            report,
            race_list,
            site,
        } => {
            let site = site_by_id(&site)?;
            let roster = prepare_report(&report)?;
            let work_dir = Path::new(".");
            let ctx = RunContext::new(&site, &roster, &report.output, work_dir).with_progress(
                IndicatifProgress::pages_bar(&multi, "Reading race list"),
            );
            compile_local_results(&ctx, &race_list)?
        }
    };

    log::info!(
        "Finished in {:.1}s: {summary}",
        start.elapsed().as_secs_f64()
    );
    Ok(())
}

/// Validates the run's inputs, then crawls the site.
fn run_crawl(
    multi: &MultiProgress,
    site_id: &str,
    args: &CrawlArgs,
    options: &CrawlOptions,
) -> Result<RunSummary, Box<dyn std::error::Error>> {
    let site = site_by_id(site_id)?;
    let window = DateWindow::new(args.start, args.stop)?;
    let roster = prepare_report(&args.report)?;

    std::fs::create_dir_all(&args.work_dir)?;
    let session = Session::new(SessionConfig::default().with_base_url(&site.base_url))?;

    let ctx = RunContext::new(&site, &roster, &args.report.output, &args.work_dir)
        .with_progress(IndicatifProgress::pages_bar(
            multi,
            &format!("Reading {} listings", site.name),
        ));
    Ok(crawl(&ctx, &session, &window, options)?)
}

/// Loads the roster and creates an empty report.
fn prepare_report(report: &ReportArgs) -> Result<Roster, Box<dyn std::error::Error>> {
    let entries = load_roster(&report.members)?;
    if entries.is_empty() {
        log::warn!("{} lists no members", report.members.display());
    }
    let roster = Roster::new(&entries);

    race_results_report::initialize(&report.output, &report.stylesheet)?;
    log::info!("Writing results to {}", report.output.display());
    Ok(roster)
}

/// Splits a comma-separated option into trimmed, non-empty values.
fn split_list(value: Option<&str>) -> Vec<String> {
    value
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_lowercase)
        .collect()
}
