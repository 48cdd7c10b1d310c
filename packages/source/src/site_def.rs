//! Config-driven race site definition.
//!
//! [`SiteDefinition`] captures everything that differs between result
//! sites: how their pages are classified, how the provenance line reads,
//! and where the crawler finds race pages. A single pipeline handles every
//! site.

use race_results_extract::{ClassifierRules, NyrrLayout, VariantStrategy};
use race_results_models::{Courtesy, Site};
use serde::Deserialize;

// ── Top-level site definition ────────────────────────────────────────────

/// A complete race site definition, loaded from an embedded TOML file.
#[derive(Debug, Clone, Deserialize)]
pub struct SiteDefinition {
    /// Unique identifier (e.g., `"coolrunning"`).
    pub id: String,
    /// Which site family this is.
    pub site: Site,
    /// Human-readable name.
    pub name: String,
    /// Base URL relative links are resolved against.
    pub base_url: String,
    /// Site name used in "Complete results here on ...".
    pub provenance_label: String,
    /// Credit line rendered instead of the provenance link.
    #[serde(default)]
    pub courtesy: Option<Courtesy>,
    /// How pages are classified and extracted.
    pub strategy: StrategyConfig,
    /// Where race pages are found.
    pub crawl: CrawlConfig,
}

impl SiteDefinition {
    /// Returns the classification/extraction strategy for this site.
    #[must_use]
    pub fn variant_strategy(&self) -> VariantStrategy {
        match &self.strategy {
            StrategyConfig::Fingerprint(rules) => VariantStrategy::Fingerprint(rules.clone()),
            StrategyConfig::BestRace => VariantStrategy::BestRace,
            StrategyConfig::NyrrArchive { layouts } => {
                VariantStrategy::NyrrArchive(layouts.clone())
            }
        }
    }
}

// ── Classification ───────────────────────────────────────────────────────

/// Which dialect strategy a site's pages are run through.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StrategyConfig {
    /// Author meta tag plus structural fingerprints.
    Fingerprint(ClassifierRules),
    /// One `<pre>` with a bold, underlined column banner.
    BestRace,
    /// NYRR team-search result tables.
    NyrrArchive {
        /// Candidate table positions, tried in order.
        #[serde(default = "NyrrLayout::defaults")]
        layouts: Vec<NyrrLayout>,
    },
}

// ── Crawling ─────────────────────────────────────────────────────────────

/// How race pages are discovered.
///
/// URL templates may contain `{yyyy}`, `{yy}` and `{state}` placeholders.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CrawlConfig {
    /// A per-state, per-year index page linking every race file.
    StateIndex {
        /// Index page template.
        index_url: String,
        /// States crawled when none are requested.
        #[serde(default)]
        default_states: Vec<String>,
    },
    /// A yearly schedule page linking every result page.
    Schedule {
        /// Schedule page template.
        schedule_url: String,
        /// Directory holding the year's result pages.
        results_url: String,
    },
    /// A results archive searched by year, then by team per event.
    TeamSearch {
        /// Archive page holding the year search form.
        archive_url: String,
        /// Event page URL, without its query string.
        event_url: String,
        /// Results requested per search.
        #[serde(default = "default_items_per_page")]
        items_per_page: u32,
    },
}

const fn default_items_per_page() -> u32 {
    500
}

/// Substitutes `{yyyy}`, `{yy}` and `{state}` in a URL template.
#[must_use]
pub fn fill_template(template: &str, year: i32, state: Option<&str>) -> String {
    let filled = template
        .replace("{yyyy}", &format!("{year:04}"))
        .replace("{yy}", &format!("{:02}", year.rem_euclid(100)));
    match state {
        Some(state) => filled.replace("{state}", state),
        None => filled,
    }
}

/// Parses a TOML string into a [`SiteDefinition`].
///
/// # Errors
///
/// Returns an error string if the TOML is invalid.
pub fn parse_site_toml(toml_str: &str) -> Result<SiteDefinition, String> {
    toml::de::from_str(toml_str).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fills_year_and_state() {
        assert_eq!(
            fill_template("http://x/results/{yy}/{state}.shtml", 2007, Some("ma")),
            "http://x/results/07/ma.shtml"
        );
        assert_eq!(
            fill_template("http://x/{yyyy}schedule.html", 2012, None),
            "http://x/2012schedule.html"
        );
    }

    #[test]
    fn nyrr_layouts_default_when_omitted() {
        let site = parse_site_toml(
            r#"
            id = "nyrr"
            site = "nyrr"
            name = "NYRR"
            base_url = "http://web2.nyrrc.org"
            provenance_label = "NYRR"

            [strategy]
            type = "nyrr_archive"

            [crawl]
            type = "team_search"
            archive_url = "http://a"
            event_url = "http://b"
            "#,
        )
        .unwrap();
        let StrategyConfig::NyrrArchive { layouts } = &site.strategy else {
            panic!("expected nyrr strategy");
        };
        assert_eq!(layouts, &NyrrLayout::defaults());
        assert!(matches!(
            site.crawl,
            CrawlConfig::TeamSearch {
                items_per_page: 500,
                ..
            }
        ));
    }

    #[test]
    fn rejects_unknown_strategy() {
        let result = parse_site_toml(
            r#"
            id = "x"
            site = "best_race"
            name = "X"
            base_url = "http://x"
            provenance_label = "X"

            [strategy]
            type = "telepathy"

            [crawl]
            type = "schedule"
            schedule_url = "a"
            results_url = "b"
            "#,
        );
        assert!(result.is_err());
    }
}
