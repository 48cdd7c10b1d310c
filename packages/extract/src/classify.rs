//! Markup dialect classification.
//!
//! For the CoolRunning family the first fingerprint present wins:
//!
//! 1. an author on the vanilla-producer allow-list,
//! 2. a Cape Cod author, or the Cape Cod nested-table path,
//! 3. exactly one `<pre>` inside three nested tables,
//! 4. an author on the skip list,
//! 5. otherwise unrecognized (the caller still tries vanilla extraction).

use std::sync::LazyLock;

use race_results_models::MarkupVariant;
use scraper::Selector;
use serde::{Deserialize, Serialize};

use crate::{ParsedPage, VariantStrategy, cape_cod, nyrr};

/// Result of classifying one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// The page uses a known dialect.
    Known(MarkupVariant),
    /// The page's producer is on the skip list; do not extract.
    Skip {
        /// The page's author meta value.
        author: String,
        /// Why pages from this producer are skipped.
        reason: String,
    },
    /// No fingerprint matched.
    Unrecognized {
        /// The page's author meta value, if it had one.
        author: Option<String>,
    },
}

impl Classification {
    /// The dialect tag for this classification.
    #[must_use]
    pub const fn variant(&self) -> MarkupVariant {
        match self {
            Self::Known(variant) => *variant,
            Self::Skip { .. } | Self::Unrecognized { .. } => MarkupVariant::Unknown,
        }
    }
}

/// Author lists that drive classification for the CoolRunning family.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifierRules {
    /// Producers whose pages are plain `<pre>` results.
    #[serde(default)]
    pub vanilla_authors: Vec<String>,
    /// Producers whose pages use the Cape Cod nested-table layout.
    #[serde(default)]
    pub cape_cod_authors: Vec<String>,
    /// Producers whose pages are known to be unparseable.
    #[serde(default)]
    pub skip: Vec<SkipRule>,
}

/// A group of producers skipped for the same reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkipRule {
    /// Author meta values, compared exactly.
    pub authors: Vec<String>,
    /// Logged when a page is skipped.
    pub reason: String,
}

impl ClassifierRules {
    fn skip_reason(&self, author: &str) -> Option<&str> {
        self.skip
            .iter()
            .find(|rule| rule.authors.iter().any(|a| a == author))
            .map(|rule| rule.reason.as_str())
    }
}

static NESTED_PRE: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("body table table table pre").unwrap_or_else(|_| unreachable!())
});

static PRE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("pre").unwrap_or_else(|_| unreachable!()));

/// Classifies a page under a site's strategy.
#[must_use]
pub fn classify(page: &ParsedPage, strategy: &VariantStrategy) -> Classification {
    match strategy {
        VariantStrategy::Fingerprint(rules) => classify_fingerprint(page, rules),
        VariantStrategy::BestRace => {
            if page.document().select(&PRE).next().is_some() {
                Classification::Known(MarkupVariant::BestRaceBanner)
            } else {
                Classification::Unrecognized {
                    author: page.author(),
                }
            }
        }
        VariantStrategy::NyrrArchive(_) => {
            if nyrr::is_archive_page(page) {
                Classification::Known(MarkupVariant::NyrrArchive)
            } else {
                Classification::Unrecognized {
                    author: page.author(),
                }
            }
        }
    }
}

fn classify_fingerprint(page: &ParsedPage, rules: &ClassifierRules) -> Classification {
    let author = page.author();
    if let Some(author) = &author {
        log::info!("Variant is {author}");
    }
    let author_in = |list: &[String]| author.as_ref().is_some_and(|a| list.contains(a));

    if author_in(&rules.vanilla_authors) {
        return Classification::Known(MarkupVariant::Vanilla);
    }

    if author_in(&rules.cape_cod_authors) || cape_cod::has_fingerprint(page) {
        return Classification::Known(MarkupVariant::CapeCodTable);
    }

    if page.document().select(&NESTED_PRE).count() == 1 {
        return Classification::Known(MarkupVariant::Vanilla);
    }

    if let Some(author) = author.as_deref()
        && let Some(reason) = rules.skip_reason(author)
    {
        return Classification::Skip {
            author: author.to_owned(),
            reason: reason.to_owned(),
        };
    }

    Classification::Unrecognized { author }
}
