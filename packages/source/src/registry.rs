//! Site registry: loads every site definition from embedded TOML configs.
//!
//! Each `.toml` file in `packages/source/sites/` is baked into the binary
//! at compile time via [`include_str!`].

use crate::SourceError;
use crate::site_def::{SiteDefinition, parse_site_toml};

/// TOML configs embedded at compile time.
const SITE_TOMLS: &[(&str, &str)] = &[
    ("bestrace", include_str!("../sites/bestrace.toml")),
    ("coolrunning", include_str!("../sites/coolrunning.toml")),
    ("nyrr", include_str!("../sites/nyrr.toml")),
];

/// Total number of configured sites (used in tests).
#[cfg(test)]
const EXPECTED_SITE_COUNT: usize = 3;

/// Returns all configured site definitions, parsed from embedded TOML.
///
/// # Errors
///
/// Returns [`SourceError::Config`] naming the first config that fails to
/// parse.
pub fn all_sites() -> Result<Vec<SiteDefinition>, SourceError> {
    SITE_TOMLS
        .iter()
        .map(|(name, toml)| {
            parse_site_toml(toml)
                .map_err(|e| SourceError::Config(format!("Failed to parse {name}.toml: {e}")))
        })
        .collect()
}

/// Returns the definition with the given id.
///
/// # Errors
///
/// Returns [`SourceError::Config`] if no site has that id or a config is
/// malformed.
pub fn site_by_id(id: &str) -> Result<SiteDefinition, SourceError> {
    all_sites()?
        .into_iter()
        .find(|site| site.id == id)
        .ok_or_else(|| SourceError::Config(format!("Unknown site: {id}")))
}
