#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! HTTP session and page normalisation for race result sites.
//!
//! A [`Session`] is the per-run fetch context: one blocking
//! [`reqwest`] client with a persistent cookie store (the NYRR search flow
//! is session based), a fixed browser user agent (some sites refuse
//! unknown clients), and the base URL relative links are resolved against.
//!
//! [`tidy`] re-serialises a downloaded page as well-formed HTML before any
//! structural lookups run against it.

pub mod retry;
pub mod tidy;

use std::path::Path;
use std::time::Duration;

pub use tidy::{tidy, tidy_markup};

/// Browser identity sent with every request.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_6_8) \
     AppleWebKit/535.19 (KHTML, like Gecko) Chrome/18.0.1025.45 Safari/535.19";

/// Errors that can occur while fetching or storing pages.
#[derive(Debug, thiserror::Error)]
pub enum ScrapeError {
    /// An HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("HTTP {status} for {url}")]
    Status {
        /// Response status code.
        status: reqwest::StatusCode,
        /// The requested URL.
        url: String,
    },

    /// A URL could not be parsed or resolved.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Settings for a [`Session`].
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// User agent sent with every request.
    pub user_agent: String,
    /// Base URL used to resolve relative links.
    pub base_url: Option<String>,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Retries for transient failures.
    pub max_retries: u32,
    /// Pause before every request.
    pub delay: Option<Duration>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            base_url: None,
            timeout: Duration::from_secs(60),
            max_retries: 3,
            delay: None,
        }
    }
}

impl SessionConfig {
    /// Sets the base URL for relative links.
    #[must_use]
    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = Some(url.to_owned());
        self
    }

    /// Overrides the user agent.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: &str) -> Self {
        user_agent.clone_into(&mut self.user_agent);
        self
    }

    /// Sets the per-request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the number of retries for transient failures.
    #[must_use]
    pub const fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Sets a pause taken before every request.
    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

/// Per-run fetch context shared by every request of a crawl.
#[derive(Debug, Clone)]
pub struct Session {
    client: reqwest::blocking::Client,
    config: SessionConfig,
}

impl Session {
    /// Builds the session's HTTP client.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError::Http`] if the client cannot be constructed.
    pub fn new(config: SessionConfig) -> Result<Self, ScrapeError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(config.user_agent.clone())
            .cookie_store(true)
            .timeout(config.timeout)
            .build()?;
        Ok(Self { client, config })
    }

    /// Returns the session settings.
    #[must_use]
    pub const fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Resolves `href` against the session's base URL.
    ///
    /// Absolute URLs are returned unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError::InvalidUrl`] if `href` is relative and there is
    /// no usable base URL.
    pub fn resolve(&self, href: &str) -> Result<String, ScrapeError> {
        if let Ok(url) = reqwest::Url::parse(href) {
            return Ok(url.to_string());
        }
        let base = self
            .config
            .base_url
            .as_deref()
            .ok_or_else(|| ScrapeError::InvalidUrl(format!("{href} (no base URL)")))?;
        resolve_against(base, href)
    }

    /// Fetches a page, as a GET, or as a url-encoded form POST when `form` is
    /// given.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError`] if the request fails after all retries or the
    /// server answers with an error status.
    pub fn fetch_page(
        &self,
        url: &str,
        form: Option<&[(&str, &str)]>,
    ) -> Result<Vec<u8>, ScrapeError> {
        if let Some(delay) = self.config.delay {
            std::thread::sleep(delay);
        }

        log::debug!(
            "{} {url}",
            if form.is_some() { "POST" } else { "GET" }
        );

        let response = retry::send(
            || match form {
                Some(params) => self.client.post(url).form(params),
                None => self.client.get(url),
            },
            self.config.max_retries,
        )?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScrapeError::Status {
                status,
                url: url.to_owned(),
            });
        }

        Ok(response.bytes()?.to_vec())
    }

    /// Fetches a page and decodes it to text.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError`] if the fetch fails.
    pub fn fetch_text(
        &self,
        url: &str,
        form: Option<&[(&str, &str)]>,
    ) -> Result<String, ScrapeError> {
        self.fetch_page(url, form).map(decode_body)
    }

    /// Fetches a page, stores the decoded text at `path`, and returns it.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError`] if the fetch or the write fails.
    pub fn fetch_to_file(
        &self,
        url: &str,
        form: Option<&[(&str, &str)]>,
        path: &Path,
    ) -> Result<String, ScrapeError> {
        log::info!("Downloading {url}");
        let text = self.fetch_text(url, form)?;
        std::fs::write(path, text.as_bytes())?;
        Ok(text)
    }
}

/// Resolves `href` against `base`.
///
/// # Errors
///
/// Returns [`ScrapeError::InvalidUrl`] if either part is unusable.
pub fn resolve_against(base: &str, href: &str) -> Result<String, ScrapeError> {
    let base_url =
        reqwest::Url::parse(base).map_err(|e| ScrapeError::InvalidUrl(format!("{base}: {e}")))?;
    base_url
        .join(href)
        .map(|url| url.to_string())
        .map_err(|e| ScrapeError::InvalidUrl(format!("{href}: {e}")))
}

/// Decodes a response body as UTF-8, falling back to Latin-1.
#[must_use]
pub fn decode_body(bytes: Vec<u8>) -> String {
    String::from_utf8(bytes).unwrap_or_else(|e| {
        log::debug!("Body is not UTF-8 ({e}), decoding as Latin-1");
        e.into_bytes().iter().map(|&b| char::from(b)).collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_utf8() {
        assert_eq!(decode_body("Café".as_bytes().to_vec()), "Café");
    }

    #[test]
    fn falls_back_to_latin1() {
        assert_eq!(decode_body(vec![b'C', b'a', b'f', 0xE9]), "Café");
    }

    #[test]
    fn resolves_relative_links() {
        let url = resolve_against(
            "http://www.coolrunning.com/results/12/ma/Dec9_Jingle_set1.shtml",
            "./Dec9_Jingle_set2.shtml",
        )
        .unwrap();
        assert_eq!(
            url,
            "http://www.coolrunning.com/results/12/ma/Dec9_Jingle_set2.shtml"
        );
    }

    #[test]
    fn session_resolves_against_base_url() {
        let session =
            Session::new(SessionConfig::default().with_base_url("http://www.coolrunning.com"))
                .unwrap();
        assert_eq!(
            session.resolve("/results/12/ma.shtml").unwrap(),
            "http://www.coolrunning.com/results/12/ma.shtml"
        );
        assert_eq!(
            session.resolve("http://www.bestrace.com/x.HTM").unwrap(),
            "http://www.bestrace.com/x.HTM"
        );
    }

    #[test]
    fn relative_link_without_base_is_invalid() {
        let session = Session::new(SessionConfig::default()).unwrap();
        assert!(matches!(
            session.resolve("race.shtml"),
            Err(ScrapeError::InvalidUrl(_))
        ));
    }
}
