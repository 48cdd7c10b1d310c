#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Rendering matched results and growing the cumulative report.
//!
//! [`render`] turns one race's roster-filtered [`ResultBody`] into a
//! `<div class="race">` [`ResultFragment`]. The [`accumulate`] module owns
//! the output document: [`initialize`] writes the empty skeleton once per
//! run and [`append`] adds fragments to the end of `<body>`.
//!
//! [`ResultBody`]: race_results_models::ResultBody
//! [`ResultFragment`]: race_results_models::ResultFragment

pub mod accumulate;
pub mod markup;
pub mod pretty;
pub mod render;

pub use accumulate::{append, initialize};
pub use render::render;

/// Errors that can occur while rendering a race.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// An element the dialect guarantees (title, heading, banner, race
    /// metadata) is missing from the page.
    #[error("Unparseable template: {0}")]
    UnparseableTemplate(String),
}

/// Errors that can occur while writing the output document.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    /// Reading or writing the output document failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path that caused the error.
        path: String,
        /// Underlying error.
        source: std::io::Error,
    },
}
