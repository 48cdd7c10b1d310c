//! Membership list loading.
//!
//! The list is comma-delimited, one member per line, family name first:
//!
//! ```text
//! Doe,Jane,...
//! Smith,Joe,...
//! ```
//!
//! Columns past the second are ignored.

use std::path::Path;

use race_results_models::RosterEntry;

/// Errors that can occur while loading a membership list.
#[derive(Debug, thiserror::Error)]
pub enum RosterError {
    /// The file could not be opened or read.
    #[error("I/O error reading roster: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not valid comma-delimited text.
    #[error("CSV error reading roster: {0}")]
    Csv(#[from] csv::Error),

    /// A line has fewer than two columns.
    #[error("roster line {line} has no first-name column")]
    MissingColumn {
        /// 1-based line number.
        line: u64,
    },
}

/// Loads roster entries from a membership file.
///
/// # Errors
///
/// Returns [`RosterError`] if the file cannot be read or a line lacks a
/// first-name column.
pub fn load_roster(path: &Path) -> Result<Vec<RosterEntry>, RosterError> {
    let file = std::fs::File::open(path)?;
    let entries = read_roster(file)?;
    log::info!(
        "Loaded {} roster entries from {}",
        entries.len(),
        path.display()
    );
    Ok(entries)
}

/// Reads roster entries from any reader.
///
/// # Errors
///
/// Returns [`RosterError`] if the input is not valid CSV or a line lacks a
/// first-name column.
pub fn read_roster(reader: impl std::io::Read) -> Result<Vec<RosterEntry>, RosterError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut entries = Vec::new();
    for result in csv_reader.records() {
        let record = result?;
        let line = record.position().map_or(0, csv::Position::line);
        let (Some(last), Some(first)) = (record.get(0), record.get(1)) else {
            return Err(RosterError::MissingColumn { line });
        };
        if last.is_empty() && first.is_empty() {
            continue;
        }
        entries.push(RosterEntry::new(first, last));
    }

    Ok(entries)
}
