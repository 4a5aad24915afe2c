//! Ingestion of the delimited notification file.
//!
//! The input is comma-delimited text with a header row naming the columns
//! `URL`, `ORDER ID`, `NAME` and `EVENT` in any order. Whitespace around
//! headers and cells is stripped, extra columns are ignored, and one
//! [`Notification`] is produced per data row in file order.
//!
//! ```text
//! URL, ORDER ID, NAME, EVENT
//! https://example.com/hooks, 1, Alice, order.created
//! ```

use std::{
    fs::File,
    io::Read,
    path::{Path, PathBuf},
};

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::{
    error::CoreError,
    models::{Destination, Notification},
};

const REQUIRED_COLUMNS: [&str; 4] = ["URL", "ORDER ID", "NAME", "EVENT"];

/// Errors raised while reading the input file.
#[derive(Debug, Error)]
pub enum IngestError {
    /// The input file could not be opened.
    #[error("failed to open {path}: {source}")]
    Io {
        /// Path that failed to open
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The header row lacks a required column.
    #[error("missing required column '{column}'")]
    MissingColumn {
        /// Name of the missing column
        column: &'static str,
    },

    /// A row could not be parsed.
    #[error("malformed input at line {line}: {message}")]
    MalformedRow {
        /// 1-based line number of the row
        line: u64,
        /// Parser message
        message: String,
    },

    /// A row names a destination that is not a valid HTTP(S) URL.
    #[error("invalid destination at line {line}: {source}")]
    InvalidDestination {
        /// 1-based line number of the row
        line: u64,
        /// Underlying validation error
        #[source]
        source: CoreError,
    },
}

impl IngestError {
    fn from_csv(error: &csv::Error) -> Self {
        let line = error.position().map_or(0, csv::Position::line);
        Self::MalformedRow { line, message: error.to_string() }
    }
}

#[derive(Debug, Deserialize)]
struct Row {
    #[serde(rename = "URL")]
    url: String,
    #[serde(rename = "ORDER ID")]
    order_id: String,
    #[serde(rename = "NAME")]
    name: String,
    #[serde(rename = "EVENT")]
    event: String,
}

/// Reads notifications from delimited text.
///
/// # Errors
///
/// Returns `IngestError::MissingColumn` if the header lacks a required
/// column, `IngestError::MalformedRow` for rows the parser rejects, and
/// `IngestError::InvalidDestination` for rows whose `URL` does not parse.
pub fn read_notifications<R: Read>(reader: R) -> Result<Vec<Notification>, IngestError> {
    let mut csv_reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);

    let headers = csv_reader.headers().map_err(|e| IngestError::from_csv(&e))?.clone();
    if let Some(column) =
        REQUIRED_COLUMNS.into_iter().find(|column| !headers.iter().any(|header| header == *column))
    {
        return Err(IngestError::MissingColumn { column });
    }

    let mut notifications = Vec::new();
    for record in csv_reader.records() {
        let record = record.map_err(|e| IngestError::from_csv(&e))?;
        let line = record.position().map_or(0, csv::Position::line);

        let row: Row = record
            .deserialize(Some(&headers))
            .map_err(|e| IngestError::MalformedRow { line, message: e.to_string() })?;
        let destination = Destination::parse(&row.url)
            .map_err(|source| IngestError::InvalidDestination { line, source })?;

        notifications.push(Notification::new(destination, row.order_id, row.name, row.event));
    }

    debug!(count = notifications.len(), "ingested notifications");
    Ok(notifications)
}

/// Reads notifications from the file at `path`.
///
/// # Errors
///
/// Returns `IngestError::Io` if the file cannot be opened, otherwise the
/// errors of [`read_notifications`].
pub fn load_notifications(path: impl AsRef<Path>) -> Result<Vec<Notification>, IngestError> {
    let path = path.as_ref();
    let file =
        File::open(path).map_err(|source| IngestError::Io { path: path.to_path_buf(), source })?;
    read_notifications(file)
}
