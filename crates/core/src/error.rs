//! Error type shared by every ausdex-core operation.

use ausdex_common::DateError;
use chrono::NaiveDate;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while fetching, reading or analysing ABS data.
#[derive(Debug, Error)]
pub enum Error {
    /// A file could not be downloaded.
    #[error("Error downloading {url}: {reason}")]
    Download {
        /// The URL that failed
        url: String,
        /// What went wrong on the last attempt
        reason: String,
        /// HTTP status of the last response, `None` when no response arrived
        status: Option<u16>,
    },

    /// A cached file is missing or empty after the download step.
    #[error("Error reading {}", path.display())]
    EmptyFile {
        /// The local path that should hold the file
        path: PathBuf,
    },

    /// A quarter name other than mar, jun, sep or dec.
    #[error("Cannot understand quarter {0}.")]
    Quarter(String),

    /// No quarterly release could be found going back to 1948.
    #[error("No ABS file {id} is available on or before {date}")]
    NoData {
        /// ABS file id
        id: String,
        /// The date the search started from
        date: NaiveDate,
    },

    /// Filesystem failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A date could not be understood.
    #[error(transparent)]
    Date(#[from] DateError),

    /// A spreadsheet could not be opened or has an unexpected layout.
    #[error("Failed to read spreadsheet {}: {reason}", path.display())]
    Spreadsheet {
        /// Path of the workbook
        path: PathBuf,
        /// Reader error or layout problem
        reason: String,
    },

    /// A CPI column was requested that the workbook does not contain.
    #[error("Column '{0}' not found in CPI data")]
    MissingColumn(String),

    /// A CSV table could not be read or written.
    #[error("Failed to process table {}: {source}", path.display())]
    Csv {
        /// Path of the CSV file
        path: PathBuf,
        /// Underlying CSV error
        #[source]
        source: csv::Error,
    },

    /// Neither the preprocessed SEIFA dataset nor the overlay table to build it exists.
    #[error(
        "SEIFA dataset not found at {}. Place an overlay table at {} to build it",
        dataset.display(),
        overlay.display()
    )]
    DatasetMissing {
        /// Expected location of the preprocessed dataset
        dataset: PathBuf,
        /// Expected location of the overlay table
        overlay: PathBuf,
    },

    /// Parallel inputs of different lengths.
    #[error("Expected {expected} values but got {actual}")]
    LengthMismatch {
        /// Length of the leading input
        expected: usize,
        /// Length of the mismatched input
        actual: usize,
    },

    /// The HTML figure template failed to render.
    #[error("Failed to render figure: {0}")]
    Template(#[from] tera::Error),

    /// JSON serialization failed.
    #[error("Failed to serialize figure: {0}")]
    Json(#[from] serde_json::Error),

    /// Figures can only be written as HTML or JSON.
    #[error(
        "Cannot write figure to {}: unsupported format, use a .html or .json extension",
        path.display()
    )]
    UnsupportedFigureFormat {
        /// The requested output path
        path: PathBuf,
    },

    /// Invalid settings or configuration file.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Result alias used across ausdex-core.
pub type Result<T, E = Error> = std::result::Result<T, E>;
