// ⚠️ Error kinds
// Fatal import failures, keyword table problems and export problems

use thiserror::Error;

/// Fatal failures while turning an upload into transactions.
///
/// Row-level problems (bad date, bad amount) are NOT errors: those rows are
/// skipped and reported through `normalizer::SkippedRow`.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("CSV file is empty")]
    EmptyFile,

    #[error(
        "Missing required columns: {}. Expected columns: date, description, amount",
        .0.join(", ")
    )]
    MissingColumns(Vec<String>),

    #[error("Header row {header_row} is past the end of the file ({records} row(s))")]
    HeaderRowOutOfRange { header_row: usize, records: usize },

    #[error("No valid transactions found ({skipped} row(s) skipped for invalid date or amount)")]
    EmptyDataset { skipped: usize },

    #[error("Failed to read CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum KeywordTableError {
    #[error("Category '{0}' appears more than once in the keyword table")]
    DuplicateCategory(String),

    #[error("'Other' is the fallback category and cannot carry keywords")]
    OtherHasKeywords,

    #[error("Unknown category: {0}")]
    UnknownCategory(String),

    #[error("Failed to parse keyword table JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Unknown export column: {0}")]
    UnknownColumn(String),

    #[error("Please select at least one column")]
    NoColumns,

    #[error("Failed to write CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
