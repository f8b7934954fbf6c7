use polars::error::PolarsError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("Network request failed for {0}")]
    NetworkRequest(String, #[source] reqwest::Error),

    #[error("HTTP request failed for {url} with status {status}")]
    HttpStatus {
        url: String,
        status: reqwest::StatusCode,
        #[source]
        source: reqwest::Error,
    },

    #[error("I/O error processing lookup table CSV")]
    CsvReadIo(#[source] std::io::Error),

    #[error("Parsing error processing lookup table CSV")]
    CsvReadPolars(#[source] PolarsError),

    #[error("Lookup table is missing required column '{0}'")]
    MissingColumn(String),

    #[error("Lookup table row {0} has no value in column '{1}'")]
    NullValue(usize, String),

    #[error("Failed Polars operation on lookup table")]
    ColumnOperation(#[from] PolarsError),

    #[error("Lookup table is empty")]
    EmptyIndex,

    #[error("Background task failed to complete")]
    TaskJoin(#[from] tokio::task::JoinError),
}
