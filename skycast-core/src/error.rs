use std::path::PathBuf;

use thiserror::Error;

/// Recoverable failures of the weather fetcher.
///
/// These are shown inline to the user; the session keeps its previous form
/// values and the user may retry.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FetchError {
    #[error(
        "The selected date is outside the available data range (only past dates or up to 14 days ahead are supported)."
    )]
    OutOfRange,

    #[error("Not enough data for this date.")]
    InsufficientData,

    #[error("Weather API connection error: {0}")]
    Connection(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        FetchError::Connection(err.to_string())
    }
}

/// Problems with the model artifact. Any of these halts the program at startup.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Model artifact not found: '{}'", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to read model artifact '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse model artifact: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Inconsistent model artifact: {0}")]
    Invalid(String),
}

/// A form record with a field outside its declared range.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("{field} must be between {min} and {max} (got {value})")]
pub struct ValidationError {
    pub field: &'static str,
    pub value: f64,
    pub min: f64,
    pub max: f64,
}

/// Why a prediction could not be produced for a submitted form.
#[derive(Debug, Error)]
pub enum PredictError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error(transparent)]
    Model(#[from] ModelError),
}
