use thiserror::Error;

/// Main error type for fitsync
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Source {source_name} unavailable: {detail}")]
    SourceUnavailable { source_name: String, detail: String },

    #[error("Invalid record: {0}")]
    RecordInvalid(String),

    #[error("Schema mismatch for {record_type}: {detail}")]
    SchemaMismatch { record_type: String, detail: String },

    #[error("Failed to persist {partition}: {detail}")]
    Persistence { partition: String, detail: String },

    #[error("Authentication required. Check the provider access token.")]
    NotAuthenticated,

    #[error("Rate limited. Please wait before retrying.")]
    RateLimited,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid date format: {0}. Expected YYYY-MM-DD")]
    InvalidDateFormat(String),
}

pub type Result<T> = std::result::Result<T, SyncError>;

impl SyncError {
    /// Create a source-unavailable error for the named source
    pub fn source_unavailable(source_name: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::SourceUnavailable {
            source_name: source_name.into(),
            detail: detail.into(),
        }
    }

    /// Create an invalid record error from a message
    pub fn record_invalid(msg: impl Into<String>) -> Self {
        Self::RecordInvalid(msg.into())
    }

    /// Create a schema mismatch error; resolved by projection and only logged
    pub fn schema_mismatch(record_type: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::SchemaMismatch {
            record_type: record_type.into(),
            detail: detail.into(),
        }
    }

    /// Create a persistence error for a partition
    pub fn persistence(partition: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Persistence {
            partition: partition.into(),
            detail: detail.into(),
        }
    }

    /// Create a configuration error from a message
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid response error from a message
    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }

    /// Whether a provider call failed because the resource simply has no data
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Render an error for the terminal, adding a hint where one helps
pub fn format_user_error(err: &SyncError) -> String {
    match err {
        SyncError::Config(_) => {
            format!("{err}\nSee `fitsync --help` for the supported environment variables.")
        }
        SyncError::Persistence { .. } => {
            format!("{err}\nThe previously stored partition was left untouched.")
        }
        _ => err.to_string(),
    }
}
