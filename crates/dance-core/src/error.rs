use thiserror::Error;

/// Failure talking to the remote playback service.
///
/// None of these are fatal: the engine collapses every variant to "no data"
/// and only the status line reports which one happened.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ServiceError {
    #[error("no access token configured")]
    MissingToken,

    #[error("request failed: {0}")]
    Transport(String),

    #[error("unauthorized (token expired or revoked)")]
    Unauthorized,

    #[error("rate limited, retry after {retry_after_secs:?}s")]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("service returned HTTP {0}")]
    Status(u16),

    #[error("malformed response: {0}")]
    Decode(String),
}

/// Failure loading or reloading the style table.
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("cannot read lookup file: {0}")]
    Io(#[from] std::io::Error),

    #[error("lookup table has no header row")]
    Empty,

    #[error("lookup table is missing required column '{0}'")]
    MissingColumn(&'static str),

    #[error("line {line}: unterminated quoted field")]
    UnterminatedQuote { line: usize },
}

/// Rejected playlist / track identifier input.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum IdentifierError {
    #[error("expected {expected}, got {found}")]
    TypeMismatch { expected: String, found: String },

    #[error("unrecognized format (expected an ID, URL or URI)")]
    UnrecognizedFormat,
}

impl LookupError {
    /// Check if this error is a "file not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, LookupError::Io(e) if e.kind() == std::io::ErrorKind::NotFound)
    }
}
