use thiserror::Error;

/// Main error type for KGFlat
#[derive(Error, Debug)]
pub enum KgflatError {
    /// The top-level message payload could not be located in a response
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// File system I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// PubMed E-utilities API errors
    #[error("PubMed API error: {0}")]
    PubMed(String),

    /// Parse errors (JSON responses, EFetch XML)
    #[error("Parse error: {0}")]
    Parse(String),

    /// Row export errors
    #[error("Export error: {0}")]
    Export(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Convenient Result type using KgflatError
pub type Result<T> = std::result::Result<T, KgflatError>;
