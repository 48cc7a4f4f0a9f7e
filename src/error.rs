use serde::Serialize;

/// Failure categories recorded in per-keyword output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    NotFoundError,
    NetworkError,
    ParseError,
    InvalidKeyword,
    WriteError,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::NotFoundError => "NotFoundError",
            ErrorKind::NetworkError => "NetworkError",
            ErrorKind::ParseError => "ParseError",
            ErrorKind::InvalidKeyword => "InvalidKeyword",
            ErrorKind::WriteError => "WriteError",
        };
        f.write_str(name)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("No article found: {0}")]
    NotFoundError(String),

    #[error("Failed to fetch data: {0}")]
    NetworkError(String),

    #[error("Error parsing content: {0}")]
    ParseError(String),

    #[error("Invalid keyword: {0}")]
    InvalidKeyword(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::NotFoundError(_) => ErrorKind::NotFoundError,
            AppError::NetworkError(_) => ErrorKind::NetworkError,
            AppError::ParseError(_) => ErrorKind::ParseError,
            AppError::InvalidKeyword(_) => ErrorKind::InvalidKeyword,
            AppError::ConfigError(_)
            | AppError::IoError(_)
            | AppError::SerializationError(_)
            | AppError::CsvError(_) => ErrorKind::WriteError,
        }
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::NetworkError(err.to_string())
    }
}

impl From<std::env::VarError> for AppError {
    fn from(err: std::env::VarError) -> Self {
        AppError::ConfigError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
