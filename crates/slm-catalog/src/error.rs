//! Error types for the catalog crate.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using `CatalogError`.
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Errors that can occur when handling application records and service images.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Application record is missing required configuration.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Record could not be parsed from its JSON form.
    #[error("invalid record: {0}")]
    InvalidRecord(#[from] serde_json::Error),

    /// HTTP request error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Image service answered with a non-success status.
    #[error("image service returned {status} for {url}")]
    HttpStatus { status: u16, url: String },

    /// Local storage failure.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CatalogError {
    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        CatalogError::Configuration(message.into())
    }

    /// Create an I/O error for `path`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CatalogError::Io {
            path: path.into(),
            source,
        }
    }

    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            CatalogError::Configuration(_) => "CONFIGURATION",
            CatalogError::InvalidRecord(_) => "INVALID_RECORD",
            CatalogError::Http(_) => "HTTP",
            CatalogError::HttpStatus { .. } => "HTTP_STATUS",
            CatalogError::Io { .. } => "IO",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_display() {
        let err = CatalogError::configuration("neither ComputerGroup nor UserGroup set");
        assert_eq!(
            err.to_string(),
            "configuration error: neither ComputerGroup nor UserGroup set"
        );
        assert_eq!(err.error_code(), "CONFIGURATION");
    }

    #[test]
    fn test_io_display_names_path() {
        let err = CatalogError::io(
            "/srv/slm/StaticContent/ServiceImages",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(err.to_string().contains("/srv/slm/StaticContent/ServiceImages"));
        assert_eq!(err.error_code(), "IO");
    }

    #[test]
    fn test_invalid_record_from_serde() {
        let parse: Result<serde_json::Value, _> = serde_json::from_str("{not json");
        let err: CatalogError = parse.unwrap_err().into();
        assert_eq!(err.error_code(), "INVALID_RECORD");
    }
}
