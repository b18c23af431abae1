//! CLI error types and exit codes

use slm_catalog::CatalogError;
use slm_directory::DirectoryError;
use thiserror::Error;

/// Exit codes for the CLI
/// - 0: Success
/// - 1: General or configuration error
/// - 3: Directory or network error
/// - 4: Validation or resolution error
pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Resolution failed: {0}")]
    Resolution(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Authentication failed: the directory rejected the bind credentials")]
    AuthenticationFailed,

    #[error("Directory error: {0}")]
    Directory(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("I/O error: {0}")]
    Io(String),
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Validation(_) | CliError::Resolution(_) => 4,
            CliError::ConnectionFailed(_)
            | CliError::AuthenticationFailed
            | CliError::Directory(_)
            | CliError::Network(_) => 3,
            CliError::Config(_) | CliError::Io(_) => 1,
        }
    }

    /// Print the error to stderr
    pub fn print(&self) {
        let use_color = std::env::var("NO_COLOR").is_err();

        if use_color {
            eprintln!("\x1b[31mError:\x1b[0m {}", self);
        } else {
            eprintln!("Error: {}", self);
        }

        if let Some(suggestion) = self.suggestion() {
            if use_color {
                eprintln!("\n\x1b[33mSuggestion:\x1b[0m {}", suggestion);
            } else {
                eprintln!("\nSuggestion: {}", suggestion);
            }
        }
    }

    /// Get a suggested action for this error
    fn suggestion(&self) -> Option<&'static str> {
        match self {
            CliError::Config(_) => Some(
                "Check the SLM_LDAP_* and SLM_IMAGE_* environment variables or the matching flags.",
            ),
            CliError::AuthenticationFailed => {
                Some("Check SLM_LDAP_BIND_DN and SLM_LDAP_BIND_PASSWORD.")
            }
            CliError::ConnectionFailed(_) => {
                Some("Run 'slm-automation check-directory' to test connectivity.")
            }
            _ => None,
        }
    }
}

impl From<DirectoryError> for CliError {
    fn from(e: DirectoryError) -> Self {
        match e {
            DirectoryError::Validation { message } => CliError::Validation(message),
            DirectoryError::ResolutionFailed { .. } | DirectoryError::UnresolvedIdentity { .. } => {
                CliError::Resolution(e.to_string())
            }
            DirectoryError::Configuration { message } => CliError::Config(message),
            DirectoryError::ConnectionFailed { .. } => CliError::ConnectionFailed(e.to_string()),
            DirectoryError::AuthenticationFailed => CliError::AuthenticationFailed,
            DirectoryError::OperationFailed { .. } | DirectoryError::ObjectNotFound { .. } => {
                CliError::Directory(e.to_string())
            }
        }
    }
}

impl From<CatalogError> for CliError {
    fn from(e: CatalogError) -> Self {
        match e {
            CatalogError::Configuration(message) => CliError::Config(message),
            CatalogError::InvalidRecord(source) => {
                CliError::Validation(format!("invalid record: {source}"))
            }
            CatalogError::Http(source) => CliError::from(source),
            CatalogError::HttpStatus { .. } => CliError::Network(e.to_string()),
            CatalogError::Io { .. } => CliError::Io(e.to_string()),
        }
    }
}

impl From<reqwest::Error> for CliError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_connect() {
            CliError::ConnectionFailed(e.to_string())
        } else if e.is_timeout() {
            CliError::Network("Request timed out".to_string())
        } else {
            CliError::Network(e.to_string())
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        CliError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        CliError::Validation(format!("JSON error: {}", e))
    }
}
