//! Connection settings for the directory and the image service.
//!
//! Every setting can be given as a flag or through its environment variable.
//! Settings are validated before any network call is made.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use slm_catalog::{ImageCredentials, ImageImporter};
use slm_directory::{LdapConfig, LdapDirectory};

use crate::error::{CliError, CliResult};

/// Directory connection settings.
#[derive(Args, Clone, Default)]
pub struct DirectoryArgs {
    /// Domain controller hostname
    #[arg(long = "ldap-host", env = "SLM_LDAP_HOST")]
    pub host: Option<String>,

    /// Domain controller port (defaults to 389, or 636 with --ldap-use-ssl)
    #[arg(long = "ldap-port", env = "SLM_LDAP_PORT")]
    pub port: Option<u16>,

    /// Base DN for all searches
    #[arg(long = "ldap-base-dn", env = "SLM_LDAP_BASE_DN")]
    pub base_dn: Option<String>,

    /// Bind DN or UPN of the service account
    #[arg(long = "ldap-bind-dn", env = "SLM_LDAP_BIND_DN")]
    pub bind_dn: Option<String>,

    /// Bind password
    #[arg(long = "ldap-bind-password", env = "SLM_LDAP_BIND_PASSWORD", hide_env_values = true)]
    pub bind_password: Option<String>,

    /// Use LDAPS
    #[arg(long = "ldap-use-ssl", env = "SLM_LDAP_USE_SSL")]
    pub use_ssl: bool,

    /// Upgrade the connection with STARTTLS
    #[arg(long = "ldap-use-starttls", env = "SLM_LDAP_USE_STARTTLS")]
    pub use_starttls: bool,

    /// Connection timeout in seconds
    #[arg(long = "ldap-timeout-secs", env = "SLM_LDAP_TIMEOUT_SECS")]
    pub timeout_secs: Option<u64>,
}

impl DirectoryArgs {
    /// Build and validate the directory configuration.
    pub fn to_config(&self) -> CliResult<LdapConfig> {
        let mut config = LdapConfig::new(
            self.host.clone().unwrap_or_default(),
            self.base_dn.clone().unwrap_or_default(),
            self.bind_dn.clone().unwrap_or_default(),
        );

        if self.use_ssl {
            config = config.with_ssl();
        }
        if self.use_starttls {
            config = config.with_starttls();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(timeout) = self.timeout_secs {
            config.connection_timeout_secs = timeout;
        }
        if let Some(password) = &self.bind_password {
            config = config.with_password(password.clone());
        }

        config.validate()?;
        tracing::debug!(config = ?config, "Directory configuration loaded");
        Ok(config)
    }

    /// Create a directory client. The connection is opened on first use.
    pub fn connect(&self) -> CliResult<Arc<LdapDirectory>> {
        Ok(Arc::new(LdapDirectory::new(self.to_config()?)?))
    }
}

impl std::fmt::Debug for DirectoryArgs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectoryArgs")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("base_dn", &self.base_dn)
            .field("bind_dn", &self.bind_dn)
            .field("bind_password", &redact(self.bind_password.as_ref()))
            .field("use_ssl", &self.use_ssl)
            .field("use_starttls", &self.use_starttls)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Image service settings.
#[derive(Args, Clone, Default)]
pub struct ImageServiceArgs {
    /// Base URI of the asset system's web interface
    #[arg(long = "image-base-uri", env = "SLM_IMAGE_BASE_URI")]
    pub base_uri: Option<String>,

    /// Image service user name
    #[arg(long = "image-username", env = "SLM_IMAGE_USERNAME")]
    pub username: Option<String>,

    /// Image service password
    #[arg(long = "image-password", env = "SLM_IMAGE_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Local root folder; images go to <root>/StaticContent/ServiceImages
    #[arg(long = "image-root", env = "SLM_IMAGE_ROOT")]
    pub root: Option<PathBuf>,
}

impl ImageServiceArgs {
    /// Build the image importer.
    pub fn importer(&self) -> CliResult<ImageImporter> {
        let base_uri = required(self.base_uri.as_deref(), "SLM_IMAGE_BASE_URI")?;
        let username = required(self.username.as_deref(), "SLM_IMAGE_USERNAME")?;
        let root = self
            .root
            .clone()
            .ok_or_else(|| CliError::Config("SLM_IMAGE_ROOT is required".to_string()))?;

        let credentials =
            ImageCredentials::new(username, self.password.clone().unwrap_or_default());
        Ok(ImageImporter::new(base_uri, credentials, root)?)
    }
}

impl std::fmt::Debug for ImageServiceArgs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageServiceArgs")
            .field("base_uri", &self.base_uri)
            .field("username", &self.username)
            .field("password", &redact(self.password.as_ref()))
            .field("root", &self.root)
            .finish()
    }
}

fn redact(secret: Option<&String>) -> Option<&'static str> {
    secret.map(|_| "***REDACTED***")
}

fn required<'a>(value: Option<&'a str>, name: &str) -> CliResult<&'a str> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| CliError::Config(format!("{name} is required")))
}
