//! Service image import.
//!
//! Downloads an application's image from the asset system's image store into
//! the local static-content folder. Failures never abort the caller: they are
//! logged and the placeholder reference is returned instead.

use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::Url;

use tracing::{debug, info, instrument, warn};

use crate::application::ApplicationRecord;
use crate::error::{CatalogError, CatalogResult};

/// Reference returned when no image is available.
pub const NO_IMAGE: &str = "noImage";

/// Relative URL prefix of stored images.
pub const IMAGE_REFERENCE_PREFIX: &str = "/StaticContent/ServiceImages";

const IMAGE_STORE_SEGMENTS: [&str; 3] = ["Upload", "Store", "Images"];
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Credentials for the image service.
#[derive(Clone)]
pub struct ImageCredentials {
    pub username: String,
    pub password: String,
}

impl ImageCredentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for ImageCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageCredentials")
            .field("username", &self.username)
            .field("password", &"***REDACTED***")
            .finish()
    }
}

/// Fetches service images over HTTP and stores them locally.
#[derive(Debug, Clone)]
pub struct ImageImporter {
    http_client: reqwest::Client,
    base_url: Url,
    credentials: ImageCredentials,
    root: PathBuf,
}

impl ImageImporter {
    /// Create an importer for the image service at `base_uri`, storing images
    /// under `<root>/StaticContent/ServiceImages`.
    pub fn new(
        base_uri: impl Into<String>,
        credentials: ImageCredentials,
        root: impl Into<PathBuf>,
    ) -> CatalogResult<Self> {
        let base_uri = base_uri.into();
        if base_uri.trim().is_empty() {
            return Err(CatalogError::configuration("image service base URI is required"));
        }
        let base_url = Url::parse(base_uri.trim()).map_err(|e| {
            CatalogError::configuration(format!("invalid image service base URI '{base_uri}': {e}"))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(CatalogError::configuration(format!(
                "image service base URI '{base_uri}' cannot carry a path"
            )));
        }

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| CatalogError::configuration(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            http_client,
            base_url,
            credentials,
            root: root.into(),
        })
    }

    /// Local folder images are stored in.
    pub fn storage_dir(&self) -> PathBuf {
        self.root.join("StaticContent").join("ServiceImages")
    }

    /// Download URL of `file_name` in the image store. The name is
    /// percent-encoded as a single path segment.
    pub fn image_url(&self, file_name: &str) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(IMAGE_STORE_SEGMENTS)
                .push(file_name);
        }
        url
    }

    /// Import the record's image and return its local reference, or
    /// [`NO_IMAGE`] when the record has none or the import fails.
    #[instrument(skip(self, record), fields(application = %record.name))]
    pub async fn fetch_image(&self, record: &ApplicationRecord) -> String {
        let storage_dir = self.storage_dir();
        if let Err(e) = tokio::fs::create_dir_all(&storage_dir).await {
            warn!(
                error = %CatalogError::io(&storage_dir, e),
                "Failed to create image storage folder"
            );
        }

        let Some(file_name) = record.image_file_name() else {
            debug!("Application has no image");
            return NO_IMAGE.to_string();
        };

        match self.download(file_name, &storage_dir).await {
            Ok(reference) => {
                info!(image = %reference, "Imported service image");
                reference
            }
            Err(e) => {
                warn!(
                    error = %e,
                    error_code = e.error_code(),
                    image = %file_name,
                    "Image import failed, using placeholder"
                );
                NO_IMAGE.to_string()
            }
        }
    }

    async fn download(&self, file_name: &str, storage_dir: &Path) -> CatalogResult<String> {
        if !is_plain_file_name(file_name) {
            return Err(CatalogError::configuration(format!(
                "image file name '{file_name}' is not a plain file name"
            )));
        }

        let url = self.image_url(file_name);
        debug!(url = %url, "Downloading service image");

        let response = self
            .http_client
            .get(url.clone())
            .basic_auth(&self.credentials.username, Some(&self.credentials.password))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(CatalogError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let bytes = response.bytes().await?;
        let path = storage_dir.join(file_name);
        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|e| CatalogError::io(&path, e))?;

        debug!(path = %path.display(), size = bytes.len(), "Stored service image");
        Ok(format!("{IMAGE_REFERENCE_PREFIX}/{file_name}"))
    }
}

fn is_plain_file_name(name: &str) -> bool {
    !name.contains(['/', '\\']) && name != "." && name != ".."
}

#[cfg(test)]
mod tests {
    use super::*;

    fn importer() -> ImageImporter {
        ImageImporter::new(
            "https://slm.corp.example.com/",
            ImageCredentials::new("svc-slm", "secret"),
            "/srv/automation",
        )
        .unwrap()
    }

    #[test]
    fn test_image_url() {
        assert_eq!(
            importer().image_url("visio.png").as_str(),
            "https://slm.corp.example.com/Upload/Store/Images/visio.png"
        );
    }

    #[test]
    fn test_image_url_encodes_file_name() {
        assert_eq!(
            importer().image_url("visio#2?.png").as_str(),
            "https://slm.corp.example.com/Upload/Store/Images/visio%232%3F.png"
        );
        assert_eq!(
            importer().image_url("Visio 100%.png").as_str(),
            "https://slm.corp.example.com/Upload/Store/Images/Visio%20100%25.png"
        );
    }

    #[test]
    fn test_image_url_keeps_base_path() {
        let importer = ImageImporter::new(
            "https://assets.corp.example.com/slm",
            ImageCredentials::new("u", "p"),
            "/tmp",
        )
        .unwrap();
        assert_eq!(
            importer.image_url("visio.png").as_str(),
            "https://assets.corp.example.com/slm/Upload/Store/Images/visio.png"
        );
    }

    #[test]
    fn test_invalid_base_uri_rejected() {
        for base in ["not a url", "mailto:slm@corp.example.com"] {
            let result = ImageImporter::new(base, ImageCredentials::new("u", "p"), "/tmp");
            assert!(matches!(result, Err(CatalogError::Configuration(_))), "{base}");
        }
    }

    #[test]
    fn test_storage_dir() {
        assert_eq!(
            importer().storage_dir(),
            PathBuf::from("/srv/automation/StaticContent/ServiceImages")
        );
    }

    #[test]
    fn test_blank_base_uri_rejected() {
        let result = ImageImporter::new(" ", ImageCredentials::new("u", "p"), "/tmp");
        assert!(matches!(result, Err(CatalogError::Configuration(_))));
    }

    #[test]
    fn test_credentials_debug_redacted() {
        let debug = format!("{:?}", ImageCredentials::new("svc-slm", "secret"));
        assert!(!debug.contains("secret"));
    }

    #[test]
    fn test_plain_file_name() {
        assert!(is_plain_file_name("visio.png"));
        assert!(is_plain_file_name("Visio 2021.png"));
        assert!(!is_plain_file_name("../etc/passwd"));
        assert!(!is_plain_file_name("images\\visio.png"));
        assert!(!is_plain_file_name(".."));
    }
}
