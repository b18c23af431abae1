//! Integration tests for the service image importer using wiremock.

use wiremock::matchers::{any, basic_auth, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use slm_catalog::{ApplicationRecord, ImageCredentials, ImageImporter, NO_IMAGE};

// =============================================================================
// Test Helpers
// =============================================================================

fn record_with_image(image: Option<&str>) -> ApplicationRecord {
    ApplicationRecord {
        name: "Microsoft Visio".to_string(),
        computer_group: Some("App-Visio-Install".to_string()),
        user_group: None,
        publish_level: None,
        organizational_approval: true,
        application_owner_approval: true,
        uninstall_option: None,
        subscription_extensions_days: None,
        image_file_name: image.map(str::to_string),
    }
}

fn importer(server: &MockServer, root: &std::path::Path) -> ImageImporter {
    ImageImporter::new(
        server.uri(),
        ImageCredentials::new("svc-slm", "secret"),
        root,
    )
    .unwrap()
}

// =============================================================================
// Tests
// =============================================================================

#[tokio::test]
async fn test_fetch_image_stores_file() {
    let server = MockServer::start().await;
    let root = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/Upload/Store/Images/visio.png"))
        .and(basic_auth("svc-slm", "secret"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0x89, b'P', b'N', b'G']))
        .expect(1)
        .mount(&server)
        .await;

    let reference = importer(&server, root.path())
        .fetch_image(&record_with_image(Some("visio.png")))
        .await;

    assert_eq!(reference, "/StaticContent/ServiceImages/visio.png");

    let stored = root
        .path()
        .join("StaticContent")
        .join("ServiceImages")
        .join("visio.png");
    assert_eq!(
        tokio::fs::read(&stored).await.unwrap(),
        vec![0x89, b'P', b'N', b'G']
    );
}

#[tokio::test]
async fn test_fetch_image_with_reserved_characters_in_name() {
    let server = MockServer::start().await;
    let root = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/Upload/Store/Images/visio"))
        .respond_with(ResponseTemplate::new(200).set_body_string("WRONG"))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/Upload/Store/Images/visio%232.png"))
        .respond_with(ResponseTemplate::new(200).set_body_string("visio #2"))
        .expect(1)
        .mount(&server)
        .await;

    let reference = importer(&server, root.path())
        .fetch_image(&record_with_image(Some("visio#2.png")))
        .await;

    assert_eq!(reference, "/StaticContent/ServiceImages/visio#2.png");
    let stored = root.path().join("StaticContent/ServiceImages/visio#2.png");
    assert_eq!(tokio::fs::read_to_string(&stored).await.unwrap(), "visio #2");
}

#[tokio::test]
async fn test_empty_image_name_makes_no_request() {
    let server = MockServer::start().await;
    let root = tempfile::tempdir().unwrap();

    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let importer = importer(&server, root.path());
    assert_eq!(importer.fetch_image(&record_with_image(None)).await, NO_IMAGE);
    assert_eq!(importer.fetch_image(&record_with_image(Some(""))).await, NO_IMAGE);

    // The storage folder is still prepared.
    assert!(importer.storage_dir().is_dir());
}

#[tokio::test]
async fn test_missing_image_degrades_to_placeholder() {
    let server = MockServer::start().await;
    let root = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/Upload/Store/Images/missing.png"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let reference = importer(&server, root.path())
        .fetch_image(&record_with_image(Some("missing.png")))
        .await;

    assert_eq!(reference, NO_IMAGE);
    assert!(!root
        .path()
        .join("StaticContent/ServiceImages/missing.png")
        .exists());
}

#[tokio::test]
async fn test_rejected_credentials_degrade_to_placeholder() {
    let server = MockServer::start().await;
    let root = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let reference = importer(&server, root.path())
        .fetch_image(&record_with_image(Some("visio.png")))
        .await;
    assert_eq!(reference, NO_IMAGE);
}

#[tokio::test]
async fn test_unreachable_service_degrades_to_placeholder() {
    let root = tempfile::tempdir().unwrap();
    let importer = ImageImporter::new(
        "http://127.0.0.1:1",
        ImageCredentials::new("svc-slm", "secret"),
        root.path(),
    )
    .unwrap();

    let reference = importer
        .fetch_image(&record_with_image(Some("visio.png")))
        .await;
    assert_eq!(reference, NO_IMAGE);
}

#[tokio::test]
async fn test_path_like_image_name_makes_no_request() {
    let server = MockServer::start().await;
    let root = tempfile::tempdir().unwrap();

    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let reference = importer(&server, root.path())
        .fetch_image(&record_with_image(Some("../../visio.png")))
        .await;
    assert_eq!(reference, NO_IMAGE);
}
