//! Read-only routes: package downloads, index page, help, health and status.

use axum::http::StatusCode;
use serde_json::Value;
use std::fs;

mod common;
use common::{create_test_setup, upload_form};

#[tokio::test]
async fn test_uploaded_package_is_downloadable() {
    let setup = create_test_setup();
    let server = &setup.server;

    let response = server
        .post("/api/upload")
        .multipart(upload_form("fileupload", "foo-1.0.rpm", b"rpm bytes".to_vec()))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let response = server.get("/foo-1.0.rpm").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.as_bytes().as_ref(), b"rpm bytes");
}

#[tokio::test]
async fn test_index_files_are_served() {
    let setup = create_test_setup();
    fs::create_dir(setup.package_path("repodata")).unwrap();
    fs::write(
        setup.package_path("repodata/repomd.xml"),
        "<repomd></repomd>",
    )
    .unwrap();

    let response = setup.server.get("/repodata/repomd.xml").await;

    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.text(), "<repomd></repomd>");
}

#[tokio::test]
async fn test_missing_file_is_not_found() {
    let setup = create_test_setup();
    let response = setup.server.get("/nope-1.0.rpm").await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_index_page_lists_packages() {
    let setup = create_test_setup();
    fs::write(setup.package_path("b-1.0.rpm"), b"b").unwrap();
    fs::write(setup.package_path("a-1.0.rpm"), b"a").unwrap();
    fs::write(setup.package_path("notes.txt"), b"ignored").unwrap();
    fs::create_dir(setup.package_path("repodata")).unwrap();

    let response = setup.server.get("/").await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let html = response.text();
    assert!(html.contains(r#"<a href="repodata/">repodata/</a>"#));
    let a = html.find("a-1.0.rpm").expect("a listed");
    let b = html.find("b-1.0.rpm").expect("b listed");
    assert!(a < b);
    assert!(!html.contains("notes.txt"));
}

#[tokio::test]
async fn test_help_is_rendered_as_html() {
    let setup = create_test_setup();

    let response = setup.server.get("/help").await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let html = response.text();
    assert!(html.contains("<h1>Yum repository</h1>"));
    assert!(html.contains("<code>curl -F fileupload=@pkg.rpm</code>"));
}

#[tokio::test]
async fn test_unreadable_help_is_server_error() {
    let setup = create_test_setup();
    fs::remove_file(&setup.state.config.help_file).unwrap();

    let response = setup.server.get("/help").await;

    assert_eq!(response.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_health_and_status() {
    let setup = create_test_setup();
    fs::write(setup.package_path("foo-1.0.rpm"), b"payload").unwrap();

    let response = setup.server.get("/health").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["status"], "healthy");

    let response = setup.server.get("/api/status").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["service"], "yummy");
    assert_eq!(body["packages"], 1);
    assert_eq!(body["protected"], false);
    assert_eq!(body["auth_enabled"], true);
    assert_eq!(body["index_present"], false);
}
