//! Multipart uploads stored on disk and owned by the uploader

mod common;

use axum::http::StatusCode;
use axum_test::multipart::{MultipartForm, Part};
use cms_builder::prelude::*;
use common::*;
use serde_json::Value;
use std::path::Path;

fn app_uploading(dir: &tempfile::TempDir, max_file_size: usize) -> TestApp {
    let mut config = test_config();
    config.uploads.max_file_size = max_file_size;
    let root = dir.path().to_path_buf();
    app_with(config, move |builder| builder.with_uploads(root))
}

fn file_form(name: &str, contents: &'static [u8]) -> MultipartForm {
    MultipartForm::new().add_part(
        "file",
        Part::bytes(contents)
            .file_name(name)
            .mime_type("text/plain"),
    )
}

async fn upload(app: &TestApp, session: &Session, name: &str, contents: &'static [u8]) -> Value {
    let response = app
        .server
        .post("/uploads")
        .add_header("authorization", session.header.as_str())
        .multipart(file_form(name, contents))
        .await;
    response.assert_status(StatusCode::CREATED);
    response.json()
}

fn files_in(dir: &Path) -> usize {
    std::fs::read_dir(dir).unwrap().count()
}

#[tokio::test]
async fn test_upload_is_stored_and_served() {
    let dir = tempfile::tempdir().unwrap();
    let app = app_uploading(&dir, 1024);
    let ann = app.sign_up("Ann", "ann@x.com").await;

    let body = upload(&app, &ann, "notes.txt", b"remember the milk").await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["file_name"], "notes.txt");
    assert_eq!(body["data"]["owner_id"], ann.id.to_string());
    assert_eq!(body["data"]["size"], 17);

    let file_path = body["data"]["file_path"].as_str().unwrap();
    assert!(file_path.ends_with("-notes.txt"));
    assert_eq!(
        std::fs::read_to_string(dir.path().join(file_path)).unwrap(),
        "remember the milk"
    );

    let url = body["data"]["url"].as_str().unwrap();
    assert_eq!(url, format!("/static/{file_path}"));
    let served = app.server.get(url).await;
    served.assert_status_ok();
    served.assert_text("remember the milk");
}

#[tokio::test]
async fn test_anonymous_upload_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let app = app_uploading(&dir, 1024);

    let response = app
        .server
        .post("/uploads")
        .multipart(file_form("a.txt", b"hi"))
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    let body: Value = response.json();
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "authentication required");

    assert_eq!(files_in(dir.path()), 0);
    let total = app
        .store
        .list::<Upload>(Predicate::All, None)
        .await
        .unwrap()
        .total;
    assert_eq!(total, 0);
}

#[tokio::test]
async fn test_uploads_are_listed_per_owner() {
    let dir = tempfile::tempdir().unwrap();
    let app = app_uploading(&dir, 1024);
    let ann = app.sign_up("Ann", "ann@x.com").await;
    let bob = app.sign_up("Bob", "bob@x.com").await;

    upload(&app, &ann, "a.txt", b"a").await;
    upload(&app, &ann, "b.txt", b"b").await;
    upload(&app, &bob, "c.txt", b"c").await;

    let body: Value = app
        .server
        .get("/uploads")
        .add_header("authorization", ann.header.as_str())
        .await
        .json();
    assert_eq!(body["pagination"]["total"], 2);
    let names: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|u| u["file_name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["a.txt", "b.txt"]);
}

#[tokio::test]
async fn test_only_the_owner_deletes_an_upload() {
    let dir = tempfile::tempdir().unwrap();
    let app = app_uploading(&dir, 1024);
    let ann = app.sign_up("Ann", "ann@x.com").await;
    let bob = app.sign_up("Bob", "bob@x.com").await;

    let body = upload(&app, &ann, "a.txt", b"mine").await;
    let id = body["data"]["id"].as_str().unwrap().to_string();
    let url = body["data"]["url"].as_str().unwrap().to_string();
    let path = dir.path().join(body["data"]["file_path"].as_str().unwrap());

    app.server
        .delete(&format!("/uploads/{id}"))
        .add_header("authorization", bob.header.as_str())
        .await
        .assert_status(StatusCode::NOT_FOUND);
    assert!(path.exists());

    let deleted = app
        .server
        .delete(&format!("/uploads/{id}"))
        .add_header("authorization", ann.header.as_str())
        .await;
    deleted.assert_status_ok();
    assert_eq!(deleted.json::<Value>()["message"], "upload deleted");
    assert!(!path.exists());

    app.server.get(&url).await.assert_status(StatusCode::NOT_FOUND);
    app.server
        .get(&format!("/uploads/{id}"))
        .add_header("authorization", ann.header.as_str())
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_bad_uploads_are_validation_errors() {
    let dir = tempfile::tempdir().unwrap();
    let app = app_uploading(&dir, 8);
    let ann = app.sign_up("Ann", "ann@x.com").await;

    let too_big = app
        .server
        .post("/uploads")
        .add_header("authorization", ann.header.as_str())
        .multipart(file_form("big.txt", b"way more than eight bytes"))
        .await;
    too_big.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(too_big.json::<Value>()["code"], "VALIDATION_ERROR");

    let no_file = app
        .server
        .post("/uploads")
        .add_header("authorization", ann.header.as_str())
        .multipart(MultipartForm::new().add_text("title", "no file here"))
        .await;
    no_file.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(
        no_file.json::<Value>()["message"],
        "multipart field 'file' is missing"
    );

    let json_body = app
        .server
        .post("/uploads")
        .add_header("authorization", ann.header.as_str())
        .json(&serde_json::json!({"file": "a.txt"}))
        .await;
    json_body.assert_status(StatusCode::BAD_REQUEST);

    assert_eq!(files_in(dir.path()), 0);
}

#[tokio::test]
async fn test_uploads_cannot_be_edited_over_rest() {
    let dir = tempfile::tempdir().unwrap();
    let app = app_uploading(&dir, 1024);
    let ann = app.sign_up("Ann", "ann@x.com").await;
    let body = upload(&app, &ann, "a.txt", b"a").await;
    let id = body["data"]["id"].as_str().unwrap();

    app.server
        .patch(&format!("/uploads/{id}"))
        .add_header("authorization", ann.header.as_str())
        .json(&serde_json::json!({"file_name": "b.txt"}))
        .await
        .assert_status(StatusCode::METHOD_NOT_ALLOWED);
}
