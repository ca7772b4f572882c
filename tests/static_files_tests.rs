//! Static file mounts served next to the generated resources

mod common;

use axum::http::StatusCode;
use common::*;
use std::fs;

fn app_serving(dir: &tempfile::TempDir) -> TestApp {
    let root = dir.path().to_path_buf();
    app_with(test_config(), move |builder| {
        builder.with_static_files("/static", root)
    })
}

fn site() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("index.html"), "<h1>hello</h1>").unwrap();
    fs::create_dir(dir.path().join("css")).unwrap();
    fs::write(dir.path().join("css").join("site.css"), "body { margin: 0 }").unwrap();
    dir
}

#[tokio::test]
async fn test_serves_files_with_content_type() {
    let dir = site();
    let app = app_serving(&dir);

    let page = app.server.get("/static/index.html").await;
    page.assert_status_ok();
    page.assert_text("<h1>hello</h1>");
    assert_eq!(
        page.headers()["content-type"],
        "text/html; charset=utf-8"
    );

    let css = app.server.get("/static/css/site.css").await;
    css.assert_status_ok();
    css.assert_text("body { margin: 0 }");
    assert!(
        css.headers()["content-type"]
            .to_str()
            .unwrap()
            .starts_with("text/css")
    );
}

#[tokio::test]
async fn test_static_files_need_no_identity() {
    let dir = site();
    let app = app_serving(&dir);

    app.server
        .get("/static/index.html")
        .add_header("authorization", "Bearer")
        .await
        .assert_status_ok();
}

#[tokio::test]
async fn test_missing_file_is_not_found() {
    let dir = site();
    let app = app_serving(&dir);

    app.server
        .get("/static/nope.txt")
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_cannot_escape_root() {
    let outer = tempfile::tempdir().unwrap();
    fs::write(outer.path().join("secret.txt"), "top secret").unwrap();
    let root = outer.path().join("public");
    fs::create_dir(&root).unwrap();
    fs::write(root.join("index.html"), "ok").unwrap();

    let app = app_with(test_config(), move |builder| {
        builder.with_static_files("/static", root)
    });

    for path in ["/static/../secret.txt", "/static/css/../../secret.txt"] {
        let response = app.server.get(path).await;
        response.assert_status(StatusCode::NOT_FOUND);
        assert!(!response.text().contains("top secret"));
    }
}
