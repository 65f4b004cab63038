// HTTP API integration tests
use actix_web::body::{BodySize, MessageBody};
use actix_web::http::{header, StatusCode};
use actix_web::{test, web, App};
use tempfile::TempDir;

use file_depot::api;
use file_depot::app_state::AppState;
use file_depot::config::AppConfig;
use file_depot::service::FileService;

const BOUNDARY: &str = "----depot-test-boundary";

async fn test_state() -> (TempDir, web::Data<AppState>) {
    let dir = TempDir::new().unwrap();
    let mut config = AppConfig::default();
    config.storage.base_path = dir.path().to_path_buf();
    let service = FileService::open(dir.path()).await.unwrap();
    (dir, web::Data::new(AppState::with_service(service, config)))
}

/// Build a multipart/form-data body with one part per (field, filename, data)
fn multipart_body(parts: &[(&str, Option<&str>, &[u8])]) -> Vec<u8> {
    let mut body = Vec::new();
    for (field, filename, data) in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match filename {
            Some(filename) => body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
                    field, filename
                )
                .as_bytes(),
            ),
            None => body.extend_from_slice(
                format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", field).as_bytes(),
            ),
        }
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

fn upload_request(parts: &[(&str, Option<&str>, &[u8])]) -> test::TestRequest {
    test::TestRequest::post()
        .uri("/upload")
        .insert_header((
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        ))
        .set_payload(multipart_body(parts))
}

#[actix_web::test]
async fn test_upload_list_download_delete() {
    let (_dir, state) = test_state().await;
    let app = test::init_service(App::new().app_data(state.clone()).configure(api::configure)).await;

    let req = upload_request(&[("file", Some("hello world.txt"), &b"hi"[..])]).to_request();
    let resp: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(resp["message"], "File uploaded");
    assert_eq!(resp["original"], "hello world.txt");
    let stored = resp["filename"].as_str().unwrap().to_string();
    let (millis, rest) = stored.split_once('-').unwrap();
    assert!(millis.parse::<i64>().is_ok(), "stored name should start with a timestamp: {}", stored);
    assert_eq!(rest, "hello_world.txt");

    let req = test::TestRequest::get().uri("/files").to_request();
    let listing: Vec<String> = test::call_and_read_body_json(&app, req).await;
    assert_eq!(listing, vec![stored.clone()]);

    let req = test::TestRequest::get().uri(&format!("/files/{}", stored)).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp
        .headers()
        .get(header::CONTENT_TYPE)
        .unwrap()
        .to_str()
        .unwrap()
        .starts_with("text/plain"));
    assert!(resp.headers().contains_key(header::LAST_MODIFIED));
    assert_eq!(test::read_body(resp).await, "hi");

    let req = test::TestRequest::delete().uri(&format!("/files/{}", stored)).to_request();
    let resp: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(resp, serde_json::json!({ "message": "File deleted" }));

    let req = test::TestRequest::get().uri("/files").to_request();
    let listing: Vec<String> = test::call_and_read_body_json(&app, req).await;
    assert!(listing.is_empty());
}

#[actix_web::test]
async fn test_upload_strips_client_path_and_skips_other_fields() {
    let (_dir, state) = test_state().await;
    let app = test::init_service(App::new().app_data(state.clone()).configure(api::configure)).await;

    let req = upload_request(&[
        ("note", None, &b"ignored text field"[..]),
        ("other", Some("other.bin"), &b"ignored file"[..]),
        ("file", Some("/home/me/my photo.jpg"), &b"\xff\xd8\xff"[..]),
    ])
    .to_request();
    let resp: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(resp["original"], "my photo.jpg");
    assert!(resp["filename"].as_str().unwrap().ends_with("-my_photo.jpg"));

    let listing = state.file_service.list().await.unwrap();
    assert_eq!(listing.len(), 1);
}

#[actix_web::test]
async fn test_upload_without_file_is_rejected() {
    let (_dir, state) = test_state().await;
    let app = test::init_service(App::new().app_data(state.clone()).configure(api::configure)).await;

    let req = upload_request(&[("file", None, &b"just text"[..])]).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body, serde_json::json!({ "error": "No file uploaded" }));

    let req = test::TestRequest::post().uri("/upload").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    assert!(state.file_service.list().await.unwrap().is_empty());
}

#[actix_web::test]
async fn test_download_errors() {
    let (_dir, state) = test_state().await;
    let app = test::init_service(App::new().app_data(state.clone()).configure(api::configure)).await;

    let req = test::TestRequest::get().uri("/files/..secret").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(test::read_body(resp).await, "Invalid filename");

    let req = test::TestRequest::get().uri("/files/missing.txt").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(test::read_body(resp).await, "Not found");

    let req = test::TestRequest::delete().uri("/files/missing.txt").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(test::read_body(resp).await, "Not found");
}

#[actix_web::test]
async fn test_stream_whole_and_partial() {
    let (dir, state) = test_state().await;
    let data: Vec<u8> = (0..1_500_000u32).map(|i| (i % 253) as u8).collect();
    std::fs::write(dir.path().join("video.mp4"), &data).unwrap();
    let app = test::init_service(App::new().app_data(state.clone()).configure(api::configure)).await;

    let req = test::TestRequest::get().uri("/stream/video.mp4").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.response().body().size(), BodySize::Sized(1_500_000));
    assert_eq!(resp.headers().get(header::CONTENT_TYPE).unwrap(), "application/octet-stream");
    assert_eq!(test::read_body(resp).await, data);

    let req = test::TestRequest::get()
        .uri("/stream/video.mp4")
        .insert_header((header::RANGE, "bytes=0-"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(resp.headers().get(header::CONTENT_RANGE).unwrap(), "bytes 0-999999/1500000");
    assert_eq!(resp.headers().get(header::ACCEPT_RANGES).unwrap(), "bytes");
    assert_eq!(resp.response().body().size(), BodySize::Sized(1_000_000));
    assert_eq!(test::read_body(resp).await, &data[..1_000_000]);

    let req = test::TestRequest::get()
        .uri("/stream/video.mp4")
        .insert_header((header::RANGE, "bytes=1000000-"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(resp.headers().get(header::CONTENT_RANGE).unwrap(), "bytes 1000000-1499999/1500000");
    assert_eq!(test::read_body(resp).await, &data[1_000_000..]);
}

#[actix_web::test]
async fn test_stream_errors() {
    let (dir, state) = test_state().await;
    std::fs::write(dir.path().join("tiny.txt"), b"abc").unwrap();
    let app = test::init_service(App::new().app_data(state.clone()).configure(api::configure)).await;

    let req = test::TestRequest::get().uri("/stream/missing.bin").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert!(test::read_body(resp).await.is_empty());

    let req = test::TestRequest::get()
        .uri("/stream/tiny.txt")
        .insert_header((header::RANGE, "bytes=3-"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::RANGE_NOT_SATISFIABLE);
    assert_eq!(resp.headers().get(header::CONTENT_RANGE).unwrap(), "bytes */3");

    let req = test::TestRequest::get().uri("/stream/..tiny.txt").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

fn mdc_file() -> Option<String> {
    log_mdc::get(file_depot::logging::MDC_FILE_KEY, |value| value.map(str::to_string))
}

#[actix_web::test]
async fn test_file_log_context_is_cleared_between_requests() {
    let (dir, state) = test_state().await;
    std::fs::write(dir.path().join("secret-a.txt"), b"a").unwrap();
    let app = test::init_service(App::new().app_data(state.clone()).configure(api::configure)).await;

    let req = test::TestRequest::get().uri("/files/secret-a.txt").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(mdc_file(), None);

    let req = test::TestRequest::get().uri("/files").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(mdc_file(), None, "file context must not carry over into GET /files");

    let req = test::TestRequest::delete().uri("/files/secret-a.txt").to_request();
    test::call_service(&app, req).await;
    let req = upload_request(&[("file", None, &b"no file"[..])]).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(mdc_file(), None);
}
