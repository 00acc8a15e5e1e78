//! Photo uploads and privacy mask scoping.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use serde_json::{json, Value};

mod common;

const BOUNDARY: &str = "sanpo-test-boundary";

/// Build a multipart body from text fields and an optional file part.
fn multipart_body(fields: &[(&str, &str)], file: Option<(&str, &str, &[u8])>) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some((file_name, content_type, data)) = file {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

async fn upload(
    app: &common::TestApp,
    session_id: &Value,
    token: &str,
    body: Vec<u8>,
) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(format!("/api/walk-sessions/{}/photos/", session_id))
        .header(header::AUTHORIZATION, format!("Token {}", token))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap();
    app.send(request).await
}

#[tokio::test]
async fn test_photo_upload_is_stored_and_listed() {
    let app = common::create_test_app().await;
    let token = app.login_as("hanako").await;

    let (_, session) = app
        .post("/api/walk-sessions/", Some(&token), json!({}))
        .await;
    let (_, visit) = app
        .post(
            &format!("/api/walk-sessions/{}/spot-visits/", session["id"]),
            Some(&token),
            json!({"name": "Shrine", "place_id": "p-1"}),
        )
        .await;
    let visit_id = visit["id"].to_string();

    let body = multipart_body(
        &[
            ("spot_visit", visit_id.as_str()),
            ("caption", "Torii gate"),
            ("lat", "35.0116"),
            ("lng", "135.7681"),
            ("taken_at", "2025-04-01T09:30:00Z"),
        ],
        Some(("torii.jpg", "image/jpeg", &b"\xff\xd8\xff\xe0fakejpeg"[..])),
    );
    let (status, photo) = upload(&app, &session["id"], &token, body).await;
    assert_eq!(status, StatusCode::CREATED, "{}", photo);
    assert_eq!(photo["caption"], "Torii gate");
    assert_eq!(photo["spot_visit"], visit["id"]);

    let image = photo["image"].as_str().unwrap();
    assert!(image.starts_with(&format!("walk_photos/{}/", session["id"])));
    assert!(image.ends_with(".jpg"));
    assert_eq!(photo["image_url"], format!("/media/{}", image));
    assert!(app.state.config.server.upload_dir.join(image).exists());

    let (status, photos) = app
        .get(&format!("/api/walk-sessions/{}/photos/", session["id"]), Some(&token))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(photos.as_array().unwrap().len(), 1);

    // Served read-only under /media
    let request = Request::builder()
        .uri(format!("/media/{}", image))
        .body(Body::empty())
        .unwrap();
    let response = tower::ServiceExt::oneshot(app.router.clone(), request)
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Deleting the session removes the file
    let (status, _) = app
        .delete(&format!("/api/walk-sessions/{}/", session["id"]), Some(&token))
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(!app.state.config.server.upload_dir.join(image).exists());
}

#[tokio::test]
async fn test_photo_upload_validation() {
    let app = common::create_test_app().await;
    let token = app.login_as("hanako").await;

    let (_, session) = app
        .post("/api/walk-sessions/", Some(&token), json!({}))
        .await;
    let (_, other_session) = app
        .post("/api/walk-sessions/", Some(&token), json!({}))
        .await;
    let (_, other_visit) = app
        .post(
            &format!("/api/walk-sessions/{}/spot-visits/", other_session["id"]),
            Some(&token),
            json!({"name": "Elsewhere"}),
        )
        .await;

    let (status, body) = upload(&app, &session["id"], &token, multipart_body(&[("caption", "x")], None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["errors"]["image"].is_array());

    let (status, body) = upload(
        &app,
        &session["id"],
        &token,
        multipart_body(&[], Some(("notes.txt", "text/plain", &b"hello"[..]))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["errors"]["image"].is_array());

    let visit_id = other_visit["id"].to_string();
    let (status, body) = upload(
        &app,
        &session["id"],
        &token,
        multipart_body(
            &[("spot_visit", visit_id.as_str())],
            Some(("a.png", "image/png", &b"\x89PNGdata"[..])),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["errors"]["spot_visit"].is_array());

    let (_, photos) = app
        .get(&format!("/api/walk-sessions/{}/photos/", session["id"]), Some(&token))
        .await;
    assert!(photos.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_photo_upload_to_foreign_session_is_forbidden() {
    let app = common::create_test_app().await;
    let alice = app.login_as("alice").await;
    let bob = app.login_as("bob").await;

    let (_, session) = app
        .post("/api/walk-sessions/", Some(&alice), json!({}))
        .await;
    let (status, _) = upload(
        &app,
        &session["id"],
        &bob,
        multipart_body(&[], Some(("a.png", "image/png", &b"\x89PNGdata"[..]))),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_privacy_masks_are_scoped_to_owner() {
    let app = common::create_test_app().await;
    let alice = app.login_as("alice").await;
    let bob = app.login_as("bob").await;

    let (status, mask) = app
        .post(
            "/api/user-privacy-masks/",
            Some(&alice),
            json!({"center_lat": 35.68, "center_lng": 139.76, "radius_m": 200}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", mask);
    let uri = format!("/api/user-privacy-masks/{}/", mask["id"]);

    let (_, bob_list) = app.get("/api/user-privacy-masks/", Some(&bob)).await;
    assert!(bob_list.as_array().unwrap().is_empty());

    let (status, _) = app.get(&uri, Some(&bob)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app.put(&uri, Some(&bob), json!({"radius_m": 1})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app.delete(&uri, Some(&bob)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, updated) = app.put(&uri, Some(&alice), json!({"radius_m": 350})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["radius_m"], 350);
    assert_eq!(updated["center_lat"], 35.68);

    let (status, _) = app.delete(&uri, Some(&alice)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, alice_list) = app.get("/api/user-privacy-masks/", Some(&alice)).await;
    assert!(alice_list.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_privacy_mask_radius_must_be_positive() {
    let app = common::create_test_app().await;
    let token = app.login_as("hanako").await;

    let (status, body) = app
        .post(
            "/api/user-privacy-masks/",
            Some(&token),
            json!({"center_lat": 35.0, "center_lng": 135.0, "radius_m": 0}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["errors"]["radius_m"].is_array());

    let (status, _) = app
        .post(
            "/api/user-privacy-masks/",
            Some(&token),
            json!({"center_lat": 95.0, "center_lng": 135.0, "radius_m": 10}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
