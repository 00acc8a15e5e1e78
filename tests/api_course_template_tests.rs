//! Course template catalog tests: creation atomicity, ordering, visibility
//! and ownership rules.

use axum::http::StatusCode;
use sanpo::db::{seed_sample_courses, CourseTemplateRepo};
use serde_json::json;

mod common;

#[tokio::test]
async fn test_unknown_mode_code_writes_nothing() {
    let app = common::create_test_app().await;
    let token = app.login_as("hanako").await;

    let payload = common::template_payload("Broken", 3, &["walk", "doesnotexist"]);
    let (status, body) = app.post("/api/course-templates/", Some(&token), payload).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let messages = body["errors"]["mode_codes"].as_array().unwrap();
    assert!(messages[0].as_str().unwrap().contains("doesnotexist"));
    assert!(!messages[0].as_str().unwrap().contains("walk,"));

    assert_eq!(CourseTemplateRepo::count(&app.state.db).await.unwrap(), 0);
    let spots: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM course_spot_templates")
        .fetch_one(&app.state.db)
        .await
        .unwrap();
    assert_eq!(spots.0, 0);
}

#[tokio::test]
async fn test_spots_come_back_in_submitted_order() {
    let app = common::create_test_app().await;
    let token = app.login_as("hanako").await;

    let mut payload = common::template_payload("Morning loop", 4, &["walk", "meal", "walk"]);
    payload["spots"].as_array_mut().unwrap().reverse();

    let (status, created) = app.post("/api/course-templates/", Some(&token), payload).await;
    assert_eq!(status, StatusCode::CREATED, "{}", created);
    assert_eq!(created["is_system"], false);
    assert_eq!(created["modes"].as_array().unwrap().len(), 2);

    let id = created["id"].as_i64().unwrap();
    let (status, fetched) = app
        .get(&format!("/api/course-templates/{}/", id), Some(&token))
        .await;
    assert_eq!(status, StatusCode::OK);

    let spots = fetched["spots"].as_array().unwrap();
    assert_eq!(spots.len(), 4);
    let orders: Vec<i64> = spots.iter().map(|s| s["order"].as_i64().unwrap()).collect();
    assert_eq!(orders, vec![1, 2, 3, 4]);
    assert_eq!(spots[0]["name"], "Spot 1");
}

#[tokio::test]
async fn test_spot_validation() {
    let app = common::create_test_app().await;
    let token = app.login_as("hanako").await;

    let mut empty = common::template_payload("No spots", 0, &["walk"]);
    empty["spots"] = json!([]);
    let (status, body) = app.post("/api/course-templates/", Some(&token), empty).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["errors"]["spots"].is_array());

    let mut duplicated = common::template_payload("Twice", 2, &[]);
    duplicated["spots"][1]["order"] = json!(1);
    let (status, _) = app.post("/api/course-templates/", Some(&token), duplicated).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .post(
            "/api/course-templates/",
            None,
            common::template_payload("Anonymous", 1, &[]),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_anonymous_list_shows_only_public_templates() {
    let app = common::create_test_app().await;
    seed_sample_courses(&app.state.db).await.unwrap();

    let token = app.login_as("hanako").await;
    let (status, _) = app
        .post(
            "/api/course-templates/",
            Some(&token),
            common::template_payload("Private loop", 1, &["walk"]),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, anonymous) = app.get("/api/course-templates/", None).await;
    assert_eq!(status, StatusCode::OK);
    let anonymous = anonymous.as_array().unwrap();
    assert_eq!(anonymous.len(), 3);
    assert!(anonymous.iter().all(|t| t["is_public"] == true));

    let (_, owner_view) = app.get("/api/course-templates/", Some(&token)).await;
    assert_eq!(owner_view.as_array().unwrap().len(), 4);

    let (_, mine) = app
        .get("/api/course-templates/?mine=true", Some(&token))
        .await;
    let mine = mine.as_array().unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0]["title"], "Private loop");

    let other = app.login_as("taro").await;
    let (_, other_view) = app.get("/api/course-templates/", Some(&other)).await;
    assert_eq!(other_view.as_array().unwrap().len(), 3);

    let private_id = mine[0]["id"].as_i64().unwrap();
    let (status, _) = app
        .get(&format!("/api/course-templates/{}/", private_id), Some(&other))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_list_filters() {
    let app = common::create_test_app().await;
    seed_sample_courses(&app.state.db).await.unwrap();

    let (_, hungry) = app.get("/api/course-templates/?mood=hungry", None).await;
    let hungry = hungry.as_array().unwrap();
    assert_eq!(hungry.len(), 1);
    assert_eq!(hungry[0]["mood"], "hungry");

    let (_, sightseeing) = app
        .get("/api/course-templates/?mode=sightseeing", None)
        .await;
    assert_eq!(sightseeing.as_array().unwrap().len(), 1);

    let (status, _) = app.get("/api/course-templates/?mood=sleepy", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_system_templates_are_read_only() {
    let app = common::create_test_app().await;
    seed_sample_courses(&app.state.db).await.unwrap();
    let token = app.login_as("hanako").await;

    let (_, list) = app.get("/api/course-templates/", Some(&token)).await;
    let system_id = list[0]["id"].as_i64().unwrap();
    assert_eq!(list[0]["is_system"], true);
    assert!(list[0]["owner"].is_null());

    let (status, _) = app
        .put(
            &format!("/api/course-templates/{}/", system_id),
            Some(&token),
            json!({"title": "Mine now"}),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .delete(&format!("/api/course-templates/{}/", system_id), Some(&token))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_owner_can_update_and_delete() {
    let app = common::create_test_app().await;
    let token = app.login_as("hanako").await;
    let other = app.login_as("taro").await;

    let mut payload = common::template_payload("Shared loop", 2, &["walk"]);
    payload["is_public"] = json!(true);
    let (_, created) = app.post("/api/course-templates/", Some(&token), payload).await;
    let uri = format!("/api/course-templates/{}/", created["id"]);

    let (status, _) = app
        .put(&uri, Some(&other), json!({"title": "Hijacked"}))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, updated) = app
        .put(
            &uri,
            Some(&token),
            json!({
                "title": "Evening loop",
                "mode_codes": ["meal"],
                "spots": [
                    {"order": 1, "name": "Izakaya", "place_id": "p-9", "category": "food"}
                ]
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", updated);
    assert_eq!(updated["title"], "Evening loop");
    assert_eq!(updated["modes"][0]["code"], "meal");
    assert_eq!(updated["spots"].as_array().unwrap().len(), 1);

    let (status, _) = app
        .put(&uri, Some(&token), json!({"mode_codes": ["teleport"]}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.delete(&uri, Some(&token)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = app.get(&uri, Some(&token)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
