//! HTTP API integration tests against a real on-disk catalog.

mod common;

use axum::http::StatusCode;
use common::{episode_ids, response_json, TestApp};
use serde_json::json;
use std::time::Duration;

#[tokio::test]
async fn root_reports_running() {
    let app = TestApp::new();
    let response = app.get("/").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body, json!({"status": "OK", "message": "API is running"}));
}

#[tokio::test]
async fn health_is_ok_with_a_catalog() {
    let app = TestApp::new();
    let response = app.get("/api/health").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["status"], "ok");
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn health_is_unavailable_without_a_catalog() {
    let app = TestApp::without_catalog();
    let response = app.get("/api/health").await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(response_json(response).await["status"], "unhealthy");
}

#[tokio::test]
async fn unfiltered_listing_returns_everything_in_air_date_order() {
    let app = TestApp::new();
    let response = app.get("/api/episodes").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    assert_eq!(episode_ids(&body), vec![1, 2, 3]);
    assert_eq!(
        body["pagination"],
        json!({"page": 1, "per_page": 20, "total": 3, "pages": 1})
    );
    assert_eq!(body["filters_applied"]["logic"], "AND");

    let first = &body["episodes"][0];
    assert_eq!(first["title"], "Winter Sun");
    assert_eq!(first["air_date"], "1983-12-06");
    assert_eq!(first["subjects"], json!(["Mountain", "Trees"]));
    assert_eq!(first["tools"], json!(["Fan Brush"]));
    assert!(first["image_url"].is_null());
}

#[tokio::test]
async fn month_and_tool_intersect_by_default() {
    let app = TestApp::new();
    let body = response_json(app.get("/api/episodes?month=12&tool=Fan%20Brush").await).await;
    assert_eq!(episode_ids(&body), vec![1]);
    assert_eq!(body["filters_applied"]["months"], json!([12]));
    assert_eq!(body["filters_applied"]["tools"], json!(["Fan Brush"]));
}

#[tokio::test]
async fn or_mode_unions_dimensions() {
    let app = TestApp::new();
    for mode in ["mode=OR", "filter_type=or", "logic=Or"] {
        let uri = format!("/api/episodes?month=12&tool=Fan+Brush&{mode}");
        let body = response_json(app.get(&uri).await).await;
        assert_eq!(episode_ids(&body), vec![1, 2, 3], "{mode}");
        assert_eq!(body["filters_applied"]["logic"], "OR");
    }
}

#[tokio::test]
async fn repeated_keys_or_within_a_dimension() {
    let app = TestApp::new();
    let body = response_json(app.get("/api/episodes?color=blue&color=RED").await).await;
    assert_eq!(episode_ids(&body), vec![1, 2, 3]);

    let body = response_json(app.get("/api/episodes?color=blue&subject=cabin").await).await;
    assert!(episode_ids(&body).is_empty());
    assert_eq!(body["pagination"]["pages"], 0);
}

#[tokio::test]
async fn qualifier_does_not_hide_an_association() {
    let app = TestApp::new();
    // E3 links Van Dyke Brown with used: false; it still matches and shows.
    let body = response_json(app.get("/api/episodes?color=van%20dyke").await).await;
    assert_eq!(episode_ids(&body), vec![2, 3]);
    assert_eq!(
        body["episodes"][1]["colors"],
        json!(["Bright Red", "Van Dyke Brown"])
    );
}

#[tokio::test]
async fn episode_and_id_filters() {
    let app = TestApp::new();

    let body = response_json(app.get("/api/episodes?title=CABIN&season=1").await).await;
    assert_eq!(episode_ids(&body), vec![3]);
    assert_eq!(body["filters_applied"]["titles"], json!(["CABIN"]));
    assert_eq!(body["filters_applied"]["seasons"], json!([1]));

    let uri = "/api/episodes?tool_id=TL002&technique_id=T001";
    let body = response_json(app.get(&format!("{uri}&filter_type=OR")).await).await;
    assert_eq!(episode_ids(&body), vec![1, 2, 3]);
    let body = response_json(app.get(uri).await).await;
    assert!(episode_ids(&body).is_empty());

    let uri = "/api/episodes?episode_id=2&episode_id=3&color=red";
    let body = response_json(app.get(uri).await).await;
    assert_eq!(episode_ids(&body), vec![3]);
    assert!(body["filters_applied"].get("color_ids").is_none());

    let response = app.get("/api/episodes?color_id=red").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(response_json(response).await["field"], "color_ids");
}

#[tokio::test]
async fn subject_ids_come_from_the_reference_list() {
    let app = TestApp::new();
    let subjects = response_json(app.get("/api/reference/subjects").await).await;
    let cabin = subjects
        .as_array()
        .unwrap()
        .iter()
        .find(|s| s["name"] == "Cabin")
        .unwrap()["id"]
        .as_i64()
        .unwrap();

    let body = response_json(app.get(&format!("/api/episodes?subject_id={cabin}")).await).await;
    assert_eq!(episode_ids(&body), vec![3]);
}

#[tokio::test]
async fn second_page_of_two() {
    let app = TestApp::new();
    let body = response_json(app.get("/api/episodes?page=2&per_page=2").await).await;
    assert_eq!(episode_ids(&body), vec![3]);
    assert_eq!(
        body["pagination"],
        json!({"page": 2, "per_page": 2, "total": 3, "pages": 2})
    );
}

#[tokio::test]
async fn page_past_the_end_is_empty_not_an_error() {
    let app = TestApp::new();
    let response = app.get("/api/episodes?page=5&per_page=2").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert!(episode_ids(&body).is_empty());
    assert_eq!(body["pagination"]["total"], 3);
    assert_eq!(body["pagination"]["pages"], 2);
}

#[tokio::test]
async fn huge_page_number_is_past_the_end() {
    let app = TestApp::new();
    let response = app.get("/api/episodes?page=4294967296&per_page=2").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert!(episode_ids(&body).is_empty());
    assert_eq!(
        body["pagination"],
        json!({"page": 4294967296u64, "per_page": 2, "total": 3, "pages": 2})
    );
}

#[tokio::test]
async fn oversized_per_page_is_clamped() {
    let app = TestApp::new();
    let body = response_json(app.get("/api/episodes?per_page=1000").await).await;
    assert_eq!(body["pagination"]["per_page"], 100);
}

#[tokio::test]
async fn invalid_month_is_a_bad_request() {
    let app = TestApp::new();
    let response = app.get("/api/episodes?month=13").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response).await;
    assert_eq!(body["error"], "invalid_filter");
    assert_eq!(body["field"], "months");
    assert!(body.get("episodes").is_none());
}

#[tokio::test]
async fn malformed_paging_and_mode_are_bad_requests() {
    let app = TestApp::new();

    let body = response_json(app.get("/api/episodes?page=0").await).await;
    assert_eq!(body["error"], "invalid_pagination");
    assert_eq!(body["field"], "page");

    let response = app.get("/api/episodes?per_page=lots").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app.get("/api/episodes?mode=XOR").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(response_json(response).await["field"], "logic");
}

#[tokio::test]
async fn zero_timeout_is_a_gateway_timeout() {
    let app = TestApp::with_timeout(Duration::ZERO);
    let response = app.get("/api/episodes").await;
    assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(response_json(response).await["error"], "cancelled");
}

#[tokio::test]
async fn missing_catalog_is_a_server_error() {
    let app = TestApp::without_catalog();
    let response = app.get("/api/episodes").await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = response_json(response).await;
    assert_eq!(body["message"], "internal server error");
}

#[tokio::test]
async fn reference_lists_are_sorted_by_name() {
    let app = TestApp::new();

    let colors = response_json(app.get("/api/reference/colors").await).await;
    assert_eq!(colors[0]["name"], "Bright Red");
    assert_eq!(colors[0]["hex_code"], "#DB0000");
    assert_eq!(colors.as_array().unwrap().len(), 3);

    let subjects = response_json(app.get("/api/reference/subjects").await).await;
    let names: Vec<&str> = subjects
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Cabin", "Mountain", "Trees"]);

    let tools = response_json(app.get("/api/reference/tools").await).await;
    assert_eq!(
        tools[0],
        json!({"id": "TL001", "name": "Fan Brush", "category": "Brush"})
    );

    let techniques = response_json(app.get("/api/reference/techniques").await).await;
    assert_eq!(
        techniques[0],
        json!({"id": "T002", "name": "Knife Painting", "difficulty_level": "Intermediate"})
    );
}

#[tokio::test]
async fn tool_compatibility() {
    let app = TestApp::new();

    let body = response_json(app.get("/api/reference/tools/TL002/techniques").await).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["name"], "Knife Painting");

    let response = app.get("/api/reference/tools/TL999/techniques").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(response_json(response).await["error"], "not_found");
}
