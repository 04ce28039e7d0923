//! Router tests against an offline context: no language model, hashing
//! embeddings and a SQLite vector store in a temp directory.

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;

use riskwatch::config::{EmbeddingProviderKind, VectorBackend};
use riskwatch::constants::chat::UNAVAILABLE_REPLY;
use riskwatch::dashboard::{AppState, create_router};
use riskwatch::data::sample_dataset;
use riskwatch::{AppContext, Config};

fn offline_context(temp: &TempDir) -> AppContext {
    let mut config = Config::default();
    config.llm.provider = "none".to_string();
    config.embedding.provider = EmbeddingProviderKind::Hashing;
    config.vector_db.backend = VectorBackend::Sqlite;
    config.vector_db.path = temp.path().join("vectors.db");
    config.chat.history_path = temp.path().join("chat_history.json");
    config.data.seed = Some(7);
    AppContext::from_config(config).unwrap()
}

fn app(temp: &TempDir) -> Router {
    create_router(AppState::new(offline_context(temp)))
}

async fn send(app: Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Vec<u8>) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, bytes.to_vec())
}

async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
    let (status, bytes) = send(app, Method::GET, uri, None).await;
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn health_check() {
    let temp = TempDir::new().unwrap();
    let (status, body) = get_json(app(&temp), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn index_serves_page() {
    let temp = TempDir::new().unwrap();
    let (status, bytes) = send(app(&temp), Method::GET, "/", None).await;
    assert_eq!(status, StatusCode::OK);
    let html = String::from_utf8(bytes).unwrap();
    assert!(html.contains("AI Project Risk Management Dashboard"));
}

#[tokio::test]
async fn meta_lists_projects_and_bounds() {
    let temp = TempDir::new().unwrap();
    let (status, body) = get_json(app(&temp), "/api/meta").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["projects"][0], "All Projects");
    assert_eq!(body["projects"].as_array().unwrap().len(), 6);
    assert_eq!(body["days"]["min"], 7);
    assert_eq!(body["days"]["max"], 90);
    assert_eq!(body["llm_enabled"], false);
    assert_eq!(body["levels"].as_array().unwrap().len(), 4);
    assert_eq!(body["thresholds"][0]["label"], "Low Risk");
}

#[tokio::test]
async fn dashboard_metrics_match_register() {
    let temp = TempDir::new().unwrap();
    let (status, body) =
        get_json(app(&temp), "/api/dashboard?project=Cloud%20Migration&days=30").await;
    assert_eq!(status, StatusCode::OK);

    let metrics = &body["metrics"];
    let total = metrics["total_risks"].as_u64().unwrap();
    assert!(total > 0);
    assert_eq!(body["heatmap"]["points"].as_array().unwrap().len() as u64, total);
    assert!(metrics["risk_trend"].as_str().unwrap().ends_with('%'));
    assert!(metrics["mitigation_rate"].as_str().unwrap().ends_with('%'));
    assert_eq!(body["trend"]["reference_lines"].as_array().unwrap().len(), 3);

    let level_total: u64 = body["levels"]
        .as_array()
        .unwrap()
        .iter()
        .map(|l| l["count"].as_u64().unwrap())
        .sum();
    assert_eq!(level_total, total);
}

#[tokio::test]
async fn days_out_of_range_is_rejected() {
    let temp = TempDir::new().unwrap();
    let (status, body) = get_json(app(&temp), "/api/dashboard?days=3").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
}

#[tokio::test]
async fn risks_filters_and_messages() {
    let temp = TempDir::new().unwrap();
    let router = app(&temp);

    let (status, all) = get_json(router.clone(), "/api/risks?project=Cloud%20Migration").await;
    assert_eq!(status, StatusCode::OK);
    assert!(all["message"].is_null());
    let first = &all["risks"][0];
    let heading = first["heading"].as_str().unwrap();
    assert!(heading.contains(" Risk: "));
    assert!(first["score"].is_u64());

    let (_, none) = get_json(
        router.clone(),
        "/api/risks?project=Cloud%20Migration&categories=Nonexistent",
    )
    .await;
    assert_eq!(none["total"], 0);
    assert_eq!(none["message"], "No risks match your current filters.");

    let (status, _) = get_json(router, "/api/risks?levels=Severe").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn search_falls_back_when_store_is_empty() {
    let temp = TempDir::new().unwrap();
    let (status, body) =
        get_json(app(&temp), "/api/risks?project=Cloud%20Migration&q=vendor").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["searched"], false);
    assert_eq!(body["message"], "No matching risks found. Showing all risks.");
    assert!(body["total"].as_u64().unwrap() > 0);
}

#[tokio::test]
async fn search_uses_seeded_risks() {
    let temp = TempDir::new().unwrap();
    let ctx = offline_context(&temp);
    ctx.repository
        .populate_sample_data(&sample_dataset())
        .await
        .unwrap();
    let router = create_router(AppState::new(ctx));

    let (status, body) = get_json(router, "/api/risks?q=budget%20overrun").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["searched"], true);
    let total = body["total"].as_u64().unwrap();
    assert!(total > 0 && total <= 10);
}

#[tokio::test]
async fn search_within_project_uses_stored_project_id() {
    let temp = TempDir::new().unwrap();
    let ctx = offline_context(&temp);
    ctx.repository
        .populate_sample_data(&sample_dataset())
        .await
        .unwrap();
    let router = create_router(AppState::new(ctx));

    let (status, body) = get_json(
        router,
        "/api/risks?project=Cloud%20Migration&q=data%20migration",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["searched"], true);
    assert!(body["message"].is_null());

    let risks = body["risks"].as_array().unwrap();
    assert!(!risks.is_empty());
    assert!(risks.iter().all(|r| r["project_id"] == "p1001"));
    assert!(risks.iter().any(|r| r["name"] == "Data Security Breach"));
}

#[tokio::test]
async fn csv_export_names_file_after_project() {
    let temp = TempDir::new().unwrap();
    let request = Request::builder()
        .uri("/api/risks.csv?project=Cloud%20Migration")
        .body(Body::empty())
        .unwrap();
    let response = app(&temp).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let disposition = response.headers()[header::CONTENT_DISPOSITION]
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.contains("risk_report_cloud_migration_"));
    assert!(disposition.ends_with(".csv\""));

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let csv = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(csv.starts_with("id,title,category"));
}

#[tokio::test]
async fn report_as_markdown() {
    let temp = TempDir::new().unwrap();
    let (status, bytes) = send(
        app(&temp),
        Method::GET,
        "/api/report?project=Cloud%20Migration&format=markdown",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let report = String::from_utf8(bytes).unwrap();
    assert!(report.starts_with("# Risk Report: Cloud Migration"));
}

#[tokio::test]
async fn chat_round_trip_without_llm() {
    let temp = TempDir::new().unwrap();
    let router = app(&temp);

    let (status, bytes) = send(
        router.clone(),
        Method::POST,
        "/api/chat",
        Some(json!({ "message": "What are the top risks?", "project": "Cloud Migration" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["reply"], UNAVAILABLE_REPLY);
    assert_eq!(body["history"].as_array().unwrap().len(), 2);
    assert_eq!(body["history"][0]["role"], "user");
    assert_eq!(body["history"][1]["role"], "assistant");

    let (_, history) = get_json(router.clone(), "/api/chat").await;
    assert_eq!(history.as_array().unwrap().len(), 2);

    let (status, _) = send(router.clone(), Method::DELETE, "/api/chat", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, history) = get_json(router, "/api/chat").await;
    assert!(history.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn empty_chat_message_is_rejected() {
    let temp = TempDir::new().unwrap();
    let (status, _) = send(
        app(&temp),
        Method::POST,
        "/api/chat",
        Some(json!({ "message": "   " })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn tools_listing_and_execution() {
    let temp = TempDir::new().unwrap();
    let router = app(&temp);

    let (_, tools) = get_json(router.clone(), "/api/tools").await;
    assert_eq!(tools.as_array().unwrap().len(), 13);

    let (status, bytes) = send(
        router.clone(),
        Method::POST,
        "/api/tools/calculate_risk_score",
        Some(json!({ "project_name": "Cloud Migration" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert!(body["overall_score"].as_u64().unwrap() <= 100);

    let (status, _) = send(
        router,
        Method::POST,
        "/api/tools/launch_rockets",
        Some(json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
