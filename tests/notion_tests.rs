//! # Notion Client Tests
//!
//! HTTP-level tests of the Notion backend against a wiremock server.

use chrono::NaiveDate;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use task_capture::backend::{GuardedBackend, TaskBackend};
use task_capture::config::{NotionConfig, RecoveryConfig};
use task_capture::errors::TaskError;
use task_capture::notion::NotionClient;
use task_capture::task_model::{Category, NewTask, Priority};

const DATABASE_ID: &str = "db-1";

fn client(server: &MockServer) -> NotionClient {
    let config = NotionConfig::new("secret-token", DATABASE_ID).with_api_url(server.uri());
    NotionClient::new(&config).expect("client builds")
}

fn page(id: &str, name: &str, tag: &str) -> serde_json::Value {
    json!({
        "id": id,
        "properties": {
            "Name": { "title": [{ "plain_text": name }] },
            "Tags": { "multi_select": [{ "name": tag }] },
            "Priority": { "select": null },
            "Due Date": { "date": null },
            "PMD": { "number": null },
            "Status": { "status": { "name": "Not started" } }
        }
    })
}

#[tokio::test]
async fn test_query_follows_pagination() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/databases/db-1/query"))
        .and(header("Authorization", "Bearer secret-token"))
        .and(header("Notion-Version", "2022-06-28"))
        .and(body_json(json!({})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [page("p1", "First", "Work")],
            "has_more": true,
            "next_cursor": "cursor-2"
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/databases/db-1/query"))
        .and(body_json(json!({ "start_cursor": "cursor-2" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [page("p2", "Second", "Home")],
            "has_more": false,
            "next_cursor": null
        })))
        .expect(1)
        .mount(&server)
        .await;

    let records = client(&server).query_records().await.unwrap();
    let names: Vec<&str> = records.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["First", "Second"]);
    assert_eq!(records[1].tags, vec!["Home"]);
    assert_eq!(records[0].status, "Not started");
}

#[tokio::test]
async fn test_create_sends_all_fields() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/pages"))
        .and(body_json(json!({
            "parent": { "database_id": "db-1" },
            "properties": {
                "Name": { "title": [{ "text": { "content": "Buy milk" } }] },
                "Tags": { "multi_select": [{ "name": "Work" }] },
                "Priority": { "select": { "name": "High" } },
                "PMD": { "number": 2.0 },
                "Due Date": { "date": { "start": "2026-10-20" } }
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "new-page" })))
        .expect(1)
        .mount(&server)
        .await;

    let task = NewTask::new("Buy milk", Category::Work)
        .with_weight(Some(2.0))
        .with_priority(Some(Priority::High))
        .with_due_date(NaiveDate::from_ymd_opt(2026, 10, 20));

    let id = client(&server).create_record(&task).await.unwrap();
    assert_eq!(id, "new-page");
}

#[tokio::test]
async fn test_schema_is_sorted() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/databases/db-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "properties": {
                "Tags": { "type": "multi_select" },
                "Name": { "type": "title" },
                "PMD": { "type": "number" }
            }
        })))
        .mount(&server)
        .await;

    let schema = client(&server).fetch_schema().await.unwrap();
    assert_eq!(
        schema,
        vec![
            ("Name".to_string(), "title".to_string()),
            ("PMD".to_string(), "number".to_string()),
            ("Tags".to_string(), "multi_select".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_error_status_is_backend_unavailable() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/pages"))
        .respond_with(ResponseTemplate::new(400).set_body_string("validation_error"))
        .mount(&server)
        .await;

    let err = client(&server)
        .create_record(&NewTask::new("Broken", Category::Today))
        .await
        .unwrap_err();
    match err {
        TaskError::BackendUnavailable(message) => assert!(message.contains("validation_error")),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_guarded_backend_stops_calling_after_threshold() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/databases/db-1"))
        .respond_with(ResponseTemplate::new(503))
        .expect(2)
        .mount(&server)
        .await;

    let recovery = RecoveryConfig {
        circuit_breaker_threshold: 2,
        ..RecoveryConfig::default()
    };
    let backend = GuardedBackend::new(client(&server), recovery);

    for _ in 0..4 {
        assert!(backend.fetch_schema().await.is_err());
    }
    // Mock expectations verify only two requests reached the server
}
