//! Notion database client.
//!
//! Implements [`TaskBackend`] over the Notion REST API. Tasks live in a
//! single database with `Name` (title), `Tags` (multi-select), `Priority`
//! (select), `PMD` (number), `Due Date` (date) and `Status` properties.

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{debug, error, info};

use crate::backend::TaskBackend;
use crate::config::NotionConfig;
use crate::errors::TaskError;
use crate::task_model::{NewTask, RecordId, TaskRecord};

const UNTITLED: &str = "Untitled";
const DEFAULT_STATUS: &str = "Not started";

#[derive(Debug, Deserialize)]
struct QueryPage {
    results: Vec<Value>,
    #[serde(default)]
    has_more: bool,
    next_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CreatedPage {
    id: String,
}

#[derive(Debug, Deserialize)]
struct DatabaseSchema {
    properties: Map<String, Value>,
}

/// HTTP client for one Notion database
#[derive(Debug, Clone)]
pub struct NotionClient {
    http: Client,
    base_url: String,
    database_id: String,
}

impl NotionClient {
    pub fn new(config: &NotionConfig) -> Result<Self, TaskError> {
        let mut headers = HeaderMap::new();
        let auth = HeaderValue::from_str(&format!("Bearer {}", config.token))
            .map_err(|e| TaskError::Config(format!("invalid Notion token: {e}")))?;
        headers.insert(AUTHORIZATION, auth);
        let version = HeaderValue::from_str(&config.api_version)
            .map_err(|e| TaskError::Config(format!("invalid Notion version: {e}")))?;
        headers.insert("Notion-Version", version);

        let http = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|e| TaskError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            database_id: config.database_id.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn check(response: Response, operation: &str) -> Result<Response, TaskError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        error!(operation, status = %status, body = %body, "Notion request failed");
        Err(TaskError::BackendUnavailable(format!(
            "{operation} returned {status}: {body}"
        )))
    }
}

#[async_trait]
impl TaskBackend for NotionClient {
    async fn query_records(&self) -> Result<Vec<TaskRecord>, TaskError> {
        debug!(database_id = %self.database_id, "Querying tasks from Notion");
        let url = self.url(&format!("databases/{}/query", self.database_id));
        let mut records = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let body = match &cursor {
                Some(cursor) => json!({ "start_cursor": cursor }),
                None => json!({}),
            };
            let response = self.http.post(&url).json(&body).send().await?;
            let page: QueryPage = Self::check(response, "query").await?.json().await?;

            records.extend(page.results.iter().map(parse_task_record));

            match page.next_cursor {
                Some(next) if page.has_more => cursor = Some(next),
                _ => break,
            }
        }

        info!(count = records.len(), "Fetched tasks from Notion");
        Ok(records)
    }

    async fn create_record(&self, task: &NewTask) -> Result<RecordId, TaskError> {
        debug!(task = ?task, "Adding task to Notion");
        let body = build_create_body(&self.database_id, task);
        let response = self.http.post(self.url("pages")).json(&body).send().await?;
        let created: CreatedPage = Self::check(response, "create").await?.json().await?;

        info!(record_id = %created.id, category = %task.category, "Task added to Notion");
        Ok(created.id)
    }

    async fn fetch_schema(&self) -> Result<Vec<(String, String)>, TaskError> {
        debug!(database_id = %self.database_id, "Getting database structure from Notion");
        let url = self.url(&format!("databases/{}", self.database_id));
        let response = self.http.get(url).send().await?;
        let schema: DatabaseSchema = Self::check(response, "schema").await?.json().await?;

        let mut properties: Vec<(String, String)> = schema
            .properties
            .iter()
            .map(|(name, property)| {
                let kind = property
                    .get("type")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown");
                (name.clone(), kind.to_string())
            })
            .collect();
        properties.sort();
        Ok(properties)
    }
}

/// Map a Notion page object onto a task record.
///
/// Missing or malformed properties fall back to defaults rather than failing
/// the whole query.
pub fn parse_task_record(page: &Value) -> TaskRecord {
    let properties = &page["properties"];

    let name = properties["Name"]["title"][0]["plain_text"]
        .as_str()
        .unwrap_or(UNTITLED)
        .to_string();
    let tags = properties["Tags"]["multi_select"]
        .as_array()
        .map(|tags| {
            tags.iter()
                .filter_map(|tag| tag["name"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();
    let priority = properties["Priority"]["select"]["name"]
        .as_str()
        .map(str::to_string);
    let due_date = properties["Due Date"]["date"]["start"]
        .as_str()
        .and_then(|start| start.get(..10))
        .and_then(|day| NaiveDate::parse_from_str(day, "%Y-%m-%d").ok());
    let weight = properties["PMD"]["number"].as_f64();
    let status = properties["Status"]["status"]["name"]
        .as_str()
        .unwrap_or(DEFAULT_STATUS)
        .to_string();

    TaskRecord {
        id: page["id"].as_str().unwrap_or_default().to_string(),
        name,
        tags,
        priority,
        due_date,
        weight,
        status,
    }
}

/// Request body creating `task` as a page of `database_id`
pub fn build_create_body(database_id: &str, task: &NewTask) -> Value {
    json!({
        "parent": { "database_id": database_id },
        "properties": {
            "Name": {
                "title": [{ "text": { "content": task.name } }]
            },
            "Tags": {
                "multi_select": [{ "name": task.category.to_string() }]
            },
            "Priority": {
                "select": task.priority.map(|p| json!({ "name": p.to_string() }))
            },
            "PMD": {
                "number": task.weight
            },
            "Due Date": {
                "date": task.due_date.map(|d| json!({ "start": d.format("%Y-%m-%d").to_string() }))
            }
        }
    })
}
