//! # Bot Configuration Module
//!
//! This module defines configuration structures for the task capture bot,
//! including dialogue timeouts, the closed option sets offered as buttons,
//! Notion connection settings and recovery behaviour.

use std::env;
use std::time::Duration;

use crate::errors::TaskError;
use crate::task_model::{Category, Priority};

// Constants for dialogue configuration
pub const DEFAULT_SELECTION_TIMEOUT_SECS: u64 = 30;
pub const INITIAL_DUE_DATE_TIMEOUT_SECS: u64 = 60;
pub const CALENDAR_SPAN_DAYS: u32 = 29;
pub const MAX_CALLBACK_PAYLOAD_LEN: usize = 64; // Telegram callback_data limit in bytes
pub const DRAFT_TTL_SECS: u64 = 10 * 60;
pub const WEIGHT_OPTIONS: [f64; 7] = [1.0, 2.0, 3.0, 4.0, 6.0, 8.0, 10.0];

// Constants for Notion configuration
pub const DEFAULT_NOTION_API_URL: &str = "https://api.notion.com/v1/";
pub const DEFAULT_NOTION_VERSION: &str = "2022-06-28";
pub const DEFAULT_NOTION_TIMEOUT_SECS: u64 = 60;

/// Timeouts applied to each waiting stage of the dialogue
#[derive(Debug, Clone)]
pub struct DialogTimeouts {
    /// Waiting for a category after the task text arrived
    pub category: Duration,
    /// Waiting for a PMD weight
    pub weight: Duration,
    /// Waiting for a priority
    pub priority: Duration,
    /// Waiting for a due date straight after the category
    pub due_date_after_category: Duration,
    /// Waiting for a due date after the priority step
    pub due_date_after_priority: Duration,
}

impl Default for DialogTimeouts {
    fn default() -> Self {
        Self {
            category: Duration::from_secs(DEFAULT_SELECTION_TIMEOUT_SECS),
            weight: Duration::from_secs(DEFAULT_SELECTION_TIMEOUT_SECS),
            priority: Duration::from_secs(DEFAULT_SELECTION_TIMEOUT_SECS),
            due_date_after_category: Duration::from_secs(INITIAL_DUE_DATE_TIMEOUT_SECS),
            due_date_after_priority: Duration::from_secs(DEFAULT_SELECTION_TIMEOUT_SECS),
        }
    }
}

/// Configuration of the task creation dialogue
#[derive(Debug, Clone)]
pub struct DialogConfig {
    /// Categories offered on the first step, in display order
    pub categories: Vec<Category>,
    /// Category committed when the first step times out
    pub default_category: Category,
    /// Categories that continue with a PMD weight step
    pub weight_categories: Vec<Category>,
    /// Categories that end with a due date step
    pub date_categories: Vec<Category>,
    /// Weight values offered as buttons (a skip button is always added)
    pub weight_options: Vec<f64>,
    /// Priorities offered as buttons (a skip button is always added)
    pub priority_options: Vec<Priority>,
    /// Stage timeouts
    pub timeouts: DialogTimeouts,
    /// Number of days offered by the calendar, starting tomorrow
    pub calendar_days: u32,
    /// Maximum callback payload size accepted by the transport
    pub max_payload_len: usize,
    /// How long an unreleased draft is kept before eviction
    pub draft_ttl: Duration,
}

impl DialogConfig {
    pub fn is_weight_eligible(&self, category: Category) -> bool {
        self.weight_categories.contains(&category)
    }

    pub fn is_date_eligible(&self, category: Category) -> bool {
        self.date_categories.contains(&category)
    }

    pub fn is_weight_option(&self, weight: f64) -> bool {
        self.weight_options.iter().any(|w| (w - weight).abs() < f64::EPSILON)
    }
}

impl Default for DialogConfig {
    fn default() -> Self {
        Self {
            categories: vec![
                Category::Today,
                Category::Work,
                Category::Home,
                Category::Global,
                Category::Everyday,
                Category::Personal,
            ],
            default_category: Category::Today,
            weight_categories: vec![
                Category::Home,
                Category::Work,
                Category::Global,
                Category::Personal,
            ],
            date_categories: vec![Category::Work, Category::Home],
            weight_options: WEIGHT_OPTIONS.to_vec(),
            priority_options: vec![Priority::Low, Priority::Med, Priority::High],
            timeouts: DialogTimeouts::default(),
            calendar_days: CALENDAR_SPAN_DAYS,
            max_payload_len: MAX_CALLBACK_PAYLOAD_LEN,
            draft_ttl: Duration::from_secs(DRAFT_TTL_SECS),
        }
    }
}

/// Recovery configuration for backend and transport failures
#[derive(Debug, Clone)]
pub struct RecoveryConfig {
    /// Maximum number of connection attempts (also bounds dispatcher restarts)
    pub max_retries: u32,
    /// Base delay between retries in milliseconds
    pub base_retry_delay_ms: u64,
    /// Maximum delay between retries in milliseconds
    pub max_retry_delay_ms: u64,
    /// Circuit breaker failure threshold
    pub circuit_breaker_threshold: u32,
    /// Circuit breaker reset timeout in seconds
    pub circuit_breaker_reset_secs: u64,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            base_retry_delay_ms: 1000, // 1 second
            max_retry_delay_ms: 10000, // 10 seconds
            circuit_breaker_threshold: 5,
            circuit_breaker_reset_secs: 60, // 1 minute
        }
    }
}

/// Connection settings for the Notion task database
#[derive(Debug, Clone)]
pub struct NotionConfig {
    pub token: String,
    pub database_id: String,
    pub api_url: String,
    pub api_version: String,
    pub timeout: Duration,
}

impl NotionConfig {
    pub fn new(token: impl Into<String>, database_id: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            database_id: database_id.into(),
            api_url: DEFAULT_NOTION_API_URL.to_string(),
            api_version: DEFAULT_NOTION_VERSION.to_string(),
            timeout: Duration::from_secs(DEFAULT_NOTION_TIMEOUT_SECS),
        }
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }
}

/// Top-level configuration assembled at startup
#[derive(Debug, Clone)]
pub struct BotConfig {
    pub telegram_token: String,
    pub notion: NotionConfig,
    pub dialog: DialogConfig,
    pub recovery: RecoveryConfig,
}

impl BotConfig {
    /// Build the configuration from process environment variables
    pub fn from_env() -> Result<Self, TaskError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, TaskError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| TaskError::Config(format!("{key} must be set")))
        };

        let telegram_token = required("TELEGRAM_BOT_TOKEN")?;
        let mut notion = NotionConfig::new(required("NOTION_TOKEN")?, required("NOTION_DATABASE_ID")?);

        if let Some(url) = lookup("NOTION_API_URL").filter(|v| !v.trim().is_empty()) {
            notion.api_url = url;
        }
        if let Some(version) = lookup("NOTION_VERSION").filter(|v| !v.trim().is_empty()) {
            notion.api_version = version;
        }
        if let Some(raw) = lookup("NOTION_TIMEOUT_SECS") {
            let secs = raw.trim().parse::<u64>().map_err(|_| {
                TaskError::Config(format!("NOTION_TIMEOUT_SECS is not a number: {raw}"))
            })?;
            notion.timeout = Duration::from_secs(secs);
        }

        Ok(Self {
            telegram_token,
            notion,
            dialog: DialogConfig::default(),
            recovery: RecoveryConfig::default(),
        })
    }
}
