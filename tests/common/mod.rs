//! Shared fakes for integration tests

#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use teloxide::types::ChatId;

use task_capture::backend::TaskBackend;
use task_capture::bot::{ChatTransport, DialogueEngine, OutgoingMessage};
use task_capture::config::DialogConfig;
use task_capture::errors::TaskError;
use task_capture::task_model::{NewTask, RecordId, TaskRecord};

/// Backend that records created tasks and serves canned records
#[derive(Default)]
pub struct MockBackend {
    pub created: Mutex<Vec<NewTask>>,
    pub records: Mutex<Vec<TaskRecord>>,
    pub schema: Mutex<Vec<(String, String)>>,
    pub failing: AtomicBool,
}

impl MockBackend {
    pub fn created(&self) -> Vec<NewTask> {
        self.created.lock().unwrap().clone()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), TaskError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(TaskError::BackendUnavailable("mock failure".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl TaskBackend for MockBackend {
    async fn query_records(&self) -> Result<Vec<TaskRecord>, TaskError> {
        self.check()?;
        Ok(self.records.lock().unwrap().clone())
    }

    async fn create_record(&self, task: &NewTask) -> Result<RecordId, TaskError> {
        self.check()?;
        let mut created = self.created.lock().unwrap();
        created.push(task.clone());
        Ok(format!("page-{}", created.len()))
    }

    async fn fetch_schema(&self) -> Result<Vec<(String, String)>, TaskError> {
        self.check()?;
        Ok(self.schema.lock().unwrap().clone())
    }
}

/// Transport that keeps every message it was asked to send
#[derive(Default)]
pub struct RecordingTransport {
    pub sent: Mutex<Vec<(ChatId, OutgoingMessage)>>,
    pub failing: AtomicBool,
}

impl RecordingTransport {
    pub fn texts(&self, chat_id: ChatId) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|(chat, _)| *chat == chat_id)
            .map(|(_, message)| message.text.clone())
            .collect()
    }

    pub fn last(&self, chat_id: ChatId) -> Option<OutgoingMessage> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(chat, _)| *chat == chat_id)
            .map(|(_, message)| message.clone())
    }
}

#[async_trait]
impl ChatTransport for RecordingTransport {
    async fn send_message(&self, chat_id: ChatId, message: OutgoingMessage) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(anyhow!("transport down"));
        }
        self.sent.lock().unwrap().push((chat_id, message));
        Ok(())
    }
}

pub struct Harness {
    pub engine: DialogueEngine,
    pub backend: Arc<MockBackend>,
    pub transport: Arc<RecordingTransport>,
}

/// Fixed date every harness engine treats as today
pub fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 16).unwrap()
}

pub fn harness() -> Harness {
    harness_with(DialogConfig::default())
}

pub fn harness_with(config: DialogConfig) -> Harness {
    let backend = Arc::new(MockBackend::default());
    let transport = Arc::new(RecordingTransport::default());
    let engine = DialogueEngine::new(
        config,
        Arc::clone(&backend) as Arc<dyn TaskBackend>,
        Arc::clone(&transport) as Arc<dyn ChatTransport>,
    )
    .with_clock(today);
    Harness {
        engine,
        backend,
        transport,
    }
}
