//! Task database seam.
//!
//! The dialogue only needs three remote operations; any store offering them
//! can back the bot. [`GuardedBackend`] wraps an implementation with a
//! circuit breaker.

use async_trait::async_trait;
use std::future::Future;
use tracing::warn;

use crate::circuit_breaker::CircuitBreaker;
use crate::config::RecoveryConfig;
use crate::errors::TaskError;
use crate::task_model::{NewTask, RecordId, TaskRecord};

/// Remote task database operations
#[async_trait]
pub trait TaskBackend: Send + Sync {
    /// Fetch every task record
    async fn query_records(&self) -> Result<Vec<TaskRecord>, TaskError>;

    /// Create a task record
    async fn create_record(&self, task: &NewTask) -> Result<RecordId, TaskError>;

    /// Fetch `(property name, property type)` pairs of the database schema
    async fn fetch_schema(&self) -> Result<Vec<(String, String)>, TaskError>;
}

/// Backend wrapper that fails fast while its circuit breaker is open
pub struct GuardedBackend<B> {
    inner: B,
    breaker: CircuitBreaker,
}

impl<B: TaskBackend> GuardedBackend<B> {
    pub fn new(inner: B, config: RecoveryConfig) -> Self {
        Self {
            inner,
            breaker: CircuitBreaker::new(config),
        }
    }

    async fn guard<T, F>(&self, operation: &str, call: F) -> Result<T, TaskError>
    where
        F: Future<Output = Result<T, TaskError>>,
    {
        if self.breaker.is_open() {
            warn!(operation, "Circuit breaker open, skipping backend call");
            return Err(TaskError::BackendUnavailable(format!(
                "{operation} skipped: circuit breaker open"
            )));
        }

        let result = call.await;
        match &result {
            Ok(_) => self.breaker.record_success(),
            Err(_) => self.breaker.record_failure(),
        }
        result
    }
}

#[async_trait]
impl<B: TaskBackend> TaskBackend for GuardedBackend<B> {
    async fn query_records(&self) -> Result<Vec<TaskRecord>, TaskError> {
        self.guard("query_records", self.inner.query_records()).await
    }

    async fn create_record(&self, task: &NewTask) -> Result<RecordId, TaskError> {
        self.guard("create_record", self.inner.create_record(task)).await
    }

    async fn fetch_schema(&self) -> Result<Vec<(String, String)>, TaskError> {
        self.guard("fetch_schema", self.inner.fetch_schema()).await
    }
}
