//! # Timeout Supervisor Module
//!
//! Keeps at most one pending deadline per chat. Arming a deadline cancels
//! the previous one for the same chat. Once a deadline has elapsed and its
//! fire action has started, it can no longer be cancelled.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use teloxide::types::ChatId;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::session::DialogStage;

/// Identifies the dialog state a deadline was armed for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutToken {
    pub chat_id: ChatId,
    pub generation: u64,
    pub stage: DialogStage,
}

#[derive(Debug)]
struct PendingTimeout {
    id: u64,
    token: TimeoutToken,
    handle: JoinHandle<()>,
}

type PendingMap = HashMap<ChatId, PendingTimeout>;

/// Cancellable per-chat delay queue backed by tokio tasks
#[derive(Debug, Clone, Default)]
pub struct TimeoutSupervisor {
    pending: Arc<Mutex<PendingMap>>,
    next_id: Arc<AtomicU64>,
}

impl TimeoutSupervisor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm a deadline for `token.chat_id`, replacing any pending one.
    ///
    /// After `delay`, `on_fire` runs with the token unless the deadline was
    /// disarmed or replaced in the meantime.
    pub fn arm<F, Fut>(&self, token: TimeoutToken, delay: Duration, on_fire: F)
    where
        F: FnOnce(TimeoutToken) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let chat_id = token.chat_id;
        let pending = Arc::clone(&self.pending);

        // Held across spawn so the task cannot claim itself before it is registered
        let mut map = lock(&self.pending);
        if let Some(previous) = map.remove(&chat_id) {
            previous.handle.abort();
            debug!(chat_id = %chat_id, stage = %previous.token.stage, "Replaced pending timeout");
        }

        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            let claimed = {
                let mut map = lock(&pending);
                match map.get(&chat_id) {
                    Some(entry) if entry.id == id => map.remove(&chat_id).is_some(),
                    _ => false,
                }
            };

            if claimed {
                debug!(chat_id = %chat_id, stage = %token.stage, "Timeout fired");
                on_fire(token).await;
            }
        });

        map.insert(chat_id, PendingTimeout { id, token, handle });
        debug!(chat_id = %chat_id, stage = %token.stage, delay_secs = delay.as_secs(), "Timeout armed");
    }

    /// Cancel the pending deadline of a chat. Returns whether one was pending.
    pub fn disarm(&self, chat_id: ChatId) -> bool {
        match lock(&self.pending).remove(&chat_id) {
            Some(entry) => {
                entry.handle.abort();
                debug!(chat_id = %chat_id, stage = %entry.token.stage, "Timeout disarmed");
                true
            }
            None => false,
        }
    }

    /// Token of the pending deadline of a chat, if any
    pub fn armed(&self, chat_id: ChatId) -> Option<TimeoutToken> {
        lock(&self.pending).get(&chat_id).map(|entry| entry.token)
    }

    pub fn len(&self) -> usize {
        lock(&self.pending).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn lock(pending: &Mutex<PendingMap>) -> MutexGuard<'_, PendingMap> {
    pending.lock().unwrap_or_else(PoisonError::into_inner)
}
