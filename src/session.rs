//! Per-conversation session state for the task creation dialog.
//!
//! The store holds at most one session per chat. Sessions are stamped with a
//! monotonically increasing generation every time they are written, which
//! lets timers detect that the dialog moved on after they were armed.

use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use strum::Display;
use teloxide::types::ChatId;

use crate::dialogue::Transition;
use crate::drafts::DraftId;
use crate::errors::TaskError;
use crate::task_model::{Category, Priority};

/// Waiting stages of a dialog. `Idle` is the absence of a session and the
/// terminal state is the removal of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "snake_case")]
pub enum DialogStage {
    AwaitingCategory,
    AwaitingWeight,
    AwaitingPriority,
    AwaitingDueDate,
}

/// Live state of one in-progress dialog
#[derive(Debug, Clone, PartialEq)]
pub struct ConversationSession {
    pub chat_id: ChatId,
    pub stage: DialogStage,
    pub draft_id: DraftId,
    pub category: Option<Category>,
    pub weight: Option<f64>,
    pub priority: Option<Priority>,
    pub due_date: Option<NaiveDate>,
    /// Stamp assigned by the store on every write
    pub generation: u64,
}

impl ConversationSession {
    pub fn new(chat_id: ChatId, draft_id: DraftId) -> Self {
        Self {
            chat_id,
            stage: DialogStage::AwaitingCategory,
            draft_id,
            category: None,
            weight: None,
            priority: None,
            due_date: None,
            generation: 0,
        }
    }
}

/// In-memory session store keyed by chat.
///
/// Nothing is persisted; a restart drops every in-flight dialog.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: Mutex<HashMap<ChatId, ConversationSession>>,
    generation: AtomicU64,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, chat_id: ChatId) -> Option<ConversationSession> {
        self.lock().get(&chat_id).cloned()
    }

    /// Store a fresh session, returning the stamped copy and the session it
    /// superseded, if any
    pub fn start(
        &self,
        mut session: ConversationSession,
    ) -> (ConversationSession, Option<ConversationSession>) {
        session.generation = self.next_generation();
        let previous = self.lock().insert(session.chat_id, session.clone());
        (session, previous)
    }

    /// Remove and return the session of a chat
    pub fn clear(&self, chat_id: ChatId) -> Option<ConversationSession> {
        self.lock().remove(&chat_id)
    }

    /// Remove the session only when it satisfies `predicate`
    pub fn take_if<F>(&self, chat_id: ChatId, predicate: F) -> Option<ConversationSession>
    where
        F: FnOnce(&ConversationSession) -> bool,
    {
        let mut sessions = self.lock();
        match sessions.get(&chat_id) {
            Some(session) if predicate(session) => sessions.remove(&chat_id),
            _ => None,
        }
    }

    /// Compute and apply a transition atomically.
    ///
    /// `step` sees the current session and decides the transition; advancing
    /// transitions are stamped and stored, completing ones remove the
    /// session. Errors leave the store untouched.
    pub fn transition<F>(&self, chat_id: ChatId, step: F) -> Result<Transition, TaskError>
    where
        F: FnOnce(Option<&ConversationSession>) -> Result<Transition, TaskError>,
    {
        let mut sessions = self.lock();
        let transition = step(sessions.get(&chat_id))?;

        match transition {
            Transition::Advance { mut session, timeout } => {
                session.generation = self.next_generation();
                sessions.insert(chat_id, session.clone());
                Ok(Transition::Advance { session, timeout })
            }
            Transition::Complete(session) => {
                sessions.remove(&chat_id);
                Ok(Transition::Complete(session))
            }
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn next_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<ChatId, ConversationSession>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
