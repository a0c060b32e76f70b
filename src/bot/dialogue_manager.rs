//! Dialogue Manager module for executing dialogue state transitions
//!
//! [`DialogueEngine`] owns the draft registry, the session store and the
//! timeout supervisor. For every event it first applies the state change
//! synchronously, then performs the side effects: at most one timer
//! disarmed, one armed, one message sent and one record created.

use chrono::{Local, NaiveDate};
use std::sync::Arc;
use teloxide::types::ChatId;
use tracing::{debug, error, info, warn};

use crate::backend::TaskBackend;
use crate::config::DialogConfig;
use crate::dialogue::{advance, build_task, check_due_date, start_session, Choice, Transition};
use crate::drafts::{DraftId, DraftRegistry};
use crate::localization::{t, t_args};
use crate::session::{ConversationSession, DialogStage, SessionStore};
use crate::timeouts::{TimeoutSupervisor, TimeoutToken};

use super::callback_data::CallbackAction;
use super::task_views::{format_task_added, truncate_for_display};
use super::transport::{ChatTransport, OutgoingMessage};
use super::ui_builder::{
    create_calendar_keyboard, create_category_keyboard, create_priority_keyboard,
    create_weight_keyboard,
};

/// Answer to give to a button press
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ButtonReply {
    /// Short notice shown by the transport while dismissing the button spinner
    pub notice: Option<String>,
}

impl ButtonReply {
    fn notice(text: String) -> Self {
        Self { notice: Some(text) }
    }
}

/// Source of the current local date
type Clock = Arc<dyn Fn() -> NaiveDate + Send + Sync>;

/// Task creation dialogue shared by all handlers
#[derive(Clone)]
pub struct DialogueEngine {
    config: Arc<DialogConfig>,
    drafts: Arc<DraftRegistry>,
    sessions: Arc<SessionStore>,
    timeouts: TimeoutSupervisor,
    backend: Arc<dyn TaskBackend>,
    transport: Arc<dyn ChatTransport>,
    clock: Clock,
}

impl DialogueEngine {
    pub fn new(
        config: DialogConfig,
        backend: Arc<dyn TaskBackend>,
        transport: Arc<dyn ChatTransport>,
    ) -> Self {
        Self {
            drafts: Arc::new(DraftRegistry::new(config.draft_ttl)),
            sessions: Arc::new(SessionStore::new()),
            timeouts: TimeoutSupervisor::new(),
            config: Arc::new(config),
            backend,
            transport,
            clock: Arc::new(|| Local::now().date_naive()),
        }
    }

    /// Replace the date source used for calendars and due date checks
    pub fn with_clock(mut self, clock: impl Fn() -> NaiveDate + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn today(&self) -> NaiveDate {
        (self.clock)()
    }

    pub fn config(&self) -> &DialogConfig {
        &self.config
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn drafts(&self) -> &DraftRegistry {
        &self.drafts
    }

    pub fn timeouts(&self) -> &TimeoutSupervisor {
        &self.timeouts
    }

    pub fn backend(&self) -> &dyn TaskBackend {
        self.backend.as_ref()
    }

    /// Start a dialog for a free-text task.
    ///
    /// Commands and blank messages are ignored. An active dialog in the same
    /// chat is superseded: its timer is replaced and it is committed with
    /// what it has collected so far.
    pub async fn handle_text(&self, chat_id: ChatId, text: &str) {
        if text.trim().is_empty() || text.starts_with('/') {
            debug!(chat_id = %chat_id, "Ignoring message that is not a task");
            return;
        }

        let draft_id = DraftId::derive(text);
        let keyboard = match create_category_keyboard(&draft_id, &self.config) {
            Ok(keyboard) => keyboard,
            Err(e) => {
                error!(chat_id = %chat_id, error = %e, "Failed to build category keyboard");
                return;
            }
        };

        self.drafts.put(text);
        let (session, superseded) = self.sessions.start(start_session(chat_id, draft_id));
        self.arm(&session, self.config.timeouts.category);
        info!(chat_id = %chat_id, draft_id = %session.draft_id, "Task dialog started");

        if let Some(previous) = superseded {
            info!(
                chat_id = %chat_id,
                draft_id = %previous.draft_id,
                stage = %previous.stage,
                "Superseded active dialog, committing it"
            );
            self.commit(previous, None).await;
        }

        let prompt = t_args("choose-category", &[("task", &truncate_for_display(text))]);
        self.notify(chat_id, OutgoingMessage::text(prompt).with_markup(keyboard))
            .await;
    }

    /// Handle a button press. The caller must answer the press with the
    /// returned reply, whatever the outcome.
    pub async fn handle_button(&self, chat_id: ChatId, payload: &str) -> ButtonReply {
        let action = match CallbackAction::parse(payload) {
            Ok(action) => action,
            Err(e) => {
                warn!(chat_id = %chat_id, error = %e, "Rejected button payload");
                return ButtonReply::notice(t("button-stale"));
            }
        };

        match action {
            CallbackAction::Ignore => ButtonReply::default(),
            CallbackAction::Cancel { draft_id } => self.cancel(chat_id, &draft_id).await,
            selection => match selection.into_choice() {
                Some((draft_id, choice)) => self.select(chat_id, draft_id, choice).await,
                None => ButtonReply::default(),
            },
        }
    }

    /// Run the fire action of an elapsed timer.
    ///
    /// Does nothing when the session has moved on since the timer was armed.
    pub async fn fire(&self, token: TimeoutToken) {
        let Some(session) = self.sessions.take_if(token.chat_id, |session| {
            session.generation == token.generation && session.stage == token.stage
        }) else {
            debug!(chat_id = %token.chat_id, stage = %token.stage, "Ignoring stale timeout");
            return;
        };

        info!(chat_id = %token.chat_id, stage = %token.stage, "Selection timed out, committing task");
        let notice = t(match token.stage {
            DialogStage::AwaitingCategory => "expired-category",
            DialogStage::AwaitingWeight => "expired-weight",
            DialogStage::AwaitingPriority => "expired-priority",
            DialogStage::AwaitingDueDate => "expired-due-date",
        });
        self.commit(session, Some(notice)).await;
    }

    async fn select(&self, chat_id: ChatId, draft_id: DraftId, choice: Choice) -> ButtonReply {
        if let Err(e) = self.drafts.get(&draft_id) {
            warn!(chat_id = %chat_id, error = %e, "Button refers to an unknown draft");
            self.notify(chat_id, OutgoingMessage::text(t("draft-expired")))
                .await;
            return ButtonReply::default();
        }

        if let Choice::DueDate(Some(date)) = choice {
            if let Err(e) = check_due_date(date, self.today(), &self.config) {
                warn!(chat_id = %chat_id, error = %e, "Rejected due date");
                return ButtonReply::notice(t("button-stale"));
            }
        }

        let config = self.config.as_ref();
        let transition = match self
            .sessions
            .transition(chat_id, |current| advance(current, &draft_id, choice, config))
        {
            Ok(transition) => transition,
            Err(e) => {
                warn!(chat_id = %chat_id, error = %e, "Rejected button press");
                return ButtonReply::notice(t("button-stale"));
            }
        };

        self.timeouts.disarm(chat_id);
        match transition {
            Transition::Advance { session, timeout } => {
                debug!(chat_id = %chat_id, stage = %session.stage, "Dialog advanced");
                self.arm(&session, timeout);
                self.prompt(&session).await;
            }
            Transition::Complete(session) => self.commit(session, None).await,
        }

        ButtonReply::default()
    }

    async fn cancel(&self, chat_id: ChatId, draft_id: &DraftId) -> ButtonReply {
        let Some(session) = self.sessions.take_if(chat_id, |session| {
            &session.draft_id == draft_id && session.stage == DialogStage::AwaitingCategory
        }) else {
            debug!(chat_id = %chat_id, "Nothing to cancel");
            return ButtonReply::default();
        };

        self.timeouts.disarm(chat_id);
        let body = self.drafts.get(&session.draft_id).unwrap_or_default();
        self.drafts.release(&session.draft_id);
        info!(chat_id = %chat_id, draft_id = %session.draft_id, "Task dialog cancelled");

        let text = t_args("task-cancelled", &[("task", &truncate_for_display(&body))]);
        self.notify(chat_id, OutgoingMessage::text(text)).await;
        ButtonReply::default()
    }

    /// Create the record for a finished session and acknowledge it
    async fn commit(&self, session: ConversationSession, notice: Option<String>) {
        let chat_id = session.chat_id;
        let body = self.drafts.get(&session.draft_id);
        self.drafts.release(&session.draft_id);

        let name = match body {
            Ok(name) => name,
            Err(e) => {
                error!(chat_id = %chat_id, error = %e, "Cannot commit task without its draft");
                self.notify(chat_id, OutgoingMessage::text(t("draft-expired")))
                    .await;
                return;
            }
        };

        let task = build_task(&session, name, &self.config);
        match self.backend.create_record(&task).await {
            Ok(record_id) => {
                info!(chat_id = %chat_id, record_id = %record_id, category = %task.category, "Task committed");
                let summary = format_task_added(&task);
                let text = match notice {
                    Some(notice) => format!("{notice} {summary}"),
                    None => summary,
                };
                self.notify(chat_id, OutgoingMessage::text(text)).await;
            }
            Err(e) => {
                error!(chat_id = %chat_id, error = %e, "Failed to add task");
                self.notify(chat_id, OutgoingMessage::text(t("task-add-failed")))
                    .await;
            }
        }
    }

    /// Send the prompt of the stage a session just entered
    async fn prompt(&self, session: &ConversationSession) {
        let draft_id = &session.draft_id;
        let (text, keyboard) = match session.stage {
            DialogStage::AwaitingCategory => {
                let body = self.drafts.get(draft_id).unwrap_or_default();
                (
                    t_args("choose-category", &[("task", &truncate_for_display(&body))]),
                    create_category_keyboard(draft_id, &self.config),
                )
            }
            DialogStage::AwaitingWeight => (
                t("select-weight"),
                create_weight_keyboard(draft_id, &self.config),
            ),
            DialogStage::AwaitingPriority => (
                t("select-priority"),
                create_priority_keyboard(draft_id, &self.config),
            ),
            DialogStage::AwaitingDueDate => (
                t("select-due-date"),
                create_calendar_keyboard(draft_id, self.today(), &self.config),
            ),
        };

        let message = match keyboard {
            Ok(keyboard) => OutgoingMessage::text(text).with_markup(keyboard),
            Err(e) => {
                error!(chat_id = %session.chat_id, error = %e, "Failed to build keyboard");
                OutgoingMessage::text(text)
            }
        };
        self.notify(session.chat_id, message).await;
    }

    fn arm(&self, session: &ConversationSession, delay: std::time::Duration) {
        let token = TimeoutToken {
            chat_id: session.chat_id,
            generation: session.generation,
            stage: session.stage,
        };
        let engine = self.clone();
        self.timeouts
            .arm(token, delay, move |token| async move { engine.fire(token).await });
    }

    /// Send a message, logging delivery failures
    pub async fn notify(&self, chat_id: ChatId, message: OutgoingMessage) {
        if let Err(e) = self.transport.send_message(chat_id, message).await {
            error!(chat_id = %chat_id, error = %e, "Failed to send message");
        }
    }
}
