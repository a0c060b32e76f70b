//! Task creation dialogue: stage transitions and fire actions.
//!
//! The functions here are pure. They decide what the next stage is for a
//! given session and button choice; storing the result, arming timers and
//! talking to the chat or the database is left to the dialogue manager.

use chrono::{Days, NaiveDate};
use std::time::Duration;
use teloxide::types::ChatId;

use crate::config::DialogConfig;
use crate::drafts::DraftId;
use crate::errors::TaskError;
use crate::session::{ConversationSession, DialogStage};
use crate::task_model::{Category, NewTask, Priority};

/// A value picked with a button
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Choice {
    Category(Category),
    Weight(Option<f64>),
    Priority(Option<Priority>),
    DueDate(Option<NaiveDate>),
}

impl Choice {
    /// Stage in which this choice is accepted
    pub fn stage(&self) -> DialogStage {
        match self {
            Choice::Category(_) => DialogStage::AwaitingCategory,
            Choice::Weight(_) => DialogStage::AwaitingWeight,
            Choice::Priority(_) => DialogStage::AwaitingPriority,
            Choice::DueDate(_) => DialogStage::AwaitingDueDate,
        }
    }
}

/// Outcome of applying a choice to a session
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// The dialog continues in `session.stage`; a new timer of `timeout` is armed
    Advance {
        session: ConversationSession,
        timeout: Duration,
    },
    /// The dialog is finished and the session must be committed
    Complete(ConversationSession),
}

/// Create the session for a freshly received task text
pub fn start_session(chat_id: ChatId, draft_id: DraftId) -> ConversationSession {
    ConversationSession::new(chat_id, draft_id)
}

/// Apply a button choice to the current session.
///
/// The payload is re-validated against the stored session: it must carry
/// the session's draft id and belong to the session's stage. Mismatches are
/// rejected with `InvalidTransition` and leave the session as it was.
pub fn advance(
    current: Option<&ConversationSession>,
    draft_id: &DraftId,
    choice: Choice,
    config: &DialogConfig,
) -> Result<Transition, TaskError> {
    let session = current
        .ok_or_else(|| TaskError::unexpected_stage(None, &choice.stage().to_string()))?;

    if &session.draft_id != draft_id {
        return Err(TaskError::InvalidTransition {
            expected: format!("draft {}", session.draft_id),
            actual: format!("draft {draft_id}"),
        });
    }
    if session.stage != choice.stage() {
        return Err(TaskError::unexpected_stage(
            Some(session.stage),
            &choice.stage().to_string(),
        ));
    }

    let mut next = session.clone();
    let transition = match choice {
        Choice::Category(category) => {
            if !config.categories.contains(&category) {
                return Err(TaskError::InvalidPayload(format!(
                    "category {category} is not offered"
                )));
            }
            next.category = Some(category);

            if config.is_weight_eligible(category) {
                next.stage = DialogStage::AwaitingWeight;
                Transition::Advance {
                    session: next,
                    timeout: config.timeouts.weight,
                }
            } else if config.is_date_eligible(category) {
                next.stage = DialogStage::AwaitingDueDate;
                Transition::Advance {
                    session: next,
                    timeout: config.timeouts.due_date_after_category,
                }
            } else {
                Transition::Complete(next)
            }
        }
        Choice::Weight(weight) => {
            if let Some(value) = weight {
                if !config.is_weight_option(value) {
                    return Err(TaskError::InvalidPayload(format!(
                        "weight {value} is not offered"
                    )));
                }
            }
            next.weight = weight;
            // A weight is always followed by the priority step, even when skipped
            next.stage = DialogStage::AwaitingPriority;
            Transition::Advance {
                session: next,
                timeout: config.timeouts.priority,
            }
        }
        Choice::Priority(priority) => {
            if let Some(value) = priority {
                if !config.priority_options.contains(&value) {
                    return Err(TaskError::InvalidPayload(format!(
                        "priority {value} is not offered"
                    )));
                }
            }
            next.priority = priority;

            let date_eligible = next
                .category
                .is_some_and(|category| config.is_date_eligible(category));
            if date_eligible {
                next.stage = DialogStage::AwaitingDueDate;
                Transition::Advance {
                    session: next,
                    timeout: config.timeouts.due_date_after_priority,
                }
            } else {
                Transition::Complete(next)
            }
        }
        Choice::DueDate(due_date) => {
            next.due_date = due_date;
            Transition::Complete(next)
        }
    };

    Ok(transition)
}

/// Check that a picked due date is one the calendar offers.
///
/// The calendar lists `calendar_days` days starting tomorrow. `today` is
/// accepted too, so a calendar sent just before midnight stays usable.
pub fn check_due_date(
    date: NaiveDate,
    today: NaiveDate,
    config: &DialogConfig,
) -> Result<(), TaskError> {
    let last = today.checked_add_days(Days::new(u64::from(config.calendar_days)));
    match last {
        Some(last) if date >= today && date <= last => Ok(()),
        _ => Err(TaskError::InvalidPayload(format!(
            "due date {date} is not offered"
        ))),
    }
}

/// Assemble the task committed for a session, either on completion or when
/// its timer fires.
///
/// Fields are taken exactly as accumulated; a session still waiting for its
/// category falls back to the default category.
pub fn build_task(session: &ConversationSession, name: String, config: &DialogConfig) -> NewTask {
    NewTask::new(name, session.category.unwrap_or(config.default_category))
        .with_weight(session.weight)
        .with_priority(session.priority)
        .with_due_date(session.due_date)
}
