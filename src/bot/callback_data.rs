//! Callback payload encoding for inline keyboard buttons
//!
//! Payloads are colon-delimited tokens: the action kind, the draft id and
//! the selected value, e.g. `cat:1f2e3d4c5b6a7980:Work`.

use chrono::NaiveDate;

use crate::dialogue::Choice;
use crate::drafts::DraftId;
use crate::errors::TaskError;
use crate::task_model::{Category, Priority};

const SKIP: &str = "skip";
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Action encoded in a button payload
#[derive(Debug, Clone, PartialEq)]
pub enum CallbackAction {
    SelectCategory { draft_id: DraftId, category: Category },
    SelectWeight { draft_id: DraftId, weight: Option<f64> },
    SelectPriority { draft_id: DraftId, priority: Option<Priority> },
    SelectDueDate { draft_id: DraftId, due_date: Option<NaiveDate> },
    Cancel { draft_id: DraftId },
    /// Decorative buttons (calendar padding and headers)
    Ignore,
}

impl CallbackAction {
    /// Encode the action into its payload string
    pub fn encode(&self) -> String {
        match self {
            CallbackAction::SelectCategory { draft_id, category } => {
                format!("cat:{draft_id}:{category}")
            }
            CallbackAction::SelectWeight { draft_id, weight } => {
                let value = weight.map(|w| w.to_string()).unwrap_or_else(|| SKIP.to_string());
                format!("pmd:{draft_id}:{value}")
            }
            CallbackAction::SelectPriority { draft_id, priority } => {
                let value = priority
                    .map(|p| p.to_string())
                    .unwrap_or_else(|| SKIP.to_string());
                format!("prio:{draft_id}:{value}")
            }
            CallbackAction::SelectDueDate { draft_id, due_date } => {
                let value = due_date
                    .map(|d| d.format(DATE_FORMAT).to_string())
                    .unwrap_or_else(|| SKIP.to_string());
                format!("date:{draft_id}:{value}")
            }
            CallbackAction::Cancel { draft_id } => format!("cancel:{draft_id}"),
            CallbackAction::Ignore => "ignore".to_string(),
        }
    }

    /// Encode the action, failing when the payload exceeds `limit` bytes
    pub fn encode_checked(&self, limit: usize) -> Result<String, TaskError> {
        let payload = self.encode();
        if payload.len() > limit {
            return Err(TaskError::PayloadTooLong {
                len: payload.len(),
                limit,
            });
        }
        Ok(payload)
    }

    /// Decode a payload received from a button press
    pub fn parse(payload: &str) -> Result<Self, TaskError> {
        let invalid = || TaskError::InvalidPayload(payload.to_string());
        let mut parts = payload.splitn(3, ':');
        let kind = parts.next().unwrap_or_default();

        if kind == "ignore" {
            return Ok(CallbackAction::Ignore);
        }

        let draft_id = parts
            .next()
            .filter(|id| !id.is_empty())
            .map(DraftId::from_raw)
            .ok_or_else(invalid)?;
        let value = parts.next();

        let action = match (kind, value) {
            ("cancel", None) => CallbackAction::Cancel { draft_id },
            ("cat", Some(value)) => CallbackAction::SelectCategory {
                draft_id,
                category: value.parse().map_err(|_| invalid())?,
            },
            ("pmd", Some(value)) => CallbackAction::SelectWeight {
                draft_id,
                weight: parse_optional(value, |v| v.parse::<f64>().ok().filter(|w| w.is_finite()))
                    .ok_or_else(invalid)?,
            },
            ("prio", Some(value)) => CallbackAction::SelectPriority {
                draft_id,
                priority: parse_optional(value, |v| v.parse::<Priority>().ok())
                    .ok_or_else(invalid)?,
            },
            ("date", Some(value)) => CallbackAction::SelectDueDate {
                draft_id,
                due_date: parse_optional(value, |v| NaiveDate::parse_from_str(v, DATE_FORMAT).ok())
                    .ok_or_else(invalid)?,
            },
            _ => return Err(invalid()),
        };

        Ok(action)
    }

    /// Split a selection into its draft id and dialogue choice.
    ///
    /// Returns `None` for cancel and decorative buttons.
    pub fn into_choice(self) -> Option<(DraftId, Choice)> {
        match self {
            CallbackAction::SelectCategory { draft_id, category } => {
                Some((draft_id, Choice::Category(category)))
            }
            CallbackAction::SelectWeight { draft_id, weight } => {
                Some((draft_id, Choice::Weight(weight)))
            }
            CallbackAction::SelectPriority { draft_id, priority } => {
                Some((draft_id, Choice::Priority(priority)))
            }
            CallbackAction::SelectDueDate { draft_id, due_date } => {
                Some((draft_id, Choice::DueDate(due_date)))
            }
            CallbackAction::Cancel { .. } | CallbackAction::Ignore => None,
        }
    }
}

/// `skip` maps to `Some(None)`, a parsable value to `Some(Some(v))`
fn parse_optional<T>(value: &str, parse: impl Fn(&str) -> Option<T>) -> Option<Option<T>> {
    if value.eq_ignore_ascii_case(SKIP) {
        Some(None)
    } else {
        parse(value).map(Some)
    }
}
