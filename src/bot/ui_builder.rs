//! UI Builder module for creating keyboards

use chrono::{Datelike, Days, NaiveDate, Weekday};
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, KeyboardButton, KeyboardMarkup};

use crate::config::DialogConfig;
use crate::drafts::DraftId;
use crate::errors::TaskError;
use crate::localization::t;

use super::callback_data::CallbackAction;

const WEEKDAY_HEADERS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];
const BLANK: &str = " ";

fn button(
    text: impl Into<String>,
    action: &CallbackAction,
    config: &DialogConfig,
) -> Result<InlineKeyboardButton, TaskError> {
    Ok(InlineKeyboardButton::callback(
        text,
        action.encode_checked(config.max_payload_len)?,
    ))
}

fn inert(text: impl Into<String>) -> InlineKeyboardButton {
    InlineKeyboardButton::callback(text, CallbackAction::Ignore.encode())
}

/// Persistent reply keyboard shown by /start
pub fn create_main_menu_keyboard() -> KeyboardMarkup {
    KeyboardMarkup::new(vec![vec![
        KeyboardButton::new("/today"),
        KeyboardButton::new("/list"),
        KeyboardButton::new("/addtask"),
        KeyboardButton::new("/struct"),
    ]])
    .resize_keyboard()
}

/// One button per category, followed by a cancel button
pub fn create_category_keyboard(
    draft_id: &DraftId,
    config: &DialogConfig,
) -> Result<InlineKeyboardMarkup, TaskError> {
    let mut rows = Vec::with_capacity(config.categories.len() + 1);

    for category in &config.categories {
        let action = CallbackAction::SelectCategory {
            draft_id: draft_id.clone(),
            category: *category,
        };
        rows.push(vec![button(category.to_string(), &action, config)?]);
    }

    let cancel = CallbackAction::Cancel {
        draft_id: draft_id.clone(),
    };
    rows.push(vec![button(format!("❌ {}", t("button-cancel")), &cancel, config)?]);

    Ok(InlineKeyboardMarkup::new(rows))
}

/// Single row of PMD values, starting with skip
pub fn create_weight_keyboard(
    draft_id: &DraftId,
    config: &DialogConfig,
) -> Result<InlineKeyboardMarkup, TaskError> {
    let mut row = Vec::with_capacity(config.weight_options.len() + 1);
    let choices = std::iter::once(None).chain(config.weight_options.iter().copied().map(Some));

    for weight in choices {
        let label = weight
            .map(|w| w.to_string())
            .unwrap_or_else(|| t("button-skip"));
        let action = CallbackAction::SelectWeight {
            draft_id: draft_id.clone(),
            weight,
        };
        row.push(button(label, &action, config)?);
    }

    Ok(InlineKeyboardMarkup::new(vec![row]))
}

/// Single row of priorities, starting with skip
pub fn create_priority_keyboard(
    draft_id: &DraftId,
    config: &DialogConfig,
) -> Result<InlineKeyboardMarkup, TaskError> {
    let mut row = Vec::with_capacity(config.priority_options.len() + 1);
    let choices = std::iter::once(None).chain(config.priority_options.iter().copied().map(Some));

    for priority in choices {
        let label = priority
            .map(|p| p.to_string())
            .unwrap_or_else(|| t("button-skip"));
        let action = CallbackAction::SelectPriority {
            draft_id: draft_id.clone(),
            priority,
        };
        row.push(button(label, &action, config)?);
    }

    Ok(InlineKeyboardMarkup::new(vec![row]))
}

/// Calendar of `config.calendar_days` days starting the day after `today`.
///
/// Layout: a skip row, a weekday header row, then one Monday-first row per
/// week with blank padding before the first and after the last day.
/// Weekend days are wrapped in asterisks.
pub fn create_calendar_keyboard(
    draft_id: &DraftId,
    today: NaiveDate,
    config: &DialogConfig,
) -> Result<InlineKeyboardMarkup, TaskError> {
    let skip = CallbackAction::SelectDueDate {
        draft_id: draft_id.clone(),
        due_date: None,
    };
    let mut rows = vec![
        vec![button(t("button-skip"), &skip, config)?],
        WEEKDAY_HEADERS.iter().map(|day| inert(*day)).collect(),
    ];

    let mut week: Vec<InlineKeyboardButton> = Vec::with_capacity(7);
    for offset in 1..=u64::from(config.calendar_days) {
        let Some(date) = today.checked_add_days(Days::new(offset)) else {
            break;
        };
        let weekday = date.weekday();

        if week.is_empty() {
            for _ in 0..weekday.num_days_from_monday() {
                week.push(inert(BLANK));
            }
        }

        let label = if matches!(weekday, Weekday::Sat | Weekday::Sun) {
            format!("*{}*", date.day())
        } else {
            date.day().to_string()
        };
        let action = CallbackAction::SelectDueDate {
            draft_id: draft_id.clone(),
            due_date: Some(date),
        };
        week.push(button(label, &action, config)?);

        let last_day = offset == u64::from(config.calendar_days);
        if weekday == Weekday::Sun || last_day {
            while week.len() < 7 {
                week.push(inert(BLANK));
            }
            rows.push(std::mem::take(&mut week));
        }
    }

    Ok(InlineKeyboardMarkup::new(rows))
}
