//! Callback Handler module for processing inline keyboard callback queries

use anyhow::Result;
use teloxide::prelude::*;
use tracing::{debug, error};

use super::dialogue_manager::{ButtonReply, DialogueEngine};

/// Handle callback queries from inline keyboards
///
/// The query is answered exactly once on every path, which removes the
/// loading state of the pressed button.
pub async fn callback_handler(bot: Bot, q: CallbackQuery, engine: DialogueEngine) -> Result<()> {
    debug!(user_id = %q.from.id, data = ?q.data, "Received callback query from user");

    let reply = match (&q.message, q.data.as_deref()) {
        (Some(msg), Some(data)) => engine.handle_button(msg.chat().id, data).await,
        _ => ButtonReply::default(),
    };

    let mut answer = bot.answer_callback_query(q.id);
    if let Some(notice) = reply.notice {
        answer = answer.text(notice);
    }
    if let Err(e) = answer.await {
        error!(error = %e, "Failed to answer callback query");
    }

    Ok(())
}
