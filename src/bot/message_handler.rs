//! Message Handler module for processing incoming Telegram messages

use anyhow::Result;
use teloxide::prelude::*;
use tracing::debug;

use super::dialogue_manager::DialogueEngine;

/// Dispatcher endpoint for messages that are not recognised commands.
///
/// Any non-blank text that does not start with `/` becomes a new task draft.
pub async fn message_handler(msg: Message, engine: DialogueEngine) -> Result<()> {
    match msg.text() {
        Some(text) => engine.handle_text(msg.chat.id, text).await,
        None => debug!(chat_id = %msg.chat.id, "Ignoring non-text message"),
    }

    Ok(())
}
