//! Command Handler module for bot commands and task queries

use anyhow::Result;
use chrono::NaiveDate;
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;
use tracing::{debug, error};

use crate::localization::t;

use super::dialogue_manager::DialogueEngine;
use super::task_views::{
    format_grouped_task_list, format_structure, format_today_tasks, split_message, MAX_MESSAGE_CHARS,
};
use super::transport::OutgoingMessage;
use super::ui_builder::create_main_menu_keyboard;

#[derive(BotCommands, Clone, Debug, PartialEq)]
#[command(rename_rule = "lowercase", description = "These commands are supported:")]
pub enum Command {
    #[command(description = "show the welcome message and menu")]
    Start,
    #[command(description = "show this help")]
    Help,
    #[command(description = "list all active tasks by category")]
    List,
    #[command(description = "show tasks for today")]
    Today,
    #[command(description = "add a new task")]
    AddTask,
    #[command(description = "show the task database structure")]
    Struct,
}

/// Dispatcher endpoint for recognised commands
pub async fn command_handler(msg: Message, cmd: Command, engine: DialogueEngine) -> Result<()> {
    debug!(chat_id = %msg.chat.id, command = ?cmd, "Received command");
    handle_command(&engine, msg.chat.id, cmd, engine.today()).await;
    Ok(())
}

/// Execute a command for a chat; `today` anchors the today view
pub async fn handle_command(engine: &DialogueEngine, chat_id: ChatId, cmd: Command, today: NaiveDate) {
    match cmd {
        Command::Start => {
            let message = OutgoingMessage::text(t("welcome")).with_markup(create_main_menu_keyboard());
            engine.notify(chat_id, message).await;
        }
        Command::Help => {
            let text = format!("{}\n\n{}", t("help-commands"), Command::descriptions());
            let message = OutgoingMessage::text(text).with_markup(create_main_menu_keyboard());
            engine.notify(chat_id, message).await;
        }
        Command::AddTask => {
            engine
                .notify(chat_id, OutgoingMessage::text(t("add-task-prompt")))
                .await;
        }
        Command::List => send_task_list(engine, chat_id).await,
        Command::Today => send_today_tasks(engine, chat_id, today).await,
        Command::Struct => send_structure(engine, chat_id).await,
    }
}

async fn send_task_list(engine: &DialogueEngine, chat_id: ChatId) {
    match engine.backend().query_records().await {
        Ok(records) => match format_grouped_task_list(&records) {
            Some(list) => send_html_chunks(engine, chat_id, &list).await,
            None => engine.notify(chat_id, OutgoingMessage::text(t("list-empty"))).await,
        },
        Err(e) => {
            error!(chat_id = %chat_id, error = %e, "Error fetching tasks for list");
            engine.notify(chat_id, OutgoingMessage::text(t("fetch-failed"))).await;
        }
    }
}

async fn send_today_tasks(engine: &DialogueEngine, chat_id: ChatId, today: NaiveDate) {
    match engine.backend().query_records().await {
        Ok(records) => match format_today_tasks(&records, today) {
            Some(list) => send_html_chunks(engine, chat_id, &list).await,
            None => engine.notify(chat_id, OutgoingMessage::text(t("today-empty"))).await,
        },
        Err(e) => {
            error!(chat_id = %chat_id, error = %e, "Error fetching tasks for today");
            engine.notify(chat_id, OutgoingMessage::text(t("fetch-failed"))).await;
        }
    }
}

/// Send a rendered view, split into as many messages as Telegram needs
async fn send_html_chunks(engine: &DialogueEngine, chat_id: ChatId, text: &str) {
    let chunks = split_message(text, MAX_MESSAGE_CHARS);
    if chunks.len() > 1 {
        debug!(chat_id = %chat_id, chunks = chunks.len(), "Splitting long task view");
    }
    for chunk in chunks {
        engine.notify(chat_id, OutgoingMessage::html(chunk)).await;
    }
}

async fn send_structure(engine: &DialogueEngine, chat_id: ChatId) {
    let message = match engine.backend().fetch_schema().await {
        Ok(properties) => OutgoingMessage::text(format_structure(&properties)),
        Err(e) => {
            error!(chat_id = %chat_id, error = %e, "Error getting database structure");
            OutgoingMessage::text(t("structure-failed"))
        }
    };
    engine.notify(chat_id, message).await;
}
