//! Bot module for handling Telegram interactions
//!
//! This module is split into several submodules:
//! - `command_handler`: Handles `/start`, `/help`, `/list`, `/today`, `/addtask` and `/struct`
//! - `message_handler`: Turns free text into task drafts
//! - `callback_handler`: Handles inline keyboard callback queries
//! - `callback_data`: Encodes and parses button payloads
//! - `ui_builder`: Creates keyboards
//! - `task_views`: Formats task lists and confirmations
//! - `dialogue_manager`: Runs the task creation dialogue
//! - `transport`: Sends messages to chats

pub mod callback_data;
pub mod callback_handler;
pub mod command_handler;
pub mod dialogue_manager;
pub mod message_handler;
pub mod task_views;
pub mod transport;
pub mod ui_builder;

use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;

// Re-export main handler functions for use in main.rs
pub use callback_handler::callback_handler;
pub use command_handler::{command_handler, handle_command, Command};
pub use dialogue_manager::{ButtonReply, DialogueEngine};
pub use message_handler::message_handler;
pub use transport::{ChatTransport, OutgoingMessage, TelegramTransport};

/// Update routing: commands first, then free text, then button presses
pub fn build_handler() -> UpdateHandler<anyhow::Error> {
    let message_handler_tree = Update::filter_message()
        .branch(
            dptree::entry()
                .filter_command::<Command>()
                .endpoint(command_handler),
        )
        .branch(dptree::endpoint(message_handler));

    dptree::entry()
        .branch(message_handler_tree)
        .branch(Update::filter_callback_query().endpoint(callback_handler))
}
