//! Outbound chat transport

use anyhow::Result;
use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{ParseMode, ReplyMarkup};

/// A message to deliver to a chat
#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingMessage {
    pub text: String,
    pub markup: Option<ReplyMarkup>,
    pub parse_mode: Option<ParseMode>,
}

impl OutgoingMessage {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            markup: None,
            parse_mode: None,
        }
    }

    pub fn html(text: impl Into<String>) -> Self {
        Self {
            parse_mode: Some(ParseMode::Html),
            ..Self::text(text)
        }
    }

    pub fn with_markup(mut self, markup: impl Into<ReplyMarkup>) -> Self {
        self.markup = Some(markup.into());
        self
    }
}

/// Capability to send messages to a chat
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send_message(&self, chat_id: ChatId, message: OutgoingMessage) -> Result<()>;
}

/// Telegram implementation of [`ChatTransport`]
#[derive(Clone)]
pub struct TelegramTransport {
    bot: Bot,
}

impl TelegramTransport {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl ChatTransport for TelegramTransport {
    async fn send_message(&self, chat_id: ChatId, message: OutgoingMessage) -> Result<()> {
        let mut request = self.bot.send_message(chat_id, message.text);
        if let Some(markup) = message.markup {
            request = request.reply_markup(markup);
        }
        if let Some(mode) = message.parse_mode {
            request = request.parse_mode(mode);
        }
        request.await?;
        Ok(())
    }
}
