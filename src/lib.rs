//! # Task Capture Telegram Bot
//!
//! A Telegram bot that turns free-text messages into task records in a
//! Notion database. Each message starts a short button-driven dialog that
//! collects a category, an effort weight, a priority and a due date; any
//! step left unanswered times out and the task is saved with the fields
//! collected so far.

pub mod backend;
pub mod bot;
pub mod circuit_breaker;
pub mod config;
pub mod dialogue;
pub mod drafts;
pub mod errors;
pub mod localization;
pub mod notion;
pub mod recovery;
pub mod session;
pub mod shutdown;
pub mod task_model;
pub mod timeouts;
