//! Bot module for handling Telegram interactions
//!
//! This module is split into several submodules:
//! - `message_handler`: Handles incoming text messages
//! - `callback_handler`: Handles inline keyboard callback queries
//! - `router`: Maps commands and free text to replies
//! - `commands`: Callback ids and button labels
//! - `ui_builder`: Creates keyboards and formats messages
//! - `dialogue_manager`: Drives multi-step flows and saves their records
//! - `notifier`: Sends scheduled reminders

pub mod callback_handler;
pub mod commands;
pub mod dialogue_manager;
pub mod message_handler;
pub mod notifier;
pub mod router;
pub mod ui_builder;

// Re-export main handler functions for use in main.rs
pub use callback_handler::callback_handler;
pub use message_handler::message_handler;

pub use commands::MenuCommand;
pub use notifier::TelegramNotifier;
pub use router::Router;
pub use ui_builder::{Markup, Reply};
