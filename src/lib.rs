//! # withLily assistant bot
//!
//! A Telegram personal assistant: a fit tracker with weekly and monthly
//! statistics, dated plans with a daily reminder, and a wishlist grouped by
//! category. Records are kept in SQLite or in JSON documents.

pub mod bot;
pub mod config;
pub mod db;
pub mod dialogue;
pub mod errors;
pub mod json_store;
pub mod localization;
pub mod models;
pub mod scheduler;
pub mod stats;
pub mod storage;
