//! Core domain + application logic for ChatBuddy, a Telegram quiz/chat bot.
//!
//! This crate is framework-agnostic. Telegram and the text-generation backend
//! live behind ports (traits) implemented in adapter crates.

pub mod backoff;
pub mod broadcast;
pub mod commands;
pub mod config;
pub mod destinations;
pub mod dispatch;
pub mod domain;
pub mod errors;
pub mod generation;
pub mod logging;
pub mod messaging;
pub mod polls;
pub mod prompts;
pub mod quiz;
pub mod update_loop;
pub mod utils;

#[cfg(test)]
pub(crate) mod testing;

pub use errors::{Error, Result};
