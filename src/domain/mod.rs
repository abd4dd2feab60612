//! # Domain Layer
//!
//! Core definitions, types, and traits that define the business domain of the bot.
//! Independent of the chat platform, serving as the contract for other layers.

pub mod config;
pub mod paths;
pub mod traits;
pub mod types;
