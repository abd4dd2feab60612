//! # Domain Traits
//!
//! Abstract interfaces for the bot's collaborators (chat platform, price feed).
//! Allows for pluggable implementations in the Infrastructure layer and recording fakes in tests.

use async_trait::async_trait;

use crate::domain::types::{InlineKeyboard, MemberStatus, OutgoingMessage, UserRef};

/// Abstract interface for a Chat Provider (e.g., Telegram)
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Send a message, returning the id of the posted message
    async fn send_message(&self, message: OutgoingMessage) -> Result<i32, String>;

    /// Replace the inline keyboard attached to an existing message
    async fn edit_keyboard(
        &self,
        chat_id: i64,
        message_id: i32,
        keyboard: InlineKeyboard,
    ) -> Result<(), String>;

    /// Answer a pending button click, optionally with a toast text
    async fn answer_button(&self, click_id: &str, text: Option<&str>) -> Result<(), String>;

    /// Look up a user's membership in a chat
    async fn member_status(&self, chat_id: i64, user_id: u64) -> Result<MemberStatus, String>;

    /// List a chat's administrators
    async fn administrators(&self, chat_id: i64) -> Result<Vec<UserRef>, String>;
}

/// Abstract interface for a Price Feed
#[async_trait]
pub trait PriceFeed: Send + Sync {
    /// Formatted multi-line report, refreshing the cache first if it is stale
    async fn report(&self) -> String;
}
