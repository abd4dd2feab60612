//! # Domain Types
//!
//! Common data structures shared by the vote core and the platform adapter.
//! None of these depend on the chat platform's own types; the Telegram adapter
//! converts to and from them at the edge.

use serde::{Deserialize, Serialize};
use teloxide::utils::command::BotCommands;

/// Identity of a chat user as seen by the bot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserRef {
    pub id: u64,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub first_name: String,
}

impl UserRef {
    pub fn new(id: u64, username: Option<&str>, first_name: &str) -> Self {
        Self {
            id,
            username: username.map(str::to_string),
            first_name: first_name.to_string(),
        }
    }

    /// Username when the user has one, first name otherwise.
    pub fn display_name(&self) -> &str {
        match &self.username {
            Some(name) if !name.is_empty() => name,
            _ => &self.first_name,
        }
    }

    /// Telegram uses the user id as the id of the private chat with that user.
    pub fn private_chat_id(&self) -> i64 {
        self.id as i64
    }
}

/// A plain message received in any chat the bot is part of.
#[derive(Debug, Clone, PartialEq)]
pub struct IncomingMessage {
    pub chat_id: i64,
    pub is_private: bool,
    pub message_id: i32,
    pub from: UserRef,
    pub text: String,
}

/// A click on an inline keyboard button.
#[derive(Debug, Clone, PartialEq)]
pub struct ButtonClick {
    /// Callback query id, needed to answer the click.
    pub id: String,
    pub from: UserRef,
    pub data: String,
    /// Message carrying the keyboard, when the platform still knows it.
    pub message_id: Option<i32>,
}

/// Everything the dispatcher can be asked to handle, on one intake path.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Periodic sweep signal.
    Tick,
    /// Text message, command or not. The router decides.
    Message(IncomingMessage),
    Button(ButtonClick),
    MembersJoined { chat_id: i64, users: Vec<UserRef> },
    MemberLeft { chat_id: i64, user: UserRef },
}

/// Slash commands understood by the bot.
#[derive(BotCommands, Debug, Clone, PartialEq, Eq)]
#[command(rename_rule = "snake_case", description = "Supported commands:")]
pub enum Command {
    #[command(description = "show help")]
    Help,
    #[command(description = "show help")]
    Start,
    #[command(description = "start a new vote (private chat only)")]
    PollStart,
    #[command(description = "stop the running vote")]
    PollStop,
    #[command(description = "show vote statistics")]
    PollStatus,
    #[command(description = "currency and crypto rates")]
    Rates,
}

/// Membership of a user in a chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberStatus {
    Owner,
    Administrator,
    Member,
    Restricted,
    Left,
    Banned,
}

impl MemberStatus {
    /// Only owners, admins and plain members take part in votes.
    pub fn is_participant(self) -> bool {
        matches!(
            self,
            MemberStatus::Owner | MemberStatus::Administrator | MemberStatus::Member
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineButton {
    pub text: String,
    pub data: String,
}

impl InlineButton {
    pub fn new(text: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            data: data.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InlineKeyboard {
    pub rows: Vec<Vec<InlineButton>>,
}

impl InlineKeyboard {
    /// Texts of all buttons, row by row.
    pub fn labels(&self) -> Vec<&str> {
        self.rows
            .iter()
            .flatten()
            .map(|button| button.text.as_str())
            .collect()
    }
}

/// Keyboard attachments the bot knows how to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Keyboard {
    /// Buttons under the message that produce click events.
    Inline(InlineKeyboard),
    /// One-time reply keyboard; pressing a button sends its text.
    Choice(Vec<String>),
    /// Ask the client to open a reply to this message.
    ForceReply,
}

/// An outgoing text message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub chat_id: i64,
    pub text: String,
    pub reply_to: Option<i32>,
    pub keyboard: Option<Keyboard>,
    /// Rendered as rich text (HTML) instead of plain text.
    pub rich: bool,
}

impl OutgoingMessage {
    pub fn new(chat_id: i64, text: impl Into<String>) -> Self {
        Self {
            chat_id,
            text: text.into(),
            reply_to: None,
            keyboard: None,
            rich: false,
        }
    }

    /// Reply to `message`, in the chat it came from.
    pub fn reply(message: &IncomingMessage, text: impl Into<String>) -> Self {
        Self::new(message.chat_id, text).reply_to(message.message_id)
    }

    pub fn reply_to(mut self, message_id: i32) -> Self {
        self.reply_to = Some(message_id);
        self
    }

    pub fn keyboard(mut self, keyboard: Keyboard) -> Self {
        self.keyboard = Some(keyboard);
        self
    }

    pub fn rich(mut self) -> Self {
        self.rich = true;
        self
    }
}
