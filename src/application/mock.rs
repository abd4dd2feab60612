//! # Recording Chat
//!
//! In-memory `ChatProvider` and `PriceFeed` for tests. Records every outbound call and
//! answers member lookups from a table.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use crate::domain::traits::{ChatProvider, PriceFeed};
use crate::domain::types::{InlineKeyboard, MemberStatus, OutgoingMessage, UserRef};

#[derive(Default)]
struct Recorded {
    sent: Vec<OutgoingMessage>,
    edits: Vec<(i64, i32, InlineKeyboard)>,
    answers: Vec<(String, Option<String>)>,
    members: HashMap<u64, MemberStatus>,
    admins: Vec<UserRef>,
    unreachable_chats: HashSet<i64>,
    next_message_id: i32,
}

#[derive(Default)]
pub struct MockChat {
    inner: Mutex<Recorded>,
}

impl MockChat {
    pub fn new() -> Self {
        let chat = Self::default();
        chat.inner.lock().unwrap().next_message_id = 100;
        chat
    }

    pub fn set_member(&self, user_id: u64, status: MemberStatus) {
        self.inner.lock().unwrap().members.insert(user_id, status);
    }

    pub fn set_admins(&self, admins: Vec<UserRef>) {
        self.inner.lock().unwrap().admins = admins;
    }

    /// Sends to `chat_id` fail from now on.
    pub fn make_unreachable(&self, chat_id: i64) {
        self.inner.lock().unwrap().unreachable_chats.insert(chat_id);
    }

    pub fn sent(&self) -> Vec<OutgoingMessage> {
        self.inner.lock().unwrap().sent.clone()
    }

    pub fn last_sent(&self) -> OutgoingMessage {
        self.sent().last().cloned().expect("nothing was sent")
    }

    pub fn sent_to(&self, chat_id: i64) -> Vec<OutgoingMessage> {
        self.sent()
            .into_iter()
            .filter(|m| m.chat_id == chat_id)
            .collect()
    }

    pub fn edits(&self) -> Vec<(i64, i32, InlineKeyboard)> {
        self.inner.lock().unwrap().edits.clone()
    }

    pub fn last_edit(&self) -> InlineKeyboard {
        self.edits().last().map(|e| e.2.clone()).expect("no keyboard edit")
    }

    pub fn answers(&self) -> Vec<(String, Option<String>)> {
        self.inner.lock().unwrap().answers.clone()
    }

    pub fn last_answer(&self) -> Option<String> {
        self.answers().last().cloned().expect("no button answer").1
    }

    pub fn clear(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.sent.clear();
        inner.edits.clear();
        inner.answers.clear();
    }
}

#[async_trait]
impl ChatProvider for MockChat {
    async fn send_message(&self, message: OutgoingMessage) -> Result<i32, String> {
        let mut inner = self.inner.lock().unwrap();
        if inner.unreachable_chats.contains(&message.chat_id) {
            return Err("Forbidden: bot can't initiate conversation with a user".to_string());
        }
        inner.next_message_id += 1;
        inner.sent.push(message);
        Ok(inner.next_message_id)
    }

    async fn edit_keyboard(
        &self,
        chat_id: i64,
        message_id: i32,
        keyboard: InlineKeyboard,
    ) -> Result<(), String> {
        self.inner
            .lock()
            .unwrap()
            .edits
            .push((chat_id, message_id, keyboard));
        Ok(())
    }

    async fn answer_button(&self, click_id: &str, text: Option<&str>) -> Result<(), String> {
        self.inner
            .lock()
            .unwrap()
            .answers
            .push((click_id.to_string(), text.map(str::to_string)));
        Ok(())
    }

    async fn member_status(&self, _chat_id: i64, user_id: u64) -> Result<MemberStatus, String> {
        self.inner
            .lock()
            .unwrap()
            .members
            .get(&user_id)
            .copied()
            .ok_or_else(|| "Bad Request: user not found".to_string())
    }

    async fn administrators(&self, _chat_id: i64) -> Result<Vec<UserRef>, String> {
        let inner = self.inner.lock().unwrap();
        if inner.admins.is_empty() {
            return Err("Bad Request: chat not found".to_string());
        }
        Ok(inner.admins.clone())
    }
}

/// Price feed returning a fixed report.
pub struct FixedPrices(pub String);

#[async_trait]
impl PriceFeed for FixedPrices {
    async fn report(&self) -> String {
        self.0.clone()
    }
}
