//! # Telegram Service Adapter
//!
//! Implements the `ChatProvider` trait on top of `teloxide`, and runs the update listener
//! that turns Telegram updates into `Event`s for the router.
//! Nothing outside this module sees a `teloxide` type except the command parser.

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{
    ChatMemberKind, ForceReply, InlineKeyboardButton, InlineKeyboardMarkup, KeyboardButton,
    KeyboardMarkup, MessageId, ParseMode, ReplyMarkup, ReplyParameters, User,
};
use tokio::sync::mpsc;

use crate::domain::traits::ChatProvider;
use crate::domain::types::{
    ButtonClick, Event, IncomingMessage, InlineKeyboard, Keyboard, MemberStatus, OutgoingMessage,
    UserRef,
};

#[derive(Clone)]
pub struct TelegramService {
    bot: Bot,
}

impl TelegramService {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

pub fn user_ref(user: &User) -> UserRef {
    UserRef::new(user.id.0, user.username.as_deref(), &user.first_name)
}

fn inline_markup(keyboard: InlineKeyboard) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(keyboard.rows.into_iter().map(|row| {
        row.into_iter()
            .map(|button| InlineKeyboardButton::callback(button.text, button.data))
            .collect::<Vec<_>>()
    }))
}

pub fn reply_markup(keyboard: Keyboard) -> ReplyMarkup {
    match keyboard {
        Keyboard::Inline(inline) => ReplyMarkup::InlineKeyboard(inline_markup(inline)),
        Keyboard::Choice(options) => ReplyMarkup::Keyboard(
            KeyboardMarkup::new(vec![options.into_iter().map(KeyboardButton::new).collect::<Vec<_>>()])
                .one_time_keyboard()
                .resize_keyboard(),
        ),
        Keyboard::ForceReply => ReplyMarkup::ForceReply(ForceReply::new()),
    }
}

pub fn member_status(kind: &ChatMemberKind) -> MemberStatus {
    if kind.is_owner() {
        MemberStatus::Owner
    } else if kind.is_administrator() {
        MemberStatus::Administrator
    } else if kind.is_restricted() {
        MemberStatus::Restricted
    } else if kind.is_left() {
        MemberStatus::Left
    } else if kind.is_banned() {
        MemberStatus::Banned
    } else {
        MemberStatus::Member
    }
}

#[async_trait]
impl ChatProvider for TelegramService {
    async fn send_message(&self, message: OutgoingMessage) -> Result<i32, String> {
        tracing::debug!("Bot sending message to {}: {}", message.chat_id, message.text);
        let mut request = self.bot.send_message(ChatId(message.chat_id), message.text);
        if message.rich {
            request = request.parse_mode(ParseMode::Html);
        }
        if let Some(reply_to) = message.reply_to {
            request = request.reply_parameters(
                ReplyParameters::new(MessageId(reply_to)).allow_sending_without_reply(),
            );
        }
        if let Some(keyboard) = message.keyboard {
            request = request.reply_markup(reply_markup(keyboard));
        }
        request
            .await
            .map(|sent| sent.id.0)
            .map_err(|e| e.to_string())
    }

    async fn edit_keyboard(
        &self,
        chat_id: i64,
        message_id: i32,
        keyboard: InlineKeyboard,
    ) -> Result<(), String> {
        self.bot
            .edit_message_reply_markup(ChatId(chat_id), MessageId(message_id))
            .reply_markup(inline_markup(keyboard))
            .await
            .map(|_| ())
            .map_err(|e| e.to_string())
    }

    async fn answer_button(&self, click_id: &str, text: Option<&str>) -> Result<(), String> {
        let mut request = self.bot.answer_callback_query(click_id.to_string());
        if let Some(text) = text {
            request = request.text(text);
        }
        request.await.map(|_| ()).map_err(|e| e.to_string())
    }

    async fn member_status(&self, chat_id: i64, user_id: u64) -> Result<MemberStatus, String> {
        self.bot
            .get_chat_member(ChatId(chat_id), UserId(user_id))
            .await
            .map(|member| member_status(&member.kind))
            .map_err(|e| e.to_string())
    }

    async fn administrators(&self, chat_id: i64) -> Result<Vec<UserRef>, String> {
        self.bot
            .get_chat_administrators(ChatId(chat_id))
            .await
            .map(|admins| admins.iter().map(|member| user_ref(&member.user)).collect())
            .map_err(|e| e.to_string())
    }
}

/// Events carried by one Telegram message. Service messages may carry several.
pub fn message_events(msg: &Message) -> Vec<Event> {
    let chat_id = msg.chat.id.0;
    let mut events = Vec::new();

    if let Some(users) = msg.new_chat_members() {
        events.push(Event::MembersJoined {
            chat_id,
            users: users.iter().map(user_ref).collect(),
        });
    }
    if let Some(user) = msg.left_chat_member() {
        events.push(Event::MemberLeft {
            chat_id,
            user: user_ref(user),
        });
    }
    if let (Some(from), Some(text)) = (msg.from.as_ref(), msg.text()) {
        events.push(Event::Message(IncomingMessage {
            chat_id,
            is_private: msg.chat.is_private(),
            message_id: msg.id.0,
            from: user_ref(from),
            text: text.to_string(),
        }));
    }
    events
}

pub fn button_event(query: &CallbackQuery) -> Option<Event> {
    let data = query.data.clone()?;
    Some(Event::Button(ButtonClick {
        id: query.id.to_string(),
        from: user_ref(&query.from),
        data,
        message_id: query.message.as_ref().map(|m| m.id().0),
    }))
}

async fn forward(events: &mpsc::Sender<Event>, event: Event) {
    if events.send(event).await.is_err() {
        tracing::warn!("Event channel closed, dropping update");
    }
}

async fn on_message(msg: Message, events: mpsc::Sender<Event>) -> ResponseResult<()> {
    for event in message_events(&msg) {
        forward(&events, event).await;
    }
    Ok(())
}

async fn on_callback(query: CallbackQuery, events: mpsc::Sender<Event>) -> ResponseResult<()> {
    match button_event(&query) {
        Some(event) => forward(&events, event).await,
        None => tracing::debug!("Callback query without data from {}", query.from.id),
    }
    Ok(())
}

/// Long-polls Telegram and forwards every relevant update into `events`.
pub async fn listen(bot: Bot, events: mpsc::Sender<Event>) {
    let handler = dptree::entry()
        .branch(Update::filter_message().endpoint(on_message))
        .branch(Update::filter_callback_query().endpoint(on_callback));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![events])
        .default_handler(|_| async {})
        .build()
        .dispatch()
        .await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::InlineButton;
    use serde_json::json;

    fn message(value: serde_json::Value) -> Message {
        serde_json::from_value(value).unwrap()
    }

    fn alice() -> serde_json::Value {
        json!({"id": 1, "is_bot": false, "first_name": "Alice", "username": "alice"})
    }

    #[test]
    fn test_private_text_message() {
        let msg = message(json!({
            "message_id": 7,
            "date": 0,
            "chat": {"id": 1, "type": "private", "first_name": "Alice"},
            "from": alice(),
            "text": "/poll_start"
        }));
        assert_eq!(
            message_events(&msg),
            vec![Event::Message(IncomingMessage {
                chat_id: 1,
                is_private: true,
                message_id: 7,
                from: UserRef::new(1, Some("alice"), "Alice"),
                text: "/poll_start".into(),
            })]
        );
    }

    #[test]
    fn test_group_join_message() {
        let msg = message(json!({
            "message_id": 8,
            "date": 0,
            "chat": {"id": -100, "type": "supergroup", "title": "Group"},
            "from": alice(),
            "new_chat_members": [alice(), {"id": 2, "is_bot": false, "first_name": "Bob"}]
        }));
        assert_eq!(
            message_events(&msg),
            vec![Event::MembersJoined {
                chat_id: -100,
                users: vec![
                    UserRef::new(1, Some("alice"), "Alice"),
                    UserRef::new(2, None, "Bob"),
                ],
            }]
        );
    }

    #[test]
    fn test_group_leave_message() {
        let msg = message(json!({
            "message_id": 9,
            "date": 0,
            "chat": {"id": -100, "type": "supergroup", "title": "Group"},
            "from": alice(),
            "left_chat_member": alice()
        }));
        assert_eq!(
            message_events(&msg),
            vec![Event::MemberLeft {
                chat_id: -100,
                user: UserRef::new(1, Some("alice"), "Alice"),
            }]
        );
    }

    #[test]
    fn test_callback_query() {
        let query: CallbackQuery = serde_json::from_value(json!({
            "id": "cb1",
            "from": alice(),
            "chat_instance": "x",
            "data": "vote_yes"
        }))
        .unwrap();
        assert_eq!(
            button_event(&query),
            Some(Event::Button(ButtonClick {
                id: "cb1".into(),
                from: UserRef::new(1, Some("alice"), "Alice"),
                data: "vote_yes".into(),
                message_id: None,
            }))
        );
    }

    #[test]
    fn test_inline_keyboard_conversion() {
        let keyboard = Keyboard::Inline(InlineKeyboard {
            rows: vec![vec![
                InlineButton::new("yes", "vote_yes"),
                InlineButton::new("no", "vote_no"),
            ]],
        });
        match reply_markup(keyboard) {
            ReplyMarkup::InlineKeyboard(markup) => {
                assert_eq!(markup.inline_keyboard.len(), 1);
                assert_eq!(markup.inline_keyboard[0][1].text, "no");
            }
            other => panic!("unexpected markup {other:?}"),
        }
    }

    #[test]
    fn test_choice_and_force_reply_conversion() {
        assert!(matches!(
            reply_markup(Keyboard::Choice(vec!["a".into(), "b".into()])),
            ReplyMarkup::Keyboard(_)
        ));
        assert!(matches!(
            reply_markup(Keyboard::ForceReply),
            ReplyMarkup::ForceReply(_)
        ));
    }
}
