//! # Welcome Messages
//!
//! Posts the configured message of the day when members join a chat.
//! The text is operator-written and goes out as plain text, unparsed.

use anyhow::Result;

use crate::domain::config::AppConfig;
use crate::domain::traits::ChatProvider;
use crate::domain::types::{OutgoingMessage, UserRef};

pub async fn handle_joined(
    config: &AppConfig,
    chat: &dyn ChatProvider,
    chat_id: i64,
    users: &[UserRef],
) -> Result<()> {
    if let Some(first) = users.first() {
        tracing::info!(
            uid = first.id,
            username = first.display_name(),
            "New member in {} ({} joined)",
            chat_id,
            users.len()
        );
    }
    let Some(text) = config.chats.motd.get(&chat_id) else {
        return Ok(());
    };
    chat.send_message(OutgoingMessage::new(chat_id, text.as_str()))
        .await
        .map(|_| ())
        .map_err(|e| anyhow::anyhow!(e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::mock::MockChat;

    fn config() -> AppConfig {
        AppConfig::from_yaml(
            "
services:
  telegram:
    token: x
vote:
  chat_id: -100
chats:
  motd:
    -100: \"Welcome! Ask /rates any time.\"
    -200: \"Rules: <no spam> & be nice\"
",
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_motd_for_configured_chat() {
        let chat = MockChat::new();
        let users = vec![UserRef::new(1, Some("new"), "Newbie")];
        handle_joined(&config(), &chat, -100, &users).await.unwrap();

        let sent = chat.last_sent();
        assert_eq!(sent.chat_id, -100);
        assert_eq!(sent.text, "Welcome! Ask /rates any time.");
    }

    #[tokio::test]
    async fn test_motd_markup_is_sent_verbatim() {
        let chat = MockChat::new();
        let users = vec![UserRef::new(1, Some("new"), "Newbie")];
        handle_joined(&config(), &chat, -200, &users).await.unwrap();

        let sent = chat.last_sent();
        assert_eq!(sent.text, "Rules: <no spam> & be nice");
        assert!(!sent.rich);
    }

    #[tokio::test]
    async fn test_no_motd_elsewhere() {
        let chat = MockChat::new();
        let users = vec![UserRef::new(1, Some("new"), "Newbie")];
        handle_joined(&config(), &chat, -300, &users).await.unwrap();
        assert!(chat.sent().is_empty());
    }
}
