//! # Help Command
//!
//! Handles the `/help` and `/start` commands.
//! Inside the vote chat the help also advertises the flood chat's admins.

use anyhow::Result;

use crate::domain::config::AppConfig;
use crate::domain::traits::ChatProvider;
use crate::domain::types::{IncomingMessage, OutgoingMessage};
use crate::strings::help;

pub async fn handle_help(
    config: &AppConfig,
    chat: &dyn ChatProvider,
    message: &IncomingMessage,
) -> Result<()> {
    let mut text = help::MAIN.to_string();

    if message.chat_id == config.vote.chat_id
        && let Some(flood_chat) = config.chats.flood_chat_id
    {
        match chat.administrators(flood_chat).await {
            Ok(admins) => {
                let names: Vec<&str> = admins
                    .iter()
                    .filter_map(|admin| admin.username.as_deref())
                    .collect();
                text.push_str(&help::flood_admins(&names.join(", ")));
            }
            Err(e) => tracing::warn!("Failed to list admins of {}: {}", flood_chat, e),
        }
    }

    chat.send_message(OutgoingMessage::reply(message, text))
        .await
        .map(|_| ())
        .map_err(|e| anyhow::anyhow!(e))
}
