//! # Rates Command
//!
//! Handles the `/rates` command by replying with the price feed's report.

use anyhow::Result;

use crate::domain::traits::{ChatProvider, PriceFeed};
use crate::domain::types::{IncomingMessage, OutgoingMessage};

pub async fn handle_rates(
    prices: &dyn PriceFeed,
    chat: &dyn ChatProvider,
    message: &IncomingMessage,
) -> Result<()> {
    let report = prices.report().await;
    chat.send_message(OutgoingMessage::reply(message, report).rich())
        .await
        .map(|_| ())
        .map_err(|e| anyhow::anyhow!(e))
}
