//! # Event Router
//!
//! Routes incoming events (ticks, commands, plain messages, button clicks, membership changes)
//! to the vote state machine or the appropriate command handler (in `interface/commands`).
//! `run` is the single actor loop: it owns the router, so every event is handled to
//! completion before the next one starts.

use anyhow::Result;
use chrono::Utc;
use std::sync::Arc;
use teloxide::utils::command::{BotCommands, ParseError};
use tokio::sync::mpsc;
use tokio::time::{Duration, MissedTickBehavior};

use crate::application::vote::VoteMachine;
use crate::domain::config::AppConfig;
use crate::domain::traits::{ChatProvider, PriceFeed};
use crate::domain::types::{Command, Event, IncomingMessage};
use crate::interface::commands;

pub struct EventRouter {
    config: AppConfig,
    bot_name: String,
    chat: Arc<dyn ChatProvider>,
    prices: Arc<dyn PriceFeed>,
    vote: VoteMachine,
}

impl EventRouter {
    pub fn new(
        config: AppConfig,
        bot_name: String,
        chat: Arc<dyn ChatProvider>,
        prices: Arc<dyn PriceFeed>,
        vote: VoteMachine,
    ) -> Self {
        Self {
            config,
            bot_name,
            chat,
            prices,
            vote,
        }
    }

    pub fn vote(&self) -> &VoteMachine {
        &self.vote
    }

    /// Handles one event. Errors are logged; nothing here stops the loop.
    pub async fn route(&mut self, event: Event) {
        if let Err(e) = self.dispatch(event).await {
            tracing::error!("Failed to handle event: {:#}", e);
        }
    }

    async fn dispatch(&mut self, event: Event) -> Result<()> {
        match event {
            Event::Tick => self.vote.tick(Utc::now()).await,
            Event::Message(message) => self.route_message(message).await,
            Event::Button(click) => {
                tracing::info!(
                    uid = click.from.id,
                    username = click.from.display_name(),
                    "Button {:?}",
                    click.data
                );
                self.vote.on_button(&click).await
            }
            Event::MembersJoined { chat_id, users } => {
                commands::motd::handle_joined(&self.config, self.chat.as_ref(), chat_id, &users)
                    .await
            }
            Event::MemberLeft { chat_id, user } => {
                tracing::info!(
                    uid = user.id,
                    username = user.display_name(),
                    "Member left {}",
                    chat_id
                );
                Ok(())
            }
        }
    }

    async fn route_message(&mut self, message: IncomingMessage) -> Result<()> {
        let text = message.text.trim();
        if !text.starts_with('/') {
            tracing::info!(
                uid = message.from.id,
                username = message.from.display_name(),
                "text: {}",
                text
            );
            return self.vote.on_message(&message, Utc::now()).await;
        }

        let command = match Command::parse(text, &self.bot_name) {
            Ok(command) => command,
            Err(ParseError::WrongBotName(name)) => {
                tracing::debug!("Command addressed to {}, ignoring", name);
                return Ok(());
            }
            Err(e) => {
                tracing::info!(
                    uid = message.from.id,
                    username = message.from.display_name(),
                    "unknown command {:?}: {}",
                    text,
                    e
                );
                return Ok(());
            }
        };
        tracing::info!(
            uid = message.from.id,
            username = message.from.display_name(),
            "CMD {:?}",
            command
        );

        match command {
            Command::Help | Command::Start => {
                commands::help::handle_help(&self.config, self.chat.as_ref(), &message).await
            }
            Command::PollStart => self.vote.start(&message, Utc::now()).await,
            Command::PollStop => self.vote.stop(&message).await,
            Command::PollStatus => self.vote.status(&message).await,
            Command::Rates => {
                // Price lookups may wait on the network; keep them off the actor loop.
                let chat = self.chat.clone();
                let prices = self.prices.clone();
                tokio::spawn(async move {
                    if let Err(e) =
                        commands::rates::handle_rates(prices.as_ref(), chat.as_ref(), &message).await
                    {
                        tracing::error!("Failed to send rates: {:#}", e);
                    }
                });
                Ok(())
            }
        }
    }

    /// The dispatch loop. Runs until the event channel closes.
    pub async fn run(mut self, mut events: mpsc::Receiver<Event>, tick_every: Duration) {
        let mut ticker = tokio::time::interval(tick_every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => self.route(Event::Tick).await,
                event = events.recv() => match event {
                    Some(event) => self.route(event).await,
                    None => {
                        tracing::info!("Event channel closed, stopping dispatch loop");
                        break;
                    }
                },
            }
        }
    }
}
