//! # Vote State Machine
//!
//! Owns the single `VoteRecord` and drives it through the nomination wizard
//! (private chat with the creator), the balloting phase (group chat) and expiry.
//!
//! Every transition is saved to the snapshot store before anything is sent out,
//! so a crash right after a step can at most replay that step.

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

use crate::application::guard;
use crate::application::render;
use crate::application::state::{Ballot, Nominee, Phase, VoteRecord};
use crate::application::store::{self, SnapshotStore};
use crate::domain::traits::ChatProvider;
use crate::domain::types::{ButtonClick, IncomingMessage, Keyboard, OutgoingMessage, UserRef};
use crate::strings::messages;

/// Timing of the workflow.
#[derive(Debug, Clone, Copy)]
pub struct VoteSettings {
    pub chat_id: i64,
    pub duration: Duration,
    pub create_timeout: Duration,
}

#[derive(Debug, Clone, Copy)]
enum BallotAction {
    Yes,
    No,
}

pub struct VoteMachine {
    settings: VoteSettings,
    chat: Arc<dyn ChatProvider>,
    store: Box<dyn SnapshotStore>,
    record: VoteRecord,
}

impl VoteMachine {
    /// Restores the record from `store`, or starts fresh.
    pub fn new(
        settings: VoteSettings,
        chat: Arc<dyn ChatProvider>,
        store: Box<dyn SnapshotStore>,
    ) -> Self {
        let record = store::restore(store.as_ref(), settings.chat_id);
        tracing::info!(
            "Vote record ready for chat {} in state {}",
            record.chat_id,
            record.phase.name()
        );
        Self {
            settings,
            chat,
            store,
            record,
        }
    }

    pub fn record(&self) -> &VoteRecord {
        &self.record
    }

    /// `now + span`; `None` when the deadline would leave the calendar range.
    fn deadline_after(now: DateTime<Utc>, span: Duration) -> Option<DateTime<Utc>> {
        let deadline = now.checked_add_signed(span);
        if deadline.is_none() {
            tracing::error!("Deadline out of range: {} + {}", now, span);
        }
        deadline
    }

    fn save(&self) {
        if let Err(e) = self.store.save(&self.record) {
            tracing::error!("Failed to save vote snapshot: {:#}", e);
        }
    }

    fn reset(&mut self) {
        self.record = VoteRecord::new(self.settings.chat_id);
        self.save();
    }

    async fn reply(&self, message: &IncomingMessage, text: &str) -> Result<()> {
        self.chat
            .send_message(OutgoingMessage::reply(message, text).rich())
            .await
            .map(|_| ())
            .map_err(|e| anyhow::anyhow!(e))
    }

    async fn ask(&self, chat_id: i64, question: &str) -> Result<(), String> {
        self.chat
            .send_message(OutgoingMessage::new(chat_id, question).keyboard(Keyboard::ForceReply))
            .await
            .map(|_| ())
    }

    async fn answer(&self, click: &ButtonClick, text: Option<&str>) {
        if let Err(e) = self.chat.answer_button(&click.id, text).await {
            tracing::warn!("Failed to answer button click {}: {}", click.id, e);
        }
    }

    /// Pushes the current tallies to the ballot message.
    async fn refresh_tallies(&self) {
        let Phase::Run {
            vote_message_id,
            ballot,
            ..
        } = &self.record.phase
        else {
            return;
        };
        let keyboard = render::ballot_keyboard(ballot.tally());
        if let Err(e) = self
            .chat
            .edit_keyboard(self.settings.chat_id, *vote_message_id, keyboard)
            .await
        {
            tracing::warn!("Failed to update ballot tallies: {}", e);
        }
    }

    /// `/poll_start`: opens the wizard for the sender.
    pub async fn start(&mut self, message: &IncomingMessage, now: DateTime<Utc>) -> Result<()> {
        if !message.is_private {
            return self.reply(message, messages::ONLY_PRIVATE).await;
        }
        if !guard::is_member(self.chat.as_ref(), self.settings.chat_id, &message.from).await {
            return self.reply(message, messages::NOT_IN_CHAT).await;
        }

        match &self.record.phase {
            Phase::None => {}
            Phase::Run { .. } => return self.reply(message, messages::VOTE_ALREADY_RUNNING).await,
            _ => return self.reply(message, messages::WIZARD_BUSY).await,
        }

        let Some(deadline) = Self::deadline_after(now, self.settings.create_timeout) else {
            return self.reply(message, messages::DEADLINE_OUT_OF_RANGE).await;
        };
        self.record.phase = Phase::WaitUsername {
            creator: message.from.clone(),
        };
        self.record.end_time = Some(deadline);
        self.save();
        tracing::info!(
            uid = message.from.id,
            username = message.from.display_name(),
            action = "start",
            "Vote wizard started"
        );

        self.reply(
            message,
            &messages::wizard_intro(self.settings.create_timeout.num_minutes()),
        )
        .await?;
        self.ask(message.chat_id, messages::ASK_USERNAME)
            .await
            .map_err(|e| anyhow::anyhow!(e))
    }

    /// `/poll_stop`: accepted but has no effect; votes end at their deadline.
    pub async fn stop(&self, message: &IncomingMessage) -> Result<()> {
        tracing::warn!(
            uid = message.from.id,
            username = message.from.display_name(),
            action = "stop",
            "Stop requested in state {}, ignoring",
            self.record.phase.name()
        );
        self.reply(message, messages::STOP_UNSUPPORTED).await
    }

    /// `/poll_status`: full tally breakdown for members.
    pub async fn status(&self, message: &IncomingMessage) -> Result<()> {
        let Phase::Run {
            creator,
            nominee,
            ballot,
            ..
        } = &self.record.phase
        else {
            return self.reply(message, messages::NO_ACTIVE_VOTE).await;
        };
        if !guard::is_member(self.chat.as_ref(), self.settings.chat_id, &message.from).await {
            return self.reply(message, messages::NOT_IN_CHAT).await;
        }
        let report = render::report_text(
            messages::STATUS_TITLE,
            creator,
            self.record.end_time,
            nominee,
            ballot,
        );
        self.reply(message, &report).await
    }

    /// Plain text: a wizard answer from the creator, or a "no" reason from a voter.
    pub async fn on_message(&mut self, message: &IncomingMessage, now: DateTime<Utc>) -> Result<()> {
        if !message.is_private {
            return Ok(());
        }
        if self
            .record
            .phase
            .wizard_creator()
            .is_some_and(|creator| creator.id == message.from.id)
        {
            return self.advance_wizard(message, now).await;
        }
        if let Phase::Run { ballot, .. } = &self.record.phase
            && ballot.is_pending(message.from.id)
        {
            return self.record_reason(message).await;
        }
        Ok(())
    }

    async fn advance_wizard(&mut self, message: &IncomingMessage, now: DateTime<Utc>) -> Result<()> {
        let text = message.text.trim();
        if text.is_empty() {
            return Ok(());
        }
        let Some(step_deadline) = Self::deadline_after(now, self.settings.create_timeout) else {
            return self.reply(message, messages::DEADLINE_OUT_OF_RANGE).await;
        };
        let from = &message.from;

        match std::mem::take(&mut self.record.phase) {
            Phase::WaitUsername { creator } => {
                tracing::info!(uid = from.id, username = from.display_name(), "username: {}", text);
                self.record.phase = Phase::WaitName {
                    creator,
                    user_name: text.to_string(),
                };
                self.record.end_time = Some(step_deadline);
                self.save();
                self.ask(message.chat_id, messages::ASK_NAME)
                    .await
                    .map_err(|e| anyhow::anyhow!(e))
            }
            Phase::WaitName { creator, user_name } => {
                tracing::info!(uid = from.id, username = from.display_name(), "name: {}", text);
                self.record.phase = Phase::WaitDescription {
                    creator,
                    user_name,
                    name: text.to_string(),
                };
                self.record.end_time = Some(step_deadline);
                self.save();
                self.ask(message.chat_id, messages::ASK_DESCRIPTION)
                    .await
                    .map_err(|e| anyhow::anyhow!(e))
            }
            Phase::WaitDescription {
                creator,
                user_name,
                name,
            } => {
                tracing::info!(uid = from.id, username = from.display_name(), "description: {}", text);
                let nominee = Nominee {
                    user_name,
                    name,
                    description: text.to_string(),
                };
                let review = render::review_text(&nominee);
                self.record.phase = Phase::Review { creator, nominee };
                self.record.end_time = Some(step_deadline);
                self.save();
                self.chat
                    .send_message(
                        OutgoingMessage::new(message.chat_id, review)
                            .rich()
                            .keyboard(render::review_keyboard()),
                    )
                    .await
                    .map(|_| ())
                    .map_err(|e| anyhow::anyhow!(e))
            }
            Phase::Review { creator, nominee } => match text {
                messages::CONFIRM_YES => self.launch(message, creator, nominee, now).await,
                messages::CONFIRM_NO => {
                    tracing::info!(uid = from.id, username = from.display_name(), "Wizard cancelled");
                    self.reset();
                    self.reply(message, messages::WIZARD_CANCELLED).await
                }
                _ => {
                    self.record.phase = Phase::Review { creator, nominee };
                    self.chat
                        .send_message(
                            OutgoingMessage::reply(message, messages::REVIEW_HINT)
                                .keyboard(render::review_keyboard()),
                        )
                        .await
                        .map(|_| ())
                        .map_err(|e| anyhow::anyhow!(e))
                }
            },
            other => {
                self.record.phase = other;
                Ok(())
            }
        }
    }

    /// Posts the ballot to the group and enters `Run`. Stays in `Review` if posting fails.
    async fn launch(
        &mut self,
        message: &IncomingMessage,
        creator: UserRef,
        nominee: Nominee,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let Some(deadline) = Self::deadline_after(now, self.settings.duration) else {
            self.record.phase = Phase::Review { creator, nominee };
            return self.reply(message, messages::DEADLINE_OUT_OF_RANGE).await;
        };
        let ballot = Ballot::default();
        let post = OutgoingMessage::new(self.settings.chat_id, render::ballot_text(&nominee, deadline))
            .rich()
            .keyboard(Keyboard::Inline(render::ballot_keyboard(ballot.tally())));

        match self.chat.send_message(post).await {
            Ok(vote_message_id) => {
                tracing::info!(
                    uid = creator.id,
                    username = creator.display_name(),
                    "Vote confirmed, ballot posted as message {}",
                    vote_message_id
                );
                self.record.phase = Phase::Run {
                    creator,
                    nominee,
                    vote_message_id,
                    ballot,
                };
                self.record.end_time = Some(deadline);
                self.save();
                self.reply(message, messages::VOTE_STARTED).await
            }
            Err(e) => {
                tracing::error!("Failed to post ballot: {}", e);
                self.record.phase = Phase::Review { creator, nominee };
                self.reply(message, messages::BALLOT_POST_FAILED).await
            }
        }
    }

    async fn record_reason(&mut self, message: &IncomingMessage) -> Result<()> {
        if !guard::is_member(self.chat.as_ref(), self.settings.chat_id, &message.from).await {
            return self.reply(message, messages::NOT_IN_CHAT_VOTE).await;
        }
        let Phase::Run { ballot, .. } = &mut self.record.phase else {
            return Ok(());
        };
        if !ballot.supply_reason(message.from.clone(), message.text.trim()) {
            return Ok(());
        }
        tracing::info!(
            uid = message.from.id,
            username = message.from.display_name(),
            action = "message",
            "voted NO, reason: {}",
            message.text
        );
        self.save();
        self.refresh_tallies().await;
        self.reply(message, messages::NO_COUNTED).await
    }

    /// Ballot button clicks.
    pub async fn on_button(&mut self, click: &ButtonClick) -> Result<()> {
        let action = match click.data.as_str() {
            messages::VOTE_YES_DATA => BallotAction::Yes,
            messages::VOTE_NO_DATA => BallotAction::No,
            other => {
                tracing::debug!("Ignoring unknown button data {:?}", other);
                self.answer(click, None).await;
                return Ok(());
            }
        };

        let Phase::Run {
            vote_message_id, ..
        } = &self.record.phase
        else {
            self.answer(click, Some(messages::NO_ACTIVE_VOTE)).await;
            return Ok(());
        };
        if click.message_id.is_some_and(|id| id != *vote_message_id) {
            self.answer(click, Some(messages::BALLOT_CLOSED)).await;
            return Ok(());
        }

        if !guard::is_member(self.chat.as_ref(), self.settings.chat_id, &click.from).await {
            self.answer(click, Some(messages::NOT_IN_CHAT_VOTE)).await;
            return Ok(());
        }

        let Phase::Run { ballot, .. } = &mut self.record.phase else {
            return Ok(());
        };
        let before = ballot.tally();
        match action {
            BallotAction::Yes => ballot.vote_yes(click.from.clone()),
            BallotAction::No => ballot.vote_no(click.from.clone()),
        }
        let changed = ballot.tally() != before;
        self.save();
        if changed {
            self.refresh_tallies().await;
        }

        match action {
            BallotAction::Yes => {
                tracing::info!(
                    uid = click.from.id,
                    username = click.from.display_name(),
                    action = "voteButton",
                    "voted YES"
                );
                self.answer(click, Some(messages::YES_COUNTED)).await;
            }
            BallotAction::No => {
                tracing::info!(
                    uid = click.from.id,
                    username = click.from.display_name(),
                    action = "voteButton",
                    "voted NO, waiting reason"
                );
                match self.ask(click.from.private_chat_id(), messages::ASK_REASON).await {
                    Ok(()) => self.answer(click, None).await,
                    Err(e) => {
                        tracing::warn!(uid = click.from.id, "Can't ask for a reason privately: {}", e);
                        self.answer(click, Some(messages::REASON_VIA_PRIVATE)).await;
                    }
                }
            }
        }
        Ok(())
    }

    /// Periodic sweep: concludes a finished vote or drops a timed-out wizard.
    pub async fn tick(&mut self, now: DateTime<Utc>) -> Result<()> {
        if !self.record.is_expired(now) {
            return Ok(());
        }
        tracing::info!("timer: set state from {} to None", self.record.phase.name());

        let finished = std::mem::take(&mut self.record.phase);
        let deadline = self.record.end_time;
        self.reset();

        if let Phase::Run {
            creator,
            nominee,
            ballot,
            ..
        } = finished
        {
            let report = render::report_text(
                messages::FINISHED_TITLE,
                &creator,
                deadline,
                &nominee,
                &ballot,
            );
            tracing::info!("Vote finished:\n{}", report);
            self.chat
                .send_message(OutgoingMessage::new(self.settings.chat_id, report).rich())
                .await
                .map_err(|e| anyhow::anyhow!("Failed to post vote results: {}", e))?;
        }
        Ok(())
    }
}
