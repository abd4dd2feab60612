//! # Ballot Rendering
//!
//! Builds the wizard review summary, the ballot body with its live tally keyboard,
//! and the status/final report. Every user-supplied field is HTML-escaped before
//! interpolation.

use chrono::{DateTime, Utc};
use teloxide::utils::html::escape;

use crate::application::state::{Ballot, Nominee, Tally, VotePerson};
use crate::domain::types::{InlineButton, InlineKeyboard, Keyboard, UserRef};
use crate::strings::messages;

const TIME_FORMAT: &str = "%b %-d %H:%M:%S %Z";

pub fn format_deadline(deadline: DateTime<Utc>) -> String {
    deadline.format(TIME_FORMAT).to_string()
}

/// Nominee fields as a labelled block.
pub fn nominee_block(nominee: &Nominee) -> String {
    format!(
        "<b>Telegram:</b> {}\n<b>Name/nickname:</b> {}\n<b>Achievements:</b> {}",
        escape(&nominee.user_name),
        escape(&nominee.name),
        escape(&nominee.description),
    )
}

pub fn review_text(nominee: &Nominee) -> String {
    format!("{}\n{}", messages::REVIEW_HEADER, nominee_block(nominee))
}

/// One-time keyboard offering confirm and cancel.
pub fn review_keyboard() -> Keyboard {
    Keyboard::Choice(vec![
        messages::CONFIRM_YES.to_string(),
        messages::CONFIRM_NO.to_string(),
    ])
}

pub fn ballot_text(nominee: &Nominee, deadline: DateTime<Utc>) -> String {
    format!(
        "<b>{}</b>\n{}\n\n{}",
        messages::VOTE_HEADER,
        messages::until(&format_deadline(deadline)),
        nominee_block(nominee)
    )
}

/// Inline keyboard showing `yes` against `no + pending`.
pub fn ballot_keyboard(tally: Tally) -> InlineKeyboard {
    InlineKeyboard {
        rows: vec![vec![
            InlineButton::new(messages::vote_yes_label(tally.yes), messages::VOTE_YES_DATA),
            InlineButton::new(
                messages::vote_no_label(tally.no, tally.pending),
                messages::VOTE_NO_DATA,
            ),
        ]],
    }
}

fn voter(person: &VotePerson) -> String {
    format!("{} ({})", escape(person.user.display_name()), person.user.id)
}

/// Full breakdown of a running or finished vote.
pub fn report_text(
    title: &str,
    creator: &UserRef,
    deadline: Option<DateTime<Utc>>,
    nominee: &Nominee,
    ballot: &Ballot,
) -> String {
    let mut out = format!(
        "<b>{}</b>\n{}\n",
        title,
        messages::created_by(&escape(creator.display_name()), creator.id)
    );
    if let Some(deadline) = deadline {
        out.push_str(&messages::until(&format_deadline(deadline)));
        out.push('\n');
    }
    out.push('\n');
    out.push_str(&nominee_block(nominee));
    out.push_str("\n\n");

    out.push_str(&messages::yes_heading(ballot.voted_yes.len()));
    out.push('\n');
    let yes: Vec<String> = ballot.voted_yes.values().map(voter).collect();
    out.push_str(&yes.join(", "));

    out.push('\n');
    out.push_str(&messages::no_heading(ballot.voted_no.len()));
    out.push('\n');
    for person in ballot.voted_no.values() {
        out.push_str(&format!(
            "- {}: {}\n",
            voter(person),
            escape(person.reason.as_deref().unwrap_or_default())
        ));
    }

    if !ballot.voted_no_pending.is_empty() {
        out.push_str(&messages::pending_heading(ballot.voted_no_pending.len()));
        out.push('\n');
        let pending: Vec<String> = ballot.voted_no_pending.values().map(voter).collect();
        out.push_str(&pending.join(", "));
    }
    out
}
