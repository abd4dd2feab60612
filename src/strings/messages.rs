//! # Messages
//!
//! Contains constant strings and format functions for user-facing messages.
//! Includes policy rejections, wizard prompts, vote acknowledgements and report headings.

// Policy rejections
pub const ONLY_PRIVATE: &str = "A vote can only be started in a private chat with the bot.";
pub const NOT_IN_CHAT: &str = "You are not in the chat!";
pub const NOT_IN_CHAT_VOTE: &str = "You are not in the chat, so you can't vote.";
pub const VOTE_ALREADY_RUNNING: &str = "Another vote is already running.";
pub const WIZARD_BUSY: &str = "Another vote is being created right now.";
pub const NO_ACTIVE_VOTE: &str = "There is no active vote.";
pub const BALLOT_CLOSED: &str = "This vote is over.";
pub const DEADLINE_OUT_OF_RANGE: &str =
    "The vote deadline is out of range. Ask the bot operator to check its settings.";
pub const STOP_UNSUPPORTED: &str = "Stopping a vote early is not supported; it ends at its deadline.";

// Wizard
pub fn wizard_intro(minutes: i64) -> String {
    format!(
        "<b>Creating a new vote</b>\n\n\
         0⃣ Telegram username\n\
         1⃣ Name/nickname\n\
         2⃣ Achievements\n\n\
         You have {minutes} minutes to fill this in."
    )
}

pub const ASK_USERNAME: &str = "Telegram username:";
pub const ASK_NAME: &str = "Name/nickname:";
pub const ASK_DESCRIPTION: &str = "Achievements:";
pub const REVIEW_HEADER: &str = "Now check everything once more";
pub const REVIEW_HINT: &str = "Use the buttons below to confirm or cancel.";
pub const CONFIRM_YES: &str = "All correct - ✅";
pub const CONFIRM_NO: &str = "Cancel - ✖";
pub const WIZARD_CANCELLED: &str = "Cancelled, you can create a new vote.";
pub const VOTE_STARTED: &str = "The vote has been posted to the group.";
pub const BALLOT_POST_FAILED: &str = "Couldn't post the vote to the group. Try confirming again.";

// Ballot
pub const VOTE_YES_DATA: &str = "vote_yes";
pub const VOTE_NO_DATA: &str = "vote_no";

pub fn vote_yes_label(yes: usize) -> String {
    format!("👍 ({yes}) - For")
}

pub fn vote_no_label(no: usize, pending: usize) -> String {
    format!("👎 ({no} + {pending}) - Against")
}

pub const VOTE_HEADER: &str = "Voting";
pub const YES_COUNTED: &str = "👍 Your vote FOR is counted";
pub const ASK_REASON: &str = "Why are you voting against?";
pub const REASON_VIA_PRIVATE: &str = "⚠ Write your reason to the BOT in a private chat";
pub const NO_COUNTED: &str = "Your vote AGAINST is counted";

// Reports
pub const STATUS_TITLE: &str = "Vote statistics";
pub const FINISHED_TITLE: &str = "The vote is over!";

pub fn created_by(name: &str, id: u64) -> String {
    format!("created by {name} ({id})")
}

pub fn until(deadline: &str) -> String {
    format!("until {deadline}")
}

pub fn yes_heading(count: usize) -> String {
    format!("👍 <b>For</b> - {count} votes:")
}

pub fn no_heading(count: usize) -> String {
    format!("👎 <b>Against</b> - {count} votes:")
}

pub fn pending_heading(count: usize) -> String {
    format!("👎 <b>Against without a reason</b> - {count} votes:")
}
