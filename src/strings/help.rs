//! # Help Text
//!
//! Help messages for bot commands.
//! Displayed to the user via the `/help` and `/start` commands.

pub const MAIN: &str = concat!(
    "/poll_status - vote statistics\n",
    "/poll_start - start a new vote (in a private chat with the bot)\n",
    "/rates - currency rates\n",
    "\n",
);

pub fn flood_admins(admins: &str) -> String {
    format!("\nIf you want to join the flood chat, write to any of its admins: {admins}")
}
