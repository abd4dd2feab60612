//! # Command Handlers
//!
//! Handler functions for the commands and chat events that are not part of the vote
//! workflow (e.g. /help, /rates, member joins). These handlers are invoked by the Router.

pub mod help;
pub mod motd;
pub mod rates;
