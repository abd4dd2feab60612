//! # Application Layer
//!
//! Contains the core business logic and orchestration of the bot.
//! This includes the event router, the vote state machine, rendering and snapshot persistence.

pub mod guard;
#[cfg(test)]
pub mod mock;
pub mod render;
pub mod router;
pub mod state;
pub mod store;
pub mod vote;
