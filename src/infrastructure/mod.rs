//! # Infrastructure Layer
//!
//! Handles interactions with external systems and services.
//! Implements the traits defined in the Domain layer (ChatProvider, PriceFeed).

pub mod rates;
pub mod telegram;
