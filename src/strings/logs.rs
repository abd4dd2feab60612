//! # Log Strings
//!
//! Startup and shutdown lines written by the entry point.

pub const STARTING: &str = "Starting ballotbot...";

pub fn config_loaded(path: &str) -> String {
    format!("Loaded configuration from {path}")
}

pub fn logged_in(username: &str) -> String {
    format!("Logged in as @{username}")
}

pub fn snapshot_location(path: Option<&str>) -> String {
    match path {
        Some(path) => format!("Vote snapshot: {path}"),
        None => "Vote snapshot disabled, keeping state in memory".to_string(),
    }
}

pub const LISTENER_STOPPED: &str = "Telegram listener stopped";
pub const SHUTDOWN: &str = "Shutting down...";

pub fn shutdown_fail(err: &str) -> String {
    format!("Unable to listen for shutdown signal: {err}")
}
