//! # Data Paths
//!
//! Centralized definitions for where the bot keeps its files.
//! Acts as the Single Source of Truth for default config, snapshot and log locations.

pub const DATA_DIR: &str = "data";
pub const CONFIG_FILE: &str = "config.yaml";
pub const SNAPSHOT_FILE: &str = "vote.json";
pub const LOG_FILE: &str = "session.log";

/// Returns the full path to the config file given a data dir
pub fn config_path(root: &str) -> String {
    format!("{}/{}", root, CONFIG_FILE)
}

/// Returns the full path to the vote snapshot given a data dir
pub fn snapshot_path(root: &str) -> String {
    format!("{}/{}", root, SNAPSHOT_FILE)
}
