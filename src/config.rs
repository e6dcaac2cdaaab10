// ⚙️ Configuration - environment with defaults
//
// Binaries load `.env.local` first (if present), then read PLAYERDB_* vars.

use crate::publisher::{DEFAULT_CHANNEL, REJECTION_CHANNEL};
use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::path::PathBuf;

pub const ENV_DATABASE: &str = "PLAYERDB_DATABASE";
pub const ENV_CSV: &str = "PLAYERDB_CSV";
pub const ENV_ADDR: &str = "PLAYERDB_ADDR";
pub const ENV_TOPIC: &str = "PLAYERDB_TOPIC";
pub const ENV_INVALID_TOPIC: &str = "PLAYERDB_INVALID_TOPIC";

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    /// SQLite file holding the players table and the event outbox
    pub database_path: PathBuf,
    /// Source snapshot used by reloads
    pub csv_path: PathBuf,
    pub bind_addr: SocketAddr,
    /// Channel for "Player loaded/updated" events
    pub default_channel: String,
    /// Channel for rejected rows
    pub rejection_channel: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            database_path: PathBuf::from("players.db"),
            csv_path: PathBuf::from("data/Player.csv"),
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            default_channel: DEFAULT_CHANNEL.to_string(),
            rejection_channel: REJECTION_CHANNEL.to_string(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key → value source; unset or empty values keep defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let mut config = AppConfig::default();

        if let Some(path) = get(ENV_DATABASE) {
            config.database_path = PathBuf::from(path);
        }
        if let Some(path) = get(ENV_CSV) {
            config.csv_path = PathBuf::from(path);
        }
        if let Some(addr) = get(ENV_ADDR) {
            config.bind_addr = addr
                .parse()
                .with_context(|| format!("{} is not a socket address: {}", ENV_ADDR, addr))?;
        }
        if let Some(topic) = get(ENV_TOPIC) {
            config.default_channel = topic;
        }
        if let Some(topic) = get(ENV_INVALID_TOPIC) {
            config.rejection_channel = topic;
        }

        Ok(config)
    }
}
