// 📣 Event Publisher - best-effort change notifications
//
// Two logical channels: the publisher's default channel carries
// "Player loaded/updated" events, REJECTION_CHANNEL carries rejected rows.
// No broker here: the outbox publisher appends to the `events` table and
// something else is expected to ship it.

use crate::db::{open_database, setup_database};
use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Mutex;
use thiserror::Error;

pub const DEFAULT_CHANNEL: &str = "players_topic";
pub const REJECTION_CHANNEL: &str = "invalid-players";

#[derive(Error, Debug)]
pub enum PublishError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Publisher lock poisoned")]
    Poisoned,

    #[error("Channel unavailable: {0}")]
    Unavailable(String),
}

pub trait EventPublisher: Send + Sync {
    /// Channel used by `send`
    fn default_channel(&self) -> &str;

    /// Publish to a named channel
    fn send_to(&self, channel: &str, message: &str) -> Result<(), PublishError>;

    /// Publish to the default channel
    fn send(&self, message: &str) -> Result<(), PublishError> {
        self.send_to(self.default_channel(), message)
    }
}

/// Event envelope as recorded by the publishers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishedEvent {
    pub event_id: String,
    pub channel: String,
    pub payload: String,
    pub published_at: DateTime<Utc>,
}

impl PublishedEvent {
    pub fn new(channel: &str, payload: &str) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            channel: channel.to_string(),
            payload: payload.to_string(),
            published_at: Utc::now(),
        }
    }
}

fn check_channel(channel: &str) -> Result<(), PublishError> {
    if channel.trim().is_empty() {
        return Err(PublishError::Unavailable("empty channel name".to_string()));
    }
    Ok(())
}

// ============================================================================
// OUTBOX PUBLISHER (SQLite)
// ============================================================================

pub struct OutboxPublisher {
    conn: Mutex<Connection>,
    default_channel: String,
}

impl OutboxPublisher {
    pub fn open(path: &Path, default_channel: impl Into<String>) -> Result<Self> {
        Ok(Self {
            conn: Mutex::new(open_database(path)?),
            default_channel: default_channel.into(),
        })
    }

    pub fn open_in_memory(default_channel: impl Into<String>) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        setup_database(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            default_channel: default_channel.into(),
        })
    }

    /// Most recent events on a channel, newest first
    pub fn list_channel(&self, channel: &str, limit: usize) -> Result<Vec<PublishedEvent>> {
        let conn = self.conn.lock().map_err(|_| PublishError::Poisoned)?;
        let mut stmt = conn.prepare(
            "SELECT event_id, channel, payload, published_at
             FROM events
             WHERE channel = ?1
             ORDER BY seq DESC
             LIMIT ?2",
        )?;

        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let events = stmt
            .query_map(params![channel, limit], |row| {
                let published_at: String = row.get(3)?;
                Ok(PublishedEvent {
                    event_id: row.get(0)?,
                    channel: row.get(1)?,
                    payload: row.get(2)?,
                    published_at: DateTime::parse_from_rfc3339(&published_at)
                        .map_err(|_| rusqlite::Error::InvalidQuery)?
                        .with_timezone(&Utc),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(events)
    }

    pub fn count_channel(&self, channel: &str) -> Result<usize> {
        let conn = self.conn.lock().map_err(|_| PublishError::Poisoned)?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM events WHERE channel = ?1",
            [channel],
            |row| row.get(0),
        )?;
        Ok(usize::try_from(count).unwrap_or_default())
    }
}

impl EventPublisher for OutboxPublisher {
    fn default_channel(&self) -> &str {
        &self.default_channel
    }

    fn send_to(&self, channel: &str, message: &str) -> Result<(), PublishError> {
        check_channel(channel)?;

        let event = PublishedEvent::new(channel, message);
        let conn = self.conn.lock().map_err(|_| PublishError::Poisoned)?;
        conn.execute(
            "INSERT INTO events (event_id, channel, payload, published_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                event.event_id,
                event.channel,
                event.payload,
                event.published_at.to_rfc3339(),
            ],
        )?;

        Ok(())
    }
}

// ============================================================================
// MEMORY PUBLISHER
// ============================================================================

/// Records every event in memory. Channels can be switched to failing mode
/// to exercise publish-failure handling.
#[derive(Debug)]
pub struct MemoryPublisher {
    default_channel: String,
    events: Mutex<Vec<PublishedEvent>>,
    failing: Mutex<HashSet<String>>,
}

impl MemoryPublisher {
    pub fn new() -> Self {
        Self::with_default_channel(DEFAULT_CHANNEL)
    }

    pub fn with_default_channel(channel: impl Into<String>) -> Self {
        Self {
            default_channel: channel.into(),
            events: Mutex::new(Vec::new()),
            failing: Mutex::new(HashSet::new()),
        }
    }

    /// Every later send to `channel` fails with `Unavailable`
    pub fn fail_channel(&self, channel: &str) {
        if let Ok(mut failing) = self.failing.lock() {
            failing.insert(channel.to_string());
        }
    }

    pub fn events(&self) -> Vec<PublishedEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Payloads published on `channel`, oldest first
    pub fn messages_on(&self, channel: &str) -> Vec<String> {
        self.events()
            .into_iter()
            .filter(|event| event.channel == channel)
            .map(|event| event.payload)
            .collect()
    }
}

impl Default for MemoryPublisher {
    fn default() -> Self {
        Self::new()
    }
}

impl EventPublisher for MemoryPublisher {
    fn default_channel(&self) -> &str {
        &self.default_channel
    }

    fn send_to(&self, channel: &str, message: &str) -> Result<(), PublishError> {
        check_channel(channel)?;

        let failing = self.failing.lock().map_err(|_| PublishError::Poisoned)?;
        if failing.contains(channel) {
            return Err(PublishError::Unavailable(channel.to_string()));
        }
        drop(failing);

        let mut events = self.events.lock().map_err(|_| PublishError::Poisoned)?;
        events.push(PublishedEvent::new(channel, message));
        Ok(())
    }
}
