// PlayerDB - Core Library
// Exposes all modules for use in CLI, API server, and tests

pub mod player;         // Player entity + column table
pub mod validator;      // Key check, integer coercion, rejection records
pub mod snapshot;       // Raw CSV rows
pub mod store;          // Record Store seam + in-memory store
pub mod db;             // SQLite store + schema
pub mod publisher;      // Event Publisher seam + outbox
pub mod reconciliation; // Batch reconciler
pub mod config;

#[cfg(feature = "server")]
pub mod api;

// Re-export commonly used types
pub use player::{ColumnKind, Player, PlayerField};
pub use validator::{CoercionNote, RejectReason};
pub use snapshot::{read_snapshot, read_snapshot_from, Row, SnapshotError};
pub use store::{MemoryPlayerStore, PlayerStore, StoreError, StoreResult};
pub use db::{open_database, setup_database, SqlitePlayerStore};
pub use publisher::{
    EventPublisher, MemoryPublisher, OutboxPublisher, PublishError, PublishedEvent,
    DEFAULT_CHANNEL, REJECTION_CHANNEL,
};
pub use reconciliation::{
    AbortReason, BatchOutcome, ReconcileSummary, Reconciler, RowOutcome, ROW_WIDTH,
};
pub use config::AppConfig;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Install the fmt subscriber; `RUST_LOG` overrides the default `info` level.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}
