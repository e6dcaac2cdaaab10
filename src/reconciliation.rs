// ⚖️ Reconciliation Engine - full resync of the players table from a snapshot
//
// One batch, in order:
//   1. key set  = column 0 of every non-header row (valid or not)
//   2. sweep    = delete every stored player whose key is not in the set
//   3. upsert   = process each row on its own; a bad row never stops the batch
//
// Row outcomes are values (RowOutcome); the only batch-level failure is an
// unreadable snapshot or a store failure during the sweep (BatchOutcome::Aborted).

use crate::player::{Player, PlayerField};
use crate::publisher::{EventPublisher, REJECTION_CHANNEL};
use crate::snapshot::{read_snapshot, Row};
use crate::store::PlayerStore;
use crate::validator::{self, CoercionNote, RejectReason};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, error, info, warn};

/// Number of columns a complete row carries
pub const ROW_WIDTH: usize = PlayerField::COUNT;

// ============================================================================
// OUTCOMES
// ============================================================================

/// Terminal state of one source row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RowOutcome {
    /// Written to the store. `notified` is false when the success event could
    /// not be published; the write stands either way.
    Persisted {
        line: usize,
        player_id: String,
        created: bool,
        notes: Vec<CoercionNote>,
        notified: bool,
    },

    /// Routed to the rejection channel, no store write
    Rejected {
        line: usize,
        player_id: Option<String>,
        reason: RejectReason,
        notified: bool,
    },
}

impl RowOutcome {
    pub fn is_persisted(&self) -> bool {
        matches!(self, RowOutcome::Persisted { .. })
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, RowOutcome::Rejected { .. })
    }

    pub fn line(&self) -> usize {
        match self {
            RowOutcome::Persisted { line, .. } | RowOutcome::Rejected { line, .. } => *line,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AbortReason {
    /// The snapshot could not be opened or parsed; nothing was touched
    SnapshotUnavailable(String),

    /// The store failed while loading or deleting during the sweep; no row
    /// was processed
    SweepFailed(String),
}

impl std::fmt::Display for AbortReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AbortReason::SnapshotUnavailable(msg) => write!(f, "snapshot unavailable: {}", msg),
            AbortReason::SweepFailed(msg) => write!(f, "deletion sweep failed: {}", msg),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BatchOutcome {
    Completed(ReconcileSummary),
    Aborted(AbortReason),
}

impl BatchOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, BatchOutcome::Completed(_))
    }

    pub fn summary(&self) -> Option<&ReconcileSummary> {
        match self {
            BatchOutcome::Completed(summary) => Some(summary),
            BatchOutcome::Aborted(_) => None,
        }
    }
}

// ============================================================================
// SUMMARY
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReconcileSummary {
    /// Non-header rows in the snapshot
    pub rows: usize,
    pub deleted: usize,
    pub created: usize,
    pub updated: usize,
    pub rejected: usize,
    pub coercion_notes: usize,
    /// Success or rejection events that could not be published
    pub publish_failures: usize,
    /// Header positions that do not match the column table
    pub header_mismatches: Vec<String>,
    /// Stored keys that escaped the sweep only because their row was present,
    /// although that row was then rejected. These records keep stale values.
    pub retained_without_update: Vec<String>,
    pub outcomes: Vec<RowOutcome>,
}

impl ReconcileSummary {
    pub fn persisted(&self) -> usize {
        self.created + self.updated
    }

    fn record(&mut self, outcome: RowOutcome) {
        match &outcome {
            RowOutcome::Persisted {
                created,
                notes,
                notified,
                ..
            } => {
                if *created {
                    self.created += 1;
                } else {
                    self.updated += 1;
                }
                self.coercion_notes += notes.len();
                if !notified {
                    self.publish_failures += 1;
                }
            }
            RowOutcome::Rejected { notified, .. } => {
                self.rejected += 1;
                if !notified {
                    self.publish_failures += 1;
                }
            }
        }
        self.outcomes.push(outcome);
    }

    pub fn summary(&self) -> String {
        format!(
            "{} rows: {} created, {} updated, {} rejected, {} deleted ({} coercion notes, {} publish failures)",
            self.rows,
            self.created,
            self.updated,
            self.rejected,
            self.deleted,
            self.coercion_notes,
            self.publish_failures
        )
    }
}

// ============================================================================
// RECONCILER
// ============================================================================

pub struct Reconciler<'a> {
    store: &'a dyn PlayerStore,
    publisher: &'a dyn EventPublisher,
    rejection_channel: String,
}

impl<'a> Reconciler<'a> {
    pub fn new(store: &'a dyn PlayerStore, publisher: &'a dyn EventPublisher) -> Self {
        Reconciler {
            store,
            publisher,
            rejection_channel: REJECTION_CHANNEL.to_string(),
        }
    }

    pub fn with_rejection_channel(mut self, channel: impl Into<String>) -> Self {
        self.rejection_channel = channel.into();
        self
    }

    /// Read a CSV snapshot from disk and reconcile it.
    ///
    /// Never fails: an unreadable file is logged and reported as
    /// `BatchOutcome::Aborted`.
    pub fn reconcile_csv(&self, path: &Path) -> BatchOutcome {
        info!(path = %path.display(), "Started reloading player data from CSV");

        match read_snapshot(path) {
            Ok(rows) => self.reconcile(&rows),
            Err(e) => {
                error!(error = %e, "Error reading CSV file");
                BatchOutcome::Aborted(AbortReason::SnapshotUnavailable(e.to_string()))
            }
        }
    }

    /// Reconcile an in-memory snapshot. `rows[0]` is the header.
    pub fn reconcile(&self, rows: &[Row]) -> BatchOutcome {
        let (header, records) = match rows.split_first() {
            Some((header, records)) => (Some(header), records),
            None => (None, rows),
        };

        let mut summary = ReconcileSummary {
            rows: records.len(),
            ..Default::default()
        };

        if let Some(header) = header {
            summary.header_mismatches = validator::check_header(header);
            for mismatch in &summary.header_mismatches {
                warn!(%mismatch, "Snapshot header does not match player columns");
            }
        }

        // Column 0 of every row, without the blank-key check. A blank key
        // protects nothing since no stored key is blank.
        let snapshot_keys: HashSet<&str> = records
            .iter()
            .filter_map(|row| row.first().map(String::as_str))
            .collect();

        let existing_keys = match self.sweep(&snapshot_keys) {
            Ok((existing_keys, deleted)) => {
                summary.deleted = deleted;
                existing_keys
            }
            Err(reason) => {
                error!(%reason, "Aborting reload");
                return BatchOutcome::Aborted(reason);
            }
        };

        for (offset, row) in records.iter().enumerate() {
            // 1-based line number in the source, header is line 1
            let outcome = self.process_row(offset + 2, row);

            if let RowOutcome::Rejected {
                player_id: Some(player_id),
                ..
            } = &outcome
            {
                if existing_keys.contains(player_id)
                    && !summary.retained_without_update.contains(player_id)
                {
                    warn!(
                        %player_id,
                        "Stored player kept by the sweep but its row was rejected; values are stale"
                    );
                    summary.retained_without_update.push(player_id.clone());
                }
            }

            summary.record(outcome);
        }

        info!(summary = %summary.summary(), "Finished reloading player data from CSV");
        BatchOutcome::Completed(summary)
    }

    /// Delete every stored player whose key is absent from the snapshot.
    /// Returns the keys that survived the sweep and the number deleted.
    fn sweep(&self, snapshot_keys: &HashSet<&str>) -> Result<(HashSet<String>, usize), AbortReason> {
        let stored = self
            .store
            .find_all()
            .map_err(|e| AbortReason::SweepFailed(e.to_string()))?;

        let (to_delete, kept): (Vec<Player>, Vec<Player>) = stored
            .into_iter()
            .partition(|player| !snapshot_keys.contains(player.player_id.as_str()));

        let deleted = self
            .store
            .delete_all(&to_delete)
            .map_err(|e| AbortReason::SweepFailed(e.to_string()))?;

        if deleted > 0 {
            info!(deleted, "Deleted players missing from snapshot");
        }

        Ok((kept.into_iter().map(|p| p.player_id).collect(), deleted))
    }

    /// Validate, upsert and notify one row. Never fails.
    pub fn process_row(&self, line: usize, row: &[String]) -> RowOutcome {
        let player_id = match validator::validate_key(row) {
            Ok(key) => key,
            Err(reason) => return self.reject(line, row, None, reason),
        };

        match self.upsert(player_id, row) {
            Ok((player, created, notes)) => {
                for note in &notes {
                    warn!(line, %player_id, field = %note.field, value = %note.value, "Unparsable integer left empty");
                }
                debug!(line, "Loaded/Updated player: {}", player);

                let notified = match self.publisher.send(&format!("Player loaded/updated: {}", player)) {
                    Ok(()) => true,
                    Err(e) => {
                        warn!(line, %player_id, error = %e, "Failed to publish player event");
                        false
                    }
                };

                RowOutcome::Persisted {
                    line,
                    player_id: player.player_id,
                    created,
                    notes,
                    notified,
                }
            }
            Err(reason) => self.reject(line, row, Some(player_id.to_string()), reason),
        }
    }

    /// Lookup → shell → populate → save
    fn upsert(&self, player_id: &str, row: &[String]) -> Result<(Player, bool, Vec<CoercionNote>), RejectReason> {
        let existing = self
            .store
            .find_by_id(player_id)
            .map_err(|e| RejectReason::Store(e.to_string()))?;

        let created = existing.is_none();
        let mut player = existing.unwrap_or_default();
        player.player_id = player_id.to_string();

        let notes = validator::populate(&mut player, row)?;

        let saved = self
            .store
            .save(&player)
            .map_err(|e| RejectReason::Store(e.to_string()))?;

        Ok((saved, created, notes))
    }

    fn reject(
        &self,
        line: usize,
        row: &[String],
        player_id: Option<String>,
        reason: RejectReason,
    ) -> RowOutcome {
        warn!(
            line,
            player_id = player_id.as_deref().unwrap_or(""),
            %reason,
            "Rejected player record"
        );

        let message = validator::render_rejection(row);
        let notified = match self.publisher.send_to(&self.rejection_channel, &message) {
            Ok(()) => true,
            Err(e) => {
                error!(line, channel = %self.rejection_channel, error = %e, "Failed to publish rejected record");
                false
            }
        };

        RowOutcome::Rejected {
            line,
            player_id,
            reason,
            notified,
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
