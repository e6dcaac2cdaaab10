//! End-to-end reconciliation scenarios: CSV file on disk → SQLite store +
//! in-memory publisher.

use playerdb::{
    BatchOutcome, MemoryPublisher, OutboxPublisher, Player, PlayerField, PlayerStore,
    Reconciler, RejectReason, RowOutcome, SqlitePlayerStore, DEFAULT_CHANNEL, REJECTION_CHANNEL,
};
use std::collections::BTreeSet;
use std::io::Write;
use std::path::PathBuf;
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn header_line() -> String {
    PlayerField::ALL
        .iter()
        .map(|f| f.name())
        .collect::<Vec<_>>()
        .join(",")
}

/// A 24-column CSV line; unspecified trailing columns are empty
fn line(values: &[&str]) -> String {
    let mut fields: Vec<String> = values.iter().map(|v| v.to_string()).collect();
    fields.resize(PlayerField::COUNT, String::new());
    fields.join(",")
}

fn write_csv(dir: &TempDir, name: &str, lines: &[String]) -> PathBuf {
    let path = dir.path().join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(file, "{}", header_line()).unwrap();
    for l in lines {
        writeln!(file, "{}", l).unwrap();
    }
    path
}

fn keys(store: &dyn PlayerStore) -> BTreeSet<String> {
    store
        .find_all()
        .unwrap()
        .into_iter()
        .map(|p| p.player_id)
        .collect()
}

fn completed(outcome: BatchOutcome) -> playerdb::ReconcileSummary {
    match outcome {
        BatchOutcome::Completed(summary) => summary,
        BatchOutcome::Aborted(reason) => panic!("batch aborted: {}", reason),
    }
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[test]
fn all_valid_rows_are_upserted_and_announced() {
    let dir = TempDir::new().unwrap();
    let csv = write_csv(
        &dir,
        "Player.csv",
        &[
            line(&["aardsda01", "1981", "12", "27", "USA", "CO", "Denver"]),
            line(&["aaronha01", "1934", "2", "5", "USA", "AL", "Mobile"]),
            line(&["abadfe01", "1985", "12", "17", "D.R.", "La Romana", "La Romana"]),
        ],
    );

    let store = SqlitePlayerStore::open_in_memory().unwrap();
    let publisher = MemoryPublisher::new();
    let summary = completed(Reconciler::new(&store, &publisher).reconcile_csv(&csv));

    assert_eq!(summary.rows, 3);
    assert_eq!(summary.created, 3);
    assert_eq!(summary.rejected, 0);
    assert_eq!(store.count().unwrap(), 3);
    assert_eq!(publisher.messages_on(DEFAULT_CHANNEL).len(), 3);
    assert!(publisher.messages_on(REJECTION_CHANNEL).is_empty());

    let hank = store.find_by_id("aaronha01").unwrap().unwrap();
    assert_eq!(hank.birth_city, "Mobile");
    assert_eq!(hank.birth_month, Some(2));
    assert_eq!(hank.death_year, None);
}

#[test]
fn valid_row_and_blank_key_row() {
    let dir = TempDir::new().unwrap();
    let csv = write_csv(
        &dir,
        "Player.csv",
        &[line(&["P1", "1990", ""]), line(&[" ", "2000"])],
    );

    let store = SqlitePlayerStore::open_in_memory().unwrap();
    let publisher = MemoryPublisher::new();
    completed(Reconciler::new(&store, &publisher).reconcile_csv(&csv));

    assert_eq!(keys(&store), BTreeSet::from(["P1".to_string()]));
    assert_eq!(store.find_by_id("P1").unwrap().unwrap().birth_month, None);
    assert_eq!(publisher.messages_on(DEFAULT_CHANNEL).len(), 1);

    let rejected = publisher.messages_on(REJECTION_CHANNEL);
    assert_eq!(rejected.len(), 1);
    let json: serde_json::Value = serde_json::from_str(&rejected[0]).unwrap();
    assert_eq!(json["playerID"], " ");
    assert_eq!(json["birthYear"], "2000");
}

#[test]
fn omitted_key_is_deleted_on_next_snapshot() {
    let dir = TempDir::new().unwrap();
    let store = SqlitePlayerStore::open_in_memory().unwrap();
    let publisher = MemoryPublisher::new();
    let reconciler = Reconciler::new(&store, &publisher);

    let first = write_csv(&dir, "v1.csv", &[line(&["A"]), line(&["B"]), line(&["C"])]);
    completed(reconciler.reconcile_csv(&first));
    assert_eq!(store.count().unwrap(), 3);

    let second = write_csv(&dir, "v2.csv", &[line(&["B"]), line(&["C"]), line(&["D"])]);
    let summary = completed(reconciler.reconcile_csv(&second));

    assert_eq!(summary.deleted, 1);
    assert_eq!(summary.created, 1);
    assert_eq!(summary.updated, 2);
    assert!(store.find_by_id("A").unwrap().is_none());
    assert_eq!(
        keys(&store),
        ["B", "C", "D"].iter().map(|k| k.to_string()).collect::<BTreeSet<String>>()
    );
}

#[test]
fn rerunning_unchanged_snapshot_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let csv = write_csv(
        &dir,
        "Player.csv",
        &[line(&["A", "1950"]), line(&["B", "1960"])],
    );

    let store = SqlitePlayerStore::open_in_memory().unwrap();
    let publisher = MemoryPublisher::new();
    let reconciler = Reconciler::new(&store, &publisher);

    completed(reconciler.reconcile_csv(&csv));
    let before: Vec<Player> = store.find_all().unwrap();

    let summary = completed(reconciler.reconcile_csv(&csv));
    let after: Vec<Player> = store.find_all().unwrap();

    assert_eq!(before, after, "content and surrogate ids unchanged");
    assert_eq!(summary.deleted, 0);
    assert_eq!(summary.updated, 2);
    // Events are not deduplicated
    assert_eq!(publisher.messages_on(DEFAULT_CHANNEL).len(), 4);
}

#[test]
fn unparsable_integer_defaults_to_absent_without_rejection() {
    let dir = TempDir::new().unwrap();
    let csv = write_csv(&dir, "Player.csv", &[line(&["A", "19x0", "13"])]);

    let store = SqlitePlayerStore::open_in_memory().unwrap();
    let publisher = MemoryPublisher::new();
    let summary = completed(Reconciler::new(&store, &publisher).reconcile_csv(&csv));

    let player = store.find_by_id("A").unwrap().unwrap();
    assert_eq!(player.birth_year, None);
    // Range is not checked, only parseability
    assert_eq!(player.birth_month, Some(13));
    assert_eq!(summary.coercion_notes, 1);
    assert_eq!(publisher.messages_on(DEFAULT_CHANNEL).len(), 1);
    assert!(publisher.messages_on(REJECTION_CHANNEL).is_empty());
}

#[test]
fn deletion_follows_column_zero_even_for_rejected_rows() {
    // A stored key whose row is present but rejected survives the sweep with
    // its old values, and the summary flags it.
    let dir = TempDir::new().unwrap();
    let store = SqlitePlayerStore::open_in_memory().unwrap();
    let publisher = MemoryPublisher::new();
    let reconciler = Reconciler::new(&store, &publisher);

    let first = write_csv(&dir, "v1.csv", &[line(&["A", "1950"]), line(&["B", "1960"])]);
    completed(reconciler.reconcile_csv(&first));

    // Row for A is truncated → rejected; B is gone → deleted
    let second = write_csv(&dir, "v2.csv", &["A,1999".to_string(), line(&["C"])]);
    let summary = completed(reconciler.reconcile_csv(&second));

    assert_eq!(
        keys(&store),
        ["A", "C"].iter().map(|k| k.to_string()).collect::<BTreeSet<String>>()
    );
    assert_eq!(store.find_by_id("A").unwrap().unwrap().birth_year, Some(1950));
    assert_eq!(summary.retained_without_update, vec!["A".to_string()]);
    assert!(matches!(
        summary.outcomes[0],
        RowOutcome::Rejected {
            reason: RejectReason::TooFewFields { found: 2, .. },
            ..
        }
    ));
}

#[test]
fn missing_snapshot_aborts_before_any_deletion() {
    let store = SqlitePlayerStore::open_in_memory().unwrap();
    store.save(&Player::new("A")).unwrap();
    let publisher = MemoryPublisher::new();

    let outcome =
        Reconciler::new(&store, &publisher).reconcile_csv(std::path::Path::new("/no/such/Player.csv"));

    assert!(!outcome.is_completed());
    assert_eq!(store.count().unwrap(), 1);
    assert!(publisher.events().is_empty());
}

#[test]
fn header_only_snapshot_empties_the_store() {
    let dir = TempDir::new().unwrap();
    let store = SqlitePlayerStore::open_in_memory().unwrap();
    store.save(&Player::new("A")).unwrap();
    store.save(&Player::new("B")).unwrap();
    let publisher = MemoryPublisher::new();

    let csv = write_csv(&dir, "empty.csv", &[]);
    let summary = completed(Reconciler::new(&store, &publisher).reconcile_csv(&csv));

    assert_eq!(summary.rows, 0);
    assert_eq!(summary.deleted, 2);
    assert_eq!(store.count().unwrap(), 0);
}

#[test]
fn outbox_receives_both_channels() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("players.db");
    let csv = write_csv(&dir, "Player.csv", &[line(&["A"]), line(&[""]), line(&["B"])]);

    let store = SqlitePlayerStore::open(&db_path).unwrap();
    let outbox = OutboxPublisher::open(&db_path, DEFAULT_CHANNEL).unwrap();
    completed(Reconciler::new(&store, &outbox).reconcile_csv(&csv));

    assert_eq!(outbox.count_channel(DEFAULT_CHANNEL).unwrap(), 2);
    assert_eq!(outbox.count_channel(REJECTION_CHANNEL).unwrap(), 1);

    let latest = outbox.list_channel(DEFAULT_CHANNEL, 1).unwrap();
    assert!(latest[0].payload.contains("playerID='B'"));
}

#[test]
fn invalid_utf8_field_does_not_abort_the_batch() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("Player.csv");

    let mut bytes = format!("{}\n{}\n", header_line(), line(&["A"])).into_bytes();
    bytes.extend_from_slice(line(&["B", "1970", "1", "1", "Brazil", "SP", "Sao Paulo \u{1}"]).as_bytes());
    // Replace the marker with a lone Latin-1 byte
    let marker = bytes.iter().rposition(|b| *b == 0x01).unwrap();
    bytes[marker] = 0xe3;
    bytes.extend_from_slice(format!("\n{}\n", line(&["C"])).as_bytes());
    std::fs::write(&path, bytes).unwrap();

    let store = SqlitePlayerStore::open_in_memory().unwrap();
    store.save(&Player::new("STALE")).unwrap();
    let publisher = MemoryPublisher::new();
    let summary = completed(Reconciler::new(&store, &publisher).reconcile_csv(&path));

    assert_eq!(summary.deleted, 1);
    assert_eq!(summary.created, 3);
    assert_eq!(
        keys(&store),
        ["A", "B", "C"].iter().map(|k| k.to_string()).collect::<BTreeSet<String>>()
    );
    assert_eq!(
        store.find_by_id("B").unwrap().unwrap().birth_city,
        "Sao Paulo \u{FFFD}"
    );
}
