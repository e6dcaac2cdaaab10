use crate::player::Player;
use crate::store::{ensure_storable, page_offset, PlayerStore, StoreError, StoreResult};
use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

pub fn setup_database(conn: &Connection) -> Result<()> {
    // Enable WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;

    // ==========================================================================
    // Players Table (natural key + store-assigned surrogate id)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS players (
            player_id TEXT PRIMARY KEY NOT NULL,
            id TEXT UNIQUE NOT NULL,
            birth_year INTEGER,
            birth_month INTEGER,
            birth_day INTEGER,
            birth_country TEXT NOT NULL,
            birth_state TEXT NOT NULL,
            birth_city TEXT NOT NULL,
            death_year INTEGER,
            death_month INTEGER,
            death_day INTEGER,
            death_country TEXT NOT NULL,
            death_state TEXT NOT NULL,
            death_city TEXT NOT NULL,
            name_first TEXT NOT NULL,
            name_last TEXT NOT NULL,
            name_given TEXT NOT NULL,
            weight INTEGER,
            height INTEGER,
            bats TEXT NOT NULL,
            throws TEXT NOT NULL,
            debut TEXT NOT NULL,
            final_game TEXT NOT NULL,
            retro_id TEXT NOT NULL,
            bbref_id TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        [],
    )?;

    // ==========================================================================
    // Events Table (publisher outbox)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS events (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            event_id TEXT UNIQUE NOT NULL,
            channel TEXT NOT NULL,
            payload TEXT NOT NULL,
            published_at TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_events_channel ON events(channel, seq)",
        [],
    )?;

    Ok(())
}

/// Open a database file and make sure the schema exists
pub fn open_database(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)
        .with_context(|| format!("Failed to open database {}", path.display()))?;
    setup_database(&conn).context("Failed to set up database schema")?;
    Ok(conn)
}

const PLAYER_COLUMNS: &str = "id, player_id,
    birth_year, birth_month, birth_day, birth_country, birth_state, birth_city,
    death_year, death_month, death_day, death_country, death_state, death_city,
    name_first, name_last, name_given, weight, height, bats, throws,
    debut, final_game, retro_id, bbref_id";

fn player_from_row(row: &Row<'_>) -> rusqlite::Result<Player> {
    Ok(Player {
        id: row.get(0)?,
        player_id: row.get(1)?,
        birth_year: row.get(2)?,
        birth_month: row.get(3)?,
        birth_day: row.get(4)?,
        birth_country: row.get(5)?,
        birth_state: row.get(6)?,
        birth_city: row.get(7)?,
        death_year: row.get(8)?,
        death_month: row.get(9)?,
        death_day: row.get(10)?,
        death_country: row.get(11)?,
        death_state: row.get(12)?,
        death_city: row.get(13)?,
        name_first: row.get(14)?,
        name_last: row.get(15)?,
        name_given: row.get(16)?,
        weight: row.get(17)?,
        height: row.get(18)?,
        bats: row.get(19)?,
        throws: row.get(20)?,
        debut: row.get(21)?,
        final_game: row.get(22)?,
        retro_id: row.get(23)?,
        bbref_id: row.get(24)?,
    })
}

fn find_player(conn: &Connection, player_id: &str) -> rusqlite::Result<Option<Player>> {
    conn.query_row(
        &format!("SELECT {} FROM players WHERE player_id = ?1", PLAYER_COLUMNS),
        [player_id],
        player_from_row,
    )
    .optional()
}

// ============================================================================
// SQLITE PLAYER STORE
// ============================================================================

/// `PlayerStore` backed by the `players` table
pub struct SqlitePlayerStore {
    conn: Mutex<Connection>,
}

impl SqlitePlayerStore {
    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self {
            conn: Mutex::new(open_database(path)?),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    pub fn from_connection(conn: Connection) -> Result<Self> {
        setup_database(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }
}

impl PlayerStore for SqlitePlayerStore {
    fn find_all(&self) -> StoreResult<Vec<Player>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM players ORDER BY player_id",
            PLAYER_COLUMNS
        ))?;

        let players = stmt
            .query_map([], player_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(players)
    }

    fn find_page(&self, page: usize, size: usize) -> StoreResult<Vec<Player>> {
        let offset = match page_offset(page, size).and_then(|o| i64::try_from(o).ok()) {
            Some(offset) => offset,
            None => return Ok(Vec::new()),
        };
        let limit = i64::try_from(size).unwrap_or(i64::MAX);

        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM players ORDER BY player_id LIMIT ?1 OFFSET ?2",
            PLAYER_COLUMNS
        ))?;

        let players = stmt
            .query_map(params![limit, offset], player_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(players)
    }

    fn find_by_id(&self, player_id: &str) -> StoreResult<Option<Player>> {
        let conn = self.lock()?;
        Ok(find_player(&conn, player_id)?)
    }

    fn save(&self, player: &Player) -> StoreResult<Player> {
        ensure_storable(player)?;

        let conn = self.lock()?;
        let now = Utc::now().to_rfc3339();
        let new_id = player
            .id
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        // `id` and `created_at` are left out of the update set so the
        // surrogate identity survives every upsert.
        conn.execute(
            "INSERT INTO players (
                id, player_id,
                birth_year, birth_month, birth_day, birth_country, birth_state, birth_city,
                death_year, death_month, death_day, death_country, death_state, death_city,
                name_first, name_last, name_given, weight, height, bats, throws,
                debut, final_game, retro_id, bbref_id,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16,
                      ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25, ?26, ?26)
            ON CONFLICT(player_id) DO UPDATE SET
                birth_year = excluded.birth_year,
                birth_month = excluded.birth_month,
                birth_day = excluded.birth_day,
                birth_country = excluded.birth_country,
                birth_state = excluded.birth_state,
                birth_city = excluded.birth_city,
                death_year = excluded.death_year,
                death_month = excluded.death_month,
                death_day = excluded.death_day,
                death_country = excluded.death_country,
                death_state = excluded.death_state,
                death_city = excluded.death_city,
                name_first = excluded.name_first,
                name_last = excluded.name_last,
                name_given = excluded.name_given,
                weight = excluded.weight,
                height = excluded.height,
                bats = excluded.bats,
                throws = excluded.throws,
                debut = excluded.debut,
                final_game = excluded.final_game,
                retro_id = excluded.retro_id,
                bbref_id = excluded.bbref_id,
                updated_at = excluded.updated_at",
            params![
                new_id,
                player.player_id,
                player.birth_year,
                player.birth_month,
                player.birth_day,
                player.birth_country,
                player.birth_state,
                player.birth_city,
                player.death_year,
                player.death_month,
                player.death_day,
                player.death_country,
                player.death_state,
                player.death_city,
                player.name_first,
                player.name_last,
                player.name_given,
                player.weight,
                player.height,
                player.bats,
                player.throws,
                player.debut,
                player.final_game,
                player.retro_id,
                player.bbref_id,
                now,
            ],
        )?;

        find_player(&conn, &player.player_id)?.ok_or_else(|| {
            StoreError::InvalidRecord(format!("{} vanished after upsert", player.player_id))
        })
    }

    fn delete_all(&self, players: &[Player]) -> StoreResult<usize> {
        if players.is_empty() {
            return Ok(0);
        }

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let mut removed = 0;

        {
            let mut stmt = tx.prepare("DELETE FROM players WHERE player_id = ?1")?;
            for player in players {
                removed += stmt.execute([&player.player_id])?;
            }
        }

        tx.commit()?;
        Ok(removed)
    }

    fn count(&self) -> StoreResult<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM players", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or_default())
    }
}
