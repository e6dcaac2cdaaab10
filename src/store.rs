// 🗄️ Record Store - keyed player storage seam
//
// The reconciler and the read API only see `PlayerStore`. SQLite lives in
// db.rs; the in-memory store below backs the tests.

use crate::player::Player;
use std::collections::BTreeMap;
use std::sync::RwLock;
use thiserror::Error;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Store lock poisoned")]
    Poisoned,

    #[error("Invalid record: {0}")]
    InvalidRecord(String),
}

/// Keyed player storage
///
/// `save` is an upsert by natural key: the store assigns the surrogate `id`
/// on first insert and preserves it on every later update.
pub trait PlayerStore: Send + Sync {
    /// Every stored player, ordered by key
    fn find_all(&self) -> StoreResult<Vec<Player>>;

    /// One zero-based page of players, ordered by key
    fn find_page(&self, page: usize, size: usize) -> StoreResult<Vec<Player>>;

    fn find_by_id(&self, player_id: &str) -> StoreResult<Option<Player>>;

    /// Insert or update; returns the persisted record
    fn save(&self, player: &Player) -> StoreResult<Player>;

    /// Delete the given records by key; returns how many rows were removed
    fn delete_all(&self, players: &[Player]) -> StoreResult<usize>;

    fn count(&self) -> StoreResult<usize>;
}

/// Reject records that must never reach a store
pub(crate) fn ensure_storable(player: &Player) -> StoreResult<()> {
    if player.player_id.trim().is_empty() {
        return Err(StoreError::InvalidRecord("playerID is blank".to_string()));
    }
    Ok(())
}

/// Offset of a page, `None` when it overflows
pub(crate) fn page_offset(page: usize, size: usize) -> Option<usize> {
    page.checked_mul(size)
}

// ============================================================================
// IN-MEMORY STORE
// ============================================================================

#[derive(Debug, Default)]
pub struct MemoryPlayerStore {
    players: RwLock<BTreeMap<String, Player>>,
}

impl MemoryPlayerStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PlayerStore for MemoryPlayerStore {
    fn find_all(&self) -> StoreResult<Vec<Player>> {
        let players = self.players.read().map_err(|_| StoreError::Poisoned)?;
        Ok(players.values().cloned().collect())
    }

    fn find_page(&self, page: usize, size: usize) -> StoreResult<Vec<Player>> {
        let Some(offset) = page_offset(page, size) else {
            return Ok(Vec::new());
        };
        let players = self.players.read().map_err(|_| StoreError::Poisoned)?;
        Ok(players.values().skip(offset).take(size).cloned().collect())
    }

    fn find_by_id(&self, player_id: &str) -> StoreResult<Option<Player>> {
        let players = self.players.read().map_err(|_| StoreError::Poisoned)?;
        Ok(players.get(player_id).cloned())
    }

    fn save(&self, player: &Player) -> StoreResult<Player> {
        ensure_storable(player)?;

        let mut players = self.players.write().map_err(|_| StoreError::Poisoned)?;

        let id = players
            .get(&player.player_id)
            .and_then(|existing| existing.id.clone())
            .or_else(|| player.id.clone())
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        let mut stored = player.clone();
        stored.id = Some(id);
        players.insert(stored.player_id.clone(), stored.clone());

        Ok(stored)
    }

    fn delete_all(&self, players: &[Player]) -> StoreResult<usize> {
        let mut stored = self.players.write().map_err(|_| StoreError::Poisoned)?;
        Ok(players
            .iter()
            .filter(|player| stored.remove(&player.player_id).is_some())
            .count())
    }

    fn count(&self) -> StoreResult<usize> {
        let players = self.players.read().map_err(|_| StoreError::Poisoned)?;
        Ok(players.len())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_assigns_surrogate_id() {
        let store = MemoryPlayerStore::new();

        let saved = store.save(&Player::new("aardsda01")).unwrap();
        assert!(saved.id.is_some());
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn test_update_preserves_identity() {
        let store = MemoryPlayerStore::new();
        let first = store.save(&Player::new("aardsda01")).unwrap();

        let mut changed = Player::new("aardsda01");
        changed.name_first = "David".to_string();
        let second = store.save(&changed).unwrap();

        assert_eq!(first.id, second.id, "identity persists across updates");
        assert_eq!(store.count().unwrap(), 1, "never duplicated");
        assert_eq!(
            store.find_by_id("aardsda01").unwrap().unwrap().name_first,
            "David"
        );
    }

    #[test]
    fn test_blank_key_is_never_stored() {
        let store = MemoryPlayerStore::new();

        let err = store.save(&Player::new("  ")).unwrap_err();
        assert!(matches!(err, StoreError::InvalidRecord(_)));
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn test_find_page_is_ordered_by_key() {
        let store = MemoryPlayerStore::new();
        for key in ["c", "a", "e", "b", "d"] {
            store.save(&Player::new(key)).unwrap();
        }

        let keys = |page: Vec<Player>| -> Vec<String> {
            page.into_iter().map(|p| p.player_id).collect()
        };

        assert_eq!(keys(store.find_page(0, 2).unwrap()), vec!["a", "b"]);
        assert_eq!(keys(store.find_page(2, 2).unwrap()), vec!["e"]);
        assert!(store.find_page(3, 2).unwrap().is_empty());
        assert!(store.find_page(usize::MAX, 2).unwrap().is_empty());
    }

    #[test]
    fn test_delete_all_counts_removed_rows() {
        let store = MemoryPlayerStore::new();
        store.save(&Player::new("a")).unwrap();
        store.save(&Player::new("b")).unwrap();

        let removed = store
            .delete_all(&[Player::new("a"), Player::new("zzz")])
            .unwrap();

        assert_eq!(removed, 1);
        assert!(store.find_by_id("a").unwrap().is_none());
        assert!(store.find_by_id("b").unwrap().is_some());
    }
}
