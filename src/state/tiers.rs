use dashmap::DashMap;
use uuid::Uuid;

use crate::state::game::GameRecord;

/// Common get/put/remove surface of the process-local cache tiers.
///
/// Both tiers trade in whole [`GameRecord`] values; records are cloned out
/// so callers never hold a map lock across other tier operations.
pub trait CacheTier<K> {
    /// Clone out the record stored under `key`.
    fn get(&self, key: &K) -> Option<GameRecord>;
    /// Insert or replace the record stored under `key`.
    fn put(&self, key: K, record: GameRecord);
    /// Drop the record stored under `key`, returning it if present.
    fn remove(&self, key: &K) -> Option<GameRecord>;
}

/// Fast-path tier: every known game keyed by its id.
///
/// This tier is the authority for record existence; the session tier is
/// only a pointer into it, and the durable tier may lag behind.
#[derive(Debug, Default)]
pub struct MemoryTier {
    games: DashMap<Uuid, GameRecord>,
}

impl MemoryTier {
    /// Create an empty tier.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a record with this id currently exists.
    pub fn contains(&self, id: &Uuid) -> bool {
        self.games.contains_key(id)
    }

    /// Number of cached games.
    pub fn len(&self) -> usize {
        self.games.len()
    }

    /// Whether the tier holds no games at all.
    pub fn is_empty(&self) -> bool {
        self.games.is_empty()
    }

    /// Run `mutate` on the record under `id` while holding its map entry,
    /// returning the closure result. This is the per-game mutual exclusion
    /// point: concurrent guesses for the same game serialize here.
    pub fn with_record_mut<T>(
        &self,
        id: &Uuid,
        mutate: impl FnOnce(&mut GameRecord) -> T,
    ) -> Option<T> {
        self.games.get_mut(id).map(|mut entry| mutate(&mut entry))
    }
}

impl CacheTier<Uuid> for MemoryTier {
    fn get(&self, key: &Uuid) -> Option<GameRecord> {
        self.games.get(key).map(|entry| entry.value().clone())
    }

    fn put(&self, key: Uuid, record: GameRecord) {
        self.games.insert(key, record);
    }

    fn remove(&self, key: &Uuid) -> Option<GameRecord> {
        self.games.remove(key).map(|(_, record)| record)
    }
}

/// Session tier: one active game per opaque session token.
///
/// Entries are never eagerly purged when a game ends; resolution treats a
/// slot whose game no longer exists in the memory tier as a miss.
#[derive(Debug, Default)]
pub struct SessionTier {
    slots: DashMap<String, GameRecord>,
}

impl SessionTier {
    /// Create an empty tier.
    pub fn new() -> Self {
        Self::default()
    }
}

impl CacheTier<String> for SessionTier {
    fn get(&self, key: &String) -> Option<GameRecord> {
        self.slots.get(key).map(|entry| entry.value().clone())
    }

    fn put(&self, key: String, record: GameRecord) {
        self.slots.insert(key, record);
    }

    fn remove(&self, key: &String) -> Option<GameRecord> {
        self.slots.remove(key).map(|(_, record)| record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Quote;

    fn record() -> GameRecord {
        GameRecord::new(
            Quote {
                text: "THE QUICK BROWN FOX".into(),
                major_attribution: "ANONYMOUS".into(),
                minor_attribution: String::new(),
            },
            None,
        )
    }

    #[test]
    fn memory_tier_round_trips_records_by_id() {
        let tier = MemoryTier::new();
        let game = record();
        let id = game.game_id;

        assert!(tier.get(&id).is_none());
        tier.put(id, game.clone());
        assert!(tier.contains(&id));
        assert_eq!(tier.get(&id), Some(game.clone()));
        assert_eq!(tier.remove(&id), Some(game));
        assert!(tier.is_empty());
    }

    #[test]
    fn with_record_mut_mutates_in_place() {
        let tier = MemoryTier::new();
        let game = record();
        let id = game.game_id;
        tier.put(id, game);

        let mistakes = tier.with_record_mut(&id, |rec| {
            rec.mistakes += 1;
            rec.mistakes
        });
        assert_eq!(mistakes, Some(1));
        assert_eq!(tier.get(&id).unwrap().mistakes, 1);

        let missing = tier.with_record_mut(&Uuid::new_v4(), |_| ());
        assert!(missing.is_none());
    }

    #[test]
    fn session_tier_holds_one_record_per_token() {
        let tier = SessionTier::new();
        let first = record();
        let second = record();

        tier.put("token-a".into(), first);
        tier.put("token-a".into(), second.clone());

        assert_eq!(tier.get(&"token-a".into()), Some(second));
        assert!(tier.get(&"token-b".into()).is_none());
    }
}
