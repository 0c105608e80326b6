/// Runtime game record and entity conversions.
pub mod game;
/// Guess/hint transition logic and the win predicate.
pub mod state_machine;
/// Process-local cache tiers.
pub mod tiers;

use std::sync::Arc;

use tokio::sync::{RwLock, watch};
use tracing::{info, warn};

use crate::{
    config::QuoteCorpus,
    dao::game_store::GameStore,
    state::{game::GameRecord, tiers::{CacheTier, MemoryTier, SessionTier}},
};

/// Shared handle to the application state.
pub type SharedState = Arc<AppState>;

/// Central application state owning the three storage tiers.
///
/// The in-memory and session tiers live here for the process lifetime; the
/// durable tier is a replaceable slot so the backend can drop out and come
/// back without touching gameplay. While the slot is empty the application
/// runs degraded: games play normally but nothing survives a restart.
pub struct AppState {
    memory: MemoryTier,
    sessions: SessionTier,
    game_store: RwLock<Option<Arc<dyn GameStore>>>,
    degraded: watch::Sender<bool>,
    corpus: QuoteCorpus,
}

impl AppState {
    /// Construct the state wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until a storage backend is
    /// installed.
    pub fn new(corpus: QuoteCorpus) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        Arc::new(Self {
            memory: MemoryTier::new(),
            sessions: SessionTier::new(),
            game_store: RwLock::new(None),
            degraded: degraded_tx,
            corpus,
        })
    }

    /// The fast-path tier keyed by game id.
    pub fn memory(&self) -> &MemoryTier {
        &self.memory
    }

    /// The per-session tier keyed by opaque token.
    pub fn sessions(&self) -> &SessionTier {
        &self.sessions
    }

    /// Quote corpus games are created from.
    pub fn corpus(&self) -> &QuoteCorpus {
        &self.corpus
    }

    /// Obtain a handle to the current durable store, if one is installed.
    pub async fn game_store(&self) -> Option<Arc<dyn GameStore>> {
        let guard = self.game_store.read().await;
        guard.as_ref().cloned()
    }

    /// Install a durable store implementation and leave degraded mode.
    pub async fn install_game_store(&self, store: Arc<dyn GameStore>) {
        {
            let mut guard = self.game_store.write().await;
            *guard = Some(store);
        }
        self.update_degraded(false);
    }

    /// Remove the current durable store and enter degraded mode.
    pub async fn clear_game_store(&self) {
        {
            let mut guard = self.game_store.write().await;
            guard.take();
        }
        self.update_degraded(true);
    }

    /// Whether the durable tier is currently unavailable.
    pub async fn is_degraded(&self) -> bool {
        let guard = self.game_store.read().await;
        guard.is_none()
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Seed the in-memory tier from every durable record, so games survive
    /// a process restart. Rows that fail to rehydrate are skipped with a
    /// warning rather than poisoning the whole warm-up.
    pub async fn warm_from_store(&self) -> usize {
        let Some(store) = self.game_store().await else {
            return 0;
        };

        let entities = match store.list_games().await {
            Ok(entities) => entities,
            Err(err) => {
                warn!(error = %err, "failed to list durable games for warm-up");
                return 0;
            }
        };

        let mut loaded = 0;
        for entity in entities {
            let game_id = entity.game_id;
            match GameRecord::try_from(entity) {
                Ok(record) => {
                    self.memory.put(game_id, record);
                    loaded += 1;
                }
                Err(err) => {
                    warn!(game_id = %game_id, error = %err, "skipping corrupt durable game row");
                }
            }
        }

        info!(count = loaded, "warmed game cache from durable store");
        loaded
    }

    /// Update and broadcast the degraded flag when the value changes.
    pub(crate) fn update_degraded(&self, value: bool) {
        if *self.degraded.borrow() == value {
            return;
        }
        let _ = self.degraded.send(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_degraded_with_empty_tiers() {
        let state = AppState::new(QuoteCorpus::default());
        assert!(state.memory().is_empty());
        assert!(*state.degraded_watcher().borrow());
    }

    #[cfg(feature = "sqlite-store")]
    #[tokio::test]
    async fn installing_a_store_toggles_degraded_mode() {
        use crate::dao::game_store::sqlite::SqliteGameStore;

        let state = AppState::new(QuoteCorpus::default());
        assert!(state.is_degraded().await);

        let store = SqliteGameStore::open_in_memory().unwrap();
        state.install_game_store(Arc::new(store)).await;
        assert!(!state.is_degraded().await);
        assert!(!*state.degraded_watcher().borrow());

        state.clear_game_store().await;
        assert!(state.is_degraded().await);
    }

    #[cfg(feature = "sqlite-store")]
    #[tokio::test]
    async fn warm_from_store_loads_every_durable_game() {
        use crate::config::Quote;
        use crate::dao::game_store::sqlite::SqliteGameStore;
        use crate::dao::game_store::GameStore;

        let store = SqliteGameStore::open_in_memory().unwrap();
        let record = GameRecord::new(
            Quote {
                text: "TEST".into(),
                major_attribution: "ANONYMOUS".into(),
                minor_attribution: String::new(),
            },
            Some("user-1".into()),
        );
        store.save_game(record.clone().into()).await.unwrap();

        let state = AppState::new(QuoteCorpus::default());
        state.install_game_store(Arc::new(store)).await;

        assert_eq!(state.warm_from_store().await, 1);
        assert_eq!(state.memory().get(&record.game_id), Some(record));
    }
}
