#[cfg(feature = "mongo-store")]
pub mod mongodb;
#[cfg(feature = "sqlite-store")]
pub mod sqlite;

use std::time::SystemTime;

use crate::dao::models::GameEntity;
use crate::dao::storage::StorageResult;
use futures::future::BoxFuture;
use uuid::Uuid;

/// Abstraction over the durable tier for active game records.
///
/// `save_game` must supersede any existing row for the entity's `user_id`
/// atomically, so the one-active-game-per-user invariant holds even under
/// concurrent creation.
pub trait GameStore: Send + Sync {
    /// Insert or replace the record, superseding the user's previous game.
    fn save_game(&self, game: GameEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Active record owned by `user_id`, if any.
    fn find_by_user(&self, user_id: String) -> BoxFuture<'static, StorageResult<Option<GameEntity>>>;
    /// Record keyed by game id, regardless of owner.
    fn find_by_game(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<GameEntity>>>;
    /// Remove the record owned by `user_id`; `true` if one existed.
    fn delete_by_user(&self, user_id: String) -> BoxFuture<'static, StorageResult<bool>>;
    /// Remove the record with this game id; `true` if one existed.
    fn delete_by_game(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>>;
    /// Every active record, used to warm the in-memory tier at startup.
    fn list_games(&self) -> BoxFuture<'static, StorageResult<Vec<GameEntity>>>;
    /// Delete records created before `cutoff`, returning their game ids so
    /// callers can evict matching cache entries.
    fn purge_older_than(&self, cutoff: SystemTime) -> BoxFuture<'static, StorageResult<Vec<Uuid>>>;
    /// Cheap liveness probe of the backend.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    /// Attempt to re-establish a dropped connection.
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
