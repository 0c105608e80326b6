use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use futures::future::BoxFuture;
use rusqlite::{Connection, OptionalExtension, params};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::error::{SqliteDaoError, SqliteResult};
use crate::dao::{game_store::GameStore, models::GameEntity, storage::StorageResult};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS active_games (
    game_id TEXT PRIMARY KEY,
    user_id TEXT,
    original_text TEXT NOT NULL,
    encrypted_text TEXT NOT NULL,
    mapping TEXT NOT NULL,
    reverse_mapping TEXT NOT NULL,
    correctly_guessed TEXT NOT NULL,
    mistakes INTEGER NOT NULL,
    major_attribution TEXT NOT NULL,
    minor_attribution TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);
CREATE UNIQUE INDEX IF NOT EXISTS active_games_user_idx
    ON active_games(user_id) WHERE user_id IS NOT NULL;
";

const COLUMNS: &str = "game_id, user_id, original_text, encrypted_text, mapping, \
     reverse_mapping, correctly_guessed, mistakes, major_attribution, \
     minor_attribution, created_at, updated_at";

/// SQLite implementation of [`GameStore`].
///
/// One record per authenticated user is enforced twice over: the save path
/// deletes the user's previous row inside the insert transaction, and a
/// partial unique index on `user_id` backs the invariant against races.
#[derive(Clone)]
pub struct SqliteGameStore {
    conn: Arc<Mutex<Connection>>,
    path: Option<PathBuf>,
}

/// Raw column values of one row, before JSON fields are decoded.
struct RawGameRow {
    game_id: String,
    user_id: Option<String>,
    original_text: String,
    encrypted_text: String,
    mapping: String,
    reverse_mapping: String,
    correctly_guessed: String,
    mistakes: u32,
    major_attribution: String,
    minor_attribution: String,
    created_at: i64,
    updated_at: i64,
}

impl SqliteGameStore {
    /// Open or create the database file at `path`.
    ///
    /// Enables WAL mode and `synchronous=NORMAL`.
    pub fn open(path: impl AsRef<Path>) -> SqliteResult<Self> {
        let path = path.as_ref().to_path_buf();
        let conn = Connection::open(&path).map_err(|source| SqliteDaoError::Open {
            location: path.display().to_string(),
            source,
        })?;
        Ok(Self {
            conn: Arc::new(Mutex::new(Self::init_connection(conn)?)),
            path: Some(path),
        })
    }

    /// Open an in-memory database, used by tests and throwaway setups.
    pub fn open_in_memory() -> SqliteResult<Self> {
        let conn = Connection::open_in_memory().map_err(|source| SqliteDaoError::Open {
            location: "in-memory".into(),
            source,
        })?;
        Ok(Self {
            conn: Arc::new(Mutex::new(Self::init_connection(conn)?)),
            path: None,
        })
    }

    fn init_connection(conn: Connection) -> SqliteResult<Connection> {
        let wrap = |source| SqliteDaoError::Open {
            location: "init".into(),
            source,
        };
        conn.execute_batch(SCHEMA).map_err(wrap)?;
        conn.pragma_update(None, "journal_mode", "WAL").map_err(wrap)?;
        conn.pragma_update(None, "synchronous", "NORMAL").map_err(wrap)?;
        Ok(conn)
    }

    fn save_game_sync(conn: &mut Connection, game: &GameEntity) -> SqliteResult<()> {
        let id = game.game_id;
        let codec = |field, source| SqliteDaoError::Codec {
            game_id: id.to_string(),
            field,
            source,
        };
        let mapping_json =
            serde_json::to_string(&game.mapping).map_err(|e| codec("mapping", e))?;
        let reverse_json = serde_json::to_string(&game.reverse_mapping)
            .map_err(|e| codec("reverse_mapping", e))?;
        let guessed_json = serde_json::to_string(&game.correctly_guessed)
            .map_err(|e| codec("correctly_guessed", e))?;

        let tx = conn
            .transaction()
            .map_err(|source| SqliteDaoError::SaveGame { id, source })?;

        // Supersede: only one active row per user may survive the transaction.
        if let Some(user_id) = &game.user_id {
            tx.execute("DELETE FROM active_games WHERE user_id = ?1", params![user_id])
                .map_err(|source| SqliteDaoError::SaveGame { id, source })?;
        }

        tx.execute(
            "INSERT OR REPLACE INTO active_games (game_id, user_id, original_text, \
             encrypted_text, mapping, reverse_mapping, correctly_guessed, mistakes, \
             major_attribution, minor_attribution, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                id.to_string(),
                game.user_id,
                game.original_text,
                game.encrypted_text,
                mapping_json,
                reverse_json,
                guessed_json,
                game.mistakes,
                game.major_attribution,
                game.minor_attribution,
                system_time_to_nanos(game.created_at),
                system_time_to_nanos(game.updated_at),
            ],
        )
        .map_err(|source| SqliteDaoError::SaveGame { id, source })?;

        tx.commit()
            .map_err(|source| SqliteDaoError::SaveGame { id, source })
    }

    fn find_sync(
        conn: &Connection,
        where_clause: &str,
        key: &str,
    ) -> SqliteResult<Option<GameEntity>> {
        let sql = format!("SELECT {COLUMNS} FROM active_games WHERE {where_clause}");
        let row = conn
            .query_row(&sql, params![key], read_raw_row)
            .optional()
            .map_err(|source| SqliteDaoError::LoadGame {
                key: key.to_owned(),
                source,
            })?;

        row.map(raw_row_to_entity).transpose()
    }

    fn delete_sync(conn: &Connection, where_clause: &str, key: &str) -> SqliteResult<bool> {
        let sql = format!("DELETE FROM active_games WHERE {where_clause}");
        let deleted = conn
            .execute(&sql, params![key])
            .map_err(|source| SqliteDaoError::DeleteGame {
                key: key.to_owned(),
                source,
            })?;
        Ok(deleted > 0)
    }

    fn list_games_sync(conn: &Connection) -> SqliteResult<Vec<GameEntity>> {
        let sql = format!("SELECT {COLUMNS} FROM active_games");
        let mut stmt = conn
            .prepare(&sql)
            .map_err(|source| SqliteDaoError::ListGames { source })?;

        let raw_rows = stmt
            .query_map([], read_raw_row)
            .map_err(|source| SqliteDaoError::ListGames { source })?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|source| SqliteDaoError::ListGames { source })?;

        raw_rows.into_iter().map(raw_row_to_entity).collect()
    }

    fn purge_older_than_sync(conn: &mut Connection, cutoff: SystemTime) -> SqliteResult<Vec<Uuid>> {
        let cutoff_ns = system_time_to_nanos(cutoff);
        let tx = conn
            .transaction()
            .map_err(|source| SqliteDaoError::Purge { source })?;

        let ids = {
            let mut stmt = tx
                .prepare("SELECT game_id FROM active_games WHERE created_at < ?1")
                .map_err(|source| SqliteDaoError::Purge { source })?;
            stmt.query_map(params![cutoff_ns], |row| row.get::<_, String>(0))
                .map_err(|source| SqliteDaoError::Purge { source })?
                .collect::<Result<Vec<_>, _>>()
                .map_err(|source| SqliteDaoError::Purge { source })?
        };

        tx.execute(
            "DELETE FROM active_games WHERE created_at < ?1",
            params![cutoff_ns],
        )
        .map_err(|source| SqliteDaoError::Purge { source })?;
        tx.commit()
            .map_err(|source| SqliteDaoError::Purge { source })?;

        ids.into_iter()
            .map(|value| {
                Uuid::parse_str(&value).map_err(|source| SqliteDaoError::BadId { value, source })
            })
            .collect()
    }

    fn health_check_sync(conn: &Connection) -> SqliteResult<()> {
        conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
            .map(|_| ())
            .map_err(|source| SqliteDaoError::HealthPing { source })
    }

    fn reconnect_sync(&self, conn: &mut Connection) -> SqliteResult<()> {
        // An in-memory database has nothing to reopen.
        let Some(path) = &self.path else {
            return Ok(());
        };
        let fresh = Connection::open(path).map_err(|source| SqliteDaoError::Reconnect { source })?;
        *conn = Self::init_connection(fresh)?;
        Ok(())
    }
}

impl GameStore for SqliteGameStore {
    fn save_game(&self, game: GameEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let mut conn = store.conn.lock().await;
            Self::save_game_sync(&mut conn, &game).map_err(Into::into)
        })
    }

    fn find_by_user(
        &self,
        user_id: String,
    ) -> BoxFuture<'static, StorageResult<Option<GameEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let conn = store.conn.lock().await;
            Self::find_sync(&conn, "user_id = ?1", &user_id).map_err(Into::into)
        })
    }

    fn find_by_game(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<GameEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let conn = store.conn.lock().await;
            Self::find_sync(&conn, "game_id = ?1", &id.to_string()).map_err(Into::into)
        })
    }

    fn delete_by_user(&self, user_id: String) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            let conn = store.conn.lock().await;
            Self::delete_sync(&conn, "user_id = ?1", &user_id).map_err(Into::into)
        })
    }

    fn delete_by_game(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            let conn = store.conn.lock().await;
            Self::delete_sync(&conn, "game_id = ?1", &id.to_string()).map_err(Into::into)
        })
    }

    fn list_games(&self) -> BoxFuture<'static, StorageResult<Vec<GameEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let conn = store.conn.lock().await;
            Self::list_games_sync(&conn).map_err(Into::into)
        })
    }

    fn purge_older_than(&self, cutoff: SystemTime) -> BoxFuture<'static, StorageResult<Vec<Uuid>>> {
        let store = self.clone();
        Box::pin(async move {
            let mut conn = store.conn.lock().await;
            Self::purge_older_than_sync(&mut conn, cutoff).map_err(Into::into)
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let conn = store.conn.lock().await;
            Self::health_check_sync(&conn).map_err(Into::into)
        })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let mut conn = store.conn.lock().await;
            store.reconnect_sync(&mut conn).map_err(Into::into)
        })
    }
}

fn read_raw_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawGameRow> {
    Ok(RawGameRow {
        game_id: row.get(0)?,
        user_id: row.get(1)?,
        original_text: row.get(2)?,
        encrypted_text: row.get(3)?,
        mapping: row.get(4)?,
        reverse_mapping: row.get(5)?,
        correctly_guessed: row.get(6)?,
        mistakes: row.get(7)?,
        major_attribution: row.get(8)?,
        minor_attribution: row.get(9)?,
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
    })
}

fn raw_row_to_entity(raw: RawGameRow) -> SqliteResult<GameEntity> {
    let game_id = Uuid::parse_str(&raw.game_id).map_err(|source| SqliteDaoError::BadId {
        value: raw.game_id.clone(),
        source,
    })?;
    let codec = |field, source| SqliteDaoError::Codec {
        game_id: raw.game_id.clone(),
        field,
        source,
    };

    let mapping: BTreeMap<char, char> =
        serde_json::from_str(&raw.mapping).map_err(|e| codec("mapping", e))?;
    let reverse_mapping: BTreeMap<char, char> =
        serde_json::from_str(&raw.reverse_mapping).map_err(|e| codec("reverse_mapping", e))?;
    let correctly_guessed: Vec<char> =
        serde_json::from_str(&raw.correctly_guessed).map_err(|e| codec("correctly_guessed", e))?;

    Ok(GameEntity {
        game_id,
        user_id: raw.user_id,
        original_text: raw.original_text,
        encrypted_text: raw.encrypted_text,
        mapping,
        reverse_mapping,
        correctly_guessed,
        mistakes: raw.mistakes,
        major_attribution: raw.major_attribution,
        minor_attribution: raw.minor_attribution,
        created_at: nanos_to_system_time(raw.created_at),
        updated_at: nanos_to_system_time(raw.updated_at),
    })
}

// Timestamps are stored as whole nanoseconds since the epoch so an entity
// survives a save/load round trip bit-identical.
fn system_time_to_nanos(time: SystemTime) -> i64 {
    time.duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_nanos() as i64
}

fn nanos_to_system_time(nanos: i64) -> SystemTime {
    UNIX_EPOCH + Duration::from_nanos(nanos.max(0) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::game::GameRecord;
    use crate::config::Quote;

    fn entity_for(user_id: Option<&str>) -> GameEntity {
        let quote = Quote {
            text: "THE QUICK BROWN FOX".into(),
            major_attribution: "ANONYMOUS".into(),
            minor_attribution: "Typing drill".into(),
        };
        GameRecord::new(quote, user_id.map(str::to_owned)).into()
    }

    #[tokio::test]
    async fn save_then_find_round_trips_the_entity() {
        let store = SqliteGameStore::open_in_memory().unwrap();
        let entity = entity_for(Some("user-1"));

        store.save_game(entity.clone()).await.unwrap();

        let by_user = store.find_by_user("user-1".into()).await.unwrap().unwrap();
        assert_eq!(by_user, entity);

        let by_game = store.find_by_game(entity.game_id).await.unwrap().unwrap();
        assert_eq!(by_game, entity);
    }

    #[tokio::test]
    async fn second_game_for_same_user_supersedes_the_first() {
        let store = SqliteGameStore::open_in_memory().unwrap();
        let first = entity_for(Some("user-1"));
        let second = entity_for(Some("user-1"));

        store.save_game(first.clone()).await.unwrap();
        store.save_game(second.clone()).await.unwrap();

        let games = store.list_games().await.unwrap();
        assert_eq!(games.len(), 1);
        assert_eq!(games[0].game_id, second.game_id);
        assert!(store.find_by_game(first.game_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn anonymous_games_do_not_supersede_each_other() {
        let store = SqliteGameStore::open_in_memory().unwrap();
        store.save_game(entity_for(None)).await.unwrap();
        store.save_game(entity_for(None)).await.unwrap();

        assert_eq!(store.list_games().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn delete_by_user_and_by_game_report_whether_a_row_existed() {
        let store = SqliteGameStore::open_in_memory().unwrap();
        let entity = entity_for(Some("user-1"));
        store.save_game(entity.clone()).await.unwrap();

        assert!(store.delete_by_user("user-1".into()).await.unwrap());
        assert!(!store.delete_by_user("user-1".into()).await.unwrap());
        assert!(!store.delete_by_game(entity.game_id).await.unwrap());
    }

    #[tokio::test]
    async fn purge_removes_only_rows_older_than_the_cutoff() {
        let store = SqliteGameStore::open_in_memory().unwrap();
        let mut old = entity_for(Some("user-1"));
        old.created_at = UNIX_EPOCH;
        let fresh = entity_for(Some("user-2"));

        store.save_game(old.clone()).await.unwrap();
        store.save_game(fresh.clone()).await.unwrap();

        let cutoff = fresh.created_at - Duration::from_secs(3600);
        let purged = store.purge_older_than(cutoff).await.unwrap();
        assert_eq!(purged, vec![old.game_id]);

        let remaining = store.list_games().await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].game_id, fresh.game_id);
    }

    #[tokio::test]
    async fn health_check_succeeds_on_an_open_connection() {
        let store = SqliteGameStore::open_in_memory().unwrap();
        store.health_check().await.unwrap();
        store.try_reconnect().await.unwrap();
    }
}
