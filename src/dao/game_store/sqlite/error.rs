use thiserror::Error;
use uuid::Uuid;

pub type SqliteResult<T> = std::result::Result<T, SqliteDaoError>;

#[derive(Debug, Error)]
pub enum SqliteDaoError {
    #[error("failed to open SQLite database at `{location}`")]
    Open {
        location: String,
        #[source]
        source: rusqlite::Error,
    },
    #[error("failed to save game `{id}`")]
    SaveGame {
        id: Uuid,
        #[source]
        source: rusqlite::Error,
    },
    #[error("failed to load game for `{key}`")]
    LoadGame {
        key: String,
        #[source]
        source: rusqlite::Error,
    },
    #[error("failed to delete game for `{key}`")]
    DeleteGame {
        key: String,
        #[source]
        source: rusqlite::Error,
    },
    #[error("failed to list active games")]
    ListGames {
        #[source]
        source: rusqlite::Error,
    },
    #[error("failed to purge stale games")]
    Purge {
        #[source]
        source: rusqlite::Error,
    },
    #[error("SQLite health probe failed")]
    HealthPing {
        #[source]
        source: rusqlite::Error,
    },
    #[error("failed to reopen SQLite database")]
    Reconnect {
        #[source]
        source: rusqlite::Error,
    },
    #[error("failed to (de)serialize `{field}` for game `{game_id}`")]
    Codec {
        game_id: String,
        field: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("stored game id `{value}` is not a UUID")]
    BadId {
        value: String,
        #[source]
        source: uuid::Error,
    },
}
