use mongodb::error::Error as MongoError;
use thiserror::Error;

pub type MongoResult<T> = std::result::Result<T, MongoDaoError>;

#[derive(Debug, Error)]
pub enum MongoDaoError {
    #[error("failed to parse MongoDB connection URI `{uri}`")]
    InvalidUri {
        uri: String,
        #[source]
        source: MongoError,
    },
    #[error("environment variable `{var}` is not set")]
    MissingEnvVar { var: &'static str },
    #[error("failed to build MongoDB client from options")]
    ClientConstruction {
        #[source]
        source: MongoError,
    },
    #[error("MongoDB ping failed during initial connection after {attempts} attempt(s)")]
    InitialPing {
        attempts: u32,
        #[source]
        source: MongoError,
    },
    #[error("MongoDB ping health check failed")]
    HealthPing {
        #[source]
        source: MongoError,
    },
    #[error("failed to ensure index `{index}` on collection `{collection}`")]
    EnsureIndex {
        collection: &'static str,
        index: &'static str,
        #[source]
        source: MongoError,
    },
    #[error("failed to save game for `{key}`")]
    SaveGame {
        key: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to load game for `{key}`")]
    LoadGame {
        key: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to delete game for `{key}`")]
    DeleteGame {
        key: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to list active games")]
    ListGames {
        #[source]
        source: MongoError,
    },
    #[error("failed to purge stale games")]
    Purge {
        #[source]
        source: MongoError,
    },
    #[error("stored game id `{value}` is not a UUID")]
    BadId {
        value: String,
        #[source]
        source: uuid::Error,
    },
}
