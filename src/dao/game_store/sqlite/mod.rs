mod error;
pub mod store;

pub use error::SqliteDaoError;
pub use store::SqliteGameStore;

use crate::dao::storage::StorageError;

impl From<SqliteDaoError> for StorageError {
    fn from(err: SqliteDaoError) -> Self {
        match &err {
            SqliteDaoError::Codec { .. } | SqliteDaoError::BadId { .. } => {
                StorageError::corrupt(err.to_string(), err)
            }
            _ => StorageError::unavailable(err.to_string(), err),
        }
    }
}
