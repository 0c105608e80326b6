use std::sync::Arc;
use std::time::SystemTime;

use futures::{TryStreamExt, future::BoxFuture};
use mongodb::{
    Client, Collection, Database, IndexModel,
    bson::{DateTime, doc},
    options::IndexOptions,
};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    config::MongoConfig,
    connection::establish_connection,
    error::{MongoDaoError, MongoResult},
    models::{MongoGameDocument, document_key},
};
use crate::dao::{game_store::GameStore, models::GameEntity, storage::StorageResult};

const GAME_COLLECTION_NAME: &str = "active_games";

/// MongoDB implementation of [`GameStore`].
#[derive(Clone)]
pub struct MongoGameStore {
    inner: Arc<MongoInner>,
}

struct MongoInner {
    state: RwLock<MongoState>,
    config: MongoConfig,
}

struct MongoState {
    client: Client,
    database: Database,
}

impl MongoInner {
    async fn ping(&self) -> MongoResult<()> {
        let database = {
            let guard = self.state.read().await;
            guard.database.clone()
        };

        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| MongoDaoError::HealthPing { source })?;
        Ok(())
    }

    async fn reconnect(&self) -> MongoResult<()> {
        let (client, database) =
            establish_connection(&self.config.options, &self.config.database_name).await?;
        let mut guard = self.state.write().await;
        guard.client = client;
        guard.database = database;
        Ok(())
    }
}

impl MongoGameStore {
    /// Establish a connection to MongoDB and ensure indexes are present.
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        let (client, database) =
            establish_connection(&config.options, &config.database_name).await?;

        let inner = Arc::new(MongoInner {
            state: RwLock::new(MongoState { client, database }),
            config,
        });

        let store = Self { inner };
        store.ensure_indexes().await?;
        Ok(store)
    }

    async fn ensure_indexes(&self) -> MongoResult<()> {
        let collection = self.collection().await;

        // Secondary lookup path: resolution by explicit game id.
        let game_index = IndexModel::builder()
            .keys(doc! {"game_id": 1})
            .options(
                IndexOptions::builder()
                    .name(Some("game_id_idx".to_owned()))
                    .unique(Some(true))
                    .build(),
            )
            .build();
        collection
            .create_index(game_index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: GAME_COLLECTION_NAME,
                index: "game_id",
                source,
            })?;

        // Sweep path: purge queries filter on the creation timestamp.
        let created_index = IndexModel::builder()
            .keys(doc! {"created_at": 1})
            .options(
                IndexOptions::builder()
                    .name(Some("created_at_idx".to_owned()))
                    .build(),
            )
            .build();
        collection
            .create_index(created_index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: GAME_COLLECTION_NAME,
                index: "created_at",
                source,
            })?;

        Ok(())
    }

    async fn collection(&self) -> Collection<MongoGameDocument> {
        let guard = self.inner.state.read().await;
        guard
            .database
            .collection::<MongoGameDocument>(GAME_COLLECTION_NAME)
    }

    async fn save_game(&self, game: GameEntity) -> MongoResult<()> {
        let key = document_key(&game);
        let document: MongoGameDocument = game.into();
        let collection = self.collection().await;

        // One upsert keyed by the document key supersedes the user's
        // previous game atomically.
        collection
            .replace_one(doc! {"_id": key.as_str()}, &document)
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::SaveGame { key, source })?;

        Ok(())
    }

    async fn find_one(&self, filter: mongodb::bson::Document, key: String) -> MongoResult<Option<GameEntity>> {
        let collection = self.collection().await;
        let document = collection
            .find_one(filter)
            .await
            .map_err(|source| MongoDaoError::LoadGame {
                key: key.clone(),
                source,
            })?;

        document
            .map(|doc| {
                let game_id = doc.game_id.clone();
                doc.try_into()
                    .map_err(|source| MongoDaoError::BadId {
                        value: game_id,
                        source,
                    })
            })
            .transpose()
    }

    async fn delete_one(&self, filter: mongodb::bson::Document, key: String) -> MongoResult<bool> {
        let collection = self.collection().await;
        let result = collection
            .delete_one(filter)
            .await
            .map_err(|source| MongoDaoError::DeleteGame { key, source })?;
        Ok(result.deleted_count > 0)
    }

    async fn list_games(&self) -> MongoResult<Vec<GameEntity>> {
        let collection = self.collection().await;
        let documents: Vec<MongoGameDocument> = collection
            .find(doc! {})
            .await
            .map_err(|source| MongoDaoError::ListGames { source })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::ListGames { source })?;

        documents
            .into_iter()
            .map(|doc| {
                let game_id = doc.game_id.clone();
                doc.try_into()
                    .map_err(|source| MongoDaoError::BadId {
                        value: game_id,
                        source,
                    })
            })
            .collect()
    }

    async fn purge_older_than(&self, cutoff: SystemTime) -> MongoResult<Vec<Uuid>> {
        let collection = self.collection().await;
        let filter = doc! {"created_at": {"$lt": DateTime::from_system_time(cutoff)}};

        let stale: Vec<MongoGameDocument> = collection
            .find(filter.clone())
            .await
            .map_err(|source| MongoDaoError::Purge { source })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::Purge { source })?;

        collection
            .delete_many(filter)
            .await
            .map_err(|source| MongoDaoError::Purge { source })?;

        stale
            .into_iter()
            .map(|doc| {
                Uuid::parse_str(&doc.game_id).map_err(|source| MongoDaoError::BadId {
                    value: doc.game_id,
                    source,
                })
            })
            .collect()
    }
}

impl GameStore for MongoGameStore {
    fn save_game(&self, game: GameEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.save_game(game).await.map_err(Into::into) })
    }

    fn find_by_user(
        &self,
        user_id: String,
    ) -> BoxFuture<'static, StorageResult<Option<GameEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .find_one(doc! {"user_id": user_id.as_str()}, user_id.clone())
                .await
                .map_err(Into::into)
        })
    }

    fn find_by_game(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<GameEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .find_one(doc! {"game_id": id.to_string()}, id.to_string())
                .await
                .map_err(Into::into)
        })
    }

    fn delete_by_user(&self, user_id: String) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .delete_one(doc! {"user_id": user_id.as_str()}, user_id.clone())
                .await
                .map_err(Into::into)
        })
    }

    fn delete_by_game(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .delete_one(doc! {"game_id": id.to_string()}, id.to_string())
                .await
                .map_err(Into::into)
        })
    }

    fn list_games(&self) -> BoxFuture<'static, StorageResult<Vec<GameEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_games().await.map_err(Into::into) })
    }

    fn purge_older_than(&self, cutoff: SystemTime) -> BoxFuture<'static, StorageResult<Vec<Uuid>>> {
        let store = self.clone();
        Box::pin(async move { store.purge_older_than(cutoff).await.map_err(Into::into) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.reconnect().await.map_err(Into::into) })
    }
}
