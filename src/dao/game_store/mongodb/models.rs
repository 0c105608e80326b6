use std::collections::BTreeMap;

use mongodb::bson::DateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dao::models::GameEntity;

/// Persisted document shape of one active game.
///
/// The document key is the owning `user_id` when the game is authenticated,
/// falling back to the game id for anonymous games. That makes MongoDB's own
/// primary key enforce "at most one active game per user": superseding a
/// user's game is a single `replace_one` upsert on `_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoGameDocument {
    #[serde(rename = "_id")]
    pub key: String,
    pub game_id: String,
    pub user_id: Option<String>,
    pub original_text: String,
    pub encrypted_text: String,
    pub mapping: BTreeMap<char, char>,
    pub reverse_mapping: BTreeMap<char, char>,
    pub correctly_guessed: Vec<char>,
    pub mistakes: u32,
    pub major_attribution: String,
    pub minor_attribution: String,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

/// Document key for an entity: the user id when owned, the game id otherwise.
pub fn document_key(entity: &GameEntity) -> String {
    entity
        .user_id
        .clone()
        .unwrap_or_else(|| entity.game_id.to_string())
}

impl From<GameEntity> for MongoGameDocument {
    fn from(value: GameEntity) -> Self {
        Self {
            key: document_key(&value),
            game_id: value.game_id.to_string(),
            user_id: value.user_id,
            original_text: value.original_text,
            encrypted_text: value.encrypted_text,
            mapping: value.mapping,
            reverse_mapping: value.reverse_mapping,
            correctly_guessed: value.correctly_guessed,
            mistakes: value.mistakes,
            major_attribution: value.major_attribution,
            minor_attribution: value.minor_attribution,
            created_at: DateTime::from_system_time(value.created_at),
            updated_at: DateTime::from_system_time(value.updated_at),
        }
    }
}

impl TryFrom<MongoGameDocument> for GameEntity {
    type Error = uuid::Error;

    fn try_from(value: MongoGameDocument) -> Result<Self, Self::Error> {
        Ok(Self {
            game_id: Uuid::parse_str(&value.game_id)?,
            user_id: value.user_id,
            original_text: value.original_text,
            encrypted_text: value.encrypted_text,
            mapping: value.mapping,
            reverse_mapping: value.reverse_mapping,
            correctly_guessed: value.correctly_guessed,
            mistakes: value.mistakes,
            major_attribution: value.major_attribution,
            minor_attribution: value.minor_attribution,
            created_at: value.created_at.to_system_time(),
            updated_at: value.updated_at.to_system_time(),
        })
    }
}
