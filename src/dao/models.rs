use std::collections::BTreeMap;
use std::time::SystemTime;
use uuid::Uuid;

use serde::{Deserialize, Serialize};

/// Aggregate game entity persisted by the storage layer.
///
/// This is the shape every durable backend stores and every cache tier
/// exchanges; the runtime counterpart is [`crate::state::game::GameRecord`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameEntity {
    /// Primary key of the game.
    pub game_id: Uuid,
    /// Owning user, present only for authenticated sessions. The durable
    /// tier keeps at most one row per user.
    pub user_id: Option<String>,
    /// Plaintext phrase, uppercased at creation.
    pub original_text: String,
    /// `original_text` with every letter substituted through `mapping`.
    pub encrypted_text: String,
    /// Plaintext → cipher substitution table.
    pub mapping: BTreeMap<char, char>,
    /// Cipher → plaintext table. Derivable from `mapping`; persisted so a
    /// row is self-describing, but rebuilt from `mapping` on load.
    pub reverse_mapping: BTreeMap<char, char>,
    /// Cipher letters the player has resolved, by guess or hint.
    pub correctly_guessed: Vec<char>,
    /// Wrong guesses plus hints taken.
    pub mistakes: u32,
    /// Author of the phrase, revealed on win.
    pub major_attribution: String,
    /// Source work of the phrase, revealed on win.
    pub minor_attribution: String,
    /// Creation timestamp.
    pub created_at: SystemTime,
    /// Last mutation timestamp, used by the staleness sweep.
    pub updated_at: SystemTime,
}
