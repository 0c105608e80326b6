use std::collections::BTreeSet;
use std::time::SystemTime;

use uuid::Uuid;

use crate::cipher::{self, LetterMapping, MappingError};
use crate::config::Quote;
use crate::dao::models::GameEntity;

/// Phrase attribution, held back from the player until the game is won.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribution {
    /// Author of the phrase.
    pub major: String,
    /// Source work of the phrase.
    pub minor: String,
}

/// Runtime representation of one in-progress cryptogram game.
///
/// Created only through [`GameRecord::new`]; the phrase, mapping, and
/// ciphertext never change afterwards, while `correctly_guessed` and
/// `mistakes` advance through [`crate::state::state_machine`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameRecord {
    /// Primary key of the game.
    pub game_id: Uuid,
    /// Owning user for authenticated sessions.
    pub user_id: Option<String>,
    /// Uppercased plaintext phrase.
    pub original_text: String,
    /// Substitution table used to encrypt the phrase.
    pub mapping: LetterMapping,
    /// The phrase with every letter pushed through `mapping`.
    pub encrypted_text: String,
    /// Cipher letters the player has resolved so far.
    pub correctly_guessed: BTreeSet<char>,
    /// Wrong guesses plus hints taken.
    pub mistakes: u32,
    /// Who said it and where, revealed on win.
    pub attribution: Attribution,
    /// Creation timestamp.
    pub created_at: SystemTime,
    /// Refreshed on every mutation; drives the staleness sweep.
    pub last_updated: SystemTime,
}

impl GameRecord {
    /// Build a fresh game from a quote: draw a random mapping, encrypt the
    /// uppercased text, and stamp both timestamps.
    pub fn new(quote: Quote, user_id: Option<String>) -> Self {
        let mapping = LetterMapping::random();
        let original_text = quote.text.to_ascii_uppercase();
        let encrypted_text = cipher::encrypt(&original_text, &mapping);
        let timestamp = SystemTime::now();

        Self {
            game_id: Uuid::new_v4(),
            user_id,
            original_text,
            mapping,
            encrypted_text,
            correctly_guessed: BTreeSet::new(),
            mistakes: 0,
            attribution: Attribution {
                major: quote.major_attribution,
                minor: quote.minor_attribution,
            },
            created_at: timestamp,
            last_updated: timestamp,
        }
    }

    /// Refresh the mutation timestamp.
    pub fn touch(&mut self) {
        self.last_updated = SystemTime::now();
    }

    /// Distinct cipher letters occurring in the ciphertext.
    pub fn cipher_letters(&self) -> BTreeSet<char> {
        cipher::cipher_letters(&self.encrypted_text)
    }

    /// Player-facing display string with unguessed letters masked.
    pub fn display(&self) -> String {
        cipher::render_display(&self.encrypted_text, &self.correctly_guessed, &self.mapping)
    }
}

impl From<GameRecord> for GameEntity {
    fn from(value: GameRecord) -> Self {
        Self {
            game_id: value.game_id,
            user_id: value.user_id,
            original_text: value.original_text,
            encrypted_text: value.encrypted_text,
            mapping: value.mapping.forward().clone(),
            reverse_mapping: value.mapping.reverse().clone(),
            correctly_guessed: value.correctly_guessed.into_iter().collect(),
            mistakes: value.mistakes,
            major_attribution: value.attribution.major,
            minor_attribution: value.attribution.minor,
            created_at: value.created_at,
            updated_at: value.last_updated,
        }
    }
}

impl TryFrom<GameEntity> for GameRecord {
    type Error = MappingError;

    /// Rehydrate a persisted row. The inverse table is recomputed from the
    /// forward one, and `correctly_guessed` is clipped to letters that
    /// actually occur in the ciphertext, so a record loaded from storage
    /// satisfies the same invariants as a freshly created one.
    fn try_from(value: GameEntity) -> Result<Self, Self::Error> {
        let mapping = LetterMapping::from_forward(value.mapping)?;
        let occurring = cipher::cipher_letters(&value.encrypted_text);
        let correctly_guessed = value
            .correctly_guessed
            .into_iter()
            .filter(|c| occurring.contains(c))
            .collect();

        Ok(Self {
            game_id: value.game_id,
            user_id: value.user_id,
            original_text: value.original_text,
            mapping,
            encrypted_text: value.encrypted_text,
            correctly_guessed,
            mistakes: value.mistakes,
            attribution: Attribution {
                major: value.major_attribution,
                minor: value.minor_attribution,
            },
            created_at: value.created_at,
            last_updated: value.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quote() -> Quote {
        Quote {
            text: "A journey of a thousand miles begins with a single step".into(),
            major_attribution: "LAO TZU".into(),
            minor_attribution: "Tao Te Ching".into(),
        }
    }

    #[test]
    fn new_game_uppercases_and_encrypts_the_phrase() {
        let record = GameRecord::new(quote(), None);
        assert_eq!(
            record.original_text,
            "A JOURNEY OF A THOUSAND MILES BEGINS WITH A SINGLE STEP"
        );
        assert_eq!(record.encrypted_text.len(), record.original_text.len());
        assert_eq!(record.mistakes, 0);
        assert!(record.correctly_guessed.is_empty());
        assert_eq!(
            crate::cipher::decrypt(&record.encrypted_text, &record.mapping),
            record.original_text
        );
    }

    #[test]
    fn entity_round_trip_preserves_the_record() {
        let mut record = GameRecord::new(quote(), Some("user-1".into()));
        record.correctly_guessed = record.cipher_letters().into_iter().take(3).collect();
        record.mistakes = 2;

        let entity: GameEntity = record.clone().into();
        let restored = GameRecord::try_from(entity).unwrap();
        assert_eq!(restored, record);
    }

    #[test]
    fn rehydration_drops_guessed_letters_absent_from_the_ciphertext() {
        let record = GameRecord::new(quote(), None);
        let absent = ('A'..='Z').find(|c| !record.encrypted_text.contains(*c)).unwrap();

        let mut entity: GameEntity = record.into();
        entity.correctly_guessed.push(absent);

        let restored = GameRecord::try_from(entity).unwrap();
        assert!(!restored.correctly_guessed.contains(&absent));
    }

    #[test]
    fn rehydration_rejects_a_corrupt_mapping() {
        let record = GameRecord::new(quote(), None);
        let mut entity: GameEntity = record.into();
        entity.mapping.remove(&'A');

        assert!(GameRecord::try_from(entity).is_err());
    }
}
