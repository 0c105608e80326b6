use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

use crate::{
    cipher,
    dto::{format_system_time, validation::validate_guess_letter},
    state::{game::GameRecord, state_machine},
};

/// Payload carrying one guess: which cipher letter the player is resolving
/// and which plaintext letter they claim it stands for.
#[derive(Debug, Clone, Deserialize)]
pub struct GuessRequest {
    /// The cipher letter being resolved.
    pub encrypted_letter: String,
    /// The claimed plaintext letter.
    pub guessed_letter: String,
}

impl Validate for GuessRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if let Err(e) = validate_guess_letter(&self.encrypted_letter) {
            errors.add("encrypted_letter", e);
        }
        if let Err(e) = validate_guess_letter(&self.guessed_letter) {
            errors.add("guessed_letter", e);
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

impl GuessRequest {
    /// Validate and fold both fields to their uppercase letters.
    pub fn normalized(&self) -> Result<(char, char), ValidationErrors> {
        self.validate()?;
        let fold = |value: &str| {
            value
                .chars()
                .next()
                .map(|c| c.to_ascii_uppercase())
                .unwrap_or(cipher::MASK_GLYPH)
        };
        Ok((fold(&self.encrypted_letter), fold(&self.guessed_letter)))
    }
}

/// Client-facing projection of a game after creation or a mutation.
///
/// Attribution fields are populated only once the win predicate holds.
#[derive(Debug, Clone, Serialize)]
pub struct GameView {
    /// Identifier the client should carry for the fast resolution path.
    pub game_id: Uuid,
    /// Masked/revealed display string.
    pub display: String,
    /// Wrong guesses plus hints taken so far.
    pub mistakes: u32,
    /// Cipher letters resolved so far.
    pub correctly_guessed: Vec<char>,
    /// Occurrences of each cipher letter in the ciphertext.
    pub letter_frequency: IndexMap<char, u32>,
    /// Whether every occurring cipher letter has been revealed.
    pub is_won: bool,
    /// Set when the game was restored from the durable tier rather than
    /// found in a live cache, so the client can show a notice.
    pub is_restored: bool,
    /// Creation timestamp, RFC 3339.
    pub created_at: String,
    /// Author of the phrase; present only when won.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub major_attribution: Option<String>,
    /// Source work of the phrase; present only when won.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minor_attribution: Option<String>,
}

impl GameView {
    /// Project a record into its client view.
    pub fn from_record(record: &GameRecord, is_restored: bool) -> Self {
        let is_won = state_machine::is_won(record);
        let (major, minor) = if is_won {
            (
                Some(record.attribution.major.clone()),
                Some(record.attribution.minor.clone()),
            )
        } else {
            (None, None)
        };

        Self {
            game_id: record.game_id,
            display: record.display(),
            mistakes: record.mistakes,
            correctly_guessed: record.correctly_guessed.iter().copied().collect(),
            letter_frequency: cipher::letter_frequency(&record.encrypted_text),
            is_won,
            is_restored,
            created_at: format_system_time(record.created_at),
            major_attribution: major,
            minor_attribution: minor,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Quote;

    fn record() -> GameRecord {
        GameRecord::new(
            Quote {
                text: "TEST".into(),
                major_attribution: "ANONYMOUS".into(),
                minor_attribution: "Unit fixture".into(),
            },
            None,
        )
    }

    #[test]
    fn guess_request_normalizes_to_uppercase_letters() {
        let request = GuessRequest {
            encrypted_letter: "x".into(),
            guessed_letter: "T".into(),
        };
        assert_eq!(request.normalized().unwrap(), ('X', 'T'));
    }

    #[test]
    fn guess_request_rejects_malformed_fields() {
        let request = GuessRequest {
            encrypted_letter: "XY".into(),
            guessed_letter: "1".into(),
        };
        let errors = request.normalized().unwrap_err();
        assert!(errors.field_errors().contains_key("encrypted_letter"));
        assert!(errors.field_errors().contains_key("guessed_letter"));
    }

    #[test]
    fn view_hides_attribution_until_the_game_is_won() {
        let mut game = record();
        let view = GameView::from_record(&game, false);
        assert!(!view.is_won);
        assert!(view.major_attribution.is_none());
        assert_eq!(view.letter_frequency.len(), 26);

        game.correctly_guessed = game.cipher_letters();
        let won = GameView::from_record(&game, false);
        assert!(won.is_won);
        assert_eq!(won.major_attribution.as_deref(), Some("ANONYMOUS"));
        assert_eq!(won.minor_attribution.as_deref(), Some("Unit fixture"));
        assert_eq!(won.display, "TEST");
    }
}
