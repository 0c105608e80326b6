//! Core game operations, each following the same shape: resolve the record
//! through the tier chain, run the transition, write the result back to
//! every applicable tier, and project a client view.

use tracing::{info, warn};

use crate::{
    dto::game::{GuessRequest, GameView},
    error::ServiceError,
    state::{
        SharedState,
        game::GameRecord,
        state_machine::{self, HintOutcome},
        tiers::CacheTier,
    },
};

use super::resolution::{self, RequestIdentity};

/// Start a new game for the given identity.
///
/// A phrase is drawn from the corpus (optionally length-constrained), a
/// fresh record is built, and the record is installed into every tier the
/// identity makes applicable. For an authenticated user the durable save
/// supersedes any previous game, so at most one row per user survives.
pub async fn create_game(
    state: &SharedState,
    identity: &RequestIdentity,
    max_length: Option<usize>,
) -> Result<GameView, ServiceError> {
    let quote = state.corpus().random_quote(max_length);
    let record = GameRecord::new(quote, identity.user_id.clone());

    // A superseded durable game may still sit in the memory tier under its
    // old id; evict it so stale handles cannot resolve to it.
    if let (Some(user_id), Some(store)) = (&identity.user_id, state.game_store().await) {
        match store.find_by_user(user_id.clone()).await {
            Ok(Some(previous)) if previous.game_id != record.game_id => {
                state.memory().remove(&previous.game_id);
            }
            Ok(_) => {}
            Err(err) => {
                warn!(user_id = %user_id, error = %err, "could not look up superseded game");
            }
        }
    }

    // A degraded outcome is already logged inside the write-back; the
    // caches hold the game and the durable row catches up on the next sync.
    resolution::sync_tiers(state, identity, &record).await;

    info!(game_id = %record.game_id, authenticated = identity.user_id.is_some(), "created game");
    Ok(GameView::from_record(&record, false))
}

/// Apply one guess to the identity's game.
///
/// The mutation runs against the in-memory entry under its map lock, so
/// concurrent actions on the same game serialize rather than losing
/// updates; the mutated record is then synced to the other tiers.
pub async fn apply_guess(
    state: &SharedState,
    identity: &RequestIdentity,
    request: &GuessRequest,
) -> Result<GameView, ServiceError> {
    let (cipher_letter, guessed_letter) = request.normalized()?;
    let resolved = resolution::resolve_game(state, identity).await?;

    let record = mutate_resolved(state, resolved.record.game_id, |record| {
        state_machine::apply_guess(record, cipher_letter, guessed_letter);
    })?;

    finish_mutation(state, identity, record, resolved.restored).await
}

/// Reveal one unresolved letter at the cost of a mistake.
///
/// When every occurring letter is already revealed the record is returned
/// unchanged; the caller can tell from the view that nothing moved.
pub async fn apply_hint(
    state: &SharedState,
    identity: &RequestIdentity,
) -> Result<GameView, ServiceError> {
    let resolved = resolution::resolve_game(state, identity).await?;

    let mut outcome = HintOutcome::Exhausted;
    let record = mutate_resolved(state, resolved.record.game_id, |record| {
        outcome = state_machine::apply_hint(record);
    })?;

    if outcome == HintOutcome::Exhausted {
        // Nothing changed; skip the tier write-back.
        return Ok(GameView::from_record(&record, resolved.restored));
    }

    finish_mutation(state, identity, record, resolved.restored).await
}

/// Tear the identity's game out of the tiers it owns, after a win or an
/// abandon. The session slot goes stale rather than being chased down;
/// resolution refuses to resurrect it.
pub async fn complete_game(
    state: &SharedState,
    identity: &RequestIdentity,
) -> Result<(), ServiceError> {
    let resolved = match resolution::resolve_game(state, identity).await {
        Ok(resolved) => resolved,
        // Completing a game that is already gone is a no-op, not a fault.
        Err(ServiceError::NotFound(_)) => return Ok(()),
        Err(err) => return Err(err),
    };

    resolution::remove_from_tiers(state, identity, &resolved.record).await?;
    info!(game_id = %resolved.record.game_id, "removed completed game");
    Ok(())
}

/// Abandon is completion without the victory lap: same tier removal.
pub async fn abandon_game(
    state: &SharedState,
    identity: &RequestIdentity,
) -> Result<(), ServiceError> {
    complete_game(state, identity).await
}

/// Run `mutate` on the in-memory entry and return the updated copy.
///
/// Resolution always leaves the record in the memory tier, so a miss here
/// means a concurrent completion removed it; surfacing `NotFound` beats
/// resurrecting a deleted game.
fn mutate_resolved(
    state: &SharedState,
    game_id: uuid::Uuid,
    mutate: impl FnOnce(&mut GameRecord),
) -> Result<GameRecord, ServiceError> {
    state
        .memory()
        .with_record_mut(&game_id, |record| {
            mutate(record);
            record.clone()
        })
        .ok_or_else(|| ServiceError::NotFound("game removed mid-action".into()))
}

/// Shared tail of every mutating operation: write back, log degradation,
/// and project the view.
async fn finish_mutation(
    state: &SharedState,
    identity: &RequestIdentity,
    record: GameRecord,
    restored: bool,
) -> Result<GameView, ServiceError> {
    resolution::sync_tiers(state, identity, &record).await;
    Ok(GameView::from_record(&record, restored))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::QuoteCorpus, state::AppState};

    fn guess(encrypted: char, guessed: char) -> GuessRequest {
        GuessRequest {
            encrypted_letter: encrypted.to_string(),
            guessed_letter: guessed.to_string(),
        }
    }

    fn session_identity(token: &str) -> RequestIdentity {
        RequestIdentity {
            game_id: None,
            session_token: Some(token.into()),
            user_id: None,
        }
    }

    #[tokio::test]
    async fn created_game_is_resolvable_by_id_and_session() {
        let state = AppState::new(QuoteCorpus::default());
        let identity = session_identity("token-a");

        let view = create_game(&state, &identity, None).await.unwrap();
        assert_eq!(view.mistakes, 0);
        assert!(!view.is_won);
        assert!(view.display.chars().all(|c| !c.is_ascii_alphabetic() || c == crate::cipher::MASK_GLYPH));

        let by_id = resolution::resolve_game(&state, &RequestIdentity::for_game(view.game_id))
            .await
            .unwrap();
        let by_session = resolution::resolve_game(&state, &identity).await.unwrap();
        assert_eq!(by_id.record, by_session.record);
    }

    #[tokio::test]
    async fn correct_guess_reveals_without_charging_a_mistake() {
        let state = AppState::new(QuoteCorpus::default());
        let identity = session_identity("token-a");
        let view = create_game(&state, &identity, None).await.unwrap();

        let record = state.memory().get(&view.game_id).unwrap();
        let cipher_letter = *record.cipher_letters().iter().next().unwrap();
        let plain = record.mapping.plain_for(cipher_letter).unwrap();

        let after = apply_guess(&state, &identity, &guess(cipher_letter, plain))
            .await
            .unwrap();
        assert_eq!(after.mistakes, 0);
        assert!(after.correctly_guessed.contains(&cipher_letter));
        assert!(after.display.contains(plain));
    }

    #[tokio::test]
    async fn wrong_guess_charges_exactly_one_mistake() {
        let state = AppState::new(QuoteCorpus::default());
        let identity = session_identity("token-a");
        let view = create_game(&state, &identity, None).await.unwrap();

        let record = state.memory().get(&view.game_id).unwrap();
        let cipher_letter = *record.cipher_letters().iter().next().unwrap();
        let plain = record.mapping.plain_for(cipher_letter).unwrap();
        let wrong = crate::cipher::ALPHABET
            .iter()
            .copied()
            .find(|&c| c != plain)
            .unwrap();

        let after = apply_guess(&state, &identity, &guess(cipher_letter, wrong))
            .await
            .unwrap();
        assert_eq!(after.mistakes, 1);
        assert!(after.correctly_guessed.is_empty());
    }

    #[tokio::test]
    async fn malformed_guess_is_rejected_before_touching_the_game() {
        let state = AppState::new(QuoteCorpus::default());
        let identity = session_identity("token-a");
        let view = create_game(&state, &identity, None).await.unwrap();

        let request = GuessRequest {
            encrypted_letter: "12".into(),
            guessed_letter: "A".into(),
        };
        let err = apply_guess(&state, &identity, &request).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));
        assert_eq!(state.memory().get(&view.game_id).unwrap().mistakes, 0);
    }

    #[tokio::test]
    async fn hints_drive_the_game_to_a_win_and_then_exhaust() {
        let state = AppState::new(QuoteCorpus::default());
        let identity = session_identity("token-a");
        let view = create_game(&state, &identity, Some(50)).await.unwrap();

        let distinct = state
            .memory()
            .get(&view.game_id)
            .unwrap()
            .cipher_letters()
            .len() as u32;

        let mut last = view;
        for _ in 0..distinct {
            last = apply_hint(&state, &identity).await.unwrap();
        }
        assert!(last.is_won);
        assert_eq!(last.mistakes, distinct);
        assert!(last.major_attribution.is_some());

        // Every letter is revealed: further hints change nothing.
        let exhausted = apply_hint(&state, &identity).await.unwrap();
        assert_eq!(exhausted.mistakes, distinct);
        assert_eq!(exhausted.display, last.display);
    }

    #[tokio::test]
    async fn guessing_without_any_game_reports_not_found() {
        let state = AppState::new(QuoteCorpus::default());
        let err = apply_guess(&state, &session_identity("token-a"), &guess('A', 'A'))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn completed_game_no_longer_resolves() {
        let state = AppState::new(QuoteCorpus::default());
        let identity = session_identity("token-a");
        let view = create_game(&state, &identity, None).await.unwrap();

        complete_game(&state, &identity).await.unwrap();
        assert!(!state.memory().contains(&view.game_id));
        let err = resolution::resolve_game(&state, &identity).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));

        // Completing again is a no-op.
        complete_game(&state, &identity).await.unwrap();
    }

    #[cfg(feature = "sqlite-store")]
    #[tokio::test]
    async fn second_game_for_a_user_supersedes_durably_and_in_memory() {
        use std::sync::Arc;

        use crate::dao::game_store::{GameStore, sqlite::SqliteGameStore};

        let state = AppState::new(QuoteCorpus::default());
        let store = SqliteGameStore::open_in_memory().unwrap();
        state.install_game_store(Arc::new(store.clone())).await;

        let identity = RequestIdentity {
            game_id: None,
            session_token: Some("token-a".into()),
            user_id: Some("user-1".into()),
        };

        let first = create_game(&state, &identity, None).await.unwrap();
        let second = create_game(&state, &identity, None).await.unwrap();
        assert_ne!(first.game_id, second.game_id);

        let rows = store.list_games().await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].game_id, second.game_id);

        // The superseded game must not linger in the fast path.
        assert!(!state.memory().contains(&first.game_id));
        assert!(state.memory().contains(&second.game_id));
    }

    #[cfg(feature = "sqlite-store")]
    #[tokio::test]
    async fn restored_game_is_flagged_and_replays_from_the_fast_path() {
        use std::sync::Arc;

        use crate::dao::game_store::sqlite::SqliteGameStore;

        let state = AppState::new(QuoteCorpus::default());
        let store = SqliteGameStore::open_in_memory().unwrap();
        state.install_game_store(Arc::new(store.clone())).await;

        let identity = RequestIdentity {
            game_id: None,
            session_token: Some("token-a".into()),
            user_id: Some("user-1".into()),
        };
        let view = create_game(&state, &identity, None).await.unwrap();

        // Simulate a restart: caches gone, durable row intact.
        let state = AppState::new(QuoteCorpus::default());
        state.install_game_store(Arc::new(store)).await;

        assert!(state.memory().get(&view.game_id).is_none());

        let resolved = resolution::resolve_game(&state, &identity).await.unwrap();
        assert!(resolved.restored);
        assert_eq!(resolved.record.game_id, view.game_id);

        let cipher_letter = *resolved.record.cipher_letters().iter().next().unwrap();
        let plain = resolved.record.mapping.plain_for(cipher_letter).unwrap();
        let after = apply_guess(&state, &identity, &guess(cipher_letter, plain))
            .await
            .unwrap();
        assert!(after.correctly_guessed.contains(&cipher_letter));
    }
}
