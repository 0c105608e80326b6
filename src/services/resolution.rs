//! Multi-tier game resolution and write-back.
//!
//! Every request funnels through one ordered chain instead of each call
//! site improvising its own "check the cache, then the session, then the
//! database" branching: the in-memory tier wins, the session slot is
//! validated against it, and a durable hit is promoted forward so the next
//! lookup takes the fast path.

use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
    dao::storage::StorageError,
    error::ServiceError,
    state::{
        SharedState,
        game::GameRecord,
        tiers::CacheTier,
    },
};

/// Identity facets a request may carry. Any subset can be present; the
/// resolution order gives explicit ids precedence over session cookies,
/// and session cookies precedence over the durable per-user record.
#[derive(Debug, Clone, Default)]
pub struct RequestIdentity {
    /// Explicit game id carried by the client.
    pub game_id: Option<Uuid>,
    /// Opaque session token minted by the embedding layer.
    pub session_token: Option<String>,
    /// Authenticated user, when the embedding layer established one.
    pub user_id: Option<String>,
}

impl RequestIdentity {
    /// Identity carrying only an explicit game id.
    pub fn for_game(game_id: Uuid) -> Self {
        Self {
            game_id: Some(game_id),
            ..Self::default()
        }
    }
}

/// A resolved record plus where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedGame {
    /// The live record, as held by the in-memory tier.
    pub record: GameRecord,
    /// True when the record had to be promoted from the durable tier,
    /// i.e. the client lost its fast-path handles.
    pub restored: bool,
}

/// Outcome of a tier write-back.
#[derive(Debug)]
pub enum SyncOutcome {
    /// Every applicable tier accepted the record.
    Clean,
    /// The durable write failed after the cache writes succeeded. The
    /// in-memory record stays authoritative for the request; the error is
    /// carried for logging/retry, not surfaced as a gameplay failure.
    Degraded(StorageError),
}

impl SyncOutcome {
    /// Whether the durable tier is now behind the caches.
    pub fn is_degraded(&self) -> bool {
        matches!(self, SyncOutcome::Degraded(_))
    }
}

/// Locate the game record addressed by `identity`, first hit wins:
///
/// 1. explicit game id in the in-memory tier;
/// 2. session slot, provided the game still exists in the in-memory tier
///    (the slot is only a pointer — a removed game makes it a stale miss);
/// 3. durable record for the user, promoted into the faster tiers.
///
/// Durable-tier failures during step 3 degrade to a miss, matching the
/// "auto-create on miss" caller policy rather than failing the request.
pub async fn resolve_game(
    state: &SharedState,
    identity: &RequestIdentity,
) -> Result<ResolvedGame, ServiceError> {
    if let Some(game_id) = identity.game_id {
        if let Some(record) = state.memory().get(&game_id) {
            return Ok(ResolvedGame {
                record,
                restored: false,
            });
        }
    }

    if let Some(token) = &identity.session_token {
        if let Some(slot) = state.sessions().get(token) {
            // The memory tier is the authority for existence; re-read the
            // record from it so a stale session copy never wins.
            if let Some(record) = state.memory().get(&slot.game_id) {
                return Ok(ResolvedGame {
                    record,
                    restored: false,
                });
            }
            debug!(game_id = %slot.game_id, "session slot points at a removed game; treating as a miss");
        }
    }

    if let Some(user_id) = &identity.user_id {
        if let Some(store) = state.game_store().await {
            match store.find_by_user(user_id.clone()).await {
                Ok(Some(entity)) => match GameRecord::try_from(entity) {
                    Ok(record) => {
                        promote(state, identity, &record);
                        return Ok(ResolvedGame {
                            record,
                            restored: true,
                        });
                    }
                    Err(err) => {
                        warn!(user_id = %user_id, error = %err, "durable game row is corrupt; treating as a miss");
                    }
                },
                Ok(None) => {}
                Err(err) => {
                    warn!(user_id = %user_id, error = %err, "durable lookup failed; treating as a miss");
                }
            }
        }
    }

    Err(ServiceError::NotFound(
        "no active game for this identity".into(),
    ))
}

/// Write-through on read: install a durable hit into the faster tiers so
/// subsequent lookups resolve at step 1 or 2.
fn promote(state: &SharedState, identity: &RequestIdentity, record: &GameRecord) {
    state.memory().put(record.game_id, record.clone());
    if let Some(token) = &identity.session_token {
        state.sessions().put(token.clone(), record.clone());
    }
}

/// Persist a mutated record to every tier the identity makes applicable:
/// the in-memory tier unconditionally, the session slot when a token is
/// present, and the durable tier when the user is known.
///
/// The cache writes always happen; a durable failure is reported through
/// [`SyncOutcome::Degraded`] so callers log it instead of failing the
/// player's action.
pub async fn sync_tiers(
    state: &SharedState,
    identity: &RequestIdentity,
    record: &GameRecord,
) -> SyncOutcome {
    state.memory().put(record.game_id, record.clone());

    if let Some(token) = &identity.session_token {
        state.sessions().put(token.clone(), record.clone());
    }

    let owner = record.user_id.as_ref().or(identity.user_id.as_ref());
    if owner.is_some() {
        if let Some(store) = state.game_store().await {
            if let Err(err) = store.save_game(record.clone().into()).await {
                warn!(game_id = %record.game_id, error = %err, "durable write-back failed; caches stay authoritative");
                return SyncOutcome::Degraded(err);
            }
        }
    }

    SyncOutcome::Clean
}

/// Remove the record from the tiers that own it: durable by user when
/// known (falling back to game id), and the in-memory tier. Session slots
/// are left to go stale; resolution refuses to resurrect them.
pub async fn remove_from_tiers(
    state: &SharedState,
    identity: &RequestIdentity,
    record: &GameRecord,
) -> Result<(), ServiceError> {
    let owner = record.user_id.as_ref().or(identity.user_id.as_ref());
    match state.game_store().await {
        Some(store) => {
            let result = match owner {
                Some(user_id) => store.delete_by_user(user_id.clone()).await,
                None => store.delete_by_game(record.game_id).await,
            };
            if let Err(err) = result {
                warn!(game_id = %record.game_id, error = %err, "durable delete failed");
                return Err(err.into());
            }
        }
        // An owned game has a durable row we cannot reach right now;
        // removing only the caches would let it resurrect on next login.
        None if owner.is_some() => return Err(ServiceError::Degraded),
        None => {}
    }

    state.memory().remove(&record.game_id);
    if let Some(token) = &identity.session_token {
        state.sessions().remove(token);
    }
    Ok(())
}
