use std::time::{Duration, SystemTime};

use tokio::time::sleep;
use tracing::{info, warn};

use crate::state::{SharedState, tiers::CacheTier};

/// Age past which an untouched game is considered abandoned.
pub const MAX_GAME_AGE: Duration = Duration::from_secs(48 * 60 * 60);
/// How often the sweep runs.
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Periodically delete stale durable records and evict their cache
/// entries. Meant to be spawned once at startup and left running.
pub async fn run(state: SharedState) {
    loop {
        sleep(SWEEP_INTERVAL).await;
        sweep_once(&state).await;
    }
}

/// One sweep pass: purge durable rows older than [`MAX_GAME_AGE`] and drop
/// the matching in-memory entries. Each eviction takes its own short map
/// lock; no per-game lock is held across the durable delete.
///
/// Returns how many games were purged. A missing or failing backend makes
/// the pass a logged no-op; the next interval tries again.
pub async fn sweep_once(state: &SharedState) -> usize {
    let Some(store) = state.game_store().await else {
        return 0;
    };

    let cutoff = SystemTime::now() - MAX_GAME_AGE;
    let purged = match store.purge_older_than(cutoff).await {
        Ok(ids) => ids,
        Err(err) => {
            warn!(error = %err, "stale game sweep failed");
            return 0;
        }
    };

    for game_id in &purged {
        state.memory().remove(game_id);
    }

    if !purged.is_empty() {
        info!(count = purged.len(), "cleaned up stale game states");
    }
    purged.len()
}
