use std::{future::Future, sync::Arc, time::Duration};

use tokio::time::sleep;
use tracing::{info, warn};

use crate::{
    dao::{club_store::ClubStore, storage::StorageError},
    state::SharedState,
};

const INITIAL_DELAY: Duration = Duration::from_millis(1_000);
const MAX_DELAY: Duration = Duration::from_secs(10);
const HEALTH_POLL_INTERVAL: Duration = Duration::from_secs(5);
const MAX_RECONNECT_ATTEMPTS: u32 = 3;

fn backoff(delay: Duration) -> Duration {
    (delay * 2).min(MAX_DELAY)
}

/// Connect to the storage backend, then watch its health.
///
/// The shared state is degraded whenever the backend cannot be reached; after
/// [`MAX_RECONNECT_ATTEMPTS`] failed reconnects a brand new connection is built.
pub async fn run<F, Fut>(state: SharedState, mut connect: F)
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<Arc<dyn ClubStore>, StorageError>> + Send,
{
    let mut delay = INITIAL_DELAY;

    loop {
        match connect().await {
            Ok(store) => {
                state.install_club_store(store.clone()).await;
                info!("storage connection established; leaving degraded mode");
                delay = INITIAL_DELAY;

                watch_health(&state, store.as_ref()).await;

                warn!("exhausted storage reconnect attempts; building a new connection");
                sleep(delay).await;
                delay = backoff(delay);
            }
            Err(err) => {
                warn!(error = %err, "storage connection attempt failed");
                sleep(delay).await;
                delay = backoff(delay);
            }
        }
    }
}

/// Poll `store` until it fails and cannot be brought back.
async fn watch_health(state: &SharedState, store: &dyn ClubStore) {
    loop {
        match store.health_check().await {
            Ok(()) => {
                if state.is_degraded().await {
                    info!("storage healthy again; leaving degraded mode");
                    state.update_degraded(false).await;
                }
                sleep(HEALTH_POLL_INTERVAL).await;
            }
            Err(err) => {
                warn!(error = %err, "storage health check failed");
                if !reconnect(state, store).await {
                    return;
                }
                state.update_degraded(false).await;
                sleep(HEALTH_POLL_INTERVAL).await;
            }
        }
    }
}

async fn reconnect(state: &SharedState, store: &dyn ClubStore) -> bool {
    let mut reconnect_delay = INITIAL_DELAY;
    for attempt in 0..MAX_RECONNECT_ATTEMPTS {
        match store.try_reconnect().await {
            Ok(()) => {
                info!(attempt, "storage reconnection succeeded after health check failure");
                return true;
            }
            Err(err) => {
                if attempt == 0 {
                    warn!(attempt, error = %err, "storage reconnect first attempt failed; entering degraded mode");
                    state.update_degraded(true).await;
                } else {
                    warn!(attempt, error = %err, "storage reconnect attempt failed");
                }
                sleep(reconnect_delay).await;
                reconnect_delay = backoff(reconnect_delay);
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::AppConfig, dao::club_store::memory::MemoryClubStore, state::AppState};

    #[test]
    fn backoff_is_capped() {
        assert_eq!(backoff(Duration::from_secs(1)), Duration::from_secs(2));
        assert_eq!(backoff(Duration::from_secs(8)), MAX_DELAY);
    }

    #[tokio::test]
    async fn installs_the_store_once_connected() {
        let state = AppState::new(AppConfig::default());
        let task = tokio::spawn(run(state.clone(), || async {
            Ok(Arc::new(MemoryClubStore::new()) as Arc<dyn ClubStore>)
        }));

        let mut watcher = state.degraded_watcher();
        tokio::time::timeout(Duration::from_secs(2), watcher.wait_for(|degraded| !degraded))
            .await
            .unwrap()
            .unwrap();
        assert!(state.club_store().await.is_some());
        task.abort();
    }
}
