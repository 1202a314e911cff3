use tracing::warn;

use crate::{
    dto::health::{HealthResponse, StorageHealth},
    state::SharedState,
};

/// Ping the club store and report it along with the degraded flag.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    let storage = match state.club_store().await {
        Some(store) => match store.health_check().await {
            Ok(()) => StorageHealth::Connected,
            Err(err) => {
                warn!(error = %err, "club store health check failed");
                StorageHealth::Failing
            }
        },
        None => {
            warn!("no club store installed (degraded mode)");
            StorageHealth::Missing
        }
    };

    HealthResponse::new(storage, state.is_degraded().await, state.today())
}
