use axum::Router;

use crate::state::SharedState;

/// Caller identity extraction from gateway headers.
pub mod actor;
pub mod catalogue;
pub mod docs;
pub mod health;
pub mod lineups;
pub mod ratings;
pub mod sheets;
pub mod stats;

/// Compose all route trees, wiring in shared state and documentation routes.
pub fn router(state: SharedState) -> Router<()> {
    let api_router = health::router()
        .merge(catalogue::router())
        .merge(lineups::router())
        .merge(sheets::router())
        .merge(ratings::router())
        .merge(stats::router());

    let docs_router = docs::router(state.clone());

    api_router.merge(docs_router).with_state(state)
}
