use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use validator::Validate;

use crate::{
    dto::lineup::{
        AssignRequest, DraftResponse, PartitionRequest, PresetRequest, ReflowRequest,
        SaveLineupRequest, SavedLineupResponse,
    },
    error::AppError,
    routes::actor::Actor,
    services::lineup_service,
    squad::MatchId,
    state::SharedState,
};

/// Lineup builder operations and saved drafts.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/lineups/partition", post(partition))
        .route("/lineups/reflow", post(reflow))
        .route("/lineups/preset", post(preset))
        .route("/lineups/assign", post(assign))
        .route(
            "/matches/{id}/lineups",
            get(list_lineups).post(save_lineup),
        )
}

/// Split the roster into starters, substitutes, and absentees for a draft.
#[utoipa::path(
    post,
    path = "/lineups/partition",
    tag = "lineups",
    request_body = PartitionRequest,
    responses(
        (status = 200, description = "Draft with its roster split", body = DraftResponse),
        (status = 400, description = "Unknown formation or slot, or a double-booked player")
    )
)]
pub async fn partition(
    State(state): State<SharedState>,
    Json(payload): Json<PartitionRequest>,
) -> Result<Json<DraftResponse>, AppError> {
    Ok(Json(lineup_service::partition(&state, payload).await?))
}

/// Re-flow a draft onto another formation.
#[utoipa::path(
    post,
    path = "/lineups/reflow",
    tag = "lineups",
    request_body = ReflowRequest,
    responses((status = 200, description = "Re-flowed draft", body = DraftResponse))
)]
pub async fn reflow(
    State(state): State<SharedState>,
    Json(payload): Json<ReflowRequest>,
) -> Result<Json<DraftResponse>, AppError> {
    Ok(Json(lineup_service::reflow_lineup(&state, payload).await?))
}

/// Build a draft from a named preset.
#[utoipa::path(
    post,
    path = "/lineups/preset",
    tag = "lineups",
    request_body = PresetRequest,
    responses(
        (status = 200, description = "Draft built from the preset", body = DraftResponse),
        (status = 404, description = "Unknown preset")
    )
)]
pub async fn preset(
    State(state): State<SharedState>,
    Json(payload): Json<PresetRequest>,
) -> Result<Json<DraftResponse>, AppError> {
    Ok(Json(lineup_service::apply_preset(&state, payload).await?))
}

/// Move a player into a slot.
#[utoipa::path(
    post,
    path = "/lineups/assign",
    tag = "lineups",
    request_body = AssignRequest,
    responses((status = 200, description = "Updated draft", body = DraftResponse))
)]
pub async fn assign(
    State(state): State<SharedState>,
    Json(payload): Json<AssignRequest>,
) -> Result<Json<DraftResponse>, AppError> {
    Ok(Json(lineup_service::assign(&state, payload).await?))
}

/// Saved drafts of a match.
#[utoipa::path(
    get,
    path = "/matches/{id}/lineups",
    tag = "lineups",
    params(("id" = String, Path, description = "Match identifier")),
    responses((status = 200, description = "Saved drafts", body = [SavedLineupResponse]))
)]
pub async fn list_lineups(
    State(state): State<SharedState>,
    Path(id): Path<MatchId>,
) -> Result<Json<Vec<SavedLineupResponse>>, AppError> {
    Ok(Json(lineup_service::list_lineups(&state, id).await?))
}

/// Save a named draft for a match.
#[utoipa::path(
    post,
    path = "/matches/{id}/lineups",
    tag = "lineups",
    params(
        ("X-User-Id" = String, Header, description = "Authenticated player id"),
        ("id" = String, Path, description = "Match identifier")
    ),
    request_body = SaveLineupRequest,
    responses(
        (status = 200, description = "Draft saved", body = SavedLineupResponse),
        (status = 401, description = "No authenticated user")
    )
)]
pub async fn save_lineup(
    State(state): State<SharedState>,
    Actor(actor): Actor,
    Path(id): Path<MatchId>,
    Json(payload): Json<SaveLineupRequest>,
) -> Result<Json<SavedLineupResponse>, AppError> {
    payload.validate()?;
    Ok(Json(
        lineup_service::save_lineup(&state, &actor, id, payload).await?,
    ))
}
