use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};
use validator::Validate;

use crate::{
    dto::catalogue::{MatchSummary, PlayerSummary, PresetEntry, UpdatePlayerRequest},
    error::AppError,
    routes::actor::Actor,
    services::catalogue_service,
    squad::{Formation, MatchId, PlayerId},
    state::SharedState,
};

/// Players, fixtures, formations, and presets.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/players", get(list_players))
        .route("/players/{id}", get(get_player).put(update_player))
        .route("/matches", get(list_matches))
        .route("/matches/{id}", get(get_match))
        .route("/formations", get(list_formations))
        .route("/presets", get(list_presets))
}

/// List the club roster.
#[utoipa::path(
    get,
    path = "/players",
    tag = "catalogue",
    responses((status = 200, description = "Club roster", body = [PlayerSummary]))
)]
pub async fn list_players(
    State(state): State<SharedState>,
) -> Result<Json<Vec<PlayerSummary>>, AppError> {
    Ok(Json(catalogue_service::list_players(&state).await?))
}

/// Retrieve one player.
#[utoipa::path(
    get,
    path = "/players/{id}",
    tag = "catalogue",
    params(("id" = String, Path, description = "Player identifier")),
    responses(
        (status = 200, description = "Player", body = PlayerSummary),
        (status = 404, description = "Unknown player")
    )
)]
pub async fn get_player(
    State(state): State<SharedState>,
    Path(id): Path<PlayerId>,
) -> Result<Json<PlayerSummary>, AppError> {
    Ok(Json(catalogue_service::get_player(&state, id).await?))
}

/// Edit a player profile (the player themself or an admin).
#[utoipa::path(
    put,
    path = "/players/{id}",
    tag = "catalogue",
    params(
        ("X-User-Id" = String, Header, description = "Authenticated player id"),
        ("X-User-Roles" = Option<String>, Header, description = "Comma-separated roles"),
        ("id" = String, Path, description = "Player identifier")
    ),
    request_body = UpdatePlayerRequest,
    responses(
        (status = 200, description = "Profile updated", body = PlayerSummary),
        (status = 403, description = "Not the player nor an admin")
    )
)]
pub async fn update_player(
    State(state): State<SharedState>,
    Actor(actor): Actor,
    Path(id): Path<PlayerId>,
    Json(payload): Json<UpdatePlayerRequest>,
) -> Result<Json<PlayerSummary>, AppError> {
    payload.validate()?;
    Ok(Json(
        catalogue_service::update_player(&state, &actor, id, payload).await?,
    ))
}

/// List fixtures by date.
#[utoipa::path(
    get,
    path = "/matches",
    tag = "catalogue",
    responses((status = 200, description = "Fixtures", body = [MatchSummary]))
)]
pub async fn list_matches(
    State(state): State<SharedState>,
) -> Result<Json<Vec<MatchSummary>>, AppError> {
    Ok(Json(catalogue_service::list_matches(&state).await?))
}

/// Retrieve one fixture.
#[utoipa::path(
    get,
    path = "/matches/{id}",
    tag = "catalogue",
    params(("id" = String, Path, description = "Match identifier")),
    responses(
        (status = 200, description = "Fixture", body = MatchSummary),
        (status = 404, description = "Unknown match")
    )
)]
pub async fn get_match(
    State(state): State<SharedState>,
    Path(id): Path<MatchId>,
) -> Result<Json<MatchSummary>, AppError> {
    Ok(Json(catalogue_service::get_match(&state, id).await?))
}

/// Formation catalogue.
#[utoipa::path(
    get,
    path = "/formations",
    tag = "catalogue",
    responses((status = 200, description = "Formations", body = [Formation]))
)]
pub async fn list_formations(State(state): State<SharedState>) -> Json<Vec<Formation>> {
    Json(catalogue_service::formations(&state))
}

/// Named lineup presets.
#[utoipa::path(
    get,
    path = "/presets",
    tag = "catalogue",
    responses((status = 200, description = "Presets", body = [PresetEntry]))
)]
pub async fn list_presets(State(state): State<SharedState>) -> Json<Vec<PresetEntry>> {
    Json(catalogue_service::presets(&state))
}
