use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, put},
};
use validator::Validate;

use crate::{
    dto::stats::{
        DashboardQuery, MatchStatsView, PlayerDashboardRow, PlayerSeasonCard, SeasonCardQuery,
        UpsertStatsRequest,
    },
    error::AppError,
    routes::actor::Actor,
    services::stats_service,
    squad::{MatchId, PlayerId},
    state::SharedState,
};

/// Match statistics and public dashboard routes.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/matches/{id}/stats", get(list_match_stats))
        .route("/matches/{id}/stats/{player_id}", put(upsert_stats))
        .route("/stats/players", get(dashboard))
        .route("/stats/players/{id}", get(season_card))
}

/// Record a player's counters for a match (captain only).
#[utoipa::path(
    put,
    path = "/matches/{id}/stats/{player_id}",
    tag = "stats",
    params(
        ("X-User-Id" = String, Header, description = "Authenticated player id"),
        ("X-User-Roles" = String, Header, description = "Must include `captain`"),
        ("id" = String, Path, description = "Match identifier"),
        ("player_id" = String, Path, description = "Player identifier")
    ),
    request_body = UpsertStatsRequest,
    responses(
        (status = 200, description = "Statistics stored", body = MatchStatsView),
        (status = 403, description = "Caller is not a captain")
    )
)]
pub async fn upsert_stats(
    State(state): State<SharedState>,
    Actor(actor): Actor,
    Path((id, player_id)): Path<(MatchId, PlayerId)>,
    Json(payload): Json<UpsertStatsRequest>,
) -> Result<Json<MatchStatsView>, AppError> {
    payload.validate()?;
    Ok(Json(
        stats_service::upsert_stats(&state, &actor, id, player_id, payload).await?,
    ))
}

/// Statistics of a match, top scorers first.
#[utoipa::path(
    get,
    path = "/matches/{id}/stats",
    tag = "stats",
    params(("id" = String, Path, description = "Match identifier")),
    responses((status = 200, description = "Match statistics", body = [MatchStatsView]))
)]
pub async fn list_match_stats(
    State(state): State<SharedState>,
    Path(id): Path<MatchId>,
) -> Result<Json<Vec<MatchStatsView>>, AppError> {
    Ok(Json(stats_service::list_match_stats(&state, id).await?))
}

/// Season dashboard of every player.
#[utoipa::path(
    get,
    path = "/stats/players",
    tag = "stats",
    params(DashboardQuery),
    responses((status = 200, description = "Dashboard rows", body = [PlayerDashboardRow]))
)]
pub async fn dashboard(
    State(state): State<SharedState>,
    Query(query): Query<DashboardQuery>,
) -> Result<Json<Vec<PlayerDashboardRow>>, AppError> {
    Ok(Json(stats_service::dashboard(&state, query).await?))
}

/// Season card of one player.
#[utoipa::path(
    get,
    path = "/stats/players/{id}",
    tag = "stats",
    params(("id" = String, Path, description = "Player identifier"), SeasonCardQuery),
    responses(
        (status = 200, description = "Season card", body = PlayerSeasonCard),
        (status = 404, description = "Unknown player")
    )
)]
pub async fn season_card(
    State(state): State<SharedState>,
    Path(id): Path<PlayerId>,
    Query(query): Query<SeasonCardQuery>,
) -> Result<Json<PlayerSeasonCard>, AppError> {
    Ok(Json(stats_service::season_card(&state, id, query).await?))
}
