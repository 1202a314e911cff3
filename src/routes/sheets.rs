use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};

use crate::{
    dto::sheet::{MatchSheetResponse, ValidateSheetRequest},
    error::AppError,
    routes::actor::Actor,
    services::sheet_service,
    squad::MatchId,
    state::SharedState,
};

/// Match sheet lifecycle routes.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route(
            "/matches/{id}/sheet",
            get(get_sheet).post(validate_sheet).put(update_sheet),
        )
        .route("/matches/{id}/sheet/close", post(close_ratings))
}

/// Current match sheet.
#[utoipa::path(
    get,
    path = "/matches/{id}/sheet",
    tag = "sheets",
    params(("id" = String, Path, description = "Match identifier")),
    responses(
        (status = 200, description = "Match sheet", body = MatchSheetResponse),
        (status = 404, description = "No sheet validated yet")
    )
)]
pub async fn get_sheet(
    State(state): State<SharedState>,
    Path(id): Path<MatchId>,
) -> Result<Json<MatchSheetResponse>, AppError> {
    Ok(Json(sheet_service::get_sheet(&state, id).await?))
}

/// Validate a saved lineup as the match sheet (captain only).
#[utoipa::path(
    post,
    path = "/matches/{id}/sheet",
    tag = "sheets",
    params(
        ("X-User-Id" = String, Header, description = "Authenticated player id"),
        ("X-User-Roles" = String, Header, description = "Must include `captain`"),
        ("id" = String, Path, description = "Match identifier")
    ),
    request_body = ValidateSheetRequest,
    responses(
        (status = 200, description = "Sheet validated", body = MatchSheetResponse),
        (status = 403, description = "Caller is not a captain"),
        (status = 409, description = "Lineup has no assigned player")
    )
)]
pub async fn validate_sheet(
    State(state): State<SharedState>,
    Actor(actor): Actor,
    Path(id): Path<MatchId>,
    Json(payload): Json<ValidateSheetRequest>,
) -> Result<Json<MatchSheetResponse>, AppError> {
    Ok(Json(
        sheet_service::validate_sheet(&state, &actor, id, payload.lineup_id).await?,
    ))
}

/// Re-validate the sheet with another saved lineup (captain only).
#[utoipa::path(
    put,
    path = "/matches/{id}/sheet",
    tag = "sheets",
    params(
        ("X-User-Id" = String, Header, description = "Authenticated player id"),
        ("X-User-Roles" = String, Header, description = "Must include `captain`"),
        ("id" = String, Path, description = "Match identifier")
    ),
    request_body = ValidateSheetRequest,
    responses(
        (status = 200, description = "Sheet updated", body = MatchSheetResponse),
        (status = 404, description = "No sheet to update")
    )
)]
pub async fn update_sheet(
    State(state): State<SharedState>,
    Actor(actor): Actor,
    Path(id): Path<MatchId>,
    Json(payload): Json<ValidateSheetRequest>,
) -> Result<Json<MatchSheetResponse>, AppError> {
    Ok(Json(
        sheet_service::update_sheet(&state, &actor, id, payload.lineup_id).await?,
    ))
}

/// Close ratings for the match (captain only, quorum required).
#[utoipa::path(
    post,
    path = "/matches/{id}/sheet/close",
    tag = "sheets",
    params(
        ("X-User-Id" = String, Header, description = "Authenticated player id"),
        ("X-User-Roles" = String, Header, description = "Must include `captain`"),
        ("id" = String, Path, description = "Match identifier")
    ),
    responses(
        (status = 200, description = "Ratings closed", body = MatchSheetResponse),
        (status = 409, description = "Quorum not reached or already closed")
    )
)]
pub async fn close_ratings(
    State(state): State<SharedState>,
    Actor(actor): Actor,
    Path(id): Path<MatchId>,
) -> Result<Json<MatchSheetResponse>, AppError> {
    Ok(Json(sheet_service::close_ratings(&state, &actor, id).await?))
}
