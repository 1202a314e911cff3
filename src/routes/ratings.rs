use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use validator::Validate;

use crate::{
    dto::rating::{
        BatchRatingRequest, RatingReceipt, RatingSummary, RatingView, SubmitRatingRequest,
    },
    error::AppError,
    routes::actor::Actor,
    services::rating_service,
    squad::MatchId,
    state::SharedState,
};

/// Peer rating routes.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route(
            "/matches/{id}/ratings",
            get(list_ratings).post(submit_rating),
        )
        .route("/matches/{id}/ratings/batch", post(submit_batch))
        .route("/matches/{id}/ratings/summary", get(summary))
}

/// Rate a teammate listed on the match sheet.
#[utoipa::path(
    post,
    path = "/matches/{id}/ratings",
    tag = "ratings",
    params(
        ("X-User-Id" = String, Header, description = "Authenticated player id"),
        ("id" = String, Path, description = "Match identifier")
    ),
    request_body = SubmitRatingRequest,
    responses(
        (status = 200, description = "Rating stored", body = RatingReceipt),
        (status = 403, description = "Self rating or player not on the sheet"),
        (status = 409, description = "Ratings closed or match not played yet")
    )
)]
pub async fn submit_rating(
    State(state): State<SharedState>,
    Actor(actor): Actor,
    Path(id): Path<MatchId>,
    Json(payload): Json<SubmitRatingRequest>,
) -> Result<Json<RatingReceipt>, AppError> {
    payload.validate()?;
    Ok(Json(
        rating_service::submit_rating(&state, &actor, id, payload).await?,
    ))
}

/// Rate several teammates at once; stops at the first rejected entry.
#[utoipa::path(
    post,
    path = "/matches/{id}/ratings/batch",
    tag = "ratings",
    params(
        ("X-User-Id" = String, Header, description = "Authenticated player id"),
        ("id" = String, Path, description = "Match identifier")
    ),
    request_body = BatchRatingRequest,
    responses((status = 200, description = "Ratings stored", body = [RatingReceipt]))
)]
pub async fn submit_batch(
    State(state): State<SharedState>,
    Actor(actor): Actor,
    Path(id): Path<MatchId>,
    Json(payload): Json<BatchRatingRequest>,
) -> Result<Json<Vec<RatingReceipt>>, AppError> {
    payload.validate()?;
    Ok(Json(
        rating_service::submit_batch(&state, &actor, id, payload.ratings).await?,
    ))
}

/// Ratings submitted for a match.
#[utoipa::path(
    get,
    path = "/matches/{id}/ratings",
    tag = "ratings",
    params(("id" = String, Path, description = "Match identifier")),
    responses((status = 200, description = "Ratings", body = [RatingView]))
)]
pub async fn list_ratings(
    State(state): State<SharedState>,
    Path(id): Path<MatchId>,
) -> Result<Json<Vec<RatingView>>, AppError> {
    Ok(Json(rating_service::list_ratings(&state, id).await?))
}

/// Average rating per player and closure quorum progress.
#[utoipa::path(
    get,
    path = "/matches/{id}/ratings/summary",
    tag = "ratings",
    params(("id" = String, Path, description = "Match identifier")),
    responses((status = 200, description = "Rating summary", body = RatingSummary))
)]
pub async fn summary(
    State(state): State<SharedState>,
    Path(id): Path<MatchId>,
) -> Result<Json<RatingSummary>, AppError> {
    Ok(Json(rating_service::summary(&state, id).await?))
}
