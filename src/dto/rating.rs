use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    dao::models::PlayerRatingEntity,
    dto::{format_system_time, validation::validate_comment},
    squad::{MatchId, PlayerId},
};

/// Rate one teammate for a match.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
pub struct SubmitRatingRequest {
    pub rated_player_id: PlayerId,
    /// Score between 1 and 10.
    #[validate(range(min = 1, max = 10))]
    pub rating: u8,
    #[serde(default)]
    /// Trimmed before storage; at most 500 characters once trimmed.
    #[validate(custom(function = "validate_comment"))]
    pub comment: Option<String>,
}

/// Rate several teammates at once. Processing stops at the first rejected entry.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct BatchRatingRequest {
    #[validate(length(min = 1), nested)]
    pub ratings: Vec<SubmitRatingRequest>,
}

/// A stored rating.
#[derive(Debug, Serialize, ToSchema)]
pub struct RatingView {
    pub match_id: MatchId,
    pub rater_id: PlayerId,
    pub rated_player_id: PlayerId,
    pub rating: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<PlayerRatingEntity> for RatingView {
    fn from(value: PlayerRatingEntity) -> Self {
        Self {
            match_id: value.match_id,
            rater_id: value.rater_id,
            rated_player_id: value.rated_id,
            rating: value.rating,
            comment: value.comment,
            created_at: format_system_time(value.created_at),
            updated_at: format_system_time(value.updated_at),
        }
    }
}

/// Result of one rating submission.
#[derive(Debug, Serialize, ToSchema)]
pub struct RatingReceipt {
    pub rating: RatingView,
    /// An earlier rating by the same rater for the same player was replaced.
    pub overwritten: bool,
}

/// Average peer rating of one player for a match.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct PlayerAverage {
    pub player_id: PlayerId,
    /// Rounded to one decimal.
    pub average: f64,
    pub count: usize,
}

/// Ratings overview of a match.
#[derive(Debug, Serialize, ToSchema)]
pub struct RatingSummary {
    pub match_id: MatchId,
    pub distinct_raters: usize,
    /// Distinct raters required before ratings can be closed.
    pub quorum: usize,
    pub quorum_reached: bool,
    pub ratings_closed: bool,
    /// Best average first.
    pub players: Vec<PlayerAverage>,
}
