//! Players, fixtures, formations, and presets as exposed over HTTP.

use serde::{Deserialize, Serialize};
use time::Date;
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    dao::models::{MatchEntity, PlayerEntity, Side, iso_date},
    dto::validation::validate_not_blank,
    squad::{MatchId, PlayerId, Position, Preset},
};

/// Player card.
#[derive(Debug, Serialize, ToSchema)]
pub struct PlayerSummary {
    pub id: PlayerId,
    pub name: String,
    pub position: Position,
    pub rating: u8,
    pub pace: u8,
    pub shooting: u8,
    pub passing: u8,
    pub dribbling: u8,
    pub defense: u8,
    pub physical: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jersey: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub side: Option<Side>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
}

impl From<PlayerEntity> for PlayerSummary {
    fn from(player: PlayerEntity) -> Self {
        Self {
            id: player.id,
            name: player.name,
            position: player.position,
            rating: player.rating,
            pace: player.pace,
            shooting: player.shooting,
            passing: player.passing,
            dribbling: player.dribbling,
            defense: player.defense,
            physical: player.physical,
            jersey: player.jersey,
            side: player.side,
            photo: player.photo,
        }
    }
}

/// Profile edit. Identity and position cannot be changed here.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct UpdatePlayerRequest {
    #[validate(length(min = 1, max = 80), custom(function = "validate_not_blank"))]
    pub name: String,
    #[validate(range(min = 1, max = 99))]
    pub rating: u8,
    #[validate(range(min = 1, max = 99))]
    pub pace: u8,
    #[validate(range(min = 1, max = 99))]
    pub shooting: u8,
    #[validate(range(min = 1, max = 99))]
    pub passing: u8,
    #[validate(range(min = 1, max = 99))]
    pub dribbling: u8,
    #[validate(range(min = 1, max = 99))]
    pub defense: u8,
    #[validate(range(min = 1, max = 99))]
    pub physical: u8,
    #[serde(default)]
    #[validate(range(max = 99))]
    pub jersey: Option<u8>,
    #[serde(default)]
    pub side: Option<Side>,
    #[serde(default)]
    #[validate(url)]
    pub photo: Option<String>,
}

impl UpdatePlayerRequest {
    /// Apply the edit on top of the stored player.
    pub fn apply_to(self, player: PlayerEntity) -> PlayerEntity {
        PlayerEntity {
            name: self.name.trim().to_owned(),
            rating: self.rating,
            pace: self.pace,
            shooting: self.shooting,
            passing: self.passing,
            dribbling: self.dribbling,
            defense: self.defense,
            physical: self.physical,
            jersey: self.jersey,
            side: self.side,
            photo: self.photo,
            ..player
        }
    }
}

/// Fixture with its match-day status relative to today.
#[derive(Debug, Serialize, ToSchema)]
pub struct MatchSummary {
    pub id: MatchId,
    /// `YYYY-MM-DD`.
    #[serde(with = "iso_date")]
    #[schema(value_type = String, example = "2025-09-07")]
    pub date: Date,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    pub opponent: String,
    pub home: bool,
    pub location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub competition: Option<String>,
    /// The match day has arrived: it counts as played and ratings may open.
    pub played_or_today: bool,
}

impl MatchSummary {
    pub fn new(fixture: MatchEntity, today: Date) -> Self {
        Self {
            played_or_today: is_played_or_today(&fixture, today),
            id: fixture.id,
            date: fixture.date,
            time: fixture.time,
            opponent: fixture.opponent,
            home: fixture.home,
            location: fixture.location,
            competition: fixture.competition,
        }
    }
}

/// The match is today or in the past. A match counts as played from its own day on.
pub fn is_played_or_today(fixture: &MatchEntity, today: Date) -> bool {
    fixture.date <= today
}

/// A named preset.
#[derive(Debug, Serialize, ToSchema)]
pub struct PresetEntry {
    pub name: String,
    pub preset: Preset,
}
