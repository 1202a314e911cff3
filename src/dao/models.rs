use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use time::Date;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::squad::{Lineup, MatchId, PlayerId, Position, RosterPlayer};

/// Preferred side of the pitch.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub enum Side {
    L,
    R,
    C,
}

/// Club player as persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayerEntity {
    /// Stable identifier, shared with the user account linked to the player.
    pub id: PlayerId,
    /// Display name.
    pub name: String,
    /// Natural position.
    pub position: Position,
    /// Overall rating (1-99).
    pub rating: u8,
    pub pace: u8,
    pub shooting: u8,
    pub passing: u8,
    pub dribbling: u8,
    pub defense: u8,
    pub physical: u8,
    /// Shirt number.
    #[serde(default)]
    pub jersey: Option<u8>,
    /// Preferred side of the pitch.
    #[serde(default)]
    pub side: Option<Side>,
    /// Link to a portrait.
    #[serde(default)]
    pub photo: Option<String>,
}

impl From<&PlayerEntity> for RosterPlayer {
    fn from(player: &PlayerEntity) -> Self {
        RosterPlayer::new(player.id.clone(), player.position)
    }
}

/// Scheduled fixture.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MatchEntity {
    pub id: MatchId,
    /// Match day.
    #[serde(with = "iso_date")]
    pub date: Date,
    /// Kick-off time (`HH:MM`), informational.
    #[serde(default)]
    pub time: Option<String>,
    pub opponent: String,
    pub home: bool,
    pub location: String,
    #[serde(default)]
    pub competition: Option<String>,
}

/// Draft lineup saved for a match before it becomes a match sheet.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SavedLineupEntity {
    pub id: Uuid,
    pub match_id: MatchId,
    pub name: String,
    pub formation: String,
    /// Slot assignments; absent players never appear here.
    pub lineup: Lineup,
    /// Players declared unavailable.
    pub absent: Vec<PlayerId>,
    pub created_by: PlayerId,
    pub created_at: SystemTime,
}

/// Validated snapshot of a lineup for one match. One per match.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MatchSheetEntity {
    /// Match the sheet belongs to (also its key).
    pub match_id: MatchId,
    /// Saved lineup the sheet was built from.
    pub lineup_id: Uuid,
    /// Name of that lineup at validation time.
    pub lineup_name: String,
    /// Formation name at validation time.
    pub formation_at_validation: String,
    /// Starter of every slot at validation time.
    pub starters_by_slot: Lineup,
    /// Present but unassigned players.
    pub substitutes: Vec<PlayerId>,
    /// Starters followed by substitutes: the only players that may be rated.
    pub actual_players: Vec<PlayerId>,
    /// Unavailable players.
    pub absent_players: Vec<PlayerId>,
    pub created_by: PlayerId,
    pub created_at: SystemTime,
    pub last_modified_by: Option<PlayerId>,
    pub last_modified_at: Option<SystemTime>,
    /// Once set, no rating can be submitted for the match anymore.
    pub ratings_closed: bool,
    pub ratings_closed_by: Option<PlayerId>,
    pub ratings_closed_at: Option<SystemTime>,
}

impl MatchSheetEntity {
    /// Whether `player` is listed as an actual player.
    pub fn lists(&self, player: &PlayerId) -> bool {
        self.actual_players.contains(player)
    }
}

/// Lineup-related fields replaced when a sheet is re-validated.
///
/// Creator and closure fields are never part of a patch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchSheetPatch {
    pub lineup_id: Uuid,
    pub lineup_name: String,
    pub formation_at_validation: String,
    pub starters_by_slot: Lineup,
    pub substitutes: Vec<PlayerId>,
    pub actual_players: Vec<PlayerId>,
    pub absent_players: Vec<PlayerId>,
    pub modified_by: PlayerId,
    pub modified_at: SystemTime,
}

impl MatchSheetEntity {
    /// Apply a re-validation patch in place.
    pub fn apply_patch(&mut self, patch: MatchSheetPatch) {
        self.lineup_id = patch.lineup_id;
        self.lineup_name = patch.lineup_name;
        self.formation_at_validation = patch.formation_at_validation;
        self.starters_by_slot = patch.starters_by_slot;
        self.substitutes = patch.substitutes;
        self.actual_players = patch.actual_players;
        self.absent_players = patch.absent_players;
        self.last_modified_by = Some(patch.modified_by);
        self.last_modified_at = Some(patch.modified_at);
    }
}

/// One peer rating. At most one per (match, rater, rated).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayerRatingEntity {
    pub match_id: MatchId,
    pub rater_id: PlayerId,
    pub rated_id: PlayerId,
    /// Score between 1 and 10.
    pub rating: u8,
    pub comment: Option<String>,
    pub created_at: SystemTime,
    pub updated_at: SystemTime,
}

/// Outcome of a rating upsert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RatingWrite {
    /// First rating for the triple.
    Inserted,
    /// An earlier rating was overwritten.
    Updated,
    /// The match sheet had its ratings closed; nothing was stored.
    Closed,
}

/// Per-player counters for one match. At most one per (match, player).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MatchPlayerStatsEntity {
    pub match_id: MatchId,
    pub player_id: PlayerId,
    pub goals: u16,
    pub assists: u16,
    pub yellow_cards: u8,
    pub red_cards: u8,
    pub minutes: u16,
    pub clean_sheet: bool,
    pub created_by: PlayerId,
    pub last_modified_by: PlayerId,
    pub updated_at: SystemTime,
}

/// `YYYY-MM-DD` serde representation for match days.
pub mod iso_date {
    use serde::{Deserialize, Deserializer, Serializer};
    use time::{Date, format_description::BorrowedFormatItem, macros::format_description};

    /// Calendar day format shared by storage and DTOs.
    pub const FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");

    pub fn serialize<S: Serializer>(date: &Date, serializer: S) -> Result<S::Ok, S::Error> {
        let text = date.format(FORMAT).map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&text)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Date, D::Error> {
        let text = String::deserialize(deserializer)?;
        Date::parse(&text, FORMAT).map_err(serde::de::Error::custom)
    }
}
