use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    dao::models::MatchSheetEntity,
    dto::format_system_time,
    squad::{Lineup, MatchId, PlayerId},
    state::sheet_machine::SheetPhase,
};

/// Validate (or re-validate) a saved lineup as the match sheet.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ValidateSheetRequest {
    pub lineup_id: Uuid,
}

/// The validated lineup of a match.
#[derive(Debug, Serialize, ToSchema)]
pub struct MatchSheetResponse {
    pub match_id: MatchId,
    pub phase: SheetPhase,
    pub lineup_id: Uuid,
    pub lineup_name: String,
    pub formation: String,
    pub starters_by_slot: Lineup,
    pub substitutes: Vec<PlayerId>,
    /// Starters then substitutes: the players that may be rated.
    pub actual_players: Vec<PlayerId>,
    pub absent_players: Vec<PlayerId>,
    pub created_by: PlayerId,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified_by: Option<PlayerId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified_at: Option<String>,
    pub ratings_closed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ratings_closed_by: Option<PlayerId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ratings_closed_at: Option<String>,
}

impl From<MatchSheetEntity> for MatchSheetResponse {
    fn from(sheet: MatchSheetEntity) -> Self {
        Self {
            phase: SheetPhase::of(Some(&sheet)),
            match_id: sheet.match_id,
            lineup_id: sheet.lineup_id,
            lineup_name: sheet.lineup_name,
            formation: sheet.formation_at_validation,
            starters_by_slot: sheet.starters_by_slot,
            substitutes: sheet.substitutes,
            actual_players: sheet.actual_players,
            absent_players: sheet.absent_players,
            created_by: sheet.created_by,
            created_at: format_system_time(sheet.created_at),
            last_modified_by: sheet.last_modified_by,
            last_modified_at: sheet.last_modified_at.map(format_system_time),
            ratings_closed: sheet.ratings_closed,
            ratings_closed_by: sheet.ratings_closed_by,
            ratings_closed_at: sheet.ratings_closed_at.map(format_system_time),
        }
    }
}
