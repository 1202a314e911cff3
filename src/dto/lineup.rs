//! Lineup drafting requests and responses.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dao::models::SavedLineupEntity,
    dto::{format_system_time, validation::validate_not_blank},
    squad::{DraftSquad, Lineup, MatchId, PlayerId, RosterPartition, SlotKey},
};

/// A draft to partition against the roster.
#[derive(Debug, Deserialize, ToSchema)]
pub struct PartitionRequest {
    pub formation: String,
    pub lineup: Lineup,
    #[serde(default)]
    pub absent: Vec<PlayerId>,
}

/// Re-flow a lineup onto another formation.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ReflowRequest {
    pub lineup: Lineup,
    pub to_formation: String,
    #[serde(default)]
    pub absent: Vec<PlayerId>,
}

/// Lay a named preset out on a formation (the default formation when omitted).
#[derive(Debug, Deserialize, ToSchema)]
pub struct PresetRequest {
    pub preset: String,
    #[serde(default)]
    pub formation: Option<String>,
}

/// Drag-and-drop move: put `player` in `slot`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct AssignRequest {
    pub formation: String,
    pub lineup: Lineup,
    #[serde(default)]
    pub absent: Vec<PlayerId>,
    pub slot: SlotKey,
    pub player: PlayerId,
}

/// A draft and the roster split it produces.
#[derive(Debug, Serialize, ToSchema)]
pub struct DraftResponse {
    pub formation: String,
    pub lineup: Lineup,
    /// Players holding a slot, in slot order.
    pub starters: Vec<PlayerId>,
    /// Present but unassigned players, in roster order.
    pub substitutes: Vec<PlayerId>,
    pub absent: Vec<PlayerId>,
}

impl DraftResponse {
    pub fn new(draft: DraftSquad, split: RosterPartition) -> Self {
        Self {
            formation: draft.formation,
            lineup: draft.lineup,
            starters: split.starters,
            substitutes: split.substitutes,
            absent: split.absent,
        }
    }
}

/// Save a named draft for a match.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct SaveLineupRequest {
    #[validate(length(min = 1, max = 80), custom(function = "validate_not_blank"))]
    pub name: String,
    pub formation: String,
    pub lineup: Lineup,
    #[serde(default)]
    pub absent: Vec<PlayerId>,
}

/// A draft saved for a match.
#[derive(Debug, Serialize, ToSchema)]
pub struct SavedLineupResponse {
    pub id: Uuid,
    pub match_id: MatchId,
    pub name: String,
    pub formation: String,
    pub lineup: Lineup,
    pub absent: Vec<PlayerId>,
    pub created_by: PlayerId,
    pub created_at: String,
}

impl From<SavedLineupEntity> for SavedLineupResponse {
    fn from(value: SavedLineupEntity) -> Self {
        Self {
            id: value.id,
            match_id: value.match_id,
            name: value.name,
            formation: value.formation,
            lineup: value.lineup,
            absent: value.absent,
            created_by: value.created_by,
            created_at: format_system_time(value.created_at),
        }
    }
}
