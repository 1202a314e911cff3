use mongodb::bson::{Bson, DateTime, Document, doc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::{MongoDaoError, MongoResult};
use crate::dao::models::{
    MatchEntity, MatchPlayerStatsEntity, MatchSheetEntity, PlayerEntity, PlayerRatingEntity,
    SavedLineupEntity,
};
use crate::squad::{Lineup, MatchId, PlayerId};

pub const PLAYER_COLLECTION_NAME: &str = "players";
pub const MATCH_COLLECTION_NAME: &str = "matches";
pub const LINEUP_COLLECTION_NAME: &str = "lineups";
pub const SHEET_COLLECTION_NAME: &str = "match_sheets";
pub const RATING_COLLECTION_NAME: &str = "player_ratings";
pub const STATS_COLLECTION_NAME: &str = "match_player_stats";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoPlayerDocument {
    #[serde(rename = "_id")]
    key: PlayerId,
    #[serde(flatten)]
    player: PlayerEntity,
}

impl From<PlayerEntity> for MongoPlayerDocument {
    fn from(player: PlayerEntity) -> Self {
        Self {
            key: player.id.clone(),
            player,
        }
    }
}

impl From<MongoPlayerDocument> for PlayerEntity {
    fn from(value: MongoPlayerDocument) -> Self {
        value.player
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoMatchDocument {
    #[serde(rename = "_id")]
    key: MatchId,
    #[serde(flatten)]
    fixture: MatchEntity,
}

impl From<MatchEntity> for MongoMatchDocument {
    fn from(fixture: MatchEntity) -> Self {
        Self {
            key: fixture.id.clone(),
            fixture,
        }
    }
}

impl From<MongoMatchDocument> for MatchEntity {
    fn from(value: MongoMatchDocument) -> Self {
        value.fixture
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoLineupDocument {
    #[serde(rename = "_id")]
    id: String,
    match_id: MatchId,
    name: String,
    formation: String,
    lineup: Lineup,
    absent: Vec<PlayerId>,
    created_by: PlayerId,
    created_at: DateTime,
}

impl From<SavedLineupEntity> for MongoLineupDocument {
    fn from(value: SavedLineupEntity) -> Self {
        Self {
            id: value.id.to_string(),
            match_id: value.match_id,
            name: value.name,
            formation: value.formation,
            lineup: value.lineup,
            absent: value.absent,
            created_by: value.created_by,
            created_at: DateTime::from_system_time(value.created_at),
        }
    }
}

impl TryFrom<MongoLineupDocument> for SavedLineupEntity {
    type Error = MongoDaoError;

    fn try_from(value: MongoLineupDocument) -> MongoResult<Self> {
        let id = parse_uuid(LINEUP_COLLECTION_NAME, &value.id, &value.id)?;
        Ok(Self {
            id,
            match_id: value.match_id,
            name: value.name,
            formation: value.formation,
            lineup: value.lineup,
            absent: value.absent,
            created_by: value.created_by,
            created_at: value.created_at.to_system_time(),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoSheetDocument {
    #[serde(rename = "_id")]
    match_id: MatchId,
    lineup_id: String,
    lineup_name: String,
    formation_at_validation: String,
    starters_by_slot: Lineup,
    substitutes: Vec<PlayerId>,
    actual_players: Vec<PlayerId>,
    absent_players: Vec<PlayerId>,
    created_by: PlayerId,
    created_at: DateTime,
    last_modified_by: Option<PlayerId>,
    last_modified_at: Option<DateTime>,
    #[serde(default)]
    ratings_closed: bool,
    ratings_closed_by: Option<PlayerId>,
    ratings_closed_at: Option<DateTime>,
}

impl From<MatchSheetEntity> for MongoSheetDocument {
    fn from(value: MatchSheetEntity) -> Self {
        Self {
            match_id: value.match_id,
            lineup_id: value.lineup_id.to_string(),
            lineup_name: value.lineup_name,
            formation_at_validation: value.formation_at_validation,
            starters_by_slot: value.starters_by_slot,
            substitutes: value.substitutes,
            actual_players: value.actual_players,
            absent_players: value.absent_players,
            created_by: value.created_by,
            created_at: DateTime::from_system_time(value.created_at),
            last_modified_by: value.last_modified_by,
            last_modified_at: value.last_modified_at.map(DateTime::from_system_time),
            ratings_closed: value.ratings_closed,
            ratings_closed_by: value.ratings_closed_by,
            ratings_closed_at: value.ratings_closed_at.map(DateTime::from_system_time),
        }
    }
}

impl TryFrom<MongoSheetDocument> for MatchSheetEntity {
    type Error = MongoDaoError;

    fn try_from(value: MongoSheetDocument) -> MongoResult<Self> {
        let lineup_id = parse_uuid(SHEET_COLLECTION_NAME, value.match_id.as_str(), &value.lineup_id)?;
        Ok(Self {
            match_id: value.match_id,
            lineup_id,
            lineup_name: value.lineup_name,
            formation_at_validation: value.formation_at_validation,
            starters_by_slot: value.starters_by_slot,
            substitutes: value.substitutes,
            actual_players: value.actual_players,
            absent_players: value.absent_players,
            created_by: value.created_by,
            created_at: value.created_at.to_system_time(),
            last_modified_by: value.last_modified_by,
            last_modified_at: value.last_modified_at.map(|at| at.to_system_time()),
            ratings_closed: value.ratings_closed,
            ratings_closed_by: value.ratings_closed_by,
            ratings_closed_at: value.ratings_closed_at.map(|at| at.to_system_time()),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoRatingDocument {
    #[serde(rename = "_id")]
    key: String,
    match_id: MatchId,
    rater_id: PlayerId,
    rated_id: PlayerId,
    rating: i32,
    comment: Option<String>,
    created_at: DateTime,
    updated_at: DateTime,
}

impl TryFrom<MongoRatingDocument> for PlayerRatingEntity {
    type Error = MongoDaoError;

    fn try_from(value: MongoRatingDocument) -> MongoResult<Self> {
        let rating = u8::try_from(value.rating).map_err(|err| MongoDaoError::CorruptDocument {
            collection: RATING_COLLECTION_NAME,
            key: value.key.clone(),
            reason: err.to_string(),
        })?;
        Ok(Self {
            match_id: value.match_id,
            rater_id: value.rater_id,
            rated_id: value.rated_id,
            rating,
            comment: value.comment,
            created_at: value.created_at.to_system_time(),
            updated_at: value.updated_at.to_system_time(),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoStatsDocument {
    #[serde(rename = "_id")]
    key: String,
    match_id: MatchId,
    player_id: PlayerId,
    goals: u16,
    assists: u16,
    yellow_cards: u8,
    red_cards: u8,
    minutes: u16,
    clean_sheet: bool,
    created_by: PlayerId,
    last_modified_by: PlayerId,
    updated_at: DateTime,
}

impl From<MongoStatsDocument> for MatchPlayerStatsEntity {
    fn from(value: MongoStatsDocument) -> Self {
        Self {
            match_id: value.match_id,
            player_id: value.player_id,
            goals: value.goals,
            assists: value.assists,
            yellow_cards: value.yellow_cards,
            red_cards: value.red_cards,
            minutes: value.minutes,
            clean_sheet: value.clean_sheet,
            created_by: value.created_by,
            last_modified_by: value.last_modified_by,
            updated_at: value.updated_at.to_system_time(),
        }
    }
}

fn parse_uuid(collection: &'static str, key: &str, raw: &str) -> MongoResult<Uuid> {
    Uuid::parse_str(raw).map_err(|err| MongoDaoError::CorruptDocument {
        collection,
        key: key.to_owned(),
        reason: err.to_string(),
    })
}

/// `_id` of the rating left by `rater` on `rated` for one match.
pub fn rating_key(match_id: &MatchId, rater: &PlayerId, rated: &PlayerId) -> String {
    format!("{match_id}:{rater}:{rated}")
}

/// `_id` of one player's counters for one match.
pub fn stats_key(match_id: &MatchId, player: &PlayerId) -> String {
    format!("{match_id}:{player}")
}

pub fn doc_id(id: impl Into<Bson>) -> Document {
    doc! {"_id": id.into()}
}

pub fn ids_bson(ids: &[PlayerId]) -> Bson {
    Bson::Array(ids.iter().map(|id| Bson::String(id.to_string())).collect())
}

pub fn lineup_bson(lineup: &Lineup) -> Bson {
    let mut document = Document::new();
    for (slot, player) in lineup.iter() {
        let value = player.map_or(Bson::Null, |id| Bson::String(id.to_string()));
        document.insert(slot.to_string(), value);
    }
    Bson::Document(document)
}

pub fn optional_string(value: Option<&str>) -> Bson {
    value.map_or(Bson::Null, |text| Bson::String(text.to_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn composite_keys_are_stable() {
        let match_id = MatchId::from("m1");
        assert_eq!(
            rating_key(&match_id, &"pD1".into(), &"pGK".into()),
            "m1:pD1:pGK"
        );
        assert_eq!(stats_key(&match_id, &"pF1".into()), "m1:pF1");
    }

    #[test]
    fn lineup_bson_keeps_slot_order_and_empty_slots() {
        let lineup: Lineup = [
            ("GK".into(), Some("pGK".into())),
            ("LB".into(), None),
        ]
        .into_iter()
        .collect();
        let Bson::Document(document) = lineup_bson(&lineup) else {
            panic!("lineup should encode as a document");
        };
        let keys: Vec<&String> = document.keys().collect();
        assert_eq!(keys, ["GK", "LB"]);
        assert_eq!(document.get("LB"), Some(&Bson::Null));
    }
}
