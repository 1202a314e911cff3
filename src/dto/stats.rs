//! Match statistics input and the public dashboard views.

use serde::{Deserialize, Serialize};
use time::Date;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::{
    dao::models::{MatchPlayerStatsEntity, iso_date},
    dto::format_system_time,
    squad::{MatchId, PlayerId, Position},
};

/// Counters of one player for one match. Missing fields count as zero.
#[derive(Debug, Clone, Default, Deserialize, ToSchema, Validate)]
#[serde(default)]
pub struct UpsertStatsRequest {
    pub goals: u16,
    pub assists: u16,
    #[validate(range(max = 2))]
    pub yellow_cards: u8,
    #[validate(range(max = 1))]
    pub red_cards: u8,
    #[validate(range(max = 200))]
    pub minutes: u16,
    pub clean_sheet: bool,
}

/// Stored counters of a player for a match.
#[derive(Debug, Serialize, ToSchema)]
pub struct MatchStatsView {
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
    pub updated_at: String,
}

impl From<MatchPlayerStatsEntity> for MatchStatsView {
    fn from(value: MatchPlayerStatsEntity) -> Self {
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
            updated_at: format_system_time(value.updated_at),
        }
    }
}

/// Dashboard filter.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DashboardQuery {
    /// Only list players of this position.
    pub position: Option<Position>,
}

/// Where a match was played, from the club's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Venue {
    Home,
    Away,
}

/// Season card filters. Both are optional and combine.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SeasonCardQuery {
    /// Only home or only away matches.
    pub venue: Option<Venue>,
    /// Only matches of this competition.
    pub competition: Option<String>,
}

/// Season totals of a player.
#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
pub struct SeasonTotals {
    pub goals: u32,
    pub assists: u32,
    pub yellow_cards: u32,
    pub red_cards: u32,
    pub minutes: u32,
    pub clean_sheets: u32,
}

impl SeasonTotals {
    /// Add one match worth of counters.
    pub fn add(&mut self, stats: &MatchPlayerStatsEntity) {
        self.goals += u32::from(stats.goals);
        self.assists += u32::from(stats.assists);
        self.yellow_cards += u32::from(stats.yellow_cards);
        self.red_cards += u32::from(stats.red_cards);
        self.minutes += u32::from(stats.minutes);
        self.clean_sheets += u32::from(stats.clean_sheet);
    }
}

/// One row of the public dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct PlayerDashboardRow {
    pub player_id: PlayerId,
    pub name: String,
    pub position: Position,
    /// Finished matches with recorded statistics.
    pub appearances: u32,
    #[serde(flatten)]
    pub totals: SeasonTotals,
    /// Mean of the per-match averages, one decimal. `None` until rated.
    pub average_rating: Option<f64>,
    pub rating_count: usize,
}

/// One match with recorded statistics on a player's season card.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct SeasonMatchLine {
    pub match_id: MatchId,
    #[serde(with = "iso_date")]
    #[schema(value_type = String, example = "2025-09-07")]
    pub date: Date,
    pub opponent: String,
    pub home: bool,
    pub goals: u16,
    pub assists: u16,
    pub yellow_cards: u8,
    pub red_cards: u8,
    pub minutes: u16,
    pub clean_sheet: bool,
    /// Average peer rating received for this match.
    pub average_rating: Option<f64>,
    pub rating_count: usize,
}

/// Season overview of a single player.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct PlayerSeasonCard {
    pub player_id: PlayerId,
    pub name: String,
    pub position: Position,
    pub matches_played: u32,
    #[serde(flatten)]
    pub totals: SeasonTotals,
    /// Rounded down to whole minutes.
    pub average_minutes: u32,
    pub average_rating: Option<f64>,
    pub best_match_rating: Option<f64>,
    pub worst_match_rating: Option<f64>,
    pub rating_count: usize,
    /// Most recent first.
    pub matches: Vec<SeasonMatchLine>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::SystemTime;

    fn line(goals: u16, minutes: u16, clean_sheet: bool) -> MatchPlayerStatsEntity {
        MatchPlayerStatsEntity {
            match_id: "m1".into(),
            player_id: "p1".into(),
            goals,
            assists: 1,
            yellow_cards: 1,
            red_cards: 0,
            minutes,
            clean_sheet,
            created_by: "cap".into(),
            last_modified_by: "cap".into(),
            updated_at: SystemTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn totals_accumulate_every_counter() {
        let mut totals = SeasonTotals::default();
        totals.add(&line(2, 70, true));
        totals.add(&line(1, 90, false));
        assert_eq!(
            totals,
            SeasonTotals {
                goals: 3,
                assists: 2,
                yellow_cards: 2,
                red_cards: 0,
                minutes: 160,
                clean_sheets: 1,
            }
        );
    }

    #[test]
    fn card_limits_are_validated() {
        let ok = UpsertStatsRequest {
            yellow_cards: 2,
            red_cards: 1,
            minutes: 200,
            ..Default::default()
        };
        assert!(ok.validate().is_ok());
        let too_many_yellows = UpsertStatsRequest {
            yellow_cards: 3,
            ..Default::default()
        };
        assert!(too_many_yellows.validate().is_err());
        let too_long = UpsertStatsRequest {
            minutes: 201,
            ..Default::default()
        };
        assert!(too_long.validate().is_err());
    }

    #[test]
    fn missing_counters_default_to_zero() {
        let request: UpsertStatsRequest = serde_json::from_str(r#"{"goals":2}"#).unwrap();
        assert_eq!(request.goals, 2);
        assert_eq!(request.minutes, 0);
        assert!(!request.clean_sheet);
    }
}
