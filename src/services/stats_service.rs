//! Match statistics entry and the season aggregates built on top of them.

use std::collections::{BTreeMap, HashMap};

use time::Date;
use tracing::info;

use crate::{
    dao::models::{MatchEntity, MatchPlayerStatsEntity, PlayerEntity, PlayerRatingEntity},
    dto::{
        catalogue::is_played_or_today,
        round_one_decimal,
        stats::{
            DashboardQuery, MatchStatsView, PlayerDashboardRow, PlayerSeasonCard,
            SeasonCardQuery, SeasonMatchLine, SeasonTotals, UpsertStatsRequest, Venue,
        },
    },
    error::ServiceError,
    services::catalogue_service::{require_match, require_player},
    squad::{MatchId, PlayerId},
    state::{SharedState, actor::ActorContext, sheet_machine},
};

/// Record the counters of one player for one match. Captains only.
pub async fn upsert_stats(
    state: &SharedState,
    actor: &ActorContext,
    match_id: MatchId,
    player_id: PlayerId,
    request: UpsertStatsRequest,
) -> Result<MatchStatsView, ServiceError> {
    sheet_machine::authorize_stats(actor)?;
    let store = state.require_store().await?;
    require_match(&store, match_id.clone()).await?;
    require_player(&store, player_id.clone()).await?;

    let entity = MatchPlayerStatsEntity {
        match_id: match_id.clone(),
        player_id: player_id.clone(),
        goals: request.goals,
        assists: request.assists,
        yellow_cards: request.yellow_cards,
        red_cards: request.red_cards,
        minutes: request.minutes,
        clean_sheet: request.clean_sheet,
        created_by: actor.user_id.clone(),
        last_modified_by: actor.user_id.clone(),
        updated_at: state.now(),
    };
    store.upsert_match_stats(entity.clone()).await?;
    info!(
        match_id = %match_id,
        player = %player_id,
        actor = %actor.user_id,
        goals = entity.goals,
        "match statistics recorded"
    );

    // The stored record keeps its first author.
    let stored = store
        .list_match_stats(match_id)
        .await?
        .into_iter()
        .find(|stats| stats.player_id == player_id)
        .unwrap_or(entity);
    Ok(stored.into())
}

/// Records of a match, top scorers first.
pub async fn list_match_stats(
    state: &SharedState,
    match_id: MatchId,
) -> Result<Vec<MatchStatsView>, ServiceError> {
    let store = state.require_store().await?;
    require_match(&store, match_id.clone()).await?;
    let mut stats = store.list_match_stats(match_id).await?;
    stats.sort_by(|a, b| {
        b.goals
            .cmp(&a.goals)
            .then_with(|| b.assists.cmp(&a.assists))
            .then_with(|| a.player_id.cmp(&b.player_id))
    });
    Ok(stats.into_iter().map(Into::into).collect())
}

/// Public dashboard: one row per player, season totals and average rating.
pub async fn dashboard(
    state: &SharedState,
    query: DashboardQuery,
) -> Result<Vec<PlayerDashboardRow>, ServiceError> {
    let store = state.require_store().await?;
    let players = store.list_players().await?;
    let matches = store.list_matches().await?;
    let stats = store.list_all_stats().await?;
    let ratings = store.list_ratings().await?;

    let season = Season::new(&matches, &stats, &ratings, state.today(), |_| true);
    let mut rows: Vec<PlayerDashboardRow> = players
        .iter()
        .filter(|player| query.position.is_none_or(|position| player.position == position))
        .map(|player| season.row(player))
        .collect();
    rows.sort_by(|a, b| {
        b.totals
            .goals
            .cmp(&a.totals.goals)
            .then_with(|| b.totals.assists.cmp(&a.totals.assists))
            .then_with(|| {
                b.average_rating
                    .unwrap_or(0.0)
                    .total_cmp(&a.average_rating.unwrap_or(0.0))
            })
            .then_with(|| a.player_id.cmp(&b.player_id))
    });
    Ok(rows)
}

/// Season card of one player, optionally restricted to home/away games or a competition.
pub async fn season_card(
    state: &SharedState,
    player_id: PlayerId,
    query: SeasonCardQuery,
) -> Result<PlayerSeasonCard, ServiceError> {
    let store = state.require_store().await?;
    let player = require_player(&store, player_id).await?;
    let matches = store.list_matches().await?;
    let stats = store.list_all_stats().await?;
    let ratings = store.list_ratings().await?;

    let season = Season::new(&matches, &stats, &ratings, state.today(), |fixture| {
        query.keeps(fixture)
    });
    Ok(season.card(&player))
}

impl SeasonCardQuery {
    fn keeps(&self, fixture: &MatchEntity) -> bool {
        let venue = match self.venue {
            None => true,
            Some(Venue::Home) => fixture.home,
            Some(Venue::Away) => !fixture.home,
        };
        let competition = self
            .competition
            .as_deref()
            .is_none_or(|wanted| fixture.competition.as_deref() == Some(wanted));
        venue && competition
    }
}

/// Statistics and ratings indexed per player, restricted to the selected fixtures.
struct Season<'a> {
    fixtures: HashMap<&'a MatchId, &'a MatchEntity>,
    stats: HashMap<&'a PlayerId, Vec<&'a MatchPlayerStatsEntity>>,
    ratings: HashMap<&'a PlayerId, BTreeMap<&'a MatchId, Vec<u8>>>,
    today: Date,
}

impl<'a> Season<'a> {
    fn new(
        matches: &'a [MatchEntity],
        stats: &'a [MatchPlayerStatsEntity],
        ratings: &'a [PlayerRatingEntity],
        today: Date,
        keep: impl Fn(&MatchEntity) -> bool,
    ) -> Self {
        let fixtures: HashMap<&MatchId, &MatchEntity> = matches
            .iter()
            .filter(|fixture| keep(fixture))
            .map(|fixture| (&fixture.id, fixture))
            .collect();

        let mut by_player: HashMap<&PlayerId, Vec<&MatchPlayerStatsEntity>> = HashMap::new();
        for line in stats.iter().filter(|line| fixtures.contains_key(&line.match_id)) {
            by_player.entry(&line.player_id).or_default().push(line);
        }

        let mut received: HashMap<&PlayerId, BTreeMap<&MatchId, Vec<u8>>> = HashMap::new();
        for rating in ratings
            .iter()
            .filter(|rating| fixtures.contains_key(&rating.match_id))
        {
            received
                .entry(&rating.rated_id)
                .or_default()
                .entry(&rating.match_id)
                .or_default()
                .push(rating.rating);
        }

        Self {
            fixtures,
            stats: by_player,
            ratings: received,
            today,
        }
    }

    fn lines(&self, player: &PlayerId) -> &[&'a MatchPlayerStatsEntity] {
        self.stats.get(player).map(Vec::as_slice).unwrap_or_default()
    }

    fn totals(&self, player: &PlayerId) -> SeasonTotals {
        let mut totals = SeasonTotals::default();
        for line in self.lines(player) {
            totals.add(line);
        }
        totals
    }

    /// Matches with statistics whose match day has arrived.
    fn played(&self, player: &PlayerId) -> u32 {
        let played = self
            .lines(player)
            .iter()
            .filter(|line| {
                self.fixtures
                    .get(&line.match_id)
                    .is_some_and(|fixture| is_played_or_today(fixture, self.today))
            })
            .count();
        u32::try_from(played).unwrap_or(u32::MAX)
    }

    /// Average received per match, one decimal, with the number of ratings behind it.
    fn match_average(&self, player: &PlayerId, match_id: &MatchId) -> Option<(f64, usize)> {
        let scores = self.ratings.get(player)?.get(match_id)?;
        Some((average(scores), scores.len()))
    }

    fn match_averages(&self, player: &PlayerId) -> Vec<f64> {
        self.ratings
            .get(player)
            .map(|per_match| per_match.values().map(|scores| average(scores)).collect())
            .unwrap_or_default()
    }

    fn rating_count(&self, player: &PlayerId) -> usize {
        self.ratings
            .get(player)
            .map(|per_match| per_match.values().map(Vec::len).sum())
            .unwrap_or_default()
    }

    fn row(&self, player: &PlayerEntity) -> PlayerDashboardRow {
        PlayerDashboardRow {
            player_id: player.id.clone(),
            name: player.name.clone(),
            position: player.position,
            appearances: self.played(&player.id),
            totals: self.totals(&player.id),
            average_rating: mean(&self.match_averages(&player.id)),
            rating_count: self.rating_count(&player.id),
        }
    }

    fn card(&self, player: &PlayerEntity) -> PlayerSeasonCard {
        let totals = self.totals(&player.id);
        let matches_played = self.played(&player.id);
        let averages = self.match_averages(&player.id);
        let average_minutes = if matches_played == 0 {
            0
        } else {
            (f64::from(totals.minutes) / f64::from(matches_played)).round() as u32
        };

        let mut matches: Vec<SeasonMatchLine> = self
            .lines(&player.id)
            .iter()
            .filter_map(|line| {
                let fixture = self.fixtures.get(&line.match_id)?;
                let rated = self.match_average(&player.id, &line.match_id);
                Some(SeasonMatchLine {
                    match_id: line.match_id.clone(),
                    date: fixture.date,
                    opponent: fixture.opponent.clone(),
                    home: fixture.home,
                    goals: line.goals,
                    assists: line.assists,
                    yellow_cards: line.yellow_cards,
                    red_cards: line.red_cards,
                    minutes: line.minutes,
                    clean_sheet: line.clean_sheet,
                    average_rating: rated.map(|(average, _)| average),
                    rating_count: rated.map(|(_, count)| count).unwrap_or_default(),
                })
            })
            .collect();
        matches.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| a.match_id.cmp(&b.match_id)));

        PlayerSeasonCard {
            player_id: player.id.clone(),
            name: player.name.clone(),
            position: player.position,
            matches_played,
            totals,
            average_minutes,
            average_rating: mean(&averages),
            best_match_rating: averages.iter().copied().reduce(f64::max),
            worst_match_rating: averages.iter().copied().reduce(f64::min),
            rating_count: self.rating_count(&player.id),
            matches,
        }
    }
}

fn average(scores: &[u8]) -> f64 {
    let sum: u32 = scores.iter().copied().map(u32::from).sum();
    round_one_decimal(f64::from(sum) / scores.len() as f64)
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(round_one_decimal(values.iter().sum::<f64>() / values.len() as f64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{sync::Arc, time::SystemTime};

    use time::macros::date;

    use crate::{
        config::AppConfig,
        dao::club_store::{ClubStore, memory::MemoryClubStore},
        squad::Position,
        state::{AppState, Clock},
    };

    fn setup() -> (SharedState, Arc<dyn ClubStore>) {
        let config = AppConfig::default();
        let store: Arc<dyn ClubStore> = Arc::new(MemoryClubStore::seeded(
            config.seed_players().to_vec(),
            config.seed_matches().to_vec(),
        ));
        // m1 (09-07) is over, m2 (09-14) is today and counts as played, m3 (09-21) is ahead.
        let state = AppState::with_store(config, store.clone(), Clock::Fixed(date!(2025 - 09 - 14)));
        (state, store)
    }

    fn counters(goals: u16, assists: u16, minutes: u16) -> UpsertStatsRequest {
        UpsertStatsRequest {
            goals,
            assists,
            minutes,
            ..Default::default()
        }
    }

    async fn rate(store: &Arc<dyn ClubStore>, match_id: &str, rater: &str, rated: &str, score: u8) {
        store
            .upsert_rating(PlayerRatingEntity {
                match_id: match_id.into(),
                rater_id: rater.into(),
                rated_id: rated.into(),
                rating: score,
                comment: None,
                created_at: SystemTime::UNIX_EPOCH,
                updated_at: SystemTime::UNIX_EPOCH,
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn only_captains_record_statistics() {
        let (state, _) = setup();
        let err = upsert_stats(
            &state,
            &ActorContext::member("pD1"),
            "m1".into(),
            "pF1".into(),
            counters(1, 0, 60),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));

        let err = upsert_stats(
            &state,
            &ActorContext::captain("pD1"),
            "m1".into(),
            "ghost".into(),
            counters(1, 0, 60),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn rewriting_keeps_the_first_author() {
        let (state, _) = setup();
        upsert_stats(&state, &ActorContext::captain("pD1"), "m1".into(), "pF1".into(), counters(1, 0, 60))
            .await
            .unwrap();
        let second = upsert_stats(
            &state,
            &ActorContext::captain("pD2"),
            "m1".into(),
            "pF1".into(),
            counters(2, 1, 70),
        )
        .await
        .unwrap();
        assert_eq!(second.goals, 2);
        assert_eq!(second.created_by, PlayerId::from("pD1"));
        assert_eq!(second.last_modified_by, PlayerId::from("pD2"));

        upsert_stats(&state, &ActorContext::captain("pD1"), "m1".into(), "pM1".into(), counters(3, 0, 70))
            .await
            .unwrap();
        let listed = list_match_stats(&state, "m1".into()).await.unwrap();
        let order: Vec<&str> = listed.iter().map(|line| line.player_id.as_str()).collect();
        assert_eq!(order, ["pM1", "pF1"]);
    }

    #[tokio::test]
    async fn dashboard_ranks_scorers_and_averages_per_match() {
        let (state, store) = setup();
        let captain = ActorContext::captain("pD1");
        upsert_stats(&state, &captain, "m1".into(), "pF1".into(), counters(2, 0, 70)).await.unwrap();
        upsert_stats(&state, &captain, "m2".into(), "pF1".into(), counters(1, 1, 50)).await.unwrap();
        upsert_stats(&state, &captain, "m1".into(), "pM1".into(), counters(3, 2, 70)).await.unwrap();

        // m1: 8 and 7 -> 7.5. m2: 9 -> 9.0. Season: 8.3.
        rate(&store, "m1", "pD1", "pF1", 8).await;
        rate(&store, "m1", "pD2", "pF1", 7).await;
        rate(&store, "m2", "pD1", "pF1", 9).await;

        let rows = dashboard(&state, DashboardQuery::default()).await.unwrap();
        assert_eq!(rows.len(), 9);
        assert_eq!(rows[0].player_id, PlayerId::from("pM1"));
        let striker = &rows[1];
        assert_eq!(striker.player_id, PlayerId::from("pF1"));
        assert_eq!(striker.totals.goals, 3);
        assert_eq!(striker.appearances, 2);
        assert_eq!(striker.average_rating, Some(8.3));
        assert_eq!(striker.rating_count, 3);

        let keepers = dashboard(
            &state,
            DashboardQuery {
                position: Some(Position::Gk),
            },
        )
        .await
        .unwrap();
        assert_eq!(keepers.len(), 1);
        assert_eq!(keepers[0].average_rating, None);
    }

    #[tokio::test]
    async fn season_card_lists_recent_matches_first() {
        let (state, store) = setup();
        let captain = ActorContext::captain("pD1");
        upsert_stats(&state, &captain, "m1".into(), "pF1".into(), counters(2, 0, 70)).await.unwrap();
        upsert_stats(&state, &captain, "m2".into(), "pF1".into(), counters(1, 1, 50)).await.unwrap();
        rate(&store, "m1", "pD1", "pF1", 6).await;
        rate(&store, "m2", "pD1", "pF1", 9).await;

        let card = season_card(&state, "pF1".into(), SeasonCardQuery::default())
            .await
            .unwrap();
        assert_eq!(card.matches_played, 2);
        assert_eq!(card.totals.minutes, 120);
        assert_eq!(card.average_minutes, 60);
        assert_eq!(card.best_match_rating, Some(9.0));
        assert_eq!(card.worst_match_rating, Some(6.0));
        assert_eq!(card.average_rating, Some(7.5));
        let order: Vec<&str> = card.matches.iter().map(|line| line.match_id.as_str()).collect();
        assert_eq!(order, ["m2", "m1"]);

        let away = season_card(
            &state,
            "pF1".into(),
            SeasonCardQuery {
                venue: Some(Venue::Away),
                competition: None,
            },
        )
        .await
        .unwrap();
        assert_eq!(away.matches.len(), 1);
        assert_eq!(away.matches[0].match_id, MatchId::from("m2"));
        assert_eq!(away.matches_played, 1);
        assert_eq!(away.average_minutes, 50);
    }
}
