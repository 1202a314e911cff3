//! Process-local store used when no database is configured, and by tests.

use std::{sync::Arc, time::SystemTime};

use dashmap::{DashMap, mapref::entry::Entry};
use futures::future::{BoxFuture, ready};
use uuid::Uuid;

use crate::dao::{
    club_store::ClubStore,
    models::{
        MatchEntity, MatchPlayerStatsEntity, MatchSheetEntity, MatchSheetPatch, PlayerEntity,
        PlayerRatingEntity, RatingWrite, SavedLineupEntity,
    },
    storage::StorageResult,
};
use crate::squad::{MatchId, PlayerId};

type RatingKey = (MatchId, PlayerId, PlayerId);
type StatsKey = (MatchId, PlayerId);

#[derive(Clone, Default)]
pub struct MemoryClubStore {
    inner: Arc<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    players: DashMap<PlayerId, PlayerEntity>,
    matches: DashMap<MatchId, MatchEntity>,
    lineups: DashMap<Uuid, SavedLineupEntity>,
    sheets: DashMap<MatchId, MatchSheetEntity>,
    ratings: DashMap<RatingKey, PlayerRatingEntity>,
    stats: DashMap<StatsKey, MatchPlayerStatsEntity>,
}

impl MemoryClubStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with a roster and a fixture list.
    pub fn seeded(players: Vec<PlayerEntity>, matches: Vec<MatchEntity>) -> Self {
        let store = Self::new();
        for player in players {
            store.inner.players.insert(player.id.clone(), player);
        }
        for fixture in matches {
            store.inner.matches.insert(fixture.id.clone(), fixture);
        }
        store
    }

    fn sorted_players(&self) -> Vec<PlayerEntity> {
        let mut players: Vec<PlayerEntity> =
            self.inner.players.iter().map(|e| e.value().clone()).collect();
        players.sort_by(|a, b| a.id.cmp(&b.id));
        players
    }

    fn sorted_matches(&self) -> Vec<MatchEntity> {
        let mut matches: Vec<MatchEntity> =
            self.inner.matches.iter().map(|e| e.value().clone()).collect();
        matches.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.id.cmp(&b.id)));
        matches
    }

    fn upsert_rating_now(&self, rating: PlayerRatingEntity) -> RatingWrite {
        // The sheet guard keeps `close_ratings_now` out until the rating is stored.
        let sheet = self.inner.sheets.get(&rating.match_id);
        if sheet.as_ref().is_some_and(|sheet| sheet.ratings_closed) {
            return RatingWrite::Closed;
        }
        let key = (
            rating.match_id.clone(),
            rating.rater_id.clone(),
            rating.rated_id.clone(),
        );
        match self.inner.ratings.entry(key) {
            Entry::Occupied(mut existing) => {
                let stored = existing.get_mut();
                stored.rating = rating.rating;
                stored.comment = rating.comment;
                stored.updated_at = rating.updated_at;
                RatingWrite::Updated
            }
            Entry::Vacant(slot) => {
                slot.insert(rating);
                RatingWrite::Inserted
            }
        }
    }

    fn upsert_stats_now(&self, stats: MatchPlayerStatsEntity) {
        let key = (stats.match_id.clone(), stats.player_id.clone());
        match self.inner.stats.entry(key) {
            Entry::Occupied(mut existing) => {
                let created_by = existing.get().created_by.clone();
                existing.insert(MatchPlayerStatsEntity {
                    created_by,
                    ..stats
                });
            }
            Entry::Vacant(slot) => {
                slot.insert(stats);
            }
        }
    }

    fn close_ratings_now(&self, match_id: &MatchId, actor: PlayerId, at: SystemTime) -> bool {
        match self.inner.sheets.get_mut(match_id) {
            Some(mut sheet) if !sheet.ratings_closed => {
                sheet.ratings_closed = true;
                sheet.ratings_closed_by = Some(actor);
                sheet.ratings_closed_at = Some(at);
                true
            }
            _ => false,
        }
    }
}

fn done<T: Send + 'static>(value: T) -> BoxFuture<'static, StorageResult<T>> {
    Box::pin(ready(Ok(value)))
}

impl ClubStore for MemoryClubStore {
    fn list_players(&self) -> BoxFuture<'static, StorageResult<Vec<PlayerEntity>>> {
        done(self.sorted_players())
    }

    fn find_player(&self, id: PlayerId) -> BoxFuture<'static, StorageResult<Option<PlayerEntity>>> {
        done(self.inner.players.get(&id).map(|e| e.value().clone()))
    }

    fn save_player(&self, player: PlayerEntity) -> BoxFuture<'static, StorageResult<()>> {
        self.inner.players.insert(player.id.clone(), player);
        done(())
    }

    fn list_matches(&self) -> BoxFuture<'static, StorageResult<Vec<MatchEntity>>> {
        done(self.sorted_matches())
    }

    fn find_match(&self, id: MatchId) -> BoxFuture<'static, StorageResult<Option<MatchEntity>>> {
        done(self.inner.matches.get(&id).map(|e| e.value().clone()))
    }

    fn save_lineup(&self, lineup: SavedLineupEntity) -> BoxFuture<'static, StorageResult<()>> {
        self.inner.lineups.insert(lineup.id, lineup);
        done(())
    }

    fn find_lineup(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<SavedLineupEntity>>> {
        done(self.inner.lineups.get(&id).map(|e| e.value().clone()))
    }

    fn list_lineups_for_match(
        &self,
        match_id: MatchId,
    ) -> BoxFuture<'static, StorageResult<Vec<SavedLineupEntity>>> {
        let mut lineups: Vec<SavedLineupEntity> = self
            .inner
            .lineups
            .iter()
            .filter(|e| e.value().match_id == match_id)
            .map(|e| e.value().clone())
            .collect();
        lineups.sort_by_key(|lineup| lineup.created_at);
        done(lineups)
    }

    fn find_match_sheet(
        &self,
        match_id: MatchId,
    ) -> BoxFuture<'static, StorageResult<Option<MatchSheetEntity>>> {
        done(self.inner.sheets.get(&match_id).map(|e| e.value().clone()))
    }

    fn save_match_sheet(&self, sheet: MatchSheetEntity) -> BoxFuture<'static, StorageResult<()>> {
        self.inner.sheets.insert(sheet.match_id.clone(), sheet);
        done(())
    }

    fn update_match_sheet(
        &self,
        match_id: MatchId,
        patch: MatchSheetPatch,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let updated = match self.inner.sheets.get_mut(&match_id) {
            Some(mut sheet) => {
                sheet.apply_patch(patch);
                true
            }
            None => false,
        };
        done(updated)
    }

    fn close_ratings(
        &self,
        match_id: MatchId,
        actor: PlayerId,
        at: SystemTime,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        done(self.close_ratings_now(&match_id, actor, at))
    }

    fn upsert_rating(
        &self,
        rating: PlayerRatingEntity,
    ) -> BoxFuture<'static, StorageResult<RatingWrite>> {
        done(self.upsert_rating_now(rating))
    }

    fn list_ratings_for_match(
        &self,
        match_id: MatchId,
    ) -> BoxFuture<'static, StorageResult<Vec<PlayerRatingEntity>>> {
        let mut ratings: Vec<PlayerRatingEntity> = self
            .inner
            .ratings
            .iter()
            .filter(|e| e.key().0 == match_id)
            .map(|e| e.value().clone())
            .collect();
        ratings.sort_by_key(|rating| rating.created_at);
        done(ratings)
    }

    fn list_ratings(&self) -> BoxFuture<'static, StorageResult<Vec<PlayerRatingEntity>>> {
        let mut ratings: Vec<PlayerRatingEntity> =
            self.inner.ratings.iter().map(|e| e.value().clone()).collect();
        ratings.sort_by_key(|rating| rating.created_at);
        done(ratings)
    }

    fn upsert_match_stats(
        &self,
        stats: MatchPlayerStatsEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        self.upsert_stats_now(stats);
        done(())
    }

    fn list_match_stats(
        &self,
        match_id: MatchId,
    ) -> BoxFuture<'static, StorageResult<Vec<MatchPlayerStatsEntity>>> {
        let mut stats: Vec<MatchPlayerStatsEntity> = self
            .inner
            .stats
            .iter()
            .filter(|e| e.key().0 == match_id)
            .map(|e| e.value().clone())
            .collect();
        stats.sort_by(|a, b| a.player_id.cmp(&b.player_id));
        done(stats)
    }

    fn list_all_stats(&self) -> BoxFuture<'static, StorageResult<Vec<MatchPlayerStatsEntity>>> {
        let mut stats: Vec<MatchPlayerStatsEntity> =
            self.inner.stats.iter().map(|e| e.value().clone()).collect();
        stats.sort_by(|a, b| {
            a.match_id
                .cmp(&b.match_id)
                .then_with(|| a.player_id.cmp(&b.player_id))
        });
        done(stats)
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        done(())
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        done(())
    }
}
