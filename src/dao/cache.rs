//! Read-through TTL cache in front of a [`ClubStore`].
//!
//! Collection reads are served from memory for `ttl`; every write drops the
//! entries it can affect before returning.

use std::{
    hash::Hash,
    sync::Arc,
    time::{Duration, Instant, SystemTime},
};

use dashmap::DashMap;
use futures::future::BoxFuture;
use tracing::trace;
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

/// Map whose entries expire `ttl` after insertion.
///
/// Each key carries a generation bumped by [`TtlCache::invalidate`], so a load
/// that overlapped a write never stores what it read.
pub struct TtlCache<K, V> {
    ttl: Duration,
    entries: DashMap<K, (V, Instant)>,
    generations: DashMap<K, u64>,
}

impl<K: Eq + Hash + Clone, V: Clone> TtlCache<K, V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: DashMap::new(),
            generations: DashMap::new(),
        }
    }

    /// Fresh value for `key`, evicting it if it has expired.
    pub fn get(&self, key: &K) -> Option<V> {
        if let Some(entry) = self.entries.get(key) {
            let (value, stored_at) = entry.value();
            if stored_at.elapsed() < self.ttl {
                return Some(value.clone());
            }
        }
        self.entries
            .remove_if(key, |_, (_, stored_at)| stored_at.elapsed() >= self.ttl);
        None
    }

    pub fn insert(&self, key: K, value: V) {
        self.entries.insert(key, (value, Instant::now()));
    }

    /// Current generation of `key`; pass it to [`TtlCache::insert_if_current`].
    pub fn generation(&self, key: &K) -> u64 {
        *self.generations.entry(key.clone()).or_insert(0)
    }

    /// Store `value` unless `key` was invalidated since `generation` was read.
    pub fn insert_if_current(&self, key: K, value: V, generation: u64) -> bool {
        // Held across the insert: `invalidate` cannot bump in between.
        let current = self.generations.get(&key);
        if current.as_deref().copied().unwrap_or(0) != generation {
            return false;
        }
        self.entries.insert(key, (value, Instant::now()));
        true
    }

    pub fn invalidate(&self, key: &K) {
        *self.generations.entry(key.clone()).or_insert(0) += 1;
        self.entries.remove(key);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

async fn read_through<K, V, F>(cache: &TtlCache<K, V>, key: K, load: F) -> StorageResult<V>
where
    K: Eq + Hash + Clone,
    V: Clone,
    F: FnOnce() -> BoxFuture<'static, StorageResult<V>>,
{
    if let Some(hit) = cache.get(&key) {
        trace!("cache hit");
        return Ok(hit);
    }
    let generation = cache.generation(&key);
    let value = load().await?;
    if !cache.insert_if_current(key, value.clone(), generation) {
        trace!("write landed during the load; not caching");
    }
    Ok(value)
}

struct CacheSlots {
    players: TtlCache<(), Vec<PlayerEntity>>,
    matches: TtlCache<(), Vec<MatchEntity>>,
    sheets: TtlCache<MatchId, Option<MatchSheetEntity>>,
    match_ratings: TtlCache<MatchId, Vec<PlayerRatingEntity>>,
    match_stats: TtlCache<MatchId, Vec<MatchPlayerStatsEntity>>,
    all_ratings: TtlCache<(), Vec<PlayerRatingEntity>>,
    all_stats: TtlCache<(), Vec<MatchPlayerStatsEntity>>,
}

/// [`ClubStore`] decorator caching collection reads.
#[derive(Clone)]
pub struct CachedClubStore {
    inner: Arc<dyn ClubStore>,
    slots: Arc<CacheSlots>,
}

impl CachedClubStore {
    pub fn new(inner: Arc<dyn ClubStore>, ttl: Duration) -> Self {
        let slots = CacheSlots {
            players: TtlCache::new(ttl),
            matches: TtlCache::new(ttl),
            sheets: TtlCache::new(ttl),
            match_ratings: TtlCache::new(ttl),
            match_stats: TtlCache::new(ttl),
            all_ratings: TtlCache::new(ttl),
            all_stats: TtlCache::new(ttl),
        };
        Self {
            inner,
            slots: Arc::new(slots),
        }
    }
}

impl ClubStore for CachedClubStore {
    fn list_players(&self) -> BoxFuture<'static, StorageResult<Vec<PlayerEntity>>> {
        let this = self.clone();
        Box::pin(async move {
            read_through(&this.slots.players, (), || this.inner.list_players()).await
        })
    }

    fn find_player(&self, id: PlayerId) -> BoxFuture<'static, StorageResult<Option<PlayerEntity>>> {
        let this = self.clone();
        Box::pin(async move {
            if let Some(players) = this.slots.players.get(&()) {
                return Ok(players.into_iter().find(|player| player.id == id));
            }
            this.inner.find_player(id).await
        })
    }

    fn save_player(&self, player: PlayerEntity) -> BoxFuture<'static, StorageResult<()>> {
        let this = self.clone();
        Box::pin(async move {
            let result = this.inner.save_player(player).await;
            this.slots.players.invalidate(&());
            result
        })
    }

    fn list_matches(&self) -> BoxFuture<'static, StorageResult<Vec<MatchEntity>>> {
        let this = self.clone();
        Box::pin(async move {
            read_through(&this.slots.matches, (), || this.inner.list_matches()).await
        })
    }

    fn find_match(&self, id: MatchId) -> BoxFuture<'static, StorageResult<Option<MatchEntity>>> {
        let this = self.clone();
        Box::pin(async move {
            if let Some(matches) = this.slots.matches.get(&()) {
                return Ok(matches.into_iter().find(|fixture| fixture.id == id));
            }
            this.inner.find_match(id).await
        })
    }

    fn save_lineup(&self, lineup: SavedLineupEntity) -> BoxFuture<'static, StorageResult<()>> {
        self.inner.save_lineup(lineup)
    }

    fn find_lineup(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<SavedLineupEntity>>> {
        self.inner.find_lineup(id)
    }

    fn list_lineups_for_match(
        &self,
        match_id: MatchId,
    ) -> BoxFuture<'static, StorageResult<Vec<SavedLineupEntity>>> {
        self.inner.list_lineups_for_match(match_id)
    }

    fn find_match_sheet(
        &self,
        match_id: MatchId,
    ) -> BoxFuture<'static, StorageResult<Option<MatchSheetEntity>>> {
        let this = self.clone();
        Box::pin(async move {
            let key = match_id.clone();
            read_through(&this.slots.sheets, key, || {
                this.inner.find_match_sheet(match_id)
            })
            .await
        })
    }

    fn save_match_sheet(&self, sheet: MatchSheetEntity) -> BoxFuture<'static, StorageResult<()>> {
        let this = self.clone();
        Box::pin(async move {
            let match_id = sheet.match_id.clone();
            let result = this.inner.save_match_sheet(sheet).await;
            this.slots.sheets.invalidate(&match_id);
            result
        })
    }

    fn update_match_sheet(
        &self,
        match_id: MatchId,
        patch: MatchSheetPatch,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let this = self.clone();
        Box::pin(async move {
            let result = this.inner.update_match_sheet(match_id.clone(), patch).await;
            this.slots.sheets.invalidate(&match_id);
            result
        })
    }

    fn close_ratings(
        &self,
        match_id: MatchId,
        actor: PlayerId,
        at: SystemTime,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let this = self.clone();
        Box::pin(async move {
            let result = this.inner.close_ratings(match_id.clone(), actor, at).await;
            this.slots.sheets.invalidate(&match_id);
            result
        })
    }

    fn upsert_rating(
        &self,
        rating: PlayerRatingEntity,
    ) -> BoxFuture<'static, StorageResult<RatingWrite>> {
        let this = self.clone();
        Box::pin(async move {
            let match_id = rating.match_id.clone();
            let result = this.inner.upsert_rating(rating).await;
            this.slots.match_ratings.invalidate(&match_id);
            this.slots.all_ratings.invalidate(&());
            result
        })
    }

    fn list_ratings_for_match(
        &self,
        match_id: MatchId,
    ) -> BoxFuture<'static, StorageResult<Vec<PlayerRatingEntity>>> {
        let this = self.clone();
        Box::pin(async move {
            let key = match_id.clone();
            read_through(&this.slots.match_ratings, key, || {
                this.inner.list_ratings_for_match(match_id)
            })
            .await
        })
    }

    fn list_ratings(&self) -> BoxFuture<'static, StorageResult<Vec<PlayerRatingEntity>>> {
        let this = self.clone();
        Box::pin(async move {
            read_through(&this.slots.all_ratings, (), || this.inner.list_ratings()).await
        })
    }

    fn upsert_match_stats(
        &self,
        stats: MatchPlayerStatsEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let this = self.clone();
        Box::pin(async move {
            let match_id = stats.match_id.clone();
            let result = this.inner.upsert_match_stats(stats).await;
            this.slots.match_stats.invalidate(&match_id);
            this.slots.all_stats.invalidate(&());
            result
        })
    }

    fn list_match_stats(
        &self,
        match_id: MatchId,
    ) -> BoxFuture<'static, StorageResult<Vec<MatchPlayerStatsEntity>>> {
        let this = self.clone();
        Box::pin(async move {
            let key = match_id.clone();
            read_through(&this.slots.match_stats, key, || {
                this.inner.list_match_stats(match_id)
            })
            .await
        })
    }

    fn list_all_stats(&self) -> BoxFuture<'static, StorageResult<Vec<MatchPlayerStatsEntity>>> {
        let this = self.clone();
        Box::pin(async move {
            read_through(&this.slots.all_stats, (), || this.inner.list_all_stats()).await
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        self.inner.health_check()
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        self.inner.try_reconnect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use time::macros::date;
    use tokio::sync::oneshot;

    use crate::config::AppConfig;
    use crate::dao::club_store::memory::MemoryClubStore;
    use crate::dao::models::PlayerEntity;
    use crate::dto::{lineup::SaveLineupRequest, rating::SubmitRatingRequest};
    use crate::error::ServiceError;
    use crate::services::{lineup_service, rating_service, sheet_service};
    use crate::squad::{Lineup, Position, SlotKey};
    use crate::state::{AppState, Clock, actor::ActorContext};

    fn player(id: &str, name: &str) -> PlayerEntity {
        PlayerEntity {
            id: id.into(),
            name: name.to_owned(),
            position: Position::Mid,
            rating: 70,
            pace: 70,
            shooting: 70,
            passing: 70,
            dribbling: 70,
            defense: 70,
            physical: 70,
            jersey: None,
            side: None,
            photo: None,
        }
    }

    #[test]
    fn expired_entries_are_evicted_on_read() {
        let cache: TtlCache<&str, u32> = TtlCache::new(Duration::ZERO);
        cache.insert("k", 1);
        assert_eq!(cache.get(&"k"), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn fresh_entries_are_served() {
        let cache: TtlCache<&str, u32> = TtlCache::new(Duration::from_secs(60));
        cache.insert("k", 1);
        assert_eq!(cache.get(&"k"), Some(1));
        cache.invalidate(&"k");
        assert_eq!(cache.len(), 0);
    }

    #[tokio::test]
    async fn reads_are_cached_until_a_write_invalidates_them() {
        let backend = MemoryClubStore::seeded(vec![player("p1", "Before")], Vec::new());
        let cached = CachedClubStore::new(Arc::new(backend.clone()), Duration::from_secs(60));

        assert_eq!(cached.list_players().await.unwrap()[0].name, "Before");

        // Bypass the decorator: the cached copy stays stale.
        backend.save_player(player("p1", "Behind")).await.unwrap();
        assert_eq!(cached.list_players().await.unwrap()[0].name, "Before");

        cached.save_player(player("p1", "After")).await.unwrap();
        assert_eq!(cached.list_players().await.unwrap()[0].name, "After");
    }

    #[tokio::test]
    async fn a_load_overlapping_an_invalidation_is_not_cached() {
        let cache: TtlCache<&str, u32> = TtlCache::new(Duration::from_secs(60));
        let (started_tx, started_rx) = oneshot::channel::<()>();
        let (gate_tx, gate_rx) = oneshot::channel::<()>();

        let read = read_through(&cache, "sheet", move || {
            async move {
                let _ = started_tx.send(());
                let _ = gate_rx.await;
                let stale: StorageResult<u32> = Ok(1);
                stale
            }
            .boxed()
        });
        let write = async {
            let _ = started_rx.await;
            cache.invalidate(&"sheet");
            let _ = gate_tx.send(());
        };
        let (read, ()) = tokio::join!(read, write);

        assert_eq!(read.unwrap(), 1);
        assert_eq!(cache.get(&"sheet"), None);

        let fresh = read_through(&cache, "sheet", || {
            async {
                let fresh: StorageResult<u32> = Ok(2);
                fresh
            }
            .boxed()
        })
        .await;
        assert_eq!(fresh.unwrap(), 2);
        assert_eq!(cache.get(&"sheet"), Some(2));
    }

    #[tokio::test]
    async fn a_stale_open_sheet_cannot_reopen_closed_ratings() {
        let config = AppConfig::default();
        let backend = MemoryClubStore::seeded(
            config.seed_players().to_vec(),
            config.seed_matches().to_vec(),
        );
        let cached = CachedClubStore::new(Arc::new(backend), Duration::from_secs(60));
        let state = AppState::with_store(
            config,
            Arc::new(cached.clone()),
            Clock::Fixed(date!(2025 - 09 - 08)),
        );
        let captain = ActorContext::captain("pD1");

        let lineup: Lineup = [
            ("GK", "pGK"),
            ("CB-L", "pD1"),
            ("CB-C", "pD2"),
            ("CB-R", "pD3"),
            ("CM-L", "pM1"),
            ("CM-R", "pM2"),
            ("ST", "pF1"),
        ]
        .into_iter()
        .map(|(slot, player)| (SlotKey::from(slot), Some(PlayerId::from(player))))
        .collect();
        let saved = lineup_service::save_lineup(
            &state,
            &captain,
            "m1".into(),
            SaveLineupRequest {
                name: "Match day".into(),
                formation: "3-2-1".into(),
                lineup,
                absent: Vec::new(),
            },
        )
        .await
        .unwrap();
        sheet_service::validate_sheet(&state, &captain, "m1".into(), saved.id)
            .await
            .unwrap();

        for rater in ["pD1", "pD2", "pD3", "pM1", "pM2", "pF1", "pGK"] {
            let request = SubmitRatingRequest {
                rated_player_id: if rater == "pGK" { "pF1".into() } else { "pGK".into() },
                rating: 7,
                comment: None,
            };
            rating_service::submit_rating(&state, &ActorContext::member(rater), "m1".into(), request)
                .await
                .unwrap();
        }

        let open = cached.find_match_sheet("m1".into()).await.unwrap();
        assert!(open.as_ref().is_some_and(|sheet| !sheet.ratings_closed));
        sheet_service::close_ratings(&state, &captain, "m1".into())
            .await
            .unwrap();

        // A read that started before the close puts the open sheet back.
        cached.slots.sheets.insert("m1".into(), open);

        let late = SubmitRatingRequest {
            rated_player_id: "pD2".into(),
            rating: 4,
            comment: None,
        };
        let err = rating_service::submit_rating(&state, &ActorContext::member("pM1"), "m1".into(), late)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));

        let stored = cached.inner.list_ratings_for_match("m1".into()).await.unwrap();
        assert_eq!(stored.len(), 7);
        assert!(stored.iter().all(|rating| rating.rating == 7));
    }
}
