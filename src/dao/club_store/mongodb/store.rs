use std::{sync::Arc, time::SystemTime};

use futures::{TryStreamExt, future::BoxFuture};
use mongodb::{
    Client, Collection, Database, IndexModel,
    bson::{Bson, DateTime, Document, doc},
    options::{IndexOptions, ReturnDocument},
};
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use super::{
    config::MongoConfig,
    connection::establish_connection,
    error::{MongoDaoError, MongoResult},
    models::{
        LINEUP_COLLECTION_NAME, MATCH_COLLECTION_NAME, MongoLineupDocument, MongoMatchDocument,
        MongoPlayerDocument, MongoRatingDocument, MongoSheetDocument, MongoStatsDocument,
        PLAYER_COLLECTION_NAME, RATING_COLLECTION_NAME, SHEET_COLLECTION_NAME,
        STATS_COLLECTION_NAME, doc_id, ids_bson, lineup_bson, optional_string, rating_key,
        stats_key,
    },
};
use crate::dao::{
    club_store::ClubStore,
    models::{
        MatchEntity, MatchPlayerStatsEntity, MatchSheetEntity, MatchSheetPatch, PlayerEntity,
        PlayerRatingEntity, RatingWrite, SavedLineupEntity,
    },
    storage::StorageResult,
};
use crate::squad::{MatchId, PlayerId};

#[derive(Clone)]
pub struct MongoClubStore {
    inner: Arc<MongoInner>,
}

struct MongoInner {
    state: RwLock<MongoState>,
    config: MongoConfig,
}

struct MongoState {
    #[allow(dead_code)]
    client: Client,
    database: Database,
}

impl MongoInner {
    async fn ping(&self) -> MongoResult<()> {
        let database = {
            let guard = self.state.read().await;
            guard.database.clone()
        };

        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| MongoDaoError::HealthPing { source })?;
        Ok(())
    }

    async fn reconnect(&self) -> MongoResult<()> {
        let (client, database) =
            establish_connection(&self.config.options, &self.config.database_name).await?;
        let mut guard = self.state.write().await;
        guard.client = client;
        guard.database = database;
        Ok(())
    }
}

impl MongoClubStore {
    /// Establish a connection to MongoDB and ensure indexes are present.
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        let (client, database) =
            establish_connection(&config.options, &config.database_name).await?;

        let inner = Arc::new(MongoInner {
            state: RwLock::new(MongoState { client, database }),
            config,
        });

        let store = Self { inner };
        store.ensure_indexes().await?;
        Ok(store)
    }

    async fn ensure_indexes(&self) -> MongoResult<()> {
        let database = self.database().await;

        let lineups = database.collection::<Document>(LINEUP_COLLECTION_NAME);
        let lineup_index = IndexModel::builder()
            .keys(doc! {"match_id": 1, "created_at": 1})
            .options(
                IndexOptions::builder()
                    .name(Some("lineup_match_idx".to_owned()))
                    .build(),
            )
            .build();
        lineups
            .create_index(lineup_index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: LINEUP_COLLECTION_NAME,
                index: "match_id,created_at",
                source,
            })?;

        // One rating per (match, rater, rated), even if `_id` conventions drift.
        let ratings = database.collection::<Document>(RATING_COLLECTION_NAME);
        let rating_index = IndexModel::builder()
            .keys(doc! {"match_id": 1, "rater_id": 1, "rated_id": 1})
            .options(
                IndexOptions::builder()
                    .name(Some("rating_triple_idx".to_owned()))
                    .unique(Some(true))
                    .build(),
            )
            .build();
        ratings
            .create_index(rating_index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: RATING_COLLECTION_NAME,
                index: "match_id,rater_id,rated_id",
                source,
            })?;

        let stats = database.collection::<Document>(STATS_COLLECTION_NAME);
        let stats_index = IndexModel::builder()
            .keys(doc! {"match_id": 1, "player_id": 1})
            .options(
                IndexOptions::builder()
                    .name(Some("stats_match_player_idx".to_owned()))
                    .unique(Some(true))
                    .build(),
            )
            .build();
        stats
            .create_index(stats_index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: STATS_COLLECTION_NAME,
                index: "match_id,player_id",
                source,
            })?;

        Ok(())
    }

    /// Insert the seed roster and fixtures when the database holds no player yet.
    pub async fn seed_if_empty(
        &self,
        players: Vec<PlayerEntity>,
        matches: Vec<MatchEntity>,
    ) -> MongoResult<bool> {
        let existing = self
            .players()
            .await
            .count_documents(doc! {})
            .await
            .map_err(|source| MongoDaoError::List {
                collection: PLAYER_COLLECTION_NAME,
                source,
            })?;
        if existing > 0 {
            return Ok(false);
        }

        let player_count = players.len();
        let match_count = matches.len();
        for player in players {
            self.save_player(player).await?;
        }
        let fixtures = self.matches().await;
        for fixture in matches {
            let key = fixture.id.to_string();
            let document: MongoMatchDocument = fixture.into();
            fixtures
                .replace_one(doc_id(key.clone()), &document)
                .upsert(true)
                .await
                .map_err(|source| MongoDaoError::Write {
                    collection: MATCH_COLLECTION_NAME,
                    key,
                    source,
                })?;
        }
        info!(players = player_count, matches = match_count, "seeded empty MongoDB database");
        Ok(true)
    }

    async fn database(&self) -> Database {
        let guard = self.inner.state.read().await;
        guard.database.clone()
    }

    async fn players(&self) -> Collection<MongoPlayerDocument> {
        self.database().await.collection(PLAYER_COLLECTION_NAME)
    }

    async fn matches(&self) -> Collection<MongoMatchDocument> {
        self.database().await.collection(MATCH_COLLECTION_NAME)
    }

    async fn lineups(&self) -> Collection<MongoLineupDocument> {
        self.database().await.collection(LINEUP_COLLECTION_NAME)
    }

    async fn sheets(&self) -> Collection<MongoSheetDocument> {
        self.database().await.collection(SHEET_COLLECTION_NAME)
    }

    async fn ratings(&self) -> Collection<MongoRatingDocument> {
        self.database().await.collection(RATING_COLLECTION_NAME)
    }

    async fn stats(&self) -> Collection<MongoStatsDocument> {
        self.database().await.collection(STATS_COLLECTION_NAME)
    }

    async fn list_players(&self) -> MongoResult<Vec<PlayerEntity>> {
        let documents: Vec<MongoPlayerDocument> = self
            .players()
            .await
            .find(doc! {})
            .sort(doc! {"_id": 1})
            .await
            .map_err(|source| MongoDaoError::List {
                collection: PLAYER_COLLECTION_NAME,
                source,
            })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::List {
                collection: PLAYER_COLLECTION_NAME,
                source,
            })?;
        Ok(documents.into_iter().map(Into::into).collect())
    }

    async fn find_player(&self, id: PlayerId) -> MongoResult<Option<PlayerEntity>> {
        let key = id.into_inner();
        let document = self
            .players()
            .await
            .find_one(doc_id(key.clone()))
            .await
            .map_err(|source| MongoDaoError::Read {
                collection: PLAYER_COLLECTION_NAME,
                key,
                source,
            })?;
        Ok(document.map(Into::into))
    }

    async fn save_player(&self, player: PlayerEntity) -> MongoResult<()> {
        let key = player.id.to_string();
        let document: MongoPlayerDocument = player.into();
        self.players()
            .await
            .replace_one(doc_id(key.clone()), &document)
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::Write {
                collection: PLAYER_COLLECTION_NAME,
                key,
                source,
            })?;
        Ok(())
    }

    async fn list_matches(&self) -> MongoResult<Vec<MatchEntity>> {
        let documents: Vec<MongoMatchDocument> = self
            .matches()
            .await
            .find(doc! {})
            .sort(doc! {"date": 1, "_id": 1})
            .await
            .map_err(|source| MongoDaoError::List {
                collection: MATCH_COLLECTION_NAME,
                source,
            })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::List {
                collection: MATCH_COLLECTION_NAME,
                source,
            })?;
        Ok(documents.into_iter().map(Into::into).collect())
    }

    async fn find_match(&self, id: MatchId) -> MongoResult<Option<MatchEntity>> {
        let key = id.into_inner();
        let document = self
            .matches()
            .await
            .find_one(doc_id(key.clone()))
            .await
            .map_err(|source| MongoDaoError::Read {
                collection: MATCH_COLLECTION_NAME,
                key,
                source,
            })?;
        Ok(document.map(Into::into))
    }

    async fn save_lineup(&self, lineup: SavedLineupEntity) -> MongoResult<()> {
        let key = lineup.id.to_string();
        let document: MongoLineupDocument = lineup.into();
        self.lineups()
            .await
            .replace_one(doc_id(key.clone()), &document)
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::Write {
                collection: LINEUP_COLLECTION_NAME,
                key,
                source,
            })?;
        Ok(())
    }

    async fn find_lineup(&self, id: Uuid) -> MongoResult<Option<SavedLineupEntity>> {
        let key = id.to_string();
        let document = self
            .lineups()
            .await
            .find_one(doc_id(key.clone()))
            .await
            .map_err(|source| MongoDaoError::Read {
                collection: LINEUP_COLLECTION_NAME,
                key,
                source,
            })?;
        document.map(TryInto::try_into).transpose()
    }

    async fn list_lineups_for_match(&self, match_id: MatchId) -> MongoResult<Vec<SavedLineupEntity>> {
        let documents: Vec<MongoLineupDocument> = self
            .lineups()
            .await
            .find(doc! {"match_id": match_id.as_str()})
            .sort(doc! {"created_at": 1})
            .await
            .map_err(|source| MongoDaoError::List {
                collection: LINEUP_COLLECTION_NAME,
                source,
            })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::List {
                collection: LINEUP_COLLECTION_NAME,
                source,
            })?;
        documents.into_iter().map(TryInto::try_into).collect()
    }

    async fn find_match_sheet(&self, match_id: MatchId) -> MongoResult<Option<MatchSheetEntity>> {
        let key = match_id.into_inner();
        let document = self
            .sheets()
            .await
            .find_one(doc_id(key.clone()))
            .await
            .map_err(|source| MongoDaoError::Read {
                collection: SHEET_COLLECTION_NAME,
                key,
                source,
            })?;
        document.map(TryInto::try_into).transpose()
    }

    async fn save_match_sheet(&self, sheet: MatchSheetEntity) -> MongoResult<()> {
        let key = sheet.match_id.to_string();
        let document: MongoSheetDocument = sheet.into();
        self.sheets()
            .await
            .replace_one(doc_id(key.clone()), &document)
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::Write {
                collection: SHEET_COLLECTION_NAME,
                key,
                source,
            })?;
        Ok(())
    }

    async fn update_match_sheet(&self, match_id: MatchId, patch: MatchSheetPatch) -> MongoResult<bool> {
        let key = match_id.into_inner();
        let update = doc! {
            "$set": {
                "lineup_id": patch.lineup_id.to_string(),
                "lineup_name": patch.lineup_name,
                "formation_at_validation": patch.formation_at_validation,
                "starters_by_slot": lineup_bson(&patch.starters_by_slot),
                "substitutes": ids_bson(&patch.substitutes),
                "actual_players": ids_bson(&patch.actual_players),
                "absent_players": ids_bson(&patch.absent_players),
                "last_modified_by": patch.modified_by.as_str(),
                "last_modified_at": DateTime::from_system_time(patch.modified_at),
            }
        };
        let result = self
            .sheets()
            .await
            .update_one(doc_id(key.clone()), update)
            .await
            .map_err(|source| MongoDaoError::Write {
                collection: SHEET_COLLECTION_NAME,
                key,
                source,
            })?;
        Ok(result.matched_count > 0)
    }

    async fn close_ratings(&self, match_id: MatchId, actor: PlayerId, at: SystemTime) -> MongoResult<bool> {
        let key = match_id.into_inner();
        // Only an open sheet matches, so concurrent closes cannot both win.
        let filter = doc! {"_id": key.as_str(), "ratings_closed": {"$ne": true}};
        let update = doc! {
            "$set": {
                "ratings_closed": true,
                "ratings_closed_by": actor.as_str(),
                "ratings_closed_at": DateTime::from_system_time(at),
            }
        };
        let result = self
            .sheets()
            .await
            .update_one(filter, update)
            .await
            .map_err(|source| MongoDaoError::Write {
                collection: SHEET_COLLECTION_NAME,
                key,
                source,
            })?;
        Ok(result.modified_count > 0)
    }

    /// True once the sheet of `match_id` has its ratings closed.
    async fn ratings_closed(&self, match_id: &MatchId) -> MongoResult<bool> {
        let key = match_id.as_str().to_owned();
        let closed = self
            .sheets()
            .await
            .count_documents(doc! {"_id": key.as_str(), "ratings_closed": true})
            .await
            .map_err(|source| MongoDaoError::Read {
                collection: SHEET_COLLECTION_NAME,
                key,
                source,
            })?;
        Ok(closed > 0)
    }

    async fn upsert_rating(&self, rating: PlayerRatingEntity) -> MongoResult<RatingWrite> {
        if self.ratings_closed(&rating.match_id).await? {
            return Ok(RatingWrite::Closed);
        }

        let key = rating_key(&rating.match_id, &rating.rater_id, &rating.rated_id);
        let update = doc! {
            "$set": {
                "match_id": rating.match_id.as_str(),
                "rater_id": rating.rater_id.as_str(),
                "rated_id": rating.rated_id.as_str(),
                "rating": i32::from(rating.rating),
                "comment": optional_string(rating.comment.as_deref()),
                "updated_at": DateTime::from_system_time(rating.updated_at),
            },
            "$setOnInsert": {
                "created_at": DateTime::from_system_time(rating.created_at),
            }
        };
        let previous = self
            .ratings()
            .await
            .find_one_and_update(doc_id(key.clone()), update)
            .upsert(true)
            .return_document(ReturnDocument::Before)
            .await
            .map_err(|source| MongoDaoError::Write {
                collection: RATING_COLLECTION_NAME,
                key: key.clone(),
                source,
            })?;

        // A close that landed between the check and the upsert wins: put the
        // rating back the way it was.
        if self.ratings_closed(&rating.match_id).await? {
            self.restore_rating(key, previous).await?;
            return Ok(RatingWrite::Closed);
        }

        Ok(if previous.is_some() {
            RatingWrite::Updated
        } else {
            RatingWrite::Inserted
        })
    }

    async fn restore_rating(
        &self,
        key: String,
        previous: Option<MongoRatingDocument>,
    ) -> MongoResult<()> {
        let ratings = self.ratings().await;
        let restored = match previous {
            Some(document) => ratings
                .replace_one(doc_id(key.clone()), document)
                .await
                .map(|_| ()),
            None => ratings.delete_one(doc_id(key.clone())).await.map(|_| ()),
        };
        restored.map_err(|source| MongoDaoError::Write {
            collection: RATING_COLLECTION_NAME,
            key,
            source,
        })
    }

    async fn list_ratings_matching(&self, filter: Document) -> MongoResult<Vec<PlayerRatingEntity>> {
        let documents: Vec<MongoRatingDocument> = self
            .ratings()
            .await
            .find(filter)
            .sort(doc! {"created_at": 1})
            .await
            .map_err(|source| MongoDaoError::List {
                collection: RATING_COLLECTION_NAME,
                source,
            })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::List {
                collection: RATING_COLLECTION_NAME,
                source,
            })?;
        documents.into_iter().map(TryInto::try_into).collect()
    }

    async fn upsert_match_stats(&self, stats: MatchPlayerStatsEntity) -> MongoResult<()> {
        let key = stats_key(&stats.match_id, &stats.player_id);
        let update = doc! {
            "$set": {
                "match_id": stats.match_id.as_str(),
                "player_id": stats.player_id.as_str(),
                "goals": i32::from(stats.goals),
                "assists": i32::from(stats.assists),
                "yellow_cards": i32::from(stats.yellow_cards),
                "red_cards": i32::from(stats.red_cards),
                "minutes": i32::from(stats.minutes),
                "clean_sheet": stats.clean_sheet,
                "last_modified_by": stats.last_modified_by.as_str(),
                "updated_at": DateTime::from_system_time(stats.updated_at),
            },
            "$setOnInsert": {
                "created_by": Bson::String(stats.created_by.into_inner()),
            }
        };
        self.stats()
            .await
            .update_one(doc_id(key.clone()), update)
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::Write {
                collection: STATS_COLLECTION_NAME,
                key,
                source,
            })?;
        Ok(())
    }

    async fn list_stats_matching(&self, filter: Document) -> MongoResult<Vec<MatchPlayerStatsEntity>> {
        let documents: Vec<MongoStatsDocument> = self
            .stats()
            .await
            .find(filter)
            .sort(doc! {"match_id": 1, "player_id": 1})
            .await
            .map_err(|source| MongoDaoError::List {
                collection: STATS_COLLECTION_NAME,
                source,
            })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::List {
                collection: STATS_COLLECTION_NAME,
                source,
            })?;
        Ok(documents.into_iter().map(Into::into).collect())
    }
}

impl ClubStore for MongoClubStore {
    fn list_players(&self) -> BoxFuture<'static, StorageResult<Vec<PlayerEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_players().await.map_err(Into::into) })
    }

    fn find_player(&self, id: PlayerId) -> BoxFuture<'static, StorageResult<Option<PlayerEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_player(id).await.map_err(Into::into) })
    }

    fn save_player(&self, player: PlayerEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.save_player(player).await.map_err(Into::into) })
    }

    fn list_matches(&self) -> BoxFuture<'static, StorageResult<Vec<MatchEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_matches().await.map_err(Into::into) })
    }

    fn find_match(&self, id: MatchId) -> BoxFuture<'static, StorageResult<Option<MatchEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_match(id).await.map_err(Into::into) })
    }

    fn save_lineup(&self, lineup: SavedLineupEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.save_lineup(lineup).await.map_err(Into::into) })
    }

    fn find_lineup(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<SavedLineupEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_lineup(id).await.map_err(Into::into) })
    }

    fn list_lineups_for_match(
        &self,
        match_id: MatchId,
    ) -> BoxFuture<'static, StorageResult<Vec<SavedLineupEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_lineups_for_match(match_id).await.map_err(Into::into) })
    }

    fn find_match_sheet(
        &self,
        match_id: MatchId,
    ) -> BoxFuture<'static, StorageResult<Option<MatchSheetEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_match_sheet(match_id).await.map_err(Into::into) })
    }

    fn save_match_sheet(&self, sheet: MatchSheetEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.save_match_sheet(sheet).await.map_err(Into::into) })
    }

    fn update_match_sheet(
        &self,
        match_id: MatchId,
        patch: MatchSheetPatch,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .update_match_sheet(match_id, patch)
                .await
                .map_err(Into::into)
        })
    }

    fn close_ratings(
        &self,
        match_id: MatchId,
        actor: PlayerId,
        at: SystemTime,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .close_ratings(match_id, actor, at)
                .await
                .map_err(Into::into)
        })
    }

    fn upsert_rating(
        &self,
        rating: PlayerRatingEntity,
    ) -> BoxFuture<'static, StorageResult<RatingWrite>> {
        let store = self.clone();
        Box::pin(async move { store.upsert_rating(rating).await.map_err(Into::into) })
    }

    fn list_ratings_for_match(
        &self,
        match_id: MatchId,
    ) -> BoxFuture<'static, StorageResult<Vec<PlayerRatingEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .list_ratings_matching(doc! {"match_id": match_id.as_str()})
                .await
                .map_err(Into::into)
        })
    }

    fn list_ratings(&self) -> BoxFuture<'static, StorageResult<Vec<PlayerRatingEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_ratings_matching(doc! {}).await.map_err(Into::into) })
    }

    fn upsert_match_stats(
        &self,
        stats: MatchPlayerStatsEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.upsert_match_stats(stats).await.map_err(Into::into) })
    }

    fn list_match_stats(
        &self,
        match_id: MatchId,
    ) -> BoxFuture<'static, StorageResult<Vec<MatchPlayerStatsEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .list_stats_matching(doc! {"match_id": match_id.as_str()})
                .await
                .map_err(Into::into)
        })
    }

    fn list_all_stats(&self) -> BoxFuture<'static, StorageResult<Vec<MatchPlayerStatsEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_stats_matching(doc! {}).await.map_err(Into::into) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.reconnect().await.map_err(Into::into) })
    }
}
