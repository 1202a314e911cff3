pub mod memory;
#[cfg(feature = "mongo-store")]
pub mod mongodb;

use std::time::SystemTime;

use futures::future::BoxFuture;
use uuid::Uuid;

use crate::dao::models::{
    MatchEntity, MatchPlayerStatsEntity, MatchSheetEntity, MatchSheetPatch, PlayerEntity,
    PlayerRatingEntity, RatingWrite, SavedLineupEntity,
};
use crate::dao::storage::StorageResult;
use crate::squad::{MatchId, PlayerId};

/// Abstraction over the document store holding the club's data.
///
/// Writes that guard an invariant are single conditional operations on the
/// backend: rating upserts are keyed by (match, rater, rated), closing ratings
/// only flips an open sheet, and sheet updates never touch closure fields.
pub trait ClubStore: Send + Sync {
    fn list_players(&self) -> BoxFuture<'static, StorageResult<Vec<PlayerEntity>>>;
    fn find_player(&self, id: PlayerId) -> BoxFuture<'static, StorageResult<Option<PlayerEntity>>>;
    fn save_player(&self, player: PlayerEntity) -> BoxFuture<'static, StorageResult<()>>;

    fn list_matches(&self) -> BoxFuture<'static, StorageResult<Vec<MatchEntity>>>;
    fn find_match(&self, id: MatchId) -> BoxFuture<'static, StorageResult<Option<MatchEntity>>>;

    fn save_lineup(&self, lineup: SavedLineupEntity) -> BoxFuture<'static, StorageResult<()>>;
    fn find_lineup(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<SavedLineupEntity>>>;
    fn list_lineups_for_match(
        &self,
        match_id: MatchId,
    ) -> BoxFuture<'static, StorageResult<Vec<SavedLineupEntity>>>;

    fn find_match_sheet(
        &self,
        match_id: MatchId,
    ) -> BoxFuture<'static, StorageResult<Option<MatchSheetEntity>>>;
    /// Create the sheet of a match, replacing any previous one.
    fn save_match_sheet(&self, sheet: MatchSheetEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Apply a patch to an existing sheet. Returns `false` when no sheet exists.
    fn update_match_sheet(
        &self,
        match_id: MatchId,
        patch: MatchSheetPatch,
    ) -> BoxFuture<'static, StorageResult<bool>>;
    /// Close ratings if they are still open. Returns `false` when nothing changed.
    fn close_ratings(
        &self,
        match_id: MatchId,
        actor: PlayerId,
        at: SystemTime,
    ) -> BoxFuture<'static, StorageResult<bool>>;

    /// Insert or overwrite the rating of (match, rater, rated) in one write.
    ///
    /// The write is refused with [`RatingWrite::Closed`] when the sheet of the
    /// match has its ratings closed, however recently.
    fn upsert_rating(
        &self,
        rating: PlayerRatingEntity,
    ) -> BoxFuture<'static, StorageResult<RatingWrite>>;
    fn list_ratings_for_match(
        &self,
        match_id: MatchId,
    ) -> BoxFuture<'static, StorageResult<Vec<PlayerRatingEntity>>>;
    fn list_ratings(&self) -> BoxFuture<'static, StorageResult<Vec<PlayerRatingEntity>>>;

    /// Insert or overwrite the counters of (match, player), keeping the original author.
    fn upsert_match_stats(
        &self,
        stats: MatchPlayerStatsEntity,
    ) -> BoxFuture<'static, StorageResult<()>>;
    fn list_match_stats(
        &self,
        match_id: MatchId,
    ) -> BoxFuture<'static, StorageResult<Vec<MatchPlayerStatsEntity>>>;
    fn list_all_stats(&self) -> BoxFuture<'static, StorageResult<Vec<MatchPlayerStatsEntity>>>;

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
