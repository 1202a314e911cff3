//! Peer ratings: gated submission, listings, and per-match averages.

use std::{collections::HashMap, sync::Arc};

use tracing::{debug, info};

use crate::{
    dao::{
        club_store::ClubStore,
        models::{MatchEntity, MatchSheetEntity, PlayerRatingEntity, RatingWrite},
    },
    dto::{
        rating::{PlayerAverage, RatingReceipt, RatingSummary, RatingView, SubmitRatingRequest},
        round_one_decimal,
    },
    error::ServiceError,
    services::{catalogue_service::require_match, sheet_service::require_sheet},
    squad::{MatchId, PlayerId},
    state::{
        SharedState,
        actor::ActorContext,
        sheet_machine::{self, RATINGS_QUORUM, SheetError},
    },
};

/// Rate a teammate. A second rating for the same teammate replaces the first.
pub async fn submit_rating(
    state: &SharedState,
    actor: &ActorContext,
    match_id: MatchId,
    request: SubmitRatingRequest,
) -> Result<RatingReceipt, ServiceError> {
    let store = state.require_store().await?;
    let (fixture, sheet) = load_gates(&store, match_id).await?;
    submit_one(state, &store, actor, &fixture, &sheet, request).await
}

/// Rate several teammates in one go. Entries are applied in order and the
/// batch stops at the first rejected one; earlier entries stay stored.
pub async fn submit_batch(
    state: &SharedState,
    actor: &ActorContext,
    match_id: MatchId,
    requests: Vec<SubmitRatingRequest>,
) -> Result<Vec<RatingReceipt>, ServiceError> {
    let store = state.require_store().await?;
    let (fixture, sheet) = load_gates(&store, match_id).await?;
    let mut receipts = Vec::with_capacity(requests.len());
    for request in requests {
        receipts.push(submit_one(state, &store, actor, &fixture, &sheet, request).await?);
    }
    Ok(receipts)
}

pub async fn list_ratings(
    state: &SharedState,
    match_id: MatchId,
) -> Result<Vec<RatingView>, ServiceError> {
    let store = state.require_store().await?;
    require_match(&store, match_id.clone()).await?;
    let ratings = store.list_ratings_for_match(match_id).await?;
    Ok(ratings.into_iter().map(Into::into).collect())
}

/// Averages per rated player plus closure quorum progress.
pub async fn summary(
    state: &SharedState,
    match_id: MatchId,
) -> Result<RatingSummary, ServiceError> {
    let store = state.require_store().await?;
    require_match(&store, match_id.clone()).await?;
    let sheet = store.find_match_sheet(match_id.clone()).await?;
    let ratings = store.list_ratings_for_match(match_id.clone()).await?;

    let distinct_raters = sheet_machine::distinct_raters(&ratings);
    Ok(RatingSummary {
        match_id,
        distinct_raters,
        quorum: RATINGS_QUORUM,
        quorum_reached: distinct_raters >= RATINGS_QUORUM,
        ratings_closed: sheet.is_some_and(|sheet| sheet.ratings_closed),
        players: player_averages(&ratings),
    })
}

/// Average received rating per player, best first. Ties keep player id order.
pub(crate) fn player_averages(ratings: &[PlayerRatingEntity]) -> Vec<PlayerAverage> {
    let mut sums: HashMap<&PlayerId, (u32, usize)> = HashMap::new();
    for rating in ratings {
        let entry = sums.entry(&rating.rated_id).or_default();
        entry.0 += u32::from(rating.rating);
        entry.1 += 1;
    }
    let mut averages: Vec<PlayerAverage> = sums
        .into_iter()
        .map(|(player_id, (sum, count))| PlayerAverage {
            player_id: player_id.clone(),
            average: round_one_decimal(f64::from(sum) / count as f64),
            count,
        })
        .collect();
    averages.sort_by(|a, b| {
        b.average
            .total_cmp(&a.average)
            .then_with(|| a.player_id.cmp(&b.player_id))
    });
    averages
}

async fn load_gates(
    store: &Arc<dyn ClubStore>,
    match_id: MatchId,
) -> Result<(MatchEntity, MatchSheetEntity), ServiceError> {
    let fixture = require_match(store, match_id.clone()).await?;
    let sheet = require_sheet(store, match_id).await?;
    Ok((fixture, sheet))
}

async fn submit_one(
    state: &SharedState,
    store: &Arc<dyn ClubStore>,
    actor: &ActorContext,
    fixture: &MatchEntity,
    sheet: &MatchSheetEntity,
    request: SubmitRatingRequest,
) -> Result<RatingReceipt, ServiceError> {
    let rated = request.rated_player_id;
    sheet_machine::authorize_rating(actor, fixture, sheet, &rated, state.today())?;

    let now = state.now();
    let rating = PlayerRatingEntity {
        match_id: fixture.id.clone(),
        rater_id: actor.user_id.clone(),
        rated_id: rated,
        rating: request.rating,
        comment: clean_comment(request.comment),
        created_at: now,
        updated_at: now,
    };
    let overwritten = match store.upsert_rating(rating.clone()).await? {
        RatingWrite::Inserted => false,
        RatingWrite::Updated => true,
        // Closed after the sheet was read: the store refused the write.
        RatingWrite::Closed => {
            return Err(SheetError::RatingsClosed {
                match_id: fixture.id.clone(),
            }
            .into());
        }
    };
    if overwritten {
        debug!(
            match_id = %rating.match_id,
            rater = %rating.rater_id,
            rated = %rating.rated_id,
            "rating overwritten"
        );
    } else {
        info!(
            match_id = %rating.match_id,
            rater = %rating.rater_id,
            rated = %rating.rated_id,
            "rating recorded"
        );
    }
    Ok(RatingReceipt {
        rating: rating.into(),
        overwritten,
    })
}

fn clean_comment(comment: Option<String>) -> Option<String> {
    comment
        .map(|text| text.trim().to_owned())
        .filter(|text| !text.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::SystemTime;

    use time::{Date, macros::date};
    use uuid::Uuid;

    use crate::{
        config::AppConfig,
        dao::{club_store::memory::MemoryClubStore, models::SavedLineupEntity},
        services::sheet_service,
        squad::{Lineup, SlotKey},
        state::{AppState, Clock},
    };

    async fn validated_state(today: Date) -> SharedState {
        let config = AppConfig::default();
        let store: Arc<dyn ClubStore> = Arc::new(MemoryClubStore::seeded(
            config.seed_players().to_vec(),
            config.seed_matches().to_vec(),
        ));
        let state = AppState::with_store(config, store.clone(), Clock::Fixed(today));
        let lineup: Lineup = [("GK", "pGK"), ("CB-L", "pD1"), ("ST", "pF1")]
            .into_iter()
            .map(|(slot, player)| (SlotKey::from(slot), Some(PlayerId::from(player))))
            .collect();
        let saved = SavedLineupEntity {
            id: Uuid::new_v4(),
            match_id: "m1".into(),
            name: "Plan".into(),
            formation: "3-2-1".into(),
            lineup,
            absent: vec!["pM3".into()],
            created_by: "pD1".into(),
            created_at: SystemTime::UNIX_EPOCH,
        };
        store.save_lineup(saved.clone()).await.unwrap();
        sheet_service::validate_sheet(&state, &ActorContext::captain("pD1"), "m1".into(), saved.id)
            .await
            .unwrap();
        state
    }

    fn rating(rated: &str, score: u8, comment: Option<&str>) -> SubmitRatingRequest {
        SubmitRatingRequest {
            rated_player_id: rated.into(),
            rating: score,
            comment: comment.map(str::to_owned),
        }
    }

    #[tokio::test]
    async fn resubmission_overwrites_the_previous_rating() {
        let state = validated_state(date!(2025 - 09 - 07)).await;
        let actor = ActorContext::member("pD2");

        let first = submit_rating(&state, &actor, "m1".into(), rating("pGK", 6, Some("  ")))
            .await
            .unwrap();
        assert!(!first.overwritten);
        assert_eq!(first.rating.comment, None);

        let second = submit_rating(&state, &actor, "m1".into(), rating("pGK", 9, Some(" Wall ")))
            .await
            .unwrap();
        assert!(second.overwritten);

        let stored = list_ratings(&state, "m1".into()).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].rating, 9);
        assert_eq!(stored[0].comment.as_deref(), Some("Wall"));
    }

    #[tokio::test]
    async fn gates_reject_early_self_and_unlisted_ratings() {
        let early = validated_state(date!(2025 - 09 - 06)).await;
        let err = submit_rating(&early, &ActorContext::member("pD2"), "m1".into(), rating("pGK", 7, None))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));

        let state = validated_state(date!(2025 - 09 - 07)).await;
        let err = submit_rating(&state, &ActorContext::member("pGK"), "m1".into(), rating("pGK", 7, None))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));

        let err = submit_rating(&state, &ActorContext::member("pD2"), "m1".into(), rating("pM3", 7, None))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));

        let err = submit_rating(&state, &ActorContext::member("pD2"), "m2".into(), rating("pGK", 7, None))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn batch_stops_at_the_first_rejection() {
        let state = validated_state(date!(2025 - 09 - 07)).await;
        let actor = ActorContext::member("pD2");
        let err = submit_batch(
            &state,
            &actor,
            "m1".into(),
            vec![rating("pGK", 8, None), rating("pD2", 9, None), rating("pF1", 7, None)],
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));

        let stored = list_ratings(&state, "m1".into()).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].rated_player_id, PlayerId::from("pGK"));
    }

    #[tokio::test]
    async fn summary_reports_averages_and_quorum() {
        let state = validated_state(date!(2025 - 09 - 07)).await;
        for (rater, score) in [("pD2", 7), ("pD3", 8), ("pM1", 8)] {
            submit_rating(&state, &ActorContext::member(rater), "m1".into(), rating("pGK", score, None))
                .await
                .unwrap();
        }
        submit_rating(&state, &ActorContext::member("pD2"), "m1".into(), rating("pF1", 9, None))
            .await
            .unwrap();

        let summary = summary(&state, "m1".into()).await.unwrap();
        assert_eq!(summary.distinct_raters, 3);
        assert!(!summary.quorum_reached);
        assert!(!summary.ratings_closed);
        assert_eq!(
            summary.players,
            vec![
                PlayerAverage {
                    player_id: "pF1".into(),
                    average: 9.0,
                    count: 1,
                },
                PlayerAverage {
                    player_id: "pGK".into(),
                    average: 7.7,
                    count: 3,
                },
            ]
        );
    }
}
