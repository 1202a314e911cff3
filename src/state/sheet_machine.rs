//! Lifecycle of a match sheet and the gates it puts on ratings and statistics.
//!
//! Everything here is pure: callers load the records, ask for a decision, and
//! perform the write themselves.

use std::collections::{BTreeSet, HashSet};
use std::time::SystemTime;

use serde::Serialize;
use thiserror::Error;
use time::Date;
use utoipa::ToSchema;

use crate::dao::models::{
    MatchEntity, MatchSheetEntity, MatchSheetPatch, PlayerRatingEntity, SavedLineupEntity,
};
use crate::squad::{MatchId, PlayerId, RosterPlayer, partition};
use crate::state::actor::ActorContext;

/// Distinct raters needed before a captain may close ratings.
pub const RATINGS_QUORUM: usize = 7;

/// Phase of the sheet of one match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SheetPhase {
    /// No sheet yet; lineups are only drafts.
    Draft,
    /// A captain validated a lineup; ratings are open once the match is played.
    Validated,
    /// Ratings are closed for good.
    RatingsClosed,
}

impl SheetPhase {
    pub fn of(sheet: Option<&MatchSheetEntity>) -> Self {
        match sheet {
            None => SheetPhase::Draft,
            Some(sheet) if sheet.ratings_closed => SheetPhase::RatingsClosed,
            Some(_) => SheetPhase::Validated,
        }
    }
}

/// Captain actions that move a sheet between phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetEvent {
    /// Create the sheet, replacing any existing one.
    Validate,
    /// Re-validate an existing sheet with another lineup.
    Update,
    /// Stop accepting ratings.
    CloseRatings,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid transition: {event:?} cannot be applied while in {from:?}")]
pub struct InvalidTransition {
    pub from: SheetPhase,
    pub event: SheetEvent,
}

/// Next phase after `event`, or why it cannot happen.
///
/// Closure survives re-validation: there is no way back to open ratings.
pub fn transition(from: SheetPhase, event: SheetEvent) -> Result<SheetPhase, InvalidTransition> {
    let next = match (from, event) {
        (SheetPhase::Draft | SheetPhase::Validated, SheetEvent::Validate) => SheetPhase::Validated,
        (SheetPhase::Validated, SheetEvent::Update) => SheetPhase::Validated,
        (SheetPhase::RatingsClosed, SheetEvent::Validate | SheetEvent::Update) => {
            SheetPhase::RatingsClosed
        }
        (SheetPhase::Validated, SheetEvent::CloseRatings) => SheetPhase::RatingsClosed,
        (from, event) => return Err(InvalidTransition { from, event }),
    };
    Ok(next)
}

/// Why a sheet, rating, or statistics operation was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SheetError {
    #[error("only a captain may {action}")]
    NotCaptain { action: &'static str },
    #[error("cannot validate a lineup without any assigned player")]
    EmptyLineup,
    #[error("players cannot rate themselves")]
    SelfRating,
    #[error("player `{player}` is not on the match sheet")]
    NotActualPlayer { player: PlayerId },
    #[error("ratings are closed for match `{match_id}`")]
    RatingsClosed { match_id: MatchId },
    #[error("match `{match_id}` is scheduled for {date} and cannot be rated yet")]
    MatchNotPlayed { match_id: MatchId, date: Date },
    #[error("{raters} distinct rater(s) so far, {required} needed to close ratings")]
    QuorumNotReached { raters: usize, required: usize },
    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),
}

impl SheetError {
    /// Authorization failures, as opposed to state conflicts.
    pub fn is_forbidden(&self) -> bool {
        matches!(
            self,
            SheetError::NotCaptain { .. }
                | SheetError::SelfRating
                | SheetError::NotActualPlayer { .. }
        )
    }
}

fn require_captain(actor: &ActorContext, action: &'static str) -> Result<(), SheetError> {
    if actor.is_captain() {
        Ok(())
    } else {
        Err(SheetError::NotCaptain { action })
    }
}

/// Creating or overwriting a sheet: captain only, at least one filled slot.
pub fn authorize_validation(
    actor: &ActorContext,
    current: Option<&MatchSheetEntity>,
    lineup: &SavedLineupEntity,
) -> Result<SheetPhase, SheetError> {
    require_captain(actor, "validate a match sheet")?;
    if lineup.lineup.has_no_starters() {
        return Err(SheetError::EmptyLineup);
    }
    Ok(transition(SheetPhase::of(current), SheetEvent::Validate)?)
}

/// Re-validating an existing sheet: same checks, but the sheet must exist.
pub fn authorize_update(
    actor: &ActorContext,
    current: Option<&MatchSheetEntity>,
    lineup: &SavedLineupEntity,
) -> Result<SheetPhase, SheetError> {
    require_captain(actor, "update a match sheet")?;
    if lineup.lineup.has_no_starters() {
        return Err(SheetError::EmptyLineup);
    }
    Ok(transition(SheetPhase::of(current), SheetEvent::Update)?)
}

/// Number of different players who rated at least once.
pub fn distinct_raters(ratings: &[PlayerRatingEntity]) -> usize {
    ratings
        .iter()
        .map(|rating| &rating.rater_id)
        .collect::<HashSet<_>>()
        .len()
}

/// Closing ratings: captain only, open sheet, quorum reached.
pub fn authorize_close(
    actor: &ActorContext,
    sheet: &MatchSheetEntity,
    ratings: &[PlayerRatingEntity],
) -> Result<(), SheetError> {
    require_captain(actor, "close ratings")?;
    transition(SheetPhase::of(Some(sheet)), SheetEvent::CloseRatings)?;
    let raters = distinct_raters(ratings);
    if raters < RATINGS_QUORUM {
        return Err(SheetError::QuorumNotReached {
            raters,
            required: RATINGS_QUORUM,
        });
    }
    Ok(())
}

/// Rating a teammate. Checks run in a fixed order so the first failure is reported.
pub fn authorize_rating(
    actor: &ActorContext,
    fixture: &MatchEntity,
    sheet: &MatchSheetEntity,
    rated: &PlayerId,
    today: Date,
) -> Result<(), SheetError> {
    if sheet.ratings_closed {
        return Err(SheetError::RatingsClosed {
            match_id: fixture.id.clone(),
        });
    }
    if fixture.date > today {
        return Err(SheetError::MatchNotPlayed {
            match_id: fixture.id.clone(),
            date: fixture.date,
        });
    }
    if actor.is(rated) {
        return Err(SheetError::SelfRating);
    }
    if !sheet.lists(rated) {
        return Err(SheetError::NotActualPlayer {
            player: rated.clone(),
        });
    }
    Ok(())
}

/// Recording match statistics: captain only.
pub fn authorize_stats(actor: &ActorContext) -> Result<(), SheetError> {
    require_captain(actor, "record match statistics")
}

struct Snapshot {
    substitutes: Vec<PlayerId>,
    actual_players: Vec<PlayerId>,
    absent_players: Vec<PlayerId>,
}

fn snapshot(lineup: &SavedLineupEntity, roster: &[RosterPlayer]) -> Snapshot {
    let absent: BTreeSet<PlayerId> = lineup.absent.iter().cloned().collect();
    let split = partition(roster, &lineup.lineup, &absent);
    Snapshot {
        actual_players: split.actual_players(),
        substitutes: split.substitutes,
        absent_players: split.absent,
    }
}

/// Fresh sheet for `lineup`. Closure fields carry over from `previous`.
pub fn build_sheet(
    lineup: &SavedLineupEntity,
    roster: &[RosterPlayer],
    actor: &ActorContext,
    now: SystemTime,
    previous: Option<&MatchSheetEntity>,
) -> MatchSheetEntity {
    let Snapshot {
        substitutes,
        actual_players,
        absent_players,
    } = snapshot(lineup, roster);
    MatchSheetEntity {
        match_id: lineup.match_id.clone(),
        lineup_id: lineup.id,
        lineup_name: lineup.name.clone(),
        formation_at_validation: lineup.formation.clone(),
        starters_by_slot: lineup.lineup.clone(),
        substitutes,
        actual_players,
        absent_players,
        created_by: actor.user_id.clone(),
        created_at: now,
        last_modified_by: None,
        last_modified_at: None,
        ratings_closed: previous.is_some_and(|sheet| sheet.ratings_closed),
        ratings_closed_by: previous.and_then(|sheet| sheet.ratings_closed_by.clone()),
        ratings_closed_at: previous.and_then(|sheet| sheet.ratings_closed_at),
    }
}

/// Patch re-validating an existing sheet with `lineup`.
pub fn build_patch(
    lineup: &SavedLineupEntity,
    roster: &[RosterPlayer],
    actor: &ActorContext,
    now: SystemTime,
) -> MatchSheetPatch {
    let Snapshot {
        substitutes,
        actual_players,
        absent_players,
    } = snapshot(lineup, roster);
    MatchSheetPatch {
        lineup_id: lineup.id,
        lineup_name: lineup.name.clone(),
        formation_at_validation: lineup.formation.clone(),
        starters_by_slot: lineup.lineup.clone(),
        substitutes,
        actual_players,
        absent_players,
        modified_by: actor.user_id.clone(),
        modified_at: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::squad::{Lineup, Position};
    use time::macros::date;
    use uuid::Uuid;

    fn roster() -> Vec<RosterPlayer> {
        vec![
            RosterPlayer::new("gk", Position::Gk),
            RosterPlayer::new("d1", Position::Def),
            RosterPlayer::new("m1", Position::Mid),
            RosterPlayer::new("f1", Position::Fwd),
        ]
    }

    fn saved(lineup: Lineup, absent: Vec<PlayerId>) -> SavedLineupEntity {
        SavedLineupEntity {
            id: Uuid::new_v4(),
            match_id: "m1".into(),
            name: "Match day".into(),
            formation: "mini".into(),
            lineup,
            absent,
            created_by: "d1".into(),
            created_at: SystemTime::UNIX_EPOCH,
        }
    }

    fn two_slot_lineup() -> Lineup {
        [
            ("GK".into(), Some("gk".into())),
            ("ST".into(), Some("f1".into())),
        ]
        .into_iter()
        .collect()
    }

    fn fixture(day: Date) -> MatchEntity {
        MatchEntity {
            id: "m1".into(),
            date: day,
            time: None,
            opponent: "FC Lynx".into(),
            home: true,
            location: "Parc".into(),
            competition: None,
        }
    }

    fn rating_by(rater: &str) -> PlayerRatingEntity {
        PlayerRatingEntity {
            match_id: "m1".into(),
            rater_id: rater.into(),
            rated_id: "gk".into(),
            rating: 7,
            comment: None,
            created_at: SystemTime::UNIX_EPOCH,
            updated_at: SystemTime::UNIX_EPOCH,
        }
    }

    fn validated_sheet() -> MatchSheetEntity {
        let lineup = saved(two_slot_lineup(), vec!["m1".into()]);
        build_sheet(
            &lineup,
            &roster(),
            &ActorContext::captain("d1"),
            SystemTime::UNIX_EPOCH,
            None,
        )
    }

    #[test]
    fn transitions_follow_the_lifecycle() {
        assert_eq!(
            transition(SheetPhase::Draft, SheetEvent::Validate),
            Ok(SheetPhase::Validated)
        );
        assert_eq!(
            transition(SheetPhase::Validated, SheetEvent::CloseRatings),
            Ok(SheetPhase::RatingsClosed)
        );
        assert_eq!(
            transition(SheetPhase::RatingsClosed, SheetEvent::Update),
            Ok(SheetPhase::RatingsClosed)
        );
    }

    #[test]
    fn invalid_transitions_are_rejected() {
        for (from, event) in [
            (SheetPhase::Draft, SheetEvent::Update),
            (SheetPhase::Draft, SheetEvent::CloseRatings),
            (SheetPhase::RatingsClosed, SheetEvent::CloseRatings),
        ] {
            assert_eq!(
                transition(from, event),
                Err(InvalidTransition { from, event })
            );
        }
    }

    #[test]
    fn validation_requires_captain_and_a_filled_slot() {
        let filled = saved(two_slot_lineup(), Vec::new());
        let empty = saved(
            [("GK".into(), None), ("ST".into(), None)].into_iter().collect(),
            Vec::new(),
        );

        assert!(matches!(
            authorize_validation(&ActorContext::member("d1"), None, &filled),
            Err(SheetError::NotCaptain { .. })
        ));
        assert_eq!(
            authorize_validation(&ActorContext::captain("d1"), None, &empty),
            Err(SheetError::EmptyLineup)
        );
        assert_eq!(
            authorize_validation(&ActorContext::captain("d1"), None, &filled),
            Ok(SheetPhase::Validated)
        );
    }

    #[test]
    fn update_needs_an_existing_sheet() {
        let filled = saved(two_slot_lineup(), Vec::new());
        assert!(matches!(
            authorize_update(&ActorContext::captain("d1"), None, &filled),
            Err(SheetError::InvalidTransition(_))
        ));
    }

    #[test]
    fn sheet_lists_starters_then_substitutes() {
        let sheet = validated_sheet();
        assert_eq!(sheet.substitutes, vec![PlayerId::from("d1")]);
        assert_eq!(sheet.absent_players, vec![PlayerId::from("m1")]);
        assert_eq!(
            sheet.actual_players,
            vec![PlayerId::from("gk"), "f1".into(), "d1".into()]
        );
        assert!(!sheet.ratings_closed);
    }

    #[test]
    fn rebuilding_a_closed_sheet_keeps_it_closed() {
        let mut closed = validated_sheet();
        closed.ratings_closed = true;
        closed.ratings_closed_by = Some("d1".into());
        let lineup = saved(two_slot_lineup(), Vec::new());
        let rebuilt = build_sheet(
            &lineup,
            &roster(),
            &ActorContext::captain("gk"),
            SystemTime::UNIX_EPOCH,
            Some(&closed),
        );
        assert!(rebuilt.ratings_closed);
        assert_eq!(rebuilt.ratings_closed_by, Some("d1".into()));
    }

    #[test]
    fn closing_needs_seven_distinct_raters() {
        let sheet = validated_sheet();
        let captain = ActorContext::captain("d1");

        // Repeat ratings from one rater do not count twice.
        let mut ratings: Vec<_> = ["a", "b", "c", "d", "e", "f", "f"]
            .into_iter()
            .map(rating_by)
            .collect();
        assert_eq!(
            authorize_close(&captain, &sheet, &ratings),
            Err(SheetError::QuorumNotReached {
                raters: 6,
                required: RATINGS_QUORUM
            })
        );

        ratings.push(rating_by("g"));
        assert_eq!(authorize_close(&captain, &sheet, &ratings), Ok(()));
        assert!(matches!(
            authorize_close(&ActorContext::member("a"), &sheet, &ratings),
            Err(SheetError::NotCaptain { .. })
        ));
    }

    #[test]
    fn closing_twice_is_a_state_error() {
        let mut sheet = validated_sheet();
        sheet.ratings_closed = true;
        let ratings: Vec<_> = ["a", "b", "c", "d", "e", "f", "g"]
            .into_iter()
            .map(rating_by)
            .collect();
        assert!(matches!(
            authorize_close(&ActorContext::captain("d1"), &sheet, &ratings),
            Err(SheetError::InvalidTransition(_))
        ));
    }

    #[test]
    fn rating_gates_apply_in_order() {
        let sheet = validated_sheet();
        let played = fixture(date!(2025 - 09 - 07));
        let today = date!(2025 - 09 - 07);
        let rater = ActorContext::member("d1");

        assert_eq!(
            authorize_rating(&rater, &played, &sheet, &"gk".into(), today),
            Ok(())
        );
        assert_eq!(
            authorize_rating(&rater, &played, &sheet, &"d1".into(), today),
            Err(SheetError::SelfRating)
        );
        assert_eq!(
            authorize_rating(&rater, &played, &sheet, &"m1".into(), today),
            Err(SheetError::NotActualPlayer {
                player: "m1".into()
            })
        );

        let upcoming = fixture(date!(2025 - 09 - 08));
        assert!(matches!(
            authorize_rating(&rater, &upcoming, &sheet, &"gk".into(), today),
            Err(SheetError::MatchNotPlayed { .. })
        ));

        let mut closed = sheet.clone();
        closed.ratings_closed = true;
        assert!(matches!(
            authorize_rating(&rater, &upcoming, &closed, &"d1".into(), today),
            Err(SheetError::RatingsClosed { .. })
        ));
    }
}
