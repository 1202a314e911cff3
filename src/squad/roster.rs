//! Roster partitioning: every player is a starter, a substitute, or absent.

use std::collections::{BTreeSet, HashSet};

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{
    ids::{PlayerId, SlotKey},
    model::{Formation, Lineup, LineupError, RosterPlayer},
};

/// Disjoint split of the roster derived from a lineup and an absent set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct RosterPartition {
    /// Players holding a slot, in slot order.
    pub starters: Vec<PlayerId>,
    /// Present but unassigned players, in roster order.
    pub substitutes: Vec<PlayerId>,
    /// Unavailable players, in roster order.
    pub absent: Vec<PlayerId>,
}

impl RosterPartition {
    /// Everyone who could play: starters followed by substitutes.
    pub fn actual_players(&self) -> Vec<PlayerId> {
        self.starters
            .iter()
            .chain(self.substitutes.iter())
            .cloned()
            .collect()
    }
}

/// Split `players` into starters, substitutes, and absentees.
///
/// Absent ids that are not on the roster are dropped.
pub fn partition(
    players: &[RosterPlayer],
    lineup: &Lineup,
    absent: &BTreeSet<PlayerId>,
) -> RosterPartition {
    let starters = lineup.starters();
    let starter_set: HashSet<&PlayerId> = starters.iter().collect();

    let absent: Vec<PlayerId> = players
        .iter()
        .filter(|player| absent.contains(&player.id))
        .map(|player| player.id.clone())
        .collect();
    let absent_set: HashSet<&PlayerId> = absent.iter().collect();

    let substitutes = players
        .iter()
        .filter(|player| !starter_set.contains(&player.id) && !absent_set.contains(&player.id))
        .map(|player| player.id.clone())
        .collect();

    RosterPartition {
        starters,
        substitutes,
        absent,
    }
}

/// Editable lineup draft that keeps absent players out of every slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DraftSquad {
    pub formation: String,
    pub lineup: Lineup,
    #[schema(value_type = Vec<String>)]
    pub absent: BTreeSet<PlayerId>,
}

impl DraftSquad {
    /// Empty draft for `formation`: every slot present and unassigned.
    pub fn new(formation: &Formation) -> Self {
        Self {
            formation: formation.name.clone(),
            lineup: formation.empty_lineup(),
            absent: BTreeSet::new(),
        }
    }

    /// Rebuild a draft from stored parts, clearing slots held by absent players.
    pub fn from_parts(
        formation: impl Into<String>,
        lineup: Lineup,
        absent: impl IntoIterator<Item = PlayerId>,
    ) -> Self {
        let mut draft = Self {
            formation: formation.into(),
            lineup,
            absent: BTreeSet::new(),
        };
        for player in absent {
            draft.mark_absent(player);
        }
        draft
    }

    /// Mark a player absent; any slot they hold becomes empty.
    pub fn mark_absent(&mut self, player: PlayerId) -> Vec<SlotKey> {
        let cleared = self.lineup.clear_player(&player);
        self.absent.insert(player);
        cleared
    }

    /// Make a player available again. They return as a substitute.
    pub fn mark_present(&mut self, player: &PlayerId) -> bool {
        self.absent.remove(player)
    }

    /// Drop `player` into `slot`, the way a drag-and-drop move does.
    ///
    /// The player leaves any other slot they held (including `from`), and stops
    /// being absent. Whoever held `slot` before falls back to the bench.
    pub fn assign(
        &mut self,
        formation: &Formation,
        slot: SlotKey,
        player: PlayerId,
    ) -> Result<(), LineupError> {
        if !formation.contains(&slot) {
            return Err(LineupError::UnknownSlot {
                slot,
                formation: formation.name.clone(),
            });
        }
        self.lineup.clear_player(&player);
        self.absent.remove(&player);
        self.lineup.set(slot, Some(player));
        Ok(())
    }

    /// Empty a slot.
    pub fn unassign(&mut self, slot: &SlotKey) -> Option<PlayerId> {
        let previous = self.lineup.get(slot).cloned();
        if previous.is_some() {
            self.lineup.set(slot.clone(), None);
        }
        previous
    }

    /// Partition the roster against this draft.
    pub fn partition(&self, players: &[RosterPlayer]) -> RosterPartition {
        partition(players, &self.lineup, &self.absent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::squad::model::{Position, Slot, SlotPosition};

    fn roster() -> Vec<RosterPlayer> {
        vec![
            RosterPlayer::new("gk", Position::Gk),
            RosterPlayer::new("d1", Position::Def),
            RosterPlayer::new("d2", Position::Def),
            RosterPlayer::new("m1", Position::Mid),
            RosterPlayer::new("f1", Position::Fwd),
        ]
    }

    fn formation() -> Formation {
        let slot = |key: &str, position| Slot {
            key: SlotKey::from(key),
            x: 50,
            y: 50,
            position,
        };
        Formation {
            name: "2-1".into(),
            slots: vec![
                slot("GK", SlotPosition::Gk),
                slot("CB", SlotPosition::Def),
                slot("ST", SlotPosition::Fwd),
            ],
        }
    }

    fn ids(raw: &[&str]) -> Vec<PlayerId> {
        raw.iter().map(|id| PlayerId::from(*id)).collect()
    }

    fn assert_total_and_disjoint(players: &[RosterPlayer], split: &RosterPartition) {
        let mut all: Vec<&PlayerId> = split
            .starters
            .iter()
            .chain(&split.substitutes)
            .chain(&split.absent)
            .collect();
        let total = all.len();
        all.sort();
        all.dedup();
        assert_eq!(all.len(), total, "sets overlap: {split:?}");
        let mut roster: Vec<&PlayerId> = players.iter().map(|p| &p.id).collect();
        roster.sort();
        assert_eq!(all, roster);
    }

    #[test]
    fn partition_is_total_and_disjoint() {
        let players = roster();
        let mut draft = DraftSquad::new(&formation());
        draft.assign(&formation(), "GK".into(), "gk".into()).unwrap();
        draft.assign(&formation(), "ST".into(), "f1".into()).unwrap();
        draft.mark_absent("d2".into());

        let split = draft.partition(&players);
        assert_eq!(split.starters, ids(&["gk", "f1"]));
        assert_eq!(split.substitutes, ids(&["d1", "m1"]));
        assert_eq!(split.absent, ids(&["d2"]));
        assert_total_and_disjoint(&players, &split);
    }

    #[test]
    fn partition_with_empty_lineup_puts_everyone_on_the_bench() {
        let players = roster();
        let split = partition(&players, &Lineup::new(), &BTreeSet::new());
        assert!(split.starters.is_empty());
        assert!(split.absent.is_empty());
        assert_eq!(split.substitutes.len(), players.len());
    }

    #[test]
    fn absent_ids_outside_the_roster_are_ignored() {
        let players = roster();
        let absent: BTreeSet<PlayerId> = ids(&["ghost", "m1"]).into_iter().collect();
        let split = partition(&players, &Lineup::new(), &absent);
        assert_eq!(split.absent, ids(&["m1"]));
        assert_total_and_disjoint(&players, &split);
    }

    #[test]
    fn marking_a_starter_absent_clears_their_slot() {
        let players = roster();
        let mut draft = DraftSquad::new(&formation());
        draft.assign(&formation(), "CB".into(), "d1".into()).unwrap();

        let cleared = draft.mark_absent("d1".into());

        assert_eq!(cleared, vec![SlotKey::from("CB")]);
        assert_eq!(draft.lineup.get(&SlotKey::from("CB")), None);
        let split = draft.partition(&players);
        assert!(split.absent.contains(&PlayerId::from("d1")));
        assert!(!split.starters.contains(&PlayerId::from("d1")));
        assert_total_and_disjoint(&players, &split);
    }

    #[test]
    fn moving_a_player_leaves_their_previous_slot_empty() {
        let mut draft = DraftSquad::new(&formation());
        draft.assign(&formation(), "CB".into(), "m1".into()).unwrap();
        draft.assign(&formation(), "ST".into(), "m1".into()).unwrap();

        assert_eq!(draft.lineup.get(&SlotKey::from("CB")), None);
        assert_eq!(draft.lineup.get(&SlotKey::from("ST")), Some(&PlayerId::from("m1")));
        assert!(draft.lineup.ensure_unique().is_ok());
    }

    #[test]
    fn assigning_an_absent_player_brings_them_back() {
        let mut draft = DraftSquad::new(&formation());
        draft.mark_absent("gk".into());
        draft.assign(&formation(), "GK".into(), "gk".into()).unwrap();
        assert!(draft.absent.is_empty());
    }

    #[test]
    fn assigning_to_an_unknown_slot_fails() {
        let mut draft = DraftSquad::new(&formation());
        let err = draft
            .assign(&formation(), "LW".into(), "f1".into())
            .unwrap_err();
        assert!(matches!(err, LineupError::UnknownSlot { .. }));
    }

    #[test]
    fn from_parts_clears_absent_starters() {
        let lineup: Lineup = [
            (SlotKey::from("GK"), Some(PlayerId::from("gk"))),
            (SlotKey::from("ST"), Some(PlayerId::from("f1"))),
        ]
        .into_iter()
        .collect();
        let draft = DraftSquad::from_parts("2-1", lineup, ids(&["f1"]));
        assert_eq!(draft.lineup.get(&SlotKey::from("ST")), None);
        assert_eq!(draft.lineup.starters(), ids(&["gk"]));
    }
}
