use std::collections::HashSet;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use super::ids::{PlayerId, SlotKey};

/// Playing position of a player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum Position {
    /// Goalkeeper.
    Gk,
    /// Defender.
    Def,
    /// Midfielder.
    Mid,
    /// Forward.
    Fwd,
}

/// Position category a formation slot asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum SlotPosition {
    /// Goalkeeper slot.
    Gk,
    /// Defender slot.
    Def,
    /// Midfielder slot.
    Mid,
    /// Forward slot.
    Fwd,
    /// Slot open to any position.
    Any,
}

impl SlotPosition {
    /// Whether a player of `position` is a native fit for this slot.
    ///
    /// `Any` slots have no native fit: they are only filled with leftovers.
    pub fn fits(self, position: Position) -> bool {
        matches!(
            (self, position),
            (SlotPosition::Gk, Position::Gk)
                | (SlotPosition::Def, Position::Def)
                | (SlotPosition::Mid, Position::Mid)
                | (SlotPosition::Fwd, Position::Fwd)
        )
    }
}

/// A tactical slot of a formation. `x`/`y` are display coordinates (percent of the pitch).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Slot {
    pub key: SlotKey,
    pub x: u8,
    pub y: u8,
    pub position: SlotPosition,
}

/// Named, ordered set of slots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Formation {
    pub name: String,
    pub slots: Vec<Slot>,
}

impl Formation {
    /// Look up a slot by key.
    pub fn slot(&self, key: &SlotKey) -> Option<&Slot> {
        self.slots.iter().find(|slot| &slot.key == key)
    }

    /// Whether the formation defines `key`.
    pub fn contains(&self, key: &SlotKey) -> bool {
        self.slot(key).is_some()
    }

    /// A lineup with an empty entry for every slot, in slot order.
    pub fn empty_lineup(&self) -> Lineup {
        Lineup(
            self.slots
                .iter()
                .map(|slot| (slot.key.clone(), None))
                .collect(),
        )
    }
}

/// The minimal view of a player the lineup logic needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterPlayer {
    pub id: PlayerId,
    pub position: Position,
}

impl RosterPlayer {
    /// Build a roster entry.
    pub fn new(id: impl Into<PlayerId>, position: Position) -> Self {
        Self {
            id: id.into(),
            position,
        }
    }
}

/// Errors raised when a lineup breaks its structural invariants.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LineupError {
    /// The same player was placed in two slots.
    #[error("player `{player}` is assigned to both `{first}` and `{second}`")]
    DoubleBooked {
        player: PlayerId,
        first: SlotKey,
        second: SlotKey,
    },
    /// A slot key does not belong to the formation.
    #[error("slot `{slot}` does not exist in formation `{formation}`")]
    UnknownSlot { slot: SlotKey, formation: String },
}

/// Slot key to player mapping, ordered like the formation it was built for.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
#[schema(value_type = Object)]
pub struct Lineup(IndexMap<SlotKey, Option<PlayerId>>);

#[allow(clippy::len_without_is_empty)]
impl Lineup {
    /// An empty lineup with no slot entries.
    pub fn new() -> Self {
        Self::default()
    }

    /// Player currently assigned to `slot`.
    pub fn get(&self, slot: &SlotKey) -> Option<&PlayerId> {
        self.0.get(slot).and_then(Option::as_ref)
    }

    /// Set (or clear) the player of a slot, keeping the slot's position in the order.
    pub fn set(&mut self, slot: SlotKey, player: Option<PlayerId>) {
        self.0.insert(slot, player);
    }

    /// Iterate over every slot entry in order.
    pub fn iter(&self) -> impl Iterator<Item = (&SlotKey, Option<&PlayerId>)> {
        self.0.iter().map(|(slot, player)| (slot, player.as_ref()))
    }

    /// Slot keys present in the lineup.
    pub fn slot_keys(&self) -> impl Iterator<Item = &SlotKey> {
        self.0.keys()
    }

    /// Number of slot entries (filled or not).
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when no slot holds a player, however many slot entries exist.
    pub fn has_no_starters(&self) -> bool {
        self.0.values().all(Option::is_none)
    }

    /// Number of filled slots.
    pub fn filled_count(&self) -> usize {
        self.0.values().filter(|player| player.is_some()).count()
    }

    /// Distinct assigned players, in slot order.
    pub fn starters(&self) -> Vec<PlayerId> {
        let mut seen = HashSet::new();
        self.0
            .values()
            .flatten()
            .filter(|player| seen.insert((*player).clone()))
            .cloned()
            .collect()
    }

    /// Slot holding `player`, if any.
    pub fn slot_of(&self, player: &PlayerId) -> Option<&SlotKey> {
        self.0
            .iter()
            .find(|(_, assigned)| assigned.as_ref() == Some(player))
            .map(|(slot, _)| slot)
    }

    /// Empty every slot holding `player` and return the cleared slot keys.
    pub fn clear_player(&mut self, player: &PlayerId) -> Vec<SlotKey> {
        let mut cleared = Vec::new();
        for (slot, assigned) in self.0.iter_mut() {
            if assigned.as_ref() == Some(player) {
                *assigned = None;
                cleared.push(slot.clone());
            }
        }
        cleared
    }

    /// Reject lineups that place one player in several slots.
    pub fn ensure_unique(&self) -> Result<(), LineupError> {
        let mut seen: Vec<(&PlayerId, &SlotKey)> = Vec::new();
        for (slot, player) in self.iter() {
            let Some(player) = player else { continue };
            if let Some((_, first)) = seen.iter().find(|(existing, _)| *existing == player) {
                return Err(LineupError::DoubleBooked {
                    player: player.clone(),
                    first: (*first).clone(),
                    second: slot.clone(),
                });
            }
            seen.push((player, slot));
        }
        Ok(())
    }

    /// Reject lineups that reference slots unknown to `formation`.
    pub fn ensure_fits(&self, formation: &Formation) -> Result<(), LineupError> {
        match self.slot_keys().find(|slot| !formation.contains(slot)) {
            Some(slot) => Err(LineupError::UnknownSlot {
                slot: slot.clone(),
                formation: formation.name.clone(),
            }),
            None => Ok(()),
        }
    }
}

impl FromIterator<(SlotKey, Option<PlayerId>)> for Lineup {
    fn from_iter<T: IntoIterator<Item = (SlotKey, Option<PlayerId>)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lineup(entries: &[(&str, Option<&str>)]) -> Lineup {
        entries
            .iter()
            .map(|(slot, player)| (SlotKey::from(*slot), player.map(PlayerId::from)))
            .collect()
    }

    #[test]
    fn starters_are_distinct_and_in_slot_order() {
        let l = lineup(&[("GK", Some("g")), ("CB", None), ("ST", Some("f"))]);
        assert_eq!(l.starters(), vec![PlayerId::from("g"), PlayerId::from("f")]);
        assert_eq!(l.filled_count(), 2);
        assert!(!l.has_no_starters());
    }

    #[test]
    fn unassigned_slots_hold_no_starters() {
        let l = lineup(&[("GK", None), ("ST", None)]);
        assert_eq!(l.len(), 2);
        assert!(l.has_no_starters());
        assert!(Lineup::new().has_no_starters());
    }

    #[test]
    fn double_booking_is_reported_with_both_slots() {
        let l = lineup(&[("GK", Some("a")), ("CB", Some("b")), ("ST", Some("a"))]);
        assert_eq!(
            l.ensure_unique(),
            Err(LineupError::DoubleBooked {
                player: PlayerId::from("a"),
                first: SlotKey::from("GK"),
                second: SlotKey::from("ST"),
            })
        );
    }

    #[test]
    fn clear_player_empties_every_slot_of_that_player() {
        let mut l = lineup(&[("GK", Some("a")), ("ST", Some("a")), ("CB", Some("b"))]);
        let cleared = l.clear_player(&PlayerId::from("a"));
        assert_eq!(cleared, vec![SlotKey::from("GK"), SlotKey::from("ST")]);
        assert_eq!(l.get(&SlotKey::from("GK")), None);
        assert_eq!(l.get(&SlotKey::from("CB")), Some(&PlayerId::from("b")));
    }

    #[test]
    fn any_slot_has_no_native_fit() {
        assert!(SlotPosition::Gk.fits(Position::Gk));
        assert!(!SlotPosition::Def.fits(Position::Mid));
        assert!(!SlotPosition::Any.fits(Position::Fwd));
    }

    #[test]
    fn lineup_serializes_as_ordered_object_with_nulls() {
        let l = lineup(&[("ST", Some("f")), ("GK", None)]);
        assert_eq!(
            serde_json::to_string(&l).unwrap(),
            r#"{"ST":"f","GK":null}"#
        );
    }
}
