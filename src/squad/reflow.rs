//! Remap a lineup onto a new formation when the tactical layout changes.
//!
//! The assignment is greedy in two passes over the new slots:
//! 1. every slot takes the first remaining player whose position fits it;
//! 2. slots still open take leftover players in the order they were picked.
//!
//! "Remaining" players are the distinct players of the previous lineup, in
//! its slot order. Pass 2 pops them in that same order, so a re-flow is fully
//! deterministic. The result has an entry for every slot of the new formation.
//! Players that do not fit anywhere are simply left out and fall back to the
//! bench.

use std::collections::HashMap;

use tracing::debug;

use super::{
    ids::PlayerId,
    model::{Lineup, Position, RosterPlayer, Slot},
};

/// Reassign the players of `previous` to `slots`.
pub fn reflow(previous: &Lineup, players: &[RosterPlayer], slots: &[Slot]) -> Lineup {
    let positions: HashMap<&PlayerId, Position> = players
        .iter()
        .map(|player| (&player.id, player.position))
        .collect();

    let mut remaining = previous.starters();
    let mut resolved: Vec<Option<PlayerId>> = vec![None; slots.len()];

    for (index, slot) in slots.iter().enumerate() {
        let native = remaining.iter().position(|player| {
            positions
                .get(player)
                .is_some_and(|position| slot.position.fits(*position))
        });
        if let Some(found) = native {
            resolved[index] = Some(remaining.remove(found));
        }
    }

    let mut leftovers = remaining.into_iter();
    for entry in resolved.iter_mut().filter(|entry| entry.is_none()) {
        match leftovers.next() {
            Some(player) => *entry = Some(player),
            None => break,
        }
    }

    let dropped = leftovers.count();
    if dropped > 0 {
        debug!(dropped, "re-flow left players without a slot");
    }

    slots
        .iter()
        .zip(resolved)
        .map(|(slot, player)| (slot.key.clone(), player))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::squad::{
        ids::SlotKey,
        model::{Position, SlotPosition},
    };

    fn slots(layout: &[(&str, SlotPosition)]) -> Vec<Slot> {
        layout
            .iter()
            .map(|(key, position)| Slot {
                key: SlotKey::from(*key),
                x: 50,
                y: 50,
                position: *position,
            })
            .collect()
    }

    fn three_two_one() -> Vec<Slot> {
        slots(&[
            ("GK", SlotPosition::Gk),
            ("CB-L", SlotPosition::Def),
            ("CB-C", SlotPosition::Def),
            ("CB-R", SlotPosition::Def),
            ("CM-L", SlotPosition::Mid),
            ("CM-R", SlotPosition::Mid),
            ("ST", SlotPosition::Fwd),
        ])
    }

    fn four_two() -> Vec<Slot> {
        slots(&[
            ("GK", SlotPosition::Gk),
            ("LB", SlotPosition::Def),
            ("CB-L", SlotPosition::Def),
            ("CB-R", SlotPosition::Def),
            ("RB", SlotPosition::Def),
            ("ST-L", SlotPosition::Fwd),
            ("ST-R", SlotPosition::Fwd),
        ])
    }

    fn squad() -> Vec<RosterPlayer> {
        vec![
            RosterPlayer::new("GK1", Position::Gk),
            RosterPlayer::new("D1", Position::Def),
            RosterPlayer::new("D2", Position::Def),
            RosterPlayer::new("D3", Position::Def),
            RosterPlayer::new("M1", Position::Mid),
            RosterPlayer::new("M2", Position::Mid),
            RosterPlayer::new("F1", Position::Fwd),
        ]
    }

    fn lineup(entries: &[(&str, Option<&str>)]) -> Lineup {
        entries
            .iter()
            .map(|(slot, player)| (SlotKey::from(*slot), player.map(PlayerId::from)))
            .collect()
    }

    fn at<'a>(lineup: &'a Lineup, slot: &str) -> Option<&'a str> {
        lineup.get(&SlotKey::from(slot)).map(PlayerId::as_str)
    }

    #[test]
    fn every_new_slot_gets_an_entry() {
        let previous = lineup(&[("GK", Some("GK1"))]);
        let next = reflow(&previous, &squad(), &four_two());

        let keys: Vec<&str> = next.slot_keys().map(SlotKey::as_str).collect();
        assert_eq!(keys, ["GK", "LB", "CB-L", "CB-R", "RB", "ST-L", "ST-R"]);
        assert_eq!(next.filled_count(), 1);
        assert!(next.ensure_unique().is_ok());
    }

    #[test]
    fn goalkeeper_follows_the_goalkeeper_slot() {
        let previous = lineup(&[("ST", Some("D1")), ("CB", Some("GK1"))]);
        let target = slots(&[
            ("CB", SlotPosition::Def),
            ("ST", SlotPosition::Fwd),
            ("GK", SlotPosition::Gk),
        ]);

        let next = reflow(&previous, &squad(), &target);

        assert_eq!(at(&next, "GK"), Some("GK1"));
        assert_eq!(at(&next, "CB"), Some("D1"));
        assert_eq!(at(&next, "ST"), None);
    }

    #[test]
    fn switching_three_two_one_to_four_two_fills_every_slot() {
        let previous = lineup(&[
            ("GK", Some("GK1")),
            ("CB-L", Some("D1")),
            ("CB-C", Some("D2")),
            ("CB-R", Some("D3")),
            ("CM-L", Some("M1")),
            ("CM-R", Some("M2")),
            ("ST", Some("F1")),
        ]);

        let next = reflow(&previous, &squad(), &four_two());

        assert_eq!(at(&next, "GK"), Some("GK1"));
        assert_eq!(at(&next, "LB"), Some("D1"));
        assert_eq!(at(&next, "CB-L"), Some("D2"));
        assert_eq!(at(&next, "CB-R"), Some("D3"));
        assert_eq!(at(&next, "ST-L"), Some("F1"));
        // Leftovers in previous slot order: M1 then M2.
        assert_eq!(at(&next, "RB"), Some("M1"));
        assert_eq!(at(&next, "ST-R"), Some("M2"));
        assert_eq!(next.filled_count(), 7);
        assert!(next.ensure_unique().is_ok());
    }

    #[test]
    fn reflow_back_and_forth_keeps_natives_in_place() {
        let previous = lineup(&[
            ("GK", Some("GK1")),
            ("CB-L", Some("D1")),
            ("CB-C", Some("D2")),
            ("CB-R", Some("D3")),
            ("CM-L", Some("M1")),
            ("CM-R", Some("M2")),
            ("ST", Some("F1")),
        ]);
        let there = reflow(&previous, &squad(), &four_two());
        let back = reflow(&there, &squad(), &three_two_one());

        assert_eq!(at(&back, "GK"), Some("GK1"));
        assert_eq!(at(&back, "CM-L"), Some("M1"));
        assert_eq!(at(&back, "CM-R"), Some("M2"));
        assert_eq!(at(&back, "ST"), Some("F1"));
        assert_eq!(back.filled_count(), 7);
    }

    #[test]
    fn extra_players_are_dropped_when_the_formation_shrinks() {
        let previous = lineup(&[
            ("GK", Some("GK1")),
            ("CB-L", Some("D1")),
            ("ST", Some("F1")),
        ]);
        let target = slots(&[("GK", SlotPosition::Gk), ("ST", SlotPosition::Fwd)]);

        let next = reflow(&previous, &squad(), &target);

        assert_eq!(at(&next, "GK"), Some("GK1"));
        assert_eq!(at(&next, "ST"), Some("F1"));
        assert!(next.slot_of(&PlayerId::from("D1")).is_none());
    }

    #[test]
    fn any_slots_take_leftovers_only() {
        let previous = lineup(&[("A", Some("M1")), ("B", Some("F1"))]);
        let target = slots(&[("FLEX", SlotPosition::Any), ("ST", SlotPosition::Fwd)]);

        let next = reflow(&previous, &squad(), &target);

        assert_eq!(at(&next, "ST"), Some("F1"));
        assert_eq!(at(&next, "FLEX"), Some("M1"));
    }

    #[test]
    fn unknown_players_only_fill_leftover_slots() {
        let previous = lineup(&[("X", Some("guest")), ("GK", Some("GK1"))]);
        let target = slots(&[("GK", SlotPosition::Gk), ("CB", SlotPosition::Def)]);

        let next = reflow(&previous, &squad(), &target);

        assert_eq!(at(&next, "GK"), Some("GK1"));
        assert_eq!(at(&next, "CB"), Some("guest"));
    }
}
