//! Named lineup presets.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{
    ids::{PlayerId, SlotKey},
    model::Formation,
    roster::DraftSquad,
};

/// A stored lineup shortcut.
///
/// Configuration files may describe a preset either as a bare list of player
/// ids or as an object; that choice is resolved once, when the configuration
/// is loaded, into one of these variants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Preset {
    /// Players listed in slot order: the first id goes to the first slot.
    Ordered {
        players: Vec<PlayerId>,
    },
    /// Explicit slot assignments plus players known to be unavailable.
    Selection {
        #[schema(value_type = Object)]
        starters: IndexMap<SlotKey, PlayerId>,
        #[serde(default)]
        absent: Vec<PlayerId>,
    },
}

impl Preset {
    /// Lay the preset out on `formation`.
    ///
    /// Slots the preset does not cover stay empty, a player listed twice only
    /// keeps their first slot, and absent players never hold a slot.
    pub fn apply(&self, formation: &Formation) -> DraftSquad {
        let mut draft = DraftSquad::new(formation);
        match self {
            Preset::Ordered { players } => {
                for (slot, player) in formation.slots.iter().zip(players) {
                    place(&mut draft, slot.key.clone(), player);
                }
            }
            Preset::Selection { starters, absent } => {
                for slot in &formation.slots {
                    if let Some(player) = starters.get(&slot.key) {
                        place(&mut draft, slot.key.clone(), player);
                    }
                }
                for player in absent {
                    draft.mark_absent(player.clone());
                }
            }
        }
        draft
    }
}

fn place(draft: &mut DraftSquad, slot: SlotKey, player: &PlayerId) {
    if draft.lineup.slot_of(player).is_none() {
        draft.lineup.set(slot, Some(player.clone()));
    }
}
