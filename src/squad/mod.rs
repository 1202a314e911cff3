//! Pure lineup logic: roster partitioning, formation re-flow, and presets.

/// String identifiers for players, matches, and slots.
pub mod ids;
/// Positions, slots, formations, and lineups.
pub mod model;
/// Named lineup presets.
pub mod preset;
/// Formation change re-flow.
pub mod reflow;
/// Starter / substitute / absent partitioning.
pub mod roster;

pub use ids::{MatchId, PlayerId, SlotKey};
pub use model::{Formation, Lineup, LineupError, Position, RosterPlayer, Slot, SlotPosition};
pub use preset::Preset;
pub use reflow::reflow;
pub use roster::{DraftSquad, RosterPartition, partition};
