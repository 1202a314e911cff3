//! Lineup drafting: partitioning, re-flow, presets, drag-and-drop moves, and saved drafts.

use std::collections::HashSet;

use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    dao::models::SavedLineupEntity,
    dto::lineup::{
        AssignRequest, DraftResponse, PartitionRequest, PresetRequest, ReflowRequest,
        SaveLineupRequest, SavedLineupResponse,
    },
    error::ServiceError,
    services::catalogue_service::{require_formation, require_match, roster},
    squad::{DraftSquad, Formation, Lineup, MatchId, PlayerId, RosterPlayer, reflow},
    state::{SharedState, actor::ActorContext},
};

/// Split the roster against a draft. Absent players are cleared from their slots first.
pub async fn partition(
    state: &SharedState,
    request: PartitionRequest,
) -> Result<DraftResponse, ServiceError> {
    let formation = require_formation(state, &request.formation)?;
    let store = state.require_store().await?;
    let players = roster(&store).await?;

    let lineup = normalize(formation, request.lineup)?;
    let draft = DraftSquad::from_parts(&formation.name, lineup, request.absent);
    Ok(respond(draft, &players))
}

/// Move a draft onto another formation.
pub async fn reflow_lineup(
    state: &SharedState,
    request: ReflowRequest,
) -> Result<DraftResponse, ServiceError> {
    let target = require_formation(state, &request.to_formation)?;
    let store = state.require_store().await?;
    let players = roster(&store).await?;

    request.lineup.ensure_unique()?;
    let previous = DraftSquad::from_parts(&target.name, request.lineup, request.absent);
    let lineup = reflow(&previous.lineup, &players, &target.slots);
    debug!(
        formation = %target.name,
        placed = lineup.filled_count(),
        "lineup re-flowed"
    );
    let draft = DraftSquad {
        lineup,
        ..previous
    };
    Ok(respond(draft, &players))
}

/// Lay a configured preset out on a formation.
pub async fn apply_preset(
    state: &SharedState,
    request: PresetRequest,
) -> Result<DraftResponse, ServiceError> {
    let config = state.config();
    let preset = config
        .preset(&request.preset)
        .ok_or_else(|| ServiceError::NotFound(format!("preset `{}` not found", request.preset)))?;
    let formation_name = request
        .formation
        .as_deref()
        .unwrap_or_else(|| config.default_formation());
    let formation = require_formation(state, formation_name)?;
    let store = state.require_store().await?;
    let players = roster(&store).await?;

    let draft = preset.apply(formation);
    Ok(respond(draft, &players))
}

/// Drop a player into a slot, the way the lineup builder's drag-and-drop does.
pub async fn assign(
    state: &SharedState,
    request: AssignRequest,
) -> Result<DraftResponse, ServiceError> {
    let formation = require_formation(state, &request.formation)?;
    let store = state.require_store().await?;
    let players = roster(&store).await?;
    ensure_known(&players, std::iter::once(&request.player))?;

    let lineup = normalize(formation, request.lineup)?;
    let mut draft = DraftSquad::from_parts(&formation.name, lineup, request.absent);
    draft.assign(formation, request.slot, request.player)?;
    Ok(respond(draft, &players))
}

/// Persist a named draft for a match. Any authenticated user may save one.
pub async fn save_lineup(
    state: &SharedState,
    actor: &ActorContext,
    match_id: MatchId,
    request: SaveLineupRequest,
) -> Result<SavedLineupResponse, ServiceError> {
    let formation = require_formation(state, &request.formation)?;
    let store = state.require_store().await?;
    require_match(&store, match_id.clone()).await?;
    let players = roster(&store).await?;

    let lineup = normalize(formation, request.lineup)?;
    ensure_known(
        &players,
        lineup
            .iter()
            .filter_map(|(_, player)| player)
            .chain(request.absent.iter()),
    )?;
    let draft = DraftSquad::from_parts(&formation.name, lineup, request.absent);

    let entity = SavedLineupEntity {
        id: Uuid::new_v4(),
        match_id: match_id.clone(),
        name: request.name.trim().to_owned(),
        formation: draft.formation,
        lineup: draft.lineup,
        absent: draft.absent.into_iter().collect(),
        created_by: actor.user_id.clone(),
        created_at: state.now(),
    };
    store.save_lineup(entity.clone()).await?;
    info!(
        match_id = %match_id,
        lineup_id = %entity.id,
        actor = %actor.user_id,
        starters = entity.lineup.filled_count(),
        "lineup saved"
    );
    Ok(entity.into())
}

pub async fn list_lineups(
    state: &SharedState,
    match_id: MatchId,
) -> Result<Vec<SavedLineupResponse>, ServiceError> {
    let store = state.require_store().await?;
    require_match(&store, match_id.clone()).await?;
    let lineups = store.list_lineups_for_match(match_id).await?;
    Ok(lineups.into_iter().map(Into::into).collect())
}

/// Check a lineup against `formation` and lay it out with an entry per slot, in slot order.
fn normalize(formation: &Formation, lineup: Lineup) -> Result<Lineup, ServiceError> {
    lineup.ensure_fits(formation)?;
    lineup.ensure_unique()?;
    let mut normalized = formation.empty_lineup();
    for (slot, player) in lineup.iter() {
        normalized.set(slot.clone(), player.cloned());
    }
    Ok(normalized)
}

fn ensure_known<'a>(
    players: &[RosterPlayer],
    ids: impl IntoIterator<Item = &'a PlayerId>,
) -> Result<(), ServiceError> {
    let known: HashSet<&PlayerId> = players.iter().map(|player| &player.id).collect();
    match ids.into_iter().find(|id| !known.contains(id)) {
        Some(unknown) => Err(ServiceError::InvalidInput(format!(
            "unknown player `{unknown}`"
        ))),
        None => Ok(()),
    }
}

fn respond(draft: DraftSquad, players: &[RosterPlayer]) -> DraftResponse {
    let split = draft.partition(players);
    DraftResponse::new(draft, split)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use time::macros::date;

    use crate::{
        config::AppConfig,
        dao::club_store::memory::MemoryClubStore,
        squad::SlotKey,
        state::{AppState, Clock},
    };

    fn state() -> SharedState {
        let config = AppConfig::default();
        let store = MemoryClubStore::seeded(
            config.seed_players().to_vec(),
            config.seed_matches().to_vec(),
        );
        AppState::with_store(config, Arc::new(store), Clock::Fixed(date!(2025 - 09 - 08)))
    }

    fn lineup(pairs: &[(&str, &str)]) -> Lineup {
        pairs
            .iter()
            .map(|(slot, player)| (SlotKey::from(*slot), Some(PlayerId::from(*player))))
            .collect()
    }

    fn ids(raw: &[&str]) -> Vec<PlayerId> {
        raw.iter().map(|id| PlayerId::from(*id)).collect()
    }

    #[tokio::test]
    async fn absent_starter_loses_their_slot() {
        let state = state();
        let response = partition(
            &state,
            PartitionRequest {
                formation: "3-2-1".into(),
                lineup: lineup(&[("GK", "pGK"), ("ST", "pF1")]),
                absent: ids(&["pF1"]),
            },
        )
        .await
        .unwrap();

        assert_eq!(response.lineup.get(&SlotKey::from("ST")), None);
        assert_eq!(response.lineup.len(), 7);
        assert_eq!(response.starters, ids(&["pGK"]));
        assert_eq!(response.absent, ids(&["pF1"]));
        assert_eq!(response.substitutes.len(), 7);
    }

    #[tokio::test]
    async fn reflow_keeps_the_keeper_in_goal() {
        let state = state();
        let response = reflow_lineup(
            &state,
            ReflowRequest {
                lineup: lineup(&[
                    ("GK", "pGK"),
                    ("CB-L", "pD1"),
                    ("CM-L", "pM1"),
                    ("ST", "pF1"),
                ]),
                to_formation: "4-2".into(),
                absent: Vec::new(),
            },
        )
        .await
        .unwrap();

        assert_eq!(response.formation, "4-2");
        assert_eq!(response.lineup.get(&SlotKey::from("GK")), Some(&PlayerId::from("pGK")));
        assert_eq!(response.lineup.get(&SlotKey::from("LB")), Some(&PlayerId::from("pD1")));
        assert_eq!(response.lineup.get(&SlotKey::from("ST-L")), Some(&PlayerId::from("pF1")));
        assert_eq!(response.lineup.len(), 7);
        assert_eq!(response.starters.len(), 4);
    }

    #[tokio::test]
    async fn preset_defaults_to_the_configured_formation() {
        let state = state();
        let response = apply_preset(
            &state,
            PresetRequest {
                preset: "TOP_TEAM".into(),
                formation: None,
            },
        )
        .await
        .unwrap();
        assert_eq!(response.formation, "3-2-1");
        assert_eq!(response.starters.len(), 7);
        assert_eq!(response.substitutes, ids(&["pF2", "pM3"]));

        let missing = apply_preset(
            &state,
            PresetRequest {
                preset: "NOPE".into(),
                formation: None,
            },
        )
        .await;
        assert!(matches!(missing, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn assign_moves_a_player_and_brings_them_back_from_absence() {
        let state = state();
        let response = assign(
            &state,
            AssignRequest {
                formation: "3-2-1".into(),
                lineup: lineup(&[("CM-L", "pM1")]),
                absent: ids(&["pM2"]),
                slot: "CM-R".into(),
                player: "pM1".into(),
            },
        )
        .await
        .unwrap();
        assert_eq!(response.lineup.get(&SlotKey::from("CM-L")), None);
        assert_eq!(response.lineup.get(&SlotKey::from("CM-R")), Some(&PlayerId::from("pM1")));

        let back = assign(
            &state,
            AssignRequest {
                formation: "3-2-1".into(),
                lineup: Lineup::new(),
                absent: ids(&["pM2"]),
                slot: "CM-L".into(),
                player: "pM2".into(),
            },
        )
        .await
        .unwrap();
        assert!(back.absent.is_empty());
        assert_eq!(back.starters, ids(&["pM2"]));
    }

    #[tokio::test]
    async fn saving_rejects_bad_drafts() {
        let state = state();
        let actor = ActorContext::member("pD1");
        let request = |formation: &str, lineup: Lineup| SaveLineupRequest {
            name: "Plan A".into(),
            formation: formation.into(),
            lineup,
            absent: Vec::new(),
        };

        let unknown_formation =
            save_lineup(&state, &actor, "m1".into(), request("5-5", Lineup::new())).await;
        assert!(matches!(unknown_formation, Err(ServiceError::InvalidInput(_))));

        let unknown_slot = save_lineup(
            &state,
            &actor,
            "m1".into(),
            request("4-2", lineup(&[("CM-L", "pM1")])),
        )
        .await;
        assert!(matches!(unknown_slot, Err(ServiceError::InvalidInput(_))));

        let double_booked = save_lineup(
            &state,
            &actor,
            "m1".into(),
            request("3-2-1", lineup(&[("CM-L", "pM1"), ("CM-R", "pM1")])),
        )
        .await;
        assert!(matches!(double_booked, Err(ServiceError::InvalidInput(_))));

        let unknown_player = save_lineup(
            &state,
            &actor,
            "m1".into(),
            request("3-2-1", lineup(&[("GK", "ghost")])),
        )
        .await;
        assert!(matches!(unknown_player, Err(ServiceError::InvalidInput(_))));

        let unknown_match =
            save_lineup(&state, &actor, "m404".into(), request("3-2-1", Lineup::new())).await;
        assert!(matches!(unknown_match, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn saved_drafts_are_listed_per_match() {
        let state = state();
        let saved = save_lineup(
            &state,
            &ActorContext::member("pD1"),
            "m1".into(),
            SaveLineupRequest {
                name: "  Plan A ".into(),
                formation: "3-2-1".into(),
                lineup: lineup(&[("GK", "pGK"), ("ST", "pF1")]),
                absent: ids(&["pF1"]),
            },
        )
        .await
        .unwrap();
        assert_eq!(saved.name, "Plan A");
        assert_eq!(saved.lineup.get(&SlotKey::from("ST")), None);
        assert_eq!(saved.created_by, PlayerId::from("pD1"));

        let listed = list_lineups(&state, "m1".into()).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, saved.id);
        assert!(list_lineups(&state, "m2".into()).await.unwrap().is_empty());
    }
}
