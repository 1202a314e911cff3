//! Read access to players and fixtures plus the profile edit path.

use std::sync::Arc;

use tracing::info;

use crate::{
    dao::{
        club_store::ClubStore,
        models::{MatchEntity, PlayerEntity},
    },
    dto::catalogue::{MatchSummary, PlayerSummary, PresetEntry, UpdatePlayerRequest},
    error::ServiceError,
    squad::{Formation, MatchId, PlayerId, RosterPlayer},
    state::{SharedState, actor::ActorContext},
};

pub async fn list_players(state: &SharedState) -> Result<Vec<PlayerSummary>, ServiceError> {
    let store = state.require_store().await?;
    let players = store.list_players().await?;
    Ok(players.into_iter().map(Into::into).collect())
}

pub async fn get_player(state: &SharedState, id: PlayerId) -> Result<PlayerSummary, ServiceError> {
    let store = state.require_store().await?;
    Ok(require_player(&store, id).await?.into())
}

/// Edit a profile. Only the player themself or an admin may do so.
pub async fn update_player(
    state: &SharedState,
    actor: &ActorContext,
    id: PlayerId,
    request: UpdatePlayerRequest,
) -> Result<PlayerSummary, ServiceError> {
    if !actor.is(&id) && !actor.is_admin() {
        return Err(ServiceError::Forbidden(format!(
            "`{}` may not edit the profile of `{id}`",
            actor.user_id
        )));
    }
    let store = state.require_store().await?;
    let current = require_player(&store, id).await?;
    let updated = request.apply_to(current);
    store.save_player(updated.clone()).await?;
    info!(player = %updated.id, actor = %actor.user_id, "player profile updated");
    Ok(updated.into())
}

pub async fn list_matches(state: &SharedState) -> Result<Vec<MatchSummary>, ServiceError> {
    let store = state.require_store().await?;
    let today = state.today();
    let matches = store.list_matches().await?;
    Ok(matches
        .into_iter()
        .map(|fixture| MatchSummary::new(fixture, today))
        .collect())
}

pub async fn get_match(state: &SharedState, id: MatchId) -> Result<MatchSummary, ServiceError> {
    let store = state.require_store().await?;
    let fixture = require_match(&store, id).await?;
    Ok(MatchSummary::new(fixture, state.today()))
}

pub fn formations(state: &SharedState) -> Vec<Formation> {
    state.config().formations().to_vec()
}

pub fn presets(state: &SharedState) -> Vec<PresetEntry> {
    state
        .config()
        .presets()
        .iter()
        .map(|(name, preset)| PresetEntry {
            name: name.clone(),
            preset: preset.clone(),
        })
        .collect()
}

/// Formation by name, or an input error naming it.
pub(crate) fn require_formation<'a>(
    state: &'a SharedState,
    name: &str,
) -> Result<&'a Formation, ServiceError> {
    state
        .config()
        .formation(name)
        .ok_or_else(|| ServiceError::InvalidInput(format!("unknown formation `{name}`")))
}

pub(crate) async fn require_player(
    store: &Arc<dyn ClubStore>,
    id: PlayerId,
) -> Result<PlayerEntity, ServiceError> {
    store
        .find_player(id.clone())
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("player `{id}` not found")))
}

pub(crate) async fn require_match(
    store: &Arc<dyn ClubStore>,
    id: MatchId,
) -> Result<MatchEntity, ServiceError> {
    store
        .find_match(id.clone())
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("match `{id}` not found")))
}

/// The full roster in the minimal shape the lineup logic works with.
pub(crate) async fn roster(store: &Arc<dyn ClubStore>) -> Result<Vec<RosterPlayer>, ServiceError> {
    let players = store.list_players().await?;
    Ok(players.iter().map(RosterPlayer::from).collect())
}
