//! Match sheet lifecycle: validation, re-validation, and closing ratings.

use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    dao::{
        club_store::ClubStore,
        models::{MatchSheetEntity, SavedLineupEntity},
    },
    dto::sheet::MatchSheetResponse,
    error::ServiceError,
    services::catalogue_service::{require_match, roster},
    squad::MatchId,
    state::{SharedState, actor::ActorContext, sheet_machine},
};

pub async fn get_sheet(
    state: &SharedState,
    match_id: MatchId,
) -> Result<MatchSheetResponse, ServiceError> {
    let store = state.require_store().await?;
    Ok(require_sheet(&store, match_id).await?.into())
}

/// Promote a saved lineup to the match sheet, replacing any previous sheet.
pub async fn validate_sheet(
    state: &SharedState,
    actor: &ActorContext,
    match_id: MatchId,
    lineup_id: Uuid,
) -> Result<MatchSheetResponse, ServiceError> {
    let store = state.require_store().await?;
    require_match(&store, match_id.clone()).await?;
    let lineup = require_lineup(&store, &match_id, lineup_id).await?;
    let current = store.find_match_sheet(match_id.clone()).await?;

    let phase = sheet_machine::authorize_validation(actor, current.as_ref(), &lineup)?;
    let players = roster(&store).await?;
    let sheet =
        sheet_machine::build_sheet(&lineup, &players, actor, state.now(), current.as_ref());
    store.save_match_sheet(sheet.clone()).await?;

    if current.is_some() {
        warn!(match_id = %match_id, actor = %actor.user_id, "match sheet replaced by a new validation");
    }
    info!(
        match_id = %match_id,
        lineup_id = %lineup_id,
        actor = %actor.user_id,
        phase = ?phase,
        actual_players = sheet.actual_players.len(),
        "match sheet validated"
    );
    Ok(sheet.into())
}

/// Re-validate an existing sheet with another saved lineup. Creator and closure are kept.
pub async fn update_sheet(
    state: &SharedState,
    actor: &ActorContext,
    match_id: MatchId,
    lineup_id: Uuid,
) -> Result<MatchSheetResponse, ServiceError> {
    let store = state.require_store().await?;
    require_match(&store, match_id.clone()).await?;
    let lineup = require_lineup(&store, &match_id, lineup_id).await?;
    let current = store.find_match_sheet(match_id.clone()).await?;
    if current.is_none() {
        // Missing sheet is reported before any role check.
        return Err(sheet_not_found(&match_id));
    }

    sheet_machine::authorize_update(actor, current.as_ref(), &lineup)?;
    let players = roster(&store).await?;
    let patch = sheet_machine::build_patch(&lineup, &players, actor, state.now());
    if !store.update_match_sheet(match_id.clone(), patch).await? {
        return Err(sheet_not_found(&match_id));
    }

    info!(
        match_id = %match_id,
        lineup_id = %lineup_id,
        actor = %actor.user_id,
        "match sheet updated"
    );
    Ok(require_sheet(&store, match_id).await?.into())
}

/// Close ratings once the quorum of distinct raters is reached. Irreversible.
pub async fn close_ratings(
    state: &SharedState,
    actor: &ActorContext,
    match_id: MatchId,
) -> Result<MatchSheetResponse, ServiceError> {
    let store = state.require_store().await?;
    let sheet = require_sheet(&store, match_id.clone()).await?;
    let ratings = store.list_ratings_for_match(match_id.clone()).await?;
    sheet_machine::authorize_close(actor, &sheet, &ratings)?;

    let closed = store
        .close_ratings(match_id.clone(), actor.user_id.clone(), state.now())
        .await?;
    if !closed {
        // Another captain closed the sheet between the read and the write.
        return Err(ServiceError::InvalidState(format!(
            "ratings are already closed for match `{match_id}`"
        )));
    }

    info!(
        match_id = %match_id,
        actor = %actor.user_id,
        raters = sheet_machine::distinct_raters(&ratings),
        "ratings closed"
    );
    Ok(require_sheet(&store, match_id).await?.into())
}

pub(crate) async fn require_sheet(
    store: &Arc<dyn ClubStore>,
    match_id: MatchId,
) -> Result<MatchSheetEntity, ServiceError> {
    store
        .find_match_sheet(match_id.clone())
        .await?
        .ok_or_else(|| sheet_not_found(&match_id))
}

fn sheet_not_found(match_id: &MatchId) -> ServiceError {
    ServiceError::NotFound(format!("no match sheet for match `{match_id}`"))
}

async fn require_lineup(
    store: &Arc<dyn ClubStore>,
    match_id: &MatchId,
    lineup_id: Uuid,
) -> Result<SavedLineupEntity, ServiceError> {
    let lineup = store
        .find_lineup(lineup_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("lineup `{lineup_id}` not found")))?;
    if &lineup.match_id != match_id {
        return Err(ServiceError::InvalidInput(format!(
            "lineup `{lineup_id}` belongs to match `{}`",
            lineup.match_id
        )));
    }
    Ok(lineup)
}
