use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for Squad Sheet Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::catalogue::list_players,
        crate::routes::catalogue::get_player,
        crate::routes::catalogue::update_player,
        crate::routes::catalogue::list_matches,
        crate::routes::catalogue::get_match,
        crate::routes::catalogue::list_formations,
        crate::routes::catalogue::list_presets,
        crate::routes::lineups::partition,
        crate::routes::lineups::reflow,
        crate::routes::lineups::preset,
        crate::routes::lineups::assign,
        crate::routes::lineups::list_lineups,
        crate::routes::lineups::save_lineup,
        crate::routes::sheets::get_sheet,
        crate::routes::sheets::validate_sheet,
        crate::routes::sheets::update_sheet,
        crate::routes::sheets::close_ratings,
        crate::routes::ratings::submit_rating,
        crate::routes::ratings::submit_batch,
        crate::routes::ratings::list_ratings,
        crate::routes::ratings::summary,
        crate::routes::stats::upsert_stats,
        crate::routes::stats::list_match_stats,
        crate::routes::stats::dashboard,
        crate::routes::stats::season_card,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::health::StorageHealth,
            crate::dto::catalogue::PlayerSummary,
            crate::dto::catalogue::UpdatePlayerRequest,
            crate::dto::catalogue::MatchSummary,
            crate::dto::catalogue::PresetEntry,
            crate::dto::lineup::PartitionRequest,
            crate::dto::lineup::ReflowRequest,
            crate::dto::lineup::PresetRequest,
            crate::dto::lineup::AssignRequest,
            crate::dto::lineup::DraftResponse,
            crate::dto::lineup::SaveLineupRequest,
            crate::dto::lineup::SavedLineupResponse,
            crate::dto::sheet::ValidateSheetRequest,
            crate::dto::sheet::MatchSheetResponse,
            crate::dto::rating::SubmitRatingRequest,
            crate::dto::rating::BatchRatingRequest,
            crate::dto::rating::RatingView,
            crate::dto::rating::RatingReceipt,
            crate::dto::rating::PlayerAverage,
            crate::dto::rating::RatingSummary,
            crate::dto::stats::UpsertStatsRequest,
            crate::dto::stats::MatchStatsView,
            crate::dto::stats::SeasonTotals,
            crate::dto::stats::PlayerDashboardRow,
            crate::dto::stats::SeasonMatchLine,
            crate::dto::stats::PlayerSeasonCard,
            crate::dto::stats::Venue,
            crate::dao::models::Side,
            crate::squad::Formation,
            crate::squad::Slot,
            crate::squad::SlotPosition,
            crate::squad::Position,
            crate::squad::Preset,
            crate::squad::Lineup,
            crate::squad::PlayerId,
            crate::squad::MatchId,
            crate::squad::SlotKey,
            crate::state::sheet_machine::SheetPhase,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "catalogue", description = "Players, fixtures, formations, and presets"),
        (name = "lineups", description = "Lineup builder and saved drafts"),
        (name = "sheets", description = "Match sheet validation and ratings closure"),
        (name = "ratings", description = "Peer ratings"),
        (name = "stats", description = "Match statistics and season dashboard"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_route() {
        let doc = ApiDoc::openapi();
        for path in [
            "/healthcheck",
            "/players/{id}",
            "/lineups/reflow",
            "/matches/{id}/sheet/close",
            "/matches/{id}/ratings/batch",
            "/matches/{id}/stats/{player_id}",
            "/stats/players/{id}",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
