/// Players, fixtures, formations, and presets.
pub mod catalogue_service;
/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Lineup drafting and saved drafts.
pub mod lineup_service;
/// Peer rating submission and summaries.
pub mod rating_service;
/// Match sheet validation, update, and ratings closure.
pub mod sheet_service;
/// Match statistics and season aggregates.
pub mod stats_service;
/// Storage connection supervisor toggling degraded mode.
pub mod storage_supervisor;
