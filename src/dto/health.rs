use serde::Serialize;
use time::Date;
use utoipa::ToSchema;

/// Reachability of the club store as seen by the last health check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum StorageHealth {
    Connected,
    /// A store is installed but its ping failed.
    Failing,
    /// No store yet; the supervisor is still connecting.
    Missing,
}

/// Payload of the `/healthcheck` route.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// `ok`, or `degraded` while requests needing storage answer 503.
    pub status: String,
    pub storage: StorageHealth,
    /// Calendar day used for match-day checks (`YYYY-MM-DD`).
    pub today: String,
}

impl HealthResponse {
    pub fn new(storage: StorageHealth, degraded: bool, today: Date) -> Self {
        let status = if degraded { "degraded" } else { "ok" };
        Self {
            status: status.to_owned(),
            storage,
            today: today.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn renders_the_match_day() {
        let health = HealthResponse::new(StorageHealth::Connected, false, date!(2025 - 09 - 07));
        let json = serde_json::to_value(&health).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["storage"], "connected");
        assert_eq!(json["today"], "2025-09-07");
    }
}
