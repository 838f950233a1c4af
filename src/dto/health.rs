use serde::Serialize;
use utoipa::ToSchema;

/// Simple health response returned by the `/api/health` route.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Always "ok" while the process is serving.
    pub status: String,
    /// Number of teams in the current session.
    pub teams: usize,
    /// Current round counter.
    pub round: u32,
}

impl HealthResponse {
    /// Create a health response for the given session counters.
    pub fn ok(teams: usize, round: u32) -> Self {
        Self {
            status: "ok".to_string(),
            teams,
            round,
        }
    }
}
