use crate::{dto::health::HealthResponse, state::SharedState};

/// Report liveness along with the session's team and round counters.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    let (teams, round) = state
        .with_engine(|engine| (engine.state.teams.len(), engine.state.current_round))
        .await;

    HealthResponse::ok(teams, round)
}
