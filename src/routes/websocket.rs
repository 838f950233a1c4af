use axum::{
    Router,
    extract::{Query, State, WebSocketUpgrade},
    response::IntoResponse,
    routing::get,
};
use serde::Deserialize;

use crate::{
    error::AppError,
    services::{auth_service, ws_service},
    state::SharedState,
};

/// Query parameters presented at upgrade time.
#[derive(Debug, Deserialize)]
pub struct WsAuth {
    /// Bearer token issued by one of the login routes.
    token: Option<String>,
}

#[utoipa::path(
    get,
    path = "/ws",
    tag = "game",
    params(("token" = Option<String>, Query, description = "Bearer token issued by a login route")),
    responses(
        (status = 101, description = "Switching protocols to WebSocket"),
        (status = 401, description = "Missing or invalid token"),
        (status = 403, description = "Token references a team absent from the roster")
    )
)]
/// Authenticate and upgrade the connection into a game WebSocket session.
///
/// Credential failures and unknown teams are refused here, before any event
/// handling: a rejected connection never enters the event loop.
pub async fn ws_handler(
    State(state): State<SharedState>,
    Query(auth): Query<WsAuth>,
    ws: WebSocketUpgrade,
) -> Result<impl IntoResponse, AppError> {
    let token = auth
        .token
        .ok_or_else(|| AppError::Unauthorized("no token provided".into()))?;
    let claims = auth_service::verify_token(state.config(), &token)?;

    if !claims.is_admin {
        let team_id = claims
            .team_id
            .ok_or_else(|| AppError::Forbidden("token carries no team".into()))?;
        if state.registry().team(team_id).is_none() {
            return Err(AppError::Forbidden(format!("unknown team `{team_id}`")));
        }
    }

    Ok(ws.on_upgrade(move |socket| ws_service::handle_socket(state, socket, claims)))
}

/// Configure the WebSocket endpoint.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new().route("/ws", get(ws_handler))
}
