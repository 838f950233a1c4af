/// Identity gate: credential verification and bearer-token issuance.
pub mod auth_service;
/// OpenAPI documentation generation.
pub mod documentation;
/// Turn lifecycle operations on the authoritative game state.
pub mod game_service;
/// Health check service.
pub mod health_service;
/// WebSocket broadcast fan-out helpers.
pub mod ws_events;
/// WebSocket connection lifecycle and event dispatch.
pub mod ws_service;
