use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for the domino quiz backend.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::auth::admin_login,
        crate::routes::auth::google_login,
        crate::routes::auth::demo_login,
        crate::routes::websocket::ws_handler,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::auth::AdminLoginRequest,
            crate::dto::auth::GoogleLoginRequest,
            crate::dto::auth::DemoLoginRequest,
            crate::dto::auth::LoginResponse,
            crate::dto::ws::ClientMessage,
            crate::dto::ws::ServerMessage,
            crate::dto::game::GameSnapshot,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Credential verification and token issuance"),
        (name = "game", description = "WebSocket game protocol"),
    )
)]
pub struct ApiDoc;
