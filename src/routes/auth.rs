use axum::{Json, Router, extract::State, routing::post};
use axum_valid::Valid;

use crate::{
    dto::auth::{AdminLoginRequest, DemoLoginRequest, GoogleLoginRequest, LoginResponse},
    error::AppError,
    services::auth_service,
    state::SharedState,
};

/// Configure the login routes subtree.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/api/auth/google", post(google_login))
        .route("/api/auth/admin", post(admin_login))
        .route("/api/auth/demo", post(demo_login))
}

#[utoipa::path(
    post,
    path = "/api/auth/admin",
    tag = "auth",
    request_body = AdminLoginRequest,
    responses(
        (status = 200, description = "Admin token issued", body = LoginResponse),
        (status = 401, description = "Invalid credentials")
    )
)]
/// Username/password login for the admin console.
pub async fn admin_login(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<AdminLoginRequest>>,
) -> Result<Json<LoginResponse>, AppError> {
    auth_service::admin_login(&state, payload).map(Json)
}

#[utoipa::path(
    post,
    path = "/api/auth/google",
    tag = "auth",
    request_body = GoogleLoginRequest,
    responses(
        (status = 200, description = "Token issued for a whitelisted email", body = LoginResponse),
        (status = 401, description = "Google rejected the ID token"),
        (status = 403, description = "Email not on the access list")
    )
)]
/// Google sign-in: verifies the ID token and matches it against the roster.
pub async fn google_login(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<GoogleLoginRequest>>,
) -> Result<Json<LoginResponse>, AppError> {
    auth_service::google_login(&state, payload).await.map(Json)
}

#[utoipa::path(
    post,
    path = "/api/auth/demo",
    tag = "auth",
    request_body = DemoLoginRequest,
    responses(
        (status = 200, description = "Token issued for a roster member", body = LoginResponse),
        (status = 403, description = "Demo login disabled outside test mode"),
        (status = 404, description = "Unknown team")
    )
)]
/// Test-mode login that impersonates a roster member.
pub async fn demo_login(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<DemoLoginRequest>>,
) -> Result<Json<LoginResponse>, AppError> {
    auth_service::demo_login(&state, payload).map(Json)
}
