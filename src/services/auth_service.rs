use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use tracing::{info, warn};

use crate::{
    config::AppConfig,
    dto::auth::{AdminLoginRequest, DemoLoginRequest, GoogleLoginRequest, LoginResponse},
    error::AppError,
    state::{SharedState, game::TeamId},
};

/// Issued tokens stay valid for one event day.
const TOKEN_LIFETIME_HOURS: i64 = 24;
/// Google's token introspection endpoint used to verify ID tokens.
const GOOGLE_TOKENINFO_URL: &str = "https://oauth2.googleapis.com/tokeninfo";

/// Claims carried by a bearer token; doubles as the resolved principal once
/// verification succeeds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Authenticated email.
    pub email: String,
    /// Display name.
    pub name: String,
    /// Team of the principal; `None` for admins.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_id: Option<TeamId>,
    /// Whether the principal is an admin.
    #[serde(default)]
    pub is_admin: bool,
    /// Expiry as a unix timestamp.
    pub exp: i64,
}

/// Sign a bearer token for the given principal.
pub fn issue_token(
    config: &AppConfig,
    email: String,
    name: String,
    team_id: Option<TeamId>,
    is_admin: bool,
) -> Result<String, AppError> {
    let exp = (OffsetDateTime::now_utc() + Duration::hours(TOKEN_LIFETIME_HOURS)).unix_timestamp();
    let claims = Claims {
        email,
        name,
        team_id,
        is_admin,
        exp,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.session_secret.as_bytes()),
    )
    .map_err(|err| AppError::Internal(format!("failed to sign token: {err}")))
}

/// Verify a bearer token and return its claims.
pub fn verify_token(config: &AppConfig, token: &str) -> Result<Claims, AppError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.session_secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|err| AppError::Unauthorized(format!("invalid token: {err}")))
}

/// Username/password login for the admin console.
pub fn admin_login(
    state: &SharedState,
    request: AdminLoginRequest,
) -> Result<LoginResponse, AppError> {
    let config = state.config();
    if request.username != config.admin_username || request.password != config.admin_password {
        warn!(username = %request.username, "admin login rejected");
        return Err(AppError::Unauthorized(
            "incorrect username or password".into(),
        ));
    }

    let email = "admin@system".to_string();
    let name = "Admin".to_string();
    let token = issue_token(config, email.clone(), name.clone(), None, true)?;

    info!(%email, "admin logged in");
    Ok(LoginResponse {
        success: true,
        token,
        team_id: None,
        team_name: None,
        email,
        name,
        is_admin: true,
    })
}

/// Google sign-in: verify the ID token, then match the email against the
/// admin whitelist or the team roster.
pub async fn google_login(
    state: &SharedState,
    request: GoogleLoginRequest,
) -> Result<LoginResponse, AppError> {
    let config = state.config();
    let client_id = config
        .google_client_id
        .as_deref()
        .ok_or_else(|| AppError::Forbidden("Google login is not configured".into()))?;

    let profile = verify_google_token(client_id, &request.token).await?;
    let email = profile.email.to_lowercase();
    let name = profile.name.unwrap_or_else(|| email.clone());

    if state.registry().is_admin_email(&email) {
        let token = issue_token(config, email.clone(), name.clone(), None, true)?;
        info!(%email, "admin logged in via Google");
        return Ok(LoginResponse {
            success: true,
            token,
            team_id: None,
            team_name: None,
            email,
            name,
            is_admin: true,
        });
    }

    let team = state
        .registry()
        .team_for_email(&email)
        .ok_or_else(|| AppError::Forbidden("email is not on the access list".into()))?;

    let token = issue_token(config, email.clone(), name.clone(), Some(team.id), false)?;
    info!(%email, team = %team.name, "team member logged in");
    Ok(LoginResponse {
        success: true,
        token,
        team_id: Some(team.id),
        team_name: Some(team.name.clone()),
        email,
        name,
        is_admin: false,
    })
}

/// Test-mode login that impersonates a roster member without a real Google
/// account. Refused outright unless `TEST_MODE=true`.
pub fn demo_login(
    state: &SharedState,
    request: DemoLoginRequest,
) -> Result<LoginResponse, AppError> {
    let config = state.config();
    if !config.test_mode {
        return Err(AppError::Forbidden(
            "demo login is disabled in production mode".into(),
        ));
    }

    let team = state
        .registry()
        .team(request.team_id)
        .ok_or_else(|| AppError::NotFound(format!("no team `{}`", request.team_id)))?;

    let index = request.member_index.min(team.members.len()).max(1);
    let email = team
        .members
        .get(index - 1)
        .cloned()
        .ok_or_else(|| AppError::NotFound(format!("team `{}` has no members", team.id)))?;
    let name = format!("Demo User {} ({})", request.member_index, team.name);

    let token = issue_token(config, email.clone(), name.clone(), Some(team.id), false)?;
    info!(%email, team = %team.name, "demo login");
    Ok(LoginResponse {
        success: true,
        token,
        team_id: Some(team.id),
        team_name: Some(team.name.clone()),
        email,
        name,
        is_admin: false,
    })
}

/// Fields of the tokeninfo response we care about.
#[derive(Debug, Deserialize)]
struct GoogleTokenInfo {
    email: String,
    #[serde(default)]
    name: Option<String>,
    aud: String,
}

/// Ask Google to introspect the ID token and check it was minted for us.
async fn verify_google_token(client_id: &str, id_token: &str) -> Result<GoogleTokenInfo, AppError> {
    let response = reqwest::Client::new()
        .get(GOOGLE_TOKENINFO_URL)
        .query(&[("id_token", id_token)])
        .send()
        .await
        .map_err(|err| AppError::Unauthorized(format!("Google verification failed: {err}")))?;

    if !response.status().is_success() {
        return Err(AppError::Unauthorized(
            "Google rejected the ID token".into(),
        ));
    }

    let info: GoogleTokenInfo = response
        .json()
        .await
        .map_err(|err| AppError::Unauthorized(format!("malformed tokeninfo response: {err}")))?;

    if info.aud != client_id {
        return Err(AppError::Unauthorized("token audience mismatch".into()));
    }

    Ok(info)
}
