use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use utoipa::ToSchema;
use validator::Validate;

use crate::state::game::TeamId;

/// Credentials for the username/password admin login.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct AdminLoginRequest {
    /// Admin username.
    #[validate(length(min = 1))]
    pub username: String,
    /// Admin password.
    #[validate(length(min = 1))]
    pub password: String,
}

/// Google sign-in payload: the ID token produced by the client-side flow.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct GoogleLoginRequest {
    /// Google ID token to verify.
    #[validate(length(min = 1))]
    pub token: String,
}

/// Test-mode login that impersonates a roster member.
#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DemoLoginRequest {
    /// Team to impersonate a member of.
    #[validate(range(min = 1))]
    pub team_id: TeamId,
    /// 1-based index into the team member list; clamped to its length.
    #[serde(default = "default_member_index")]
    #[validate(range(min = 1))]
    pub member_index: usize,
}

fn default_member_index() -> usize {
    1
}

/// Body returned by every login route on success.
#[skip_serializing_none]
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    /// Always `true`; failures go through the error body instead.
    pub success: bool,
    /// Signed bearer token to present at WebSocket upgrade time.
    pub token: String,
    /// Team of the principal; absent for admins.
    pub team_id: Option<TeamId>,
    /// Display name of that team.
    pub team_name: Option<String>,
    /// Authenticated email.
    pub email: String,
    /// Display name.
    pub name: String,
    /// Whether the principal is an admin.
    pub is_admin: bool,
}
