//! JSON request and response types for the HTTP API.

use inkboard_service::auth::{AuthOutcome, Principal};
use inkboard_service::identity::{Identity, IdentityDetails};
use inkboard_service::types::{Account, Collection, CommentStatus};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// ---------------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------------

/// Email/password sign-in.
#[derive(Deserialize, ToSchema)]
pub struct SignInBody {
    /// Account email (case-insensitive).
    pub email: String,
    pub password: String,
    /// Collection to sign in to. Picked from the email's identity when omitted.
    #[serde(default)]
    pub collection: Option<Collection>,
}

/// Account registration.
#[derive(Deserialize, ToSchema)]
pub struct SignUpBody {
    pub name: String,
    pub email: String,
    /// At least 8 characters.
    pub password: String,
    /// Defaults to `users`.
    #[serde(default)]
    pub collection: Option<Collection>,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OAuthLinkBody {
    /// Provider name, e.g. `github`.
    pub provider: String,
    /// The account's id at the provider.
    pub provider_account_id: String,
}

/// Signed-in principal with its cross-collection identity.
#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub user: Account,
    pub collection: Collection,
    /// Session token; also set as the `inkboard-token` cookie.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    pub identity: Identity,
    pub identity_details: IdentityDetails,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    #[serde(rename = "hasOAuth")]
    pub has_oauth: bool,
    pub oauth_providers: Vec<String>,
}

impl From<AuthOutcome> for AuthResponse {
    fn from(outcome: AuthOutcome) -> Self {
        Self {
            user: outcome.account,
            collection: outcome.collection,
            token: Some(outcome.token),
            identity: outcome.identity,
            identity_details: outcome.identity_details,
            warning: outcome.warning,
            has_oauth: !outcome.oauth_providers.is_empty(),
            oauth_providers: outcome.oauth_providers,
        }
    }
}

impl From<Principal> for AuthResponse {
    fn from(principal: Principal) -> Self {
        Self {
            user: principal.account,
            collection: principal.collection,
            token: None,
            identity: principal.identity,
            identity_details: principal.identity_details,
            warning: None,
            has_oauth: !principal.oauth_providers.is_empty(),
            oauth_providers: principal.oauth_providers,
        }
    }
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SignOutResponse {
    /// Whether a live session was ended.
    pub signed_out: bool,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OAuthLinkResponse {
    pub id: String,
    pub provider: String,
    pub provider_account_id: String,
    pub collection: Collection,
}

// ---------------------------------------------------------------------------
// Comments
// ---------------------------------------------------------------------------

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CommentBody {
    pub post_id: String,
    /// Author display name, 1 to 100 characters.
    pub name: String,
    pub email: String,
    /// Comment text, 1 to 5000 characters.
    pub content: String,
}

#[derive(Serialize, ToSchema)]
pub struct CommentResponse {
    pub id: String,
    pub status: CommentStatus,
}

// ---------------------------------------------------------------------------
// Admin
// ---------------------------------------------------------------------------

/// Current fixed-window counter for one key.
#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitStatusResponse {
    /// The normalized key (IP or lowercased email).
    pub key: String,
    /// False when the key has no live window.
    pub active: bool,
    pub count: u32,
    pub limit: u32,
    /// Window end, Unix epoch milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reset_time: Option<i64>,
}

#[derive(Serialize, ToSchema)]
pub struct RateLimitResetResponse {
    pub key: String,
    pub reset: bool,
}

// ---------------------------------------------------------------------------
// System
// ---------------------------------------------------------------------------

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub active_sessions: usize,
}
