//! Record types stored in the account and content collections.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Account collection an identity can live in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    Admins,
    Users,
}

impl Collection {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admins => "admins",
            Self::Users => "users",
        }
    }

    /// The other account collection.
    pub fn other(self) -> Self {
        match self {
            Self::Admins => Self::Users,
            Self::Users => Self::Admins,
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Collection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admins" => Ok(Self::Admins),
            "users" => Ok(Self::Users),
            other => Err(format!("unknown collection: {other}")),
        }
    }
}

/// A sign-in capable account in either the `admins` or `users` collection.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: String,
    pub name: String,
    /// Stored trimmed and lowercased.
    pub email: String,
    /// Argon2 PHC string. `None` for accounts created through OAuth only.
    #[serde(skip)]
    pub password_hash: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Fields required to insert an account.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub name: String,
    pub email: String,
    pub password_hash: Option<String>,
}

/// Association between a third-party provider identity and an account.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct OAuthLink {
    pub id: String,
    pub user_id: String,
    pub target_collection: Collection,
    pub provider: String,
    pub provider_account_id: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewOAuthLink {
    pub user_id: String,
    pub target_collection: Collection,
    pub provider: String,
    pub provider_account_id: String,
}

/// Blog post that comments attach to.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: String,
    pub slug: String,
    pub title: String,
    pub published: bool,
}

#[derive(Debug, Clone)]
pub struct NewPost {
    pub id: Option<String>,
    pub slug: String,
    pub title: String,
    pub published: bool,
}

/// Moderation state of a comment. Submissions always start out pending;
/// moderation happens outside this server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum CommentStatus {
    Pending,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub post_id: String,
    pub author_name: String,
    pub author_email: String,
    pub content: String,
    pub status: CommentStatus,
    #[serde(skip)]
    pub ip: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewComment {
    pub post_id: String,
    pub author_name: String,
    pub author_email: String,
    pub content: String,
    pub ip: String,
}

/// Canonical form used for every email comparison and map key.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Loose syntactic email check: one `@`, non-empty local part, dotted domain.
pub fn is_plausible_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !email.contains(char::is_whitespace)
        && domain
            .split_once('.')
            .is_some_and(|(head, tail)| !head.is_empty() && !tail.is_empty() && !tail.ends_with('.'))
}
