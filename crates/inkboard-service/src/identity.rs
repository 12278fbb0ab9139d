//! Cross-collection identity resolution.
//!
//! Answers "which account collection(s) does this email belong to, and is
//! each of those accounts OAuth-linked?". Used by sign-in to pick the right
//! collection and by sign-up to warn about duplicates in the other one.
//! Results are recomputed on every call.

use serde::{Deserialize, Serialize};

use crate::error::ServiceError;
use crate::store::AccountRepository;
use crate::types::{Account, Collection, normalize_email};

/// Where an email is registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum Identity {
    Admin,
    User,
    Both,
    None,
}

impl Identity {
    /// Collections to try, in order, when signing in without an explicit
    /// collection.
    pub fn sign_in_order(self) -> &'static [Collection] {
        match self {
            Self::Admin => &[Collection::Admins],
            Self::User => &[Collection::Users],
            Self::Both => &[Collection::Admins, Collection::Users],
            Self::None => &[],
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct IdentityDetails {
    pub exists_in_admins: bool,
    pub exists_in_users: bool,
    #[serde(rename = "hasOAuthInAdmins")]
    pub has_oauth_in_admins: bool,
    #[serde(rename = "hasOAuthInUsers")]
    pub has_oauth_in_users: bool,
}

impl IdentityDetails {
    pub fn identity(&self) -> Identity {
        match (self.exists_in_admins, self.exists_in_users) {
            (true, true) => Identity::Both,
            (true, false) => Identity::Admin,
            (false, true) => Identity::User,
            (false, false) => Identity::None,
        }
    }

    pub fn exists_in(&self, collection: Collection) -> bool {
        match collection {
            Collection::Admins => self.exists_in_admins,
            Collection::Users => self.exists_in_users,
        }
    }

    pub fn has_oauth_in(&self, collection: Collection) -> bool {
        match collection {
            Collection::Admins => self.has_oauth_in_admins,
            Collection::Users => self.has_oauth_in_users,
        }
    }
}

/// Resolved identity plus the matched accounts, so callers do not have to
/// query them again.
#[derive(Debug, Clone)]
pub struct IdentityResolution {
    pub identity: Identity,
    pub identity_details: IdentityDetails,
    pub admin: Option<Account>,
    pub user: Option<Account>,
}

impl IdentityResolution {
    pub fn account(&self, collection: Collection) -> Option<&Account> {
        match collection {
            Collection::Admins => self.admin.as_ref(),
            Collection::Users => self.user.as_ref(),
        }
    }
}

/// Classifies `email` across the `admins` and `users` collections.
///
/// The two account lookups run concurrently, then the OAuth lookups for the
/// collections that matched run concurrently. A collection without a
/// matching account never issues an OAuth query. Repository errors are
/// returned as-is.
pub async fn get_identity_details(
    email: &str,
    repo: &dyn AccountRepository,
) -> Result<IdentityResolution, ServiceError> {
    let email = normalize_email(email);

    let (admin, user) = tokio::try_join!(
        repo.find_by_email(Collection::Admins, &email),
        repo.find_by_email(Collection::Users, &email),
    )?;

    let (admin_links, user_links) = tokio::try_join!(
        count_oauth_links(repo, admin.as_ref(), Collection::Admins),
        count_oauth_links(repo, user.as_ref(), Collection::Users),
    )?;

    let identity_details = IdentityDetails {
        exists_in_admins: admin.is_some(),
        exists_in_users: user.is_some(),
        has_oauth_in_admins: admin_links > 0,
        has_oauth_in_users: user_links > 0,
    };

    Ok(IdentityResolution {
        identity: identity_details.identity(),
        identity_details,
        admin,
        user,
    })
}

/// Resolves the full cross-collection picture for an already-known account.
pub async fn get_identity_details_for_user(
    user_id: &str,
    collection: Collection,
    repo: &dyn AccountRepository,
) -> Result<IdentityResolution, ServiceError> {
    let account = repo
        .find_by_id(collection, user_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("account not found in {collection}")))?;
    get_identity_details(&account.email, repo).await
}

async fn count_oauth_links(
    repo: &dyn AccountRepository,
    account: Option<&Account>,
    collection: Collection,
) -> Result<usize, ServiceError> {
    match account {
        Some(account) => Ok(repo.find_oauth_links(&account.id, collection).await?.len()),
        None => Ok(0),
    }
}
