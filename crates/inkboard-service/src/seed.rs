//! Startup seed data for the in-memory store.
//!
//! A seed is a JSON document with optional `admins`, `users`, `posts` and
//! `oauthLinks` arrays. Plain-text seed passwords are hashed on load.

use serde::Deserialize;

use crate::ServiceState;
use crate::error::ServiceError;
use crate::password;
use crate::types::{Collection, NewAccount, NewOAuthLink, NewPost, normalize_email};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Seed {
    pub admins: Vec<SeedAccount>,
    pub users: Vec<SeedAccount>,
    pub posts: Vec<SeedPost>,
    pub oauth_links: Vec<SeedOAuthLink>,
}

#[derive(Debug, Deserialize)]
pub struct SeedAccount {
    pub name: String,
    pub email: String,
    /// Omit for an OAuth-only account.
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SeedPost {
    #[serde(default)]
    pub id: Option<String>,
    pub slug: String,
    pub title: String,
    #[serde(default = "default_published")]
    pub published: bool,
}

fn default_published() -> bool {
    true
}

/// Links the account with `email` in `collection` to a provider identity.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedOAuthLink {
    pub email: String,
    pub collection: Collection,
    pub provider: String,
    pub provider_account_id: String,
}

/// Counts of records inserted by [`apply`].
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub accounts: usize,
    pub posts: usize,
    pub oauth_links: usize,
}

/// Inserts the seed records. Stops at the first failure.
pub async fn apply(state: &ServiceState, seed: Seed) -> Result<SeedSummary, ServiceError> {
    let mut summary = SeedSummary::default();

    let accounts = seed
        .admins
        .into_iter()
        .map(|a| (Collection::Admins, a))
        .chain(seed.users.into_iter().map(|a| (Collection::Users, a)));
    for (collection, account) in accounts {
        let password_hash = match account.password {
            Some(plain) => Some(password::hash_password_blocking(plain).await?),
            None => None,
        };
        state
            .accounts()
            .create_account(
                collection,
                NewAccount {
                    name: account.name,
                    email: normalize_email(&account.email),
                    password_hash,
                },
            )
            .await?;
        summary.accounts += 1;
    }

    for post in seed.posts {
        state
            .content()
            .create_post(NewPost {
                id: post.id,
                slug: post.slug,
                title: post.title,
                published: post.published,
            })
            .await?;
        summary.posts += 1;
    }

    for link in seed.oauth_links {
        let account = state
            .accounts()
            .find_by_email(link.collection, &normalize_email(&link.email))
            .await?
            .ok_or_else(|| {
                ServiceError::BadRequest(format!(
                    "seed OAuth link references unknown {} account {}",
                    link.collection, link.email
                ))
            })?;
        state
            .accounts()
            .create_oauth_link(NewOAuthLink {
                user_id: account.id,
                target_collection: link.collection,
                provider: link.provider.to_lowercase(),
                provider_account_id: link.provider_account_id,
            })
            .await?;
        summary.oauth_links += 1;
    }

    Ok(summary)
}
