//! Sign-in, sign-up and OAuth-linking flows.
//!
//! Credential failures always surface as [`ServiceError::InvalidCredentials`]
//! regardless of whether the email was unknown, the account had no password,
//! or the password was wrong.

use crate::ServiceState;
use crate::error::ServiceError;
use crate::identity::{self, Identity, IdentityDetails};
use crate::password::{self, MIN_PASSWORD_LEN};
use crate::session::AuthSession;
use crate::types::{
    Account, Collection, NewAccount, NewOAuthLink, OAuthLink, is_plausible_email, normalize_email,
};

const MAX_NAME_LEN: usize = 100;

pub struct SignInRequest {
    pub email: String,
    pub password: String,
    /// Explicit target collection; auto-routed from the identity when absent.
    pub collection: Option<Collection>,
}

pub struct SignUpRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    /// Defaults to `users`.
    pub collection: Option<Collection>,
}

/// A successful sign-in or sign-up.
#[derive(Debug)]
pub struct AuthOutcome {
    pub account: Account,
    pub collection: Collection,
    pub token: String,
    pub identity: Identity,
    pub identity_details: IdentityDetails,
    pub warning: Option<String>,
    pub oauth_providers: Vec<String>,
}

/// The signed-in principal with its cross-collection identity.
#[derive(Debug)]
pub struct Principal {
    pub account: Account,
    pub collection: Collection,
    pub identity: Identity,
    pub identity_details: IdentityDetails,
    pub oauth_providers: Vec<String>,
}

pub struct AuthService;

impl AuthService {
    /// Verifies an email/password pair and opens a session.
    ///
    /// Without an explicit collection the identity decides where to look;
    /// an email registered in both collections tries `admins` first.
    pub async fn sign_in(
        state: &ServiceState,
        req: SignInRequest,
    ) -> Result<AuthOutcome, ServiceError> {
        let email = normalize_email(&req.email);
        if email.is_empty() || req.password.is_empty() {
            return Err(ServiceError::BadRequest(
                "Email and password are required".to_owned(),
            ));
        }

        let resolution = identity::get_identity_details(&email, state.accounts()).await?;
        let candidates = req
            .collection
            .map_or_else(|| resolution.identity.sign_in_order().to_vec(), |c| vec![c]);

        let mut signed_in = None;
        for collection in candidates {
            let Some(account) = resolution.account(collection) else {
                continue;
            };
            let Some(hash) = account.password_hash.clone() else {
                continue;
            };
            if password::verify_password_blocking(req.password.clone(), hash).await? {
                signed_in = Some((account.clone(), collection));
                break;
            }
        }

        let Some((account, collection)) = signed_in else {
            state.metrics().record_sign_in(false);
            tracing::info!(identity = ?resolution.identity, "sign-in rejected");
            return Err(ServiceError::InvalidCredentials);
        };

        let warning = (resolution.identity == Identity::Both && req.collection.is_none()).then(
            || {
                format!(
                    "This email is registered as both an admin and a user. \
                     Signed in to the {collection} account."
                )
            },
        );
        let oauth_providers = oauth_providers(state, &account.id, collection).await?;
        let token = state.sessions().create(&account.id, collection);

        state.metrics().record_sign_in(true);
        tracing::info!(account_id = %account.id, %collection, "signed in");

        Ok(AuthOutcome {
            account,
            collection,
            token,
            identity: resolution.identity,
            identity_details: resolution.identity_details,
            warning,
            oauth_providers,
        })
    }

    /// Creates an account and opens a session for it.
    ///
    /// Admin accounts can only be created while no admin exists yet, or by
    /// a signed-in admin.
    pub async fn sign_up(
        state: &ServiceState,
        req: SignUpRequest,
        caller: Option<&AuthSession>,
    ) -> Result<AuthOutcome, ServiceError> {
        let name = req.name.trim();
        let email = normalize_email(&req.email);
        validate_sign_up(name, &email, &req.password)?;

        let collection = req.collection.unwrap_or(Collection::Users);
        let bootstrap_admin =
            collection == Collection::Admins && !caller.is_some_and(AuthSession::is_admin);
        // Fast refusal before hashing; the insert below re-checks atomically.
        if bootstrap_admin && state.accounts().count_accounts(Collection::Admins).await? > 0 {
            return Err(ServiceError::Forbidden(
                "Only admins can create admin accounts".to_owned(),
            ));
        }

        let existing = identity::get_identity_details(&email, state.accounts()).await?;
        if existing.identity_details.exists_in(collection) {
            return Err(ServiceError::Conflict(
                "An account with this email already exists".to_owned(),
            ));
        }
        let other = collection.other();
        let warning = existing.identity_details.exists_in(other).then(|| {
            format!(
                "This email is already registered in {other}. \
                 The new account is separate and has its own password."
            )
        });

        let password_hash = password::hash_password_blocking(req.password).await?;
        let new_account = NewAccount {
            name: name.to_owned(),
            email,
            password_hash: Some(password_hash),
        };
        let account = if bootstrap_admin {
            state.accounts().create_first_admin(new_account).await?
        } else {
            state.accounts().create_account(collection, new_account).await?
        };

        let resolution = identity::get_identity_details(&account.email, state.accounts()).await?;
        let token = state.sessions().create(&account.id, collection);

        state.metrics().record_sign_up();
        tracing::info!(account_id = %account.id, %collection, "account created");

        Ok(AuthOutcome {
            account,
            collection,
            token,
            identity: resolution.identity,
            identity_details: resolution.identity_details,
            warning,
            oauth_providers: Vec::new(),
        })
    }

    /// Ends a session. Returns whether it existed.
    pub fn sign_out(state: &ServiceState, token: &str) -> bool {
        state.sessions().remove(token)
    }

    /// Resolves the signed-in principal. A session whose account has since
    /// disappeared is treated as unauthenticated.
    pub async fn current(
        state: &ServiceState,
        session: &AuthSession,
    ) -> Result<Principal, ServiceError> {
        let resolution = identity::get_identity_details_for_user(
            &session.account_id,
            session.collection,
            state.accounts(),
        )
        .await
        .map_err(|e| match e {
            ServiceError::NotFound(_) => ServiceError::Unauthorized,
            other => other,
        })?;

        let account = resolution
            .account(session.collection)
            .cloned()
            .ok_or(ServiceError::Unauthorized)?;
        let oauth_providers = oauth_providers(state, &account.id, session.collection).await?;

        Ok(Principal {
            account,
            collection: session.collection,
            identity: resolution.identity,
            identity_details: resolution.identity_details,
            oauth_providers,
        })
    }

    /// Records that the signed-in account authenticated with `provider`.
    ///
    /// The provider handshake happens elsewhere; this only stores the link.
    pub async fn link_oauth(
        state: &ServiceState,
        session: &AuthSession,
        provider: &str,
        provider_account_id: &str,
    ) -> Result<OAuthLink, ServiceError> {
        let provider = provider.trim().to_lowercase();
        let provider_account_id = provider_account_id.trim();
        if provider.is_empty()
            || !provider
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-')
        {
            return Err(ServiceError::BadRequest(
                "A valid provider name is required".to_owned(),
            ));
        }
        if provider_account_id.is_empty() {
            return Err(ServiceError::BadRequest(
                "Provider account id is required".to_owned(),
            ));
        }

        let link = state
            .accounts()
            .create_oauth_link(NewOAuthLink {
                user_id: session.account_id.clone(),
                target_collection: session.collection,
                provider,
                provider_account_id: provider_account_id.to_owned(),
            })
            .await?;
        tracing::info!(
            account_id = %link.user_id,
            provider = %link.provider,
            "OAuth account linked"
        );
        Ok(link)
    }
}

fn validate_sign_up(name: &str, email: &str, password: &str) -> Result<(), ServiceError> {
    if name.is_empty() {
        return Err(ServiceError::BadRequest("Name is required".to_owned()));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(ServiceError::BadRequest(format!(
            "Name must be at most {MAX_NAME_LEN} characters"
        )));
    }
    if !is_plausible_email(email) {
        return Err(ServiceError::BadRequest(
            "A valid email address is required".to_owned(),
        ));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ServiceError::BadRequest(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

/// Sorted, de-duplicated provider names linked to an account.
async fn oauth_providers(
    state: &ServiceState,
    account_id: &str,
    collection: Collection,
) -> Result<Vec<String>, ServiceError> {
    let mut providers: Vec<String> = state
        .accounts()
        .find_oauth_links(account_id, collection)
        .await?
        .into_iter()
        .map(|link| link.provider)
        .collect();
    providers.sort();
    providers.dedup();
    Ok(providers)
}
