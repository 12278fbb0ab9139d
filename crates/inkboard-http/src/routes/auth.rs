//! Sign-in, sign-up, sign-out, current principal and OAuth linking.

use axum::extract::{Json, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::IntoResponse;
use inkboard_service::auth::{AuthService, SignInRequest, SignUpRequest};

use crate::error::{ApiError, ErrorBody};
use crate::extract::{self, Authenticated, MaybeAuthenticated};
use crate::state::AppState;
use crate::types::{
    AuthResponse, OAuthLinkBody, OAuthLinkResponse, SignInBody, SignOutResponse, SignUpBody,
};

fn session_headers(state: &AppState, token: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::SET_COOKIE,
        extract::session_cookie(token, state.session_ttl(), state.secure_cookies()),
    );
    headers
}

/// Sign in with email and password.
///
/// Without `collection`, the email's identity picks the collection; an email
/// registered as both admin and user signs in as admin and the response
/// carries a `warning`. Any credential failure is a generic 401.
#[utoipa::path(
    post,
    path = "/api/auth/signin",
    request_body = SignInBody,
    responses(
        (status = 200, description = "Signed in; session cookie set", body = AuthResponse),
        (status = 400, description = "Missing email or password", body = ErrorBody),
        (status = 401, description = "Invalid credentials", body = ErrorBody),
    ),
    tag = "Auth"
)]
pub async fn sign_in(
    State(state): State<AppState>,
    body: Result<Json<SignInBody>, axum::extract::rejection::JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(body) = body?;
    let outcome = AuthService::sign_in(
        &state,
        SignInRequest {
            email: body.email,
            password: body.password,
            collection: body.collection,
        },
    )
    .await?;

    let headers = session_headers(&state, &outcome.token);
    Ok((headers, Json(AuthResponse::from(outcome))))
}

/// Create an account and sign in to it.
///
/// Creating an admin requires an admin session unless no admin exists yet.
#[utoipa::path(
    post,
    path = "/api/auth/signup",
    request_body = SignUpBody,
    responses(
        (status = 201, description = "Account created; session cookie set", body = AuthResponse),
        (status = 400, description = "Validation failed", body = ErrorBody),
        (status = 403, description = "Admin sign-up not allowed", body = ErrorBody),
        (status = 409, description = "Email already registered in the collection", body = ErrorBody),
    ),
    tag = "Auth"
)]
pub async fn sign_up(
    State(state): State<AppState>,
    MaybeAuthenticated(caller): MaybeAuthenticated,
    body: Result<Json<SignUpBody>, axum::extract::rejection::JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(body) = body?;
    let outcome = AuthService::sign_up(
        &state,
        SignUpRequest {
            name: body.name,
            email: body.email,
            password: body.password,
            collection: body.collection,
        },
        caller.as_ref().map(|c| &c.session),
    )
    .await?;

    let headers = session_headers(&state, &outcome.token);
    Ok((
        StatusCode::CREATED,
        headers,
        Json(AuthResponse::from(outcome)),
    ))
}

/// End the current session and clear the cookie. Always succeeds.
#[utoipa::path(
    post,
    path = "/api/auth/signout",
    responses(
        (status = 200, description = "Signed out", body = SignOutResponse),
    ),
    tag = "Auth"
)]
pub async fn sign_out(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    let signed_out = extract::session_token(&headers)
        .is_some_and(|token| AuthService::sign_out(&state, &token));
    (
        [(
            header::SET_COOKIE,
            extract::clear_session_cookie(state.secure_cookies()),
        )],
        Json(SignOutResponse { signed_out }),
    )
}

/// The signed-in account with its identity across both collections.
#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "Current principal", body = AuthResponse),
        (status = 401, description = "Not signed in", body = ErrorBody),
    ),
    tag = "Auth"
)]
pub async fn me(
    State(state): State<AppState>,
    auth: Authenticated,
) -> Result<Json<AuthResponse>, ApiError> {
    let principal = AuthService::current(&state, &auth.session).await?;
    Ok(Json(AuthResponse::from(principal)))
}

/// Link an OAuth provider identity to the signed-in account.
#[utoipa::path(
    post,
    path = "/api/auth/oauth/link",
    request_body = OAuthLinkBody,
    responses(
        (status = 201, description = "Link recorded", body = OAuthLinkResponse),
        (status = 400, description = "Invalid provider or id", body = ErrorBody),
        (status = 401, description = "Not signed in", body = ErrorBody),
        (status = 409, description = "Provider identity already linked", body = ErrorBody),
    ),
    tag = "Auth"
)]
pub async fn link_oauth(
    State(state): State<AppState>,
    auth: Authenticated,
    body: Result<Json<OAuthLinkBody>, axum::extract::rejection::JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(body) = body?;
    let link = AuthService::link_oauth(
        &state,
        &auth.session,
        &body.provider,
        &body.provider_account_id,
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(OAuthLinkResponse {
            id: link.id,
            provider: link.provider,
            provider_account_id: link.provider_account_id,
            collection: link.target_collection,
        }),
    ))
}
