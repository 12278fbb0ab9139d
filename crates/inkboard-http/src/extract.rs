//! Request extractors: client IP, session authentication, session cookies.

use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::header::{AUTHORIZATION, COOKIE};
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderValue};
use inkboard_service::error::ServiceError;
use inkboard_service::session::AuthSession;

use crate::error::ApiError;
use crate::state::AppState;

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "inkboard-token";

/// The client's address as a string, empty when unknown.
///
/// See [`client_ip`] for how it is resolved.
#[derive(Debug, Clone)]
pub struct ClientIp(pub String);

impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ci| ci.0);
        Ok(Self(client_ip(&parts.headers, peer)))
    }
}

/// Resolves the rate-limit key for a request.
///
/// The first `X-Forwarded-For` entry wins when it parses as an IP address
/// (optionally with a port); anything else falls back to the peer address.
/// Addresses are rendered canonically so one client maps to one counter.
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .map(str::trim)
        .and_then(|first| {
            first
                .parse::<IpAddr>()
                .ok()
                .or_else(|| first.parse::<SocketAddr>().ok().map(|sa| sa.ip()))
        });

    match forwarded.or_else(|| peer.map(|sa| sa.ip())) {
        Some(ip) => ip.to_string(),
        None => {
            tracing::debug!("no usable client address");
            String::new()
        }
    }
}

/// A live sign-in session, from the session cookie or a bearer token.
///
/// Rejects with 401 when no token is presented or it is unknown/expired.
#[derive(Debug, Clone)]
pub struct Authenticated {
    pub session: AuthSession,
    pub token: String,
}

impl FromRequestParts<AppState> for Authenticated {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = session_token(&parts.headers).ok_or(ServiceError::Unauthorized)?;
        let session = state
            .authenticate(&token)
            .ok_or(ServiceError::Unauthorized)?;
        Ok(Self { session, token })
    }
}

/// Like [`Authenticated`] but never rejects.
#[derive(Debug, Clone)]
pub struct MaybeAuthenticated(pub Option<Authenticated>);

impl FromRequestParts<AppState> for MaybeAuthenticated {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(Self(
            Authenticated::from_request_parts(parts, state).await.ok(),
        ))
    }
}

/// Reads the session token: `Authorization: Bearer` first, then the cookie.
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    if let Some(value) = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok())
        && let Some(token) = value.strip_prefix("Bearer ")
        && !token.trim().is_empty()
    {
        return Some(token.trim().to_owned());
    }

    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == SESSION_COOKIE && !value.is_empty())
        .map(|(_, value)| value.to_owned())
}

/// `Set-Cookie` value carrying a fresh session token.
pub fn session_cookie(token: &str, max_age_secs: u64, secure: bool) -> HeaderValue {
    let mut cookie =
        format!("{SESSION_COOKIE}={token}; HttpOnly; Path=/; SameSite=Lax; Max-Age={max_age_secs}");
    if secure {
        cookie.push_str("; Secure");
    }
    // Tokens are hex, so the value is always valid header text.
    HeaderValue::from_str(&cookie).unwrap_or_else(|_| HeaderValue::from_static(""))
}

/// `Set-Cookie` value that removes the session cookie.
pub fn clear_session_cookie(secure: bool) -> HeaderValue {
    if secure {
        HeaderValue::from_static(
            "inkboard-token=; HttpOnly; Path=/; SameSite=Lax; Max-Age=0; Secure",
        )
    } else {
        HeaderValue::from_static("inkboard-token=; HttpOnly; Path=/; SameSite=Lax; Max-Age=0")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_from_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("theme=dark; inkboard-token=abc123; other=1"),
        );
        assert_eq!(session_token(&headers).as_deref(), Some("abc123"));
    }

    #[test]
    fn test_bearer_takes_priority() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("inkboard-token=cookie"));
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer header"));
        assert_eq!(session_token(&headers).as_deref(), Some("header"));
    }

    #[test]
    fn test_missing_or_empty_token() {
        let mut headers = HeaderMap::new();
        assert!(session_token(&headers).is_none());
        headers.insert(COOKIE, HeaderValue::from_static("inkboard-token="));
        assert!(session_token(&headers).is_none());
    }

    #[test]
    fn test_cookie_attributes() {
        let cookie = session_cookie("ff00", 3600, true);
        let s = cookie.to_str().unwrap();
        assert!(s.starts_with("inkboard-token=ff00;"));
        assert!(s.contains("HttpOnly"));
        assert!(s.contains("SameSite=Lax"));
        assert!(s.contains("Max-Age=3600"));
        assert!(s.ends_with("; Secure"));

        let cleared = clear_session_cookie(false);
        assert!(cleared.to_str().unwrap().contains("Max-Age=0"));
    }

    fn forwarded(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn test_client_ip_prefers_valid_forwarded_for() {
        let peer: SocketAddr = "127.0.0.1:4000".parse().unwrap();
        assert_eq!(
            client_ip(&forwarded("203.0.113.7, 10.0.0.1"), Some(peer)),
            "203.0.113.7"
        );
        assert_eq!(
            client_ip(&forwarded("198.51.100.2:8080"), Some(peer)),
            "198.51.100.2"
        );
    }

    #[test]
    fn test_client_ip_canonicalizes_ipv6() {
        assert_eq!(
            client_ip(&forwarded("2001:DB8:0:0:0:0:0:1"), None),
            "2001:db8::1"
        );
        assert_eq!(client_ip(&forwarded("[2001:db8::1]:443"), None), "2001:db8::1");
    }

    #[test]
    fn test_client_ip_ignores_unparseable_forwarded_for() {
        let peer: SocketAddr = "192.0.2.10:5555".parse().unwrap();
        for junk in ["not-an-ip", "attempt-1", "unknown", "  ", "10.0.0.1 evil"] {
            let mut headers = HeaderMap::new();
            headers.insert("x-forwarded-for", HeaderValue::from_str(junk).unwrap());
            assert_eq!(client_ip(&headers, Some(peer)), "192.0.2.10", "{junk:?}");
        }
        assert_eq!(client_ip(&forwarded("garbage"), None), "");
        assert_eq!(client_ip(&HeaderMap::new(), Some(peer)), "192.0.2.10");
    }
}
