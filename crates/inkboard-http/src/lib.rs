//! Inkboard HTTP: REST API transport adapter for the Inkboard server.
//!
//! Provides the HTTP/REST interface including:
//! - Auth endpoints (sign-in, sign-up, sign-out, current principal, OAuth linking)
//! - Public comment submission with per-IP and per-email rate limiting
//! - Admin rate-limit overrides
//! - System/health and Prometheus metrics endpoints
//! - OpenAPI/Swagger UI
//! - Request-ID, CORS, compression and tracing middleware

pub mod error;
pub mod extract;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod types;

use axum::Router;
use axum::http::{HeaderValue, Method};
use axum::routing::{get, post};
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use error::ErrorBody;

pub use state::AppState;

// ---------------------------------------------------------------------------
// OpenAPI
// ---------------------------------------------------------------------------

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Inkboard Server API",
        description = "HTTP API for Inkboard: account sign-in across the admins and users collections, and rate-limited public comment intake.\n\nSessions are carried by the `inkboard-token` cookie or an `Authorization: Bearer` header.",
        version = "0.3.0",
        license(name = "Apache-2.0"),
    ),
    paths(
        routes::system::health,
        routes::auth::sign_in,
        routes::auth::sign_up,
        routes::auth::sign_out,
        routes::auth::me,
        routes::auth::link_oauth,
        routes::comments::submit_comment,
        routes::admin::ip_status,
        routes::admin::reset_ip,
        routes::admin::email_status,
        routes::admin::reset_email,
    ),
    components(
        schemas(
            ErrorBody,
            types::SignInBody, types::SignUpBody, types::OAuthLinkBody,
            types::AuthResponse, types::SignOutResponse, types::OAuthLinkResponse,
            types::CommentBody, types::CommentResponse,
            types::RateLimitStatusResponse, types::RateLimitResetResponse,
            types::HealthResponse,
            inkboard_service::types::Account, inkboard_service::types::Collection,
            inkboard_service::types::CommentStatus,
            inkboard_service::identity::Identity, inkboard_service::identity::IdentityDetails,
        )
    ),
    tags(
        (name = "Auth", description = "Sign-in, sign-up and sessions"),
        (name = "Comments", description = "Public comment submission"),
        (name = "Admin", description = "Rate-limit inspection and overrides"),
        (name = "System", description = "System and health endpoints"),
    )
)]
struct ApiDoc;

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Builds the HTTP API router.
///
/// Call this from the binary crate to get a fully-wired axum `Router`.
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        // Auth
        .route("/api/auth/signin", post(routes::auth::sign_in))
        .route("/api/auth/signup", post(routes::auth::sign_up))
        .route("/api/auth/signout", post(routes::auth::sign_out))
        .route("/api/auth/me", get(routes::auth::me))
        .route("/api/auth/oauth/link", post(routes::auth::link_oauth))
        // Comments
        .route("/api/comments", post(routes::comments::submit_comment))
        // Admin
        .route(
            "/api/admin/rate-limits/ip/{ip}",
            get(routes::admin::ip_status).delete(routes::admin::reset_ip),
        )
        .route(
            "/api/admin/rate-limits/email/{email}",
            get(routes::admin::email_status).delete(routes::admin::reset_email),
        )
        // System
        .route("/health", get(routes::system::health))
        .route("/metrics", get(routes::system::metrics_endpoint))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http());

    let api = api
        .layer(axum::middleware::from_fn(
            middleware::request_id::request_id_middleware,
        ))
        .layer(cors_layer(&state))
        .with_state(state);

    api.merge(SwaggerUi::new("/api/docs").url("/api/openapi.json", ApiDoc::openapi()))
}

/// Serve the HTTP router on the given listener with graceful shutdown.
///
/// Wraps `axum::serve` with `ConnectInfo<SocketAddr>` so comment rate
/// limiting can fall back to the peer address.
pub async fn serve(
    listener: tokio::net::TcpListener,
    app: Router,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await
}

fn cors_layer(state: &AppState) -> CorsLayer {
    let origins = state.cors_origins();

    // No origins configured → no CORS headers (deny cross-origin by default).
    if origins.is_empty() {
        return CorsLayer::new();
    }

    let x_request_id = middleware::request_id::X_REQUEST_ID.clone();
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            axum::http::header::AUTHORIZATION,
            x_request_id.clone(),
        ])
        .expose_headers([x_request_id, axum::http::header::RETRY_AFTER]);

    if origins.len() == 1 && origins[0] == "*" {
        tracing::warn!("CORS configured with wildcard origin; all cross-origin requests allowed");
        return base.allow_origin(tower_http::cors::Any);
    }

    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match o.parse() {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(origin = %o, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    // Credentialed cookies need an explicit origin list.
    base.allow_origin(parsed).allow_credentials(true)
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use super::*;

    #[tokio::test]
    async fn test_health_route() {
        let app = router(AppState::new_in_memory(300));
        let resp = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(resp.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn test_me_requires_session() {
        let app = router(AppState::new_in_memory(300));
        let resp = app
            .oneshot(Request::get("/api/auth/me").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_malformed_body_is_bad_request() {
        let app = router(AppState::new_in_memory(300));
        let resp = app
            .oneshot(
                Request::post("/api/auth/signin")
                    .header("content-type", "application/json")
                    .body(Body::from("{not json"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_openapi_lists_comment_route() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/comments"));
        assert!(doc.paths.paths.contains_key("/api/auth/signin"));
    }
}
