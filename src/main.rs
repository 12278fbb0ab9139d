//! Inkboard Server entry point.

use std::net::SocketAddr;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

use inkboard_server::config::Config;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::parse();

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    if config.log_format == "json" {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let state = inkboard_server::app_state(&config);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        session_ttl = config.session_ttl,
        secure_cookies = config.secure_cookies,
        "Inkboard Server starting",
    );

    if let Some(path) = &config.seed_file {
        let summary = inkboard_server::load_seed_file(state.service(), path).await?;
        tracing::info!(
            path = %path.display(),
            accounts = summary.accounts,
            posts = summary.posts,
            oauth_links = summary.oauth_links,
            "Seed data loaded",
        );
    }

    let app = inkboard_server::router(state.clone());

    let addr = SocketAddr::new(config.host.parse()?, config.port);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Rate-limit windows are swept inline on each check; only sessions need a timer.
    let cleanup_state = state.clone();
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(Duration::from_secs(60)).await;
            let removed = cleanup_state.cleanup_expired_sessions();
            if removed > 0 {
                tracing::info!(removed, "Cleaned up expired sessions");
            }
        }
    });

    tracing::info!(%addr, "Inkboard Server ready");

    inkboard_server::serve(listener, app, shutdown_signal()).await?;

    tracing::info!("Inkboard Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to install signal handler: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
