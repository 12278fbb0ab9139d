//! Server configuration via CLI args and environment variables.

use std::path::PathBuf;

use clap::Parser;
use inkboard_service::ServiceConfig;

/// Account and comment server for the Inkboard blog.
#[derive(Parser, Debug, Clone)]
#[command(name = "inkboard-server", version, about)]
pub struct Config {
    /// Bind address.
    #[arg(long, default_value = "0.0.0.0", env = "INKBOARD_HOST")]
    pub host: String,

    /// Bind port.
    #[arg(long, default_value_t = 3000, env = "INKBOARD_PORT")]
    pub port: u16,

    /// Sign-in session inactivity timeout in seconds.
    #[arg(long, default_value_t = 604_800, env = "INKBOARD_SESSION_TTL")]
    pub session_ttl: u64,

    /// CORS allowed origins (comma-separated). Empty for no CORS.
    #[arg(long, env = "INKBOARD_CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Vec<String>,

    /// Mark the session cookie `Secure` (serve behind HTTPS).
    #[arg(long, env = "INKBOARD_SECURE_COOKIES")]
    pub secure_cookies: bool,

    /// JSON file with `admins`, `users`, `posts` and `oauthLinks` to load at startup.
    #[arg(long, env = "INKBOARD_SEED_FILE")]
    pub seed_file: Option<PathBuf>,

    /// Log level.
    #[arg(long, default_value = "info", env = "INKBOARD_LOG_LEVEL")]
    pub log_level: String,

    /// Log format: "pretty" or "json".
    #[arg(long, default_value = "pretty", env = "INKBOARD_LOG_FORMAT", value_parser = ["pretty", "json"])]
    pub log_format: String,
}

impl Config {
    /// Parses configuration from CLI args and env vars.
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    /// The subset handed to the service layer.
    pub fn service_config(&self) -> ServiceConfig {
        ServiceConfig {
            session_ttl: self.session_ttl,
        }
    }
}
