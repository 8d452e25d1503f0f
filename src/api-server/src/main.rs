//! Budibase Authorization API Server
//!
//! Serves role and permission management for one workspace over HTTP.
//!
//! # Usage
//!
//! ```bash
//! # Start with default settings (0.0.0.0:8080)
//! cargo run --bin authz-server
//!
//! # Custom host and port, seeded with roles
//! cargo run --bin authz-server -- --host 127.0.0.1 --port 9090 --roles-file roles.json
//!
//! # Debug logging
//! RUST_LOG=debug cargo run --bin authz-server
//! ```
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: Logging level (trace, debug, info, warn, error)
//! - `API_SERVER_HOST`: Server host (default: 0.0.0.0)
//! - `API_SERVER_PORT`: Server port (default: 8080)
//! - `API_SERVER_MAX_CONNECTIONS`: Max concurrent requests (default: 1024)
//! - `API_SERVER_REQUEST_TIMEOUT`: Request timeout in seconds (default: 30)
//! - `API_SERVER_JSON_LOGS`: Emit JSON logs
//! - `API_SERVER_ROLES_FILE`: JSON array of roles saved at startup

use anyhow::Result;
use api_server::{server::ServerBuilder, state::AppState};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Budibase Authorization API Server
#[derive(Parser, Debug)]
#[command(
    name = "authz-server",
    version,
    about = "REST API server for Budibase roles and permissions",
    long_about = None
)]
struct Args {
    /// Host to bind to
    #[arg(short = 'H', long, default_value = "0.0.0.0", env = "API_SERVER_HOST")]
    host: String,

    /// Port to listen on
    #[arg(short = 'p', long, default_value = "8080", env = "API_SERVER_PORT")]
    port: u16,

    /// Maximum concurrent requests
    #[arg(long, default_value = "1024", env = "API_SERVER_MAX_CONNECTIONS")]
    max_connections: usize,

    /// Request timeout in seconds
    #[arg(long, default_value = "30", env = "API_SERVER_REQUEST_TIMEOUT")]
    request_timeout: u64,

    /// Enable JSON logging format
    #[arg(long, env = "API_SERVER_JSON_LOGS")]
    json_logs: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, default_value = "info", env = "RUST_LOG")]
    log_level: String,

    /// Roles to save at startup (JSON array, parents first)
    #[arg(long, env = "API_SERVER_ROLES_FILE")]
    roles_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(&args);

    info!(version = env!("CARGO_PKG_VERSION"), "Starting Budibase authorization server");

    let state = Arc::new(AppState::default());
    if let Some(path) = &args.roles_file {
        let count = state.seed_roles(path).await?;
        info!(count, path = %path.display(), "Seeded roles");
    }

    let server = ServerBuilder::new()
        .host(&args.host)
        .port(args.port)
        .max_connections(args.max_connections)
        .request_timeout(args.request_timeout)
        .state(state)
        .build()?;

    if let Err(e) = server.run().await {
        error!("Server error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Filter from `RUST_LOG` if it parses as a directive, else from `--log-level`
fn env_filter(log_level: &str) -> EnvFilter {
    let level = log_level.parse::<tracing::Level>().unwrap_or_else(|_| {
        eprintln!("Invalid log level '{}', using 'info'", log_level);
        tracing::Level::INFO
    });
    let http = if level <= tracing::Level::INFO { "info" } else { "debug" };

    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!(
            "api_server={level},budibase_authz={level},authz_server={level},tower_http={http}",
            level = level.as_str().to_lowercase(),
            http = http,
        )
        .into()
    })
}

fn init_tracing(args: &Args) {
    let filter = env_filter(&args.log_level);

    if args.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_file(true)
                    .with_line_number(true),
            )
            .init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_parsing() {
        let args = Args::parse_from(vec![
            "authz-server",
            "--host",
            "127.0.0.1",
            "--port",
            "9090",
            "--roles-file",
            "roles.json",
        ]);

        assert_eq!(args.host, "127.0.0.1");
        assert_eq!(args.port, 9090);
        assert_eq!(args.roles_file, Some(PathBuf::from("roles.json")));
        assert!(!args.json_logs);
    }

    #[test]
    fn test_args_defaults() {
        let args = Args::parse_from(vec!["authz-server"]);

        assert_eq!(args.port, 8080);
        assert_eq!(args.max_connections, 1024);
        assert_eq!(args.request_timeout, 30);
        assert!(args.roles_file.is_none());
    }

    #[test]
    fn test_args_json_logs() {
        let args = Args::parse_from(vec!["authz-server", "--json-logs", "-l", "debug"]);
        assert!(args.json_logs);
        assert_eq!(args.log_level, "debug");
    }
}
