//! Warden - session-based login service
//!
//! Checks logins against a pluggable credential store (open, pwd, spwd or
//! ldap) and keeps the result in a cookie-backed session.

use clap::{builder::PossibleValuesParser, Parser};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use warden_auth::{StoreContext, StoreRegistry};
use warden_core::config::LoggingConfig;
use warden_core::WardenConfig;
use warden_server::WardenServer;

#[derive(Parser)]
#[command(name = "warden")]
#[command(author = "Warden Team")]
#[command(version = warden_core::VERSION)]
#[command(about = "Session-based login service with pluggable credential stores", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "WARDEN_CONFIG")]
    config: Option<String>,

    /// Debug environment: enables the open backend and error details
    #[arg(long, env = "WARDEN_DEBUG")]
    debug: bool,

    /// Authentication backend
    #[arg(long, env = "WARDEN_AUTH", value_parser = PossibleValuesParser::new(StoreRegistry::builtin().list_keys()))]
    auth: Option<String>,

    /// Bind address
    #[arg(long, env = "WARDEN_BIND_ADDRESS")]
    bind: Option<String>,

    /// Port number
    #[arg(short, long, env = "WARDEN_PORT")]
    port: Option<u16>,

    /// Expected Host header
    #[arg(long, env = "WARDEN_DOMAIN")]
    domain: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "WARDEN_LOG_LEVEL")]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let mut config = if let Some(config_path) = &cli.config {
        let mut config = WardenConfig::from_file(config_path)?;
        config.apply_env();
        config
    } else {
        WardenConfig::from_env()
    };

    // Override with CLI args
    if let Some(auth) = cli.auth {
        config.auth.backend = auth;
    }
    if let Some(bind) = cli.bind {
        config.server.bind_address = bind;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(domain) = cli.domain {
        config.server.domain = Some(domain);
    }
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }

    init_logging(&config.logging);

    info!("Starting Warden {}", warden_core::VERSION);
    if cli.debug {
        warn!("Debug mode enabled");
    }

    let backend = config.auth.backend.clone();
    let store = StoreRegistry::builtin()
        .build(&backend, StoreContext::new(config.clone(), cli.debug))
        .await?;

    WardenServer::new(config, store, cli.debug).run().await?;

    Ok(())
}

fn init_logging(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let json = logging.format.eq_ignore_ascii_case("json");

    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| fmt::layer().json()))
        .with((!json).then(|| fmt::layer().with_target(true)))
        .init();
}
