//! Login server

use axum::{middleware, routing::get, Router};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::trace::{DefaultMakeSpan, TraceLayer};
use tracing::{debug, info};
use warden_auth::{CredentialStore, SessionGate};
use warden_core::{Result, WardenConfig};

use crate::middleware::validate_host;
use crate::routes;
use crate::session::SessionStore;

const SESSION_PURGE_INTERVAL: Duration = Duration::from_secs(60);

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<WardenConfig>,
    pub gate: SessionGate,
    pub sessions: Arc<SessionStore>,
    pub expected_host: Option<Arc<str>>,
    /// Include backend error text in 503 responses
    pub debug: bool,
}

impl AppState {
    pub fn new(config: WardenConfig, store: Arc<dyn CredentialStore>, debug: bool) -> Self {
        let sessions = SessionStore::new(&config.session);
        let expected_host = config.server.expected_host().map(Arc::from);

        Self {
            config: Arc::new(config),
            gate: SessionGate::new(store),
            sessions: Arc::new(sessions),
            expected_host,
            debug,
        }
    }
}

pub struct WardenServer {
    state: AppState,
}

impl WardenServer {
    pub fn new(config: WardenConfig, store: Arc<dyn CredentialStore>, debug: bool) -> Self {
        Self {
            state: AppState::new(config, store, debug),
        }
    }

    pub async fn run(self) -> Result<()> {
        let config = self.state.config.clone();
        let addr = format!("{}:{}", config.server.bind_address, config.server.port);

        let sessions = self.state.sessions.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(SESSION_PURGE_INTERVAL);
            loop {
                interval.tick().await;
                let purged = sessions.purge_expired();
                if purged > 0 {
                    debug!("Purged {} idle sessions", purged);
                }
            }
        });

        let app = create_router(self.state.clone());
        let listener = TcpListener::bind(&addr).await?;

        info!("Warden listening on http://{}", addr);
        info!("Authentication backend: {}", self.state.gate.backend());
        if let Some(host) = &self.state.expected_host {
            info!("Accepting requests for host {}", host);
        }

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("Warden stopped");
        Ok(())
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(routes::index))
        .route("/index", get(routes::index))
        .route("/login", get(routes::login_get).post(routes::login_post))
        .route("/logout", get(routes::logout))
        .route("/{page}", get(routes::page))
        .fallback(routes::fallback)
        .layer(middleware::from_fn_with_state(state.clone(), validate_host))
        .layer(TraceLayer::new_for_http().make_span_with(DefaultMakeSpan::default()))
        .with_state(state)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
