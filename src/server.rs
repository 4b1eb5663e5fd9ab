//! HTTP server bootstrap for the agrichain ledger.
//!
//! This module wires together:
//! - configuration
//! - the journal backend and ledger replay
//! - authentication and rate limiting
//! - the Axum router

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::http::{HeaderValue, Method};
use axum::routing::get;
use axum::Router;
use tower_http::cors::AllowOrigin;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

use crate::access::{ApiKeyValidator, AuthMiddlewareState, Authenticator, RateLimiter};
use crate::api::handlers::health;
use crate::domain::Address;
use crate::infra::{Journal, MemoryJournal, SqliteJournal};
use crate::ledger::Ledger;
use crate::metrics::MetricsRegistry;

const DEFAULT_JOURNAL_URL: &str = "sqlite://agrichain.db";

/// Where the ledger journal lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JournalConfig {
    /// Volatile in-process journal, lost on restart
    Memory,
    /// SQLite database URL
    Sqlite(String),
}

impl JournalConfig {
    pub fn parse(url: &str) -> anyhow::Result<Self> {
        let url = url.trim();
        if url.eq_ignore_ascii_case("memory") {
            Ok(Self::Memory)
        } else if url.starts_with("sqlite:") {
            Ok(Self::Sqlite(url.to_string()))
        } else {
            anyhow::bail!("JOURNAL_URL must be `memory` or a sqlite: URL, got {url:?}")
        }
    }

    /// Open the configured journal, running migrations for SQLite.
    pub async fn open(&self) -> anyhow::Result<Arc<dyn Journal>> {
        Ok(match self {
            Self::Memory => Arc::new(MemoryJournal::new()),
            Self::Sqlite(url) => Arc::new(
                SqliteJournal::connect(url)
                    .await
                    .with_context(|| format!("failed to open journal at {url}"))?,
            ),
        })
    }
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub listen_addr: SocketAddr,
    pub journal: JournalConfig,
    /// Admin granted on a fresh journal
    pub admin: Option<Address>,
    pub require_auth: bool,
    /// `<key>=<0xaddress>` pairs
    pub api_keys: Option<String>,
    pub rate_limit_per_minute: Option<u32>,
    pub cors_allow_origins: Option<String>,
    pub log_json: bool,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let var = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let host = var("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port: u16 = match var("PORT") {
            Some(p) => p.parse().with_context(|| format!("invalid PORT {p:?}"))?,
            None => 8080,
        };
        let listen_addr: SocketAddr = format!("{host}:{port}")
            .parse()
            .with_context(|| format!("invalid listen address {host}:{port}"))?;

        let journal =
            JournalConfig::parse(&var("JOURNAL_URL").unwrap_or_else(|| DEFAULT_JOURNAL_URL.into()))?;

        let admin = var("LEDGER_ADMIN_ADDRESS")
            .map(|raw| {
                raw.parse::<Address>()
                    .with_context(|| format!("invalid LEDGER_ADMIN_ADDRESS {raw:?}"))
            })
            .transpose()?;

        let require_auth = match var("AUTH_MODE").as_deref() {
            None | Some("required") => true,
            Some("disabled") => false,
            Some(other) => anyhow::bail!("AUTH_MODE must be `required` or `disabled`, got {other:?}"),
        };

        let rate_limit_per_minute = match var("RATE_LIMIT_PER_MINUTE") {
            Some(v) => {
                let rpm: u32 = v
                    .parse()
                    .with_context(|| format!("invalid RATE_LIMIT_PER_MINUTE {v:?}"))?;
                (rpm > 0).then_some(rpm)
            }
            None => None,
        };

        let log_json = var("LOG_JSON")
            .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        Ok(Self {
            listen_addr,
            journal,
            admin,
            require_auth,
            api_keys: var("LEDGER_API_KEYS"),
            rate_limit_per_minute,
            cors_allow_origins: var("CORS_ALLOW_ORIGINS"),
            log_json,
        })
    }

    /// Build the auth middleware state from the key and rate-limit settings.
    pub fn auth_state(&self) -> anyhow::Result<AuthMiddlewareState> {
        let validator = match &self.api_keys {
            Some(keys) => ApiKeyValidator::from_config(keys)
                .map_err(|e| anyhow::anyhow!("invalid LEDGER_API_KEYS: {e}"))?,
            None => ApiKeyValidator::new(),
        };

        if self.require_auth && validator.is_empty() {
            anyhow::bail!(
                "AUTH_MODE=required but no API keys are configured; set LEDGER_API_KEYS (or set AUTH_MODE=disabled for local dev)"
            );
        }

        Ok(AuthMiddlewareState {
            authenticator: Arc::new(Authenticator::new(Arc::new(validator))),
            require_auth: self.require_auth,
            rate_limiter: self
                .rate_limit_per_minute
                .map(|rpm| Arc::new(RateLimiter::new(rpm))),
        })
    }
}

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<Ledger>,
    pub metrics: Arc<MetricsRegistry>,
}

impl AppState {
    pub fn new(ledger: Arc<Ledger>) -> Self {
        let metrics = ledger.metrics().clone();
        Self { ledger, metrics }
    }
}

/// Start the HTTP server.
pub async fn run() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    init_tracing(config.log_json);

    info!("Starting agrichain ledger v{}", env!("CARGO_PKG_VERSION"));
    info!("  Listen address: {}", config.listen_addr);
    info!("  Journal: {:?}", config.journal);
    info!("  Auth required: {}", config.require_auth);

    let auth_state = config.auth_state()?;

    let journal = config.journal.open().await?;
    let metrics = Arc::new(MetricsRegistry::new());
    let ledger = Ledger::open(journal, config.admin, metrics)
        .await
        .context("failed to open ledger")?;
    let state = AppState::new(Arc::new(ledger));

    let cors = cors_layer(config.cors_allow_origins.as_deref())?;
    let app = build_router(auth_state, cors).with_state(state);

    info!("Starting HTTP server on {}", config.listen_addr);
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;

    info!("agrichain ledger is ready to accept connections");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("agrichain ledger stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}

pub fn init_tracing(json: bool) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(Level::INFO.to_string()));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true);

    if json {
        builder.json().init();
    } else {
        builder.with_thread_ids(true).init();
    }
}

/// Build the full router: public probes plus the authenticated `/api` tree.
pub fn build_router(auth_state: AuthMiddlewareState, cors: Option<CorsLayer>) -> Router<AppState> {
    let api = crate::api::router().layer(axum::middleware::from_fn_with_state(
        auth_state,
        crate::access::auth_middleware,
    ));

    let mut router = Router::new()
        .nest("/api", api)
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        .route("/metrics", get(health::metrics))
        .layer(TraceLayer::new_for_http());

    if let Some(cors_layer) = cors {
        router = router.layer(cors_layer);
    }

    router
}

/// CORS layer from a comma-separated origin list (`*` allows any).
pub fn cors_layer(origins: Option<&str>) -> anyhow::Result<Option<CorsLayer>> {
    let origins = match origins.map(str::trim) {
        Some(v) if !v.is_empty() => v,
        _ => return Ok(None),
    };

    let allow_origin = if origins == "*" {
        AllowOrigin::any()
    } else {
        let origins: Vec<HeaderValue> = origins
            .split(',')
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.parse::<HeaderValue>()
                    .map_err(|e| anyhow::anyhow!("Invalid CORS origin {s:?}: {e}"))
            })
            .collect::<anyhow::Result<_>>()?;
        AllowOrigin::list(origins)
    };

    Ok(Some(
        CorsLayer::new()
            .allow_origin(allow_origin)
            .allow_methods([Method::GET, Method::POST, Method::PUT])
            .allow_headers([
                axum::http::header::AUTHORIZATION,
                axum::http::header::CONTENT_TYPE,
                axum::http::HeaderName::from_static(crate::access::CALLER_ADDRESS_HEADER),
            ]),
    ))
}
