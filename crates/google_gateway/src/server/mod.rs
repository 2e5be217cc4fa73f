//! Gateway HTTP Server
//!
//! Wires the OAuth handlers, the auth gate and the Drive/Sheets handlers
//! into one axum router.

pub mod api_handlers;
pub mod oauth_handlers;
pub mod pages;

use axum::{
    http::{header, HeaderName, HeaderValue, Method},
    middleware,
    routing::{get, post, put},
    Router as AxumRouter,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};

use crate::auth::{
    gate::USER_ID_HEADER, require_session, CookieSigner, InMemorySessionStore, OAuthClient,
    PendingAuthorizations, SessionStore, TokenBroker,
};
use crate::config::GatewayConfig;

/// Application state shared across handlers
pub struct AppState {
    pub config: GatewayConfig,
    /// Session records keyed by session id (or user id in `header` mode)
    pub broker: TokenBroker,
    /// `None` when client credentials are missing or invalid
    pub oauth: Option<OAuthClient>,
    pub cookies: CookieSigner,
    pub pending: PendingAuthorizations,
    /// Shared connection pool for every Google API call
    pub http: reqwest::Client,
}

impl AppState {
    /// Build state backed by the in-memory session store
    pub fn new(config: GatewayConfig) -> anyhow::Result<Self> {
        Self::with_store(config, Arc::new(InMemorySessionStore::new()))
    }

    pub fn with_store(config: GatewayConfig, store: Arc<dyn SessionStore>) -> anyhow::Result<Self> {
        let oauth = match config.oauth.clone().map(OAuthClient::new).transpose() {
            Ok(client) => client,
            Err(e) => {
                warn!("[WARN] Ignoring invalid OAuth configuration: {}", e);
                None
            }
        };

        let http = reqwest::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build HTTP client: {}", e))?;

        Ok(Self {
            broker: TokenBroker::new(store, config.auth_start_url()),
            cookies: CookieSigner::new(
                &config.session_secret,
                config.public_base_url.starts_with("https://"),
            ),
            pending: PendingAuthorizations::new(),
            oauth,
            http,
            config,
        })
    }
}

fn cors_layer(config: &GatewayConfig) -> CorsLayer {
    if config.cors_allowed_origins.is_empty() {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    let origins: Vec<HeaderValue> = config
        .cors_allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("[WARN] Skipping invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    // Credentialed CORS forbids wildcards, so methods and headers are listed
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static(USER_ID_HEADER),
        ])
        .allow_credentials(true)
}

/// Build the gateway router
///
/// Public routes:
/// - GET  / - Health banner
/// - GET  /auth/google - Start Google authorization
/// - GET  /auth/google/callback - OAuth callback handler
///
/// Gated routes (require a resolvable session):
/// - POST /auth/logout
/// - GET  /api/drive/files
/// - GET  /api/sheets/read
/// - POST /api/sheets/write
/// - PUT  /api/sheets/update
pub fn build_router(state: Arc<AppState>) -> AxumRouter {
    let gated = AxumRouter::new()
        .route("/auth/logout", post(oauth_handlers::logout))
        .route("/api/drive/files", get(api_handlers::list_drive_files))
        .route("/api/sheets/read", get(api_handlers::read_sheet))
        .route("/api/sheets/write", post(api_handlers::write_sheet))
        .route("/api/sheets/update", put(api_handlers::update_sheet))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_session));

    AxumRouter::new()
        .route("/", get(api_handlers::health))
        .route("/auth/google", get(oauth_handlers::start_authorization))
        .route("/auth/google/callback", get(oauth_handlers::authorization_callback))
        .merge(gated)
        .layer(cors_layer(&state.config))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the gateway HTTP server
///
/// # Errors
/// Returns error if the HTTP client cannot be built or binding fails
pub async fn start_server(config: GatewayConfig) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let state = Arc::new(AppState::new(config)?);

    info!("[OK] Auth mode: {}", state.config.auth_mode);
    match &state.oauth {
        Some(oauth) => info!("[OK] Google OAuth configured: {}", oauth.config().client_id),
        None => warn!("[WARN] Google OAuth not configured; /auth/google will answer 503"),
    }

    let app = build_router(state);

    let listener = TcpListener::bind(&addr).await?;

    info!("[INFO] Google gateway listening on {}", addr);
    info!("[INFO] Available endpoints:");
    info!("  GET    /                        - Health check");
    info!("  GET    /auth/google             - Start Google authorization");
    info!("  GET    /auth/google/callback    - OAuth callback handler");
    info!("  POST   /auth/logout             - Revoke the current session");
    info!("  GET    /api/drive/files         - List Drive files");
    info!("  GET    /api/sheets/read         - Read a sheet range");
    info!("  POST   /api/sheets/write        - Append rows to a range");
    info!("  PUT    /api/sheets/update       - Overwrite a range");

    axum::serve(listener, app).await?;

    Ok(())
}
