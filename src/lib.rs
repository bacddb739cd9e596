// Library exports for the API binary, operator tools and tests
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use config::Config;
use error::AuthResult;
use services::{
    auth::SessionService, password::SecretHasher, refresh_tokens::RefreshTokenStore,
    setup::SetupService, tokens::TokenSigner, users::UserRepository,
};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub sessions: Arc<SessionService>,
    pub setup: Arc<SetupService>,
    pub signer: Arc<TokenSigner>,
    pub refresh_tokens: Arc<dyn RefreshTokenStore>,
}

impl AppState {
    /// Wires the session layer from its collaborators.
    pub fn new(
        config: Arc<Config>,
        users: Arc<dyn UserRepository>,
        refresh_tokens: Arc<dyn RefreshTokenStore>,
    ) -> AuthResult<Self> {
        let hasher = SecretHasher::new(&config.password)?;
        let signer = TokenSigner::new(&config.jwt_access_secret, config.access_token_ttl_seconds);
        let sessions = SessionService::new(
            users.clone(),
            refresh_tokens.clone(),
            hasher.clone(),
            signer.clone(),
            config.refresh_token_ttl_days,
        );

        Ok(Self {
            config,
            sessions: Arc::new(sessions),
            setup: Arc::new(SetupService::new(users, hasher)),
            signer: Arc::new(signer),
            refresh_tokens,
        })
    }
}

/// All routes behind the authorization gate. Public ones are listed in
/// [`middleware::auth::PUBLIC_ROUTES`].
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/metrics", get(routes::metrics::metrics_handler))
        // Setup
        .route("/setup/status", get(routes::setup::status))
        .route("/setup", post(routes::setup::create_superadmin))
        // Auth
        .route("/auth/login", post(routes::auth::login))
        .route("/auth/refresh", post(routes::auth::refresh))
        .route("/auth/logout", post(routes::auth::logout))
        .route("/auth/me", get(routes::auth::me))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::require_auth,
        ))
        .with_state(state)
}
