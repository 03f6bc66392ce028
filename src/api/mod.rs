//! API module
//!
//! HTTP API endpoints and middleware.

pub mod middleware;
pub mod routes;

use axum::extract::FromRef;
use axum::http::{HeaderValue, Method};
use axum::{middleware as axum_middleware, Router};
use sqlx::PgPool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::{Config, DEFAULT_SAMPLE_SIZE};
use crate::error::AppError;

pub use middleware::AuthSettings;
pub use routes::create_router;

/// Shared router state
#[derive(Debug, Clone, FromRef)]
pub struct AppState {
    pub pool: PgPool,
    pub auth: AuthSettings,
    #[from_ref(skip)]
    pub question_sample_size: usize,
    #[from_ref(skip)]
    pub allow_overdraft: bool,
}

impl AppState {
    /// State with default policies and no gateway key check
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            auth: AuthSettings::default(),
            question_sample_size: DEFAULT_SAMPLE_SIZE,
            allow_overdraft: false,
        }
    }

    pub fn from_config(pool: PgPool, config: &Config) -> Self {
        Self {
            pool,
            auth: AuthSettings {
                api_key_sha256: config.gateway_api_key_sha256.clone(),
            },
            question_sample_size: config.question_sample_size,
            allow_overdraft: config.allow_overdraft,
        }
    }
}

/// Build the application router.
///
/// `/api` routes run logging, then principal resolution, then the handler.
pub fn build_router(state: AppState, cors_origin: Option<HeaderValue>) -> Router {
    // Layers added last run first.
    let api_router = create_router()
        .layer(axum_middleware::from_fn_with_state(
            state.auth.clone(),
            middleware::principal_middleware,
        ))
        .layer(axum_middleware::from_fn(middleware::logging_middleware));

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PATCH])
        .allow_headers(Any);
    let cors = match cors_origin {
        Some(origin) => cors.allow_origin(origin),
        None => cors.allow_origin(Any),
    };

    Router::new()
        // Health check (no auth)
        .route("/health", axum::routing::get(health_check))
        .nest("/api", api_router)
        .fallback(not_found)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}

async fn not_found() -> AppError {
    AppError::NotFound("route".to_string())
}
