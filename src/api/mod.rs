mod error;
mod handlers;

pub use error::{ApiError, JsonBody};

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::calendar::CalendarIdentity;
use crate::config::Config;
use crate::engine::Engine;
use crate::payment::PaymentGateway;

/// Per-process settings the handlers need.
#[derive(Debug, Clone)]
pub struct ApiSettings {
    pub site_url: String,
    pub hold_minutes: i64,
    pub currency: String,
    pub calendar: CalendarIdentity,
    pub webhook_enabled: bool,
}

impl ApiSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            site_url: config.site_url.trim_end_matches('/').to_string(),
            hold_minutes: config.hold_minutes,
            currency: config.currency.clone(),
            calendar: CalendarIdentity {
                brand: config.calendar_brand.clone(),
                domain: config.calendar_domain.clone(),
            },
            webhook_enabled: config.webhook_secret.is_some(),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
    pub gateway: Arc<dyn PaymentGateway>,
    pub settings: Arc<ApiSettings>,
}

pub fn router(state: AppState) -> Router {
    let mut app = Router::new()
        .route("/api/health", get(handlers::health))
        .route("/api/availability", get(handlers::availability))
        .route("/api/hold", post(handlers::hold))
        .route("/api/checkout", post(handlers::checkout))
        .route("/api/calendar/{file}", get(handlers::calendar))
        .route("/api/listings/{listing}/blocked", get(handlers::blocked))
        .layer(CorsLayer::permissive());

    // Mounted after CORS: the provider posts server-to-server with a raw body.
    if state.settings.webhook_enabled {
        app = app.route("/api/payment-webhook", post(handlers::payment_webhook));
    }

    app.layer(TraceLayer::new_for_http()).with_state(state)
}
