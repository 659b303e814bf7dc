//! HTTP API for registrations, contact messages and newsletter signups.

mod export;
mod handlers;
mod middleware;
mod types;

pub use handlers::*;
pub use middleware::{access_log, limit_requests, RequestLimiter};
pub use types::*;

use crate::config::{RateLimitConfig, RegistrationConfig};
use axum::{
    middleware as axum_middleware,
    routing::{delete, get, post, put},
    Router,
};
use registration_number::RegistrationNumberAllocator;
use registration_store::RecordStore;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Registrations, contact messages and subscriptions
    pub store: RecordStore,
    /// Numbers new registrations
    pub allocator: RegistrationNumberAllocator<RecordStore>,
    /// Whether new registrations are accepted
    pub registration_open: bool,
}

impl AppState {
    pub fn new(store: RecordStore, registration: &RegistrationConfig) -> Self {
        let allocator = RegistrationNumberAllocator::new(Arc::new(store.clone()))
            .with_prefix(registration.prefix.clone())
            .with_strategy(registration.strategy)
            .with_max_attempts(registration.max_attempts);

        Self {
            store,
            allocator,
            registration_open: registration.open,
        }
    }
}

/// Create the API router with the default rate limit.
pub fn create_router(state: AppState) -> Router {
    create_router_with_rate_limit(state, RequestLimiter::from_config(&RateLimitConfig::default()))
}

/// Create the API router with a custom rate limit.
pub fn create_router_with_rate_limit(state: AppState, limiter: RequestLimiter) -> Router {
    let limited = Router::new()
        // Public endpoints
        .route("/v1/registrations", post(handlers::create_registration))
        .route("/v1/registrations/:number", get(handlers::get_registration))
        .route("/v1/contact", post(handlers::submit_contact))
        .route("/v1/newsletter", post(handlers::subscribe_newsletter))
        // Staff endpoints
        .route("/v1/admin/registrations", get(handlers::list_registrations))
        .route(
            "/v1/admin/registrations/export",
            get(handlers::export_registrations),
        )
        .route(
            "/v1/admin/registrations/actions",
            post(handlers::registration_action),
        )
        .route(
            "/v1/admin/registrations/:number/notes",
            put(handlers::update_notes),
        )
        .route(
            "/v1/admin/registrations/:number",
            delete(handlers::delete_registration),
        )
        .route(
            "/v1/admin/contact-messages",
            get(handlers::list_contact_messages),
        )
        .route(
            "/v1/admin/contact-messages/actions",
            post(handlers::contact_message_action),
        )
        .route(
            "/v1/admin/contact-messages/:id/reply",
            put(handlers::reply_contact_message),
        )
        .route("/v1/admin/newsletter", get(handlers::list_subscriptions))
        .route(
            "/v1/admin/newsletter/actions",
            post(handlers::newsletter_action),
        )
        .route("/v1/admin/dashboard", get(handlers::dashboard))
        .layer(axum_middleware::from_fn_with_state(limiter, limit_requests));

    Router::new()
        // Health check (no rate limiting)
        .route("/health", get(handlers::health))
        .merge(limited)
        .layer(axum_middleware::from_fn(access_log))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
