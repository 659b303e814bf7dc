//! Request throttling and access logging.

use crate::config::RateLimitConfig;
use crate::error::ApiError;
use axum::{
    extract::{MatchedPath, Request, State},
    http::Method,
    middleware::Next,
    response::Response,
};
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use std::{num::NonZeroU32, sync::Arc, time::Instant};
use tracing::{debug, info, warn};

/// Used when the configured limit is zero.
const DEFAULT_PER_MINUTE: NonZeroU32 = match NonZeroU32::new(60) {
    Some(n) => n,
    None => NonZeroU32::MIN,
};

const STAFF_PREFIX: &str = "/v1/admin/";

/// One quota shared by every client of the limited routes.
#[derive(Clone)]
pub struct RequestLimiter {
    quota: Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
    per_minute: NonZeroU32,
}

impl RequestLimiter {
    pub fn per_minute(requests: u32) -> Self {
        let per_minute = NonZeroU32::new(requests).unwrap_or(DEFAULT_PER_MINUTE);
        Self {
            quota: Arc::new(RateLimiter::direct(Quota::per_minute(per_minute))),
            per_minute,
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::per_minute(config.global_per_minute)
    }

    /// Limit high enough that tests never hit it.
    pub fn permissive() -> Self {
        Self::per_minute(10_000)
    }

    pub fn limit(&self) -> u32 {
        self.per_minute.get()
    }

    /// Take one request from the quota. `false` once it is spent.
    pub fn try_acquire(&self) -> bool {
        self.quota.check().is_ok()
    }
}

/// Reject with 429 once the shared quota is spent.
pub async fn limit_requests(
    State(limiter): State<RequestLimiter>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if !limiter.try_acquire() {
        warn!(
            route = %route_of(&request),
            limit = limiter.limit(),
            "Request quota exhausted"
        );
        return Err(ApiError::RateLimitExceeded);
    }
    Ok(next.run(request).await)
}

/// Log each request by its route template, never its URI. Successful staff
/// changes are logged at info.
pub async fn access_log(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let route = route_of(&request);
    let started = Instant::now();

    let response = next.run(request).await;

    let status = response.status();
    let elapsed_ms = started.elapsed().as_millis() as u64;

    if status.is_server_error() {
        warn!(%method, %route, %status, elapsed_ms, "Request failed");
    } else if is_staff_change(&method, &route) && status.is_success() {
        info!(%method, %route, %status, elapsed_ms, "Staff change applied");
    } else {
        debug!(%method, %route, %status, elapsed_ms, "Request handled");
    }

    response
}

/// Route template such as `/v1/registrations/:number`, never the concrete path.
fn route_of(request: &Request) -> String {
    request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| "unmatched".to_string(), |path| path.as_str().to_string())
}

fn is_staff_change(method: &Method, route: &str) -> bool {
    route.starts_with(STAFF_PREFIX) && !matches!(*method, Method::GET | Method::HEAD)
}
