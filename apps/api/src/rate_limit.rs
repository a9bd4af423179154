//! Per-client request limits for the HTTP surface, keyed by peer IP.
//!
//! Separate from the AI client's token bucket, which guards the Gemini quota.
//! Requests without a known peer address (in-process calls) are not limited.

use std::net::{IpAddr, SocketAddr};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    middleware::Next,
    response::Response,
};
use governor::{
    clock::DefaultClock, middleware::NoOpMiddleware, state::keyed::DashMapStateStore, Quota,
    RateLimiter,
};
use tracing::warn;

use crate::errors::AppError;
use crate::state::AppState;

type IpRateLimiter = RateLimiter<IpAddr, DashMapStateStore<IpAddr>, DefaultClock, NoOpMiddleware>;

#[derive(Clone)]
pub struct RateLimits {
    api: Arc<IpRateLimiter>,
    optimize: Arc<IpRateLimiter>,
}

impl RateLimits {
    pub fn new(api_max: u32, optimize_max: u32, window: Duration) -> Self {
        Self {
            api: build_ip_limiter(api_max, window),
            optimize: build_ip_limiter(optimize_max, window),
        }
    }
}

/// `max` requests per `window`; a fresh client may spend all of them at once.
fn build_ip_limiter(max: u32, window: Duration) -> Arc<IpRateLimiter> {
    let max = NonZeroU32::new(max).unwrap_or(NonZeroU32::MIN);
    let quota = Quota::with_period(window / max.get())
        .unwrap_or_else(|| Quota::per_second(max))
        .allow_burst(max);

    Arc::new(RateLimiter::keyed(quota))
}

fn request_ip<B>(req: &Request<B>) -> Option<IpAddr> {
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.ip())
}

fn enforce(limiter: &IpRateLimiter, ip: Option<IpAddr>, message: &str) -> Result<(), AppError> {
    if let Some(client_ip) = ip {
        if limiter.check_key(&client_ip).is_err() {
            warn!("Rate limit exceeded for {client_ip}");
            return Err(AppError::RateLimited(message.to_string()));
        }
    }
    Ok(())
}

pub async fn limit_api(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    enforce(
        &state.rate_limits.api,
        request_ip(&req),
        "Too many requests, please try again later",
    )?;
    Ok(next.run(req).await)
}

pub async fn limit_optimize(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    enforce(
        &state.rate_limits.optimize,
        request_ip(&req),
        "Too many optimization requests, please try again later",
    )?;
    Ok(next.run(req).await)
}
