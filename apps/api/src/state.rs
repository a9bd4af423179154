use std::sync::Arc;
use std::time::Instant;

use crate::config::Config;
use crate::events::JobEvents;
use crate::optimization::batch::BatchRunner;
use crate::optimization::optimizer::Optimizer;
use crate::rate_limit::RateLimits;
use crate::store::Store;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub optimizer: Optimizer,
    pub batch: BatchRunner,
    /// Change feed behind `/api/v1/events`. The optimizer publishes to the same hub.
    pub events: JobEvents,
    pub rate_limits: RateLimits,
    pub config: Config,
    pub started_at: Instant,
}
