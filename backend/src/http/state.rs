//! Application state shared by every handler and middleware.

use std::sync::Arc;

use super::rate_limit::RateLimiter;
use crate::config::ServiceConfig;
use crate::db::repository::FullRepository;
use crate::services::{JobTracker, TokenService};

#[derive(Clone)]
pub struct AppState {
    pub repository: Arc<dyn FullRepository>,
    pub config: Arc<ServiceConfig>,
    pub tokens: TokenService,
    /// Background import jobs and their logs.
    pub job_tracker: JobTracker,
    pub rate_limiter: Arc<RateLimiter>,
    /// Reported by `/health`.
    pub service_name: &'static str,
}

impl AppState {
    pub fn new(
        service_name: &'static str,
        repository: Arc<dyn FullRepository>,
        config: ServiceConfig,
    ) -> Self {
        Self {
            repository,
            tokens: TokenService::new(config.jwt.clone()),
            config: Arc::new(config),
            job_tracker: JobTracker::new(),
            rate_limiter: Arc::new(RateLimiter::per_minute()),
            service_name,
        }
    }
}
