//! Application state shared across routes

use std::sync::Arc;

use crate::config::Config;
use crate::session::SessionRegistry;
use crate::util::rate_limit::IntentLimiter;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub sessions: Arc<SessionRegistry>,
    pub intent_limiter: IntentLimiter,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let config = Arc::new(config);

        // Arenas are created lazily on first join
        let sessions = Arc::new(SessionRegistry::new(&config));

        let intent_limiter = IntentLimiter::new(config.intent_rate_limit);

        Self {
            config,
            sessions,
            intent_limiter,
        }
    }
}
