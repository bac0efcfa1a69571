//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use campus_core::ports::RateLimitStore;
use campus_core::Services;
use std::sync::Arc;

use crate::config::Config;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub services: Services,
    pub rate_limits: Arc<dyn RateLimitStore>,
    pub config: Arc<Config>,
}
