//! HTTP API
//!
//! One endpoint streams a turn as server-sent events; the rest are small
//! JSON helpers around it.

mod handlers;
mod sse;
mod types;

pub use handlers::create_router;
pub use types::*;

use crate::turn::TurnExecutor;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub executor: Arc<TurnExecutor>,
}

impl AppState {
    pub fn new(executor: TurnExecutor) -> Self {
        Self {
            executor: Arc::new(executor),
        }
    }
}
