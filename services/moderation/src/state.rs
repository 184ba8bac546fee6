//! Application state shared across handlers

use crate::orchestrator::ModerationOrchestrator;
use crate::store::StatusStore;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: ModerationOrchestrator,
    pub store: Arc<dyn StatusStore>,
}
