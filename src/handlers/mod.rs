use crate::{checkout::{CheckoutOrchestrator, SessionStore}, db::DbPool};
use std::sync::Arc;

pub mod checkout;
pub mod health;
pub mod storefront;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<CheckoutOrchestrator>,
    pub sessions: Arc<SessionStore>,
    /// Present when orders go to a database; used by the health check
    pub db: Option<Arc<DbPool>>,
}
