use super::session::CheckoutSession;
use crate::errors::ServiceError;
use dashmap::DashMap;
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info};
use uuid::Uuid;

const SESSION_BUSY: &str = "A payment is already in progress for this checkout";
const DEFAULT_IDLE_TTL: Duration = Duration::from_secs(30 * 60);

struct SessionSlot {
    handle: Arc<Mutex<CheckoutSession>>,
    touched: Instant,
}

/// Live checkout sessions, each behind its own async mutex.
///
/// Sessions nobody has locked for longer than the idle TTL are dropped by
/// [`SessionStore::evict_idle`]; a session whose lock is held is never evicted.
pub struct SessionStore {
    sessions: DashMap<Uuid, SessionSlot>,
    idle_ttl: Duration,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::with_idle_ttl(DEFAULT_IDLE_TTL)
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_idle_ttl(idle_ttl: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            idle_ttl,
        }
    }

    pub fn insert(&self, session: CheckoutSession) -> Uuid {
        let id = session.id();
        self.sessions.insert(
            id,
            SessionSlot {
                handle: Arc::new(Mutex::new(session)),
                touched: Instant::now(),
            },
        );
        id
    }

    /// Locks a session for an update. A session that is already locked
    /// (a payment in flight) yields `Conflict` instead of waiting.
    pub fn lock(&self, id: Uuid) -> Result<OwnedMutexGuard<CheckoutSession>, ServiceError> {
        let handle = self
            .sessions
            .get_mut(&id)
            .map(|mut entry| {
                entry.touched = Instant::now();
                entry.handle.clone()
            })
            .ok_or_else(|| ServiceError::NotFound(format!("Checkout session {} not found", id)))?;

        handle
            .try_lock_owned()
            .map_err(|_| ServiceError::Conflict(SESSION_BUSY.to_string()))
    }

    /// Drops every unlocked session idle for at least the TTL, returning how many went
    pub fn evict_idle(&self) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|id, slot| {
            let keep = slot.touched.elapsed() < self.idle_ttl || slot.handle.try_lock().is_err();
            if !keep {
                debug!(session_id = %id, "Evicting idle checkout session");
            }
            keep
        });
        before.saturating_sub(self.sessions.len())
    }

    /// Sweeps idle sessions on a fixed interval until the runtime shuts down
    pub async fn run_eviction(self: Arc<Self>, every: Duration) {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let evicted = self.evict_idle();
            if evicted > 0 {
                info!(evicted, remaining = self.len(), "Evicted idle checkout sessions");
            }
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
