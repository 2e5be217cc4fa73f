use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use std::sync::Arc;

/// How long a consent redirect may take before its state is forgotten.
const PENDING_TTL_MINUTES: i64 = 10;

/// What `/auth/google` remembers about an authorization it started
#[derive(Debug, Clone)]
pub struct PendingAuthorization {
    pub pkce_verifier: String,
    /// Set in `header` mode, where the session is stored under this id
    pub user_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl PendingAuthorization {
    pub fn new(pkce_verifier: String, user_id: Option<String>) -> Self {
        Self {
            pkce_verifier,
            user_id,
            created_at: Utc::now(),
        }
    }

    fn is_stale(&self, now: DateTime<Utc>) -> bool {
        now - self.created_at > Duration::minutes(PENDING_TTL_MINUTES)
    }
}

/// Authorizations awaiting their callback, keyed by OAuth `state`
#[derive(Clone, Default)]
pub struct PendingAuthorizations {
    entries: Arc<DashMap<String, PendingAuthorization>>,
}

impl PendingAuthorizations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, state: String, pending: PendingAuthorization) {
        let now = Utc::now();
        self.entries.retain(|_, p| !p.is_stale(now));
        self.entries.insert(state, pending);
    }

    /// Remove and return the entry for `state`. Each state is usable once.
    pub fn take(&self, state: &str) -> Option<PendingAuthorization> {
        let (_, pending) = self.entries.remove(state)?;
        (!pending.is_stale(Utc::now())).then_some(pending)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
