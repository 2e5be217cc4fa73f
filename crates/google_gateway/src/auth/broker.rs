use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::Rng;
use std::sync::Arc;

use super::credentials::CredentialPair;
use super::session_store::SessionStore;
use crate::error::{GatewayError, Result};

/// Maps locally minted session identifiers to Google credential pairs
#[derive(Clone)]
pub struct TokenBroker {
    store: Arc<dyn SessionStore>,
    /// Sent back with every 401 so clients know where to log in again
    auth_url: String,
}

impl TokenBroker {
    pub fn new(store: Arc<dyn SessionStore>, auth_url: impl Into<String>) -> Self {
        Self {
            store,
            auth_url: auth_url.into(),
        }
    }

    pub fn auth_url(&self) -> &str {
        &self.auth_url
    }

    /// Generate a fresh session identifier.
    ///
    /// Fails if the identifier already belongs to a live session; a clash is
    /// never resolved by overwriting.
    pub async fn mint(&self) -> Result<String> {
        let session_id = random_session_id();
        if self.store.contains(&session_id).await {
            return Err(GatewayError::Internal(
                "Minted session id collides with a live session".to_string(),
            ));
        }
        Ok(session_id)
    }

    /// Insert or replace the record for `session_id`.
    pub async fn store(&self, session_id: &str, pair: CredentialPair) {
        self.store.set(session_id, pair).await;
    }

    /// Swap in a refreshed pair for a live session. Returns false when the
    /// session was revoked in the meantime; the pair is then discarded.
    pub async fn replace(&self, session_id: &str, pair: CredentialPair) -> bool {
        self.store.replace(session_id, pair).await
    }

    /// Mint a session identifier and bind `pair` to it.
    pub async fn issue(&self, pair: CredentialPair) -> Result<String> {
        let session_id = self.mint().await?;
        if !self.store.insert_new(&session_id, pair).await {
            return Err(GatewayError::Internal(
                "Session id was claimed concurrently".to_string(),
            ));
        }
        tracing::info!("[OK] Issued session {}", redact(&session_id));
        Ok(session_id)
    }

    pub async fn resolve(&self, session_id: &str) -> Result<CredentialPair> {
        self.store.get(session_id).await.ok_or_else(|| {
            tracing::debug!("Unknown session {}", redact(session_id));
            GatewayError::unauthenticated("Invalid or expired session", &self.auth_url)
        })
    }

    /// Drop the record for `session_id`. Returns whether one existed.
    pub async fn revoke(&self, session_id: &str) -> bool {
        let removed = self.store.delete(session_id).await;
        if removed {
            tracing::info!("[OK] Revoked session {}", redact(session_id));
        }
        removed
    }

    pub async fn session_count(&self) -> usize {
        self.store.len().await
    }
}

fn random_session_id() -> String {
    let mut rng = rand::thread_rng();
    let random_bytes: Vec<u8> = (0..32).map(|_| rng.gen()).collect();
    URL_SAFE_NO_PAD.encode(&random_bytes)
}

/// Short prefix of a session id, safe for logs.
pub fn redact(session_id: &str) -> String {
    let prefix: String = session_id.chars().take(6).collect();
    format!("{}…", prefix)
}
