use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// How close to expiry a token has to be before it is refreshed.
const REFRESH_MARGIN_SECONDS: i64 = 60;

/// Google access/refresh token pair held for one session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialPair {
    pub access_token: String,
    /// Only present when the user granted offline access.
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl CredentialPair {
    /// A bare access token with no refresh capability, as used by passthrough mode.
    pub fn bearer(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: None,
            expires_at: None,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at.map_or(false, |at| Utc::now() >= at)
    }

    /// True when the token expires within the refresh margin. Tokens with an
    /// unknown expiry are never refreshed proactively.
    pub fn needs_refresh(&self) -> bool {
        self.expires_at
            .map_or(false, |at| Utc::now() + Duration::seconds(REFRESH_MARGIN_SECONDS) >= at)
    }

    pub fn can_refresh(&self) -> bool {
        self.refresh_token.as_deref().map_or(false, |t| !t.is_empty())
    }
}
