//! Authenticated request gate
//!
//! Middleware in front of every `/api` route. It resolves the caller to a
//! Google credential pair according to the configured [`AuthMode`],
//! refreshes the pair when it is about to expire, and hands the handler a
//! [`GoogleClient`] through request extensions.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use super::broker::redact;
use super::credentials::CredentialPair;
use crate::error::{GatewayError, Result};
use crate::google::GoogleClient;
use crate::server::AppState;

pub const USER_ID_HEADER: &str = "x-user-id";

/// How callers identify themselves on API requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthMode {
    /// `Authorization: Bearer <google access token>`, used as-is
    PassthroughBearer,
    /// `Authorization: Bearer <session id>` minted by the callback
    #[default]
    MintedOpaqueToken,
    /// Signed session cookie set by the callback
    CookieSession,
    /// `X-User-Id` header naming the user who authorized via `?userId=`
    HeaderUserId,
}

impl AuthMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthMode::PassthroughBearer => "passthrough",
            AuthMode::MintedOpaqueToken => "minted",
            AuthMode::CookieSession => "cookie",
            AuthMode::HeaderUserId => "header",
        }
    }

    /// Resolve request headers to the caller's session.
    pub async fn resolve(&self, headers: &HeaderMap, state: &AppState) -> Result<Authenticated> {
        let auth_url = state.broker.auth_url();

        match self {
            AuthMode::PassthroughBearer => {
                let token = bearer_token(headers)
                    .ok_or_else(|| GatewayError::unauthenticated("Missing bearer token", auth_url))?;
                Ok(Authenticated {
                    session_key: None,
                    credentials: CredentialPair::bearer(token),
                })
            }
            AuthMode::MintedOpaqueToken => {
                let session_id = bearer_token(headers)
                    .ok_or_else(|| GatewayError::unauthenticated("Missing bearer token", auth_url))?;
                let credentials = state.broker.resolve(&session_id).await?;
                Ok(Authenticated {
                    session_key: Some(session_id),
                    credentials,
                })
            }
            AuthMode::CookieSession => {
                let session_id = state.cookies.session_from_headers(headers).ok_or_else(|| {
                    GatewayError::unauthenticated("Missing or invalid session cookie", auth_url)
                })?;
                let credentials = state.broker.resolve(&session_id).await?;
                Ok(Authenticated {
                    session_key: Some(session_id),
                    credentials,
                })
            }
            AuthMode::HeaderUserId => {
                let user_id = headers
                    .get(USER_ID_HEADER)
                    .and_then(|v| v.to_str().ok())
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
                    .map(str::to_string)
                    .ok_or_else(|| GatewayError::unauthenticated("Missing X-User-Id header", auth_url))?;
                let credentials = state.broker.resolve(&user_id).await.map_err(|_| {
                    GatewayError::unauthenticated(
                        "No Google authorization for this user",
                        format!("{}?userId={}", auth_url, urlencode(&user_id)),
                    )
                })?;
                Ok(Authenticated {
                    session_key: Some(user_id),
                    credentials,
                })
            }
        }
    }
}

impl fmt::Display for AuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuthMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "passthrough" => Ok(AuthMode::PassthroughBearer),
            "minted" => Ok(AuthMode::MintedOpaqueToken),
            "cookie" => Ok(AuthMode::CookieSession),
            "header" => Ok(AuthMode::HeaderUserId),
            other => Err(format!(
                "Invalid AUTH_MODE '{}'. Must be 'passthrough', 'minted', 'cookie', or 'header'",
                other
            )),
        }
    }
}

/// A request that passed the gate
#[derive(Debug, Clone)]
pub struct Authenticated {
    /// Store key the credentials were found under; `None` in passthrough mode
    pub session_key: Option<String>,
    pub credentials: CredentialPair,
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then(|| token.to_string())
}

fn urlencode(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

/// Gate middleware for authenticated routes.
pub async fn require_session(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response> {
    let mode = state.config.auth_mode;
    let (mut parts, body) = request.into_parts();
    let mut session = mode.resolve(&parts.headers, &state).await?;

    if let Some(oauth) = &state.oauth {
        match oauth.refresh_if_needed(&session.credentials).await {
            Ok(Some(refreshed)) => {
                if let Some(key) = &session.session_key {
                    // A session revoked while the refresh was in flight stays revoked
                    if state.broker.replace(key, refreshed.clone()).await {
                        tracing::info!("[OK] Refreshed access token for session {}", redact(key));
                    } else {
                        tracing::info!("[INFO] Session {} ended during refresh; discarding new token", redact(key));
                        return Err(GatewayError::unauthenticated(
                            "Session was revoked",
                            state.broker.auth_url(),
                        ));
                    }
                }
                session.credentials = refreshed;
            }
            Ok(None) => {}
            Err(GatewayError::RefreshRevoked(reason)) if session.credentials.is_expired() => {
                if let Some(key) = &session.session_key {
                    state.broker.revoke(key).await;
                }
                tracing::warn!("[WARN] Google revoked the refresh token: {}", reason);
                return Err(GatewayError::unauthenticated(
                    "Google authorization expired or was revoked",
                    state.broker.auth_url(),
                ));
            }
            Err(e) => {
                // Carry on with the current token; Google's rejection surfaces as an upstream error
                tracing::warn!(
                    "[WARN] Token refresh failed (token expired: {}): {}",
                    session.credentials.is_expired(),
                    e
                );
            }
        }
    }

    let client = GoogleClient::new(
        state.http.clone(),
        session.credentials.access_token.clone(),
        state.config.endpoints.clone(),
    );

    parts.extensions.insert(client);
    parts.extensions.insert(session);

    Ok(next.run(Request::from_parts(parts, body)).await)
}
