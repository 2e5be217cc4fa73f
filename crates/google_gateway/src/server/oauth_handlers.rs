//! OAuth Authentication Handlers
//!
//! HTTP handlers for the Google authorization flow:
//! - `/auth/google` redirects to the consent screen
//! - `/auth/google/callback` exchanges the code and hands out a session
//! - `/auth/logout` drops the caller's session

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    Extension, Json,
};
use serde::Deserialize;
use std::sync::Arc;

use super::{pages, AppState};
use crate::auth::{AuthMode, Authenticated, PendingAuthorization};
use crate::error::{GatewayError, Result};

/// Query accepted by `/auth/google`
#[derive(Debug, Deserialize)]
pub struct AuthorizeQuery {
    /// Required in `header` mode; the session is stored under this id
    #[serde(rename = "userId")]
    pub user_id: Option<String>,
}

/// Redirect the browser to Google's consent screen
pub async fn start_authorization(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AuthorizeQuery>,
) -> Result<Response> {
    let oauth = state.oauth.as_ref().ok_or_else(|| {
        GatewayError::NotConfigured("Google OAuth client credentials are not set".to_string())
    })?;

    let user_id = query
        .user_id
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty());

    if state.config.auth_mode == AuthMode::HeaderUserId && user_id.is_none() {
        return Err(GatewayError::MissingParameter("userId".to_string()));
    }

    let auth_url = oauth.authorization_url();
    state.pending.insert(
        auth_url.state.clone(),
        PendingAuthorization::new(auth_url.pkce_verifier, user_id),
    );

    tracing::info!("[INFO] Redirecting to Google consent screen");

    Ok((StatusCode::FOUND, [(header::LOCATION, auth_url.url)]).into_response())
}

/// OAuth callback query parameters
#[derive(Debug, Deserialize)]
pub struct OAuthCallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

fn failure(status: StatusCode, error: &str, description: &str) -> Response {
    (status, Html(pages::failure_page(error, description))).into_response()
}

fn failure_from(err: &GatewayError) -> Response {
    let title = match err {
        GatewayError::AuthExchange(_) => "Authorization code exchange failed",
        GatewayError::MissingParameter(_) => "Missing parameter",
        GatewayError::NotConfigured(_) => "Gateway not configured",
        _ => "Internal error",
    };
    failure(err.status_code(), title, &err.to_string())
}

/// OAuth callback handler - exchanges the code and hands out the session
pub async fn authorization_callback(
    State(state): State<Arc<AppState>>,
    Query(params): Query<OAuthCallbackQuery>,
) -> Response {
    if let Some(error) = params.error {
        let description = params
            .error_description
            .unwrap_or_else(|| "Google did not grant access".to_string());
        tracing::warn!("[WARN] Authorization denied by provider: {}", error);
        return failure(StatusCode::BAD_REQUEST, &error, &description);
    }

    let Some(oauth) = state.oauth.as_ref() else {
        return failure_from(&GatewayError::NotConfigured(
            "Google OAuth client credentials are not set".to_string(),
        ));
    };

    let Some(code) = params.code.filter(|c| !c.trim().is_empty()) else {
        return failure_from(&GatewayError::MissingParameter("code".to_string()));
    };

    let mode = state.config.auth_mode;
    let pending = params.state.as_deref().and_then(|s| state.pending.take(s));

    if pending.is_none() {
        if mode == AuthMode::HeaderUserId {
            return failure(
                StatusCode::BAD_REQUEST,
                "Unknown or expired state",
                "This sign-in link is no longer valid. Start again from your chat tool.",
            );
        }
        if params.state.is_some() {
            tracing::warn!("[WARN] Callback state does not match a pending authorization");
        }
    }

    let (pkce_verifier, user_id) = match pending {
        Some(p) => (Some(p.pkce_verifier), p.user_id),
        None => (None, None),
    };

    let credentials = match oauth.exchange_code(&code, pkce_verifier).await {
        Ok(credentials) => credentials,
        Err(e) => {
            tracing::error!("[ERROR] Authorization code exchange failed: {}", e);
            return failure_from(&e);
        }
    };

    tracing::info!("[OK] Authorization code exchanged (mode: {})", mode);

    match mode {
        AuthMode::PassthroughBearer => {
            Html(pages::token_page("access token", &credentials.access_token)).into_response()
        }
        AuthMode::MintedOpaqueToken => match state.broker.issue(credentials).await {
            Ok(session_id) => Html(pages::token_page("session token", &session_id)).into_response(),
            Err(e) => failure_from(&e),
        },
        AuthMode::CookieSession => match state.broker.issue(credentials).await {
            Ok(session_id) => (
                [(header::SET_COOKIE, state.cookies.set_cookie_header(&session_id))],
                Html(pages::signed_in_page()),
            )
                .into_response(),
            Err(e) => failure_from(&e),
        },
        AuthMode::HeaderUserId => {
            // pending is always present in header mode, checked above
            let Some(user_id) = user_id else {
                return failure_from(&GatewayError::MissingParameter("userId".to_string()));
            };
            state.broker.store(&user_id, credentials).await;
            tracing::info!("[OK] Stored Google authorization for user {}", user_id);
            Html(pages::close_window_page()).into_response()
        }
    }
}

/// Drop the caller's session record
pub async fn logout(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Authenticated>,
) -> Response {
    let revoked = match &session.session_key {
        Some(key) => state.broker.revoke(key).await,
        None => false,
    };

    let body = Json(serde_json::json!({
        "success": true,
        "revoked": revoked,
    }));

    if state.config.auth_mode == AuthMode::CookieSession {
        ([(header::SET_COOKIE, state.cookies.clear_cookie_header())], body).into_response()
    } else {
        body.into_response()
    }
}
