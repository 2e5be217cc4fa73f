use chrono::Utc;
use oauth2::basic::{BasicClient, BasicErrorResponse, BasicErrorResponseType};
use oauth2::reqwest::async_http_client;
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, PkceCodeChallenge,
    PkceCodeVerifier, RedirectUrl, RefreshToken, RequestTokenError, Scope, TokenResponse,
    TokenUrl,
};

use super::credentials::CredentialPair;
use crate::error::{GatewayError, Result};

pub const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Authorization URL together with the values the callback needs to finish the flow
#[derive(Debug, Clone)]
pub struct AuthorizationUrl {
    pub url: String,
    /// CSRF state echoed back by Google on the callback
    pub state: String,
    /// PKCE verifier matching the challenge embedded in `url`
    pub pkce_verifier: String,
}

/// OAuth provider configuration
#[derive(Debug, Clone)]
pub struct OAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    pub auth_url: String,
    pub token_url: String,
    pub redirect_uri: String,
    pub scopes: Vec<String>,
}

impl OAuthConfig {
    /// Google OAuth configuration for Drive listing and Sheets read/write
    pub fn google(client_id: String, client_secret: String, redirect_uri: String) -> Self {
        Self {
            client_id,
            client_secret,
            auth_url: GOOGLE_AUTH_URL.to_string(),
            token_url: GOOGLE_TOKEN_URL.to_string(),
            redirect_uri,
            scopes: vec![
                "https://www.googleapis.com/auth/drive.readonly".to_string(),
                "https://www.googleapis.com/auth/spreadsheets".to_string(),
            ],
        }
    }
}

/// OAuth client for the authorization-code and refresh-token grants
#[derive(Debug, Clone)]
pub struct OAuthClient {
    config: OAuthConfig,
    client: BasicClient,
}

impl OAuthClient {
    pub fn new(config: OAuthConfig) -> Result<Self> {
        let auth_url = AuthUrl::new(config.auth_url.clone())
            .map_err(|e| GatewayError::NotConfigured(format!("Invalid auth URL: {}", e)))?;
        let token_url = TokenUrl::new(config.token_url.clone())
            .map_err(|e| GatewayError::NotConfigured(format!("Invalid token URL: {}", e)))?;
        let redirect_url = RedirectUrl::new(config.redirect_uri.clone())
            .map_err(|e| GatewayError::NotConfigured(format!("Invalid redirect URI: {}", e)))?;

        let client = BasicClient::new(
            ClientId::new(config.client_id.clone()),
            Some(ClientSecret::new(config.client_secret.clone())),
            auth_url,
            Some(token_url),
        )
        .set_redirect_uri(redirect_url);

        Ok(Self { config, client })
    }

    pub fn config(&self) -> &OAuthConfig {
        &self.config
    }

    /// Generate the consent URL. Offline access and a forced consent prompt
    /// make Google hand out a refresh token on every login.
    pub fn authorization_url(&self) -> AuthorizationUrl {
        let (challenge, verifier) = PkceCodeChallenge::new_random_sha256();

        let mut request = self
            .client
            .authorize_url(CsrfToken::new_random)
            .set_pkce_challenge(challenge)
            .add_extra_param("access_type", "offline")
            .add_extra_param("prompt", "consent");
        for scope in &self.config.scopes {
            request = request.add_scope(Scope::new(scope.clone()));
        }

        let (url, state) = request.url();

        AuthorizationUrl {
            url: url.to_string(),
            state: state.secret().clone(),
            pkce_verifier: verifier.secret().clone(),
        }
    }

    /// Exchange an authorization code for a credential pair.
    ///
    /// Codes are single-use: a failure here is terminal for this login attempt.
    pub async fn exchange_code(
        &self,
        code: &str,
        pkce_verifier: Option<String>,
    ) -> Result<CredentialPair> {
        let code = code.trim();
        if code.is_empty() {
            return Err(GatewayError::MissingParameter("code".to_string()));
        }

        let mut request = self
            .client
            .exchange_code(AuthorizationCode::new(code.to_string()));
        if let Some(verifier) = pkce_verifier {
            request = request.set_pkce_verifier(PkceCodeVerifier::new(verifier));
        }

        let token = request
            .request_async(async_http_client)
            .await
            .map_err(|e| GatewayError::AuthExchange(describe_token_error(&e)))?;

        let access_token = token.access_token().secret().clone();
        if access_token.is_empty() {
            return Err(GatewayError::AuthExchange(
                "Token endpoint returned an empty access token".to_string(),
            ));
        }

        if token.refresh_token().is_none() {
            tracing::warn!("[WARN] Google did not return a refresh token; the session will end when the access token expires");
        }

        Ok(CredentialPair {
            access_token,
            refresh_token: token.refresh_token().map(|t| t.secret().clone()),
            expires_at: expiry_from(token.expires_in()),
        })
    }

    /// Run a refresh-token grant for `pair`.
    pub async fn refresh(&self, pair: &CredentialPair) -> Result<CredentialPair> {
        let refresh_token = pair
            .refresh_token
            .clone()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| GatewayError::Internal("No refresh token available".to_string()))?;

        let token = self
            .client
            .exchange_refresh_token(&RefreshToken::new(refresh_token.clone()))
            .request_async(async_http_client)
            .await
            .map_err(|e| match &e {
                RequestTokenError::ServerResponse(response)
                    if *response.error() == BasicErrorResponseType::InvalidGrant =>
                {
                    GatewayError::RefreshRevoked(describe_token_error(&e))
                }
                _ => GatewayError::upstream("Failed to refresh access token", describe_token_error(&e)),
            })?;

        Ok(CredentialPair {
            access_token: token.access_token().secret().clone(),
            // Google usually omits the refresh token on refresh; keep the old one
            refresh_token: Some(
                token
                    .refresh_token()
                    .map(|t| t.secret().clone())
                    .unwrap_or(refresh_token),
            ),
            expires_at: expiry_from(token.expires_in()),
        })
    }

    /// Refresh `pair` when it is about to expire and can be refreshed.
    ///
    /// Returns the replacement pair; the caller is responsible for storing it.
    pub async fn refresh_if_needed(&self, pair: &CredentialPair) -> Result<Option<CredentialPair>> {
        if !pair.needs_refresh() || !pair.can_refresh() {
            return Ok(None);
        }
        tracing::debug!("Access token expires at {:?}, refreshing", pair.expires_at);
        self.refresh(pair).await.map(Some)
    }
}

fn expiry_from(expires_in: Option<std::time::Duration>) -> Option<chrono::DateTime<Utc>> {
    expires_in
        .and_then(|d| chrono::Duration::from_std(d).ok())
        .map(|d| Utc::now() + d)
}

fn describe_token_error<RE>(err: &RequestTokenError<RE, BasicErrorResponse>) -> String
where
    RE: std::error::Error + 'static,
{
    match err {
        RequestTokenError::ServerResponse(response) => match response.error_description() {
            Some(description) => format!("{}: {}", response.error(), description),
            None => response.error().to_string(),
        },
        other => other.to_string(),
    }
}
