//! Gateway configuration
//!
//! Everything is read from environment variables (optionally seeded from a
//! `.env` file by `main`). Missing OAuth credentials are not fatal: the
//! gateway starts with OAuth disabled so the health endpoint stays up.

use anyhow::{anyhow, Context, Result};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::RngCore;
use tracing::warn;

use crate::auth::{AuthMode, OAuthConfig};
use crate::google::GoogleEndpoints;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 3000;

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
    /// Externally reachable base URL, used for `authUrl` hints and the OAuth redirect.
    pub public_base_url: String,
    pub auth_mode: AuthMode,
    /// HMAC key for `cookie` mode session cookies.
    pub session_secret: String,
    /// Empty means any origin.
    pub cors_allowed_origins: Vec<String>,
    /// `None` when the client id or secret is missing.
    pub oauth: Option<OAuthConfig>,
    pub endpoints: GoogleEndpoints,
}

impl GatewayConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let host = var("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = match var("PORT") {
            Some(raw) => raw
                .parse::<u16>()
                .with_context(|| format!("PORT must be a valid port number, got '{}'", raw))?,
            None => DEFAULT_PORT,
        };

        let public_base_url = var("PUBLIC_BASE_URL")
            .unwrap_or_else(|| format!("http://localhost:{}", port))
            .trim_end_matches('/')
            .to_string();

        let auth_mode = match var("AUTH_MODE") {
            Some(raw) => raw.parse::<AuthMode>().map_err(|e| anyhow!(e))?,
            None => AuthMode::default(),
        };

        let session_secret = match var("SESSION_SECRET") {
            Some(secret) => secret,
            None => {
                if auth_mode == AuthMode::CookieSession {
                    warn!("[WARN] SESSION_SECRET not set; using a random per-process secret. Cookies will not survive a restart.");
                }
                random_secret()
            }
        };

        let cors_allowed_origins = var("CORS_ALLOWED_ORIGINS")
            .map(|raw| {
                raw.split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let oauth = match (var("GOOGLE_CLIENT_ID"), var("GOOGLE_CLIENT_SECRET")) {
            (Some(client_id), Some(client_secret)) => {
                let redirect_uri = var("GOOGLE_REDIRECT_URI")
                    .unwrap_or_else(|| format!("{}/auth/google/callback", public_base_url));
                let mut config = OAuthConfig::google(client_id, client_secret, redirect_uri);
                if let Some(auth_url) = var("GOOGLE_AUTH_URL") {
                    config.auth_url = auth_url;
                }
                if let Some(token_url) = var("GOOGLE_TOKEN_URL") {
                    config.token_url = token_url;
                }
                if let Some(scopes) = var("GOOGLE_OAUTH_SCOPES") {
                    config.scopes = scopes.split_whitespace().map(str::to_string).collect();
                }
                Some(config)
            }
            (client_id, client_secret) => {
                warn!(
                    "[WARN] OAuth is not configured (GOOGLE_CLIENT_ID set: {}, GOOGLE_CLIENT_SECRET set: {}). Authorization routes will answer 503.",
                    client_id.is_some(),
                    client_secret.is_some()
                );
                None
            }
        };

        let mut endpoints = GoogleEndpoints::default();
        if let Some(drive) = var("GOOGLE_DRIVE_API_BASE") {
            endpoints.drive_api_base = drive.trim_end_matches('/').to_string();
        }
        if let Some(sheets) = var("GOOGLE_SHEETS_API_BASE") {
            endpoints.sheets_api_base = sheets.trim_end_matches('/').to_string();
        }

        Ok(Self {
            host,
            port,
            public_base_url,
            auth_mode,
            session_secret,
            cors_allowed_origins,
            oauth,
            endpoints,
        })
    }

    /// Where callers are sent to (re)start authorization.
    pub fn auth_start_url(&self) -> String {
        format!("{}/auth/google", self.public_base_url)
    }
}

fn random_secret() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_oauth() {
        let config = GatewayConfig::from_lookup(lookup(&[])).unwrap();

        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert_eq!(config.public_base_url, "http://localhost:3000");
        assert_eq!(config.auth_mode, AuthMode::MintedOpaqueToken);
        assert!(config.oauth.is_none());
        assert!(!config.session_secret.is_empty());
        assert!(config.cors_allowed_origins.is_empty());
        assert_eq!(config.auth_start_url(), "http://localhost:3000/auth/google");
    }

    #[test]
    fn test_full_configuration() {
        let config = GatewayConfig::from_lookup(lookup(&[
            ("PORT", "8080"),
            ("PUBLIC_BASE_URL", "https://sheets.example.com/"),
            ("AUTH_MODE", "cookie"),
            ("SESSION_SECRET", "s3cret"),
            ("GOOGLE_CLIENT_ID", "client-id"),
            ("GOOGLE_CLIENT_SECRET", "client-secret"),
            ("CORS_ALLOWED_ORIGINS", "https://chat.openai.com, https://example.org"),
        ]))
        .unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(config.public_base_url, "https://sheets.example.com");
        assert_eq!(config.auth_mode, AuthMode::CookieSession);
        assert_eq!(config.session_secret, "s3cret");
        assert_eq!(
            config.cors_allowed_origins,
            vec!["https://chat.openai.com", "https://example.org"]
        );

        let oauth = config.oauth.expect("oauth should be configured");
        assert_eq!(oauth.client_id, "client-id");
        assert_eq!(
            oauth.redirect_uri,
            "https://sheets.example.com/auth/google/callback"
        );
    }

    #[test]
    fn test_half_configured_oauth_is_disabled() {
        let config =
            GatewayConfig::from_lookup(lookup(&[("GOOGLE_CLIENT_ID", "client-id")])).unwrap();
        assert!(config.oauth.is_none());
    }

    #[test]
    fn test_invalid_port_is_an_error() {
        let result = GatewayConfig::from_lookup(lookup(&[("PORT", "not-a-port")]));
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_auth_mode_is_an_error() {
        let result = GatewayConfig::from_lookup(lookup(&[("AUTH_MODE", "kerberos")]));
        assert!(result.is_err());
    }
}
