//! Google Drive & Sheets Gateway
//!
//! Lets a chat plugin host act on a user's Google Drive and Google Sheets
//! without ever holding Google credentials itself.
//!
//! # Features
//! - Google OAuth authorization-code flow with PKCE and offline access
//! - Four interchangeable ways for callers to present their session
//!   (passthrough bearer, minted opaque token, signed cookie, user-id header)
//! - Automatic access token refresh before Google API calls
//! - Paginated Drive file listing and Sheets read/append/update

pub mod auth;
pub mod config;
pub mod error;
pub mod google;
pub mod server;

pub use auth::{AuthMode, CredentialPair, OAuthClient, OAuthConfig, SessionStore, TokenBroker};
pub use config::GatewayConfig;
pub use error::{GatewayError, Result};
pub use server::{build_router, start_server, AppState};
