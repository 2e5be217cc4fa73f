//! OAuth authorization, session brokering and the request gate.

pub mod broker;
pub mod cookie;
pub mod credentials;
pub mod gate;
pub mod oauth;
pub mod pending;
pub mod session_store;

pub use broker::TokenBroker;
pub use cookie::CookieSigner;
pub use credentials::CredentialPair;
pub use gate::{require_session, AuthMode, Authenticated};
pub use oauth::{AuthorizationUrl, OAuthClient, OAuthConfig};
pub use pending::{PendingAuthorization, PendingAuthorizations};
pub use session_store::{InMemorySessionStore, SessionStore};
