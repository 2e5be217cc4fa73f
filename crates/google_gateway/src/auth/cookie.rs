//! Signed session cookies for `cookie` auth mode.
//!
//! Cookie value format: `<session id>.<base64url(HMAC-SHA256(secret, session id))>`.

use axum::http::{header, HeaderMap};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

pub const SESSION_COOKIE: &str = "gw_session";

#[derive(Clone)]
pub struct CookieSigner {
    secret: Vec<u8>,
    secure: bool,
}

impl CookieSigner {
    /// `secure` adds the `Secure` attribute; set it when served over https.
    pub fn new(secret: impl AsRef<[u8]>, secure: bool) -> Self {
        Self {
            secret: secret.as_ref().to_vec(),
            secure,
        }
    }

    fn mac(&self) -> HmacSha256 {
        // HMAC accepts keys of any length
        HmacSha256::new_from_slice(&self.secret).expect("HMAC can take key of any size")
    }

    pub fn sign(&self, session_id: &str) -> String {
        let mut mac = self.mac();
        mac.update(session_id.as_bytes());
        let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());
        format!("{}.{}", session_id, signature)
    }

    /// Returns the session id if the signature checks out.
    pub fn verify(&self, value: &str) -> Option<String> {
        let (session_id, signature) = value.rsplit_once('.')?;
        let signature = URL_SAFE_NO_PAD.decode(signature).ok()?;
        let mut mac = self.mac();
        mac.update(session_id.as_bytes());
        mac.verify_slice(&signature).ok()?;
        Some(session_id.to_string())
    }

    /// `Set-Cookie` value carrying the signed session id.
    pub fn set_cookie_header(&self, session_id: &str) -> String {
        let mut cookie = format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax",
            SESSION_COOKIE,
            self.sign(session_id)
        );
        if self.secure {
            cookie.push_str("; Secure");
        }
        cookie
    }

    /// `Set-Cookie` value that clears the session cookie.
    pub fn clear_cookie_header(&self) -> String {
        format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", SESSION_COOKIE)
    }

    /// Find and verify the session cookie in request headers.
    pub fn session_from_headers(&self, headers: &HeaderMap) -> Option<String> {
        headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|raw| raw.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == SESSION_COOKIE)
            .and_then(|(_, value)| self.verify(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_sign_and_verify() {
        let signer = CookieSigner::new("secret", false);
        let signed = signer.sign("session-123");
        assert!(signed.starts_with("session-123."));
        assert_eq!(signer.verify(&signed).as_deref(), Some("session-123"));
    }

    #[test]
    fn test_tampered_cookie_is_rejected() {
        let signer = CookieSigner::new("secret", false);
        let signed = signer.sign("session-123");
        let forged = signed.replacen("session-123", "session-456", 1);
        assert!(signer.verify(&forged).is_none());
        assert!(signer.verify("session-123").is_none());
        assert!(signer.verify("session-123.not*base64").is_none());

        let other = CookieSigner::new("another-secret", false);
        assert!(other.verify(&signed).is_none());
    }

    #[test]
    fn test_session_from_headers() {
        let signer = CookieSigner::new("secret", true);
        let mut headers = HeaderMap::new();
        let cookie = format!("theme=dark; {}={}", SESSION_COOKIE, signer.sign("abc"));
        headers.insert(header::COOKIE, HeaderValue::from_str(&cookie).unwrap());

        assert_eq!(signer.session_from_headers(&headers).as_deref(), Some("abc"));
        assert!(signer.set_cookie_header("abc").ends_with("; Secure"));
        assert!(signer.session_from_headers(&HeaderMap::new()).is_none());
    }
}
