//! Credential handling and Basic authorization tokens.
//!
//! Credentials are never displayed; the derived token is computed once and
//! is marked sensitive when turned into a header value.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use reqwest::header::HeaderValue;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::error::TransportError;

/// Secure credentials container.
///
/// This struct ensures credentials are never accidentally logged or displayed.
#[derive(Clone)]
pub struct Credentials {
    login: String,
    password: Arc<SecureString>,
}

impl Credentials {
    /// Create new credentials.
    pub fn new(login: String, password: String) -> Self {
        Self {
            login,
            password: Arc::new(SecureString::new(password)),
        }
    }

    /// Get the login.
    pub fn login(&self) -> &str {
        &self.login
    }

    /// Get the password (for internal use only).
    pub(crate) fn password(&self) -> &str {
        self.password.as_str()
    }

    /// Derive the Basic authorization token for these credentials.
    pub fn auth_token(&self) -> AuthToken {
        AuthToken::basic(&self.login, self.password())
    }
}

impl PartialEq for Credentials {
    fn eq(&self, other: &Self) -> bool {
        self.login == other.login
            && constant_time_eq(self.password().as_bytes(), other.password().as_bytes())
    }
}

impl Eq for Credentials {}

// The password stays out of the hash; equal credentials still hash equally.
impl Hash for Credentials {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.login.hash(state);
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("login", &self.login)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl fmt::Display for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Credentials(login: {})", self.login)
    }
}

/// Secure string that zeros memory on drop and never displays its contents.
struct SecureString {
    data: Vec<u8>,
}

impl SecureString {
    fn new(s: String) -> Self {
        Self {
            data: s.into_bytes(),
        }
    }

    fn as_str(&self) -> &str {
        // Only ever built from a String, so this cannot fail
        std::str::from_utf8(&self.data).unwrap_or_default()
    }
}

impl Drop for SecureString {
    fn drop(&mut self) {
        for byte in &mut self.data {
            *byte = 0;
        }
    }
}

impl fmt::Debug for SecureString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecureString(<redacted>)")
    }
}

/// Compare two byte strings without short-circuiting on the first mismatch.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// `Authorization` header value using the Basic scheme.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken(String);

impl AuthToken {
    /// Scheme prefix of every token.
    pub const SCHEME: &'static str = "Basic";

    /// `"Basic " + base64(utf8(login + ":" + password))`.
    pub fn basic(login: &str, password: &str) -> Self {
        let encoded = BASE64.encode(format!("{}:{}", login, password));
        Self(format!("{} {}", Self::SCHEME, encoded))
    }

    /// The full header value, scheme included.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Build a header value that HTTP debug output will not print.
    pub fn header_value(&self) -> Result<HeaderValue, TransportError> {
        let mut value = HeaderValue::from_str(&self.0)
            .map_err(|_| TransportError::InvalidHeader("Authorization".to_string()))?;
        value.set_sensitive(true);
        Ok(value)
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AuthToken({} <redacted>)", Self::SCHEME)
    }
}
