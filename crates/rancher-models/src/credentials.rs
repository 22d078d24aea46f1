//! Caller-supplied authentication material.
//!
//! Secrets are wrapped in [`SecretString`] so `Debug` output and log fields
//! never show them. Call [`ExposeSecret::expose_secret`] only at the point
//! a value is written into an outbound request.

use std::fmt;

use secrecy::{ExposeSecret, SecretString};

/// A username/password pair for the control plane's local auth provider.
#[derive(Debug)]
pub struct Credentials {
    username: String,
    password: SecretString,
}

impl Credentials {
    /// Create credentials from a username and password.
    pub fn new(username: &str, password: impl Into<String>) -> Self {
        Self {
            username: username.to_string(),
            password: SecretString::from(password.into()),
        }
    }

    /// The login name. Safe to log.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// The password, kept secret.
    pub fn password(&self) -> &SecretString {
        &self.password
    }
}

/// A pre-existing API token owned by the caller.
///
/// The broker uses it as-is and never revokes it.
pub struct BearerToken(SecretString);

impl BearerToken {
    /// Wrap a caller-supplied token.
    pub fn new(token: impl Into<String>) -> Self {
        Self(SecretString::from(token.into()))
    }

    /// The token value, kept secret.
    pub fn secret(&self) -> &SecretString {
        &self.0
    }
}

impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("BearerToken")
            .field(&format_args!("[REDACTED; {} bytes]", self.0.expose_secret().len()))
            .finish()
    }
}

/// How the caller wants the broker to reach the protected resource.
#[derive(Debug)]
pub enum AuthMethod {
    /// Log in, mint a derived token and revoke everything afterwards.
    Password(Credentials),
    /// Use the caller's own token directly.
    Bearer(BearerToken),
}

impl AuthMethod {
    /// `true` when the caller supplied its own bearer token.
    pub fn is_external(&self) -> bool {
        matches!(self, Self::Bearer(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_output_hides_password() {
        let creds = Credentials::new("admin", "hunter2");
        let debug = format!("{creds:?}");
        assert!(debug.contains("admin"));
        assert!(!debug.contains("hunter2"));
        assert_eq!(creds.password().expose_secret(), "hunter2");
    }

    #[test]
    fn debug_output_hides_bearer_token() {
        let token = BearerToken::new("token-abc:supersecret");
        let debug = format!("{token:?}");
        assert!(!debug.contains("supersecret"));
        assert!(debug.contains("REDACTED"));
    }

    #[test]
    fn auth_method_reports_external() {
        assert!(AuthMethod::Bearer(BearerToken::new("t")).is_external());
        assert!(!AuthMethod::Password(Credentials::new("a", "b")).is_external());
    }
}
