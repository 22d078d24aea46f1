//! Bodies exchanged with the control plane's v3 REST API.
//!
//! These mirror the JSON the control plane expects and returns for login,
//! token creation and logout. Unknown response fields are ignored.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Session lifetime requested at login, in milliseconds.
pub const SESSION_TTL_MS: u64 = 57_600_000;

/// Description attached to login sessions created by the broker.
pub const SESSION_DESCRIPTION: &str = "rancher-broker session";

/// Description attached to derived API tokens created by the broker.
pub const TOKEN_DESCRIPTION: &str = "rancher-broker";

// ---------------------------------------------------------------------------
// SessionMode
// ---------------------------------------------------------------------------

/// How the login endpoint hands back the session credential.
#[derive(
    Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SessionMode {
    /// Session delivered as a `Set-Cookie` header.
    #[default]
    Cookie,
    /// Session delivered as a `token` field in the JSON body.
    Json,
}

// ---------------------------------------------------------------------------
// Login
// ---------------------------------------------------------------------------

/// Body of `POST /v3-public/localProviders/local?action=login`.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    /// Local user name.
    pub username: String,
    /// Local password.
    pub password: String,
    /// Human-readable session description.
    pub description: String,
    /// Requested session representation.
    pub response_type: SessionMode,
    /// Requested session lifetime in milliseconds.
    pub ttl: u64,
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("description", &self.description)
            .field("response_type", &self.response_type)
            .field("ttl", &self.ttl)
            .finish()
    }
}

/// Body returned by login when `responseType` is `json`.
#[derive(Serialize, Deserialize)]
pub struct LoginResponse {
    /// Session token, sent back as a bearer credential.
    #[serde(default)]
    pub token: String,
}

// ---------------------------------------------------------------------------
// Tokens
// ---------------------------------------------------------------------------

/// Body of `POST /v3/token`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TokenRequest {
    /// Whether the token is the caller's current session token.
    pub current: bool,
    /// Whether the token can be used.
    pub enabled: bool,
    /// Whether the token is already expired.
    pub expired: bool,
    /// Whether the token is derived from another token.
    pub is_derived: bool,
    /// Lifetime in milliseconds; `0` leaves expiry to the control plane.
    pub ttl: u64,
    /// Resource type, always `token`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Human-readable description.
    pub description: String,
}

impl TokenRequest {
    /// The token request the broker issues for every pipeline run.
    pub fn for_broker() -> Self {
        Self {
            current: false,
            enabled: true,
            expired: false,
            is_derived: false,
            ttl: 0,
            kind: "token".into(),
            description: TOKEN_DESCRIPTION.into(),
        }
    }
}

/// A token as returned by `POST /v3/token`.
#[derive(Serialize, Deserialize, Default)]
pub struct TokenObject {
    /// Token identifier, used for deletion.
    #[serde(default)]
    pub id: String,
    /// Bearer value.
    #[serde(default)]
    pub token: String,
}

impl fmt::Debug for TokenObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenObject")
            .field("id", &self.id)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn session_mode_from_str() {
        assert_eq!(SessionMode::from_str("cookie").unwrap(), SessionMode::Cookie);
        assert_eq!(SessionMode::from_str("json").unwrap(), SessionMode::Json);
        assert!(SessionMode::from_str("saml").is_err());
        assert_eq!(SessionMode::default(), SessionMode::Cookie);
    }

    #[test]
    fn login_request_wire_format() {
        let req = LoginRequest {
            username: "admin".into(),
            password: "secret".into(),
            description: SESSION_DESCRIPTION.into(),
            response_type: SessionMode::Cookie,
            ttl: SESSION_TTL_MS,
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["responseType"], "cookie");
        assert_eq!(json["ttl"], 57_600_000);
        assert!(!format!("{req:?}").contains("secret"));
    }

    #[test]
    fn broker_token_request_wire_format() {
        let json = serde_json::to_value(TokenRequest::for_broker()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "current": false,
                "enabled": true,
                "expired": false,
                "isDerived": false,
                "ttl": 0,
                "type": "token",
                "description": "rancher-broker",
            })
        );
    }

    #[test]
    fn token_object_tolerates_extra_fields() {
        let body = r#"{"id":"token-abc","token":"token-abc:xyz","userId":"u-1","ttl":0}"#;
        let token: TokenObject = serde_json::from_str(body).unwrap();
        assert_eq!(token.id, "token-abc");
        assert!(!format!("{token:?}").contains("xyz"));
    }
}
