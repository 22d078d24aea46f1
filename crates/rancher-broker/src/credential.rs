//! Credentials held by a single pipeline run.
//!
//! A run ends up with exactly one [`ActiveCredential`]: either a token the
//! broker derived itself (and must revoke), or the caller's own token (which
//! it must leave alone).

use rancher_models::BearerToken;
use reqwest::header::COOKIE;
use reqwest::RequestBuilder;
use secrecy::{ExposeSecret, SecretString};

/// Proof of a successful login, used to mint a derived token.
#[derive(Debug)]
pub enum SessionCredential {
    /// `name=value` cookie pairs from the login response.
    Cookie(SecretString),
    /// Session token from the login response body.
    Token(SecretString),
}

impl SessionCredential {
    /// Attach the session to an outbound request.
    pub fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match self {
            Self::Cookie(cookie) => builder.header(COOKIE, cookie.expose_secret()),
            Self::Token(token) => builder.bearer_auth(token.expose_secret()),
        }
    }
}

/// A revocable API token created by the broker.
#[derive(Debug)]
pub struct DerivedToken {
    id: String,
    secret: SecretString,
}

impl DerivedToken {
    /// Wrap the identifier and bearer value returned by the control plane.
    pub fn new(id: String, secret: String) -> Self {
        Self {
            id,
            secret: SecretString::from(secret),
        }
    }

    /// Identifier used to delete the token.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Bearer value.
    pub fn secret(&self) -> &SecretString {
        &self.secret
    }
}

/// The credential a pipeline run fetches with.
#[derive(Debug)]
pub enum ActiveCredential {
    /// Created by this run; both parts are revoked when the run ends.
    Derived {
        session: SessionCredential,
        token: DerivedToken,
    },
    /// Supplied by the caller; never revoked.
    External(BearerToken),
}

impl ActiveCredential {
    /// The bearer value attached to resource requests.
    pub fn bearer(&self) -> &SecretString {
        match self {
            Self::Derived { token, .. } => token.secret(),
            Self::External(token) => token.secret(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(builder: RequestBuilder, name: &str) -> Option<String> {
        let request = builder.build().unwrap();
        request
            .headers()
            .get(name)
            .map(|v| v.to_str().unwrap().to_string())
    }

    #[test]
    fn cookie_session_sets_cookie_header() {
        let session = SessionCredential::Cookie(SecretString::from("R_SESS=token-s1".to_string()));
        let client = reqwest::Client::new();
        let builder = session.authorize(client.post("http://localhost/v3/token"));
        assert_eq!(header(builder, "cookie").as_deref(), Some("R_SESS=token-s1"));
    }

    #[test]
    fn token_session_sets_bearer_header() {
        let session = SessionCredential::Token(SecretString::from("token-s1".to_string()));
        let client = reqwest::Client::new();
        let builder = session.authorize(client.post("http://localhost/v3/token"));
        assert_eq!(
            header(builder, "authorization").as_deref(),
            Some("Bearer token-s1")
        );
    }

    #[test]
    fn bearer_comes_from_the_active_variant() {
        let derived = ActiveCredential::Derived {
            session: SessionCredential::Token(SecretString::from("s".to_string())),
            token: DerivedToken::new("tok-1".into(), "xyz".into()),
        };
        let external = ActiveCredential::External(BearerToken::new("caller"));

        assert_eq!(derived.bearer().expose_secret(), "xyz");
        assert_eq!(external.bearer().expose_secret(), "caller");
    }

    #[test]
    fn debug_output_hides_secrets() {
        let token = DerivedToken::new("tok-1".into(), "xyz-secret".into());
        let debug = format!("{token:?}");
        assert!(debug.contains("tok-1"));
        assert!(!debug.contains("xyz-secret"));
    }
}
