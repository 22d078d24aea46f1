//! Credential exchange: username/password → session credential.

use rancher_models::{
    Credentials, Endpoint, LoginRequest, LoginResponse, SessionMode, SESSION_DESCRIPTION,
    SESSION_TTL_MS,
};
use reqwest::header::{HeaderMap, SET_COOKIE};
use reqwest::Method;
use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

use crate::credential::SessionCredential;
use crate::error::TransportError;
use crate::transport::{self, Transport};

const LOGIN_PATH: &str = "v3-public/localProviders/local?action=login";

/// Log in against the local auth provider.
///
/// In [`SessionMode::Cookie`] the session is read from `Set-Cookie`; in
/// [`SessionMode::Json`] it is the `token` field of the response body.
pub async fn login(
    transport: &Transport,
    endpoint: &Endpoint,
    credentials: &Credentials,
    mode: SessionMode,
) -> Result<SessionCredential, TransportError> {
    let url = endpoint.join(LOGIN_PATH);
    let body = LoginRequest {
        username: credentials.username().to_string(),
        password: credentials.password().expose_secret().to_string(),
        description: SESSION_DESCRIPTION.to_string(),
        response_type: mode,
        ttl: SESSION_TTL_MS,
    };

    let response = transport
        .send(Method::POST, &url, |b| b.json(&body))
        .await?;

    let session = match mode {
        SessionMode::Cookie => session_cookie(response.headers())
            .map(SessionCredential::Cookie)
            .ok_or_else(|| transport::missing(Method::POST, &url, "session cookie"))?,
        SessionMode::Json => {
            let body: LoginResponse = transport::read_json(Method::POST, &url, response).await?;
            if body.token.is_empty() {
                return Err(transport::missing(Method::POST, &url, "session token"));
            }
            SessionCredential::Token(SecretString::from(body.token))
        }
    };

    debug!(username = credentials.username(), %mode, "session established");
    Ok(session)
}

/// Collapse every `Set-Cookie` header into a single `Cookie` header value.
///
/// Attributes (`Path`, `HttpOnly`, …) are dropped; only `name=value` pairs
/// are kept.
fn session_cookie(headers: &HeaderMap) -> Option<SecretString> {
    let pairs: Vec<&str> = headers
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .filter_map(|value| value.split(';').next())
        .map(str::trim)
        .filter(|pair| pair.contains('=') && !pair.starts_with('='))
        .collect();

    if pairs.is_empty() {
        None
    } else {
        Some(SecretString::from(pairs.join("; ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    fn set_cookies(values: &[&str]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for value in values {
            headers.append(SET_COOKIE, HeaderValue::from_str(value).unwrap());
        }
        headers
    }

    #[test]
    fn cookie_attributes_are_dropped() {
        let headers = set_cookies(&["R_SESS=token-abc:def; Path=/; HttpOnly; Secure"]);
        let cookie = session_cookie(&headers).unwrap();
        assert_eq!(cookie.expose_secret(), "R_SESS=token-abc:def");
    }

    #[test]
    fn multiple_cookies_are_joined() {
        let headers = set_cookies(&["R_SESS=abc; Path=/", "CSRF=123; Path=/"]);
        let cookie = session_cookie(&headers).unwrap();
        assert_eq!(cookie.expose_secret(), "R_SESS=abc; CSRF=123");
    }

    #[test]
    fn missing_cookie_yields_none() {
        assert!(session_cookie(&HeaderMap::new()).is_none());
        assert!(session_cookie(&set_cookies(&["garbage"])).is_none());
    }

    #[tokio::test]
    async fn cookie_login_against_mock() {
        let mock = mock_rancher::MockRancher::builder()
            .credentials("a", "b")
            .start()
            .await
            .unwrap();
        let transport = crate::testing::transport();

        let session = login(
            &transport,
            &Endpoint::url(mock.url()),
            &Credentials::new("a", "b"),
            SessionMode::Cookie,
        )
        .await
        .unwrap();

        assert!(matches!(session, SessionCredential::Cookie(_)));
        let logins = mock.logins();
        assert_eq!(logins.len(), 1);
        assert_eq!(logins[0].ttl, 57_600_000);
        assert_eq!(logins[0].description, "rancher-broker session");
        assert_eq!(logins[0].response_type, SessionMode::Cookie);
    }

    #[tokio::test]
    async fn json_login_against_mock() {
        let mock = mock_rancher::MockRancher::builder()
            .credentials("a", "b")
            .start()
            .await
            .unwrap();

        let session = login(
            &crate::testing::transport(),
            &Endpoint::url(mock.url()),
            &Credentials::new("a", "b"),
            SessionMode::Json,
        )
        .await
        .unwrap();

        assert!(matches!(session, SessionCredential::Token(_)));
    }

    #[tokio::test]
    async fn wrong_password_is_rejected_once() {
        let mock = mock_rancher::MockRancher::builder()
            .credentials("a", "b")
            .start()
            .await
            .unwrap();

        let err = login(
            &crate::testing::transport(),
            &Endpoint::url(mock.url()),
            &Credentials::new("a", "wrong"),
            SessionMode::Cookie,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, TransportError::Rejected { .. }));
        assert!(!err.to_string().contains("wrong"));
        assert_eq!(mock.logins().len(), 1);
    }
}
