//! Revocation of credentials the broker created.
//!
//! Caller-owned tokens are never touched. For derived credentials the token
//! is deleted first, then the login session is logged out; the logout is
//! attempted even if the delete failed.

use rancher_models::Endpoint;
use reqwest::Method;
use secrecy::ExposeSecret;
use tracing::{debug, error, info};

use crate::credential::{ActiveCredential, DerivedToken, SessionCredential};
use crate::error::TransportError;
use crate::transport::Transport;

const LOGOUT_PATH: &str = "v3/tokens?action=logout";

/// Revoke everything `credential` holds that this run created.
///
/// Returns the first failure. A second failure is logged.
pub async fn reap(
    transport: &Transport,
    endpoint: &Endpoint,
    credential: &ActiveCredential,
) -> Result<(), TransportError> {
    let ActiveCredential::Derived { session, token } = credential else {
        debug!("caller-owned token, nothing to revoke");
        return Ok(());
    };

    let deleted = delete_token(transport, endpoint, token).await;
    let logged_out = logout(transport, endpoint, session).await;

    match (deleted, logged_out) {
        (Ok(()), Ok(())) => {
            info!(token_id = token.id(), "derived token and session revoked");
            Ok(())
        }
        (Err(e), Ok(())) | (Ok(()), Err(e)) => Err(e),
        (Err(delete_err), Err(logout_err)) => {
            error!(error = %logout_err, "session logout also failed");
            Err(delete_err)
        }
    }
}

/// `DELETE /v3/token/{id}`, authenticated with the token itself.
pub async fn delete_token(
    transport: &Transport,
    endpoint: &Endpoint,
    token: &DerivedToken,
) -> Result<(), TransportError> {
    let url = endpoint.join(&format!("v3/token/{}", token.id()));
    transport
        .send(Method::DELETE, &url, |b| {
            b.bearer_auth(token.secret().expose_secret())
        })
        .await
        .map(drop)
}

/// `DELETE /v3/token/{id}` for a token whose secret never reached the
/// broker, authenticated with the session that created it.
pub async fn delete_orphan(
    transport: &Transport,
    endpoint: &Endpoint,
    id: &str,
    session: &SessionCredential,
) -> Result<(), TransportError> {
    let url = endpoint.join(&format!("v3/token/{id}"));
    transport
        .send(Method::DELETE, &url, |b| session.authorize(b))
        .await
        .map(drop)
}

/// `POST /v3/tokens?action=logout` with the login session.
pub async fn logout(
    transport: &Transport,
    endpoint: &Endpoint,
    session: &SessionCredential,
) -> Result<(), TransportError> {
    let url = endpoint.join(LOGOUT_PATH);
    transport
        .send(Method::POST, &url, |b| session.authorize(b))
        .await
        .map(drop)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::login::login;
    use crate::testing;
    use crate::token::issue;
    use mock_rancher::{Failure, MockRancher};
    use rancher_models::{BearerToken, Credentials, SessionMode};

    async fn derived(mock: &MockRancher) -> ActiveCredential {
        let transport = testing::transport();
        let endpoint = Endpoint::url(mock.url());
        let session = login(&transport, &endpoint, &Credentials::new("a", "b"), SessionMode::Cookie)
            .await
            .unwrap();
        let token = issue(&transport, &endpoint, &session).await.unwrap();
        ActiveCredential::Derived { session, token }
    }

    #[tokio::test]
    async fn external_token_is_never_revoked() {
        let mock = MockRancher::builder().accept_bearer("caller").start().await.unwrap();
        let credential = ActiveCredential::External(BearerToken::new("caller"));

        reap(&testing::transport(), &Endpoint::url(mock.url()), &credential)
            .await
            .unwrap();

        assert!(mock.calls().is_empty());
    }

    #[tokio::test]
    async fn deletes_token_then_logs_out() {
        let mock = MockRancher::builder().credentials("a", "b").start().await.unwrap();
        let credential = derived(&mock).await;

        reap(&testing::transport(), &Endpoint::url(mock.url()), &credential)
            .await
            .unwrap();

        let paths: Vec<_> = mock.calls().into_iter().map(|c| c.path).collect();
        let tail = &paths[paths.len() - 2..];
        assert_eq!(tail, ["/v3/token/tok-1", "/v3/tokens?action=logout"]);
        assert!(mock.live_tokens().is_empty());
        assert_eq!(mock.live_sessions(), 0);
    }

    #[tokio::test]
    async fn logout_runs_even_when_delete_fails() {
        let mock = MockRancher::builder()
            .credentials("a", "b")
            .fail(Failure::DeleteToken)
            .start()
            .await
            .unwrap();
        let credential = derived(&mock).await;

        let err = reap(&testing::transport(), &Endpoint::url(mock.url()), &credential)
            .await
            .unwrap_err();

        assert!(matches!(err, TransportError::Rejected { method, .. } if method == Method::DELETE));
        assert_eq!(mock.count("POST", "/v3/tokens?action=logout"), 1);
        assert_eq!(mock.live_sessions(), 0);
    }

    #[tokio::test]
    async fn first_failure_wins_when_both_fail() {
        let mock = MockRancher::builder()
            .credentials("a", "b")
            .fail(Failure::DeleteToken)
            .fail(Failure::Logout)
            .start()
            .await
            .unwrap();
        let credential = derived(&mock).await;

        let err = reap(&testing::transport(), &Endpoint::url(mock.url()), &credential)
            .await
            .unwrap_err();

        assert!(matches!(err, TransportError::Rejected { method, .. } if method == Method::DELETE));
    }

    #[tokio::test]
    async fn orphan_is_deleted_with_the_session() {
        let mock = MockRancher::builder()
            .credentials("a", "b")
            .token_secret("")
            .start()
            .await
            .unwrap();
        let transport = testing::transport();
        let endpoint = Endpoint::url(mock.url());
        let session = login(&transport, &endpoint, &Credentials::new("a", "b"), SessionMode::Cookie)
            .await
            .unwrap();
        let orphan = issue(&transport, &endpoint, &session).await.unwrap_err().orphan.unwrap();

        delete_orphan(&transport, &endpoint, &orphan, &session).await.unwrap();

        let deletes = mock.calls_to("DELETE", "/v3/token/tok-1");
        assert_eq!(deletes.len(), 1);
        assert!(deletes[0].authorization.is_none());
        assert!(deletes[0].cookie.as_deref().unwrap().starts_with("R_SESS="));
        assert!(mock.live_tokens().is_empty());
    }
}
