//! Token issuance: session credential → derived API token.

use rancher_models::{Endpoint, TokenObject, TokenRequest};
use reqwest::Method;
use tracing::{info, warn};

use crate::credential::{DerivedToken, SessionCredential};
use crate::error::TransportError;
use crate::transport::{self, Transport};

const TOKEN_PATH: &str = "v3/token";

/// Token issuance failure.
///
/// When the control plane accepted the request but the answer was unusable,
/// `orphan` holds the id of the token it created so the caller can delete it.
#[derive(Debug)]
pub struct IssueError {
    /// What went wrong.
    pub error: TransportError,
    /// Id of a token that exists on the control plane despite the failure.
    pub orphan: Option<String>,
}

impl From<TransportError> for IssueError {
    fn from(error: TransportError) -> Self {
        Self {
            error,
            orphan: None,
        }
    }
}

/// Create a derived token for this run.
///
/// The token has no TTL of its own; the control plane's expiry policy
/// applies, and the reaper deletes it when the run ends.
pub async fn issue(
    transport: &Transport,
    endpoint: &Endpoint,
    session: &SessionCredential,
) -> Result<DerivedToken, IssueError> {
    let url = endpoint.join(TOKEN_PATH);
    let request = TokenRequest::for_broker();

    let object: TokenObject = transport
        .send_json(Method::POST, &url, |b| session.authorize(b).json(&request))
        .await?;

    if object.id.is_empty() {
        return Err(transport::missing(Method::POST, &url, "token id").into());
    }
    if object.token.is_empty() {
        warn!(token_id = %object.id, "token created without a value");
        return Err(IssueError {
            error: transport::missing(Method::POST, &url, "token value"),
            orphan: Some(object.id),
        });
    }

    info!(token_id = %object.id, "derived token issued");
    Ok(DerivedToken::new(object.id, object.token))
}
