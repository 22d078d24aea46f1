//! The credential exchange and derived-token lifecycle pipeline.
//!
//! ```text
//! Endpoint ─┬─ Bearer ───────────────────────────────┐
//!           └─ Password → login → issue token ───────┤
//!                                                    ▼
//!                                                  fetch
//!                                                    │
//!                                                  reap (Derived only)
//! ```
//!
//! Once a session or derived token exists, revocation runs on every exit
//! path. [`Pipeline::run_detached`] moves the run onto its own task so that
//! dropping the inbound request does not skip it.

use std::sync::Arc;

use rancher_models::{AuthMethod, BrokerRequest, Endpoint, SessionMode};
use tracing::{error, info, warn};

use crate::credential::ActiveCredential;
use crate::error::BrokerError;
use crate::fetch::{self, ProtectedResource, ResourceKind};
use crate::token::IssueError;
use crate::transport::{self, Transport};
use crate::{login, reaper, token};

/// Drives one request from credentials to a protected resource.
#[derive(Debug, Clone)]
pub struct Pipeline {
    transport: Arc<Transport>,
    session_mode: SessionMode,
}

impl Pipeline {
    /// Create a pipeline sharing `transport` across runs.
    pub fn new(transport: Arc<Transport>, session_mode: SessionMode) -> Self {
        Self {
            transport,
            session_mode,
        }
    }

    /// Run the pipeline on a dedicated task.
    ///
    /// The task is not cancelled when the returned future is dropped, so
    /// cleanup always completes.
    pub async fn run_detached(
        &self,
        request: BrokerRequest,
        kind: ResourceKind,
    ) -> Result<ProtectedResource, BrokerError> {
        let pipeline = self.clone();
        tokio::spawn(async move { pipeline.run(request, kind).await })
            .await
            .map_err(|e| BrokerError::Aborted(e.to_string()))?
    }

    /// Run the pipeline on the current task.
    pub async fn run(
        &self,
        request: BrokerRequest,
        kind: ResourceKind,
    ) -> Result<ProtectedResource, BrokerError> {
        let endpoint = request.endpoint;
        let target = transport::redact(&endpoint.base_url());
        info!(
            endpoint = %target,
            resource = %kind,
            external_token = request.auth.is_external(),
            "pipeline started"
        );

        let credential = self.acquire(&endpoint, request.auth).await?;

        let fetched = fetch::fetch(&self.transport, &endpoint, credential.bearer(), &kind).await;
        let reaped = reaper::reap(&self.transport, &endpoint, &credential).await;

        match (fetched, reaped) {
            (Ok(resource), Ok(())) => {
                info!(endpoint = %target, resource = %kind, "pipeline finished");
                Ok(resource)
            }
            (Ok(_), Err(cleanup)) => Err(BrokerError::Cleanup(cleanup)),
            (Err(fetch), Ok(())) => Err(BrokerError::Resource(fetch)),
            (Err(fetch), Err(cleanup)) => {
                error!(error = %cleanup, "revocation failed after fetch failure");
                Err(BrokerError::Resource(fetch))
            }
        }
    }

    /// Turn the caller's auth method into the run's active credential.
    ///
    /// If token issuance fails after login, any token the control plane
    /// created anyway is deleted and the session is logged out before the
    /// error is returned.
    async fn acquire(
        &self,
        endpoint: &Endpoint,
        auth: AuthMethod,
    ) -> Result<ActiveCredential, BrokerError> {
        let credentials = match auth {
            AuthMethod::Bearer(token) => return Ok(ActiveCredential::External(token)),
            AuthMethod::Password(credentials) => credentials,
        };

        let session = login::login(&self.transport, endpoint, &credentials, self.session_mode)
            .await
            .map_err(BrokerError::Auth)?;

        match token::issue(&self.transport, endpoint, &session).await {
            Ok(token) => Ok(ActiveCredential::Derived { session, token }),
            Err(IssueError { error: issue_err, orphan }) => {
                if let Some(id) = orphan {
                    if let Err(delete_err) =
                        reaper::delete_orphan(&self.transport, endpoint, &id, &session).await
                    {
                        error!(token_id = %id, error = %delete_err, "orphaned token could not be deleted");
                    }
                }
                if let Err(logout_err) = reaper::logout(&self.transport, endpoint, &session).await {
                    warn!(error = %logout_err, "session logout failed after token issuance failure");
                }
                Err(BrokerError::Auth(issue_err))
            }
        }
    }
}
