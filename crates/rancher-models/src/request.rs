//! The inbound broker request.
//!
//! [`RancherRequest`] is the JSON body posted by clients. It is converted
//! into a validated [`BrokerRequest`] before any outbound call is made.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::cluster::ClusterId;
use crate::credentials::{AuthMethod, BearerToken, Credentials};
use crate::endpoint::Endpoint;
use crate::error::ModelError;

/// Body of `POST /api/rancher/clusters` and `POST /api/rancher/kubeconfig`.
///
/// Every field is optional on the wire; [`BrokerRequest::try_from`] decides
/// which combinations are acceptable.
#[derive(Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct RancherRequest {
    /// Control-plane host name.
    pub rancher_host: String,
    /// Control-plane port. `0` selects 443 or 80 depending on `secure`.
    pub rancher_port: u16,
    /// Use `https` when `true`.
    pub secure: bool,
    /// Fully qualified base URL; takes precedence over host/port.
    pub rancher_url: Option<String>,
    /// Local auth provider user name.
    pub username: String,
    /// Local auth provider password.
    pub password: String,
    /// Caller-owned API token; bypasses login when non-empty.
    pub bearer_token: Option<String>,
    /// Cluster to generate a kubeconfig for.
    pub cluster_id: Option<String>,
}

impl fmt::Debug for RancherRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RancherRequest")
            .field("rancher_host", &self.rancher_host)
            .field("rancher_port", &self.rancher_port)
            .field("secure", &self.secure)
            .field("rancher_url", &self.rancher_url)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field(
                "bearer_token",
                &self.bearer_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("cluster_id", &self.cluster_id)
            .finish()
    }
}

/// A validated request, ready to drive the pipeline.
#[derive(Debug)]
pub struct BrokerRequest {
    /// Where the control plane lives.
    pub endpoint: Endpoint,
    /// How to authenticate against it.
    pub auth: AuthMethod,
    /// Target cluster, when the operation needs one.
    pub cluster_id: Option<ClusterId>,
}

impl BrokerRequest {
    /// The target cluster, or an error naming the missing field.
    pub fn require_cluster(&self) -> Result<&ClusterId, ModelError> {
        self.cluster_id.as_ref().ok_or_else(|| ModelError::MissingField {
            field: "clusterId".into(),
        })
    }
}

impl TryFrom<RancherRequest> for BrokerRequest {
    type Error = ModelError;

    fn try_from(req: RancherRequest) -> Result<Self, Self::Error> {
        let endpoint = match non_empty(req.rancher_url) {
            Some(url) => Endpoint::Url(url),
            None if req.rancher_host.is_empty() => {
                return Err(ModelError::MissingField {
                    field: "rancherHost".into(),
                })
            }
            None => {
                let port = match req.rancher_port {
                    0 if req.secure => 443,
                    0 => 80,
                    port => port,
                };
                Endpoint::Parts {
                    host: req.rancher_host,
                    port,
                    secure: req.secure,
                }
            }
        };

        let auth = match non_empty(req.bearer_token) {
            Some(token) => AuthMethod::Bearer(BearerToken::new(token)),
            None if req.username.is_empty() => {
                return Err(ModelError::MissingField {
                    field: "username".into(),
                })
            }
            None if req.password.is_empty() => {
                return Err(ModelError::MissingField {
                    field: "password".into(),
                })
            }
            None => AuthMethod::Password(Credentials::new(&req.username, req.password)),
        };

        let cluster_id = non_empty(req.cluster_id)
            .map(|id| ClusterId::parse(&id))
            .transpose()?;

        Ok(Self {
            endpoint,
            auth,
            cluster_id,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}
