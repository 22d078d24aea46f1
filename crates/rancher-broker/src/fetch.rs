//! Resource fetching with the run's active bearer token.

use std::fmt;

use rancher_models::{ClusterId, ClusterList, Endpoint, GeneratedKubeconfig};
use reqwest::Method;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;

use crate::error::TransportError;
use crate::transport::Transport;

/// What a pipeline run should fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceKind {
    /// The cluster collection.
    Clusters,
    /// A generated kubeconfig for one cluster.
    Kubeconfig(ClusterId),
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Clusters => f.write_str("clusters"),
            Self::Kubeconfig(id) => write!(f, "kubeconfig/{id}"),
        }
    }
}

/// A fetched resource, serialized to the caller as-is.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum ProtectedResource {
    /// Result of [`ResourceKind::Clusters`].
    Clusters(ClusterList),
    /// Result of [`ResourceKind::Kubeconfig`].
    Kubeconfig(GeneratedKubeconfig),
}

/// `GET /v3/clusters`. Order is preserved as returned.
pub async fn list_clusters(
    transport: &Transport,
    endpoint: &Endpoint,
    token: &SecretString,
) -> Result<ClusterList, TransportError> {
    let url = endpoint.join("v3/clusters");
    transport
        .send_json(Method::GET, &url, |b| b.bearer_auth(token.expose_secret()))
        .await
}

/// `POST /v3/clusters/{id}?action=generateKubeconfig`.
pub async fn generate_kubeconfig(
    transport: &Transport,
    endpoint: &Endpoint,
    token: &SecretString,
    cluster: &ClusterId,
) -> Result<GeneratedKubeconfig, TransportError> {
    let url = endpoint.join(&format!("v3/clusters/{cluster}?action=generateKubeconfig"));
    transport
        .send_json(Method::POST, &url, |b| b.bearer_auth(token.expose_secret()))
        .await
}

/// Fetch whichever resource `kind` names.
pub async fn fetch(
    transport: &Transport,
    endpoint: &Endpoint,
    token: &SecretString,
    kind: &ResourceKind,
) -> Result<ProtectedResource, TransportError> {
    match kind {
        ResourceKind::Clusters => list_clusters(transport, endpoint, token)
            .await
            .map(ProtectedResource::Clusters),
        ResourceKind::Kubeconfig(cluster) => {
            generate_kubeconfig(transport, endpoint, token, cluster)
                .await
                .map(ProtectedResource::Kubeconfig)
        }
    }
}
