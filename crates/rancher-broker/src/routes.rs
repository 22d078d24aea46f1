//! HTTP surface of the broker.
//!
//! | Route | Result |
//! |-------|--------|
//! | `POST /api/rancher/clusters` | cluster list |
//! | `POST /api/rancher/kubeconfig` | generated kubeconfig for `clusterId` |
//! | `GET /healthz` | `ok` |

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use rancher_models::{BrokerRequest, RancherRequest};

use crate::config::AppConfig;
use crate::error::BrokerError;
use crate::fetch::{ProtectedResource, ResourceKind};
use crate::pipeline::Pipeline;
use crate::transport::Transport;

// ---------------------------------------------------------------------------
// Shared application state
// ---------------------------------------------------------------------------

/// State shared across all Axum handlers.
pub struct AppState {
    /// Pipeline driving every request; holds the pooled HTTP client.
    pub pipeline: Pipeline,
}

impl AppState {
    /// Build the shared transport and pipeline from configuration.
    pub fn from_config(config: &AppConfig) -> Result<Self, reqwest::Error> {
        let transport = Transport::with_timeout(config.request_timeout, config.retry_config())?;
        Ok(Self {
            pipeline: Pipeline::new(Arc::new(transport), config.session_mode),
        })
    }
}

/// Build the router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/rancher/clusters", post(list_clusters))
        .route("/api/rancher/kubeconfig", post(generate_kubeconfig))
        .route("/healthz", get(healthz))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `POST /api/rancher/clusters`: list clusters visible to the caller.
async fn list_clusters(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<ProtectedResource>, BrokerError> {
    let request = decode(&body)?;
    let resource = state
        .pipeline
        .run_detached(request, ResourceKind::Clusters)
        .await?;
    Ok(Json(resource))
}

/// `POST /api/rancher/kubeconfig`: generate a kubeconfig for `clusterId`.
async fn generate_kubeconfig(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<ProtectedResource>, BrokerError> {
    let request = decode(&body)?;
    let cluster = request.require_cluster()?.clone();
    let resource = state
        .pipeline
        .run_detached(request, ResourceKind::Kubeconfig(cluster))
        .await?;
    Ok(Json(resource))
}

/// `GET /healthz`: liveness check.
async fn healthz() -> &'static str {
    "ok"
}

/// Reject empty bodies before decoding, then validate.
fn decode(body: &[u8]) -> Result<BrokerRequest, BrokerError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(BrokerError::EmptyBody);
    }
    let wire: RancherRequest = serde_json::from_slice(body)?;
    Ok(BrokerRequest::try_from(wire)?)
}
