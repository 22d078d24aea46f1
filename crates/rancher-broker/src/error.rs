//! Error types for the Rancher broker.
//!
//! [`TransportError`] describes what went wrong on a single outbound call.
//! [`BrokerError`] says which pipeline stage it broke and implements
//! [`axum::response::IntoResponse`] so handlers can return
//! `Result<…, BrokerError>` directly.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use rancher_models::ModelError;
use reqwest::Method;
use serde_json::json;

/// Failure of one outbound call to the control plane.
///
/// `target` is the request URL with any userinfo removed; none of the
/// variants carry header or body contents. The underlying cause is part of
/// the message and is not exposed again as [`std::error::Error::source`].
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The request could not be constructed (e.g. an unparsable URL).
    #[error("{method} {target}: invalid request: {cause}")]
    Build {
        method: Method,
        target: String,
        cause: reqwest::Error,
    },

    /// No response arrived, even after retrying.
    #[error("{method} {target}: unreachable after {attempts} attempt(s): {cause}")]
    Unreachable {
        method: Method,
        target: String,
        attempts: u32,
        cause: reqwest::Error,
    },

    /// The control plane answered with a non-success status.
    #[error("{method} {target}: rejected with status {status}")]
    Rejected {
        method: Method,
        target: String,
        status: reqwest::StatusCode,
    },

    /// The response body could not be decoded.
    #[error("{method} {target}: unreadable response body: {cause}")]
    InvalidBody {
        method: Method,
        target: String,
        cause: reqwest::Error,
    },

    /// The response decoded but lacked a required value.
    #[error("{method} {target}: response is missing {field}")]
    MissingField {
        method: Method,
        target: String,
        field: &'static str,
    },
}

/// Errors surfaced to the caller of the broker.
#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    /// The inbound request had no body.
    #[error("request body is empty")]
    EmptyBody,

    /// The inbound request body could not be decoded or validated.
    #[error("invalid request: {0}")]
    Decode(String),

    /// Login or derived-token issuance failed.
    #[error("authentication against the control plane failed: {0}")]
    Auth(TransportError),

    /// The cluster list or kubeconfig could not be fetched.
    #[error("fetching the requested resource failed: {0}")]
    Resource(TransportError),

    /// A credential created by the broker could not be revoked.
    #[error("revoking broker-issued credentials failed: {0}")]
    Cleanup(TransportError),

    /// The pipeline task ended without producing a result.
    #[error("pipeline aborted: {0}")]
    Aborted(String),
}

impl BrokerError {
    /// HTTP status reported to the caller.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::EmptyBody | Self::Decode(_) => StatusCode::BAD_REQUEST,
            Self::Auth(_) | Self::Resource(_) | Self::Cleanup(_) | Self::Aborted(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<ModelError> for BrokerError {
    fn from(e: ModelError) -> Self {
        Self::Decode(e.to_string())
    }
}

impl From<serde_json::Error> for BrokerError {
    fn from(e: serde_json::Error) -> Self {
        Self::Decode(e.to_string())
    }
}

impl IntoResponse for BrokerError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.to_string();

        if status.is_server_error() {
            tracing::error!(%status, error = %message, "request failed");
        } else {
            tracing::warn!(%status, error = %message, "request rejected");
        }
        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rejected() -> TransportError {
        TransportError::Rejected {
            method: Method::DELETE,
            target: "http://127.0.0.1:4100/v3/token/tok-1".into(),
            status: reqwest::StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    #[test]
    fn client_errors_map_to_bad_request() {
        assert_eq!(BrokerError::EmptyBody.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            BrokerError::Decode("expected value".into()).status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn pipeline_errors_map_to_internal_error() {
        assert_eq!(BrokerError::Auth(rejected()).status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            BrokerError::Resource(rejected()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            BrokerError::Cleanup(rejected()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn messages_name_method_and_target() {
        let err = BrokerError::Cleanup(rejected());
        assert_eq!(
            err.to_string(),
            "revoking broker-issued credentials failed: DELETE http://127.0.0.1:4100/v3/token/tok-1: \
             rejected with status 500 Internal Server Error"
        );
    }

    #[test]
    fn model_errors_become_decode_errors() {
        let err: BrokerError = ModelError::MissingField {
            field: "clusterId".into(),
        }
        .into();
        assert!(matches!(err, BrokerError::Decode(_)));
        assert_eq!(err.to_string(), "invalid request: missing required field: clusterId");
    }

    #[test]
    fn transport_detail_is_reported_once() {
        use std::error::Error as _;

        let err = BrokerError::Cleanup(rejected());
        assert!(err.source().is_none());
        assert_eq!(err.to_string().matches("rejected with status").count(), 1);
    }
}
