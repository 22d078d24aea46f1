//! Cluster identifiers and the protected resources fetched for them.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;

// ---------------------------------------------------------------------------
// ClusterId
// ---------------------------------------------------------------------------

/// Identifier of a downstream cluster managed by the control plane
/// (e.g. `c-m-abc123`, `local`).
///
/// The identifier is placed into a URL path segment, so it must be non-empty
/// and free of path, query and fragment delimiters.
///
/// # Examples
///
/// ```
/// use rancher_models::ClusterId;
///
/// let id = ClusterId::parse("c-1").unwrap();
/// assert_eq!(id.as_str(), "c-1");
/// assert!(ClusterId::parse("../v3/tokens").is_err());
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct ClusterId(String);

impl ClusterId {
    /// Validate and wrap a cluster identifier.
    pub fn parse(id: &str) -> Result<Self, ModelError> {
        if id.is_empty() {
            return Err(ModelError::InvalidClusterId {
                value: id.to_string(),
                reason: "must not be empty".into(),
            });
        }
        if let Some(c) = id
            .chars()
            .find(|c| matches!(c, '/' | '?' | '#' | '%') || c.is_whitespace() || c.is_control())
        {
            return Err(ModelError::InvalidClusterId {
                value: id.to_string(),
                reason: format!("contains forbidden character {c:?}"),
            });
        }
        Ok(Self(id.to_string()))
    }

    /// Return the inner string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClusterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ClusterId {
    type Error = ModelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ClusterId> for String {
    fn from(id: ClusterId) -> Self {
        id.0
    }
}

// ---------------------------------------------------------------------------
// Cluster listing
// ---------------------------------------------------------------------------

/// One entry of the control plane's cluster collection.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Cluster {
    /// Control-plane identifier (used for kubeconfig generation).
    pub id: String,
    /// Human-readable display name.
    #[serde(default)]
    pub name: String,
}

/// The cluster collection, in the order the control plane returned it.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct ClusterList {
    /// Clusters visible to the token that fetched the list.
    pub data: Vec<Cluster>,
}

// ---------------------------------------------------------------------------
// Generated kubeconfig
// ---------------------------------------------------------------------------

/// Output of the per-cluster `generateKubeconfig` action.
///
/// `config` is the kubeconfig document as produced by the control plane; the
/// broker does not interpret it.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct GeneratedKubeconfig {
    /// Schema base type reported by the control plane.
    #[serde(rename = "baseType", default)]
    pub base_type: String,
    /// The kubeconfig document.
    pub config: String,
    /// Schema type reported by the control plane.
    #[serde(rename = "type", default)]
    pub kind: String,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
