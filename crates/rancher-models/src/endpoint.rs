//! Control-plane connection parameters.
//!
//! An [`Endpoint`] is either a host/port pair plus a TLS flag, or a fully
//! qualified base URL supplied by the caller. [`Endpoint::base_url`] turns
//! it into the prefix every REST path is appended to.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Where the remote control plane lives.
///
/// # Examples
///
/// ```
/// use rancher_models::Endpoint;
///
/// let endpoint = Endpoint::parts("rancher.example.com", 443, true);
/// assert_eq!(endpoint.base_url(), "https://rancher.example.com:443");
///
/// let endpoint = Endpoint::url("http://127.0.0.1:4100");
/// assert_eq!(endpoint.base_url(), "http://127.0.0.1:4100");
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub enum Endpoint {
    /// Host, port and whether to speak TLS.
    Parts {
        /// Host name or address.
        host: String,
        /// TCP port.
        port: u16,
        /// `true` selects `https`, `false` selects `http`.
        secure: bool,
    },
    /// A base URL used verbatim.
    Url(String),
}

impl Endpoint {
    /// Build an endpoint from host, port and TLS flag.
    pub fn parts(host: &str, port: u16, secure: bool) -> Self {
        Self::Parts {
            host: host.to_string(),
            port,
            secure,
        }
    }

    /// Build an endpoint from an explicit base URL.
    pub fn url(url: &str) -> Self {
        Self::Url(url.to_string())
    }

    /// Resolve the base URL.
    ///
    /// Explicit URLs are returned unchanged. Otherwise the URL is
    /// `scheme://host:port`, with `https` when `secure` is set. Malformed
    /// input is passed through; validation belongs to the caller.
    pub fn base_url(&self) -> String {
        match self {
            Self::Url(url) => url.clone(),
            Self::Parts { host, port, secure } => {
                let scheme = if *secure { "https" } else { "http" };
                format!("{scheme}://{host}:{port}")
            }
        }
    }

    /// Append an API path to the base URL with exactly one separating `/`.
    pub fn join(&self, path: &str) -> String {
        let base = self.base_url();
        format!(
            "{}/{}",
            base.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.base_url())
    }
}
