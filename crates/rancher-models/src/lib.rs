#![deny(missing_docs)]

//! # Rancher Models
//!
//! Data types shared by the Rancher broker service and the mock control
//! plane used in its tests.
//!
//! ## Request flow
//!
//! ```text
//! RancherRequest (inbound JSON)
//! └── BrokerRequest
//!     ├── Endpoint ──────────── base_url()
//!     ├── AuthMethod
//!     │   ├── Password(Credentials)   → login → token → fetch → revoke
//!     │   └── Bearer(BearerToken)     → fetch
//!     └── Option<ClusterId>
//! ```
//!
//! ## Module layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`endpoint`] | Control-plane connection parameters and base URL resolution |
//! | [`credentials`] | Username/password pairs and caller-owned bearer tokens |
//! | [`cluster`] | Cluster identifiers, listings and generated kubeconfigs |
//! | [`request`] | The inbound broker request and its validation |
//! | [`rancher`] | Bodies exchanged with the control plane's REST API |

pub mod cluster;
pub mod credentials;
pub mod endpoint;
pub mod error;
pub mod rancher;
pub mod request;

pub use cluster::*;
pub use credentials::*;
pub use endpoint::*;
pub use error::*;
pub use rancher::*;
pub use request::*;
