//! Rancher credential broker.
//!
//! Accepts either a username/password pair or a caller-owned bearer token,
//! fetches one protected resource (the cluster list or a generated
//! kubeconfig) from a Rancher control plane, and guarantees that every
//! session and token it created along the way is revoked before the
//! response is returned.
//!
//! 1. [`login`] exchanges credentials for a session.
//! 2. [`token`] mints a derived API token from the session.
//! 3. [`fetch`] retrieves the resource with the token.
//! 4. [`reaper`] deletes the token and logs the session out.
//!
//! [`pipeline`] sequences the steps, [`transport`] wraps every outbound
//! call in the [`retry`] policy, and [`routes`] exposes the HTTP surface.

pub mod config;
pub mod credential;
pub mod error;
pub mod fetch;
pub mod login;
pub mod pipeline;
pub mod reaper;
pub mod retry;
pub mod routes;
pub mod token;
pub mod transport;

#[cfg(test)]
mod testing;
