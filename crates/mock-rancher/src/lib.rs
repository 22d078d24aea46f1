//! # Mock Rancher
//!
//! A local stand-in for the parts of the Rancher v3 API the broker talks to:
//! local-provider login, token creation and deletion, logout, cluster
//! listing and kubeconfig generation.
//!
//! Every call is recorded, and failures can be injected per operation. The
//! listener sits behind a small TCP front that can drop the first N
//! connections, which lets tests exercise transport retries.
//!
//! ```no_run
//! # async fn demo() -> std::io::Result<()> {
//! use mock_rancher::{Failure, MockRancher};
//!
//! let mock = MockRancher::builder()
//!     .credentials("admin", "secret")
//!     .cluster("c-1", "production")
//!     .fail(Failure::DeleteToken)
//!     .start()
//!     .await?;
//! println!("listening on {}", mock.url());
//! # Ok(())
//! # }
//! ```

mod handlers;

use std::collections::HashSet;
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rancher_models::{Cluster, SessionMode, TokenRequest};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::handlers::{MockState, Settings};

// ---------------------------------------------------------------------------
// Public records
// ---------------------------------------------------------------------------

/// Operation that can be made to answer `500 Internal Server Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Failure {
    /// `POST /v3/token`
    TokenCreate,
    /// `GET /v3/clusters`
    ListClusters,
    /// `POST /v3/clusters/{id}?action=generateKubeconfig`
    GenerateKubeconfig,
    /// `DELETE /v3/token/{id}`
    DeleteToken,
    /// `POST /v3/tokens?action=logout`
    Logout,
}

/// One request that reached the HTTP layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    /// HTTP method, upper case.
    pub method: String,
    /// Path including the query string.
    pub path: String,
    /// Raw `Authorization` header.
    pub authorization: Option<String>,
    /// Raw `Cookie` header.
    pub cookie: Option<String>,
}

/// A login attempt, successful or not. The password is not kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginRecord {
    /// Username sent by the caller.
    pub username: String,
    /// Session description sent by the caller.
    pub description: String,
    /// Requested session shape (`cookie` or `json`).
    pub response_type: SessionMode,
    /// Requested session lifetime in milliseconds.
    pub ttl: u64,
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Configures a [`MockRancher`] before it starts listening.
#[derive(Debug)]
pub struct MockRancherBuilder {
    username: String,
    password: String,
    token_secret: Option<String>,
    clusters: Vec<Cluster>,
    accepted_bearers: HashSet<String>,
    failures: HashSet<Failure>,
    drop_connections: usize,
    response_delay: Duration,
}

impl Default for MockRancherBuilder {
    fn default() -> Self {
        Self {
            username: "admin".into(),
            password: "password".into(),
            token_secret: None,
            clusters: Vec::new(),
            accepted_bearers: HashSet::new(),
            failures: HashSet::new(),
            drop_connections: 0,
            response_delay: Duration::ZERO,
        }
    }
}

impl MockRancherBuilder {
    /// The only username/password pair login accepts.
    pub fn credentials(mut self, username: &str, password: &str) -> Self {
        self.username = username.into();
        self.password = password.into();
        self
    }

    /// Fixed bearer value for every issued token. Defaults to `{id}:{random}`.
    /// An empty value makes token creation answer with an id but no token.
    pub fn token_secret(mut self, secret: &str) -> Self {
        self.token_secret = Some(secret.into());
        self
    }

    /// Add a cluster. Listing preserves insertion order.
    pub fn cluster(mut self, id: &str, name: &str) -> Self {
        self.clusters.push(Cluster {
            id: id.into(),
            name: name.into(),
        });
        self
    }

    /// Accept a caller-owned bearer token on resource endpoints.
    pub fn accept_bearer(mut self, token: &str) -> Self {
        self.accepted_bearers.insert(token.into());
        self
    }

    /// Make `failure` answer 500.
    pub fn fail(mut self, failure: Failure) -> Self {
        self.failures.insert(failure);
        self
    }

    /// Close the first `count` accepted connections without reading them.
    pub fn drop_connections(mut self, count: usize) -> Self {
        self.drop_connections = count;
        self
    }

    /// Delay every response by `delay`.
    pub fn response_delay(mut self, delay: Duration) -> Self {
        self.response_delay = delay;
        self
    }

    /// Start on an ephemeral loopback port.
    pub async fn start(self) -> io::Result<MockRancher> {
        self.start_on(SocketAddr::from(([127, 0, 0, 1], 0))).await
    }

    /// Start on `addr`.
    pub async fn start_on(self, addr: SocketAddr) -> io::Result<MockRancher> {
        let front = TcpListener::bind(addr).await?;
        let backend = TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0))).await?;
        let local = front.local_addr()?;
        let backend_addr = backend.local_addr()?;

        let state = Arc::new(MockState::new(Settings {
            username: self.username,
            password: self.password,
            token_secret: self.token_secret,
            clusters: self.clusters,
            accepted_bearers: self.accepted_bearers,
            failures: self.failures,
            response_delay: self.response_delay,
        }));
        let dropped = Arc::new(AtomicUsize::new(0));

        let app = handlers::router(state.clone());
        let server = tokio::spawn(async move {
            if let Err(e) = axum::serve(backend, app).await {
                warn!(error = %e, "mock server stopped");
            }
        });
        let proxy = tokio::spawn(front_door(
            front,
            backend_addr,
            self.drop_connections,
            dropped.clone(),
        ));

        info!(%local, "mock rancher listening");
        Ok(MockRancher {
            url: format!("http://{local}"),
            state,
            dropped,
            tasks: vec![server, proxy],
        })
    }
}

/// Drop the first `to_drop` connections, then forward the rest to `backend`.
async fn front_door(
    front: TcpListener,
    backend: SocketAddr,
    to_drop: usize,
    dropped: Arc<AtomicUsize>,
) {
    loop {
        let (mut inbound, peer) = match front.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                warn!(error = %e, "accept failed");
                continue;
            }
        };

        if dropped.load(Ordering::SeqCst) < to_drop {
            dropped.fetch_add(1, Ordering::SeqCst);
            debug!(%peer, "dropping connection");
            drop(inbound);
            continue;
        }

        tokio::spawn(async move {
            match TcpStream::connect(backend).await {
                Ok(mut outbound) => {
                    let _ = tokio::io::copy_bidirectional(&mut inbound, &mut outbound).await;
                }
                Err(e) => warn!(error = %e, "backend unreachable"),
            }
        });
    }
}

// ---------------------------------------------------------------------------
// Running mock
// ---------------------------------------------------------------------------

/// A running mock control plane. Stops when dropped.
pub struct MockRancher {
    url: String,
    state: Arc<MockState>,
    dropped: Arc<AtomicUsize>,
    tasks: Vec<JoinHandle<()>>,
}

impl MockRancher {
    /// Start configuring a new mock.
    pub fn builder() -> MockRancherBuilder {
        MockRancherBuilder::default()
    }

    /// Base URL, e.g. `http://127.0.0.1:41234`.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Every recorded call, in arrival order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state.ledger().calls.clone()
    }

    /// Calls matching `method` and `path` (path includes the query).
    pub fn calls_to(&self, method: &str, path: &str) -> Vec<RecordedCall> {
        self.state
            .ledger()
            .calls
            .iter()
            .filter(|c| c.method == method && c.path == path)
            .cloned()
            .collect()
    }

    /// Number of calls matching `method` and `path`.
    pub fn count(&self, method: &str, path: &str) -> usize {
        self.calls_to(method, path).len()
    }

    /// Login attempts, in arrival order.
    pub fn logins(&self) -> Vec<LoginRecord> {
        self.state.ledger().logins.clone()
    }

    /// Bodies of every token creation request that authenticated.
    pub fn token_requests(&self) -> Vec<TokenRequest> {
        self.state.ledger().token_requests.clone()
    }

    /// Ids of issued tokens that have not been deleted.
    pub fn live_tokens(&self) -> Vec<String> {
        self.state
            .ledger()
            .tokens
            .iter()
            .map(|t| t.id.clone())
            .collect()
    }

    /// Number of login sessions not yet logged out.
    pub fn live_sessions(&self) -> usize {
        self.state.ledger().sessions.len()
    }

    /// Connections closed by the front door so far.
    pub fn dropped_connections(&self) -> usize {
        self.dropped.load(Ordering::SeqCst)
    }
}

impl Drop for MockRancher {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}
