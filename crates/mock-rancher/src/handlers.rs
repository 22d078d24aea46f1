//! Route handlers and in-memory state of the mock control plane.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use axum::extract::{Path, Query, Request, State};
use axum::http::header::{AUTHORIZATION, COOKIE, HOST, SET_COOKIE};
use axum::http::{HeaderMap, HeaderName, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use rancher_models::{
    Cluster, GeneratedKubeconfig, LoginRequest, LoginResponse, SessionMode, TokenObject,
    TokenRequest,
};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{Failure, LoginRecord, RecordedCall};

/// Cookie carrying the login session.
pub(crate) const SESSION_COOKIE: &str = "R_SESS";

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Fixed behaviour chosen when the mock was built.
pub(crate) struct Settings {
    pub username: String,
    pub password: String,
    pub token_secret: Option<String>,
    pub clusters: Vec<Cluster>,
    pub accepted_bearers: HashSet<String>,
    pub failures: HashSet<Failure>,
    pub response_delay: Duration,
}

pub(crate) struct LiveToken {
    pub id: String,
    pub secret: String,
}

/// Everything the mock observed or handed out.
#[derive(Default)]
pub(crate) struct Ledger {
    pub calls: Vec<RecordedCall>,
    pub logins: Vec<LoginRecord>,
    pub token_requests: Vec<TokenRequest>,
    pub sessions: HashSet<String>,
    pub tokens: Vec<LiveToken>,
    issued: u64,
}

pub(crate) struct MockState {
    pub settings: Settings,
    ledger: Mutex<Ledger>,
}

/// Who a request authenticated as.
enum Principal {
    Session(String),
    Token,
    External,
}

impl MockState {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            ledger: Mutex::new(Ledger::default()),
        }
    }

    pub fn ledger(&self) -> MutexGuard<'_, Ledger> {
        self.ledger.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn fails(&self, failure: Failure) -> bool {
        self.settings.failures.contains(&failure)
    }

    /// A bearer header takes precedence over the session cookie.
    fn authenticate(&self, headers: &HeaderMap) -> Option<Principal> {
        let ledger = self.ledger();
        if let Some(bearer) = bearer(headers) {
            if ledger.sessions.contains(bearer) {
                return Some(Principal::Session(bearer.to_owned()));
            }
            if ledger.tokens.iter().any(|t| t.secret == bearer) {
                return Some(Principal::Token);
            }
            if self.settings.accepted_bearers.contains(bearer) {
                return Some(Principal::External);
            }
            return None;
        }
        session_cookie(headers)
            .filter(|session| ledger.sessions.contains(session))
            .map(Principal::Session)
    }

    fn session(&self, headers: &HeaderMap) -> Result<String, Response> {
        match self.authenticate(headers) {
            Some(Principal::Session(session)) => Ok(session),
            _ => Err(rejection(StatusCode::UNAUTHORIZED, "session required")),
        }
    }

    fn any_principal(&self, headers: &HeaderMap) -> Result<(), Response> {
        self.authenticate(headers)
            .map(drop)
            .ok_or_else(|| rejection(StatusCode::UNAUTHORIZED, "must authenticate"))
    }
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub(crate) fn router(state: Arc<MockState>) -> Router {
    Router::new()
        .route("/v3-public/localProviders/local", post(login))
        .route("/v3/token", post(create_token))
        .route("/v3/token/{id}", delete(delete_token))
        .route("/v3/tokens", post(logout))
        .route("/v3/clusters", get(list_clusters))
        .route("/v3/clusters/{id}", post(generate_kubeconfig))
        .layer(middleware::from_fn_with_state(state.clone(), record))
        .with_state(state)
}

/// Apply the configured delay, then log the call.
async fn record(State(state): State<Arc<MockState>>, request: Request, next: Next) -> Response {
    let delay = state.settings.response_delay;
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }

    let uri = request.uri();
    let call = RecordedCall {
        method: request.method().to_string(),
        path: uri
            .path_and_query()
            .map_or_else(|| uri.path().to_owned(), |pq| pq.as_str().to_owned()),
        authorization: header(request.headers(), &AUTHORIZATION),
        cookie: header(request.headers(), &COOKIE),
    };
    debug!(method = %call.method, path = %call.path, "mock call");
    state.ledger().calls.push(call);

    next.run(request).await
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct ActionQuery {
    action: Option<String>,
}

impl ActionQuery {
    fn require(&self, expected: &str) -> Result<(), Response> {
        if self.action.as_deref() == Some(expected) {
            Ok(())
        } else {
            Err(rejection(StatusCode::BAD_REQUEST, "unsupported action"))
        }
    }
}

async fn login(
    State(state): State<Arc<MockState>>,
    Query(query): Query<ActionQuery>,
    Json(body): Json<LoginRequest>,
) -> Response {
    if let Err(rejected) = query.require("login") {
        return rejected;
    }

    state.ledger().logins.push(LoginRecord {
        username: body.username.clone(),
        description: body.description.clone(),
        response_type: body.response_type,
        ttl: body.ttl,
    });

    if body.username != state.settings.username || body.password != state.settings.password {
        return rejection(StatusCode::UNAUTHORIZED, "authentication failed");
    }

    let session = format!("session-{}", Uuid::new_v4().simple());
    state.ledger().sessions.insert(session.clone());
    info!(username = %body.username, mode = %body.response_type, "session opened");

    match body.response_type {
        SessionMode::Cookie => (
            [(SET_COOKIE, format!("{SESSION_COOKIE}={session}; Path=/; HttpOnly"))],
            Json(json!({})),
        )
            .into_response(),
        SessionMode::Json => Json(LoginResponse { token: session }).into_response(),
    }
}

async fn create_token(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Json(body): Json<TokenRequest>,
) -> Response {
    if let Err(rejected) = state.session(&headers) {
        return rejected;
    }

    let mut ledger = state.ledger();
    ledger.token_requests.push(body);
    if state.fails(Failure::TokenCreate) {
        return rejection(StatusCode::INTERNAL_SERVER_ERROR, "token creation failed");
    }

    ledger.issued += 1;
    let id = format!("tok-{}", ledger.issued);
    let secret = state
        .settings
        .token_secret
        .clone()
        .unwrap_or_else(|| format!("{id}:{}", Uuid::new_v4().simple()));
    ledger.tokens.push(LiveToken {
        id: id.clone(),
        secret: secret.clone(),
    });
    info!(token_id = %id, "token issued");

    (StatusCode::CREATED, Json(TokenObject { id, token: secret })).into_response()
}

async fn delete_token(
    State(state): State<Arc<MockState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    if let Err(rejected) = state.any_principal(&headers) {
        return rejected;
    }
    if state.fails(Failure::DeleteToken) {
        return rejection(StatusCode::INTERNAL_SERVER_ERROR, "token deletion failed");
    }

    let mut ledger = state.ledger();
    let before = ledger.tokens.len();
    ledger.tokens.retain(|t| t.id != id);
    if ledger.tokens.len() == before {
        return rejection(StatusCode::NOT_FOUND, "token not found");
    }
    info!(token_id = %id, "token deleted");
    StatusCode::NO_CONTENT.into_response()
}

async fn logout(
    State(state): State<Arc<MockState>>,
    Query(query): Query<ActionQuery>,
    headers: HeaderMap,
) -> Response {
    if let Err(rejected) = query.require("logout") {
        return rejected;
    }
    let session = match state.session(&headers) {
        Ok(session) => session,
        Err(rejected) => return rejected,
    };
    if state.fails(Failure::Logout) {
        return rejection(StatusCode::INTERNAL_SERVER_ERROR, "logout failed");
    }

    state.ledger().sessions.remove(&session);
    info!("session closed");
    Json(json!({})).into_response()
}

async fn list_clusters(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    if let Err(rejected) = state.any_principal(&headers) {
        return rejected;
    }
    if state.fails(Failure::ListClusters) {
        return rejection(StatusCode::INTERNAL_SERVER_ERROR, "cluster listing failed");
    }
    Json(json!({
        "type": "collection",
        "resourceType": "cluster",
        "data": state.settings.clusters,
    }))
    .into_response()
}

async fn generate_kubeconfig(
    State(state): State<Arc<MockState>>,
    Path(id): Path<String>,
    Query(query): Query<ActionQuery>,
    headers: HeaderMap,
) -> Response {
    if let Err(rejected) = query.require("generateKubeconfig") {
        return rejected;
    }
    if let Err(rejected) = state.any_principal(&headers) {
        return rejected;
    }
    if state.fails(Failure::GenerateKubeconfig) {
        return rejection(StatusCode::INTERNAL_SERVER_ERROR, "kubeconfig generation failed");
    }
    let Some(cluster) = state.settings.clusters.iter().find(|c| c.id == id) else {
        return rejection(StatusCode::NOT_FOUND, "cluster not found");
    };

    let host = header(&headers, &HOST).unwrap_or_else(|| "localhost".to_owned());
    Json(GeneratedKubeconfig {
        base_type: "generateKubeConfigOutput".into(),
        config: kubeconfig(&host, cluster),
        kind: "generateKubeConfigOutput".into(),
    })
    .into_response()
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn rejection(status: StatusCode, message: &str) -> Response {
    let body = json!({
        "type": "error",
        "status": status.as_u16(),
        "message": message,
    });
    (status, Json(body)).into_response()
}

fn header(headers: &HeaderMap, name: &HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned)
}

fn bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

fn session_cookie(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.to_owned())
}

fn kubeconfig(host: &str, cluster: &Cluster) -> String {
    let user = format!("kubeconfig-user-{}", Uuid::new_v4().simple());
    format!(
        "apiVersion: v1
kind: Config
clusters:
- name: \"{name}\"
  cluster:
    server: \"https://{host}/k8s/clusters/{id}\"
users:
- name: \"{name}\"
  user:
    token: \"{user}\"
contexts:
- name: \"{name}\"
  context:
    user: \"{name}\"
    cluster: \"{name}\"
current-context: \"{name}\"
",
        name = cluster.name,
        id = cluster.id,
    )
}
