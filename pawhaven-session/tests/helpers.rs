//! Test helpers: a scripted `/auth` backend served by axum on a random port

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use pawhaven_core::User;
use pawhaven_session::{
    ApiClientConfig, AuthSession, Location, MemoryNavigator, TokenStore,
};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, AtomicU16, Ordering};
use std::sync::{Arc, LazyLock, Mutex};
use tokio::net::TcpListener;
use tokio::sync::Notify;

pub const VALID_TOKEN: &str = "token-abc";
pub const PASSWORD: &str = "correct-horse";

// Only initialize tracing once
static TRACING: LazyLock<()> = LazyLock::new(|| {
    if std::env::var("TEST_LOG").is_ok() {
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .finish();
        tracing::subscriber::set_global_default(subscriber).ok();
    }
});

/// One request as the backend saw it
#[derive(Debug, Clone)]
pub struct Hit {
    pub method: String,
    pub path: String,
    pub bearer: Option<String>,
    pub body: Value,
}

/// How `GET /auth/me` answers a valid token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeReply {
    User,
    /// 200 with `success: false`
    Refused,
    /// 200 with `success: true` and no `user`
    MissingUser,
}

pub struct MockState {
    pub user: Mutex<Value>,
    pub hits: Mutex<Vec<Hit>>,
    /// Status returned by `POST /auth/logout`
    pub logout_status: AtomicU16,
    /// When set, `PUT /auth/profile` answers with this status and no user
    pub profile_status: AtomicU16,
    /// When set, login answers `success: true` without a token
    pub omit_login_token: AtomicBool,
    pub me_reply: Mutex<MeReply>,
    /// When set, login parks until `release_login` is notified
    pub hold_login: AtomicBool,
    pub login_arrived: Notify,
    pub release_login: Notify,
}

impl MockState {
    fn record(&self, method: &str, path: &str, headers: &HeaderMap, body: Value) {
        let bearer = headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::to_string);
        self.hits.lock().unwrap().push(Hit {
            method: method.to_string(),
            path: path.to_string(),
            bearer,
            body,
        });
    }
}

pub struct MockBackend {
    pub address: String,
    pub state: Arc<MockState>,
}

impl MockBackend {
    pub fn hits(&self) -> Vec<Hit> {
        self.state.hits.lock().unwrap().clone()
    }

    pub fn hits_for(&self, path: &str) -> Vec<Hit> {
        self.hits().into_iter().filter(|hit| hit.path == path).collect()
    }

    pub fn set_me_reply(&self, reply: MeReply) {
        *self.state.me_reply.lock().unwrap() = reply;
    }

    pub fn set_user(&self, user: Value) {
        *self.state.user.lock().unwrap() = user;
    }

    /// Session over this backend with an in-memory store
    pub fn session(&self) -> TestSession {
        self.session_with_store(TokenStore::in_memory())
    }

    pub fn session_with_store(&self, store: TokenStore) -> TestSession {
        let navigator = Arc::new(MemoryNavigator::new(Location::new("/dashboard/my-pets")));
        let session = AuthSession::new(
            ApiClientConfig::new(self.address.clone()).with_timeout(5),
            store.clone(),
            navigator.clone(),
        )
        .expect("Failed to build session");

        TestSession {
            session,
            store,
            navigator,
        }
    }
}

pub struct TestSession {
    pub session: AuthSession,
    pub store: TokenStore,
    pub navigator: Arc<MemoryNavigator>,
}

pub fn default_user() -> Value {
    json!({
        "_id": "u-1",
        "name": "Mia Park",
        "email": "mia@example.com",
        "role": "user",
        "photoURL": "https://cdn.pawhaven.test/mia.jpg"
    })
}

pub fn parse_user(value: &Value) -> User {
    serde_json::from_value(value.clone()).expect("valid user json")
}

pub async fn spawn_backend() -> MockBackend {
    LazyLock::force(&TRACING);

    let state = Arc::new(MockState {
        user: Mutex::new(default_user()),
        hits: Mutex::new(Vec::new()),
        logout_status: AtomicU16::new(200),
        profile_status: AtomicU16::new(0),
        omit_login_token: AtomicBool::new(false),
        me_reply: Mutex::new(MeReply::User),
        hold_login: AtomicBool::new(false),
        login_arrived: Notify::new(),
        release_login: Notify::new(),
    });

    let app = Router::new()
        .route("/auth/me", get(me))
        .route("/auth/login", post(login))
        .route("/auth/register", post(register))
        .route("/auth/logout", post(logout))
        .route("/auth/profile", put(update_profile))
        .with_state(state.clone());

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    MockBackend {
        address: format!("http://127.0.0.1:{}", port),
        state,
    }
}

fn unauthorized(message: &str) -> (StatusCode, Json<Value>) {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "success": false, "message": message })),
    )
}

async fn me(State(state): State<Arc<MockState>>, headers: HeaderMap) -> impl IntoResponse {
    state.record("GET", "/auth/me", &headers, Value::Null);
    let authorized = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value == format!("Bearer {}", VALID_TOKEN));

    if !authorized {
        return unauthorized("Invalid token");
    }
    let reply = *state.me_reply.lock().unwrap();
    match reply {
        MeReply::User => {
            let user = state.user.lock().unwrap().clone();
            (StatusCode::OK, Json(json!({ "success": true, "user": user })))
        }
        MeReply::Refused => (
            StatusCode::OK,
            Json(json!({ "success": false, "message": "Account suspended" })),
        ),
        MeReply::MissingUser => (StatusCode::OK, Json(json!({ "success": true }))),
    }
}

async fn login(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    state.record("POST", "/auth/login", &headers, body.clone());

    if state.hold_login.load(Ordering::SeqCst) {
        state.login_arrived.notify_one();
        state.release_login.notified().await;
    }

    if body["password"] != PASSWORD {
        return unauthorized("Invalid credentials");
    }
    let user = state.user.lock().unwrap().clone();
    if state.omit_login_token.load(Ordering::SeqCst) {
        return (StatusCode::OK, Json(json!({ "success": true, "user": user })));
    }
    (
        StatusCode::OK,
        Json(json!({ "success": true, "token": VALID_TOKEN, "user": user })),
    )
}

async fn register(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    state.record("POST", "/auth/register", &headers, body.clone());

    if body["email"] == "taken@example.com" {
        return (
            StatusCode::OK,
            Json(json!({ "success": false, "message": "Email already registered" })),
        );
    }

    let user = json!({
        "_id": "u-new",
        "name": body["name"],
        "email": body["email"],
        "role": "user",
        "photoURL": body.get("photoURL").cloned().unwrap_or(Value::Null),
    });
    *state.user.lock().unwrap() = user.clone();
    (
        StatusCode::CREATED,
        Json(json!({ "success": true, "token": VALID_TOKEN, "user": user })),
    )
}

async fn logout(State(state): State<Arc<MockState>>, headers: HeaderMap) -> impl IntoResponse {
    state.record("POST", "/auth/logout", &headers, Value::Null);
    let status = StatusCode::from_u16(state.logout_status.load(Ordering::SeqCst))
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(json!({ "success": status.is_success() })))
}

async fn update_profile(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    state.record("PUT", "/auth/profile", &headers, body.clone());

    let forced = state.profile_status.load(Ordering::SeqCst);
    if forced != 0 {
        let status = StatusCode::from_u16(forced).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        return (status, Json(json!({ "success": false, "message": "Forbidden" })));
    }

    let mut user = state.user.lock().unwrap();
    if let Some(name) = body.get("name") {
        user["name"] = name.clone();
    }
    if let Some(photo) = body.get("photoURL") {
        user["photoURL"] = photo.clone();
    }
    // the backend decorates the stored record
    user["updatedAt"] = json!("2026-10-19T12:00:00Z");
    (
        StatusCode::OK,
        Json(json!({ "success": true, "user": user.clone() })),
    )
}
