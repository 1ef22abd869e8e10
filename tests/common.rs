#![allow(dead_code, unreachable_pub, clippy::unwrap_used, clippy::missing_panics_doc, missing_debug_implementations)]

use async_trait::async_trait;
use availability_notifier::adapters::credentials::CredentialSource;
use availability_notifier::adapters::database::{DatabaseError, UserRepository};
use availability_notifier::adapters::firebase::FirebaseApp;
use availability_notifier::adapters::push::{PushError, PushProvider};
use availability_notifier::config::{
    Config, CredentialKind, FirebaseConfig, HealthConfig, LogFormat, NotificationConfig, ServerConfig,
    TelemetryConfig,
};
use availability_notifier::domain::notification::{AvailabilityNotification, MulticastResponse, SendResponse};
use availability_notifier::domain::user::UserSnapshot;
use availability_notifier::{AppBuilder, api};
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

static INIT: Once = Once::new();

pub fn setup_tracing() {
    INIT.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "warn".into())
            .add_directive("availability_notifier=debug".parse().unwrap())
            .add_directive("tower=warn".parse().unwrap())
            .add_directive("hyper=warn".parse().unwrap())
            .add_directive("reqwest=warn".parse().unwrap());

        tracing_subscriber::fmt().with_env_filter(filter).init();
    });
}

pub fn get_test_config() -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            mgmt_port: 0,
            invocation_timeout_secs: 5,
            shutdown_timeout_secs: 1,
        },
        firebase: FirebaseConfig {
            project_id: "demo-project".to_string(),
            database_url: "http://127.0.0.1:9".to_string(),
            users_path: "/users".to_string(),
            trigger_ref: "/users/{uid}/available".to_string(),
            credential_source: CredentialKind::None,
            access_token: None,
            metadata_url: "http://127.0.0.1:9".to_string(),
            fcm_endpoint: "http://127.0.0.1:9".to_string(),
            dry_run: false,
            max_concurrent_sends: 8,
        },
        notifications: NotificationConfig {
            title: "Usuario disponible".to_string(),
            body: "Un usuario ha activado disponibilidad. Toca para seguirlo.".to_string(),
        },
        health: HealthConfig { database_timeout_ms: 1000, credentials_timeout_ms: 1000 },
        telemetry: TelemetryConfig { otlp_endpoint: None, log_format: LogFormat::Text },
    }
}

pub fn sample_users() -> Value {
    json!({
        "u1": {"available": true},
        "u2": {"fcmToken": "t2"},
        "u3": {"fcmToken": "t3"},
        "u4": {},
    })
}

/// In-memory users collection with a read counter.
#[derive(Debug, Default)]
pub struct FakeUsers {
    pub collection: Value,
    pub fail: bool,
    pub reads: AtomicUsize,
}

impl FakeUsers {
    pub fn with(collection: Value) -> Arc<Self> {
        Arc::new(Self { collection, ..Default::default() })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self { fail: true, ..Default::default() })
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UserRepository for FakeUsers {
    async fn fetch_all(&self) -> Result<UserSnapshot, DatabaseError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(DatabaseError::Status {
                status: reqwest::StatusCode::SERVICE_UNAVAILABLE,
                body: "unavailable".to_string(),
            });
        }
        Ok(UserSnapshot::from_value(&self.collection))
    }

    async fn ping(&self) -> Result<(), DatabaseError> {
        if self.fail {
            return Err(DatabaseError::Status {
                status: reqwest::StatusCode::SERVICE_UNAVAILABLE,
                body: "unavailable".to_string(),
            });
        }
        Ok(())
    }
}

/// Push provider that records every multicast call.
#[derive(Debug, Default)]
pub struct RecordingPush {
    pub fail: bool,
    pub delay: Option<Duration>,
    pub calls: Mutex<Vec<(Vec<String>, AvailabilityNotification)>>,
}

impl RecordingPush {
    pub fn failing() -> Arc<Self> {
        Arc::new(Self { fail: true, ..Default::default() })
    }

    /// Answers every call only after `delay`.
    pub fn slow(delay: Duration) -> Arc<Self> {
        Arc::new(Self { delay: Some(delay), ..Default::default() })
    }

    pub fn calls(&self) -> Vec<(Vec<String>, AvailabilityNotification)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl PushProvider for RecordingPush {
    async fn send_multicast(
        &self,
        tokens: &[String],
        payload: &AvailabilityNotification,
    ) -> Result<MulticastResponse, PushError> {
        self.calls.lock().unwrap().push((tokens.to_vec(), payload.clone()));
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(PushError::Other(anyhow::anyhow!("connection reset by peer")));
        }
        Ok(tokens.iter().enumerate().map(|(i, _)| SendResponse::delivered(format!("projects/demo/messages/{i}"))).collect())
    }
}

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path_and_query: String,
    pub authorization: Option<String>,
    pub body: Value,
}

/// Stand-in for the Realtime Database REST API, the metadata server and FCM.
#[derive(Debug)]
pub struct MockFirebaseState {
    pub users: Mutex<Value>,
    pub users_status: Mutex<StatusCode>,
    pub unregistered_tokens: Mutex<HashSet<String>>,
    pub db_requests: Mutex<Vec<RecordedRequest>>,
    pub fcm_requests: Mutex<Vec<RecordedRequest>>,
    pub metadata_fetches: AtomicUsize,
    pub fcm_delay: Mutex<Duration>,
    pub fcm_in_flight: AtomicUsize,
    pub fcm_peak_in_flight: AtomicUsize,
}

#[derive(Debug, Clone)]
pub struct MockFirebase {
    pub url: String,
    pub state: Arc<MockFirebaseState>,
}

impl MockFirebase {
    pub async fn start(users: Value) -> Self {
        let state = Arc::new(MockFirebaseState {
            users: Mutex::new(users),
            users_status: Mutex::new(StatusCode::OK),
            unregistered_tokens: Mutex::new(HashSet::new()),
            db_requests: Mutex::new(Vec::new()),
            fcm_requests: Mutex::new(Vec::new()),
            metadata_fetches: AtomicUsize::new(0),
            fcm_delay: Mutex::new(Duration::ZERO),
            fcm_in_flight: AtomicUsize::new(0),
            fcm_peak_in_flight: AtomicUsize::new(0),
        });

        let router = Router::new()
            .route("/v1/projects/{project}/messages:send", post(fcm_send))
            .route("/computeMetadata/v1/instance/service-accounts/default/token", get(metadata_token))
            .fallback(database_read)
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        Self { url: format!("http://{addr}"), state }
    }

    pub fn set_users_status(&self, status: StatusCode) {
        *self.state.users_status.lock().unwrap() = status;
    }

    pub fn unregister(&self, token: &str) {
        self.state.unregistered_tokens.lock().unwrap().insert(token.to_string());
    }

    /// Makes every FCM send take `delay` before answering.
    pub fn slow_down_fcm(&self, delay: Duration) {
        *self.state.fcm_delay.lock().unwrap() = delay;
    }

    pub fn fcm_peak_in_flight(&self) -> usize {
        self.state.fcm_peak_in_flight.load(Ordering::SeqCst)
    }

    pub fn db_requests(&self) -> Vec<RecordedRequest> {
        self.state.db_requests.lock().unwrap().clone()
    }

    pub fn fcm_requests(&self) -> Vec<RecordedRequest> {
        self.state.fcm_requests.lock().unwrap().clone()
    }

    pub fn metadata_fetches(&self) -> usize {
        self.state.metadata_fetches.load(Ordering::SeqCst)
    }

    /// Firebase configuration pointing every endpoint at this mock.
    pub fn firebase_config(&self, credential_source: CredentialKind) -> FirebaseConfig {
        FirebaseConfig {
            database_url: self.url.clone(),
            metadata_url: self.url.clone(),
            fcm_endpoint: self.url.clone(),
            credential_source,
            access_token: (credential_source == CredentialKind::Static).then(|| "static-token".to_string()),
            ..get_test_config().firebase
        }
    }

    pub fn firebase_app(&self, credentials: CredentialSource) -> Arc<FirebaseApp> {
        Arc::new(FirebaseApp::new("demo-project", &self.url, &self.url, reqwest::Client::new(), credentials))
    }
}

fn authorization(headers: &HeaderMap) -> Option<String> {
    headers.get("authorization").and_then(|v| v.to_str().ok()).map(str::to_owned)
}

async fn database_read(
    State(state): State<Arc<MockFirebaseState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> impl IntoResponse {
    let path_and_query = uri.path_and_query().map(ToString::to_string).unwrap_or_default();
    state.db_requests.lock().unwrap().push(RecordedRequest {
        method: method.to_string(),
        path_and_query,
        authorization: authorization(&headers),
        body: Value::Null,
    });

    let status = *state.users_status.lock().unwrap();
    if !status.is_success() {
        return (status, Json(json!({"error": "Permission denied"})));
    }

    if uri.path() != "/users.json" {
        return (StatusCode::OK, Json(Value::Null));
    }

    let users = state.users.lock().unwrap().clone();
    if uri.query() == Some("shallow=true") {
        let shallow: serde_json::Map<String, Value> =
            users.as_object().map(|m| m.keys().map(|k| (k.clone(), Value::Bool(true))).collect()).unwrap_or_default();
        return (StatusCode::OK, Json(Value::Object(shallow)));
    }
    (StatusCode::OK, Json(users))
}

async fn metadata_token(State(state): State<Arc<MockFirebaseState>>, headers: HeaderMap) -> impl IntoResponse {
    if headers.get("metadata-flavor").and_then(|v| v.to_str().ok()) != Some("Google") {
        return (StatusCode::FORBIDDEN, Json(json!({"error": "missing Metadata-Flavor header"})));
    }
    let n = state.metadata_fetches.fetch_add(1, Ordering::SeqCst) + 1;
    (StatusCode::OK, Json(json!({"access_token": format!("meta-token-{n}"), "expires_in": 3599, "token_type": "Bearer"})))
}

async fn fcm_send(State(state): State<Arc<MockFirebaseState>>, headers: HeaderMap, uri: Uri, Json(body): Json<Value>) -> impl IntoResponse {
    let token = body["message"]["token"].as_str().unwrap_or_default().to_string();
    let index = {
        let mut requests = state.fcm_requests.lock().unwrap();
        requests.push(RecordedRequest {
            method: "POST".to_string(),
            path_and_query: uri.path().to_string(),
            authorization: authorization(&headers),
            body: body.clone(),
        });
        requests.len()
    };

    let in_flight = state.fcm_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
    state.fcm_peak_in_flight.fetch_max(in_flight, Ordering::SeqCst);
    let delay = *state.fcm_delay.lock().unwrap();
    tokio::time::sleep(delay).await;
    state.fcm_in_flight.fetch_sub(1, Ordering::SeqCst);

    if state.unregistered_tokens.lock().unwrap().contains(&token) {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({"error": {
                "code": 404,
                "message": "Requested entity was not found.",
                "status": "NOT_FOUND",
                "details": [{"@type": "type.googleapis.com/google.firebase.fcm.v1.FcmError", "errorCode": "UNREGISTERED"}],
            }})),
        );
    }

    (StatusCode::OK, Json(json!({"name": format!("projects/demo-project/messages/{index}")})))
}

pub struct TestApp {
    pub api_url: String,
    pub mgmt_url: String,
    pub client: reqwest::Client,
    pub config: Config,
}

impl TestApp {
    /// Spawns the app with injected collaborators.
    pub async fn spawn_with_fakes(users: Arc<FakeUsers>, push: Arc<RecordingPush>) -> Self {
        Self::spawn_with_fakes_and_config(get_test_config(), users, push).await
    }

    pub async fn spawn_with_fakes_and_config(config: Config, users: Arc<FakeUsers>, push: Arc<RecordingPush>) -> Self {
        let builder = AppBuilder::new(config.clone()).with_user_repository(users).with_push_provider(push);
        Self::spawn_builder(builder, config).await
    }

    /// Spawns the app with the real Firebase adapters, configured from `config`.
    pub async fn spawn_with_config(config: Config) -> Self {
        Self::spawn_builder(AppBuilder::new(config.clone()), config).await
    }

    async fn spawn_builder(builder: AppBuilder, config: Config) -> Self {
        setup_tracing();
        let app = builder.build().unwrap();

        let app_router = api::app_router(app.state, Duration::from_secs(config.server.invocation_timeout_secs));
        let mgmt_router = api::mgmt_router(app.mgmt);

        let api_listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let mgmt_listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let api_url = format!("http://{}", api_listener.local_addr().unwrap());
        let mgmt_url = format!("http://{}", mgmt_listener.local_addr().unwrap());

        tokio::spawn(async move {
            axum::serve(api_listener, app_router).await.unwrap();
        });
        tokio::spawn(async move {
            axum::serve(mgmt_listener, mgmt_router).await.unwrap();
        });

        Self { api_url, mgmt_url, client: reqwest::Client::new(), config }
    }

    pub async fn post_change(&self, uid: &str, before: Value, after: Value) -> reqwest::Response {
        self.client
            .post(format!("{}/v1/triggers/availability", self.api_url))
            .json(&json!({"ref": format!("/users/{uid}/available"), "before": before, "after": after}))
            .send()
            .await
            .unwrap()
    }
}
