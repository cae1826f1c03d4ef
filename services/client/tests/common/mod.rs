//! An in-process fake of the pass-share backend, plus recording adapters.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::Body,
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use bytes::Bytes;
use pass_share_client::adapters::{HttpApiAdapter, JsonFileStore};
use pass_share_client::app::AppState;
use pass_share_client::config::Config;
use pass_share_core::domain::User;
use pass_share_core::ports::{Notice, NoticeKind, Notifier, PortResult, ShareTarget};
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

//=========================================================================================
// Fake Backend
//=========================================================================================

#[derive(Debug, Clone)]
pub struct ReceivedUpload {
    pub passkey: String,
    pub user_id: String,
    pub file_name: String,
    pub content_type: String,
    pub bytes: usize,
}

#[derive(Default)]
pub struct BackendState {
    pub requests: Mutex<Vec<String>>,
    pub sessions: Mutex<HashSet<String>>,
    pub members: Mutex<Vec<(String, String)>>,
    pub files: Mutex<HashMap<String, Vec<Value>>>,
    pub blobs: Mutex<HashMap<String, Vec<u8>>>,
    pub uploads: Mutex<Vec<ReceivedUpload>>,
    pub accounts: Mutex<Vec<(String, String, String)>>,
    pub last_login: Mutex<Option<Value>>,
    pub refuse_create: AtomicBool,
    pub fail_listing: AtomicBool,
    pub upload_delay_ms: AtomicU64,
    pub join_delay_ms: AtomicU64,
    next_id: AtomicU64,
}

impl BackendState {
    fn record(&self, request: String) {
        self.requests.lock().unwrap().push(request);
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.starts_with(prefix))
            .count()
    }

    pub fn open_session(&self, passkey: &str) {
        self.sessions.lock().unwrap().insert(passkey.to_string());
    }

    pub fn add_file(&self, passkey: &str, file_name: &str, contents: &[u8], uploader: &str) -> String {
        let id = format!("f{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        self.files
            .lock()
            .unwrap()
            .entry(passkey.to_string())
            .or_default()
            .push(json!({
                "id": id,
                "fileName": file_name,
                "size": contents.len(),
                "uploaderUsername": uploader,
            }));
        self.blobs.lock().unwrap().insert(id.clone(), contents.to_vec());
        id
    }

    pub fn add_blob(&self, id: &str, contents: &[u8]) {
        self.blobs.lock().unwrap().insert(id.to_string(), contents.to_vec());
    }

    pub fn add_account(&self, username: &str, email: &str, password: &str) {
        self.accounts.lock().unwrap().push((
            username.to_string(),
            email.to_string(),
            password.to_string(),
        ));
    }
}

type Shared = Arc<BackendState>;

fn not_found(message: &str) -> Response {
    (StatusCode::NOT_FOUND, Json(json!({ "message": message }))).into_response()
}

async fn login(State(state): State<Shared>, Json(body): Json<Value>) -> Response {
    state.record("POST /api/users/login".to_string());
    *state.last_login.lock().unwrap() = Some(body.clone());

    let password = body["password"].as_str().unwrap_or_default();
    let accounts = state.accounts.lock().unwrap();
    let found = accounts.iter().enumerate().find(|(_, (username, email, pw))| {
        pw == password
            && (body["username"].as_str() == Some(username.as_str())
                || body["email"].as_str() == Some(email.as_str()))
    });
    match found {
        Some((idx, (username, _, _))) => Json(json!({
            "id": format!("u-{}", idx + 1),
            "username": username,
            "isAdmin": false,
        }))
        .into_response(),
        None => (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "message": "Invalid credentials" })),
        )
            .into_response(),
    }
}

async fn add_user(State(state): State<Shared>, Json(body): Json<Value>) -> Response {
    state.record("POST /api/users/add".to_string());
    let username = body["username"].as_str().unwrap_or_default().to_string();
    let email = body["email"].as_str().unwrap_or_default().to_string();
    let password = body["password"].as_str().unwrap_or_default().to_string();

    let mut accounts = state.accounts.lock().unwrap();
    if accounts.iter().any(|(u, _, _)| *u == username) {
        // Plain-text body on purpose: both error shapes occur in the wild.
        return (StatusCode::CONFLICT, "Username already exists").into_response();
    }
    if accounts.iter().any(|(_, e, _)| *e == email) {
        return (
            StatusCode::CONFLICT,
            Json(json!({ "message": "Email already exists" })),
        )
            .into_response();
    }
    accounts.push((username, email, password));
    StatusCode::CREATED.into_response()
}

async fn create_session(State(state): State<Shared>, Json(body): Json<Value>) -> Response {
    let passkey = body["passkey"].as_str().unwrap_or_default().to_string();
    let username = body["username"].as_str().unwrap_or_default().to_string();
    state.record(format!("POST /api/sessions/create {}", passkey));

    if state.refuse_create.load(Ordering::SeqCst) {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "message": "Could not create session" })),
        )
            .into_response();
    }
    state.open_session(&passkey);
    state.members.lock().unwrap().push((passkey, username));
    StatusCode::CREATED.into_response()
}

async fn join_session(State(state): State<Shared>, Json(body): Json<Value>) -> Response {
    let passkey = body["passkey"].as_str().unwrap_or_default().to_string();
    let username = body["username"].as_str().unwrap_or_default().to_string();
    state.record(format!("POST /api/sessions/join {}", passkey));

    let delay = state.join_delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }

    if !state.sessions.lock().unwrap().contains(&passkey) {
        return not_found("Session not found");
    }
    state.members.lock().unwrap().push((passkey, username));
    StatusCode::OK.into_response()
}

async fn list_files(State(state): State<Shared>, Path(passkey): Path<String>) -> Response {
    state.record(format!("GET /api/sessions/files/{}", passkey));
    if state.fail_listing.load(Ordering::SeqCst) {
        return (StatusCode::SERVICE_UNAVAILABLE, "Temporarily unavailable").into_response();
    }
    if !state.sessions.lock().unwrap().contains(&passkey) {
        return not_found("Session not found");
    }
    let files = state
        .files
        .lock()
        .unwrap()
        .get(&passkey)
        .cloned()
        .unwrap_or_default();
    Json(files).into_response()
}

async fn upload(
    State(state): State<Shared>,
    Path((passkey, user_id)): Path<(String, String)>,
    mut multipart: Multipart,
) -> Response {
    state.record(format!("POST /api/sessions/upload/{}/{}", passkey, user_id));

    let delay = state.upload_delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }

    while let Ok(Some(field)) = multipart.next_field().await {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().unwrap_or_default().to_string();
        let Ok(data) = field.bytes().await else {
            return (StatusCode::BAD_REQUEST, "Broken upload").into_response();
        };
        state.uploads.lock().unwrap().push(ReceivedUpload {
            passkey: passkey.clone(),
            user_id: user_id.clone(),
            file_name: file_name.clone(),
            content_type,
            bytes: data.len(),
        });
        state.add_file(&passkey, &file_name, &data, &user_id);
        return StatusCode::OK.into_response();
    }
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "message": "No file provided" })),
    )
        .into_response()
}

async fn download(State(state): State<Shared>, Path(file_id): Path<String>) -> Response {
    state.record(format!("GET /api/sessions/download/{}", file_id));

    // `link-<id>` answers with a JSON pointer to the blob.
    if let Some(id) = file_id.strip_prefix("link-") {
        return Json(json!({ "url": format!("/blobs/{}", id) })).into_response();
    }
    // `json-<id>` serves a blob that is itself a JSON document.
    if let Some(id) = file_id.strip_prefix("json-") {
        let Some(blob) = state.blobs.lock().unwrap().get(id).cloned() else {
            return not_found("File not found");
        };
        return ([(header::CONTENT_TYPE, "application/json")], blob).into_response();
    }
    // `broken` fails without saying why.
    if file_id == "broken" {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    // `chunked-<id>` streams the blob without announcing its length.
    if let Some(id) = file_id.strip_prefix("chunked-") {
        let Some(blob) = state.blobs.lock().unwrap().get(id).cloned() else {
            return not_found("File not found");
        };
        let pieces: Vec<Result<Bytes, std::io::Error>> = blob
            .chunks(1024)
            .map(|c| Ok(Bytes::copy_from_slice(c)))
            .collect();
        return Response::builder()
            .header(header::CONTENT_TYPE, "application/octet-stream")
            .body(Body::from_stream(futures::stream::iter(pieces)))
            .unwrap();
    }
    blob_response(&state, &file_id)
}

async fn blob(State(state): State<Shared>, Path(id): Path<String>) -> Response {
    state.record(format!("GET /blobs/{}", id));
    blob_response(&state, &id)
}

fn blob_response(state: &BackendState, id: &str) -> Response {
    match state.blobs.lock().unwrap().get(id).cloned() {
        Some(blob) => (
            [(header::CONTENT_TYPE, "application/octet-stream")],
            blob,
        )
            .into_response(),
        None => not_found("File not found"),
    }
}

pub struct FakeBackend {
    pub base_url: String,
    pub state: Shared,
}

impl FakeBackend {
    pub async fn start() -> Self {
        let state: Shared = Arc::new(BackendState::default());
        let app = Router::new()
            .route("/api/users/login", post(login))
            .route("/api/users/add", post(add_user))
            .route("/api/sessions/create", post(create_session))
            .route("/api/sessions/join", post(join_session))
            .route("/api/sessions/files/{passkey}", get(list_files))
            .route("/api/sessions/upload/{passkey}/{user_id}", post(upload))
            .route("/api/sessions/download/{file_id}", get(download))
            .route("/blobs/{id}", get(blob))
            .layer(axum::extract::DefaultBodyLimit::max(32 * 1024 * 1024))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{}", addr),
            state,
        }
    }
}

//=========================================================================================
// Recording Adapters
//=========================================================================================

#[derive(Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().unwrap().clone()
    }

    pub fn errors(&self) -> Vec<String> {
        self.notices()
            .into_iter()
            .filter(|n| n.kind == NoticeKind::Error)
            .map(|n| n.message)
            .collect()
    }

    pub fn last(&self) -> Option<Notice> {
        self.notices.lock().unwrap().last().cloned()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        self.notices.lock().unwrap().push(notice);
    }
}

#[derive(Default)]
pub struct RecordingShareTarget {
    pub shared: Mutex<Vec<PathBuf>>,
}

#[async_trait]
impl ShareTarget for RecordingShareTarget {
    async fn share_file(&self, path: &std::path::Path) -> PortResult<()> {
        self.shared.lock().unwrap().push(path.to_path_buf());
        Ok(())
    }
}

//=========================================================================================
// Harness
//=========================================================================================

pub struct Harness {
    pub app: AppState,
    pub notifier: Arc<RecordingNotifier>,
    pub share_target: Arc<RecordingShareTarget>,
    pub dir: TempDir,
}

pub fn test_config(base_url: &str, dir: &TempDir) -> Config {
    let mut config = Config::with_base_url(base_url);
    config.data_dir = dir.path().join("data");
    config.download_dir = dir.path().join("downloads");
    config.poll_interval = Duration::from_millis(50);
    config.progress_linger = Duration::from_millis(200);
    config.request_timeout = Duration::from_secs(5);
    config
}

pub fn harness(base_url: &str) -> Harness {
    let dir = TempDir::new().unwrap();
    let config = test_config(base_url, &dir);
    let api = Arc::new(HttpApiAdapter::new(&config.api_base_url, config.request_timeout).unwrap());
    let notifier = Arc::new(RecordingNotifier::default());
    let share_target = Arc::new(RecordingShareTarget::default());

    let app = AppState {
        store: Arc::new(JsonFileStore::new(config.store_path())),
        config: Arc::new(config),
        session_api: api.clone(),
        account_api: api,
        notifier: notifier.clone(),
        share_target: share_target.clone(),
    };

    Harness {
        app,
        notifier,
        share_target,
        dir,
    }
}

pub fn ana() -> User {
    User {
        id: "u-1".to_string(),
        username: "ana".to_string(),
        is_admin: false,
    }
}

/// Polls `check` until it holds or two seconds pass.
pub async fn eventually(mut check: impl FnMut() -> bool) -> bool {
    for _ in 0..200 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}
