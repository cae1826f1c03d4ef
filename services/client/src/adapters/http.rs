//! services/client/src/adapters/http.rs
//!
//! This module contains the adapter for the remote pass-share HTTP API.
//! It implements the `SessionApi` and `AccountApi` ports from the `core` crate
//! on top of `reqwest`.

use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use pass_share_core::domain::{
    ByteProgress, LoginCredentials, Registration, SharedFile, UploadRequest, User,
};
use pass_share_core::error_message::extract_message;
use pass_share_core::ports::{
    AccountApi, PortError, PortResult, ProgressCallback, SessionApi, GENERIC_NETWORK_MESSAGE,
};
use reqwest::{
    header::CONTENT_TYPE,
    multipart::{Form, Part},
    Body, Client as HttpClient, RequestBuilder, Response, Url,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::error::ClientError;

const USER_AGENT: &str = concat!("pass-share/", env!("CARGO_PKG_VERSION"));

/// Upload bodies are handed to the HTTP stack in pieces of this size, which
/// is also the granularity of upload progress.
const UPLOAD_CHUNK_SIZE: usize = 64 * 1024;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements the session and account ports against the REST API.
#[derive(Debug, Clone)]
pub struct HttpApiAdapter {
    /// Base endpoint of the server.
    base: Url,
    client: HttpClient,
    /// Applied to the small JSON calls; transfers run without a deadline.
    request_timeout: Duration,
}

impl HttpApiAdapter {
    /// Creates a new `HttpApiAdapter`.
    pub fn new(base_url: &str, request_timeout: Duration) -> Result<Self, ClientError> {
        let base = Url::parse(base_url.trim()).map_err(|e| {
            ClientError::Internal(format!("Invalid API base URL '{}': {}", base_url, e))
        })?;
        if base.cannot_be_a_base() {
            return Err(ClientError::Internal(format!(
                "Invalid API base URL '{}'",
                base_url
            )));
        }
        let client = HttpClient::builder().user_agent(USER_AGENT).build()?;

        Ok(Self {
            base,
            client,
            request_timeout,
        })
    }

    /// Builds `<base>/<segments...>`, percent-encoding each segment.
    fn endpoint(&self, segments: &[&str]) -> PortResult<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| PortError::Unexpected("API base URL cannot carry a path".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Sends a JSON call with the request timeout and fails on non-success.
    async fn send_json<T: Serialize + ?Sized>(
        &self,
        request: RequestBuilder,
        payload: &T,
    ) -> PortResult<Response> {
        let res = request
            .timeout(self.request_timeout)
            .json(payload)
            .send()
            .await
            .map_err(transport_error)?;
        expect_success(res).await
    }

    /// Resolves the `{url}` of a download link, which may be relative to the API.
    fn resolve_link(&self, link: &str) -> PortResult<Url> {
        self.base
            .join(link)
            .map_err(|e| PortError::Unexpected(format!("Invalid download link '{}': {}", link, e)))
    }

    /// Writes `body` to `destination`, reporting progress against `expected`.
    /// A partially written file is removed on failure.
    async fn save<S>(
        &self,
        body: S,
        expected: Option<u64>,
        destination: &Path,
        on_progress: &ProgressCallback,
    ) -> PortResult<u64>
    where
        S: Stream<Item = PortResult<Bytes>>,
    {
        match write_to_file(body, expected, destination, on_progress).await {
            Ok(written) => Ok(written),
            Err(e) => {
                let _ = tokio::fs::remove_file(destination).await;
                Err(e)
            }
        }
    }

    /// Streams a binary response body to `destination`.
    async fn save_response(
        &self,
        res: Response,
        destination: &Path,
        on_progress: &ProgressCallback,
    ) -> PortResult<u64> {
        let expected = res.content_length();
        let body = res
            .bytes_stream()
            .map(|chunk| chunk.map_err(transport_error));
        self.save(body, expected, destination, on_progress).await
    }
}

async fn write_to_file<S>(
    body: S,
    expected: Option<u64>,
    destination: &Path,
    on_progress: &ProgressCallback,
) -> PortResult<u64>
where
    S: Stream<Item = PortResult<Bytes>>,
{
    if let Some(parent) = destination.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(storage_error)?;
    }
    let mut file = tokio::fs::File::create(destination)
        .await
        .map_err(storage_error)?;

    on_progress(ByteProgress {
        transferred: 0,
        total: expected,
    });

    let mut written: u64 = 0;
    let mut body = std::pin::pin!(body);
    while let Some(chunk) = body.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await.map_err(storage_error)?;
        written += chunk.len() as u64;
        on_progress(ByteProgress {
            transferred: written,
            total: expected,
        });
    }
    file.flush().await.map_err(storage_error)?;

    Ok(written)
}

//=========================================================================================
// Wire Records
//=========================================================================================

#[derive(Serialize)]
struct SessionRequest<'a> {
    passkey: &'a str,
    username: &'a str,
}

/// Exactly one of `username` / `email` is set; the other goes out as `null`.
#[derive(Serialize)]
struct LoginRequest<'a> {
    username: Option<&'a str>,
    email: Option<&'a str>,
    password: &'a str,
}

#[derive(Serialize)]
struct RegisterRequest<'a> {
    username: &'a str,
    email: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserRecord {
    #[serde(default)]
    id: Value,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    is_admin: bool,
}
impl UserRecord {
    fn to_domain(self) -> PortResult<User> {
        match (opaque_id(self.id), self.username) {
            (Some(id), Some(username)) if !username.is_empty() => Ok(User {
                id,
                username,
                is_admin: self.is_admin,
            }),
            _ => Err(PortError::Unexpected("Invalid user data".to_string())),
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SharedFileRecord {
    #[serde(alias = "_id")]
    id: Value,
    file_name: String,
    #[serde(default)]
    size: u64,
    #[serde(default)]
    uploader_username: String,
}
impl SharedFileRecord {
    fn to_domain(self) -> PortResult<SharedFile> {
        let id = opaque_id(self.id)
            .ok_or_else(|| PortError::Unexpected("File entry without an id".to_string()))?;
        Ok(SharedFile {
            id,
            file_name: self.file_name,
            size: self.size,
            uploader_username: self.uploader_username,
        })
    }
}

/// A download answer that points elsewhere. Nothing but `url` is allowed, so
/// a shared JSON file is never mistaken for one.
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct DownloadLink {
    url: String,
}

/// Ids are opaque to the client; servers send them as strings or numbers.
fn opaque_id(value: Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

//=========================================================================================
// Error Mapping
//=========================================================================================

fn transport_error(err: reqwest::Error) -> PortError {
    PortError::Network(err.to_string())
}

fn storage_error(err: std::io::Error) -> PortError {
    PortError::Storage(format!("Could not write the file: {}", err))
}

async fn expect_success(res: Response) -> PortResult<Response> {
    let status = res.status();
    if status.is_success() {
        return Ok(res);
    }
    let body = res.text().await.unwrap_or_default();
    Err(PortError::Rejected {
        status: status.as_u16(),
        message: extract_message(&body, GENERIC_NETWORK_MESSAGE),
    })
}

fn is_json(res: &Response) -> bool {
    res.headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.starts_with("application/json"))
        .unwrap_or(false)
}

//=========================================================================================
// `SessionApi` Trait Implementation
//=========================================================================================

#[async_trait]
impl SessionApi for HttpApiAdapter {
    async fn create_session(&self, passkey: &str, username: &str) -> PortResult<()> {
        let url = self.endpoint(&["api", "sessions", "create"])?;
        self.send_json(
            self.client.post(url),
            &SessionRequest { passkey, username },
        )
        .await?;
        Ok(())
    }

    async fn join_session(&self, passkey: &str, username: &str) -> PortResult<()> {
        let url = self.endpoint(&["api", "sessions", "join"])?;
        self.send_json(
            self.client.post(url),
            &SessionRequest { passkey, username },
        )
        .await?;
        Ok(())
    }

    async fn list_files(&self, passkey: &str) -> PortResult<Vec<SharedFile>> {
        let url = self.endpoint(&["api", "sessions", "files", passkey])?;
        let res = self
            .client
            .get(url)
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(transport_error)?;
        let records: Vec<SharedFileRecord> = expect_success(res)
            .await?
            .json()
            .await
            .map_err(|e| PortError::Unexpected(format!("Malformed file list: {}", e)))?;

        records.into_iter().map(SharedFileRecord::to_domain).collect()
    }

    async fn upload_file(
        &self,
        passkey: &str,
        user_id: &str,
        upload: &UploadRequest,
        on_progress: ProgressCallback,
    ) -> PortResult<()> {
        let url = self.endpoint(&["api", "sessions", "upload", passkey, user_id])?;
        let data = Bytes::from(tokio::fs::read(&upload.path).await.map_err(|e| {
            PortError::Storage(format!("Could not read {}: {}", upload.path.display(), e))
        })?);
        let total = data.len() as u64;

        let body = async_stream::stream! {
            let mut offset = 0;
            while offset < data.len() {
                let end = (offset + UPLOAD_CHUNK_SIZE).min(data.len());
                let piece = data.slice(offset..end);
                offset = end;
                on_progress(ByteProgress { transferred: offset as u64, total: Some(total) });
                yield Ok::<Bytes, std::io::Error>(piece);
            }
        };

        let part = Part::stream_with_length(Body::wrap_stream(body), total)
            .file_name(upload.file_name.clone())
            .mime_str(&upload.mime_type)
            .map_err(|e| {
                PortError::Validation(format!("Invalid MIME type '{}': {}", upload.mime_type, e))
            })?;
        let form = Form::new().part("file", part);

        debug!(file = %upload.file_name, bytes = total, "Uploading file");
        let res = self
            .client
            .post(url)
            .multipart(form)
            .send()
            .await
            .map_err(transport_error)?;
        expect_success(res).await?;
        info!(file = %upload.file_name, "Upload finished");
        Ok(())
    }

    async fn download_file(
        &self,
        file_id: &str,
        destination: &Path,
        on_progress: ProgressCallback,
    ) -> PortResult<u64> {
        let url = self.endpoint(&["api", "sessions", "download", file_id])?;
        let res = self.client.get(url).send().await.map_err(transport_error)?;
        let res = expect_success(res).await?;
        if !is_json(&res) {
            return self.save_response(res, destination, &on_progress).await;
        }

        // Some deployments answer with a `{url}` link to the binary. Any other
        // JSON body is the shared file itself.
        let body = res.bytes().await.map_err(transport_error)?;
        match serde_json::from_slice::<DownloadLink>(&body) {
            Ok(link) => {
                let target = self.resolve_link(&link.url)?;
                debug!(%target, "Following download link");
                let linked = self.client.get(target).send().await.map_err(transport_error)?;
                let linked = expect_success(linked).await?;
                self.save_response(linked, destination, &on_progress).await
            }
            Err(_) => {
                let expected = Some(body.len() as u64);
                let chunks = futures::stream::iter([Ok(body)]);
                self.save(chunks, expected, destination, &on_progress).await
            }
        }
    }
}

//=========================================================================================
// `AccountApi` Trait Implementation
//=========================================================================================

#[async_trait]
impl AccountApi for HttpApiAdapter {
    async fn login(&self, credentials: &LoginCredentials) -> PortResult<User> {
        let url = self.endpoint(&["api", "users", "login"])?;
        let payload = LoginRequest {
            username: credentials.username(),
            email: credentials.email(),
            password: &credentials.password,
        };
        let record: UserRecord = self
            .send_json(self.client.post(url), &payload)
            .await?
            .json()
            .await
            .map_err(|_| PortError::Unexpected("Invalid user data".to_string()))?;

        record.to_domain()
    }

    async fn register(&self, registration: &Registration) -> PortResult<()> {
        let url = self.endpoint(&["api", "users", "add"])?;
        let payload = RegisterRequest {
            username: &registration.username,
            email: &registration.email,
            password: &registration.password,
        };
        self.send_json(self.client.post(url), &payload).await?;
        Ok(())
    }
}
