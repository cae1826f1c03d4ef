//! crates/pass_share_core/src/ports.rs
//!
//! Defines the service contracts (traits) the pass-share client depends on.
//! These traits form the boundary of the hexagonal architecture: the remote
//! HTTP API, the device key-value store, the notification surface and the
//! platform share sheet all sit behind them.

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

use crate::domain::{ByteProgress, LoginCredentials, Registration, SharedFile, UploadRequest, User};

/// Shown when a transport failure carries no message of its own.
pub const GENERIC_NETWORK_MESSAGE: &str = "Network error. Please check your connection and try again.";

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (HTTP, filesystem).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PortError {
    /// Input rejected locally, before any network call.
    #[error("{0}")]
    Validation(String),
    /// The server answered with a non-success status.
    #[error("Request rejected with status {status}: {message}")]
    Rejected { status: u16, message: String },
    /// Timeout, unreachable host, broken stream.
    #[error("Network error: {0}")]
    Network(String),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

impl PortError {
    /// The text a user gets to see for this error.
    pub fn user_message(&self) -> String {
        match self {
            PortError::Validation(message) => message.clone(),
            PortError::Rejected { message, .. } => message.clone(),
            PortError::Network(_) => GENERIC_NETWORK_MESSAGE.to_string(),
            PortError::Storage(message) | PortError::Unexpected(message) => message.clone(),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            PortError::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

/// Receives byte-count progress while a transfer runs.
pub type ProgressCallback = Arc<dyn Fn(ByteProgress) + Send + Sync>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait SessionApi: Send + Sync {
    async fn create_session(&self, passkey: &str, username: &str) -> PortResult<()>;

    async fn join_session(&self, passkey: &str, username: &str) -> PortResult<()>;

    async fn list_files(&self, passkey: &str) -> PortResult<Vec<SharedFile>>;

    async fn upload_file(
        &self,
        passkey: &str,
        user_id: &str,
        upload: &UploadRequest,
        on_progress: ProgressCallback,
    ) -> PortResult<()>;

    /// Streams a shared file to `destination` and returns the bytes written.
    async fn download_file(
        &self,
        file_id: &str,
        destination: &Path,
        on_progress: ProgressCallback,
    ) -> PortResult<u64>;
}

#[async_trait]
pub trait AccountApi: Send + Sync {
    async fn login(&self, credentials: &LoginCredentials) -> PortResult<User>;

    async fn register(&self, registration: &Registration) -> PortResult<()>;
}

/// Device-local persistent key-value storage.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> PortResult<Option<String>>;

    async fn set(&self, key: &str, value: &str) -> PortResult<()>;

    async fn remove(&self, key: &str) -> PortResult<()>;
}

/// The platform's native share / export mechanism.
#[async_trait]
pub trait ShareTarget: Send + Sync {
    async fn share_file(&self, path: &Path) -> PortResult<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Error,
}

/// A non-blocking message for the user (a toast, in a mobile UI).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Error,
            message: message.into(),
        }
    }
}

pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}
