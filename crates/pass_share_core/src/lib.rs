pub mod domain;
pub mod error_message;
pub mod mime;
pub mod passkey;
pub mod ports;
pub mod progress;
pub mod state;
pub mod validation;

pub use domain::{
    ByteProgress, LocalFile, LoginCredentials, Registration, RememberedCredentials, SessionPhase,
    SharedFile, UploadRequest, User, MAX_UPLOAD_BYTES,
};
pub use ports::{
    AccountApi, KeyValueStore, Notice, NoticeKind, Notifier, PortError, PortResult,
    ProgressCallback, SessionApi, ShareTarget, GENERIC_NETWORK_MESSAGE,
};
