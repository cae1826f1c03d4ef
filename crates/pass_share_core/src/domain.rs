//! crates/pass_share_core/src/domain.rs
//!
//! Defines the pure, core data structures for the pass-share client.
//! These structs are independent of any wire or storage format.

use std::path::PathBuf;

/// Uploads larger than this are rejected before any network call.
pub const MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

// Represents the logged-in user - cached locally after login
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: String,
    pub username: String,
    pub is_admin: bool,
}

// Only stored when the user asked to stay signed in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RememberedCredentials {
    pub identifier: String,
    pub password: String,
}

/// What the user typed into the login form.
///
/// The identifier is either a username or an email address; anything with an
/// `@` in it is treated as an email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginCredentials {
    pub identifier: String,
    pub password: String,
}

impl LoginCredentials {
    pub fn is_email(&self) -> bool {
        self.identifier.contains('@')
    }

    pub fn email(&self) -> Option<&str> {
        self.is_email().then_some(self.identifier.as_str())
    }

    pub fn username(&self) -> Option<&str> {
        (!self.is_email()).then_some(self.identifier.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// A file shared inside a session. Immutable from the client's perspective.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharedFile {
    pub id: String,
    pub file_name: String,
    pub size: u64,
    pub uploader_username: String,
}

/// A local file handed over by a picker, ready to be uploaded.
///
/// Every field except the path is optional: pickers do not always report a
/// name, a MIME type or a size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFile {
    pub path: PathBuf,
    pub file_name: Option<String>,
    pub mime_type: Option<String>,
    pub size: Option<u64>,
}

impl LocalFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file_name: None,
            mime_type: None,
            size: None,
        }
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    pub fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    /// The name the file is uploaded under: the picker name, else the last
    /// component of the path.
    pub fn display_name(&self) -> String {
        self.file_name
            .clone()
            .filter(|name| !name.is_empty())
            .or_else(|| {
                self.path
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
            })
            .unwrap_or_else(|| "upload".to_string())
    }
}

/// A fully resolved upload, as handed to the session API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    pub path: PathBuf,
    pub file_name: String,
    pub mime_type: String,
    pub size: u64,
}

/// Byte-count progress reported by a transfer.
///
/// `total` is `None` when the remote side did not announce a length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteProgress {
    pub transferred: u64,
    pub total: Option<u64>,
}

/// Where the client believes it stands with respect to a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionPhase {
    NoSession,
    Creating,
    Joining,
    InSession { passkey: String },
}

impl SessionPhase {
    pub fn passkey(&self) -> Option<&str> {
        match self {
            SessionPhase::InSession { passkey } => Some(passkey.as_str()),
            _ => None,
        }
    }

    pub fn is_in_session(&self) -> bool {
        matches!(self, SessionPhase::InSession { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_name_falls_back_to_path() {
        let file = LocalFile::new("/tmp/photos/cat.jpg");
        assert_eq!(file.display_name(), "cat.jpg");

        let named = LocalFile::new("/tmp/content/1234").with_file_name("report.pdf");
        assert_eq!(named.display_name(), "report.pdf");
    }

    #[test]
    fn identifier_with_at_sign_is_an_email() {
        let by_email = LoginCredentials {
            identifier: "ana@example.com".to_string(),
            password: "secret1".to_string(),
        };
        assert_eq!(by_email.email(), Some("ana@example.com"));
        assert_eq!(by_email.username(), None);

        let by_name = LoginCredentials {
            identifier: "ana".to_string(),
            password: "secret1".to_string(),
        };
        assert_eq!(by_name.email(), None);
        assert_eq!(by_name.username(), Some("ana"));
    }

    #[test]
    fn only_in_session_carries_a_passkey() {
        assert_eq!(SessionPhase::Joining.passkey(), None);
        let phase = SessionPhase::InSession {
            passkey: "ABCD1234".to_string(),
        };
        assert_eq!(phase.passkey(), Some("ABCD1234"));
        assert!(phase.is_in_session());
    }
}
