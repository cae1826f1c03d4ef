//! services/client/src/app/session.rs
//!
//! The session controller: the single owner of the file-sharing screen's
//! state. It creates and joins sessions, keeps the file list fresh, and runs
//! uploads and downloads with progress tracking.

use crate::app::poller::{spawn_poller, PollerHandle};
use crate::app::state::AppState;
use crate::app::tracker::{ProgressSnapshot, TransferTracker};
use crate::config::Config;
use pass_share_core::domain::{
    ByteProgress, LocalFile, SessionPhase, SharedFile, UploadRequest, User, MAX_UPLOAD_BYTES,
};
use pass_share_core::mime::resolve_mime_type;
use pass_share_core::passkey::{generate_passkey, normalize_passkey};
use pass_share_core::ports::{
    Notice, Notifier, PortError, PortResult, ProgressCallback, SessionApi, ShareTarget,
};
use pass_share_core::progress::{download_percent, upload_percent};
use pass_share_core::state::{FileListUpdate, ShareState};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex, PoisonError, RwLock};
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};
use uuid::Uuid;

pub const FILE_TOO_LARGE_MESSAGE: &str = "File size must be less than 10MB.";

//=========================================================================================
// Settings
//=========================================================================================

#[derive(Clone, Debug)]
pub struct SessionSettings {
    pub poll_interval: Duration,
    pub progress_linger: Duration,
    pub download_dir: PathBuf,
}

impl From<&Config> for SessionSettings {
    fn from(config: &Config) -> Self {
        Self {
            poll_interval: config.poll_interval,
            progress_linger: config.progress_linger,
            download_dir: config.download_dir.clone(),
        }
    }
}

/// Whether a failed file-list fetch is shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
    Explicit,
    Silent,
}

//=========================================================================================
// SessionController
//=========================================================================================

/// A cheap, cloneable handle to the session screen's controller.
///
/// The background poller only holds a weak reference, so dropping the last
/// handle also stops polling.
#[derive(Clone)]
pub struct SessionController {
    inner: Arc<ControllerInner>,
}

struct ControllerInner {
    session_api: Arc<dyn SessionApi>,
    notifier: Arc<dyn Notifier>,
    share_target: Arc<dyn ShareTarget>,
    settings: SessionSettings,
    user: RwLock<Option<User>>,
    state: Mutex<ShareState>,
    files: watch::Sender<Arc<Vec<SharedFile>>>,
    uploads: TransferTracker,
    downloads: TransferTracker,
    upload_in_flight: AtomicBool,
    poller: StdMutex<Option<PollerHandle>>,
}

/// Holds the "upload in progress" flag for as long as it lives.
struct UploadGuard<'a>(&'a AtomicBool);

impl<'a> UploadGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for UploadGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl SessionController {
    /// Creates a controller for `user` (the identity loaded from the local store).
    pub fn new(app: &AppState, user: Option<User>) -> Self {
        let settings = SessionSettings::from(app.config.as_ref());
        let (files, _) = watch::channel(Arc::new(Vec::new()));

        Self {
            inner: Arc::new(ControllerInner {
                session_api: app.session_api.clone(),
                notifier: app.notifier.clone(),
                share_target: app.share_target.clone(),
                uploads: TransferTracker::new(settings.progress_linger),
                downloads: TransferTracker::new(settings.progress_linger),
                settings,
                user: RwLock::new(user),
                state: Mutex::new(ShareState::new()),
                files,
                upload_in_flight: AtomicBool::new(false),
                poller: StdMutex::new(None),
            }),
        }
    }

    // --- Accessors ---

    pub fn current_user(&self) -> Option<User> {
        self.inner
            .user
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_user(&self, user: Option<User>) {
        *self.inner.user.write().unwrap_or_else(PoisonError::into_inner) = user;
    }

    pub async fn phase(&self) -> SessionPhase {
        self.inner.state.lock().await.phase().clone()
    }

    pub async fn passkey(&self) -> Option<String> {
        self.inner.state.lock().await.passkey().map(str::to_string)
    }

    pub async fn files(&self) -> Arc<Vec<SharedFile>> {
        Arc::clone(self.inner.state.lock().await.files())
    }

    /// Yields the file list whenever it actually changes.
    pub fn subscribe_files(&self) -> watch::Receiver<Arc<Vec<SharedFile>>> {
        self.inner.files.subscribe()
    }

    pub fn upload_progress(&self) -> ProgressSnapshot {
        self.inner.uploads.snapshot()
    }

    pub fn download_progress(&self) -> ProgressSnapshot {
        self.inner.downloads.snapshot()
    }

    pub fn subscribe_upload_progress(&self) -> watch::Receiver<ProgressSnapshot> {
        self.inner.uploads.subscribe()
    }

    pub fn subscribe_download_progress(&self) -> watch::Receiver<ProgressSnapshot> {
        self.inner.downloads.subscribe()
    }

    pub fn is_polling(&self) -> bool {
        self.inner
            .poller
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(PollerHandle::is_running)
    }

    pub fn is_uploading(&self) -> bool {
        self.inner.upload_in_flight.load(Ordering::Acquire)
    }

    // --- Session lifecycle ---

    /// Generates a passkey and opens a session under it.
    pub async fn create_session(&self) -> PortResult<String> {
        let user = self.require_user("Please log in to create a session")?;
        let passkey = generate_passkey();
        let previous = self.inner.state.lock().await.begin(SessionPhase::Creating);
        info!(username = %user.username, "Creating session");

        if let Err(e) = self
            .inner
            .session_api
            .create_session(&passkey, &user.username)
            .await
        {
            self.inner.state.lock().await.restore(previous);
            return Err(self.fail("Failed to create session", e));
        }

        self.adopt(&passkey).await?;
        self.notify(Notice::success(format!(
            "Session created with passkey: {}",
            passkey
        )));
        self.after_entering().await;
        Ok(passkey)
    }

    /// Joins the session named by a user-supplied passkey.
    pub async fn join_session(&self, passkey: &str) -> PortResult<()> {
        let user = self.require_user("Please log in to join a session")?;
        let passkey = normalize_passkey(passkey).map_err(|e| self.reject(e))?;
        let previous = self.inner.state.lock().await.begin(SessionPhase::Joining);
        info!(username = %user.username, "Joining session");

        if let Err(e) = self
            .inner
            .session_api
            .join_session(&passkey, &user.username)
            .await
        {
            self.inner.state.lock().await.restore(previous);
            return Err(self.fail("Failed to join session", e));
        }

        self.adopt(&passkey).await?;
        self.notify(Notice::success("Joined session!"));
        self.after_entering().await;
        Ok(())
    }

    /// Forgets the session locally. The server is not told.
    pub async fn leave(&self) {
        if let Some(handle) = self.take_poller() {
            handle.shutdown().await;
            debug!("File polling stopped");
        }
        {
            let mut state = self.inner.state.lock().await;
            if state.leave() {
                self.inner.files.send_replace(Arc::clone(state.files()));
            }
        }
        self.inner.uploads.clear();
        self.inner.downloads.clear();
        info!("Left session");
    }

    /// The hosting screen came back into view.
    pub async fn on_focus(&self) {
        if self.passkey().await.is_some() {
            let _ = self.refresh_files(FetchMode::Silent).await;
        }
    }

    /// Enters the session a create/join just confirmed, unless it was left
    /// in the meantime.
    async fn adopt(&self, passkey: &str) -> PortResult<()> {
        let mut state = self.inner.state.lock().await;
        match state.complete(passkey) {
            Some(changed) => {
                if changed {
                    self.inner.files.send_replace(Arc::clone(state.files()));
                }
                Ok(())
            }
            None => {
                debug!("Session left before the server answered");
                Err(PortError::Unexpected(
                    "The session was left before it was ready".to_string(),
                ))
            }
        }
    }

    async fn after_entering(&self) {
        let _ = self.refresh_files(FetchMode::Explicit).await;
        self.start_polling();
    }

    // --- File list ---

    /// Fetches the active session's file list and adopts it if it changed.
    ///
    /// Outside a session this does nothing and reports `Stale`.
    pub async fn refresh_files(&self, mode: FetchMode) -> PortResult<FileListUpdate> {
        let Some(passkey) = self.passkey().await else {
            return Ok(FileListUpdate::Stale);
        };

        match self.inner.session_api.list_files(&passkey).await {
            Ok(files) => {
                let mut state = self.inner.state.lock().await;
                let update = state.replace_files(&passkey, files);
                if update == FileListUpdate::Replaced {
                    debug!(count = state.files().len(), "File list changed");
                    self.inner.files.send_replace(Arc::clone(state.files()));
                }
                Ok(update)
            }
            Err(e) if mode == FetchMode::Silent => {
                debug!(error = %e, "Background file refresh failed");
                Err(e)
            }
            Err(e) => Err(self.fail("Failed to fetch files", e)),
        }
    }

    fn start_polling(&self) {
        let mut slot = self
            .inner
            .poller
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if slot.as_ref().is_some_and(PollerHandle::is_running) {
            return;
        }

        let controller = Arc::downgrade(&self.inner);
        *slot = Some(spawn_poller(self.inner.settings.poll_interval, move || {
            let inner = controller.upgrade()?;
            Some(async move {
                let _ = SessionController { inner }
                    .refresh_files(FetchMode::Silent)
                    .await;
            })
        }));
        debug!(interval = ?self.inner.settings.poll_interval, "File polling started");
    }

    fn take_poller(&self) -> Option<PollerHandle> {
        self.inner
            .poller
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    // --- Transfers ---

    /// Uploads a picked file into the active session.
    pub async fn upload(&self, file: LocalFile) -> PortResult<()> {
        let user = self.require_user("Please log in to upload files")?;
        let Some(passkey) = self.passkey().await else {
            return Err(self.reject("Create or join a session first"));
        };
        let Some(guard) = UploadGuard::acquire(&self.inner.upload_in_flight) else {
            return Err(self.reject("An upload is already in progress"));
        };

        let outcome = self.run_upload(&passkey, &user, &file).await;
        drop(guard);
        if let Err(e) = outcome {
            return Err(self.fail("Failed to upload file", e));
        }
        self.notify(Notice::success("File uploaded successfully"));
        let _ = self.refresh_files(FetchMode::Silent).await;
        Ok(())
    }

    async fn run_upload(&self, passkey: &str, user: &User, file: &LocalFile) -> PortResult<()> {
        let size = match file.size {
            Some(size) => size,
            None => tokio::fs::metadata(&file.path)
                .await
                .map_err(|e| {
                    PortError::Storage(format!("Could not read {}: {}", file.path.display(), e))
                })?
                .len(),
        };
        if size > MAX_UPLOAD_BYTES {
            return Err(PortError::Validation(FILE_TOO_LARGE_MESSAGE.to_string()));
        }

        let file_name = file.display_name();
        let request = UploadRequest {
            path: file.path.clone(),
            mime_type: resolve_mime_type(file.mime_type.as_deref(), &file_name),
            file_name,
            size,
        };

        let temp_id = format!("upload-{}", Uuid::new_v4());
        let uploads = &self.inner.uploads;
        let ticket = uploads.start(&temp_id);
        let on_progress: ProgressCallback = {
            let tracker = uploads.clone();
            let key = temp_id.clone();
            Arc::new(move |progress: ByteProgress| {
                if let Some(percent) = progress
                    .total
                    .and_then(|total| upload_percent(progress.transferred, total))
                {
                    tracker.report(&key, ticket, percent);
                }
            })
        };

        info!(
            file = %request.file_name,
            mime = %request.mime_type,
            bytes = size,
            "Uploading file"
        );
        let result = self
            .inner
            .session_api
            .upload_file(passkey, &user.id, &request, on_progress)
            .await;
        uploads.finish_later(temp_id, ticket);
        result
    }

    /// Downloads a shared file into the download directory and hands it to
    /// the share target. Returns where the file was written.
    pub async fn download(&self, file_id: &str, file_name: &str) -> PortResult<PathBuf> {
        let destination = self
            .inner
            .settings
            .download_dir
            .join(local_file_name(file_name, file_id));
        let downloads = &self.inner.downloads;
        let ticket = downloads.start(file_id);
        let on_progress: ProgressCallback = {
            let tracker = downloads.clone();
            let key = file_id.to_string();
            Arc::new(move |progress: ByteProgress| {
                tracker.report(
                    &key,
                    ticket,
                    download_percent(progress.transferred, progress.total),
                );
            })
        };

        info!(file_id, file = %file_name, "Downloading file");
        let result = async {
            let written = self
                .inner
                .session_api
                .download_file(file_id, &destination, on_progress)
                .await?;
            downloads.report(file_id, ticket, 100);
            debug!(bytes = written, path = %destination.display(), "Download finished");
            self.inner.share_target.share_file(&destination).await
        }
        .await;
        downloads.finish_later(file_id.to_string(), ticket);

        match result {
            Ok(()) => {
                self.notify(Notice::success(format!("Downloaded {}", file_name)));
                Ok(destination)
            }
            Err(e) => Err(self.fail("Failed to download file", e)),
        }
    }

    // --- Error surfacing ---

    fn notify(&self, notice: Notice) {
        self.inner.notifier.notify(notice);
    }

    fn require_user(&self, message: &str) -> PortResult<User> {
        self.current_user().ok_or_else(|| self.reject(message))
    }

    /// Surfaces a local rejection and turns it into a validation error.
    fn reject(&self, message: impl std::fmt::Display) -> PortError {
        let message = message.to_string();
        self.notify(Notice::error(message.clone()));
        PortError::Validation(message)
    }

    fn fail(&self, action: &str, error: PortError) -> PortError {
        warn!(error = %error, "{}", action);
        self.notify(Notice::error(error.user_message()));
        error
    }
}

/// Reduces a display name to a bare file name, so a server-provided name
/// cannot point outside the download directory.
fn local_file_name(display_name: &str, file_id: &str) -> String {
    Path::new(display_name)
        .file_name()
        .and_then(|name| name.to_str())
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("download-{}", file_id))
}
