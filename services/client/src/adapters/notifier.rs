//! services/client/src/adapters/notifier.rs
//!
//! Surfaces user notices through `tracing`. A terminal front end sees them on
//! its log output; a GUI would implement `Notifier` with a toast instead.

use pass_share_core::ports::{Notice, NoticeKind, Notifier};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notice: Notice) {
        match notice.kind {
            NoticeKind::Success => info!(target: "pass_share::notice", "{}", notice.message),
            NoticeKind::Error => warn!(target: "pass_share::notice", "{}", notice.message),
        }
    }
}
