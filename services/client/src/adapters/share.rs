//! services/client/src/adapters/share.rs
//!
//! The terminal stand-in for the platform share sheet: the downloaded file
//! already sits in the download directory, so "sharing" it means telling the
//! user where it is.

use async_trait::async_trait;
use pass_share_core::ports::{PortError, PortResult, ShareTarget};
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingShareTarget;

#[async_trait]
impl ShareTarget for LoggingShareTarget {
    async fn share_file(&self, path: &Path) -> PortResult<()> {
        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| PortError::Storage(format!("{}: {}", path.display(), e)))?;
        info!(path = %path.display(), bytes = metadata.len(), "File ready");
        Ok(())
    }
}
