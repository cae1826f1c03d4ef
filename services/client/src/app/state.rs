//! services/client/src/app/state.rs
//!
//! Defines the shared application state handed to the controllers.

use crate::adapters::{HttpApiAdapter, JsonFileStore, LoggingShareTarget, TracingNotifier};
use crate::config::Config;
use crate::error::ClientError;
use pass_share_core::ports::{AccountApi, KeyValueStore, Notifier, SessionApi, ShareTarget};
use std::sync::Arc;

//=========================================================================================
// AppState (Shared By All Controllers)
//=========================================================================================

/// The shared application state, created once at startup.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub session_api: Arc<dyn SessionApi>,
    pub account_api: Arc<dyn AccountApi>,
    pub store: Arc<dyn KeyValueStore>,
    pub notifier: Arc<dyn Notifier>,
    pub share_target: Arc<dyn ShareTarget>,
}

impl AppState {
    /// Wires the production adapters for `config`.
    pub fn from_config(config: Config) -> Result<Self, ClientError> {
        let api = Arc::new(HttpApiAdapter::new(
            &config.api_base_url,
            config.request_timeout,
        )?);
        let store = Arc::new(JsonFileStore::new(config.store_path()));

        Ok(Self {
            config: Arc::new(config),
            session_api: api.clone(),
            account_api: api,
            store,
            notifier: Arc::new(TracingNotifier),
            share_target: Arc::new(LoggingShareTarget),
        })
    }
}
