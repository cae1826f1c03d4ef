pub mod http;
pub mod kv_store;
pub mod notifier;
pub mod share;

pub use http::HttpApiAdapter;
pub use kv_store::JsonFileStore;
pub use notifier::TracingNotifier;
pub use share::LoggingShareTarget;
