pub mod auth;
pub mod poller;
pub mod session;
pub mod state;
pub mod tracker;
pub mod user_store;

// Re-export the controllers so the binary and tests can reach them directly.
pub use auth::{AuthController, AuthError};
pub use session::{FetchMode, SessionController, SessionSettings};
pub use state::AppState;
pub use user_store::UserStore;
