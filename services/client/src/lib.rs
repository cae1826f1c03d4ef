//! services/client/src/lib.rs
//!
//! The pass-share client: adapters for the remote API and local storage, and
//! the controllers that drive login, sessions and transfers.

pub mod adapters;
pub mod app;
pub mod config;
pub mod error;
