//! Clipkeep API crate - boundary service, paste injection, axum HTTP server.
//!
//! ClipboardService is the request/response and push contract over the
//! history. The HTTP layer exposes it on localhost behind a bearer token,
//! with history updates streamed over SSE.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod paste;
pub mod routes;
pub mod service;
pub mod state;

pub use error::ApiError;
pub use paste::{CommandInjector, ConfiguredInjector, NoopInjector, PasteInjector};
pub use routes::{create_router, start_server};
pub use service::ClipboardService;
pub use state::AppState;
