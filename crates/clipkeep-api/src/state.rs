//! Application state shared across all route handlers.
//!
//! AppState is passed to handlers via axum's State extractor. All fields are
//! cheap to clone.

use std::time::Instant;

use crate::service::ClipboardService;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Boundary over the history, clipboard and settings.
    pub service: ClipboardService,
    /// Bearer token required on protected routes.
    pub api_token: String,
    /// Port the server binds, used for the CORS allow-list.
    pub port: u16,
    /// Server start time for uptime calculation.
    pub start_time: Instant,
}

impl AppState {
    pub fn new(service: ClipboardService, api_token: impl Into<String>) -> Self {
        let port = service.get_settings().general.port;
        Self {
            service,
            api_token: api_token.into(),
            port,
            start_time: Instant::now(),
        }
    }

    /// Override the port taken from the settings.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }
}
