//! Capture session lifecycle.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde_json::json;
use uuid::Uuid;

use clipkeep_core::types::CaptureStatus;

/// Session shared between the capture loop and whoever controls it.
pub type SharedSession = Arc<Mutex<CaptureSession>>;

/// Tracks whether clipboard capture is active, paused, or stopped.
///
/// The session does not own the capture loop; the loop consults it on every
/// tick and exits once it is stopped.
#[derive(Debug, Clone)]
pub struct CaptureSession {
    id: Uuid,
    status: CaptureStatus,
    started_at: DateTime<Utc>,
    ticks: u64,
    captures: u64,
}

impl CaptureSession {
    /// Create a new session in the Active state.
    pub fn start() -> Self {
        Self {
            id: Uuid::new_v4(),
            status: CaptureStatus::Active,
            started_at: Utc::now(),
            ticks: 0,
            captures: 0,
        }
    }

    pub fn shared() -> SharedSession {
        Arc::new(Mutex::new(Self::start()))
    }

    /// Pause an active session. A stopped session stays stopped.
    pub fn pause(&mut self) {
        if self.status == CaptureStatus::Active {
            self.status = CaptureStatus::Paused;
        }
    }

    /// Resume a paused session. A stopped session stays stopped.
    pub fn resume(&mut self) {
        if self.status == CaptureStatus::Paused {
            self.status = CaptureStatus::Active;
        }
    }

    pub fn stop(&mut self) {
        self.status = CaptureStatus::Stopped;
    }

    pub fn record_tick(&mut self) {
        self.ticks += 1;
    }

    /// Record entries added by a tick.
    pub fn record_captures(&mut self, count: u64) {
        self.captures += count;
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn status(&self) -> CaptureStatus {
        self.status
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn captures(&self) -> u64 {
        self.captures
    }

    pub fn is_active(&self) -> bool {
        self.status == CaptureStatus::Active
    }

    pub fn is_stopped(&self) -> bool {
        self.status == CaptureStatus::Stopped
    }

    /// JSON summary for status endpoints and logs.
    pub fn summary(&self) -> serde_json::Value {
        json!({
            "session_id": self.id.to_string(),
            "status": self.status,
            "started_at": self.started_at.to_rfc3339(),
            "ticks": self.ticks,
            "captures": self.captures,
        })
    }
}

/// Lock a shared session, recovering from poisoning.
pub fn lock(session: &SharedSession) -> std::sync::MutexGuard<'_, CaptureSession> {
    session
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}
