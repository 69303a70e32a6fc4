//! Route handler functions for all API endpoints.
//!
//! Each handler extracts query/path parameters via axum extractors, calls the
//! clipboard service, and returns JSON.

use std::convert::Infallible;
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::Json;
use serde::{Deserialize, Serialize};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

use clipkeep_core::config::ClipkeepConfig;
use clipkeep_core::events::HistoryEvent;
use clipkeep_core::types::{CaptureStatus, Entry, EntryId};

use crate::error::ApiError;
use crate::state::AppState;

/// Largest page a single request may ask for.
pub const MAX_PAGE_LIMIT: usize = 1000;

// =============================================================================
// Request types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
}

/// Body of POST /paste: either a full entry as returned by the history
/// endpoints, or just the id of a stored entry.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum PasteRequest {
    Entry(Entry),
    ById { id: EntryId },
}

// =============================================================================
// Response types
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub entries: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PasteResponse {
    pub pasted: bool,
    pub id: EntryId,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CaptureControlResponse {
    pub status: CaptureStatus,
}

// =============================================================================
// Handler functions
// =============================================================================

/// GET /health - health check.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        entries: state.service.history_len() as u64,
    })
}

/// GET /history - entries in default order.
pub async fn history(
    State(state): State<AppState>,
    Query(params): Query<HistoryParams>,
) -> Result<Json<Vec<Entry>>, ApiError> {
    if let Some(limit) = params.limit {
        if limit > MAX_PAGE_LIMIT {
            return Err(ApiError::BadRequest(format!(
                "Parameter 'limit' must be at most {}",
                MAX_PAGE_LIMIT
            )));
        }
    }
    Ok(Json(state.service.get_history(params.limit, params.offset)))
}

/// GET /history/search - case-insensitive substring search over text entries.
pub async fn search_history(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<Entry>>, ApiError> {
    let q = params
        .q
        .ok_or_else(|| ApiError::BadRequest("Parameter 'q' is required for search".to_string()))?;
    Ok(Json(state.service.search_history(&q)))
}

/// DELETE /history/{id} - delete an entry, returning the refreshed page.
pub async fn delete_item(
    State(state): State<AppState>,
    Path(id): Path<EntryId>,
) -> Json<Vec<Entry>> {
    Json(state.service.delete_item(id))
}

/// POST /history/{id}/favorite - toggle favorite, returning the refreshed page.
pub async fn toggle_favorite(
    State(state): State<AppState>,
    Path(id): Path<EntryId>,
) -> Json<Vec<Entry>> {
    Json(state.service.toggle_favorite(id))
}

/// POST /history/clear - drop all non-favorites, returning the refreshed page.
pub async fn clear_history(State(state): State<AppState>) -> Json<Vec<Entry>> {
    Json(state.service.clear_history())
}

/// POST /paste - write an entry back to the clipboard and trigger injection.
pub async fn paste(
    State(state): State<AppState>,
    Json(request): Json<PasteRequest>,
) -> Result<Json<PasteResponse>, ApiError> {
    let entry = match request {
        PasteRequest::Entry(entry) => entry,
        PasteRequest::ById { id } => state
            .service
            .get_item(id)
            .ok_or_else(|| ApiError::NotFound(format!("No history entry with id {}", id)))?,
    };

    state.service.paste_item(&entry).await?;
    Ok(Json(PasteResponse {
        pasted: true,
        id: entry.id,
    }))
}

/// GET /settings - the live configuration.
pub async fn get_settings(State(state): State<AppState>) -> Json<ClipkeepConfig> {
    Json(state.service.get_settings())
}

/// PUT /settings - merge a partial update into the live configuration.
///
/// Top-level keys name config sections; fields inside a section replace the
/// current values and omitted fields are kept.
pub async fn update_settings(
    State(state): State<AppState>,
    Json(partial): Json<serde_json::Value>,
) -> Result<Json<ClipkeepConfig>, ApiError> {
    let mut current = serde_json::to_value(state.service.get_settings())
        .map_err(|e| ApiError::Internal(format!("Failed to serialize settings: {}", e)))?;

    let (Some(current_obj), Some(partial_obj)) = (current.as_object_mut(), partial.as_object())
    else {
        return Err(ApiError::BadRequest(
            "Request body must be a JSON object".to_string(),
        ));
    };

    for (key, value) in partial_obj {
        let Some(existing) = current_obj.get_mut(key) else {
            return Err(ApiError::BadRequest(format!(
                "Unknown settings section: '{}'",
                key
            )));
        };
        match (existing.as_object_mut(), value.as_object()) {
            (Some(existing_obj), Some(value_obj)) => {
                for (k, v) in value_obj {
                    existing_obj.insert(k.clone(), v.clone());
                }
            }
            _ => {
                return Err(ApiError::BadRequest(format!(
                    "Settings section '{}' must be an object",
                    key
                )))
            }
        }
    }

    let updated: ClipkeepConfig = serde_json::from_value(current)
        .map_err(|e| ApiError::BadRequest(format!("Invalid settings value: {}", e)))?;

    Ok(Json(state.service.save_settings(updated)))
}

/// GET /capture/status - session state and counters.
pub async fn capture_status(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(state.service.capture_status())
}

/// POST /capture/pause
pub async fn capture_pause(State(state): State<AppState>) -> Json<CaptureControlResponse> {
    Json(CaptureControlResponse {
        status: state.service.pause_capture(),
    })
}

/// POST /capture/resume
pub async fn capture_resume(State(state): State<AppState>) -> Json<CaptureControlResponse> {
    Json(CaptureControlResponse {
        status: state.service.resume_capture(),
    })
}

/// GET /stream - SSE stream of history events.
///
/// `update` events carry the refreshed first page as a JSON array; other
/// events carry the event itself.
pub async fn stream(
    State(state): State<AppState>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>> + Send> {
    let rx = state.service.subscribe();
    let stream = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(event) => {
            let data = match &event {
                HistoryEvent::Updated { entries } => serde_json::to_string(entries),
                other => serde_json::to_string(other),
            }
            .unwrap_or_default();
            Some(Ok(Event::default().event(event.name()).data(data)))
        }
        // Lagged subscribers skip what they missed.
        Err(_) => None,
    });

    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}
