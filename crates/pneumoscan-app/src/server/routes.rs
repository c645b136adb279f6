use crate::display::DisplayState;
use crate::state::{AppState, Notice};
use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Header carrying the percent-encoded file name of an upload
pub const FILE_NAME_HEADER: &str = "x-file-name";

const DEFAULT_FILE_NAME: &str = "upload";

// ============================================================================
// Health endpoints
// ============================================================================

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

// ============================================================================
// Session endpoints
// ============================================================================

pub async fn get_state(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.display())
}

pub async fn upload_image(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let body = match body {
        Ok(body) => body,
        Err(rejection) if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE => {
            return notice_response(Notice::ImageTooLarge, state.display());
        }
        Err(rejection) => return rejection.into_response(),
    };

    match state.select_image(file_name(&headers), body.as_ref()) {
        Ok(()) => Json(state.display()).into_response(),
        Err(notice) => notice_response(notice, state.display()),
    }
}

fn file_name(headers: &HeaderMap) -> String {
    let raw = headers
        .get(FILE_NAME_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .unwrap_or(DEFAULT_FILE_NAME);

    urlencoding::decode(raw)
        .map(|name| name.into_owned())
        .unwrap_or_else(|_| raw.to_string())
}

pub async fn classify(State(state): State<AppState>) -> Response {
    match state.classify().await {
        Ok(_) => Json(state.display()).into_response(),
        Err(notice) => notice_response(notice, state.display()),
    }
}

// ============================================================================
// Notices
// ============================================================================

#[derive(Debug, Serialize)]
pub struct NoticeBody {
    /// Text shown to the user
    pub notice: String,
    pub kind: Notice,
    pub state: DisplayState,
}

pub fn notice_status(notice: Notice) -> StatusCode {
    match notice {
        Notice::ModelNotLoaded | Notice::ModelLoadFailed => StatusCode::SERVICE_UNAVAILABLE,
        Notice::NoImageSelected => StatusCode::BAD_REQUEST,
        Notice::ImageTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
        Notice::PredictionFailed => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn notice_response(notice: Notice, state: DisplayState) -> Response {
    let body = NoticeBody {
        notice: notice.to_string(),
        kind: notice,
        state,
    };
    (notice_status(notice), Json(body)).into_response()
}
