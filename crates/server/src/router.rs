use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use poolwatch_core::types::{WinReport, WinSubmission};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::AppState;

const CODE_OK: u16 = 200;
const CODE_BAD_REQUEST: u16 = 400;

#[derive(Debug, Deserialize)]
pub struct HeadParams {
    height: Option<String>,
}

/// Reply for `/filecoin/head`. Failures are reported in `code` and `error`.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct HeadReply {
    pub code: u16,
    pub error: String,
    pub height: u64,
    pub blocks: usize,
}

impl HeadReply {
    fn failed(error: impl Into<String>) -> Self {
        Self { code: CODE_BAD_REQUEST, error: error.into(), ..Self::default() }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReportReply {
    pub code: u16,
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report: Option<WinReport>,
}

#[derive(Debug, Deserialize)]
pub struct StatusParams {
    win: Option<String>,
}

/// Returns the block count at the requested anchor height.
pub async fn handle_head(
    State(state): State<AppState>,
    Query(params): Query<HeadParams>,
) -> Json<HeadReply> {
    let Some(raw) = params.height.filter(|h| !h.is_empty()) else {
        return Json(HeadReply::failed("no 'height' parameter provided"));
    };

    let height = match raw.parse::<u64>() {
        Ok(height) => height,
        Err(e) => return Json(HeadReply::failed(format!("invalid height '{raw}': {e}"))),
    };

    match state.resolver.resolve_block_count(height).await {
        Ok(blocks) => Json(HeadReply { code: CODE_OK, error: String::new(), height, blocks }),
        Err(e) => {
            debug!(height, error = %e, kind = e.as_str(), "anchor height not resolved");
            Json(HeadReply::failed(e.to_string()))
        }
    }
}

/// Accepts a miner's win report. Always answers HTTP 200.
pub async fn handle_win_report(State(state): State<AppState>, body: Bytes) -> Json<ReportReply> {
    let submission: WinSubmission = match serde_json::from_slice(&body) {
        Ok(submission) => submission,
        Err(e) => {
            return Json(ReportReply {
                code: CODE_BAD_REQUEST,
                error: format!("invalid report body: {e}"),
                report: None,
            });
        }
    };

    match state.intake.submit(submission) {
        Ok(report) => Json(ReportReply { code: CODE_OK, error: String::new(), report: Some(report) }),
        Err(e) => {
            info!(error = %e, "win report rejected");
            Json(ReportReply { code: CODE_BAD_REQUEST, error: e.to_string(), report: None })
        }
    }
}

/// Status snapshot as indented JSON. `win=1` adds the win list.
pub async fn handle_win_status(
    State(state): State<AppState>,
    Query(params): Query<StatusParams>,
) -> Response {
    let include_wins = params.win.as_deref() == Some("1");
    let status = state.store.status(include_wins);

    match serde_json::to_string_pretty(&status) {
        Ok(body) => (StatusCode::OK, [("content-type", "application/json")], body).into_response(),
        Err(e) => {
            error!(error = %e, "failed to serialize win status");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Clears win and orphan history, then returns the fresh snapshot.
pub async fn handle_win_clear(State(state): State<AppState>) -> impl IntoResponse {
    state.store.clear_history();
    info!("win history cleared");
    Json(state.store.status(false))
}

pub async fn handle_health(State(state): State<AppState>) -> impl IntoResponse {
    let head = state.resolver.current();

    Json(serde_json::json!({
        "status": if head.height > 0 { "healthy" } else { "unresolved" },
        "anchor_height": head.height,
        "anchor_blocks": head.block_count,
        "pending": state.store.pending_count(),
    }))
}

pub async fn handle_metrics(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(collector) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            collector.render(),
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, "metrics disabled").into_response(),
    }
}
