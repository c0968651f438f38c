//! Route table and request handlers.

use super::error::ApiError;
use super::stream::mjpeg_body;
use super::AppState;
use crate::camera::MULTIPART_CONTENT_TYPE;
use crate::capture::parse_capturing;
use crate::metrics::MetricsSnapshot;
use crate::storage::{parse_frontend_timestamp, CaptureQuery};
use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Json, Router,
};
use serde::Deserialize;
use std::collections::HashMap;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

const CONFIG_PATH: &str = "/camera/captures/config/";
const FORM_CAPTURE_INTERVAL: &str = "capture_interval";
const FORM_STATUS: &str = "status";

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    let captures = ServeDir::new(state.store.files().root());

    Router::new()
        .route("/camera/video_frame", get(video_frame))
        .route("/camera/frame", get(single_frame))
        .route(CONFIG_PATH, get(capture_config))
        .route(
            "/camera/captures/config/capture_interval/",
            post(update_capture_interval),
        )
        .route(
            "/camera/captures/config/set_status_capture_mode/",
            post(set_capture_mode),
        )
        .route("/camera/captures/remove/", post(remove_captures))
        .route("/camera/captures/capture/", post(capture_now))
        .route("/camera/captures/", get(first_captures_page))
        .route("/camera/captures/page/:page/", get(captures_page))
        .nest_service("/camera/capture", captures)
        .route("/metrics", get(metrics_handler))
        .route("/health", get(health_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Optional date-range filter of the captures listing.
#[derive(Debug, Default, Deserialize)]
struct PageFilter {
    #[serde(rename = "datetimeFrom")]
    datetime_from: Option<String>,
    #[serde(rename = "datetimeUntil")]
    datetime_until: Option<String>,
}

async fn video_frame(State(state): State<AppState>) -> Response {
    (
        [(header::CONTENT_TYPE, MULTIPART_CONTENT_TYPE)],
        mjpeg_body(&state),
    )
        .into_response()
}

async fn single_frame(State(state): State<AppState>) -> Result<Response, ApiError> {
    let camera = state.camera.clone();
    let frame = tokio::task::spawn_blocking(move || camera.get_frame()).await??;
    Ok(([(header::CONTENT_TYPE, "image/jpeg")], frame).into_response())
}

async fn capture_config(State(state): State<AppState>) -> Result<Response, ApiError> {
    let scheduler = state.scheduler.clone();
    let status = tokio::task::spawn_blocking(move || scheduler.status()).await??;
    Ok(Json(status).into_response())
}

async fn update_capture_interval(
    State(state): State<AppState>,
    Form(form): Form<HashMap<String, String>>,
) -> Result<Redirect, ApiError> {
    let raw = form.get(FORM_CAPTURE_INTERVAL).map(String::as_str).unwrap_or("");
    state.scheduler.update_interval(raw)?;
    Ok(Redirect::to(CONFIG_PATH))
}

async fn set_capture_mode(
    State(state): State<AppState>,
    Form(form): Form<HashMap<String, String>>,
) -> Result<Redirect, ApiError> {
    let raw = form.get(FORM_STATUS).map(String::as_str).unwrap_or("");
    if raw.is_empty() {
        return Err(ApiError::BadRequest(format!(
            "Form argument {} is required must be \"True\" or \"False\"",
            FORM_STATUS
        )));
    }
    state.scheduler.set_capturing(parse_capturing(raw))?;
    Ok(Redirect::to(CONFIG_PATH))
}

async fn remove_captures(State(state): State<AppState>) -> Result<Redirect, ApiError> {
    let scheduler = state.scheduler.clone();
    tokio::task::spawn_blocking(move || scheduler.remove_all_captures()).await??;
    Ok(Redirect::to(CONFIG_PATH))
}

async fn capture_now(State(state): State<AppState>) -> Result<Response, ApiError> {
    let scheduler = state.scheduler.clone();
    let image = tokio::task::spawn_blocking(move || scheduler.capture_once()).await??;
    Ok((StatusCode::CREATED, Json(image)).into_response())
}

async fn first_captures_page(
    State(state): State<AppState>,
    Query(filter): Query<PageFilter>,
) -> Result<Response, ApiError> {
    list_captures(state, 1, filter).await
}

async fn captures_page(
    State(state): State<AppState>,
    Path(page): Path<u32>,
    Query(filter): Query<PageFilter>,
) -> Result<Response, ApiError> {
    if page == 0 {
        return Err(ApiError::BadRequest("Page numbers start at 1".to_string()));
    }
    list_captures(state, page, filter).await
}

async fn list_captures(state: AppState, page: u32, filter: PageFilter) -> Result<Response, ApiError> {
    let query = CaptureQuery {
        page,
        per_page: state.items_per_page,
        from: filter.datetime_from.as_deref().and_then(parse_frontend_timestamp),
        until: filter.datetime_until.as_deref().and_then(parse_frontend_timestamp),
    };
    let store = state.store.clone();
    let page = tokio::task::spawn_blocking(move || store.page(&query)).await??;
    Ok(Json(page).into_response())
}

async fn metrics_handler(State(state): State<AppState>) -> Result<Response, ApiError> {
    let scheduler = state.scheduler.clone();
    let status = tokio::task::spawn_blocking(move || scheduler.status()).await??;
    state.metrics.update(&MetricsSnapshot {
        capturing: status.capturing,
        interval_seconds: status.interval,
        stored_captures: status.total_captures,
    });

    match state.metrics.encode() {
        Ok(output) => Ok((
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
            output,
        )
            .into_response()),
        Err(e) => Err(ApiError::Internal(format!("failed to encode metrics: {}", e))),
    }
}

async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
