//! Web server for the kiosk display and settings API

use std::convert::Infallible;
use std::sync::Arc;

use anyhow::Result;
use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{delete, get, post},
    Json, Router,
};
use futures::Stream;
use serde::{Deserialize, Serialize};
use tokio_stream::{wrappers::WatchStream, StreamExt};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::{ConfigPatch, KioskConfig, MediaPool, STAGE_HEIGHT, STAGE_WIDTH};
use crate::error::ApiError;
use crate::flow::{FlowSnapshot, PressTarget, TriggerOutcome};
use crate::kiosk::Kiosk;
use crate::quad::{Corner, Point};

type AppState = Arc<Kiosk>;

pub fn router(kiosk: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Flow
        .route("/api/state", get(get_state))
        .route("/api/events", get(events))
        .route("/api/trigger", post(trigger))
        .route("/api/video/ended", post(video_ended))
        .route("/api/retry", post(retry))
        .route("/api/reset", post(reset))
        .route("/api/press/:target", post(press))
        .route("/api/release/:target", post(release))
        // Photo, print and share
        .route("/api/photo", get(get_photo))
        .route("/api/preview", get(get_preview))
        .route("/api/print", post(print))
        .route("/api/share", post(share))
        .route("/api/share/qr", get(share_qr))
        // Settings
        .route("/api/config", get(get_config).put(put_config))
        .route("/api/config/reset", post(reset_config))
        .route("/api/config/media", post(add_media))
        .route("/api/config/media/:pool/:index", delete(remove_media))
        .route("/api/config/quad/:index", post(drag_quad))
        .route("/api/config/window", get(get_window).post(set_window))
        // System info
        .route("/api/info", get(get_info))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(kiosk)
}

/// Run the web server
pub async fn run_server(addr: &str, kiosk: AppState) -> Result<()> {
    let app = router(kiosk);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Web server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

fn png(bytes: Vec<u8>) -> Response {
    ([(header::CONTENT_TYPE, "image/png")], bytes).into_response()
}

// --- flow ---------------------------------------------------------------------

async fn get_state(State(kiosk): State<AppState>) -> Json<FlowSnapshot> {
    Json(kiosk.snapshot())
}

/// Server-sent events: one `state` event per snapshot change
async fn events(State(kiosk): State<AppState>) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = WatchStream::new(kiosk.subscribe()).map(|snapshot| {
        let event = Event::default().event("state");
        Ok(match event.json_data(&snapshot) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!("Could not encode state event: {}", e);
                Event::default().comment("encoding error")
            }
        })
    });
    Sse::new(stream).keep_alive(KeepAlive::default())
}

async fn trigger(State(kiosk): State<AppState>) -> Json<TriggerOutcome> {
    Json(kiosk.trigger())
}

#[derive(Serialize)]
struct VideoEndedResponse {
    capturing: bool,
}

async fn video_ended(State(kiosk): State<AppState>) -> Json<VideoEndedResponse> {
    Json(VideoEndedResponse {
        capturing: kiosk.video_ended(),
    })
}

async fn retry(State(kiosk): State<AppState>) -> Json<TriggerOutcome> {
    Json(kiosk.retry())
}

async fn reset(State(kiosk): State<AppState>) -> impl IntoResponse {
    kiosk.reset();
    StatusCode::OK
}

#[derive(Serialize)]
struct PressResponse {
    outcome: Option<TriggerOutcome>,
}

async fn press(State(kiosk): State<AppState>, Path(target): Path<PressTarget>) -> Json<PressResponse> {
    Json(PressResponse {
        outcome: kiosk.press(target),
    })
}

async fn release(State(kiosk): State<AppState>, Path(target): Path<PressTarget>) -> impl IntoResponse {
    kiosk.release(target);
    StatusCode::OK
}

// --- photo, print and share ---------------------------------------------------------

async fn get_photo(State(kiosk): State<AppState>) -> Result<Response, ApiError> {
    let photo = kiosk
        .photo()
        .ok_or_else(|| ApiError::NotFound("no photo".into()))?;
    Ok(png(photo.png.to_vec()))
}

/// Camera rendered into the preview quad (JPEG)
async fn get_preview(State(kiosk): State<AppState>) -> Result<Response, ApiError> {
    let frame = kiosk.preview().await?;
    Ok(([(header::CONTENT_TYPE, "image/jpeg")], frame).into_response())
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PrintResponse {
    sheets_remaining: u32,
}

async fn print(State(kiosk): State<AppState>) -> Result<Json<PrintResponse>, ApiError> {
    let sheets_remaining = kiosk.print().await?;
    Ok(Json(PrintResponse { sheets_remaining }))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ShareResponse {
    download_url: String,
}

async fn share(State(kiosk): State<AppState>) -> Result<Json<ShareResponse>, ApiError> {
    let download_url = kiosk.share().await?;
    Ok(Json(ShareResponse { download_url }))
}

async fn share_qr(State(kiosk): State<AppState>) -> Result<Response, ApiError> {
    Ok(png(kiosk.share_qr()?))
}

// --- settings -----------------------------------------------------------------------

fn document(config: Arc<KioskConfig>) -> Json<KioskConfig> {
    Json(KioskConfig::clone(&config))
}

async fn get_config(State(kiosk): State<AppState>) -> Json<KioskConfig> {
    document(kiosk.config())
}

/// Save a (partial) document; malformed JSON is refused, wrong fields are dropped
async fn put_config(State(kiosk): State<AppState>, body: String) -> Result<Json<KioskConfig>, ApiError> {
    let patch = ConfigPatch::from_json(&body).map_err(|e| ApiError::BadRequest(e.to_string()))?;
    Ok(document(kiosk.update_config(patch)?))
}

async fn reset_config(State(kiosk): State<AppState>) -> Result<Json<KioskConfig>, ApiError> {
    Ok(document(kiosk.reset_config()?))
}

#[derive(Deserialize)]
struct AddMediaRequest {
    pool: MediaPool,
    path: String,
}

async fn add_media(
    State(kiosk): State<AppState>,
    Json(req): Json<AddMediaRequest>,
) -> Result<Json<KioskConfig>, ApiError> {
    Ok(document(kiosk.add_media(req.pool, &req.path)?))
}

async fn remove_media(
    State(kiosk): State<AppState>,
    Path((pool, index)): Path<(MediaPool, usize)>,
) -> Result<Json<KioskConfig>, ApiError> {
    Ok(document(kiosk.remove_media(pool, index)?))
}

/// Pointer position for a quad handle; `video` selects a main video's own quad
#[derive(Deserialize)]
struct DragRequest {
    x: f64,
    y: f64,
    #[serde(default)]
    video: Option<usize>,
}

async fn drag_quad(
    State(kiosk): State<AppState>,
    Path(index): Path<usize>,
    Json(req): Json<DragRequest>,
) -> Result<Json<KioskConfig>, ApiError> {
    let corner =
        Corner::from_index(index).ok_or_else(|| ApiError::BadRequest(format!("no corner {}", index)))?;
    Ok(document(kiosk.drag_quad(req.video, corner, Point::new(req.x, req.y))?))
}

/// Global preview window expressed in frames
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FrameWindow {
    start_frame: f64,
    end_frame: f64,
    #[serde(default)]
    frame_rate: Option<f64>,
}

async fn get_window(State(kiosk): State<AppState>) -> Json<FrameWindow> {
    let visibility = kiosk.config().preview_visibility;
    Json(FrameWindow {
        start_frame: visibility.ms_to_frames(visibility.start_ms) as f64,
        end_frame: visibility.ms_to_frames(visibility.end_ms) as f64,
        frame_rate: Some(visibility.frame_rate),
    })
}

async fn set_window(
    State(kiosk): State<AppState>,
    Json(req): Json<FrameWindow>,
) -> Result<Json<KioskConfig>, ApiError> {
    Ok(document(kiosk.set_preview_frames(req.start_frame, req.end_frame, req.frame_rate)?))
}

// --- info ---------------------------------------------------------------------------

/// System information response
#[derive(Serialize)]
struct InfoResponse {
    version: String,
    stage_width: f64,
    stage_height: f64,
    preview_width: u32,
    preview_height: u32,
    camera: String,
    sharing: bool,
    ready: bool,
}

async fn get_info(State(kiosk): State<AppState>) -> Json<InfoResponse> {
    let devices = kiosk.devices();
    Json(InfoResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        stage_width: STAGE_WIDTH,
        stage_height: STAGE_HEIGHT,
        preview_width: devices.preview_size.0,
        preview_height: devices.preview_size.1,
        camera: devices.constraints.device.clone(),
        sharing: devices.uploader.is_some(),
        ready: kiosk.config().is_ready(),
    })
}
