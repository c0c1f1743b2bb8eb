//! Kiosk runtime
//!
//! Owns the [`FlowController`] and performs the IO it asks for: opening the
//! camera, composing photos, printing, uploading. Every state change is
//! published on a watch channel for displays.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, Shared};
use image::RgbImage;
use parking_lot::Mutex;
use tokio::sync::{watch, Notify};

use crate::camera::{CameraError, CameraSource, CaptureConstraints, FrameStream};
use crate::clock::Clock;
use crate::compose::{self, PreviewLayout};
use crate::config::{ConfigPatch, KioskConfig, MediaPool, PreviewShape};
use crate::error::ApiError;
use crate::flow::{CaptureError, CaptureRequest, Effect, FlowController, FlowSnapshot, Photo, PressTarget, TriggerOutcome};
use crate::picker::Picker;
use crate::quad::{Corner, Point};
use crate::sinks::{PrinterSink, QrEncoder, UploadError, UploadSink};
use crate::store::ConfigContext;

/// JPEG quality of the stage preview
const PREVIEW_QUALITY: u8 = 70;

type SharedUpload = Shared<BoxFuture<'static, Result<String, UploadError>>>;

/// Hardware and remote services the kiosk talks to
pub struct Devices {
    pub camera: Arc<dyn CameraSource>,
    pub constraints: CaptureConstraints,
    pub printer: Arc<dyn PrinterSink>,
    /// `None` disables sharing
    pub uploader: Option<Arc<dyn UploadSink>>,
    pub qr: Arc<dyn QrEncoder>,
    /// Size of the rendered stage preview
    pub preview_size: (u32, u32),
}

pub struct Kiosk {
    config: ConfigContext,
    clock: Arc<dyn Clock>,
    flow: Mutex<FlowController>,
    devices: Devices,
    frames: Mutex<Option<Box<dyn FrameStream>>>,
    shares: Mutex<HashMap<u64, SharedUpload>>,
    snapshots: watch::Sender<FlowSnapshot>,
    wake: Notify,
}

impl Kiosk {
    pub fn new(config: ConfigContext, clock: Arc<dyn Clock>, picker: Picker, devices: Devices) -> Arc<Self> {
        let flow = FlowController::new(config.current(), clock.clone(), picker);
        let (snapshots, _) = watch::channel(flow.snapshot());
        Arc::new(Self {
            config,
            clock,
            flow: Mutex::new(flow),
            devices,
            frames: Mutex::new(None),
            shares: Mutex::new(HashMap::new()),
            snapshots,
            wake: Notify::new(),
        })
    }

    /// Carry out pending effects and start the timer task
    pub fn spawn(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        self.dispatch_pending();
        tokio::spawn(self.clone().run_timers())
    }

    /// Carry out effects queued outside of an update (startup)
    pub fn dispatch_pending(self: &Arc<Self>) {
        self.update(|_| ());
    }

    /// Sleep until the next flow deadline, or until an update may have moved it
    async fn run_timers(self: Arc<Self>) {
        loop {
            let deadline = self.flow.lock().next_deadline();
            match deadline {
                Some(at) => {
                    let wait = Duration::from_millis(at.saturating_sub(self.clock.now_ms()));
                    tokio::select! {
                        _ = tokio::time::sleep(wait) => self.tick(),
                        _ = self.wake.notified() => {}
                    }
                }
                None => self.wake.notified().await,
            }
        }
    }

    /// Run `f` against the flow, then publish and dispatch what it produced
    fn update<R>(self: &Arc<Self>, f: impl FnOnce(&mut FlowController) -> R) -> R {
        let (result, effects, snapshot) = {
            let mut flow = self.flow.lock();
            let result = f(&mut flow);
            (result, flow.drain_effects(), flow.snapshot())
        };

        self.snapshots.send_if_modified(|current| {
            if *current == snapshot {
                false
            } else {
                *current = snapshot;
                true
            }
        });
        for effect in effects {
            self.dispatch(effect);
        }
        self.wake.notify_one();
        result
    }

    fn dispatch(self: &Arc<Self>, effect: Effect) {
        match effect {
            Effect::AcquireCamera { token } => {
                let kiosk = self.clone();
                tokio::task::spawn_blocking(move || {
                    let result = kiosk.acquire_camera();
                    kiosk.update(|flow| flow.camera_acquired(token, result));
                });
            }
            Effect::Capture(request) => {
                let kiosk = self.clone();
                tokio::task::spawn_blocking(move || {
                    let result = kiosk.capture_photo(&request);
                    kiosk.update(|flow| flow.complete_capture(request.id, result));
                });
            }
            Effect::OpenSettings => {
                tracing::info!("Operator asked for the settings screen");
            }
        }
    }

    // --- camera -------------------------------------------------------------

    fn acquire_camera(&self) -> Result<(), CameraError> {
        let mut frames = self.frames.lock();
        // Release the old stream first; V4L2 devices allow one reader
        *frames = None;
        *frames = Some(self.devices.camera.acquire(&self.devices.constraints)?);
        tracing::info!("Camera {} ready", self.devices.constraints.device);
        Ok(())
    }

    fn grab_frame(&self) -> Result<RgbImage, CameraError> {
        let mut frames = self.frames.lock();
        if frames.is_none() {
            *frames = Some(self.devices.camera.acquire(&self.devices.constraints)?);
        }
        let Some(stream) = frames.as_mut() else {
            return Err(CameraError::Unavailable("camera stream closed".into()));
        };
        match stream.next_frame() {
            Ok(frame) => Ok(frame),
            Err(e) => {
                *frames = None;
                Err(e)
            }
        }
    }

    fn capture_photo(&self, request: &CaptureRequest) -> Result<Vec<u8>, CaptureError> {
        let frame = self.grab_frame()?;
        let overlay = request
            .overlay
            .as_deref()
            .and_then(|path| match compose::load_overlay(path) {
                Ok(overlay) => Some(overlay),
                Err(e) => {
                    tracing::warn!("Capturing without overlay: {}", e);
                    None
                }
            });
        let photo = compose::compose_photo(&frame, request, overlay.as_ref());
        compose::encode_png(&photo).map_err(|e| CaptureError::Encode(e.to_string()))
    }

    // --- visitor events -----------------------------------------------------

    pub fn trigger(self: &Arc<Self>) -> TriggerOutcome {
        self.update(|flow| flow.trigger())
    }

    pub fn retry(self: &Arc<Self>) -> TriggerOutcome {
        self.update(|flow| flow.retry())
    }

    pub fn reset(self: &Arc<Self>) {
        self.update(|flow| flow.reset())
    }

    pub fn video_ended(self: &Arc<Self>) -> bool {
        self.update(|flow| flow.video_ended())
    }

    pub fn press(self: &Arc<Self>, target: PressTarget) -> Option<TriggerOutcome> {
        self.update(|flow| flow.press(target))
    }

    pub fn release(self: &Arc<Self>, target: PressTarget) {
        self.update(|flow| flow.release(target))
    }

    /// Fire due timers
    pub fn tick(self: &Arc<Self>) {
        self.update(|flow| flow.poll())
    }

    pub fn snapshot(&self) -> FlowSnapshot {
        self.snapshots.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<FlowSnapshot> {
        self.snapshots.subscribe()
    }

    pub fn devices(&self) -> &Devices {
        &self.devices
    }

    pub fn photo(&self) -> Option<Photo> {
        self.flow.lock().photo().cloned()
    }

    // --- print and share ----------------------------------------------------

    /// Print the current photo; returns the sheets left afterwards
    pub async fn print(self: &Arc<Self>) -> Result<u32, ApiError> {
        let job = self.update(|flow| flow.begin_print())?;

        let kiosk = self.clone();
        let submitted = tokio::task::spawn_blocking(move || -> Result<(), ApiError> {
            let page = compose::print_layout(&job.photo.png, job.paper_width_mm, job.paper_height_mm)?;
            kiosk
                .devices
                .printer
                .print(&page, &job.device_name, job.paper_width_mm, job.paper_height_mm)?;
            Ok(())
        })
        .await
        .unwrap_or_else(|e| Err(ApiError::Internal(anyhow::anyhow!("print task failed: {}", e))));

        if let Err(e) = submitted {
            tracing::error!("Print failed: {}", e);
            let message = e.to_string();
            self.update(|flow| flow.finish_print(Err(message)));
            return Err(e);
        }

        let decremented = self.config.modify(
            |config| {
                let printer = &mut config.printer;
                if printer.sheets_remaining == 0 {
                    return false;
                }
                printer.sheets_remaining -= 1;
                true
            },
            |config| self.update(|flow| flow.sync_config(config.clone())),
        );
        if let Err(e) = decremented {
            tracing::warn!("Could not save sheet counter: {:#}", e);
        }
        Ok(self.update(|flow| {
            flow.finish_print(Ok(()));
            flow.config().printer.sheets_remaining
        }))
    }

    /// Upload the current photo once and return its download URL.
    ///
    /// Concurrent calls for the same photo share one upload.
    pub async fn share(self: &Arc<Self>) -> Result<String, ApiError> {
        let uploader = self
            .devices
            .uploader
            .clone()
            .ok_or_else(|| ApiError::Unavailable("sharing is not configured".into()))?;

        let (photo, existing) = {
            let flow = self.flow.lock();
            (flow.share_target(), flow.share_url().map(str::to_string))
        };
        let photo = photo.ok_or_else(|| ApiError::NotFound("no photo to share".into()))?;
        if let Some(url) = existing {
            return Ok(url);
        }

        let upload = self
            .shares
            .lock()
            .entry(photo.id)
            .or_insert_with(|| uploader.upload(photo.png.to_vec()).shared())
            .clone();
        let result = upload.await;
        self.shares.lock().remove(&photo.id);

        match &result {
            Ok(url) => tracing::info!("Photo {} shared at {}", photo.id, url),
            Err(e) => tracing::error!("Sharing photo {} failed: {}", photo.id, e),
        }
        let status = result.clone().map_err(|e| e.to_string());
        self.update(|flow| flow.set_share(photo.id, status));
        result.map_err(ApiError::from)
    }

    /// QR code (PNG) for the current share link
    pub fn share_qr(&self) -> Result<Vec<u8>, ApiError> {
        let url = self
            .flow
            .lock()
            .share_url()
            .map(str::to_string)
            .ok_or_else(|| ApiError::NotFound("photo has not been shared".into()))?;
        Ok(self.devices.qr.encode(&url)?)
    }

    /// Camera frame rendered into the preview quad (JPEG)
    pub async fn preview(self: &Arc<Self>) -> Result<Vec<u8>, ApiError> {
        let layout = self.preview_layout();
        let kiosk = self.clone();
        tokio::task::spawn_blocking(move || -> Result<Vec<u8>, ApiError> {
            let frame = kiosk
                .grab_frame()
                .map_err(|e| ApiError::Unavailable(e.to_string()))?;
            let (width, height) = kiosk.devices.preview_size;
            let stage = compose::render_preview(&frame, &layout, width, height);
            Ok(compose::encode_jpeg(&stage, PREVIEW_QUALITY)?)
        })
        .await
        .unwrap_or_else(|e| Err(ApiError::Internal(anyhow::anyhow!("preview task failed: {}", e))))
    }

    /// Quad of the running main video, else the global one
    fn preview_layout(&self) -> PreviewLayout {
        let config = self.config.current();
        let main = self.snapshots.borrow().main_video.clone();
        let quad = main
            .as_deref()
            .and_then(|path| config.main_video(path))
            .map(|video| config.quad_for(video))
            .unwrap_or(config.preview_quad);
        PreviewLayout {
            quad,
            rectangle: config.preview_shape == PreviewShape::Rectangle,
            mirror: config.mirror_camera,
            crop: config.camera_crop,
        }
    }

    // --- configuration ------------------------------------------------------

    pub fn config(&self) -> Arc<KioskConfig> {
        self.config.current()
    }

    /// Save a partial document; the flow restarts with the result
    pub fn update_config(self: &Arc<Self>, patch: ConfigPatch) -> Result<Arc<KioskConfig>, ApiError> {
        Ok(self.config.update(patch, |config| self.apply(config))?)
    }

    pub fn reset_config(self: &Arc<Self>) -> Result<Arc<KioskConfig>, ApiError> {
        Ok(self.config.reset(|config| self.apply(config))?)
    }

    pub fn add_media(self: &Arc<Self>, pool: MediaPool, path: &str) -> Result<Arc<KioskConfig>, ApiError> {
        let path = path.trim();
        if path.is_empty() {
            return Err(ApiError::BadRequest("media path is empty".into()));
        }
        self.edit(|config| config.add_media(pool, path))
    }

    pub fn remove_media(self: &Arc<Self>, pool: MediaPool, index: usize) -> Result<Arc<KioskConfig>, ApiError> {
        if index >= self.config.current().pool_len(pool) {
            return Err(ApiError::NotFound(format!("no {:?} media at index {}", pool, index)));
        }
        self.edit(|config| config.remove_media(pool, index))
    }

    /// Drag a corner of the global quad (`video: None`) or a main video's quad
    pub fn drag_quad(
        self: &Arc<Self>,
        video: Option<usize>,
        corner: Corner,
        pointer: Point,
    ) -> Result<Arc<KioskConfig>, ApiError> {
        if let Some(index) = video {
            if index >= self.config.current().main_videos.len() {
                return Err(ApiError::NotFound(format!("no main video at index {}", index)));
            }
        }
        self.edit(|config| config.drag_handle(video, corner, pointer.clamped()))
    }

    /// Set the global preview window in frames, optionally changing the frame rate
    pub fn set_preview_frames(
        self: &Arc<Self>,
        start_frame: f64,
        end_frame: f64,
        frame_rate: Option<f64>,
    ) -> Result<Arc<KioskConfig>, ApiError> {
        self.edit(|config| {
            let visibility = &mut config.preview_visibility;
            if let Some(fps) = frame_rate.filter(|fps| fps.is_finite() && *fps > 0.0) {
                visibility.frame_rate = fps.clamp(1.0, 240.0);
            }
            let start = start_frame.max(0.0);
            let end = end_frame.max(start + 1.0);
            visibility.start_ms = visibility.frames_to_ms(start);
            visibility.end_ms = visibility.frames_to_ms(end);
            true
        })
    }

    fn edit<F>(self: &Arc<Self>, edit: F) -> Result<Arc<KioskConfig>, ApiError>
    where
        F: FnOnce(&mut KioskConfig) -> bool,
    {
        let edited = self.config.modify(edit, |config| self.apply(config))?;
        Ok(edited.unwrap_or_else(|| self.config.current()))
    }

    /// Runs under the config write lock so the flow sees saves in order
    fn apply(self: &Arc<Self>, config: &Arc<KioskConfig>) {
        self.update(|flow| flow.apply_config(config.clone()));
    }
}
