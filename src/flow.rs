//! Capture flow state machine
//!
//! `idle -> preparing -> capturing -> result -> idle`, with an orthogonal
//! working-hours lock. The controller does no IO: callers feed it events
//! (trigger, video end, presses, IO completions), call [`FlowController::poll`]
//! when [`FlowController::next_deadline`] is due and carry out the
//! [`Effect`]s it queues.
//!
//! Phase timers (show, hide, auto-reset) live inside the [`Phase`] variant, so
//! replacing the phase cancels them. The hold timers and the unlock deadline
//! are separate fields.

use std::sync::Arc;

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::camera::CameraError;
use crate::clock::Clock;
use crate::config::{CropRect, KioskConfig, MainVideo, PreviewShape, VideoWindow, STAGE_HEIGHT, STAGE_WIDTH};
use crate::picker::{Picker, ShuffleQueue};
use crate::transform::PreviewPlacement;
use crate::working_hours;

/// Settings corner must be held this long
pub const SETTINGS_HOLD_MS: u64 = 5000;
/// Stage press held this long outside working hours locks the kiosk
pub const IDLE_HOLD_MS: u64 = 3000;
/// A retry replays this much of the main video before the preview window
pub const RETRY_LEAD_MS: u64 = 5000;
/// Long edge of the captured photo in pixels
pub const CAPTURE_LONG_EDGE: u32 = 1920;

const MSG_NOT_CONFIGURED: &str = "Please finish configuring videos and overlays to start.";
const MSG_CONFIGURE_SOURCES: &str = "Configure sources before starting.";
const MSG_NO_MAIN_VIDEO: &str = "Add at least one main experience video to start.";
const MSG_CAMERA: &str = "Camera permission is required to continue.";
const MSG_CAPTURE_FAILED: &str = "Unable to take the photo. Please try again.";
const MSG_NO_PRINTER: &str = "Configure the printer in Settings first.";
const MSG_PRINTING: &str = "Sending to printer...";
const MSG_PRINTED: &str = "Print job sent.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowState {
    Idle,
    Preparing,
    Capturing,
    Result,
}

/// Current phase with its pending deadlines (monotonic ms)
#[derive(Debug, Clone, Copy, PartialEq)]
enum Phase {
    Idle,
    Preparing { show_at: u64, hide_at: u64 },
    /// Preview visible; `request` is set once the photo was requested
    Capturing { hide_at: Option<u64>, request: Option<u64> },
    Result { reset_at: u64 },
}

impl Phase {
    fn state(&self) -> FlowState {
        match self {
            Phase::Idle => FlowState::Idle,
            Phase::Preparing { .. } => FlowState::Preparing,
            Phase::Capturing { .. } => FlowState::Capturing,
            Phase::Result { .. } => FlowState::Result,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Timer {
    Show,
    Hide,
    AutoReset,
    SettingsHold,
    IdleHold,
    Unlock,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Lock {
    since: NaiveDateTime,
    until: NaiveDateTime,
    unlock_at: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraStatus {
    Unknown,
    Acquiring,
    Ready,
    Unavailable,
}

/// What the caller should do next
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Acquire the camera stream; report back with the same token
    AcquireCamera { token: u64 },
    /// Compose a photo; report back with the request id
    Capture(CaptureRequest),
    /// The settings corner was held long enough
    OpenSettings,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaptureRequest {
    pub id: u64,
    pub overlay: Option<String>,
    pub mirror: bool,
    pub crop: CropRect,
    pub width: u32,
    pub height: u32,
}

/// A finished photo (PNG)
#[derive(Debug, Clone)]
pub struct Photo {
    pub id: u64,
    pub png: Arc<Vec<u8>>,
}

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("camera: {0}")]
    Camera(#[from] CameraError),
    #[error("encode: {0}")]
    Encode(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum TriggerOutcome {
    Started,
    /// A session is already running
    Busy,
    Locked { until: NaiveDateTime },
    /// Outside working hours; the kiosk is now locked
    Closed { until: NaiveDateTime },
    NotReady,
    CameraUnavailable,
    NoMainVideo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PressTarget {
    Stage,
    SettingsCorner,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PrintRejected {
    #[error("no photo to print")]
    NoPhoto,
    #[error("a print job is already running")]
    Busy,
    #[error("printer is not configured")]
    NoPrinter,
}

/// Everything a print sink needs for one job
#[derive(Debug, Clone)]
pub struct PrintJob {
    pub photo: Photo,
    pub device_name: String,
    pub paper_width_mm: f64,
    pub paper_height_mm: f64,
}

/// Serializable view of the flow for displays
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowSnapshot {
    pub state: FlowState,
    pub session: u64,
    pub ready: bool,
    pub idle_video: Option<String>,
    pub main_video: Option<String>,
    pub seek_ms: u64,
    pub window: Option<VideoWindow>,
    pub placement: Option<PreviewPlacement>,
    pub preview_visible: bool,
    pub preview_overlay: Option<String>,
    pub mirror: bool,
    pub photo_id: Option<u64>,
    pub last_overlay: Option<String>,
    pub share_url: Option<String>,
    pub share_status: Option<String>,
    pub printing: bool,
    pub print_status: Option<String>,
    pub printer_ready: bool,
    pub sheets_remaining: u32,
    pub message: Option<String>,
    pub locked_since: Option<NaiveDateTime>,
    pub locked_until: Option<NaiveDateTime>,
    pub camera: CameraStatus,
    pub settings_requests: u64,
}

pub struct FlowController {
    config: Arc<KioskConfig>,
    clock: Arc<dyn Clock>,
    picker: Picker,
    overlays: ShuffleQueue,

    phase: Phase,
    session: u64,
    next_request: u64,
    camera: CameraStatus,
    camera_token: u64,

    idle_video: Option<String>,
    main_video: Option<MainVideo>,
    window: Option<VideoWindow>,
    placement: Option<PreviewPlacement>,
    seek_ms: u64,
    preview_visible: bool,
    pending_overlay: Option<String>,
    capture_overlay: Option<String>,

    photo: Option<Photo>,
    last_overlay: Option<String>,
    share_url: Option<String>,
    share_status: Option<String>,
    printing: bool,
    print_status: Option<String>,
    message: Option<String>,

    settings_hold_at: Option<u64>,
    idle_hold_at: Option<u64>,
    settings_requests: u64,
    lock: Option<Lock>,

    effects: Vec<Effect>,
}

impl FlowController {
    pub fn new(config: Arc<KioskConfig>, clock: Arc<dyn Clock>, picker: Picker) -> Self {
        let mut flow = Self {
            config: config.clone(),
            clock,
            picker,
            overlays: ShuffleQueue::new(),
            phase: Phase::Idle,
            session: 0,
            next_request: 1,
            camera: CameraStatus::Unknown,
            camera_token: 0,
            idle_video: None,
            main_video: None,
            window: None,
            placement: None,
            seek_ms: 0,
            preview_visible: false,
            pending_overlay: None,
            capture_overlay: None,
            photo: None,
            last_overlay: None,
            share_url: None,
            share_status: None,
            printing: false,
            print_status: None,
            message: None,
            settings_hold_at: None,
            idle_hold_at: None,
            settings_requests: 0,
            lock: None,
            effects: Vec::new(),
        };
        flow.apply_config(config);
        flow
    }

    pub fn state(&self) -> FlowState {
        self.phase.state()
    }

    pub fn config(&self) -> &Arc<KioskConfig> {
        &self.config
    }

    pub fn photo(&self) -> Option<&Photo> {
        self.photo.as_ref()
    }

    pub fn is_locked(&self) -> bool {
        self.lock.is_some()
    }

    pub fn camera_status(&self) -> CameraStatus {
        self.camera
    }

    /// Take the queued effects
    pub fn drain_effects(&mut self) -> Vec<Effect> {
        std::mem::take(&mut self.effects)
    }

    // --- configuration ----------------------------------------------------

    /// Install a new configuration: resets the flow and re-checks the lock
    pub fn apply_config(&mut self, config: Arc<KioskConfig>) {
        self.config = config;
        self.pending_overlay = None;
        self.idle_video = None;
        self.main_video = None;
        self.overlays.clear();

        let ready = self.config.is_ready();
        self.message = (!ready).then(|| MSG_NOT_CONFIGURED.to_string());
        if !ready {
            tracing::warn!("Kiosk configuration incomplete: idle, main and overlay media are required");
        }

        if self.lock.is_some() && self.closed_until().is_none() {
            tracing::info!("Working hours changed, unlocking");
            self.lock = None;
        }

        self.reset_flow();

        if ready && self.camera != CameraStatus::Ready {
            self.request_camera();
        }
    }

    /// Swap the configuration without disturbing the running session
    pub fn sync_config(&mut self, config: Arc<KioskConfig>) {
        self.config = config;
        if self.phase != Phase::Idle && self.config.main_videos.is_empty() {
            tracing::warn!("Main video pool emptied mid-session, aborting");
            self.message = Some(MSG_NO_MAIN_VIDEO.to_string());
            self.reset_flow();
        }
    }

    // --- visitor events ---------------------------------------------------

    /// Start a session from idle
    pub fn trigger(&mut self) -> TriggerOutcome {
        if self.phase != Phase::Idle {
            return TriggerOutcome::Busy;
        }
        if let Some(outcome) = self.gate() {
            return outcome;
        }
        self.start_session(None, 0)
    }

    /// Restart with the same main video, rewound a little before the window
    pub fn retry(&mut self) -> TriggerOutcome {
        if !self.config.is_ready() {
            self.message = Some(MSG_CONFIGURE_SOURCES.to_string());
            return TriggerOutcome::NotReady;
        }
        let forced = self.main_video.as_ref().map(|v| v.path.clone());
        self.reset_flow();
        if let Some(outcome) = self.gate() {
            return outcome;
        }
        self.start_session(forced, RETRY_LEAD_MS)
    }

    /// Back to idle from any state
    pub fn reset(&mut self) {
        self.reset_flow();
    }

    /// The main video reached its end
    pub fn video_ended(&mut self) -> bool {
        match self.phase {
            Phase::Preparing { .. } | Phase::Capturing { request: None, .. } => {
                tracing::debug!("Main video ended before the hide timer, capturing now");
                self.begin_capture();
                true
            }
            _ => false,
        }
    }

    pub fn press(&mut self, target: PressTarget) -> Option<TriggerOutcome> {
        let now = self.clock.now_ms();
        match target {
            PressTarget::SettingsCorner => {
                self.settings_hold_at = Some(now + SETTINGS_HOLD_MS);
                None
            }
            PressTarget::Stage => {
                if self.phase != Phase::Idle {
                    return None;
                }
                if self.lock.is_none() && self.closed_until().is_some() {
                    self.idle_hold_at = Some(now + IDLE_HOLD_MS);
                    return None;
                }
                Some(self.trigger())
            }
        }
    }

    pub fn release(&mut self, target: PressTarget) {
        match target {
            PressTarget::SettingsCorner => self.settings_hold_at = None,
            PressTarget::Stage => self.idle_hold_at = None,
        }
    }

    // --- IO completions ---------------------------------------------------

    pub fn camera_acquired(&mut self, token: u64, result: Result<(), CameraError>) {
        if token != self.camera_token {
            tracing::debug!("Ignoring stale camera acquisition {}", token);
            return;
        }
        match result {
            Ok(()) => {
                self.camera = CameraStatus::Ready;
                if self.message.as_deref() == Some(MSG_CAMERA) {
                    self.message = None;
                }
            }
            Err(e) => {
                tracing::error!("Failed to access camera: {}", e);
                self.camera = CameraStatus::Unavailable;
                self.message = Some(MSG_CAMERA.to_string());
            }
        }
    }

    /// Deliver a composed photo. Ignored unless `id` is the pending request.
    pub fn complete_capture(&mut self, id: u64, result: Result<Vec<u8>, CaptureError>) -> bool {
        if self.phase
            != (Phase::Capturing {
                hide_at: None,
                request: Some(id),
            })
        {
            tracing::debug!("Ignoring stale capture {}", id);
            return false;
        }

        match result {
            Ok(png) => {
                let now = self.clock.now_ms();
                self.photo = Some(Photo {
                    id,
                    png: Arc::new(png),
                });
                self.last_overlay = self.capture_overlay.take();
                self.preview_visible = false;
                self.share_url = None;
                self.share_status = None;
                self.print_status = None;
                self.phase = Phase::Result {
                    reset_at: now.saturating_add(self.config.result_screen.auto_reset_ms),
                };
                tracing::info!("Photo {} captured", id);
            }
            Err(CaptureError::Camera(e)) => {
                tracing::error!("Capture failed, camera unavailable: {}", e);
                self.camera = CameraStatus::Unavailable;
                self.message = Some(MSG_CAMERA.to_string());
                self.reset_flow();
            }
            Err(e) => {
                tracing::error!("Capture failed: {}", e);
                self.message = Some(MSG_CAPTURE_FAILED.to_string());
                self.reset_flow();
            }
        }
        true
    }

    /// Claim the current photo for printing
    pub fn begin_print(&mut self) -> Result<PrintJob, PrintRejected> {
        let photo = self.photo.clone().ok_or(PrintRejected::NoPhoto)?;
        if self.printing {
            return Err(PrintRejected::Busy);
        }
        let printer = &self.config.printer;
        if printer.device_name.is_empty() {
            self.print_status = Some(MSG_NO_PRINTER.to_string());
            return Err(PrintRejected::NoPrinter);
        }
        let job = PrintJob {
            photo,
            device_name: printer.device_name.clone(),
            paper_width_mm: printer.paper_width_mm,
            paper_height_mm: printer.paper_height_mm,
        };
        self.printing = true;
        self.print_status = Some(MSG_PRINTING.to_string());
        Ok(job)
    }

    pub fn finish_print(&mut self, result: Result<(), String>) {
        self.printing = false;
        self.print_status = Some(match result {
            Ok(()) => MSG_PRINTED.to_string(),
            Err(message) => message,
        });
    }

    /// Photo a share link may be created for
    pub fn share_target(&self) -> Option<Photo> {
        match self.phase {
            Phase::Result { .. } => self.photo.clone(),
            _ => None,
        }
    }

    /// Record the share link. Ignored when the photo is no longer current.
    pub fn set_share(&mut self, photo_id: u64, result: Result<String, String>) -> bool {
        if self.photo.as_ref().map(|p| p.id) != Some(photo_id) {
            return false;
        }
        match result {
            Ok(url) => {
                self.share_url = Some(url);
                self.share_status = None;
            }
            Err(message) => self.share_status = Some(message),
        }
        true
    }

    pub fn share_url(&self) -> Option<&str> {
        self.share_url.as_deref()
    }

    // --- timers -------------------------------------------------------------

    fn timers(&self) -> impl Iterator<Item = (Timer, u64)> {
        let (show, hide, reset) = match self.phase {
            Phase::Idle => (None, None, None),
            Phase::Preparing { show_at, hide_at } => (Some(show_at), Some(hide_at), None),
            Phase::Capturing { hide_at, .. } => (None, hide_at, None),
            Phase::Result { reset_at } => (None, None, Some(reset_at)),
        };
        [
            (Timer::Show, show),
            (Timer::Hide, hide),
            (Timer::AutoReset, reset),
            (Timer::SettingsHold, self.settings_hold_at),
            (Timer::IdleHold, self.idle_hold_at),
            (Timer::Unlock, self.lock.map(|l| l.unlock_at)),
        ]
        .into_iter()
        .filter_map(|(timer, at)| at.map(|at| (timer, at)))
    }

    fn next_timer(&self) -> Option<(Timer, u64)> {
        self.timers().min_by_key(|&(_, at)| at)
    }

    /// Earliest pending deadline (monotonic ms)
    pub fn next_deadline(&self) -> Option<u64> {
        self.next_timer().map(|(_, at)| at)
    }

    /// Fire every timer that is due, earliest first
    pub fn poll(&mut self) {
        let now = self.clock.now_ms();
        while let Some((timer, at)) = self.next_timer() {
            if at > now {
                break;
            }
            self.fire(timer);
        }
    }

    fn fire(&mut self, timer: Timer) {
        match timer {
            Timer::Show => {
                if let Phase::Preparing { hide_at, .. } = self.phase {
                    self.phase = Phase::Capturing {
                        hide_at: Some(hide_at),
                        request: None,
                    };
                    self.preview_visible = true;
                }
            }
            Timer::Hide => self.begin_capture(),
            Timer::AutoReset => {
                tracing::debug!("Result screen timed out");
                self.reset_flow();
            }
            Timer::SettingsHold => {
                self.settings_hold_at = None;
                self.settings_requests += 1;
                tracing::info!("Settings requested from the kiosk");
                self.effects.push(Effect::OpenSettings);
            }
            Timer::IdleHold => {
                self.idle_hold_at = None;
                if self.phase == Phase::Idle {
                    if let Some(until) = self.closed_until() {
                        self.enter_lock(until);
                    }
                }
            }
            Timer::Unlock => match self.closed_until() {
                None => {
                    tracing::info!("Working hours started, unlocking");
                    self.lock = None;
                }
                Some(until) => self.enter_lock(until),
            },
        }
    }

    // --- internals ------------------------------------------------------------

    /// Checks shared by trigger and retry
    fn gate(&mut self) -> Option<TriggerOutcome> {
        if let Some(lock) = self.lock {
            return Some(TriggerOutcome::Locked { until: lock.until });
        }
        if let Some(until) = self.closed_until() {
            self.enter_lock(until);
            return Some(TriggerOutcome::Closed { until });
        }
        if !self.config.is_ready() {
            self.message = Some(MSG_CONFIGURE_SOURCES.to_string());
            return Some(TriggerOutcome::NotReady);
        }
        if self.camera == CameraStatus::Unavailable {
            self.message = Some(MSG_CAMERA.to_string());
            self.request_camera();
            return Some(TriggerOutcome::CameraUnavailable);
        }
        None
    }

    fn closed_until(&self) -> Option<NaiveDateTime> {
        working_hours::closed_until(&self.config.working_hours, self.clock.local_now())
    }

    fn enter_lock(&mut self, until: NaiveDateTime) {
        let local = self.clock.local_now();
        let delay = (until - local).num_milliseconds().max(0) as u64;
        let since = self.lock.map(|l| l.since).unwrap_or(local);
        self.lock = Some(Lock {
            since,
            until,
            unlock_at: self.clock.now_ms().saturating_add(delay),
        });
        tracing::info!("Outside working hours, locked until {}", until);
    }

    fn request_camera(&mut self) {
        self.camera_token += 1;
        self.camera = CameraStatus::Acquiring;
        self.effects.push(Effect::AcquireCamera {
            token: self.camera_token,
        });
    }

    fn start_session(&mut self, forced: Option<String>, lead_in_ms: u64) -> TriggerOutcome {
        let config = self.config.clone();
        let pool = &config.main_videos;

        let forced_entry = forced.as_deref().and_then(|path| config.main_video(path));
        let previous = self.main_video.as_ref().map(|v| v.path.clone());
        let video = forced_entry.or_else(|| {
            self.picker.pick_distinct(pool, |v| {
                pool.len() > 1 && previous.as_deref() == Some(v.path.as_str())
            })
        });
        let Some(video) = video.cloned() else {
            self.message = Some(MSG_NO_MAIN_VIDEO.to_string());
            self.reset_flow();
            return TriggerOutcome::NoMainVideo;
        };

        let window = config.window_for(&video);
        let seek_ms = if lead_in_ms > 0 {
            window.start_ms.saturating_sub(lead_in_ms)
        } else {
            0
        };
        let now = self.clock.now_ms();

        self.session += 1;
        self.placement = Some(PreviewPlacement::for_quad(
            &config.quad_for(&video),
            config.preview_shape == PreviewShape::Rectangle,
            STAGE_WIDTH,
            STAGE_HEIGHT,
        ));
        self.pending_overlay = self.overlays.next(&config.santa_overlays, &mut self.picker);
        self.window = Some(window);
        self.seek_ms = seek_ms;
        self.preview_visible = false;
        self.phase = Phase::Preparing {
            show_at: now.saturating_add(window.start_ms.saturating_sub(seek_ms)),
            hide_at: now.saturating_add(window.end_ms.saturating_sub(seek_ms)),
        };
        self.message = None;
        tracing::info!(
            "Session {} started with {} (window {}..{} ms, seek {} ms)",
            self.session,
            video.path,
            window.start_ms,
            window.end_ms,
            seek_ms
        );
        self.main_video = Some(video);

        if self.camera == CameraStatus::Unknown {
            self.request_camera();
        }
        TriggerOutcome::Started
    }

    fn begin_capture(&mut self) {
        let id = self.next_request;
        self.next_request += 1;

        let overlay = self
            .pending_overlay
            .take()
            .or_else(|| self.overlays.next(&self.config.santa_overlays, &mut self.picker));
        self.capture_overlay = overlay.clone();

        let (width, height) = capture_size(self.config.printer.aspect());
        self.phase = Phase::Capturing {
            hide_at: None,
            request: Some(id),
        };
        self.effects.push(Effect::Capture(CaptureRequest {
            id,
            overlay,
            mirror: self.config.mirror_camera,
            crop: self.config.camera_crop,
            width,
            height,
        }));
    }

    /// Cancel every timer and return to idle; re-arms unlock if still locked
    fn reset_flow(&mut self) {
        self.phase = Phase::Idle;
        self.settings_hold_at = None;
        self.idle_hold_at = None;
        if let Some(lock) = self.lock {
            self.enter_lock(lock.until);
        }

        self.photo = None;
        self.pending_overlay = None;
        self.capture_overlay = None;
        self.preview_visible = false;
        self.window = None;
        self.placement = None;
        self.seek_ms = 0;
        self.share_url = None;
        self.share_status = None;
        self.print_status = None;
        self.select_idle_video();
    }

    /// Pick an idle video, different from the current one when possible
    fn select_idle_video(&mut self) {
        let pool = &self.config.idle_videos;
        let current = self.idle_video.take();
        self.idle_video = self
            .picker
            .pick_distinct(pool, |p| pool.len() > 1 && current.as_deref() == Some(p.as_str()))
            .cloned();
    }

    pub fn snapshot(&self) -> FlowSnapshot {
        let in_session = matches!(self.phase, Phase::Preparing { .. } | Phase::Capturing { .. });
        let printer = &self.config.printer;
        FlowSnapshot {
            state: self.phase.state(),
            session: self.session,
            ready: self.config.is_ready(),
            idle_video: self.idle_video.clone(),
            main_video: in_session.then(|| self.main_video.as_ref().map(|v| v.path.clone())).flatten(),
            seek_ms: self.seek_ms,
            window: self.window,
            placement: self.placement,
            preview_visible: self.preview_visible,
            preview_overlay: if self.preview_visible {
                self.pending_overlay.clone().or_else(|| self.capture_overlay.clone())
            } else {
                None
            },
            mirror: self.config.mirror_camera,
            photo_id: self.photo.as_ref().map(|p| p.id),
            last_overlay: self.last_overlay.clone(),
            share_url: self.share_url.clone(),
            share_status: self.share_status.clone(),
            printing: self.printing,
            print_status: self.print_status.clone(),
            printer_ready: !printer.device_name.is_empty(),
            sheets_remaining: printer.sheets_remaining,
            message: self.message.clone(),
            locked_since: self.lock.map(|l| l.since),
            locked_until: self.lock.map(|l| l.until),
            camera: self.camera,
            settings_requests: self.settings_requests,
        }
    }
}

/// Photo size with the paper's aspect ratio and a long edge of 1920 px
pub fn capture_size(paper_aspect: f64) -> (u32, u32) {
    let long = CAPTURE_LONG_EDGE as f64;
    if paper_aspect >= 1.0 {
        (CAPTURE_LONG_EDGE, (long / paper_aspect).round().max(1.0) as u32)
    } else {
        ((long * paper_aspect).round().max(1.0) as u32, CAPTURE_LONG_EDGE)
    }
}
