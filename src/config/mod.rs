//! Kiosk configuration document
//!
//! The document is only ever built by [`normalize`] from a [`ConfigPatch`],
//! so every `KioskConfig` value satisfies the document invariants.

mod normalize;
mod patch;

pub use normalize::{default_quad, normalize};
pub use patch::ConfigPatch;

use chrono::NaiveTime;
use serde::{Deserialize, Serialize, Serializer};

use crate::quad::{self, Corner, Point, Quad};

/// Stage the quads are normalized against (portrait full HD)
pub const STAGE_WIDTH: f64 = 1080.0;
pub const STAGE_HEIGHT: f64 = 1920.0;

/// Shortest preview window
pub const MIN_WINDOW_MS: u64 = 250;
/// Largest timing value accepted from a document (2^53 - 1)
pub const MAX_MS: u64 = 9_007_199_254_740_991;
/// Shortest result screen before auto-reset
pub const MIN_AUTO_RESET_MS: u64 = 5000;
pub const MIN_PAPER_MM: f64 = 50.0;
/// Smallest camera crop edge (normalized)
pub const MIN_CROP_EDGE: f64 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PreviewShape {
    /// Axis-aligned rectangle with the paper's aspect ratio
    #[default]
    Rectangle,
    /// Free quadrilateral with independent corners
    Free,
}

impl PreviewShape {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "rectangle" => Some(PreviewShape::Rectangle),
            "free" => Some(PreviewShape::Free),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PreviewShape::Rectangle => "rectangle",
            PreviewShape::Free => "free",
        }
    }
}

/// Global preview window, relative to the start of the main video
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewVisibility {
    pub start_ms: u64,
    pub end_ms: u64,
    /// Frame rate used to express the window in frames
    pub frame_rate: f64,
}

impl PreviewVisibility {
    pub fn window(&self) -> VideoWindow {
        VideoWindow {
            start_ms: self.start_ms,
            end_ms: self.end_ms,
        }
    }

    pub fn frames_to_ms(&self, frames: f64) -> u64 {
        (frames.max(0.0) * 1000.0 / self.frame_rate).min(MAX_MS as f64).round() as u64
    }

    pub fn ms_to_frames(&self, ms: u64) -> u64 {
        (ms as f64 * self.frame_rate / 1000.0).round() as u64
    }
}

/// A preview window `[start_ms, end_ms]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoWindow {
    pub start_ms: u64,
    pub end_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MainVideo {
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview_quad: Option<Quad>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview_visibility: Option<VideoWindow>,
}

impl MainVideo {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            preview_quad: None,
            preview_visibility: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultScreen {
    pub auto_reset_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureTiming {
    pub capture_at_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrinterConfig {
    pub device_name: String,
    pub paper_width_mm: f64,
    pub paper_height_mm: f64,
    pub sheets_remaining: u32,
}

impl PrinterConfig {
    /// Paper width over height
    pub fn aspect(&self) -> f64 {
        self.paper_width_mm / self.paper_height_mm
    }
}

/// Daily window during which the kiosk accepts visitors
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WorkingHours {
    pub enabled: bool,
    #[serde(serialize_with = "serialize_hhmm")]
    pub start: NaiveTime,
    #[serde(serialize_with = "serialize_hhmm")]
    pub end: NaiveTime,
}

/// Normalized crop applied to the camera frame before composition
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CropRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl CropRect {
    pub fn is_full_frame(&self) -> bool {
        self.x <= 0.0 && self.y <= 0.0 && self.width >= 1.0 && self.height >= 1.0
    }
}

/// Complete, normalized kiosk configuration
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KioskConfig {
    pub idle_videos: Vec<String>,
    pub main_videos: Vec<MainVideo>,
    pub preview_quad: Quad,
    pub preview_shape: PreviewShape,
    pub preview_visibility: PreviewVisibility,
    pub result_screen: ResultScreen,
    pub capture: CaptureTiming,
    pub printer: PrinterConfig,
    pub mirror_camera: bool,
    pub santa_overlays: Vec<String>,
    pub backup_directory: String,
    pub working_hours: WorkingHours,
    pub camera_crop: CropRect,
}

impl Default for KioskConfig {
    fn default() -> Self {
        normalize(&ConfigPatch::default())
    }
}

/// One of the editable media lists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaPool {
    Idle,
    Main,
    Overlay,
}

impl KioskConfig {
    /// Whether there is enough media to run a session
    pub fn is_ready(&self) -> bool {
        !self.idle_videos.is_empty() && !self.main_videos.is_empty() && !self.santa_overlays.is_empty()
    }

    /// Preview window for a main video: its own override, else the global one
    pub fn window_for(&self, video: &MainVideo) -> VideoWindow {
        video
            .preview_visibility
            .unwrap_or_else(|| self.preview_visibility.window())
    }

    /// Preview quad for a main video: its own override, else the global one
    pub fn quad_for(&self, video: &MainVideo) -> Quad {
        video.preview_quad.unwrap_or(self.preview_quad)
    }

    pub fn main_video(&self, path: &str) -> Option<&MainVideo> {
        self.main_videos.iter().find(|v| v.path == path)
    }

    pub fn pool_len(&self, pool: MediaPool) -> usize {
        match pool {
            MediaPool::Idle => self.idle_videos.len(),
            MediaPool::Main => self.main_videos.len(),
            MediaPool::Overlay => self.santa_overlays.len(),
        }
    }

    /// Append a path to a pool. Returns false for blanks and duplicates.
    pub fn add_media(&mut self, pool: MediaPool, path: &str) -> bool {
        let path = path.trim();
        if path.is_empty() {
            return false;
        }
        match pool {
            MediaPool::Idle => push_unique(&mut self.idle_videos, path),
            MediaPool::Overlay => push_unique(&mut self.santa_overlays, path),
            MediaPool::Main => {
                if self.main_video(path).is_some() {
                    return false;
                }
                self.main_videos.push(MainVideo::new(path));
                true
            }
        }
    }

    /// Remove the entry at `index`. Returns false when out of range.
    pub fn remove_media(&mut self, pool: MediaPool, index: usize) -> bool {
        if index >= self.pool_len(pool) {
            return false;
        }
        match pool {
            MediaPool::Idle => {
                self.idle_videos.remove(index);
            }
            MediaPool::Main => {
                self.main_videos.remove(index);
            }
            MediaPool::Overlay => {
                self.santa_overlays.remove(index);
            }
        }
        true
    }

    /// Drag one corner of the global quad, or of a main video's own quad.
    ///
    /// Rectangle mode keeps the paper aspect ratio; free mode moves the
    /// single point. A video without its own quad starts from the global one.
    pub fn drag_handle(&mut self, video: Option<usize>, corner: Corner, pointer: Point) -> bool {
        let current = match video {
            None => self.preview_quad,
            Some(index) => match self.main_videos.get(index) {
                Some(entry) => self.quad_for(entry),
                None => return false,
            },
        };

        let next = match self.preview_shape {
            PreviewShape::Rectangle => {
                let aspect = quad::normalized_aspect(self.printer.aspect(), STAGE_WIDTH, STAGE_HEIGHT);
                quad::resize_rect(&current, corner, pointer, aspect)
            }
            PreviewShape::Free => quad::move_free_handle(&current, corner, pointer),
        };

        match video.and_then(|index| self.main_videos.get_mut(index)) {
            Some(entry) => entry.preview_quad = Some(next),
            None => self.preview_quad = next,
        }
        true
    }
}

fn push_unique(list: &mut Vec<String>, path: &str) -> bool {
    if list.iter().any(|p| p == path) {
        return false;
    }
    list.push(path.to_string());
    true
}

pub(crate) fn format_hhmm(time: NaiveTime) -> String {
    time.format("%H:%M").to_string()
}

/// Parse "H:MM" or "HH:MM"
pub(crate) fn parse_hhmm(value: &str) -> Option<NaiveTime> {
    let (hours, minutes) = value.trim().split_once(':')?;
    if hours.is_empty() || hours.len() > 2 || minutes.len() != 2 {
        return None;
    }
    if !hours.bytes().chain(minutes.bytes()).all(|b| b.is_ascii_digit()) {
        return None;
    }
    NaiveTime::from_hms_opt(hours.parse().ok()?, minutes.parse().ok()?, 0)
}

fn serialize_hhmm<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format_hhmm(*time))
}
