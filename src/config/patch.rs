//! Partial configuration documents
//!
//! Every field is optional and every leaf is parsed leniently: a value of the
//! wrong JSON type reads as absent instead of failing the whole document.
//! Nested sections merge field by field when patches are layered.

use serde::de::{Deserializer, IgnoredAny};
use serde::Deserialize;

use super::KioskConfig;

/// A value that either parses as `T` or is skipped
#[derive(Deserialize)]
#[serde(untagged)]
enum Loose<T> {
    Valid(T),
    Invalid(IgnoredAny),
}

impl<T> Loose<T> {
    fn into_option(self) -> Option<T> {
        match self {
            Loose::Valid(v) => Some(v),
            Loose::Invalid(_) => None,
        }
    }
}

fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Loose<T>>::deserialize(deserializer)?.and_then(Loose::into_option))
}

/// A path list; a single string is accepted as a one-element list and
/// non-string items are dropped
fn string_list<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        One(String),
        Many(Vec<Loose<String>>),
        Other(IgnoredAny),
    }

    Ok(match Option::<Repr>::deserialize(deserializer)? {
        Some(Repr::One(s)) => Some(vec![s]),
        Some(Repr::Many(items)) => Some(items.into_iter().filter_map(Loose::into_option).collect()),
        Some(Repr::Other(_)) | None => None,
    })
}

/// Quad corners; non-object corners keep their slot with both axes absent
fn point_list<'de, D>(deserializer: D) -> Result<Option<Vec<PointPatch>>, D::Error>
where
    D: Deserializer<'de>,
{
    let items: Option<Vec<Loose<PointPatch>>> = lenient(deserializer)?;
    Ok(items.map(|items| {
        items
            .into_iter()
            .map(|p| p.into_option().unwrap_or_default())
            .collect()
    }))
}

fn main_video_list<'de, D>(deserializer: D) -> Result<Option<Vec<MainVideoPatch>>, D::Error>
where
    D: Deserializer<'de>,
{
    let items: Option<Vec<Loose<MainVideoPatch>>> = lenient(deserializer)?;
    Ok(items.map(|items| items.into_iter().filter_map(Loose::into_option).collect()))
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PointPatch {
    #[serde(default, deserialize_with = "lenient")]
    pub x: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    pub y: Option<f64>,
}

/// Legacy axis-aligned preview region
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RegionPatch {
    #[serde(default, deserialize_with = "lenient")]
    pub x: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    pub y: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    pub width: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    pub height: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisibilityPatch {
    #[serde(default, deserialize_with = "lenient")]
    pub start_ms: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    pub end_ms: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    pub frame_rate: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultScreenPatch {
    #[serde(default, deserialize_with = "lenient")]
    pub auto_reset_ms: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapturePatch {
    #[serde(default, deserialize_with = "lenient")]
    pub capture_at_ms: Option<f64>,
    /// Legacy start of the preview window
    #[serde(default, deserialize_with = "lenient")]
    pub preview_at_ms: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrinterPatch {
    #[serde(default, deserialize_with = "lenient")]
    pub device_name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub paper_width_mm: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    pub paper_height_mm: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    pub sheets_remaining: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct WorkingHoursPatch {
    #[serde(default, deserialize_with = "lenient")]
    pub enabled: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    pub start: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub end: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CropPatch {
    #[serde(default, deserialize_with = "lenient")]
    pub x: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    pub y: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    pub width: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    pub height: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MainVideoEntryPatch {
    #[serde(default, deserialize_with = "lenient")]
    pub path: Option<String>,
    #[serde(default, deserialize_with = "point_list")]
    pub preview_quad: Option<Vec<PointPatch>>,
    #[serde(default, deserialize_with = "lenient")]
    pub preview_visibility: Option<VisibilityPatch>,
}

/// A main video given either as a bare path or as an entry object
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum MainVideoPatch {
    Path(String),
    Entry(MainVideoEntryPatch),
}

/// A partial configuration document
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigPatch {
    /// Legacy single idle video
    #[serde(default, deserialize_with = "lenient")]
    pub idle_video: Option<String>,
    /// Legacy single main video
    #[serde(default, deserialize_with = "lenient")]
    pub main_video: Option<String>,
    #[serde(default, deserialize_with = "string_list")]
    pub idle_videos: Option<Vec<String>>,
    #[serde(default, deserialize_with = "main_video_list")]
    pub main_videos: Option<Vec<MainVideoPatch>>,
    #[serde(default, deserialize_with = "point_list")]
    pub preview_quad: Option<Vec<PointPatch>>,
    #[serde(default, deserialize_with = "lenient")]
    pub preview_region: Option<RegionPatch>,
    #[serde(default, deserialize_with = "lenient")]
    pub preview_shape: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub preview_visibility: Option<VisibilityPatch>,
    #[serde(default, deserialize_with = "lenient")]
    pub result_screen: Option<ResultScreenPatch>,
    #[serde(default, deserialize_with = "lenient")]
    pub capture: Option<CapturePatch>,
    #[serde(default, deserialize_with = "lenient")]
    pub printer: Option<PrinterPatch>,
    #[serde(default, deserialize_with = "lenient")]
    pub mirror_camera: Option<bool>,
    #[serde(default, deserialize_with = "string_list")]
    pub santa_overlays: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient")]
    pub backup_directory: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub working_hours: Option<WorkingHoursPatch>,
    #[serde(default, deserialize_with = "lenient")]
    pub camera_crop: Option<CropPatch>,
}

/// Field-level layering of one patch over another
trait Layer: Sized {
    fn layer(self, over: Self) -> Self;
}

fn layer_section<T: Layer>(base: Option<T>, over: Option<T>) -> Option<T> {
    match (base, over) {
        (Some(base), Some(over)) => Some(base.layer(over)),
        (base, over) => over.or(base),
    }
}

impl Layer for VisibilityPatch {
    fn layer(self, over: Self) -> Self {
        Self {
            start_ms: over.start_ms.or(self.start_ms),
            end_ms: over.end_ms.or(self.end_ms),
            frame_rate: over.frame_rate.or(self.frame_rate),
        }
    }
}

impl Layer for ResultScreenPatch {
    fn layer(self, over: Self) -> Self {
        Self {
            auto_reset_ms: over.auto_reset_ms.or(self.auto_reset_ms),
        }
    }
}

impl Layer for CapturePatch {
    fn layer(self, over: Self) -> Self {
        Self {
            capture_at_ms: over.capture_at_ms.or(self.capture_at_ms),
            preview_at_ms: over.preview_at_ms.or(self.preview_at_ms),
        }
    }
}

impl Layer for PrinterPatch {
    fn layer(self, over: Self) -> Self {
        Self {
            device_name: over.device_name.or(self.device_name),
            paper_width_mm: over.paper_width_mm.or(self.paper_width_mm),
            paper_height_mm: over.paper_height_mm.or(self.paper_height_mm),
            sheets_remaining: over.sheets_remaining.or(self.sheets_remaining),
        }
    }
}

impl Layer for WorkingHoursPatch {
    fn layer(self, over: Self) -> Self {
        Self {
            enabled: over.enabled.or(self.enabled),
            start: over.start.or(self.start),
            end: over.end.or(self.end),
        }
    }
}

impl Layer for CropPatch {
    fn layer(self, over: Self) -> Self {
        Self {
            x: over.x.or(self.x),
            y: over.y.or(self.y),
            width: over.width.or(self.width),
            height: over.height.or(self.height),
        }
    }
}

impl ConfigPatch {
    /// Parse a stored or submitted document
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    /// Layer `over` on top of `self`.
    ///
    /// Top-level fields are replaced when `over` sets them; nested sections
    /// are merged field by field. Lists and quads are replaced whole.
    pub fn overlay(self, over: ConfigPatch) -> ConfigPatch {
        ConfigPatch {
            idle_video: over.idle_video.or(self.idle_video),
            main_video: over.main_video.or(self.main_video),
            idle_videos: over.idle_videos.or(self.idle_videos),
            main_videos: over.main_videos.or(self.main_videos),
            preview_quad: over.preview_quad.or(self.preview_quad),
            preview_region: over.preview_region.or(self.preview_region),
            preview_shape: over.preview_shape.or(self.preview_shape),
            preview_visibility: layer_section(self.preview_visibility, over.preview_visibility),
            result_screen: layer_section(self.result_screen, over.result_screen),
            capture: layer_section(self.capture, over.capture),
            printer: layer_section(self.printer, over.printer),
            mirror_camera: over.mirror_camera.or(self.mirror_camera),
            santa_overlays: over.santa_overlays.or(self.santa_overlays),
            backup_directory: over.backup_directory.or(self.backup_directory),
            working_hours: layer_section(self.working_hours, over.working_hours),
            camera_crop: layer_section(self.camera_crop, over.camera_crop),
        }
    }
}

fn points_of(quad: &crate::quad::Quad) -> Vec<PointPatch> {
    quad.0
        .iter()
        .map(|p| PointPatch {
            x: Some(p.x),
            y: Some(p.y),
        })
        .collect()
}

impl From<&KioskConfig> for ConfigPatch {
    fn from(config: &KioskConfig) -> Self {
        let main_videos = config
            .main_videos
            .iter()
            .map(|video| {
                MainVideoPatch::Entry(MainVideoEntryPatch {
                    path: Some(video.path.clone()),
                    preview_quad: video.preview_quad.as_ref().map(points_of),
                    preview_visibility: video.preview_visibility.map(|w| VisibilityPatch {
                        start_ms: Some(w.start_ms as f64),
                        end_ms: Some(w.end_ms as f64),
                        frame_rate: None,
                    }),
                })
            })
            .collect();

        ConfigPatch {
            idle_video: None,
            main_video: None,
            idle_videos: Some(config.idle_videos.clone()),
            main_videos: Some(main_videos),
            preview_quad: Some(points_of(&config.preview_quad)),
            preview_region: None,
            preview_shape: Some(config.preview_shape.as_str().to_string()),
            preview_visibility: Some(VisibilityPatch {
                start_ms: Some(config.preview_visibility.start_ms as f64),
                end_ms: Some(config.preview_visibility.end_ms as f64),
                frame_rate: Some(config.preview_visibility.frame_rate),
            }),
            result_screen: Some(ResultScreenPatch {
                auto_reset_ms: Some(config.result_screen.auto_reset_ms as f64),
            }),
            capture: Some(CapturePatch {
                capture_at_ms: Some(config.capture.capture_at_ms as f64),
                preview_at_ms: None,
            }),
            printer: Some(PrinterPatch {
                device_name: Some(config.printer.device_name.clone()),
                paper_width_mm: Some(config.printer.paper_width_mm),
                paper_height_mm: Some(config.printer.paper_height_mm),
                sheets_remaining: Some(config.printer.sheets_remaining as f64),
            }),
            mirror_camera: Some(config.mirror_camera),
            santa_overlays: Some(config.santa_overlays.clone()),
            backup_directory: Some(config.backup_directory.clone()),
            working_hours: Some(WorkingHoursPatch {
                enabled: Some(config.working_hours.enabled),
                start: Some(super::format_hhmm(config.working_hours.start)),
                end: Some(super::format_hhmm(config.working_hours.end)),
            }),
            camera_crop: Some(CropPatch {
                x: Some(config.camera_crop.x),
                y: Some(config.camera_crop.y),
                width: Some(config.camera_crop.width),
                height: Some(config.camera_crop.height),
            }),
        }
    }
}
