//! Reconcile a partial document into a complete [`KioskConfig`]
//!
//! The steps run in a fixed order because later ones read earlier results:
//! the default quad depends on the printer section, per-video windows fall
//! back to the global window.

use std::collections::HashMap;

use chrono::NaiveTime;

use super::patch::{
    ConfigPatch, MainVideoEntryPatch, MainVideoPatch, PointPatch, PrinterPatch, RegionPatch,
    VisibilityPatch,
};
use super::{
    parse_hhmm, CaptureTiming, CropRect, KioskConfig, MainVideo, PreviewShape, PreviewVisibility,
    PrinterConfig, ResultScreen, VideoWindow, WorkingHours, MIN_AUTO_RESET_MS, MIN_CROP_EDGE,
    MAX_MS, MIN_PAPER_MM, MIN_WINDOW_MS, STAGE_HEIGHT, STAGE_WIDTH,
};
use crate::quad::{Point, Quad};

const DEFAULT_START_MS: u64 = 4000;
const DEFAULT_END_MS: u64 = 7500;
const DEFAULT_FRAME_RATE: f64 = 30.0;
const MAX_FRAME_RATE: f64 = 240.0;
const DEFAULT_AUTO_RESET_MS: u64 = 20_000;
const DEFAULT_CAPTURE_AT_MS: u64 = 8500;
const DEFAULT_PAPER_WIDTH_MM: f64 = 150.0;
const DEFAULT_PAPER_HEIGHT_MM: f64 = 100.0;

// Default preview rectangle: 75% of the stage height, 157px from the top
const DEFAULT_RECT_HEIGHT_RATIO: f64 = 0.75;
const DEFAULT_RECT_TOP_PX: f64 = 157.0;

fn default_open() -> NaiveTime {
    NaiveTime::from_hms_opt(9, 0, 0).unwrap_or_default()
}

fn default_close() -> NaiveTime {
    NaiveTime::from_hms_opt(21, 0, 0).unwrap_or_default()
}

/// Default quad for paper of the given width/height ratio, centered
/// horizontally and capped at the stage width
pub fn default_quad(paper_aspect: f64) -> Quad {
    let aspect = if paper_aspect.is_finite() { paper_aspect.max(0.01) } else { 1.5 };
    let normalized_aspect = aspect / (STAGE_WIDTH / STAGE_HEIGHT);
    let top = (DEFAULT_RECT_TOP_PX / STAGE_HEIGHT).clamp(0.0, 0.95);
    let max_height = 1.0 - top;

    let mut height = DEFAULT_RECT_HEIGHT_RATIO.min(max_height);
    let mut width = height * normalized_aspect;
    if width > 1.0 {
        height = (height / width).min(max_height);
        width = 1.0;
    }

    let left = ((1.0 - width) / 2.0).clamp(0.0, 1.0);
    let right = (left + width).clamp(0.0, 1.0);
    let bottom = (top + height).clamp(0.0, 1.0);
    Quad([
        Point::new(left, top),
        Point::new(right, top),
        Point::new(right, bottom),
        Point::new(left, bottom),
    ])
}

/// Milliseconds from a JSON number: negatives and NaN become 0, fractions
/// round, huge values stop at [`MAX_MS`]
fn to_ms(value: f64) -> u64 {
    value.max(0.0).min(MAX_MS as f64).round() as u64
}

/// Window start, leaving room for the shortest window below [`MAX_MS`]
fn window_start(value: u64) -> u64 {
    value.min(MAX_MS - MIN_WINDOW_MS)
}

/// Build the complete document. Idempotent through [`ConfigPatch::from`].
pub fn normalize(patch: &ConfigPatch) -> KioskConfig {
    // 1. Sections merged field by field over their defaults
    let visibility = patch.preview_visibility.clone().unwrap_or_default();
    let result_screen = patch.result_screen.clone().unwrap_or_default();
    let capture = patch.capture.clone().unwrap_or_default();
    let printer_patch = patch.printer.clone().unwrap_or_default();
    let hours = patch.working_hours.clone().unwrap_or_default();
    let crop = patch.camera_crop.clone().unwrap_or_default();

    let printer = PrinterConfig {
        device_name: printer_patch.device_name.as_deref().map(|s| s.trim().to_string()).unwrap_or_default(),
        paper_width_mm: paper_edge(printer_patch.paper_width_mm, DEFAULT_PAPER_WIDTH_MM),
        paper_height_mm: paper_edge(printer_patch.paper_height_mm, DEFAULT_PAPER_HEIGHT_MM),
        sheets_remaining: printer_patch
            .sheets_remaining
            .map(|n| n.max(0.0).min(u32::MAX as f64).round() as u32)
            .unwrap_or(0),
    };

    // 2 + 3. Active quad, clamped per axis
    let fallback = default_quad(DEFAULT_PAPER_WIDTH_MM / DEFAULT_PAPER_HEIGHT_MM);
    let preview_quad = match (&patch.preview_quad, &patch.preview_region) {
        (Some(points), _) if points.len() == 4 => clamp_quad(points, &fallback),
        (_, Some(region)) => clamp_quad(&region_corners(region), &fallback),
        _ => default_quad(raw_paper_aspect(&printer_patch)),
    };

    // 4. Timing
    let capture_at_ms = capture.capture_at_ms.map(to_ms);
    let start_ms = visibility
        .start_ms
        .or(capture.preview_at_ms)
        .map(to_ms)
        .map(window_start)
        .unwrap_or(DEFAULT_START_MS);
    let end_ms = visibility
        .end_ms
        .map(to_ms)
        .or(capture_at_ms)
        .unwrap_or(DEFAULT_END_MS)
        .max(start_ms.saturating_add(MIN_WINDOW_MS));
    let frame_rate = match visibility.frame_rate {
        Some(rate) if rate != 0.0 && !rate.is_nan() => rate.clamp(1.0, MAX_FRAME_RATE),
        _ => DEFAULT_FRAME_RATE,
    };
    let preview_visibility = PreviewVisibility {
        start_ms,
        end_ms,
        frame_rate,
    };

    // 5 + 6. Media pools and per-video overrides
    let idle_videos = dedup_paths(
        patch
            .idle_video
            .iter()
            .chain(patch.idle_videos.iter().flatten()),
    );
    let santa_overlays = dedup_paths(patch.santa_overlays.iter().flatten());
    let main_videos = normalize_main_videos(patch, &preview_visibility.window(), &fallback);

    // 7. Remaining clamps and coercions
    let auto_reset_ms = result_screen
        .auto_reset_ms
        .map(to_ms)
        .unwrap_or(DEFAULT_AUTO_RESET_MS)
        .max(MIN_AUTO_RESET_MS);

    let preview_shape = patch
        .preview_shape
        .as_deref()
        .and_then(PreviewShape::parse)
        .unwrap_or_default();

    let working_hours = WorkingHours {
        enabled: hours.enabled.unwrap_or(false),
        start: hours.start.as_deref().and_then(parse_hhmm).unwrap_or_else(default_open),
        end: hours.end.as_deref().and_then(parse_hhmm).unwrap_or_else(default_close),
    };

    let crop_width = crop_edge(crop.width);
    let crop_height = crop_edge(crop.height);
    let camera_crop = CropRect {
        x: crop_origin(crop.x, crop_width),
        y: crop_origin(crop.y, crop_height),
        width: crop_width,
        height: crop_height,
    };

    KioskConfig {
        idle_videos,
        main_videos,
        preview_quad,
        preview_shape,
        preview_visibility,
        result_screen: ResultScreen { auto_reset_ms },
        capture: CaptureTiming {
            capture_at_ms: capture_at_ms.unwrap_or(DEFAULT_CAPTURE_AT_MS),
        },
        printer,
        mirror_camera: patch.mirror_camera.unwrap_or(true),
        santa_overlays,
        backup_directory: patch
            .backup_directory
            .as_deref()
            .map(str::trim)
            .unwrap_or_default()
            .to_string(),
        working_hours,
        camera_crop,
    }
}

/// Paper ratio as given, before the edges are clamped to [`MIN_PAPER_MM`]
fn raw_paper_aspect(printer: &PrinterPatch) -> f64 {
    let width = printer.paper_width_mm.unwrap_or(DEFAULT_PAPER_WIDTH_MM);
    let height = printer.paper_height_mm.unwrap_or(DEFAULT_PAPER_HEIGHT_MM);
    if width > 0.0 && height > 0.0 {
        width / height
    } else {
        DEFAULT_PAPER_WIDTH_MM / DEFAULT_PAPER_HEIGHT_MM
    }
}

fn paper_edge(value: Option<f64>, default: f64) -> f64 {
    value.unwrap_or(default).max(MIN_PAPER_MM)
}

fn crop_edge(value: Option<f64>) -> f64 {
    value.filter(|v| !v.is_nan()).unwrap_or(1.0).clamp(MIN_CROP_EDGE, 1.0)
}

fn crop_origin(value: Option<f64>, edge: f64) -> f64 {
    value.filter(|v| !v.is_nan()).unwrap_or(0.0).clamp(0.0, 1.0 - edge)
}

fn region_corners(region: &RegionPatch) -> Vec<PointPatch> {
    let x = region.x.unwrap_or(0.0);
    let y = region.y.unwrap_or(0.0);
    let right = x + region.width.unwrap_or(1.0);
    let bottom = y + region.height.unwrap_or(1.0);
    [(x, y), (right, y), (right, bottom), (x, bottom)]
        .into_iter()
        .map(|(x, y)| PointPatch {
            x: Some(x),
            y: Some(y),
        })
        .collect()
}

/// Clamp four points into the unit square; missing axes come from `fallback`
fn clamp_quad(points: &[PointPatch], fallback: &Quad) -> Quad {
    let mut quad = *fallback;
    for (slot, (point, default)) in quad.0.iter_mut().zip(points.iter().zip(fallback.0.iter())) {
        *slot = Point::new(
            point.x.filter(|v| !v.is_nan()).unwrap_or(default.x).clamp(0.0, 1.0),
            point.y.filter(|v| !v.is_nan()).unwrap_or(default.y).clamp(0.0, 1.0),
        );
    }
    quad
}

/// Trim, drop blanks, keep the first occurrence of each path
fn dedup_paths<'a>(paths: impl Iterator<Item = &'a String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for path in paths {
        let path = path.trim();
        if !path.is_empty() && !out.iter().any(|p| p == path) {
            out.push(path.to_string());
        }
    }
    out
}

fn normalize_main_videos(patch: &ConfigPatch, global: &VideoWindow, fallback: &Quad) -> Vec<MainVideo> {
    let legacy = patch.main_video.clone().map(MainVideoPatch::Path);
    let mut out: Vec<MainVideo> = Vec::new();
    let mut seen: HashMap<String, usize> = HashMap::new();

    for item in patch.main_videos.iter().flatten().chain(legacy.iter()) {
        let Some(entry) = build_entry(item, global, fallback) else {
            continue;
        };
        match seen.get(&entry.path) {
            Some(&index) => {
                // Later duplicates only override the two per-video settings
                let existing = &mut out[index];
                if entry.preview_quad.is_some() {
                    existing.preview_quad = entry.preview_quad;
                }
                if entry.preview_visibility.is_some() {
                    existing.preview_visibility = entry.preview_visibility;
                }
            }
            None => {
                seen.insert(entry.path.clone(), out.len());
                out.push(entry);
            }
        }
    }
    out
}

fn build_entry(item: &MainVideoPatch, global: &VideoWindow, fallback: &Quad) -> Option<MainVideo> {
    match item {
        MainVideoPatch::Path(path) => {
            let path = path.trim();
            (!path.is_empty()).then(|| MainVideo::new(path))
        }
        MainVideoPatch::Entry(MainVideoEntryPatch {
            path,
            preview_quad,
            preview_visibility,
        }) => {
            let path = path.as_deref().map(str::trim).filter(|p| !p.is_empty())?;
            Some(MainVideo {
                path: path.to_string(),
                preview_quad: preview_quad
                    .as_ref()
                    .filter(|points| points.len() == 4)
                    .map(|points| clamp_quad(points, fallback)),
                preview_visibility: preview_visibility
                    .as_ref()
                    .and_then(|window| normalize_window(window, global)),
            })
        }
    }
}

/// A per-video window counts only when it sets at least one edge
fn normalize_window(window: &VisibilityPatch, global: &VideoWindow) -> Option<VideoWindow> {
    if window.start_ms.is_none() && window.end_ms.is_none() {
        return None;
    }
    let start_ms = window_start(window.start_ms.map(to_ms).unwrap_or(global.start_ms));
    let min_end = start_ms.saturating_add(MIN_WINDOW_MS);
    let end_ms = window.end_ms.map(to_ms).unwrap_or(global.end_ms).max(min_end);
    Some(VideoWindow { start_ms, end_ms })
}

#[cfg(test)]
mod tests {
    use super::super::patch::{CapturePatch, CropPatch, ResultScreenPatch};
    use super::*;

    fn from_json(json: &str) -> KioskConfig {
        normalize(&ConfigPatch::from_json(json).unwrap())
    }

    fn renormalize(config: &KioskConfig) -> KioskConfig {
        normalize(&ConfigPatch::from(config))
    }

    fn assert_quad_in_unit_square(quad: &Quad) {
        for p in &quad.0 {
            assert!((0.0..=1.0).contains(&p.x), "x out of range: {:?}", quad);
            assert!((0.0..=1.0).contains(&p.y), "y out of range: {:?}", quad);
        }
    }

    const SAMPLES: &[&str] = &[
        "{}",
        r#"{"previewVisibility": {"startMs": 9000, "endMs": 100}}"#,
        r#"{"previewVisibility": {"startMs": -50, "frameRate": 1000}, "capture": {"captureAtMs": 6000}}"#,
        r#"{"previewQuad": [{"x": -1, "y": 2}, {"x": "a"}, {"x": 0.5, "y": 0.5}, {"x": 1.5, "y": 0.2}]}"#,
        r#"{"previewRegion": {"x": 0.8, "y": 0.1, "width": 0.5}}"#,
        r#"{"idleVideo": "b.mp4", "idleVideos": ["a.mp4", "b.mp4", " a.mp4 ", ""],
            "mainVideo": "m1.mp4",
            "mainVideos": ["m1.mp4", {"path": "m2.mp4", "previewVisibility": {"endMs": 50},
                           "previewQuad": [{"x": 2, "y": -1}, {"x": 1, "y": 0}, {"x": 1, "y": 1}, {"x": 0, "y": 1}]},
                           {"path": "m1.mp4", "previewVisibility": {"startMs": 100}}]}"#,
        r#"{"printer": {"paperWidthMm": 10, "paperHeightMm": 400, "sheetsRemaining": -3},
            "resultScreen": {"autoResetMs": 10}, "mirrorCamera": 0, "previewShape": "hexagon",
            "workingHours": {"enabled": true, "start": "7:30", "end": "25:00"},
            "cameraCrop": {"x": 0.99, "y": -1, "width": 0.01, "height": 2}}"#,
        r#"{"santaOverlays": "one.png", "backupDirectory": "  /var/backup  "}"#,
        r#"{"previewVisibility": {"startMs": 1e20}, "resultScreen": {"autoResetMs": 1e300},
            "capture": {"captureAtMs": 1e19},
            "mainVideos": [{"path": "a.mp4", "previewVisibility": {"startMs": 1e20, "endMs": -1e20}},
                           {"path": "b.mp4", "previewVisibility": {"endMs": 1e308}}]}"#,
        r#"{"previewVisibility": {"startMs": -1e308, "endMs": 1e20, "frameRate": -1e300}}"#,
    ];

    #[test]
    fn test_idempotence() {
        for json in SAMPLES {
            let once = from_json(json);
            let twice = renormalize(&once);
            assert_eq!(once, twice, "not idempotent for {}", json);
        }
    }

    #[test]
    fn test_quads_clamped_global_and_per_video() {
        for json in SAMPLES {
            let config = from_json(json);
            assert_quad_in_unit_square(&config.preview_quad);
            for video in &config.main_videos {
                if let Some(quad) = &video.preview_quad {
                    assert_quad_in_unit_square(quad);
                }
            }
        }
    }

    #[test]
    fn test_timing_invariant_global_and_per_video() {
        for json in SAMPLES {
            let config = from_json(json);
            let vis = config.preview_visibility;
            assert!(vis.end_ms >= vis.start_ms + MIN_WINDOW_MS, "{}", json);
            assert!(vis.end_ms <= MAX_MS, "{}", json);
            assert!((1.0..=240.0).contains(&vis.frame_rate));
            assert!(config.result_screen.auto_reset_ms >= MIN_AUTO_RESET_MS);
            assert!(config.result_screen.auto_reset_ms <= MAX_MS);
            for video in &config.main_videos {
                if let Some(w) = video.preview_visibility {
                    assert!(w.end_ms >= w.start_ms + MIN_WINDOW_MS, "{}", json);
                    assert!(w.end_ms <= MAX_MS, "{}", json);
                }
            }
        }
    }

    #[test]
    fn test_huge_timings_capped() {
        let config = from_json(SAMPLES[8]);
        let vis = config.preview_visibility;
        assert_eq!(vis.start_ms, MAX_MS - MIN_WINDOW_MS);
        assert_eq!(vis.end_ms, MAX_MS);
        assert_eq!(config.result_screen.auto_reset_ms, MAX_MS);
        assert_eq!(config.capture.capture_at_ms, MAX_MS);
        assert_eq!(
            config.main_videos[0].preview_visibility,
            Some(VideoWindow {
                start_ms: MAX_MS - MIN_WINDOW_MS,
                end_ms: MAX_MS
            })
        );

        let config = from_json(SAMPLES[9]);
        assert_eq!(config.preview_visibility.start_ms, 0);
        assert_eq!(config.preview_visibility.end_ms, MAX_MS);
        assert_eq!(config.preview_visibility.frame_rate, 1.0);
    }

    #[test]
    fn test_non_finite_timings() {
        for value in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let visibility = VisibilityPatch {
                start_ms: Some(value),
                end_ms: Some(value),
                frame_rate: Some(value),
            };
            let patch = ConfigPatch {
                preview_visibility: Some(visibility.clone()),
                result_screen: Some(ResultScreenPatch {
                    auto_reset_ms: Some(value),
                }),
                capture: Some(CapturePatch {
                    capture_at_ms: Some(value),
                    preview_at_ms: Some(value),
                }),
                main_videos: Some(vec![MainVideoPatch::Entry(MainVideoEntryPatch {
                    path: Some("a.mp4".to_string()),
                    preview_quad: None,
                    preview_visibility: Some(visibility),
                })]),
                camera_crop: Some(CropPatch {
                    x: Some(value),
                    y: Some(value),
                    width: Some(value),
                    height: Some(value),
                }),
                ..ConfigPatch::default()
            };
            let config = normalize(&patch);
            let vis = config.preview_visibility;
            assert!(vis.end_ms >= vis.start_ms + MIN_WINDOW_MS, "{}", value);
            assert!(vis.end_ms <= MAX_MS, "{}", value);
            assert!((1.0..=240.0).contains(&vis.frame_rate), "{}", value);
            assert!(config.result_screen.auto_reset_ms >= MIN_AUTO_RESET_MS);
            let w = config.main_videos[0].preview_visibility.unwrap();
            assert!(w.end_ms >= w.start_ms + MIN_WINDOW_MS, "{}", value);
            let crop = config.camera_crop;
            assert!(crop.width >= MIN_CROP_EDGE && crop.width <= 1.0);
            assert!(crop.x >= 0.0 && crop.x + crop.width <= 1.0 + 1e-12);
            assert_eq!(config, renormalize(&config), "{}", value);
        }
    }

    #[test]
    fn test_defaults() {
        let config = KioskConfig::default();
        assert_eq!(config.preview_visibility.start_ms, 4000);
        assert_eq!(config.preview_visibility.end_ms, 7500);
        assert_eq!(config.preview_visibility.frame_rate, 30.0);
        assert_eq!(config.result_screen.auto_reset_ms, 20_000);
        assert_eq!(config.capture.capture_at_ms, 8500);
        assert_eq!(config.printer.paper_width_mm, 150.0);
        assert_eq!(config.printer.paper_height_mm, 100.0);
        assert!(config.mirror_camera);
        assert_eq!(config.preview_shape, PreviewShape::Rectangle);
        assert!(!config.working_hours.enabled);
        assert!(config.camera_crop.is_full_frame());
    }

    #[test]
    fn test_default_quad_follows_paper() {
        let quad = default_quad(1.5);
        let top = 157.0 / 1920.0;
        // 3:2 landscape paper is too wide for a 75% tall rect on a portrait stage
        assert!((quad.0[1].x - quad.0[0].x - 1.0).abs() < 1e-9);
        assert!((quad.0[0].y - top).abs() < 1e-9);

        let portrait = default_quad(100.0 / 150.0);
        let rect = portrait.bounding_rect();
        assert!((rect.height - 0.75).abs() < 1e-9);
        assert!((rect.x + rect.width / 2.0 - 0.5).abs() < 1e-9);

        let config = from_json(r#"{"printer": {"paperWidthMm": 100, "paperHeightMm": 150}}"#);
        assert_eq!(config.preview_quad, portrait);
    }

    #[test]
    fn test_default_quad_uses_paper_before_clamp() {
        // 10x400 mm clamps to 50x400 mm, but the quad keeps the 1:40 ratio
        let config = from_json(r#"{"printer": {"paperWidthMm": 10, "paperHeightMm": 400}}"#);
        assert_eq!(config.printer.paper_width_mm, 50.0);
        assert_eq!(config.preview_quad, default_quad(10.0 / 400.0));

        let config = from_json(r#"{"printer": {"paperWidthMm": -5}}"#);
        assert_eq!(config.preview_quad, default_quad(1.5));
    }

    #[test]
    fn test_legacy_timing_fields() {
        let config = from_json(r#"{"capture": {"previewAtMs": 2000, "captureAtMs": 3000}}"#);
        assert_eq!(config.preview_visibility.start_ms, 2000);
        assert_eq!(config.preview_visibility.end_ms, 3000);

        let config = from_json(r#"{"previewVisibility": {"startMs": 9000}}"#);
        assert_eq!(config.preview_visibility.end_ms, 9250);

        let config = from_json(r#"{"previewVisibility": {"frameRate": 0}}"#);
        assert_eq!(config.preview_visibility.frame_rate, 30.0);
    }

    #[test]
    fn test_legacy_region_converted() {
        let config = from_json(r#"{"previewRegion": {"x": 0.1, "y": 0.2, "width": 0.5, "height": 0.3}}"#);
        let rect = config.preview_quad.bounding_rect();
        assert!((rect.x - 0.1).abs() < 1e-12);
        assert!((rect.y - 0.2).abs() < 1e-12);
        assert!((rect.width - 0.5).abs() < 1e-12);
        assert!((rect.height - 0.3).abs() < 1e-12);
    }

    #[test]
    fn test_quad_with_wrong_length_ignored() {
        let config = from_json(r#"{"previewQuad": [{"x": 0, "y": 0}]}"#);
        assert_eq!(config.preview_quad, KioskConfig::default().preview_quad);
    }

    #[test]
    fn test_non_numeric_axis_uses_default_point() {
        let config = from_json(
            r#"{"previewQuad": [{"x": "left", "y": 0.0}, {"x": 1, "y": 0}, {"x": 1, "y": 1}, {"x": 0, "y": 1}]}"#,
        );
        let fallback = default_quad(1.5);
        assert_eq!(config.preview_quad.0[0], Point::new(fallback.0[0].x, 0.0));
    }

    #[test]
    fn test_media_dedup() {
        let config = from_json(SAMPLES[5]);
        assert_eq!(config.idle_videos, vec!["b.mp4", "a.mp4"]);
        let paths: Vec<_> = config.main_videos.iter().map(|v| v.path.as_str()).collect();
        assert_eq!(paths, vec!["m1.mp4", "m2.mp4"]);

        // Duplicate m1 contributed its window only
        let m1 = &config.main_videos[0];
        assert_eq!(m1.preview_quad, None);
        assert_eq!(
            m1.preview_visibility,
            Some(VideoWindow {
                start_ms: 100,
                end_ms: 7500
            })
        );

        let m2 = &config.main_videos[1];
        assert_eq!(
            m2.preview_visibility,
            Some(VideoWindow {
                start_ms: 4000,
                end_ms: 4250
            })
        );
        assert_eq!(m2.preview_quad.map(|q| q.0[0]), Some(Point::new(1.0, 0.0)));
    }

    #[test]
    fn test_window_without_edges_is_dropped() {
        let config = from_json(r#"{"mainVideos": [{"path": "a.mp4", "previewVisibility": {"frameRate": 25}}]}"#);
        assert_eq!(config.main_videos[0].preview_visibility, None);
    }

    #[test]
    fn test_clamps_and_coercions() {
        let config = from_json(SAMPLES[6]);
        assert_eq!(config.printer.paper_width_mm, 50.0);
        assert_eq!(config.printer.paper_height_mm, 400.0);
        assert_eq!(config.printer.sheets_remaining, 0);
        assert_eq!(config.result_screen.auto_reset_ms, 5000);
        assert!(config.mirror_camera);
        assert_eq!(config.preview_shape, PreviewShape::Rectangle);
        assert!(config.working_hours.enabled);
        assert_eq!(config.working_hours.start, NaiveTime::from_hms_opt(7, 30, 0).unwrap());
        assert_eq!(config.working_hours.end, NaiveTime::from_hms_opt(21, 0, 0).unwrap());

        let crop = config.camera_crop;
        assert_eq!(crop.width, 0.05);
        assert_eq!(crop.height, 1.0);
        assert!((crop.x - 0.95).abs() < 1e-12);
        assert_eq!(crop.y, 0.0);
    }

    #[test]
    fn test_strings_trimmed() {
        let config = from_json(SAMPLES[7]);
        assert_eq!(config.backup_directory, "/var/backup");
        assert_eq!(config.santa_overlays, vec!["one.png"]);
    }
}
