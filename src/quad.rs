//! Preview quad geometry and handle editing
//!
//! Quads live in normalized stage coordinates (0.0 to 1.0) and are ordered
//! clockwise from the top-left corner.

use serde::{Deserialize, Serialize};

/// Smallest edge a constrained rectangle may shrink to (normalized)
pub const MIN_RECT_EDGE: f64 = 0.02;

/// A 2D point with normalized coordinates (0.0 to 1.0)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Convert to pixel coordinates
    pub fn to_pixels(&self, width: f64, height: f64) -> (f64, f64) {
        (self.x * width, self.y * height)
    }

    pub fn clamped(self) -> Self {
        Self::new(self.x.clamp(0.0, 1.0), self.y.clamp(0.0, 1.0))
    }
}

/// Corner handle of a quad
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Corner {
    TopLeft = 0,
    TopRight = 1,
    BottomRight = 2,
    BottomLeft = 3,
}

impl Corner {
    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Corner::TopLeft),
            1 => Some(Corner::TopRight),
            2 => Some(Corner::BottomRight),
            3 => Some(Corner::BottomLeft),
            _ => None,
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Corner::TopLeft => Corner::BottomRight,
            Corner::TopRight => Corner::BottomLeft,
            Corner::BottomRight => Corner::TopLeft,
            Corner::BottomLeft => Corner::TopRight,
        }
    }

    /// Direction this corner points away from the rectangle's center
    fn outward(self) -> (f64, f64) {
        match self {
            Corner::TopLeft => (-1.0, -1.0),
            Corner::TopRight => (1.0, -1.0),
            Corner::BottomRight => (1.0, 1.0),
            Corner::BottomLeft => (-1.0, 1.0),
        }
    }
}

/// Four ordered points: top-left, top-right, bottom-right, bottom-left
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct Quad(pub [Point; 4]);

impl Quad {
    pub fn from_rect(rect: Rect) -> Self {
        let right = rect.x + rect.width;
        let bottom = rect.y + rect.height;
        Quad([
            Point::new(rect.x, rect.y),
            Point::new(right, rect.y),
            Point::new(right, bottom),
            Point::new(rect.x, bottom),
        ])
    }

    pub fn corner(&self, corner: Corner) -> Point {
        self.0[corner as usize]
    }

    /// Axis-aligned bounding rectangle of the four points
    pub fn bounding_rect(&self) -> Rect {
        let (mut min_x, mut min_y) = (f64::INFINITY, f64::INFINITY);
        let (mut max_x, mut max_y) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
        for p in &self.0 {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        Rect {
            x: min_x,
            y: min_y,
            width: max_x - min_x,
            height: max_y - min_y,
        }
    }

    /// Points scaled into pixel space
    pub fn to_pixels(&self, width: f64, height: f64) -> [(f64, f64); 4] {
        self.0.map(|p| p.to_pixels(width, height))
    }
}

/// Axis-aligned rectangle (origin + size)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Aspect ratio of the paper expressed in normalized stage units.
///
/// A rectangle that prints at `paper_aspect` on a `stage_width`x`stage_height`
/// stage has `width / height == paper_aspect / stage_ratio` once normalized.
pub fn normalized_aspect(paper_aspect: f64, stage_width: f64, stage_height: f64) -> f64 {
    let stage_ratio = stage_width / stage_height;
    (paper_aspect / stage_ratio).max(0.01)
}

/// Move a single handle of a free quad, clamping into the stage
pub fn move_free_handle(quad: &Quad, corner: Corner, pointer: Point) -> Quad {
    let mut next = *quad;
    next.0[corner as usize] = pointer.clamped();
    next
}

/// Resize a rectangle by dragging one corner while keeping the paper aspect.
///
/// The opposite corner stays fixed. The rectangle grows from that anchor
/// toward the pointer, then whichever side is too long for `aspect`
/// (width / height, normalized) is shrunk. The shorter side is never grown,
/// so the dragged extent is preserved on at least one axis. Near the stage
/// border the rectangle shrinks to fit, but never below [`MIN_RECT_EDGE`];
/// past that the anchor moves inward instead.
pub fn resize_rect(quad: &Quad, corner: Corner, pointer: Point, aspect: f64) -> Quad {
    let aspect = aspect.max(0.01);
    let rect = quad.bounding_rect();
    let anchor = Quad::from_rect(rect).corner(corner.opposite());
    let pointer = pointer.clamped();

    let (out_x, out_y) = corner.outward();
    let dir_x = direction(pointer.x - anchor.x, out_x);
    let dir_y = direction(pointer.y - anchor.y, out_y);

    let mut width = (pointer.x - anchor.x).abs();
    let mut height = (pointer.y - anchor.y).abs();

    if width > height * aspect {
        width = height * aspect;
    } else {
        height = width / aspect;
    }

    if width < MIN_RECT_EDGE {
        width = MIN_RECT_EDGE;
        height = width / aspect;
    }
    if height < MIN_RECT_EDGE {
        height = MIN_RECT_EDGE;
        width = height * aspect;
    }

    // Keep the rectangle on stage by scaling both sides together
    let room_x = if dir_x > 0.0 { 1.0 - anchor.x } else { anchor.x };
    let room_y = if dir_y > 0.0 { 1.0 - anchor.y } else { anchor.y };
    let min_scale = (MIN_RECT_EDGE / width).max(MIN_RECT_EDGE / height);
    let scale = (room_x / width).min(room_y / height).max(min_scale).min(1.0);
    width *= scale;
    height *= scale;

    let x = if dir_x > 0.0 {
        anchor.x.min(1.0 - width)
    } else {
        (anchor.x - width).max(0.0)
    };
    let y = if dir_y > 0.0 {
        anchor.y.min(1.0 - height)
    } else {
        (anchor.y - height).max(0.0)
    };

    let rect = Rect {
        x: x.clamp(0.0, 1.0),
        y: y.clamp(0.0, 1.0),
        width,
        height,
    };
    let mut quad = Quad::from_rect(rect);
    for p in quad.0.iter_mut() {
        *p = p.clamped();
    }
    quad
}

fn direction(delta: f64, fallback: f64) -> f64 {
    if delta > 0.0 {
        1.0
    } else if delta < 0.0 {
        -1.0
    } else {
        fallback
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect_quad(x: f64, y: f64, w: f64, h: f64) -> Quad {
        Quad::from_rect(Rect {
            x,
            y,
            width: w,
            height: h,
        })
    }

    #[test]
    fn test_point_conversion() {
        let p = Point::new(0.5, 0.25);
        let (px, py) = p.to_pixels(640.0, 480.0);
        assert_eq!(px, 320.0);
        assert_eq!(py, 120.0);
    }

    #[test]
    fn test_bounding_rect() {
        let quad = Quad([
            Point::new(0.2, 0.1),
            Point::new(0.8, 0.15),
            Point::new(0.7, 0.9),
            Point::new(0.1, 0.8),
        ]);
        let rect = quad.bounding_rect();
        assert!((rect.x - 0.1).abs() < 1e-12);
        assert!((rect.y - 0.1).abs() < 1e-12);
        assert!((rect.width - 0.7).abs() < 1e-12);
        assert!((rect.height - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_free_handle_clamps() {
        let quad = rect_quad(0.1, 0.1, 0.5, 0.5);
        let moved = move_free_handle(&quad, Corner::TopLeft, Point::new(1.5, -0.5));
        assert_eq!(moved.0[0], Point::new(1.0, 0.0));
        assert_eq!(moved.0[2], quad.0[2]);
    }

    #[test]
    fn test_resize_keeps_anchor_and_aspect() {
        let quad = rect_quad(0.2, 0.2, 0.3, 0.3);
        let resized = resize_rect(&quad, Corner::BottomRight, Point::new(0.9, 0.6), 1.5);
        let rect = resized.bounding_rect();
        // Anchor is the old top-left
        assert!((rect.x - 0.2).abs() < 1e-9);
        assert!((rect.y - 0.2).abs() < 1e-9);
        assert!((rect.width / rect.height - 1.5).abs() < 1e-9);
        // Width (0.7) was too long for height (0.4) and got shrunk
        assert!((rect.height - 0.4).abs() < 1e-9);
        assert!((rect.width - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_resize_toward_top_left() {
        let quad = rect_quad(0.3, 0.3, 0.4, 0.4);
        let resized = resize_rect(&quad, Corner::TopLeft, Point::new(0.1, 0.5), 1.0);
        let rect = resized.bounding_rect();
        // Anchor is bottom-right (0.7, 0.7); height 0.2 is the short side
        assert!((rect.x + rect.width - 0.7).abs() < 1e-9);
        assert!((rect.y + rect.height - 0.7).abs() < 1e-9);
        assert!((rect.width - 0.2).abs() < 1e-9);
        assert!((rect.height - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_resize_minimum_edge() {
        let quad = rect_quad(0.4, 0.4, 0.2, 0.2);
        let resized = resize_rect(&quad, Corner::BottomRight, Point::new(0.4, 0.4), 2.0);
        let rect = resized.bounding_rect();
        assert!(rect.width >= MIN_RECT_EDGE - 1e-12);
        assert!(rect.height >= MIN_RECT_EDGE - 1e-12);
        assert!((rect.width / rect.height - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_resize_stays_on_stage() {
        let quad = rect_quad(0.5, 0.5, 0.2, 0.2);
        let resized = resize_rect(&quad, Corner::BottomRight, Point::new(1.0, 1.0), 4.0);
        for p in &resized.0 {
            assert!((0.0..=1.0).contains(&p.x));
            assert!((0.0..=1.0).contains(&p.y));
        }
        let rect = resized.bounding_rect();
        assert!((rect.width / rect.height - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_resize_against_stage_border_keeps_minimum() {
        let cases = [
            // anchor corner near a border, dragged corner, pointer on that border
            (rect_quad(0.97, 0.97, 0.02, 0.02), Corner::TopLeft, Point::new(1.0, 1.0)),
            (rect_quad(0.01, 0.01, 0.02, 0.02), Corner::BottomRight, Point::new(0.0, 0.0)),
            (rect_quad(0.01, 0.97, 0.02, 0.02), Corner::TopRight, Point::new(0.0, 1.0)),
            (rect_quad(0.97, 0.01, 0.02, 0.02), Corner::BottomLeft, Point::new(1.0, 0.0)),
            (rect_quad(0.5, 0.985, 0.02, 0.005), Corner::TopLeft, Point::new(0.5, 1.0)),
            (rect_quad(0.985, 0.5, 0.005, 0.02), Corner::TopLeft, Point::new(1.0, 0.5)),
        ];
        for aspect in [0.5, 1.0, 3.0] {
            for (quad, corner, pointer) in &cases {
                let resized = resize_rect(quad, *corner, *pointer, aspect);
                for p in &resized.0 {
                    assert!((0.0..=1.0).contains(&p.x), "{:?} {:?}", corner, resized);
                    assert!((0.0..=1.0).contains(&p.y), "{:?} {:?}", corner, resized);
                }
                let rect = resized.bounding_rect();
                assert!(rect.width >= MIN_RECT_EDGE - 1e-9, "{:?} {:?}", corner, rect);
                assert!(rect.height >= MIN_RECT_EDGE - 1e-9, "{:?} {:?}", corner, rect);
                assert!((rect.width / rect.height - aspect).abs() < 1e-6, "{:?} {:?}", corner, rect);
            }
        }
    }

    #[test]
    fn test_resize_anchor_moves_inward_at_corner() {
        let quad = rect_quad(0.98, 0.98, 0.01, 0.01);
        let resized = resize_rect(&quad, Corner::TopLeft, Point::new(1.0, 1.0), 1.0);
        let rect = resized.bounding_rect();
        assert!((rect.width - MIN_RECT_EDGE).abs() < 1e-9);
        assert!((rect.x - 0.98).abs() < 1e-9);
        assert!((rect.x + rect.width - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_normalized_aspect() {
        // 3:2 paper on a 9:16 portrait stage
        let aspect = normalized_aspect(1.5, 1080.0, 1920.0);
        assert!((aspect - 1.5 / (1080.0 / 1920.0)).abs() < 1e-12);
    }
}
