//! Note callout ("bubble") layout with edge avoidance

use chartnotes_shared::truncate_chars;
use serde::{Deserialize, Serialize};

/// Horizontal pixels budgeted per note character
pub const CHAR_WIDTH: f64 = 7.0;
pub const MIN_BOX_WIDTH: f64 = 60.0;
pub const MAX_BOX_WIDTH: f64 = 220.0;
pub const BOX_HEIGHT: f64 = 28.0;
/// Gap between the box bottom and the anchor
pub const VERTICAL_GAP: f64 = 18.0;
pub const LEFT_INSET: f64 = 10.0;
pub const RIGHT_INSET: f64 = 10.0;
/// Half of the pointer triangle's base
pub const POINTER_HALF_BASE: f64 = 6.0;
/// Visible characters before the label is cut with an ellipsis
pub const DISPLAY_CAP: usize = 28;
pub const ELLIPSIS: &str = "...";

/// Callout geometry for one annotated point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationBox {
    pub point_id: i64,
    pub anchor_x: f64,
    pub anchor_y: f64,
    pub box_x: f64,
    pub box_y: f64,
    pub width: f64,
    pub height: f64,
    /// Signed distance from the box centre to the anchor along x
    pub pointer_offset: f64,
    pub display_text: String,
    /// Unabbreviated note for the tooltip surface
    pub full_text: String,
}

/// Triangle joining the box bottom edge to the anchor
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointerTriangle {
    pub base_left: (f64, f64),
    pub base_right: (f64, f64),
    pub tip: (f64, f64),
}

impl AnnotationBox {
    pub fn center_x(&self) -> f64 {
        self.box_x + self.width / 2.0
    }

    pub fn bottom(&self) -> f64 {
        self.box_y + self.height
    }

    pub fn pointer(&self) -> PointerTriangle {
        let base_x = self.center_x() + self.pointer_offset;
        let base_y = self.bottom();
        PointerTriangle {
            base_left: (base_x - POINTER_HALF_BASE, base_y),
            base_right: (base_x + POINTER_HALF_BASE, base_y),
            tip: (self.anchor_x, self.anchor_y),
        }
    }
}

/// Lay out the callout for a note anchored at `(cx, cy)`.
///
/// Returns `None` for a blank note or a non-finite anchor. The box always
/// satisfies `LEFT_INSET <= box_x` and `box_x + width <= viewport_width - RIGHT_INSET`.
pub fn layout_annotation(
    point_id: i64,
    (cx, cy): (f64, f64),
    note: &str,
    viewport_width: f64,
) -> Option<AnnotationBox> {
    if note.trim().is_empty() || !cx.is_finite() || !cy.is_finite() {
        return None;
    }

    let chars = note.chars().count();
    let usable = (viewport_width - LEFT_INSET - RIGHT_INSET).max(0.0);
    let width = (chars as f64 * CHAR_WIDTH)
        .clamp(MIN_BOX_WIDTH, MAX_BOX_WIDTH)
        .min(usable);

    let mut box_x = cx - width / 2.0;
    let right_limit = viewport_width - RIGHT_INSET;
    if box_x < LEFT_INSET {
        box_x = LEFT_INSET;
    } else if box_x + width > right_limit {
        box_x = right_limit - width;
    }

    Some(AnnotationBox {
        point_id,
        anchor_x: cx,
        anchor_y: cy,
        box_x,
        box_y: cy - BOX_HEIGHT - VERTICAL_GAP,
        width,
        height: BOX_HEIGHT,
        pointer_offset: cx - (box_x + width / 2.0),
        display_text: display_text(note),
        full_text: note.to_string(),
    })
}

/// Label shown inside the box; long notes keep their first [`DISPLAY_CAP`] chars
pub fn display_text(note: &str) -> String {
    if note.chars().count() > DISPLAY_CAP {
        format!("{}{}", truncate_chars(note, DISPLAY_CAP), ELLIPSIS)
    } else {
        note.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WIDTH: f64 = 800.0;

    #[test]
    fn test_centered_when_room() {
        let b = layout_annotation(1, (400.0, 200.0), "hello", WIDTH).unwrap();
        assert_eq!(b.width, MIN_BOX_WIDTH);
        assert_eq!(b.box_x, 400.0 - MIN_BOX_WIDTH / 2.0);
        assert_eq!(b.pointer_offset, 0.0);
        assert_eq!(b.box_y, 200.0 - BOX_HEIGHT - VERTICAL_GAP);
    }

    #[test]
    fn test_width_clamps() {
        let wide = layout_annotation(1, (400.0, 200.0), &"x".repeat(100), WIDTH).unwrap();
        assert_eq!(wide.width, MAX_BOX_WIDTH);
        let mid = layout_annotation(1, (400.0, 200.0), &"x".repeat(20), WIDTH).unwrap();
        assert_eq!(mid.width, 140.0);
    }

    #[test]
    fn test_left_edge_shift() {
        let b = layout_annotation(1, (20.0, 100.0), &"x".repeat(20), WIDTH).unwrap();
        assert_eq!(b.box_x, LEFT_INSET);
        // Pointer travels left from the box centre back to the anchor
        assert_eq!(b.pointer_offset, 20.0 - (LEFT_INSET + 70.0));
        assert!(b.pointer_offset < 0.0);
    }

    #[test]
    fn test_right_edge_shift() {
        let b = layout_annotation(1, (790.0, 100.0), &"x".repeat(20), WIDTH).unwrap();
        assert_eq!(b.box_x + b.width, WIDTH - RIGHT_INSET);
        assert!(b.pointer_offset > 0.0);
        assert_eq!(b.center_x() + b.pointer_offset, 790.0);
    }

    #[test]
    fn test_box_stays_inside_insets_across_viewport() {
        for width in [120.0, 240.0, 800.0] {
            let mut cx = 0.0;
            while cx <= width {
                for len in [1, 12, 30] {
                    let b = layout_annotation(1, (cx, 150.0), &"n".repeat(len), width).unwrap();
                    assert!(b.box_x >= LEFT_INSET - 1e-9, "cx={cx} width={width}");
                    assert!(b.box_x + b.width <= width - RIGHT_INSET + 1e-9);
                }
                cx += 7.5;
            }
        }
    }

    #[test]
    fn test_pointer_tip_tracks_anchor() {
        for cx in [0.0, 15.0, 400.0, 795.0] {
            let b = layout_annotation(9, (cx, 321.5), "edge note", WIDTH).unwrap();
            let pointer = b.pointer();
            assert_eq!(pointer.tip, (cx, 321.5));
            assert_eq!(pointer.base_left.1, b.bottom());
            assert!((pointer.base_left.0 + POINTER_HALF_BASE - cx).abs() < 1e-9);
        }
    }

    #[test]
    fn test_display_truncation() {
        let note = "abcdefghijklmnopqrstuvwxyz0123456789"[..35].to_string();
        let b = layout_annotation(1, (400.0, 200.0), &note, WIDTH).unwrap();
        assert_eq!(b.display_text.chars().count(), DISPLAY_CAP + ELLIPSIS.len());
        assert!(b.display_text.starts_with(&note[..28]));
        assert!(b.display_text.ends_with("..."));
        assert_eq!(b.full_text, note);

        assert_eq!(display_text(&"y".repeat(28)), "y".repeat(28));
    }

    #[test]
    fn test_skips_blank_and_non_finite() {
        assert!(layout_annotation(1, (10.0, 10.0), "", WIDTH).is_none());
        assert!(layout_annotation(1, (400.0, 200.0), "   ", WIDTH).is_none());
        assert!(layout_annotation(1, (400.0, 200.0), "\t\n", WIDTH).is_none());
        assert!(layout_annotation(1, (f64::NAN, 10.0), "note", WIDTH).is_none());
        assert!(layout_annotation(1, (10.0, f64::INFINITY), "note", WIDTH).is_none());
    }
}
