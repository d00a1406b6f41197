//! Overlay compositing: box outlines and the "WxH" dimension label.
//!
//! Drawing is clipped to the canvas; nothing outside the target image is touched.

use image::{Rgb, RgbImage};

use crate::frame::Frame;
use crate::geometry::{Point, Rectangle, Roi};

/// Overlay color for tracked boxes and labels.
pub const OVERLAY_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
/// Gap between the top edge of the box and the label baseline.
pub const LABEL_OFFSET: i32 = 5;

const GLYPH_WIDTH: i32 = 5;
const GLYPH_HEIGHT: i32 = 7;
const GLYPH_ADVANCE: i32 = GLYPH_WIDTH + 1;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OverlayStyle {
    pub color: Rgb<u8>,
    pub thickness: u32,
    pub label_scale: u32,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            color: OVERLAY_COLOR,
            thickness: 2,
            label_scale: 1,
        }
    }
}

impl Rectangle {
    /// Outline the normalized rectangle on `canvas`. Extra thickness grows
    /// inward so the corners `p1` and `p2` are always painted.
    pub fn draw(&self, canvas: &mut RgbImage, color: Rgb<u8>, thickness: u32) {
        let p1 = self.p1();
        let p2 = self.p2();
        for layer in 0..thickness.max(1) as i32 {
            let (x1, y1) = (p1.x + layer, p1.y + layer);
            let (x2, y2) = (p2.x - layer, p2.y - layer);
            if x1 > x2 || y1 > y2 {
                break;
            }
            for x in x1..=x2 {
                put(canvas, x, y1, color);
                put(canvas, x, y2, color);
            }
            for y in y1..=y2 {
                put(canvas, x1, y, color);
                put(canvas, x2, y, color);
            }
        }
    }
}

/// Copy `frame` and draw `roi` with its dimension label on top.
pub fn compose_tracked(frame: &Frame, roi: Roi, style: &OverlayStyle) -> RgbImage {
    let mut canvas = frame.image().clone();
    roi.to_rectangle()
        .draw(&mut canvas, style.color, style.thickness);
    let baseline = Point::new(roi.x + LABEL_OFFSET, roi.y - LABEL_OFFSET);
    draw_label(&mut canvas, &roi.label(), baseline, style.color, style.label_scale);
    canvas
}

/// Render `text` with its bottom-left corner at `baseline`. Characters
/// without a glyph advance the cursor without drawing.
pub fn draw_label(canvas: &mut RgbImage, text: &str, baseline: Point, color: Rgb<u8>, scale: u32) {
    let scale = scale.max(1) as i32;
    let top = baseline.y - GLYPH_HEIGHT * scale + 1;
    let mut left = baseline.x;
    for ch in text.chars() {
        if let Some(rows) = glyph(ch) {
            for (row, bits) in rows.iter().enumerate() {
                for col in 0..GLYPH_WIDTH {
                    if bits & (1 << (GLYPH_WIDTH - 1 - col)) == 0 {
                        continue;
                    }
                    let px = left + col * scale;
                    let py = top + row as i32 * scale;
                    for dy in 0..scale {
                        for dx in 0..scale {
                            put(canvas, px + dx, py + dy, color);
                        }
                    }
                }
            }
        }
        left += GLYPH_ADVANCE * scale;
    }
}

fn put(canvas: &mut RgbImage, x: i32, y: i32, color: Rgb<u8>) {
    if x < 0 || y < 0 {
        return;
    }
    let (x, y) = (x as u32, y as u32);
    if x < canvas.width() && y < canvas.height() {
        canvas.put_pixel(x, y, color);
    }
}

// 5x7 bitmaps, one byte per row, most significant of the low five bits leftmost.
fn glyph(ch: char) -> Option<[u8; 7]> {
    let rows = match ch {
        '0' => [0x0E, 0x11, 0x13, 0x15, 0x19, 0x11, 0x0E],
        '1' => [0x04, 0x0C, 0x04, 0x04, 0x04, 0x04, 0x0E],
        '2' => [0x0E, 0x11, 0x01, 0x02, 0x04, 0x08, 0x1F],
        '3' => [0x1F, 0x02, 0x04, 0x02, 0x01, 0x11, 0x0E],
        '4' => [0x02, 0x06, 0x0A, 0x12, 0x1F, 0x02, 0x02],
        '5' => [0x1F, 0x10, 0x1E, 0x01, 0x01, 0x11, 0x0E],
        '6' => [0x06, 0x08, 0x10, 0x1E, 0x11, 0x11, 0x0E],
        '7' => [0x1F, 0x01, 0x02, 0x04, 0x08, 0x08, 0x08],
        '8' => [0x0E, 0x11, 0x11, 0x0E, 0x11, 0x11, 0x0E],
        '9' => [0x0E, 0x11, 0x11, 0x0F, 0x01, 0x02, 0x0C],
        'x' => [0x00, 0x00, 0x11, 0x0A, 0x04, 0x0A, 0x11],
        _ => return None,
    };
    Some(rows)
}
