//! Selection geometry.
//!
//! - `Point`: a pointer position in frame pixels.
//! - `Rectangle`: two raw drag corners, normalized on read.
//! - `Roi`: an `x, y, width, height` box as consumed by the tracking capability.

/// Smallest side length a selection may have. A click without drag still
/// produces a trackable 2x2 region.
pub const MIN_ROI_SIDE: u32 = 2;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Region of interest in frame pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Roi {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Roi {
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Bottom-right corner (exclusive of the outline thickness).
    pub fn far_corner(&self) -> Point {
        Point::new(
            self.x.saturating_add(self.width as i32),
            self.y.saturating_add(self.height as i32),
        )
    }

    /// The same box as a pair of corners.
    pub fn to_rectangle(self) -> Rectangle {
        Rectangle::new(Point::new(self.x, self.y), self.far_corner())
    }

    /// Move and shrink the box so it lies inside a `width` x `height` frame,
    /// keeping the minimum side length. Returns `None` when the frame itself
    /// is smaller than the minimum box.
    pub fn clamp_to(&self, width: u32, height: u32) -> Option<Roi> {
        if width < MIN_ROI_SIDE || height < MIN_ROI_SIDE {
            return None;
        }
        let w = self.width.clamp(MIN_ROI_SIDE, width);
        let h = self.height.clamp(MIN_ROI_SIDE, height);
        let x = self.x.clamp(0, (width - w) as i32);
        let y = self.y.clamp(0, (height - h) as i32);
        Some(Roi::new(x, y, w, h))
    }

    /// Dimension label drawn next to a tracked box.
    pub fn label(&self) -> String {
        format!("{}x{}", self.width, self.height)
    }
}

/// Selection rectangle as dragged by the user: corners in press/release
/// order, which may be in any direction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Rectangle {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl Rectangle {
    pub fn new(a: Point, b: Point) -> Self {
        Self {
            x1: a.x,
            y1: a.y,
            x2: b.x,
            y2: b.y,
        }
    }

    /// Top-left corner.
    pub fn p1(&self) -> Point {
        Point::new(self.x1.min(self.x2), self.y1.min(self.y2))
    }

    /// Bottom-right corner.
    pub fn p2(&self) -> Point {
        Point::new(self.x1.max(self.x2), self.y1.max(self.y2))
    }

    /// Normalized `x, y, w, h`. Zero-length sides are raised to
    /// `MIN_ROI_SIDE` so the result always has positive area.
    pub fn xywh(&self) -> Roi {
        let p1 = self.p1();
        let w = match self.x2.abs_diff(self.x1) {
            0 => MIN_ROI_SIDE,
            w => w,
        };
        let h = match self.y2.abs_diff(self.y1) {
            0 => MIN_ROI_SIDE,
            h => h,
        };
        Roi::new(p1.x, p1.y, w, h)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corners_are_normalized_for_every_drag_direction() {
        let drags = [
            (Point::new(10, 10), Point::new(50, 60)),
            (Point::new(50, 60), Point::new(10, 10)),
            (Point::new(50, 10), Point::new(10, 60)),
            (Point::new(10, 60), Point::new(50, 10)),
        ];
        for (a, b) in drags {
            let rect = Rectangle::new(a, b);
            assert_eq!(rect.p1(), Point::new(10, 10));
            assert_eq!(rect.p2(), Point::new(50, 60));
            assert_eq!(rect.xywh(), Roi::new(10, 10, 40, 50));
        }
    }

    #[test]
    fn click_without_drag_yields_minimum_box() {
        let rect = Rectangle::new(Point::new(33, 44), Point::new(33, 44));
        assert_eq!(rect.xywh(), Roi::new(33, 44, 2, 2));
    }

    #[test]
    fn flat_drag_keeps_positive_area() {
        let rect = Rectangle::new(Point::new(5, 20), Point::new(45, 20));
        let roi = rect.xywh();
        assert_eq!(roi, Roi::new(5, 20, 40, 2));
        assert!(roi.area() > 0);
    }

    #[test]
    fn one_pixel_drag_keeps_its_width() {
        let rect = Rectangle::new(Point::new(10, 10), Point::new(11, 30));
        assert_eq!(rect.xywh(), Roi::new(10, 10, 1, 20));

        let rect = Rectangle::new(Point::new(7, 8), Point::new(27, 7));
        assert_eq!(rect.xywh(), Roi::new(7, 7, 20, 1));
    }

    #[test]
    fn clamp_moves_box_inside_frame() {
        let roi = Roi::new(-10, 470, 50, 40);
        assert_eq!(roi.clamp_to(640, 480), Some(Roi::new(0, 440, 50, 40)));

        let huge = Roi::new(0, 0, 1000, 1000);
        assert_eq!(huge.clamp_to(640, 480), Some(Roi::new(0, 0, 640, 480)));

        assert_eq!(roi.clamp_to(1, 480), None);
    }

    #[test]
    fn label_is_width_by_height() {
        assert_eq!(Roi::new(12, 11, 40, 50).label(), "40x50");
    }
}
