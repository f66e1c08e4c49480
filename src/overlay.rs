//! Overlay surface for detection boxes.
//!
//! The overlay is a transparent layer sized to the video frame. Every
//! completed inference clears it and redraws one rectangle per detection.

use image::{Rgba, RgbaImage};

use crate::detect::{BoundingBox, RawDetection};

/// Box stroke colour (#0074df).
pub const BOX_COLOR: Rgba<u8> = Rgba([0x00, 0x74, 0xdf, 0xff]);
pub const BOX_LINE_WIDTH: u32 = 2;

const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// A 2-D drawable surface.
pub trait Surface: Send {
    fn width(&self) -> u32;
    fn height(&self) -> u32;

    /// Resize to the given dimensions. Contents are cleared.
    fn resize(&mut self, width: u32, height: u32);

    fn clear(&mut self);

    /// Stroke a rectangle outline; the line grows inwards from the box edge.
    fn stroke_rect(&mut self, bbox: BoundingBox, color: Rgba<u8>, line_width: u32);

    /// Set a single pixel. Out-of-bounds coordinates are ignored.
    fn plot(&mut self, x: i64, y: i64, color: Rgba<u8>);
}

/// In-memory RGBA overlay.
pub struct OverlayCanvas {
    image: RgbaImage,
}

impl OverlayCanvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: RgbaImage::from_pixel(width, height, TRANSPARENT),
        }
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    /// Number of non-transparent pixels.
    pub fn painted_pixels(&self) -> usize {
        self.image.pixels().filter(|p| p[3] != 0).count()
    }
}

impl Surface for OverlayCanvas {
    fn width(&self) -> u32 {
        self.image.width()
    }

    fn height(&self) -> u32 {
        self.image.height()
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.image = RgbaImage::from_pixel(width, height, TRANSPARENT);
    }

    fn clear(&mut self) {
        for pixel in self.image.pixels_mut() {
            *pixel = TRANSPARENT;
        }
    }

    fn stroke_rect(&mut self, bbox: BoundingBox, color: Rgba<u8>, line_width: u32) {
        let (w, h) = self.image.dimensions();
        if w == 0 || h == 0 || bbox.width <= 0.0 || bbox.height <= 0.0 {
            return;
        }
        let clamp = |v: f32, max: u32| -> u32 { v.max(0.0).min((max - 1) as f32) as u32 };
        let x0 = clamp(bbox.x, w);
        let y0 = clamp(bbox.y, h);
        let x1 = clamp(bbox.x + bbox.width - 1.0, w);
        let y1 = clamp(bbox.y + bbox.height - 1.0, h);

        for t in 0..line_width {
            let xx0 = x0 + t;
            let yy0 = y0 + t;
            let xx1 = x1.saturating_sub(t);
            let yy1 = y1.saturating_sub(t);
            if xx0 > xx1 || yy0 > yy1 {
                break;
            }
            for x in xx0..=xx1 {
                self.image.put_pixel(x, yy0, color);
                self.image.put_pixel(x, yy1, color);
            }
            for y in yy0..=yy1 {
                self.image.put_pixel(xx0, y, color);
                self.image.put_pixel(xx1, y, color);
            }
        }
    }

    fn plot(&mut self, x: i64, y: i64, color: Rgba<u8>) {
        if x < 0 || y < 0 || x >= self.image.width() as i64 || y >= self.image.height() as i64 {
            return;
        }
        self.image.put_pixel(x as u32, y as u32, color);
    }
}

/// Clear the surface and outline every detection.
pub fn render_detections(surface: &mut dyn Surface, detections: &[RawDetection]) {
    surface.clear();
    for detection in detections {
        surface.stroke_rect(detection.bbox, BOX_COLOR, BOX_LINE_WIDTH);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn det(x: f32, y: f32, w: f32, h: f32) -> RawDetection {
        RawDetection::new("person", 0.9, BoundingBox::new(x, y, w, h))
    }

    #[test]
    fn strokes_outline_only() {
        let mut canvas = OverlayCanvas::new(20, 20);
        render_detections(&mut canvas, &[det(2.0, 2.0, 10.0, 10.0)]);
        let img = canvas.image();
        assert_eq!(*img.get_pixel(2, 2), BOX_COLOR);
        assert_eq!(*img.get_pixel(3, 3), BOX_COLOR);
        assert_eq!(*img.get_pixel(11, 11), BOX_COLOR);
        assert_eq!(img.get_pixel(6, 6)[3], 0);
        // 10x10 box, two-pixel line: 100 - 6x6 interior.
        assert_eq!(canvas.painted_pixels(), 64);
    }

    #[test]
    fn render_clears_previous_boxes() {
        let mut canvas = OverlayCanvas::new(20, 20);
        render_detections(&mut canvas, &[det(0.0, 0.0, 5.0, 5.0)]);
        render_detections(&mut canvas, &[]);
        assert_eq!(canvas.painted_pixels(), 0);
    }

    #[test]
    fn clamps_boxes_to_surface() {
        let mut canvas = OverlayCanvas::new(10, 10);
        render_detections(&mut canvas, &[det(-5.0, -5.0, 100.0, 100.0)]);
        assert_eq!(*canvas.image().get_pixel(0, 0), BOX_COLOR);
        assert_eq!(*canvas.image().get_pixel(9, 9), BOX_COLOR);
    }

    #[test]
    fn resize_replaces_contents() {
        let mut canvas = OverlayCanvas::new(4, 4);
        canvas.plot(1, 1, BOX_COLOR);
        canvas.plot(-1, 99, BOX_COLOR);
        assert_eq!(canvas.painted_pixels(), 1);
        canvas.resize(8, 6);
        assert_eq!((canvas.width(), canvas.height()), (8, 6));
        assert_eq!(canvas.painted_pixels(), 0);
    }
}
