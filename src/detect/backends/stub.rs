use anyhow::Result;

use crate::detect::backend::DetectorBackend;
use crate::detect::result::{BoundingBox, RawDetection};
use crate::frame::Frame;

/// Luma above which a pixel counts as part of the bright object.
pub const BRIGHT_CUTOFF: u8 = 64;

/// Stub backend for demos and tests.
///
/// Reports a single detection of `label` covering the bright pixels of the
/// frame, with confidence equal to their mean luma / 255. A frame with no
/// bright pixels yields no detections.
pub struct StubBackend {
    label: String,
}

impl StubBackend {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }
}

impl Default for StubBackend {
    fn default() -> Self {
        Self::new("person")
    }
}

impl DetectorBackend for StubBackend {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn detect(&mut self, frame: &Frame) -> Result<Vec<RawDetection>> {
        let mut min = (u32::MAX, u32::MAX);
        let mut max = (0u32, 0u32);
        let mut sum = 0u64;
        let mut count = 0u64;

        for y in 0..frame.height {
            for x in 0..frame.width {
                let l = luma(frame.rgb_at(x, y));
                if l <= BRIGHT_CUTOFF {
                    continue;
                }
                min = (min.0.min(x), min.1.min(y));
                max = (max.0.max(x), max.1.max(y));
                sum += l as u64;
                count += 1;
            }
        }

        if count == 0 {
            return Ok(Vec::new());
        }

        let confidence = (sum as f32 / count as f32) / 255.0;
        let bbox = BoundingBox::new(
            min.0 as f32,
            min.1 as f32,
            (max.0 - min.0 + 1) as f32,
            (max.1 - min.1 + 1) as f32,
        );
        Ok(vec![RawDetection::new(self.label.clone(), confidence, bbox)])
    }
}

fn luma([r, g, b]: [u8; 3]) -> u8 {
    ((r as u32 * 299 + g as u32 * 587 + b as u32 * 114) / 1000) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame_with_square(value: u8) -> Frame {
        let (w, h) = (8u32, 6u32);
        let mut data = vec![0u8; (w * h * 3) as usize];
        for y in 2..4 {
            for x in 3..6 {
                let idx = ((y * w + x) * 3) as usize;
                data[idx..idx + 3].copy_from_slice(&[value, value, value]);
            }
        }
        Frame::from_rgb(data, w, h, 1).unwrap()
    }

    #[test]
    fn dark_frame_has_no_detections() {
        let mut backend = StubBackend::default();
        let frame = Frame::from_rgb(vec![10; 4 * 4 * 3], 4, 4, 0).unwrap();
        assert!(backend.detect(&frame).unwrap().is_empty());
    }

    #[test]
    fn bright_square_is_reported_with_its_box() {
        let mut backend = StubBackend::new("cup");
        let detections = backend.detect(&frame_with_square(204)).unwrap();
        assert_eq!(detections.len(), 1);
        let d = &detections[0];
        assert_eq!(d.label, "cup");
        assert_eq!(d.bbox, BoundingBox::new(3.0, 2.0, 3.0, 2.0));
        assert!((d.confidence - 0.8).abs() < 0.01);
    }
}
