use anyhow::Result;

use super::CameraSource;
use crate::frame::{Frame, CHANNELS};

const BACKGROUND: u8 = 16;
const MIN_BRIGHTNESS: u32 = 96;
const BRIGHTNESS_RANGE: u32 = 160;
const BRIGHTNESS_STEP: u32 = 8;

/// Synthetic webcam for `stub://` URLs.
///
/// Draws a grey square on a dark background. The square drifts sideways and
/// its brightness ramps from 96 up to 255 before wrapping, so a
/// brightness-scoring stub model sweeps through low and high confidence.
pub struct SyntheticCamera {
    url: String,
    width: u32,
    height: u32,
    frame_count: u64,
}

impl SyntheticCamera {
    pub fn new(url: &str, width: u32, height: u32) -> Self {
        Self {
            url: url.to_string(),
            width,
            height,
            frame_count: 0,
        }
    }

    /// Brightness of the square in the given frame.
    pub fn brightness_at(frame_count: u64) -> u8 {
        let step = (frame_count as u32).wrapping_mul(BRIGHTNESS_STEP) % BRIGHTNESS_RANGE;
        (MIN_BRIGHTNESS + step).min(255) as u8
    }

    fn render(&self) -> Vec<u8> {
        let (w, h) = (self.width as usize, self.height as usize);
        let side = (w.min(h) / 4).max(1);
        let travel = w.saturating_sub(side).max(1);
        let left = (self.frame_count as usize * 4) % travel;
        let top = (h - side.min(h)) / 2;
        let value = Self::brightness_at(self.frame_count);

        let mut pixels = vec![BACKGROUND; w * h * CHANNELS];
        for y in top..(top + side).min(h) {
            for x in left..(left + side).min(w) {
                let idx = (y * w + x) * CHANNELS;
                pixels[idx..idx + CHANNELS].fill(value);
            }
        }
        pixels
    }
}

impl CameraSource for SyntheticCamera {
    fn describe(&self) -> String {
        format!("{} (synthetic {}x{})", self.url, self.width, self.height)
    }

    fn connect(&mut self) -> Result<()> {
        log::info!("SyntheticCamera: connected to {}", self.url);
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Frame> {
        self.frame_count += 1;
        let pixels = self.render();
        Ok(Frame::from_rgb(
            pixels,
            self.width,
            self.height,
            self.frame_count,
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::{DetectorBackend, StubBackend};

    #[test]
    fn brightness_ramps_and_wraps() {
        assert_eq!(SyntheticCamera::brightness_at(0), 96);
        assert_eq!(SyntheticCamera::brightness_at(10), 176);
        assert_eq!(SyntheticCamera::brightness_at(19), 248);
        assert_eq!(SyntheticCamera::brightness_at(20), 96);
    }

    #[test]
    fn stub_model_sees_the_square() {
        let mut camera = SyntheticCamera::new("stub://test", 64, 48);
        camera.connect().unwrap();
        let frame = camera.next_frame().unwrap();
        assert_eq!(frame.seq, 1);

        let detections = StubBackend::new("person").detect(&frame).unwrap();
        assert_eq!(detections.len(), 1);
        let expected = SyntheticCamera::brightness_at(1) as f32 / 255.0;
        assert!((detections[0].confidence - expected).abs() < 0.01);
        assert_eq!(detections[0].bbox.width, 12.0);
        assert_eq!(detections[0].bbox.height, 12.0);
    }
}
