//! Captured camera frames.
//!
//! A `Frame` is an RGB8 buffer produced by the ingestion layer. The
//! orchestrator holds only the most recent one; each capture replaces it
//! wholesale. Frames are shared as `Arc<Frame>` so an in-flight inference can
//! keep reading a frame after a newer one has been captured.

use std::time::Instant;

use crate::error::FinderError;

/// Bytes per RGB8 pixel.
pub const CHANNELS: usize = 3;

pub struct Frame {
    data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// Capture sequence number assigned by the camera driver.
    pub seq: u64,
    captured_at: Instant,
}

impl Frame {
    /// Build a frame from packed RGB8 pixels.
    pub fn from_rgb(data: Vec<u8>, width: u32, height: u32, seq: u64) -> Result<Self, FinderError> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|v| v.checked_mul(CHANNELS))
            .ok_or_else(|| FinderError::InvalidFrame("frame dimensions overflow".into()))?;
        if expected == 0 {
            return Err(FinderError::InvalidFrame(format!(
                "empty frame {}x{}",
                width, height
            )));
        }
        if data.len() != expected {
            return Err(FinderError::InvalidFrame(format!(
                "expected {} RGB bytes for {}x{}, received {}",
                expected,
                width,
                height,
                data.len()
            )));
        }
        Ok(Self {
            data,
            width,
            height,
            seq,
            captured_at: Instant::now(),
        })
    }

    pub fn pixels(&self) -> &[u8] {
        &self.data
    }

    /// RGB triple at `(x, y)`. Panics when out of bounds, like slice indexing.
    pub fn rgb_at(&self, x: u32, y: u32) -> [u8; 3] {
        let idx = (y as usize * self.width as usize + x as usize) * CHANNELS;
        [self.data[idx], self.data[idx + 1], self.data[idx + 2]]
    }

    pub fn age_ms(&self) -> u128 {
        self.captured_at.elapsed().as_millis()
    }
}

impl std::fmt::Debug for Frame {
    // Pixel data stays out of logs.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("seq", &self.seq)
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_mismatched_buffer() {
        let err = Frame::from_rgb(vec![0; 10], 2, 2, 0).unwrap_err();
        assert!(matches!(err, FinderError::InvalidFrame(_)));
    }

    #[test]
    fn rejects_empty_frame() {
        assert!(Frame::from_rgb(Vec::new(), 0, 0, 0).is_err());
    }

    #[test]
    fn reads_pixels_row_major() {
        let mut data = vec![0u8; 2 * 2 * 3];
        data[9..12].copy_from_slice(&[1, 2, 3]);
        let frame = Frame::from_rgb(data, 2, 2, 7).unwrap();
        assert_eq!(frame.rgb_at(1, 1), [1, 2, 3]);
        assert_eq!(frame.rgb_at(0, 0), [0, 0, 0]);
        assert_eq!(frame.seq, 7);
    }

    #[test]
    fn debug_omits_pixels() {
        let frame = Frame::from_rgb(vec![42; 3], 1, 1, 3).unwrap();
        let text = format!("{:?}", frame);
        assert!(text.contains("seq: 3"));
        assert!(!text.contains("42"));
    }
}
