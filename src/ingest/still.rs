use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};

use super::CameraSource;
use crate::frame::Frame;

/// Camera that keeps capturing the same local image.
///
/// The image is decoded once on connect; each capture copies it into a new
/// frame with the next sequence number.
pub struct StillImageCamera {
    path: PathBuf,
    image: Option<image::RgbImage>,
    frame_count: u64,
}

impl StillImageCamera {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            image: None,
            frame_count: 0,
        }
    }
}

impl CameraSource for StillImageCamera {
    fn describe(&self) -> String {
        match &self.image {
            Some(img) => format!(
                "{} (still image {}x{})",
                self.path.display(),
                img.width(),
                img.height()
            ),
            None => format!("{} (still image)", self.path.display()),
        }
    }

    fn connect(&mut self) -> Result<()> {
        let decoded = image::open(&self.path)
            .with_context(|| format!("failed to open image {}", self.path.display()))?;
        self.image = Some(decoded.into_rgb8());
        log::info!("StillImageCamera: loaded {}", self.path.display());
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Frame> {
        let img = self
            .image
            .as_ref()
            .ok_or_else(|| anyhow!("still image camera is not connected"))?;
        self.frame_count += 1;
        Ok(Frame::from_rgb(
            img.as_raw().clone(),
            img.width(),
            img.height(),
            self.frame_count,
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn replays_decoded_image() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("still.png");
        let mut img = RgbImage::from_pixel(6, 4, Rgb([10, 20, 30]));
        img.put_pixel(5, 3, Rgb([200, 100, 50]));
        img.save(&path).unwrap();

        let mut camera = StillImageCamera::new(&path);
        assert!(camera.next_frame().is_err());
        camera.connect().unwrap();
        assert!(camera.describe().contains("6x4"));

        let first = camera.next_frame().unwrap();
        let second = camera.next_frame().unwrap();
        assert_eq!((first.seq, second.seq), (1, 2));
        assert_eq!((first.width, first.height), (6, 4));
        assert_eq!(second.rgb_at(5, 3), [200, 100, 50]);
        assert_eq!(second.rgb_at(0, 0), [10, 20, 30]);
    }
}
