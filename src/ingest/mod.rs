//! Camera frame sources.
//!
//! - Synthetic source for `stub://` URLs (demos and tests)
//! - Still image source for local image files
//!
//! Only local sources exist; URL schemes other than `stub://` are rejected.
//! Sources hand frames to the orchestrator through `CameraEvent`s and do not
//! retain them afterwards.

mod still;
mod synthetic;

use std::time::Duration;

use anyhow::{anyhow, Result};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::CameraSettings;
use crate::error::FinderError;
use crate::frame::Frame;

pub use still::StillImageCamera;
pub use synthetic::SyntheticCamera;

/// Events delivered by the camera collaborator.
#[derive(Debug)]
pub enum CameraEvent {
    FrameCaptured(Frame),
    /// Sent once, instead of any frame, when the camera cannot start.
    InitFailed(FinderError),
}

pub trait CameraSource: Send {
    /// Human-readable device description, logged at startup.
    fn describe(&self) -> String;

    fn connect(&mut self) -> Result<()>;

    fn next_frame(&mut self) -> Result<Frame>;
}

/// Pick a camera source for the configured URL.
pub fn open_camera(settings: &CameraSettings) -> Result<Box<dyn CameraSource>> {
    let url = settings.url.trim();
    if url.is_empty() {
        return Err(anyhow!("camera url must not be empty"));
    }
    if url.starts_with("stub://") {
        return Ok(Box::new(SyntheticCamera::new(
            url,
            settings.width,
            settings.height,
        )));
    }
    let path = url.strip_prefix("file://").unwrap_or(url);
    if path.contains("://") {
        return Err(anyhow!(
            "camera url '{}' is not supported (only stub:// and local image paths)",
            url
        ));
    }
    Ok(Box::new(StillImageCamera::new(path)))
}

/// Drive a camera on a blocking worker.
///
/// Connects, logs the device, then captures at `fps` until the receiver is
/// dropped. A failed connect is reported once as `InitFailed`; a failed
/// capture is logged and the next capture attempted.
pub fn spawn_camera(
    mut source: Box<dyn CameraSource>,
    fps: u32,
    tx: mpsc::Sender<CameraEvent>,
) -> JoinHandle<()> {
    let period = Duration::from_millis(1000 / u64::from(fps.max(1)));
    tokio::task::spawn_blocking(move || {
        if let Err(e) = source.connect() {
            let _ = tx.blocking_send(CameraEvent::InitFailed(FinderError::camera_init(&e)));
            return;
        }
        log::info!("detected camera: {}", source.describe());

        loop {
            match source.next_frame() {
                Ok(frame) => {
                    if tx.blocking_send(CameraEvent::FrameCaptured(frame)).is_err() {
                        log::debug!("camera receiver closed; stopping capture");
                        return;
                    }
                }
                Err(e) => log::warn!("frame capture failed: {:#}", e),
            }
            std::thread::sleep(period);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(url: &str) -> CameraSettings {
        CameraSettings {
            url: url.to_string(),
            fps: 10,
            width: 32,
            height: 24,
        }
    }

    #[test]
    fn selects_source_by_url() {
        let cam = open_camera(&settings("stub://desk")).unwrap();
        assert!(cam.describe().contains("stub://desk"));
        let cam = open_camera(&settings("file:///tmp/still.png")).unwrap();
        assert!(cam.describe().contains("/tmp/still.png"));
    }

    #[test]
    fn rejects_network_urls() {
        assert!(open_camera(&settings("rtsp://10.0.0.2/stream")).is_err());
        assert!(open_camera(&settings("http://cam.local/snap.jpg")).is_err());
        assert!(open_camera(&settings("  ")).is_err());
    }

    #[tokio::test]
    async fn driver_reports_init_failure_once() {
        let (tx, mut rx) = mpsc::channel(4);
        let cam = open_camera(&settings("/definitely/missing/image.png")).unwrap();
        spawn_camera(cam, 10, tx).await.unwrap();
        match rx.recv().await {
            Some(CameraEvent::InitFailed(FinderError::CameraInit(msg))) => {
                assert!(msg.contains("missing"))
            }
            other => panic!("unexpected event: {:?}", other),
        }
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn driver_streams_frames_until_receiver_drops() {
        let (tx, mut rx) = mpsc::channel(1);
        let cam = open_camera(&settings("stub://desk")).unwrap();
        let handle = spawn_camera(cam, 100, tx);
        for expected in 1..=3u64 {
            match rx.recv().await {
                Some(CameraEvent::FrameCaptured(frame)) => assert_eq!(frame.seq, expected),
                other => panic!("unexpected event: {:?}", other),
            }
        }
        drop(rx);
        handle.await.unwrap();
    }
}
