//! Object Finder
//!
//! Captures periodic camera snapshots, runs them through an object-detection
//! model, outlines detections on an overlay and reports typed results to a
//! result view. Optionally stops reporting after the first match and fires a
//! confetti burst.
//!
//! # Architecture
//!
//! 1. **Camera** (`ingest`): sources push `CameraEvent`s; only the latest frame is kept.
//! 2. **Model** (`detect`): a `ModelLoader` produces a `DetectorBackend` on a blocking worker.
//! 3. **Orchestrator** (`orchestrator`): a fixed-interval tick runs inference on the latest frame.
//! 4. **Session** (`session`): pure transitions over the session state, including the found latch.
//! 5. **Overlay / celebration** (`overlay`, `celebrate`): drawing collaborators.
//! 6. **Shell** (`shell`): stores and displays the latest result list.

pub mod celebrate;
pub mod config;
pub mod detect;
pub mod error;
pub mod frame;
pub mod ingest;
pub mod orchestrator;
pub mod overlay;
pub mod session;
pub mod shell;

pub use celebrate::{Celebration, CelebrationConfig, ConfettiBurst};
pub use config::{DetectionParams, FinderConfig, OverlapPolicy};
pub use detect::{
    BoundingBox, DetectionResult, DetectorBackend, FnLoader, LoaderRegistry, ModelLoader,
    RawDetection, StubBackend,
};
pub use error::FinderError;
pub use frame::Frame;
pub use ingest::{open_camera, spawn_camera, CameraEvent, CameraSource};
pub use orchestrator::{Finished, Orchestrator};
pub use overlay::{render_detections, OverlayCanvas, Surface};
pub use session::{map_detections_to_results, SessionState};
pub use shell::Shell;
