//! Prediction orchestrator.
//!
//! A single task owns the `SessionState` and reacts to five event sources:
//! camera events, the model load completing, the tick timer, inference
//! completions and shutdown. Inference runs on the blocking pool; only its
//! result travels back into the loop, so session state never needs a lock.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use tokio::sync::{mpsc, watch};
use tokio::task::{AbortHandle, JoinError, JoinHandle};
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::celebrate::{Celebration, CelebrationConfig, ConfettiBurst};
use crate::config::{DetectionParams, FinderConfig, OverlapPolicy};
use crate::detect::{DetectionResult, DetectorBackend, ModelLoader, RawDetection};
use crate::error::FinderError;
use crate::ingest::CameraEvent;
use crate::overlay::{render_detections, OverlayCanvas, Surface};
use crate::session::{Completion, InferenceRequest, SessionState, SharedBackend, TickPlan};

pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(500);

type LoadHandle = JoinHandle<Result<Box<dyn DetectorBackend>>>;

struct InferenceDone {
    ticket: u64,
    frame_size: (u32, u32),
    result: Result<Vec<RawDetection>>,
}

/// The outstanding inference, as seen from the loop.
struct Pending {
    ticket: u64,
    cancelled: Arc<AtomicBool>,
    task: AbortHandle,
}

impl Pending {
    fn cancel(self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.task.abort();
    }
}

/// Everything the orchestrator owned, handed back after shutdown.
pub struct Finished<S, C> {
    pub state: SessionState,
    pub surface: S,
    pub celebration: C,
}

pub struct Orchestrator<S = OverlayCanvas, C = ConfettiBurst> {
    params: DetectionParams,
    tick_interval: Duration,
    overlap: OverlapPolicy,
    celebration_config: CelebrationConfig,
    surface: S,
    celebration: C,
    results: mpsc::UnboundedSender<Vec<DetectionResult>>,
}

impl Orchestrator {
    pub fn new(
        params: DetectionParams,
        results: mpsc::UnboundedSender<Vec<DetectionResult>>,
    ) -> Self {
        Self {
            params,
            tick_interval: DEFAULT_TICK_INTERVAL,
            overlap: OverlapPolicy::default(),
            celebration_config: CelebrationConfig::default(),
            surface: OverlayCanvas::new(0, 0),
            celebration: ConfettiBurst::new(),
            results,
        }
    }

    pub fn from_config(
        cfg: &FinderConfig,
        results: mpsc::UnboundedSender<Vec<DetectionResult>>,
    ) -> Self {
        Self::new(cfg.detection.clone(), results)
            .with_tick_interval(cfg.tick_interval)
            .with_overlap(cfg.overlap)
            .with_celebration_config(cfg.celebration)
    }
}

impl<S: Surface, C: Celebration> Orchestrator<S, C> {
    pub fn with_tick_interval(mut self, tick_interval: Duration) -> Self {
        self.tick_interval = tick_interval;
        self
    }

    pub fn with_overlap(mut self, overlap: OverlapPolicy) -> Self {
        self.overlap = overlap;
        self
    }

    pub fn with_celebration_config(mut self, config: CelebrationConfig) -> Self {
        self.celebration_config = config;
        self
    }

    pub fn with_surface<S2: Surface>(self, surface: S2) -> Orchestrator<S2, C> {
        Orchestrator {
            params: self.params,
            tick_interval: self.tick_interval,
            overlap: self.overlap,
            celebration_config: self.celebration_config,
            surface,
            celebration: self.celebration,
            results: self.results,
        }
    }

    pub fn with_celebration<C2: Celebration>(self, celebration: C2) -> Orchestrator<S, C2> {
        Orchestrator {
            params: self.params,
            tick_interval: self.tick_interval,
            overlap: self.overlap,
            celebration_config: self.celebration_config,
            surface: self.surface,
            celebration,
            results: self.results,
        }
    }

    /// Run until `shutdown` turns true or its sender is dropped.
    ///
    /// The first tick fires one interval after start. Ticks that arrive
    /// before the model has loaded, or before any frame, do nothing.
    pub async fn run(
        mut self,
        loader: Arc<dyn ModelLoader>,
        mut camera: mpsc::Receiver<CameraEvent>,
        mut shutdown: watch::Receiver<bool>,
    ) -> Finished<S, C> {
        log::info!(
            "orchestrator running: target='{}' threshold={} stop_on_found={} celebrate={} tick={:?} overlap={:?}",
            self.params.target_label,
            self.params.confidence_threshold,
            self.params.stop_on_found,
            self.params.celebrate_on_found,
            self.tick_interval,
            self.overlap
        );

        let (done_tx, mut done_rx) = mpsc::unbounded_channel::<InferenceDone>();
        let mut loading: Option<LoadHandle> = Some(spawn_model_load(loader));
        let mut ticker = interval_at(Instant::now() + self.tick_interval, self.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut state = SessionState::new();
        let mut pending: Option<Pending> = None;
        let mut camera_open = true;

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                event = camera.recv(), if camera_open => match event {
                    Some(CameraEvent::FrameCaptured(frame)) => {
                        state = state.captured(frame);
                    }
                    Some(CameraEvent::InitFailed(err)) => on_init_error(&err),
                    None => {
                        log::debug!("camera channel closed; keeping last frame");
                        camera_open = false;
                    }
                },
                loaded = wait_for_load(&mut loading), if loading.is_some() => {
                    loading = None;
                    state = self.on_model_loaded(state, loaded);
                }
                _ = ticker.tick() => {
                    let (next, plan) = state.tick(self.overlap);
                    state = next;
                    match plan {
                        TickPlan::NotReady => log::debug!("tick skipped: no frame or model yet"),
                        TickPlan::Busy => log::debug!("tick skipped: inference in flight"),
                        TickPlan::Infer(request) => {
                            if let Some(old) = request.superseded {
                                if let Some(outstanding) = pending.take() {
                                    debug_assert_eq!(outstanding.ticket, old);
                                    outstanding.cancel();
                                }
                                log::debug!("inference #{} superseded by #{}", old, request.ticket);
                            }
                            pending = Some(spawn_inference(request, done_tx.clone()));
                        }
                    }
                }
                Some(done) = done_rx.recv() => {
                    if pending.as_ref().is_some_and(|p| p.ticket == done.ticket) {
                        pending = None;
                    }
                    state = self.on_inference_done(state, done);
                }
            }
        }

        if let Some(outstanding) = pending.take() {
            outstanding.cancel();
        }
        if let Some(handle) = loading.take() {
            handle.abort();
        }
        let stats = state.stats();
        log::info!(
            "orchestrator stopped: ticks={} inferences={} emitted={} found={}",
            stats.ticks,
            stats.inferences,
            stats.emitted,
            state.found()
        );

        Finished {
            state,
            surface: self.surface,
            celebration: self.celebration,
        }
    }

    fn on_model_loaded(
        &self,
        state: SessionState,
        loaded: std::result::Result<Result<Box<dyn DetectorBackend>>, JoinError>,
    ) -> SessionState {
        let loaded = loaded
            .map_err(|e| anyhow!("model loader panicked: {}", e))
            .and_then(|inner| inner);
        match loaded {
            Ok(backend) => {
                log::info!("model '{}' loaded", backend.name());
                let shared: SharedBackend = Arc::new(Mutex::new(backend));
                state.model_ready(shared)
            }
            Err(e) => {
                log::error!("{}", FinderError::model_load(&e));
                state.model_failed()
            }
        }
    }

    fn on_inference_done(&mut self, state: SessionState, done: InferenceDone) -> SessionState {
        match done.result {
            Ok(detections) => {
                let (state, completion) = state.completed(done.ticket, detections, &self.params);
                self.apply(completion, done.frame_size);
                state
            }
            Err(e) => {
                let (state, current) = state.failed(done.ticket);
                if current {
                    log::warn!("{}; tick skipped", FinderError::inference(&e));
                } else {
                    log::debug!("stale inference #{} failed: {:#}", done.ticket, e);
                }
                state
            }
        }
    }

    fn apply(&mut self, completion: Completion, (width, height): (u32, u32)) {
        let Some(detections) = completion.render else {
            return;
        };
        if self.surface.width() != width || self.surface.height() != height {
            self.surface.resize(width, height);
        }
        render_detections(&mut self.surface, &detections);

        if let Some(results) = completion.emit {
            log::info!("prediction {:?}", results);
            if self.results.send(results).is_err() {
                log::debug!("result receiver closed");
            }
        }
        if completion.latched {
            log::info!(
                "'{}' found; result reporting stopped for this session",
                self.params.target_label
            );
        }
        if completion.celebrate {
            self.celebration
                .celebrate(&mut self.surface, &self.celebration_config);
        }
    }
}

/// Camera initialization failures are logged and otherwise ignored.
pub fn on_init_error(err: &FinderError) {
    log::error!("{}", err);
}

fn spawn_model_load(loader: Arc<dyn ModelLoader>) -> LoadHandle {
    tokio::task::spawn_blocking(move || {
        log::info!("loading model '{}'", loader.name());
        let mut backend = loader.load()?;
        backend.warm_up().context("model warm-up failed")?;
        Ok(backend)
    })
}

async fn wait_for_load(
    loading: &mut Option<LoadHandle>,
) -> std::result::Result<Result<Box<dyn DetectorBackend>>, JoinError> {
    match loading {
        Some(handle) => handle.await,
        None => std::future::pending().await,
    }
}

fn spawn_inference(request: InferenceRequest, tx: mpsc::UnboundedSender<InferenceDone>) -> Pending {
    let InferenceRequest {
        ticket,
        frame,
        backend,
        ..
    } = request;
    let cancelled = Arc::new(AtomicBool::new(false));
    let worker_cancelled = cancelled.clone();
    let frame_size = (frame.width, frame.height);

    let task = tokio::spawn(async move {
        let outcome = tokio::task::spawn_blocking(move || {
            let mut model = backend
                .lock()
                .map_err(|_| anyhow!("model lock poisoned"))?;
            // A superseded request may still be queued on the lock.
            if worker_cancelled.load(Ordering::SeqCst) {
                return Err(anyhow!("inference #{} cancelled before start", ticket));
            }
            model.detect(&frame)
        })
        .await;
        let result = outcome.unwrap_or_else(|e| Err(anyhow!("inference worker panicked: {}", e)));
        let _ = tx.send(InferenceDone {
            ticket,
            frame_size,
            result,
        });
    });

    Pending {
        ticket,
        cancelled,
        task: task.abort_handle(),
    }
}
