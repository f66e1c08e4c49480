//! Session state and its transitions.
//!
//! The orchestrator owns one `SessionState` and threads it through every
//! event. Each transition consumes the state and returns the next one, plus
//! whatever the orchestrator has to do about it (start an inference, render,
//! emit, celebrate). Nothing here performs I/O.

use std::sync::{Arc, Mutex};

use crate::config::{DetectionParams, OverlapPolicy};
use crate::detect::{DetectionResult, DetectorBackend, RawDetection};
use crate::frame::Frame;

pub type SharedBackend = Arc<Mutex<dyn DetectorBackend>>;

pub enum ModelState {
    Loading,
    Ready(SharedBackend),
    /// Load failed; inference stays disabled for the session.
    Failed,
}

/// The inference currently owning the in-flight slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InFlight {
    pub ticket: u64,
    pub frame_seq: u64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub frames: u64,
    pub ticks: u64,
    pub inferences: u64,
    pub skipped_not_ready: u64,
    pub skipped_busy: u64,
    pub superseded: u64,
    pub stale_discarded: u64,
    pub failures: u64,
    pub emitted: u64,
}

/// A request to run the model once.
pub struct InferenceRequest {
    pub ticket: u64,
    pub frame: Arc<Frame>,
    pub backend: SharedBackend,
    /// Ticket of the outstanding inference this one replaces.
    pub superseded: Option<u64>,
}

pub enum TickPlan {
    /// No frame captured yet, or no model loaded.
    NotReady,
    /// An inference is outstanding and the policy skips.
    Busy,
    Infer(InferenceRequest),
}

/// What to do with a finished inference.
#[derive(Debug, Default, PartialEq)]
pub struct Completion {
    /// Detections to draw; `None` for a stale completion.
    pub render: Option<Vec<RawDetection>>,
    /// Results to emit; `None` once the found latch is set.
    pub emit: Option<Vec<DetectionResult>>,
    /// Fire the celebration. True at most once per session.
    pub celebrate: bool,
    /// The found latch engaged on this completion.
    pub latched: bool,
}

pub struct SessionState {
    frame: Option<Arc<Frame>>,
    model: ModelState,
    found: bool,
    in_flight: Option<InFlight>,
    next_ticket: u64,
    last_detections: Vec<RawDetection>,
    stats: SessionStats,
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            frame: None,
            model: ModelState::Loading,
            found: false,
            in_flight: None,
            next_ticket: 1,
            last_detections: Vec::new(),
            stats: SessionStats::default(),
        }
    }

    pub fn found(&self) -> bool {
        self.found
    }

    pub fn frame(&self) -> Option<&Arc<Frame>> {
        self.frame.as_ref()
    }

    pub fn model(&self) -> &ModelState {
        &self.model
    }

    pub fn is_model_ready(&self) -> bool {
        matches!(self.model, ModelState::Ready(_))
    }

    pub fn in_flight(&self) -> Option<InFlight> {
        self.in_flight
    }

    /// Raw detections of the most recent completed inference.
    pub fn last_detections(&self) -> &[RawDetection] {
        &self.last_detections
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    /// Replace the held frame.
    pub fn captured(mut self, frame: Frame) -> Self {
        self.stats.frames += 1;
        self.frame = Some(Arc::new(frame));
        self
    }

    pub fn model_ready(mut self, backend: SharedBackend) -> Self {
        self.model = ModelState::Ready(backend);
        self
    }

    pub fn model_failed(mut self) -> Self {
        self.model = ModelState::Failed;
        self
    }

    /// Decide what a timer tick does.
    pub fn tick(mut self, policy: OverlapPolicy) -> (Self, TickPlan) {
        self.stats.ticks += 1;

        let (frame, backend) = match (&self.frame, &self.model) {
            (Some(frame), ModelState::Ready(backend)) => (frame.clone(), backend.clone()),
            _ => {
                self.stats.skipped_not_ready += 1;
                return (self, TickPlan::NotReady);
            }
        };

        let superseded = match (self.in_flight, policy) {
            (Some(_), OverlapPolicy::SkipWhileBusy) => {
                self.stats.skipped_busy += 1;
                return (self, TickPlan::Busy);
            }
            (Some(outstanding), OverlapPolicy::CancelStale) => {
                self.stats.superseded += 1;
                Some(outstanding.ticket)
            }
            (None, _) => None,
        };

        let ticket = self.next_ticket;
        self.next_ticket += 1;
        self.stats.inferences += 1;
        self.in_flight = Some(InFlight {
            ticket,
            frame_seq: frame.seq,
        });

        let request = InferenceRequest {
            ticket,
            frame,
            backend,
            superseded,
        };
        (self, TickPlan::Infer(request))
    }

    /// Apply a finished inference.
    ///
    /// Rendering happens whether or not the latch is set; emission and the
    /// celebration do not.
    pub fn completed(
        mut self,
        ticket: u64,
        detections: Vec<RawDetection>,
        params: &DetectionParams,
    ) -> (Self, Completion) {
        if !self.owns_slot(ticket) {
            self.stats.stale_discarded += 1;
            return (self, Completion::default());
        }
        self.in_flight = None;

        let results = map_detections_to_results(&detections, params);
        let mut completion = Completion {
            render: Some(detections.clone()),
            ..Completion::default()
        };

        if !self.found {
            self.stats.emitted += 1;
            completion.emit = Some(results.clone());
        }

        if params.stop_on_found && !self.found && results.iter().any(|r| r.matched) {
            self.found = true;
            completion.latched = true;
            completion.celebrate = params.celebrate_on_found;
        }

        self.last_detections = detections;
        (self, completion)
    }

    /// Release the slot after a failed inference. Returns whether the
    /// failure belonged to the current slot holder.
    pub fn failed(mut self, ticket: u64) -> (Self, bool) {
        if !self.owns_slot(ticket) {
            self.stats.stale_discarded += 1;
            return (self, false);
        }
        self.in_flight = None;
        self.stats.failures += 1;
        (self, true)
    }

    fn owns_slot(&self, ticket: u64) -> bool {
        self.in_flight.map(|f| f.ticket) == Some(ticket)
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

/// One result per detection, in order.
pub fn map_detections_to_results(
    detections: &[RawDetection],
    params: &DetectionParams,
) -> Vec<DetectionResult> {
    detections
        .iter()
        .map(|d| DetectionResult::from_raw(d, params))
        .collect()
}
