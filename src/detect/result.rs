use serde::{Deserialize, Serialize};

use crate::config::DetectionParams;

/// Axis-aligned box in frame pixel coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl BoundingBox {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn area(&self) -> f32 {
        self.width.max(0.0) * self.height.max(0.0)
    }

    /// Intersection over union; 0 when either box is degenerate.
    pub fn iou(&self, other: &BoundingBox) -> f32 {
        let x0 = self.x.max(other.x);
        let y0 = self.y.max(other.y);
        let x1 = (self.x + self.width).min(other.x + other.width);
        let y1 = (self.y + self.height).min(other.y + other.height);
        let inter = (x1 - x0).max(0.0) * (y1 - y0).max(0.0);
        let union = self.area() + other.area() - inter;
        if union <= 0.0 {
            0.0
        } else {
            inter / union
        }
    }
}

/// One object instance reported by a model for a single frame.
#[derive(Clone, Debug, PartialEq)]
pub struct RawDetection {
    pub label: String,
    pub confidence: f32,
    pub bbox: BoundingBox,
}

impl RawDetection {
    pub fn new(label: impl Into<String>, confidence: f32, bbox: BoundingBox) -> Self {
        Self {
            label: label.into(),
            confidence,
            bbox,
        }
    }
}

/// A detection annotated with whether it satisfies the configured target.
///
/// Serialized with the field names the result view consumes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    #[serde(rename = "correct")]
    pub matched: bool,
    #[serde(rename = "object")]
    pub label: String,
    #[serde(rename = "certainty")]
    pub confidence: f32,
}

impl DetectionResult {
    /// Apply the label/threshold filter. The threshold comparison is strict.
    pub fn from_raw(raw: &RawDetection, params: &DetectionParams) -> Self {
        Self {
            matched: raw.confidence > params.confidence_threshold
                && raw.label == params.target_label,
            label: raw.label.clone(),
            confidence: raw.confidence,
        }
    }
}
