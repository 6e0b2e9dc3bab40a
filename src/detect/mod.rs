//! Detection stream schema.
//!
//! The neural detector is an external collaborator. This module only accepts
//! its per-frame output and rejects what cannot be analyzed, one detection
//! at a time.

use serde::{Deserialize, Serialize};

use crate::error::DetectionFormatError;

mod result;

pub use result::{BoundingBox, Detection, DetectionClass};

/// Bounding box as it arrives on the wire; every field may be absent.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RawBoundingBox {
    pub x1: Option<f64>,
    pub y1: Option<f64>,
    pub x2: Option<f64>,
    pub y2: Option<f64>,
}

/// One detection as produced upstream, before validation.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RawDetection {
    #[serde(default)]
    pub class: Option<String>,
    #[serde(default)]
    pub bbox: Option<RawBoundingBox>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default, rename = "trackId", alias = "track_id")]
    pub track_id: Option<u64>,
}

impl RawDetection {
    pub fn new(class: &str, bbox: [f64; 4], confidence: f64) -> Self {
        Self {
            class: Some(class.to_string()),
            bbox: Some(RawBoundingBox {
                x1: Some(bbox[0]),
                y1: Some(bbox[1]),
                x2: Some(bbox[2]),
                y2: Some(bbox[3]),
            }),
            confidence: Some(confidence),
            track_id: None,
        }
    }

    pub fn with_track_id(mut self, track_id: u64) -> Self {
        self.track_id = Some(track_id);
        self
    }
}

impl TryFrom<&RawDetection> for Detection {
    type Error = DetectionFormatError;

    fn try_from(raw: &RawDetection) -> Result<Self, Self::Error> {
        let class = raw
            .class
            .as_deref()
            .ok_or(DetectionFormatError::MissingField("class"))
            .and_then(DetectionClass::parse)?;

        let confidence = raw
            .confidence
            .ok_or(DetectionFormatError::MissingField("confidence"))?;
        if !(0.0..=1.0).contains(&confidence) {
            return Err(DetectionFormatError::ConfidenceOutOfRange(confidence));
        }

        let bbox = raw
            .bbox
            .as_ref()
            .ok_or(DetectionFormatError::MissingBoundingBox)?;
        let (x1, y1, x2, y2) = match (bbox.x1, bbox.y1, bbox.x2, bbox.y2) {
            (Some(x1), Some(y1), Some(x2), Some(y2)) => (x1, y1, x2, y2),
            _ => return Err(DetectionFormatError::MissingBoundingBox),
        };

        Ok(Detection {
            class,
            bbox: BoundingBox::new(x1, y1, x2, y2)?,
            confidence,
            track_id: raw.track_id,
        })
    }
}

/// One frame of detector output. `timestamp` is seconds on the stream clock.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionFrame {
    pub timestamp: f64,
    #[serde(default, rename = "frameId", alias = "frame_id")]
    pub frame_id: Option<u64>,
    #[serde(default)]
    pub detections: Vec<RawDetection>,
}

/// Validated contents of a frame.
#[derive(Clone, Debug, Default)]
pub struct ParsedFrame {
    pub timestamp: f64,
    pub detections: Vec<Detection>,
    /// Detections rejected by format validation.
    pub skipped: usize,
}

impl ParsedFrame {
    pub fn of_class(&self, class: DetectionClass) -> impl Iterator<Item = &Detection> {
        self.detections.iter().filter(move |d| d.class == class)
    }
}

impl DetectionFrame {
    pub fn new(timestamp: f64, detections: Vec<RawDetection>) -> Self {
        Self {
            timestamp,
            frame_id: None,
            detections,
        }
    }

    /// Validate every detection, skipping (and counting) the malformed ones.
    pub fn parse(&self) -> ParsedFrame {
        let mut parsed = ParsedFrame {
            timestamp: self.timestamp,
            detections: Vec::with_capacity(self.detections.len()),
            skipped: 0,
        };
        for (index, raw) in self.detections.iter().enumerate() {
            match Detection::try_from(raw) {
                Ok(detection) => parsed.detections.push(detection),
                Err(err) => {
                    log::debug!(
                        "frame t={:.3}: skipping detection #{}: {}",
                        self.timestamp,
                        index,
                        err
                    );
                    parsed.skipped += 1;
                }
            }
        }
        parsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn center_is_bbox_midpoint() {
        let det = Detection::try_from(&RawDetection::new("hand", [10.0, 20.0, 30.0, 60.0], 0.9))
            .unwrap();
        assert_eq!(det.class, DetectionClass::Hand);
        let c = det.center();
        assert_eq!((c.x, c.y), (20.0, 40.0));
    }

    #[test]
    fn malformed_detections_are_skipped_individually() {
        let json = r#"{
            "timestamp": 1.5,
            "detections": [
                {"class": "hand", "bbox": {"x1": 0, "y1": 0, "x2": 10, "y2": 10}, "confidence": 0.8, "trackId": 4},
                {"class": "hand", "confidence": 0.8},
                {"class": "scooper", "bbox": {"x1": 0, "y1": 0, "x2": 10}, "confidence": 0.8},
                {"class": "spatula", "bbox": {"x1": 0, "y1": 0, "x2": 10, "y2": 10}, "confidence": 0.8},
                {"class": "scooper", "bbox": {"x1": 10, "y1": 0, "x2": 0, "y2": 10}, "confidence": 0.8},
                {"class": "person", "bbox": {"x1": 0, "y1": 0, "x2": 10, "y2": 10}, "confidence": 1.2},
                {"class": "Scooper", "bbox": {"x1": 0, "y1": 0, "x2": 4, "y2": 4}, "confidence": 0.5}
            ]
        }"#;
        let frame: DetectionFrame = serde_json::from_str(json).unwrap();
        let parsed = frame.parse();
        assert_eq!(parsed.skipped, 5);
        assert_eq!(parsed.detections.len(), 2);
        assert_eq!(parsed.detections[0].track_id, Some(4));
        assert_eq!(parsed.of_class(DetectionClass::Scooper).count(), 1);
    }

    #[test]
    fn format_errors_name_the_problem() {
        let mut raw = RawDetection::new("hand", [0.0, 0.0, 1.0, 1.0], 0.5);
        raw.bbox = None;
        assert_eq!(
            Detection::try_from(&raw),
            Err(DetectionFormatError::MissingBoundingBox)
        );
        raw.class = None;
        assert_eq!(
            Detection::try_from(&raw),
            Err(DetectionFormatError::MissingField("class"))
        );
    }
}
