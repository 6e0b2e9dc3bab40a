use serde::{Deserialize, Serialize};

use crate::error::DetectionFormatError;
use crate::geometry::NaturalPoint;

/// Object classes produced by the upstream detector.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectionClass {
    Hand,
    Person,
    Scooper,
    Product,
}

impl DetectionClass {
    pub fn parse(raw: &str) -> Result<Self, DetectionFormatError> {
        match raw.trim().to_lowercase().as_str() {
            "hand" => Ok(Self::Hand),
            "person" => Ok(Self::Person),
            "scooper" | "scoop" => Ok(Self::Scooper),
            "product" | "pizza" => Ok(Self::Product),
            _ => Err(DetectionFormatError::UnknownClass(raw.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hand => "hand",
            Self::Person => "person",
            Self::Scooper => "scooper",
            Self::Product => "product",
        }
    }
}

/// Axis-aligned box in natural-space pixels, `x1 <= x2`, `y1 <= y2`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl BoundingBox {
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Result<Self, DetectionFormatError> {
        let finite = [x1, y1, x2, y2].iter().all(|v| v.is_finite());
        if !finite || x2 < x1 || y2 < y1 {
            return Err(DetectionFormatError::InvalidBoundingBox { x1, y1, x2, y2 });
        }
        Ok(Self { x1, y1, x2, y2 })
    }

    pub fn center(&self) -> NaturalPoint {
        NaturalPoint::new((self.x1 + self.x2) / 2.0, (self.y1 + self.y2) / 2.0)
    }

    pub fn width(&self) -> f64 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f64 {
        self.y2 - self.y1
    }
}

/// A validated detection.
#[derive(Clone, Debug, PartialEq)]
pub struct Detection {
    pub class: DetectionClass,
    pub bbox: BoundingBox,
    /// 0..=1
    pub confidence: f64,
    pub track_id: Option<u64>,
}

impl Detection {
    pub fn new(class: DetectionClass, bbox: BoundingBox, confidence: f64) -> Self {
        Self {
            class,
            bbox,
            confidence,
            track_id: None,
        }
    }

    pub fn with_track_id(mut self, track_id: u64) -> Self {
        self.track_id = Some(track_id);
        self
    }

    pub fn center(&self) -> NaturalPoint {
        self.bbox.center()
    }
}
