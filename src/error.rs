//! Error taxonomy for the hygiene kernel.
//!
//! None of these are fatal to the per-frame pipeline. Geometry and detection
//! errors degrade analysis for one zone or one detection; editor errors are
//! structured validation results for the authoring caller.

use std::fmt;

use crate::zone::ZoneId;

/// Malformed zone geometry.
#[derive(Clone, Debug, PartialEq)]
pub enum GeometryError {
    /// Polygon has fewer than three vertices.
    TooFewPoints { count: usize },
    /// Two vertices are closer than the minimum separation.
    PointsTooClose {
        first: usize,
        second: usize,
        distance: f64,
    },
    /// Two non-adjacent edges cross or overlap.
    SelfIntersecting { edge_a: usize, edge_b: usize },
    /// Polygon whose vertices enclose no area (all collinear).
    DegeneratePolygon,
    /// Rectangle with zero width or height.
    DegenerateRectangle,
    /// A coordinate is NaN or infinite.
    NonFinite { index: usize },
    /// A coordinate space with zero, negative or non-finite extent.
    InvalidDimensions { width: f64, height: f64 },
}

impl GeometryError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::TooFewPoints { .. } => "GEOMETRY_TOO_FEW_POINTS",
            Self::PointsTooClose { .. } => "GEOMETRY_POINTS_TOO_CLOSE",
            Self::SelfIntersecting { .. } => "GEOMETRY_SELF_INTERSECTING",
            Self::DegeneratePolygon => "GEOMETRY_DEGENERATE_POLYGON",
            Self::DegenerateRectangle => "GEOMETRY_DEGENERATE_RECTANGLE",
            Self::NonFinite { .. } => "GEOMETRY_NON_FINITE",
            Self::InvalidDimensions { .. } => "GEOMETRY_INVALID_DIMENSIONS",
        }
    }
}

impl fmt::Display for GeometryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooFewPoints { count } => write!(
                f,
                "cannot close polygon: needs at least 3 points, has {}",
                count
            ),
            Self::PointsTooClose {
                first,
                second,
                distance,
            } => write!(
                f,
                "points too close together: #{} and #{} are {:.2}px apart",
                first, second, distance
            ),
            Self::SelfIntersecting { edge_a, edge_b } => write!(
                f,
                "polygon edges #{} and #{} intersect",
                edge_a, edge_b
            ),
            Self::DegeneratePolygon => write!(f, "polygon encloses no area"),
            Self::DegenerateRectangle => write!(f, "rectangle has zero width or height"),
            Self::NonFinite { index } => write!(f, "point #{} is not a finite coordinate", index),
            Self::InvalidDimensions { width, height } => {
                write!(f, "invalid coordinate space {}x{}", width, height)
            }
        }
    }
}

impl std::error::Error for GeometryError {}

/// A detection that cannot be used for analysis.
#[derive(Clone, Debug, PartialEq)]
pub enum DetectionFormatError {
    MissingField(&'static str),
    MissingBoundingBox,
    InvalidBoundingBox { x1: f64, y1: f64, x2: f64, y2: f64 },
    ConfidenceOutOfRange(f64),
    UnknownClass(String),
}

impl fmt::Display for DetectionFormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingField(field) => write!(f, "detection is missing '{}'", field),
            Self::MissingBoundingBox => write!(f, "detection has no bounding box"),
            Self::InvalidBoundingBox { x1, y1, x2, y2 } => write!(
                f,
                "invalid bounding box ({}, {}, {}, {})",
                x1, y1, x2, y2
            ),
            Self::ConfidenceOutOfRange(c) => write!(f, "confidence {} outside [0, 1]", c),
            Self::UnknownClass(class) => write!(f, "unknown detection class '{}'", class),
        }
    }
}

impl std::error::Error for DetectionFormatError {}

/// Zone registry failures.
#[derive(Clone, Debug, PartialEq)]
pub enum ZoneError {
    UnknownZone(ZoneId),
    InvalidName(String),
    DuplicateId(ZoneId),
    /// Every `ZoneId` value is taken.
    IdsExhausted,
    Geometry(GeometryError),
}

impl fmt::Display for ZoneError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownZone(id) => write!(f, "unknown zone {}", id),
            Self::InvalidName(name) => write!(
                f,
                "zone name '{}' must be 1..=64 letters, digits, spaces or _-.()",
                name
            ),
            Self::DuplicateId(id) => write!(f, "zone {} already exists", id),
            Self::IdsExhausted => write!(f, "no zone ids left to assign"),
            Self::Geometry(err) => write!(f, "invalid zone geometry: {}", err),
        }
    }
}

impl std::error::Error for ZoneError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Geometry(err) => Some(err),
            _ => None,
        }
    }
}

impl From<GeometryError> for ZoneError {
    fn from(err: GeometryError) -> Self {
        Self::Geometry(err)
    }
}

/// Structured result of a rejected editor action. The editor state is left
/// unchanged whenever one of these is returned.
#[derive(Clone, Debug, PartialEq)]
pub enum EditorError {
    Validation(GeometryError),
    Zone(ZoneError),
    /// The action is not valid in the editor's current state.
    InvalidState {
        action: &'static str,
        state: &'static str,
    },
    /// Only polygon zones can be edited point by point.
    NotEditable(ZoneId),
    /// Deleting would leave fewer than three points.
    MinimumPoints,
    NothingSelected,
    NothingToUndo,
    NothingToRedo,
}

impl fmt::Display for EditorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{}", err),
            Self::Zone(err) => write!(f, "{}", err),
            Self::InvalidState { action, state } => {
                write!(f, "cannot {} while editor is {}", action, state)
            }
            Self::NotEditable(id) => write!(f, "zone {} is not a polygon and cannot be edited", id),
            Self::MinimumPoints => write!(f, "cannot delete point: polygon needs at least 3 points"),
            Self::NothingSelected => write!(f, "no point selected"),
            Self::NothingToUndo => write!(f, "nothing to undo"),
            Self::NothingToRedo => write!(f, "nothing to redo"),
        }
    }
}

impl std::error::Error for EditorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Zone(err) => Some(err),
            _ => None,
        }
    }
}

impl From<GeometryError> for EditorError {
    fn from(err: GeometryError) -> Self {
        Self::Validation(err)
    }
}

impl From<ZoneError> for EditorError {
    fn from(err: ZoneError) -> Self {
        match err {
            ZoneError::Geometry(geom) => Self::Validation(geom),
            other => Self::Zone(other),
        }
    }
}
