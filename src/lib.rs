//! Hygiene Kernel
//!
//! Zone geometry and violation analysis for food-preparation hygiene
//! monitoring. A detector upstream reports hands, scoopers, persons and
//! product per frame; operators draw hygiene zones over the frame. The
//! kernel decides, frame by frame, whether a hand is working a
//! scooper-required zone without a scooper.
//!
//! # Architecture
//!
//! The kernel holds these invariants by construction:
//!
//! 1. **Natural-space storage**: zones live in frame coordinates. Display
//!    coordinates are a distinct type and only reach a zone through
//!    `CoordinateTransform`.
//! 2. **Valid geometry**: a polygon zone has at least three points, no two
//!    closer than the minimum separation, and no crossing edges.
//! 3. **Bounded state**: hand positions, zone visits, undo history and
//!    violation history are all windowed or capacity-bounded.
//! 4. **Deterministic decisions**: violations follow from thresholds only.
//! 5. **Local degradation**: a malformed zone or detection is skipped on
//!    its own; the frame is still analyzed.
//!
//! # Module Structure
//!
//! - `geometry`: points, shapes, containment, proximity, validation, transform
//! - `zone`: zone records, payloads, the registry
//! - `editor`: the authoring state machine and its undo history
//! - `detect`: the detection stream schema
//! - `tracking`: per-hand windows and the movement classifier
//! - `analysis`: per-frame violation decisions
//! - `emit`: violation records, sinks, statistics
//! - `session`: one engine per monitored stream

pub mod analysis;
pub mod config;
pub mod detect;
pub mod editor;
pub mod emit;
pub mod error;
pub mod geometry;
pub mod session;
pub mod tracking;
pub mod violation;
pub mod zone;

pub use analysis::ViolationAnalyzer;
pub use config::{AnalyzerConfig, EditorConfig, EngineConfig, MovementThresholds};
pub use detect::{
    BoundingBox, Detection, DetectionClass, DetectionFrame, ParsedFrame, RawBoundingBox,
    RawDetection,
};
pub use editor::{EditOutcome, EditorMode, ZoneDraft, ZoneEditor};
pub use emit::{JsonLinesSink, ViolationEmitter, ViolationSink, ViolationStats};
pub use error::{DetectionFormatError, EditorError, GeometryError, ZoneError};
pub use geometry::{
    CoordinateTransform, DisplayPoint, DisplaySpace, Natural, NaturalPoint, Point, Shape,
    ShapeKind,
};
pub use session::HygieneSession;
pub use tracking::{HandId, HandTracker, MovementClassifier, MovementPattern};
pub use violation::{Severity, Violation, ViolationDecision, ViolationType};
pub use zone::{Zone, ZoneId, ZonePayload, ZoneRegistry, ZoneShape, ZoneSpec};
