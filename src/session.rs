//! One engine instance per monitored stream.
//!
//! A session owns the zone registry, the hand tracker and the emitter for a
//! single video stream. It is not shared across streams and is driven from
//! one thread: frames are processed strictly in arrival order.

use anyhow::Result;

use crate::analysis::ViolationAnalyzer;
use crate::config::EngineConfig;
use crate::detect::DetectionFrame;
use crate::editor::ZoneEditor;
use crate::emit::{ViolationEmitter, ViolationSink, ViolationStats};
use crate::geometry::CoordinateTransform;
use crate::tracking::HandTracker;
use crate::violation::Violation;
use crate::zone::ZoneRegistry;

pub struct HygieneSession {
    config: EngineConfig,
    registry: ZoneRegistry,
    tracker: HandTracker,
    analyzer: ViolationAnalyzer,
    emitter: ViolationEmitter,
    frames_processed: u64,
    detections_skipped: u64,
}

impl HygieneSession {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            registry: ZoneRegistry::with_min_separation(config.editor.min_point_separation),
            tracker: HandTracker::new(config.analyzer.temporal_window),
            analyzer: ViolationAnalyzer::new(config.analyzer.clone()),
            emitter: ViolationEmitter::new(config.violation_history_capacity),
            frames_processed: 0,
            detections_skipped: 0,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Parse, track, classify, decide and emit for one frame.
    pub fn process_frame(&mut self, frame: &DetectionFrame) -> Vec<Violation> {
        let parsed = frame.parse();
        self.frames_processed += 1;
        self.detections_skipped += parsed.skipped as u64;

        let decisions = self
            .analyzer
            .analyze(&parsed, &self.registry, &mut self.tracker);
        decisions
            .into_iter()
            .map(|decision| self.emitter.emit(decision))
            .collect()
    }

    pub fn registry(&self) -> &ZoneRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut ZoneRegistry {
        &mut self.registry
    }

    pub fn tracker(&self) -> &HandTracker {
        &self.tracker
    }

    /// A zone editor over `transform`, configured from this session. Pass
    /// `registry_mut()` to its mutating calls.
    pub fn editor(&self, transform: CoordinateTransform) -> ZoneEditor {
        ZoneEditor::new(transform, self.config.editor.clone())
    }

    pub fn add_sink<S>(&mut self, sink: S)
    where
        S: ViolationSink + 'static,
    {
        self.emitter.add_sink(sink);
    }

    pub fn emitter(&self) -> &ViolationEmitter {
        &self.emitter
    }

    pub fn acknowledge(&mut self, violation_id: &str, by: &str, at: f64) -> Result<bool> {
        self.emitter.acknowledge(violation_id, by, at)
    }

    pub fn stats(&self) -> ViolationStats {
        self.emitter.stats()
    }

    pub fn frames_processed(&self) -> u64 {
        self.frames_processed
    }

    pub fn detections_skipped(&self) -> u64 {
        self.detections_skipped
    }
}
