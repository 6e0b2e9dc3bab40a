//! Per-frame violation decisions.
//!
//! The analyzer is stateless: temporal state lives in the `HandTracker`
//! it is handed, zone geometry in the `ZoneRegistry`. Each call runs to
//! completion and returns the decisions for that frame only.

use crate::config::AnalyzerConfig;
use crate::detect::{Detection, DetectionClass, ParsedFrame};
use crate::geometry::NaturalPoint;
use crate::tracking::{
    ContactEpisode, HandId, HandTrackState, HandTracker, MovementClassifier, MovementPattern,
    ZoneVisit,
};
use crate::violation::{ViolationDecision, ViolationType};
use crate::zone::{Zone, ZoneRegistry};

#[derive(Clone, Debug)]
pub struct ViolationAnalyzer {
    config: AnalyzerConfig,
    classifier: MovementClassifier,
}

/// Facts about one hand in one frame, shared by the individual checks.
struct HandObservation<'a> {
    hand_id: HandId,
    position: NaturalPoint,
    timestamp: f64,
    confidence: f64,
    pattern: MovementPattern,
    scooper_distance: Option<f64>,
    scooper_in_use: bool,
    zone: &'a Zone,
}

impl HandObservation<'_> {
    fn decision(&self, violation_type: ViolationType) -> ViolationDecision {
        ViolationDecision {
            violation_type,
            hand_id: self.hand_id,
            zone_id: self.zone.id,
            previous_zone_id: None,
            position: self.position,
            timestamp: self.timestamp,
            confidence: self.confidence,
            movement_pattern: self.pattern,
            scooper_distance: self.scooper_distance,
        }
    }
}

impl ViolationAnalyzer {
    pub fn new(config: AnalyzerConfig) -> Self {
        let classifier = MovementClassifier::new(config.movement);
        Self { config, classifier }
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    pub fn classifier(&self) -> &MovementClassifier {
        &self.classifier
    }

    /// A hand's identity: its upstream track id, else its slot among the
    /// frame's accepted hand detections.
    pub fn hand_id(detection: &Detection, slot: usize) -> HandId {
        detection
            .track_id
            .map(HandId::Track)
            .unwrap_or(HandId::Slot(slot))
    }

    /// Run every check for the hands observed in `frame`.
    pub fn analyze(
        &self,
        frame: &ParsedFrame,
        registry: &ZoneRegistry,
        tracker: &mut HandTracker,
    ) -> Vec<ViolationDecision> {
        let now = frame.timestamp;
        tracker.expire(now, self.config.idle_expiry);

        let sensitivity = self.config.sensitivity;
        let scoopers: Vec<NaturalPoint> = frame
            .of_class(DetectionClass::Scooper)
            .filter(|d| d.confidence >= sensitivity)
            .map(Detection::center)
            .collect();

        let mut decisions = Vec::new();
        let hands = frame
            .of_class(DetectionClass::Hand)
            .filter(|d| d.confidence >= sensitivity);
        for (slot, hand) in hands.enumerate() {
            let hand_id = Self::hand_id(hand, slot);
            let position = hand.center();
            let state = tracker.update(hand_id, position, now);
            state.last_confidence = hand.confidence;
            self.analyze_hand(state, position, now, &scoopers, registry, &mut decisions);
        }
        decisions
    }

    fn analyze_hand(
        &self,
        state: &mut HandTrackState,
        position: NaturalPoint,
        now: f64,
        scoopers: &[NaturalPoint],
        registry: &ZoneRegistry,
        decisions: &mut Vec<ViolationDecision>,
    ) {
        state.prune_zone_history(now, self.config.zone_history_retention);

        let zone = registry.monitored_zone_at(position);
        let current_id = zone.map(|z| z.id);
        if let Some(previous) = state.last_zone.filter(|prev| Some(*prev) != current_id) {
            log::debug!("{} left {}", state.hand_id, previous);
            state.clear_episodes_for(previous);
        }
        state.last_zone = current_id;

        let pattern = self.classifier.classify(state.points());
        if pattern == MovementPattern::Cleaning {
            log::debug!("{} cleaning; episodes reset", state.hand_id);
            state.last_cleaning_at = Some(now);
            state.active_violations.clear();
            state.contact = None;
        }
        let Some(zone) = zone else {
            return;
        };
        let previous_visit = record_visit(state, zone, now);
        if pattern == MovementPattern::Cleaning || !zone.requires_scooper {
            return;
        }

        let scooper_distance = scoopers
            .iter()
            .map(|s| s.distance_to(position))
            .min_by(|a, b| a.total_cmp(b));
        let scooper_in_use =
            scooper_distance.is_some_and(|d| d < self.config.scooper_proximity_px);

        let obs = HandObservation {
            hand_id: state.hand_id,
            position,
            timestamp: now,
            confidence: state.last_confidence,
            pattern,
            scooper_distance,
            scooper_in_use,
            zone,
        };

        if let Some(previous) = previous_visit {
            if let Some(decision) = self.check_cross_contamination(state, &obs, &previous) {
                decisions.push(decision);
            }
        }

        if obs.scooper_in_use {
            state
                .active_violations
                .remove(&(ViolationType::HandWithoutScooper, zone.id));
            state.contact = None;
            return;
        }

        if let Some(decision) = self.check_hand_without_scooper(state, &obs) {
            decisions.push(decision);
        }
        if let Some(decision) = self.check_extended_contact(state, &obs) {
            decisions.push(decision);
        }
    }

    fn check_hand_without_scooper(
        &self,
        state: &mut HandTrackState,
        obs: &HandObservation<'_>,
    ) -> Option<ViolationDecision> {
        if obs.pattern != MovementPattern::Grabbing {
            return None;
        }
        let key = (ViolationType::HandWithoutScooper, obs.zone.id);
        if !state.active_violations.insert(key) {
            return None;
        }
        log::debug!(
            "{} grabbing in {} without scooper (nearest {:?})",
            obs.hand_id,
            obs.zone.id,
            obs.scooper_distance
        );
        Some(obs.decision(ViolationType::HandWithoutScooper))
    }

    /// Flag the move from the previous visit into `obs.zone` when both zones
    /// need a scooper, hold different ingredients, and no cleaning happened
    /// since the hand left the previous zone.
    fn check_cross_contamination(
        &self,
        state: &HandTrackState,
        obs: &HandObservation<'_>,
        previous: &ZoneVisit,
    ) -> Option<ViolationDecision> {
        if !previous.requires_scooper || previous.ingredient_category == obs.zone.ingredient_category
        {
            return None;
        }
        let elapsed = obs.timestamp - previous.last_seen;
        if elapsed >= self.config.cross_contamination_grace_secs {
            return None;
        }
        if state
            .last_cleaning_at
            .is_some_and(|cleaned| cleaned >= previous.last_seen)
        {
            return None;
        }
        log::debug!(
            "{} moved {} ({}) -> {} ({}) after {:.2}s",
            obs.hand_id,
            previous.zone_id,
            previous.ingredient_category,
            obs.zone.id,
            obs.zone.ingredient_category,
            elapsed
        );
        let mut decision = obs.decision(ViolationType::CrossContamination);
        decision.previous_zone_id = Some(previous.zone_id);
        Some(decision)
    }

    fn check_extended_contact(
        &self,
        state: &mut HandTrackState,
        obs: &HandObservation<'_>,
    ) -> Option<ViolationDecision> {
        if !matches!(state.contact, Some(c) if c.zone_id == obs.zone.id) {
            state.contact = Some(ContactEpisode {
                zone_id: obs.zone.id,
                since: obs.timestamp,
                reported: false,
            });
        }
        let episode = state.contact.as_mut()?;
        if episode.reported || obs.timestamp - episode.since <= self.config.extended_contact_secs {
            return None;
        }
        episode.reported = true;
        Some(obs.decision(ViolationType::ExtendedContact))
    }
}

/// Update the hand's zone history for a sighting in `zone` and return the
/// visit it just transitioned out of, if any.
fn record_visit(state: &mut HandTrackState, zone: &Zone, now: f64) -> Option<ZoneVisit> {
    if let Some(last) = state.zone_history.back_mut() {
        if last.zone_id == zone.id {
            last.last_seen = now;
            return None;
        }
    }
    let previous = state.zone_history.back().cloned();
    state.zone_history.push_back(ZoneVisit {
        zone_id: zone.id,
        ingredient_category: zone.ingredient_category.clone(),
        requires_scooper: zone.requires_scooper,
        entered_at: now,
        last_seen: now,
    });
    previous
}
