//! Violation records.
//!
//! Records are created by the analyzer (through the emitter) and mutated only
//! by acknowledgement. They are never deleted.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::geometry::NaturalPoint;
use crate::tracking::{HandId, MovementPattern};
use crate::zone::ZoneId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ViolationType {
    HandWithoutScooper,
    CrossContamination,
    ExtendedContact,
    ImproperToolUse,
}

impl ViolationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HandWithoutScooper => "hand-without-scooper",
            Self::CrossContamination => "cross-contamination",
            Self::ExtendedContact => "extended-contact",
            Self::ImproperToolUse => "improper-tool-use",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            Self::HandWithoutScooper | Self::CrossContamination => Severity::High,
            Self::ExtendedContact => Severity::Medium,
            Self::ImproperToolUse => Severity::Low,
        }
    }
}

impl fmt::Display for ViolationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

/// What the analyzer decided, before it becomes a record.
#[derive(Clone, Debug, PartialEq)]
pub struct ViolationDecision {
    pub violation_type: ViolationType,
    pub hand_id: HandId,
    pub zone_id: ZoneId,
    /// Zone the hand came from (cross-contamination only).
    pub previous_zone_id: Option<ZoneId>,
    pub position: NaturalPoint,
    pub timestamp: f64,
    pub confidence: f64,
    pub movement_pattern: MovementPattern,
    /// Distance to the nearest scooper, if any scooper was detected.
    pub scooper_distance: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Violation {
    pub id: String,
    #[serde(rename = "type")]
    pub violation_type: ViolationType,
    pub severity: Severity,
    pub confidence: f64,
    pub timestamp: f64,
    pub position: NaturalPoint,
    pub zone_id: ZoneId,
    pub movement_pattern: MovementPattern,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_zone_id: Option<ZoneId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scooper_distance: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hand_id: Option<String>,
    pub resolved: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acknowledged_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acknowledged_at: Option<f64>,
}

impl Violation {
    pub fn from_decision(id: String, decision: ViolationDecision) -> Self {
        Self {
            id,
            severity: decision.violation_type.severity(),
            violation_type: decision.violation_type,
            confidence: decision.confidence,
            timestamp: decision.timestamp,
            position: decision.position,
            zone_id: decision.zone_id,
            movement_pattern: decision.movement_pattern,
            previous_zone_id: decision.previous_zone_id,
            scooper_distance: decision.scooper_distance,
            hand_id: Some(decision.hand_id.to_string()),
            resolved: false,
            acknowledged_by: None,
            acknowledged_at: None,
        }
    }

    /// Mark resolved. The first acknowledgement wins; later calls are no-ops.
    pub fn acknowledge(&mut self, by: &str, at: f64) -> bool {
        if self.resolved {
            return false;
        }
        self.resolved = true;
        self.acknowledged_by = Some(by.to_string());
        self.acknowledged_at = Some(at);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decision() -> ViolationDecision {
        ViolationDecision {
            violation_type: ViolationType::ExtendedContact,
            hand_id: HandId::Track(9),
            zone_id: ZoneId(2),
            previous_zone_id: None,
            position: NaturalPoint::new(1.0, 2.0),
            timestamp: 12.5,
            confidence: 0.7,
            movement_pattern: MovementPattern::Unknown,
            scooper_distance: None,
        }
    }

    #[test]
    fn record_wire_shape() {
        let v = Violation::from_decision("vio-test-1".to_string(), decision());
        let value = serde_json::to_value(&v).unwrap();
        assert_eq!(value["type"], "extended-contact");
        assert_eq!(value["severity"], "medium");
        assert_eq!(value["zoneId"], 2);
        assert_eq!(value["movementPattern"], "unknown");
        assert_eq!(value["position"]["x"], 1.0);
        assert_eq!(value["resolved"], false);
        assert!(value.get("acknowledgedBy").is_none());
    }

    #[test]
    fn first_acknowledgement_wins() {
        let mut v = Violation::from_decision("vio-test-1".to_string(), decision());
        assert!(v.acknowledge("alice", 20.0));
        assert!(!v.acknowledge("bob", 30.0));
        assert!(v.resolved);
        assert_eq!(v.acknowledged_by.as_deref(), Some("alice"));
        assert_eq!(v.acknowledged_at, Some(20.0));
    }
}
