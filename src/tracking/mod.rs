//! Per-hand temporal state.
//!
//! Identity comes from upstream: a hand keeps its `HandId` across frames only
//! if the detector keeps its track id stable. The tracker never re-derives it.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt;

use crate::geometry::NaturalPoint;
use crate::violation::ViolationType;
use crate::zone::ZoneId;

pub mod classifier;

pub use classifier::{MovementClassifier, MovementPattern, MovementStats};

/// Transient hand identity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HandId {
    /// Upstream track id.
    Track(u64),
    /// Position among the frame's hand detections when no track id was given.
    Slot(usize),
}

impl fmt::Display for HandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Track(id) => write!(f, "hand:track:{}", id),
            Self::Slot(slot) => write!(f, "hand:slot:{}", slot),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PositionSample {
    pub point: NaturalPoint,
    pub timestamp: f64,
}

/// One stay of a hand inside a zone.
#[derive(Clone, Debug, PartialEq)]
pub struct ZoneVisit {
    pub zone_id: ZoneId,
    pub ingredient_category: String,
    pub requires_scooper: bool,
    pub entered_at: f64,
    pub last_seen: f64,
}

/// Continuous unscoopered presence in a scooper-required zone.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ContactEpisode {
    pub zone_id: ZoneId,
    pub since: f64,
    pub reported: bool,
}

#[derive(Clone, Debug)]
pub struct HandTrackState {
    pub hand_id: HandId,
    positions: VecDeque<PositionSample>,
    /// Zone containing the latest position, if any.
    pub last_zone: Option<ZoneId>,
    /// Zone visits, oldest first. Pruned on its own retention window.
    pub zone_history: VecDeque<ZoneVisit>,
    /// Open violation episodes, keyed by type and zone.
    pub active_violations: BTreeSet<(ViolationType, ZoneId)>,
    pub contact: Option<ContactEpisode>,
    pub last_cleaning_at: Option<f64>,
    /// Confidence of the most recent detection of this hand.
    pub last_confidence: f64,
}

impl HandTrackState {
    fn new(hand_id: HandId) -> Self {
        Self {
            hand_id,
            positions: VecDeque::new(),
            last_zone: None,
            zone_history: VecDeque::new(),
            active_violations: BTreeSet::new(),
            contact: None,
            last_cleaning_at: None,
            last_confidence: 0.0,
        }
    }

    pub fn positions(&self) -> impl Iterator<Item = &PositionSample> {
        self.positions.iter()
    }

    pub fn points(&self) -> impl Iterator<Item = NaturalPoint> + '_ {
        self.positions.iter().map(|s| s.point)
    }

    pub fn sample_count(&self) -> usize {
        self.positions.len()
    }

    pub fn latest(&self) -> Option<&PositionSample> {
        self.positions.back()
    }

    pub fn last_seen(&self) -> Option<f64> {
        self.latest().map(|s| s.timestamp)
    }

    /// Drop zone visits last seen before `now - retention`.
    pub fn prune_zone_history(&mut self, now: f64, retention: f64) {
        let cutoff = now - retention;
        while let Some(oldest) = self.zone_history.front() {
            if oldest.last_seen < cutoff {
                self.zone_history.pop_front();
            } else {
                break;
            }
        }
    }

    /// Close every open episode for `zone_id`.
    pub fn clear_episodes_for(&mut self, zone_id: ZoneId) {
        self.active_violations.retain(|(_, z)| *z != zone_id);
        if self.contact.is_some_and(|c| c.zone_id == zone_id) {
            self.contact = None;
        }
    }
}

/// Identity -> state map with a sliding position window and idle expiry.
#[derive(Clone, Debug)]
pub struct HandTracker {
    hands: BTreeMap<HandId, HandTrackState>,
    temporal_window: f64,
}

impl HandTracker {
    pub fn new(temporal_window: f64) -> Self {
        Self {
            hands: BTreeMap::new(),
            temporal_window,
        }
    }

    pub fn temporal_window(&self) -> f64 {
        self.temporal_window
    }

    /// Record a sighting, creating state on first sight, then prune samples
    /// older than `timestamp - temporal_window`.
    ///
    /// An exact repeat of the latest sample, or a sample older than it, is
    /// not appended.
    pub fn update(
        &mut self,
        hand_id: HandId,
        point: NaturalPoint,
        timestamp: f64,
    ) -> &mut HandTrackState {
        let state = self
            .hands
            .entry(hand_id)
            .or_insert_with(|| HandTrackState::new(hand_id));

        let accept = match state.positions.back() {
            Some(last) if last.timestamp > timestamp => {
                log::debug!(
                    "{}: ignoring out-of-order sample t={:.3} (latest t={:.3})",
                    hand_id,
                    timestamp,
                    last.timestamp
                );
                false
            }
            Some(last) => !(last.timestamp == timestamp && last.point == point),
            None => true,
        };
        if accept {
            state.positions.push_back(PositionSample { point, timestamp });
        }

        let cutoff = timestamp - self.temporal_window;
        while let Some(oldest) = state.positions.front() {
            if oldest.timestamp < cutoff {
                state.positions.pop_front();
            } else {
                break;
            }
        }
        state
    }

    /// Forget hands whose latest sample is older than `now - idle_threshold`.
    /// Returns the forgotten ids.
    pub fn expire(&mut self, now: f64, idle_threshold: f64) -> Vec<HandId> {
        let cutoff = now - idle_threshold;
        let stale: Vec<HandId> = self
            .hands
            .values()
            .filter(|state| state.last_seen().map_or(true, |t| t < cutoff))
            .map(|state| state.hand_id)
            .collect();
        for id in &stale {
            self.hands.remove(id);
            log::debug!("{} expired after {:.1}s idle", id, idle_threshold);
        }
        stale
    }

    pub fn get(&self, hand_id: HandId) -> Option<&HandTrackState> {
        self.hands.get(&hand_id)
    }

    pub fn get_mut(&mut self, hand_id: HandId) -> Option<&mut HandTrackState> {
        self.hands.get_mut(&hand_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &HandTrackState> {
        self.hands.values()
    }

    pub fn len(&self) -> usize {
        self.hands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hands.is_empty()
    }

    pub fn clear(&mut self) {
        self.hands.clear();
    }
}
