use serde::{Deserialize, Serialize};

use crate::config::MovementThresholds;
use crate::geometry::NaturalPoint;

/// Minimum samples needed before motion is classified.
pub const MIN_CLASSIFY_SAMPLES: usize = 3;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovementPattern {
    /// Small, precise motion: taking ingredient.
    Grabbing,
    /// Large, varied sweeps: wiping the station.
    Cleaning,
    Reaching,
    Unknown,
}

impl MovementPattern {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Grabbing => "grabbing",
            Self::Cleaning => "cleaning",
            Self::Reaching => "reaching",
            Self::Unknown => "unknown",
        }
    }
}

/// Step statistics over a position window.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MovementStats {
    pub samples: usize,
    pub avg_step: f64,
    pub max_step: f64,
    pub total_distance: f64,
}

impl MovementStats {
    /// `None` for fewer than two points.
    pub fn from_points<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = NaturalPoint>,
    {
        let mut iter = points.into_iter();
        let mut prev = iter.next()?;
        let mut samples = 1;
        let mut total = 0.0;
        let mut max_step: f64 = 0.0;
        for point in iter {
            let step = prev.distance_to(point);
            total += step;
            max_step = max_step.max(step);
            samples += 1;
            prev = point;
        }
        if samples < 2 {
            return None;
        }
        Some(Self {
            samples,
            avg_step: total / (samples - 1) as f64,
            max_step,
            total_distance: total,
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MovementClassifier {
    thresholds: MovementThresholds,
}

impl MovementClassifier {
    pub fn new(thresholds: MovementThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &MovementThresholds {
        &self.thresholds
    }

    /// Label a hand's recent motion. Rules are evaluated in order: cleaning,
    /// grabbing, reaching, otherwise unknown.
    pub fn classify<I>(&self, points: I) -> MovementPattern
    where
        I: IntoIterator<Item = NaturalPoint>,
    {
        match MovementStats::from_points(points) {
            Some(stats) if stats.samples >= MIN_CLASSIFY_SAMPLES => self.classify_stats(&stats),
            _ => MovementPattern::Unknown,
        }
    }

    pub fn classify_stats(&self, stats: &MovementStats) -> MovementPattern {
        let t = &self.thresholds;
        if stats.avg_step > t.clean_avg_min && stats.max_step > t.clean_step_min {
            MovementPattern::Cleaning
        } else if stats.avg_step < t.grab_avg_max && stats.max_step < t.grab_step_max {
            MovementPattern::Grabbing
        } else if stats.avg_step > t.reach_avg_min {
            MovementPattern::Reaching
        } else {
            MovementPattern::Unknown
        }
    }
}

impl Default for MovementClassifier {
    fn default() -> Self {
        Self::new(MovementThresholds::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(coords: &[(f64, f64)]) -> Vec<NaturalPoint> {
        coords.iter().map(|&(x, y)| NaturalPoint::new(x, y)).collect()
    }

    #[test]
    fn too_few_samples_is_unknown() {
        let c = MovementClassifier::default();
        assert_eq!(c.classify(path(&[])), MovementPattern::Unknown);
        assert_eq!(
            c.classify(path(&[(0.0, 0.0), (1.0, 0.0)])),
            MovementPattern::Unknown
        );
    }

    #[test]
    fn small_motion_is_grabbing() {
        // 5px total over 4 samples
        let c = MovementClassifier::default();
        let p = path(&[(100.0, 100.0), (102.0, 100.0), (103.5, 100.0), (105.0, 100.0)]);
        let stats = MovementStats::from_points(p.clone()).unwrap();
        assert!((stats.total_distance - 5.0).abs() < 1e-9);
        assert_eq!(c.classify(p), MovementPattern::Grabbing);
    }

    #[test]
    fn large_sweep_with_jump_is_cleaning() {
        // 40px sweep including a single 35px jump
        let c = MovementClassifier::default();
        let p = path(&[(100.0, 100.0), (102.5, 100.0), (137.5, 100.0), (140.0, 100.0)]);
        let stats = MovementStats::from_points(p.clone()).unwrap();
        assert!((stats.total_distance - 40.0).abs() < 1e-9);
        assert!((stats.max_step - 35.0).abs() < 1e-9);
        assert_eq!(c.classify(p), MovementPattern::Cleaning);
    }

    #[test]
    fn steady_medium_motion_is_reaching() {
        let c = MovementClassifier::default();
        let p = path(&[(0.0, 0.0), (9.0, 0.0), (18.0, 0.0), (27.0, 0.0)]);
        assert_eq!(c.classify(p), MovementPattern::Reaching);
    }

    #[test]
    fn between_bands_is_unknown() {
        // avg 6: not a grab (>= 5), not a reach (<= 8), no jump
        let c = MovementClassifier::default();
        let p = path(&[(0.0, 0.0), (6.0, 0.0), (12.0, 0.0), (18.0, 0.0)]);
        assert_eq!(c.classify(p), MovementPattern::Unknown);
    }

    #[test]
    fn cleaning_wins_over_reaching() {
        let c = MovementClassifier::default();
        // avg 20 > reach and > clean avg; max 40 > clean step
        let p = path(&[(0.0, 0.0), (10.0, 0.0), (50.0, 0.0), (60.0, 0.0)]);
        assert_eq!(c.classify(p), MovementPattern::Cleaning);
    }
}
