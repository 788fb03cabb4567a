use serde::Serialize;

use crate::domain::value_objects::Detection;

/// Running statistics for one session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AggregateStats {
    /// Ticks containing at least one fall, not individual fall detections
    pub fall_event_count: u64,
    pub current_detection_count: usize,
}

/// Folds each tick's detection batch into [`AggregateStats`]
#[derive(Debug, Default)]
pub struct DetectionAggregator {
    stats: AggregateStats,
}

impl DetectionAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one tick. Returns true when the tick was a fall event.
    pub fn observe(&mut self, detections: &[Detection]) -> bool {
        self.stats.current_detection_count = detections.len();
        let fall = detections.iter().any(Detection::is_fall);
        if fall {
            self.stats.fall_event_count += 1;
        }
        fall
    }

    pub fn reset(&mut self) {
        self.stats = AggregateStats::default();
    }

    /// Drops the per-tick count once no detections are displayed
    pub fn clear_current(&mut self) {
        self.stats.current_detection_count = 0;
    }

    pub fn stats(&self) -> AggregateStats {
        self.stats
    }
}
