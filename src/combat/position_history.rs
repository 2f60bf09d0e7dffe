use std::collections::VecDeque;
use std::time::Instant;

use crate::domain::vector::Vector2;

pub const HISTORY_CAPACITY: usize = 60;

#[derive(Debug, Clone, Copy)]
struct Sample {
    position: Vector2,
    at: Instant,
}

/// Per-player ring of up to 60 (position, instant) samples (~1s at 60Hz),
/// single-writer (the room's simulation thread), read only within the same
/// tick by hitscan resolution — no cross-task access, so no lock is needed.
#[derive(Debug, Default)]
pub struct PositionHistory {
    samples: VecDeque<Sample>,
}

impl PositionHistory {
    pub fn new() -> Self {
        Self {
            samples: VecDeque::with_capacity(HISTORY_CAPACITY),
        }
    }

    pub fn record(&mut self, position: Vector2, at: Instant) {
        if self.samples.len() == HISTORY_CAPACITY {
            self.samples.pop_front();
        }
        self.samples.push_back(Sample { position, at });
    }

    /// Returns the interpolated position at `query_time`:
    /// - at/after the latest sample: the latest position.
    /// - at/before the oldest sample: the current (fallback) position.
    /// - otherwise: linear interpolation between the bracketing samples.
    pub fn position_at(&self, query_time: Instant, fallback: Vector2) -> Vector2 {
        let Some(latest) = self.samples.back() else {
            return fallback;
        };
        if query_time >= latest.at {
            return latest.position;
        }

        let Some(oldest) = self.samples.front() else {
            return fallback;
        };
        if query_time <= oldest.at {
            return fallback;
        }

        for window in self.samples.iter().collect::<Vec<_>>().windows(2) {
            let (before, after) = (window[0], window[1]);
            if query_time >= before.at && query_time <= after.at {
                let span = after.at.duration_since(before.at).as_secs_f64();
                if span <= f64::EPSILON {
                    return before.position;
                }
                let t = query_time.duration_since(before.at).as_secs_f64() / span;
                return before.position.add(after.position.sub(before.position).scale(t));
            }
        }

        fallback
    }
}
