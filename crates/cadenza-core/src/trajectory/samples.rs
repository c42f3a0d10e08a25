// Fixed-interval position sampling

use super::{MotionEvent, profile::Profile};
use crate::coordinates::Coordinates;

/// Emits one absolute position per control period. The final sample
/// lands exactly on the destination at the end of the move, even when
/// the move length is not a whole number of periods.
#[derive(Debug, Clone)]
pub(super) struct SampleEmitter {
    period_s: f64,
    tick: u64,
    finished: bool,
}

impl SampleEmitter {
    pub(super) fn new(period_s: f64) -> Self {
        Self {
            period_s,
            tick: 0,
            finished: false,
        }
    }

    /// Samples left to emit.
    pub(super) fn remaining(&self, profile: &Profile) -> usize {
        if self.finished {
            return 0;
        }
        let total = (profile.total_time_s() / self.period_s).ceil().max(1.0) as u64;
        total.saturating_sub(self.tick) as usize
    }

    pub(super) fn next(
        &mut self,
        start: Coordinates,
        delta: Coordinates,
        destination: Coordinates,
        profile: &Profile,
    ) -> Option<MotionEvent> {
        if self.finished {
            return None;
        }

        self.tick += 1;
        let t = self.tick as f64 * self.period_s;
        let total_time = profile.total_time_s();
        if t >= total_time {
            self.finished = true;
            return Some(MotionEvent::Sample {
                time_s: total_time,
                position: destination,
            });
        }

        let fraction = profile.distance_at(t) / profile.distance_mm;
        Some(MotionEvent::Sample {
            time_s: t,
            position: start + delta * fraction,
        })
    }
}
