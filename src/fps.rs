use std::time::{Duration, Instant};

/// Deltas shorter than this report 0 FPS instead of an unbounded rate.
const MIN_DELTA: Duration = Duration::from_micros(1);

/// Instantaneous frames-per-second from consecutive detection timestamps.
///
/// The first tick after creation or `reset` has no predecessor and reports 0.
#[derive(Clone, Debug, Default)]
pub struct FpsMeter {
    prev: Option<Instant>,
}

impl FpsMeter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tick(&mut self) -> f64 {
        self.tick_at(Instant::now())
    }

    pub fn tick_at(&mut self, now: Instant) -> f64 {
        let fps = match self.prev {
            Some(prev) => {
                let delta = now.saturating_duration_since(prev);
                if delta < MIN_DELTA {
                    0.0
                } else {
                    1.0 / delta.as_secs_f64()
                }
            }
            None => 0.0,
        };
        self.prev = Some(now);
        fps
    }

    pub fn reset(&mut self) {
        self.prev = None;
    }
}
