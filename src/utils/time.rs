#[cfg(not(target_arch = "wasm32"))]
use std::time::{Duration, Instant};

#[cfg(target_arch = "wasm32")]
use web_time::{Duration, Instant};

/// Frame clock feeding the `elapsed` uniform.
pub struct Timer {
    start_time: Instant,
    last_tick: Instant,
    /// Time between the last two ticks
    pub delta: Duration,
    /// Time from creation to the last tick
    pub elapsed: Duration,
    pub frame_count: u64,
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

impl Timer {
    #[must_use]
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            start_time: now,
            last_tick: now,
            delta: Duration::ZERO,
            elapsed: Duration::ZERO,
            frame_count: 0,
        }
    }

    /// Call once per frame, before drawing.
    pub fn tick(&mut self) {
        let now = Instant::now();
        self.delta = now - self.last_tick;
        self.elapsed = now - self.start_time;
        self.last_tick = now;
        self.frame_count += 1;
    }

    /// Seconds since creation, as uploaded to shaders.
    #[inline]
    #[must_use]
    pub fn elapsed_seconds(&self) -> f32 {
        self.elapsed.as_secs_f32()
    }
}
