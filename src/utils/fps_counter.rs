#[cfg(not(target_arch = "wasm32"))]
use std::time::Duration;

#[cfg(target_arch = "wasm32")]
use web_time::Duration;

/// Frame rate averaged over one-second windows.
///
/// Fed with frame deltas (usually [`Timer::delta`](super::Timer::delta)) so
/// it shares the frame clock instead of reading its own.
#[derive(Debug, Default)]
pub struct FpsCounter {
    frames: u32,
    window: Duration,
    pub current_fps: f32,
}

impl FpsCounter {
    pub const WINDOW: Duration = Duration::from_secs(1);

    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one frame. Returns the new rate when a window closes.
    pub fn record(&mut self, delta: Duration) -> Option<f32> {
        self.frames += 1;
        self.window += delta;
        if self.window < Self::WINDOW {
            return None;
        }
        self.current_fps = self.frames as f32 / self.window.as_secs_f32();
        self.frames = 0;
        self.window = Duration::ZERO;
        Some(self.current_fps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_once_per_window() {
        let mut counter = FpsCounter::new();
        let frame = Duration::from_millis(20);
        let reports: Vec<f32> = (0..100).filter_map(|_| counter.record(frame)).collect();
        assert_eq!(reports.len(), 2);
        assert!((reports[0] - 50.0).abs() < 1e-3);
    }
}
