//! Frame clocks
//!
//! Each orchestration scope advances its own [`FrameClock`] from the deltas
//! the host feeds the scheduler, so nothing reads global time.

/// Timing information handed to per-frame work
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FrameTime {
    /// Seconds since the clock started
    pub elapsed: f32,
    /// Seconds since the previous frame (after clamping)
    pub delta: f32,
    /// Frames since the clock started
    pub frame: u64,
}

/// A clock advanced explicitly once per frame
#[derive(Clone, Debug)]
pub struct FrameClock {
    elapsed: f32,
    delta: f32,
    frame: u64,
    /// Upper bound for a single step, absorbs stalls like a backgrounded tab
    max_delta: f32,
}

impl FrameClock {
    pub fn new(max_delta: f32) -> Self {
        Self {
            elapsed: 0.0,
            delta: 0.0,
            frame: 0,
            max_delta,
        }
    }

    /// Advance by `dt` seconds, clamped to `[0, max_delta]`
    pub fn advance(&mut self, dt: f32) -> FrameTime {
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        let delta = if dt > self.max_delta {
            tracing::trace!(dt, max = self.max_delta, "clamping frame delta");
            self.max_delta
        } else {
            dt
        };

        self.delta = delta;
        self.elapsed += delta;
        self.frame += 1;
        self.now()
    }

    pub fn now(&self) -> FrameTime {
        FrameTime {
            elapsed: self.elapsed,
            delta: self.delta,
            frame: self.frame,
        }
    }

    pub fn reset(&mut self) {
        self.elapsed = 0.0;
        self.delta = 0.0;
        self.frame = 0;
    }

    pub fn max_delta(&self) -> f32 {
        self.max_delta
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new(0.1)
    }
}
