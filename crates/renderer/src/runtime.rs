use std::time::{Duration, Instant};

/// Deltas longer than this are treated as a stall rather than real time.
pub const MAX_FRAME_DELTA: Duration = Duration::from_nanos(1_000_000_000 * 8 / 60);

/// Substitute delta used when a stall is detected.
pub const NOMINAL_FRAME_DELTA: Duration = Duration::from_nanos(1_000_000_000 / 60);

/// Shader time wraps back to zero at this point to keep `f32` precision.
pub const TIME_WRAP_SECONDS: f64 = 3600.0;

/// Accumulates animation time from monotonic frame timestamps.
///
/// Long gaps between frames (window drags, breakpoints, a suspended laptop)
/// advance the clock by a single nominal frame so animations resume where they
/// left off instead of jumping ahead.
#[derive(Debug, Clone, Copy)]
pub struct FrameClock {
    last: Instant,
    elapsed: f64,
    frame: u64,
}

impl FrameClock {
    pub fn new(now: Instant) -> Self {
        Self {
            last: now,
            elapsed: 0.0,
            frame: 0,
        }
    }

    /// Advances the clock to `now` and returns the elapsed animation seconds.
    pub fn tick(&mut self, now: Instant) -> f64 {
        let mut delta = now.saturating_duration_since(self.last);
        if delta > MAX_FRAME_DELTA {
            tracing::trace!(
                delta_ms = delta.as_secs_f64() * 1000.0,
                "frame stall detected; substituting nominal delta"
            );
            delta = NOMINAL_FRAME_DELTA;
        }
        self.last = now;
        self.frame = self.frame.saturating_add(1);

        self.elapsed += delta.as_secs_f64();
        if self.elapsed > TIME_WRAP_SECONDS {
            self.elapsed = 0.0;
        }
        self.elapsed
    }

    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    /// Number of ticks since construction.
    pub fn frame(&self) -> u64 {
        self.frame
    }
}

/// Rolling frame-time statistics reported once per interval.
#[derive(Debug, Clone, Copy)]
pub struct FrameStats {
    window_start: Instant,
    frames: u32,
    interval: Duration,
}

/// Averages produced by [`FrameStats::record`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameReport {
    pub frame_ms: f64,
    pub fps: f64,
}

impl FrameStats {
    pub fn new(now: Instant, interval: Duration) -> Self {
        Self {
            window_start: now,
            frames: 0,
            interval,
        }
    }

    /// Counts a presented frame; returns a report when the interval has elapsed.
    pub fn record(&mut self, now: Instant) -> Option<FrameReport> {
        self.frames += 1;
        let span = now.saturating_duration_since(self.window_start);
        if span < self.interval {
            return None;
        }
        let seconds = span.as_secs_f64();
        let report = FrameReport {
            frame_ms: seconds * 1000.0 / f64::from(self.frames),
            fps: f64::from(self.frames) / seconds,
        };
        self.window_start = now;
        self.frames = 0;
        Some(report)
    }
}
