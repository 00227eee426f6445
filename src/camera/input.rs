use std::time::Instant;

use crate::Float;

/// Turns absolute cursor positions into pointer deltas for `Camera::process_orientation`.
#[derive(Clone, Copy, Debug, Default)]
pub struct CursorTracker {
    last: Option<(f64, f64)>,
}

impl CursorTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `(dx, dy)` with `dy` positive when the cursor moves up the screen.
    /// The first position only primes the tracker and yields no delta.
    pub fn delta(&mut self, x: f64, y: f64) -> Option<(Float, Float)> {
        let last = self.last.replace((x, y));
        last.map(|(last_x, last_y)| ((x - last_x) as Float, (last_y - y) as Float))
    }

    pub fn reset(&mut self) {
        self.last = None;
    }
}

/// Elapsed time between frames, used to scale camera movement.
#[derive(Clone, Copy, Debug)]
pub struct FrameClock {
    start: Instant,
    last_frame: f64,
}

impl FrameClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            last_frame: 0.0,
        }
    }

    pub fn tick(&mut self) -> Float {
        let now = self.start.elapsed().as_secs_f64();
        self.tick_at(now)
    }

    /// Advance to `now` (seconds since the clock started) and return the frame time.
    pub fn tick_at(&mut self, now: f64) -> Float {
        let dt = (now - self.last_frame).max(0.0);
        self.last_frame = now;
        dt as Float
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}
