use std::time::{Duration, Instant};

/// Best-effort frame pacing. Nothing here guarantees a frame rate; an overrun
/// frame simply pushes the schedule back instead of triggering catch-up bursts.
#[derive(Debug, Clone)]
pub struct FrameClock {
    interval: Duration,
    next_deadline: Instant,
    frames: u64,
    started: Instant,
}

impl FrameClock {
    pub fn new(fps: u32) -> Self {
        let now = Instant::now();
        Self {
            interval: Duration::from_secs_f64(1.0 / fps.max(1) as f64),
            next_deadline: now,
            frames: 0,
            started: now,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Number of frames scheduled so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Sleeps until the next frame is due and returns its index.
    pub fn wait_next(&mut self) -> u64 {
        let now = Instant::now();
        if self.next_deadline > now {
            std::thread::sleep(self.next_deadline - now);
            self.next_deadline += self.interval;
        } else {
            self.next_deadline = now + self.interval;
        }
        let index = self.frames;
        self.frames += 1;
        index
    }

    pub fn reset(&mut self) {
        *self = Self {
            interval: self.interval,
            ..Self::new(1)
        };
    }
}
