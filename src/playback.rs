//! Playback timeline controller. External collaborator from the engine's
//! point of view: the engine only reacts to the per-frame snapshot and
//! acknowledges resets through its `on_reset` callback; settling `is_reset`
//! back to false is this controller's job.

/// Per-frame view of the timeline, sampled once per frame by the app.
#[derive(Debug, Clone, Copy)]
pub struct PlaybackSnapshot {
    pub is_playing: bool,
    pub is_reset: bool,
    pub current_time: f32,
}

/// Wall-clock driven timeline with play/pause, scrubbing, speed, and an
/// edge-triggered reset signal.
pub struct PlaybackController {
    pub is_playing: bool,
    pub speed: f32,
    pub looping: bool,
    is_reset: bool,
    current_time: f32,
    duration: f32,
}

impl PlaybackController {
    pub fn new(duration: f32) -> Self {
        Self {
            is_playing: false,
            speed: 1.0,
            looping: false,
            is_reset: false,
            current_time: 0.0,
            duration: duration.max(0.0),
        }
    }

    pub fn current_time(&self) -> f32 {
        self.current_time
    }

    pub fn duration(&self) -> f32 {
        self.duration
    }

    pub fn is_reset(&self) -> bool {
        self.is_reset
    }

    /// Advance the timeline by a frame's wall-clock delta.
    pub fn advance(&mut self, dt: f32) {
        if !self.is_playing || self.is_reset {
            return;
        }
        self.current_time += dt * self.speed;
        if self.current_time >= self.duration {
            if self.looping {
                // Wrap via the reset path so accumulated heat clears too.
                self.request_reset();
            } else {
                self.current_time = self.duration;
                self.is_playing = false;
                log::info!("playback reached end of trace ({:.1}s)", self.duration);
            }
        }
    }

    /// Jump to an absolute timeline position. Backward jumps are replayed
    /// by the engine; this only moves the clock.
    pub fn scrub_to(&mut self, t: f32) {
        self.current_time = t.clamp(0.0, self.duration);
    }

    /// Raise the edge-triggered reset signal and rewind the clock.
    pub fn request_reset(&mut self) {
        self.is_reset = true;
        self.current_time = 0.0;
    }

    /// Settle the reset signal after the engine acknowledges it.
    pub fn settle_reset(&mut self) {
        self.is_reset = false;
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        PlaybackSnapshot {
            is_playing: self.is_playing,
            is_reset: self.is_reset,
            current_time: self.current_time,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_respects_speed_and_pause() {
        let mut pb = PlaybackController::new(100.0);
        pb.advance(1.0);
        assert_eq!(pb.current_time(), 0.0, "paused clock must not move");

        pb.is_playing = true;
        pb.speed = 2.0;
        pb.advance(1.5);
        assert!((pb.current_time() - 3.0).abs() < 1e-6);
    }

    #[test]
    fn stops_at_end_when_not_looping() {
        let mut pb = PlaybackController::new(2.0);
        pb.is_playing = true;
        pb.advance(5.0);
        assert_eq!(pb.current_time(), 2.0);
        assert!(!pb.is_playing);
        assert!(!pb.is_reset());
    }

    #[test]
    fn looping_wraps_through_reset() {
        let mut pb = PlaybackController::new(2.0);
        pb.is_playing = true;
        pb.looping = true;
        pb.advance(3.0);
        assert!(pb.is_reset());
        assert_eq!(pb.current_time(), 0.0);

        // Clock holds still until the reset is settled.
        pb.advance(1.0);
        assert_eq!(pb.current_time(), 0.0);

        pb.settle_reset();
        pb.advance(1.0);
        assert!(pb.current_time() > 0.0);
    }

    #[test]
    fn scrub_clamps_to_timeline() {
        let mut pb = PlaybackController::new(10.0);
        pb.scrub_to(25.0);
        assert_eq!(pb.current_time(), 10.0);
        pb.scrub_to(-5.0);
        assert_eq!(pb.current_time(), 0.0);
    }
}
