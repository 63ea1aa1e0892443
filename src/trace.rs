//! Behavior traces: time-sorted (t, uv, weight) observations of presence on
//! the target surface, and the feed that drains them per playback tick.

use std::error::Error;
use std::fs;
use std::path::Path;

use glam::Vec2;

/// One observed presence sample on the surface.
#[derive(Debug, Clone, Copy)]
pub struct TraceSample {
    /// Timeline position in seconds.
    pub time: f32,
    /// Normalized surface coordinate.
    pub uv: Vec2,
    /// Intensity delta contributed by this sample.
    pub weight: f32,
}

/// An immutable, time-sorted recording of surface presence.
pub struct BehaviorTrace {
    samples: Vec<TraceSample>,
    duration: f32,
}

impl BehaviorTrace {
    pub fn new(mut samples: Vec<TraceSample>) -> Self {
        samples.sort_by(|a, b| a.time.total_cmp(&b.time));
        let duration = samples.last().map(|s| s.time).unwrap_or(0.0);
        Self { samples, duration }
    }

    /// Load from a CSV file: `time,u,v[,weight]` per line, `#` comments.
    pub fn from_csv(path: &Path) -> Result<Self, Box<dyn Error>> {
        let text = fs::read_to_string(path)?;
        let trace = Self::from_csv_str(&text)?;
        log::info!(
            "loaded trace {:?}: {} samples over {:.1}s",
            path,
            trace.len(),
            trace.duration()
        );
        Ok(trace)
    }

    pub fn from_csv_str(text: &str) -> Result<Self, Box<dyn Error>> {
        let mut samples = Vec::new();
        for (line_no, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut fields = line.split(',').map(str::trim);
            let time: f32 = fields
                .next()
                .ok_or_else(|| format!("line {}: missing time", line_no + 1))?
                .parse()?;
            let u: f32 = fields
                .next()
                .ok_or_else(|| format!("line {}: missing u", line_no + 1))?
                .parse()?;
            let v: f32 = fields
                .next()
                .ok_or_else(|| format!("line {}: missing v", line_no + 1))?
                .parse()?;
            let weight: f32 = match fields.next() {
                Some(w) => w.parse()?,
                None => 1.0,
            };
            samples.push(TraceSample {
                time,
                uv: Vec2::new(u.clamp(0.0, 1.0), v.clamp(0.0, 1.0)),
                weight,
            });
        }
        Ok(Self::new(samples))
    }

    /// Synthesize a wandering dwell trace: a random walk over UV space with
    /// occasional dwell spots where samples pile up. Deterministic per seed.
    pub fn synth_wander(duration: f32, rate_hz: f32, seed: u64) -> Self {
        let mut rng = fastrand::Rng::with_seed(seed);
        let count = (duration * rate_hz) as usize;
        let mut samples = Vec::with_capacity(count);

        let mut pos = Vec2::new(rng.f32(), rng.f32());
        let mut dwell_left = 0usize;

        for i in 0..count {
            let time = i as f32 / rate_hz;
            if dwell_left > 0 {
                dwell_left -= 1;
                // Small jitter around the dwell spot.
                pos += Vec2::new(rng.f32() - 0.5, rng.f32() - 0.5) * 0.004;
            } else {
                pos += Vec2::new(rng.f32() - 0.5, rng.f32() - 0.5) * 0.06;
                if rng.f32() < 0.02 {
                    dwell_left = rng.usize(20..120);
                }
            }
            pos = pos.clamp(Vec2::ZERO, Vec2::ONE);
            samples.push(TraceSample {
                time,
                uv: pos,
                weight: 1.0 / rate_hz,
            });
        }

        log::info!(
            "synthesized wander trace: {} samples over {:.1}s (seed {})",
            samples.len(),
            duration,
            seed
        );
        Self::new(samples)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration(&self) -> f32 {
        self.duration
    }

    pub fn samples(&self) -> &[TraceSample] {
        &self.samples
    }
}

/// Cursor over a trace producing the samples due for each elapsed timeline
/// interval, in timeline order. Backward motion is handled by the engine as
/// rewind-then-replay; the feed itself only moves forward.
pub struct SampleFeed {
    trace: BehaviorTrace,
    cursor: usize,
}

impl SampleFeed {
    pub fn new(trace: BehaviorTrace) -> Self {
        Self { trace, cursor: 0 }
    }

    pub fn duration(&self) -> f32 {
        self.trace.duration()
    }

    pub fn trace(&self) -> &BehaviorTrace {
        &self.trace
    }

    /// Rewind to the start of the timeline (used for reset and replay).
    pub fn rewind(&mut self) {
        self.cursor = 0;
    }

    /// Lazily yield all samples with time <= `t` that have not been yielded
    /// since the last rewind, advancing the cursor past them.
    pub fn advance_to(&mut self, t: f32) -> impl Iterator<Item = (Vec2, f32)> + '_ {
        let start = self.cursor;
        let mut end = start;
        let samples = self.trace.samples();
        while end < samples.len() && samples[end].time <= t {
            end += 1;
        }
        self.cursor = end;
        samples[start..end].iter().map(|s| (s.uv, s.weight))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp_trace() -> BehaviorTrace {
        BehaviorTrace::new(
            (0..10)
                .map(|i| TraceSample {
                    time: i as f32,
                    uv: Vec2::new(i as f32 / 10.0, 0.5),
                    weight: 1.0,
                })
                .collect(),
        )
    }

    #[test]
    fn advance_yields_interval_in_order_without_duplicates() {
        let mut feed = SampleFeed::new(ramp_trace());

        let first: Vec<_> = feed.advance_to(3.5).collect();
        assert_eq!(first.len(), 4); // t = 0, 1, 2, 3

        let second: Vec<_> = feed.advance_to(6.0).collect();
        assert_eq!(second.len(), 3); // t = 4, 5, 6
        assert!(second[0].0.x > first[3].0.x, "samples must stay in timeline order");

        // No motion, nothing due.
        assert_eq!(feed.advance_to(6.0).count(), 0);
    }

    #[test]
    fn rewind_replays_from_the_start() {
        let mut feed = SampleFeed::new(ramp_trace());
        let full: Vec<_> = feed.advance_to(100.0).collect();
        assert_eq!(full.len(), 10);

        feed.rewind();
        let replay: Vec<_> = feed.advance_to(100.0).collect();
        assert_eq!(replay.len(), full.len());
        for (a, b) in full.iter().zip(&replay) {
            assert_eq!(a.0, b.0);
            assert_eq!(a.1, b.1);
        }
    }

    #[test]
    fn csv_parse_sorts_and_defaults_weight() {
        let text = "# header comment\n2.0, 0.5, 0.5, 0.25\n0.5, 0.1, 0.9\n\n1.0, 0.2, 0.3, 2.0\n";
        let trace = BehaviorTrace::from_csv_str(text).unwrap();
        assert_eq!(trace.len(), 3);
        let s = trace.samples();
        assert_eq!(s[0].time, 0.5);
        assert_eq!(s[0].weight, 1.0); // default
        assert_eq!(s[1].time, 1.0);
        assert_eq!(s[2].time, 2.0);
        assert_eq!(s[2].weight, 0.25);
    }

    #[test]
    fn csv_rejects_garbage() {
        assert!(BehaviorTrace::from_csv_str("1.0, nope, 0.5").is_err());
        assert!(BehaviorTrace::from_csv_str("1.0").is_err());
    }

    #[test]
    fn synth_is_deterministic_and_in_bounds() {
        let a = BehaviorTrace::synth_wander(10.0, 30.0, 42);
        let b = BehaviorTrace::synth_wander(10.0, 30.0, 42);
        assert_eq!(a.len(), b.len());
        for (x, y) in a.samples().iter().zip(b.samples()) {
            assert_eq!(x.uv, y.uv);
        }
        for s in a.samples() {
            assert!((0.0..=1.0).contains(&s.uv.x));
            assert!((0.0..=1.0).contains(&s.uv.y));
        }
    }
}
