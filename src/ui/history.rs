//! Rolling frame-time window backing the panel's performance readout and
//! histogram.

/// Aggregates over the current window, in seconds.
#[derive(Debug, Clone, Copy)]
pub struct FrameStats {
    pub avg: f64,
    pub min: f64,
    pub max: f64,
}

/// Fixed-capacity window of recent frame times. Pre-allocated; no heap
/// allocs after init.
pub struct FrameHistory {
    buf: Vec<f64>,
    capacity: usize,
    head: usize,
    len: usize,
}

impl FrameHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            buf: vec![0.0; capacity],
            capacity,
            head: 0,
            len: 0,
        }
    }

    /// Record a frame time, evicting the oldest when full.
    pub fn push(&mut self, dt: f64) {
        self.buf[self.head] = dt;
        self.head = (self.head + 1) % self.capacity;
        if self.len < self.capacity {
            self.len += 1;
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    /// Iterate from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        let start = if self.len < self.capacity {
            0
        } else {
            self.head
        };
        let cap = self.capacity;
        (0..self.len).map(move |i| self.buf[(start + i) % cap])
    }

    /// Average, minimum, and maximum over the window. None while empty.
    pub fn stats(&self) -> Option<FrameStats> {
        if self.len == 0 {
            return None;
        }
        let mut sum = 0.0;
        let mut min = f64::MAX;
        let mut max = 0.0f64;
        for t in self.iter() {
            sum += t;
            min = min.min(t);
            max = max.max(t);
        }
        Some(FrameStats {
            avg: sum / self.len as f64,
            min,
            max,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_and_iterates_oldest_first() {
        let mut history = FrameHistory::new(3);
        for v in 1..=5 {
            history.push(v as f64);
        }
        assert_eq!(history.len(), 3);
        let items: Vec<f64> = history.iter().collect();
        assert_eq!(items, vec![3.0, 4.0, 5.0]);
    }

    #[test]
    fn stats_cover_only_the_retained_window() {
        let mut history = FrameHistory::new(4);
        assert!(history.stats().is_none());

        // 100.0 is pushed out by the time the window fills.
        for dt in [100.0, 0.01, 0.02, 0.03, 0.04] {
            history.push(dt);
        }
        let stats = history.stats().unwrap();
        assert_eq!(stats.min, 0.01);
        assert_eq!(stats.max, 0.04);
        assert!((stats.avg - 0.025).abs() < 1e-12);
    }
}
