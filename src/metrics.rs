use serde::{Deserialize, Serialize};

pub const DEFAULT_CADENCE_SECS: u64 = 10;

/// Cumulative typing progress for the half in flight
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Progress {
    pub characters_typed: usize,
    pub mistakes: usize,
}

impl Progress {
    pub fn new(characters_typed: usize, mistakes: usize) -> Self {
        Self {
            characters_typed,
            mistakes,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Interval {
    pub timestamp_seconds: u64,
    pub characters_typed: usize,
    pub mistakes: usize,
}

/// Time series of one half's progress
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsLog {
    pub intervals: Vec<Interval>,
    pub total_mistakes: usize,
    pub total_characters_typed: usize,
}

impl MetricsLog {
    /// Points for charting characters typed over time
    pub fn characters_series(&self) -> Vec<(f64, f64)> {
        self.intervals
            .iter()
            .map(|i| (i.timestamp_seconds as f64, i.characters_typed as f64))
            .collect()
    }
}

/// Periodic sampler scoped to exactly one half. A new half gets a new sampler,
/// so intervals from different halves never share a log.
#[derive(Debug, Clone)]
pub struct MetricsSampler {
    cadence: u64,
    elapsed: u64,
    active: bool,
    log: MetricsLog,
}

impl MetricsSampler {
    pub fn start(cadence_secs: u64) -> Self {
        Self {
            cadence: cadence_secs.max(1),
            elapsed: 0,
            active: true,
            log: MetricsLog::default(),
        }
    }

    /// Advance the sampler clock by one second, taking a snapshot from
    /// `source` whenever a cadence boundary is reached.
    pub fn tick<F>(&mut self, source: F) -> Option<Interval>
    where
        F: FnOnce() -> Progress,
    {
        if !self.active {
            return None;
        }

        self.elapsed += 1;
        if self.elapsed % self.cadence != 0 {
            return None;
        }

        let progress = source();
        let interval = Interval {
            timestamp_seconds: self.elapsed,
            characters_typed: progress.characters_typed,
            mistakes: progress.mistakes,
        };
        self.log.intervals.push(interval);
        self.log.total_characters_typed = progress.characters_typed;
        self.log.total_mistakes = progress.mistakes;
        Some(interval)
    }

    pub fn stop(&mut self) {
        self.active = false;
    }

    /// Stop sampling and stamp the final totals of the half onto the log
    pub fn finish(&mut self, last: Progress) {
        self.stop();
        self.log.total_characters_typed = last.characters_typed;
        self.log.total_mistakes = last.mistakes;
    }

    pub fn into_log(self) -> MetricsLog {
        self.log
    }
}
