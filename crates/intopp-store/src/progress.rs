//! Observational progress reporting for long-running iterations.
//!
//! A sink receives an expected total and a label up front, then periodic
//! advance calls. Reporting never affects correctness; the expected total is
//! an approximation (true cardinality depends on per-origin ring counts).

/// Receiver for progress events from a long-running operation.
pub trait ProgressSink {
    fn begin(&mut self, expected: u64, label: &str);
    fn advance(&mut self, done: u64);
    fn finish(&mut self, done: u64);
}

/// Discards all progress events.
pub struct NullProgress;

impl ProgressSink for NullProgress {
    fn begin(&mut self, _expected: u64, _label: &str) {}
    fn advance(&mut self, _done: u64) {}
    fn finish(&mut self, _done: u64) {}
}

/// Reports through `tracing` every `interval` rows.
pub struct LogProgress {
    interval: u64,
    expected: u64,
    label: String,
    last_logged: u64,
}

impl LogProgress {
    pub fn new(interval: u64) -> Self {
        Self {
            interval: interval.max(1),
            expected: 0,
            label: String::new(),
            last_logged: 0,
        }
    }
}

impl Default for LogProgress {
    fn default() -> Self {
        Self::new(10_000)
    }
}

impl ProgressSink for LogProgress {
    fn begin(&mut self, expected: u64, label: &str) {
        self.expected = expected;
        self.label = label.to_string();
        self.last_logged = 0;
        tracing::info!("{}: starting, ~{} rows expected", self.label, expected);
    }

    fn advance(&mut self, done: u64) {
        if done - self.last_logged >= self.interval {
            self.last_logged = done;
            tracing::info!("{}: {} / ~{} rows", self.label, done, self.expected);
        }
    }

    fn finish(&mut self, done: u64) {
        tracing::info!("{}: finished, {} rows", self.label, done);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Sink that records every call, for asserting engine reporting behavior.
    pub struct Recording {
        pub began: Option<(u64, String)>,
        pub advances: Vec<u64>,
        pub finished: Option<u64>,
    }

    impl Recording {
        pub fn new() -> Self {
            Self {
                began: None,
                advances: Vec::new(),
                finished: None,
            }
        }
    }

    impl ProgressSink for Recording {
        fn begin(&mut self, expected: u64, label: &str) {
            self.began = Some((expected, label.to_string()));
        }
        fn advance(&mut self, done: u64) {
            self.advances.push(done);
        }
        fn finish(&mut self, done: u64) {
            self.finished = Some(done);
        }
    }

    #[test]
    fn test_log_progress_interval_floor() {
        // zero interval must not divide-by-zero or log every row
        let p = LogProgress::new(0);
        assert_eq!(p.interval, 1);
    }

    #[test]
    fn test_recording_sink() {
        let mut sink = Recording::new();
        sink.begin(4, "x");
        sink.advance(1);
        sink.advance(2);
        sink.finish(2);
        assert_eq!(sink.began, Some((4, "x".to_string())));
        assert_eq!(sink.advances, vec![1, 2]);
        assert_eq!(sink.finished, Some(2));
    }
}
