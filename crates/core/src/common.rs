use std::time::{Duration, Instant};

/// Measures how long a labelled step takes and reports it at debug level.
#[derive(Debug)]
pub struct Timer {
    start: Instant,
    label: String,
}

impl Timer {
    /// Start timing `label`.
    pub fn start(label: impl Into<String>) -> Self {
        let label = label.into();
        tracing::debug!(step = %label, "started");
        Self {
            start: Instant::now(),
            label,
        }
    }

    /// Time since the timer started.
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Log the total time taken.
    pub fn finish(self) -> Duration {
        let elapsed = self.elapsed();
        tracing::debug!(
            step = %self.label,
            elapsed_ms = elapsed.as_millis() as u64,
            "finished in {:.2}s",
            elapsed.as_secs_f64()
        );
        elapsed
    }
}
