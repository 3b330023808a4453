use std::time::{SystemTime, UNIX_EPOCH};
use tokio::time::Instant;

/// Source of wall-clock milliseconds shared by every timing decision.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> f64;
}

/// Unix-epoch milliseconds sampled once, then advanced by the tokio clock.
///
/// Later readings are monotonic even if the system clock is adjusted, and
/// follow tokio's paused time in tests.
#[derive(Debug, Clone, Copy)]
pub struct WallClock {
    epoch_ms: f64,
    origin: Instant,
}

impl WallClock {
    pub fn new() -> Self {
        let epoch_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64() * 1000.0)
            .unwrap_or(0.0);
        Self::starting_at(epoch_ms)
    }

    /// Clock whose first reading is `epoch_ms`.
    pub fn starting_at(epoch_ms: f64) -> Self {
        Self {
            epoch_ms,
            origin: Instant::now(),
        }
    }
}

impl Default for WallClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for WallClock {
    fn now_ms(&self) -> f64 {
        self.epoch_ms + self.origin.elapsed().as_secs_f64() * 1000.0
    }
}

impl<C: Clock + ?Sized> Clock for std::sync::Arc<C> {
    fn now_ms(&self) -> f64 {
        (**self).now_ms()
    }
}
