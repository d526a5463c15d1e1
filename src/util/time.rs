//! Time utilities for the arena simulation

use std::time::{Duration, Instant};

/// Server start time for uptime tracking
static SERVER_START: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();

/// Initialize server start time (call once at startup)
pub fn init_server_time() {
    SERVER_START.get_or_init(Instant::now);
}

/// Get server uptime in seconds
pub fn uptime_secs() -> u64 {
    SERVER_START
        .get()
        .map(|start| start.elapsed().as_secs())
        .unwrap_or(0)
}

/// Default simulation rate (ticks per second)
pub const DEFAULT_TICK_RATE: u32 = 20;

/// Highest accepted simulation rate
pub const MAX_TICK_RATE: u32 = 1_000;

/// Duration of one tick at the given rate, never shorter than 1 ms
pub fn tick_duration(tick_rate: u32) -> Duration {
    Duration::from_micros(1_000_000 / tick_rate.clamp(1, MAX_TICK_RATE) as u64)
}

/// Monotonic arena clock.
///
/// Arena logic runs on plain millisecond timestamps so it can be driven by
/// tests without a runtime; the worker task feeds it from this clock.
#[derive(Debug, Clone)]
pub struct ArenaClock {
    start: Instant,
}

impl ArenaClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Milliseconds since the arena was created
    pub fn now_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}

impl Default for ArenaClock {
    fn default() -> Self {
        Self::new()
    }
}
