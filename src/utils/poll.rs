//! Blocking polling helper used by element handles to wait for visibility.

use std::thread;
use std::time::{Duration, Instant};

/// Configuration for polling operations
#[derive(Clone)]
pub struct PollConfig {
    pub timeout_ms: u64,
    pub initial_interval_ms: u64,
    pub max_interval_ms: u64,
    pub use_exponential_backoff: bool,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 5000,
            initial_interval_ms: 100,
            max_interval_ms: 500,
            use_exponential_backoff: true,
        }
    }
}

impl PollConfig {
    pub fn with_timeout(timeout_ms: u64) -> Self {
        Self {
            timeout_ms,
            ..Self::default()
        }
    }
}

/// Poll `check_fn` on the calling thread until it returns `true` or the
/// timeout elapses.
///
/// The condition is always checked at least once, so a zero timeout still
/// reports an element that is already visible. Returns `true` if the
/// condition was met.
pub fn wait_until<F>(mut check_fn: F, config: PollConfig) -> bool
where
    F: FnMut() -> bool,
{
    let start = Instant::now();
    let timeout = Duration::from_millis(config.timeout_ms);
    let mut interval = config.initial_interval_ms.max(1);

    loop {
        if check_fn() {
            return true;
        }

        let elapsed = start.elapsed();
        if elapsed >= timeout {
            return false;
        }

        let remaining = timeout - elapsed;
        thread::sleep(Duration::from_millis(interval).min(remaining));

        if config.use_exponential_backoff {
            interval = (interval * 3 / 2).min(config.max_interval_ms.max(1));
        }
    }
}
