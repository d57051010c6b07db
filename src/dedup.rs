//! Time-windowed duplicate reaction suppression
//!
//! The gateway can redeliver reaction events, and users can react, unreact
//! and react again in quick succession. The debouncer collapses identical
//! (user, message, emoji) tuples arriving within a short window into one
//! admitted event. It is a best-effort, in-process debounce only; it does
//! not survive restarts and is not a cross-instance correctness mechanism.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Window during which a repeated identical reaction is rejected.
const ADMIT_WINDOW: Duration = Duration::from_secs(5);
/// Entries older than this are swept to bound memory.
const SWEEP_HORIZON: Duration = Duration::from_secs(10);

/// Time source, injected so tests can advance time deterministically.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Wall-clock time source used in production.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

type DedupKey = (u64, u64, String);

pub struct ReactionDebouncer {
    clock: Box<dyn Clock>,
    recent: Mutex<HashMap<DedupKey, Instant>>,
}

impl ReactionDebouncer {
    pub fn new() -> Self {
        Self::with_clock(Box::new(SystemClock))
    }

    pub fn with_clock(clock: Box<dyn Clock>) -> Self {
        Self {
            clock,
            recent: Mutex::new(HashMap::new()),
        }
    }

    /// True iff this exact tuple has not been admitted within the window.
    /// Only a first admission records its timestamp; rejected calls do not
    /// extend the window. Stale entries are swept on each call.
    pub fn admit(&self, user_id: u64, message_id: u64, emoji: &str) -> bool {
        let now = self.clock.now();
        let mut recent = self.recent.lock();

        recent.retain(|_, admitted_at| now.duration_since(*admitted_at) < SWEEP_HORIZON);

        let key = (user_id, message_id, emoji.to_string());
        if let Some(admitted_at) = recent.get(&key) {
            if now.duration_since(*admitted_at) < ADMIT_WINDOW {
                return false;
            }
        }
        recent.insert(key, now);
        true
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.recent.lock().len()
    }
}

impl Default for ReactionDebouncer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    struct ManualClock {
        now: Arc<Mutex<Instant>>,
    }

    impl Clock for ManualClock {
        fn now(&self) -> Instant {
            *self.now.lock()
        }
    }

    fn manual_debouncer() -> (ReactionDebouncer, Arc<Mutex<Instant>>) {
        let now = Arc::new(Mutex::new(Instant::now()));
        let debouncer = ReactionDebouncer::with_clock(Box::new(ManualClock { now: now.clone() }));
        (debouncer, now)
    }

    fn advance(now: &Arc<Mutex<Instant>>, by: Duration) {
        let mut now = now.lock();
        *now += by;
    }

    #[test]
    fn exactly_one_admission_within_window() {
        let (debouncer, now) = manual_debouncer();
        assert!(debouncer.admit(1, 10, "👽"));
        for _ in 0..3 {
            advance(&now, Duration::from_secs(1));
            assert!(!debouncer.admit(1, 10, "👽"));
        }
    }

    #[test]
    fn rejections_do_not_extend_the_window() {
        let (debouncer, now) = manual_debouncer();
        assert!(debouncer.admit(1, 10, "👽"));
        advance(&now, Duration::from_secs(4));
        assert!(!debouncer.admit(1, 10, "👽"));
        // 6s after the only admission; the rejection at 4s must not count.
        advance(&now, Duration::from_secs(2));
        assert!(debouncer.admit(1, 10, "👽"));
    }

    #[test]
    fn distinct_tuples_are_independent() {
        let (debouncer, _now) = manual_debouncer();
        assert!(debouncer.admit(1, 10, "👽"));
        assert!(debouncer.admit(2, 10, "👽"));
        assert!(debouncer.admit(1, 11, "👽"));
        assert!(debouncer.admit(1, 10, "🛸"));
    }

    #[test]
    fn sweep_bounds_memory() {
        let (debouncer, now) = manual_debouncer();
        for user in 0..50 {
            assert!(debouncer.admit(user, 10, "👽"));
        }
        assert_eq!(debouncer.len(), 50);
        advance(&now, Duration::from_secs(11));
        assert!(debouncer.admit(999, 10, "👽"));
        assert_eq!(debouncer.len(), 1);
    }
}
