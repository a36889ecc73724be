//! Wall-clock and entropy capabilities used by the column builder.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Source of the current time.
pub trait Clock: Send + Sync {
    /// Milliseconds since the Unix epoch.
    fn now_millis(&self) -> u64;

    /// Nanoseconds since the Unix epoch.
    fn now_nanos(&self) -> u128;
}

/// Source of command identifiers and random suffixes.
///
/// Implementations must be callable from many threads without coordination.
pub trait IdSource: Send + Sync {
    /// A fresh, process-unique command identifier.
    fn command_id(&self) -> String;

    /// A random suffix for synthetic padding values.
    fn suffix(&self) -> u32;
}

/// The system wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl SystemClock {
    fn since_epoch() -> Duration {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
    }
}

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        u64::try_from(Self::since_epoch().as_millis()).unwrap_or(u64::MAX)
    }

    fn now_nanos(&self) -> u128 {
        Self::since_epoch().as_nanos()
    }
}

/// A clock frozen at a given instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    millis: u64,
}

impl FixedClock {
    pub fn new(millis: u64) -> Self {
        Self { millis }
    }
}

impl Clock for FixedClock {
    fn now_millis(&self) -> u64 {
        self.millis
    }

    fn now_nanos(&self) -> u128 {
        u128::from(self.millis) * 1_000_000
    }
}

/// UUID v4 identifiers and thread-local random suffixes.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomIds;

impl IdSource for RandomIds {
    fn command_id(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }

    fn suffix(&self) -> u32 {
        rand::random::<u32>()
    }
}

/// Predictable identifiers `{prefix}-0`, `{prefix}-1`, ... and a fixed suffix.
#[derive(Debug)]
pub struct SequentialIds {
    prefix: String,
    next: AtomicU64,
    suffix: u32,
}

impl SequentialIds {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: AtomicU64::new(0),
            suffix: 0,
        }
    }
}

impl IdSource for SequentialIds {
    fn command_id(&self) -> String {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        format!("{}-{n}", self.prefix)
    }

    fn suffix(&self) -> u32 {
        self.suffix
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn random_ids_are_unique() {
        let ids = RandomIds;
        let minted: HashSet<String> = (0..64).map(|_| ids.command_id()).collect();
        assert_eq!(minted.len(), 64);
    }

    #[test]
    fn random_ids_from_many_threads() {
        let handles: Vec<_> = (0..4)
            .map(|_| std::thread::spawn(|| (0..16).map(|_| RandomIds.command_id()).collect::<Vec<_>>()))
            .collect();
        let mut all = HashSet::new();
        for handle in handles {
            all.extend(handle.join().unwrap());
        }
        assert_eq!(all.len(), 64);
    }

    #[test]
    fn sequential_ids_count_up() {
        let ids = SequentialIds::new("cmd");
        assert_eq!(ids.command_id(), "cmd-0");
        assert_eq!(ids.command_id(), "cmd-1");
    }

    #[test]
    fn fixed_clock_nanos_follow_millis() {
        let clock = FixedClock::new(1_735_689_600_123);
        assert_eq!(clock.now_millis(), 1_735_689_600_123);
        assert_eq!(clock.now_nanos(), 1_735_689_600_123_000_000);
    }

    #[test]
    fn system_clock_is_after_2024() {
        assert!(SystemClock.now_millis() > 1_704_067_200_000);
    }
}
