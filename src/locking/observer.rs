// Copyright 2025 dentsusoken
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Observer interfaces for lock wait instrumentation.
//!
//! Observers let callers surface contention information (progress output, counters)
//! without duplicating the registry's retry loop.

use crate::locking::mode::LockMode;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Observer hooks for lock wait events. `key` is the `Debug` rendering of the key.
pub trait LockWaitObserver: Send + Sync {
    fn on_wait_start(&self, _key: &str, _mode: LockMode) {}

    fn on_retry(
        &self,
        _key: &str,
        _mode: LockMode,
        _attempt: usize,
        _delay: Duration,
        _elapsed: Duration,
    ) {
    }

    fn on_acquired(&self, _key: &str, _mode: LockMode, _attempts: usize, _waited: Duration) {}

    fn on_exhausted(&self, _key: &str, _mode: LockMode, _attempts: usize, _waited: Duration) {}

    fn on_cancelled(&self, _key: &str, _mode: LockMode, _waited: Duration) {}
}

/// Aggregates wait events across every acquisition it observes.
#[derive(Debug, Default)]
pub struct WaitStats {
    acquired: AtomicU64,
    contended: AtomicU64,
    retries: AtomicU64,
    exhausted: AtomicU64,
    cancelled: AtomicU64,
    waited_nanos: AtomicU64,
}

/// Point-in-time copy of [`WaitStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WaitStatsSnapshot {
    pub acquired: u64,
    pub contended: u64,
    pub retries: u64,
    pub exhausted: u64,
    pub cancelled: u64,
    pub waited: Duration,
}

impl WaitStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> WaitStatsSnapshot {
        WaitStatsSnapshot {
            acquired: self.acquired.load(Ordering::Relaxed),
            contended: self.contended.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
            exhausted: self.exhausted.load(Ordering::Relaxed),
            cancelled: self.cancelled.load(Ordering::Relaxed),
            waited: Duration::from_nanos(self.waited_nanos.load(Ordering::Relaxed)),
        }
    }

    fn add_wait(&self, waited: Duration) {
        let nanos = u64::try_from(waited.as_nanos()).unwrap_or(u64::MAX);
        self.waited_nanos.fetch_add(nanos, Ordering::Relaxed);
    }
}

impl LockWaitObserver for WaitStats {
    fn on_retry(
        &self,
        _key: &str,
        _mode: LockMode,
        _attempt: usize,
        _delay: Duration,
        _elapsed: Duration,
    ) {
        self.retries.fetch_add(1, Ordering::Relaxed);
    }

    fn on_acquired(&self, _key: &str, _mode: LockMode, attempts: usize, waited: Duration) {
        self.acquired.fetch_add(1, Ordering::Relaxed);
        if attempts > 1 {
            self.contended.fetch_add(1, Ordering::Relaxed);
            self.add_wait(waited);
        }
    }

    fn on_exhausted(&self, _key: &str, _mode: LockMode, _attempts: usize, waited: Duration) {
        self.exhausted.fetch_add(1, Ordering::Relaxed);
        self.add_wait(waited);
    }

    fn on_cancelled(&self, _key: &str, _mode: LockMode, waited: Duration) {
        self.cancelled.fetch_add(1, Ordering::Relaxed);
        self.add_wait(waited);
    }
}

impl fmt::Display for WaitStatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "acquired {} ({} after contention), {} retries, {} exhausted, {} cancelled, waited {}",
            self.acquired,
            self.contended,
            self.retries,
            self.exhausted,
            self.cancelled,
            format_duration(self.waited)
        )
    }
}

pub(crate) fn format_duration(duration: Duration) -> String {
    if duration.as_secs() >= 1 {
        format!("{:.1}s", duration.as_secs_f32())
    } else {
        format!("{:.0}ms", duration.as_millis())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_count_contended_acquisitions_only_once() {
        let stats = WaitStats::new();
        let waited = Duration::from_millis(3);

        stats.on_acquired("\"a\"", LockMode::Exclusive, 1, Duration::ZERO);
        stats.on_retry("\"b\"", LockMode::Shared, 1, waited, waited);
        stats.on_retry("\"b\"", LockMode::Shared, 2, waited, waited);
        stats.on_acquired("\"b\"", LockMode::Shared, 3, waited);
        stats.on_exhausted("\"c\"", LockMode::Exclusive, 4, waited);
        stats.on_cancelled("\"d\"", LockMode::Exclusive, waited);

        let snapshot = stats.snapshot();
        assert_eq!(
            snapshot,
            WaitStatsSnapshot {
                acquired: 2,
                contended: 1,
                retries: 2,
                exhausted: 1,
                cancelled: 1,
                waited: Duration::from_millis(9),
            }
        );
    }

    #[test]
    fn snapshot_display_is_human_readable() {
        let snapshot = WaitStatsSnapshot {
            acquired: 10,
            contended: 4,
            retries: 12,
            exhausted: 1,
            cancelled: 0,
            waited: Duration::from_millis(1_500),
        };
        assert_eq!(
            snapshot.to_string(),
            "acquired 10 (4 after contention), 12 retries, 1 exhausted, 0 cancelled, waited 1.5s"
        );
    }

    #[test]
    fn format_duration_switches_units() {
        assert_eq!(format_duration(Duration::from_millis(250)), "250ms");
        assert_eq!(format_duration(Duration::from_millis(2_000)), "2.0s");
    }
}
