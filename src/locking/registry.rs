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

//! The keyed lock table and its acquisition protocol.
//!
//! Every key maps to a [`LockState`] inside one `Mutex`-guarded `HashMap`. Acquisitions
//! are short probes of the table; a contended caller sleeps on its own thread between
//! probes, so the table guard is never held across a backoff delay.

use crate::config::BackoffConfig;
use crate::error::Result;
use crate::locking::acquisition::{AcquireOptions, AcquireOutcome, AcquireReport};
use crate::locking::backoff::Backoff;
use crate::locking::mode::{LockMode, LockState};
use log::{debug, trace, warn};
use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::Instant;

/// Registry of advisory locks keyed by arbitrary hashable values.
///
/// Exclusive and shared holders are counted, not identified: any caller may release a
/// key, and mismatched releases are ignored rather than reported.
pub struct LockRegistry<K> {
    table: Mutex<HashMap<K, LockState>>,
    backoff: Backoff,
    config: BackoffConfig,
}

impl<K: Eq + Hash> LockRegistry<K> {
    pub fn new() -> Self {
        Self::with_config(BackoffConfig::default())
    }

    /// Builds a registry without validating `config`.
    pub fn with_config(config: BackoffConfig) -> Self {
        Self {
            table: Mutex::new(HashMap::new()),
            backoff: Backoff::new(&config),
            config,
        }
    }

    pub fn try_with_config(config: BackoffConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::with_config(config))
    }

    pub fn config(&self) -> &BackoffConfig {
        &self.config
    }

    pub fn is_locked<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.table().contains_key(key)
    }

    /// Raw state of `key`: `Some(0)` when exclusively held, `Some(n)` for `n` readers,
    /// `None` when unlocked.
    pub fn lock_count<Q>(&self, key: &Q) -> Option<usize>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.table().get(key).map(|state| state.raw_count())
    }

    pub fn state<Q>(&self, key: &Q) -> Option<LockState>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.table().get(key).copied()
    }

    /// Number of keys currently held in any mode.
    pub fn len(&self) -> usize {
        self.table().len()
    }

    pub fn is_empty(&self) -> bool {
        self.table().is_empty()
    }

    pub fn held_keys(&self) -> Vec<K>
    where
        K: Clone,
    {
        self.table().keys().cloned().collect()
    }

    /// Attempts to take `key` exclusively, retrying with backoff until the budget is spent.
    pub fn try_lock(&self, key: K) -> bool {
        self.acquire(key, LockMode::Exclusive, &AcquireOptions::default(), None)
            .is_acquired()
    }

    /// Attempts to join the readers of `key`, retrying while it is exclusively held.
    pub fn try_rlock(&self, key: K) -> bool {
        self.acquire(key, LockMode::Shared, &AcquireOptions::default(), None)
            .is_acquired()
    }

    /// Releases an exclusive hold. Shared-held and absent keys are left untouched.
    pub fn unlock<Q>(&self, key: &Q)
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let mut table = self.table();
        match table.get(key) {
            Some(LockState::Exclusive) => {
                table.remove(key);
            }
            Some(LockState::Shared(count)) => {
                debug!("Ignoring exclusive release of a key held by {count} reader(s)");
            }
            None => trace!("Ignoring exclusive release of an unheld key"),
        }
    }

    /// Releases one shared hold, removing the key when the last reader leaves.
    pub fn runlock<Q>(&self, key: &Q)
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let mut table = self.table();
        match table.get_mut(key) {
            Some(LockState::Shared(count)) => match NonZeroUsize::new(count.get() - 1) {
                Some(remaining) => *count = remaining,
                None => {
                    table.remove(key);
                }
            },
            Some(LockState::Exclusive) => {
                debug!("Ignoring shared release of an exclusively held key");
            }
            None => trace!("Ignoring shared release of an unheld key"),
        }
    }

    /// Exclusive acquisition with per-call options; reports how the attempt ended.
    pub fn try_lock_with(&self, key: K, options: &AcquireOptions<'_>) -> AcquireReport
    where
        K: fmt::Debug,
    {
        let label = options.observer().map(|_| format!("{key:?}"));
        self.acquire(key, LockMode::Exclusive, options, label.as_deref())
    }

    /// Shared acquisition with per-call options; reports how the attempt ended.
    pub fn try_rlock_with(&self, key: K, options: &AcquireOptions<'_>) -> AcquireReport
    where
        K: fmt::Debug,
    {
        let label = options.observer().map(|_| format!("{key:?}"));
        self.acquire(key, LockMode::Shared, options, label.as_deref())
    }

    pub(crate) fn acquire(
        &self,
        key: K,
        mode: LockMode,
        options: &AcquireOptions<'_>,
        label: Option<&str>,
    ) -> AcquireReport {
        let started_at = Instant::now();
        let observer = options.observer().zip(label);
        let name = label.unwrap_or("key");
        let mut key = key;
        let mut attempts = 0;

        for round in 0..self.config.max_retries {
            if options.is_cancelled() {
                let waited = started_at.elapsed();
                debug!("Cancelled {mode} acquisition of {name} after {attempts} attempts");
                if let Some((observer, label)) = observer {
                    observer.on_cancelled(label, mode, waited);
                }
                return report(AcquireOutcome::Cancelled, attempts, started_at);
            }

            attempts += 1;
            match self.probe(key, mode) {
                Ok(()) => {
                    let waited = started_at.elapsed();
                    if attempts > 1 {
                        debug!(
                            "Acquired {mode} lock on {name} after {attempts} attempts ({:.3}s)",
                            waited.as_secs_f64()
                        );
                    }
                    if let Some((observer, label)) = observer {
                        observer.on_acquired(label, mode, attempts, waited);
                    }
                    return report(AcquireOutcome::Acquired, attempts, started_at);
                }
                Err(returned) => key = returned,
            }

            if round == 0
                && let Some((observer, label)) = observer
            {
                observer.on_wait_start(label, mode);
            }

            let mut delay = self.backoff.delay(round);
            if let Some(remaining) = options.remaining(started_at) {
                if remaining.is_zero() {
                    debug!("Deadline elapsed for {mode} acquisition of {name}");
                    if let Some((observer, label)) = observer {
                        observer.on_exhausted(label, mode, attempts, started_at.elapsed());
                    }
                    return report(AcquireOutcome::DeadlineElapsed, attempts, started_at);
                }
                delay = delay.min(remaining);
            }

            trace!("{mode} lock on {name} contended (attempt {attempts}); sleeping {delay:?}");
            if let Some((observer, label)) = observer {
                observer.on_retry(label, mode, attempts, delay, started_at.elapsed());
            }
            thread::sleep(delay);
        }

        debug!("Gave up on {mode} lock for {name} after {attempts} attempts");
        if let Some((observer, label)) = observer {
            observer.on_exhausted(label, mode, attempts, started_at.elapsed());
        }
        report(AcquireOutcome::Exhausted, attempts, started_at)
    }

    /// One guarded check-and-set. Hands the key back when it is unavailable in `mode`.
    fn probe(&self, key: K, mode: LockMode) -> std::result::Result<(), K> {
        let mut table = self.table();
        if let Some(state) = table.get_mut(&key) {
            return match (mode, state) {
                (LockMode::Shared, LockState::Shared(count)) => {
                    *count = count.saturating_add(1);
                    Ok(())
                }
                _ => Err(key),
            };
        }
        table.insert(key, LockState::initial(mode));
        Ok(())
    }

    fn table(&self) -> MutexGuard<'_, HashMap<K, LockState>> {
        self.table.lock().unwrap_or_else(|poisoned| {
            warn!("Lock table guard was poisoned; continuing with the recovered table");
            poisoned.into_inner()
        })
    }
}

impl<K: Eq + Hash> Default for LockRegistry<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K> fmt::Debug for LockRegistry<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockRegistry")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn report(outcome: AcquireOutcome, attempts: usize, started_at: Instant) -> AcquireReport {
    AcquireReport {
        outcome,
        attempts,
        waited: started_at.elapsed(),
    }
}
