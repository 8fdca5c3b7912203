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

use crate::error::{KeyLockError, Result};
use crate::locking::acquisition::{AcquireOptions, AcquireOutcome, AcquireReport};
use crate::locking::mode::LockMode;
use crate::locking::registry::LockRegistry;
use log::warn;
use std::fmt;
use std::hash::Hash;

impl<K: Eq + Hash + Clone + fmt::Debug> LockRegistry<K> {
    /// Acquires `key` exclusively and returns a guard that unlocks it on drop.
    pub fn lock(&self, key: K) -> Result<ExclusiveGuard<'_, K>> {
        self.lock_with(key, &AcquireOptions::default())
    }

    pub fn lock_with(&self, key: K, options: &AcquireOptions<'_>) -> Result<ExclusiveGuard<'_, K>> {
        let held = key.clone();
        let report = self.try_lock_with(key, options);
        into_result(&held, LockMode::Exclusive, report)?;
        Ok(ExclusiveGuard {
            registry: self,
            key: Some(held),
        })
    }

    /// Joins the readers of `key` and returns a guard that releases the hold on drop.
    pub fn read(&self, key: K) -> Result<SharedGuard<'_, K>> {
        self.read_with(key, &AcquireOptions::default())
    }

    pub fn read_with(&self, key: K, options: &AcquireOptions<'_>) -> Result<SharedGuard<'_, K>> {
        let held = key.clone();
        let report = self.try_rlock_with(key, options);
        into_result(&held, LockMode::Shared, report)?;
        Ok(SharedGuard {
            registry: self,
            key: Some(held),
        })
    }
}

fn into_result<K: fmt::Debug>(key: &K, mode: LockMode, report: AcquireReport) -> Result<()> {
    let waited_ms = report.waited.as_millis();
    match report.outcome {
        AcquireOutcome::Acquired => Ok(()),
        AcquireOutcome::Exhausted | AcquireOutcome::DeadlineElapsed => {
            warn!(
                "Could not acquire {mode} lock on {key:?} after {} attempts",
                report.attempts
            );
            Err(KeyLockError::LockTimeout {
                key: format!("{key:?}"),
                mode,
                attempts: report.attempts,
                waited_ms,
            })
        }
        AcquireOutcome::Cancelled => Err(KeyLockError::Cancelled {
            key: format!("{key:?}"),
            mode,
            waited_ms,
        }),
    }
}

/// RAII guard that releases an exclusive hold when dropped.
pub struct ExclusiveGuard<'a, K: Eq + Hash> {
    registry: &'a LockRegistry<K>,
    key: Option<K>,
}

impl<K: Eq + Hash> ExclusiveGuard<'_, K> {
    pub fn key(&self) -> Option<&K> {
        self.key.as_ref()
    }

    pub fn release(mut self) {
        if let Some(key) = self.key.take() {
            self.registry.unlock(&key);
        }
    }
}

impl<K: Eq + Hash> Drop for ExclusiveGuard<'_, K> {
    fn drop(&mut self) {
        if let Some(key) = self.key.take() {
            self.registry.unlock(&key);
        }
    }
}

impl<K: Eq + Hash + fmt::Debug> fmt::Debug for ExclusiveGuard<'_, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExclusiveGuard")
            .field("key", &self.key)
            .finish()
    }
}

/// RAII guard that releases one shared hold when dropped.
pub struct SharedGuard<'a, K: Eq + Hash> {
    registry: &'a LockRegistry<K>,
    key: Option<K>,
}

impl<K: Eq + Hash> SharedGuard<'_, K> {
    pub fn key(&self) -> Option<&K> {
        self.key.as_ref()
    }

    pub fn release(mut self) {
        if let Some(key) = self.key.take() {
            self.registry.runlock(&key);
        }
    }
}

impl<K: Eq + Hash> Drop for SharedGuard<'_, K> {
    fn drop(&mut self) {
        if let Some(key) = self.key.take() {
            self.registry.runlock(&key);
        }
    }
}

impl<K: Eq + Hash + fmt::Debug> fmt::Debug for SharedGuard<'_, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedGuard")
            .field("key", &self.key)
            .finish()
    }
}
