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

//! Contention simulation over a fresh registry.
//!
//! Workers repeatedly pick a random key, take it in shared or exclusive mode, hold it
//! briefly, and release it. Side counters per key verify that no exclusive holder ever
//! overlaps another holder.

use crate::config::BackoffConfig;
use crate::error::Result;
use crate::locking::observer::format_duration;
use crate::locking::{AcquireOptions, LockMode, LockRegistry, WaitStats, WaitStatsSnapshot};
use log::{debug, info};
use rand::Rng;
use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct SimulationOptions {
    pub workers: usize,
    pub keys: usize,
    pub iterations: usize,
    /// Share of acquisitions taken in shared mode, 0..=100.
    pub readers_percent: u8,
    pub hold: Duration,
}

impl Default for SimulationOptions {
    fn default() -> Self {
        Self {
            workers: 8,
            keys: 4,
            iterations: 100,
            readers_percent: 50,
            hold: Duration::from_micros(200),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SimulationSummary {
    pub acquired: u64,
    pub failed: u64,
    pub violations: u64,
    pub elapsed: Duration,
    pub stats: WaitStatsSnapshot,
}

impl fmt::Display for SimulationSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Acquired:   {}", self.acquired)?;
        writeln!(f, "Failed:     {}", self.failed)?;
        writeln!(f, "Violations: {}", self.violations)?;
        writeln!(f, "Elapsed:    {}", format_duration(self.elapsed))?;
        write!(f, "Waits:      {}", self.stats)
    }
}

#[derive(Default)]
struct KeyOccupancy {
    writers: AtomicUsize,
    readers: AtomicUsize,
}

pub struct SimulateCommand<'a> {
    config: &'a BackoffConfig,
}

impl<'a> SimulateCommand<'a> {
    pub fn new(config: &'a BackoffConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn execute(&self, options: &SimulationOptions) -> Result<()> {
        let summary = self.run(options);
        println!("{summary}");
        Ok(())
    }

    pub fn run(&self, options: &SimulationOptions) -> SimulationSummary {
        info!(
            "Simulating {} workers x {} iterations over {} keys ({}% readers)",
            options.workers, options.iterations, options.keys, options.readers_percent
        );

        let registry = LockRegistry::<String>::with_config(self.config.clone());
        let stats = WaitStats::new();
        let occupancy: Vec<KeyOccupancy> = (0..options.keys.max(1))
            .map(|_| KeyOccupancy::default())
            .collect();
        let acquired = AtomicU64::new(0);
        let failed = AtomicU64::new(0);
        let violations = AtomicU64::new(0);
        let started_at = Instant::now();

        thread::scope(|scope| {
            for worker in 0..options.workers {
                let registry = &registry;
                let stats = &stats;
                let occupancy = &occupancy;
                let acquired = &acquired;
                let failed = &failed;
                let violations = &violations;
                scope.spawn(move || {
                    let mut rng = rand::thread_rng();
                    let request = AcquireOptions::new().with_observer(stats);
                    for _ in 0..options.iterations {
                        let index = rng.gen_range(0..occupancy.len());
                        let mode = if rng.gen_range(0..100u8) < options.readers_percent {
                            LockMode::Shared
                        } else {
                            LockMode::Exclusive
                        };
                        let key = format!("key-{index}");
                        let slot = &occupancy[index];

                        let report = match mode {
                            LockMode::Exclusive => registry.try_lock_with(key.clone(), &request),
                            LockMode::Shared => registry.try_rlock_with(key.clone(), &request),
                        };
                        if !report.is_acquired() {
                            debug!("Worker {worker} gave up on {mode} {key}");
                            failed.fetch_add(1, Ordering::Relaxed);
                            continue;
                        }
                        acquired.fetch_add(1, Ordering::Relaxed);

                        if slot_enter(slot, mode) {
                            violations.fetch_add(1, Ordering::Relaxed);
                        }
                        thread::sleep(options.hold);
                        slot_leave(slot, mode);

                        match mode {
                            LockMode::Exclusive => registry.unlock(&key),
                            LockMode::Shared => registry.runlock(&key),
                        }
                    }
                });
            }
        });

        SimulationSummary {
            acquired: acquired.into_inner(),
            failed: failed.into_inner(),
            violations: violations.into_inner(),
            elapsed: started_at.elapsed(),
            stats: stats.snapshot(),
        }
    }
}

/// Records a new holder; returns `true` when it overlaps an incompatible one.
fn slot_enter(slot: &KeyOccupancy, mode: LockMode) -> bool {
    match mode {
        LockMode::Exclusive => {
            let writers = slot.writers.fetch_add(1, Ordering::SeqCst) + 1;
            writers > 1 || slot.readers.load(Ordering::SeqCst) > 0
        }
        LockMode::Shared => {
            slot.readers.fetch_add(1, Ordering::SeqCst);
            slot.writers.load(Ordering::SeqCst) > 0
        }
    }
}

fn slot_leave(slot: &KeyOccupancy, mode: LockMode) {
    match mode {
        LockMode::Exclusive => slot.writers.fetch_sub(1, Ordering::SeqCst),
        LockMode::Shared => slot.readers.fetch_sub(1, Ordering::SeqCst),
    };
}
