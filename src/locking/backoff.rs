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

use crate::config::BackoffConfig;
use rand::Rng;
use std::time::Duration;

/// Randomized, capped exponential backoff used between contended probes.
#[derive(Debug, Clone, PartialEq)]
pub struct Backoff {
    initial_ns: f64,
    max_ns: f64,
    factor: f64,
    jitter: f64,
}

impl Backoff {
    pub fn new(config: &BackoffConfig) -> Self {
        Self {
            initial_ns: config.initial_delay_ns as f64,
            max_ns: config.max_delay_ns as f64,
            factor: config.factor,
            jitter: config.jitter,
        }
    }

    /// Delay before the next probe after `attempt` failed rounds, jittered with the
    /// thread-local RNG.
    pub fn delay(&self, attempt: usize) -> Duration {
        self.delay_with_rng(attempt, &mut rand::thread_rng())
    }

    pub fn delay_with_rng<R: Rng + ?Sized>(&self, attempt: usize, rng: &mut R) -> Duration {
        if attempt == 0 {
            return nanos(self.initial_ns);
        }

        let base = self.base_nanos(attempt);
        let spread = rng.gen_range(0.0..1.0) * 2.0 - 1.0;
        let jittered = base * (1.0 + self.jitter * spread);
        // Jitter above 1.0 can push the factor negative.
        if jittered > 0.0 {
            nanos(jittered)
        } else {
            Duration::ZERO
        }
    }

    /// Unjittered delay for `attempt`, clamped to the configured maximum.
    pub fn base_delay(&self, attempt: usize) -> Duration {
        if attempt == 0 {
            return nanos(self.initial_ns);
        }
        nanos(self.base_nanos(attempt))
    }

    fn base_nanos(&self, attempt: usize) -> f64 {
        let mut delay = self.initial_ns;
        let mut remaining = attempt;
        while delay < self.max_ns && remaining > 0 {
            delay *= self.factor;
            remaining -= 1;
        }
        delay.min(self.max_ns)
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(&BackoffConfig::default())
    }
}

fn nanos(value: f64) -> Duration {
    // `as` saturates, so oversized values clamp to u64::MAX.
    Duration::from_nanos(value as u64)
}
