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

use crate::locking::cancellation::CancellationToken;
use crate::locking::observer::LockWaitObserver;
use std::time::{Duration, Instant};

/// Per-call options for an acquisition.
///
/// The registry's retry budget always applies; a deadline can only shorten it.
#[derive(Default)]
pub struct AcquireOptions<'a> {
    deadline: Option<Duration>,
    cancellation: Option<CancellationToken>,
    observer: Option<&'a dyn LockWaitObserver>,
}

impl<'a> AcquireOptions<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_cancellation(mut self, cancellation: CancellationToken) -> Self {
        self.cancellation = Some(cancellation);
        self
    }

    pub fn with_observer(mut self, observer: &'a dyn LockWaitObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn observer(&self) -> Option<&'a dyn LockWaitObserver> {
        self.observer
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
    }

    pub(crate) fn remaining(&self, started_at: Instant) -> Option<Duration> {
        self.deadline
            .map(|limit| limit.saturating_sub(started_at.elapsed()))
    }
}

/// How an acquisition attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireOutcome {
    Acquired,
    /// Every round of the retry budget found the key held.
    Exhausted,
    /// The per-call deadline passed before the budget ran out.
    DeadlineElapsed,
    Cancelled,
}

/// Outcome of an acquisition together with how much work it took.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcquireReport {
    pub outcome: AcquireOutcome,
    /// Number of table probes performed.
    pub attempts: usize,
    pub waited: Duration,
}

impl AcquireReport {
    pub fn is_acquired(&self) -> bool {
        self.outcome == AcquireOutcome::Acquired
    }
}
