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

pub mod acquisition;
pub mod backoff;
pub mod cancellation;
pub mod guard;
pub mod mode;
pub mod observer;
pub mod registry;

pub use acquisition::{AcquireOptions, AcquireOutcome, AcquireReport};
pub use backoff::Backoff;
pub use cancellation::CancellationToken;
pub use guard::{ExclusiveGuard, SharedGuard};
pub use mode::{LockMode, LockState};
pub use observer::{LockWaitObserver, WaitStats, WaitStatsSnapshot};
pub use registry::LockRegistry;
