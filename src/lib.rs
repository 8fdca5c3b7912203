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

//! Keyed advisory locks.
//!
//! A [`LockRegistry`](locking::LockRegistry) coordinates exclusive and shared access to
//! arbitrary hashable keys without allocating a lock object per key. Contended
//! acquisitions retry with randomized exponential backoff up to a fixed budget and then
//! report failure instead of blocking forever.
//!
//! ```
//! use keylock::locking::LockRegistry;
//!
//! let registry = LockRegistry::new();
//! assert!(registry.try_lock("orders/42"));
//! assert!(registry.is_locked(&"orders/42"));
//! registry.unlock(&"orders/42");
//!
//! assert!(registry.try_rlock("orders/7"));
//! assert!(registry.try_rlock("orders/7"));
//! assert_eq!(registry.lock_count(&"orders/7"), Some(2));
//! ```

pub mod commands;
pub mod config;
pub mod error;
pub mod locking;
pub mod logging;
