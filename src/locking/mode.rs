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

use std::fmt;
use std::num::NonZeroUsize;

/// Indicates whether a key is requested for concurrent readers or a single holder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LockMode {
    Shared,
    Exclusive,
}

impl LockMode {
    pub fn label(self) -> &'static str {
        match self {
            LockMode::Shared => "shared",
            LockMode::Exclusive => "exclusive",
        }
    }
}

impl fmt::Display for LockMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// State recorded in the lock table for a held key.
///
/// Unheld keys are absent from the table, so a shared entry always has at least one holder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockState {
    Exclusive,
    Shared(NonZeroUsize),
}

impl LockState {
    pub(crate) fn initial(mode: LockMode) -> Self {
        match mode {
            LockMode::Exclusive => LockState::Exclusive,
            LockMode::Shared => LockState::Shared(NonZeroUsize::MIN),
        }
    }

    /// Raw table encoding: `0` for exclusive, the reader count otherwise.
    pub fn raw_count(self) -> usize {
        match self {
            LockState::Exclusive => 0,
            LockState::Shared(count) => count.get(),
        }
    }
}
