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

mod context;
mod exit_codes;
mod format;

pub use context::ErrorContext;
pub use exit_codes::get_exit_code;
pub use format::format_error_chain;

use crate::locking::LockMode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum KeyLockError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Configuration file error: {0}")]
    ConfigFile(String),

    #[error("Timed out acquiring {mode} lock on {key} after {attempts} attempts")]
    LockTimeout {
        key: String,
        mode: LockMode,
        attempts: usize,
        waited_ms: u128,
    },

    #[error("Cancelled while waiting for {mode} lock on {key}")]
    Cancelled {
        key: String,
        mode: LockMode,
        waited_ms: u128,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, KeyLockError>;
