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

use crate::error::KeyLockError;
use std::fmt;

pub struct ErrorContext<'a> {
    pub error: &'a KeyLockError,
    pub suggestion: Option<String>,
    pub details: Option<String>,
}

impl<'a> ErrorContext<'a> {
    pub fn new(error: &'a KeyLockError) -> Self {
        let (suggestion, details) = match error {
            KeyLockError::InvalidConfig(msg) => {
                let suggestion = Some(
                    "Backoff settings require factor > 1, jitter within 0..=1, at least one \
                     retry, and initial_delay_ns <= max_delay_ns."
                        .to_string(),
                );
                let details = Some(msg.clone());
                (suggestion, details)
            }
            KeyLockError::ConfigFile(msg) => {
                let suggestion = Some(
                    "Check the TOML syntax of the configuration file or remove it to fall back \
                     to the built-in defaults."
                        .to_string(),
                );
                let details = Some(msg.clone());
                (suggestion, details)
            }
            KeyLockError::LockTimeout {
                key,
                mode,
                attempts,
                waited_ms,
            } => {
                let suggestion = Some(
                    "The key stayed held for the whole retry budget. Raise max_retries or \
                     max_delay_ns (or KEYLOCK_MAX_RETRIES), or release the current holder sooner."
                        .to_string(),
                );
                let details = Some(format!(
                    "{mode} acquisition of {key} gave up after {attempts} attempts and \
                     {waited_ms}ms"
                ));
                (suggestion, details)
            }
            KeyLockError::Cancelled {
                key,
                mode,
                waited_ms,
            } => {
                let suggestion = None;
                let details = Some(format!(
                    "{mode} acquisition of {key} was cancelled after {waited_ms}ms"
                ));
                (suggestion, details)
            }
            KeyLockError::Io(_) => (None, None),
        };

        ErrorContext {
            error,
            suggestion,
            details,
        }
    }
}

impl<'a> fmt::Display for ErrorContext<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Error: {}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\n\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\n\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}
