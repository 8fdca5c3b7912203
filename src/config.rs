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
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

pub const CONFIG_FILE_NAME: &str = "keylock.toml";

pub const DEFAULT_MAX_RETRIES: usize = 512;
pub const EXCLUSIVE_ONLY_MAX_RETRIES: usize = 450;
pub const DEFAULT_INITIAL_DELAY_NS: u64 = 10_000;
pub const DEFAULT_MAX_DELAY_NS: u64 = 10_000_000;
pub const DEFAULT_FACTOR: f64 = 1.1;
pub const DEFAULT_JITTER: f64 = 0.2;

pub const ENV_MAX_RETRIES: &str = "KEYLOCK_MAX_RETRIES";
pub const ENV_INITIAL_DELAY_NS: &str = "KEYLOCK_INITIAL_DELAY_NS";
pub const ENV_MAX_DELAY_NS: &str = "KEYLOCK_MAX_DELAY_NS";
pub const ENV_FACTOR: &str = "KEYLOCK_FACTOR";
pub const ENV_JITTER: &str = "KEYLOCK_JITTER";

/// Retry and backoff parameters fixed for the lifetime of a registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackoffConfig {
    #[serde(default = "default_initial_delay_ns")]
    pub initial_delay_ns: u64,

    #[serde(default = "default_max_delay_ns")]
    pub max_delay_ns: u64,

    #[serde(default = "default_factor")]
    pub factor: f64,

    #[serde(default = "default_jitter")]
    pub jitter: f64,

    #[serde(default = "default_max_retries")]
    pub max_retries: usize,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_delay_ns: DEFAULT_INITIAL_DELAY_NS,
            max_delay_ns: DEFAULT_MAX_DELAY_NS,
            factor: DEFAULT_FACTOR,
            jitter: DEFAULT_JITTER,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

fn default_initial_delay_ns() -> u64 {
    DEFAULT_INITIAL_DELAY_NS
}

fn default_max_delay_ns() -> u64 {
    DEFAULT_MAX_DELAY_NS
}

fn default_factor() -> f64 {
    DEFAULT_FACTOR
}

fn default_jitter() -> f64 {
    DEFAULT_JITTER
}

fn default_max_retries() -> usize {
    DEFAULT_MAX_RETRIES
}

impl BackoffConfig {
    /// Defaults with the smaller retry budget used by exclusive-only registries.
    pub fn exclusive_only() -> Self {
        Self {
            max_retries: EXCLUSIVE_ONLY_MAX_RETRIES,
            ..Self::default()
        }
    }

    pub fn with_delays(mut self, initial: Duration, max: Duration) -> Self {
        self.initial_delay_ns = duration_to_nanos(initial);
        self.max_delay_ns = duration_to_nanos(max);
        self
    }

    pub fn with_factor(mut self, factor: f64) -> Self {
        self.factor = factor;
        self
    }

    pub fn with_jitter(mut self, jitter: f64) -> Self {
        self.jitter = jitter;
        self
    }

    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn initial_delay(&self) -> Duration {
        Duration::from_nanos(self.initial_delay_ns)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_nanos(self.max_delay_ns)
    }

    /// Upper bound on the time a single acquisition can spend sleeping.
    pub fn worst_case_wait(&self) -> Duration {
        let per_round = self.max_delay_ns.max(self.initial_delay_ns) as f64 * (1.0 + self.jitter);
        Duration::from_secs_f64(per_round * self.max_retries as f64 / 1e9)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_retries == 0 {
            return Err(KeyLockError::InvalidConfig(
                "max_retries must be at least 1".to_string(),
            ));
        }
        if !self.factor.is_finite() || self.factor <= 1.0 {
            return Err(KeyLockError::InvalidConfig(format!(
                "factor must be greater than 1 (got {})",
                self.factor
            )));
        }
        if !(0.0..=1.0).contains(&self.jitter) {
            return Err(KeyLockError::InvalidConfig(format!(
                "jitter must be within 0..=1 (got {})",
                self.jitter
            )));
        }
        if self.initial_delay_ns > self.max_delay_ns {
            return Err(KeyLockError::InvalidConfig(format!(
                "initial_delay_ns ({}) exceeds max_delay_ns ({})",
                self.initial_delay_ns, self.max_delay_ns
            )));
        }
        Ok(())
    }

    /// Loads the configuration file at `path`, falling back to defaults when it is missing.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("Config file not found at {path:?}, using defaults");
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)?;
        let config: BackoffConfig = toml::from_str(&contents).map_err(|e| {
            KeyLockError::ConfigFile(format!("Failed to parse {}: {e}", path.display()))
        })?;

        log::debug!("Loaded config from {path:?}");
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let contents = self.to_toml()?;
        fs::write(path, contents)?;
        log::debug!("Saved config to {path:?}");
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| KeyLockError::ConfigFile(format!("Failed to serialize config: {e}")))
    }

    /// Applies `KEYLOCK_*` overrides from the process environment.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    /// Applies overrides from an arbitrary lookup; values that are present win over the
    /// file and built-in defaults.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_MAX_RETRIES) {
            self.max_retries = parse_override(ENV_MAX_RETRIES, &value)?;
        }
        if let Some(value) = lookup(ENV_INITIAL_DELAY_NS) {
            self.initial_delay_ns = parse_override(ENV_INITIAL_DELAY_NS, &value)?;
        }
        if let Some(value) = lookup(ENV_MAX_DELAY_NS) {
            self.max_delay_ns = parse_override(ENV_MAX_DELAY_NS, &value)?;
        }
        if let Some(value) = lookup(ENV_FACTOR) {
            self.factor = parse_override(ENV_FACTOR, &value)?;
        }
        if let Some(value) = lookup(ENV_JITTER) {
            self.jitter = parse_override(ENV_JITTER, &value)?;
        }
        Ok(())
    }

    /// Resolves the effective configuration: environment > file > defaults.
    pub fn resolve(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }
}

fn parse_override<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value.trim().parse::<T>().map_err(|_| {
        KeyLockError::InvalidConfig(format!("{name} value '{value}' could not be parsed"))
    })
}

fn duration_to_nanos(duration: Duration) -> u64 {
    u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX)
}
