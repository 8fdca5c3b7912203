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

use crate::config::{BackoffConfig, CONFIG_FILE_NAME};
use crate::error::{KeyLockError, Result};
use clap::Subcommand;
use log::info;
use std::path::{Path, PathBuf};

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the effective backoff configuration as TOML
    Show,
    /// Write a configuration file populated with the built-in defaults
    Init {
        /// Destination file (defaults to ./keylock.toml)
        #[arg(value_name = "FILE")]
        path: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,

        /// Use the exclusive-only retry budget
        #[arg(long)]
        exclusive_only: bool,
    },
}

impl ConfigCommand {
    pub fn execute(self, config: &BackoffConfig) -> Result<()> {
        match self {
            ConfigCommand::Show => {
                print!("{}", config.to_toml()?);
                Ok(())
            }
            ConfigCommand::Init {
                path,
                force,
                exclusive_only,
            } => {
                let path = path.unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME));
                let defaults = if exclusive_only {
                    BackoffConfig::exclusive_only()
                } else {
                    BackoffConfig::default()
                };
                write_defaults(&path, &defaults, force)?;
                println!("Wrote {}", path.display());
                Ok(())
            }
        }
    }
}

fn write_defaults(path: &Path, config: &BackoffConfig, force: bool) -> Result<()> {
    if path.exists() && !force {
        return Err(KeyLockError::ConfigFile(format!(
            "{} already exists; pass --force to overwrite it",
            path.display()
        )));
    }
    info!("Writing configuration to {}", path.display());
    config.save(path)
}
