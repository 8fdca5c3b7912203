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

use clap::{Parser, Subcommand};
use keylock::commands::config::ConfigCommand;
use keylock::commands::simulate::{SimulateCommand, SimulationOptions};
use keylock::config::BackoffConfig;
use keylock::error::{Result, format_error_chain, get_exit_code};
use keylock::logging;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "keylock")]
#[command(author, version, about = "Keyed advisory lock registry", long_about = None)]
struct Cli {
    /// Increase verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Backoff configuration file (TOML); KEYLOCK_* variables override it
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run worker threads contending on a shared registry and report wait statistics
    #[command(visible_alias = "sim")]
    Simulate {
        /// Number of worker threads
        #[arg(short, long, default_value_t = 8)]
        workers: usize,

        /// Number of distinct keys to contend on
        #[arg(short, long, default_value_t = 4)]
        keys: usize,

        /// Acquisitions per worker
        #[arg(short, long, default_value_t = 100)]
        iterations: usize,

        /// Percentage of acquisitions taken in shared mode
        #[arg(long, default_value_t = 50, value_parser = clap::value_parser!(u8).range(0..=100))]
        readers_percent: u8,

        /// How long each holder keeps its key, in microseconds
        #[arg(long, value_name = "MICROS", default_value_t = 200)]
        hold_us: u64,
    },

    /// Inspect or create configuration files
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

fn main() {
    let cli = Cli::parse();

    logging::setup_logger(cli.verbose);

    // Load configuration once at startup
    let config = match BackoffConfig::resolve(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", format_error_chain(&e));
            std::process::exit(get_exit_code(&e));
        }
    };

    let result: Result<()> = (|| match cli.command {
        Commands::Simulate {
            workers,
            keys,
            iterations,
            readers_percent,
            hold_us,
        } => {
            let command = SimulateCommand::new(&config)?;
            command.execute(&SimulationOptions {
                workers,
                keys,
                iterations,
                readers_percent,
                hold: Duration::from_micros(hold_us),
            })
        }
        Commands::Config { command } => command.execute(&config),
    })();

    if let Err(e) = result {
        eprintln!("{}", format_error_chain(&e));
        std::process::exit(get_exit_code(&e));
    }
}
