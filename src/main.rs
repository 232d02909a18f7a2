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
use leasehold::commands::config::ConfigCommand;
use leasehold::commands::elect::ElectCommand;
use leasehold::commands::hold::HoldCommand;
use leasehold::commands::resign::ResignCommand;
use leasehold::commands::status::StatusCommand;
use leasehold::commands::sweep::SweepCommand;
use leasehold::commands::{CommandContext, DEFAULT_ELECTION};
use leasehold::config::{LeaseholdConfig, leasehold_home};
use leasehold::context::global_context;
use leasehold::error::{Result, format_error_chain, get_exit_code};
use leasehold::logging;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "leasehold")]
#[command(author, version, about = "Distributed locks and leader election", long_about = None)]
struct Cli {
    /// Increase verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Leasehold home directory (defaults to $LEASEHOLD_HOME or ~/.leasehold)
    #[arg(long, global = true, value_name = "DIR")]
    home: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Acquire a lock, hold it and release it
    Hold {
        /// Resource to lock
        resource: String,

        /// How long to hold the lock; waits for Ctrl-C when omitted
        #[arg(long, value_name = "SECONDS")]
        seconds: Option<u64>,

        /// Keep renewing the lock while holding it
        #[arg(long)]
        renew: bool,
    },

    /// Show the stored lock record of a resource
    Status {
        /// Resource to inspect
        resource: String,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Run one leader election round for a member
    Elect {
        /// Member competing for leadership
        member: String,

        /// Name of the configured election
        #[arg(long, default_value = DEFAULT_ELECTION)]
        election: String,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Give up leadership
    Resign {
        /// Member giving up leadership
        member: String,

        /// Name of the configured election
        #[arg(long, default_value = DEFAULT_ELECTION)]
        election: String,
    },

    /// Remove expired records and abandoned write files
    Sweep {
        /// Only remove records expired for longer than this
        #[arg(long, value_name = "SECONDS", default_value_t = 0)]
        grace_seconds: u64,

        /// Sweep the table of this election instead of the lock table
        #[arg(long)]
        election: Option<String>,
    },

    /// Print the effective configuration
    Config,
}

fn load_config(cli: &Cli) -> Result<LeaseholdConfig> {
    let home = match &cli.home {
        Some(home) => home.clone(),
        None => leasehold_home()?,
    };
    LeaseholdConfig::load(&home)
}

fn main() {
    let cli = Cli::parse();

    // Initialize logger based on CLI flags and environment
    logging::setup_logger(cli.verbose);

    // Load configuration once at startup
    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", format_error_chain(&e));
            std::process::exit(get_exit_code(&e));
        }
    };

    let context = CommandContext::new(&config, global_context());

    let result: Result<()> = (|| match cli.command {
        Commands::Hold {
            resource,
            seconds,
            renew,
        } => HoldCommand::new(&context)?.execute(
            &resource,
            seconds.map(Duration::from_secs),
            renew,
        ),
        Commands::Status { resource, json } => StatusCommand::new(&context)?.execute(&resource, json),
        Commands::Elect {
            member,
            election,
            json,
        } => ElectCommand::new(&context)?
            .execute(&member, &election, json)
            .map(|_| ()),
        Commands::Resign { member, election } => {
            ResignCommand::new(&context)?.execute(&member, &election)
        }
        Commands::Sweep {
            grace_seconds,
            election,
        } => SweepCommand::new(&context)?
            .execute(Duration::from_secs(grace_seconds), election.as_deref())
            .map(|_| ()),
        Commands::Config => ConfigCommand::new(&context)?.execute(),
    })();

    if let Err(e) = result {
        eprintln!("{}", format_error_chain(&e));
        std::process::exit(get_exit_code(&e));
    }
}
