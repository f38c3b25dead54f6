// Copyright 2026 Formscout Contributors
// SPDX-License-Identifier: Apache-2.0

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use formscout::cli::{self, GlobalArgs};
use formscout::config::DEFAULT_SCHEDULE_TIME;

#[derive(Parser)]
#[command(
    name = "formscout",
    about = "Formscout: find candidate sites that carry a contact form",
    version,
    after_help = "Run 'formscout <command> --help' for details on each command."
)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the group sequence once, now
    Run {
        /// Group to start with (defaults to --worksheet-name)
        #[arg(long)]
        group: Option<String>,
        /// Run only the starting group: no sequence, no report
        #[arg(long)]
        single: bool,
    },
    /// Run the group sequence every day at a fixed time
    Schedule {
        /// Local time of day, HH:MM
        #[arg(long, env = "FORMSCOUT_SCHEDULE_TIME", default_value = DEFAULT_SCHEDULE_TIME)]
        time: String,
        /// Write a PID file and refuse to start twice
        #[arg(long)]
        daemon: bool,
    },
    /// Check explicit URLs for forms and print the verdicts
    Check {
        /// URLs to check
        #[arg(required = true)]
        urls: Vec<String>,
    },
    /// Check the environment: browser, log dirs, sink
    Doctor,
    /// Generate shell completions
    Completions {
        /// Shell type (bash, zsh, fish, powershell)
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::Completions { shell } = cli.command {
        let mut cmd = Cli::command();
        clap_complete::generate(shell, &mut cmd, "formscout", &mut std::io::stdout());
        return Ok(());
    }

    let args = cli.global;
    if let Err(e) = cli::logging::init(&args.log_level, args.log_json, Some(&args.log_file)) {
        eprintln!("  Error: {e:#}");
        std::process::exit(1);
    }

    let result = match cli.command {
        Commands::Run { group, single } => cli::run_cmd::run(&args, group.as_deref(), single).await,
        Commands::Schedule { time, daemon } => cli::schedule_cmd::run(&args, &time, daemon).await,
        Commands::Check { urls } => cli::check_cmd::run(&args, &urls).await,
        Commands::Doctor => cli::doctor::run(&args).await,
        Commands::Completions { .. } => Ok(()),
    };

    // Consistent exit codes: 0=success, 1=error
    if let Err(e) = &result {
        eprintln!("  Error: {e:#}");
        std::process::exit(1);
    }
    result
}
