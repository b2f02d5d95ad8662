mod cli;
mod commands;
mod config;
mod dashboard;
mod monitor;
mod paths;
mod progress;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command};
use std::io;

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
    /// Explicit `--config` path, if given
    pub config_path: Option<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    let ctx = Context {
        verbose: cli.verbose,
        quiet: cli.quiet,
        config_path: cli.config,
    };

    match cli.command.unwrap_or(Command::Watch) {
        Command::Watch => commands::watch::run(&ctx),
        Command::Status(args) => commands::status::run(&ctx, args.json),
        Command::Remotes => commands::remotes::run(&ctx),
        Command::Add(args) => commands::drives::add(&ctx, args),
        Command::Rm { remote } => commands::drives::remove(&ctx, &remote),
        Command::Rename { remote, name } => commands::drives::rename(&ctx, &remote, &name),
        Command::Move { remote, target } => commands::drives::move_to(&ctx, &remote, &target),
        Command::Enable { remote } => commands::drives::set_enabled(&ctx, &remote, true),
        Command::Disable { remote } => commands::drives::set_enabled(&ctx, &remote, false),
        Command::Config(cmd) => commands::config::run(&ctx, cmd),
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "driveglance", &mut io::stdout());
            Ok(())
        }
    }
}
