use clap::{Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

#[derive(Parser)]
#[command(name = "driveglance")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "At-a-glance storage usage for your rclone cloud drives", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Use this config file instead of the default location
    #[arg(long, global = true, env = "DRIVEGLANCE_CONFIG", value_name = "PATH")]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Live dashboard that refreshes on a timer (default)
    Watch,

    /// Fetch every drive once and print the cards
    Status(StatusArgs),

    /// List remotes configured in rclone
    Remotes,

    /// Start monitoring one or more remotes
    Add(AddArgs),

    /// Stop monitoring a remote
    #[command(visible_alias = "remove")]
    Rm {
        /// Remote name (with or without trailing ':')
        remote: String,
    },

    /// Change the name shown on a drive's card
    Rename {
        remote: String,
        /// New display name
        name: String,
    },

    /// Move a drive onto another drive's position
    Move {
        /// Drive to move
        remote: String,
        /// Drive whose position it takes
        target: String,
    },

    /// Resume monitoring a disabled drive
    Enable { remote: String },

    /// Keep a drive configured but stop fetching it
    Disable { remote: String },

    /// Show or change settings
    #[command(subcommand)]
    Config(ConfigCommand),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Parser)]
pub struct StatusArgs {
    /// Print statuses as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser)]
pub struct AddArgs {
    /// Remote names as listed by `driveglance remotes`
    #[arg(required = true)]
    pub remotes: Vec<String>,

    /// Display name (only with a single remote)
    #[arg(short, long)]
    pub name: Option<String>,

    /// Add without checking that rclone can reach the remote
    #[arg(long)]
    pub no_verify: bool,
}

// ============================================================================
// Config Commands
// ============================================================================

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show the current settings
    Show,

    /// Print the config file path
    Path,

    /// Set the auto-refresh interval in seconds
    SetInterval { secs: u64 },

    /// Turn the timer refresh on or off
    AutoRefresh {
        #[arg(value_enum)]
        state: Toggle,
    },

    /// Keep the dashboard window above others
    StayOnTop {
        #[arg(value_enum)]
        state: Toggle,
    },
}

#[derive(Clone, Copy, ValueEnum)]
pub enum Toggle {
    On,
    Off,
}

impl Toggle {
    pub fn enabled(self) -> bool {
        matches!(self, Toggle::On)
    }
}
