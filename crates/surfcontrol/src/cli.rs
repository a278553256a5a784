//! Clap derive structures for the `surfcontrol` CLI.
//!
//! Defines the complete command tree, global flags, and shared types.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// surfcontrol -- deploy and observe a managed mobile core
#[derive(Debug, Parser)]
#[command(
    name = "surfcontrol",
    version,
    about = "Deploy and observe a managed 4G/5G mobile core",
    long_about = "Turns a declarative network intent into configuration for every core\n\
        function, restarts them in dependency order with automatic rollback,\n\
        and reports radios, devices and component health from the core's logs.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Configuration file
    #[arg(long, env = "SURFCONTROL_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "SURFCONTROL_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the daemon: recover, then observe until interrupted
    Run,

    /// Check an intent document without touching the host
    #[command(alias = "check")]
    Validate(IntentArgs),

    /// Generate component configuration for an intent
    Render(RenderArgs),

    /// Deploy an intent: back up, write, restart, roll back on failure
    Deploy(IntentArgs),

    /// Show core health, connected radios or attached devices
    #[command(alias = "st")]
    Status(StatusArgs),

    /// List, restore and prune configuration backups
    #[command(alias = "bk")]
    Backups(BackupsArgs),

    /// Inspect or create the configuration file
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Intent commands ──────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct IntentArgs {
    /// Intent document (YAML or JSON)
    pub intent: PathBuf,
}

#[derive(Debug, Args)]
pub struct RenderArgs {
    /// Intent document (YAML or JSON)
    pub intent: PathBuf,

    /// Write one file per component into this directory instead of stdout
    #[arg(long)]
    pub out: Option<PathBuf>,
}

// ── Status ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct StatusArgs {
    #[command(subcommand)]
    pub view: Option<StatusView>,
}

#[derive(Debug, Clone, Copy, Subcommand)]
pub enum StatusView {
    /// Per-component health
    Health,
    /// Connected radios
    Radios,
    /// Attached devices
    #[command(alias = "ues")]
    Devices,
}

// ── Backups ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct BackupsArgs {
    #[command(subcommand)]
    pub command: BackupsCommand,
}

#[derive(Debug, Subcommand)]
pub enum BackupsCommand {
    /// List stored backups, newest first
    #[command(alias = "ls")]
    List,

    /// Restore the artifact directory from a backup
    Restore {
        /// Backup id, as shown by `backups list`
        id: String,
    },

    /// Delete all but the newest backups
    Prune {
        /// Backups to keep (defaults to deploy.backup_retention)
        #[arg(long)]
        keep: Option<usize>,
    },
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the effective configuration
    Show,

    /// Print the config file location
    Path,

    /// Write a config file with default values
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
