use crate::tracing::{LogLevel, TracingFormat};
use clap::{Args, Parser, Subcommand};
use kubetools_core::config::StaleBinaryPolicy;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "kubetools")]
#[command(about = "Install pinned Kubernetes and GitOps CLI tools into a cached search path")]
#[command(long_about = None)]
#[command(version)]
#[command(args_conflicts_with_subcommands = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    // `install` arguments when no subcommand is given
    #[command(flatten)]
    pub install: InstallArgs,

    #[arg(
        long,
        global = true,
        help = "Set logging level",
        default_value = "info",
        value_enum
    )]
    pub log_level: LogLevel,

    #[arg(
        long,
        global = true,
        help = "Log output format",
        default_value = "compact",
        value_enum
    )]
    pub log_format: TracingFormat,
}

impl Cli {
    /// The command to run; `install` when none is given.
    pub fn into_command(self) -> Commands {
        self.command.unwrap_or(Commands::Install(self.install))
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(about = "Install the requested tools and publish their directories")]
    Install(InstallArgs),
    #[command(about = "List cached tool versions")]
    List(ListArgs),
}

#[derive(Args, Debug, Clone, Default)]
pub struct InstallArgs {
    #[arg(long, help = "Configuration file (default: ./kubetools.toml if present)")]
    pub config: Option<PathBuf>,

    #[arg(
        long = "tool",
        value_name = "NAME=VERSION",
        help = "Request a tool version; repeatable, overrides config and INPUT_* variables"
    )]
    pub tools: Vec<String>,

    #[arg(long, help = "Cache root directory")]
    pub cache_dir: Option<PathBuf>,

    #[arg(long, help = "Home directory used by self-installing tools")]
    pub home_dir: Option<PathBuf>,

    #[arg(long, help = "Command prefixed to privileged installs; empty disables")]
    pub elevate_with: Option<String>,

    #[arg(long, help = "What to do with binaries reporting another version (shadow, replace)")]
    pub stale_binary: Option<StaleBinaryPolicy>,

    #[arg(long, help = "Skip running each tool's version command after install")]
    pub skip_verify: bool,

    #[arg(long, help = "Print the resulting search path on stdout")]
    pub print_path: bool,

    #[arg(
        long,
        env = "GITHUB_PATH",
        hide_env_values = true,
        help = "File that search path entries are appended to"
    )]
    pub github_path: Option<PathBuf>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ListArgs {
    #[arg(long, help = "Configuration file (default: ./kubetools.toml if present)")]
    pub config: Option<PathBuf>,

    #[arg(long, help = "Cache root directory")]
    pub cache_dir: Option<PathBuf>,
}

pub fn parse() -> Cli {
    Cli::parse()
}
