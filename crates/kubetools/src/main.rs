//! kubetools CLI
//!
//! Installs pinned versions of Kubernetes and GitOps command-line tools into
//! a versioned cache and publishes their directories for later CI steps.

// CLI binary needs to output to stdout/stderr - this is intentional
#![allow(clippy::print_stdout, clippy::print_stderr)]

mod cli;
mod commands;
mod tracing;

use crate::cli::{Commands, parse};
use crate::tracing::{TracingConfig, init_tracing};

#[tokio::main]
async fn main() {
    // Tracing may not be usable during a panic, so print directly
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("Application panicked: {panic_info}");
        eprintln!("Internal error occurred. Run with RUST_LOG=debug for more information.");
    }));

    if let Err(error) = run().await {
        eprintln!("{error:?}");
        std::process::exit(1);
    }
}

async fn run() -> miette::Result<()> {
    let cli = parse();

    init_tracing(TracingConfig {
        format: cli.log_format,
        level: cli.log_level.into(),
        ..TracingConfig::default()
    })?;

    match cli.into_command() {
        Commands::Install(args) => commands::install(args).await?,
        Commands::List(args) => commands::list(&args)?,
    }

    Ok(())
}
