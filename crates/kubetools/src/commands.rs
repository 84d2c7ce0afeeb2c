//! `install` and `list` command implementations.

use crate::cli::{InstallArgs, ListArgs};
use kubetools_acquire::{Engine, EngineOptions, run_capture_with_home};
use kubetools_core::cache::ToolCache;
use kubetools_core::config::Config;
use kubetools_core::tools::{SearchPath, ToolResult, catalog};
use kubetools_core::{Error, Result};
use std::ffi::OsStr;
use std::fmt::Write as _;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};

/// Load the configuration file, then overlay `INPUT_*` variables and flags.
pub fn load_config(args: &InstallArgs) -> Result<Config> {
    let cwd = std::env::current_dir()?;
    let mut config = Config::discover(args.config.as_deref(), &cwd)?;
    config.apply_env();
    apply_overrides(&mut config, args)?;
    Ok(config)
}

fn apply_overrides(config: &mut Config, args: &InstallArgs) -> Result<()> {
    for spec in &args.tools {
        config.set_tool(spec)?;
    }
    if let Some(dir) = &args.cache_dir {
        config.settings.cache_dir = Some(dir.clone());
    }
    if let Some(dir) = &args.home_dir {
        config.settings.home_dir = Some(dir.clone());
    }
    if let Some(command) = &args.elevate_with {
        config.settings.elevate_with = Some(command.clone());
    }
    if let Some(policy) = args.stale_binary {
        config.settings.stale_binary = policy;
    }
    Ok(())
}

/// Acquire every configured tool, publish the search path and verify.
#[instrument(skip_all)]
pub async fn install(args: InstallArgs) -> Result<()> {
    let config = load_config(&args)?;
    let requests = config.requests();
    if requests.iter().all(|r| r.is_skipped()) {
        info!("No tool versions requested");
        return Ok(());
    }

    let cache = ToolCache::new(config.cache_dir());
    debug!(cache = ?cache.root(), "Using tool cache");
    let engine = Engine::new(cache, EngineOptions::from_config(&config)?)?;

    let provisioned = engine.acquire_all(&requests, SearchPath::from_env()).await?;
    let search_path = provisioned.search_path;

    if let Some(file) = &args.github_path {
        append_github_path(file, search_path.entries())?;
        debug!(?file, entries = search_path.entries().len(), "Published search path");
    }

    let joined = search_path.joined()?;
    if args.print_path {
        println!("{}", joined.to_string_lossy());
    }

    if args.skip_verify {
        return Ok(());
    }
    let report = verify(&provisioned.results, &joined, &engine.options().home_dir).await?;
    info!("All tools installed successfully:\n{report}");
    Ok(())
}

/// Append search path entries to a `$GITHUB_PATH` style file.
///
/// The runner prepends each line to `PATH`, so entries are written in
/// reverse to keep the most recent one in front.
fn append_github_path(file: &Path, entries: &[PathBuf]) -> Result<()> {
    let mut out = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(file)
        .map_err(|e| Error::cache(e, file, "open"))?;
    for entry in entries.iter().rev() {
        writeln!(out, "{}", entry.display()).map_err(|e| Error::cache(e, file, "append"))?;
    }
    Ok(())
}

/// Run each tool's version command with `path` as `PATH`.
///
/// Self-installing tools are verified with `HOME` set to `home`, where
/// they were installed.
async fn verify(results: &[ToolResult], path: &OsStr, home: &Path) -> Result<String> {
    let mut report = String::new();
    for result in results {
        let Some(descriptor) = catalog::find(&result.tool_name) else {
            continue;
        };
        let Some((program, args)) = descriptor.verify.split_first() else {
            continue;
        };
        let home = descriptor.self_install.is_some().then_some(home);
        let output = run_capture_with_home(program, args, Some(path), home)
            .await
            .map_err(|message| Error::version_check(&result.tool_name, message))?;
        let _ = writeln!(report, "{}", output.trim_end());
    }
    Ok(report)
}

/// Print cached versions of every catalog tool.
pub fn list(args: &ListArgs) -> Result<()> {
    let cwd = std::env::current_dir()?;
    let mut config = Config::discover(args.config.as_deref(), &cwd)?;
    if let Some(dir) = &args.cache_dir {
        config.settings.cache_dir = Some(dir.clone());
    }
    let cache = ToolCache::new(config.cache_dir());

    for line in cached_versions(&cache) {
        println!("{line}");
    }
    Ok(())
}

fn cached_versions(cache: &ToolCache) -> Vec<String> {
    catalog::names()
        .filter_map(|name| {
            let versions = cache.versions(name);
            (!versions.is_empty()).then(|| format!("{name}: {}", versions.join(", ")))
        })
        .collect()
}
