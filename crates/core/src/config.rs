//! Configuration: which tools to provision and how.
//!
//! Values are layered, lowest precedence first:
//!
//! 1. a TOML file (`kubetools.toml`)
//! 2. `INPUT_<TOOL>` environment variables (the GitHub Actions input convention)
//! 3. explicit `name=version` overrides from the command line
//!
//! ```toml
//! [tools]
//! kubectl = "1.29.0"
//! helm = "3.14.0"
//!
//! [settings]
//! cache_dir = "/opt/tool-cache"
//! elevate_with = "sudo"
//! stale_binary = "shadow"
//! ```

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

use crate::cache::default_cache_dir;
use crate::tools::{ToolRequest, catalog};
use crate::{Error, Result};

/// Default configuration file name.
pub const CONFIG_FILE_NAME: &str = "kubetools.toml";

/// Environment variable naming a shared tool cache (set on GitHub runners).
pub const RUNNER_TOOL_CACHE: &str = "RUNNER_TOOL_CACHE";

/// Elevation command used when none is configured.
pub const DEFAULT_ELEVATE_WITH: &str = "sudo";

/// What to do with an outdated binary found by a version probe.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StaleBinaryPolicy {
    /// Leave the old binary in place; the new search path entry shadows it.
    #[default]
    Shadow,
    /// Remove the old binary's cache slot before reinstalling. Binaries
    /// outside the cache root are never removed.
    Replace,
}

impl FromStr for StaleBinaryPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "shadow" => Ok(Self::Shadow),
            "replace" => Ok(Self::Replace),
            _ => Err(Error::configuration(format!(
                "Unknown stale binary policy '{s}' (expected 'shadow' or 'replace')"
            ))),
        }
    }
}

impl std::fmt::Display for StaleBinaryPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Shadow => write!(f, "shadow"),
            Self::Replace => write!(f, "replace"),
        }
    }
}

/// Engine settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Cache root directory.
    pub cache_dir: Option<PathBuf>,
    /// Home directory that self-installing tools write into.
    pub home_dir: Option<PathBuf>,
    /// Command prefixed to privileged install steps. Empty disables elevation.
    pub elevate_with: Option<String>,
    /// Stale binary handling for probed tools.
    pub stale_binary: StaleBinaryPolicy,
}

/// Full kubetools configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Requested version per tool name. Empty versions mean "skip".
    pub tools: BTreeMap<String, String>,
    /// Engine settings.
    pub settings: Settings,
}

impl Config {
    /// Parse configuration from TOML.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is malformed or names an unknown tool.
    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| Error::configuration(format!("Invalid configuration: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        debug!(?path, "Loading configuration");
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::configuration(format!("Failed to read {}: {e}", path.display()))
        })?;
        Self::parse(&content)
    }

    /// Load `path` if given, else `kubetools.toml` in `dir` if it exists,
    /// else the default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if an explicit or discovered file cannot be loaded.
    pub fn discover(path: Option<&Path>, dir: &Path) -> Result<Self> {
        if let Some(path) = path {
            return Self::load(path);
        }
        let candidate = dir.join(CONFIG_FILE_NAME);
        if candidate.is_file() {
            Self::load(&candidate)
        } else {
            Ok(Self::default())
        }
    }

    /// Overlay `INPUT_<TOOL>` variables from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_with(|key| std::env::var(key).ok());
    }

    /// Overlay `INPUT_<TOOL>` variables read through `lookup`.
    ///
    /// Empty or unset variables leave the file value untouched.
    pub fn apply_env_with(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        for descriptor in catalog::CATALOG {
            let Some(version) = lookup(&descriptor.input_var()) else {
                continue;
            };
            let version = version.trim();
            if !version.is_empty() {
                debug!(tool = descriptor.name, version, "Version from environment");
                self.tools
                    .insert(descriptor.name.to_string(), version.to_string());
            }
        }
    }

    /// Apply a `name=version` override.
    ///
    /// # Errors
    ///
    /// Returns an error if the override is malformed or names an unknown tool.
    pub fn set_tool(&mut self, spec: &str) -> Result<()> {
        let (name, version) = spec.split_once('=').ok_or_else(|| {
            Error::configuration(format!("Expected NAME=VERSION, got '{spec}'"))
        })?;
        let name = name.trim();
        if catalog::find(name).is_none() {
            return Err(unknown_tool(name));
        }
        self.tools
            .insert(name.to_string(), version.trim().to_string());
        Ok(())
    }

    /// Check that every configured tool is in the catalog.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first unknown tool.
    pub fn validate(&self) -> Result<()> {
        match self.tools.keys().find(|name| catalog::find(name).is_none()) {
            Some(name) => Err(unknown_tool(name)),
            None => Ok(()),
        }
    }

    /// One request per configured tool, in catalog order.
    ///
    /// Tools configured with an empty version are included; the engine
    /// skips them.
    #[must_use]
    pub fn requests(&self) -> Vec<ToolRequest> {
        catalog::CATALOG
            .iter()
            .filter_map(|d| self.tools.get(d.name).map(|v| d.request(v)))
            .collect()
    }

    /// Cache root: the configured directory, else `$RUNNER_TOOL_CACHE/kubetools`,
    /// else the user cache directory.
    #[must_use]
    pub fn cache_dir(&self) -> PathBuf {
        self.cache_dir_with(|key| std::env::var_os(key).map(PathBuf::from))
    }

    fn cache_dir_with(&self, lookup: impl Fn(&str) -> Option<PathBuf>) -> PathBuf {
        if let Some(dir) = &self.settings.cache_dir {
            return dir.clone();
        }
        lookup(RUNNER_TOOL_CACHE)
            .filter(|dir| !dir.as_os_str().is_empty())
            .map_or_else(default_cache_dir, |dir| dir.join("kubetools"))
    }

    /// Home directory for self-installing tools.
    ///
    /// # Errors
    ///
    /// Returns an error if none is configured and the user's home cannot be
    /// determined.
    pub fn home_dir(&self) -> Result<PathBuf> {
        self.settings
            .home_dir
            .clone()
            .or_else(dirs::home_dir)
            .ok_or_else(|| Error::configuration("Cannot determine the home directory"))
    }

    /// Elevation command, or `None` when elevation is disabled.
    #[must_use]
    pub fn elevate_with(&self) -> Option<String> {
        match self.settings.elevate_with.as_deref().map(str::trim) {
            None => Some(DEFAULT_ELEVATE_WITH.to_string()),
            Some("") => None,
            Some(command) => Some(command.to_string()),
        }
    }
}

fn unknown_tool(name: &str) -> Error {
    let known: Vec<_> = catalog::names().collect();
    Error::configuration(format!(
        "Unknown tool '{name}'. Supported tools: {}",
        known.join(", ")
    ))
}
