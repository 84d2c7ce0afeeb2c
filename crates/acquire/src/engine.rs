//! The acquisition engine.
//!
//! One algorithm handles every tool; the per-tool differences come in
//! through the request's [`ArtifactKind`], [`InstallPolicy`] and
//! [`VersionCheck`].
//!
//! ```text
//! Pending -> CacheCheck -> Satisfied
//!                       -> Miss -> Download -> Unpack? -> Permission -> Policy -> Register -> Satisfied
//! ```

use kubetools_core::cache::ToolCache;
use kubetools_core::config::{Config, StaleBinaryPolicy};
use kubetools_core::tools::{
    ArtifactKind, InstallPolicy, SearchPath, ToolRequest, ToolResult, VersionCheck,
};
use kubetools_core::{Error, Result};
use reqwest::Client;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};

use crate::commands::{
    elevated_install, make_executable, probe_version, reports_version, self_install,
};
use crate::download::download;
use crate::extract::{locate_binary, unpack_tar_gz};

/// Settings that shape how tools are installed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOptions {
    /// Home directory that self-installing tools write into.
    pub home_dir: PathBuf,
    /// Command prefixed to privileged install steps (e.g. "sudo").
    pub elevate_with: Option<String>,
    /// Stale binary handling for probed tools.
    pub stale_binary: StaleBinaryPolicy,
}

impl EngineOptions {
    /// Options with no elevation and the default stale binary policy.
    #[must_use]
    pub fn new(home_dir: impl Into<PathBuf>) -> Self {
        Self {
            home_dir: home_dir.into(),
            elevate_with: None,
            stale_binary: StaleBinaryPolicy::default(),
        }
    }

    /// Set the elevation command.
    #[must_use]
    pub fn with_elevate_with(mut self, elevate_with: Option<String>) -> Self {
        self.elevate_with = elevate_with;
        self
    }

    /// Set the stale binary policy.
    #[must_use]
    pub fn with_stale_binary(mut self, policy: StaleBinaryPolicy) -> Self {
        self.stale_binary = policy;
        self
    }

    /// Options taken from a configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined.
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(config.home_dir()?)
            .with_elevate_with(config.elevate_with())
            .with_stale_binary(config.settings.stale_binary))
    }
}

/// Everything acquired during one run.
#[derive(Debug, Clone, Default)]
pub struct Provisioned {
    /// One result per non-skipped request, in request order.
    pub results: Vec<ToolResult>,
    /// Search path with every result's directory added.
    pub search_path: SearchPath,
}

/// Outcome of the presence check.
enum Presence {
    /// The requested version is available in this directory.
    Satisfied(PathBuf),
    /// Nothing usable was found.
    Missing,
    /// A binary reporting another version was found at this path.
    Stale(PathBuf),
}

/// Resolves tool requests into installed, cached tools.
pub struct Engine {
    cache: ToolCache,
    client: Client,
    options: EngineOptions,
}

impl Engine {
    /// Create an engine with a default HTTP client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be initialized.
    pub fn new(cache: ToolCache, options: EngineOptions) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("kubetools/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::configuration(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self::with_client(cache, options, client))
    }

    /// Create an engine with a caller-supplied HTTP client.
    #[must_use]
    pub fn with_client(cache: ToolCache, options: EngineOptions, client: Client) -> Self {
        Self {
            cache,
            client,
            options,
        }
    }

    /// The cache index this engine registers into.
    #[must_use]
    pub fn cache(&self) -> &ToolCache {
        &self.cache
    }

    /// The engine's options.
    #[must_use]
    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Acquire every request in order, stopping at the first failure.
    ///
    /// # Errors
    ///
    /// Returns the first acquisition error; it names the failing tool.
    pub async fn acquire_all(
        &self,
        requests: &[ToolRequest],
        mut search_path: SearchPath,
    ) -> Result<Provisioned> {
        let mut results = Vec::new();

        for request in requests {
            let Some(result) = self.acquire(request, &search_path).await? else {
                continue;
            };
            if !search_path.dirs().contains(&result.resolved_path) {
                search_path.add(&result.resolved_path);
            }
            results.push(result);
        }

        info!(
            acquired = results.len(),
            cached = results.iter().filter(|r| r.from_cache).count(),
            "Provisioning complete"
        );
        Ok(Provisioned {
            results,
            search_path,
        })
    }

    /// Acquire one tool.
    ///
    /// Returns `Ok(None)` when the request has no version. `search_path` is
    /// consulted by version probes and never modified; the caller adds the
    /// result's directory to it.
    ///
    /// # Errors
    ///
    /// Returns a download, unpack, permission, install or version check error.
    #[instrument(skip_all, fields(tool = %request.name, version = request.version()))]
    pub async fn acquire(
        &self,
        request: &ToolRequest,
        search_path: &SearchPath,
    ) -> Result<Option<ToolResult>> {
        self.acquire_one(request, search_path)
            .await
            .map_err(|e| e.for_tool(&request.name))
    }

    async fn acquire_one(
        &self,
        request: &ToolRequest,
        search_path: &SearchPath,
    ) -> Result<Option<ToolResult>> {
        if request.is_skipped() {
            debug!("No version requested, skipping");
            return Ok(None);
        }

        match self.check(request, search_path).await? {
            Presence::Satisfied(dir) => {
                info!(path = ?dir, "Already installed");
                return Ok(Some(Self::result(request, dir, true)));
            }
            Presence::Stale(binary) => self.handle_stale(request, &binary)?,
            Presence::Missing => debug!("Not installed"),
        }

        let dir = self.install(request).await?;

        if let VersionCheck::Probe { args } = &request.version_check {
            self.verify_installed(request, &dir, args).await?;
        }

        info!(path = ?dir, "Installed");
        Ok(Some(Self::result(request, dir, false)))
    }

    fn result(request: &ToolRequest, dir: PathBuf, from_cache: bool) -> ToolResult {
        ToolResult {
            tool_name: request.name.clone(),
            version: request.version().to_string(),
            resolved_path: dir,
            from_cache,
        }
    }

    /// Resolve a cache hit to the directory to put on the search path.
    ///
    /// Self-installing tools live under the home directory, which may not
    /// be the one the cached copy was installed into. The installer kept in
    /// the slot is re-run when the home's bin directory is missing.
    async fn resolve_hit(&self, request: &ToolRequest, slot: PathBuf) -> Result<Presence> {
        let InstallPolicy::SelfInstall { args, bin_dir } = &request.install_policy else {
            return Ok(Presence::Satisfied(slot));
        };

        let bin = self.options.home_dir.join(bin_dir);
        if bin.is_dir() {
            return Ok(Presence::Satisfied(bin));
        }

        let Some(installer) = locate_binary(&slot, &request.binary_path()) else {
            warn!(?slot, "Cached slot has no installer, reinstalling");
            return Ok(Presence::Missing);
        };
        info!(home = ?self.options.home_dir, "Installing cached copy into home");
        self_install(&request.name, &installer, args, &self.options.home_dir).await?;
        ensure_bin_dir(&request.name, &bin)?;
        Ok(Presence::Satisfied(bin))
    }

    async fn check(&self, request: &ToolRequest, search_path: &SearchPath) -> Result<Presence> {
        let version = request.version();

        let args = match &request.version_check {
            VersionCheck::CacheLookup => {
                return match self.cache.lookup(&request.name, version) {
                    Some(slot) => self.resolve_hit(request, slot).await,
                    None => Ok(Presence::Missing),
                };
            }
            VersionCheck::Probe { args } => args,
        };

        let paths = search_path.joined()?;
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("/"));
        let binary = match which::which_in(&request.command, Some(paths), cwd) {
            Ok(binary) => binary,
            Err(e) => {
                debug!(command = %request.command, error = %e, "Binary not on search path");
                return Ok(Presence::Missing);
            }
        };

        match probe_version(&request.name, &binary, args).await {
            Ok(output) if reports_version(&output, version) => {
                let dir = binary
                    .parent()
                    .map_or_else(|| binary.clone(), Path::to_path_buf);
                Ok(Presence::Satisfied(dir))
            }
            Ok(output) => {
                info!(
                    ?binary,
                    reported = output.trim(),
                    "Installed binary reports a different version"
                );
                Ok(Presence::Stale(binary))
            }
            Err(e) => {
                warn!(?binary, error = %e, "Version probe failed, reinstalling");
                Ok(Presence::Missing)
            }
        }
    }

    fn handle_stale(&self, request: &ToolRequest, binary: &Path) -> Result<()> {
        match self.options.stale_binary {
            StaleBinaryPolicy::Shadow => {
                debug!(?binary, "Leaving stale binary; new search path entry shadows it");
            }
            StaleBinaryPolicy::Replace => match self.cache.key_for(binary) {
                Some((name, version)) => {
                    info!(stale = %version, "Removing stale cache slot");
                    self.cache.remove(&name, &version)?;
                }
                None => {
                    warn!(
                        tool = %request.name,
                        ?binary,
                        "Stale binary is outside the cache; leaving it in place"
                    );
                }
            },
        }
        Ok(())
    }

    /// Download, unpack, mark, run the install policy and register.
    ///
    /// Returns the directory to put on the search path.
    async fn install(&self, request: &ToolRequest) -> Result<PathBuf> {
        let name = request.name.as_str();
        let version = request.version();

        let scratch = tempfile::Builder::new()
            .prefix(&format!("kubetools-{name}-"))
            .tempdir()?;
        let url = request.source_url();
        let downloaded = download(&self.client, name, &url, &scratch.path().join("download")).await?;

        let (artifact_root, executable) = match request.artifact_kind {
            ArtifactKind::SingleBinary => {
                let root = scratch.path().join("download");
                (root, downloaded)
            }
            ArtifactKind::TarArchive => {
                let root = scratch.path().join("extract");
                unpack_tar_gz(&downloaded, &root).map_err(|e| Error::unpack(name, e.to_string()))?;
                let relative = request.binary_path();
                let executable = locate_binary(&root, &relative).ok_or_else(|| {
                    Error::unpack(name, format!("'{relative}' not found in archive"))
                })?;
                (root, executable)
            }
        };

        make_executable(&executable)
            .map_err(|e| Error::permission(name, &executable, e.to_string()))?;

        match &request.install_policy {
            InstallPolicy::Standard => {
                self.cache
                    .register_file(&executable, name, &request.command, version)
            }
            InstallPolicy::SelfInstall { args, bin_dir } => {
                self_install(name, &executable, args, &self.options.home_dir).await?;

                let bin = self.options.home_dir.join(bin_dir);
                ensure_bin_dir(name, &bin)?;
                self.cache.register_directory(&artifact_root, name, version)?;
                Ok(bin)
            }
            InstallPolicy::Elevated { mode } => {
                let staged = scratch.path().join("elevated");
                std::fs::create_dir_all(&staged)?;
                let installed = staged.join(&request.command);

                elevated_install(
                    name,
                    self.options.elevate_with.as_deref(),
                    &executable,
                    &installed,
                    *mode,
                )
                .await?;

                self.cache
                    .register_file(&installed, name, &request.command, version)
            }
        }
    }

    /// Probe a freshly installed binary; it must report the requested version.
    async fn verify_installed(&self, request: &ToolRequest, dir: &Path, args: &[String]) -> Result<()> {
        let binary = dir.join(&request.command);
        let output = probe_version(&request.name, &binary, args).await?;
        if reports_version(&output, request.version()) {
            Ok(())
        } else {
            Err(Error::version_check(
                &request.name,
                format!(
                    "installed binary reports '{}', expected {}",
                    output.trim(),
                    request.version()
                ),
            ))
        }
    }
}

fn ensure_bin_dir(tool: &str, bin: &Path) -> Result<()> {
    if bin.is_dir() {
        Ok(())
    } else {
        Err(Error::install(
            tool,
            format!("installer did not create {}", bin.display()),
        ))
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("cache", &self.cache)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
