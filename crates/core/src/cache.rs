//! On-disk cache index keyed by tool name and version.
//!
//! Registered artifacts survive across runs that share the same cache root.
//! A slot only becomes visible once its completion marker is written, so
//! [`ToolCache::lookup`] never hands out a half-registered directory.

use std::path::{Component, Path, PathBuf};
use tracing::{debug, trace, warn};
use walkdir::WalkDir;

use crate::{Error, Result};

/// Suffix of the marker file written next to a complete slot.
const COMPLETE_SUFFIX: &str = ".complete";

/// Cache index for acquired tools.
///
/// Default location: `~/.cache/kubetools/tools/`
///
/// Structure:
/// ```text
/// <root>/
/// └── helm/
///     ├── 3.14.0/
///     │   └── helm           # registered artifact
///     └── 3.14.0.complete    # written last
/// ```
#[derive(Debug, Clone)]
pub struct ToolCache {
    root: PathBuf,
}

impl Default for ToolCache {
    fn default() -> Self {
        Self::new(default_cache_dir())
    }
}

impl ToolCache {
    /// Create a cache at the specified root directory.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Get the cache root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory of the slot for `(name, version)`.
    #[must_use]
    pub fn slot_dir(&self, name: &str, version: &str) -> PathBuf {
        self.root.join(name).join(version)
    }

    fn marker_path(&self, name: &str, version: &str) -> PathBuf {
        self.root.join(name).join(format!("{version}{COMPLETE_SUFFIX}"))
    }

    /// Find the slot for `(name, version)`.
    ///
    /// Returns `None` for invalid keys, missing slots, and slots whose
    /// registration never completed.
    #[must_use]
    pub fn lookup(&self, name: &str, version: &str) -> Option<PathBuf> {
        if !is_valid_key(name) || !is_valid_key(version) {
            trace!(name, version, "Invalid cache key");
            return None;
        }

        let slot = self.slot_dir(name, version);
        if slot.is_dir() && self.marker_path(name, version).is_file() {
            trace!(name, version, ?slot, "Cache hit");
            Some(slot)
        } else {
            trace!(name, version, "Cache miss");
            None
        }
    }

    /// Register a single file as `target_file_name` inside the slot for
    /// `(name, version)`.
    ///
    /// Returns the slot directory. Registering an existing key replaces the
    /// previous slot. File permissions are preserved.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is invalid or the file cannot be copied.
    pub fn register_file(
        &self,
        source: &Path,
        name: &str,
        target_file_name: &str,
        version: &str,
    ) -> Result<PathBuf> {
        validate_key(name, version)?;
        if !is_valid_key(target_file_name) {
            return Err(Error::configuration(format!(
                "Invalid cache file name '{target_file_name}'"
            )));
        }

        let staging = self.staging_dir(name)?;
        let dest = staging.path().join(target_file_name);
        std::fs::copy(source, &dest).map_err(|e| Error::cache(e, source, "copy"))?;

        let slot = self.commit(staging, name, version)?;
        debug!(name, version, ?slot, "Registered file in cache");
        Ok(slot)
    }

    /// Register a whole directory tree as the slot for `(name, version)`.
    ///
    /// Returns the slot directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is invalid or the tree cannot be copied.
    pub fn register_directory(&self, source_dir: &Path, name: &str, version: &str) -> Result<PathBuf> {
        validate_key(name, version)?;

        let staging = self.staging_dir(name)?;
        copy_tree(source_dir, staging.path())?;

        let slot = self.commit(staging, name, version)?;
        debug!(name, version, ?slot, "Registered directory in cache");
        Ok(slot)
    }

    /// Complete versions of `name`, sorted.
    #[must_use]
    pub fn versions(&self, name: &str) -> Vec<String> {
        if !is_valid_key(name) {
            return Vec::new();
        }
        let Ok(entries) = std::fs::read_dir(self.root.join(name)) else {
            return Vec::new();
        };

        let mut versions: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                let file_name = entry.file_name();
                let version = file_name.to_str()?.strip_suffix(COMPLETE_SUFFIX)?.to_string();
                self.lookup(name, &version).map(|_| version)
            })
            .collect();
        versions.sort();
        versions
    }

    /// Remove the slot for `(name, version)`.
    ///
    /// Returns whether anything was removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is invalid or the slot cannot be deleted.
    pub fn remove(&self, name: &str, version: &str) -> Result<bool> {
        validate_key(name, version)?;

        let marker = self.marker_path(name, version);
        let slot = self.slot_dir(name, version);
        let existed = marker.exists() || slot.exists();

        if marker.exists() {
            std::fs::remove_file(&marker).map_err(|e| Error::cache(e, &marker, "remove"))?;
        }
        if slot.exists() {
            std::fs::remove_dir_all(&slot).map_err(|e| Error::cache(e, &slot, "remove"))?;
        }
        if existed {
            debug!(name, version, "Removed cache slot");
        }
        Ok(existed)
    }

    /// The `(name, version)` key of the slot containing `path`, if any.
    #[must_use]
    pub fn key_for(&self, path: &Path) -> Option<(String, String)> {
        let root = self.root.canonicalize().unwrap_or_else(|_| self.root.clone());
        let path = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        let mut components = path.strip_prefix(&root).ok()?.components();

        let name = components.next()?.as_os_str().to_str()?.to_string();
        let version = components.next()?.as_os_str().to_str()?.to_string();
        self.lookup(&name, &version).map(|_| (name, version))
    }

    /// Create a unique staging directory next to the slots of `name`.
    fn staging_dir(&self, name: &str) -> Result<tempfile::TempDir> {
        let parent = self.root.join(name);
        std::fs::create_dir_all(&parent).map_err(|e| Error::cache(e, &parent, "create"))?;
        tempfile::Builder::new()
            .prefix(".staging-")
            .tempdir_in(&parent)
            .map_err(|e| Error::cache(e, &parent, "create staging"))
    }

    /// Move a staging directory onto the slot and mark it complete.
    fn commit(&self, staging: tempfile::TempDir, name: &str, version: &str) -> Result<PathBuf> {
        let slot = self.slot_dir(name, version);
        let marker = self.marker_path(name, version);

        // Hide the old slot before touching it
        if marker.exists() {
            std::fs::remove_file(&marker).map_err(|e| Error::cache(e, &marker, "remove"))?;
        }
        if slot.exists() {
            warn!(name, version, "Replacing existing cache slot");
            std::fs::remove_dir_all(&slot).map_err(|e| Error::cache(e, &slot, "remove"))?;
        }

        // Staging directories are created 0700
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(staging.path(), std::fs::Permissions::from_mode(0o755))
                .map_err(|e| Error::cache(e, staging.path(), "chmod"))?;
        }

        let staged = staging.keep();
        if let Err(e) = std::fs::rename(&staged, &slot) {
            let _ = std::fs::remove_dir_all(&staged);
            return Err(Error::cache(e, &slot, "rename"));
        }

        std::fs::write(&marker, version).map_err(|e| Error::cache(e, &marker, "mark"))?;
        Ok(slot)
    }
}

/// Get the default cache directory for tools.
#[must_use]
pub fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from(".cache"))
        .join("kubetools")
        .join("tools")
}

/// A key is a single, normal path component.
fn is_valid_key(key: &str) -> bool {
    let mut components = Path::new(key).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    ) && !key.ends_with(COMPLETE_SUFFIX)
        && !key.starts_with(".staging-")
}

fn validate_key(name: &str, version: &str) -> Result<()> {
    if !is_valid_key(name) {
        return Err(Error::configuration(format!("Invalid cache name '{name}'")));
    }
    if !is_valid_key(version) {
        return Err(Error::configuration(format!(
            "Invalid cache version '{version}' for {name}"
        )));
    }
    Ok(())
}

/// Copy a directory tree, preserving permissions and symlinks.
fn copy_tree(source: &Path, dest: &Path) -> Result<()> {
    for entry in WalkDir::new(source).min_depth(1) {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(source).to_path_buf();
            Error::cache(std::io::Error::other(e), path, "walk")
        })?;
        let relative = entry
            .path()
            .strip_prefix(source)
            .map_err(|e| Error::cache(std::io::Error::other(e), entry.path(), "walk"))?;
        let target = dest.join(relative);
        let file_type = entry.file_type();

        if file_type.is_dir() {
            std::fs::create_dir_all(&target).map_err(|e| Error::cache(e, &target, "create"))?;
        } else if file_type.is_symlink() {
            let link = std::fs::read_link(entry.path())
                .map_err(|e| Error::cache(e, entry.path(), "read link"))?;
            #[cfg(unix)]
            std::os::unix::fs::symlink(&link, &target)
                .map_err(|e| Error::cache(e, &target, "symlink"))?;
            #[cfg(not(unix))]
            std::fs::copy(entry.path(), &target).map_err(|e| Error::cache(e, &target, "copy"))?;
            trace!(?target, ?link, "Copied symlink");
        } else {
            std::fs::copy(entry.path(), &target).map_err(|e| Error::cache(e, &target, "copy"))?;
        }
    }
    Ok(())
}
