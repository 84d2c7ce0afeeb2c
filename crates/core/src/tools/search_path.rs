//! Command search path accumulated during a run.

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

use crate::{Error, Result};

/// Directories added to the command search path, plus the inherited `PATH`.
///
/// The engine never touches the process environment. It hands this value
/// around and the outermost caller decides how to publish it (e.g. to
/// `$GITHUB_PATH` or to a child process's `PATH`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchPath {
    /// Added directories, highest precedence first.
    entries: Vec<PathBuf>,
    /// Inherited `PATH` value, consulted after `entries`.
    base: Option<OsString>,
}

impl SearchPath {
    /// Create a search path on top of `base`.
    #[must_use]
    pub fn new(base: Option<OsString>) -> Self {
        Self {
            entries: Vec::new(),
            base,
        }
    }

    /// Create a search path on top of the current process `PATH`.
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(std::env::var_os("PATH"))
    }

    /// Add a directory with the highest precedence.
    ///
    /// Adding a directory that is already present moves it to the front.
    pub fn add(&mut self, dir: impl Into<PathBuf>) {
        let dir = dir.into();
        self.entries.retain(|existing| existing != &dir);
        self.entries.insert(0, dir);
    }

    /// Directories added so far, highest precedence first.
    #[must_use]
    pub fn entries(&self) -> &[PathBuf] {
        &self.entries
    }

    /// Inherited `PATH` value.
    #[must_use]
    pub fn base(&self) -> Option<&OsStr> {
        self.base.as_deref()
    }

    /// Every directory to search, in order.
    #[must_use]
    pub fn dirs(&self) -> Vec<PathBuf> {
        let mut dirs = self.entries.clone();
        if let Some(base) = &self.base {
            dirs.extend(std::env::split_paths(base));
        }
        dirs
    }

    /// Whether `dir` was added during this run.
    #[must_use]
    pub fn contains(&self, dir: &Path) -> bool {
        self.entries.iter().any(|entry| entry == dir)
    }

    /// Join every directory into a `PATH` value.
    ///
    /// # Errors
    ///
    /// Returns an error if a directory contains the path separator.
    pub fn joined(&self) -> Result<OsString> {
        std::env::join_paths(self.dirs())
            .map_err(|e| Error::configuration(format!("Invalid search path entry: {e}")))
    }
}
