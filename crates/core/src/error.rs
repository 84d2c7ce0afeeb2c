//! Error types for kubetools operations.

use miette::Diagnostic;
use std::path::Path;
use thiserror::Error;

/// Error type for tool acquisition, caching and configuration.
///
/// Every variant that concerns a single tool carries the tool name so the
/// run-level report can say which tool failed and why.
#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    /// The artifact could not be downloaded.
    #[error("Failed to download {tool} from {url}: {message}")]
    #[diagnostic(
        code(kubetools::acquire::download),
        help("Check that the requested version exists and the host is reachable")
    )]
    Download {
        /// Tool being acquired.
        tool: String,
        /// Expanded source URL.
        url: String,
        /// Transport error or HTTP status.
        message: String,
    },

    /// The downloaded archive was corrupt or had an unexpected layout.
    #[error("Failed to unpack {tool}: {message}")]
    #[diagnostic(code(kubetools::acquire::unpack))]
    Unpack {
        /// Tool being acquired.
        tool: String,
        /// What went wrong.
        message: String,
    },

    /// A file could not be made executable, or the elevated install failed.
    #[error("Permission error for {tool} at {}: {message}", path.display())]
    #[diagnostic(
        code(kubetools::acquire::permission),
        help("Check filesystem permissions and that the elevation command is available")
    )]
    Permission {
        /// Tool being acquired.
        tool: String,
        /// File whose mode could not be set.
        path: Box<Path>,
        /// What went wrong.
        message: String,
    },

    /// Probing or reporting an installed binary's version failed.
    #[error("Version check failed for {tool}: {message}")]
    #[diagnostic(code(kubetools::acquire::version_check))]
    VersionCheck {
        /// Tool being checked.
        tool: String,
        /// What went wrong.
        message: String,
    },

    /// A self-installing tool's install step failed.
    #[error("Install step failed for {tool}: {message}")]
    #[diagnostic(code(kubetools::acquire::install))]
    Install {
        /// Tool being acquired.
        tool: String,
        /// What went wrong.
        message: String,
    },

    /// Cache registration failed.
    #[error("Cache {operation} failed: {}", path.display())]
    #[diagnostic(
        code(kubetools::cache::io),
        help("Check that the cache directory is writable")
    )]
    Cache {
        /// Operation that failed (e.g., "copy", "rename", "mark").
        operation: String,
        /// Path that caused the error.
        path: Box<Path>,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// An error without tool context raised while acquiring a tool.
    #[error("Failed to acquire {tool}: {source}")]
    #[diagnostic(code(kubetools::acquire))]
    Acquire {
        /// Tool being acquired.
        tool: String,
        /// The underlying error.
        #[source]
        source: Box<Error>,
    },

    /// Invalid configuration.
    #[error("Configuration error: {message}")]
    #[diagnostic(code(kubetools::config))]
    Configuration {
        /// What is wrong with the configuration.
        message: String,
    },

    /// IO error.
    #[error("IO error: {0}")]
    #[diagnostic(code(kubetools::io))]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a download error.
    #[must_use]
    pub fn download(
        tool: impl Into<String>,
        url: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Download {
            tool: tool.into(),
            url: url.into(),
            message: message.into(),
        }
    }

    /// Create an unpack error.
    #[must_use]
    pub fn unpack(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Unpack {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Create a permission error.
    #[must_use]
    pub fn permission(
        tool: impl Into<String>,
        path: impl AsRef<Path>,
        message: impl Into<String>,
    ) -> Self {
        Self::Permission {
            tool: tool.into(),
            path: path.as_ref().into(),
            message: message.into(),
        }
    }

    /// Create a version check error.
    #[must_use]
    pub fn version_check(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::VersionCheck {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Create an install step error.
    #[must_use]
    pub fn install(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Install {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Create a cache I/O error with path context.
    #[must_use]
    pub fn cache(
        source: std::io::Error,
        path: impl AsRef<Path>,
        operation: impl Into<String>,
    ) -> Self {
        Self::Cache {
            operation: operation.into(),
            path: path.as_ref().into(),
            source,
        }
    }

    /// Create a configuration error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Attach `tool` to an error that does not already name a tool.
    #[must_use]
    pub fn for_tool(self, tool: impl Into<String>) -> Self {
        if self.tool().is_some() {
            self
        } else {
            Self::Acquire {
                tool: tool.into(),
                source: Box::new(self),
            }
        }
    }

    /// Name of the tool this error concerns, if any.
    #[must_use]
    pub fn tool(&self) -> Option<&str> {
        match self {
            Self::Download { tool, .. }
            | Self::Unpack { tool, .. }
            | Self::Permission { tool, .. }
            | Self::VersionCheck { tool, .. }
            | Self::Install { tool, .. }
            | Self::Acquire { tool, .. } => Some(tool),
            Self::Cache { .. } | Self::Configuration { .. } | Self::Io(_) => None,
        }
    }
}

/// Result type for kubetools operations.
pub type Result<T> = std::result::Result<T, Error>;
