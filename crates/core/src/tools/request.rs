//! Request and result types exchanged with the acquisition engine.

use std::fmt;
use std::path::PathBuf;

/// How a tool's artifact is distributed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    /// A bare executable served directly at the source URL.
    SingleBinary,
    /// A gzip-compressed tarball containing the executable.
    TarArchive,
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SingleBinary => write!(f, "single-binary"),
            Self::TarArchive => write!(f, "tar-archive"),
        }
    }
}

/// Extra installation step performed between unpacking and registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallPolicy {
    /// Register the executable as-is.
    Standard,
    /// Run the unpacked executable with `args`; its payload lands in
    /// `$HOME/<bin_dir>`, which becomes the search path entry.
    SelfInstall {
        /// Arguments passed to the unpacked installer.
        args: Vec<String>,
        /// Directory relative to the home directory that receives the payload.
        bin_dir: PathBuf,
    },
    /// Copy the executable with `install -m <mode>` under the elevation
    /// command before registering it.
    Elevated {
        /// Mode bits passed to `install -m`.
        mode: u32,
    },
}

/// How the engine decides whether the requested version is already present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionCheck {
    /// Look the `(name, version)` key up in the cache index.
    CacheLookup,
    /// Run the resolvable binary with `args` and look for the version string
    /// in its output.
    Probe {
        /// Arguments that make the binary print its version.
        args: Vec<String>,
    },
}

/// One tool at one version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolRequest {
    /// Canonical tool identifier (e.g., "helm").
    pub name: String,
    /// Requested version. Empty means the tool is skipped.
    pub version: String,
    /// Download URL with `{version}` placeholders.
    pub source_template: String,
    /// How the artifact is packaged.
    pub artifact_kind: ArtifactKind,
    /// Executable path inside the unpacked archive; may contain `{version}`.
    /// Empty for single binaries.
    pub binary_relative_path: String,
    /// File name the executable is registered and invoked under.
    pub command: String,
    /// Extra install step.
    pub install_policy: InstallPolicy,
    /// Presence check strategy.
    pub version_check: VersionCheck,
}

impl ToolRequest {
    /// Request a bare executable downloaded from `source_template`.
    #[must_use]
    pub fn single_binary(
        name: impl Into<String>,
        version: impl Into<String>,
        source_template: impl Into<String>,
    ) -> Self {
        let name = name.into();
        Self {
            command: name.clone(),
            name,
            version: version.into(),
            source_template: source_template.into(),
            artifact_kind: ArtifactKind::SingleBinary,
            binary_relative_path: String::new(),
            install_policy: InstallPolicy::Standard,
            version_check: VersionCheck::CacheLookup,
        }
    }

    /// Request an executable found at `binary_relative_path` inside a tarball.
    #[must_use]
    pub fn tar_archive(
        name: impl Into<String>,
        version: impl Into<String>,
        source_template: impl Into<String>,
        binary_relative_path: impl Into<String>,
    ) -> Self {
        Self {
            artifact_kind: ArtifactKind::TarArchive,
            binary_relative_path: binary_relative_path.into(),
            ..Self::single_binary(name, version, source_template)
        }
    }

    /// Set the command name.
    #[must_use]
    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = command.into();
        self
    }

    /// Set the install policy.
    #[must_use]
    pub fn with_install_policy(mut self, policy: InstallPolicy) -> Self {
        self.install_policy = policy;
        self
    }

    /// Set the version check strategy.
    #[must_use]
    pub fn with_version_check(mut self, check: VersionCheck) -> Self {
        self.version_check = check;
        self
    }

    /// Whether this request is a no-op.
    #[must_use]
    pub fn is_skipped(&self) -> bool {
        self.version.trim().is_empty()
    }

    /// Version with surrounding whitespace removed.
    #[must_use]
    pub fn version(&self) -> &str {
        self.version.trim()
    }

    /// The download URL for the requested version.
    #[must_use]
    pub fn source_url(&self) -> String {
        expand_template(&self.source_template, self.version())
    }

    /// The executable's path inside the unpacked archive.
    #[must_use]
    pub fn binary_path(&self) -> String {
        expand_template(&self.binary_relative_path, self.version())
    }
}

/// Outcome of acquiring one tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolResult {
    /// Canonical tool identifier.
    pub tool_name: String,
    /// Version that was satisfied.
    pub version: String,
    /// Directory to add to the command search path.
    pub resolved_path: PathBuf,
    /// Whether the tool was already present.
    pub from_cache: bool,
}

/// Expand `{version}` placeholders in a template.
#[must_use]
pub fn expand_template(template: &str, version: &str) -> String {
    template.replace("{version}", version)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_template() {
        assert_eq!(
            expand_template(
                "https://example.com/kustomize%2Fv{version}/kustomize_v{version}.tar.gz",
                "5.3.0"
            ),
            "https://example.com/kustomize%2Fv5.3.0/kustomize_v5.3.0.tar.gz"
        );
        assert_eq!(expand_template("static", "1.0"), "static");
    }

    #[test]
    fn test_single_binary_defaults() {
        let request = ToolRequest::single_binary("jq", "1.7.1", "https://x/jq-{version}");
        assert_eq!(request.command, "jq");
        assert_eq!(request.artifact_kind, ArtifactKind::SingleBinary);
        assert!(request.binary_relative_path.is_empty());
        assert_eq!(request.install_policy, InstallPolicy::Standard);
        assert_eq!(request.version_check, VersionCheck::CacheLookup);
        assert_eq!(request.source_url(), "https://x/jq-1.7.1");
    }

    #[test]
    fn test_tar_archive_binary_path_is_templated() {
        let request = ToolRequest::tar_archive(
            "gh",
            "2.40.1",
            "https://x/gh_{version}_linux_amd64.tar.gz",
            "gh_{version}_linux_amd64/bin/gh",
        );
        assert_eq!(request.artifact_kind, ArtifactKind::TarArchive);
        assert_eq!(request.binary_path(), "gh_2.40.1_linux_amd64/bin/gh");
    }

    #[test]
    fn test_empty_and_blank_versions_are_skipped() {
        assert!(ToolRequest::single_binary("jq", "", "u").is_skipped());
        assert!(ToolRequest::single_binary("jq", "  ", "u").is_skipped());
        assert!(!ToolRequest::single_binary("jq", "1.7", "u").is_skipped());
    }

    #[test]
    fn test_version_is_trimmed_for_urls() {
        let request = ToolRequest::single_binary("jq", " 1.7.1\n", "https://x/{version}");
        assert_eq!(request.version(), "1.7.1");
        assert_eq!(request.source_url(), "https://x/1.7.1");
    }

    #[test]
    fn test_builders() {
        let request = ToolRequest::single_binary("argocd", "2.9.3", "u")
            .with_command("argocd")
            .with_install_policy(InstallPolicy::Elevated { mode: 0o555 })
            .with_version_check(VersionCheck::Probe {
                args: vec!["version".into()],
            });
        assert_eq!(request.install_policy, InstallPolicy::Elevated { mode: 0o555 });
        assert!(matches!(request.version_check, VersionCheck::Probe { .. }));
    }

    #[test]
    fn test_artifact_kind_display() {
        assert_eq!(ArtifactKind::SingleBinary.to_string(), "single-binary");
        assert_eq!(ArtifactKind::TarArchive.to_string(), "tar-archive");
    }
}
