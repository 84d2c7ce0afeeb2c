//! Descriptors for every tool kubetools can provision.
//!
//! Each entry fixes the download URL, packaging and install policy for one
//! tool on linux amd64. [`ToolDescriptor::request`] turns an entry and a
//! version into a [`ToolRequest`].

use std::path::PathBuf;

use super::request::{ArtifactKind, InstallPolicy, ToolRequest, VersionCheck};

/// Static description of a supported tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolDescriptor {
    /// Canonical tool identifier.
    pub name: &'static str,
    /// Command the executable is registered and invoked under.
    pub command: &'static str,
    /// Download URL template.
    pub source: &'static str,
    /// Packaging.
    pub artifact_kind: ArtifactKind,
    /// Executable path inside the archive (empty for single binaries).
    pub binary: &'static str,
    /// Self-install arguments and home-relative payload directory.
    pub self_install: Option<(&'static [&'static str], &'static str)>,
    /// Mode for the elevated `install` step.
    pub elevated_mode: Option<u32>,
    /// Arguments for probing the installed version instead of trusting the cache.
    pub probe: Option<&'static [&'static str]>,
    /// Program and arguments that print the installed version.
    pub verify: &'static [&'static str],
}

impl ToolDescriptor {
    const fn single(name: &'static str, source: &'static str) -> Self {
        Self {
            name,
            command: name,
            source,
            artifact_kind: ArtifactKind::SingleBinary,
            binary: "",
            self_install: None,
            elevated_mode: None,
            probe: None,
            verify: &[],
        }
    }

    const fn archive(name: &'static str, source: &'static str, binary: &'static str) -> Self {
        Self {
            artifact_kind: ArtifactKind::TarArchive,
            binary,
            ..Self::single(name, source)
        }
    }

    const fn verify(mut self, verify: &'static [&'static str]) -> Self {
        self.verify = verify;
        self
    }

    /// Build the request for `version`.
    #[must_use]
    pub fn request(&self, version: &str) -> ToolRequest {
        let install_policy = match (self.self_install, self.elevated_mode) {
            (Some((args, bin_dir)), _) => InstallPolicy::SelfInstall {
                args: args.iter().map(|a| (*a).to_string()).collect(),
                bin_dir: PathBuf::from(bin_dir),
            },
            (None, Some(mode)) => InstallPolicy::Elevated { mode },
            (None, None) => InstallPolicy::Standard,
        };
        let version_check = self.probe.map_or(VersionCheck::CacheLookup, |args| {
            VersionCheck::Probe {
                args: args.iter().map(|a| (*a).to_string()).collect(),
            }
        });

        ToolRequest {
            name: self.name.to_string(),
            version: version.to_string(),
            source_template: self.source.to_string(),
            artifact_kind: self.artifact_kind,
            binary_relative_path: self.binary.to_string(),
            command: self.command.to_string(),
            install_policy,
            version_check,
        }
    }

    /// Name of the environment variable carrying this tool's requested version.
    #[must_use]
    pub fn input_var(&self) -> String {
        format!("INPUT_{}", self.name.to_uppercase())
    }
}

const KREW_INSTALL: &[&str] = &["install", "krew"];
const YQ_PROBE: &[&str] = &["--version"];

/// Supported tools, in installation order.
pub const CATALOG: &[ToolDescriptor] = &[
    ToolDescriptor::single(
        "kubectl",
        "https://dl.k8s.io/release/v{version}/bin/linux/amd64/kubectl",
    )
    .verify(&["kubectl", "version", "--client"]),
    ToolDescriptor::archive(
        "docker",
        "https://download.docker.com/linux/static/stable/x86_64/docker-{version}.tgz",
        "docker/docker",
    )
    .verify(&["docker", "--version"]),
    ToolDescriptor {
        self_install: Some((KREW_INSTALL, ".krew/bin")),
        ..ToolDescriptor::archive(
            "krew",
            "https://github.com/kubernetes-sigs/krew/releases/download/v{version}/krew-linux_amd64.tar.gz",
            "krew-linux_amd64",
        )
    }
    .verify(&["kubectl", "krew", "version"]),
    ToolDescriptor::archive(
        "kustomize",
        "https://github.com/kubernetes-sigs/kustomize/releases/download/kustomize%2Fv{version}/kustomize_v{version}_linux_amd64.tar.gz",
        "kustomize",
    )
    .verify(&["kustomize", "version"]),
    ToolDescriptor::archive(
        "helm",
        "https://get.helm.sh/helm-v{version}-linux-amd64.tar.gz",
        "linux-amd64/helm",
    )
    .verify(&["helm", "version", "--short"]),
    ToolDescriptor::archive(
        "conftest",
        "https://github.com/open-policy-agent/conftest/releases/download/v{version}/conftest_{version}_Linux_x86_64.tar.gz",
        "conftest",
    )
    .verify(&["conftest", "--version"]),
    ToolDescriptor::archive(
        "kubeval",
        "https://github.com/instrumenta/kubeval/releases/download/v{version}/kubeval-linux-amd64.tar.gz",
        "kubeval",
    )
    .verify(&["kubeval", "--version"]),
    ToolDescriptor::archive(
        "kubeconform",
        "https://github.com/yannh/kubeconform/releases/download/v{version}/kubeconform-linux-amd64.tar.gz",
        "kubeconform",
    )
    .verify(&["kubeconform", "-v"]),
    ToolDescriptor::archive(
        "gh",
        "https://github.com/cli/cli/releases/download/v{version}/gh_{version}_linux_amd64.tar.gz",
        "gh_{version}_linux_amd64/bin/gh",
    )
    .verify(&["gh", "version"]),
    ToolDescriptor {
        probe: Some(YQ_PROBE),
        ..ToolDescriptor::archive(
            "yq",
            "https://github.com/mikefarah/yq/releases/download/v{version}/yq_linux_amd64.tar.gz",
            "yq_linux_amd64",
        )
    }
    .verify(&["yq", "--version"]),
    ToolDescriptor::single(
        "jq",
        "https://github.com/jqlang/jq/releases/download/jq-{version}/jq-linux-amd64",
    )
    .verify(&["jq", "--version"]),
    ToolDescriptor {
        elevated_mode: Some(0o555),
        ..ToolDescriptor::single(
            "argocd",
            "https://github.com/argoproj/argo-cd/releases/download/v{version}/argocd-linux-amd64",
        )
    }
    .verify(&["argocd", "version", "--client"]),
];

/// Look up a tool by name.
#[must_use]
pub fn find(name: &str) -> Option<&'static ToolDescriptor> {
    CATALOG.iter().find(|d| d.name == name)
}

/// Names of every supported tool, in installation order.
pub fn names() -> impl Iterator<Item = &'static str> {
    CATALOG.iter().map(|d| d.name)
}
