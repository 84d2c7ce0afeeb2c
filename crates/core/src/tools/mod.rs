//! Tool requests, results and the catalog of supported tools.
//!
//! # Architecture
//!
//! - [`ToolRequest`] - one tool at one version, with everything needed to fetch it
//! - [`ArtifactKind`], [`InstallPolicy`], [`VersionCheck`] - per-tool variations
//!   dispatched through a single acquisition algorithm
//! - [`ToolResult`] - where an acquired tool lives and whether it was cached
//! - [`SearchPath`] - directories added to the command search path during a run
//! - [`catalog`] - descriptors for every tool kubetools knows how to provision
//!
//! # Example
//!
//! ```ignore
//! use kubetools_core::tools::catalog;
//!
//! let helm = catalog::find("helm").unwrap();
//! let request = helm.request("3.14.0");
//! assert_eq!(request.source_url(), "https://get.helm.sh/helm-v3.14.0-linux-amd64.tar.gz");
//! ```

pub mod catalog;
mod request;
mod search_path;

pub use catalog::ToolDescriptor;
pub use request::{
    ArtifactKind, InstallPolicy, ToolRequest, ToolResult, VersionCheck, expand_template,
};
pub use search_path::SearchPath;
