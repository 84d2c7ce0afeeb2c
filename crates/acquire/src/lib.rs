//! Tool acquisition engine for kubetools.
//!
//! Given a [`ToolRequest`](kubetools_core::tools::ToolRequest), the engine:
//! - checks the cache index (or probes the installed binary's version)
//! - downloads the artifact from its version-templated URL on a miss
//! - unpacks tarballs into an isolated scratch directory
//! - marks the executable, runs per-tool install steps and registers the
//!   result in the cache
//!
//! # Example
//!
//! ```ignore
//! use kubetools_acquire::{Engine, EngineOptions};
//! use kubetools_core::cache::ToolCache;
//! use kubetools_core::tools::{SearchPath, catalog};
//!
//! let engine = Engine::new(ToolCache::default(), EngineOptions::new("/home/runner"))?;
//! let requests = vec![catalog::find("helm").unwrap().request("3.14.0")];
//! let provisioned = engine.acquire_all(&requests, SearchPath::from_env()).await?;
//! ```

#![warn(missing_docs)]

mod commands;
mod download;
mod engine;
mod extract;

pub use commands::{reports_version, run_capture, run_capture_with_home};
pub use engine::{Engine, EngineOptions, Provisioned};
