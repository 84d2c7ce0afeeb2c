//! Core types for kubetools.
//!
//! This crate holds everything the acquisition engine and the CLI share:
//!
//! - [`Error`] - the error type for every kubetools operation
//! - [`cache::ToolCache`] - the on-disk cache index keyed by tool name and version
//! - [`tools`] - tool requests, results, the search path context and the catalog
//! - [`config::Config`] - requested versions and engine settings

// Rust 1.92 compiler bug: false positives for thiserror/miette derive macro fields
// https://github.com/rust-lang/rust/issues/147648
#![allow(unused_assignments)]

pub mod cache;
pub mod config;
mod error;
pub mod tools;

pub use error::{Error, Result};
