//! Keel Core - shared foundation for the Keel asset pipeline
//!
//! This crate provides the pieces every other Keel crate leans on:
//! - Project root discovery and asset path resolution
//! - Persisted project settings (`keel.toml`)

pub mod project;

pub use project::{ProjectPaths, PROJECT_FILE};
