//! Upstream clients for civic-mirror.
//!
//! This crate provides the concrete collaborators behind the caches in
//! `civic-core`: the snapshot object sources and the Legistar record API.

pub mod legistar;
pub mod storage;

pub use legistar::{LegistarClient, LegistarConfig, LegistarError};
pub use storage::{HttpObjectSource, LocalObjectSource, StorageConfig, object_source};
