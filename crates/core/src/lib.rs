//! Core types and caches for civic-mirror.
//!
//! This crate provides:
//! - Read-through caches for snapshot files, redirects and bill details
//! - Bill identifier parsing and validation
//! - Upstream record and assembled detail types
//! - Unified error types
//! - Configuration structures

pub mod bill_id;
pub mod cache;
pub mod config;
pub mod error;
pub mod model;
pub mod records;
pub mod scope;
pub mod source;
pub mod text;

pub use bill_id::{BillId, BillKind};
pub use cache::{BillDetailMemo, CacheService, CacheSettings, RedirectMemo, SnapshotCache};
pub use config::AppConfig;
pub use error::{Error, ErrorKind};
pub use model::{LastSync, Legislation};
pub use scope::RequestScope;
pub use source::{MatterFilter, ObjectSource, RecordApi};
