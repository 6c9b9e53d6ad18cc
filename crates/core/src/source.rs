//! Collaborator interfaces consumed by the caches.
//!
//! Concrete implementations live in `civic-client`; tests use in-memory fakes.

use std::fmt;

use async_trait::async_trait;
use bytes::Bytes;

use crate::Error;
use crate::bill_id::BillId;
use crate::records::{Matter, MatterAttachment, MatterHistory, MatterSponsor, MatterText, MatterTextVersion, Vote};

/// Key/value blob store holding the JSON snapshot files.
///
/// Implementations must return `Error::NotFound` when the key does not exist
/// so the caller can tell a missing object from a transport failure.
#[async_trait]
pub trait ObjectSource: Send + Sync {
    async fn open_object(&self, key: &str) -> Result<Bytes, Error>;

    /// Human-readable location for logs, e.g. `gs://intronyc`.
    fn describe(&self) -> String;
}

/// Query service for live legislative records.
#[async_trait]
pub trait RecordApi: Send + Sync {
    async fn matters(&self, filter: &MatterFilter) -> Result<Vec<Matter>, Error>;

    async fn matter_sponsors(&self, matter_id: i64) -> Result<Vec<MatterSponsor>, Error>;

    async fn matter_histories(&self, matter_id: i64) -> Result<Vec<MatterHistory>, Error>;

    /// Roll-call for one history item.
    async fn event_votes(&self, history_id: i64) -> Result<Vec<Vote>, Error>;

    async fn matter_attachments(&self, matter_id: i64) -> Result<Vec<MatterAttachment>, Error>;

    async fn matter_text_versions(&self, matter_id: i64) -> Result<Vec<MatterTextVersion>, Error>;

    async fn matter_text(&self, matter_id: i64, text_id: i64) -> Result<MatterText, Error>;

    /// Public detail-page URL for a matter.
    async fn resolve_canonical_url(&self, matter_id: i64) -> Result<String, Error>;
}

/// Filter selecting the matter with a given type and file number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatterFilter {
    pub type_name: String,
    pub file: String,
}

impl MatterFilter {
    pub fn for_bill(id: &BillId) -> Self {
        Self { type_name: id.kind().type_name().to_string(), file: id.file() }
    }
}

/// Renders as an OData `$filter` expression.
impl fmt::Display for MatterFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "MatterTypeName eq '{}' and MatterFile eq '{}'",
            self.type_name.replace('\'', "''"),
            self.file.replace('\'', "''")
        )
    }
}
