// Collaborator traits for archive data access
use crate::domain::descriptor::SignalDescriptor;
use crate::domain::partition::PartitionWindow;
use crate::domain::sample::RawRow;
use crate::error::{ArchiveError, BackendError};
use async_trait::async_trait;

/// Query-execution collaborator. The core issues one call per partition
/// window and never sees query text, sessions or credentials.
#[async_trait]
pub trait ArchiveBackend: Send + Sync {
    /// Execute the query for one partition window and return its raw rows in
    /// ascending `data_time` order.
    async fn execute_window(
        &self,
        descriptor: &SignalDescriptor,
        window: &PartitionWindow,
    ) -> Result<Vec<RawRow>, BackendError>;
}

/// Catalog collaborator: name resolution and namespace browsing for the
/// slash-delimited `host:port/domain/family/member/attribute` hierarchy.
#[async_trait]
pub trait SignalCatalog: Send + Sync {
    /// Resolve a fully qualified attribute name to its descriptor.
    async fn resolve(&self, name: &str) -> Result<SignalDescriptor, ArchiveError>;

    /// Flat list of every archived attribute name.
    async fn attributes(&self) -> Result<Vec<String>, ArchiveError>;

    async fn hosts(&self) -> Result<Vec<String>, ArchiveError>;

    async fn domains(&self, host: &str) -> Result<Vec<String>, ArchiveError>;

    async fn families(&self, host: &str, domain: &str) -> Result<Vec<String>, ArchiveError>;

    async fn members(
        &self,
        host: &str,
        domain: &str,
        family: &str,
    ) -> Result<Vec<String>, ArchiveError>;

    async fn names(
        &self,
        host: &str,
        domain: &str,
        family: &str,
        member: &str,
    ) -> Result<Vec<String>, ArchiveError>;
}

/// Caller-supplied retrieval progress observer. Invoked at least once per
/// partition batch and per attribute; must not block significantly.
pub trait ProgressSink: Send + Sync {
    /// `fraction` is the share of partition windows processed for the current
    /// attribute, in `[0, 1]`; `index`/`total` locate the attribute within a
    /// multi-attribute call (both 1 for a single fetch).
    fn on_progress(&self, fraction: f64, index: usize, total: usize);
}
