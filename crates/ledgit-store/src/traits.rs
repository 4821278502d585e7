use async_trait::async_trait;
use ledgit_types::{ContentId, TableId};

use crate::error::StoreResult;
use crate::types::{
    Attestation, ContentMetadata, ReadOptions, RetrievedContent, Row, TableSchema, WriteReceipt,
};

/// Append-only tables plus content blobs.
///
/// All implementations must satisfy these invariants:
/// - A row, once appended, is never changed or removed.
/// - Row sequence numbers within a table are dense and increasing.
/// - `write_row` verifies the attestation before appending.
/// - `store_content` returns a fresh id per call.
/// - `retrieve_content` returns `data: None` for content that exists but is
///   not yet readable, and `ContentNotFound` only for unknown ids.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Create a table. Fails with `AlreadyExists` if it was created before.
    async fn ensure_table(&self, id: &TableId, schema: &TableSchema) -> StoreResult<()>;

    /// Append one row.
    async fn write_row(
        &self,
        table: &TableId,
        row: &str,
        attestation: &Attestation,
    ) -> StoreResult<WriteReceipt>;

    /// Read a window of rows in ascending sequence.
    async fn read_rows(&self, table: &TableId, options: ReadOptions) -> StoreResult<Vec<Row>>;

    /// Store content split into chunks; the store concatenates them on read.
    async fn store_content(
        &self,
        chunks: Vec<String>,
        metadata: ContentMetadata,
    ) -> StoreResult<ContentId>;

    /// Fetch content by id.
    async fn retrieve_content(&self, id: &ContentId) -> StoreResult<RetrievedContent>;

    /// Whether an account exists at a derived address (a table id in hex).
    async fn account_exists(&self, address: &str) -> StoreResult<bool>;
}
