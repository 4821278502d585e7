use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use async_trait::async_trait;
use ledgit_types::{ContentId, TableId};
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use crate::traits::LedgerStore;
use crate::types::{
    Attestation, ContentMetadata, ReadOptions, RetrievedContent, Row, TableSchema, WriteReceipt,
};

struct Table {
    schema: TableSchema,
    rows: Vec<Row>,
}

struct StoredContent {
    chunks: Vec<String>,
    metadata: ContentMetadata,
}

/// Failures to inject, consumed as operations hit them.
#[derive(Default)]
struct Faults {
    /// Remaining failures per content name.
    uploads: HashMap<String, usize>,
    row_writes: usize,
    reads: usize,
    /// Remaining read failures per table.
    table_reads: HashMap<TableId, usize>,
    table_creates: usize,
    /// Content that exists but reads back as "not yet available".
    withheld: HashSet<ContentId>,
}

/// In-memory ledger store.
///
/// Intended for tests and embedding. Besides the [`LedgerStore`] contract it
/// can inject failures, which is how the engine's retry and partial-failure
/// paths are exercised.
pub struct InMemoryLedgerStore {
    tables: RwLock<HashMap<TableId, Table>>,
    content: RwLock<HashMap<ContentId, StoredContent>>,
    faults: RwLock<Faults>,
}

impl InMemoryLedgerStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(HashMap::new()),
            content: RwLock::new(HashMap::new()),
            faults: RwLock::new(Faults::default()),
        }
    }

    /// Fail the next `times` uploads whose metadata name is `name`.
    pub fn fail_uploads_named(&self, name: &str, times: usize) {
        self.faults
            .write()
            .expect("lock poisoned")
            .uploads
            .insert(name.to_string(), times);
    }

    /// Fail the next `times` row writes.
    pub fn fail_row_writes(&self, times: usize) {
        self.faults.write().expect("lock poisoned").row_writes = times;
    }

    /// Fail the next `times` row reads.
    pub fn fail_reads(&self, times: usize) {
        self.faults.write().expect("lock poisoned").reads = times;
    }

    /// Fail the next `times` reads of one table; other tables read normally.
    pub fn fail_reads_of(&self, table: &TableId, times: usize) {
        self.faults
            .write()
            .expect("lock poisoned")
            .table_reads
            .insert(*table, times);
    }

    /// Fail the next `times` table creations.
    pub fn fail_table_creates(&self, times: usize) {
        self.faults.write().expect("lock poisoned").table_creates = times;
    }

    /// Make stored content read back as not yet available.
    pub fn withhold_content(&self, id: &ContentId) {
        self.faults
            .write()
            .expect("lock poisoned")
            .withheld
            .insert(id.clone());
    }

    /// Number of content blobs stored.
    pub fn content_count(&self) -> usize {
        self.content.read().expect("lock poisoned").len()
    }

    /// Number of rows in a table, or 0 if it does not exist.
    pub fn row_count(&self, table: &TableId) -> usize {
        self.tables
            .read()
            .expect("lock poisoned")
            .get(table)
            .map(|t| t.rows.len())
            .unwrap_or(0)
    }

    /// Number of tables created.
    pub fn table_count(&self) -> usize {
        self.tables.read().expect("lock poisoned").len()
    }

    /// Names of stored content, in no particular order.
    pub fn content_names(&self) -> Vec<String> {
        self.content
            .read()
            .expect("lock poisoned")
            .values()
            .map(|c| c.metadata.name.clone())
            .collect()
    }

    fn take_fault(counter: &mut usize) -> bool {
        if *counter > 0 {
            *counter -= 1;
            true
        } else {
            false
        }
    }
}

impl Default for InMemoryLedgerStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InMemoryLedgerStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryLedgerStore")
            .field("tables", &self.table_count())
            .field("content", &self.content_count())
            .finish()
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn ensure_table(&self, id: &TableId, schema: &TableSchema) -> StoreResult<()> {
        if Self::take_fault(&mut self.faults.write().expect("lock poisoned").table_creates) {
            return Err(StoreError::Unavailable(format!(
                "injected failure creating {}",
                schema.name
            )));
        }
        let mut tables = self.tables.write().expect("lock poisoned");
        if tables.contains_key(id) {
            return Err(StoreError::AlreadyExists(schema.name.clone()));
        }
        tables.insert(
            *id,
            Table {
                schema: schema.clone(),
                rows: Vec::new(),
            },
        );
        Ok(())
    }

    async fn write_row(
        &self,
        table: &TableId,
        row: &str,
        attestation: &Attestation,
    ) -> StoreResult<WriteReceipt> {
        if Self::take_fault(&mut self.faults.write().expect("lock poisoned").row_writes) {
            return Err(StoreError::Unavailable("injected row write failure".into()));
        }
        attestation.verify(table, row)?;
        let mut tables = self.tables.write().expect("lock poisoned");
        let t = tables.get_mut(table).ok_or(StoreError::TableNotFound(*table))?;
        let seq = t.rows.len() as u64;
        t.rows.push(Row {
            seq,
            author: attestation.author.clone(),
            data: row.to_string(),
        });
        tracing::trace!(table = %t.schema.name, seq, "row appended");
        Ok(WriteReceipt { table: *table, seq })
    }

    async fn read_rows(&self, table: &TableId, options: ReadOptions) -> StoreResult<Vec<Row>> {
        {
            let mut faults = self.faults.write().expect("lock poisoned");
            let targeted = faults
                .table_reads
                .get_mut(table)
                .is_some_and(Self::take_fault);
            if targeted || Self::take_fault(&mut faults.reads) {
                return Err(StoreError::Unavailable("injected read failure".into()));
            }
        }
        let tables = self.tables.read().expect("lock poisoned");
        let t = tables.get(table).ok_or(StoreError::TableNotFound(*table))?;
        Ok(options.apply(&t.rows, |r| r.seq))
    }

    async fn store_content(
        &self,
        chunks: Vec<String>,
        metadata: ContentMetadata,
    ) -> StoreResult<ContentId> {
        {
            let mut faults = self.faults.write().expect("lock poisoned");
            if let Some(remaining) = faults.uploads.get_mut(&metadata.name) {
                if Self::take_fault(remaining) {
                    return Err(StoreError::Unavailable(format!(
                        "injected upload failure for {}",
                        metadata.name
                    )));
                }
            }
        }
        let id = ContentId::new(Uuid::now_v7().simple().to_string());
        self.content
            .write()
            .expect("lock poisoned")
            .insert(id.clone(), StoredContent { chunks, metadata });
        Ok(id)
    }

    async fn retrieve_content(&self, id: &ContentId) -> StoreResult<RetrievedContent> {
        let withheld = self
            .faults
            .read()
            .expect("lock poisoned")
            .withheld
            .contains(id);
        let content = self.content.read().expect("lock poisoned");
        let stored = content
            .get(id)
            .ok_or_else(|| StoreError::ContentNotFound(id.clone()))?;
        Ok(RetrievedContent {
            data: (!withheld).then(|| stored.chunks.concat()),
            metadata: stored.metadata.clone(),
        })
    }

    async fn account_exists(&self, address: &str) -> StoreResult<bool> {
        let Ok(id) = TableId::from_hex(address) else {
            return Ok(false);
        };
        Ok(self.tables.read().expect("lock poisoned").contains_key(&id))
    }
}
