use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use ledgit_crypto::Signature;
use ledgit_types::{Address, ContentId, TableId};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use crate::traits::LedgerStore;
use crate::types::{
    Attestation, ContentMetadata, ReadOptions, RetrievedContent, Row, TableSchema, WriteReceipt,
};

/// One line of a table file.
#[derive(Serialize, Deserialize)]
struct StoredRow {
    seq: u64,
    author: Address,
    signature: Signature,
    data: String,
}

#[derive(Serialize, Deserialize)]
struct StoredContent {
    chunks: Vec<String>,
    metadata: ContentMetadata,
}

/// Single-host ledger store on the local filesystem.
///
/// Layout under the root directory:
///
/// ```text
/// tables/<table-id>.schema.json   declared columns
/// tables/<table-id>.jsonl         one attested row per line
/// content/<content-id>.json       chunks and metadata
/// ```
///
/// Appends are serialized by an async mutex; content files are written to a
/// temporary name and renamed into place.
pub struct FileLedgerStore {
    root: PathBuf,
    /// Next sequence number per table, loaded lazily.
    next_seq: Mutex<HashMap<TableId, u64>>,
}

impl FileLedgerStore {
    /// Open (creating if needed) a store rooted at `root`.
    pub async fn open(root: impl Into<PathBuf>) -> StoreResult<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(root.join("tables")).await?;
        tokio::fs::create_dir_all(root.join("content")).await?;
        Ok(Self {
            root,
            next_seq: Mutex::new(HashMap::new()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn schema_path(&self, table: &TableId) -> PathBuf {
        self.root.join("tables").join(format!("{}.schema.json", table.to_hex()))
    }

    fn rows_path(&self, table: &TableId) -> PathBuf {
        self.root.join("tables").join(format!("{}.jsonl", table.to_hex()))
    }

    fn content_path(&self, id: &ContentId) -> StoreResult<PathBuf> {
        let name = id.as_str();
        if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(StoreError::ContentNotFound(id.clone()));
        }
        Ok(self.root.join("content").join(format!("{name}.json")))
    }

    async fn load_rows(&self, table: &TableId) -> StoreResult<Vec<StoredRow>> {
        let path = self.rows_path(table);
        let text = match tokio::fs::read_to_string(&path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        text.lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| {
                serde_json::from_str(line).map_err(|e| StoreError::Corrupt {
                    path: path.display().to_string(),
                    reason: e.to_string(),
                })
            })
            .collect()
    }

    async fn table_exists(&self, table: &TableId) -> StoreResult<bool> {
        Ok(tokio::fs::try_exists(self.schema_path(table)).await?)
    }
}

impl std::fmt::Debug for FileLedgerStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileLedgerStore")
            .field("root", &self.root)
            .finish()
    }
}

#[async_trait]
impl LedgerStore for FileLedgerStore {
    async fn ensure_table(&self, id: &TableId, schema: &TableSchema) -> StoreResult<()> {
        let _guard = self.next_seq.lock().await;
        if self.table_exists(id).await? {
            return Err(StoreError::AlreadyExists(schema.name.clone()));
        }
        let json = serde_json::to_vec_pretty(schema)?;
        tokio::fs::write(self.schema_path(id), json).await?;
        tracing::debug!(table = %schema.name, id = %id.short_hex(), "table created");
        Ok(())
    }

    async fn write_row(
        &self,
        table: &TableId,
        row: &str,
        attestation: &Attestation,
    ) -> StoreResult<WriteReceipt> {
        attestation.verify(table, row)?;
        let mut next_seq = self.next_seq.lock().await;
        if !self.table_exists(table).await? {
            return Err(StoreError::TableNotFound(*table));
        }
        let seq = match next_seq.get(table) {
            Some(seq) => *seq,
            None => self.load_rows(table).await?.len() as u64,
        };

        let mut line = serde_json::to_string(&StoredRow {
            seq,
            author: attestation.author.clone(),
            signature: attestation.signature.clone(),
            data: row.to_string(),
        })?;
        line.push('\n');

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.rows_path(table))
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;

        next_seq.insert(*table, seq + 1);
        Ok(WriteReceipt { table: *table, seq })
    }

    async fn read_rows(&self, table: &TableId, options: ReadOptions) -> StoreResult<Vec<Row>> {
        if !self.table_exists(table).await? {
            return Err(StoreError::TableNotFound(*table));
        }
        let rows: Vec<Row> = self
            .load_rows(table)
            .await?
            .into_iter()
            .map(|r| Row {
                seq: r.seq,
                author: r.author,
                data: r.data,
            })
            .collect();
        Ok(options.apply(&rows, |r| r.seq))
    }

    async fn store_content(
        &self,
        chunks: Vec<String>,
        metadata: ContentMetadata,
    ) -> StoreResult<ContentId> {
        let id = ContentId::new(Uuid::now_v7().simple().to_string());
        let path = self.content_path(&id)?;
        let tmp = path.with_extension("json.tmp");
        let json = serde_json::to_vec(&StoredContent { chunks, metadata })?;
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(id)
    }

    async fn retrieve_content(&self, id: &ContentId) -> StoreResult<RetrievedContent> {
        let path = self.content_path(id)?;
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::ContentNotFound(id.clone()))
            }
            Err(e) => return Err(e.into()),
        };
        let stored: StoredContent =
            serde_json::from_slice(&bytes).map_err(|e| StoreError::Corrupt {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
        Ok(RetrievedContent {
            data: Some(stored.chunks.concat()),
            metadata: stored.metadata,
        })
    }

    async fn account_exists(&self, address: &str) -> StoreResult<bool> {
        match TableId::from_hex(address) {
            Ok(id) => self.table_exists(&id).await,
            Err(_) => Ok(false),
        }
    }
}
