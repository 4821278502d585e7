use std::sync::Arc;

use ledgit_crypto::Identity;
use ledgit_store::{Attestation, LedgerStore, ReadOptions, Row, StoreError, WriteReceipt};
use tracing::{debug, warn};

use crate::error::LedgerResult;
use crate::fold::Stamped;
use crate::records::Record;
use crate::tables::TableCatalog;

/// Typed access to the ledger's tables.
///
/// Appends are attested by the given identity. Scans page backwards through
/// the whole table and return parsed rows in append order.
#[derive(Clone)]
pub struct RowLog {
    store: Arc<dyn LedgerStore>,
    catalog: TableCatalog,
    page_size: usize,
}

impl RowLog {
    pub fn new(store: Arc<dyn LedgerStore>, catalog: TableCatalog, page_size: usize) -> Self {
        Self {
            store,
            catalog,
            page_size: page_size.max(1),
        }
    }

    pub fn catalog(&self) -> &TableCatalog {
        &self.catalog
    }

    /// Append one row. Never retried here: a duplicate row is worse than a
    /// reported failure.
    pub async fn append<R: Record>(
        &self,
        identity: &dyn Identity,
        record: &R,
    ) -> LedgerResult<WriteReceipt> {
        let table = self.catalog.table_id(R::TABLE);
        let json = serde_json::to_string(record)?;
        let attestation = Attestation::sign(identity, &table, &json);
        let receipt = self.store.write_row(&table, &json, &attestation).await?;
        debug!(table = R::TABLE.name(), seq = receipt.seq, "row appended");
        Ok(receipt)
    }

    /// Every parseable row of `R`'s table.
    ///
    /// A missing table or a failed read yields an empty result: a table that
    /// is not yet visible is a normal transient state.
    pub async fn scan<R: Record>(&self) -> Vec<Stamped<R>> {
        match self.try_scan::<R>().await {
            Ok(rows) => rows,
            Err(crate::error::LedgerError::Store(StoreError::TableNotFound(_))) => {
                debug!(table = R::TABLE.name(), "table not created yet");
                Vec::new()
            }
            Err(e) => {
                warn!(table = R::TABLE.name(), error = %e, "table scan failed, treating as empty");
                Vec::new()
            }
        }
    }

    /// Like [`RowLog::scan`], but a failed read is an error. A table that
    /// does not exist yet still reads as empty.
    pub async fn scan_checked<R: Record>(&self) -> LedgerResult<Vec<Stamped<R>>> {
        match self.try_scan::<R>().await {
            Err(crate::error::LedgerError::Store(StoreError::TableNotFound(_))) => Ok(Vec::new()),
            other => other,
        }
    }

    /// Like [`RowLog::scan`], but reports store failures.
    pub async fn try_scan<R: Record>(&self) -> LedgerResult<Vec<Stamped<R>>> {
        let table = self.catalog.table_id(R::TABLE);
        let mut raw: Vec<Row> = Vec::new();
        let mut before = None;
        loop {
            let page = self
                .store
                .read_rows(&table, ReadOptions::page(self.page_size, before))
                .await?;
            let Some(first) = page.first() else { break };
            let first_seq = first.seq;
            let full = page.len() >= self.page_size;
            raw.extend(page);
            if !full || first_seq == 0 {
                break;
            }
            before = Some(first_seq);
        }
        raw.sort_by_key(|r| r.seq);
        raw.dedup_by_key(|r| r.seq);

        Ok(raw
            .into_iter()
            .filter_map(|row| match serde_json::from_str::<R>(&row.data) {
                Ok(record) => Some(Stamped {
                    seq: row.seq,
                    author: row.author,
                    record,
                }),
                Err(e) => {
                    debug!(table = R::TABLE.name(), seq = row.seq, error = %e, "skipping unparseable row");
                    None
                }
            })
            .collect())
    }
}

impl std::fmt::Debug for RowLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RowLog")
            .field("root", &self.catalog.root())
            .field("page_size", &self.page_size)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{RefRow, SCHEMA_VERSION};
    use crate::tables::TableKind;
    use ledgit_crypto::LocalIdentity;
    use ledgit_store::InMemoryLedgerStore;
    use ledgit_types::{RecordId, Timestamp};

    fn ref_row(name: &str) -> RefRow {
        RefRow {
            schema_version: SCHEMA_VERSION,
            repo_name: "demo".into(),
            ref_name: name.into(),
            commit_id: RecordId::generate(),
            timestamp: Timestamp::now(),
        }
    }

    async fn setup(page_size: usize) -> (Arc<InMemoryLedgerStore>, RowLog) {
        let store = Arc::new(InMemoryLedgerStore::new());
        let catalog = TableCatalog::new("test");
        store
            .ensure_table(&catalog.table_id(TableKind::Refs), &TableKind::Refs.schema())
            .await
            .unwrap();
        let log = RowLog::new(store.clone(), catalog, page_size);
        (store, log)
    }

    #[tokio::test]
    async fn scan_pages_through_all_rows() {
        let (_store, log) = setup(3).await;
        let id = LocalIdentity::generate();
        for i in 0..10 {
            log.append(&id, &ref_row(&format!("b{i}"))).await.unwrap();
        }
        let rows = log.scan::<RefRow>().await;
        assert_eq!(rows.len(), 10);
        assert!(rows.windows(2).all(|w| w[0].seq < w[1].seq));
        assert_eq!(rows[9].record.ref_name, "b9");
        assert_eq!(rows[0].author, id.address());
    }

    #[tokio::test]
    async fn exact_page_multiple() {
        let (_store, log) = setup(5).await;
        let id = LocalIdentity::generate();
        for i in 0..10 {
            log.append(&id, &ref_row(&format!("b{i}"))).await.unwrap();
        }
        assert_eq!(log.scan::<RefRow>().await.len(), 10);
    }

    #[tokio::test]
    async fn missing_table_scans_empty() {
        let store = Arc::new(InMemoryLedgerStore::new());
        let log = RowLog::new(store, TableCatalog::new("test"), 10);
        assert!(log.scan::<RefRow>().await.is_empty());
        assert!(log.try_scan::<RefRow>().await.is_err());
        assert!(log.scan_checked::<RefRow>().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn checked_scan_reports_read_failure() {
        let (store, log) = setup(10).await;
        let id = LocalIdentity::generate();
        log.append(&id, &ref_row("main")).await.unwrap();
        store.fail_reads(1);
        assert!(log.scan_checked::<RefRow>().await.is_err());
        assert_eq!(log.scan_checked::<RefRow>().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn read_failure_scans_empty() {
        let (store, log) = setup(10).await;
        let id = LocalIdentity::generate();
        log.append(&id, &ref_row("main")).await.unwrap();
        store.fail_reads(1);
        assert!(log.scan::<RefRow>().await.is_empty());
        assert_eq!(log.scan::<RefRow>().await.len(), 1);
    }

    #[tokio::test]
    async fn unparseable_rows_are_skipped() {
        let (store, log) = setup(10).await;
        let id = LocalIdentity::generate();
        let table = log.catalog().table_id(TableKind::Refs);
        let junk = "{\"not\":\"a ref\"}";
        store
            .write_row(&table, junk, &Attestation::sign(&id, &table, junk))
            .await
            .unwrap();
        log.append(&id, &ref_row("main")).await.unwrap();
        let rows = log.scan::<RefRow>().await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].seq, 1);
    }
}
