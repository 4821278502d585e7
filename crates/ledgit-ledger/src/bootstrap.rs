use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use ledgit_store::{LedgerStore, StoreError};
use tracing::{debug, info, warn};

use crate::tables::{TableCatalog, TableKind};

/// Outcome of one bootstrap pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BootstrapReport {
    pub created: usize,
    pub existing: usize,
    pub failed: usize,
}

/// Ensures every table exists before the engine reads or writes it.
///
/// Idempotent. A table another client created concurrently counts as
/// existing. Failures are logged, not raised: scans of a table that could
/// not be created come back empty, and the next call tries again.
pub struct SchemaBootstrapper {
    store: Arc<dyn LedgerStore>,
    catalog: TableCatalog,
    ready: AtomicBool,
}

impl SchemaBootstrapper {
    pub fn new(store: Arc<dyn LedgerStore>, catalog: TableCatalog) -> Self {
        Self {
            store,
            catalog,
            ready: AtomicBool::new(false),
        }
    }

    /// Whether a previous pass found or created every table.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    pub async fn ensure_infrastructure(&self) -> BootstrapReport {
        let mut report = BootstrapReport::default();
        if self.is_ready() {
            report.existing = TableKind::ALL.len();
            return report;
        }

        for kind in TableKind::ALL {
            let id = self.catalog.table_id(kind);
            match self.store.account_exists(&id.to_hex()).await {
                Ok(true) => {
                    report.existing += 1;
                    continue;
                }
                Ok(false) => {}
                Err(e) => {
                    warn!(table = kind.name(), error = %e, "could not check table");
                    report.failed += 1;
                    continue;
                }
            }
            match self.store.ensure_table(&id, &kind.schema()).await {
                Ok(()) => {
                    debug!(table = kind.name(), "table created");
                    report.created += 1;
                }
                Err(StoreError::AlreadyExists(_)) => report.existing += 1,
                Err(e) => {
                    warn!(table = kind.name(), error = %e, "could not create table");
                    report.failed += 1;
                }
            }
        }

        if report.failed == 0 {
            self.ready.store(true, Ordering::Release);
        }
        if report.created > 0 {
            info!(created = report.created, root = self.catalog.root(), "ledger tables initialized");
        }
        report
    }
}

impl std::fmt::Debug for SchemaBootstrapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaBootstrapper")
            .field("root", &self.catalog.root())
            .field("ready", &self.is_ready())
            .finish()
    }
}
