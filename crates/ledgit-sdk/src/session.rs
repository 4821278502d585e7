//! The engine context: one identity, one ledger connection, one set of caches.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use ledgit_cache::{DiskTier, ImmutableCache, TtlCache};
use ledgit_crypto::{ContentHash, Identity, KeyRing};
use ledgit_gate::AccessGate;
use ledgit_ledger::{Commit, Repository, RowLog, SchemaBootstrapper, TableCatalog};
use ledgit_store::{InMemoryPaymentRail, LedgerStore, PaymentRail};
use ledgit_types::{Address, Clock, ContentId, Timestamp};
use tracing::warn;

use crate::branches::Branch;
use crate::config::EngineConfig;
use crate::error::SdkResult;

/// Short-lived caches for list queries. Entries written by this session are
/// invalidated immediately; other writers' rows appear once the TTL lapses.
#[derive(Debug)]
pub(crate) struct QueryCache {
    pub(crate) repos: TtlCache<(), Vec<Repository>>,
    pub(crate) commits: TtlCache<String, Vec<Commit>>,
    pub(crate) branches: TtlCache<String, Vec<Branch>>,
}

impl QueryCache {
    fn new(config: &EngineConfig) -> Self {
        let c = &config.cache;
        Self {
            repos: TtlCache::new(c.capacity, Duration::from_secs(c.repos_ttl_secs)),
            commits: TtlCache::new(c.capacity, Duration::from_secs(c.commits_ttl_secs)),
            branches: TtlCache::new(c.capacity, Duration::from_secs(c.branches_ttl_secs)),
        }
    }
}

/// Everything an engine call needs, constructed once and passed by
/// reference. Operations live in `impl Session` blocks across the crate's
/// modules.
pub struct Session {
    pub(crate) store: Arc<dyn LedgerStore>,
    pub(crate) identity: Arc<dyn Identity>,
    pub(crate) payments: Arc<dyn PaymentRail>,
    pub(crate) config: EngineConfig,
    pub(crate) bootstrapper: SchemaBootstrapper,
    pub(crate) log: RowLog,
    pub(crate) blobs: ImmutableCache,
    pub(crate) queries: QueryCache,
    pub(crate) keys: KeyRing,
    pub(crate) gate: AccessGate,
    pub(crate) clock: Clock,
    /// Content this session uploaded, by hash, so identical bytes are
    /// stored once.
    pub(crate) uploaded: Mutex<HashMap<ContentHash, ContentId>>,
}

impl Session {
    pub fn builder(store: Arc<dyn LedgerStore>, identity: Arc<dyn Identity>) -> SessionBuilder {
        SessionBuilder::new(store, identity)
    }

    pub fn address(&self) -> Address {
        self.identity.address()
    }

    pub fn identity(&self) -> &dyn Identity {
        self.identity.as_ref()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn LedgerStore> {
        &self.store
    }

    pub fn catalog(&self) -> &TableCatalog {
        self.log.catalog()
    }

    /// Create any missing tables. Called before every write; a no-op once
    /// all tables are known to exist.
    pub async fn ensure_tables(&self) {
        self.bootstrapper.ensure_infrastructure().await;
    }

    /// A timestamp later than both the wall clock and `seen`, so an update
    /// row always folds over the row it replaces.
    pub(crate) fn stamp_after(&self, seen: Timestamp) -> Timestamp {
        self.clock.observe(seen);
        self.clock.now()
    }

    pub(crate) fn stamp(&self) -> Timestamp {
        self.clock.now()
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("identity", &self.identity.address().short())
            .field("root", &self.log.catalog().root())
            .field("blobs", &self.blobs)
            .finish()
    }
}

/// Builds a [`Session`].
pub struct SessionBuilder {
    store: Arc<dyn LedgerStore>,
    identity: Arc<dyn Identity>,
    payments: Option<Arc<dyn PaymentRail>>,
    config: EngineConfig,
}

impl SessionBuilder {
    pub fn new(store: Arc<dyn LedgerStore>, identity: Arc<dyn Identity>) -> Self {
        Self {
            store,
            identity,
            payments: None,
            config: EngineConfig::default(),
        }
    }

    /// Defaults to an empty in-memory rail, on which every transfer fails
    /// for lack of funds.
    pub fn payments(mut self, payments: Arc<dyn PaymentRail>) -> Self {
        self.payments = Some(payments);
        self
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> SdkResult<Session> {
        let catalog = TableCatalog::new(self.config.ledger.root_id.clone());
        let disk = match &self.config.cache.dir {
            Some(dir) => match DiskTier::open(dir, self.config.cache.compress_threshold) {
                Ok(tier) => Some(tier),
                Err(e) => {
                    warn!(dir = %dir.display(), error = %e, "durable cache unavailable, using memory only");
                    None
                }
            },
            None => None,
        };
        Ok(Session {
            bootstrapper: SchemaBootstrapper::new(self.store.clone(), catalog.clone()),
            log: RowLog::new(self.store.clone(), catalog, self.config.ledger.page_size),
            blobs: ImmutableCache::with_disk(disk),
            queries: QueryCache::new(&self.config),
            payments: self
                .payments
                .unwrap_or_else(|| Arc::new(InMemoryPaymentRail::new())),
            store: self.store,
            identity: self.identity,
            config: self.config,
            keys: KeyRing::new(),
            gate: AccessGate::standard(),
            clock: Clock::new(),
            uploaded: Mutex::new(HashMap::new()),
        })
    }
}
