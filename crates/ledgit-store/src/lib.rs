//! The Ledger Store contract consumed by ledgit.
//!
//! The ledger is an append-only substrate: tables whose rows are never
//! updated or deleted, plus opaque content blobs. Everything ledgit knows
//! about repositories, commits and issues is reconstructed by scanning rows.
//!
//! # Backends
//!
//! All backends implement the [`LedgerStore`] trait:
//!
//! - [`InMemoryLedgerStore`] -- map-backed store with fault injection, for tests
//! - [`FileLedgerStore`] -- JSON-lines tables and content files on local disk
//!
//! Bounty and donation transfers go through the separate [`PaymentRail`]
//! trait, implemented in memory by [`InMemoryPaymentRail`].
//!
//! # Contract
//!
//! 1. Rows are immutable and numbered by append sequence within a table.
//! 2. Every row write carries an [`Attestation`] that the store verifies.
//! 3. Each `store_content` call returns a fresh [`ContentId`](ledgit_types::ContentId),
//!    even for bytes stored before.
//! 4. Retrieved content may be `None` while it is still propagating; that
//!    is "not yet available", not "absent".
//! 5. Creating a table that already exists fails with
//!    [`StoreError::AlreadyExists`]; callers treat that as success.

pub mod chunk;
pub mod error;
pub mod fs;
pub mod memory;
pub mod payments;
pub mod traits;
pub mod types;

pub use chunk::{chunk_utf8, DEFAULT_CHUNK_SIZE};
pub use error::{StoreError, StoreResult};
pub use fs::FileLedgerStore;
pub use memory::InMemoryLedgerStore;
pub use payments::{InMemoryPaymentRail, PaymentError, PaymentRail, TransferReceipt};
pub use traits::LedgerStore;
pub use types::{
    Attestation, ContentMetadata, ReadOptions, RetrievedContent, Row, TableSchema, WriteReceipt,
};
