use ledgit_crypto::{Identity, Signature, VerifyingKey};
use ledgit_types::{Address, TableId};
use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};

/// Declared shape of a table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    pub name: String,
    pub columns: Vec<String>,
    pub id_column: String,
}

/// One stored row, as returned by `read_rows`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Row {
    /// Position in the table's append order, starting at 0.
    pub seq: u64,
    /// Address that attested the write.
    pub author: Address,
    /// The row body, as written.
    pub data: String,
}

/// Paging window for `read_rows`.
///
/// `before` keeps rows with a smaller sequence number; `limit` then keeps
/// the newest `limit` of those. Results are always in ascending sequence.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReadOptions {
    pub limit: Option<usize>,
    pub before: Option<u64>,
}

impl ReadOptions {
    pub fn page(limit: usize, before: Option<u64>) -> Self {
        Self {
            limit: Some(limit),
            before,
        }
    }

    /// Select from a full ascending row list.
    pub fn apply<T: Clone>(&self, rows: &[T], seq_of: impl Fn(&T) -> u64) -> Vec<T> {
        let end = match self.before {
            Some(before) => rows.partition_point(|r| seq_of(r) < before),
            None => rows.len(),
        };
        let start = match self.limit {
            Some(limit) => end.saturating_sub(limit),
            None => 0,
        };
        rows[start..end].to_vec()
    }
}

/// Proof that an identity authored a row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attestation {
    pub author: Address,
    pub signature: Signature,
}

impl Attestation {
    /// Sign `row` on behalf of `identity` for `table`.
    pub fn sign(identity: &dyn Identity, table: &TableId, row: &str) -> Self {
        Self {
            author: identity.address(),
            signature: identity.sign(&Self::message(table, row)),
        }
    }

    pub fn verify(&self, table: &TableId, row: &str) -> StoreResult<()> {
        let invalid = |reason: &str| StoreError::InvalidAttestation {
            table: *table,
            reason: reason.to_string(),
        };
        let key = VerifyingKey::from_address(&self.author)
            .map_err(|_| invalid("author is not a public key"))?;
        key.verify(&Self::message(table, row), &self.signature)
            .map_err(|_| invalid("signature does not match row"))
    }

    fn message(table: &TableId, row: &str) -> Vec<u8> {
        let mut msg = Vec::with_capacity(32 + row.len());
        msg.extend_from_slice(table.as_bytes());
        msg.extend_from_slice(row.as_bytes());
        msg
    }
}

/// Acknowledgement of an appended row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteReceipt {
    pub table: TableId,
    pub seq: u64,
}

/// Descriptive metadata stored alongside content.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentMetadata {
    pub name: String,
    pub mime: String,
    /// Size in bytes of the original (unencoded, unencrypted) content.
    pub size: u64,
    #[serde(default)]
    pub encrypted: bool,
}

/// Content as returned by `retrieve_content`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetrievedContent {
    /// `None` while the content is not yet available.
    pub data: Option<String>,
    pub metadata: ContentMetadata,
}
