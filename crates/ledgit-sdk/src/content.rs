//! Content upload and retrieval: encoding, encryption, retries, caching.
//!
//! File bodies are stored base64-encoded. Private bodies are encrypted with
//! the repository key first, and so are private tree manifests; public
//! manifests are stored as plain JSON.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use ledgit_cache::CachedBlob;
use ledgit_crypto::{ContentHash, RepoCipher, RepoKey};
use ledgit_ledger::FileTree;
use ledgit_store::{chunk_utf8, ContentMetadata, StoreError};
use ledgit_types::ContentId;
use tracing::{debug, warn};

use crate::error::{SdkError, SdkResult};
use crate::session::Session;

const TREE_NAME: &str = "tree.json";
const JSON_MIME: &str = "application/json";

/// A file body as seen by the reader.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FileContent {
    Plain(Vec<u8>),
    /// The file belongs to a private repository and this session holds no
    /// key that opens it.
    AccessDenied,
}

impl FileContent {
    pub fn is_denied(&self) -> bool {
        matches!(self, Self::AccessDenied)
    }

    pub fn bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Plain(b) => Some(b),
            Self::AccessDenied => None,
        }
    }
}

impl fmt::Display for FileContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plain(bytes) => f.write_str(&String::from_utf8_lossy(bytes)),
            Self::AccessDenied => f.write_str("[ACCESS_DENIED]"),
        }
    }
}

/// MIME type served for a path, by extension.
pub fn mime_for_path(path: &str) -> &'static str {
    let ext = Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("html" | "htm") => "text/html",
        Some("js" | "mjs") => "application/javascript",
        Some("css") => "text/css",
        Some("json") => JSON_MIME,
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        Some("woff") => "font/woff",
        Some("woff2") => "font/woff2",
        Some("ico") => "image/x-icon",
        _ => "text/plain",
    }
}

fn seal(bytes: &[u8], key: Option<&RepoKey>) -> SdkResult<Vec<u8>> {
    match key {
        Some(key) => Ok(RepoCipher::new(key).encrypt(bytes)?),
        None => Ok(bytes.to_vec()),
    }
}

impl Session {
    // ---- Upload ----

    /// Store a file body once, without retrying.
    pub(crate) async fn upload_file(
        &self,
        path: &str,
        bytes: &[u8],
        key: Option<&RepoKey>,
    ) -> SdkResult<ContentId> {
        let data = BASE64.encode(seal(bytes, key)?);
        let metadata = ContentMetadata {
            name: path.to_string(),
            mime: mime_for_path(path).to_string(),
            size: bytes.len() as u64,
            encrypted: key.is_some(),
        };
        self.put(data, metadata).await
    }

    /// Store a file body, retrying up to the configured attempt count.
    /// Returns `None` once every attempt failed; the caller skips the file.
    pub(crate) async fn upload_with_retry(
        &self,
        path: &str,
        bytes: &[u8],
        hash: &ContentHash,
        key: Option<&RepoKey>,
    ) -> Option<ContentId> {
        if let Some(id) = self.uploaded_id(hash) {
            return Some(id);
        }
        let attempts = self.config.upload.max_attempts.max(1);
        for attempt in 1..=attempts {
            match self.upload_file(path, bytes, key).await {
                Ok(id) => {
                    self.uploaded
                        .lock()
                        .expect("lock poisoned")
                        .insert(hash.clone(), id.clone());
                    return Some(id);
                }
                Err(e) if attempt < attempts => {
                    debug!(%path, attempt, error = %e, "upload failed, retrying");
                    let delay = self.config.upload.retry_delay();
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
                Err(e) => {
                    warn!(%path, attempts, error = %e, "upload failed, skipping file");
                }
            }
        }
        None
    }

    pub(crate) fn uploaded_id(&self, hash: &ContentHash) -> Option<ContentId> {
        self.uploaded
            .lock()
            .expect("lock poisoned")
            .get(hash)
            .cloned()
    }

    /// Store a tree manifest. Never retried: the caller surfaces the error.
    pub(crate) async fn upload_tree(
        &self,
        tree: &FileTree,
        key: Option<&RepoKey>,
    ) -> SdkResult<ContentId> {
        let json = tree.to_json()?;
        let data = match key {
            Some(key) => BASE64.encode(seal(json.as_bytes(), Some(key))?),
            None => json.clone(),
        };
        let metadata = ContentMetadata {
            name: TREE_NAME.into(),
            mime: JSON_MIME.into(),
            size: json.len() as u64,
            encrypted: key.is_some(),
        };
        self.put(data, metadata).await.map_err(|e| match e {
            SdkError::Store(e) => SdkError::Upload {
                name: TREE_NAME.into(),
                reason: e.to_string(),
            },
            other => other,
        })
    }

    async fn put(&self, data: String, metadata: ContentMetadata) -> SdkResult<ContentId> {
        let chunks = chunk_utf8(&data, self.config.upload.chunk_size);
        let id = self.store.store_content(chunks, metadata.clone()).await?;
        self.blobs.insert(
            id.clone(),
            CachedBlob {
                data,
                name: metadata.name,
                mime: metadata.mime,
                encrypted: metadata.encrypted,
            },
        );
        Ok(id)
    }

    // ---- Retrieval ----

    /// The stored form of a blob, served from cache when possible. `None`
    /// while the store reports the content as not yet available.
    pub(crate) async fn fetch(&self, id: &ContentId) -> SdkResult<Option<Arc<CachedBlob>>> {
        self.blobs
            .get_or_fetch(id, || async {
                let retrieved = match self.store.retrieve_content(id).await {
                    Ok(r) => r,
                    Err(StoreError::ContentNotFound(_)) => {
                        return Err(SdkError::not_found("content", id))
                    }
                    Err(e) => return Err(SdkError::from(e)),
                };
                Ok(retrieved.data.map(|data| CachedBlob {
                    data,
                    name: retrieved.metadata.name,
                    mime: retrieved.metadata.mime,
                    encrypted: retrieved.metadata.encrypted,
                }))
            })
            .await
    }

    /// Decode a file body. Fails with `Decryption` if it is encrypted and
    /// `key` is missing or wrong.
    pub(crate) async fn read_blob(
        &self,
        id: &ContentId,
        key: Option<&RepoKey>,
    ) -> SdkResult<Vec<u8>> {
        let blob = self
            .fetch(id)
            .await?
            .ok_or_else(|| SdkError::not_found("content", id))?;
        let raw = BASE64.decode(blob.data.as_bytes()).map_err(|e| SdkError::Corrupt {
            id: id.to_string(),
            reason: e.to_string(),
        })?;
        if blob.encrypted {
            open(id, &raw, key)
        } else {
            Ok(raw)
        }
    }

    /// Load a tree manifest. Unavailable content is `NotFound`.
    pub(crate) async fn load_tree(
        &self,
        id: &ContentId,
        key: Option<&RepoKey>,
    ) -> SdkResult<FileTree> {
        self.load_tree_sealed(id, key).await.map(|(tree, _)| tree)
    }

    /// Load a tree manifest and report whether it was stored encrypted,
    /// which is also whether its entries carry keyed hashes.
    pub(crate) async fn load_tree_sealed(
        &self,
        id: &ContentId,
        key: Option<&RepoKey>,
    ) -> SdkResult<(FileTree, bool)> {
        let blob = self
            .fetch(id)
            .await?
            .ok_or_else(|| SdkError::not_found("tree", id))?;
        let json = if blob.encrypted {
            let raw = BASE64.decode(blob.data.as_bytes()).map_err(|e| SdkError::Corrupt {
                id: id.to_string(),
                reason: e.to_string(),
            })?;
            let plain = open(id, &raw, key)?;
            String::from_utf8(plain).map_err(|e| SdkError::Corrupt {
                id: id.to_string(),
                reason: e.to_string(),
            })?
        } else {
            blob.data.clone()
        };
        Ok((FileTree::from_json(&json)?, blob.encrypted))
    }

    /// Read a file body for display, degrading to the access-denied
    /// sentinel when it cannot be decrypted.
    pub(crate) async fn read_content(
        &self,
        id: &ContentId,
        key: Option<&RepoKey>,
    ) -> SdkResult<FileContent> {
        match self.read_blob(id, key).await {
            Ok(bytes) => Ok(FileContent::Plain(bytes)),
            Err(SdkError::Decryption { .. }) => Ok(FileContent::AccessDenied),
            Err(e) => Err(e),
        }
    }
}

fn open(id: &ContentId, envelope: &[u8], key: Option<&RepoKey>) -> SdkResult<Vec<u8>> {
    let key = key.ok_or_else(|| SdkError::Decryption {
        id: id.to_string(),
        reason: "no key".into(),
    })?;
    RepoCipher::new(key)
        .decrypt(envelope)
        .map_err(|e| SdkError::Decryption {
            id: id.to_string(),
            reason: e.to_string(),
        })
}
