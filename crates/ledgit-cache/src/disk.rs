use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use ledgit_types::ContentId;
use tracing::debug;
use walkdir::WalkDir;

use crate::error::{CacheError, CacheResult};
use crate::immutable::CachedBlob;

const MAGIC: &[u8; 4] = b"LGC1";
const FLAG_ZSTD: u8 = 0b0000_0001;
/// magic + flags + length + crc
const HEADER_SIZE: usize = 4 + 1 + 4 + 4;
const ZSTD_LEVEL: i32 = 3;

/// Durable cache tier: one file per content id.
///
/// On-disk format:
/// ```text
/// [4 bytes: magic "LGC1"]
/// [1 byte:  flags (bit 0: payload is zstd-compressed)]
/// [4 bytes: payload length (little-endian u32)]
/// [4 bytes: CRC32 of payload (little-endian u32)]
/// [N bytes: payload (bincode-serialized CachedBlob)]
/// ```
///
/// Files are written to a temporary name in the same directory and renamed
/// into place, so a reader never sees a partial entry. An entry that fails
/// its checksum is treated as absent and removed.
#[derive(Clone, Debug)]
pub struct DiskTier {
    dir: PathBuf,
    compress_threshold: usize,
}

impl DiskTier {
    pub fn open(dir: impl Into<PathBuf>, compress_threshold: usize) -> CacheResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| CacheError::Io {
            path: dir.clone(),
            source,
        })?;
        Ok(Self {
            dir,
            compress_threshold,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Content ids are opaque strings, so file names are their hash.
    fn entry_path(&self, id: &ContentId) -> PathBuf {
        let name = blake3::hash(id.as_str().as_bytes()).to_hex();
        self.dir.join(&name[..2]).join(&name[2..])
    }

    pub fn read(&self, id: &ContentId) -> CacheResult<Option<CachedBlob>> {
        let path = self.entry_path(id);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(CacheError::Io { path, source }),
        };
        match decode(&bytes) {
            Ok(blob) => Ok(Some(blob)),
            Err(reason) => {
                let _ = fs::remove_file(&path);
                Err(CacheError::Corrupt { path, reason })
            }
        }
    }

    pub fn write(&self, id: &ContentId, blob: &CachedBlob) -> CacheResult<()> {
        let path = self.entry_path(id);
        let parent = path.parent().unwrap_or(&self.dir).to_path_buf();
        let io_err = |path: &Path| {
            let path = path.to_path_buf();
            move |source| CacheError::Io { path, source }
        };
        fs::create_dir_all(&parent).map_err(io_err(&parent))?;

        let encoded = encode(blob, self.compress_threshold)?;
        let mut tmp = tempfile::NamedTempFile::new_in(&parent).map_err(io_err(&parent))?;
        tmp.write_all(&encoded).map_err(io_err(&path))?;
        tmp.persist(&path)
            .map_err(|e| CacheError::Io {
                path: path.clone(),
                source: e.error,
            })?;
        debug!(id = %id.short(), bytes = encoded.len(), "cache entry persisted");
        Ok(())
    }

    /// Total bytes and number of entries on disk.
    pub fn usage(&self) -> (u64, usize) {
        WalkDir::new(&self.dir)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_file())
            .filter_map(|e| e.metadata().ok())
            .fold((0, 0), |(bytes, count), meta| (bytes + meta.len(), count + 1))
    }

    /// Remove every entry.
    pub fn clear(&self) -> CacheResult<()> {
        for entry in WalkDir::new(&self.dir).min_depth(1).max_depth(1) {
            let entry = entry.map_err(|e| CacheError::Io {
                path: self.dir.clone(),
                source: e.into(),
            })?;
            let path = entry.path();
            let result = if entry.file_type().is_dir() {
                fs::remove_dir_all(path)
            } else {
                fs::remove_file(path)
            };
            result.map_err(|source| CacheError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        }
        Ok(())
    }
}

fn encode(blob: &CachedBlob, compress_threshold: usize) -> CacheResult<Vec<u8>> {
    let raw = bincode::serialize(blob).map_err(|e| CacheError::Encoding(e.to_string()))?;
    let (flags, payload) = if raw.len() >= compress_threshold {
        let compressed = zstd::encode_all(raw.as_slice(), ZSTD_LEVEL)
            .map_err(|e| CacheError::Encoding(e.to_string()))?;
        (FLAG_ZSTD, compressed)
    } else {
        (0, raw)
    };
    let length = u32::try_from(payload.len())
        .map_err(|_| CacheError::Encoding("entry larger than 4 GiB".into()))?;

    let mut out = Vec::with_capacity(HEADER_SIZE + payload.len());
    out.extend_from_slice(MAGIC);
    out.push(flags);
    out.extend_from_slice(&length.to_le_bytes());
    out.extend_from_slice(&crc32fast::hash(&payload).to_le_bytes());
    out.extend_from_slice(&payload);
    Ok(out)
}

fn decode(bytes: &[u8]) -> Result<CachedBlob, String> {
    if bytes.len() < HEADER_SIZE || &bytes[..4] != MAGIC {
        return Err("bad header".into());
    }
    let flags = bytes[4];
    let length = u32::from_le_bytes([bytes[5], bytes[6], bytes[7], bytes[8]]) as usize;
    let crc = u32::from_le_bytes([bytes[9], bytes[10], bytes[11], bytes[12]]);
    let payload = &bytes[HEADER_SIZE..];
    if payload.len() != length {
        return Err(format!("length mismatch: header {length}, found {}", payload.len()));
    }
    if crc32fast::hash(payload) != crc {
        return Err("checksum mismatch".into());
    }
    let raw = if flags & FLAG_ZSTD != 0 {
        zstd::decode_all(payload).map_err(|e| e.to_string())?
    } else {
        payload.to_vec()
    };
    bincode::deserialize(&raw).map_err(|e| e.to_string())
}
