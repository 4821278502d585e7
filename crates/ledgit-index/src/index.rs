//! Hashes of a scanned working directory, keyed by tree path.

use std::collections::BTreeMap;

use ledgit_crypto::ContentHash;

use crate::entry::{HashMode, IndexEntry};
use crate::error::IndexResult;
use crate::scanner::ScanReport;
use crate::status::{classify, TreeStatus};

/// The local side of a status comparison.
#[derive(Clone, Debug, Default)]
pub struct LocalIndex {
    entries: BTreeMap<String, IndexEntry>,
}

impl LocalIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read and hash every file of a scan.
    pub fn build(report: &ScanReport, mode: HashMode<'_>) -> IndexResult<Self> {
        let mut index = Self::new();
        for file in &report.files {
            let data = file.read()?;
            index.entries.insert(
                file.path.clone(),
                IndexEntry {
                    path: file.path.clone(),
                    abs_path: file.abs_path.clone(),
                    size: file.size,
                    hash: mode.hash(&data),
                },
            );
        }
        Ok(index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, path: &str) -> Option<&IndexEntry> {
        self.entries.get(path)
    }

    pub fn entries(&self) -> impl Iterator<Item = &IndexEntry> {
        self.entries.values()
    }

    pub fn hashes(&self) -> BTreeMap<String, ContentHash> {
        self.entries
            .iter()
            .map(|(path, entry)| (path.clone(), entry.hash.clone()))
            .collect()
    }

    /// Compare against the hashes of a committed tree.
    pub fn status(&self, committed: &BTreeMap<String, ContentHash>) -> TreeStatus {
        classify(&self.hashes(), committed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::Scanner;
    use ledgit_crypto::RepoKey;
    use std::fs;

    #[test]
    fn build_hashes_every_scanned_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), b"alpha").unwrap();
        fs::create_dir(dir.path().join("d")).unwrap();
        fs::write(dir.path().join("d/b.txt"), b"beta").unwrap();

        let report = Scanner::default().scan(dir.path()).unwrap();
        let index = LocalIndex::build(&report, HashMode::Plain).unwrap();
        assert_eq!(index.len(), 2);
        assert_eq!(
            index.get("a.txt").unwrap().hash,
            HashMode::Plain.hash(b"alpha")
        );
        assert_eq!(index.get("d/b.txt").unwrap().size, 4);
    }

    #[test]
    fn status_against_own_hashes_is_clean() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), b"alpha").unwrap();
        let report = Scanner::default().scan(dir.path()).unwrap();
        let key = RepoKey::from_bytes([3u8; 32]);
        let index = LocalIndex::build(&report, HashMode::Keyed(&key)).unwrap();
        assert!(index.status(&index.hashes()).is_clean());
        assert!(!index.status(&BTreeMap::new()).is_clean());
    }
}
