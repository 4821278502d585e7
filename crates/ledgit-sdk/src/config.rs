//! Engine configuration, loaded from TOML.
//!
//! Every field has a default, so an empty file (or no file) is a valid
//! configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use ledgit_index::ScanOptions;
use ledgit_store::DEFAULT_CHUNK_SIZE;
use ledgit_types::Address;
use serde::{Deserialize, Serialize};

use crate::error::{SdkError, SdkResult};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub ledger: LedgerConfig,
    pub upload: UploadConfig,
    pub scan: ScanConfig,
    pub cache: CacheConfig,
    pub repo: RepoConfig,
    pub funding: FundingConfig,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Namespace for table-id derivation. Clients sharing tables must agree.
    pub root_id: String,
    /// Rows fetched per `read_rows` call while scanning.
    pub page_size: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            root_id: "ledgit-v1".into(),
            page_size: 500,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    pub max_attempts: u32,
    pub retry_delay_ms: u64,
    /// Uploads in flight at once within one commit.
    pub concurrency: usize,
    pub chunk_size: usize,
    pub max_file_size: u64,
}

impl UploadConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_delay_ms: 2000,
            concurrency: 4,
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_file_size: ledgit_index::scanner::DEFAULT_MAX_FILE_SIZE,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub ignore: Vec<String>,
    pub respect_gitignore: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        let defaults = ScanOptions::default();
        Self {
            ignore: defaults.ignore,
            respect_gitignore: defaults.respect_gitignore,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Directory for the durable content tier. Memory only when unset.
    pub dir: Option<PathBuf>,
    /// Disk entries larger than this are zstd-compressed.
    pub compress_threshold: usize,
    pub repos_ttl_secs: u64,
    pub commits_ttl_secs: u64,
    pub branches_ttl_secs: u64,
    /// Entries per query cache.
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: None,
            compress_threshold: 4096,
            repos_ttl_secs: 60,
            commits_ttl_secs: 30,
            branches_ttl_secs: 30,
            capacity: 100,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepoConfig {
    pub default_branch: String,
}

impl Default for RepoConfig {
    fn default() -> Self {
        Self {
            default_branch: "main".into(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FundingConfig {
    /// Vault that receives pool donations. Donations are only recorded when
    /// unset.
    pub pool_address: Option<Address>,
}

impl EngineConfig {
    pub fn from_toml_str(s: &str) -> SdkResult<Self> {
        let config: Self = toml::from_str(s).map_err(|e| SdkError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> SdkResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| SdkError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> SdkResult<String> {
        toml::to_string_pretty(self).map_err(|e| SdkError::Config(e.to_string()))
    }

    fn validate(&self) -> SdkResult<()> {
        if self.ledger.root_id.trim().is_empty() {
            return Err(SdkError::Config("ledger.root_id must not be empty".into()));
        }
        if self.upload.max_attempts == 0 {
            return Err(SdkError::Config("upload.max_attempts must be at least 1".into()));
        }
        if self.upload.chunk_size == 0 {
            return Err(SdkError::Config("upload.chunk_size must be positive".into()));
        }
        Ok(())
    }

    pub fn scan_options(&self) -> ScanOptions {
        ScanOptions {
            ignore: self.scan.ignore.clone(),
            respect_gitignore: self.scan.respect_gitignore,
            max_file_size: self.upload.max_file_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let c = EngineConfig::default();
        assert_eq!(c.ledger.root_id, "ledgit-v1");
        assert_eq!(c.ledger.page_size, 500);
        assert_eq!(c.upload.max_attempts, 3);
        assert_eq!(c.upload.retry_delay(), Duration::from_secs(2));
        assert_eq!(c.upload.chunk_size, 800);
        assert_eq!(c.upload.max_file_size, 10 * 1024 * 1024);
        assert!(c.scan.ignore.iter().any(|p| p == "node_modules"));
        assert_eq!(c.cache.repos_ttl_secs, 60);
        assert_eq!(c.repo.default_branch, "main");
        assert!(c.funding.pool_address.is_none());
    }

    #[test]
    fn empty_toml_is_default() {
        assert_eq!(EngineConfig::from_toml_str("").unwrap(), EngineConfig::default());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let c = EngineConfig::from_toml_str(
            r#"
            [upload]
            retry_delay_ms = 0
            concurrency = 8

            [repo]
            default_branch = "trunk"
            "#,
        )
        .unwrap();
        assert_eq!(c.upload.retry_delay_ms, 0);
        assert_eq!(c.upload.concurrency, 8);
        assert_eq!(c.upload.max_attempts, 3);
        assert_eq!(c.repo.default_branch, "trunk");
        assert_eq!(c.ledger.page_size, 500);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let err = EngineConfig::from_toml_str("[upload]\nmax_attempts = 0\n").unwrap_err();
        assert!(matches!(err, SdkError::Config(_)));
        assert!(EngineConfig::from_toml_str("[ledger\n").is_err());
    }

    #[test]
    fn toml_round_trip() {
        let mut c = EngineConfig::default();
        c.cache.dir = Some(PathBuf::from("/tmp/ledgit-cache"));
        let text = c.to_toml_string().unwrap();
        assert_eq!(EngineConfig::from_toml_str(&text).unwrap(), c);
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledgit.toml");
        std::fs::write(&path, "[ledger]\nroot_id = \"test-net\"\n").unwrap();
        assert_eq!(EngineConfig::load(&path).unwrap().ledger.root_id, "test-net");
        assert!(matches!(
            EngineConfig::load(&dir.path().join("missing.toml")),
            Err(SdkError::Io { .. })
        ));
    }
}
