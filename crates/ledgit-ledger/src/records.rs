//! Row shapes for every table.
//!
//! Rows are JSON, camelCase, and read from a ledger that older and newer
//! clients also write to. Parsing therefore ignores unknown fields and
//! defaults every field that was added after the first version. Each row
//! records the `schemaVersion` it was written with.

use ledgit_crypto::KeyContext;
use ledgit_types::{Address, Amount, ContentId, RecordId, Role, Timestamp, Visibility};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::tables::TableKind;

/// Schema version written by this client.
pub const SCHEMA_VERSION: u32 = 2;

fn v1() -> u32 {
    1
}

fn yes() -> bool {
    true
}

/// A typed row of one table.
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const TABLE: TableKind;

    /// Identity of the entity the row describes. Rows sharing a key are
    /// versions of the same entity.
    type Key: Ord + Clone;

    fn key(&self) -> Self::Key;

    fn timestamp(&self) -> Timestamp;
}

// ----- repositories -----

/// A repository version.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "RepositoryRow")]
pub struct Repository {
    pub schema_version: u32,
    pub name: String,
    pub description: String,
    pub owner: Address,
    pub created_at: Timestamp,
    pub visibility: Visibility,
    /// Key context for private content; `None` means the repository's own.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encryption: Option<KeyContext>,
}

impl Repository {
    /// Which key encrypts this repository's private content.
    pub fn key_context(&self) -> KeyContext {
        self.encryption
            .clone()
            .unwrap_or_else(|| KeyContext::new(self.owner.clone(), self.name.clone()))
    }

    pub fn is_public(&self) -> bool {
        self.visibility.is_public()
    }
}

/// Wire shape accepted when reading repository rows. First-generation rows
/// carry `isPublic` and `timestamp` instead of `visibility` and `createdAt`.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RepositoryRow {
    #[serde(default = "v1")]
    schema_version: u32,
    name: String,
    #[serde(default)]
    description: String,
    owner: Address,
    #[serde(default, alias = "timestamp")]
    created_at: Timestamp,
    #[serde(default)]
    visibility: Option<Visibility>,
    #[serde(default)]
    is_public: Option<bool>,
    #[serde(default)]
    encryption: Option<KeyContext>,
}

impl From<RepositoryRow> for Repository {
    fn from(row: RepositoryRow) -> Self {
        let visibility = row
            .visibility
            .or(row.is_public.map(Visibility::from_public_flag))
            .unwrap_or(Visibility::Public);
        Self {
            schema_version: row.schema_version,
            name: row.name,
            description: row.description,
            owner: row.owner,
            created_at: row.created_at,
            visibility,
            encryption: row.encryption,
        }
    }
}

impl Record for Repository {
    const TABLE: TableKind = TableKind::Repos;
    type Key = String;

    fn key(&self) -> String {
        self.name.clone()
    }

    fn timestamp(&self) -> Timestamp {
        self.created_at
    }
}

// ----- commits and refs -----

/// One snapshot of a repository.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Commit {
    #[serde(default = "v1")]
    pub schema_version: u32,
    pub id: RecordId,
    pub repo_name: String,
    #[serde(default)]
    pub message: String,
    pub author: Address,
    #[serde(default)]
    pub timestamp: Timestamp,
    #[serde(alias = "treeTxId")]
    pub tree_id: ContentId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_commit_id: Option<RecordId>,
}

impl Record for Commit {
    const TABLE: TableKind = TableKind::Commits;
    type Key = RecordId;

    fn key(&self) -> RecordId {
        self.id
    }

    fn timestamp(&self) -> Timestamp {
        self.timestamp
    }
}

/// One position of a branch. The branch's value is its newest row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefRow {
    #[serde(default = "v1")]
    pub schema_version: u32,
    pub repo_name: String,
    pub ref_name: String,
    pub commit_id: RecordId,
    #[serde(default)]
    pub timestamp: Timestamp,
}

impl Record for RefRow {
    const TABLE: TableKind = TableKind::Refs;
    type Key = (String, String);

    fn key(&self) -> (String, String) {
        (self.repo_name.clone(), self.ref_name.clone())
    }

    fn timestamp(&self) -> Timestamp {
        self.timestamp
    }
}

// ----- access -----

/// Write access for a user on a repository. Revocation is a row with
/// `active = false`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collaborator {
    #[serde(default = "v1")]
    pub schema_version: u32,
    pub repo_name: String,
    pub user_address: Address,
    #[serde(default)]
    pub role: Role,
    #[serde(default = "yes")]
    pub active: bool,
    #[serde(default)]
    pub timestamp: Timestamp,
}

impl Record for Collaborator {
    const TABLE: TableKind = TableKind::Collaborators;
    type Key = (String, Address);

    fn key(&self) -> (String, Address) {
        (self.repo_name.clone(), self.user_address.clone())
    }

    fn timestamp(&self) -> Timestamp {
        self.timestamp
    }
}

/// Provenance of a fork.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fork {
    #[serde(default = "v1")]
    pub schema_version: u32,
    pub original_repo_name: String,
    pub fork_repo_name: String,
    pub owner: Address,
    #[serde(default)]
    pub timestamp: Timestamp,
}

impl Record for Fork {
    const TABLE: TableKind = TableKind::Forks;
    type Key = String;

    fn key(&self) -> String {
        self.fork_repo_name.clone()
    }

    fn timestamp(&self) -> Timestamp {
        self.timestamp
    }
}

// ----- issues and pull requests -----

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueStatus {
    #[default]
    Open,
    Closed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BountyStatus {
    Active,
    Paid,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    #[serde(default = "v1")]
    pub schema_version: u32,
    pub id: RecordId,
    pub repo_name: String,
    pub title: String,
    #[serde(default)]
    pub body: String,
    pub author: Address,
    #[serde(default)]
    pub status: IssueStatus,
    #[serde(default)]
    pub timestamp: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounty: Option<Amount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounty_status: Option<BountyStatus>,
    #[serde(default)]
    pub labels: Vec<String>,
}

impl Issue {
    /// The bounty amount, if one is pledged and unpaid.
    pub fn active_bounty(&self) -> Option<Amount> {
        match (self.bounty, self.bounty_status) {
            (Some(amount), Some(BountyStatus::Active)) if !amount.is_zero() => Some(amount),
            _ => None,
        }
    }
}

impl Record for Issue {
    const TABLE: TableKind = TableKind::Issues;
    type Key = RecordId;

    fn key(&self) -> RecordId {
        self.id
    }

    fn timestamp(&self) -> Timestamp {
        self.timestamp
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PullRequestStatus {
    #[default]
    Open,
    Closed,
    Merged,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullRequest {
    #[serde(default = "v1")]
    pub schema_version: u32,
    pub id: RecordId,
    pub repo_name: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub author: Address,
    pub source_branch: String,
    pub target_branch: String,
    #[serde(default)]
    pub status: PullRequestStatus,
    #[serde(default)]
    pub timestamp: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merged_by: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merge_commit_id: Option<RecordId>,
}

impl Record for PullRequest {
    const TABLE: TableKind = TableKind::PullRequests;
    type Key = RecordId;

    fn key(&self) -> RecordId {
        self.id
    }

    fn timestamp(&self) -> Timestamp {
        self.timestamp
    }
}

// ----- social -----

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    #[serde(default = "v1")]
    pub schema_version: u32,
    pub id: RecordId,
    /// Issue or pull request the comment belongs to.
    pub target_id: String,
    pub repo_name: String,
    pub author: Address,
    pub body: String,
    #[serde(default)]
    pub timestamp: Timestamp,
    #[serde(default)]
    pub edited: bool,
}

impl Record for Comment {
    const TABLE: TableKind = TableKind::Comments;
    type Key = RecordId;

    fn key(&self) -> RecordId {
        self.id
    }

    fn timestamp(&self) -> Timestamp {
        self.timestamp
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReactionTarget {
    Issue,
    Comment,
    #[serde(alias = "pullrequest")]
    Pr,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reaction {
    #[serde(default = "v1")]
    pub schema_version: u32,
    pub target_id: String,
    #[serde(alias = "targetType")]
    pub target_kind: ReactionTarget,
    pub emoji: String,
    pub user_address: Address,
    #[serde(default = "yes")]
    pub active: bool,
    #[serde(default)]
    pub timestamp: Timestamp,
}

impl Record for Reaction {
    const TABLE: TableKind = TableKind::Reactions;
    type Key = (String, Address, String);

    fn key(&self) -> (String, Address, String) {
        (
            self.target_id.clone(),
            self.user_address.clone(),
            self.emoji.clone(),
        )
    }

    fn timestamp(&self) -> Timestamp {
        self.timestamp
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Star {
    #[serde(default = "v1")]
    pub schema_version: u32,
    pub repo_name: String,
    pub user_address: Address,
    #[serde(default = "yes")]
    pub active: bool,
    #[serde(default)]
    pub timestamp: Timestamp,
}

impl Record for Star {
    const TABLE: TableKind = TableKind::Stars;
    type Key = (String, Address);

    fn key(&self) -> (String, Address) {
        (self.repo_name.clone(), self.user_address.clone())
    }

    fn timestamp(&self) -> Timestamp {
        self.timestamp
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Socials {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub twitter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    #[serde(default = "v1")]
    pub schema_version: u32,
    pub user_address: Address,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default, alias = "readmeTxId")]
    pub readme_content_id: Option<ContentId>,
    #[serde(default)]
    pub socials: Socials,
    #[serde(default)]
    pub timestamp: Timestamp,
}

impl Record for Profile {
    const TABLE: TableKind = TableKind::Profiles;
    type Key = Address;

    fn key(&self) -> Address {
        self.user_address.clone()
    }

    fn timestamp(&self) -> Timestamp {
        self.timestamp
    }
}

fn default_multiplier() -> f64 {
    FundingPool::DEFAULT_MATCHING_MULTIPLIER
}

/// The shared matching pool. A singleton: every row uses [`FundingPool::ID`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FundingPool {
    #[serde(default = "v1")]
    pub schema_version: u32,
    pub id: String,
    #[serde(default)]
    pub total_funds: Amount,
    #[serde(default = "default_multiplier")]
    pub matching_multiplier: f64,
    #[serde(default)]
    pub contributors: u64,
    /// Donor whose donation produced this row.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_donor: Option<Address>,
    #[serde(default)]
    pub timestamp: Timestamp,
}

impl FundingPool {
    pub const ID: &'static str = "global_qf_pool";
    pub const DEFAULT_MATCHING_MULTIPLIER: f64 = 1.5;

    /// The pool before any donation.
    pub fn empty() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            id: Self::ID.to_string(),
            total_funds: Amount::ZERO,
            matching_multiplier: Self::DEFAULT_MATCHING_MULTIPLIER,
            contributors: 0,
            last_donor: None,
            timestamp: Timestamp::zero(),
        }
    }
}

impl Record for FundingPool {
    const TABLE: TableKind = TableKind::FundingPool;
    type Key = String;

    fn key(&self) -> String {
        self.id.clone()
    }

    fn timestamp(&self) -> Timestamp {
        self.timestamp
    }
}
