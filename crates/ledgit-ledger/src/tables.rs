use ledgit_crypto::ContentHasher;
use ledgit_store::TableSchema;
use ledgit_types::TableId;

/// Every logical table ledgit writes to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TableKind {
    Repos,
    Commits,
    Refs,
    Collaborators,
    Forks,
    Issues,
    PullRequests,
    Comments,
    Reactions,
    Stars,
    Profiles,
    FundingPool,
}

impl TableKind {
    pub const ALL: [TableKind; 12] = [
        TableKind::Repos,
        TableKind::Commits,
        TableKind::Refs,
        TableKind::Collaborators,
        TableKind::Forks,
        TableKind::Issues,
        TableKind::PullRequests,
        TableKind::Comments,
        TableKind::Reactions,
        TableKind::Stars,
        TableKind::Profiles,
        TableKind::FundingPool,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Repos => "repos",
            Self::Commits => "commits",
            Self::Refs => "refs",
            Self::Collaborators => "collaborators",
            Self::Forks => "forks",
            Self::Issues => "issues",
            Self::PullRequests => "pull_requests",
            Self::Comments => "comments",
            Self::Reactions => "reactions",
            Self::Stars => "stars",
            Self::Profiles => "profiles",
            Self::FundingPool => "funding_pool",
        }
    }

    /// Declared columns and key column.
    pub fn schema(&self) -> TableSchema {
        let (columns, id_column): (&[&str], &str) = match self {
            Self::Repos => (
                &["name", "description", "owner", "createdAt", "visibility", "encryption"],
                "name",
            ),
            Self::Commits => (
                &["id", "repoName", "message", "author", "timestamp", "treeId", "parentCommitId"],
                "id",
            ),
            Self::Refs => (&["repoName", "refName", "commitId", "timestamp"], "refName"),
            Self::Collaborators => (
                &["repoName", "userAddress", "role", "active", "timestamp"],
                "userAddress",
            ),
            Self::Forks => (
                &["originalRepoName", "forkRepoName", "owner", "timestamp"],
                "forkRepoName",
            ),
            Self::Issues => (
                &[
                    "id", "repoName", "title", "body", "author", "status", "timestamp", "bounty",
                    "bountyStatus", "labels",
                ],
                "id",
            ),
            Self::PullRequests => (
                &[
                    "id", "repoName", "title", "description", "author", "sourceBranch",
                    "targetBranch", "status", "timestamp",
                ],
                "id",
            ),
            Self::Comments => (
                &["id", "targetId", "repoName", "author", "body", "timestamp"],
                "id",
            ),
            Self::Reactions => (
                &["id", "targetId", "targetKind", "emoji", "userAddress", "active", "timestamp"],
                "id",
            ),
            Self::Stars => (
                &["repoName", "userAddress", "active", "timestamp"],
                "repoName",
            ),
            Self::Profiles => (
                &["userAddress", "avatarUrl", "bio", "readmeContentId", "socials", "timestamp"],
                "userAddress",
            ),
            Self::FundingPool => (
                &["id", "totalFunds", "matchingMultiplier", "contributors", "timestamp"],
                "id",
            ),
        };
        TableSchema {
            name: self.name().to_string(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            id_column: id_column.to_string(),
        }
    }
}

/// Maps table kinds to ids under one namespace root.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableCatalog {
    root: String,
}

impl TableCatalog {
    pub fn new(root: impl Into<String>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn table_id(&self, kind: TableKind) -> TableId {
        ContentHasher::table_id(&self.root, kind.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn table_ids_are_distinct() {
        let catalog = TableCatalog::new("ledgit-v1");
        let ids: HashSet<_> = TableKind::ALL.iter().map(|k| catalog.table_id(*k)).collect();
        assert_eq!(ids.len(), TableKind::ALL.len());
    }

    #[test]
    fn key_column_is_declared() {
        for kind in TableKind::ALL {
            let schema = kind.schema();
            assert!(
                schema.columns.contains(&schema.id_column),
                "{} key column missing",
                kind.name()
            );
        }
    }

    #[test]
    fn roots_namespace_tables() {
        let a = TableCatalog::new("ledgit-v1").table_id(TableKind::Repos);
        let b = TableCatalog::new("staging").table_id(TableKind::Repos);
        assert_ne!(a, b);
    }
}
