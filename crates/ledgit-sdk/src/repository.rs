//! Repository & tree engine: repositories, commits, checkout, status, diff.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use futures::stream::{self, StreamExt};
use ledgit_crypto::{ContentHash, RepoKey};
use ledgit_diff::{diff_blobs, diff_trees, TreeChange};
use ledgit_gate::Action;
use ledgit_index::{HashMode, LocalIndex, ScanReport, Scanner, TreeStatus};
use ledgit_ledger::names::validate_repo_name;
use ledgit_ledger::{
    checkout_path, fold_latest, tree_path, Commit, FileTree, Repository, Stamped, TreeEntry,
    SCHEMA_VERSION,
};
use ledgit_types::{Address, ContentId, RecordId, Visibility};
use tracing::{debug, info, warn};

use crate::commit::{
    ChangeSet, CheckoutReport, CommitOutcome, FileChange, FileDiff, RawFile, RepoDiff,
};
use crate::content::{mime_for_path, FileContent};
use crate::error::{SdkError, SdkResult};
use crate::session::Session;

fn hash_mode(key: Option<&RepoKey>) -> HashMode<'_> {
    match key {
        Some(key) => HashMode::Keyed(key),
        None => HashMode::Plain,
    }
}

/// Whether `bytes` is the content an entry recorded, under either hashing.
fn entry_matches(entry: &TreeEntry, bytes: &[u8], key: Option<&RepoKey>) -> bool {
    HashMode::Plain.hash(bytes) == entry.content_hash
        || key.is_some_and(|k| HashMode::Keyed(k).hash(bytes) == entry.content_hash)
}

/// Newest-first commits of `repo` whose rows were signed by a writer
/// naming themselves as author.
fn fold_commits(
    repo: &Repository,
    writers: &BTreeSet<Address>,
    rows: Vec<Stamped<Commit>>,
) -> Vec<Commit> {
    let rows = rows.into_iter().filter(|r| {
        r.record.repo_name == repo.name && r.author == r.record.author && writers.contains(&r.author)
    });
    let mut commits: Vec<Commit> = fold_latest(rows).into_iter().map(|s| s.record).collect();
    commits.reverse();
    commits
}

impl Session {
    // ---- Repositories ----

    pub async fn create_repo(
        &self,
        name: &str,
        description: &str,
        visibility: Visibility,
    ) -> SdkResult<Repository> {
        validate_repo_name(name)?;
        self.ensure_tables().await;
        if self.find_repo(name).await.is_some() {
            return Err(SdkError::Validation(format!("repository {name:?} already exists")));
        }
        let repo = Repository {
            schema_version: SCHEMA_VERSION,
            name: name.to_string(),
            description: description.to_string(),
            owner: self.address(),
            created_at: self.stamp(),
            visibility,
            encryption: None,
        };
        self.log.append(self.identity(), &repo).await?;
        self.queries.repos.clear();
        info!(repo = %name, %visibility, "repository created");
        Ok(repo)
    }

    /// Repositories this session can read, newest first.
    pub async fn list_repos(&self) -> SdkResult<Vec<Repository>> {
        let all = match self.queries.repos.get(&()) {
            Some(hit) => hit,
            None => {
                let repos = self.resolve_repos().await;
                self.queries.repos.insert((), repos.clone());
                repos
            }
        };
        let mut readable = Vec::with_capacity(all.len());
        for repo in all {
            if repo.is_public() || self.allows(&repo, Action::Read).await {
                readable.push(repo);
            }
        }
        Ok(readable)
    }

    pub async fn repos_owned_by(&self, owner: &Address) -> SdkResult<Vec<Repository>> {
        Ok(self
            .list_repos()
            .await?
            .into_iter()
            .filter(|r| &r.owner == owner)
            .collect())
    }

    /// Make a repository public or private. Owner only.
    ///
    /// Content already committed keeps the form it was stored in; the next
    /// commit stores every file in the new form.
    pub async fn set_visibility(
        &self,
        repo_name: &str,
        visibility: Visibility,
    ) -> SdkResult<Repository> {
        self.ensure_tables().await;
        let current = self.get_repo(repo_name).await?;
        self.authorize(&current, Action::ChangeVisibility).await?;
        if current.visibility == visibility {
            return Ok(current);
        }
        let repo = Repository {
            schema_version: SCHEMA_VERSION,
            visibility,
            created_at: self.stamp_after(current.created_at),
            ..current
        };
        self.log.append(self.identity(), &repo).await?;
        self.queries.repos.clear();
        info!(repo = %repo_name, %visibility, "visibility changed");
        Ok(repo)
    }

    // ---- Commits ----

    /// Record a new snapshot: the previous tree with `changes` applied.
    ///
    /// Files whose content hash equals the previous tree's entry keep that
    /// entry's content id and are not uploaded. A file whose upload fails
    /// every attempt is left out and reported in
    /// [`CommitOutcome::skipped`]; the commit still goes ahead. The tree
    /// manifest and the commit row are written once all uploads have
    /// settled.
    pub async fn commit(
        &self,
        repo_name: &str,
        message: &str,
        changes: ChangeSet,
    ) -> SdkResult<CommitOutcome> {
        if message.trim().is_empty() {
            return Err(SdkError::Validation("commit message must not be empty".into()));
        }
        if changes.is_empty() {
            return Err(SdkError::Validation(format!("nothing to commit to {repo_name:?}")));
        }
        changes.validate()?;

        self.ensure_tables().await;
        let repo = self.get_repo(repo_name).await?;
        self.authorize(&repo, Action::Write).await?;
        let key = self.write_key(&repo)?;
        let read_key = key.clone().or_else(|| self.repo_key(&repo));

        let parent = self.try_head_commit(&repo).await?;
        let mut tree = match &parent {
            Some(c) => self.load_tree(&c.tree_id, read_key.as_ref()).await?,
            None => FileTree::new(),
        };

        let mode = hash_mode(key.as_ref());
        let mut reused = Vec::new();
        let mut pending = Vec::new();
        for FileChange { path, content } in changes.files {
            let hash = mode.hash(&content);
            if tree.get(&path).is_some_and(|e| e.content_hash == hash) {
                reused.push(path);
                continue;
            }
            if let Some(content_id) = self.uploaded_id(&hash) {
                tree.insert(path.clone(), TreeEntry { content_id, content_hash: hash });
                reused.push(path);
                continue;
            }
            pending.push((path, content, hash));
        }

        let key_ref = key.as_ref();
        let results: Vec<(String, ContentHash, Option<ContentId>)> = stream::iter(pending)
            .map(|(path, content, hash)| async move {
                let id = self.upload_with_retry(&path, &content, &hash, key_ref).await;
                (path, hash, id)
            })
            .buffer_unordered(self.config.upload.concurrency.max(1))
            .collect()
            .await;

        let mut uploaded = Vec::new();
        let mut skipped = Vec::new();
        for (path, content_hash, id) in results {
            match id {
                Some(content_id) => {
                    tree.insert(path.clone(), TreeEntry { content_id, content_hash });
                    uploaded.push(path);
                }
                None => skipped.push(path),
            }
        }
        let mut deleted = Vec::new();
        for path in changes.deletions {
            if tree.remove(&path).is_some() {
                deleted.push(path);
            } else {
                debug!(%path, "deletion of untracked path ignored");
            }
        }

        let tree_id = self.upload_tree(&tree, key.as_ref()).await?;
        let commit = Commit {
            schema_version: SCHEMA_VERSION,
            id: RecordId::generate(),
            repo_name: repo.name.clone(),
            message: message.to_string(),
            author: self.address(),
            timestamp: self.stamp_after(parent.as_ref().map(|c| c.timestamp).unwrap_or_default()),
            tree_id,
            parent_commit_id: parent.as_ref().map(|c| c.id),
        };
        self.log.append(self.identity(), &commit).await?;
        self.queries.commits.invalidate(&repo.name);
        self.queries.branches.invalidate(&repo.name);

        uploaded.sort();
        reused.sort();
        skipped.sort();
        deleted.sort();
        info!(
            repo = %repo.name,
            commit = %commit.id.short(),
            uploaded = uploaded.len(),
            reused = reused.len(),
            skipped = skipped.len(),
            "commit recorded"
        );
        Ok(CommitOutcome {
            commit,
            uploaded,
            reused,
            skipped,
            deleted,
        })
    }

    /// Commit a working directory as it is: every scanned file is written,
    /// and paths of the previous tree that are gone from disk are deleted.
    pub async fn commit_directory(
        &self,
        repo_name: &str,
        message: &str,
        dir: &Path,
    ) -> SdkResult<CommitOutcome> {
        let report = self.scan(dir).await?;
        let refused: BTreeSet<String> = report
            .skipped
            .iter()
            .filter_map(|s| s.path.strip_prefix(dir).ok().and_then(tree_path))
            .collect();

        let mut changes = ChangeSet::new();
        for file in &report.files {
            changes = changes.with_file(file.path.clone(), file.read()?);
        }
        let repo = self.get_repo(repo_name).await?;
        if let Some(head) = self.try_head_commit(&repo).await? {
            let tree = self.load_tree(&head.tree_id, self.repo_key(&repo).as_ref()).await?;
            let on_disk: BTreeSet<&str> = report.paths().collect();
            for path in tree.paths() {
                if !on_disk.contains(path.as_str()) && !refused.contains(path) {
                    changes = changes.with_deletion(path.clone());
                }
            }
        }

        let mut outcome = self.commit(repo_name, message, changes).await?;
        outcome.skipped.extend(refused);
        outcome.skipped.sort();
        Ok(outcome)
    }

    /// Commits of a repository, newest first, read fresh.
    ///
    /// A row counts when it is signed by the commit's named author and that
    /// author is the owner or someone the owner let write.
    pub(crate) async fn repo_commits(&self, repo: &Repository) -> Vec<Commit> {
        let writers = self.writers_ever(repo).await;
        fold_commits(repo, &writers, self.log.scan::<Commit>().await)
    }

    /// Like [`Session::repo_commits`], but a failed read is an error rather
    /// than an empty history.
    async fn try_repo_commits(&self, repo: &Repository) -> SdkResult<Vec<Commit>> {
        let writers = self.try_writers_ever(repo).await?;
        let rows = self.log.scan_checked::<Commit>().await?;
        Ok(fold_commits(repo, &writers, rows))
    }

    pub(crate) async fn head_commit(&self, repo: &Repository) -> Option<Commit> {
        self.repo_commits(repo).await.into_iter().next()
    }

    /// The commit new work builds on. Unlike [`Session::head_commit`] this
    /// never mistakes an unreadable history for an empty one.
    async fn try_head_commit(&self, repo: &Repository) -> SdkResult<Option<Commit>> {
        Ok(self.try_repo_commits(repo).await?.into_iter().next())
    }

    /// Commit history, newest first.
    pub async fn log(&self, repo_name: &str) -> SdkResult<Vec<Commit>> {
        let repo = self.get_repo(repo_name).await?;
        self.authorize(&repo, Action::Read).await?;
        if let Some(hit) = self.queries.commits.get(&repo.name) {
            return Ok(hit);
        }
        let commits = self.repo_commits(&repo).await;
        self.queries.commits.insert(repo.name.clone(), commits.clone());
        Ok(commits)
    }

    pub async fn latest_commit(&self, repo_name: &str) -> SdkResult<Option<Commit>> {
        let repo = self.get_repo(repo_name).await?;
        self.authorize(&repo, Action::Read).await?;
        Ok(self.head_commit(&repo).await)
    }

    /// A commit by id, provided its signer may write to its repository.
    pub(crate) async fn find_commit(&self, id: &RecordId) -> Option<Commit> {
        let candidates: Vec<Commit> = self
            .log
            .scan::<Commit>()
            .await
            .into_iter()
            .filter(|r| r.record.id == *id && r.author == r.record.author)
            .map(|r| r.record)
            .collect();
        for commit in candidates {
            let Some(repo) = self.find_repo(&commit.repo_name).await else {
                continue;
            };
            if self.writers_ever(&repo).await.contains(&commit.author) {
                return Some(commit);
            }
            debug!(commit = %commit.id.short(), repo = %repo.name, "ignoring commit from a non-writer");
        }
        None
    }

    pub async fn get_commit(&self, id: &RecordId) -> SdkResult<Commit> {
        let commit = self
            .find_commit(id)
            .await
            .ok_or_else(|| SdkError::not_found("commit", id))?;
        let repo = self.get_repo(&commit.repo_name).await?;
        self.authorize(&repo, Action::Read).await?;
        Ok(commit)
    }

    /// Find a commit of `repo_name` by full id or unambiguous prefix.
    pub async fn resolve_commit(&self, repo_name: &str, prefix: &str) -> SdkResult<Commit> {
        let mut matches: Vec<Commit> = self
            .log(repo_name)
            .await?
            .into_iter()
            .filter(|c| c.id.matches_prefix(prefix))
            .collect();
        match matches.len() {
            1 => Ok(matches.remove(0)),
            0 => Err(SdkError::not_found("commit", prefix)),
            n => Err(SdkError::Validation(format!(
                "commit prefix {prefix:?} is ambiguous ({n} matches)"
            ))),
        }
    }

    /// Commit rows `author` signed, in repositories `author` may write to.
    async fn signed_commits(&self, author: &Address) -> Vec<Stamped<Commit>> {
        let rows: Vec<Stamped<Commit>> = self
            .log
            .scan::<Commit>()
            .await
            .into_iter()
            .filter(|r| &r.author == author && &r.record.author == author)
            .collect();
        let mut allowed: BTreeMap<String, bool> = BTreeMap::new();
        let mut kept = Vec::with_capacity(rows.len());
        for row in rows {
            let ok = match allowed.get(&row.record.repo_name) {
                Some(ok) => *ok,
                None => {
                    let ok = match self.find_repo(&row.record.repo_name).await {
                        Some(repo) => self.writers_ever(&repo).await.contains(author),
                        None => false,
                    };
                    allowed.insert(row.record.repo_name.clone(), ok);
                    ok
                }
            };
            if ok {
                kept.push(row);
            }
        }
        kept
    }

    /// Commits by one author across every repository this session can read.
    pub async fn commits_by(&self, author: &Address) -> SdkResult<Vec<Commit>> {
        let readable: BTreeSet<String> =
            self.list_repos().await?.into_iter().map(|r| r.name).collect();
        let rows = self
            .signed_commits(author)
            .await
            .into_iter()
            .filter(|r| readable.contains(&r.record.repo_name));
        let mut commits: Vec<Commit> = fold_latest(rows).into_iter().map(|s| s.record).collect();
        commits.reverse();
        Ok(commits)
    }

    /// Commits per UTC day by one author.
    pub async fn contribution_activity(
        &self,
        author: &Address,
    ) -> SdkResult<BTreeMap<NaiveDate, usize>> {
        let mut days = BTreeMap::new();
        for row in self.signed_commits(author).await {
            if let Some(day) = row.record.timestamp.utc_day() {
                *days.entry(day).or_insert(0) += 1;
            }
        }
        Ok(days)
    }

    // ---- Trees and files ----

    /// The tree of a commit. Requires read access and, for private
    /// repositories, the repository key.
    pub async fn tree(&self, commit_id: &RecordId) -> SdkResult<FileTree> {
        let commit = self.get_commit(commit_id).await?;
        let repo = self.get_repo(&commit.repo_name).await?;
        self.load_commit_tree(&repo, &commit).await.map(|(tree, _)| tree)
    }

    async fn load_commit_tree(
        &self,
        repo: &Repository,
        commit: &Commit,
    ) -> SdkResult<(FileTree, bool)> {
        let key = self.repo_key(repo);
        self.load_tree_sealed(&commit.tree_id, key.as_ref())
            .await
            .map_err(|e| match e {
                SdkError::Decryption { .. } => SdkError::KeyUnavailable {
                    repo: repo.name.clone(),
                },
                other => other,
            })
    }

    /// One file of a commit. Private content this session cannot open comes
    /// back as [`FileContent::AccessDenied`] instead of an error.
    pub async fn read_file(&self, commit_id: &RecordId, path: &str) -> SdkResult<FileContent> {
        let commit = self
            .find_commit(commit_id)
            .await
            .ok_or_else(|| SdkError::not_found("commit", commit_id))?;
        let repo = self.get_repo(&commit.repo_name).await?;
        if !self.allows(&repo, Action::Read).await {
            return Ok(FileContent::AccessDenied);
        }
        let key = self.repo_key(&repo);
        let tree = match self.load_tree(&commit.tree_id, key.as_ref()).await {
            Ok(tree) => tree,
            Err(SdkError::Decryption { .. }) => return Ok(FileContent::AccessDenied),
            Err(e) => return Err(e),
        };
        let entry = tree
            .get(path)
            .ok_or_else(|| SdkError::not_found("file", format!("{path} at {}", commit.id.short())))?;
        self.read_content(&entry.content_id, key.as_ref()).await
    }

    /// A file of a public repository's latest commit, with its MIME type.
    pub async fn raw_file(&self, repo_name: &str, path: &str) -> SdkResult<RawFile> {
        let repo = self.get_repo(repo_name).await?;
        if !repo.is_public() {
            return Err(SdkError::PermissionDenied(format!(
                "raw access to private repository {repo_name:?}"
            )));
        }
        let head = self
            .head_commit(&repo)
            .await
            .ok_or_else(|| SdkError::not_found("commit", format!("any in {repo_name}")))?;
        let tree = self.load_tree(&head.tree_id, None).await?;
        let entry = tree
            .get(path)
            .ok_or_else(|| SdkError::not_found("file", format!("{repo_name}/{path}")))?;
        let bytes = self.read_blob(&entry.content_id, None).await?;
        Ok(RawFile {
            path: path.to_string(),
            mime: mime_for_path(path),
            bytes,
        })
    }

    // ---- Working directories ----

    /// Write every file of a commit under `out_dir`. Entries that cannot be
    /// retrieved or do not match their recorded hash are logged and
    /// skipped.
    pub async fn checkout(&self, commit_id: &RecordId, out_dir: &Path) -> SdkResult<CheckoutReport> {
        let commit = self.get_commit(commit_id).await?;
        let repo = self.get_repo(&commit.repo_name).await?;
        let (tree, _) = self.load_commit_tree(&repo, &commit).await?;
        let key = self.repo_key(&repo);

        let mut written = Vec::new();
        let mut skipped = Vec::new();
        for (path, entry) in tree.iter() {
            let Some(target) = checkout_path(out_dir, path) else {
                warn!(%path, "refusing to write entry outside the checkout directory");
                skipped.push(path.clone());
                continue;
            };
            let bytes = match self.read_blob(&entry.content_id, key.as_ref()).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!(%path, content = %entry.content_id, error = %e, "entry unavailable, skipping");
                    skipped.push(path.clone());
                    continue;
                }
            };
            if !entry_matches(entry, &bytes, key.as_ref()) {
                warn!(%path, content = %entry.content_id, "content does not match recorded hash, skipping");
                skipped.push(path.clone());
                continue;
            }
            write_file(&target, &bytes).await?;
            written.push(path.clone());
        }
        info!(
            repo = %repo.name,
            commit = %commit.id.short(),
            written = written.len(),
            skipped = skipped.len(),
            "checkout complete"
        );
        Ok(CheckoutReport {
            commit,
            written,
            skipped,
        })
    }

    /// Check out a repository's latest commit.
    pub async fn clone_repo(&self, repo_name: &str, out_dir: &Path) -> SdkResult<CheckoutReport> {
        let head = self
            .latest_commit(repo_name)
            .await?
            .ok_or_else(|| SdkError::not_found("commit", format!("any in {repo_name}")))?;
        self.checkout(&head.id, out_dir).await
    }

    /// Compare a working directory against a repository's latest commit.
    pub async fn status(&self, repo_name: &str, dir: &Path) -> SdkResult<TreeStatus> {
        let repo = self.get_repo(repo_name).await?;
        self.authorize(&repo, Action::Read).await?;
        match self.head_commit(&repo).await {
            Some(head) => self.status_against(&repo, &head, dir).await,
            None => {
                let key = self.write_key(&repo)?;
                let index = self.index_dir(dir, key).await?;
                Ok(index.status(&BTreeMap::new()))
            }
        }
    }

    /// Compare a working directory against one commit's tree.
    pub async fn status_at(&self, commit_id: &RecordId, dir: &Path) -> SdkResult<TreeStatus> {
        let commit = self.get_commit(commit_id).await?;
        let repo = self.get_repo(&commit.repo_name).await?;
        self.status_against(&repo, &commit, dir).await
    }

    async fn status_against(
        &self,
        repo: &Repository,
        commit: &Commit,
        dir: &Path,
    ) -> SdkResult<TreeStatus> {
        let (tree, sealed) = self.load_commit_tree(repo, commit).await?;
        let key = if sealed { self.repo_key(repo) } else { None };
        let index = self.index_dir(dir, key).await?;
        Ok(index.status(&tree.hashes()))
    }

    async fn scan(&self, dir: &Path) -> SdkResult<ScanReport> {
        let scanner = Scanner::new(self.config.scan_options());
        let root = dir.to_path_buf();
        let report = tokio::task::spawn_blocking(move || scanner.scan(&root))
            .await
            .map_err(|e| join_error(dir, e))??;
        Ok(report)
    }

    async fn index_dir(&self, dir: &Path, key: Option<RepoKey>) -> SdkResult<LocalIndex> {
        let report = self.scan(dir).await?;
        let index = tokio::task::spawn_blocking(move || {
            LocalIndex::build(&report, hash_mode(key.as_ref()))
        })
        .await
        .map_err(|e| join_error(dir, e))??;
        Ok(index)
    }

    // ---- Diff ----

    /// Changes between two commits of one repository, with line diffs for
    /// added, deleted and modified files.
    pub async fn diff(
        &self,
        repo_name: &str,
        from: &RecordId,
        to: &RecordId,
    ) -> SdkResult<RepoDiff> {
        let repo = self.get_repo(repo_name).await?;
        self.authorize(&repo, Action::Read).await?;
        let mut trees = Vec::with_capacity(2);
        for id in [from, to] {
            let commit = self
                .find_commit(id)
                .await
                .filter(|c| c.repo_name == repo.name)
                .ok_or_else(|| SdkError::not_found("commit", format!("{id} in {repo_name}")))?;
            trees.push(self.load_commit_tree(&repo, &commit).await?.0);
        }
        let (old, new) = (&trees[0], &trees[1]);
        let tree = diff_trees(Some(old), new);
        let key = self.repo_key(&repo);

        let mut files = Vec::with_capacity(tree.len());
        for change in &tree.changes {
            let (old_id, new_id) = match change {
                TreeChange::Added { new_id, .. } => (None, Some(new_id)),
                TreeChange::Deleted { old_id, .. } => (Some(old_id), None),
                TreeChange::Modified { old_id, new_id, .. } => (Some(old_id), Some(new_id)),
                TreeChange::Renamed { .. } => (None, None),
            };
            let lines = if old_id.is_none() && new_id.is_none() {
                None
            } else {
                let old_bytes = self.body_or_empty(old_id, key.as_ref()).await;
                let new_bytes = self.body_or_empty(new_id, key.as_ref()).await;
                match (old_bytes, new_bytes) {
                    (Some(a), Some(b)) => Some(diff_blobs(&a, &b)),
                    _ => None,
                }
            };
            files.push(FileDiff {
                change: change.clone(),
                lines,
            });
        }
        Ok(RepoDiff { tree, files })
    }

    /// A body for diffing: empty for a missing side, `None` if unreadable.
    async fn body_or_empty(&self, id: Option<&ContentId>, key: Option<&RepoKey>) -> Option<Vec<u8>> {
        let Some(id) = id else {
            return Some(Vec::new());
        };
        match self.read_blob(id, key).await {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                warn!(content = %id, error = %e, "cannot read content for diff");
                None
            }
        }
    }
}

async fn write_file(target: &Path, bytes: &[u8]) -> SdkResult<()> {
    let io = |source| SdkError::Io {
        path: target.to_path_buf(),
        source,
    };
    if let Some(parent) = target.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(io)?;
    }
    tokio::fs::write(target, bytes).await.map_err(io)
}

fn join_error(dir: &Path, e: tokio::task::JoinError) -> SdkError {
    SdkError::Io {
        path: PathBuf::from(dir),
        source: std::io::Error::other(e),
    }
}
