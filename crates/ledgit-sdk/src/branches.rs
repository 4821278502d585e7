//! Branches, forks and pull request merges.
//!
//! A branch is the newest Ref row for its name. Commits do not move refs,
//! so the default branch resolves to whichever is newer: its Ref row or the
//! repository's latest commit.

use std::collections::BTreeSet;

use ledgit_gate::Action;
use ledgit_ledger::names::{validate_branch_name, validate_repo_name};
use ledgit_ledger::{
    fold_latest, BountyStatus, Collaborator, Commit, Fork, IssueStatus, PullRequest,
    PullRequestStatus, RefRow, Repository, Stamped, SCHEMA_VERSION,
};
use ledgit_types::{Address, Amount, RecordId, Timestamp};
use serde::Serialize;
use tracing::{debug, error, info};

use crate::error::{SdkError, SdkResult};
use crate::markers::{match_reference, parse_closing_markers};
use crate::session::Session;

/// Current position of a branch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Branch {
    pub name: String,
    pub commit_id: RecordId,
    pub updated_at: Timestamp,
}

/// What a merge did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MergeOutcome {
    pub pull_request: PullRequest,
    /// The target branch after the merge.
    pub target: Branch,
    /// Issues closed by references in the description.
    pub closed_issues: Vec<RecordId>,
    /// Bounties transferred to the pull request's author.
    pub paid_bounties: Vec<(RecordId, Amount)>,
    /// Issues whose bounty transfer failed; they stay open and unpaid.
    pub failed_payouts: Vec<RecordId>,
}

fn writers_from(repo: &Repository, rows: Vec<Stamped<Collaborator>>) -> BTreeSet<Address> {
    let mut writers: BTreeSet<Address> = rows
        .into_iter()
        .filter(|r| r.record.repo_name == repo.name && r.author == repo.owner)
        .map(|r| r.record.user_address)
        .collect();
    writers.insert(repo.owner.clone());
    writers
}

impl Session {
    /// Addresses whose commit, ref and status rows count for a repository:
    /// the owner and anyone the owner ever granted collaborator access.
    pub(crate) async fn writers_ever(&self, repo: &Repository) -> BTreeSet<Address> {
        writers_from(repo, self.log.scan::<Collaborator>().await)
    }

    /// Like [`Session::writers_ever`], but a failed read is an error.
    pub(crate) async fn try_writers_ever(&self, repo: &Repository) -> SdkResult<BTreeSet<Address>> {
        Ok(writers_from(repo, self.log.scan_checked::<Collaborator>().await?))
    }

    /// Branches of a repository, read fresh, sorted by name.
    pub(crate) async fn resolve_branches(&self, repo: &Repository) -> Vec<Branch> {
        let writers = self.writers_ever(repo).await;
        let rows = self
            .log
            .scan::<RefRow>()
            .await
            .into_iter()
            .filter(|r| r.record.repo_name == repo.name && writers.contains(&r.author));
        let mut branches: Vec<Branch> = fold_latest(rows)
            .into_iter()
            .map(|s| Branch {
                name: s.record.ref_name,
                commit_id: s.record.commit_id,
                updated_at: s.record.timestamp,
            })
            .collect();

        let default = &self.config.repo.default_branch;
        if let Some(head) = self.head_commit(repo).await {
            let head_branch = Branch {
                name: default.clone(),
                commit_id: head.id,
                updated_at: head.timestamp,
            };
            match branches.iter_mut().find(|b| &b.name == default) {
                Some(b) if b.updated_at < head.timestamp => *b = head_branch,
                Some(_) => {}
                None => branches.push(head_branch),
            }
        }
        branches.sort_by(|a, b| a.name.cmp(&b.name));
        branches
    }

    pub async fn list_branches(&self, repo_name: &str) -> SdkResult<Vec<Branch>> {
        let repo = self.get_repo(repo_name).await?;
        self.authorize(&repo, Action::Read).await?;
        if let Some(hit) = self.queries.branches.get(&repo.name) {
            return Ok(hit);
        }
        let branches = self.resolve_branches(&repo).await;
        self.queries.branches.insert(repo.name.clone(), branches.clone());
        Ok(branches)
    }

    pub async fn resolve_branch(&self, repo_name: &str, name: &str) -> SdkResult<Branch> {
        let repo = self.get_repo(repo_name).await?;
        self.authorize(&repo, Action::Read).await?;
        self.branch_of(&repo, name).await
    }

    async fn branch_of(&self, repo: &Repository, name: &str) -> SdkResult<Branch> {
        self.resolve_branches(repo)
            .await
            .into_iter()
            .find(|b| b.name == name)
            .ok_or_else(|| SdkError::not_found("branch", format!("{}:{name}", repo.name)))
    }

    /// Point `name` at a commit of the repository, creating or moving it.
    pub async fn create_branch(
        &self,
        repo_name: &str,
        name: &str,
        commit_id: &RecordId,
    ) -> SdkResult<Branch> {
        validate_branch_name(name)?;
        self.ensure_tables().await;
        let repo = self.get_repo(repo_name).await?;
        self.authorize(&repo, Action::Write).await?;
        let commit = self
            .find_commit(commit_id)
            .await
            .filter(|c| c.repo_name == repo.name)
            .ok_or_else(|| SdkError::not_found("commit", format!("{commit_id} in {repo_name}")))?;
        let branch = self.move_ref(&repo, name, commit.id).await?;
        info!(repo = %repo.name, branch = %name, commit = %commit.id.short(), "branch updated");
        Ok(branch)
    }

    /// Append a Ref row that folds over the branch's current one.
    async fn move_ref(
        &self,
        repo: &Repository,
        name: &str,
        commit_id: RecordId,
    ) -> SdkResult<Branch> {
        let seen = self
            .resolve_branches(repo)
            .await
            .into_iter()
            .find(|b| b.name == name)
            .map(|b| b.updated_at)
            .unwrap_or_default();
        let row = RefRow {
            schema_version: SCHEMA_VERSION,
            repo_name: repo.name.clone(),
            ref_name: name.to_string(),
            commit_id,
            timestamp: self.stamp_after(seen),
        };
        self.log.append(self.identity(), &row).await?;
        self.queries.branches.invalidate(&repo.name);
        Ok(Branch {
            name: row.ref_name,
            commit_id,
            updated_at: row.timestamp,
        })
    }

    // ---- Forks ----

    /// Copy a repository under a new name owned by this session.
    ///
    /// The fork's first commit shares the source's tree manifest, so no
    /// content is uploaded. A private fork keeps using the source's key.
    pub async fn fork_repo(&self, source_name: &str, fork_name: &str) -> SdkResult<Repository> {
        validate_repo_name(fork_name)?;
        self.ensure_tables().await;
        let source = self.get_repo(source_name).await?;
        self.authorize(&source, Action::Read).await?;
        if self.find_repo(fork_name).await.is_some() {
            return Err(SdkError::Validation(format!(
                "repository {fork_name:?} already exists"
            )));
        }
        let encryption = if source.is_public() {
            None
        } else {
            self.write_key(&source)?;
            Some(source.key_context())
        };
        let default = self.config.repo.default_branch.clone();
        let head = match self.branch_of(&source, &default).await {
            Ok(branch) => self.find_commit(&branch.commit_id).await,
            Err(_) => None,
        };

        let repo = Repository {
            schema_version: SCHEMA_VERSION,
            name: fork_name.to_string(),
            description: source.description.clone(),
            owner: self.address(),
            created_at: self.stamp(),
            visibility: source.visibility,
            encryption,
        };
        self.log.append(self.identity(), &repo).await?;

        if let Some(head) = head {
            let commit = Commit {
                schema_version: SCHEMA_VERSION,
                id: RecordId::generate(),
                repo_name: repo.name.clone(),
                message: format!("Fork of {source_name} at {}", head.id.short()),
                author: self.address(),
                timestamp: self.stamp(),
                tree_id: head.tree_id.clone(),
                parent_commit_id: None,
            };
            self.log.append(self.identity(), &commit).await?;
            let main = RefRow {
                schema_version: SCHEMA_VERSION,
                repo_name: repo.name.clone(),
                ref_name: default,
                commit_id: commit.id,
                timestamp: self.stamp(),
            };
            self.log.append(self.identity(), &main).await?;
        }

        let fork = Fork {
            schema_version: SCHEMA_VERSION,
            original_repo_name: source.name.clone(),
            fork_repo_name: repo.name.clone(),
            owner: self.address(),
            timestamp: self.stamp(),
        };
        self.log.append(self.identity(), &fork).await?;
        self.queries.repos.clear();
        info!(source = %source.name, fork = %repo.name, "repository forked");
        Ok(repo)
    }

    /// Forks made from a repository, oldest first.
    pub async fn forks_of(&self, repo_name: &str) -> SdkResult<Vec<Fork>> {
        let repo = self.get_repo(repo_name).await?;
        self.authorize(&repo, Action::Read).await?;
        let rows = self
            .log
            .scan::<Fork>()
            .await
            .into_iter()
            .filter(|r| r.record.original_repo_name == repo.name && r.author == r.record.owner);
        Ok(fold_latest(rows).into_iter().map(|s| s.record).collect())
    }

    // ---- Merge ----

    /// Fast-forward the target branch to the source branch's commit and
    /// settle the issues the description closes.
    ///
    /// Bounties are paid from this session's identity to the pull request's
    /// author. A failed transfer is logged and leaves that issue open with
    /// its bounty active; the merge itself stands.
    pub async fn merge_pull_request(&self, pr_id: &RecordId) -> SdkResult<MergeOutcome> {
        self.ensure_tables().await;
        let pr = self.current_pull_request(pr_id).await?;
        let repo = self.get_repo(&pr.repo_name).await?;
        self.authorize(&repo, Action::Write).await?;
        if pr.status != PullRequestStatus::Open {
            return Err(SdkError::Validation(format!(
                "pull request {} is {:?}, not open",
                pr.id.short(),
                pr.status
            )));
        }
        let source = self.branch_of(&repo, &pr.source_branch).await?;

        let merged = PullRequest {
            status: PullRequestStatus::Merged,
            merged_by: Some(self.address()),
            merge_commit_id: Some(source.commit_id),
            timestamp: self.stamp_after(pr.timestamp),
            ..pr
        };
        self.log.append(self.identity(), &merged).await?;
        let target = self
            .move_ref(&repo, &merged.target_branch, source.commit_id)
            .await?;
        info!(
            repo = %repo.name,
            pr = %merged.id.short(),
            target = %target.name,
            commit = %source.commit_id.short(),
            "pull request merged"
        );

        let mut outcome = MergeOutcome {
            pull_request: merged,
            target,
            closed_issues: Vec::new(),
            paid_bounties: Vec::new(),
            failed_payouts: Vec::new(),
        };
        self.settle_closing_markers(&repo, &mut outcome).await?;
        Ok(outcome)
    }

    async fn settle_closing_markers(
        &self,
        repo: &Repository,
        outcome: &mut MergeOutcome,
    ) -> SdkResult<()> {
        let references = parse_closing_markers(&outcome.pull_request.description);
        if references.is_empty() {
            return Ok(());
        }
        let issues = self.current_issues(repo).await;
        let mut settled = BTreeSet::new();
        for reference in references {
            let Some(id) = match_reference(&reference, issues.iter().map(|i| &i.id)) else {
                debug!(repo = %repo.name, %reference, "closing reference matches no issue");
                continue;
            };
            if !settled.insert(id) {
                continue;
            }
            let Some(issue) = issues.iter().find(|i| i.id == id) else {
                continue;
            };
            let author = &outcome.pull_request.author;

            if let Some(amount) = issue.active_bounty() {
                match self.payments.transfer(self.identity(), author, amount).await {
                    Ok(receipt) => {
                        let mut paid = issue.clone();
                        paid.status = IssueStatus::Closed;
                        paid.bounty_status = Some(BountyStatus::Paid);
                        paid.timestamp = self.stamp_after(issue.timestamp);
                        self.log.append(self.identity(), &paid).await?;
                        info!(issue = %id.short(), %amount, to = %author.short(), receipt = %receipt.id, "bounty paid");
                        outcome.closed_issues.push(id);
                        outcome.paid_bounties.push((id, amount));
                    }
                    Err(e) => {
                        error!(issue = %id.short(), %amount, to = %author.short(), error = %e, "bounty transfer failed, issue left open");
                        outcome.failed_payouts.push(id);
                    }
                }
            } else if issue.status == IssueStatus::Open {
                let mut closed = issue.clone();
                closed.status = IssueStatus::Closed;
                closed.timestamp = self.stamp_after(issue.timestamp);
                self.log.append(self.identity(), &closed).await?;
                outcome.closed_issues.push(id);
            }
        }
        Ok(())
    }
}
