//! Issues, pull requests, comments, reactions, stars, profiles and the
//! funding pool.

use std::collections::{BTreeMap, BTreeSet};

use ledgit_gate::Action;
use ledgit_ledger::names::validate_branch_name;
use ledgit_ledger::{
    fold_latest, latest, BountyStatus, Comment, FundingPool, Issue, IssueStatus, Profile,
    PullRequest, PullRequestStatus, Reaction, ReactionTarget, Record, Repository, Socials,
    Stamped, Star, SCHEMA_VERSION,
};
use ledgit_types::{Address, Amount, RecordId};
use serde::Serialize;
use tracing::info;

use crate::error::{SdkError, SdkResult};
use crate::session::Session;

/// Emoji a reaction may use.
pub const REACTION_EMOJI: [&str; 8] = ["👍", "👎", "❤️", "🚀", "👀", "🎉", "😄", "😕"];

/// Reactions of one emoji on a target.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactionSummary {
    pub emoji: String,
    pub count: usize,
    pub reacted_by_me: bool,
}

/// Fields to change on the caller's profile. `None` keeps the current value.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
    /// Markdown stored as content; the profile keeps its content id.
    pub readme: Option<String>,
    pub socials: Option<Socials>,
}

/// Rows of entities that one address creates and that writers may later
/// update, in append order.
///
/// The first row for a key fixes its creator: it counts only if attested by
/// the address `creator` names. Later rows count if attested by the creator
/// or by one of `writers`, and only if they keep the same creator.
fn authored_rows<R: Record>(
    mut rows: Vec<Stamped<R>>,
    creator: impl Fn(&R) -> &Address,
    writers: &BTreeSet<Address>,
) -> Vec<Stamped<R>> {
    rows.sort_by_key(|r| r.seq);
    let mut creators: BTreeMap<R::Key, Address> = BTreeMap::new();
    let mut valid = Vec::with_capacity(rows.len());
    for row in rows {
        let key = row.record.key();
        let claimed = creator(&row.record);
        let counts = match creators.get(&key) {
            None => &row.author == claimed,
            Some(first) => {
                first == claimed && (&row.author == first || writers.contains(&row.author))
            }
        };
        if counts {
            creators.entry(key).or_insert_with(|| row.author.clone());
            valid.push(row);
        }
    }
    valid
}

fn newest_first<R: Record>(rows: Vec<Stamped<R>>) -> Vec<R> {
    let mut out: Vec<R> = fold_latest(rows).into_iter().map(|s| s.record).collect();
    out.reverse();
    out
}

/// Current state of authored entities, newest first. See [`authored_rows`].
fn fold_authored<R: Record>(
    rows: Vec<Stamped<R>>,
    creator: impl Fn(&R) -> &Address,
    writers: &BTreeSet<Address>,
) -> Vec<R> {
    newest_first(authored_rows(rows, creator, writers))
}

/// Current issues, newest first.
///
/// The bounty amount is whatever the opening row pledged. Only writers move
/// the bounty status, and a paid bounty stays paid.
fn fold_issues(rows: Vec<Stamped<Issue>>, writers: &BTreeSet<Address>) -> Vec<Issue> {
    let mut rows = authored_rows(rows, |i| &i.author, writers);
    let mut terms: BTreeMap<RecordId, (Option<Amount>, Option<BountyStatus>)> = BTreeMap::new();
    for row in &rows {
        terms
            .entry(row.record.id)
            .or_insert((row.record.bounty, row.record.bounty_status));
    }
    rows.sort_by_key(|r| r.recency());
    for row in &mut rows {
        let Some((amount, status)) = terms.get_mut(&row.record.id) else {
            continue;
        };
        let settled = *status == Some(BountyStatus::Paid);
        if amount.is_some() && !settled && writers.contains(&row.author) {
            *status = row.record.bounty_status;
        }
        row.record.bounty = *amount;
        row.record.bounty_status = *status;
    }
    newest_first(rows)
}

fn require_text(what: &str, value: &str) -> SdkResult<()> {
    if value.trim().is_empty() {
        return Err(SdkError::Validation(format!("{what} must not be empty")));
    }
    Ok(())
}

impl Session {
    // ---- Issues ----

    /// Issues of a repository, newest first, read fresh.
    pub(crate) async fn current_issues(&self, repo: &Repository) -> Vec<Issue> {
        let writers = self.writers_ever(repo).await;
        let rows = self
            .log
            .scan::<Issue>()
            .await
            .into_iter()
            .filter(|r| r.record.repo_name == repo.name)
            .collect();
        fold_issues(rows, &writers)
    }

    async fn current_issue(&self, id: &RecordId) -> SdkResult<(Repository, Issue)> {
        let repo_name = self
            .log
            .scan::<Issue>()
            .await
            .into_iter()
            .find(|r| r.record.id == *id)
            .map(|r| r.record.repo_name)
            .ok_or_else(|| SdkError::not_found("issue", id))?;
        let repo = self.get_repo(&repo_name).await?;
        let issue = self
            .current_issues(&repo)
            .await
            .into_iter()
            .find(|i| i.id == *id)
            .ok_or_else(|| SdkError::not_found("issue", id))?;
        Ok((repo, issue))
    }

    /// Open an issue. Anyone who can read the repository may. A bounty is
    /// paid to the author of the pull request that closes the issue.
    pub async fn create_issue(
        &self,
        repo_name: &str,
        title: &str,
        body: &str,
        bounty: Option<Amount>,
        labels: Vec<String>,
    ) -> SdkResult<Issue> {
        require_text("issue title", title)?;
        if bounty.is_some_and(|b| b.is_zero()) {
            return Err(SdkError::Validation("bounty must be greater than zero".into()));
        }
        self.ensure_tables().await;
        let repo = self.get_repo(repo_name).await?;
        self.authorize(&repo, Action::Read).await?;
        let issue = Issue {
            schema_version: SCHEMA_VERSION,
            id: RecordId::generate(),
            repo_name: repo.name.clone(),
            title: title.to_string(),
            body: body.to_string(),
            author: self.address(),
            status: IssueStatus::Open,
            timestamp: self.stamp(),
            bounty,
            bounty_status: bounty.map(|_| BountyStatus::Active),
            labels,
        };
        self.log.append(self.identity(), &issue).await?;
        info!(repo = %repo.name, issue = %issue.id.short(), bounty = ?bounty.map(|b| b.to_string()), "issue opened");
        Ok(issue)
    }

    pub async fn get_issue(&self, id: &RecordId) -> SdkResult<Issue> {
        let (repo, issue) = self.current_issue(id).await?;
        self.authorize(&repo, Action::Read).await?;
        Ok(issue)
    }

    pub async fn list_issues(&self, repo_name: &str) -> SdkResult<Vec<Issue>> {
        let repo = self.get_repo(repo_name).await?;
        self.authorize(&repo, Action::Read).await?;
        Ok(self.current_issues(&repo).await)
    }

    pub async fn close_issue(&self, id: &RecordId) -> SdkResult<Issue> {
        self.set_issue_status(id, IssueStatus::Closed).await
    }

    pub async fn reopen_issue(&self, id: &RecordId) -> SdkResult<Issue> {
        self.set_issue_status(id, IssueStatus::Open).await
    }

    async fn set_issue_status(&self, id: &RecordId, status: IssueStatus) -> SdkResult<Issue> {
        let (repo, issue) = self.current_issue(id).await?;
        if issue.author != self.address() {
            self.authorize(&repo, Action::Write).await?;
        }
        if issue.status == status {
            return Ok(issue);
        }
        let updated = Issue {
            status,
            timestamp: self.stamp_after(issue.timestamp),
            ..issue
        };
        self.log.append(self.identity(), &updated).await?;
        Ok(updated)
    }

    // ---- Pull requests ----

    pub(crate) async fn current_pull_requests(&self, repo: &Repository) -> Vec<PullRequest> {
        let writers = self.writers_ever(repo).await;
        let rows = self
            .log
            .scan::<PullRequest>()
            .await
            .into_iter()
            .filter(|r| r.record.repo_name == repo.name)
            .collect();
        fold_authored(rows, |p| &p.author, &writers)
    }

    pub(crate) async fn current_pull_request(&self, id: &RecordId) -> SdkResult<PullRequest> {
        let repo_name = self
            .log
            .scan::<PullRequest>()
            .await
            .into_iter()
            .find(|r| r.record.id == *id)
            .map(|r| r.record.repo_name)
            .ok_or_else(|| SdkError::not_found("pull request", id))?;
        let repo = self.get_repo(&repo_name).await?;
        self.current_pull_requests(&repo)
            .await
            .into_iter()
            .find(|p| p.id == *id)
            .ok_or_else(|| SdkError::not_found("pull request", id))
    }

    /// Propose merging `source` into `target`. The source branch must exist.
    pub async fn create_pull_request(
        &self,
        repo_name: &str,
        title: &str,
        description: &str,
        source: &str,
        target: &str,
    ) -> SdkResult<PullRequest> {
        require_text("pull request title", title)?;
        validate_branch_name(target)?;
        if source == target {
            return Err(SdkError::Validation(format!(
                "source and target are both {source:?}"
            )));
        }
        self.ensure_tables().await;
        self.resolve_branch(repo_name, source).await?;
        let pr = PullRequest {
            schema_version: SCHEMA_VERSION,
            id: RecordId::generate(),
            repo_name: repo_name.to_string(),
            title: title.to_string(),
            description: description.to_string(),
            author: self.address(),
            source_branch: source.to_string(),
            target_branch: target.to_string(),
            status: PullRequestStatus::Open,
            timestamp: self.stamp(),
            merged_by: None,
            merge_commit_id: None,
        };
        self.log.append(self.identity(), &pr).await?;
        info!(repo = %repo_name, pr = %pr.id.short(), %source, %target, "pull request opened");
        Ok(pr)
    }

    pub async fn get_pull_request(&self, id: &RecordId) -> SdkResult<PullRequest> {
        let pr = self.current_pull_request(id).await?;
        let repo = self.get_repo(&pr.repo_name).await?;
        self.authorize(&repo, Action::Read).await?;
        Ok(pr)
    }

    pub async fn list_pull_requests(&self, repo_name: &str) -> SdkResult<Vec<PullRequest>> {
        let repo = self.get_repo(repo_name).await?;
        self.authorize(&repo, Action::Read).await?;
        Ok(self.current_pull_requests(&repo).await)
    }

    /// Close without merging. Author or writer.
    pub async fn close_pull_request(&self, id: &RecordId) -> SdkResult<PullRequest> {
        let pr = self.current_pull_request(id).await?;
        let repo = self.get_repo(&pr.repo_name).await?;
        if pr.author != self.address() {
            self.authorize(&repo, Action::Write).await?;
        }
        if pr.status != PullRequestStatus::Open {
            return Err(SdkError::Validation(format!(
                "pull request {} is {:?}, not open",
                pr.id.short(),
                pr.status
            )));
        }
        let closed = PullRequest {
            status: PullRequestStatus::Closed,
            timestamp: self.stamp_after(pr.timestamp),
            ..pr
        };
        self.log.append(self.identity(), &closed).await?;
        Ok(closed)
    }

    // ---- Comments ----

    async fn current_comments(&self) -> Vec<Comment> {
        let rows = self.log.scan::<Comment>().await;
        fold_authored(rows, |c| &c.author, &BTreeSet::new())
    }

    /// Comment on an issue or pull request of `repo_name`.
    pub async fn add_comment(
        &self,
        repo_name: &str,
        target_id: &RecordId,
        body: &str,
    ) -> SdkResult<Comment> {
        require_text("comment", body)?;
        self.ensure_tables().await;
        let repo = self.get_repo(repo_name).await?;
        self.authorize(&repo, Action::Read).await?;
        let is_issue = self.current_issues(&repo).await.iter().any(|i| i.id == *target_id);
        let is_pr = !is_issue
            && self
                .current_pull_requests(&repo)
                .await
                .iter()
                .any(|p| p.id == *target_id);
        if !is_issue && !is_pr {
            return Err(SdkError::not_found(
                "issue or pull request",
                format!("{target_id} in {repo_name}"),
            ));
        }
        let comment = Comment {
            schema_version: SCHEMA_VERSION,
            id: RecordId::generate(),
            target_id: target_id.to_string(),
            repo_name: repo.name.clone(),
            author: self.address(),
            body: body.to_string(),
            timestamp: self.stamp(),
            edited: false,
        };
        self.log.append(self.identity(), &comment).await?;
        Ok(comment)
    }

    /// Replace a comment's body. Author only.
    pub async fn edit_comment(&self, comment_id: &RecordId, body: &str) -> SdkResult<Comment> {
        require_text("comment", body)?;
        let current = self
            .current_comments()
            .await
            .into_iter()
            .find(|c| c.id == *comment_id)
            .ok_or_else(|| SdkError::not_found("comment", comment_id))?;
        if current.author != self.address() {
            return Err(SdkError::PermissionDenied(format!(
                "only the author may edit comment {}",
                comment_id.short()
            )));
        }
        let edited = Comment {
            body: body.to_string(),
            edited: true,
            timestamp: self.stamp_after(current.timestamp),
            ..current
        };
        self.log.append(self.identity(), &edited).await?;
        Ok(edited)
    }

    /// Comments on an issue or pull request, oldest first.
    pub async fn list_comments(&self, target_id: &RecordId) -> SdkResult<Vec<Comment>> {
        let target = target_id.to_string();
        let mut comments: Vec<Comment> = self
            .current_comments()
            .await
            .into_iter()
            .filter(|c| c.target_id == target)
            .collect();
        if let Some(first) = comments.first() {
            let repo = self.get_repo(&first.repo_name).await?;
            self.authorize(&repo, Action::Read).await?;
        }
        comments.sort_by_key(|c| c.id);
        Ok(comments)
    }

    // ---- Reactions ----

    async fn current_reactions(&self, target_id: &str) -> Vec<Reaction> {
        let rows = self
            .log
            .scan::<Reaction>()
            .await
            .into_iter()
            .filter(|r| r.record.target_id == target_id && r.author == r.record.user_address);
        fold_latest(rows).into_iter().map(|s| s.record).collect()
    }

    /// Add the caller's reaction, or take it back if present. Returns
    /// whether the reaction is now on.
    pub async fn toggle_reaction(
        &self,
        target_id: &str,
        target_kind: ReactionTarget,
        emoji: &str,
    ) -> SdkResult<bool> {
        if !REACTION_EMOJI.contains(&emoji) {
            return Err(SdkError::Validation(format!("unsupported reaction {emoji:?}")));
        }
        require_text("reaction target", target_id)?;
        self.ensure_tables().await;
        let me = self.address();
        let current = self
            .current_reactions(target_id)
            .await
            .into_iter()
            .find(|r| r.user_address == me && r.emoji == emoji);
        let active = !current.as_ref().is_some_and(|r| r.active);
        let row = Reaction {
            schema_version: SCHEMA_VERSION,
            target_id: target_id.to_string(),
            target_kind,
            emoji: emoji.to_string(),
            user_address: me,
            active,
            timestamp: self.stamp_after(current.map(|r| r.timestamp).unwrap_or_default()),
        };
        self.log.append(self.identity(), &row).await?;
        Ok(active)
    }

    /// Active reactions per emoji, in [`REACTION_EMOJI`] order. Emoji nobody
    /// used are left out.
    pub async fn reactions(&self, target_id: &str) -> SdkResult<Vec<ReactionSummary>> {
        let me = self.address();
        let active: Vec<Reaction> = self
            .current_reactions(target_id)
            .await
            .into_iter()
            .filter(|r| r.active)
            .collect();
        Ok(REACTION_EMOJI
            .iter()
            .filter_map(|emoji| {
                let users: Vec<&Address> = active
                    .iter()
                    .filter(|r| r.emoji == *emoji)
                    .map(|r| &r.user_address)
                    .collect();
                (!users.is_empty()).then(|| ReactionSummary {
                    emoji: emoji.to_string(),
                    count: users.len(),
                    reacted_by_me: users.contains(&&me),
                })
            })
            .collect())
    }

    // ---- Stars ----

    async fn current_stars(&self) -> Vec<Star> {
        let rows = self
            .log
            .scan::<Star>()
            .await
            .into_iter()
            .filter(|r| r.author == r.record.user_address);
        fold_latest(rows).into_iter().map(|s| s.record).collect()
    }

    /// Star or unstar a repository. Returns whether it is now starred.
    pub async fn toggle_star(&self, repo_name: &str) -> SdkResult<bool> {
        self.ensure_tables().await;
        let repo = self.get_repo(repo_name).await?;
        self.authorize(&repo, Action::Read).await?;
        let me = self.address();
        let current = self
            .current_stars()
            .await
            .into_iter()
            .find(|s| s.repo_name == repo.name && s.user_address == me);
        let active = !current.as_ref().is_some_and(|s| s.active);
        let row = Star {
            schema_version: SCHEMA_VERSION,
            repo_name: repo.name.clone(),
            user_address: me,
            active,
            timestamp: self.stamp_after(current.map(|s| s.timestamp).unwrap_or_default()),
        };
        self.log.append(self.identity(), &row).await?;
        Ok(active)
    }

    pub async fn stargazers(&self, repo_name: &str) -> SdkResult<Vec<Address>> {
        let repo = self.get_repo(repo_name).await?;
        self.authorize(&repo, Action::Read).await?;
        Ok(self
            .current_stars()
            .await
            .into_iter()
            .filter(|s| s.active && s.repo_name == repo.name)
            .map(|s| s.user_address)
            .collect())
    }

    /// Names of repositories `user` has starred.
    pub async fn starred_repos(&self, user: &Address) -> SdkResult<Vec<String>> {
        Ok(self
            .current_stars()
            .await
            .into_iter()
            .filter(|s| s.active && &s.user_address == user)
            .map(|s| s.repo_name)
            .collect())
    }

    // ---- Profiles ----

    pub async fn get_profile(&self, user: &Address) -> SdkResult<Option<Profile>> {
        let rows = self
            .log
            .scan::<Profile>()
            .await
            .into_iter()
            .filter(|r| &r.author == user && &r.record.user_address == user);
        Ok(latest(rows).map(|s| s.record))
    }

    pub async fn update_profile(&self, update: ProfileUpdate) -> SdkResult<Profile> {
        self.ensure_tables().await;
        let me = self.address();
        let current = self.get_profile(&me).await?;
        let readme_content_id = match &update.readme {
            Some(text) => Some(self.upload_file("README.md", text.as_bytes(), None).await?),
            None => current.as_ref().and_then(|p| p.readme_content_id.clone()),
        };
        let seen = current.as_ref().map(|p| p.timestamp).unwrap_or_default();
        let (avatar_url, bio, socials) = match current {
            Some(p) => (p.avatar_url, p.bio, p.socials),
            None => (None, None, Socials::default()),
        };
        let profile = Profile {
            schema_version: SCHEMA_VERSION,
            user_address: me,
            avatar_url: update.avatar_url.or(avatar_url),
            bio: update.bio.or(bio),
            readme_content_id,
            socials: update.socials.unwrap_or(socials),
            timestamp: self.stamp_after(seen),
        };
        self.log.append(self.identity(), &profile).await?;
        Ok(profile)
    }

    // ---- Funding pool ----

    /// Pool rows whose donor, when named, is the row's attested author.
    async fn pool_rows(&self) -> Vec<Stamped<FundingPool>> {
        self.log
            .scan::<FundingPool>()
            .await
            .into_iter()
            .filter(|r| r.record.id == FundingPool::ID)
            .filter(|r| r.record.last_donor.as_ref().map_or(true, |d| d == &r.author))
            .collect()
    }

    pub async fn funding_pool(&self) -> SdkResult<FundingPool> {
        Ok(latest(self.pool_rows().await)
            .map(|s| s.record)
            .unwrap_or_else(FundingPool::empty))
    }

    /// Donate to the matching pool. With a configured vault the amount is
    /// transferred there first; a failed transfer records nothing.
    pub async fn donate_to_pool(&self, amount: Amount) -> SdkResult<FundingPool> {
        if amount.is_zero() {
            return Err(SdkError::Validation("donation must be greater than zero".into()));
        }
        self.ensure_tables().await;
        let rows = self.pool_rows().await;
        let me = self.address();
        let mut donors: BTreeSet<Address> =
            rows.iter().filter_map(|r| r.record.last_donor.clone()).collect();
        donors.insert(me.clone());
        let current = latest(rows)
            .map(|s| s.record)
            .unwrap_or_else(FundingPool::empty);
        let total = current
            .total_funds
            .checked_add(amount)
            .ok_or_else(|| SdkError::Validation("pool total would overflow".into()))?;

        if let Some(vault) = &self.config.funding.pool_address {
            let receipt = self.payments.transfer(self.identity(), vault, amount).await?;
            info!(%amount, vault = %vault.short(), receipt = %receipt.id, "donation transferred");
        }
        let pool = FundingPool {
            schema_version: SCHEMA_VERSION,
            total_funds: total,
            contributors: donors.len() as u64,
            last_donor: Some(me),
            timestamp: self.stamp_after(current.timestamp),
            ..current
        };
        self.log.append(self.identity(), &pool).await?;
        info!(%amount, total = %pool.total_funds, "donation recorded");
        Ok(pool)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledgit_types::Timestamp;

    fn issue_row(seq: u64, signer: &str, author: &str, status: IssueStatus, ts: u64, id: RecordId) -> Stamped<Issue> {
        Stamped {
            seq,
            author: Address::new_unchecked(signer),
            record: Issue {
                schema_version: SCHEMA_VERSION,
                id,
                repo_name: "demo".into(),
                title: "t".into(),
                body: String::new(),
                author: Address::new_unchecked(author),
                status,
                timestamp: Timestamp::from_millis(ts),
                bounty: None,
                bounty_status: None,
                labels: vec![],
            },
        }
    }

    #[test]
    fn writers_may_update_but_not_reassign() {
        let id = RecordId::generate();
        let writers = BTreeSet::from([Address::new_unchecked("owner")]);
        let issues = fold_authored(
            vec![
                issue_row(0, "bob", "bob", IssueStatus::Open, 10, id),
                issue_row(1, "owner", "bob", IssueStatus::Closed, 20, id),
                // the owner cannot take over authorship
                issue_row(2, "owner", "owner", IssueStatus::Open, 30, id),
            ],
            |i| &i.author,
            &writers,
        );
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].status, IssueStatus::Closed);
        assert_eq!(issues[0].author.as_str(), "bob");
    }

    #[test]
    fn strangers_cannot_update() {
        let id = RecordId::generate();
        let issues = fold_authored(
            vec![
                issue_row(0, "bob", "bob", IssueStatus::Open, 10, id),
                issue_row(1, "mallory", "bob", IssueStatus::Closed, 20, id),
            ],
            |i| &i.author,
            &BTreeSet::new(),
        );
        assert_eq!(issues[0].status, IssueStatus::Open);
    }

    #[test]
    fn forged_first_rows_are_dropped() {
        let id = RecordId::generate();
        let issues = fold_authored(
            vec![issue_row(0, "mallory", "bob", IssueStatus::Open, 10, id)],
            |i| &i.author,
            &BTreeSet::new(),
        );
        assert!(issues.is_empty());
    }

    fn with_bounty(mut row: Stamped<Issue>, base_units: u64, status: BountyStatus) -> Stamped<Issue> {
        row.record.bounty = Some(Amount::from_base_units(base_units));
        row.record.bounty_status = Some(status);
        row
    }

    #[test]
    fn bounty_amount_is_fixed_at_opening() {
        let id = RecordId::generate();
        let issues = fold_issues(
            vec![
                with_bounty(issue_row(0, "bob", "bob", IssueStatus::Open, 10, id), 100, BountyStatus::Active),
                with_bounty(issue_row(1, "bob", "bob", IssueStatus::Open, 20, id), 9_000, BountyStatus::Active),
            ],
            &BTreeSet::new(),
        );
        assert_eq!(issues[0].active_bounty(), Some(Amount::from_base_units(100)));
    }

    #[test]
    fn only_writers_move_bounty_status() {
        let id = RecordId::generate();
        let writers = BTreeSet::from([Address::new_unchecked("owner")]);
        let opened = with_bounty(issue_row(0, "bob", "bob", IssueStatus::Open, 10, id), 100, BountyStatus::Active);

        let issues = fold_issues(
            vec![
                opened.clone(),
                with_bounty(issue_row(1, "bob", "bob", IssueStatus::Open, 20, id), 100, BountyStatus::Paid),
            ],
            &writers,
        );
        assert_eq!(issues[0].bounty_status, Some(BountyStatus::Active));

        let issues = fold_issues(
            vec![
                opened,
                with_bounty(issue_row(1, "owner", "bob", IssueStatus::Closed, 20, id), 100, BountyStatus::Paid),
            ],
            &writers,
        );
        assert_eq!(issues[0].bounty_status, Some(BountyStatus::Paid));
        assert_eq!(issues[0].active_bounty(), None);
    }

    #[test]
    fn paid_bounty_cannot_be_reactivated() {
        let id = RecordId::generate();
        let writers = BTreeSet::from([Address::new_unchecked("owner")]);
        let issues = fold_issues(
            vec![
                with_bounty(issue_row(0, "bob", "bob", IssueStatus::Open, 10, id), 100, BountyStatus::Active),
                with_bounty(issue_row(1, "owner", "bob", IssueStatus::Closed, 20, id), 100, BountyStatus::Paid),
                with_bounty(issue_row(2, "bob", "bob", IssueStatus::Open, 30, id), 100, BountyStatus::Active),
                with_bounty(issue_row(3, "owner", "bob", IssueStatus::Open, 40, id), 100, BountyStatus::Active),
            ],
            &writers,
        );
        assert_eq!(issues[0].status, IssueStatus::Open);
        assert_eq!(issues[0].bounty_status, Some(BountyStatus::Paid));
        assert_eq!(issues[0].active_bounty(), None);
    }
}
