//! Repository resolution, permission checks, collaborators and key exchange.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use ledgit_crypto::{RepoCipher, RepoKey};
use ledgit_gate::{AccessRequest, Action, RepoAccess};
use ledgit_ledger::{fold_latest, Collaborator, Repository, Stamped, SCHEMA_VERSION};
use ledgit_types::{Address, Role};
use tracing::info;

use crate::error::{SdkError, SdkResult};
use crate::session::Session;

/// Current state of every repository.
///
/// Only rows attested by the repository's owner count. The owner is the
/// author of the first row appended for that name, so a later row from
/// anyone else cannot take the name over.
pub(crate) fn fold_repositories(mut rows: Vec<Stamped<Repository>>) -> Vec<Repository> {
    rows.sort_by_key(|r| r.seq);
    let mut owners: HashMap<String, Address> = HashMap::new();
    let valid: Vec<_> = rows
        .into_iter()
        .filter(|r| r.author == r.record.owner)
        .filter(|r| match owners.entry(r.record.name.clone()) {
            Entry::Vacant(slot) => {
                slot.insert(r.author.clone());
                true
            }
            Entry::Occupied(slot) => slot.get() == &r.author,
        })
        .collect();
    let mut repos: Vec<Repository> = fold_latest(valid).into_iter().map(|s| s.record).collect();
    repos.reverse();
    repos
}

impl Session {
    // ---- Resolution ----

    /// All repositories, newest first, read fresh from the ledger.
    pub(crate) async fn resolve_repos(&self) -> Vec<Repository> {
        fold_repositories(self.log.scan::<Repository>().await)
    }

    pub(crate) async fn find_repo(&self, name: &str) -> Option<Repository> {
        self.resolve_repos().await.into_iter().find(|r| r.name == name)
    }

    /// Current state of one repository.
    pub async fn get_repo(&self, name: &str) -> SdkResult<Repository> {
        self.find_repo(name)
            .await
            .ok_or_else(|| SdkError::not_found("repository", name))
    }

    /// Active collaborators, as granted by the repository owner.
    pub(crate) async fn active_collaborators(&self, repo: &Repository) -> Vec<Collaborator> {
        let rows = self
            .log
            .scan::<Collaborator>()
            .await
            .into_iter()
            .filter(|r| r.record.repo_name == repo.name && r.author == repo.owner);
        fold_latest(rows)
            .into_iter()
            .map(|s| s.record)
            .filter(|c| c.active)
            .collect()
    }

    pub(crate) async fn access_of(&self, repo: &Repository) -> RepoAccess {
        let collaborators = self
            .active_collaborators(repo)
            .await
            .into_iter()
            .map(|c| c.user_address)
            .collect();
        RepoAccess::new(repo.name.clone(), repo.owner.clone(), repo.visibility, collaborators)
    }

    /// Fail unless the session identity may perform `action` on `repo`.
    pub(crate) async fn authorize(&self, repo: &Repository, action: Action) -> SdkResult<RepoAccess> {
        let access = self.access_of(repo).await;
        let me = self.address();
        self.gate.check(&AccessRequest::new(&me, action, &access))?;
        Ok(access)
    }

    pub(crate) async fn allows(&self, repo: &Repository, action: Action) -> bool {
        let access = self.access_of(repo).await;
        let me = self.address();
        self.gate.evaluate(&AccessRequest::new(&me, action, &access)).allowed
    }

    /// The key for a repository's content, if this session has one.
    pub(crate) fn repo_key(&self, repo: &Repository) -> Option<RepoKey> {
        self.keys.resolve(self.identity.as_ref(), &repo.key_context())
    }

    /// The key new content must be encrypted with: `None` for public
    /// repositories, an error for private ones this session cannot open.
    pub(crate) fn write_key(&self, repo: &Repository) -> SdkResult<Option<RepoKey>> {
        if repo.is_public() {
            return Ok(None);
        }
        self.repo_key(repo)
            .map(Some)
            .ok_or_else(|| SdkError::KeyUnavailable {
                repo: repo.name.clone(),
            })
    }

    // ---- Permission queries ----

    pub async fn can_read(&self, repo_name: &str) -> SdkResult<bool> {
        let repo = self.get_repo(repo_name).await?;
        Ok(self.allows(&repo, Action::Read).await)
    }

    pub async fn can_write(&self, repo_name: &str) -> SdkResult<bool> {
        let repo = self.get_repo(repo_name).await?;
        Ok(self.allows(&repo, Action::Write).await)
    }

    // ---- Collaborators ----

    pub async fn add_collaborator(
        &self,
        repo_name: &str,
        user: &Address,
        role: Role,
    ) -> SdkResult<Collaborator> {
        self.set_collaborator(repo_name, user, role, true).await
    }

    pub async fn remove_collaborator(&self, repo_name: &str, user: &Address) -> SdkResult<()> {
        let repo = self.get_repo(repo_name).await?;
        let current = self
            .active_collaborators(&repo)
            .await
            .into_iter()
            .find(|c| &c.user_address == user)
            .ok_or_else(|| SdkError::not_found("collaborator", format!("{user} on {repo_name}")))?;
        self.set_collaborator(repo_name, user, current.role, false)
            .await
            .map(|_| ())
    }

    async fn set_collaborator(
        &self,
        repo_name: &str,
        user: &Address,
        role: Role,
        active: bool,
    ) -> SdkResult<Collaborator> {
        self.ensure_tables().await;
        let repo = self.get_repo(repo_name).await?;
        self.authorize(&repo, Action::ManageCollaborators).await?;
        if user == &repo.owner {
            return Err(SdkError::Validation(format!(
                "{user} owns {repo_name:?} and cannot be a collaborator"
            )));
        }
        let row = Collaborator {
            schema_version: SCHEMA_VERSION,
            repo_name: repo.name.clone(),
            user_address: user.clone(),
            role,
            active,
            timestamp: self.stamp(),
        };
        self.log.append(self.identity(), &row).await?;
        info!(repo = %repo.name, user = %user.short(), active, "collaborator updated");
        Ok(row)
    }

    pub async fn list_collaborators(&self, repo_name: &str) -> SdkResult<Vec<Collaborator>> {
        let repo = self.get_repo(repo_name).await?;
        Ok(self.active_collaborators(&repo).await)
    }

    // ---- Key exchange ----

    /// Hex encoding of a private repository's key, for handing to a
    /// collaborator out of band. Owner only.
    pub async fn export_repo_key(&self, repo_name: &str) -> SdkResult<String> {
        let repo = self.get_repo(repo_name).await?;
        self.authorize(&repo, Action::ManageCollaborators).await?;
        let key = self.repo_key(&repo).ok_or_else(|| SdkError::KeyUnavailable {
            repo: repo.name.clone(),
        })?;
        Ok(key.to_hex())
    }

    /// Install a key received from a repository's owner. When the
    /// repository has commits, the key must open its latest tree.
    pub async fn import_repo_key(&self, repo_name: &str, key_hex: &str) -> SdkResult<()> {
        let repo = self.get_repo(repo_name).await?;
        let key = RepoKey::from_hex(key_hex)?;
        if let Some(commit) = self.head_commit(&repo).await {
            let blob = self
                .fetch(&commit.tree_id)
                .await?
                .ok_or_else(|| SdkError::not_found("tree", &commit.tree_id))?;
            if blob.encrypted {
                let raw = base64_decode(&blob.data).map_err(|reason| SdkError::Corrupt {
                    id: commit.tree_id.to_string(),
                    reason,
                })?;
                RepoCipher::new(&key)
                    .decrypt(&raw)
                    .map_err(|_| SdkError::Decryption {
                        id: commit.tree_id.to_string(),
                        reason: format!("key does not open {repo_name:?}"),
                    })?;
            }
        }
        self.keys.import(repo.key_context(), key);
        Ok(())
    }
}

fn base64_decode(data: &str) -> Result<Vec<u8>, String> {
    use base64::Engine as _;
    base64::engine::general_purpose::STANDARD
        .decode(data.as_bytes())
        .map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledgit_types::{Timestamp, Visibility};

    fn repo_row(seq: u64, author: &str, owner: &str, vis: Visibility, ts: u64) -> Stamped<Repository> {
        Stamped {
            seq,
            author: Address::new_unchecked(author),
            record: Repository {
                schema_version: SCHEMA_VERSION,
                name: "demo".into(),
                description: String::new(),
                owner: Address::new_unchecked(owner),
                created_at: Timestamp::from_millis(ts),
                visibility: vis,
                encryption: None,
            },
        }
    }

    #[test]
    fn owner_updates_fold_newest() {
        let repos = fold_repositories(vec![
            repo_row(0, "alice", "alice", Visibility::Public, 10),
            repo_row(1, "alice", "alice", Visibility::Private, 20),
        ]);
        assert_eq!(repos.len(), 1);
        assert_eq!(repos[0].visibility, Visibility::Private);
    }

    #[test]
    fn rows_from_others_are_ignored() {
        let repos = fold_repositories(vec![
            repo_row(0, "alice", "alice", Visibility::Private, 10),
            // mallory claims the name with a backdated row
            repo_row(1, "mallory", "mallory", Visibility::Public, 5),
            // mallory forges alice as owner
            repo_row(2, "mallory", "alice", Visibility::Public, 30),
        ]);
        assert_eq!(repos.len(), 1);
        assert_eq!(repos[0].owner.as_str(), "alice");
        assert_eq!(repos[0].visibility, Visibility::Private);
    }
}
