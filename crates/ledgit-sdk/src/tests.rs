//! Engine scenarios against the in-memory store and payment rail.

use std::sync::Arc;

use ledgit_crypto::{Identity, LocalIdentity};
use ledgit_ledger::{
    BountyStatus, Commit, Issue, IssueStatus, PullRequestStatus, ReactionTarget, TableKind,
};
use ledgit_store::{InMemoryLedgerStore, InMemoryPaymentRail};
use ledgit_types::{Address, Amount, RecordId, Role, Visibility};

use crate::{ChangeSet, EngineConfig, ErrorKind, FileContent, ProfileUpdate, Session};

const HALF_UNIT: Amount = Amount::from_base_units(500_000_000);

struct World {
    store: Arc<InMemoryLedgerStore>,
    rail: Arc<InMemoryPaymentRail>,
}

impl World {
    fn new() -> Self {
        Self {
            store: Arc::new(InMemoryLedgerStore::new()),
            rail: Arc::new(InMemoryPaymentRail::new()),
        }
    }

    fn config() -> EngineConfig {
        let mut config = EngineConfig::default();
        config.upload.retry_delay_ms = 0;
        config
    }

    fn session(&self) -> Session {
        self.session_as(Arc::new(LocalIdentity::generate()))
    }

    fn session_as(&self, identity: Arc<LocalIdentity>) -> Session {
        Session::builder(self.store.clone(), identity)
            .payments(self.rail.clone())
            .config(Self::config())
            .build()
            .unwrap()
    }
}

async fn demo_repo(session: &Session, visibility: Visibility) {
    session.create_repo("demo", "demo repository", visibility).await.unwrap();
}

// ----- repositories -----

#[tokio::test]
async fn create_repo_validates_names() {
    let world = World::new();
    let alice = world.session();
    let err = alice.create_repo("", "", Visibility::Public).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    let err = alice.create_repo("a/b", "", Visibility::Public).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    demo_repo(&alice, Visibility::Public).await;
    let err = alice.create_repo("demo", "", Visibility::Public).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(alice.list_repos().await.unwrap().len(), 1);
}

#[tokio::test]
async fn only_the_owner_changes_visibility() {
    let world = World::new();
    let alice = world.session();
    let bob = world.session();
    demo_repo(&alice, Visibility::Public).await;

    let err = bob.set_visibility("demo", Visibility::Private).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Permission);

    alice.set_visibility("demo", Visibility::Private).await.unwrap();
    assert_eq!(bob.get_repo("demo").await.unwrap().visibility, Visibility::Private);
    assert!(!bob.can_read("demo").await.unwrap());
    assert!(bob.list_repos().await.unwrap().is_empty());
}

// ----- commits -----

#[tokio::test]
async fn unchanged_file_keeps_its_content_id() {
    let world = World::new();
    let alice = world.session();
    demo_repo(&alice, Visibility::Public).await;

    let a = alice
        .commit("demo", "A", ChangeSet::new().with_file("index.html", "<h1>hi</h1>"))
        .await
        .unwrap();
    let b = alice
        .commit("demo", "B", ChangeSet::new().with_file("README.md", "# demo"))
        .await
        .unwrap();
    assert_eq!(b.commit.parent_commit_id, Some(a.commit.id));

    let tree_a = alice.tree(&a.commit.id).await.unwrap();
    let tree_b = alice.tree(&b.commit.id).await.unwrap();
    assert_ne!(a.commit.tree_id, b.commit.tree_id);
    assert_eq!(
        tree_a.get("index.html").unwrap().content_id,
        tree_b.get("index.html").unwrap().content_id
    );
    assert_eq!(tree_b.len(), 2);
}

#[tokio::test]
async fn recommitting_identical_content_uploads_nothing() {
    let world = World::new();
    let alice = world.session();
    demo_repo(&alice, Visibility::Public).await;
    let changes = ChangeSet::new().with_file("main.rs", "fn main() {}");

    let first = alice.commit("demo", "one", changes.clone()).await.unwrap();
    let before = world.store.content_count();
    let second = alice.commit("demo", "two", changes).await.unwrap();

    assert_eq!(first.uploaded, vec!["main.rs"]);
    assert_eq!(second.reused, vec!["main.rs"]);
    assert!(second.uploaded.is_empty());
    // only the new manifest
    assert_eq!(world.store.content_count(), before + 1);

    let t1 = alice.tree(&first.commit.id).await.unwrap();
    let t2 = alice.tree(&second.commit.id).await.unwrap();
    assert_ne!(first.commit.tree_id, second.commit.tree_id);
    assert_eq!(t1.get("main.rs").unwrap().content_id, t2.get("main.rs").unwrap().content_id);
}

#[tokio::test]
async fn commit_requires_message_and_changes() {
    let world = World::new();
    let alice = world.session();
    demo_repo(&alice, Visibility::Public).await;
    let err = alice
        .commit("demo", "  ", ChangeSet::new().with_file("a", "1"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    let err = alice.commit("demo", "m", ChangeSet::new()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    let err = alice
        .commit("nope", "m", ChangeSet::new().with_file("a", "1"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn denied_commit_uploads_nothing() {
    let world = World::new();
    let alice = world.session();
    let mallory = world.session();
    demo_repo(&alice, Visibility::Public).await;
    let before = world.store.content_count();

    let err = mallory
        .commit("demo", "mine now", ChangeSet::new().with_file("x", "y"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Permission);
    assert_eq!(world.store.content_count(), before);
    assert!(alice.log("demo").await.unwrap().is_empty());
}

#[tokio::test]
async fn collaborators_may_commit() {
    let world = World::new();
    let alice = world.session();
    let bob = world.session();
    demo_repo(&alice, Visibility::Public).await;
    alice.add_collaborator("demo", &bob.address(), Role::Writer).await.unwrap();

    bob.commit("demo", "help", ChangeSet::new().with_file("a.txt", "a")).await.unwrap();
    assert_eq!(alice.log("demo").await.unwrap()[0].author, bob.address());

    alice.remove_collaborator("demo", &bob.address()).await.unwrap();
    assert!(!bob.can_write("demo").await.unwrap());
    let err = alice.remove_collaborator("demo", &bob.address()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn uploads_retry_then_skip() {
    let world = World::new();
    let alice = world.session();
    demo_repo(&alice, Visibility::Public).await;

    world.store.fail_uploads_named("flaky.txt", 2);
    world.store.fail_uploads_named("broken.txt", 3);
    let outcome = alice
        .commit(
            "demo",
            "partial",
            ChangeSet::new()
                .with_file("flaky.txt", "eventually")
                .with_file("broken.txt", "never")
                .with_file("ok.txt", "fine"),
        )
        .await
        .unwrap();

    assert_eq!(outcome.uploaded, vec!["flaky.txt", "ok.txt"]);
    assert_eq!(outcome.skipped, vec!["broken.txt"]);
    let tree = alice.tree(&outcome.commit.id).await.unwrap();
    assert!(tree.contains("flaky.txt"));
    assert!(!tree.contains("broken.txt"));
}

#[tokio::test]
async fn failed_tree_upload_is_not_retried() {
    let world = World::new();
    let alice = world.session();
    demo_repo(&alice, Visibility::Public).await;

    world.store.fail_uploads_named("tree.json", 1);
    let err = alice
        .commit("demo", "m", ChangeSet::new().with_file("a.txt", "a"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Upload);
    assert!(alice.log("demo").await.unwrap().is_empty());
}

#[tokio::test]
async fn commit_directory_records_deletions() {
    let world = World::new();
    let alice = world.session();
    demo_repo(&alice, Visibility::Public).await;
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("a.txt"), "a").unwrap();
    std::fs::create_dir(dir.path().join("sub")).unwrap();
    std::fs::write(dir.path().join("sub/b.txt"), "b").unwrap();

    let first = alice.commit_directory("demo", "init", dir.path()).await.unwrap();
    assert_eq!(first.uploaded, vec!["a.txt", "sub/b.txt"]);

    std::fs::remove_file(dir.path().join("a.txt")).unwrap();
    let second = alice.commit_directory("demo", "drop a", dir.path()).await.unwrap();
    assert_eq!(second.deleted, vec!["a.txt"]);
    assert_eq!(second.reused, vec!["sub/b.txt"]);
    let tree = alice.tree(&second.commit.id).await.unwrap();
    assert_eq!(tree.paths().collect::<Vec<_>>(), vec!["sub/b.txt"]);
}

#[tokio::test]
async fn history_queries() {
    let world = World::new();
    let alice = world.session();
    demo_repo(&alice, Visibility::Public).await;
    let a = alice.commit("demo", "A", ChangeSet::new().with_file("a", "1")).await.unwrap();
    let b = alice.commit("demo", "B", ChangeSet::new().with_file("a", "2")).await.unwrap();

    let log = alice.log("demo").await.unwrap();
    assert_eq!(log.iter().map(|c| c.id).collect::<Vec<_>>(), vec![b.commit.id, a.commit.id]);
    assert_eq!(alice.latest_commit("demo").await.unwrap().unwrap().id, b.commit.id);
    assert_eq!(alice.commits_by(&alice.address()).await.unwrap().len(), 2);
    let found = alice.resolve_commit("demo", &a.commit.id.to_string()).await.unwrap();
    assert_eq!(found.id, a.commit.id);
    let activity = alice.contribution_activity(&alice.address()).await.unwrap();
    assert_eq!(activity.values().sum::<usize>(), 2);
}

#[tokio::test]
async fn commits_signed_by_non_writers_are_ignored() {
    let world = World::new();
    let alice = world.session();
    let mallory = world.session();
    demo_repo(&alice, Visibility::Public).await;
    let a = alice
        .commit("demo", "A", ChangeSet::new().with_file("index.html", "<h1>hi</h1>"))
        .await
        .unwrap();

    let forged = Commit {
        id: RecordId::generate(),
        message: "taken over".into(),
        author: mallory.address(),
        timestamp: mallory.stamp_after(a.commit.timestamp),
        parent_commit_id: Some(a.commit.id),
        ..a.commit.clone()
    };
    mallory.log.append(mallory.identity(), &forged).await.unwrap();

    assert_eq!(alice.latest_commit("demo").await.unwrap().unwrap().id, a.commit.id);
    assert_eq!(alice.log("demo").await.unwrap().len(), 1);
    assert_eq!(
        alice.resolve_branch("demo", "main").await.unwrap().commit_id,
        a.commit.id
    );
    let err = alice.get_commit(&forged.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(alice.commits_by(&mallory.address()).await.unwrap().is_empty());
    assert!(alice.contribution_activity(&mallory.address()).await.unwrap().is_empty());

    let dir = tempfile::tempdir().unwrap();
    let report = mallory.clone_repo("demo", dir.path()).await.unwrap();
    assert_eq!(report.commit.id, a.commit.id);

    let b = alice.commit("demo", "B", ChangeSet::new().with_file("a.txt", "a")).await.unwrap();
    assert_eq!(b.commit.parent_commit_id, Some(a.commit.id));
}

#[tokio::test]
async fn unreadable_history_fails_the_commit() {
    let world = World::new();
    let alice = world.session();
    demo_repo(&alice, Visibility::Public).await;
    let a = alice.commit("demo", "A", ChangeSet::new().with_file("a.txt", "a")).await.unwrap();

    let commits = alice.catalog().table_id(TableKind::Commits);
    world.store.fail_reads_of(&commits, 1);
    let before = world.store.content_count();
    let err = alice
        .commit("demo", "B", ChangeSet::new().with_file("b.txt", "b"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Storage);
    assert_eq!(world.store.content_count(), before);
    assert_eq!(alice.log("demo").await.unwrap().len(), 1);

    let c = alice.commit("demo", "C", ChangeSet::new().with_file("c.txt", "c")).await.unwrap();
    assert_eq!(c.commit.parent_commit_id, Some(a.commit.id));
    let tree = alice.tree(&c.commit.id).await.unwrap();
    assert_eq!(tree.paths().collect::<Vec<_>>(), vec!["a.txt", "c.txt"]);
}

#[tokio::test]
async fn unreadable_history_fails_the_directory_commit() {
    let world = World::new();
    let alice = world.session();
    demo_repo(&alice, Visibility::Public).await;
    alice.commit("demo", "A", ChangeSet::new().with_file("a.txt", "a")).await.unwrap();
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("b.txt"), "b").unwrap();

    world.store.fail_reads_of(&alice.catalog().table_id(TableKind::Commits), 1);
    let err = alice.commit_directory("demo", "B", dir.path()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Storage);
    assert_eq!(alice.log("demo").await.unwrap().len(), 1);
}

// ----- checkout, status, diff -----

#[tokio::test]
async fn checkout_then_status_is_clean() {
    let world = World::new();
    let alice = world.session();
    demo_repo(&alice, Visibility::Private).await;
    let outcome = alice
        .commit(
            "demo",
            "init",
            ChangeSet::new()
                .with_file("index.html", "<h1>hi</h1>")
                .with_file("src/lib.rs", "pub fn f() {}"),
        )
        .await
        .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let report = alice.checkout(&outcome.commit.id, dir.path()).await.unwrap();
    assert_eq!(report.written, vec!["index.html", "src/lib.rs"]);
    assert_eq!(
        std::fs::read_to_string(dir.path().join("src/lib.rs")).unwrap(),
        "pub fn f() {}"
    );

    assert!(alice.status("demo", dir.path()).await.unwrap().is_clean());
    assert!(alice.status_at(&outcome.commit.id, dir.path()).await.unwrap().is_clean());

    std::fs::write(dir.path().join("index.html"), "<h1>bye</h1>").unwrap();
    std::fs::write(dir.path().join("new.txt"), "n").unwrap();
    let status = alice.status("demo", dir.path()).await.unwrap();
    assert_eq!(status.modified, vec!["index.html"]);
    assert_eq!(status.added, vec!["new.txt"]);
}

#[tokio::test]
async fn checkout_skips_unavailable_entries() {
    let world = World::new();
    let identity = Arc::new(LocalIdentity::generate());
    let alice = world.session_as(identity.clone());
    demo_repo(&alice, Visibility::Public).await;
    let outcome = alice
        .commit(
            "demo",
            "init",
            ChangeSet::new().with_file("a.txt", "a").with_file("b.txt", "b"),
        )
        .await
        .unwrap();
    let tree = alice.tree(&outcome.commit.id).await.unwrap();
    world.store.withhold_content(&tree.get("b.txt").unwrap().content_id);

    // a fresh session has nothing cached
    let later = world.session_as(identity);
    let dir = tempfile::tempdir().unwrap();
    let report = later.checkout(&outcome.commit.id, dir.path()).await.unwrap();
    assert_eq!(report.written, vec!["a.txt"]);
    assert_eq!(report.skipped, vec!["b.txt"]);
}

#[tokio::test]
async fn clone_requires_a_commit() {
    let world = World::new();
    let alice = world.session();
    demo_repo(&alice, Visibility::Public).await;
    let dir = tempfile::tempdir().unwrap();
    let err = alice.clone_repo("demo", dir.path()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn diff_between_commits() {
    let world = World::new();
    let alice = world.session();
    demo_repo(&alice, Visibility::Public).await;
    let a = alice
        .commit(
            "demo",
            "A",
            ChangeSet::new()
                .with_file("notes.txt", "one\ntwo\n")
                .with_file("gone.txt", "bye"),
        )
        .await
        .unwrap();
    let b = alice
        .commit(
            "demo",
            "B",
            ChangeSet::new()
                .with_file("notes.txt", "one\n2\n")
                .with_deletion("gone.txt"),
        )
        .await
        .unwrap();

    let diff = alice.diff("demo", &a.commit.id, &b.commit.id).await.unwrap();
    assert_eq!(diff.files.len(), 2);
    let notes = diff.files.iter().find(|f| f.change.path() == "notes.txt").unwrap();
    let lines = notes.lines.as_ref().unwrap();
    assert_eq!((lines.additions(), lines.deletions()), (1, 1));
    assert!(alice.diff("demo", &b.commit.id, &b.commit.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn raw_files_are_public_only() {
    let world = World::new();
    let alice = world.session();
    demo_repo(&alice, Visibility::Public).await;
    alice
        .commit("demo", "site", ChangeSet::new().with_file("style.css", "body {}"))
        .await
        .unwrap();
    let raw = alice.raw_file("demo", "style.css").await.unwrap();
    assert_eq!(raw.mime, "text/css");
    assert_eq!(raw.bytes, b"body {}");

    alice.create_repo("hidden", "", Visibility::Private).await.unwrap();
    let err = alice.raw_file("hidden", "style.css").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Permission);
}

// ----- private repositories -----

#[tokio::test]
async fn strangers_read_the_access_denied_sentinel() {
    let world = World::new();
    let alice = world.session();
    let mallory = world.session();
    demo_repo(&alice, Visibility::Private).await;
    let outcome = alice
        .commit("demo", "secret", ChangeSet::new().with_file("key.txt", "hunter2"))
        .await
        .unwrap();

    let content = mallory.read_file(&outcome.commit.id, "key.txt").await.unwrap();
    assert_eq!(content, FileContent::AccessDenied);
    assert_eq!(content.to_string(), "[ACCESS_DENIED]");
    let own = alice.read_file(&outcome.commit.id, "key.txt").await.unwrap();
    assert_eq!(own, FileContent::Plain(b"hunter2".to_vec()));
}

#[tokio::test]
async fn collaborators_need_the_exported_key() {
    let world = World::new();
    let alice = world.session();
    let bob = world.session();
    demo_repo(&alice, Visibility::Private).await;
    alice.add_collaborator("demo", &bob.address(), Role::Writer).await.unwrap();
    let outcome = alice
        .commit("demo", "secret", ChangeSet::new().with_file("key.txt", "hunter2"))
        .await
        .unwrap();

    assert!(bob.read_file(&outcome.commit.id, "key.txt").await.unwrap().is_denied());
    let err = bob
        .commit("demo", "m", ChangeSet::new().with_file("b", "b"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Permission);

    let wrong = "00".repeat(32);
    let err = bob.import_repo_key("demo", &wrong).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Decryption);

    let key = alice.export_repo_key("demo").await.unwrap();
    bob.import_repo_key("demo", &key).await.unwrap();
    let content = bob.read_file(&outcome.commit.id, "key.txt").await.unwrap();
    assert_eq!(content.bytes(), Some(&b"hunter2"[..]));
    bob.commit("demo", "m", ChangeSet::new().with_file("b", "b")).await.unwrap();
}

// ----- branches and forks -----

#[tokio::test]
async fn moving_a_branch_keeps_one_entry() {
    let world = World::new();
    let alice = world.session();
    demo_repo(&alice, Visibility::Public).await;
    let a = alice.commit("demo", "A", ChangeSet::new().with_file("a", "1")).await.unwrap();
    let b = alice.commit("demo", "B", ChangeSet::new().with_file("a", "2")).await.unwrap();

    alice.create_branch("demo", "feature", &a.commit.id).await.unwrap();
    alice.create_branch("demo", "feature", &b.commit.id).await.unwrap();

    let branches = alice.list_branches("demo").await.unwrap();
    let features: Vec<_> = branches.iter().filter(|b| b.name == "feature").collect();
    assert_eq!(features.len(), 1);
    assert_eq!(features[0].commit_id, b.commit.id);
    // the default branch follows the latest commit
    assert!(branches.iter().any(|br| br.name == "main" && br.commit_id == b.commit.id));
}

#[tokio::test]
async fn branch_rules() {
    let world = World::new();
    let alice = world.session();
    let bob = world.session();
    demo_repo(&alice, Visibility::Public).await;
    let a = alice.commit("demo", "A", ChangeSet::new().with_file("a", "1")).await.unwrap();

    let err = alice.create_branch("demo", "bad..name", &a.commit.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    let err = bob.create_branch("demo", "feature", &a.commit.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Permission);

    alice.create_repo("other", "", Visibility::Public).await.unwrap();
    let err = alice.create_branch("other", "feature", &a.commit.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn fork_shares_content_by_reference() {
    let world = World::new();
    let alice = world.session();
    let bob = world.session();
    demo_repo(&alice, Visibility::Public).await;
    let source = alice
        .commit("demo", "init", ChangeSet::new().with_file("index.html", "<h1>hi</h1>"))
        .await
        .unwrap();

    let before = world.store.content_count();
    let fork = bob.fork_repo("demo", "demo-fork").await.unwrap();
    assert_eq!(fork.owner, bob.address());
    assert_eq!(world.store.content_count(), before);

    let head = bob.latest_commit("demo-fork").await.unwrap().unwrap();
    assert_eq!(head.tree_id, source.commit.tree_id);
    let dir = tempfile::tempdir().unwrap();
    bob.clone_repo("demo-fork", dir.path()).await.unwrap();
    assert_eq!(
        std::fs::read(dir.path().join("index.html")).unwrap(),
        b"<h1>hi</h1>"
    );

    let forks = alice.forks_of("demo").await.unwrap();
    assert_eq!(forks.len(), 1);
    assert_eq!(forks[0].fork_repo_name, "demo-fork");
    assert!(bob.list_branches("demo-fork").await.unwrap().iter().any(|b| b.name == "main"));
}

#[tokio::test]
async fn private_fork_keeps_the_source_key() {
    let world = World::new();
    let alice = world.session();
    demo_repo(&alice, Visibility::Private).await;
    let source = alice
        .commit("demo", "init", ChangeSet::new().with_file("s.txt", "secret"))
        .await
        .unwrap();
    let fork = alice.fork_repo("demo", "demo-copy").await.unwrap();
    assert_eq!(fork.visibility, Visibility::Private);

    let head = alice.latest_commit("demo-copy").await.unwrap().unwrap();
    assert_eq!(head.tree_id, source.commit.tree_id);
    assert_eq!(
        alice.read_file(&head.id, "s.txt").await.unwrap(),
        FileContent::Plain(b"secret".to_vec())
    );
}

// ----- merges and bounties -----

struct MergeFixture {
    world: World,
    alice: Session,
    bob: Session,
    feature_commit: ledgit_types::RecordId,
    issue: ledgit_types::RecordId,
    pr: ledgit_types::RecordId,
}

async fn merge_fixture() -> MergeFixture {
    let world = World::new();
    let alice = world.session();
    let bob = world.session();
    demo_repo(&alice, Visibility::Public).await;
    alice.commit("demo", "A", ChangeSet::new().with_file("a", "1")).await.unwrap();
    let feature = alice.commit("demo", "B", ChangeSet::new().with_file("a", "2")).await.unwrap();
    alice.create_branch("demo", "feature", &feature.commit.id).await.unwrap();

    let issue = bob
        .create_issue("demo", "a is wrong", "", Some(HALF_UNIT), vec!["bug".into()])
        .await
        .unwrap();
    let pr = bob
        .create_pull_request(
            "demo",
            "fix a",
            &format!("This change fixes #{}", issue.id.short()),
            "feature",
            "main",
        )
        .await
        .unwrap();
    MergeFixture {
        feature_commit: feature.commit.id,
        issue: issue.id,
        pr: pr.id,
        world,
        alice,
        bob,
    }
}

#[tokio::test]
async fn merge_pays_the_bounty() {
    let f = merge_fixture().await;
    f.world
        .rail
        .fund(&f.alice.address(), Amount::from_base_units(1_000_000_000));

    let outcome = f.alice.merge_pull_request(&f.pr).await.unwrap();
    assert_eq!(outcome.pull_request.status, PullRequestStatus::Merged);
    assert_eq!(outcome.pull_request.merged_by, Some(f.alice.address()));
    assert_eq!(outcome.target.commit_id, f.feature_commit);
    assert_eq!(outcome.paid_bounties, vec![(f.issue, HALF_UNIT)]);

    let issue = f.bob.get_issue(&f.issue).await.unwrap();
    assert_eq!(issue.status, IssueStatus::Closed);
    assert_eq!(issue.bounty_status, Some(BountyStatus::Paid));
    assert_eq!(f.world.rail.balance(&f.bob.address()), HALF_UNIT);
    assert_eq!(
        f.alice.resolve_branch("demo", "main").await.unwrap().commit_id,
        f.feature_commit
    );

    let err = f.alice.merge_pull_request(&f.pr).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[tokio::test]
async fn failed_payout_keeps_the_merge() {
    let f = merge_fixture().await;
    f.world.rail.set_failing(true);

    let outcome = f.alice.merge_pull_request(&f.pr).await.unwrap();
    assert_eq!(outcome.pull_request.status, PullRequestStatus::Merged);
    assert_eq!(outcome.failed_payouts, vec![f.issue]);
    assert!(outcome.paid_bounties.is_empty());

    let issue = f.alice.get_issue(&f.issue).await.unwrap();
    assert_eq!(issue.status, IssueStatus::Open);
    assert_eq!(issue.bounty_status, Some(BountyStatus::Active));
    assert_eq!(
        f.bob.get_pull_request(&f.pr).await.unwrap().status,
        PullRequestStatus::Merged
    );
}

#[tokio::test]
async fn bounty_terms_are_fixed_by_the_opening_row() {
    let f = merge_fixture().await;
    f.world
        .rail
        .fund(&f.alice.address(), Amount::from_base_units(10_000_000_000));

    let opened = f.bob.get_issue(&f.issue).await.unwrap();
    let raised = Issue {
        bounty: Some(Amount::from_base_units(9_000_000_000)),
        timestamp: f.bob.stamp_after(opened.timestamp),
        ..opened
    };
    f.bob.log.append(f.bob.identity(), &raised).await.unwrap();
    assert_eq!(f.alice.get_issue(&f.issue).await.unwrap().bounty, Some(HALF_UNIT));

    let outcome = f.alice.merge_pull_request(&f.pr).await.unwrap();
    assert_eq!(outcome.paid_bounties, vec![(f.issue, HALF_UNIT)]);
    assert_eq!(f.world.rail.balance(&f.bob.address()), HALF_UNIT);

    let paid = f.bob.get_issue(&f.issue).await.unwrap();
    let reactivated = Issue {
        status: IssueStatus::Open,
        bounty_status: Some(BountyStatus::Active),
        timestamp: f.bob.stamp_after(paid.timestamp),
        ..paid
    };
    f.bob.log.append(f.bob.identity(), &reactivated).await.unwrap();
    let issue = f.alice.get_issue(&f.issue).await.unwrap();
    assert_eq!(issue.status, IssueStatus::Open);
    assert_eq!(issue.bounty_status, Some(BountyStatus::Paid));
    assert_eq!(issue.active_bounty(), None);
}

#[tokio::test]
async fn only_writers_merge() {
    let f = merge_fixture().await;
    let err = f.bob.merge_pull_request(&f.pr).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Permission);
}

#[tokio::test]
async fn pull_request_needs_an_existing_source() {
    let world = World::new();
    let alice = world.session();
    demo_repo(&alice, Visibility::Public).await;
    let err = alice
        .create_pull_request("demo", "t", "", "nope", "main")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

// ----- collaboration -----

#[tokio::test]
async fn issue_lifecycle_and_comments() {
    let world = World::new();
    let alice = world.session();
    let bob = world.session();
    let mallory = world.session();
    demo_repo(&alice, Visibility::Public).await;
    let issue = bob.create_issue("demo", "broken", "it is", None, vec![]).await.unwrap();

    let err = mallory.close_issue(&issue.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Permission);
    alice.close_issue(&issue.id).await.unwrap();
    assert_eq!(bob.get_issue(&issue.id).await.unwrap().status, IssueStatus::Closed);
    bob.reopen_issue(&issue.id).await.unwrap();
    assert_eq!(alice.list_issues("demo").await.unwrap()[0].status, IssueStatus::Open);

    let first = alice.add_comment("demo", &issue.id, "looking").await.unwrap();
    bob.add_comment("demo", &issue.id, "thanks").await.unwrap();
    let err = bob.edit_comment(&first.id, "hijacked").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Permission);
    alice.edit_comment(&first.id, "fixed it").await.unwrap();

    let comments = bob.list_comments(&issue.id).await.unwrap();
    assert_eq!(comments.len(), 2);
    assert_eq!(comments[0].body, "fixed it");
    assert!(comments[0].edited);
    assert_eq!(comments[1].body, "thanks");
}

#[tokio::test]
async fn reactions_and_stars_toggle() {
    let world = World::new();
    let alice = world.session();
    let bob = world.session();
    demo_repo(&alice, Visibility::Public).await;
    let issue = alice.create_issue("demo", "idea", "", None, vec![]).await.unwrap();
    let target = issue.id.to_string();

    assert!(alice.toggle_reaction(&target, ReactionTarget::Issue, "🚀").await.unwrap());
    assert!(bob.toggle_reaction(&target, ReactionTarget::Issue, "🚀").await.unwrap());
    assert!(!bob.toggle_reaction(&target, ReactionTarget::Issue, "🚀").await.unwrap());
    let err = bob
        .toggle_reaction(&target, ReactionTarget::Issue, "🦀")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let summary = bob.reactions(&target).await.unwrap();
    assert_eq!(summary.len(), 1);
    assert_eq!(summary[0].count, 1);
    assert!(!summary[0].reacted_by_me);

    assert!(bob.toggle_star("demo").await.unwrap());
    assert_eq!(alice.stargazers("demo").await.unwrap(), vec![bob.address()]);
    assert_eq!(alice.starred_repos(&bob.address()).await.unwrap(), vec!["demo"]);
    assert!(!bob.toggle_star("demo").await.unwrap());
    assert!(alice.stargazers("demo").await.unwrap().is_empty());
}

#[tokio::test]
async fn profile_updates_merge() {
    let world = World::new();
    let alice = world.session();
    alice
        .update_profile(ProfileUpdate {
            bio: Some("builder".into()),
            readme: Some("# hello".into()),
            ..ProfileUpdate::default()
        })
        .await
        .unwrap();
    let profile = alice
        .update_profile(ProfileUpdate {
            avatar_url: Some("https://example.org/a.png".into()),
            ..ProfileUpdate::default()
        })
        .await
        .unwrap();
    assert_eq!(profile.bio.as_deref(), Some("builder"));
    assert!(profile.readme_content_id.is_some());

    let seen = world.session().get_profile(&alice.address()).await.unwrap().unwrap();
    assert_eq!(seen, profile);
}

#[tokio::test]
async fn donations_accumulate() {
    let world = World::new();
    let vault = Address::from_key_bytes(&[7u8; 32]);
    let alice_id = Arc::new(LocalIdentity::generate());
    world.rail.fund(&alice_id.address(), Amount::from_base_units(10));

    let mut config = World::config();
    config.funding.pool_address = Some(vault.clone());
    let alice = Session::builder(world.store.clone(), alice_id)
        .payments(world.rail.clone())
        .config(config)
        .build()
        .unwrap();
    let bob = world.session();

    assert_eq!(alice.funding_pool().await.unwrap().total_funds, Amount::ZERO);
    alice.donate_to_pool(Amount::from_base_units(4)).await.unwrap();
    alice.donate_to_pool(Amount::from_base_units(3)).await.unwrap();
    bob.donate_to_pool(Amount::from_base_units(5)).await.unwrap();

    let pool = bob.funding_pool().await.unwrap();
    assert_eq!(pool.total_funds, Amount::from_base_units(12));
    assert_eq!(pool.contributors, 2);
    assert_eq!(world.rail.balance(&vault), Amount::from_base_units(7));

    let err = alice.donate_to_pool(Amount::from_base_units(100)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Payment);
    let err = bob.donate_to_pool(Amount::ZERO).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}
