use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context as _};
use colored::Colorize;
use ledgit_crypto::{LocalIdentity, SigningKey};
use ledgit_sdk::{
    Address, Amount, Commit, EngineConfig, Issue, IssueStatus, PullRequest, PullRequestStatus, RecordId,
    Role, Session, Visibility,
};
use ledgit_store::FileLedgerStore;
use serde::Serialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::cli::*;

const IDENTITY_FILE: &str = "identity.key";
const KEYS_DIR: &str = "keys";
const LEDGER_DIR: &str = "ledger";
const CONFIG_FILE: &str = "config.toml";

/// Everything a command needs: the open session and how to print.
pub struct Context {
    session: Session,
    home: PathBuf,
    json: bool,
}

impl Context {
    fn print<T: Serialize>(&self, value: &T) -> anyhow::Result<bool> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(value)?);
        }
        Ok(self.json)
    }
}

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    let Cli {
        command,
        home,
        config,
        format,
        ..
    } = cli;
    if let Command::Config(args) = command {
        return cmd_config(&home, &args);
    }
    let ctx = open(home, config, format).await?;
    match command {
        Command::Whoami => cmd_whoami(&ctx),
        Command::Repo(args) => cmd_repo(&ctx, args.action).await,
        Command::Commit(args) => cmd_commit(&ctx, args).await,
        Command::Log(args) => cmd_log(&ctx, args).await,
        Command::Show(args) => cmd_show(&ctx, args).await,
        Command::Cat(args) => cmd_cat(&ctx, args).await,
        Command::Checkout(args) => cmd_checkout(&ctx, args).await,
        Command::Clone(args) => cmd_clone(&ctx, args).await,
        Command::Status(args) => cmd_status(&ctx, args).await,
        Command::Diff(args) => cmd_diff(&ctx, args).await,
        Command::Branch(args) => cmd_branch(&ctx, args).await,
        Command::Fork(args) => cmd_fork(&ctx, args).await,
        Command::Collab(args) => cmd_collab(&ctx, args.action).await,
        Command::Key(args) => cmd_key(&ctx, args.action).await,
        Command::Issue(args) => cmd_issue(&ctx, args.action).await,
        Command::Pr(args) => cmd_pr(&ctx, args.action).await,
        Command::Comment(args) => cmd_comment(&ctx, args).await,
        Command::Star(args) => cmd_star(&ctx, args).await,
        Command::Pool(args) => cmd_pool(&ctx, args).await,
        Command::Config(args) => cmd_config(&ctx.home, &args),
    }
}

async fn open(
    home: PathBuf,
    config_arg: Option<PathBuf>,
    format: OutputFormat,
) -> anyhow::Result<Context> {
    tokio::fs::create_dir_all(&home)
        .await
        .with_context(|| format!("creating {}", home.display()))?;

    let explicit = config_arg.is_some();
    let config_path = config_arg.unwrap_or_else(|| home.join(CONFIG_FILE));
    let config = if config_path.exists() {
        EngineConfig::load(&config_path)
            .with_context(|| format!("loading {}", config_path.display()))?
    } else {
        if explicit {
            bail!("config file {} not found", config_path.display());
        }
        EngineConfig::default()
    };

    let identity = load_identity(&home.join(IDENTITY_FILE)).await?;
    let store = FileLedgerStore::open(home.join(LEDGER_DIR))
        .await
        .context("opening the ledger")?;
    let session = Session::builder(Arc::new(store), Arc::new(identity))
        .config(config)
        .build()?;

    let ctx = Context {
        session,
        home,
        json: matches!(format, OutputFormat::Json),
    };
    load_repo_keys(&ctx).await?;
    Ok(ctx)
}

/// Read the signing key, generating and saving one on first use.
async fn load_identity(path: &Path) -> anyhow::Result<LocalIdentity> {
    match tokio::fs::read_to_string(path).await {
        Ok(text) => {
            let key = SigningKey::from_hex(text.trim())
                .with_context(|| format!("invalid identity key in {}", path.display()))?;
            Ok(LocalIdentity::new(key))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            let key = SigningKey::generate();
            write_secret(path, &hex::encode(key.as_bytes())).await?;
            let identity = LocalIdentity::new(key);
            eprintln!(
                "{} Created identity {}",
                "✓".green().bold(),
                identity.verifying_key().to_address().to_string().cyan()
            );
            Ok(identity)
        }
        Err(e) => Err(e).with_context(|| format!("reading {}", path.display())),
    }
}

async fn write_secret(path: &Path, contents: &str) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, contents)
        .await
        .with_context(|| format!("writing {}", path.display()))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600)).await?;
    }
    Ok(())
}

/// Import every saved repository key into the session's key ring.
async fn load_repo_keys(ctx: &Context) -> anyhow::Result<()> {
    let dir = ctx.home.join(KEYS_DIR);
    let mut entries = match tokio::fs::read_dir(&dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e).with_context(|| format!("reading {}", dir.display())),
    };
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("key") {
            continue;
        }
        let Some(repo) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let key = tokio::fs::read_to_string(&path).await?;
        match ctx.session.import_repo_key(repo, key.trim()).await {
            Ok(()) => debug!(repo, "imported repository key"),
            Err(e) => warn!(repo, error = %e, "ignoring saved repository key"),
        }
    }
    Ok(())
}

fn cmd_config(home: &Path, args: &ConfigArgs) -> anyhow::Result<()> {
    let path = home.join(CONFIG_FILE);
    if path.exists() && !args.force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    std::fs::create_dir_all(home)?;
    std::fs::write(&path, EngineConfig::default().to_toml_string()?)?;
    println!("{} Wrote {}", "✓".green().bold(), path.display().to_string().bold());
    Ok(())
}

fn cmd_whoami(ctx: &Context) -> anyhow::Result<()> {
    let address = ctx.session.address();
    if !ctx.print(&address)? {
        println!("{}", address.to_string().cyan());
    }
    Ok(())
}

async fn cmd_repo(ctx: &Context, action: RepoAction) -> anyhow::Result<()> {
    match action {
        RepoAction::Create {
            name,
            description,
            private,
        } => {
            let visibility = Visibility::from_public_flag(!private);
            let repo = ctx.session.create_repo(&name, &description, visibility).await?;
            if !ctx.print(&repo)? {
                println!(
                    "{} Created {} repository {}",
                    "✓".green().bold(),
                    repo.visibility,
                    repo.name.bold()
                );
            }
        }
        RepoAction::List { owner } => {
            let repos = match owner {
                Some(owner) => {
                    let owner: Address = owner.parse().context("invalid owner address")?;
                    ctx.session.repos_owned_by(&owner).await?
                }
                None => ctx.session.list_repos().await?,
            };
            if !ctx.print(&repos)? {
                if repos.is_empty() {
                    println!("No repositories.");
                }
                for repo in &repos {
                    let tag = if repo.is_public() {
                        "public".green()
                    } else {
                        "private".yellow()
                    };
                    println!("{:<24} {:<8} {}", repo.name.bold(), tag, repo.description.dimmed());
                }
            }
        }
        RepoAction::Visibility { name, visibility } => {
            let visibility = match visibility {
                VisibilityArg::Public => Visibility::Public,
                VisibilityArg::Private => Visibility::Private,
            };
            let repo = ctx.session.set_visibility(&name, visibility).await?;
            if !ctx.print(&repo)? {
                println!("{} {} is now {}", "✓".green().bold(), repo.name.bold(), repo.visibility);
            }
        }
    }
    Ok(())
}

async fn cmd_commit(ctx: &Context, args: CommitArgs) -> anyhow::Result<()> {
    let outcome = ctx
        .session
        .commit_directory(&args.repo, &args.message, &args.dir)
        .await?;
    let report = json!({
        "commit": outcome.commit,
        "uploaded": outcome.uploaded,
        "reused": outcome.reused,
        "skipped": outcome.skipped,
        "deleted": outcome.deleted,
    });
    if ctx.print(&report)? {
        return Ok(());
    }
    println!("{} Committed {}", "✓".green().bold(), outcome.commit.id.short().yellow());
    println!(
        "  {} uploaded, {} unchanged, {} deleted",
        outcome.uploaded.len().to_string().bold(),
        outcome.reused.len(),
        outcome.deleted.len()
    );
    for path in &outcome.skipped {
        println!("  {} {}", "skipped:".red(), path);
    }
    Ok(())
}

async fn cmd_log(ctx: &Context, args: LogArgs) -> anyhow::Result<()> {
    let commits: Vec<Commit> = ctx
        .session
        .log(&args.repo)
        .await?
        .into_iter()
        .take(args.limit)
        .collect();
    if ctx.print(&commits)? {
        return Ok(());
    }
    if commits.is_empty() {
        println!("No commits.");
    }
    for commit in &commits {
        if args.oneline {
            println!("{} {}", commit.id.short().yellow(), commit.message);
        } else {
            println!("{} {}", "commit".yellow(), commit.id.to_string().yellow().bold());
            println!("Author: {}", commit.author);
            println!("Date:   {}", commit.timestamp);
            println!("\n    {}\n", commit.message);
        }
    }
    Ok(())
}

async fn cmd_show(ctx: &Context, args: ShowArgs) -> anyhow::Result<()> {
    let commit = ctx.session.resolve_commit(&args.repo, &args.commit).await?;
    let tree = ctx.session.tree(&commit.id).await?;
    if ctx.print(&json!({ "commit": commit, "tree": tree }))? {
        return Ok(());
    }
    println!("{} {}", "commit".yellow(), commit.id.to_string().yellow().bold());
    if let Some(parent) = &commit.parent_commit_id {
        println!("Parent: {}", parent.short().dimmed());
    }
    println!("Author: {}", commit.author);
    println!("Date:   {}", commit.timestamp);
    println!("\n    {}\n", commit.message);
    for (path, entry) in tree.iter() {
        let hash = entry.content_hash.as_str();
        println!("  {}  {}", hash.get(..12).unwrap_or(hash).dimmed(), path);
    }
    Ok(())
}

async fn cmd_cat(ctx: &Context, args: CatArgs) -> anyhow::Result<()> {
    let commit = ctx.session.resolve_commit(&args.repo, &args.commit).await?;
    let content = ctx.session.read_file(&commit.id, &args.path).await?;
    match content.bytes() {
        Some(bytes) => {
            use std::io::Write;
            std::io::stdout().write_all(bytes)?;
            Ok(())
        }
        None => bail!("access denied to {}", args.path),
    }
}

async fn cmd_checkout(ctx: &Context, args: CheckoutArgs) -> anyhow::Result<()> {
    let commit = ctx.session.resolve_commit(&args.repo, &args.commit).await?;
    let report = ctx.session.checkout(&commit.id, &args.dir).await?;
    print_checkout(ctx, &report.commit, &report.written, &report.skipped, &args.dir)
}

async fn cmd_clone(ctx: &Context, args: CloneArgs) -> anyhow::Result<()> {
    let dir = args.dir.unwrap_or_else(|| PathBuf::from(&args.repo));
    let report = ctx.session.clone_repo(&args.repo, &dir).await?;
    print_checkout(ctx, &report.commit, &report.written, &report.skipped, &dir)
}

fn print_checkout(
    ctx: &Context,
    commit: &Commit,
    written: &[String],
    skipped: &[String],
    dir: &Path,
) -> anyhow::Result<()> {
    let report = json!({ "commit": commit.id, "written": written, "skipped": skipped });
    if ctx.print(&report)? {
        return Ok(());
    }
    println!(
        "{} Checked out {} into {} ({} files)",
        "✓".green().bold(),
        commit.id.short().yellow(),
        dir.display().to_string().bold(),
        written.len()
    );
    for path in skipped {
        println!("  {} {}", "skipped:".red(), path);
    }
    Ok(())
}

async fn cmd_status(ctx: &Context, args: StatusArgs) -> anyhow::Result<()> {
    let status = ctx.session.status(&args.repo, &args.dir).await?;
    if ctx.print(&status)? {
        return Ok(());
    }
    if status.is_clean() {
        println!("Working directory clean.");
        return Ok(());
    }
    for path in &status.added {
        println!("  {} {}", "added:   ".green(), path);
    }
    for path in &status.modified {
        println!("  {} {}", "modified:".yellow(), path);
    }
    for path in &status.deleted {
        println!("  {} {}", "deleted: ".red(), path);
    }
    Ok(())
}

async fn cmd_diff(ctx: &Context, args: DiffArgs) -> anyhow::Result<()> {
    let from = ctx.session.resolve_commit(&args.repo, &args.from).await?;
    let to = ctx.session.resolve_commit(&args.repo, &args.to).await?;
    let diff = ctx.session.diff(&args.repo, &from.id, &to.id).await?;
    if ctx.print(&diff)? {
        return Ok(());
    }
    if diff.is_empty() {
        println!("No changes.");
    }
    for file in &diff.files {
        let stat = match &file.lines {
            Some(lines) => format!(
                "{} {}",
                format!("+{}", lines.additions()).green(),
                format!("-{}", lines.deletions()).red()
            ),
            None => "binary or unreadable".dimmed().to_string(),
        };
        println!("{:<40} {}", file.change.path(), stat);
        if args.patch {
            if let Some(lines) = &file.lines {
                print!("{}", lines.to_unified(file.change.path()));
            }
        }
    }
    Ok(())
}

async fn cmd_branch(ctx: &Context, args: BranchArgs) -> anyhow::Result<()> {
    let Some(name) = args.name else {
        let branches = ctx.session.list_branches(&args.repo).await?;
        if !ctx.print(&branches)? {
            if branches.is_empty() {
                println!("No branches.");
            }
            for branch in &branches {
                println!("  {:<24} {}", branch.name.green(), branch.commit_id.short().yellow());
            }
        }
        return Ok(());
    };
    let commit = match args.at {
        Some(prefix) => ctx.session.resolve_commit(&args.repo, &prefix).await?,
        None => match ctx.session.latest_commit(&args.repo).await? {
            Some(commit) => commit,
            None => bail!("{} has no commits to branch from", args.repo),
        },
    };
    let branch = ctx.session.create_branch(&args.repo, &name, &commit.id).await?;
    if !ctx.print(&branch)? {
        println!(
            "{} Created branch {} at {}",
            "✓".green().bold(),
            branch.name.yellow(),
            branch.commit_id.short()
        );
    }
    Ok(())
}

async fn cmd_fork(ctx: &Context, args: ForkArgs) -> anyhow::Result<()> {
    let repo = ctx.session.fork_repo(&args.source, &args.name).await?;
    if !ctx.print(&repo)? {
        println!(
            "{} Forked {} as {}",
            "✓".green().bold(),
            args.source.bold(),
            repo.name.bold()
        );
    }
    Ok(())
}

async fn cmd_collab(ctx: &Context, action: CollabAction) -> anyhow::Result<()> {
    match action {
        CollabAction::Add {
            repo,
            address,
            role,
        } => {
            let user: Address = address.parse().context("invalid collaborator address")?;
            let role = match role {
                RoleArg::Writer => Role::Writer,
                RoleArg::Admin => Role::Admin,
            };
            let collaborator = ctx.session.add_collaborator(&repo, &user, role).await?;
            if !ctx.print(&collaborator)? {
                println!("{} Added {} as {}", "✓".green().bold(), user.short().cyan(), role);
            }
        }
        CollabAction::Remove { repo, address } => {
            let user: Address = address.parse().context("invalid collaborator address")?;
            ctx.session.remove_collaborator(&repo, &user).await?;
            println!("{} Removed {}", "✓".green().bold(), user.short().cyan());
        }
        CollabAction::List { repo } => {
            let collaborators = ctx.session.list_collaborators(&repo).await?;
            if !ctx.print(&collaborators)? {
                if collaborators.is_empty() {
                    println!("No collaborators.");
                }
                for c in &collaborators {
                    println!("  {} {}", c.user_address.to_string().cyan(), c.role);
                }
            }
        }
    }
    Ok(())
}

async fn cmd_key(ctx: &Context, action: KeyAction) -> anyhow::Result<()> {
    match action {
        KeyAction::Export { repo } => {
            println!("{}", ctx.session.export_repo_key(&repo).await?);
        }
        KeyAction::Import { repo, key } => {
            ctx.session.import_repo_key(&repo, key.trim()).await?;
            let path = ctx.home.join(KEYS_DIR).join(format!("{repo}.key"));
            write_secret(&path, key.trim()).await?;
            println!("{} Saved key for {}", "✓".green().bold(), repo.bold());
        }
    }
    Ok(())
}

fn parse_id(s: &str) -> anyhow::Result<RecordId> {
    s.parse().with_context(|| format!("invalid id {s:?}"))
}

fn parse_amount(s: &str) -> anyhow::Result<Amount> {
    s.parse().with_context(|| format!("invalid amount {s:?}"))
}

fn print_issue(issue: &Issue) {
    let status = match issue.status {
        IssueStatus::Open => "open".green(),
        IssueStatus::Closed => "closed".red(),
    };
    let bounty = issue
        .active_bounty()
        .map(|b| format!(" [bounty {b}]").yellow().to_string())
        .unwrap_or_default();
    println!("{} {:<6} {}{}", issue.id.short().yellow(), status, issue.title, bounty);
}

async fn cmd_issue(ctx: &Context, action: IssueAction) -> anyhow::Result<()> {
    match action {
        IssueAction::Create {
            repo,
            title,
            body,
            bounty,
            label,
        } => {
            let bounty = bounty.as_deref().map(parse_amount).transpose()?;
            let issue = ctx
                .session
                .create_issue(&repo, &title, &body, bounty, label)
                .await?;
            if !ctx.print(&issue)? {
                println!("{} Opened issue {}", "✓".green().bold(), issue.id.to_string().yellow());
            }
        }
        IssueAction::List { repo } => {
            let issues = ctx.session.list_issues(&repo).await?;
            if !ctx.print(&issues)? {
                if issues.is_empty() {
                    println!("No issues.");
                }
                issues.iter().for_each(print_issue);
            }
        }
        IssueAction::Show { id } => {
            let issue = ctx.session.get_issue(&parse_id(&id)?).await?;
            let comments = ctx.session.list_comments(&issue.id).await?;
            if !ctx.print(&json!({ "issue": issue, "comments": comments }))? {
                print_issue(&issue);
                if !issue.body.is_empty() {
                    println!("\n{}\n", issue.body);
                }
                for comment in &comments {
                    println!("{} {}", comment.author.short().cyan(), comment.body);
                }
            }
        }
        IssueAction::Close { id } => {
            let issue = ctx.session.close_issue(&parse_id(&id)?).await?;
            if !ctx.print(&issue)? {
                print_issue(&issue);
            }
        }
        IssueAction::Reopen { id } => {
            let issue = ctx.session.reopen_issue(&parse_id(&id)?).await?;
            if !ctx.print(&issue)? {
                print_issue(&issue);
            }
        }
    }
    Ok(())
}

fn print_pull_request(pr: &PullRequest) {
    let status = match pr.status {
        PullRequestStatus::Open => "open".green(),
        PullRequestStatus::Closed => "closed".red(),
        PullRequestStatus::Merged => "merged".magenta(),
    };
    println!(
        "{} {:<6} {} ({} → {})",
        pr.id.short().yellow(),
        status,
        pr.title,
        pr.source_branch.cyan(),
        pr.target_branch.cyan()
    );
}

async fn cmd_pr(ctx: &Context, action: PrAction) -> anyhow::Result<()> {
    match action {
        PrAction::Create {
            repo,
            title,
            source,
            target,
            description,
        } => {
            let pr = ctx
                .session
                .create_pull_request(&repo, &title, &description, &source, &target)
                .await?;
            if !ctx.print(&pr)? {
                println!("{} Opened pull request {}", "✓".green().bold(), pr.id.to_string().yellow());
            }
        }
        PrAction::List { repo } => {
            let prs = ctx.session.list_pull_requests(&repo).await?;
            if !ctx.print(&prs)? {
                if prs.is_empty() {
                    println!("No pull requests.");
                }
                prs.iter().for_each(print_pull_request);
            }
        }
        PrAction::Close { id } => {
            let pr = ctx.session.close_pull_request(&parse_id(&id)?).await?;
            if !ctx.print(&pr)? {
                print_pull_request(&pr);
            }
        }
        PrAction::Merge { id } => {
            let outcome = ctx.session.merge_pull_request(&parse_id(&id)?).await?;
            let report = json!({
                "pullRequest": outcome.pull_request,
                "target": outcome.target,
                "closedIssues": outcome.closed_issues,
                "paidBounties": outcome.paid_bounties,
                "failedPayouts": outcome.failed_payouts,
            });
            if ctx.print(&report)? {
                return Ok(());
            }
            println!(
                "{} Merged into {} at {}",
                "✓".green().bold(),
                outcome.target.name.yellow(),
                outcome.target.commit_id.short()
            );
            for issue in &outcome.closed_issues {
                println!("  closed issue {}", issue.short().yellow());
            }
            for (issue, amount) in &outcome.paid_bounties {
                println!("  paid {} for issue {}", amount.to_string().green(), issue.short());
            }
            for issue in &outcome.failed_payouts {
                println!("  {} bounty payout for issue {}", "failed:".red(), issue.short());
            }
        }
    }
    Ok(())
}

async fn cmd_comment(ctx: &Context, args: CommentArgs) -> anyhow::Result<()> {
    let comment = ctx
        .session
        .add_comment(&args.repo, &parse_id(&args.target)?, &args.body)
        .await?;
    if !ctx.print(&comment)? {
        println!("{} Commented {}", "✓".green().bold(), comment.id.short().yellow());
    }
    Ok(())
}

async fn cmd_star(ctx: &Context, args: StarArgs) -> anyhow::Result<()> {
    let starred = ctx.session.toggle_star(&args.repo).await?;
    let count = ctx.session.stargazers(&args.repo).await?.len();
    if !ctx.print(&json!({ "starred": starred, "stars": count }))? {
        let verb = if starred { "Starred" } else { "Unstarred" };
        println!("{} {} {} ({} stars)", "✓".green().bold(), verb, args.repo.bold(), count);
    }
    Ok(())
}

async fn cmd_pool(ctx: &Context, args: PoolArgs) -> anyhow::Result<()> {
    let pool = match args.donate {
        Some(amount) => ctx.session.donate_to_pool(parse_amount(&amount)?).await?,
        None => ctx.session.funding_pool().await?,
    };
    if !ctx.print(&pool)? {
        println!("Funding pool: {}", pool.total_funds.to_string().green().bold());
        println!("  Contributors: {}", pool.contributors);
        println!("  Matching: {}x", pool.matching_multiplier);
    }
    Ok(())
}
