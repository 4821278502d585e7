use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "ledgit",
    about = "ledgit: version control and collaboration on an append-only ledger",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Directory holding the ledger, the identity key and imported repo keys
    #[arg(long, global = true, default_value = ".ledgit")]
    pub home: PathBuf,

    /// Engine configuration file (defaults to <home>/config.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum VisibilityArg {
    Public,
    Private,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum RoleArg {
    Writer,
    Admin,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show the address of the local identity, creating it if needed
    Whoami,
    /// Create, list or change repositories
    Repo(RepoArgs),
    /// Commit a directory's contents to a repository
    Commit(CommitArgs),
    /// Show a repository's commit history
    Log(LogArgs),
    /// Show a commit and its files
    Show(ShowArgs),
    /// Print one file from a commit
    Cat(CatArgs),
    /// Write a commit's files to a directory
    Checkout(CheckoutArgs),
    /// Check out a repository's latest commit
    Clone(CloneArgs),
    /// Compare a directory against a repository's latest commit
    Status(StatusArgs),
    /// Show changes between two commits
    Diff(DiffArgs),
    /// List or create branches
    Branch(BranchArgs),
    /// Fork a repository under the local identity
    Fork(ForkArgs),
    /// Manage collaborators
    Collab(CollabArgs),
    /// Export or import a private repository's key
    Key(KeyArgs),
    /// Open, list or change issues
    Issue(IssueArgs),
    /// Open, list, close or merge pull requests
    Pr(PrArgs),
    /// Comment on an issue or pull request
    Comment(CommentArgs),
    /// Star or unstar a repository
    Star(StarArgs),
    /// Show or donate to the funding pool
    Pool(PoolArgs),
    /// Write the default engine configuration
    Config(ConfigArgs),
}

#[derive(Args)]
pub struct RepoArgs {
    #[command(subcommand)]
    pub action: RepoAction,
}

#[derive(Subcommand)]
pub enum RepoAction {
    Create {
        name: String,
        #[arg(short, long, default_value = "")]
        description: String,
        #[arg(long)]
        private: bool,
    },
    List {
        /// Only repositories owned by this address
        #[arg(long)]
        owner: Option<String>,
    },
    Visibility {
        name: String,
        visibility: VisibilityArg,
    },
}

#[derive(Args)]
pub struct CommitArgs {
    pub repo: String,
    #[arg(default_value = ".")]
    pub dir: PathBuf,
    #[arg(short, long)]
    pub message: String,
}

#[derive(Args)]
pub struct LogArgs {
    pub repo: String,
    #[arg(short = 'n', long, default_value = "20")]
    pub limit: usize,
    #[arg(long)]
    pub oneline: bool,
}

#[derive(Args)]
pub struct ShowArgs {
    pub repo: String,
    /// Commit id or unique id prefix
    pub commit: String,
}

#[derive(Args)]
pub struct CatArgs {
    pub repo: String,
    pub commit: String,
    pub path: String,
}

#[derive(Args)]
pub struct CheckoutArgs {
    pub repo: String,
    pub commit: String,
    pub dir: PathBuf,
}

#[derive(Args)]
pub struct CloneArgs {
    pub repo: String,
    pub dir: Option<PathBuf>,
}

#[derive(Args)]
pub struct StatusArgs {
    pub repo: String,
    #[arg(default_value = ".")]
    pub dir: PathBuf,
}

#[derive(Args)]
pub struct DiffArgs {
    pub repo: String,
    pub from: String,
    pub to: String,
    /// Print unified line diffs, not just the changed paths
    #[arg(short, long)]
    pub patch: bool,
}

#[derive(Args)]
pub struct BranchArgs {
    pub repo: String,
    pub name: Option<String>,
    /// Commit the new branch points at (defaults to the latest commit)
    #[arg(long)]
    pub at: Option<String>,
}

#[derive(Args)]
pub struct ForkArgs {
    pub source: String,
    pub name: String,
}

#[derive(Args)]
pub struct CollabArgs {
    #[command(subcommand)]
    pub action: CollabAction,
}

#[derive(Subcommand)]
pub enum CollabAction {
    Add {
        repo: String,
        address: String,
        #[arg(long, default_value = "writer")]
        role: RoleArg,
    },
    Remove {
        repo: String,
        address: String,
    },
    List {
        repo: String,
    },
}

#[derive(Args)]
pub struct KeyArgs {
    #[command(subcommand)]
    pub action: KeyAction,
}

#[derive(Subcommand)]
pub enum KeyAction {
    Export { repo: String },
    Import { repo: String, key: String },
}

#[derive(Args)]
pub struct IssueArgs {
    #[command(subcommand)]
    pub action: IssueAction,
}

#[derive(Subcommand)]
pub enum IssueAction {
    Create {
        repo: String,
        title: String,
        #[arg(short, long, default_value = "")]
        body: String,
        /// Bounty in whole units, e.g. 0.5
        #[arg(long)]
        bounty: Option<String>,
        #[arg(short, long)]
        label: Vec<String>,
    },
    List {
        repo: String,
    },
    Show {
        id: String,
    },
    Close {
        id: String,
    },
    Reopen {
        id: String,
    },
}

#[derive(Args)]
pub struct PrArgs {
    #[command(subcommand)]
    pub action: PrAction,
}

#[derive(Subcommand)]
pub enum PrAction {
    Create {
        repo: String,
        title: String,
        #[arg(long)]
        source: String,
        #[arg(long, default_value = "main")]
        target: String,
        #[arg(short, long, default_value = "")]
        description: String,
    },
    List {
        repo: String,
    },
    Close {
        id: String,
    },
    Merge {
        id: String,
    },
}

#[derive(Args)]
pub struct CommentArgs {
    pub repo: String,
    /// Issue or pull request id
    pub target: String,
    pub body: String,
}

#[derive(Args)]
pub struct StarArgs {
    pub repo: String,
}

#[derive(Args)]
pub struct PoolArgs {
    /// Donate this many whole units
    #[arg(long)]
    pub donate: Option<String>,
}

#[derive(Args)]
pub struct ConfigArgs {
    /// Overwrite an existing file
    #[arg(long)]
    pub force: bool,
}
