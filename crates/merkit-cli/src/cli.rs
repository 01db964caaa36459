use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use merkit_types::CommitId;

#[derive(Parser)]
#[command(
    name = "merkit",
    about = "Merkit: content-addressed version control with Merkle-verified commits",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Run as if started in this directory
    #[arg(short = 'C', long = "repo", global = true)]
    pub repo: Option<PathBuf>,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create an empty repository
    Init(InitArgs),
    /// Stage files or directories
    Add(AddArgs),
    /// Unstage a path, keeping the file on disk
    Rm(RmArgs),
    /// Record the staged files as a new commit
    Commit(CommitArgs),
    /// Compare the index against the current commit
    Status(StatusArgs),
    /// Restore a commit into the working tree and detach HEAD
    Checkout(CheckoutArgs),
    /// Compare two commits by Merkle root
    Compare(CompareArgs),
    /// List paths that changed between two commits
    Diff(DiffArgs),
    /// Show commit history from HEAD
    Log(LogArgs),
    /// Show a commit record
    Show(ShowArgs),
    /// Verify one commit, or the whole repository
    Verify(VerifyArgs),
    /// Produce an inclusion proof for a working-tree file
    Prove(ProveArgs),
    /// List branches, or create one at HEAD
    Branch(BranchArgs),
    /// Check out a branch and point HEAD at it
    Switch(SwitchArgs),
}

#[derive(Args)]
pub struct InitArgs {
    pub path: Option<PathBuf>,
    /// Name of the initial branch
    #[arg(short = 'b', long)]
    pub branch: Option<String>,
    /// Skip Merkle root verification on checkout
    #[arg(long)]
    pub no_verify: bool,
}

#[derive(Args)]
pub struct AddArgs {
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,
}

#[derive(Args)]
pub struct RmArgs {
    pub path: String,
}

#[derive(Args)]
pub struct CommitArgs {
    #[arg(short, long)]
    pub message: String,
}

#[derive(Args)]
pub struct StatusArgs {}

#[derive(Args)]
pub struct CheckoutArgs {
    pub commit: CommitId,
}

#[derive(Args)]
pub struct CompareArgs {
    pub a: CommitId,
    pub b: CommitId,
}

#[derive(Args)]
pub struct DiffArgs {
    pub from: CommitId,
    pub to: CommitId,
}

#[derive(Args)]
pub struct LogArgs {
    #[arg(short = 'n', long, default_value = "20")]
    pub limit: usize,
    #[arg(long)]
    pub oneline: bool,
}

#[derive(Args)]
pub struct ShowArgs {
    pub commit: CommitId,
}

#[derive(Args)]
pub struct VerifyArgs {
    /// Commit to verify; checks every reachable commit when omitted
    pub commit: Option<CommitId>,
}

#[derive(Args)]
pub struct ProveArgs {
    pub commit: CommitId,
    pub path: String,
}

#[derive(Args)]
pub struct BranchArgs {
    pub name: Option<String>,
}

#[derive(Args)]
pub struct SwitchArgs {
    pub branch: String,
}
