use std::env;
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use chrono::{DateTime, SecondsFormat, Utc};
use colored::Colorize;
use merkit_sdk::{
    Branch, ChangeSet, CheckoutReport, Commit, CommitComparison, CommitId, Digest, FileStatus, Head,
    RepoConfig, Repository,
};
use serde::Serialize;

use crate::cli::*;

struct Context {
    /// Absolute directory given with `-C`, if any.
    repo: Option<PathBuf>,
    format: OutputFormat,
}

impl Context {
    fn base_dir(&self) -> anyhow::Result<PathBuf> {
        match &self.repo {
            Some(dir) => Ok(dir.clone()),
            None => Ok(env::current_dir()?),
        }
    }

    fn open(&self) -> anyhow::Result<Repository> {
        let base = self.base_dir()?;
        Repository::discover(&base).with_context(|| format!("opening repository at {}", base.display()))
    }

    fn json(&self) -> bool {
        self.format == OutputFormat::Json
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[derive(Debug, Serialize)]
struct Unstaged<'a> {
    path: &'a str,
    digest: Digest,
}

#[derive(Debug, Serialize)]
struct BranchSummary<'a> {
    name: &'a str,
    latest: Option<CommitId>,
}

impl<'a> From<&'a Branch> for BranchSummary<'a> {
    fn from(branch: &'a Branch) -> Self {
        Self {
            name: &branch.name,
            latest: branch.latest,
        }
    }
}

#[derive(Debug, Serialize)]
struct Switched<'a> {
    branch: &'a str,
    checkout: Option<&'a CheckoutReport>,
}

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let repo = match cli.repo {
        Some(dir) => Some(env::current_dir()?.join(dir)),
        None => None,
    };
    let ctx = Context {
        repo,
        format: cli.format,
    };
    tracing::debug!(repo = ?ctx.repo, format = ?ctx.format, "running command");
    match cli.command {
        Command::Init(args) => cmd_init(&ctx, args),
        Command::Add(args) => cmd_add(&ctx, args),
        Command::Rm(args) => cmd_rm(&ctx, args),
        Command::Commit(args) => cmd_commit(&ctx, args),
        Command::Status(_) => cmd_status(&ctx),
        Command::Checkout(args) => cmd_checkout(&ctx, args),
        Command::Compare(args) => cmd_compare(&ctx, args),
        Command::Diff(args) => cmd_diff(&ctx, args),
        Command::Log(args) => cmd_log(&ctx, args),
        Command::Show(args) => cmd_show(&ctx, args),
        Command::Verify(args) => cmd_verify(&ctx, args),
        Command::Prove(args) => cmd_prove(&ctx, args),
        Command::Branch(args) => cmd_branch(&ctx, args),
        Command::Switch(args) => cmd_switch(&ctx, args),
    }
}

fn format_time(ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(ms)
        .map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_else(|| ms.to_string())
}

fn describe_head(head: Option<&Head>) -> String {
    match head {
        Some(Head::Symbolic(name)) => format!("On branch {}", name.yellow().bold()),
        Some(Head::Detached(id)) => format!("HEAD detached at {}", id.short_hex().yellow()),
        None => "HEAD is not set".dimmed().to_string(),
    }
}

fn print_changes(changes: &ChangeSet) {
    for entry in changes.entries() {
        let label = match entry.status {
            FileStatus::New => "new:     ".green(),
            FileStatus::Modified => "modified:".yellow(),
            FileStatus::Deleted => "deleted: ".red(),
        };
        println!("  {} {}", label, entry.path);
    }
}

fn cmd_init(ctx: &Context, args: InitArgs) -> anyhow::Result<()> {
    let base = ctx.base_dir()?;
    let root = match args.path {
        Some(path) => base.join(path),
        None => base,
    };
    let mut config = RepoConfig::default();
    if let Some(branch) = args.branch {
        config.default_branch = branch;
    }
    config.verify_on_checkout = !args.no_verify;

    let repo = Repository::init_with_config(&root, config)
        .with_context(|| format!("initializing repository at {}", root.display()))?;
    println!(
        "{} Initialized empty merkit repository in {}",
        "✓".green().bold(),
        repo.layout().repo_dir.display().to_string().bold()
    );
    println!("  Branch: {}", repo.config().default_branch.yellow());
    Ok(())
}

fn cmd_add(ctx: &Context, args: AddArgs) -> anyhow::Result<()> {
    let repo = ctx.open()?;
    let base = ctx.base_dir()?;
    let mut staged = Vec::new();
    for path in &args.paths {
        let entries = repo
            .add(base.join(path))
            .with_context(|| format!("adding {}", path.display()))?;
        staged.extend(entries);
    }
    if ctx.json() {
        return print_json(&staged);
    }
    for entry in &staged {
        println!("  {} {} {}", "staged:".green(), entry.file_path, entry.hash.short_hex().dimmed());
    }
    Ok(())
}

fn cmd_rm(ctx: &Context, args: RmArgs) -> anyhow::Result<()> {
    let repo = ctx.open()?;
    let digest = repo.remove(&args.path)?;
    if ctx.json() {
        return print_json(&Unstaged {
            path: &args.path,
            digest,
        });
    }
    println!("  {} {}", "unstaged:".red(), args.path);
    Ok(())
}

fn cmd_commit(ctx: &Context, args: CommitArgs) -> anyhow::Result<()> {
    let repo = ctx.open()?;
    let commit = repo.commit(&args.message)?;
    if ctx.json() {
        return print_json(&commit);
    }
    println!("{} [{}] {}", "✓".green().bold(), commit.id.short_hex().yellow(), commit.message);
    println!("  Files: {}", commit.snapshot.len());
    println!("  Merkle root: {}", commit.merkle_root.to_hex().cyan());
    Ok(())
}

fn cmd_status(ctx: &Context) -> anyhow::Result<()> {
    let repo = ctx.open()?;
    let changes = repo.status()?;
    if ctx.json() {
        return print_json(&changes);
    }
    println!("{}", describe_head(repo.head()?.as_ref()));
    if changes.is_clean() {
        println!("\nNothing to commit, index matches HEAD.");
    } else {
        println!("\nChanges to be committed:");
        print_changes(&changes);
    }
    Ok(())
}

fn cmd_checkout(ctx: &Context, args: CheckoutArgs) -> anyhow::Result<()> {
    let repo = ctx.open()?;
    let report = repo.checkout(&args.commit)?;
    if ctx.json() {
        return print_json(&report);
    }
    println!(
        "{} Checked out {} ({} files restored)",
        "✓".green().bold(),
        report.commit.short_hex().yellow(),
        report.restored.len()
    );
    for missing in &report.missing {
        println!(
            "  {} {} (object {} not found)",
            "missing:".red().bold(),
            missing.path,
            missing.digest.short_hex()
        );
    }
    println!("HEAD is now detached at {}", report.commit.short_hex().yellow());
    Ok(())
}

fn cmd_compare(ctx: &Context, args: CompareArgs) -> anyhow::Result<()> {
    let repo = ctx.open()?;
    let result = repo.compare_commits(&args.a, &args.b)?;
    if ctx.json() {
        return print_json(&result);
    }
    match result {
        CommitComparison::Equal => println!("{} {}", "✓".green().bold(), "equal".green()),
        CommitComparison::Differ => println!("{} {}", "✗".red().bold(), "differ".red()),
    }
    Ok(())
}

fn cmd_diff(ctx: &Context, args: DiffArgs) -> anyhow::Result<()> {
    let repo = ctx.open()?;
    let changes = repo.diff_commits(&args.from, &args.to)?;
    if ctx.json() {
        return print_json(&changes);
    }
    if changes.is_clean() {
        println!("No changes.");
    } else {
        print_changes(&changes);
    }
    Ok(())
}

fn print_commit(commit: &Commit) {
    println!("{} {}", "commit".yellow(), commit.id.to_hex().yellow().bold());
    if let Some(parent) = &commit.parent {
        println!("Parent: {}", parent.to_hex().dimmed());
    }
    println!("Date:   {}", format_time(commit.timestamp));
    println!("Root:   {}", commit.merkle_root.to_hex().cyan());
    println!("\n    {}\n", commit.message);
}

fn cmd_log(ctx: &Context, args: LogArgs) -> anyhow::Result<()> {
    let repo = ctx.open()?;
    let commits = repo.log(args.limit)?;
    if ctx.json() {
        return print_json(&commits);
    }
    if commits.is_empty() {
        println!("No commits yet.");
    }
    for commit in &commits {
        if args.oneline {
            println!("{} {}", commit.id.short_hex().yellow(), commit.message);
        } else {
            print_commit(commit);
        }
    }
    Ok(())
}

fn cmd_show(ctx: &Context, args: ShowArgs) -> anyhow::Result<()> {
    let repo = ctx.open()?;
    let commit = repo.show(&args.commit)?;
    if ctx.json() {
        return print_json(&commit);
    }
    print_commit(&commit);
    for entry in &commit.snapshot {
        println!("  {} {}", entry.hash.short_hex().dimmed(), entry.file_path);
    }
    Ok(())
}

fn cmd_verify(ctx: &Context, args: VerifyArgs) -> anyhow::Result<()> {
    let repo = ctx.open()?;
    if let Some(id) = args.commit {
        let commit = repo.verify_commit(&id)?;
        if ctx.json() {
            return print_json(&commit);
        }
        println!(
            "{} Commit {} verified (root {})",
            "✓".green().bold(),
            commit.id.short_hex().yellow(),
            commit.merkle_root.short_hex().cyan()
        );
        return Ok(());
    }

    let report = repo.fsck()?;
    if ctx.json() {
        print_json(&report)?;
    } else {
        println!("Checked {} commits", report.commits_checked.to_string().bold());
        for c in &report.corrupt_commits {
            println!("  {} commit {} root mismatch", "corrupt:".red().bold(), c.commit.short_hex());
        }
        for id in &report.missing_commits {
            println!("  {} commit {}", "missing:".red().bold(), id.short_hex());
        }
        for o in &report.missing_objects {
            println!("  {} object {} ({})", "missing:".red().bold(), o.digest.short_hex(), o.path);
        }
        for o in &report.damaged_objects {
            println!("  {} object {} ({})", "damaged:".red().bold(), o.digest.short_hex(), o.path);
        }
        if report.is_clean() {
            println!("{} No issues.", "✓".green().bold());
        }
    }
    if !report.is_clean() {
        anyhow::bail!("repository integrity check failed");
    }
    Ok(())
}

fn cmd_prove(ctx: &Context, args: ProveArgs) -> anyhow::Result<()> {
    let repo = ctx.open()?;
    let path = repo_relative(&repo, &ctx.base_dir()?, &args.path);
    let Some(proof) = repo.prove_file(&args.commit, &path)? else {
        anyhow::bail!("{path} does not match any file in commit {}", args.commit.short_hex());
    };
    let valid = repo.verify_file_proof(&proof)?;
    if ctx.json() {
        return print_json(&proof);
    }
    println!("Proof for {} in {}", proof.path.bold(), proof.commit.short_hex().yellow());
    println!("  Leaf: {}", proof.proof.leaf.to_hex());
    for (i, step) in proof.proof.path.iter().enumerate() {
        println!("  {:>3} {:?} {}", i, step.side, step.sibling.to_hex().dimmed());
    }
    println!("  Root: {}", proof.root.to_hex().cyan());
    if valid {
        println!("{} verified", "✓".green().bold());
    } else {
        println!("{} does not verify", "✗".red().bold());
    }
    Ok(())
}

/// Interpret `path` relative to `base`, expressed against the working-tree root.
fn repo_relative(repo: &Repository, base: &Path, path: &str) -> String {
    let abs = base.join(path);
    match abs.strip_prefix(&repo.layout().root) {
        Ok(rel) => rel.to_string_lossy().into_owned(),
        Err(_) => path.to_string(),
    }
}

fn cmd_branch(ctx: &Context, args: BranchArgs) -> anyhow::Result<()> {
    let repo = ctx.open()?;
    if let Some(name) = args.name {
        let branch = repo.create_branch(&name)?;
        if ctx.json() {
            return print_json(&BranchSummary::from(&branch));
        }
        let at = branch
            .latest
            .map(|id| id.short_hex())
            .unwrap_or_else(|| "(no commits)".into());
        println!("Created branch {} at {}", branch.name.yellow(), at);
        return Ok(());
    }

    let branches = repo.list_branches()?;
    if ctx.json() {
        return print_json(&branches.iter().map(BranchSummary::from).collect::<Vec<_>>());
    }
    let head = repo.head()?;
    let current = head.as_ref().and_then(|h| h.branch());
    for branch in &branches {
        let tip = branch.latest.map(|id| id.short_hex()).unwrap_or_default();
        if current == Some(branch.name.as_str()) {
            println!("* {} {}", branch.name.green().bold(), tip.dimmed());
        } else {
            println!("  {} {}", branch.name, tip.dimmed());
        }
    }
    if let Some(Head::Detached(id)) = head {
        println!("{}", format!("(HEAD detached at {})", id.short_hex()).dimmed());
    }
    Ok(())
}

fn cmd_switch(ctx: &Context, args: SwitchArgs) -> anyhow::Result<()> {
    let repo = ctx.open()?;
    let report = repo.switch_branch(&args.branch)?;
    if ctx.json() {
        return print_json(&Switched {
            branch: &args.branch,
            checkout: report.as_ref(),
        });
    }
    println!("Switched to branch {}", args.branch.yellow().bold());
    if let Some(report) = report {
        for missing in &report.missing {
            println!("  {} {}", "missing:".red().bold(), missing.path);
        }
    }
    Ok(())
}
