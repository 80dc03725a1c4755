//! Commands that run through a repository's command server.

use std::io::Write;

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use colored::Colorize;
use hgcmd::{
    ArchiveOptions, Client, CommitOptions, FileStatus, HeadsOptions, LogOptions, MergeOptions,
    PullOptions, PushOptions, RemoteLogOptions, ResolveOptions, Revision, Status, StatusOptions,
    UpdateOptions,
};
use serde::Serialize;

use crate::OutputFormat;

/// Parses `YYYY-MM-DD HH:MM:SS`.
fn parse_date(s: &str) -> Result<NaiveDateTime, String> {
    NaiveDateTime::parse_from_str(s, hgcmd::DATE_FORMAT)
        .map_err(|e| format!("expected \"YYYY-MM-DD HH:MM:SS\": {e}"))
}

/// Arguments for `hgcmd cat`.
#[derive(clap::Args)]
pub struct CatArgs {
    /// Revision (default: working directory parent).
    #[arg(short, long)]
    pub rev: Option<String>,

    /// File to print.
    pub file: String,
}

/// Arguments for `hgcmd remove`.
#[derive(clap::Args)]
pub struct RemoveArgs {
    /// Record files that are already deleted.
    #[arg(short = 'A', long)]
    pub after: bool,

    /// Remove even if modified or just added.
    #[arg(short, long)]
    pub force: bool,

    /// Files to remove.
    #[arg(required = true, num_args = 1..)]
    pub files: Vec<String>,
}

/// Arguments for `hgcmd commit`.
#[derive(clap::Args)]
pub struct CommitArgs {
    /// Commit message.
    #[arg(short, long)]
    pub message: String,

    /// Add new and remove missing files first.
    #[arg(short = 'A', long)]
    pub addremove: bool,

    /// Close the branch head.
    #[arg(long)]
    pub close_branch: bool,

    /// Committer.
    #[arg(short, long)]
    pub user: Option<String>,

    /// Commit date (YYYY-MM-DD HH:MM:SS).
    #[arg(short, long, value_parser = parse_date)]
    pub date: Option<NaiveDateTime>,

    /// Include pattern.
    #[arg(short = 'I', long)]
    pub include: Option<String>,

    /// Exclude pattern.
    #[arg(short = 'X', long)]
    pub exclude: Option<String>,

    /// Only commit these files.
    pub files: Vec<String>,
}

/// Arguments for `hgcmd log`.
#[derive(clap::Args)]
pub struct LogArgs {
    /// Revision or revset.
    #[arg(short, long)]
    pub rev: Option<String>,

    /// Follow copies and renames.
    #[arg(short, long)]
    pub follow: bool,

    /// Only revisions committed at or after this date.
    #[arg(long, value_parser = parse_date)]
    pub since: Option<NaiveDateTime>,

    /// Only revisions committed at or before this date.
    #[arg(long, value_parser = parse_date)]
    pub until: Option<NaiveDateTime>,

    /// Search messages, users, and files.
    #[arg(short, long)]
    pub keyword: Option<String>,

    /// Only this committer.
    #[arg(short, long)]
    pub user: Option<String>,

    /// Only this branch.
    #[arg(short, long)]
    pub branch: Option<String>,

    /// Hide merges.
    #[arg(short = 'M', long)]
    pub no_merges: bool,

    /// Maximum number of revisions.
    #[arg(short, long)]
    pub limit: Option<u32>,

    /// Output format.
    #[arg(long, default_value = "table")]
    pub format: OutputFormat,

    /// Only history of these files.
    pub files: Vec<String>,
}

/// Arguments for `hgcmd status`.
#[derive(clap::Args)]
pub struct StatusArgs {
    /// Show every file, including clean and ignored ones.
    #[arg(short = 'A', long, conflicts_with_all = ["modified", "added", "unknown"])]
    pub all: bool,

    /// Only modified files.
    #[arg(short, long)]
    pub modified: bool,

    /// Only added files.
    #[arg(short, long)]
    pub added: bool,

    /// Only untracked files.
    #[arg(short, long)]
    pub unknown: bool,

    /// Hide untracked files.
    #[arg(short, long)]
    pub quiet: bool,

    /// Compare against this revision.
    #[arg(long)]
    pub rev: Option<String>,

    /// Changes made by this revision.
    #[arg(short, long)]
    pub change: Option<String>,

    /// Output format.
    #[arg(long, default_value = "table")]
    pub format: OutputFormat,

    /// Only these files.
    pub files: Vec<String>,
}

/// Arguments for `hgcmd heads`.
#[derive(clap::Args)]
pub struct HeadsArgs {
    /// Only heads descending from this revision.
    #[arg(short, long)]
    pub rev: Option<String>,

    /// Topological heads only.
    #[arg(short, long)]
    pub topo: bool,

    /// Include closed branch heads.
    #[arg(short, long)]
    pub closed: bool,

    /// Output format.
    #[arg(long, default_value = "table")]
    pub format: OutputFormat,
}

/// Arguments for `hgcmd push`.
#[derive(clap::Args)]
pub struct PushArgs {
    /// Only push this revision and its ancestors.
    #[arg(short, long)]
    pub rev: Option<String>,

    /// Push even if new remote heads are created.
    #[arg(short, long)]
    pub force: bool,

    /// Only push this branch.
    #[arg(short, long)]
    pub branch: Option<String>,

    /// Allow creating a new branch.
    #[arg(long)]
    pub new_branch: bool,

    /// Destination (default: default-push or default path).
    pub dest: Option<String>,
}

/// Arguments for `hgcmd pull`.
#[derive(clap::Args)]
pub struct PullArgs {
    /// Only pull this revision and its ancestors.
    #[arg(short, long)]
    pub rev: Option<String>,

    /// Update to the new tip afterwards.
    #[arg(short, long)]
    pub update: bool,

    /// Pull from an unrelated repository.
    #[arg(short, long)]
    pub force: bool,

    /// Only pull this branch.
    #[arg(short, long)]
    pub branch: Option<String>,

    /// Source (default: default path).
    pub source: Option<String>,
}

/// Arguments for `hgcmd update`.
#[derive(clap::Args)]
pub struct UpdateArgs {
    /// Discard uncommitted changes.
    #[arg(short = 'C', long)]
    pub clean: bool,

    /// Abort on uncommitted changes.
    #[arg(short, long)]
    pub check: bool,

    /// Tipmost revision matching this date.
    #[arg(short, long, value_parser = parse_date)]
    pub date: Option<NaiveDateTime>,

    /// Target revision (default: branch tip).
    pub rev: Option<String>,
}

/// Arguments for `hgcmd merge`.
#[derive(clap::Args)]
pub struct MergeArgs {
    /// Revision to merge with.
    #[arg(short, long)]
    pub rev: Option<String>,

    /// Merge with outstanding changes.
    #[arg(short, long)]
    pub force: bool,

    /// Merge tool.
    #[arg(short, long)]
    pub tool: Option<String>,

    /// Only list the revisions that would be merged.
    #[arg(short = 'P', long)]
    pub preview: bool,
}

/// Arguments for `hgcmd resolve`.
#[derive(clap::Args)]
pub struct ResolveArgs {
    /// List files with merge conflicts.
    #[arg(short, long, conflicts_with_all = ["mark", "unmark", "tool"])]
    pub list: bool,

    /// Act on every unresolved file.
    #[arg(short, long)]
    pub all: bool,

    /// Mark files as resolved.
    #[arg(short, long)]
    pub mark: bool,

    /// Mark files as unresolved.
    #[arg(short, long)]
    pub unmark: bool,

    /// Merge tool.
    #[arg(short, long)]
    pub tool: Option<String>,

    /// Files to act on.
    pub files: Vec<String>,
}

/// Arguments for `hgcmd incoming` and `hgcmd outgoing`.
#[derive(clap::Args)]
pub struct RemoteArgs {
    /// Only this revision and its ancestors.
    #[arg(short, long)]
    pub rev: Option<String>,

    /// Only this branch.
    #[arg(short, long)]
    pub branch: Option<String>,

    /// Compare with an unrelated repository.
    #[arg(short, long)]
    pub force: bool,

    /// Maximum number of revisions.
    #[arg(short, long)]
    pub limit: Option<u32>,

    /// Newest revisions first.
    #[arg(short, long)]
    pub newest_first: bool,

    /// Output format.
    #[arg(long, default_value = "table")]
    pub format: OutputFormat,

    /// Remote (default: default path).
    pub remote: Option<String>,
}

/// Arguments for `hgcmd archive`.
#[derive(clap::Args)]
pub struct ArchiveArgs {
    /// Revision to archive.
    #[arg(short, long)]
    pub rev: Option<String>,

    /// Archive type (files, tar, tbz2, tgz, uzip, zip).
    #[arg(short = 't', long = "type")]
    pub kind: Option<String>,

    /// Directory prefix for entries.
    #[arg(short, long)]
    pub prefix: Option<String>,

    /// Output file or directory.
    pub dest: String,
}

pub fn cat(client: &Client, args: CatArgs) -> Result<()> {
    let mut out = std::io::stdout().lock();
    client.cat_to(&args.file, args.rev.as_deref(), &mut out)?;
    out.flush()?;
    Ok(())
}

pub fn add(client: &Client, files: &[String]) -> Result<()> {
    let files: Vec<&str> = files.iter().map(String::as_str).collect();
    if !client.add(&files)? {
        eprintln!("some files could not be added");
    }
    Ok(())
}

pub fn remove(client: &Client, args: RemoveArgs) -> Result<()> {
    let files: Vec<&str> = args.files.iter().map(String::as_str).collect();
    if !client.remove(&files, args.after, args.force)? {
        eprintln!("some files could not be removed");
    }
    Ok(())
}

pub fn commit(client: &Client, args: CommitArgs) -> Result<()> {
    let mut opts = CommitOptions::new(args.message)
        .addremove(args.addremove)
        .close_branch(args.close_branch)
        .files(args.files);
    if let Some(user) = args.user {
        opts = opts.user(user);
    }
    if let Some(date) = args.date {
        opts = opts.date(date);
    }
    if let Some(pattern) = args.include {
        opts = opts.include(pattern);
    }
    if let Some(pattern) = args.exclude {
        opts = opts.exclude(pattern);
    }
    if !client.commit(&opts)? {
        println!("nothing changed");
    }
    Ok(())
}

pub fn log(client: &Client, args: LogArgs) -> Result<()> {
    let mut opts = LogOptions::new()
        .follow(args.follow)
        .no_merges(args.no_merges)
        .dates(args.since, args.until)
        .limit(args.limit.unwrap_or(0))
        .files(args.files);
    if let Some(rev) = args.rev {
        opts = opts.rev(rev);
    }
    if let Some(keyword) = args.keyword {
        opts = opts.keyword(keyword);
    }
    if let Some(user) = args.user {
        opts = opts.user(user);
    }
    if let Some(branch) = args.branch {
        opts = opts.branch(branch);
    }
    print_revisions(&client.log(&opts)?, args.format)
}

pub fn status(client: &Client, args: StatusArgs) -> Result<()> {
    let filter = if args.all {
        Status::All
    } else if args.modified {
        Status::Modified
    } else if args.added {
        Status::Added
    } else if args.unknown {
        Status::Unknown
    } else {
        Status::Default
    };
    let mut opts = StatusOptions::new()
        .only(filter)
        .quiet(args.quiet)
        .files(args.files);
    if let Some(rev) = args.rev {
        opts = opts.rev(rev);
    }
    if let Some(rev) = args.change {
        opts = opts.change(rev);
    }
    let entries = client.status(&opts)?;

    if matches!(args.format, OutputFormat::Json) {
        return print_json(&entries);
    }
    for entry in &entries {
        println!("{}", colored_status(entry));
    }
    Ok(())
}

pub fn heads(client: &Client, args: HeadsArgs) -> Result<()> {
    let mut opts = HeadsOptions::new().topo(args.topo).closed(args.closed);
    if let Some(rev) = args.rev {
        opts = opts.rev(rev);
    }
    print_revisions(&client.heads(&opts)?, args.format)
}

pub fn paths(client: &Client, format: OutputFormat) -> Result<()> {
    let paths = client.paths()?;
    if matches!(format, OutputFormat::Json) {
        let map: serde_json::Map<String, serde_json::Value> = paths
            .into_iter()
            .map(|(name, url)| (name, serde_json::Value::String(url)))
            .collect();
        return print_json(&map);
    }
    for (name, url) in &paths {
        println!("{name} = {url}");
    }
    Ok(())
}

pub fn push(client: &Client, args: PushArgs) -> Result<()> {
    let mut opts = PushOptions::new()
        .force(args.force)
        .new_branch(args.new_branch);
    if let Some(dest) = args.dest {
        opts = opts.destination(dest);
    }
    if let Some(rev) = args.rev {
        opts = opts.rev(rev);
    }
    if let Some(branch) = args.branch {
        opts = opts.branch(branch);
    }
    if !client.push(&opts)? {
        println!("no changes found");
    }
    Ok(())
}

pub fn pull(client: &Client, args: PullArgs) -> Result<()> {
    let mut opts = PullOptions::new().update(args.update).force(args.force);
    if let Some(source) = args.source {
        opts = opts.source(source);
    }
    if let Some(rev) = args.rev {
        opts = opts.rev(rev);
    }
    if let Some(branch) = args.branch {
        opts = opts.branch(branch);
    }
    if !client.pull(&opts)? {
        println!("no changes found");
    }
    Ok(())
}

pub fn update(client: &Client, args: UpdateArgs) -> Result<()> {
    let mut opts = UpdateOptions::new().clean(args.clean).check(args.check);
    if let Some(rev) = args.rev {
        opts = opts.rev(rev);
    }
    if let Some(date) = args.date {
        opts = opts.date(date);
    }
    if !client.update(&opts)? {
        eprintln!("{}", "unresolved files left after update".yellow());
    }
    Ok(())
}

pub fn merge(client: &Client, args: MergeArgs) -> Result<()> {
    let mut opts = MergeOptions::new().force(args.force);
    if let Some(rev) = args.rev {
        opts = opts.rev(rev);
    }
    if let Some(tool) = args.tool {
        opts = opts.tool(tool);
    }
    if args.preview {
        return print_revisions(&client.merge_preview(&opts)?, OutputFormat::Table);
    }
    if !client.merge(&opts)? {
        eprintln!(
            "{}",
            "unresolved conflicts; use 'hgcmd resolve' then commit".yellow()
        );
    }
    Ok(())
}

pub fn resolve(client: &Client, args: ResolveArgs) -> Result<()> {
    if args.list {
        let files: Vec<&str> = args.files.iter().map(String::as_str).collect();
        for entry in client.resolve_list(&files)? {
            let line = if entry.resolved {
                format!("R {}", entry.path).green()
            } else {
                format!("U {}", entry.path).red()
            };
            println!("{line}");
        }
        return Ok(());
    }
    let mut opts = ResolveOptions::new()
        .all(args.all)
        .mark(args.mark)
        .unmark(args.unmark)
        .files(args.files);
    if let Some(tool) = args.tool {
        opts = opts.tool(tool);
    }
    if !client.resolve(&opts)? {
        eprintln!("{}", "some files remain unresolved".yellow());
    }
    Ok(())
}

pub fn incoming(client: &Client, args: RemoteArgs) -> Result<()> {
    let format = args.format;
    let revs = client.incoming(&remote_options(args))?;
    print_revisions(&revs, format)
}

pub fn outgoing(client: &Client, args: RemoteArgs) -> Result<()> {
    let format = args.format;
    let revs = client.outgoing(&remote_options(args))?;
    print_revisions(&revs, format)
}

pub fn archive(client: &Client, args: ArchiveArgs) -> Result<()> {
    let mut opts = ArchiveOptions::new(&args.dest);
    if let Some(rev) = args.rev {
        opts = opts.rev(rev);
    }
    if let Some(kind) = args.kind {
        opts = opts.kind(kind);
    }
    if let Some(prefix) = args.prefix {
        opts = opts.prefix(prefix);
    }
    client
        .archive(&opts)
        .with_context(|| format!("archive to {}", args.dest))?;
    println!("{}", args.dest);
    Ok(())
}

fn remote_options(args: RemoteArgs) -> RemoteLogOptions {
    let mut opts = RemoteLogOptions::new()
        .force(args.force)
        .newest_first(args.newest_first)
        .limit(args.limit.unwrap_or(0));
    if let Some(remote) = args.remote {
        opts = opts.remote(remote);
    }
    if let Some(rev) = args.rev {
        opts = opts.rev(rev);
    }
    if let Some(branch) = args.branch {
        opts = opts.branch(branch);
    }
    opts
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_revisions(revs: &[Revision], format: OutputFormat) -> Result<()> {
    if matches!(format, OutputFormat::Json) {
        return print_json(revs);
    }
    if revs.is_empty() {
        println!("No revisions.");
        return Ok(());
    }
    for rev in revs {
        let short = &rev.node[..rev.node.len().min(12)];
        let date = rev
            .timestamp
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_default();
        let summary = rev.message.lines().next().unwrap_or_default();
        println!(
            "{:>5}:{:<12} {:<16} {:<20} {}",
            rev.id.yellow(),
            short,
            date,
            rev.author,
            summary
        );
    }
    Ok(())
}

fn colored_status(entry: &FileStatus) -> String {
    let code = entry.status.code().unwrap_or(' ');
    let line = format!("{code} {}", entry.path);
    match entry.status {
        Status::Modified => line.blue().to_string(),
        Status::Added => line.green().to_string(),
        Status::Removed | Status::Missing => line.red().to_string(),
        Status::Unknown => line.magenta().to_string(),
        Status::Conflicted => line.red().bold().to_string(),
        Status::Ignored | Status::Origin => line.dimmed().to_string(),
        _ => line,
    }
}
