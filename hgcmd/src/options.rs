//! Per-operation parameters and their rendering to argv.
//!
//! Every builder starts empty (or with its required value) and each unset
//! parameter contributes nothing to the command line.

use chrono::NaiveDateTime;

use crate::args::{Args, DATE_FORMAT};
use crate::status::Status;
use crate::Result;

/// Parameters for `hg commit`.
#[derive(Debug, Clone, Default)]
#[must_use]
pub struct CommitOptions {
    /// Commit message (required).
    message: String,
    /// Add new files and remove missing ones first.
    addremove: bool,
    /// Mark the branch head as closed.
    close_branch: bool,
    /// Include pattern.
    include: Option<String>,
    /// Exclude pattern.
    exclude: Option<String>,
    /// Read the message from a file.
    logfile: Option<String>,
    /// Committer.
    user: Option<String>,
    /// Commit date.
    date: Option<NaiveDateTime>,
    /// Restrict the commit to these files.
    files: Vec<String>,
}

impl CommitOptions {
    /// Creates options with the given commit message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }

    /// Runs `addremove` as part of the commit.
    pub const fn addremove(mut self, enable: bool) -> Self {
        self.addremove = enable;
        self
    }

    /// Closes the current branch head.
    pub const fn close_branch(mut self, enable: bool) -> Self {
        self.close_branch = enable;
        self
    }

    /// Only commits files matching `pattern`.
    pub fn include(mut self, pattern: impl Into<String>) -> Self {
        self.include = Some(pattern.into());
        self
    }

    /// Skips files matching `pattern`.
    pub fn exclude(mut self, pattern: impl Into<String>) -> Self {
        self.exclude = Some(pattern.into());
        self
    }

    /// Reads the commit message from `path` in addition to `--message`.
    pub fn logfile(mut self, path: impl Into<String>) -> Self {
        self.logfile = Some(path.into());
        self
    }

    /// Records `user` as committer.
    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    /// Records `date` as the commit date.
    pub const fn date(mut self, date: NaiveDateTime) -> Self {
        self.date = Some(date);
        self
    }

    /// Commits only these files.
    pub fn files<I, S>(mut self, files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.files = files.into_iter().map(Into::into).collect();
        self
    }

    pub(crate) fn args(&self) -> Result<Args> {
        let mut a = Args::new("commit");
        a.add_if_non_empty(true, &["--message", &self.message])?;
        a.add_if(self.addremove, &["--addremove"])
            .add_if(self.close_branch, &["--close-branch"])
            .add_value("--include", self.include.as_deref())
            .add_value("--exclude", self.exclude.as_deref())
            .add_value("--logfile", self.logfile.as_deref())
            .add_value("--user", self.user.as_deref())
            .add_date("--date", self.date)
            .add_all(&self.files);
        Ok(a)
    }
}

/// Parameters for `hg log`.
#[derive(Debug, Clone, Default)]
#[must_use]
pub struct LogOptions {
    /// Revision or revset.
    rev: Option<String>,
    /// Follow history across copies and renames.
    follow: bool,
    /// Only follow the first parent of merges.
    follow_first: bool,
    /// Lower date bound.
    date_from: Option<NaiveDateTime>,
    /// Upper date bound.
    date_to: Option<NaiveDateTime>,
    /// Show copied files.
    copies: bool,
    /// Case-insensitive keyword search.
    keyword: Option<String>,
    /// Include revisions where files were removed.
    removed: bool,
    /// Only merges.
    only_merges: bool,
    /// No merges.
    no_merges: bool,
    /// Only this committer.
    user: Option<String>,
    /// Only this branch.
    branch: Option<String>,
    /// Exclude this revision and its ancestors.
    prune: Option<String>,
    /// Maximum number of revisions.
    limit: Option<u32>,
    /// Include pattern.
    include: Option<String>,
    /// Exclude pattern.
    exclude: Option<String>,
    /// Only history of these files.
    files: Vec<String>,
}

impl LogOptions {
    /// Creates empty options (full history).
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts to a revision or revset.
    pub fn rev(mut self, rev: impl Into<String>) -> Self {
        self.rev = Some(rev.into());
        self
    }

    /// Follows history across copies and renames.
    pub const fn follow(mut self, enable: bool) -> Self {
        self.follow = enable;
        self
    }

    /// Follows only the first parent of merges.
    pub const fn follow_first(mut self, enable: bool) -> Self {
        self.follow_first = enable;
        self
    }

    /// Restricts to revisions committed between `from` and `to`.
    ///
    /// Either bound may be `None` for an open range.
    pub const fn dates(mut self, from: Option<NaiveDateTime>, to: Option<NaiveDateTime>) -> Self {
        self.date_from = from;
        self.date_to = to;
        self
    }

    /// Shows copied files.
    pub const fn copies(mut self, enable: bool) -> Self {
        self.copies = enable;
        self
    }

    /// Searches for `text` in messages, users, and files.
    pub fn keyword(mut self, text: impl Into<String>) -> Self {
        self.keyword = Some(text.into());
        self
    }

    /// Includes revisions where files were removed.
    pub const fn removed(mut self, enable: bool) -> Self {
        self.removed = enable;
        self
    }

    /// Shows only merges.
    pub const fn only_merges(mut self, enable: bool) -> Self {
        self.only_merges = enable;
        self
    }

    /// Hides merges.
    pub const fn no_merges(mut self, enable: bool) -> Self {
        self.no_merges = enable;
        self
    }

    /// Shows only revisions committed by `user`.
    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    /// Shows only revisions on `branch`.
    pub fn branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = Some(branch.into());
        self
    }

    /// Hides `rev` and its ancestors.
    pub fn prune(mut self, rev: impl Into<String>) -> Self {
        self.prune = Some(rev.into());
        self
    }

    /// Limits the number of revisions; 0 means no limit.
    pub const fn limit(mut self, n: u32) -> Self {
        self.limit = if n == 0 { None } else { Some(n) };
        self
    }

    /// Include pattern.
    pub fn include(mut self, pattern: impl Into<String>) -> Self {
        self.include = Some(pattern.into());
        self
    }

    /// Exclude pattern.
    pub fn exclude(mut self, pattern: impl Into<String>) -> Self {
        self.exclude = Some(pattern.into());
        self
    }

    /// Shows only history of these files.
    pub fn files<I, S>(mut self, files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.files = files.into_iter().map(Into::into).collect();
        self
    }

    pub(crate) fn args(&self) -> Args {
        let limit = self.limit.map(|n| n.to_string());
        let dates = match (self.date_from, self.date_to) {
            (Some(from), Some(to)) => Some(format!(
                "{} to {}",
                from.format(DATE_FORMAT),
                to.format(DATE_FORMAT)
            )),
            (Some(from), None) => Some(format!(">{}", from.format(DATE_FORMAT))),
            (None, Some(to)) => Some(format!("<{}", to.format(DATE_FORMAT))),
            (None, None) => None,
        };

        let mut a = Args::new("log");
        a.add(&["--style", "xml"])
            .add_value("--rev", self.rev.as_deref())
            .add_if(self.follow, &["--follow"])
            .add_if(self.follow_first, &["--follow-first"])
            .add_value("--date", dates.as_deref())
            .add_if(self.copies, &["--copies"])
            .add_value("--keyword", self.keyword.as_deref())
            .add_if(self.removed, &["--removed"])
            .add_if(self.only_merges, &["--only-merges"])
            .add_if(self.no_merges, &["--no-merges"])
            .add_value("--user", self.user.as_deref())
            .add_value("--branch", self.branch.as_deref())
            .add_value("--prune", self.prune.as_deref())
            .add_value("--limit", limit.as_deref())
            .add_value("--include", self.include.as_deref())
            .add_value("--exclude", self.exclude.as_deref())
            .add_all(&self.files);
        a
    }
}

/// Parameters for `hg status`.
#[derive(Debug, Clone, Default)]
#[must_use]
pub struct StatusOptions {
    /// Hide untracked files.
    quiet: bool,
    /// Only files in this state.
    filter: Status,
    /// Show copy sources.
    copies: bool,
    /// Compare against this revision.
    rev: Option<String>,
    /// Changes made by this revision.
    change: Option<String>,
    /// Include pattern.
    include: Option<String>,
    /// Exclude pattern.
    exclude: Option<String>,
    /// Recurse into subrepositories.
    subrepos: bool,
    /// Only these files.
    files: Vec<String>,
}

impl StatusOptions {
    /// Creates empty options (whole working directory).
    pub fn new() -> Self {
        Self::default()
    }

    /// Hides untracked files.
    pub const fn quiet(mut self, enable: bool) -> Self {
        self.quiet = enable;
        self
    }

    /// Shows only files in `status`; [`Status::All`] shows everything.
    pub const fn only(mut self, status: Status) -> Self {
        self.filter = status;
        self
    }

    /// Shows the source of copied files.
    pub const fn copies(mut self, enable: bool) -> Self {
        self.copies = enable;
        self
    }

    /// Compares the working directory against `rev`.
    pub fn rev(mut self, rev: impl Into<String>) -> Self {
        self.rev = Some(rev.into());
        self
    }

    /// Lists the changes made by `rev` instead.
    pub fn change(mut self, rev: impl Into<String>) -> Self {
        self.change = Some(rev.into());
        self
    }

    /// Include pattern.
    pub fn include(mut self, pattern: impl Into<String>) -> Self {
        self.include = Some(pattern.into());
        self
    }

    /// Exclude pattern.
    pub fn exclude(mut self, pattern: impl Into<String>) -> Self {
        self.exclude = Some(pattern.into());
        self
    }

    /// Recurses into subrepositories.
    pub const fn subrepos(mut self, enable: bool) -> Self {
        self.subrepos = enable;
        self
    }

    /// Limits output to these files.
    pub fn files<I, S>(mut self, files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.files = files.into_iter().map(Into::into).collect();
        self
    }

    pub(crate) fn args(&self) -> Args {
        let mut a = Args::new("status");
        a.add_if(self.quiet, &["--quiet"]);
        if let Some(flag) = self.filter.filter_flag() {
            a.add(&[flag]);
        }
        a.add_if(self.copies, &["--copies"])
            .add_value("--rev", self.rev.as_deref())
            .add_value("--change", self.change.as_deref())
            .add_value("--include", self.include.as_deref())
            .add_value("--exclude", self.exclude.as_deref())
            .add_if(self.subrepos, &["--subrepos"])
            .add_all(&self.files);
        a
    }
}

/// Parameters for `hg push`.
#[derive(Debug, Clone, Default)]
#[must_use]
pub struct PushOptions {
    /// Destination path or URL; default path if unset.
    destination: Option<String>,
    /// Only push this revision and its ancestors.
    rev: Option<String>,
    /// Push even when creating new heads.
    force: bool,
    /// Only push this branch.
    branch: Option<String>,
    /// Allow creating a new branch on the remote.
    new_branch: bool,
}

impl PushOptions {
    /// Pushes to the default path.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pushes to `dest` instead of the default path.
    pub fn destination(mut self, dest: impl Into<String>) -> Self {
        self.destination = Some(dest.into());
        self
    }

    /// Pushes only `rev` and its ancestors.
    pub fn rev(mut self, rev: impl Into<String>) -> Self {
        self.rev = Some(rev.into());
        self
    }

    /// Pushes even if new remote heads are created.
    pub const fn force(mut self, enable: bool) -> Self {
        self.force = enable;
        self
    }

    /// Pushes only `branch`.
    pub fn branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = Some(branch.into());
        self
    }

    /// Allows creating a new named branch on the remote.
    pub const fn new_branch(mut self, enable: bool) -> Self {
        self.new_branch = enable;
        self
    }

    pub(crate) fn args(&self) -> Args {
        let mut a = Args::new("push");
        a.add_value("--rev", self.rev.as_deref())
            .add_if(self.force, &["--force"])
            .add_value("--branch", self.branch.as_deref())
            .add_if(self.new_branch, &["--new-branch"])
            .add_all(self.destination.iter().filter(|d| !d.is_empty()));
        a
    }
}

/// Parameters for `hg pull`.
#[derive(Debug, Clone, Default)]
#[must_use]
pub struct PullOptions {
    /// Source path or URL; default path if unset.
    source: Option<String>,
    /// Only pull this revision and its ancestors.
    rev: Option<String>,
    /// Update the working directory afterwards.
    update: bool,
    /// Pull from an unrelated repository.
    force: bool,
    /// Only pull this branch.
    branch: Option<String>,
}

impl PullOptions {
    /// Pulls from the default path.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pulls from `src` instead of the default path.
    pub fn source(mut self, src: impl Into<String>) -> Self {
        self.source = Some(src.into());
        self
    }

    /// Pulls only `rev` and its ancestors.
    pub fn rev(mut self, rev: impl Into<String>) -> Self {
        self.rev = Some(rev.into());
        self
    }

    /// Updates to the new tip after pulling.
    pub const fn update(mut self, enable: bool) -> Self {
        self.update = enable;
        self
    }

    /// Pulls even from an unrelated repository.
    pub const fn force(mut self, enable: bool) -> Self {
        self.force = enable;
        self
    }

    /// Pulls only `branch`.
    pub fn branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = Some(branch.into());
        self
    }

    pub(crate) fn args(&self) -> Args {
        let mut a = Args::new("pull");
        a.add_value("--rev", self.rev.as_deref())
            .add_if(self.update, &["--update"])
            .add_if(self.force, &["--force"])
            .add_value("--branch", self.branch.as_deref())
            .add_all(self.source.iter().filter(|s| !s.is_empty()));
        a
    }
}

/// Parameters for `hg update`.
#[derive(Debug, Clone, Default)]
#[must_use]
pub struct UpdateOptions {
    /// Target revision; branch tip if unset.
    rev: Option<String>,
    /// Discard uncommitted changes.
    clean: bool,
    /// Refuse to update with uncommitted changes.
    check: bool,
    /// Tipmost revision matching this date.
    date: Option<NaiveDateTime>,
}

impl UpdateOptions {
    /// Updates to the tip of the current branch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Updates to `rev`.
    pub fn rev(mut self, rev: impl Into<String>) -> Self {
        self.rev = Some(rev.into());
        self
    }

    /// Discards uncommitted changes.
    pub const fn clean(mut self, enable: bool) -> Self {
        self.clean = enable;
        self
    }

    /// Aborts if the working directory has uncommitted changes.
    pub const fn check(mut self, enable: bool) -> Self {
        self.check = enable;
        self
    }

    /// Updates to the tipmost revision matching `date`.
    pub const fn date(mut self, date: NaiveDateTime) -> Self {
        self.date = Some(date);
        self
    }

    pub(crate) fn args(&self) -> Args {
        let mut a = Args::new("update");
        a.add_if(self.clean, &["--clean"])
            .add_if(self.check, &["--check"])
            .add_date("--date", self.date)
            .add_all(self.rev.iter().filter(|r| !r.is_empty()));
        a
    }
}

/// Parameters for `hg merge`.
#[derive(Debug, Clone, Default)]
#[must_use]
pub struct MergeOptions {
    /// Revision to merge with; the other head if unset.
    rev: Option<String>,
    /// Merge with uncommitted changes.
    force: bool,
    /// Merge tool.
    tool: Option<String>,
}

impl MergeOptions {
    /// Merges with the other head.
    pub fn new() -> Self {
        Self::default()
    }

    /// Merges with `rev`.
    pub fn rev(mut self, rev: impl Into<String>) -> Self {
        self.rev = Some(rev.into());
        self
    }

    /// Merges even with outstanding changes.
    pub const fn force(mut self, enable: bool) -> Self {
        self.force = enable;
        self
    }

    /// Uses `tool` for file merges (e.g. `internal:merge`).
    pub fn tool(mut self, tool: impl Into<String>) -> Self {
        self.tool = Some(tool.into());
        self
    }

    /// With `preview`, only lists the revisions that would be merged.
    pub(crate) fn args(&self, preview: bool) -> Args {
        let mut a = Args::new("merge");
        a.add_if(self.force, &["--force"])
            .add_value("--tool", self.tool.as_deref())
            .add_if(preview, &["--preview", "--style", "xml"])
            .add_value("--rev", self.rev.as_deref());
        a
    }
}

/// Parameters for `hg resolve`.
#[derive(Debug, Clone, Default)]
#[must_use]
pub struct ResolveOptions {
    /// Every unresolved file.
    all: bool,
    /// Mark as resolved without merging.
    mark: bool,
    /// Mark as unresolved.
    unmark: bool,
    /// Merge tool.
    tool: Option<String>,
    /// Files to act on.
    files: Vec<String>,
}

impl ResolveOptions {
    /// Creates empty options; set files or [`ResolveOptions::all`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Acts on every unresolved file.
    pub const fn all(mut self, enable: bool) -> Self {
        self.all = enable;
        self
    }

    /// Marks files as resolved.
    pub const fn mark(mut self, enable: bool) -> Self {
        self.mark = enable;
        self
    }

    /// Marks files as unresolved.
    pub const fn unmark(mut self, enable: bool) -> Self {
        self.unmark = enable;
        self
    }

    /// Re-merges with `tool`.
    pub fn tool(mut self, tool: impl Into<String>) -> Self {
        self.tool = Some(tool.into());
        self
    }

    /// Files to act on.
    pub fn files<I, S>(mut self, files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.files = files.into_iter().map(Into::into).collect();
        self
    }

    pub(crate) fn args(&self) -> Result<Args> {
        if !self.all && self.files.is_empty() {
            return Err(crate::Error::InvalidArgument(
                "resolve needs files or --all".into(),
            ));
        }
        if self.mark && self.unmark {
            return Err(crate::Error::InvalidArgument(
                "resolve cannot both mark and unmark".into(),
            ));
        }
        let mut a = Args::new("resolve");
        a.add_if(self.all, &["--all"])
            .add_if(self.mark, &["--mark"])
            .add_if(self.unmark, &["--unmark"])
            .add_value("--tool", self.tool.as_deref())
            .add_all(&self.files);
        Ok(a)
    }
}

/// Parameters for `hg heads`.
#[derive(Debug, Clone, Default)]
#[must_use]
pub struct HeadsOptions {
    /// Only heads that are descendants of this revision.
    rev: Option<String>,
    /// Topological heads only, ignoring branches.
    topo: bool,
    /// Include closed branch heads.
    closed: bool,
}

impl HeadsOptions {
    /// All open branch heads.
    pub fn new() -> Self {
        Self::default()
    }

    /// Only heads descending from `rev`.
    pub fn rev(mut self, rev: impl Into<String>) -> Self {
        self.rev = Some(rev.into());
        self
    }

    /// Topological heads only.
    pub const fn topo(mut self, enable: bool) -> Self {
        self.topo = enable;
        self
    }

    /// Includes closed branch heads.
    pub const fn closed(mut self, enable: bool) -> Self {
        self.closed = enable;
        self
    }

    pub(crate) fn args(&self) -> Args {
        let mut a = Args::new("heads");
        a.add(&["--style", "xml"])
            .add_value("--rev", self.rev.as_deref())
            .add_if(self.topo, &["--topo"])
            .add_if(self.closed, &["--closed"]);
        a
    }
}

/// Parameters for `hg archive`.
#[derive(Debug, Clone, Default)]
#[must_use]
pub struct ArchiveOptions {
    /// Output file or directory (required).
    destination: String,
    /// Revision to archive.
    rev: Option<String>,
    /// Archive type (`files`, `tar`, `tgz`, `zip`, ...).
    kind: Option<String>,
    /// Directory prefix for archive entries.
    prefix: Option<String>,
    /// Skip decode filters.
    no_decode: bool,
    /// Include pattern.
    include: Option<String>,
    /// Exclude pattern.
    exclude: Option<String>,
    /// Recurse into subrepositories.
    subrepos: bool,
}

impl ArchiveOptions {
    /// Archives into `destination`.
    pub fn new(destination: impl Into<String>) -> Self {
        Self {
            destination: destination.into(),
            ..Self::default()
        }
    }

    /// Archives `rev` instead of the working directory parent.
    pub fn rev(mut self, rev: impl Into<String>) -> Self {
        self.rev = Some(rev.into());
        self
    }

    /// Archive type (`files`, `tar`, `tbz2`, `tgz`, `uzip`, `zip`).
    pub fn kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    /// Prefixes entries with `prefix`.
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Skips decode filters.
    pub const fn no_decode(mut self, enable: bool) -> Self {
        self.no_decode = enable;
        self
    }

    /// Include pattern.
    pub fn include(mut self, pattern: impl Into<String>) -> Self {
        self.include = Some(pattern.into());
        self
    }

    /// Exclude pattern.
    pub fn exclude(mut self, pattern: impl Into<String>) -> Self {
        self.exclude = Some(pattern.into());
        self
    }

    /// Recurses into subrepositories.
    pub const fn subrepos(mut self, enable: bool) -> Self {
        self.subrepos = enable;
        self
    }

    pub(crate) fn args(&self) -> Result<Args> {
        if self.destination.is_empty() {
            return Err(crate::Error::InvalidArgument(
                "archive destination cannot be empty".into(),
            ));
        }
        let mut a = Args::new("archive");
        a.add_value("--rev", self.rev.as_deref())
            .add_value("--type", self.kind.as_deref())
            .add_value("--prefix", self.prefix.as_deref())
            .add_if(self.no_decode, &["--no-decode"])
            .add_value("--include", self.include.as_deref())
            .add_value("--exclude", self.exclude.as_deref())
            .add_if(self.subrepos, &["--subrepos"])
            .add(&[&self.destination]);
        Ok(a)
    }
}

/// Parameters shared by `hg incoming` and `hg outgoing`.
#[derive(Debug, Clone, Default)]
#[must_use]
pub struct RemoteLogOptions {
    /// Remote path or URL; default path if unset.
    remote: Option<String>,
    /// Only this revision and its ancestors.
    rev: Option<String>,
    /// Only this branch.
    branch: Option<String>,
    /// Compare with an unrelated repository.
    force: bool,
    /// Maximum number of revisions.
    limit: Option<u32>,
    /// Newest first.
    newest_first: bool,
    /// Hide merges.
    no_merges: bool,
}

impl RemoteLogOptions {
    /// Compares with the default path.
    pub fn new() -> Self {
        Self::default()
    }

    /// Compares with `remote` instead of the default path.
    pub fn remote(mut self, remote: impl Into<String>) -> Self {
        self.remote = Some(remote.into());
        self
    }

    /// Only `rev` and its ancestors.
    pub fn rev(mut self, rev: impl Into<String>) -> Self {
        self.rev = Some(rev.into());
        self
    }

    /// Only `branch`.
    pub fn branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = Some(branch.into());
        self
    }

    /// Compares even with an unrelated repository.
    pub const fn force(mut self, enable: bool) -> Self {
        self.force = enable;
        self
    }

    /// Limits the number of revisions; 0 means no limit.
    pub const fn limit(mut self, n: u32) -> Self {
        self.limit = if n == 0 { None } else { Some(n) };
        self
    }

    /// Lists newest revisions first.
    pub const fn newest_first(mut self, enable: bool) -> Self {
        self.newest_first = enable;
        self
    }

    /// Hides merges.
    pub const fn no_merges(mut self, enable: bool) -> Self {
        self.no_merges = enable;
        self
    }

    pub(crate) fn args(&self, command: &str) -> Args {
        let limit = self.limit.map(|n| n.to_string());
        let mut a = Args::new(command);
        a.add(&["--style", "xml"])
            .add_value("--rev", self.rev.as_deref())
            .add_value("--branch", self.branch.as_deref())
            .add_if(self.force, &["--force"])
            .add_value("--limit", limit.as_deref())
            .add_if(self.newest_first, &["--newest-first"])
            .add_if(self.no_merges, &["--no-merges"])
            .add_all(self.remote.iter().filter(|r| !r.is_empty()));
        a
    }
}

/// Parameters for `hg clone`.
#[derive(Debug, Clone, Default)]
#[must_use]
pub struct CloneOptions {
    /// Do not populate a working directory.
    noupdate: bool,
    /// Revision to check out.
    updaterev: Option<String>,
    /// Only clone this revision and its ancestors.
    rev: Option<String>,
    /// Only clone this branch.
    branch: Option<String>,
    /// Use the pull protocol even for local sources.
    pull: bool,
}

impl CloneOptions {
    /// Full clone, updated to the default branch tip.
    pub fn new() -> Self {
        Self::default()
    }

    /// Skips populating the working directory.
    pub const fn noupdate(mut self, enable: bool) -> Self {
        self.noupdate = enable;
        self
    }

    /// Checks out `rev` after cloning.
    pub fn updaterev(mut self, rev: impl Into<String>) -> Self {
        self.updaterev = Some(rev.into());
        self
    }

    /// Clones only `rev` and its ancestors.
    pub fn rev(mut self, rev: impl Into<String>) -> Self {
        self.rev = Some(rev.into());
        self
    }

    /// Clones only `branch`.
    pub fn branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = Some(branch.into());
        self
    }

    /// Uses the pull protocol to copy metadata.
    pub const fn pull(mut self, enable: bool) -> Self {
        self.pull = enable;
        self
    }

    pub(crate) fn args(&self, source: &str, destination: &str) -> Result<Args> {
        let mut a = Args::new("clone");
        a.add_if(self.noupdate, &["--noupdate"])
            .add_value("--updaterev", self.updaterev.as_deref())
            .add_value("--rev", self.rev.as_deref())
            .add_value("--branch", self.branch.as_deref())
            .add_if(self.pull, &["--pull"]);
        if source.is_empty() {
            return Err(crate::Error::InvalidArgument("clone source cannot be empty".into()));
        }
        if destination.is_empty() {
            return Err(crate::Error::InvalidArgument(
                "clone destination cannot be empty".into(),
            ));
        }
        a.add(&[source, destination]);
        Ok(a)
    }
}
