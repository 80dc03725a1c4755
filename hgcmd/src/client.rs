//! High-level Mercurial operations over a [`Session`].

use std::io::Write;
use std::path::Path;

use tracing::debug;

use crate::args::{Args, path_str};
use crate::config::Config;
use crate::executor::CommandResult;
use crate::options::{
    ArchiveOptions, CloneOptions, CommitOptions, HeadsOptions, LogOptions, MergeOptions,
    PullOptions, PushOptions, RemoteLogOptions, ResolveOptions, StatusOptions, UpdateOptions,
};
use crate::session::{Session, run_oneshot};
use crate::status::{FileStatus, ResolveEntry, parse_paths, parse_resolve, parse_status};
use crate::xml::{Revision, parse_revisions, parse_revisions_after_marker};
use crate::{Error, Result};

/// Result codes every write operation tolerates: success and "nothing to do".
const BENIGN: &[i32] = &[0, 1];

/// Result codes for operations that must fully succeed.
const SUCCESS: &[i32] = &[0];

/// The operations a host needs from a repository, independent of how
/// they reach Mercurial.
pub trait Repository {
    /// File content at `rev`, or at the working directory parent.
    fn cat(&self, path: &str, rev: Option<&str>) -> Result<String>;
    /// Changeset history.
    fn log(&self, options: &LogOptions) -> Result<Vec<Revision>>;
    /// Working directory status.
    fn status(&self, options: &StatusOptions) -> Result<Vec<FileStatus>>;
    /// Commits; `false` if there was nothing to commit.
    fn commit(&self, options: &CommitOptions) -> Result<bool>;
    /// Pushes; `false` if there was nothing to push.
    fn push(&self, options: &PushOptions) -> Result<bool>;
    /// Pulls; `false` if there was nothing to pull.
    fn pull(&self, options: &PullOptions) -> Result<bool>;
}

/// Client for one repository, backed by a persistent command server.
///
/// All methods take `&self`; concurrent calls are serialized by the
/// underlying session.
///
/// # Example
///
/// ```no_run
/// use hgcmd::{Client, CommitOptions, Config, LogOptions};
///
/// let client = Client::connect(&Config::default(), "/path/to/repo")?;
/// client.add(&["README"])?;
/// client.commit(&CommitOptions::new("add readme"))?;
/// for rev in client.log(&LogOptions::new().limit(5))? {
///     println!("{} {}", rev.id, rev.message);
/// }
/// # Ok::<(), hgcmd::Error>(())
/// ```
#[derive(Debug)]
pub struct Client {
    /// Command server for this repository.
    session: Session,
}

impl Client {
    /// Starts a command server for `repo`.
    pub fn connect(config: &Config, repo: impl AsRef<Path>) -> Result<Self> {
        Session::connect(config, repo).map(Self::from_session)
    }

    /// Wraps an established session.
    pub const fn from_session(session: Session) -> Self {
        Self { session }
    }

    /// Creates a new repository at `path`.
    pub fn init(config: &Config, path: impl AsRef<Path>) -> Result<()> {
        Session::init(config, path)
    }

    /// Clones `source` into `destination` with a one-shot `hg clone`.
    pub fn clone_repo(
        config: &Config,
        source: &str,
        destination: impl AsRef<Path>,
        options: &CloneOptions,
    ) -> Result<()> {
        let destination = path_str(destination.as_ref())?;
        let args = options.args(source, destination)?;
        run_oneshot(config, args).map(drop)
    }

    /// The underlying session.
    pub const fn session(&self) -> &Session {
        &self.session
    }

    /// Content of `path` at `rev`, or at the working directory parent.
    pub fn cat(&self, path: &str, rev: Option<&str>) -> Result<String> {
        let args = cat_args(path, rev)?;
        Ok(self.run(args, SUCCESS)?.stdout)
    }

    /// Streams the content of `path` at `rev` into `sink`.
    pub fn cat_to(&self, path: &str, rev: Option<&str>, sink: &mut dyn Write) -> Result<()> {
        let args = cat_args(path, rev)?;
        let command = args.command().to_owned();
        let res = self.session.run_to(&args.build(), sink)?;
        accept(&command, res, SUCCESS).map(drop)
    }

    /// Schedules files for addition; `false` if some could not be added.
    pub fn add(&self, files: &[&str]) -> Result<bool> {
        require_files("add", files)?;
        let mut args = Args::new("add");
        args.add_all(files);
        self.run_flag(args)
    }

    /// Schedules files for removal; `false` if some could not be removed.
    ///
    /// `after` records files already deleted; `force` removes modified ones.
    pub fn remove(&self, files: &[&str], after: bool, force: bool) -> Result<bool> {
        require_files("remove", files)?;
        let mut args = Args::new("remove");
        args.add_if(after, &["--after"])
            .add_if(force, &["--force"])
            .add_all(files);
        self.run_flag(args)
    }

    /// Commits; `false` if nothing changed.
    pub fn commit(&self, options: &CommitOptions) -> Result<bool> {
        self.run_flag(options.args()?)
    }

    /// Changeset history.
    pub fn log(&self, options: &LogOptions) -> Result<Vec<Revision>> {
        let res = self.run(options.args(), SUCCESS)?;
        parse_listing(&res.stdout)
    }

    /// Working directory status.
    pub fn status(&self, options: &StatusOptions) -> Result<Vec<FileStatus>> {
        let res = self.run(options.args(), SUCCESS)?;
        Ok(parse_status(&res.stdout))
    }

    /// Pushes; `false` if there was nothing to push.
    pub fn push(&self, options: &PushOptions) -> Result<bool> {
        self.run_flag(options.args())
    }

    /// Pulls; `false` if there was nothing to pull.
    pub fn pull(&self, options: &PullOptions) -> Result<bool> {
        self.run_flag(options.args())
    }

    /// Updates the working directory; `false` if files were left unresolved.
    pub fn update(&self, options: &UpdateOptions) -> Result<bool> {
        self.run_flag(options.args())
    }

    /// Merges; `false` if conflicts were left unresolved.
    pub fn merge(&self, options: &MergeOptions) -> Result<bool> {
        self.run_flag(options.args(false))
    }

    /// Revisions a merge with `options` would bring in, without merging.
    pub fn merge_preview(&self, options: &MergeOptions) -> Result<Vec<Revision>> {
        let res = self.run(options.args(true), SUCCESS)?;
        parse_listing(&res.stdout)
    }

    /// Merge state of files touched by the last merge; all if `files` is empty.
    pub fn resolve_list(&self, files: &[&str]) -> Result<Vec<ResolveEntry>> {
        let mut args = Args::new("resolve");
        args.add(&["--list"]).add_all(files);
        let res = self.run(args, SUCCESS)?;
        Ok(parse_resolve(&res.stdout))
    }

    /// Re-merges or marks files; `false` if some remain unresolved.
    pub fn resolve(&self, options: &ResolveOptions) -> Result<bool> {
        self.run_flag(options.args()?)
    }

    /// Repository heads; empty if none match.
    pub fn heads(&self, options: &HeadsOptions) -> Result<Vec<Revision>> {
        let res = self.run(options.args(), BENIGN)?;
        if res.code == 1 {
            return Ok(Vec::new());
        }
        parse_listing(&res.stdout)
    }

    /// Configured remote paths as `(name, url)` pairs.
    pub fn paths(&self) -> Result<Vec<(String, String)>> {
        let res = self.run(Args::new("paths"), SUCCESS)?;
        Ok(parse_paths(&res.stdout))
    }

    /// Writes an unversioned archive of a revision.
    pub fn archive(&self, options: &ArchiveOptions) -> Result<()> {
        self.run(options.args()?, SUCCESS).map(drop)
    }

    /// Changesets the remote has that this repository lacks.
    pub fn incoming(&self, options: &RemoteLogOptions) -> Result<Vec<Revision>> {
        self.remote_log("incoming", options)
    }

    /// Changesets this repository has that the remote lacks.
    pub fn outgoing(&self, options: &RemoteLogOptions) -> Result<Vec<Revision>> {
        self.remote_log("outgoing", options)
    }

    /// Stops the command server and waits for it to exit.
    pub fn close(self) -> Result<()> {
        self.session.close()
    }

    /// Runs `incoming` or `outgoing`; code 1 means nothing differs.
    fn remote_log(&self, command: &str, options: &RemoteLogOptions) -> Result<Vec<Revision>> {
        let res = self.run(options.args(command), BENIGN)?;
        if res.code == 1 {
            return Ok(Vec::new());
        }
        parse_revisions_after_marker(&res.stdout)
    }

    /// Runs `args` and fails unless the result code is in `accepted`.
    fn run(&self, args: Args, accepted: &[i32]) -> Result<CommandResult> {
        let command = args.command().to_owned();
        let res = self.session.run(&args.build())?;
        accept(&command, res, accepted)
    }

    /// Runs a write operation, mapping the benign code 1 to `false`.
    fn run_flag(&self, args: Args) -> Result<bool> {
        let res = self.run(args, BENIGN)?;
        Ok(res.code == 0)
    }
}

impl Repository for Client {
    fn cat(&self, path: &str, rev: Option<&str>) -> Result<String> {
        Self::cat(self, path, rev)
    }

    fn log(&self, options: &LogOptions) -> Result<Vec<Revision>> {
        Self::log(self, options)
    }

    fn status(&self, options: &StatusOptions) -> Result<Vec<FileStatus>> {
        Self::status(self, options)
    }

    fn commit(&self, options: &CommitOptions) -> Result<bool> {
        Self::commit(self, options)
    }

    fn push(&self, options: &PushOptions) -> Result<bool> {
        Self::push(self, options)
    }

    fn pull(&self, options: &PullOptions) -> Result<bool> {
        Self::pull(self, options)
    }
}

/// Builds `cat <path> [--rev <rev>]`.
fn cat_args(path: &str, rev: Option<&str>) -> Result<Args> {
    if path.is_empty() {
        return Err(Error::InvalidArgument("cat: file path cannot be empty".into()));
    }
    let mut args = Args::new("cat");
    args.add(&[path]).add_value("--rev", rev);
    Ok(args)
}

/// Rejects an empty file list or an empty file name.
fn require_files(command: &str, files: &[&str]) -> Result<()> {
    if files.is_empty() || files.iter().any(|f| f.is_empty()) {
        return Err(Error::InvalidArgument(format!(
            "{command}: file list cannot be empty"
        )));
    }
    Ok(())
}

/// Maps a result code outside `accepted` to [`Error::CommandFailed`].
fn accept(command: &str, res: CommandResult, accepted: &[i32]) -> Result<CommandResult> {
    if accepted.contains(&res.code) {
        return Ok(res);
    }
    debug!(command, code = res.code, "command failed");
    Err(Error::CommandFailed {
        command: command.to_owned(),
        code: res.code,
        stderr: res.stderr.trim_end().to_owned(),
    })
}

/// Parses an xml-style listing; no output at all means no revisions.
fn parse_listing(stdout: &str) -> Result<Vec<Revision>> {
    if stdout.trim().is_empty() {
        return Ok(Vec::new());
    }
    parse_revisions(stdout)
}

#[cfg(all(test, unix))]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::os::unix::net::UnixStream;
    use std::thread::JoinHandle;

    use super::*;
    use crate::executor::tests::{fake_server, recv_request, send, send_result};
    use crate::status::Status;

    const HELLO: &[u8] = b"capabilities: getencoding runcommand\nencoding: UTF-8";

    fn client(serve: impl FnOnce(UnixStream) + Send + 'static) -> (Client, JoinHandle<()>) {
        let (exec, handle) = fake_server(move |mut s| {
            send(&mut s, b'o', HELLO);
            serve(s);
        });
        (Client::from_session(Session::from_executor(exec).unwrap()), handle)
    }

    /// Answers one request with `stdout` and `code` after checking its argv.
    fn reply(s: &mut UnixStream, argv: &[&str], stdout: &str, code: i32) {
        let req = recv_request(s).unwrap();
        assert_eq!(req, argv);
        if !stdout.is_empty() {
            send(s, b'o', stdout.as_bytes());
        }
        send_result(s, code);
    }

    #[test]
    fn commit_maps_benign_code() {
        let (c, server) = client(|mut s| {
            reply(&mut s, &["commit", "--message", "first commit"], "", 0);
            reply(&mut s, &["commit", "--message", "again"], "nothing changed\n", 1);
        });
        assert!(c.commit(&CommitOptions::new("first commit")).unwrap());
        assert!(!c.commit(&CommitOptions::new("again")).unwrap());
        drop(c);
        server.join().unwrap();
    }

    #[test]
    fn empty_message_sends_nothing() {
        let (c, server) = client(|mut s| {
            assert!(recv_request(&mut s).is_none());
        });
        let err = c.commit(&CommitOptions::new("")).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
        drop(c);
        server.join().unwrap();
    }

    #[test]
    fn hard_failure_carries_stderr() {
        let (c, server) = client(|mut s| {
            recv_request(&mut s).unwrap();
            send(&mut s, b'e', b"abort: repository default-push not found!\n");
            send_result(&mut s, 255);
        });
        match c.push(&PushOptions::new()).unwrap_err() {
            Error::CommandFailed {
                command,
                code,
                stderr,
            } => {
                assert_eq!(command, "push");
                assert_eq!(code, 255);
                assert_eq!(stderr, "abort: repository default-push not found!");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(!c.session().is_broken());
        drop(c);
        server.join().unwrap();
    }

    #[test]
    fn push_nothing_to_push() {
        let (c, server) = client(|mut s| {
            reply(&mut s, &["push", "../parent"], "no changes found\n", 1);
        });
        assert!(!c.push(&PushOptions::new().destination("../parent")).unwrap());
        drop(c);
        server.join().unwrap();
    }

    #[test]
    fn log_parses_xml() {
        let xml = r#"<?xml version="1.0"?>
<log>
<logentry revision="0" node="abc">
<author email="t@example.com">test</author>
<date>2020-01-01T00:00:00+00:00</date>
<msg xml:space="preserve">first commit</msg>
</logentry>
</log>
"#;
        let (c, server) = client(move |mut s| {
            reply(&mut s, &["log", "--style", "xml"], xml, 0);
            reply(&mut s, &["log", "--style", "xml", "--limit", "1"], "", 0);
        });
        let revs = c.log(&LogOptions::new()).unwrap();
        assert_eq!(revs.len(), 1);
        assert_eq!(revs[0].message, "first commit");
        assert_eq!(revs[0].email, "t@example.com");
        assert!(c.log(&LogOptions::new().limit(1)).unwrap().is_empty());
        drop(c);
        server.join().unwrap();
    }

    #[test]
    fn status_is_lenient() {
        let (c, server) = client(|mut s| {
            reply(&mut s, &["status"], "M a.txt\n? new file.txt\nX odd\n\n", 0);
        });
        let st = c.status(&StatusOptions::new()).unwrap();
        let got: Vec<_> = st.iter().map(|f| (f.path.as_str(), f.status)).collect();
        assert_eq!(
            got,
            [
                ("a.txt", Status::Modified),
                ("new file.txt", Status::Unknown),
                ("odd", Status::Clean),
            ]
        );
        drop(c);
        server.join().unwrap();
    }

    #[test]
    fn cat_and_streaming_cat() {
        let (c, server) = client(|mut s| {
            reply(&mut s, &["cat", "a.txt"], "qweqwe", 0);
            recv_request(&mut s).unwrap();
            send(&mut s, b'o', b"part1-");
            send(&mut s, b'o', b"part2");
            send_result(&mut s, 0);
        });
        assert_eq!(c.cat("a.txt", None).unwrap(), "qweqwe");
        let mut buf = Vec::new();
        c.cat_to("a.txt", Some("0"), &mut buf).unwrap();
        assert_eq!(buf, b"part1-part2");
        assert!(matches!(c.cat("", None), Err(Error::InvalidArgument(_))));
        drop(c);
        server.join().unwrap();
    }

    #[test]
    fn incoming_skips_leading_text() {
        let out = "comparing with ../parent\nsearching for changes\n<?xml version=\"1.0\"?>\n<log>\n<logentry revision=\"1\" node=\"ff\"><msg>second</msg></logentry>\n</log>\n";
        let (c, server) = client(move |mut s| {
            reply(&mut s, &["incoming", "--style", "xml", "../parent"], out, 0);
            reply(
                &mut s,
                &["outgoing", "--style", "xml"],
                "comparing with ../parent\nsearching for changes\nno changes found\n",
                1,
            );
        });
        let revs = c
            .incoming(&RemoteLogOptions::new().remote("../parent"))
            .unwrap();
        assert_eq!(revs.len(), 1);
        assert_eq!(revs[0].message, "second");
        assert!(c.outgoing(&RemoteLogOptions::new()).unwrap().is_empty());
        drop(c);
        server.join().unwrap();
    }

    #[test]
    fn heads_code_one_is_empty() {
        let (c, server) = client(|mut s| {
            reply(&mut s, &["heads", "--style", "xml", "--rev", "9"], "", 1);
        });
        assert!(c.heads(&HeadsOptions::new().rev("9")).unwrap().is_empty());
        drop(c);
        server.join().unwrap();
    }

    #[test]
    fn paths_and_resolve_list() {
        let (c, server) = client(|mut s| {
            reply(&mut s, &["paths"], "default = /srv/repo\nmirror=ssh://hg@host/repo\n", 0);
            reply(&mut s, &["resolve", "--list"], "R a.txt\nU b.txt\n", 0);
        });
        assert_eq!(
            c.paths().unwrap(),
            [
                ("default".to_owned(), "/srv/repo".to_owned()),
                ("mirror".to_owned(), "ssh://hg@host/repo".to_owned()),
            ]
        );
        let entries = c.resolve_list(&[]).unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries[0].resolved);
        assert_eq!(entries[1].path, "b.txt");
        assert!(!entries[1].resolved);
        drop(c);
        server.join().unwrap();
    }

    #[test]
    fn add_requires_files() {
        let (c, server) = client(|mut s| {
            reply(&mut s, &["add", "a.txt", "b.txt"], "", 0);
        });
        assert!(matches!(c.add(&[]), Err(Error::InvalidArgument(_))));
        assert!(c.add(&["a.txt", "b.txt"]).unwrap());
        drop(c);
        server.join().unwrap();
    }

    #[test]
    fn trait_object_dispatch() {
        let (c, server) = client(|mut s| {
            reply(&mut s, &["pull"], "", 0);
        });
        let repo: &dyn Repository = &c;
        assert!(repo.pull(&PullOptions::new()).unwrap());
        drop(c);
        server.join().unwrap();
    }

    #[test]
    fn clone_validates_before_spawning() {
        let config = Config::new("/nonexistent/hgcmd-test/hg");
        let err = Client::clone_repo(&config, "", "/tmp/x", &CloneOptions::new()).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }
}
