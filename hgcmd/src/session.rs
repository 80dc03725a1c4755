//! Command server process lifecycle: spawn, handshake, one-shot commands.
//!
//! A [`Session`] owns one `hg serve --cmdserver pipe` child for its whole
//! lifetime. It is never respawned: once broken it must be replaced.

use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStderr, Stdio};

use hgcmd_proto::{Channel, Frame};
use tracing::{debug, warn};

use crate::args::{Args, path_str};
use crate::config::Config;
use crate::executor::{CommandResult, Executor};
use crate::{Error, Result};

/// Capabilities and encoding announced by the server on startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handshake {
    /// Capability names in announcement order, without duplicates.
    capabilities: Vec<String>,
    /// Server-side encoding.
    encoding: String,
}

impl Handshake {
    /// Parses the hello frame.
    ///
    /// The frame must be on the output channel and hold `key: value` lines
    /// for at least `capabilities` and `encoding`.
    pub fn parse(frame: &Frame) -> Result<Self> {
        if frame.channel != Channel::Output {
            return Err(Error::HandshakeFailed(format!(
                "hello arrived on the {} channel",
                frame.channel
            )));
        }
        let text = frame.text();
        let mut capabilities = None;
        let mut encoding = None;
        for line in text.split('\n') {
            match line.split_once(": ") {
                Some(("capabilities", v)) => capabilities = Some(v),
                Some(("encoding", v)) => encoding = Some(v),
                _ => {}
            }
        }
        let caps = capabilities
            .ok_or_else(|| Error::HandshakeFailed("missing capabilities".into()))?;
        let encoding = encoding
            .ok_or_else(|| Error::HandshakeFailed("missing encoding".into()))?
            .to_owned();

        let mut capabilities: Vec<String> = Vec::new();
        for cap in caps.split(' ').filter(|c| !c.is_empty()) {
            if !capabilities.iter().any(|c| c == cap) {
                capabilities.push(cap.to_owned());
            }
        }
        let hs = Self {
            capabilities,
            encoding,
        };
        if !hs.has_capability("runcommand") {
            warn!(capabilities = ?hs.capabilities, "server does not announce runcommand");
        }
        Ok(hs)
    }

    /// Announced capabilities, in order.
    pub fn capabilities(&self) -> &[String] {
        &self.capabilities
    }

    /// Returns `true` if `name` was announced.
    pub fn has_capability(&self, name: &str) -> bool {
        self.capabilities.iter().any(|c| c == name)
    }

    /// The server's encoding as announced.
    pub fn encoding(&self) -> &str {
        &self.encoding
    }

    /// Returns `true` if the server speaks UTF-8.
    pub fn is_utf8(&self) -> bool {
        self.encoding.eq_ignore_ascii_case("utf-8") || self.encoding.eq_ignore_ascii_case("utf8")
    }

    /// Rejects tokens the server's encoding cannot represent.
    ///
    /// Requests are always UTF-8 bytes; for any other server encoding only
    /// ASCII survives unchanged.
    fn check_encodable(&self, args: &[String]) -> Result<()> {
        if self.is_utf8() {
            return Ok(());
        }
        match args.iter().find(|a| !a.is_ascii()) {
            Some(arg) => Err(Error::Encoding(format!(
                "{arg:?} is not representable in {}",
                self.encoding
            ))),
            None => Ok(()),
        }
    }
}

/// A running command server bound to one repository.
#[derive(Debug)]
pub struct Session {
    /// Server process; `None` for sessions over a bare pipe.
    child: Option<Child>,
    /// Serialized command cycles over the child's pipes.
    executor: Executor,
    /// Hello data.
    handshake: Handshake,
    /// Repository root the server was started in.
    repo: PathBuf,
}

impl Session {
    /// Spawns a command server for `repo` and completes the handshake.
    pub fn connect(config: &Config, repo: impl AsRef<Path>) -> Result<Self> {
        let repo = repo.as_ref();
        if repo.as_os_str().is_empty() {
            return Err(Error::InvalidArgument("repository path cannot be empty".into()));
        }
        let executable = config.executable().to_path_buf();
        let connect_err = |source| Error::Connect {
            executable: executable.clone(),
            source,
        };

        let mut child = config
            .command()
            .args(["serve", "--cmdserver", "pipe", "--cwd"])
            .arg(repo)
            .arg("--repository")
            .arg(repo)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(connect_err)?;
        debug!(pid = child.id(), repo = %repo.display(), "spawned command server");

        let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(connect_err(std::io::Error::other("server stdio unavailable")));
        };
        if let Some(stderr) = child.stderr.take() {
            drain_stderr(stderr);
        }

        let executor = Executor::new(stdout, stdin);
        let handshake = match executor.read_hello() {
            Ok(frame) => Handshake::parse(&frame),
            Err(e) => Err(Error::HandshakeFailed(e.to_string())),
        };
        let handshake = match handshake {
            Ok(hs) => hs,
            Err(e) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(e);
            }
        };
        debug!(encoding = handshake.encoding(), capabilities = ?handshake.capabilities(), "handshake complete");

        Ok(Self {
            child: Some(child),
            executor,
            handshake,
            repo: repo.to_path_buf(),
        })
    }

    /// Creates a new repository at `path` with a one-shot `hg init`.
    pub fn init(config: &Config, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return Err(Error::InvalidArgument("path cannot be empty".into()));
        }
        let mut args = Args::new("init");
        args.add(&[path_str(path)?]);
        run_oneshot(config, args).map(drop)
    }

    /// Server hello data.
    pub const fn handshake(&self) -> &Handshake {
        &self.handshake
    }

    /// Repository root the server runs in.
    pub fn repo(&self) -> &Path {
        &self.repo
    }

    /// Returns `true` once the session can no longer run commands.
    pub fn is_broken(&self) -> bool {
        self.executor.is_broken()
    }

    /// Runs one command and buffers its output.
    pub fn run(&self, args: &[String]) -> Result<CommandResult> {
        self.handshake.check_encodable(args)?;
        debug!(command = %args.join(" "), "runcommand");
        self.executor.run(args)
    }

    /// Runs one command, streaming output channel bytes to `sink`.
    pub fn run_to(&self, args: &[String], sink: &mut dyn Write) -> Result<CommandResult> {
        self.handshake.check_encodable(args)?;
        debug!(command = %args.join(" "), "runcommand (streaming)");
        self.executor.run_to(args, sink)
    }

    /// Shuts the server down by closing its stdin and waits for it to exit.
    pub fn close(mut self) -> Result<()> {
        self.executor.close();
        if let Some(child) = self.child.as_mut() {
            let status = child.wait()?;
            debug!(%status, "command server exited");
        }
        Ok(())
    }

    /// Builds a session over an existing pipe, without a child process.
    #[cfg(test)]
    pub(crate) fn from_executor(executor: Executor) -> Result<Self> {
        let handshake = Handshake::parse(&executor.read_hello()?)?;
        Ok(Self {
            child: None,
            executor,
            handshake,
            repo: PathBuf::from("."),
        })
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Some(child) = self.child.as_mut() {
            if matches!(child.try_wait(), Ok(None)) {
                let _ = child.kill();
            }
            let _ = child.wait();
        }
    }
}

/// Logs whatever the server writes to its raw stderr until it closes.
fn drain_stderr(stderr: ChildStderr) {
    let spawned = std::thread::Builder::new()
        .name("hg-stderr".into())
        .spawn(move || {
            for line in BufReader::new(stderr).lines() {
                match line {
                    Ok(line) => debug!(target: "hgcmd::server", "{line}"),
                    Err(_) => break,
                }
            }
        });
    if let Err(e) = spawned {
        warn!("cannot drain server stderr: {e}");
    }
}

/// Runs `hg <args>` to completion outside the command server.
///
/// Succeeds only if the process exits with status 0 and writes nothing
/// to stderr. Returns captured stdout.
pub(crate) fn run_oneshot(config: &Config, args: Args) -> Result<String> {
    if config.executable().as_os_str().is_empty() {
        return Err(Error::InvalidArgument("Mercurial executable path cannot be empty".into()));
    }
    let command = args.to_string();
    debug!(%command, "one-shot");
    let output = config
        .command()
        .args(args.build())
        .stdin(Stdio::null())
        .output()
        .map_err(|source| Error::Connect {
            executable: config.executable().to_path_buf(),
            source,
        })?;

    if !output.status.success() || !output.stderr.is_empty() {
        return Err(Error::Init {
            command,
            code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).trim_end().to_owned(),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn frame(channel: Channel, text: &str) -> Frame {
        Frame {
            channel,
            length: u32::try_from(text.len()).unwrap(),
            payload: text.as_bytes().to_vec(),
        }
    }

    #[test]
    fn parses_hello() {
        let hs = Handshake::parse(&frame(
            Channel::Output,
            "capabilities: getencoding runcommand getencoding\nencoding: UTF-8\npid: 4242",
        ))
        .unwrap();
        assert_eq!(hs.capabilities(), ["getencoding", "runcommand"]);
        assert_eq!(hs.encoding(), "UTF-8");
        assert!(hs.is_utf8());
        assert!(hs.has_capability("runcommand"));
        assert!(!hs.has_capability("attachio"));
    }

    #[test]
    fn value_splits_on_first_separator() {
        let hs = Handshake::parse(&frame(
            Channel::Output,
            "capabilities: runcommand\nencoding: ascii: odd",
        ))
        .unwrap();
        assert_eq!(hs.encoding(), "ascii: odd");
    }

    #[test]
    fn rejects_wrong_channel() {
        let err = Handshake::parse(&frame(
            Channel::Error,
            "capabilities: runcommand\nencoding: UTF-8",
        ))
        .unwrap_err();
        assert!(matches!(err, Error::HandshakeFailed(_)));
    }

    #[test]
    fn rejects_missing_keys() {
        for text in ["encoding: UTF-8", "capabilities: runcommand", "hello"] {
            let err = Handshake::parse(&frame(Channel::Output, text)).unwrap_err();
            assert!(matches!(err, Error::HandshakeFailed(_)), "{text}");
        }
    }

    #[test]
    fn non_utf8_server_accepts_only_ascii() {
        let hs = Handshake::parse(&frame(
            Channel::Output,
            "capabilities: runcommand\nencoding: ascii",
        ))
        .unwrap();
        assert!(hs.check_encodable(&["log".to_owned(), "--user".to_owned(), "bob".to_owned()]).is_ok());
        let err = hs
            .check_encodable(&["commit".to_owned(), "-m".to_owned(), "façade".to_owned()])
            .unwrap_err();
        assert!(matches!(err, Error::Encoding(_)));
    }

    #[test]
    fn init_rejects_empty_path() {
        let err = Session::init(&Config::default(), "").unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn init_rejects_empty_executable() {
        let err = Session::init(&Config::new(""), "/tmp/repo").unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn connect_reports_spawn_failure() {
        let config = Config::new("/nonexistent/hgcmd-test/hg");
        let err = Session::connect(&config, ".").unwrap_err();
        assert!(matches!(err, Error::Connect { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn session_over_fake_server() {
        use crate::executor::tests::{fake_server, recv_request, send, send_result};

        let (exec, server) = fake_server(|mut s| {
            send(
                &mut s,
                b'o',
                b"capabilities: getencoding runcommand\nencoding: UTF-8",
            );
            let req = recv_request(&mut s).unwrap();
            assert_eq!(req, ["root"]);
            send(&mut s, b'o', b"/repo\n");
            send_result(&mut s, 0);
        });
        let session = Session::from_executor(exec).unwrap();
        assert!(session.handshake().is_utf8());
        let res = session.run(&["root".to_owned()]).unwrap();
        assert_eq!(res.stdout, "/repo\n");
        drop(session);
        server.join().unwrap();
    }
}
