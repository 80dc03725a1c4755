//! One `runcommand` cycle at a time over an established server pipe.
//!
//! A cycle writes one request, then reads frames until the result frame.
//! The transport sits behind a mutex held for the whole cycle, so callers
//! on other threads block instead of interleaving frames. Any transport
//! failure or unanswered prompt leaves the pipe mid-cycle; the executor
//! is then marked broken and every later call fails fast.

use std::io::{self, BufReader, Read, Write};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use hgcmd_proto::{Channel, Frame};
use serde::Serialize;
use tracing::trace;

use crate::{Error, Result};

/// Outcome of one command cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandResult {
    /// Command-specific return code (0 success, 1 conventionally "nothing to do").
    pub code: i32,
    /// Accumulated output channel text. Empty when output went to a sink.
    pub stdout: String,
    /// Accumulated error channel text.
    pub stderr: String,
}

/// The server's pipes.
struct Transport {
    /// Server stdout, carrying channel frames.
    reader: BufReader<Box<dyn Read + Send>>,
    /// Server stdin, receiving requests.
    writer: Box<dyn Write + Send>,
}

/// Serializes command cycles against one command server.
pub struct Executor {
    /// Exclusive for the duration of a cycle.
    transport: Mutex<Transport>,
    /// Set once the pipe state is undefined.
    broken: AtomicBool,
}

impl std::fmt::Debug for Executor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Executor")
            .field("broken", &self.is_broken())
            .finish_non_exhaustive()
    }
}

impl Executor {
    /// Wraps the server's stdout (`reader`) and stdin (`writer`).
    pub fn new(reader: impl Read + Send + 'static, writer: impl Write + Send + 'static) -> Self {
        let reader: Box<dyn Read + Send> = Box::new(reader);
        let writer: Box<dyn Write + Send> = Box::new(writer);
        Self {
            transport: Mutex::new(Transport {
                reader: BufReader::new(reader),
                writer,
            }),
            broken: AtomicBool::new(false),
        }
    }

    /// Returns `true` once a fatal error has invalidated the pipe.
    pub fn is_broken(&self) -> bool {
        self.broken.load(Ordering::Acquire)
    }

    /// Reads the single frame the server sends on startup.
    pub fn read_hello(&self) -> Result<Frame> {
        self.locked(|t| Ok(hgcmd_proto::read_frame(&mut t.reader)?))
    }

    /// Runs one command and buffers its output.
    pub fn run(&self, args: &[String]) -> Result<CommandResult> {
        let mut stdout = Vec::new();
        let (code, stderr) = self.cycle(args, &mut stdout)?;
        Ok(CommandResult {
            code,
            stdout: String::from_utf8_lossy(&stdout).into_owned(),
            stderr,
        })
    }

    /// Runs one command, forwarding output channel bytes to `sink`.
    ///
    /// If the sink fails, the remaining frames are still drained so the
    /// session stays usable, and the sink error is returned.
    pub fn run_to(&self, args: &[String], sink: &mut dyn Write) -> Result<CommandResult> {
        let (code, stderr) = self.cycle(args, sink)?;
        Ok(CommandResult {
            code,
            stdout: String::new(),
            stderr,
        })
    }

    /// Closes the server's stdin, which makes it exit, and retires the pipe.
    pub fn close(&self) {
        if let Ok(mut t) = self.transport.lock() {
            let _ = t.writer.flush();
            t.writer = Box::new(io::sink());
        }
        self.broken.store(true, Ordering::Release);
    }

    /// Encodes the request, then runs the exchange under the lock.
    fn cycle(&self, args: &[String], out: &mut dyn Write) -> Result<(i32, String)> {
        let request = hgcmd_proto::encode_request(args).map_err(|e| match e {
            hgcmd_proto::Error::Encoding(arg) => {
                Error::Encoding(format!("{arg:?} contains a NUL byte"))
            }
            other => Error::Transport(other),
        })?;
        self.locked(|t| exchange(t, &request, out))
    }

    /// Runs `f` with exclusive access, marking the executor broken on fatal errors.
    fn locked<T>(&self, f: impl FnOnce(&mut Transport) -> Result<T>) -> Result<T> {
        let mut guard = self.transport.lock().map_err(|_| Error::SessionBroken)?;
        if self.is_broken() {
            return Err(Error::SessionBroken);
        }
        let result = f(&mut *guard);
        if let Err(Error::Transport(_) | Error::UnsupportedPrompt { .. }) = &result {
            self.broken.store(true, Ordering::Release);
        }
        result
    }
}

/// Writes `request` and reads frames up to and including the result frame.
fn exchange(t: &mut Transport, request: &[u8], out: &mut dyn Write) -> Result<(i32, String)> {
    t.writer
        .write_all(request)
        .and_then(|()| t.writer.flush())
        .map_err(hgcmd_proto::Error::from)?;

    let mut stderr = Vec::new();
    let mut sink_err = None;
    loop {
        let frame = hgcmd_proto::read_frame(&mut t.reader)?;
        trace!(channel = %frame.channel, length = frame.length, "frame");
        match frame.channel {
            Channel::Output => {
                if sink_err.is_none() {
                    sink_err = out.write_all(&frame.payload).err();
                }
            }
            Channel::Error => stderr.extend_from_slice(&frame.payload),
            Channel::Debug => trace!(text = %frame.text(), "server debug"),
            Channel::Result => {
                let code = frame.result_code()?;
                if let Some(e) = sink_err {
                    return Err(Error::Io(e));
                }
                return Ok((code, String::from_utf8_lossy(&stderr).into_owned()));
            }
            channel @ (Channel::Input | Channel::LineInput) => {
                return Err(Error::UnsupportedPrompt {
                    channel,
                    requested: frame.length,
                });
            }
        }
    }
}

#[cfg(all(test, unix))]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use std::io::{Read, Write};
    use std::os::unix::net::UnixStream;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    use super::*;

    /// Writes one server frame.
    pub(crate) fn send(w: &mut impl Write, tag: u8, payload: &[u8]) {
        w.write_all(&[tag]).unwrap();
        w.write_all(&u32::try_from(payload.len()).unwrap().to_be_bytes())
            .unwrap();
        w.write_all(payload).unwrap();
        w.flush().unwrap();
    }

    /// Writes a result frame.
    pub(crate) fn send_result(w: &mut impl Write, code: i32) {
        send(w, b'r', &code.to_be_bytes());
    }

    /// Reads one request and returns its argv, or `None` on EOF.
    pub(crate) fn recv_request(r: &mut impl Read) -> Option<Vec<String>> {
        let mut head = [0u8; 15];
        r.read_exact(&mut head).ok()?;
        assert_eq!(&head[..11], b"runcommand\n");
        let len = u32::from_be_bytes(head[11..15].try_into().unwrap()) as usize;
        let mut body = vec![0u8; len];
        r.read_exact(&mut body).unwrap();
        let text = String::from_utf8(body).unwrap();
        Some(text.split('\0').map(str::to_owned).collect())
    }

    /// Executor connected to a fake server running `serve` on its own thread.
    pub(crate) fn fake_server(
        serve: impl FnOnce(UnixStream) + Send + 'static,
    ) -> (Executor, thread::JoinHandle<()>) {
        let (client, server) = UnixStream::pair().unwrap();
        let reader = client.try_clone().unwrap();
        let handle = thread::spawn(move || serve(server));
        (Executor::new(reader, client), handle)
    }

    fn argv(tokens: &[&str]) -> Vec<String> {
        tokens.iter().map(|s| (*s).to_owned()).collect()
    }

    #[test]
    fn accumulates_output_and_error() {
        let (exec, server) = fake_server(|mut s| {
            let req = recv_request(&mut s).unwrap();
            assert_eq!(req, ["status", "--quiet"]);
            send(&mut s, b'o', b"M a.txt\n");
            send(&mut s, b'e', b"warning: ");
            send(&mut s, b'd', b"debug noise");
            send(&mut s, b'o', b"A b.txt\n");
            send(&mut s, b'e', b"careful\n");
            send_result(&mut s, 0);
        });
        let res = exec.run(&argv(&["status", "--quiet"])).unwrap();
        assert_eq!(res.code, 0);
        assert_eq!(res.stdout, "M a.txt\nA b.txt\n");
        assert_eq!(res.stderr, "warning: careful\n");
        server.join().unwrap();
    }

    #[test]
    fn negative_result_code() {
        let (exec, server) = fake_server(|mut s| {
            recv_request(&mut s).unwrap();
            send_result(&mut s, -1);
        });
        assert_eq!(exec.run(&argv(&["id"])).unwrap().code, -1);
        server.join().unwrap();
    }

    #[test]
    fn streams_output_to_sink() {
        let (exec, server) = fake_server(|mut s| {
            recv_request(&mut s).unwrap();
            send(&mut s, b'o', &[0, 159, 146, 150]);
            send(&mut s, b'o', b"tail");
            send_result(&mut s, 0);
        });
        let mut sink = Vec::new();
        let res = exec.run_to(&argv(&["cat", "bin"]), &mut sink).unwrap();
        assert_eq!(sink, b"\0\x9f\x92\x96tail");
        assert!(res.stdout.is_empty());
        server.join().unwrap();
    }

    #[test]
    fn failing_sink_drains_cycle() {
        struct Broken;
        impl Write for Broken {
            fn write(&mut self, _: &[u8]) -> io::Result<usize> {
                Err(io::Error::other("disk full"))
            }
            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let (exec, server) = fake_server(|mut s| {
            recv_request(&mut s).unwrap();
            send(&mut s, b'o', b"one");
            send(&mut s, b'o', b"two");
            send_result(&mut s, 0);
            recv_request(&mut s).unwrap();
            send(&mut s, b'o', b"ok");
            send_result(&mut s, 0);
        });
        let err = exec.run_to(&argv(&["cat", "x"]), &mut Broken).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
        assert!(!exec.is_broken());
        assert_eq!(exec.run(&argv(&["id"])).unwrap().stdout, "ok");
        server.join().unwrap();
    }

    #[test]
    fn prompt_is_unsupported_and_breaks_session() {
        let (exec, server) = fake_server(|mut s| {
            recv_request(&mut s).unwrap();
            s.write_all(&[b'L', 0, 0, 16, 0]).unwrap();
        });
        let err = exec.run(&argv(&["merge"])).unwrap_err();
        assert!(matches!(
            err,
            Error::UnsupportedPrompt {
                channel: Channel::LineInput,
                requested: 4096
            }
        ));
        assert!(exec.is_broken());
        assert!(matches!(
            exec.run(&argv(&["id"])).unwrap_err(),
            Error::SessionBroken
        ));
        server.join().unwrap();
    }

    #[test]
    fn disconnect_mid_frame_is_transport_error() {
        let (exec, server) = fake_server(|mut s| {
            recv_request(&mut s).unwrap();
            s.write_all(&[b'o', 0, 0, 0, 10]).unwrap();
            s.write_all(b"abc").unwrap();
        });
        let err = exec.run(&argv(&["log"])).unwrap_err();
        assert!(matches!(
            err,
            Error::Transport(hgcmd_proto::Error::ShortRead {
                expected: 10,
                actual: 3
            })
        ));
        assert!(exec.is_broken());
        server.join().unwrap();
    }

    #[test]
    fn nul_in_argument_is_local_error() {
        let (exec, server) = fake_server(|mut s| {
            assert!(recv_request(&mut s).is_none());
        });
        let err = exec.run(&argv(&["cat", "a\0b"])).unwrap_err();
        assert!(matches!(err, Error::Encoding(_)));
        assert!(!exec.is_broken());
        drop(exec);
        server.join().unwrap();
    }

    #[test]
    fn concurrent_commands_do_not_interleave() {
        let (exec, server) = fake_server(|mut s| {
            while let Some(req) = recv_request(&mut s) {
                let tag = req[1].as_bytes();
                for _ in 0..5 {
                    send(&mut s, b'o', tag);
                    thread::sleep(Duration::from_millis(2));
                }
                send_result(&mut s, 0);
            }
        });
        let exec = Arc::new(exec);

        let workers: Vec<_> = ["a", "b", "c", "d"]
            .into_iter()
            .map(|tag| {
                let exec = Arc::clone(&exec);
                thread::spawn(move || {
                    for _ in 0..3 {
                        let res = exec.run(&argv(&["echo", tag])).unwrap();
                        assert_eq!(res.stdout, tag.repeat(5));
                    }
                })
            })
            .collect();
        for w in workers {
            w.join().unwrap();
        }

        drop(exec);
        server.join().unwrap();
    }
}
