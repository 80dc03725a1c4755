//! Error types for hgcmd operations.

use std::path::PathBuf;

/// Alias for `Result<T, hgcmd::Error>`.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by sessions and client operations.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The command server process could not be spawned.
    #[error("failed to start {}: {source}", executable.display())]
    Connect {
        /// Executable that was launched.
        executable: PathBuf,
        /// Spawn error.
        source: std::io::Error,
    },

    /// A one-shot invocation (`init`, `clone`) failed.
    #[error("hg {command} failed (exit code {code:?}): {stderr}")]
    Init {
        /// Rendered command line, without the executable.
        command: String,
        /// Process exit code, `None` if killed by a signal.
        code: Option<i32>,
        /// Captured stderr text.
        stderr: String,
    },

    /// The server's hello frame was not a valid handshake.
    #[error("handshake failed: {0}")]
    HandshakeFailed(String),

    /// Reading or writing the server pipes failed mid-cycle.
    #[error("transport error: {0}")]
    Transport(#[from] hgcmd_proto::Error),

    /// The server asked for interactive input, which is never answered.
    #[error("server requested {requested} bytes on the {channel} channel; prompts are not supported")]
    UnsupportedPrompt {
        /// Input channel used by the server.
        channel: hgcmd_proto::Channel,
        /// Bytes requested.
        requested: u32,
    },

    /// The session hit a fatal error earlier and must be replaced.
    #[error("session is broken; reconnect to continue")]
    SessionBroken,

    /// A caller-supplied parameter violates a precondition.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// An argument cannot be carried to the server.
    #[error("cannot encode argument: {0}")]
    Encoding(String),

    /// Command output could not be parsed.
    #[error("malformed output: {0}")]
    MalformedOutput(String),

    /// A command finished with a result code outside its accepted set.
    #[error("hg {command} failed with code {code}: {stderr}")]
    CommandFailed {
        /// Subcommand name.
        command: String,
        /// Server result code.
        code: i32,
        /// Captured error-channel text.
        stderr: String,
    },

    /// Local I/O error (e.g. writing to a streaming sink).
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
