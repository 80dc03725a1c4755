//! Wire protocol for the Mercurial command server.
//!
//! `hg serve --cmdserver pipe` multiplexes its output onto channels. Each
//! server frame carries a 1-byte channel tag and a 4-byte big-endian
//! length; requests are the literal `runcommand\n` followed by a
//! length-prefixed, NUL-joined argument vector.

mod channel;
mod codec;

pub use channel::Channel;
pub use codec::{Frame, HEADER_LEN, encode_request, read_frame, write_request};

/// Alias for `Result<T, hgcmd_proto::Error>`.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced while encoding requests or decoding frames.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The stream ended before a header or payload was complete.
    #[error("short read: expected {expected} bytes, read {actual}")]
    ShortRead {
        /// Bytes the frame declared.
        expected: usize,
        /// Bytes actually available before end of stream.
        actual: usize,
    },

    /// The first header byte is not a known channel tag.
    #[error("unknown channel tag {0:#04x}")]
    UnknownChannel(u8),

    /// A length field that cannot describe a payload.
    #[error("invalid frame length {0}")]
    InvalidLength(i64),

    /// A request token cannot be carried by the protocol.
    #[error("cannot encode argument {0:?}")]
    Encoding(String),

    /// Underlying stream error.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
