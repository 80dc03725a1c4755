//! Frame codec over any `Read`/`Write` stream.
//!
//! Server frame: `[u8 channel][i32 big-endian length][payload]`.
//! Client request: `runcommand\n[u32 big-endian length][argv joined by NUL]`.

use std::borrow::Cow;
use std::io::{self, Read, Write};

use crate::{Channel, Error, Result};

/// Size of a frame header: one channel byte plus a 4-byte length.
pub const HEADER_LEN: usize = 5;

/// Command token that opens every request.
const RUNCOMMAND: &[u8] = b"runcommand\n";

/// One frame read from the server's output stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Channel the frame was sent on.
    pub channel: Channel,
    /// Payload length, or the requested byte count for input channels.
    pub length: u32,
    /// Payload bytes. Always empty for input channels.
    pub payload: Vec<u8>,
}

impl Frame {
    /// Decodes the big-endian return code carried by a result frame.
    pub fn result_code(&self) -> Result<i32> {
        let bytes: [u8; 4] = self
            .payload
            .as_slice()
            .try_into()
            .map_err(|_| Error::InvalidLength(i64::from(self.length)))?;
        Ok(i32::from_be_bytes(bytes))
    }

    /// Payload decoded as UTF-8, replacing invalid sequences.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.payload)
    }
}

/// Encodes a `runcommand` request for `argv`.
///
/// Tokens are joined with NUL separators (no trailing NUL). A token that
/// itself contains a NUL byte would split on the server side and is
/// rejected with [`Error::Encoding`].
pub fn encode_request<S: AsRef<str>>(argv: &[S]) -> Result<Vec<u8>> {
    let mut body = Vec::new();
    for (i, arg) in argv.iter().enumerate() {
        let arg = arg.as_ref();
        if arg.contains('\0') {
            return Err(Error::Encoding(arg.to_owned()));
        }
        if i > 0 {
            body.push(0);
        }
        body.extend_from_slice(arg.as_bytes());
    }
    let len = u32::try_from(body.len())
        .map_err(|_| Error::InvalidLength(i64::try_from(body.len()).unwrap_or(i64::MAX)))?;

    let mut buf = Vec::with_capacity(RUNCOMMAND.len() + 4 + body.len());
    buf.extend_from_slice(RUNCOMMAND);
    buf.extend_from_slice(&len.to_be_bytes());
    buf.extend_from_slice(&body);
    Ok(buf)
}

/// Encodes a request for `argv`, writes it to `w`, and flushes.
pub fn write_request<W: Write, S: AsRef<str>>(w: &mut W, argv: &[S]) -> Result<()> {
    let buf = encode_request(argv)?;
    w.write_all(&buf)?;
    w.flush()?;
    Ok(())
}

/// Reads one frame from `r`.
///
/// For [`Channel::Input`] and [`Channel::LineInput`] the length is the
/// number of bytes the server is asking for and nothing further is read.
pub fn read_frame<R: Read>(r: &mut R) -> Result<Frame> {
    let mut header = [0u8; HEADER_LEN];
    let n = read_full(r, &mut header)?;
    if n != HEADER_LEN {
        return Err(Error::ShortRead {
            expected: HEADER_LEN,
            actual: n,
        });
    }

    let channel = Channel::from_byte(header[0]).ok_or(Error::UnknownChannel(header[0]))?;
    let raw = i32::from_be_bytes([header[1], header[2], header[3], header[4]]);
    let length = u32::try_from(raw).map_err(|_| Error::InvalidLength(i64::from(raw)))?;

    if channel.is_input() {
        return Ok(Frame {
            channel,
            length,
            payload: Vec::new(),
        });
    }

    let expected = length as usize;
    let mut payload = vec![0u8; expected];
    let n = read_full(r, &mut payload)?;
    if n != expected {
        return Err(Error::ShortRead {
            expected,
            actual: n,
        });
    }
    Ok(Frame {
        channel,
        length,
        payload,
    })
}

/// Fills `buf` from `r`, stopping early only at end of stream.
///
/// Returns the number of bytes read so callers can report short reads.
fn read_full<R: Read>(r: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match r.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
