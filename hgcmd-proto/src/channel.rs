//! Channel tags multiplexed on the server's output stream.

use std::fmt;

/// A command-server channel, identified by its single-byte tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Channel {
    /// Server requests up to `length` bytes of raw input.
    Input = b'I',
    /// Server requests a single line of input (at most `length` bytes).
    LineInput = b'L',
    /// Ordinary command output (stdout).
    Output = b'o',
    /// Error output (stderr).
    Error = b'e',
    /// 4-byte big-endian return code; ends a command cycle.
    Result = b'r',
    /// Diagnostic text, only sent when server logging is enabled.
    Debug = b'd',
}

impl Channel {
    /// Maps a header tag byte to its channel.
    pub const fn from_byte(b: u8) -> Option<Self> {
        match b {
            b'I' => Some(Self::Input),
            b'L' => Some(Self::LineInput),
            b'o' => Some(Self::Output),
            b'e' => Some(Self::Error),
            b'r' => Some(Self::Result),
            b'd' => Some(Self::Debug),
            _ => None,
        }
    }

    /// Returns the wire tag byte.
    pub const fn as_byte(self) -> u8 {
        self as u8
    }

    /// Returns `true` for channels whose length is a byte count the
    /// server wants from the client rather than a payload size.
    pub const fn is_input(self) -> bool {
        matches!(self, Self::Input | Self::LineInput)
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Input => "input",
            Self::LineInput => "line-input",
            Self::Output => "output",
            Self::Error => "error",
            Self::Result => "result",
            Self::Debug => "debug",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_roundtrip() {
        for tag in *b"ILoerd" {
            let ch = Channel::from_byte(tag).unwrap();
            assert_eq!(ch.as_byte(), tag);
        }
    }

    #[test]
    fn unknown_tags_rejected() {
        assert_eq!(Channel::from_byte(b'O'), None);
        assert_eq!(Channel::from_byte(b'x'), None);
        assert_eq!(Channel::from_byte(0), None);
    }

    #[test]
    fn only_prompts_are_input() {
        assert!(Channel::Input.is_input());
        assert!(Channel::LineInput.is_input());
        assert!(!Channel::Output.is_input());
        assert!(!Channel::Result.is_input());
    }
}
