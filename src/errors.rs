use std::fmt;

use thiserror::Error;

/// The TLS adapter operation in which an [`Error::Tls`] fault occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TlsOp {
    /// Context construction: cipher list, protocol options, or ephemeral DH
    /// parameter generation.
    Setup,

    /// The deferred handshake driven by the first read or write.
    Handshake,

    /// A read through the TLS session.
    Read,

    /// A write through the TLS session.
    Write,
}

impl fmt::Display for TlsOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Setup => write!(f, "setup"),
            Self::Handshake => write!(f, "handshake"),
            Self::Read => write!(f, "read"),
            Self::Write => write!(f, "write"),
        }
    }
}

/// Error types returned by this crate.
#[non_exhaustive]
#[derive(Debug, Error, PartialEq)]
pub enum Error {
    /// The command name and `!`-joined arguments would fill or overflow the
    /// packet data area, leaving no room for the NUL terminator.
    ///
    /// Nothing is written to the stream when this is returned.
    #[error("command too long: got {got} bytes, max allowed {max}")]
    CommandTooLong {
        /// The joined length of the command name and arguments.
        got: usize,

        /// The longest command the data area can carry.
        max: usize,
    },

    /// The underlying stream failed while writing a packet, or accepted fewer
    /// bytes than a full packet.
    #[error("i/o error writing packet ({0:?}): {1}")]
    Write(std::io::ErrorKind, String),

    /// The underlying stream failed while reading a packet, or produced fewer
    /// bytes than a full packet.
    #[error("i/o error reading packet ({0:?}): {1}")]
    Read(std::io::ErrorKind, String),

    /// The type field of a received packet does not match the packet type
    /// expected for this side of the exchange.
    #[error("unexpected packet type: got {got}, expected {expected}")]
    WrongType {
        /// The raw type field read from the packet.
        got: u16,

        /// The type required by the caller.
        expected: u16,
    },

    /// The CRC32 check failed on a received packet.
    #[error("packet crc32 mismatch")]
    BadCrc,

    /// A query packet's data area contains no NUL terminator, so no command
    /// can be extracted from it.
    #[error("invalid request: data area is not null-terminated")]
    InvalidRequest,

    /// A response packet carries a status code outside the `OK` / `Warning` /
    /// `Critical` / `Unknown` range.
    #[error("unknown status code {code}")]
    UnknownStatus {
        /// The raw status field read from the packet.
        code: u16,
    },

    /// A TLS-wrapped stream was used again after its handshake failed.
    #[error("inconsistent connection state")]
    InconsistentState,

    /// The TLS adapter failed during context setup, the handshake, or an I/O
    /// operation on the encrypted stream.
    #[error("tls {op} failed: {message}")]
    Tls {
        /// Which adapter operation failed.
        op: TlsOp,

        /// The rendered OpenSSL (or underlying stream) error.
        message: String,
    },

    /// The server handler rejected the command. No response packet is written
    /// when this is returned.
    #[error("handler failed: {0}")]
    Handler(String),
}
