//! The caller-supplied stream contract and exact-length packet framing.

use std::{
    io::{self, Read, Write},
    net::TcpStream,
    time::Duration,
};
#[cfg(unix)]
use std::os::unix::net::UnixStream;

use bytes::BytesMut;

use crate::{
    packet::{Packet, PACKET_LEN},
    Error,
};

/// A connected, bidirectional byte stream an exchange runs over.
///
/// The library takes no ownership of the stream: it is never closed here,
/// and after a failed exchange it is handed back in whatever state it is in.
pub trait Transport: Read + Write {
    /// Arms the deadline applied to each subsequent blocking read or write.
    ///
    /// `None` removes any deadline. The framing layer re-arms the deadline
    /// before every I/O operation, so a timeout bounds each operation rather
    /// than the whole exchange.
    fn set_timeout(&mut self, timeout: Option<Duration>) -> io::Result<()>;
}

impl Transport for TcpStream {
    fn set_timeout(&mut self, timeout: Option<Duration>) -> io::Result<()> {
        self.set_read_timeout(timeout)?;
        self.set_write_timeout(timeout)
    }
}

#[cfg(unix)]
impl Transport for UnixStream {
    fn set_timeout(&mut self, timeout: Option<Duration>) -> io::Result<()> {
        self.set_read_timeout(timeout)?;
        self.set_write_timeout(timeout)
    }
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn set_timeout(&mut self, timeout: Option<Duration>) -> io::Result<()> {
        (**self).set_timeout(timeout)
    }
}

#[derive(Clone, Copy)]
pub(crate) enum IoOp {
    Read,
    Write,
}

/// Writes all [`PACKET_LEN`] bytes of `packet`, arming the per-operation
/// deadline first.
pub(crate) fn write_packet<T>(
    stream: &mut T,
    packet: &Packet,
    timeout: Option<Duration>,
) -> Result<(), Error>
where
    T: Transport + ?Sized,
{
    if timeout.is_some() {
        stream
            .set_timeout(timeout)
            .map_err(|e| map_io_error(e, IoOp::Write))?;
    }

    stream
        .write_all(packet.as_bytes())
        .and_then(|()| stream.flush())
        .map_err(|e| map_io_error(e, IoOp::Write))
}

/// Reads exactly [`PACKET_LEN`] bytes into a fresh packet buffer, arming the
/// per-operation deadline first.
pub(crate) fn read_packet<T>(stream: &mut T, timeout: Option<Duration>) -> Result<Packet, Error>
where
    T: Transport + ?Sized,
{
    if timeout.is_some() {
        stream
            .set_timeout(timeout)
            .map_err(|e| map_io_error(e, IoOp::Read))?;
    }

    let mut buf = BytesMut::zeroed(PACKET_LEN);
    stream
        .read_exact(&mut buf)
        .map_err(|e| map_io_error(e, IoOp::Read))?;

    Ok(Packet::from_buf(buf))
}

/// Folds an I/O failure into the crate error taxonomy.
///
/// The TLS adapter smuggles protocol-level errors (handshake faults,
/// [`Error::InconsistentState`]) through `io::Error`; those are unwrapped
/// and surfaced as-is rather than wrapped a second time.
pub(crate) fn map_io_error(e: io::Error, op: IoOp) -> Error {
    let kind = e.kind();
    let message = e.to_string();

    match e.into_inner().map(|inner| inner.downcast::<Error>()) {
        Some(Ok(err)) => *err,
        _ => match op {
            IoOp::Read => Error::Read(kind, message),
            IoOp::Write => Error::Write(kind, message),
        },
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::io::Cursor;

    use crate::{errors::TlsOp, packet::PacketType};

    use super::*;

    // An in-memory stream: reads drain a scripted buffer, writes append to a
    // growable one.
    pub(crate) struct MemStream {
        pub(crate) input: Cursor<Vec<u8>>,
        pub(crate) output: Vec<u8>,
    }

    impl MemStream {
        pub(crate) fn new(input: Vec<u8>) -> Self {
            Self {
                input: Cursor::new(input),
                output: Vec::new(),
            }
        }
    }

    impl Read for MemStream {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.input.read(buf)
        }
    }

    impl Write for MemStream {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.output.write(buf)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Transport for MemStream {
        fn set_timeout(&mut self, _timeout: Option<Duration>) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_write_packet_emits_full_wire_size() {
        let mut stream = MemStream::new(Vec::new());
        let packet = Packet::build(PacketType::Query, 0, b"check_foo");

        write_packet(&mut stream, &packet, None).unwrap();

        assert_eq!(stream.output.len(), PACKET_LEN);
        assert_eq!(stream.output, packet.as_bytes());
    }

    #[test]
    fn test_read_packet_round_trip() {
        let packet = Packet::build(PacketType::Response, 0, b"OK");
        let mut stream = MemStream::new(packet.as_bytes().to_vec());

        let got = read_packet(&mut stream, None).unwrap();
        assert_eq!(got.as_bytes(), packet.as_bytes());
    }

    #[test]
    fn test_read_packet_short_stream() {
        let mut stream = MemStream::new(vec![0_u8; 100]);

        let got = read_packet(&mut stream, None);
        assert!(matches!(got, Err(Error::Read(_, _))), "got {:?}", got);
    }

    #[test]
    fn test_map_io_error_folds_plain_errors() {
        let e = io::Error::new(io::ErrorKind::TimedOut, "sorry");

        assert_eq!(
            map_io_error(e, IoOp::Read),
            Error::Read(io::ErrorKind::TimedOut, "sorry".to_string())
        );
    }

    #[test]
    fn test_map_io_error_unwraps_protocol_errors() {
        let e = io::Error::other(Error::Tls {
            op: TlsOp::Read,
            message: "broken".to_string(),
        });

        assert_eq!(
            map_io_error(e, IoOp::Read),
            Error::Tls {
                op: TlsOp::Read,
                message: "broken".to_string(),
            }
        );
    }

    #[test]
    fn test_map_io_error_unwraps_inconsistent_state() {
        let e = io::Error::other(Error::InconsistentState);
        assert_eq!(map_io_error(e, IoOp::Write), Error::InconsistentState);
    }
}
