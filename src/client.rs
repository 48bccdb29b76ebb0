//! The client side of a single NRPE exchange.

use std::time::Duration;

use crate::{
    command::{Command, CommandResult, Status},
    packet::{Packet, PacketType},
    tls::TlsStream,
    transport::{self, Transport},
    Error,
};

/// Runs one NRPE exchange over `stream`: sends `command` as a query packet
/// and parses the response into a [`CommandResult`].
///
/// With `use_tls` the stream is wrapped in an anonymous-DH TLS session for
/// the duration of the call; the handshake runs lazily as part of the first
/// write. A `timeout` bounds each individual I/O operation (`None` means no
/// deadline).
///
/// The stream is borrowed, never closed, and handed back in an unspecified
/// state if the exchange fails partway - discard it rather than reusing it.
pub fn run<T: Transport>(
    stream: &mut T,
    command: &Command,
    use_tls: bool,
    timeout: Option<Duration>,
) -> Result<CommandResult, Error> {
    // Reject oversize commands before touching the stream.
    let payload = command.join()?;
    let query = Packet::build(PacketType::Query, 0, &payload);

    let response = if use_tls {
        let mut tls = TlsStream::connect(&mut *stream)?;
        exchange(&mut tls, &query, timeout)?
    } else {
        exchange(stream, &query, timeout)?
    };

    parse_response(response)
}

/// One write, one read.
fn exchange<T>(stream: &mut T, query: &Packet, timeout: Option<Duration>) -> Result<Packet, Error>
where
    T: Transport + ?Sized,
{
    transport::write_packet(stream, query, timeout)?;
    transport::read_packet(stream, timeout)
}

fn parse_response(mut response: Packet) -> Result<CommandResult, Error> {
    response.verify(PacketType::Response)?;

    let status = Status::try_from(response.status_code())?;

    // A data area with no terminator is a legitimate empty status line on
    // the client side.
    let status_line = response
        .payload()
        .map(|line| String::from_utf8_lossy(line).into_owned())
        .unwrap_or_default();

    Ok(CommandResult::new(status, status_line))
}

#[cfg(test)]
mod tests {
    use crate::transport::tests::MemStream;

    use super::*;

    fn scripted_response(packet: &Packet) -> MemStream {
        MemStream::new(packet.as_bytes().to_vec())
    }

    #[test]
    fn test_run_parses_response() {
        let response = Packet::build(PacketType::Response, 0, b"OK - 3 users");
        let mut stream = scripted_response(&response);

        let got = run(
            &mut stream,
            &Command::new("check_users", ["-w", "5"]),
            false,
            None,
        )
        .unwrap();

        assert_eq!(got.status(), Status::Ok);
        assert_eq!(got.status_line(), "OK - 3 users");

        // The emitted query carries the joined command.
        let query = Packet::from_buf(stream.output.as_slice().into());
        assert_eq!(query.version(), 2);
        assert_eq!(query.payload(), Some(b"check_users!-w!5".as_ref()));
    }

    #[test]
    fn test_run_rejects_oversize_command_before_io() {
        let mut stream = MemStream::new(Vec::new());

        let got = run(
            &mut stream,
            &Command::new("x".repeat(2048), None::<String>),
            false,
            None,
        );

        assert_eq!(
            got,
            Err(Error::CommandTooLong {
                got: 2048,
                max: 1023,
            })
        );
        assert!(stream.output.is_empty());
    }

    #[test]
    fn test_run_rejects_wrong_packet_type() {
        // A query where a response is expected.
        let bogus = Packet::build(PacketType::Query, 0, b"hello");
        let mut stream = scripted_response(&bogus);

        let got = run(&mut stream, &Command::new("c", ["1"]), false, None);
        assert_eq!(
            got,
            Err(Error::WrongType {
                got: 1,
                expected: 2,
            })
        );
    }

    #[test]
    fn test_run_rejects_tampered_crc() {
        let response = Packet::build(PacketType::Response, 0, b"OK");
        let mut raw = response.as_bytes().to_vec();
        raw[4] = raw[4].wrapping_add(1);
        let mut stream = MemStream::new(raw);

        let got = run(&mut stream, &Command::new("c", ["1"]), false, None);
        assert_eq!(got, Err(Error::BadCrc));
    }

    #[test]
    fn test_run_rejects_unknown_status() {
        let response = Packet::build(PacketType::Response, 10, b"??");
        let mut stream = scripted_response(&response);

        let got = run(&mut stream, &Command::new("c", ["1"]), false, None);
        assert_eq!(got, Err(Error::UnknownStatus { code: 10 }));
    }

    #[test]
    fn test_run_empty_status_line_without_terminator() {
        // Hand-build a response whose data area has no NUL at all.
        let mut raw = Packet::build(PacketType::Response, 1, b"").as_bytes().to_vec();
        raw[10..1034].fill(b'A');
        // Recompute the checksum over the modified buffer.
        raw[4..8].fill(0);
        let crc = crate::crc32::checksum(&raw);
        raw[4..8].copy_from_slice(&crc.to_be_bytes());
        let mut stream = MemStream::new(raw);

        let got = run(&mut stream, &Command::new("c", ["1"]), false, None).unwrap();
        assert_eq!(got.status(), Status::Warning);
        assert_eq!(got.status_line(), "");
    }

    #[test]
    fn test_run_surfaces_read_failure() {
        // Scripted stream with no response bytes at all.
        let mut stream = MemStream::new(Vec::new());

        let got = run(&mut stream, &Command::new("c", ["1"]), false, None);
        assert!(matches!(got, Err(Error::Read(_, _))), "got {:?}", got);
    }
}
