//! The server side of a single NRPE exchange.

use std::time::Duration;

use crate::{
    command::{Command, CommandResult},
    packet::{Packet, PacketType},
    tls::TlsStream,
    transport::{self, Transport},
    Error,
};

/// The error type a [`serve_one`] handler may fail with.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Serves exactly one NRPE exchange over `stream`: reads a query packet,
/// dispatches the decoded [`Command`] to `handler`, and writes the handler's
/// [`CommandResult`] back as a response packet.
///
/// With `use_tls` the stream is wrapped in an anonymous-DH TLS session for
/// the duration of the call; the handshake runs lazily as part of the first
/// read. A `timeout` bounds each individual I/O operation (`None` means no
/// deadline).
///
/// A handler failure is surfaced as [`Error::Handler`] and no response is
/// written. The stream is borrowed, never closed, and handed back in an
/// unspecified state if the exchange fails partway.
pub fn serve_one<T, F>(
    stream: &mut T,
    handler: F,
    use_tls: bool,
    timeout: Option<Duration>,
) -> Result<(), Error>
where
    T: Transport,
    F: FnOnce(Command) -> Result<CommandResult, HandlerError>,
{
    if use_tls {
        let mut tls = TlsStream::accept(&mut *stream)?;
        serve(&mut tls, handler, timeout)
    } else {
        serve(stream, handler, timeout)
    }
}

fn serve<T, F>(stream: &mut T, handler: F, timeout: Option<Duration>) -> Result<(), Error>
where
    T: Transport + ?Sized,
    F: FnOnce(Command) -> Result<CommandResult, HandlerError>,
{
    let mut query = transport::read_packet(stream, timeout)?;
    query.verify(PacketType::Query)?;

    // A query with no terminator carries no extractable command; the
    // handler is never invoked for it.
    let payload = query.payload().ok_or(Error::InvalidRequest)?;
    let command = Command::split(payload);

    let result = handler(command).map_err(|e| Error::Handler(e.to_string()))?;

    let response = Packet::build(
        PacketType::Response,
        result.status().code(),
        result.status_line().as_bytes(),
    );
    transport::write_packet(stream, &response, timeout)
}
