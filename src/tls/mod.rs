//! The TLS adapter speaking the NRPE anonymous-DH cipher profile.
//!
//! NRPE's encrypted mode is TLS restricted to the `ADH` (Anonymous
//! Diffie-Hellman) suites: key agreement with no certificates and no peer
//! authentication on either side. Current OpenSSL releases ship those suites
//! disabled at the default security level, and TLS 1.3 defines no anonymous
//! suites at all, so the contexts built here lower the security level to 0
//! and cap the protocol at TLS 1.2. SSLv2 and SSLv3 remain disabled.
//!
//! The handshake is deferred: wrapping a stream performs no I/O, and the
//! first read or write drives it. A stream whose handshake failed refuses
//! all further I/O with [`Error::InconsistentState`].

mod fence;

use std::{
    fmt,
    io::{self, Read, Write},
    time::Duration,
};

use once_cell::sync::OnceCell;
use openssl::{
    dh::Dh,
    error::ErrorStack,
    pkey::Params,
    ssl::{
        Ssl, SslContext, SslMethod, SslOptions, SslStream, SslVerifyMode, SslVersion,
    },
};

use crate::{errors::TlsOp, transport::Transport, Error};

use fence::PanicFence;

/// Bit length of the ephemeral DH parameters the server role offers.
///
/// Matches the reference agent. 512-bit DH is far below any modern strength
/// target, which is why the context runs at security level 0.
const DH_PRIME_LEN: u32 = 512;
const DH_GENERATOR: u32 = 2;

/// Handshake progress of a wrapped stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Initial,
    Handshaking,
    Ready,
    Errored,
}

enum Role {
    Client,
    Server,
}

/// A byte stream wrapped in an NRPE-compatible ADH TLS session.
///
/// Construction performs no I/O; the first read or write runs the handshake.
/// Dropping the adapter releases the TLS session and returns the borrow of
/// the underlying stream without closing it (no close_notify is sent, which
/// is what NRPE peers expect).
pub struct TlsStream<S: Transport> {
    inner: SslStream<PanicFence<S>>,
    state: State,
}

impl<S: Transport> TlsStream<S> {
    /// Wraps `stream` as the client end of an ADH TLS session.
    pub fn connect(stream: S) -> Result<Self, Error> {
        Self::new(Role::Client, stream)
    }

    /// Wraps `stream` as the server end of an ADH TLS session.
    ///
    /// The first server constructed in a process generates the shared
    /// ephemeral DH parameters; later ones reuse them.
    pub fn accept(stream: S) -> Result<Self, Error> {
        Self::new(Role::Server, stream)
    }

    fn new(role: Role, stream: S) -> Result<Self, Error> {
        let ctx = build_context(&role).map_err(setup_error)?;

        let mut ssl = Ssl::new(&ctx).map_err(setup_error)?;
        match role {
            Role::Client => ssl.set_connect_state(),
            Role::Server => ssl.set_accept_state(),
        }

        let inner = SslStream::new(ssl, PanicFence::new(stream)).map_err(setup_error)?;

        Ok(Self {
            inner,
            state: State::Initial,
        })
    }

    /// Runs the deferred handshake, at most once per stream.
    fn ensure_handshake(&mut self) -> io::Result<()> {
        match self.state {
            State::Ready => Ok(()),

            // A previous handshake failed (or panicked mid-flight); refuse
            // to touch the underlying stream again.
            State::Errored | State::Handshaking => {
                Err(io::Error::other(Error::InconsistentState))
            }

            State::Initial => {
                self.state = State::Handshaking;
                match self.inner.do_handshake() {
                    Ok(()) => {
                        self.state = State::Ready;
                        Ok(())
                    }
                    Err(e) => {
                        self.state = State::Errored;
                        Err(io::Error::other(Error::Tls {
                            op: TlsOp::Handshake,
                            message: e.to_string(),
                        }))
                    }
                }
            }
        }
    }
}

impl<S: Transport> Read for TlsStream<S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.ensure_handshake()?;
        self.inner.read(buf).map_err(|e| wrap_io(TlsOp::Read, e))
    }
}

impl<S: Transport> Write for TlsStream<S> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.ensure_handshake()?;
        self.inner.write(buf).map_err(|e| wrap_io(TlsOp::Write, e))
    }

    fn flush(&mut self) -> io::Result<()> {
        self.ensure_handshake()?;
        self.inner.flush().map_err(|e| wrap_io(TlsOp::Write, e))
    }
}

impl<S: Transport> Transport for TlsStream<S> {
    fn set_timeout(&mut self, timeout: Option<Duration>) -> io::Result<()> {
        // Deadlines live on the raw stream under the session; the TLS layer
        // inherits them, handshake included.
        self.inner.get_mut().get_mut().set_timeout(timeout)
    }
}

impl<S: Transport> fmt::Debug for TlsStream<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TlsStream")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

/// Tags an I/O failure on the encrypted stream with the adapter operation,
/// preserving the original `ErrorKind` for callers that inspect it.
fn wrap_io(op: TlsOp, e: io::Error) -> io::Error {
    let kind = e.kind();
    io::Error::new(
        kind,
        Error::Tls {
            op,
            message: e.to_string(),
        },
    )
}

fn setup_error(e: ErrorStack) -> Error {
    Error::Tls {
        op: TlsOp::Setup,
        message: e.to_string(),
    }
}

fn build_context(role: &Role) -> Result<SslContext, ErrorStack> {
    let mut builder = SslContext::builder(SslMethod::tls())?;

    // SSLv2/SSLv3 are disabled outright. TLS 1.3 is capped out because it
    // defines no anonymous suites; a 1.3-capable peer would otherwise
    // negotiate a version the ADH cipher list cannot serve.
    builder.set_options(SslOptions::NO_SSLV2 | SslOptions::NO_SSLV3);
    builder.set_max_proto_version(Some(SslVersion::TLS1_2))?;

    // Anonymous suites and 512-bit DH both sit below the default security
    // level of current OpenSSL releases.
    builder.set_security_level(0);
    builder.set_cipher_list("ADH")?;
    builder.set_verify(SslVerifyMode::NONE);

    if let Role::Server = role {
        builder.set_tmp_dh(dh_params()?)?;
    }

    Ok(builder.build())
}

/// The process-wide ephemeral DH parameters, generated on first server use.
fn dh_params() -> Result<&'static Dh<Params>, ErrorStack> {
    static DH_PARAMS: OnceCell<Dh<Params>> = OnceCell::new();

    DH_PARAMS.get_or_try_init(|| Dh::generate_params(DH_PRIME_LEN, DH_GENERATOR))
}
