use std::{
    io::{self, Read, Write},
    panic::{catch_unwind, AssertUnwindSafe},
};

/// A panic firewall around the wrapped stream's callbacks.
///
/// OpenSSL drives reads and writes of the underlying stream from inside its
/// BIO, across an FFI boundary an unwind must never cross. A panic in the
/// stream is caught here and reported as a failed I/O call, which the TLS
/// layer then surfaces as an ordinary handshake/read/write error.
#[derive(Debug)]
pub(crate) struct PanicFence<S> {
    inner: S,
}

impl<S> PanicFence<S> {
    pub(crate) fn new(inner: S) -> Self {
        Self { inner }
    }

    pub(crate) fn get_mut(&mut self) -> &mut S {
        &mut self.inner
    }
}

impl<S: Read> Read for PanicFence<S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        catch_unwind(AssertUnwindSafe(|| self.inner.read(buf)))
            .unwrap_or_else(|_| Err(io::Error::other("stream panicked during read")))
    }
}

impl<S: Write> Write for PanicFence<S> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        catch_unwind(AssertUnwindSafe(|| self.inner.write(buf)))
            .unwrap_or_else(|_| Err(io::Error::other("stream panicked during write")))
    }

    fn flush(&mut self) -> io::Result<()> {
        catch_unwind(AssertUnwindSafe(|| self.inner.flush()))
            .unwrap_or_else(|_| Err(io::Error::other("stream panicked during flush")))
    }
}
