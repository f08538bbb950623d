//! Byte stream abstraction
//!
//! The decoders only ever need two primitives: fill a buffer of known size,
//! and read up to a delimiter within a byte limit. Anything implementing
//! `BufRead` gets both, so a `BufReader<TcpStream>` and a `Cursor<Vec<u8>>`
//! drive the same code.

use std::io::{self, BufRead, Read};

/// Input the decoders pull bytes from
pub trait ByteStream {
    /// Fill `buf` completely.
    ///
    /// Fails with `UnexpectedEof` if the stream ends first.
    fn read_exact_bytes(&mut self, buf: &mut [u8]) -> io::Result<()>;

    /// Append bytes to `buf` up to and including `delim`, at most `limit` of them.
    ///
    /// Returns the number of bytes appended. The last byte appended is not
    /// `delim` when the stream ended first or `limit` was reached; zero means
    /// the stream was already at its end.
    fn read_until_delim(
        &mut self,
        delim: u8,
        buf: &mut Vec<u8>,
        limit: usize,
    ) -> io::Result<usize>;

    /// Look at the next byte without consuming it
    fn peek_byte(&mut self) -> io::Result<Option<u8>>;
}

impl<R: BufRead + ?Sized> ByteStream for R {
    fn read_exact_bytes(&mut self, buf: &mut [u8]) -> io::Result<()> {
        self.read_exact(buf)
    }

    fn read_until_delim(
        &mut self,
        delim: u8,
        buf: &mut Vec<u8>,
        limit: usize,
    ) -> io::Result<usize> {
        (&mut *self).take(limit as u64).read_until(delim, buf)
    }

    fn peek_byte(&mut self) -> io::Result<Option<u8>> {
        loop {
            match self.fill_buf() {
                Ok(available) => return Ok(available.first().copied()),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }
}

/// Read a big-endian u32 as its own fallible read
pub(crate) fn read_u32<S: ByteStream + ?Sized>(stream: &mut S) -> io::Result<u32> {
    let mut buf = [0u8; 4];
    stream.read_exact_bytes(&mut buf)?;
    Ok(u32::from_be_bytes(buf))
}

/// Read `len` bytes into a fresh buffer
pub(crate) fn read_bytes<S: ByteStream + ?Sized>(stream: &mut S, len: usize) -> io::Result<Vec<u8>> {
    let mut buf = vec![0u8; len];
    if len > 0 {
        stream.read_exact_bytes(&mut buf)?;
    }
    Ok(buf)
}
