//! # Compressed byte source
//!
//! The decoder pulls from any [`BufRead`]: in-memory slices, `BufReader`s over
//! files or sockets, `Cursor`s. [`ByteSource`] adds the handful of reads the
//! opcode decoder needs on top of it, with end of input reported as
//! [`Error::InputOverrun`]. [`Rewind`] lets the decoder put back the bytes it
//! inspects to classify the first opcode.

use std::io::{self, BufRead, ErrorKind, Read};

use crate::Error;

/// Byte-level reads over a sequential, forward-only source.
pub trait ByteSource {
    /// Read one byte, or `None` at end of input.
    fn next_byte(&mut self) -> Result<Option<u8>, Error>;

    /// Read one byte that the format requires to be present.
    fn require_byte(&mut self) -> Result<u8, Error> {
        self.next_byte()?.ok_or(Error::InputOverrun)
    }

    /// Fill `buf` completely.
    fn read_exact_bytes(&mut self, buf: &mut [u8]) -> Result<(), Error>;

    /// Pass exactly `len` bytes to `f`, in as many runs as the source hands out.
    fn take_chunks<F>(&mut self, len: usize, f: F) -> Result<(), Error>
    where
        F: FnMut(&[u8]);
}

/// Returns the next buffered run, retrying interrupted reads.
fn fill<R: BufRead + ?Sized>(reader: &mut R) -> Result<&[u8], Error> {
    // The slice is fetched again after the loop; returning it from inside the
    // loop keeps `reader` borrowed across iterations.
    loop {
        match reader.fill_buf() {
            Ok(_) => break,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(reader.fill_buf()?)
}

impl<R: BufRead + ?Sized> ByteSource for R {
    #[inline]
    fn next_byte(&mut self) -> Result<Option<u8>, Error> {
        let byte = match fill(self)?.first() {
            Some(&b) => b,
            None => return Ok(None),
        };
        self.consume(1);
        Ok(Some(byte))
    }

    fn read_exact_bytes(&mut self, buf: &mut [u8]) -> Result<(), Error> {
        let mut filled = 0;
        self.take_chunks(buf.len(), |run| {
            buf[filled..filled + run.len()].copy_from_slice(run);
            filled += run.len();
        })
    }

    fn take_chunks<F>(&mut self, len: usize, mut f: F) -> Result<(), Error>
    where
        F: FnMut(&[u8]),
    {
        let mut remaining = len;
        while remaining > 0 {
            let available = fill(self)?;
            if available.is_empty() {
                return Err(Error::InputOverrun);
            }
            let n = available.len().min(remaining);
            f(&available[..n]);
            self.consume(n);
            remaining -= n;
        }
        Ok(())
    }
}

/// A [`BufRead`] with room to push back two bytes in front of the source.
#[derive(Debug)]
pub struct Rewind<S> {
    held: [u8; 2],
    start: usize,
    end: usize,
    inner: S,
}

impl<S> Rewind<S> {
    pub fn new(inner: S) -> Self {
        Self { held: [0; 2], start: 0, end: 0, inner }
    }

    /// Put `bytes` back so the next reads return them first.
    ///
    /// # Panics
    ///
    /// Panics if earlier pushed-back bytes are still unread, or if `bytes` is
    /// longer than two.
    pub fn unread(&mut self, bytes: &[u8]) {
        assert!(self.start == self.end, "pushed-back bytes still unread");
        assert!(bytes.len() <= self.held.len(), "at most two bytes can be pushed back");
        self.held[..bytes.len()].copy_from_slice(bytes);
        self.start = 0;
        self.end = bytes.len();
    }

    /// Returns a reference to the wrapped source.
    pub fn get_ref(&self) -> &S {
        &self.inner
    }

    /// Returns the wrapped source. Bytes still pushed back are dropped.
    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: Read> Read for Rewind<S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.start == self.end {
            return self.inner.read(buf);
        }
        let n = buf.len().min(self.end - self.start);
        buf[..n].copy_from_slice(&self.held[self.start..self.start + n]);
        self.start += n;
        Ok(n)
    }
}

impl<S: BufRead> BufRead for Rewind<S> {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        if self.start == self.end {
            return self.inner.fill_buf();
        }
        Ok(&self.held[self.start..self.end])
    }

    fn consume(&mut self, amt: usize) {
        if self.start == self.end {
            self.inner.consume(amt);
        } else {
            self.start = (self.start + amt).min(self.end);
        }
    }
}
