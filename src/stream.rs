//! # Stream adapter
//!
//! [`LzoStream`] wraps any [`Read`] as a decode-only [`Read`], buffering the
//! compressed side. Writing and seeking are rejected.
//!
//! # Examples
//!
//! ```
//! use std::io::Read;
//!
//! use lzo_stream::{stream::LzoStream, CompressionMode};
//! # #[allow(non_upper_case_globals)] const input: [u8; 10] = [0x12, 0, 0x20, 0, 0xdf, 0, 0, 0x11, 0, 0];
//!
//! let mut stream = LzoStream::new(&input[..], CompressionMode::Decompress)?;
//! let mut out = Vec::new();
//! stream.read_to_end(&mut out)?;
//! assert_eq!(out.len(), 512);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::io::{self, BufReader, Read, Seek, SeekFrom, Write};

use crate::{decompress::Decoder, CompressionMode, Error};

/// Decode-only stream over a compressed [`Read`].
#[derive(Debug)]
pub struct LzoStream<R> {
    decoder: Decoder<BufReader<R>>,
}

impl<R: Read> LzoStream<R> {
    /// Wrap `inner`. Reads the first opcode immediately, so an empty or
    /// invalid source fails here.
    pub fn new(inner: R, mode: CompressionMode) -> Result<Self, Error> {
        Ok(Self { decoder: Decoder::with_mode(BufReader::new(inner), mode)? })
    }

    /// Bytes read out of the stream so far.
    pub fn position(&self) -> u64 {
        self.decoder.position()
    }

    /// Decompressed length, once known.
    pub fn stream_len(&self) -> Option<u64> {
        self.decoder.stream_len()
    }

    /// Declare the decompressed length; reads end after `len` bytes.
    pub fn set_len(&mut self, len: u64) {
        self.decoder.set_len(len);
    }

    /// Returns a reference to the wrapped reader.
    pub fn get_ref(&self) -> &R {
        self.decoder.get_ref().get_ref()
    }

    /// Returns the wrapped reader. Compressed bytes already buffered are lost.
    pub fn into_inner(self) -> R {
        self.decoder.into_inner().into_inner()
    }
}

impl<R: Read> Read for LzoStream<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Ok(self.decoder.read(buf)?)
    }
}

impl<R> Write for LzoStream<R> {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(Error::Unsupported("cannot write to a decompression stream").into())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<R: Read> Seek for LzoStream<R> {
    /// Only seeks that land on the current position succeed.
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let current = self.position();
        match pos {
            SeekFrom::Current(0) => Ok(current),
            SeekFrom::Start(target) if target == current => Ok(current),
            _ => Err(Error::Unsupported("cannot seek in a decompression stream").into()),
        }
    }
}
