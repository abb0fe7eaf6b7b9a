//! # lzo-stream
//!
//! Streaming, decompress-only implementation of the
//! [LZO1X compression format](http://www.oberhumer.com/opensource/lzo/).
//!
//! The decoder pulls compressed bytes from any [`std::io::BufRead`] and hands
//! out decompressed bytes on demand, keeping only a 48 KiB history window in
//! memory. One-shot helpers cover the common in-memory cases.
//!
//! ### Features
//!
//! - Pull-based [`decompress::Decoder`] with caller-sized reads
//! - [`std::io::Read`] adapter in [`stream::LzoStream`]
//! - Strict error reporting: truncation, bad back-references and oversized
//!   length escapes are errors, never short output
//!
//! ### Usage
//!
//! See the [`decompress`] and [`stream`] documentation for reference.
//!
//! In `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! lzo-stream = "0.1.0"
//! ```
//!
//! - `decompress`: Enables the decoder (default).
//! - `python`: Builds a Python extension module exposing `decompress`.
//!
//! Compression is not supported; requesting it fails with
//! [`Error::Unsupported`].
//!
//! Diagnostics go through the [`log`] facade: `debug` for stream start and
//! end, `trace` for every decoded instruction.

#[cfg(feature = "decompress")]
pub mod decompress;
#[cfg(feature = "decompress")]
pub mod instruction;
#[cfg(feature = "python")]
mod python;
pub mod source;
#[cfg(feature = "decompress")]
pub mod stream;
#[cfg(test)]
mod test_utils;
pub mod window;

/// Direction requested from a codec constructor.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CompressionMode {
    Compress,
    Decompress,
}

/// Error result codes
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A back-reference points further back than the decoded history.
    /// Likely indicates bad compressed LZO input.
    #[error("lookbehind overrun: distance {distance} with {available} bytes of history")]
    LookbehindOverrun { distance: usize, available: usize },
    /// Output buffer was not large enough to store the decompression result.
    #[error("output overrun")]
    OutputOverrun,
    /// Compressed input is truncated.
    #[error("input overrun")]
    InputOverrun,
    /// Decompression succeeded, but input buffer has remaining data.
    #[error("input not consumed")]
    InputNotConsumed,
    /// The first byte of the stream is a reserved opcode.
    #[error("invalid first opcode {0:#04x}")]
    InvalidFirstOpcode(u8),
    /// A run-length escape grew past the accepted maximum.
    #[error("extended length overflow")]
    LengthOverflow,
    /// The requested operation is not available on a decode-only stream.
    #[error("unsupported: {0}")]
    Unsupported(&'static str),
    /// The underlying source failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<Error> for std::io::Error {
    fn from(error: Error) -> Self {
        use std::io::ErrorKind;

        match error {
            Error::Io(e) => e,
            Error::InputOverrun => std::io::Error::new(ErrorKind::UnexpectedEof, error),
            Error::Unsupported(_) => std::io::Error::new(ErrorKind::Unsupported, error),
            _ => std::io::Error::new(ErrorKind::InvalidData, error),
        }
    }
}
