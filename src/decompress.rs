//! # Decompression routines
//!
//! Available with feature `decompress`.
//!
//! # Examples
//!
//! Decompressing a buffer with known output size:
//! ```
//! use lzo_stream::decompress::decompress;
//! # #[allow(non_upper_case_globals)] const input: [u8; 10] = [0x12, 0, 0x20, 0, 0xdf, 0, 0, 0x11, 0, 0];
//! # #[allow(non_upper_case_globals)] const decompressed_size: usize = 512;
//!
//! let mut dst = vec![0u8; decompressed_size];
//! let size = decompress(&input, &mut dst)?;
//! # assert_eq!(size, decompressed_size);
//! # Ok::<(), lzo_stream::Error>(())
//! ```
//!
//! Pulling output in pieces from any [`BufRead`]:
//! ```
//! use lzo_stream::decompress::Decoder;
//! # #[allow(non_upper_case_globals)] const input: [u8; 10] = [0x12, 0, 0x20, 0, 0xdf, 0, 0, 0x11, 0, 0];
//!
//! let mut decoder = Decoder::new(&input[..])?;
//! let mut chunk = [0u8; 100];
//! let mut total = 0;
//! loop {
//!     let n = decoder.read(&mut chunk)?;
//!     if n == 0 {
//!         break;
//!     }
//!     total += n;
//! }
//! assert_eq!(total, 512);
//! assert_eq!(decoder.stream_len(), Some(512));
//! # Ok::<(), lzo_stream::Error>(())
//! ```

use std::{
    collections::VecDeque,
    io::{BufRead, BufReader, Read, Write},
};

use crate::{
    instruction::{check_first_opcode, decode_first, decode_step, Instruction, Mode},
    source::{ByteSource, Rewind},
    window::HistoryWindow,
    CompressionMode, Error,
};

/// Caller buffer plus overflow queue for one [`Decoder::read`] call.
struct Output<'a> {
    buf: &'a mut [u8],
    filled: usize,
    overflow: &'a mut VecDeque<u8>,
}

impl Output<'_> {
    fn emit(&mut self, bytes: &[u8]) {
        let n = bytes.len().min(self.buf.len() - self.filled);
        self.buf[self.filled..self.filled + n].copy_from_slice(&bytes[..n]);
        self.filled += n;
        self.overflow.extend(&bytes[n..]);
    }
}

/// Pull-based LZO1X decoder over any [`BufRead`].
///
/// Holds the history window, the current [`Mode`], the opcode read ahead at
/// the end of the previous step, and decoded bytes that did not fit the last
/// caller buffer. After any error the decoder must be discarded.
#[derive(Debug)]
pub struct Decoder<S> {
    source: Rewind<S>,
    window: HistoryWindow,
    mode: Mode,
    /// Next opcode to execute; `None` once the terminator has been decoded.
    opcode: Option<u8>,
    first: bool,
    pending: VecDeque<u8>,
    position: u64,
    len: Option<u64>,
}

impl<S: BufRead> Decoder<S> {
    /// Create a decoder, reading and validating the first opcode.
    ///
    /// Fails with [`Error::InputOverrun`] on an empty source and with
    /// [`Error::InvalidFirstOpcode`] when the first byte is reserved.
    pub fn new(source: S) -> Result<Self, Error> {
        let mut source = Rewind::new(source);
        let op = check_first_opcode(source.require_byte()?)?;
        log::debug!("lzo decoder started, first opcode {op:#04x}");
        Ok(Self {
            source,
            window: HistoryWindow::new(),
            mode: Mode::default(),
            opcode: Some(op),
            first: true,
            pending: VecDeque::new(),
            position: 0,
            len: None,
        })
    }

    /// Create a decoder for `mode`. Only [`CompressionMode::Decompress`] is
    /// supported.
    pub fn with_mode(source: S, mode: CompressionMode) -> Result<Self, Error> {
        match mode {
            CompressionMode::Decompress => Self::new(source),
            CompressionMode::Compress => Err(Error::Unsupported("compression is not supported")),
        }
    }

    /// Bytes delivered to the caller so far.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Total decompressed length, once the terminator has been decoded or a
    /// length has been declared with [`Decoder::set_len`].
    pub fn stream_len(&self) -> Option<u64> {
        self.len
    }

    /// Declare the decompressed length. Reads stop after `len` bytes even if
    /// the stream carries more.
    pub fn set_len(&mut self, len: u64) {
        self.len = Some(len);
    }

    /// Whether the terminator has been decoded.
    pub fn is_finished(&self) -> bool {
        self.opcode.is_none()
    }

    /// Current decode mode.
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Returns a reference to the underlying source.
    pub fn get_ref(&self) -> &S {
        self.source.get_ref()
    }

    /// Returns the underlying source, positioned after the last consumed byte.
    pub fn into_inner(self) -> S {
        self.source.into_inner()
    }

    /// Fill `buf` with decoded bytes, returning how many were written.
    ///
    /// Returns 0 only at the end of the stream (or for an empty `buf`).
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize, Error> {
        let limit = match self.len {
            Some(len) => {
                let remaining = len.saturating_sub(self.position);
                buf.len().min(usize::try_from(remaining).unwrap_or(usize::MAX))
            }
            None => buf.len(),
        };
        let buf = &mut buf[..limit];

        let mut filled = self.pending.len().min(buf.len());
        for (dst, src) in buf.iter_mut().zip(self.pending.drain(..filled)) {
            *dst = src;
        }

        while filled < buf.len() {
            let Some(op) = self.opcode else { break };
            let (instruction, mode) = if self.first {
                decode_first(op, &mut self.source)?
            } else {
                decode_step(self.mode, op, &mut self.source)?
            };
            self.first = false;
            log::trace!("opcode {op:#04x} in {:?}: {instruction:?}", self.mode);

            let mut out = Output { buf: &mut buf[filled..], filled: 0, overflow: &mut self.pending };
            match instruction {
                Instruction::Literal { len } => {
                    copy_literals(&mut self.source, &mut self.window, &mut out, len)?;
                }
                Instruction::Copy { distance, len, trailing } => {
                    self.window.copy_back(distance, len, |run| out.emit(run))?;
                    copy_literals(&mut self.source, &mut self.window, &mut out, trailing)?;
                }
                Instruction::End => {
                    let total = self.position + filled as u64;
                    log::debug!("lzo end of stream after {total} bytes");
                    self.opcode = None;
                    self.len.get_or_insert(total);
                    break;
                }
            }
            filled += out.filled;
            self.mode = mode;
            // Only the terminator may end the stream.
            self.opcode = Some(self.source.require_byte()?);
        }

        self.position += filled as u64;
        Ok(filled)
    }
}

/// Move `len` raw bytes from the source into the window and the output.
fn copy_literals<S: ByteSource + ?Sized>(
    source: &mut S,
    window: &mut HistoryWindow,
    out: &mut Output,
    len: usize,
) -> Result<(), Error> {
    source.take_chunks(len, |run| {
        window.append(run);
        out.emit(run);
    })
}

/// Decompress `src` into `dst`.
///
/// `dst` must be large enough to hold the entire decompressed output, and
/// `src` must end with the terminator instruction.
pub fn decompress(src: &[u8], dst: &mut [u8]) -> Result<usize, Error> {
    let mut decoder = Decoder::new(src)?;
    let size = decoder.read(dst)?;
    if !decoder.is_finished() {
        // `dst` is full; the stream may still end exactly here.
        let mut spare = [0u8; 1];
        if !decoder.pending.is_empty() || decoder.read(&mut spare)? != 0 {
            return Err(Error::OutputOverrun);
        }
    }
    if decoder.into_inner().is_empty() {
        Ok(size)
    } else {
        Err(Error::InputNotConsumed)
    }
}

/// Decompress `src` into a new vector.
pub fn decompress_to_vec(src: &[u8]) -> Result<Vec<u8>, Error> {
    let mut decoder = Decoder::new(src)?;
    let mut dst = Vec::new();
    let mut chunk = [0u8; 8192];
    loop {
        match decoder.read(&mut chunk)? {
            0 => return Ok(dst),
            n => dst.extend_from_slice(&chunk[..n]),
        }
    }
}

/// Decompress everything `input` yields into `output`, returning the number of
/// bytes written.
pub fn decompress_stream<R: Read, W: Write>(input: R, mut output: W) -> Result<u64, Error> {
    let mut decoder = Decoder::new(BufReader::new(input))?;
    let mut chunk = [0u8; 8192];
    loop {
        match decoder.read(&mut chunk)? {
            0 => break,
            n => output.write_all(&chunk[..n])?,
        }
    }
    output.flush()?;
    Ok(decoder.position())
}

impl<S: BufRead> Read for Decoder<S> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        Decoder::read(self, buf).map_err(Into::into)
    }
}
