//! # Opcode decoding
//!
//! Turns one opcode (plus its operand bytes) into an [`Instruction`] and the
//! [`Mode`] that governs the next opcode. Nothing here touches the history
//! window or the caller's output; [`crate::decompress::Decoder`] executes the
//! result.

use std::io::BufRead;

use zerocopy::{
    byteorder::little_endian::U16, FromBytes, FromZeros, Immutable, IntoBytes, KnownLayout, Unaligned,
};

use crate::{
    source::{ByteSource, Rewind},
    Error,
};

/// Bound on the zero-run accumulator of an extended length. Longer runs are
/// rejected as corrupt rather than allowed to drive huge copies.
pub const MAX_EXTENDED_LENGTH: usize = i32::MAX as usize - 1000;
/// Opcode marker for mid-range matches ("M3" in the LZO reference).
const M3_MARKER: u8 = 0x20;
/// Opcode marker for far matches ("M4") and the terminator instruction.
const M4_MARKER: u8 = 0x10;
/// Distance encoded by the terminator instruction.
const END_DISTANCE: usize = 16384;
/// Distance bias of a long M1 match.
const M1_LONG_BIAS: usize = 2049;

/// Interpretation of an opcode in `0x00..=0x0F`, set by whatever preceded it.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Mode {
    /// Start of stream, or a match without trailing literals: a long literal run.
    #[default]
    InitialLiteral,
    /// A match followed by one literal: a 2-byte copy within 1 KiB.
    ShortCopy1,
    /// A match followed by two literals.
    ShortCopy2,
    /// A match followed by three literals.
    ShortCopy3,
    /// A literal run of four or more bytes: a 3-byte copy 2..3 KiB back.
    LongCopy,
}

impl Mode {
    /// Mode following a match that carried `trailing` (0..=3) literals.
    pub fn after_trailing(trailing: usize) -> Mode {
        match trailing {
            0 => Mode::InitialLiteral,
            1 => Mode::ShortCopy1,
            2 => Mode::ShortCopy2,
            _ => Mode::ShortCopy3,
        }
    }
}

/// One decoded opcode.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Instruction {
    /// Copy `len` raw bytes from the source.
    Literal { len: usize },
    /// Copy `len` bytes from `distance` back, then `trailing` raw bytes.
    Copy { distance: usize, len: usize, trailing: usize },
    /// End-of-stream marker.
    End,
}

/// Little-endian operand following M3 and M4 opcodes: 14 distance bits over
/// a 2-bit trailing literal count.
#[derive(FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C)]
struct DistanceOperand {
    raw: U16,
}

impl DistanceOperand {
    fn read<S: ByteSource + ?Sized>(src: &mut S) -> Result<Self, Error> {
        let mut operand = Self::new_zeroed();
        src.read_exact_bytes(operand.as_mut_bytes())?;
        Ok(operand)
    }

    #[inline]
    fn distance(&self) -> usize {
        usize::from(self.raw.get()) >> 2
    }

    #[inline]
    fn trailing(&self) -> usize {
        usize::from(self.raw.get()) & 0x3
    }
}

/// Reject first bytes in the reserved `16..=17` range.
pub fn check_first_opcode(op: u8) -> Result<u8, Error> {
    match op {
        16 | 17 => Err(Error::InvalidFirstOpcode(op)),
        _ => Ok(op),
    }
}

/// Decode the first opcode of a stream.
///
/// Encoders prime the stream with `17 + n` for a leading literal run of
/// `n <= 238` bytes; anything below 16 is an ordinary opcode. `18..=23` also
/// reads as a far match, and followed by an operand of distance 16384 it is
/// the terminator of an empty stream. That reading wins; otherwise the two
/// operand bytes are pushed back to be read as the start of the literal run.
pub fn decode_first<S: BufRead>(op: u8, src: &mut Rewind<S>) -> Result<(Instruction, Mode), Error> {
    match check_first_opcode(op)? {
        18..=23 => {
            let operand = DistanceOperand::read(src)?;
            if operand.distance() == 0 {
                return Ok((Instruction::End, Mode::InitialLiteral));
            }
            src.unread(operand.as_bytes());
            Ok(primed_literal(op))
        }
        24.. => Ok(primed_literal(op)),
        _ => decode_step(Mode::InitialLiteral, op, src),
    }
}

fn primed_literal(op: u8) -> (Instruction, Mode) {
    let len = usize::from(op - 17);
    let mode = if len > 3 { Mode::LongCopy } else { Mode::after_trailing(len) };
    (Instruction::Literal { len }, mode)
}

/// Decode `op` under `mode`, reading its operand bytes from `src`.
///
/// Returns the instruction and the mode for the following opcode.
pub fn decode_step<S: ByteSource + ?Sized>(
    mode: Mode,
    op: u8,
    src: &mut S,
) -> Result<(Instruction, Mode), Error> {
    let inst = usize::from(op);
    let (distance, len, trailing) = if inst & 0xC0 != 0 {
        // [M2]
        // 1 L L D D D S S  (128..255)
        //   length = 5 + L
        // 0 1 L D D D S S  (64..127)
        //   length = 3 + L
        // Followed by one byte: distance = (next << 3) + D + 1, S trailing literals.
        let next = usize::from(src.require_byte()?);
        let len = if inst & 0x80 != 0 { 5 + ((inst >> 5) & 0x3) } else { 3 + ((inst >> 5) & 0x1) };
        ((next << 3) + ((inst >> 2) & 0x7) + 1, len, inst & 0x3)
    } else if op & M3_MARKER != 0 {
        // [M3]
        // 0 0 1 L L L L L  (32..63)
        //   length = 2 + (L ?: 31 + extended length)
        // Followed by LE16: distance = (value >> 2) + 1, value & 3 trailing literals.
        let mut len = (inst & 0x1F) + 2;
        if len == 2 {
            len += 31 + extended_length(src)?;
        }
        let operand = DistanceOperand::read(src)?;
        (operand.distance() + 1, len, operand.trailing())
    } else if op & M4_MARKER != 0 {
        // [M4]
        // 0 0 0 1 H L L L  (16..31)
        //   length = 2 + (L ?: 7 + extended length)
        // Followed by LE16: distance = 16384 + (H << 14) + (value >> 2).
        //   A distance of exactly 16384 terminates the stream.
        let mut len = (inst & 0x7) + 2;
        if len == 2 {
            len += 7 + extended_length(src)?;
        }
        let operand = DistanceOperand::read(src)?;
        let distance = (END_DISTANCE + ((inst & 0x8) << 11)) | operand.distance();
        if distance == END_DISTANCE {
            return Ok((Instruction::End, mode));
        }
        (distance, len, operand.trailing())
    } else {
        match mode {
            Mode::InitialLiteral => {
                // [Literal]
                // 0 0 0 0 L L L L  (0..15)
                //   length = 3 + (L ?: 15 + extended length)
                let len = if inst != 0 { 3 + inst } else { 3 + 15 + extended_length(src)? };
                return Ok((Instruction::Literal { len }, Mode::LongCopy));
            }
            Mode::ShortCopy1 | Mode::ShortCopy2 | Mode::ShortCopy3 => {
                // [M1, short]
                // 0 0 0 0 D D S S  (0..15)
                //   Copy 2 bytes within 1 KiB: distance = (next << 2) + D + 1.
                let next = usize::from(src.require_byte()?);
                ((next << 2) + ((inst & 0xC) >> 2) + 1, 2, inst & 0x3)
            }
            Mode::LongCopy => {
                // [M1, long]
                // 0 0 0 0 D D S S  (0..15)
                //   Copy 3 bytes from 2..3 KiB: distance = (next << 2) + D + 2049.
                let next = usize::from(src.require_byte()?);
                ((next << 2) + ((inst & 0xC) >> 2) + M1_LONG_BIAS, 3, inst & 0x3)
            }
        }
    };
    Ok((Instruction::Copy { distance, len, trailing }, Mode::after_trailing(trailing)))
}

/// Decode a run-length extension: each zero byte adds 255, the first non-zero
/// byte adds itself and ends the run.
pub fn extended_length<S: ByteSource + ?Sized>(src: &mut S) -> Result<usize, Error> {
    let mut length = 0usize;
    loop {
        match src.require_byte()? {
            0 => {
                if length >= MAX_EXTENDED_LENGTH {
                    return Err(Error::LengthOverflow);
                }
                length += 255;
            }
            b => return Ok(length + usize::from(b)),
        }
    }
}
