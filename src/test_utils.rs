//! Greedy LZO1X encoder for building decoder fixtures.
//!
//! Emits primed and table literal runs, M2, M3 and M4 matches with trailing
//! literal counts, and the terminator. Not tuned for ratio or speed.
//!
//! A primed run of one to six bytes starting `[0..=3, 0x00]` would read as
//! the terminator of an empty stream, so such inputs hold back their first
//! match until the run can take a table opcode instead.

use std::collections::HashMap;

use crate::window::WINDOW_SIZE;

const MIN_MATCH: usize = 3;
const M2_MAX_DISTANCE: usize = 2048;
const M3_MAX_DISTANCE: usize = 16384;
const TERMINATOR: [u8; 3] = [0x11, 0x00, 0x00];
/// Shortest literal run a table opcode can carry.
const MIN_TABLE_LITERAL: usize = 4;

/// How the leading literal run is written.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Start {
    /// `17 + n` first byte, as LZO encoders write it.
    Primed,
    /// Literal-run opcode from the regular table.
    Table,
}

/// Compress `input`, which must not be empty.
pub(crate) fn encode(input: &[u8]) -> Vec<u8> {
    encode_with(input, Start::Primed)
}

/// Compress `input`, opening with `start`.
pub(crate) fn encode_with(input: &[u8], start: Start) -> Vec<u8> {
    assert!(!input.is_empty(), "the first opcode cannot encode an empty stream");
    let first_match = if start == Start::Table || primes_as_terminator(input) {
        MIN_TABLE_LITERAL
    } else {
        0
    };
    let mut out = Vec::new();
    let mut last_seen: HashMap<[u8; 3], usize> = HashMap::new();
    let mut pending = None;
    let mut literal_start = 0;
    let mut pos = 0;
    while pos + MIN_MATCH <= input.len() {
        let key = [input[pos], input[pos + 1], input[pos + 2]];
        let candidate = last_seen.insert(key, pos).filter(|_| pos >= first_match);
        if let Some(candidate) = candidate {
            let distance = pos - candidate;
            if distance <= WINDOW_SIZE {
                let len = common_prefix(input, candidate, pos);
                flush(&mut out, start, pending.take(), &input[literal_start..pos]);
                pending = Some((distance, len));
                pos += len;
                literal_start = pos;
                continue;
            }
        }
        pos += 1;
    }
    flush(&mut out, start, pending, &input[literal_start..]);
    out.extend_from_slice(&TERMINATOR);
    out
}

/// Deterministic byte noise for fixtures.
pub(crate) fn pseudo_random(len: usize, seed: u64) -> Vec<u8> {
    let mut state = seed.wrapping_mul(0x9E37_79B9_7F4A_7C15) | 1;
    (0..len)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            (state >> 32) as u8
        })
        .collect()
}

fn common_prefix(input: &[u8], earlier: usize, later: usize) -> usize {
    input[later..].iter().zip(&input[earlier..]).take_while(|(a, b)| a == b).count()
}

/// Write the deferred match (if any) followed by `literals`. The match carries
/// up to three of them in its low bits.
fn flush(out: &mut Vec<u8>, start: Start, pending: Option<(usize, usize)>, literals: &[u8]) {
    match pending {
        None if start == Start::Primed && literals.len() <= 238 && !primes_as_terminator(literals) => {
            out.push(17 + literals.len() as u8);
            out.extend_from_slice(literals);
            return;
        }
        None => {}
        Some((distance, len)) => {
            let trailing = if literals.len() <= 3 { literals.len() } else { 0 };
            emit_match(out, distance, len, trailing);
            if trailing == literals.len() {
                out.extend_from_slice(literals);
                return;
            }
        }
    }
    let len = literals.len();
    assert!(len >= MIN_TABLE_LITERAL, "no opcode encodes a leading run of {literals:02x?}");
    if len <= 18 {
        out.push((len - 3) as u8);
    } else {
        out.push(0);
        emit_extension(out, len - 18);
    }
    out.extend_from_slice(literals);
}

/// Whether priming with `input`'s leading bytes opens like an empty stream.
fn primes_as_terminator(input: &[u8]) -> bool {
    input.len() >= 2 && input[0] <= 0x3 && input[1] == 0x00
}

fn emit_match(out: &mut Vec<u8>, distance: usize, len: usize, trailing: usize) {
    let d = distance - 1;
    if (3..=8).contains(&len) && distance <= M2_MAX_DISTANCE {
        let family = if len <= 4 { 0x40 | ((len - 3) << 5) } else { 0x80 | ((len - 5) << 5) };
        out.push((family | ((d & 0x7) << 2) | trailing) as u8);
        out.push((d >> 3) as u8);
    } else if distance <= M3_MAX_DISTANCE {
        if len - 2 <= 31 {
            out.push(0x20 | (len - 2) as u8);
        } else {
            out.push(0x20);
            emit_extension(out, len - 33);
        }
        out.extend_from_slice(&(((d << 2) | trailing) as u16).to_le_bytes());
    } else {
        let d = distance - 16384;
        let high = ((d >> 14) & 0x1) << 3;
        if len - 2 <= 7 {
            out.push((0x10 | high | (len - 2)) as u8);
        } else {
            out.push((0x10 | high) as u8);
            emit_extension(out, len - 9);
        }
        out.extend_from_slice(&((((d & 0x3FFF) << 2) | trailing) as u16).to_le_bytes());
    }
}

/// `n` must be at least 1.
pub(crate) fn emit_extension(out: &mut Vec<u8>, mut n: usize) {
    while n > 255 {
        out.push(0);
        n -= 255;
    }
    out.push(n as u8);
}
