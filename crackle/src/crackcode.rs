//! Per-slice crack-code decoding.
//!
//! A slice's boundary contours live on the corner grid, the
//! `(sx + 1) x (sy + 1)` lattice of voxel corners. Each contour forest is
//! stored as a list of starting corners (the boundary origin chain index)
//! followed by a stream of direction codepoints describing depth-first walks
//! from those corners. A walk that retraces the edge it just drew is not a
//! move at all: it either opens a branch (the walk will come back here) or
//! closes one (the walk is done here and teleports back), and the assembler
//! rewrites the retraced symbol accordingly.
//!
//! The walks are replayed onto a per-voxel passability bitmap of four bits:
//!
//! ```text
//! bit 0: crossing to the +x neighbor
//! bit 1: crossing to the -x neighbor
//! bit 2: crossing to the +y neighbor
//! bit 3: crossing to the -y neighbor
//! ```
//!
//! A set bit always means the crossing is permitted. Impermissible streams
//! start from all-passable and clear bits along each contour; permissible
//! streams start from all-blocked and set the few passable crossings.

use alloc::vec::Vec;

use crate::error::{DecodeError, Result};
use crate::log::decode_log;
use crate::reader::{Reader, byte_width};

pub(crate) const UP: u8 = 0b00;
pub(crate) const RIGHT: u8 = 0b01;
pub(crate) const DOWN: u8 = 0b10;
pub(crate) const LEFT: u8 = 0b11;

/// One step of a decoded contour walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Symbol {
    Up,
    Right,
    Down,
    Left,
    /// Remember the current corner; a later [`Symbol::Terminus`] returns here.
    Branch,
    /// Close the innermost open branch.
    Terminus,
}

impl Symbol {
    fn from_direction(code: u8) -> Self {
        match code & 0b11 {
            UP => Self::Up,
            RIGHT => Self::Right,
            DOWN => Self::Down,
            _ => Self::Left,
        }
    }
}

/// A contour walk: the starting corner-grid node and its symbols.
pub(crate) type Chain = (u64, Vec<Symbol>);

/// Split a crack-code block into its origin index and its direction stream.
///
/// A block opens with the u32 byte length of the index.
pub(crate) fn split_block(block: &[u8]) -> Result<(&[u8], &[u8])> {
    let mut reader = Reader::new(block);
    let index_len = reader.read_u32().ok_or(DecodeError::TruncatedCrackBlock)? as usize;
    let index = reader
        .read_bytes(index_len)
        .ok_or(DecodeError::TruncatedCrackBlock)?;
    let stream = reader.tail().ok_or(DecodeError::TruncatedCrackBlock)?;

    Ok((index, stream))
}

/// Read the boundary origin chain index: corner nodes grouped by row,
/// delta-coded along both axes.
pub(crate) fn read_boc_index(index: &[u8], sx: u32, sy: u32) -> Result<Vec<u64>> {
    let wx = byte_width(sx as u64 + 1);
    let wy = byte_width(sy as u64 + 1);
    let sxe = sx as u64 + 1;

    let mut reader = Reader::new(index);
    let num_y = reader
        .read_uint(wy)
        .ok_or(DecodeError::TruncatedCrackBlock)?;

    let mut nodes = Vec::new();
    let mut y = 0_u64;
    for _ in 0..num_y {
        y += reader
            .read_uint(wy)
            .ok_or(DecodeError::TruncatedCrackBlock)?;
        if y > sy as u64 {
            return Err(DecodeError::IndexOutOfRange);
        }

        let num_x = reader
            .read_uint(wx)
            .ok_or(DecodeError::TruncatedCrackBlock)?;
        let mut x = 0_u64;
        for _ in 0..num_x {
            x += reader
                .read_uint(wx)
                .ok_or(DecodeError::TruncatedCrackBlock)?;
            if x > sx as u64 {
                return Err(DecodeError::IndexOutOfRange);
            }
            nodes.push(x + sxe * y);
        }
    }

    Ok(nodes)
}

/// Unpack a 2-bit packed direction stream into absolute directions.
///
/// Stored values are deltas; the absolute direction is the running sum
/// mod 4. Codepoints are packed LSB-first, four to a byte.
pub(crate) fn unpack_codepoints(stream: &[u8]) -> Vec<u8> {
    let mut codepoints = Vec::with_capacity(stream.len() * 4);

    let mut last = 0_u8;
    for byte in stream {
        for shift in [0_u8, 2, 4, 6] {
            let mut codepoint = (byte >> shift) & 0b11;
            codepoint = (codepoint + last) & 0b11;
            last = codepoint;
            codepoints.push(codepoint);
        }
    }

    codepoints
}

/// Assemble per-origin symbol chains from an absolute direction stream.
///
/// A move that exactly reverses the previous one rewrites it instead of
/// walking back: reversing a down/right move closes a branch, reversing an
/// up/left move opens one. A chain completes when its branch count returns
/// to zero; the next codepoint then starts a chain at the next origin.
pub(crate) fn codepoints_to_symbols(nodes: &[u64], codepoints: &[u8]) -> Vec<Chain> {
    let mut chains = Vec::with_capacity(nodes.len());
    let mut symbols: Vec<Symbol> = Vec::new();

    let mut branches_taken = 0_u64;
    let mut node = 0_u64;
    let mut node_i = 0_usize;
    let mut last_move: Option<u8> = None;

    let mut i = 0_usize;
    while i < codepoints.len() {
        if branches_taken == 0 {
            if node_i >= nodes.len() {
                break;
            }
            node = nodes[node_i];
            node_i += 1;
            branches_taken = 1;
            continue;
        }

        let mv = codepoints[i];
        i += 1;

        let reversal = last_move.is_some_and(|last| mv ^ last == 0b10);
        match symbols.last_mut() {
            Some(tail) if reversal => {
                if mv == UP || mv == LEFT {
                    *tail = Symbol::Terminus;
                    branches_taken -= 1;
                } else {
                    *tail = Symbol::Branch;
                    branches_taken += 1;
                }
                last_move = None;

                if branches_taken == 0 {
                    chains.push((node, core::mem::take(&mut symbols)));
                }
            }
            _ => {
                symbols.push(Symbol::from_direction(mv));
                last_move = Some(mv);
            }
        }
    }

    if branches_taken > 0 {
        decode_log!(
            warn,
            "dropping unterminated contour chain of {} symbols",
            symbols.len(),
        );
    }

    chains
}

/// Replay contour chains onto a slice's passability bitmap.
///
/// `edges` must hold `sx * sy` entries. Every walked crack segment clears
/// (impermissible) or sets (permissible) the facing bit of the voxel on each
/// side of it, where such a voxel exists.
pub(crate) fn decode_crack_code(
    chains: &[Chain],
    sx: u32,
    sy: u32,
    permissible: bool,
    edges: &mut [u8],
) -> Result<()> {
    let base = if permissible { 0b0000 } else { 0b1111 };
    edges.fill(base);

    let sx = sx as i64;
    let sy = sy as i64;
    let sxe = sx + 1;

    let mark = |edges: &mut [u8], x: i64, y: i64, mask: u8| {
        let loc = (x + sx * y) as usize;
        if permissible {
            edges[loc] |= mask;
        } else {
            edges[loc] &= !mask;
        }
    };

    for (node, symbols) in chains {
        let mut y = (*node as i64) / sxe;
        let mut x = (*node as i64) - sxe * y;

        let mut revisit: Vec<(i64, i64)> = Vec::new();
        for symbol in symbols {
            if x < 0 || y < 0 || x > sx || y > sy {
                return Err(DecodeError::CrackOutOfRange { permissible });
            }

            match symbol {
                Symbol::Up => {
                    if x > 0 && y > 0 {
                        mark(edges, x - 1, y - 1, 0b0001);
                    }
                    if x < sx && y > 0 {
                        mark(edges, x, y - 1, 0b0010);
                    }
                    y -= 1;
                }
                Symbol::Down => {
                    if x > 0 && y < sy {
                        mark(edges, x - 1, y, 0b0001);
                    }
                    if x < sx && y < sy {
                        mark(edges, x, y, 0b0010);
                    }
                    y += 1;
                }
                Symbol::Left => {
                    if x > 0 && y > 0 {
                        mark(edges, x - 1, y - 1, 0b0100);
                    }
                    if x > 0 && y < sy {
                        mark(edges, x - 1, y, 0b1000);
                    }
                    x -= 1;
                }
                Symbol::Right => {
                    if x < sx && y > 0 {
                        mark(edges, x, y - 1, 0b0100);
                    }
                    if x < sx && y < sy {
                        mark(edges, x, y, 0b1000);
                    }
                    x += 1;
                }
                Symbol::Branch => revisit.push((x, y)),
                Symbol::Terminus => {
                    if let Some((bx, by)) = revisit.pop() {
                        x = bx;
                        y = by;
                    }
                }
            }
        }
    }

    Ok(())
}
