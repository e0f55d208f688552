/*!
A memory-safe, pure-Rust decoder for Crackle-compressed segmentation volumes.

Crackle is a lossless compression format for dense 3D integer label volumes
of the kind produced by instance-segmentation pipelines, where long runs of
identical labels dominate. Per Z-slice, the format stores the boundaries
between labels as crack codes (depth-first walks over the corner grid),
optionally entropy-coded under an order-k Markov model; the remaining label
information is stored per connected component as a flat table or as pins.

Decoding replays those stages: crack codes are painted into per-voxel
passability bitmaps, the bitmaps are colored into connected components, and
the label payload maps every component id to its final label.

# Example
```rust,no_run
let data = std::fs::read("volume.ckl").unwrap();
let volume = crackle::decode(&data).unwrap();

println!(
    "{}x{}x{} voxels at {} bytes per label",
    volume.sx, volume.sy, volume.sz, volume.data_width,
);
```

# Safety
This crate forbids unsafe code via a crate-level attribute.
*/

#![no_std]
#![forbid(unsafe_code)]

extern crate alloc;

use alloc::vec;
use alloc::vec::Vec;

mod bits;
mod components;
mod crackcode;
mod error;
mod header;
mod labels;
mod log;
mod markov;
mod pins;
mod reader;

pub use error::{DecodeError, Result};
pub use header::{CrackFormat, Header, LabelFormat};

use components::color_connectivity_graph;
use crackcode::{
    codepoints_to_symbols, decode_crack_code, read_boc_index, split_block, unpack_codepoints,
};
use crate::log::decode_log;
use markov::Model;
use reader::Reader;

/// A decoded label volume.
///
/// Labels are little-endian integers of `data_width` bytes, laid out in
/// column-major order: x fastest, then y, then z.
#[derive(Debug, Clone)]
pub struct Volume {
    /// The width of the volume in voxels.
    pub sx: u32,
    /// The depth of the volume in voxels.
    pub sy: u32,
    /// The number of decoded Z-slices.
    pub sz: u32,
    /// Bytes per emitted label.
    pub data_width: u8,
    /// The raw label data, `sx * sy * sz * data_width` bytes.
    pub data: Vec<u8>,
}

/// Parse and validate the header of a compressed volume.
///
/// Useful for sizing an output buffer before calling [`decode_into`].
pub fn read_header(data: &[u8]) -> Result<Header> {
    Header::parse(data)
}

/// Decode a full volume.
pub fn decode(data: &[u8]) -> Result<Volume> {
    decode_range(data, -1, -1)
}

/// Decode a contiguous range of Z-slices.
///
/// A negative `z_end` means the end of the volume; both bounds are clamped
/// to it. An empty range after clamping fails with
/// [`DecodeError::EmptyZRange`].
pub fn decode_range(data: &[u8], z_start: i64, z_end: i64) -> Result<Volume> {
    let header = Header::parse(data)?;
    let (z_start, z_end) = clamp_z_range(&header, z_start, z_end)?;

    let voxels = range_voxels(&header, z_start, z_end)?;
    let bytes = usize::try_from(voxels * header.data_width as u64)
        .map_err(|_| DecodeError::UnsupportedFormat)?;

    let mut output = vec![0_u8; bytes];
    decode_clamped(&header, data, &mut output, z_start, z_end)?;

    Ok(Volume {
        sx: header.sx,
        sy: header.sy,
        sz: (z_end - z_start) as u32,
        data_width: header.data_width,
        data: output,
    })
}

/// Decode a full volume into a caller-provided buffer.
///
/// The buffer must hold at least [`Header::output_bytes`] bytes; only that
/// prefix is written. On error the buffer contents are unspecified.
pub fn decode_into(data: &[u8], output: &mut [u8]) -> Result<()> {
    decode_range_into(data, output, -1, -1)
}

/// Decode a contiguous range of Z-slices into a caller-provided buffer.
pub fn decode_range_into(data: &[u8], output: &mut [u8], z_start: i64, z_end: i64) -> Result<()> {
    let header = Header::parse(data)?;
    let (z_start, z_end) = clamp_z_range(&header, z_start, z_end)?;

    let bytes = range_voxels(&header, z_start, z_end)? * header.data_width as u64;
    if bytes > 0 && output.is_empty() {
        return Err(DecodeError::NullOutput);
    }
    if (output.len() as u64) < bytes {
        return Err(DecodeError::OutputTooSmall);
    }

    decode_clamped(&header, data, output, z_start, z_end)
}

/// Clamp a requested Z-range to the volume, preserving the convention that
/// negative bounds mean "the whole volume".
fn clamp_z_range(header: &Header, z_start: i64, z_end: i64) -> Result<(i64, i64)> {
    let sz = header.sz as i64;

    let z_start = z_start.min(sz - 1).max(0);
    let z_end = if z_end < 0 { sz } else { z_end };
    let z_end = z_end.min(sz).max(0);

    if z_start >= z_end {
        return Err(DecodeError::EmptyZRange);
    }

    Ok((z_start, z_end))
}

/// The voxel count of a clamped Z-range.
///
/// Component ids are 32-bit, so a range of more than `u32::MAX` voxels is
/// not decodable.
fn range_voxels(header: &Header, z_start: i64, z_end: i64) -> Result<u64> {
    let voxels = (header.sx as u64)
        .checked_mul(header.sy as u64)
        .and_then(|v| v.checked_mul((z_end - z_start) as u64))
        .ok_or(DecodeError::UnsupportedFormat)?;

    if voxels > u32::MAX as u64 {
        return Err(DecodeError::UnsupportedFormat);
    }

    Ok(voxels)
}

/// Run the decode pipeline for an already clamped, non-empty Z-range.
fn decode_clamped(
    header: &Header,
    data: &[u8],
    output: &mut [u8],
    z_start: i64,
    z_end: i64,
) -> Result<()> {
    let sx = header.sx as u64;
    let sy = header.sy as u64;
    let sxy = sx * sy;
    let slices = (z_end - z_start) as u64;
    let voxels = range_voxels(header, z_start, z_end)?;

    if voxels == 0 {
        return Ok(());
    }

    decode_log!(
        debug,
        "decoding {}x{}x{} voxels, z {}..{}, {:?}/{:?}, markov order {}",
        header.sx,
        header.sy,
        header.sz,
        z_start,
        z_end,
        header.crack_format,
        header.label_format,
        header.markov_model_order,
    );

    let offsets = crack_code_offsets(header, data)?;
    let model = decode_markov_model(header, data)?;

    let permissible = header.crack_format == CrackFormat::Permissible;
    let mut edges = vec![0_u8; voxels as usize];

    for z in z_start..z_end {
        let block = &data[offsets[z as usize] as usize..offsets[z as usize + 1] as usize];
        if block.is_empty() {
            continue;
        }

        let (index, stream) = split_block(block)?;
        let nodes = read_boc_index(index, header.sx, header.sy)?;
        let codepoints = match &model {
            Some(model) => model.decode_codepoints(stream)?,
            None => unpack_codepoints(stream),
        };
        let chains = codepoints_to_symbols(&nodes, &codepoints);
        decode_log!(
            trace,
            "slice {}: {} block bytes, {} origins, {} chains",
            z,
            block.len(),
            nodes.len(),
            chains.len(),
        );

        let begin = (sxy * (z - z_start) as u64) as usize;
        let slice_edges = &mut edges[begin..begin + sxy as usize];
        decode_crack_code(&chains, header.sx, header.sy, permissible, slice_edges)?;
    }

    let (cc_labels, num_components) =
        color_connectivity_graph(&edges, sx as usize, sy as usize, slices as usize);
    decode_log!(trace, "colored {} components", num_components);

    let label_map = labels::decode_label_map(
        header,
        data,
        &cc_labels,
        num_components,
        z_start as u64,
        z_end as u64,
    )?;

    render(&cc_labels, &label_map, header.data_width as usize, output)
}

/// Byte offsets of each slice's crack-code block, with one trailing end
/// offset. The Z-index stores per-slice sizes; offsets are their prefix sums
/// based past the header, Z-index, label payload and Markov model.
fn crack_code_offsets(header: &Header, data: &[u8]) -> Result<Vec<u64>> {
    let sz = header.sz as usize;
    let zindex_bytes = 4 * sz as u64;
    if (data.len() as u64) < Header::SIZE as u64 + zindex_bytes {
        return Err(DecodeError::TruncatedZIndex);
    }

    let mut reader = Reader::new(&data[Header::SIZE..]);
    let mut offsets = vec![0_u64; sz + 1];
    for z in 0..sz {
        let size = reader.read_u32().ok_or(DecodeError::TruncatedZIndex)?;
        offsets[z + 1] = offsets[z]
            .checked_add(size as u64)
            .ok_or(DecodeError::TruncatedCrackBlock)?;
    }

    let base = (Header::SIZE as u64 + zindex_bytes)
        .checked_add(header.num_label_bytes)
        .and_then(|v| v.checked_add(header.markov_model_bytes()))
        .ok_or(DecodeError::TruncatedCrackBlock)?;
    for offset in offsets.iter_mut() {
        *offset = offset
            .checked_add(base)
            .ok_or(DecodeError::TruncatedCrackBlock)?;
    }

    if offsets[sz] > data.len() as u64 {
        return Err(DecodeError::TruncatedCrackBlock);
    }

    Ok(offsets)
}

/// Deserialize the Markov model region, if the header declares one.
fn decode_markov_model(header: &Header, data: &[u8]) -> Result<Option<Model>> {
    if header.markov_model_order == 0 {
        return Ok(None);
    }

    let start = (Header::SIZE as u64 + 4 * header.sz as u64)
        .checked_add(header.num_label_bytes)
        .ok_or(DecodeError::TruncatedCrackBlock)?;
    let end = start
        .checked_add(header.markov_model_bytes())
        .ok_or(DecodeError::TruncatedCrackBlock)?;

    let start = usize::try_from(start).map_err(|_| DecodeError::TruncatedCrackBlock)?;
    let end = usize::try_from(end).map_err(|_| DecodeError::TruncatedCrackBlock)?;
    let region = data
        .get(start..end)
        .ok_or(DecodeError::TruncatedCrackBlock)?;

    Model::from_stored(region, header.markov_model_order).map(Some)
}

/// Map component ids through the label map into the output buffer.
fn render(cc_labels: &[u32], label_map: &[u64], width: usize, output: &mut [u8]) -> Result<()> {
    let total = cc_labels.len() * width;
    for (chunk, id) in output[..total].chunks_exact_mut(width).zip(cc_labels) {
        let value = label_map
            .get(*id as usize)
            .ok_or(DecodeError::IndexOutOfRange)?;
        chunk.copy_from_slice(&value.to_le_bytes()[..width]);
    }

    Ok(())
}
