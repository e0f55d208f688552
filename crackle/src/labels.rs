//! The label payload: mapping component ids to final labels.
//!
//! All three payload formats open with a table of the unique labels that
//! occur in the volume, stored at `stored_data_width` and interpreted as
//! signed or unsigned per the header. Labels are widened to 64 bits here
//! (sign-extending when signed) and truncated to the output width at render
//! time, so every stored/output width combination shares one code path.
//!
//! FLAT then lists one unique-label index per component, in component-id
//! order. The pin formats instead start from a background label and overlay
//! pins; the variable-width form also lists, per unique label, the component
//! ids it covers directly.
//!
//! Per-grid component counts let a Z-range decode skip the entries belonging
//! to slices outside the range.

use alloc::vec;
use alloc::vec::Vec;

use crate::error::{DecodeError, Result};
use crate::header::{Header, LabelFormat};
use crate::log::decode_log;
use crate::pins::Pin;
use crate::reader::{Reader, byte_width};

/// Decode the payload named by the header into a component-id to label map.
pub(crate) fn decode_label_map(
    header: &Header,
    data: &[u8],
    cc_labels: &[u32],
    num_components: u32,
    z_start: u64,
    z_end: u64,
) -> Result<Vec<u64>> {
    let payload = payload(header, data)?;

    match header.label_format {
        LabelFormat::Flat => decode_flat(header, payload, z_start, z_end),
        LabelFormat::PinsFixedWidth => {
            decode_fixed_width_pins(header, payload, cc_labels, num_components, z_start, z_end)
        }
        LabelFormat::PinsVariableWidth => {
            decode_condensed_pins(header, payload, cc_labels, num_components, z_start, z_end)
        }
    }
}

/// The label payload region, between the Z-index and the Markov model.
fn payload<'a>(header: &Header, data: &'a [u8]) -> Result<&'a [u8]> {
    let start = Header::SIZE as u64 + 4 * header.sz as u64;
    let end = start
        .checked_add(header.num_label_bytes)
        .ok_or(DecodeError::TruncatedLabels)?;

    let start = usize::try_from(start).map_err(|_| DecodeError::TruncatedLabels)?;
    let end = usize::try_from(end).map_err(|_| DecodeError::TruncatedLabels)?;
    data.get(start..end).ok_or(DecodeError::TruncatedLabels)
}

/// Sign-extend a `width`-byte little-endian value.
fn sign_extend(value: u64, width: usize) -> u64 {
    if width >= 8 {
        return value;
    }
    let shift = 64 - 8 * width as u32;
    (((value << shift) as i64) >> shift) as u64
}

/// Read the next stored label, widened to 64 bits.
fn next_stored(reader: &mut Reader<'_>, header: &Header) -> Option<u64> {
    let value = reader.read_uint(header.stored_data_width as usize)?;
    Some(if header.is_signed {
        sign_extend(value, header.stored_data_width as usize)
    } else {
        value
    })
}

/// Read the unique-label table off the front of the payload.
///
/// The caller has already consumed everything before the `num_uniq` field.
fn decode_uniq(reader: &mut Reader<'_>, header: &Header) -> Result<Vec<u64>> {
    let num_uniq = reader.read_u64().ok_or(DecodeError::TruncatedLabels)?;

    let remaining = reader.tail().map_or(0, <[u8]>::len) as u64;
    let width = header.stored_data_width as u64;
    if num_uniq > remaining / width {
        return Err(DecodeError::TruncatedLabels);
    }

    let mut uniq = Vec::with_capacity(num_uniq as usize);
    for _ in 0..num_uniq {
        uniq.push(next_stored(reader, header).ok_or(DecodeError::TruncatedLabels)?);
    }

    Ok(uniq)
}

/// Consume the per-grid component counts; returns the grand total and the
/// number of components falling before `z_start` and at or after `z_end`.
fn decode_components(
    reader: &mut Reader<'_>,
    header: &Header,
    z_start: u64,
    z_end: u64,
) -> Result<(u64, u64, u64)> {
    let width = header.component_width();
    let grids_per_slice = header.grids_per_slice();
    let num_grids = header.num_grids();

    let mut total = 0_u64;
    let mut left = 0_u64;
    let mut right = 0_u64;
    for grid in 0..num_grids {
        let count = reader
            .read_uint(width)
            .ok_or(DecodeError::TruncatedLabels)?;
        total = total
            .checked_add(count)
            .ok_or(DecodeError::IndexOutOfRange)?;

        let z = grid / grids_per_slice;
        if z < z_start {
            left += count;
        }
        if z >= z_end {
            right += count;
        }
    }

    Ok((total, left, right))
}

/// FLAT: one unique-label index per component id.
fn decode_flat(header: &Header, payload: &[u8], z_start: u64, z_end: u64) -> Result<Vec<u64>> {
    let mut reader = Reader::new(payload);
    let uniq = decode_uniq(&mut reader, header)?;

    let (_, left, right) = decode_components(&mut reader, header, z_start, z_end)?;

    let width = byte_width(uniq.len() as u64) as u64;
    let skip = left
        .checked_mul(width)
        .and_then(|v| usize::try_from(v).ok())
        .ok_or(DecodeError::TruncatedLabels)?;
    reader
        .skip_bytes(skip)
        .ok_or(DecodeError::TruncatedLabels)?;

    let remaining = reader.tail().map_or(0, <[u8]>::len) as u64;
    let trailing = right
        .checked_mul(width)
        .ok_or(DecodeError::TruncatedLabels)?;
    if trailing > remaining {
        return Err(DecodeError::TruncatedLabels);
    }
    let num_fields = (remaining - trailing) / width;

    decode_log!(
        trace,
        "flat payload: {} labels over {} components",
        uniq.len(),
        num_fields,
    );

    let mut label_map = Vec::with_capacity(num_fields as usize);
    for _ in 0..num_fields {
        let index = reader
            .read_uint(width as usize)
            .ok_or(DecodeError::TruncatedLabels)?;
        let label = usize::try_from(index)
            .ok()
            .and_then(|i| uniq.get(i))
            .ok_or(DecodeError::IndexOutOfRange)?;
        label_map.push(*label);
    }

    Ok(label_map)
}

/// PINS_FIXED_WIDTH: a background label, then uniform pin records to the
/// end of the payload.
fn decode_fixed_width_pins(
    header: &Header,
    payload: &[u8],
    cc_labels: &[u32],
    num_components: u32,
    z_start: u64,
    z_end: u64,
) -> Result<Vec<u64>> {
    let mut reader = Reader::new(payload);
    let bgcolor = next_stored(&mut reader, header).ok_or(DecodeError::TruncatedLabels)?;
    let uniq = decode_uniq(&mut reader, header)?;

    let label_width = byte_width(uniq.len() as u64);
    let index_width = header.pin_index_width();
    let depth_width = header.depth_width();
    let pin_size = label_width + index_width + depth_width;

    let num_pins = reader.tail().map_or(0, <[u8]>::len) / pin_size;
    decode_log!(
        trace,
        "fixed-width payload: {} pins over {} components",
        num_pins,
        num_components,
    );

    let sxy = header.sx as u64 * header.sy as u64;
    let mut label_map = vec![bgcolor; num_components as usize];
    for _ in 0..num_pins {
        let pin = Pin::read(&mut reader, label_width, index_width, depth_width)
            .ok_or(DecodeError::TruncatedLabels)?;
        apply_pin(&pin, &uniq, cc_labels, &mut label_map, sxy, z_start, z_end)?;
    }

    Ok(label_map)
}

/// PINS_VARIABLE_WIDTH: per unique label, a delta-coded pin group and a
/// delta-coded list of directly covered component ids.
fn decode_condensed_pins(
    header: &Header,
    payload: &[u8],
    cc_labels: &[u32],
    num_components: u32,
    z_start: u64,
    z_end: u64,
) -> Result<Vec<u64>> {
    let mut reader = Reader::new(payload);
    let bgcolor = next_stored(&mut reader, header).ok_or(DecodeError::TruncatedLabels)?;
    let uniq = decode_uniq(&mut reader, header)?;

    let (total, left, right) = decode_components(&mut reader, header, z_start, z_end)?;
    let right_offset = total - right;

    let combined = reader.read_u8().ok_or(DecodeError::TruncatedLabels)?;
    let num_pins_width = 1_usize << (combined & 0b11);
    let depth_width = 1_usize << ((combined >> 2) & 0b11);
    let cc_label_width = 1_usize << ((combined >> 4) & 0b11);
    let index_width = header.pin_index_width();

    let sxy = header.sx as u64 * header.sy as u64;
    let mut label_map = vec![bgcolor; num_components as usize];
    let mut pins: Vec<Pin> = Vec::new();

    for (label, value) in uniq.iter().enumerate() {
        let num_pins = reader
            .read_uint(num_pins_width)
            .ok_or(DecodeError::TruncatedLabels)?;

        let group_start = pins.len();
        let mut running = 0_u64;
        for _ in 0..num_pins {
            let delta = reader
                .read_uint(index_width)
                .ok_or(DecodeError::TruncatedLabels)?;
            running = running
                .checked_add(delta)
                .ok_or(DecodeError::IndexOutOfRange)?;
            pins.push(Pin {
                label: label as u64,
                index: running,
                depth: 0,
            });
        }
        for pin in &mut pins[group_start..] {
            pin.depth = reader
                .read_uint(depth_width)
                .ok_or(DecodeError::TruncatedLabels)?;
        }

        let num_cc = reader
            .read_uint(num_pins_width)
            .ok_or(DecodeError::TruncatedLabels)?;
        let mut cc_id = 0_u64;
        for _ in 0..num_cc {
            let delta = reader
                .read_uint(cc_label_width)
                .ok_or(DecodeError::TruncatedLabels)?;
            cc_id = cc_id
                .checked_add(delta)
                .ok_or(DecodeError::IndexOutOfRange)?;

            if cc_id < left || cc_id >= right_offset {
                continue;
            }
            let slot = usize::try_from(cc_id - left)
                .ok()
                .and_then(|i| label_map.get_mut(i))
                .ok_or(DecodeError::IndexOutOfRange)?;
            *slot = *value;
        }
    }

    decode_log!(
        trace,
        "condensed payload: {} pins over {} components",
        pins.len(),
        num_components,
    );

    for pin in &pins {
        apply_pin(pin, &uniq, cc_labels, &mut label_map, sxy, z_start, z_end)?;
    }

    Ok(label_map)
}

/// Assign a pin's label to the component it crosses in each slice of its
/// clipped Z-extent.
fn apply_pin(
    pin: &Pin,
    uniq: &[u64],
    cc_labels: &[u32],
    label_map: &mut [u64],
    sxy: u64,
    z_start: u64,
    z_end: u64,
) -> Result<()> {
    let value = *usize::try_from(pin.label)
        .ok()
        .and_then(|i| uniq.get(i))
        .ok_or(DecodeError::IndexOutOfRange)?;

    if sxy == 0 {
        return Ok(());
    }

    let pin_z = pin.index / sxy;
    let loc = pin.index - pin_z * sxy;
    let lo = pin_z.max(z_start);
    let hi = pin_z
        .saturating_add(pin.depth)
        .saturating_add(1)
        .min(z_end);

    for z in lo..hi {
        let cc_id = cc_labels[(loc + sxy * (z - z_start)) as usize];
        label_map[cc_id as usize] = value;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::sign_extend;

    #[test]
    fn sign_extension_by_width() {
        assert_eq!(sign_extend(0xff, 1), u64::MAX);
        assert_eq!(sign_extend(0x7f, 1), 0x7f);
        assert_eq!(sign_extend(0x8000, 2), 0xffff_ffff_ffff_8000);
        assert_eq!(sign_extend(0x1234, 2), 0x1234);
        assert_eq!(sign_extend(u64::MAX, 8), u64::MAX);
    }
}
