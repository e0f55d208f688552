//! The fixed-size volume header.
//!
//! The header is 30 bytes, little-endian throughout:
//!
//! ```text
//! [0..4)   magic "crkl"
//! [4]      format version (only 0 is defined)
//! [5]      data_width: width of the emitted labels, one of {1, 2, 4, 8}
//! [6]      stored_data_width: width of the stored unique labels
//! [7]      flags: bit 0 signedness of stored labels,
//!                 bit 1 crack polarity (0 impermissible, 1 permissible),
//!                 bits 2-3 label format,
//!                 bits 4-7 reserved, zero
//! [8..20)  sx, sy, sz: u32 volume dimensions
//! [20]     grid size exponent (tile side = 1 << exponent)
//! [21..29) num_label_bytes: u64 length of the label payload
//! [29]     markov_model_order (0 disables the Markov stage)
//! ```

use crate::error::{DecodeError, Result};
use crate::reader::{Reader, byte_width};

/// Polarity of the per-voxel edge bits painted by the crack codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrackFormat {
    /// Edge bits start fully passable and contours clear them.
    Impermissible,
    /// Edge bits start blocked and contours set the passable ones.
    Permissible,
}

/// Encoding of the component-id to label mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelFormat {
    /// One renumbering entry per component.
    Flat,
    /// Fixed-width pin records over a background label.
    PinsFixedWidth,
    /// Per-label variable-width pin and component groups.
    PinsVariableWidth,
}

/// The parsed volume header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Byte width of the emitted labels.
    pub data_width: u8,
    /// Byte width of the stored unique labels.
    pub stored_data_width: u8,
    /// Whether stored labels are interpreted as signed.
    pub is_signed: bool,
    /// Edge-bit polarity of the crack-code streams.
    pub crack_format: CrackFormat,
    /// Encoding of the label payload.
    pub label_format: LabelFormat,
    /// Volume width.
    pub sx: u32,
    /// Volume depth (the in-plane Y axis).
    pub sy: u32,
    /// Number of Z-slices.
    pub sz: u32,
    /// Grid-tile side exponent for component counting.
    pub grid_size: u8,
    /// Byte length of the label payload.
    pub num_label_bytes: u64,
    /// Markov model order; 0 means packed direction streams.
    pub markov_model_order: u8,
}

impl Header {
    /// The serialized size of the header in bytes.
    pub const SIZE: usize = 30;

    /// The magic bytes opening every stream.
    pub const MAGIC: [u8; 4] = *b"crkl";

    /// Parse and validate a header from the start of `data`.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < Self::SIZE {
            return Err(DecodeError::TruncatedHeader);
        }

        let mut reader = Reader::new(data);
        let magic = reader.read_bytes(4).ok_or(DecodeError::TruncatedHeader)?;
        let version = reader.read_u8().ok_or(DecodeError::TruncatedHeader)?;
        if magic != Self::MAGIC || version != 0 {
            return Err(DecodeError::InvalidMagic);
        }

        let data_width = reader.read_u8().ok_or(DecodeError::TruncatedHeader)?;
        let stored_data_width = reader.read_u8().ok_or(DecodeError::TruncatedHeader)?;
        if !matches!(data_width, 1 | 2 | 4 | 8) || !matches!(stored_data_width, 1 | 2 | 4 | 8) {
            return Err(DecodeError::UnsupportedFormat);
        }

        let flags = reader.read_u8().ok_or(DecodeError::TruncatedHeader)?;
        if flags & 0xf0 != 0 {
            return Err(DecodeError::UnsupportedFormat);
        }
        let is_signed = flags & 0b1 != 0;
        let crack_format = if flags & 0b10 != 0 {
            CrackFormat::Permissible
        } else {
            CrackFormat::Impermissible
        };
        let label_format = match (flags >> 2) & 0b11 {
            0 => LabelFormat::Flat,
            1 => LabelFormat::PinsFixedWidth,
            2 => LabelFormat::PinsVariableWidth,
            _ => return Err(DecodeError::UnsupportedLabelFormat),
        };

        let sx = reader.read_u32().ok_or(DecodeError::TruncatedHeader)?;
        let sy = reader.read_u32().ok_or(DecodeError::TruncatedHeader)?;
        let sz = reader.read_u32().ok_or(DecodeError::TruncatedHeader)?;
        let grid_size = reader.read_u8().ok_or(DecodeError::TruncatedHeader)?;
        let num_label_bytes = reader.read_u64().ok_or(DecodeError::TruncatedHeader)?;
        let markov_model_order = reader.read_u8().ok_or(DecodeError::TruncatedHeader)?;

        Ok(Self {
            data_width,
            stored_data_width,
            is_signed,
            crack_format,
            label_format,
            sx,
            sy,
            sz,
            grid_size,
            num_label_bytes,
            markov_model_order,
        })
    }

    /// The number of voxels in the full volume, saturating at `u64::MAX`.
    pub fn voxels(&self) -> u64 {
        (self.sx as u64)
            .saturating_mul(self.sy as u64)
            .saturating_mul(self.sz as u64)
    }

    /// The number of bytes a full decode writes.
    pub fn output_bytes(&self) -> u64 {
        self.voxels().saturating_mul(self.data_width as u64)
    }

    /// Byte width of a pin's starting voxel index.
    pub(crate) fn pin_index_width(&self) -> usize {
        byte_width(self.voxels())
    }

    /// Byte width of a pin's Z-depth.
    pub(crate) fn depth_width(&self) -> usize {
        byte_width(self.sz as u64)
    }

    /// Byte width of a per-grid component count.
    pub(crate) fn component_width(&self) -> usize {
        byte_width(self.sx as u64 * self.sy as u64)
    }

    /// The side length of a component-counting grid tile.
    fn grid_tile(&self) -> u64 {
        1_u64 << self.grid_size.min(63)
    }

    /// In-plane grid tiles per slice.
    pub(crate) fn grids_per_slice(&self) -> u64 {
        let tile = self.grid_tile();
        (self.sx as u64).div_ceil(tile) * (self.sy as u64).div_ceil(tile)
    }

    /// Total component-count entries in FLAT and variable-width payloads.
    pub(crate) fn num_grids(&self) -> u64 {
        self.grids_per_slice() * self.sz as u64
    }

    /// The serialized size of the Markov model, zero when disabled.
    pub(crate) fn markov_model_bytes(&self) -> u64 {
        let order = u32::from(self.markov_model_order);
        if order == 0 {
            return 0;
        }
        if order >= 32 {
            return u64::MAX;
        }
        let rows = 1_u128 << (2 * order);
        ((5 * rows).div_ceil(8)).min(u64::MAX as u128) as u64
    }
}

#[cfg(test)]
mod tests {
    use super::{CrackFormat, Header, LabelFormat};
    use crate::error::DecodeError;

    fn sample_header() -> [u8; Header::SIZE] {
        let mut bytes = [0_u8; Header::SIZE];
        bytes[0..4].copy_from_slice(b"crkl");
        bytes[4] = 0; // version
        bytes[5] = 2; // data_width
        bytes[6] = 2; // stored_data_width
        bytes[7] = 0b0000; // unsigned, impermissible, FLAT
        bytes[8..12].copy_from_slice(&2_u32.to_le_bytes());
        bytes[12..16].copy_from_slice(&2_u32.to_le_bytes());
        bytes[16..20].copy_from_slice(&1_u32.to_le_bytes());
        bytes[20] = 31; // grid tile larger than any slice
        bytes[21..29].copy_from_slice(&12_u64.to_le_bytes());
        bytes[29] = 0;
        bytes
    }

    #[test]
    fn parses_a_valid_header() {
        let header = Header::parse(&sample_header()).unwrap();
        assert_eq!(header.data_width, 2);
        assert_eq!(header.crack_format, CrackFormat::Impermissible);
        assert_eq!(header.label_format, LabelFormat::Flat);
        assert_eq!((header.sx, header.sy, header.sz), (2, 2, 1));
        assert_eq!(header.voxels(), 4);
        assert_eq!(header.output_bytes(), 8);
        assert_eq!(header.grids_per_slice(), 1);
        assert_eq!(header.num_grids(), 1);
        assert_eq!(header.markov_model_bytes(), 0);
    }

    #[test]
    fn rejects_bad_magic_and_version() {
        let mut bytes = sample_header();
        bytes[0] = b'x';
        assert_eq!(Header::parse(&bytes), Err(DecodeError::InvalidMagic));

        let mut bytes = sample_header();
        bytes[4] = 1;
        assert_eq!(Header::parse(&bytes), Err(DecodeError::InvalidMagic));
    }

    #[test]
    fn rejects_truncation_and_bad_fields() {
        let bytes = sample_header();
        assert_eq!(
            Header::parse(&bytes[..Header::SIZE - 1]),
            Err(DecodeError::TruncatedHeader)
        );

        let mut bytes = sample_header();
        bytes[5] = 3;
        assert_eq!(Header::parse(&bytes), Err(DecodeError::UnsupportedFormat));

        let mut bytes = sample_header();
        bytes[7] = 0b1100; // label format 3
        assert_eq!(Header::parse(&bytes), Err(DecodeError::UnsupportedLabelFormat));

        let mut bytes = sample_header();
        bytes[7] = 0b1_0000; // reserved bit
        assert_eq!(Header::parse(&bytes), Err(DecodeError::UnsupportedFormat));
    }

    #[test]
    fn markov_model_sizes() {
        let mut bytes = sample_header();
        bytes[29] = 1;
        let header = Header::parse(&bytes).unwrap();
        // 4 rows of 5 bits each.
        assert_eq!(header.markov_model_bytes(), 3);

        bytes[29] = 2;
        let header = Header::parse(&bytes).unwrap();
        // 16 rows of 5 bits each.
        assert_eq!(header.markov_model_bytes(), 10);
    }
}
