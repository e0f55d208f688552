//! Pin records.
//!
//! A pin is a vertical run of voxels sharing one non-background label: a
//! renumbering index into the unique-label table, the flattened voxel index
//! where the run starts, and how many further slices it reaches. Applying a
//! pin assigns its label to the component the run passes through in every
//! slice it crosses.

use crate::reader::Reader;

/// A decoded pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Pin {
    /// Index into the unique-label table.
    pub(crate) label: u64,
    /// Flattened voxel index of the top of the run.
    pub(crate) index: u64,
    /// Number of slices below the first that the run covers.
    pub(crate) depth: u64,
}

impl Pin {
    /// Read one fixed-width pin record.
    pub(crate) fn read(
        reader: &mut Reader<'_>,
        label_width: usize,
        index_width: usize,
        depth_width: usize,
    ) -> Option<Self> {
        let label = reader.read_uint(label_width)?;
        let index = reader.read_uint(index_width)?;
        let depth = reader.read_uint(depth_width)?;

        Some(Self {
            label,
            index,
            depth,
        })
    }
}
