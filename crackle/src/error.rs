//! Error types for Crackle decoding.

use core::fmt;

/// A specialized `Result` type for Crackle decoding operations.
pub type Result<T> = core::result::Result<T, DecodeError>;

/// An error that can occur while decoding a Crackle volume.
///
/// Every variant maps to a stable numeric code via [`DecodeError::code`],
/// matching the codes returned by the reference implementations across the
/// foreign-function boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// The input ends before the fixed-size header.
    TruncatedHeader,
    /// The magic bytes or the format version do not match.
    InvalidMagic,
    /// An output buffer was required but none was supplied.
    NullOutput,
    /// The output buffer is smaller than the decoded volume.
    OutputTooSmall,
    /// A header field is outside its domain (element width, reserved bits).
    UnsupportedFormat,
    /// The requested Z-range is empty after clamping.
    EmptyZRange,
    /// The input ends inside the per-slice Z-index.
    TruncatedZIndex,
    /// A crack-code block (or the Markov model region) extends past the
    /// end of the input.
    TruncatedCrackBlock,
    /// A Markov-coded direction stream ends inside a code word.
    MarkovUnderflow,
    /// The label payload ends before its declared contents.
    TruncatedLabels,
    /// A delta-coded index or a label reference resolves outside its table.
    IndexOutOfRange,
    /// The header names a label format this decoder does not know.
    UnsupportedLabelFormat,
    /// A crack-code walk left the corner grid.
    ///
    /// The flag records the edge polarity of the stream, which the numeric
    /// code preserves for diagnostics.
    CrackOutOfRange {
        /// `true` for permissible streams, `false` for impermissible ones.
        permissible: bool,
    },
}

impl DecodeError {
    /// The numeric code reported across the foreign-function boundary.
    pub fn code(&self) -> u32 {
        match self {
            Self::TruncatedHeader => 1,
            Self::InvalidMagic => 2,
            Self::NullOutput => 3,
            Self::OutputTooSmall => 4,
            Self::UnsupportedFormat => 5,
            Self::EmptyZRange => 10,
            Self::TruncatedZIndex => 20,
            Self::TruncatedCrackBlock => 30,
            Self::MarkovUnderflow => 31,
            Self::TruncatedLabels => 40,
            Self::IndexOutOfRange => 41,
            Self::UnsupportedLabelFormat => 100,
            Self::CrackOutOfRange { permissible: false } => 200,
            Self::CrackOutOfRange { permissible: true } => 201,
        }
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TruncatedHeader => write!(f, "input shorter than the header"),
            Self::InvalidMagic => write!(f, "magic bytes or format version mismatch"),
            Self::NullOutput => write!(f, "no output buffer supplied"),
            Self::OutputTooSmall => write!(f, "output buffer too small for the volume"),
            Self::UnsupportedFormat => write!(f, "header field outside its domain"),
            Self::EmptyZRange => write!(f, "empty Z-range after clamping"),
            Self::TruncatedZIndex => write!(f, "input ends inside the Z-index"),
            Self::TruncatedCrackBlock => write!(f, "crack-code block extends past the input"),
            Self::MarkovUnderflow => write!(f, "Markov stream ends inside a code word"),
            Self::TruncatedLabels => write!(f, "label payload ends before its contents"),
            Self::IndexOutOfRange => write!(f, "index outside its table"),
            Self::UnsupportedLabelFormat => write!(f, "unknown label format"),
            Self::CrackOutOfRange { permissible: true } => {
                write!(f, "permissible crack-code walk left the corner grid")
            }
            Self::CrackOutOfRange { permissible: false } => {
                write!(f, "impermissible crack-code walk left the corner grid")
            }
        }
    }
}

impl core::error::Error for DecodeError {}

#[cfg(test)]
mod tests {
    use super::DecodeError;

    #[test]
    fn boundary_codes_are_stable() {
        assert_eq!(DecodeError::TruncatedHeader.code(), 1);
        assert_eq!(DecodeError::InvalidMagic.code(), 2);
        assert_eq!(DecodeError::NullOutput.code(), 3);
        assert_eq!(DecodeError::OutputTooSmall.code(), 4);
        assert_eq!(DecodeError::EmptyZRange.code(), 10);
        assert_eq!(DecodeError::TruncatedZIndex.code(), 20);
        assert_eq!(DecodeError::TruncatedCrackBlock.code(), 30);
        assert_eq!(DecodeError::UnsupportedLabelFormat.code(), 100);
        assert_eq!(DecodeError::CrackOutOfRange { permissible: false }.code(), 200);
        assert_eq!(DecodeError::CrackOutOfRange { permissible: true }.code(), 201);
    }
}
