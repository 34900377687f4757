//! Errors and diagnostics produced while transcoding a font.

use thiserror::Error;

/// A condition that stops processing of the current font.
#[derive(Debug, Error)]
pub enum Error {
    /// The underlying reader or writer failed.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// An assembled charstring grew beyond the supported size.
    #[error("charstring buffer overflow (limit is {limit} bytes)")]
    CharstringOverflow { limit: usize },
    /// A charstring was opened before any `string currentfile` definition
    /// named the command that reads it.
    #[error("couldn't find charstring start command")]
    MissingCharstringStart,
    /// A byte range supplied by a resource locator does not fit the data.
    #[error("range of {len} bytes at offset {offset} exceeds data length {data_len}")]
    RangeOutOfBounds {
        offset: usize,
        len: usize,
        data_len: usize,
    },
}

/// Damage detected in a PFB container.
///
/// These are reported rather than returned: reading stops or truncates at
/// the damaged point and the rest of the run continues with what was read.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum Corruption {
    /// A block did not start with the `0x80` marker and a known type.
    #[error("bad block marker at position {position}")]
    BadMarker { position: u64 },
    /// The input ended where a block header was expected.
    #[error("no end-of-file marker")]
    MissingEndMarker,
    /// The input ended inside a block length field.
    #[error("bad block length at position {position}")]
    BadBlockLength { position: u64 },
    /// The input ended before a block's declared length was read.
    ///
    /// `position` is the offset of the header of the truncated block.
    #[error("block short by {missing} bytes at position {position}")]
    ShortBlock { missing: u64, position: u64 },
    /// Bytes follow the end-of-file marker.
    #[error("data after PFB end marker at position {position}")]
    TrailingData { position: u64 },
}

/// Summary of a completed run.
///
/// Non-fatal problems end up here; fatal ones are returned as [`Error`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Report {
    /// Container damage, in the order it was found.
    pub corruptions: Vec<Corruption>,
    /// Opcodes without a mnemonic, rendered as `escape_<n>` or `UNKNOWN_<n>`.
    pub unknown_opcodes: u32,
    /// Tokens the assembler could not encode.
    pub unknown_commands: u32,
    /// Number of charstrings encoded or decoded.
    pub charstrings: usize,
    /// Whether a `/Subrs` or `/CharStrings` definition was seen.
    pub found_charstrings: bool,
    /// Number of binary sections read (conversion) or written.
    ///
    /// Consecutive binary blocks or hex lines count as one section.
    pub binary_segments: usize,
}

impl Report {
    /// Returns `true` if the container was read without damage.
    pub fn is_ok(&self) -> bool {
        self.corruptions.is_empty()
    }

    /// Returns `true` if at least one binary (encrypted) segment was seen.
    ///
    /// A font program always has one; its absence usually means the input
    /// was not a font at all.
    pub fn looks_like_font(&self) -> bool {
        self.binary_segments > 0
    }
}
