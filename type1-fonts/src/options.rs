//! Settings that control how containers are written.

/// Smallest PFB block length accepted in [`Options::block_len()`].
pub const MIN_BLOCK_LEN: usize = (1 << 8) - 6;

/// Largest PFB block length accepted in [`Options::block_len()`].
pub const MAX_BLOCK_LEN: usize = (1 << 17) - 6;

/// Smallest hex line width accepted in [`Options::line_len()`].
pub const MIN_LINE_LEN: usize = 2;

/// Largest hex line width accepted in [`Options::line_len()`].
pub const MAX_LINE_LEN: usize = 1024;

/// Default hex line width for PFA output.
pub const DEFAULT_LINE_LEN: usize = 64;

/// Container kind of a font program.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Format {
    /// ASCII container: `eexec` data is written as lines of hex digits.
    Pfa,
    /// Binary container made of typed, length-prefixed blocks.
    #[default]
    Pfb,
}

/// Configuration for assembling and converting fonts.
///
/// # Examples
///
/// ```
/// use type1_fonts::{Format, Options};
///
/// let options = Options {
///     format: Format::Pfa,
///     line_len: 72,
///     ..Default::default()
/// };
/// assert_eq!(options.line_len(), 72);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Options {
    /// Output container kind.
    ///
    /// # Default
    ///
    /// [`Format::Pfb`]
    pub format: Format,
    /// Maximum number of data bytes in one PFB block.
    ///
    /// Values outside [`MIN_BLOCK_LEN`]..=[`MAX_BLOCK_LEN`] are clamped.
    ///
    /// # Default
    ///
    /// [`MAX_BLOCK_LEN`]
    pub block_len: usize,
    /// Number of hex digits per line in PFA output.
    ///
    /// Values outside [`MIN_LINE_LEN`]..=[`MAX_LINE_LEN`] are clamped.
    ///
    /// # Default
    ///
    /// [`DEFAULT_LINE_LEN`]
    pub line_len: usize,
    /// Number of random bytes at the start of each charstring.
    ///
    /// When set, this replaces any `/lenIV` declaration in the font.
    ///
    /// # Default
    ///
    /// `None`: use the font's declaration, or 4 without one.
    pub len_iv: Option<u32>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            format: Format::default(),
            block_len: MAX_BLOCK_LEN,
            line_len: DEFAULT_LINE_LEN,
            len_iv: None,
        }
    }
}

impl Options {
    /// Returns the effective PFB block length.
    pub fn block_len(&self) -> usize {
        clamp("block length", self.block_len, MIN_BLOCK_LEN, MAX_BLOCK_LEN)
    }

    /// Returns the effective PFA hex line width.
    pub fn line_len(&self) -> usize {
        clamp("line length", self.line_len, MIN_LINE_LEN, MAX_LINE_LEN)
    }
}

fn clamp(what: &str, value: usize, min: usize, max: usize) -> usize {
    if value < min {
        log::warn!("{what} raised to {min}");
        min
    } else if value > max {
        log::warn!("{what} lowered to {max}");
        max
    } else {
        value
    }
}
