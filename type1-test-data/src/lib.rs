//! test data shared between the type1-fonts crates.

pub mod type1 {
    //! A small Type 1 font in each of its three forms.
    //!
    //! The containers were produced from [`SAMPLE_TXT`] with the default
    //! options (lenIV 4, 64 column hex lines, maximum PFB block length), so
    //! assembling the text reproduces them byte for byte.

    /// Disassembled, human readable font program.
    pub static SAMPLE_TXT: &str = include_str!("../test_data/type1/sample.txt");

    /// [`SAMPLE_TXT`] assembled into a binary (PFB) container.
    pub static SAMPLE_PFB: &[u8] = include_bytes!("../test_data/type1/sample.pfb");

    /// [`SAMPLE_TXT`] assembled into an ASCII (PFA) container.
    pub static SAMPLE_PFA: &[u8] = include_bytes!("../test_data/type1/sample.pfa");

    /// Number of charstrings (subroutines and glyphs) in the sample.
    pub const SAMPLE_CHARSTRING_COUNT: usize = 8;

    /// Number of operators in the sample unknown to the opcode table.
    pub const SAMPLE_UNKNOWN_COMMANDS: u32 = 3;
}
