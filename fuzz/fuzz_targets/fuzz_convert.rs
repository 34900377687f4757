#![no_main]
use libfuzzer_sys::{
    arbitrary::{self, Arbitrary},
    fuzz_target,
};
use type1_fonts::{convert, Format, Options};

#[derive(Debug, Arbitrary)]
struct Input<'a> {
    pfa: bool,
    block_len: u16,
    line_len: u16,
    font: &'a [u8],
}

fuzz_target!(|input: Input| {
    // values outside the supported ranges are clamped
    let options = Options {
        format: if input.pfa { Format::Pfa } else { Format::Pfb },
        block_len: input.block_len as usize,
        line_len: input.line_len as usize,
        len_iv: None,
    };
    let mut converted = Vec::new();
    if convert(input.font, &mut converted, &options).is_err() {
        return;
    }
    let _ = convert(converted.as_slice(), std::io::sink(), &Options::default());
});
