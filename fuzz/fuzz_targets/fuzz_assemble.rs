#![no_main]
use libfuzzer_sys::{
    arbitrary::{self, Arbitrary},
    fuzz_target,
};
use type1_fonts::{assemble, Format, Options};

#[derive(Debug, Arbitrary)]
struct Input<'a> {
    pfa: bool,
    len_iv: Option<u8>,
    text: &'a [u8],
}

fuzz_target!(|input: Input| {
    let options = Options {
        format: if input.pfa { Format::Pfa } else { Format::Pfb },
        len_iv: input.len_iv.map(u32::from),
        ..Default::default()
    };
    let _ = assemble(input.text, std::io::sink(), &options);
});
