#![no_main]
use libfuzzer_sys::fuzz_target;
use type1_fonts::{assemble, disassemble, Format, Options};

fuzz_target!(|data: &[u8]| {
    let mut text = Vec::new();
    if disassemble(data, &mut text, &Options::default()).is_err() {
        return;
    }
    // whatever we print must be accepted back
    let options = Options {
        format: Format::Pfa,
        ..Default::default()
    };
    let _ = assemble(text.as_slice(), std::io::sink(), &options);
});
