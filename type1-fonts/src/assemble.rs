//! Text to font program.

use std::io::{self, BufRead, Write};

use crate::{
    charstring::Encoder,
    cipher::{Cipher, EEXEC_PAD_LEN},
    container::{ContainerWriter, SegmentSink},
    error::{Error, Report},
    options::Options,
    scanner::{is_whitespace, ByteReader, LineEvent, LineScanner},
};

/// Number of `0` lines written after the `eexec` section.
const ZERO_LINES: usize = 8;
const ZERO_LINE_LEN: usize = 64;

/// Assembles a disassembled font program into a PFA or PFB container.
///
/// Everything between `currentfile eexec` and `mark currentfile closefile`
/// is encrypted. Charstrings, written as `{ ... }` after the `/Subrs` or
/// `/CharStrings` definition, are encoded and encrypted and take the place
/// of the braces together with their length and the command that reads
/// them.
pub fn assemble(
    input: impl BufRead,
    output: impl Write,
    options: &Options,
) -> Result<Report, Error> {
    let assembler = Assembler {
        input: ByteReader::new(input),
        output: EexecWriter {
            sink: ContainerWriter::new(output, options),
            cipher: None,
            scratch: Vec::new(),
        },
        scanner: LineScanner::new(options.len_iv),
        line: Vec::new(),
        word: Vec::new(),
        report: Report::default(),
    };
    assembler.run()
}

struct Assembler<R, W> {
    input: ByteReader<R>,
    output: EexecWriter<W>,
    scanner: LineScanner,
    line: Vec<u8>,
    word: Vec<u8>,
    report: Report,
}

impl<R: BufRead, W: Write> Assembler<R, W> {
    fn run(mut self) -> Result<Report, Error> {
        loop {
            let opens_charstring = self.read_line(self.scanner.is_active())?;
            if self.line.is_empty() && !opens_charstring {
                break;
            }
            match self.scanner.observe(&self.line) {
                LineEvent::Eexec => {
                    self.output.sink.ascii(&self.line)?;
                    self.output.cipher = Some(Cipher::eexec());
                    self.output.emit(&[0; EEXEC_PAD_LEN])?;
                    continue;
                }
                LineEvent::Closefile => {
                    self.output.emit(&self.line)?;
                    return self.finish(true);
                }
                LineEvent::Plain => self.output.emit(&self.line)?,
            }
            if opens_charstring {
                self.charstring()?;
            }
        }
        self.finish(false)
    }

    /// Reads a line, stopping early at a `{` when charstrings are possible.
    ///
    /// Returns `true` if the line was cut at a `{`, which is not stored.
    fn read_line(&mut self, active: bool) -> io::Result<bool> {
        self.line.clear();
        let mut in_comment = false;
        while let Some(c) = self.input.next_byte()? {
            if c == b'%' {
                in_comment = true;
            } else if c == b'{' && active && !in_comment {
                return Ok(true);
            }
            match c {
                b'\r' => {
                    if self.input.peek()? == Some(b'\n') {
                        self.input.next_byte()?;
                    }
                    self.line.push(b'\n');
                    return Ok(false);
                }
                b'\n' => {
                    self.line.push(c);
                    return Ok(false);
                }
                _ => self.line.push(c),
            }
        }
        Ok(false)
    }

    /// Reads the next charstring token into `self.word`.
    ///
    /// Returns `false` at the closing brace or the end of input.
    fn read_word(&mut self) -> io::Result<bool> {
        self.word.clear();
        while let Some(c) = self.input.next_byte()? {
            match c {
                b'%' => {
                    while let Some(c) = self.input.next_byte()? {
                        if matches!(c, b'\n' | b'\r') {
                            break;
                        }
                    }
                }
                b'}' => return Ok(false),
                c if is_whitespace(c) => {}
                _ => {
                    self.word.push(c);
                    while let Some(c) = self.input.peek()? {
                        if is_whitespace(c) || c == b'%' || c == b'}' {
                            break;
                        }
                        self.word.push(c);
                        self.input.next_byte()?;
                    }
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    fn charstring(&mut self) -> Result<(), Error> {
        let Some(start) = self.scanner.charstring_start().map(<[u8]>::to_vec) else {
            return Err(Error::MissingCharstringStart);
        };
        let mut encoder = Encoder::new(self.scanner.len_iv())?;
        while self.read_word()? {
            encoder.push_word(&self.word)?;
        }
        self.report.unknown_commands += encoder.unknown_count();
        self.report.charstrings += 1;
        let data = encoder.finish();
        let mut header = format!("{} ", data.len()).into_bytes();
        header.extend_from_slice(&start);
        header.push(b' ');
        self.output.emit(&header)?;
        self.output.emit(&data)?;
        Ok(())
    }

    /// Ends the `eexec` section and copies whatever follows.
    fn finish(mut self, closefile: bool) -> Result<Report, Error> {
        self.output.cipher = None;
        let mut zeros = [b'0'; ZERO_LINE_LEN + 1];
        zeros[ZERO_LINE_LEN] = b'\n';
        for _ in 0..ZERO_LINES {
            self.output.sink.ascii(&zeros)?;
        }
        if closefile {
            self.output.sink.ascii(b"cleartomark\n")?;
        }
        loop {
            self.read_line(false)?;
            if self.line.is_empty() {
                break;
            }
            self.output.sink.ascii(&self.line)?;
        }
        self.output.sink.end()?;

        let mut report = self.report;
        report.found_charstrings = self.scanner.found_charstrings();
        report.binary_segments = self.output.sink.binary_segments();
        if !report.found_charstrings {
            log::warn!("no charstrings found in input");
        }
        if report.unknown_commands > 0 {
            log::warn!(
                "{} charstring commands could not be encoded",
                report.unknown_commands
            );
        }
        log::debug!("assembled {} charstrings", report.charstrings);
        Ok(report)
    }
}

/// Container output that encrypts while the `eexec` section is open.
struct EexecWriter<W> {
    sink: ContainerWriter<W>,
    cipher: Option<Cipher>,
    scratch: Vec<u8>,
}

impl<W: Write> EexecWriter<W> {
    fn emit(&mut self, data: &[u8]) -> io::Result<()> {
        match &mut self.cipher {
            Some(cipher) => {
                self.scratch.clear();
                self.scratch
                    .extend(data.iter().map(|b| cipher.encrypt(*b)));
                self.sink.binary(&self.scratch)
            }
            None => self.sink.ascii(data),
        }
    }
}
