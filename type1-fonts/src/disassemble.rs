//! Font program to text.

use std::io::{self, BufRead, Write};

use crate::{
    charstring::{Decoder, Token},
    cipher::{Cipher, EEXEC_PAD_LEN},
    container::{ContainerReader, SegmentKind},
    error::{Error, Report},
    options::Options,
    scanner::{LineEvent, LineScanner},
};

const CLEARTOMARK: &[u8] = b"cleartomark";

/// Disassembles a PFA or PFB font into editable text.
///
/// The `eexec` section is decrypted and each charstring is written as a
/// `{ ... }` block of operands and mnemonics, one command per line. The
/// container format is detected from the input.
pub fn disassemble(
    input: impl BufRead,
    mut output: impl Write,
    options: &Options,
) -> Result<Report, Error> {
    let mut disassembler = Disassembler {
        lines: LineReader {
            source: Source::new(ContainerReader::new(input)?),
            line: Vec::new(),
            skip_lf: false,
        },
        scanner: LineScanner::new(options.len_iv),
        report: Report::default(),
    };
    disassembler.run(&mut output)?;
    disassembler.trailer(&mut output)?;
    output.flush()?;

    let Disassembler {
        lines,
        scanner,
        mut report,
    } = disassembler;
    let reader = lines.source.reader;
    report.found_charstrings = scanner.found_charstrings();
    report.binary_segments = reader.binary_segments();
    report.corruptions = reader.into_corruptions();
    if !report.found_charstrings {
        log::warn!("no charstrings found in input");
    }
    if report.unknown_opcodes > 0 {
        log::warn!(
            "{} unknown charstring commands written as escape_<n> or UNKNOWN_<n>",
            report.unknown_opcodes
        );
    }
    if !report.looks_like_font() {
        log::warn!("no binary segments; this doesn't look like a font");
    }
    Ok(report)
}

struct Disassembler<R> {
    lines: LineReader<R>,
    scanner: LineScanner,
    report: Report,
}

impl<R: BufRead> Disassembler<R> {
    fn run(&mut self, output: &mut impl Write) -> Result<(), Error> {
        loop {
            let marker = if self.scanner.is_active() {
                self.scanner.charstring_start()
            } else {
                None
            };
            let is_charstring = self.lines.read_line(marker)?;
            if self.lines.line.is_empty() && !is_charstring {
                return Ok(());
            }
            if self.lines.source.started() {
                self.scanner.enter_eexec();
            }
            if is_charstring {
                self.charstring(output)?;
                continue;
            }
            let event = self.scanner.observe(&self.lines.line);
            output.write_all(&self.lines.line)?;
            if event == LineEvent::Closefile {
                return Ok(());
            }
        }
    }

    /// Decodes the charstring whose header is in the current line.
    fn charstring(&mut self, output: &mut impl Write) -> Result<(), Error> {
        let line = &self.lines.line;
        let (prefix, len) = match line.iter().rposition(|b| matches!(b, b' ' | b'\t')) {
            Some(ix) => (&line[..ix], &line[ix + 1..]),
            None => (&line[..0], &line[..]),
        };
        let len = parse_len(len);
        let mut text = TokenText::new(prefix);

        let len_iv = self.scanner.len_iv();
        let source = &mut self.lines.source;
        let mut failure = None;
        let bytes = std::iter::from_fn(|| match source.next_byte() {
            Ok(byte) => byte,
            Err(e) => {
                failure = Some(e);
                None
            }
        });
        for token in Decoder::new(bytes, len, len_iv) {
            match token {
                Token::Int(value) => text.word(value),
                Token::Op(opcode) => {
                    if opcode.name().is_none() {
                        self.report.unknown_opcodes += 1;
                    }
                    text.word(opcode);
                    text.end_line();
                }
            }
        }
        if let Some(e) = failure {
            return Err(e.into());
        }
        self.report.charstrings += 1;
        output.write_all(&text.finish())?;
        Ok(())
    }

    /// Skips to the `cleartomark` after the `eexec` section and copies the
    /// rest.
    fn trailer(&mut self, output: &mut impl Write) -> Result<(), Error> {
        self.lines.source.raw = true;
        loop {
            self.lines.read_line(None)?;
            let line = &self.lines.line;
            if line.is_empty() {
                return Ok(());
            }
            if let Some(rest) = line.strip_prefix(CLEARTOMARK) {
                if !rest.is_empty() && rest != b"\n" {
                    output.write_all(rest)?;
                }
                break;
            }
        }
        loop {
            self.lines.read_line(None)?;
            if self.lines.line.is_empty() {
                return Ok(());
            }
            output.write_all(&self.lines.line)?;
        }
    }
}

fn parse_len(text: &[u8]) -> i64 {
    match std::str::from_utf8(text.trim_ascii()).map(str::parse::<i64>) {
        Ok(Ok(len)) => len,
        _ => {
            log::error!(
                "bad charstring length '{}'",
                String::from_utf8_lossy(text)
            );
            0
        }
    }
}

/// Text form of one charstring.
struct TokenText {
    text: Vec<u8>,
    line_start: bool,
}

impl TokenText {
    fn new(prefix: &[u8]) -> Self {
        let mut text = prefix.to_vec();
        text.extend_from_slice(b" {\n");
        Self {
            text,
            line_start: true,
        }
    }

    fn word(&mut self, word: impl std::fmt::Display) {
        let sep = if self.line_start { '\t' } else { ' ' };
        self.text.extend_from_slice(format!("{sep}{word}").as_bytes());
        self.line_start = false;
    }

    fn end_line(&mut self) {
        self.text.push(b'\n');
        self.line_start = true;
    }

    fn finish(mut self) -> Vec<u8> {
        if !self.line_start {
            self.end_line();
        }
        self.text.extend_from_slice(b"\t}");
        self.text
    }
}

/// Splits the decrypted byte stream into lines.
struct LineReader<R> {
    source: Source<R>,
    line: Vec<u8>,
    skip_lf: bool,
}

impl<R: BufRead> LineReader<R> {
    /// Reads a line, normalizing `\r` and `\r\n` to `\n`.
    ///
    /// With a `marker`, also stops after ` <marker> ` and returns `true`;
    /// the marker and the space before it are removed from the line.
    fn read_line(&mut self, marker: Option<&[u8]>) -> io::Result<bool> {
        self.line.clear();
        while let Some(b) = self.source.next_byte()? {
            if std::mem::take(&mut self.skip_lf) && b == b'\n' {
                continue;
            }
            self.line.push(b);
            if let Some(marker) = marker {
                if ends_with_marker(&self.line, marker) {
                    self.line.truncate(self.line.len() - marker.len() - 2);
                    return Ok(true);
                }
            }
            match b {
                b'\r' => {
                    if let Some(last) = self.line.last_mut() {
                        *last = b'\n';
                    }
                    self.skip_lf = true;
                    return Ok(false);
                }
                b'\n' => return Ok(false),
                _ => {}
            }
        }
        Ok(false)
    }
}

fn ends_with_marker(line: &[u8], marker: &[u8]) -> bool {
    let Some(head) = line.strip_suffix(b" ").and_then(|l| l.strip_suffix(marker)) else {
        return false;
    };
    head.ends_with(b" ")
}

/// The bytes of the container with the `eexec` section decrypted.
struct Source<R> {
    reader: ContainerReader<R>,
    buf: Vec<u8>,
    pos: usize,
    kind: SegmentKind,
    cipher: Option<Cipher>,
    skip: usize,
    /// Pass binary bytes through without decrypting.
    raw: bool,
    done: bool,
}

impl<R: BufRead> Source<R> {
    fn new(reader: ContainerReader<R>) -> Self {
        Self {
            reader,
            buf: Vec::new(),
            pos: 0,
            kind: SegmentKind::Ascii,
            cipher: None,
            skip: 0,
            raw: false,
            done: false,
        }
    }

    /// Returns `true` once decryption of the `eexec` section has begun.
    fn started(&self) -> bool {
        self.cipher.is_some()
    }

    fn next_byte(&mut self) -> io::Result<Option<u8>> {
        loop {
            if let Some(&b) = self.buf.get(self.pos) {
                self.pos += 1;
                if self.kind != SegmentKind::Binary || self.raw {
                    return Ok(Some(b));
                }
                if self.cipher.is_none() {
                    log::debug!("eexec section starts");
                    self.skip = EEXEC_PAD_LEN;
                }
                let plain = self.cipher.get_or_insert_with(Cipher::eexec).decrypt(b);
                if self.skip > 0 {
                    self.skip -= 1;
                    continue;
                }
                return Ok(Some(plain));
            }
            if self.done {
                return Ok(None);
            }
            self.kind = self.reader.read_segment(&mut self.buf)?;
            self.pos = 0;
            self.done = self.kind == SegmentKind::End;
        }
    }
}
