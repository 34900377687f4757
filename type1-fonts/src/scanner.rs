//! Line level scanning of font program text.
//!
//! The scanner watches each line for the structural markers that change how
//! the following bytes are treated: the start of the `eexec` section, the
//! `/Subrs` and `/CharStrings` definitions that make charstrings possible,
//! the definition of the command that reads them, `/lenIV` and the
//! `closefile` that ends the encrypted section.

use std::io::{self, BufRead};

use crate::charstring::DEFAULT_LEN_IV;

const EEXEC: &[u8] = b"currentfile eexec";
const CLOSEFILE: &[u8] = b"mark currentfile closefile";
const STRING_CURRENTFILE: &[u8] = b"string currentfile";

/// What a line means to the caller.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum LineEvent {
    Plain,
    /// The line starts the `eexec` section.
    Eexec,
    /// The line ends the `eexec` section.
    Closefile,
}

/// Tracks the markers seen so far in a font program.
#[derive(Clone, Debug)]
pub struct LineScanner {
    active: bool,
    ever_active: bool,
    in_eexec: bool,
    len_iv: u32,
    len_iv_override: Option<u32>,
    charstring_start: Option<Vec<u8>>,
}

impl LineScanner {
    /// Creates a scanner; a `len_iv` override replaces any `/lenIV` in the
    /// font.
    pub fn new(len_iv_override: Option<u32>) -> Self {
        Self {
            active: false,
            ever_active: false,
            in_eexec: false,
            len_iv: len_iv_override.unwrap_or(DEFAULT_LEN_IV),
            len_iv_override,
            charstring_start: None,
        }
    }

    /// Inspects one line of text.
    pub fn observe(&mut self, line: &[u8]) -> LineEvent {
        if self.in_eexec && contains(line, CLOSEFILE) {
            log::debug!("closefile");
            return LineEvent::Closefile;
        }
        if self.ever_active {
            return LineEvent::Plain;
        }
        if !self.in_eexec && is_eexec_line(line) {
            log::debug!("eexec section starts");
            self.in_eexec = true;
            return LineEvent::Eexec;
        }
        if let Some(len_iv) = parse_len_iv(line) {
            match self.len_iv_override {
                Some(len_iv_override) => {
                    log::debug!("ignoring /lenIV {len_iv}, using {len_iv_override}")
                }
                None => {
                    log::debug!("/lenIV {len_iv}");
                    self.len_iv = len_iv;
                }
            }
        }
        if digit_after(line, b"/Subrs") || digit_after(line, b"/CharStrings") {
            log::debug!("charstring definitions start");
            self.active = true;
            self.ever_active = true;
        }
        if self.charstring_start.is_none() {
            if let Some(name) = parse_charstring_start(line) {
                log::debug!(
                    "charstring start command is '{}'",
                    String::from_utf8_lossy(name)
                );
                self.charstring_start = Some(name.to_vec());
            }
        }
        LineEvent::Plain
    }

    /// Returns `true` once charstrings may appear.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Returns `true` if a `/Subrs` or `/CharStrings` definition was seen.
    pub fn found_charstrings(&self) -> bool {
        self.ever_active
    }

    /// Number of padding bytes at the start of each charstring.
    pub fn len_iv(&self) -> u32 {
        self.len_iv
    }

    /// The command that reads a charstring, for example `RD`.
    pub fn charstring_start(&self) -> Option<&[u8]> {
        self.charstring_start.as_deref()
    }

    /// Marks the `eexec` section as entered without seeing its start line.
    pub fn enter_eexec(&mut self) {
        self.in_eexec = true;
    }
}

/// Returns `true` for `currentfile eexec` followed only by whitespace.
pub fn is_eexec_line(line: &[u8]) -> bool {
    line.strip_prefix(EEXEC)
        .is_some_and(|rest| rest.iter().copied().all(is_whitespace))
}

/// Whitespace as understood by the C `isspace` function.
pub fn is_whitespace(c: u8) -> bool {
    matches!(c, b' ' | b'\t' | b'\n' | b'\r' | 0x0B | 0x0C)
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    find(haystack, needle).is_some()
}

/// Matches `<key> <digit>` anywhere in the line.
fn digit_after(line: &[u8], key: &[u8]) -> bool {
    find(line, key)
        .and_then(|pos| line.get(pos + key.len() + 1))
        .is_some_and(u8::is_ascii_digit)
}

fn parse_len_iv(line: &[u8]) -> Option<u32> {
    const LEN_IV: &[u8] = b"/lenIV";
    let pos = find(line, LEN_IV)?;
    let rest = &line[pos + LEN_IV.len()..];
    let start = rest.iter().position(|b| !matches!(b, b' ' | b'\t'))?;
    let digits = &rest[start..];
    let len = digits.iter().take_while(|b| b.is_ascii_digit()).count();
    if len == 0 {
        return None;
    }
    let value = std::str::from_utf8(&digits[..len]).ok()?.parse().ok();
    if value.is_none() {
        log::warn!("ignoring /lenIV out of range");
    }
    value
}

/// Finds `/<name> ... string currentfile` and returns `<name>`.
fn parse_charstring_start(line: &[u8]) -> Option<&[u8]> {
    let pos = find(line, STRING_CURRENTFILE)?;
    let slash = line[..pos].iter().rposition(|b| *b == b'/')?;
    let name = &line[slash + 1..];
    let len = name
        .iter()
        .take_while(|b| !is_whitespace(**b) && **b != b'{')
        .count();
    (len > 0).then(|| &name[..len])
}

/// Byte-at-a-time access to a buffered reader.
pub struct ByteReader<R> {
    inner: R,
}

impl<R: BufRead> ByteReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    pub fn peek(&mut self) -> io::Result<Option<u8>> {
        Ok(self.inner.fill_buf()?.first().copied())
    }

    pub fn next_byte(&mut self) -> io::Result<Option<u8>> {
        let next = self.peek()?;
        if next.is_some() {
            self.inner.consume(1);
        }
        Ok(next)
    }
}
