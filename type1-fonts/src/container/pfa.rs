//! The ASCII container: plain text with the `eexec` section in hex.

use std::io::{self, BufRead, Write};

use super::{SegmentKind, SegmentSink};
use crate::{
    options::MIN_LINE_LEN,
    scanner::{is_eexec_line, is_whitespace},
};

/// Reads segments out of a PFA stream, one line at a time.
pub struct PfaReader<R> {
    reader: R,
    line: Vec<u8>,
    in_binary: bool,
    orphan: Option<u8>,
}

impl<R: BufRead> PfaReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: Vec::new(),
            in_binary: false,
            orphan: None,
        }
    }

    /// Reads the next line into `buf`, decoding hex lines of the `eexec`
    /// section.
    pub fn read_segment(&mut self, buf: &mut Vec<u8>) -> io::Result<SegmentKind> {
        buf.clear();
        read_line(&mut self.reader, &mut self.line)?;
        if self.line.is_empty() {
            return Ok(SegmentKind::End);
        }
        if self.in_binary {
            if is_zero_line(&self.line) {
                self.in_binary = false;
                buf.extend_from_slice(&self.line);
                return Ok(SegmentKind::Ascii);
            }
            self.decode_hex(buf);
            return Ok(SegmentKind::Binary);
        }
        if is_eexec_line(&self.line) {
            self.in_binary = true;
        }
        buf.extend_from_slice(&self.line);
        Ok(SegmentKind::Ascii)
    }

    // An odd digit at the end of a line pairs with the first digit of the
    // next one.
    fn decode_hex(&mut self, buf: &mut Vec<u8>) {
        for c in self.line.iter().copied().filter(|c| !is_whitespace(*c)) {
            match self.orphan.take() {
                Some(high) => buf.push(hex_value(high) << 4 | hex_value(c)),
                None => self.orphan = Some(c),
            }
        }
    }
}

/// Reads one line, normalizing `\r` and `\r\n` to `\n`.
///
/// Leaves `line` empty at the end of input.
pub(crate) fn read_line(reader: &mut impl BufRead, line: &mut Vec<u8>) -> io::Result<()> {
    line.clear();
    loop {
        let available = reader.fill_buf()?;
        if available.is_empty() {
            return Ok(());
        }
        match available.iter().position(|b| matches!(b, b'\n' | b'\r')) {
            Some(ix) => {
                let cr = available[ix] == b'\r';
                line.extend_from_slice(&available[..ix]);
                line.push(b'\n');
                reader.consume(ix + 1);
                if cr && reader.fill_buf()?.first() == Some(&b'\n') {
                    reader.consume(1);
                }
                return Ok(());
            }
            None => {
                let len = available.len();
                line.extend_from_slice(available);
                reader.consume(len);
            }
        }
    }
}

/// A line of `0` digits, optionally followed by whitespace.
fn is_zero_line(line: &[u8]) -> bool {
    let zeros = line.iter().take_while(|b| **b == b'0').count();
    zeros > 0 && line[zeros..].iter().copied().all(is_whitespace)
}

/// Value of a hex digit; anything else counts as 0.
fn hex_value(c: u8) -> u8 {
    match c {
        b'0'..=b'9' => c - b'0',
        b'a'..=b'f' => c - b'a' + 10,
        b'A'..=b'F' => c - b'A' + 10,
        _ => 0,
    }
}

const HEX_DIGITS: &[u8; 16] = b"0123456789abcdef";

/// Writes segments as PFA text.
pub struct PfaWriter<W> {
    writer: W,
    line_len: usize,
    column: usize,
    pending_cr: bool,
    scratch: Vec<u8>,
    in_binary: bool,
    binary_segments: usize,
}

impl<W: Write> PfaWriter<W> {
    /// Creates a writer wrapping hex output after `line_len` digits.
    ///
    /// `line_len` is raised to [`MIN_LINE_LEN`] if smaller.
    pub fn new(writer: W, line_len: usize) -> Self {
        Self {
            writer,
            line_len: line_len.max(MIN_LINE_LEN),
            column: 0,
            pending_cr: false,
            scratch: Vec::new(),
            in_binary: false,
            binary_segments: 0,
        }
    }

    pub fn binary_segments(&self) -> usize {
        self.binary_segments
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> SegmentSink for PfaWriter<W> {
    fn ascii(&mut self, data: &[u8]) -> io::Result<()> {
        self.in_binary &= data.is_empty();
        self.scratch.clear();
        if self.column > 0 {
            self.scratch.push(b'\n');
            self.column = 0;
        }
        for &b in data {
            if std::mem::take(&mut self.pending_cr) && b == b'\n' {
                continue;
            }
            if b == b'\r' {
                self.scratch.push(b'\n');
                self.pending_cr = true;
            } else {
                self.scratch.push(b);
            }
        }
        self.writer.write_all(&self.scratch)
    }

    fn binary(&mut self, data: &[u8]) -> io::Result<()> {
        if !data.is_empty() && !self.in_binary {
            self.in_binary = true;
            self.binary_segments += 1;
        }
        self.pending_cr = false;
        self.scratch.clear();
        for &b in data {
            if self.column >= self.line_len {
                self.scratch.push(b'\n');
                self.column = 0;
            }
            self.scratch.push(HEX_DIGITS[(b >> 4) as usize]);
            self.scratch.push(HEX_DIGITS[(b & 0xF) as usize]);
            self.column += 2;
        }
        self.writer.write_all(&self.scratch)
    }

    fn end(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_all(data: &[u8]) -> Vec<(SegmentKind, Vec<u8>)> {
        let mut reader = PfaReader::new(data);
        let mut buf = vec![];
        let mut segments = vec![];
        loop {
            match reader.read_segment(&mut buf).unwrap() {
                SegmentKind::End => break,
                kind => segments.push((kind, buf.clone())),
            }
        }
        segments
    }

    #[test]
    fn line_endings() {
        let mut reader = &b"a\rb\r\nc\n\nd"[..];
        let mut line = vec![];
        let mut lines = vec![];
        loop {
            read_line(&mut reader, &mut line).unwrap();
            if line.is_empty() {
                break;
            }
            lines.push(String::from_utf8(line.clone()).unwrap());
        }
        assert_eq!(lines, ["a\n", "b\n", "c\n", "\n", "d"]);
    }

    #[test]
    fn hex_section() {
        let segments = read_all(b"%!\ncurrentfile eexec\r\nA0b\n1 c\n0000\ncleartomark\n");
        assert_eq!(
            segments,
            [
                (SegmentKind::Ascii, b"%!\n".to_vec()),
                (SegmentKind::Ascii, b"currentfile eexec\n".to_vec()),
                (SegmentKind::Binary, vec![0xa0]),
                // orphan digit carried over from the previous line
                (SegmentKind::Binary, vec![0xb1]),
                (SegmentKind::Ascii, b"0000\n".to_vec()),
                (SegmentKind::Ascii, b"cleartomark\n".to_vec()),
            ]
        );
    }

    #[test]
    fn zero_lines() {
        assert!(is_zero_line(b"0\n"));
        assert!(is_zero_line(b"0000 \t\n"));
        assert!(!is_zero_line(b"\n"));
        assert!(!is_zero_line(b"00a0\n"));
    }

    #[test]
    fn invalid_digits_are_zero() {
        let segments = read_all(b"currentfile eexec\nzz1g\n");
        assert_eq!(segments[1], (SegmentKind::Binary, vec![0x00, 0x10]));
    }

    #[test]
    fn write_text_and_hex() {
        let mut writer = PfaWriter::new(Vec::new(), 4);
        writer.ascii(b"a\r").unwrap();
        writer.ascii(b"\nb\r\n").unwrap();
        writer.binary(&[0xde, 0xad, 0xbe]).unwrap();
        writer.binary(&[0xef]).unwrap();
        writer.ascii(b"0000\n").unwrap();
        writer.end().unwrap();
        assert_eq!(writer.binary_segments(), 1);
        assert_eq!(
            String::from_utf8(writer.into_inner()).unwrap(),
            "a\nb\ndead\nbeef\n0000\n"
        );
    }

    #[test]
    fn tiny_line_length_is_raised() {
        let mut writer = PfaWriter::new(Vec::new(), 0);
        writer.binary(b"abc").unwrap();
        writer.end().unwrap();
        assert_eq!(String::from_utf8(writer.into_inner()).unwrap(), "61\n62\n63");
    }
}
