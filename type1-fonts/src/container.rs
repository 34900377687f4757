//! Reading and writing font containers.
//!
//! A font program is carried either as PFB (binary blocks) or as PFA
//! (text with a hex encoded `eexec` section). Both are seen here as a
//! stream of [`SegmentKind::Ascii`] and [`SegmentKind::Binary`] segments
//! closed by [`SegmentKind::End`].

mod pfa;
mod pfb;

use std::io::{self, BufRead, Write};

pub use pfa::{PfaReader, PfaWriter};
pub use pfb::{PfbReader, PfbWriter};

pub(crate) use pfa::read_line;

use crate::{
    error::{Corruption, Error, Report},
    options::{Format, Options},
};

/// Type of a container segment.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SegmentKind {
    Ascii,
    Binary,
    End,
}

impl SegmentKind {
    /// Returns the kind for a PFB block type byte.
    pub fn from_pfb_type(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Ascii),
            2 => Some(Self::Binary),
            3 => Some(Self::End),
            _ => None,
        }
    }

    /// Returns the PFB block type byte.
    pub fn pfb_type(self) -> u8 {
        match self {
            Self::Ascii => 1,
            Self::Binary => 2,
            Self::End => 3,
        }
    }
}

/// Destination for container segments.
pub trait SegmentSink {
    /// Writes plain text.
    fn ascii(&mut self, data: &[u8]) -> io::Result<()>;

    /// Writes (encrypted) binary data.
    fn binary(&mut self, data: &[u8]) -> io::Result<()>;

    /// Finishes the container.
    fn end(&mut self) -> io::Result<()>;

    fn write_segment(&mut self, kind: SegmentKind, data: &[u8]) -> io::Result<()> {
        match kind {
            SegmentKind::Ascii => self.ascii(data),
            SegmentKind::Binary => self.binary(data),
            SegmentKind::End => self.end(),
        }
    }
}

enum Reader<R> {
    Pfa(PfaReader<R>),
    Pfb(PfbReader<R>),
}

/// Reads segments from either container, detected from the first byte.
pub struct ContainerReader<R> {
    inner: Reader<R>,
    corruptions: Vec<Corruption>,
    in_binary: bool,
    binary_segments: usize,
}

impl<R: BufRead> ContainerReader<R> {
    pub fn new(mut reader: R) -> io::Result<Self> {
        let first = reader.fill_buf()?.first().copied();
        let inner = match first {
            Some(pfb::MARKER) => {
                log::debug!("reading PFB");
                Reader::Pfb(PfbReader::new(reader))
            }
            _ => {
                if let Some(first) = first.filter(|b| *b != b'%') {
                    log::warn!("input starts with {first:#04x}, not '%' or 0x80; reading as PFA");
                }
                log::debug!("reading PFA");
                Reader::Pfa(PfaReader::new(reader))
            }
        };
        Ok(Self {
            inner,
            corruptions: Vec::new(),
            in_binary: false,
            binary_segments: 0,
        })
    }

    /// Returns the container format of the input.
    pub fn format(&self) -> Format {
        match self.inner {
            Reader::Pfa(_) => Format::Pfa,
            Reader::Pfb(_) => Format::Pfb,
        }
    }

    /// Reads the next segment into `buf`, replacing its contents.
    ///
    /// Returns [`SegmentKind::End`] once the input is exhausted. Container
    /// damage does not produce an error; see [`Self::corruptions`].
    pub fn read_segment(&mut self, buf: &mut Vec<u8>) -> io::Result<SegmentKind> {
        let kind = match &mut self.inner {
            Reader::Pfa(reader) => reader.read_segment(buf)?,
            Reader::Pfb(reader) => reader.read_segment(buf, &mut self.corruptions)?,
        };
        if kind == SegmentKind::Binary && !self.in_binary {
            self.binary_segments += 1;
        }
        self.in_binary = kind == SegmentKind::Binary;
        Ok(kind)
    }

    /// Damage found so far.
    pub fn corruptions(&self) -> &[Corruption] {
        &self.corruptions
    }

    /// Number of binary sections read so far.
    ///
    /// Consecutive binary blocks or hex lines count as one section.
    pub fn binary_segments(&self) -> usize {
        self.binary_segments
    }

    /// Returns the damage found, consuming the reader.
    pub fn into_corruptions(self) -> Vec<Corruption> {
        self.corruptions
    }
}

/// Writes segments in the format chosen by [`Options::format`].
pub enum ContainerWriter<W> {
    Pfa(PfaWriter<W>),
    Pfb(PfbWriter<W>),
}

impl<W: Write> ContainerWriter<W> {
    pub fn new(writer: W, options: &Options) -> Self {
        match options.format {
            Format::Pfa => Self::Pfa(PfaWriter::new(writer, options.line_len())),
            Format::Pfb => Self::Pfb(PfbWriter::new(writer, options.block_len())),
        }
    }

    /// Number of binary sections written.
    pub fn binary_segments(&self) -> usize {
        match self {
            Self::Pfa(writer) => writer.binary_segments(),
            Self::Pfb(writer) => writer.binary_segments(),
        }
    }

    pub fn into_inner(self) -> W {
        match self {
            Self::Pfa(writer) => writer.into_inner(),
            Self::Pfb(writer) => writer.into_inner(),
        }
    }
}

impl<W: Write> SegmentSink for ContainerWriter<W> {
    fn ascii(&mut self, data: &[u8]) -> io::Result<()> {
        match self {
            Self::Pfa(writer) => writer.ascii(data),
            Self::Pfb(writer) => writer.ascii(data),
        }
    }

    fn binary(&mut self, data: &[u8]) -> io::Result<()> {
        match self {
            Self::Pfa(writer) => writer.binary(data),
            Self::Pfb(writer) => writer.binary(data),
        }
    }

    fn end(&mut self) -> io::Result<()> {
        match self {
            Self::Pfa(writer) => writer.end(),
            Self::Pfb(writer) => writer.end(),
        }
    }
}

/// Copies a PFA or PFB font into the container chosen by `options`.
///
/// No decryption takes place; only the framing changes.
pub fn convert(
    input: impl BufRead,
    output: impl Write,
    options: &Options,
) -> Result<Report, Error> {
    let mut reader = ContainerReader::new(input)?;
    let mut writer = ContainerWriter::new(output, options);
    let mut buf = Vec::new();
    loop {
        match reader.read_segment(&mut buf)? {
            SegmentKind::End => break,
            kind => writer.write_segment(kind, &buf)?,
        }
    }
    writer.end()?;
    let report = Report {
        binary_segments: reader.binary_segments(),
        corruptions: reader.into_corruptions(),
        ..Default::default()
    };
    if !report.looks_like_font() {
        log::warn!("no binary segments; this doesn't look like a font");
    }
    Ok(report)
}

/// A byte range of a resource located by an external extractor.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct SegmentRange {
    pub offset: usize,
    pub len: usize,
    pub kind: SegmentKind,
}

/// Copies raw byte ranges of `data` into `sink`.
///
/// An [`SegmentKind::End`] range finishes the sink and stops the copy.
pub fn copy_ranges<S: SegmentSink + ?Sized>(
    data: &[u8],
    ranges: &[SegmentRange],
    sink: &mut S,
) -> Result<(), Error> {
    for range in ranges {
        if range.kind == SegmentKind::End {
            sink.end()?;
            return Ok(());
        }
        let bytes = range
            .offset
            .checked_add(range.len)
            .and_then(|end| data.get(range.offset..end))
            .ok_or(Error::RangeOutOfBounds {
                offset: range.offset,
                len: range.len,
                data_len: data.len(),
            })?;
        sink.write_segment(range.kind, bytes)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use type1_test_data::type1::{SAMPLE_PFA, SAMPLE_PFB};

    fn convert_to(data: &[u8], format: Format) -> (Vec<u8>, Report) {
        let options = Options {
            format,
            ..Default::default()
        };
        let mut out = Vec::new();
        let report = convert(data, &mut out, &options).unwrap();
        (out, report)
    }

    #[test]
    fn pfb_to_pfa() {
        let (pfa, report) = convert_to(SAMPLE_PFB, Format::Pfa);
        assert_eq!(pfa, SAMPLE_PFA);
        assert!(report.is_ok());
        assert!(report.looks_like_font());
    }

    #[test]
    fn pfa_to_pfb() {
        let (pfb, report) = convert_to(SAMPLE_PFA, Format::Pfb);
        assert_eq!(pfb, SAMPLE_PFB);
        assert!(report.is_ok());
    }

    #[test]
    fn same_format_is_stable() {
        assert_eq!(convert_to(SAMPLE_PFB, Format::Pfb).0, SAMPLE_PFB);
        assert_eq!(convert_to(SAMPLE_PFA, Format::Pfa).0, SAMPLE_PFA);
    }

    #[test]
    fn round_trip_through_small_blocks() {
        let options = Options {
            block_len: 0,
            ..Default::default()
        };
        let mut small = Vec::new();
        let report = convert(SAMPLE_PFA, &mut small, &options).unwrap();
        assert_eq!(report.binary_segments, 1);
        assert_ne!(small, SAMPLE_PFB);
        let (pfa, report) = convert_to(&small, Format::Pfa);
        assert_eq!(pfa, SAMPLE_PFA);
        assert_eq!(report.binary_segments, 1);
    }

    #[test]
    fn not_a_font() {
        let (out, report) = convert_to(b"%!PS\nshowpage\n", Format::Pfb);
        assert!(!report.looks_like_font());
        assert_eq!(&out[..2], [0x80, 1]);
    }

    #[test]
    fn truncated_pfb() {
        let (_, report) = convert_to(&SAMPLE_PFB[..SAMPLE_PFB.len() - 10], Format::Pfa);
        assert!(!report.is_ok());
        assert!(matches!(
            report.corruptions.as_slice(),
            [Corruption::ShortBlock { missing: 8, .. }]
        ));
    }

    #[test]
    fn detects_format() {
        assert_eq!(
            ContainerReader::new(SAMPLE_PFB).unwrap().format(),
            Format::Pfb
        );
        assert_eq!(
            ContainerReader::new(SAMPLE_PFA).unwrap().format(),
            Format::Pfa
        );
    }

    #[test]
    fn copy_resource_ranges() {
        let data = b"xx%!PS\n\x01\x02\x03yy";
        let ranges = [
            SegmentRange {
                offset: 2,
                len: 5,
                kind: SegmentKind::Ascii,
            },
            SegmentRange {
                offset: 7,
                len: 3,
                kind: SegmentKind::Binary,
            },
            SegmentRange {
                offset: 0,
                len: 0,
                kind: SegmentKind::End,
            },
        ];
        let mut writer = PfaWriter::new(Vec::new(), 64);
        copy_ranges(data, &ranges, &mut writer).unwrap();
        assert_eq!(writer.into_inner(), b"%!PS\n010203");

        let bad = [SegmentRange {
            offset: 10,
            len: 3,
            kind: SegmentKind::Ascii,
        }];
        assert!(matches!(
            copy_ranges(data, &bad, &mut PfaWriter::new(Vec::new(), 64)),
            Err(Error::RangeOutOfBounds {
                offset: 10,
                len: 3,
                data_len: 12
            })
        ));
    }
}
