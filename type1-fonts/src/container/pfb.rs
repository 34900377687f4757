//! The binary container: typed, length-prefixed blocks.
//!
//! ```text
//! 0x80 type len[4, little endian] data[len]   type 1 (ASCII) or 2 (binary)
//! 0x80 0x03                                   end of file
//! ```

use std::io::{self, BufRead, Read, Write};

use super::{SegmentKind, SegmentSink};
use crate::{error::Corruption, options::MIN_BLOCK_LEN};

pub(crate) const MARKER: u8 = 0x80;

/// Largest piece of a block returned by one read.
const CHUNK_LEN: usize = 1 << 16;

/// Reads segments out of a PFB stream.
pub struct PfbReader<R> {
    reader: R,
    position: u64,
    block_start: u64,
    remaining: u64,
    kind: SegmentKind,
    done: bool,
}

impl<R: BufRead> PfbReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            position: 0,
            block_start: 0,
            remaining: 0,
            kind: SegmentKind::Ascii,
            done: false,
        }
    }

    /// Reads the next piece of a block into `buf`.
    ///
    /// Long blocks are returned over several calls. Damage is pushed onto
    /// `corruptions` and ends the stream.
    pub fn read_segment(
        &mut self,
        buf: &mut Vec<u8>,
        corruptions: &mut Vec<Corruption>,
    ) -> io::Result<SegmentKind> {
        buf.clear();
        while !self.done {
            if self.remaining == 0 {
                self.read_header(corruptions)?;
                continue;
            }
            let want = self.remaining.min(CHUNK_LEN as u64) as usize;
            buf.resize(want, 0);
            let got = read_full(&mut self.reader, buf)?;
            buf.truncate(got);
            self.position += got as u64;
            self.remaining -= got as u64;
            if got < want {
                report(
                    corruptions,
                    Corruption::ShortBlock {
                        missing: self.remaining,
                        position: self.block_start,
                    },
                );
                self.done = true;
                if got == 0 {
                    break;
                }
            }
            return Ok(self.kind);
        }
        Ok(SegmentKind::End)
    }

    fn read_header(&mut self, corruptions: &mut Vec<Corruption>) -> io::Result<()> {
        self.block_start = self.position;
        let mut tag = [0u8; 2];
        let got = read_full(&mut self.reader, &mut tag)?;
        self.position += got as u64;
        let bad_marker = Corruption::BadMarker {
            position: self.block_start,
        };
        let kind = match (got, tag) {
            (0 | 1, _) => Err(Corruption::MissingEndMarker),
            (_, [MARKER, kind]) => SegmentKind::from_pfb_type(kind).ok_or(bad_marker),
            _ => Err(bad_marker),
        };
        let kind = match kind {
            Ok(kind) => kind,
            Err(corruption) => {
                report(corruptions, corruption);
                self.done = true;
                return Ok(());
            }
        };
        if kind == SegmentKind::End {
            self.done = true;
            if !self.reader.fill_buf()?.is_empty() {
                report(
                    corruptions,
                    Corruption::TrailingData {
                        position: self.position,
                    },
                );
            }
            return Ok(());
        }
        let mut len = [0u8; 4];
        let got = read_full(&mut self.reader, &mut len)?;
        self.position += got as u64;
        if got < len.len() {
            report(
                corruptions,
                Corruption::BadBlockLength {
                    position: self.block_start,
                },
            );
            self.done = true;
            return Ok(());
        }
        self.kind = kind;
        self.remaining = u32::from_le_bytes(len) as u64;
        log::trace!(
            "{:?} block of {} bytes at {}",
            kind,
            self.remaining,
            self.block_start
        );
        Ok(())
    }
}

fn report(corruptions: &mut Vec<Corruption>, corruption: Corruption) {
    log::error!("corrupted PFB: {corruption}");
    corruptions.push(corruption);
}

/// Reads until `buf` is full or the input ends; returns the count read.
fn read_full(reader: &mut impl Read, buf: &mut [u8]) -> io::Result<usize> {
    let mut total = 0;
    while total < buf.len() {
        match reader.read(&mut buf[total..]) {
            Ok(0) => break,
            Ok(n) => total += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(total)
}

/// Writes segments as PFB blocks.
///
/// Data is collected until the block is full or the segment kind changes.
pub struct PfbWriter<W> {
    writer: W,
    block: Vec<u8>,
    kind: SegmentKind,
    max_len: usize,
    in_binary: bool,
    binary_segments: usize,
}

impl<W: Write> PfbWriter<W> {
    /// Creates a writer whose blocks hold at most `max_len` bytes.
    ///
    /// `max_len` is raised to [`MIN_BLOCK_LEN`] if smaller.
    pub fn new(writer: W, max_len: usize) -> Self {
        Self {
            writer,
            block: Vec::new(),
            kind: SegmentKind::Ascii,
            max_len: max_len.max(MIN_BLOCK_LEN),
            in_binary: false,
            binary_segments: 0,
        }
    }

    /// Number of binary sections written, counting consecutive binary
    /// data as one section however many blocks it spans.
    pub fn binary_segments(&self) -> usize {
        self.binary_segments
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn push(&mut self, kind: SegmentKind, mut data: &[u8]) -> io::Result<()> {
        if kind != self.kind {
            self.flush_block()?;
            self.kind = kind;
        }
        while !data.is_empty() {
            if self.block.len() >= self.max_len {
                self.flush_block()?;
            }
            let take = data.len().min(self.max_len - self.block.len());
            if self.block.try_reserve(take).is_err() {
                self.shrink()?;
                continue;
            }
            self.block.extend_from_slice(&data[..take]);
            data = &data[take..];
        }
        Ok(())
    }

    fn shrink(&mut self) -> io::Result<()> {
        if self.max_len <= MIN_BLOCK_LEN {
            return Err(io::ErrorKind::OutOfMemory.into());
        }
        self.max_len = (self.max_len / 2).max(MIN_BLOCK_LEN);
        log::warn!(
            "out of memory; muddling on with a block length of {}",
            self.max_len
        );
        self.flush_block()?;
        self.block = Vec::new();
        Ok(())
    }

    fn flush_block(&mut self) -> io::Result<()> {
        if self.block.is_empty() {
            return Ok(());
        }
        let len = self.block.len() as u32;
        self.writer.write_all(&[MARKER, self.kind.pfb_type()])?;
        self.writer.write_all(&len.to_le_bytes())?;
        self.writer.write_all(&self.block)?;
        self.block.clear();
        Ok(())
    }
}

impl<W: Write> SegmentSink for PfbWriter<W> {
    fn ascii(&mut self, data: &[u8]) -> io::Result<()> {
        self.in_binary &= data.is_empty();
        self.push(SegmentKind::Ascii, data)
    }

    fn binary(&mut self, data: &[u8]) -> io::Result<()> {
        if !data.is_empty() && !self.in_binary {
            self.in_binary = true;
            self.binary_segments += 1;
        }
        self.push(SegmentKind::Binary, data)
    }

    fn end(&mut self) -> io::Result<()> {
        self.flush_block()?;
        self.writer
            .write_all(&[MARKER, SegmentKind::End.pfb_type()])?;
        self.writer.flush()
    }
}
