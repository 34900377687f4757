//! Assembling and disassembling Adobe Type 1 font programs
//!
//! Type 1 fonts are distributed as PFB (binary blocks) or PFA (text with a
//! hex encoded section) files. The private part of the font is encrypted
//! (`eexec`), and so is every glyph program (charstring) inside it, which is
//! additionally stored in a compact binary encoding.
//!
//! This crate converts between those containers and an editable text form:
//!
//! - [`disassemble`] decrypts a PFA or PFB font and writes every charstring
//!   as a `{ ... }` block of operands and operator mnemonics.
//! - [`assemble`] reverses this, producing a PFA or PFB container.
//! - [`convert`] changes only the container format.
//!
//! Assembling the output of [`disassemble`] reproduces a font made by this
//! crate byte for byte.
//!
//! Problems that do not stop processing (a damaged container, unknown
//! operators) are logged through the [`log`] crate and summarized in the
//! [`Report`] returned by each operation.
//!
//! # Example
//!
//! ```no_run
//! # let path_to_my_font_file = std::path::Path::new("");
//! use std::{fs::File, io::BufReader};
//! use type1_fonts::{assemble, disassemble, Format, Options};
//!
//! let font = BufReader::new(File::open(path_to_my_font_file).unwrap());
//! let mut text = Vec::new();
//! let report = disassemble(font, &mut text, &Options::default()).unwrap();
//! println!("{} charstrings", report.charstrings);
//!
//! let options = Options {
//!     format: Format::Pfa,
//!     ..Default::default()
//! };
//! let mut pfa = Vec::new();
//! assemble(text.as_slice(), &mut pfa, &options).unwrap();
//! ```
//!
//! The format is described in the [Adobe Type 1 Font Format][spec] book.
//!
//! [spec]: https://adobe-type-tools.github.io/font-tech-notes/pdfs/T1_SPEC.pdf

#![cfg_attr(docsrs, feature(doc_auto_cfg))]
#![forbid(unsafe_code)]

mod assemble;
pub mod charstring;
pub mod cipher;
pub mod container;
mod disassemble;
mod error;
mod options;
pub mod scanner;

pub use assemble::assemble;
pub use container::convert;
pub use disassemble::disassemble;
pub use error::{Corruption, Error, Report};
pub use options::{
    Format, Options, DEFAULT_LINE_LEN, MAX_BLOCK_LEN, MAX_LINE_LEN, MIN_BLOCK_LEN, MIN_LINE_LEN,
};
