//! Charstring token codec.
//!
//! A charstring is a sequence of integer operands and operator opcodes,
//! encrypted with its own [`Cipher`] and prefixed by `lenIV` random bytes.
//! The [`Encoder`] builds one from text tokens and the [`Decoder`] turns the
//! encrypted bytes back into [`Token`]s.
//!
//! See "6 CharString Encoding" in the Adobe Type 1 Font Format
//! specification.

mod ops;

pub use ops::Opcode;

use crate::{cipher::Cipher, error::Error};
use ops::{ESCAPE, SHORT_INT};

/// Maximum size of an encoded charstring, including `lenIV` bytes.
pub const MAX_CHARSTRING_LEN: usize = 65535;

/// Default number of random bytes at the start of a charstring.
pub const DEFAULT_LEN_IV: u32 = 4;

/// One element of a decoded charstring.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Token {
    Int(i32),
    Op(Opcode),
}

/// Appends the shortest encoding of `value`.
///
/// ```text
/// -107..=107          v + 139
/// 108..=1131          (v - 108) / 256 + 247, (v - 108) % 256
/// -1131..=-108        (-v - 108) / 256 + 251, (-v - 108) % 256
/// otherwise           255, 32-bit big endian
/// ```
pub fn encode_int(value: i32, out: &mut Vec<u8>) {
    match value {
        -107..=107 => out.push((value + 139) as u8),
        108..=1131 => {
            let v = value - 108;
            out.extend_from_slice(&[(v / 256 + 247) as u8, (v % 256) as u8]);
        }
        -1131..=-108 => {
            let v = -value - 108;
            out.extend_from_slice(&[(v / 256 + 251) as u8, (v % 256) as u8]);
        }
        _ => {
            out.push(255);
            out.extend_from_slice(&value.to_be_bytes());
        }
    }
}

/// Builds one encrypted charstring from text tokens.
#[derive(Clone, Debug)]
pub struct Encoder {
    cipher: Cipher,
    data: Vec<u8>,
    scratch: Vec<u8>,
    unknown: u32,
}

impl Encoder {
    /// Starts a charstring with `len_iv` padding bytes.
    pub fn new(len_iv: u32) -> Result<Self, Error> {
        let mut encoder = Self {
            cipher: Cipher::charstring(),
            data: Vec::new(),
            scratch: Vec::new(),
            unknown: 0,
        };
        let len_iv = usize::try_from(len_iv).unwrap_or(usize::MAX);
        if len_iv > MAX_CHARSTRING_LEN {
            return Err(Error::CharstringOverflow {
                limit: MAX_CHARSTRING_LEN,
            });
        }
        encoder.scratch.resize(len_iv, 0);
        encoder.flush_scratch()?;
        Ok(encoder)
    }

    pub fn push_int(&mut self, value: i32) -> Result<(), Error> {
        encode_int(value, &mut self.scratch);
        self.flush_scratch()
    }

    pub fn push_op(&mut self, opcode: Opcode) -> Result<(), Error> {
        opcode.encode(&mut self.scratch);
        self.flush_scratch()
    }

    /// Encodes a single text token: an integer or a mnemonic.
    ///
    /// Tokens that cannot be encoded are logged, counted and skipped.
    /// Integers outside the 32-bit range are encoded as 0.
    pub fn push_word(&mut self, word: &[u8]) -> Result<(), Error> {
        let Ok(text) = std::str::from_utf8(word) else {
            return self.unknown_word(word);
        };
        if is_integer(text) {
            let value = match text.parse::<i32>() {
                Ok(value) => value,
                Err(_) => {
                    log::error!("integer {text} out of range");
                    self.unknown += 1;
                    0
                }
            };
            return self.push_int(value);
        }
        match Opcode::from_name(text) {
            Some(opcode) => self.push_op(opcode),
            None => self.unknown_word(word),
        }
    }

    fn unknown_word(&mut self, word: &[u8]) -> Result<(), Error> {
        log::error!(
            "unknown charstring command '{}'",
            String::from_utf8_lossy(word)
        );
        self.unknown += 1;
        Ok(())
    }

    fn flush_scratch(&mut self) -> Result<(), Error> {
        if self.data.len() + self.scratch.len() > MAX_CHARSTRING_LEN {
            return Err(Error::CharstringOverflow {
                limit: MAX_CHARSTRING_LEN,
            });
        }
        for b in self.scratch.drain(..) {
            self.data.push(self.cipher.encrypt(b));
        }
        Ok(())
    }

    /// Number of tokens that could not be encoded.
    pub fn unknown_count(&self) -> u32 {
        self.unknown
    }

    /// Returns the encrypted charstring.
    pub fn finish(self) -> Vec<u8> {
        self.data
    }
}

/// Matches `[+-]?[0-9]+`.
fn is_integer(text: &str) -> bool {
    let digits = text.strip_prefix(['+', '-']).unwrap_or(text);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

/// Decrypts and decodes one charstring.
///
/// Decoding stops when the declared length is used up, not at any
/// particular operator. Operand bytes are taken even if they run past the
/// declared length.
pub struct Decoder<I> {
    bytes: I,
    cipher: Cipher,
    remaining: i64,
}

impl<I: Iterator<Item = u8>> Decoder<I> {
    /// Creates a decoder over `len` encrypted bytes, skipping `len_iv`
    /// padding bytes.
    pub fn new(bytes: I, len: i64, len_iv: u32) -> Self {
        let mut decoder = Self {
            bytes,
            cipher: Cipher::charstring(),
            remaining: len,
        };
        for _ in 0..len_iv {
            decoder.remaining -= 1;
            if decoder.next_byte().is_none() {
                break;
            }
        }
        decoder
    }

    fn next_byte(&mut self) -> Option<u8> {
        let b = self.bytes.next()?;
        Some(self.cipher.decrypt(b))
    }

    fn take<const N: usize>(&mut self) -> Option<[u8; N]> {
        self.remaining -= N as i64;
        let mut buf = [0u8; N];
        for b in buf.iter_mut() {
            *b = self.next_byte()?;
        }
        Some(buf)
    }
}

impl<I: Iterator<Item = u8>> Iterator for Decoder<I> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        if self.remaining <= 0 {
            return None;
        }
        self.remaining -= 1;
        let b0 = self.next_byte()?;
        Some(match b0 {
            32..=246 => Token::Int(b0 as i32 - 139),
            247..=250 => {
                let [b1] = self.take()?;
                Token::Int((b0 as i32 - 247) * 256 + b1 as i32 + 108)
            }
            251..=254 => {
                let [b1] = self.take()?;
                Token::Int(-(b0 as i32 - 251) * 256 - b1 as i32 - 108)
            }
            255 => Token::Int(i32::from_be_bytes(self.take()?)),
            SHORT_INT => Token::Int(i16::from_be_bytes(self.take()?) as i32),
            ESCAPE => {
                let [b1] = self.take()?;
                Token::Op(Opcode::Escape(b1))
            }
            _ => Token::Op(Opcode::OneByte(b0)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cipher::{self, CHARSTRING_SEED};
    use rand::Rng;

    fn decode_plain(plain: &[u8]) -> Vec<Token> {
        let len = plain.len() as i64 + 4;
        let bytes = cipher::encrypt([0u8; 4].iter().chain(plain).copied(), CHARSTRING_SEED);
        Decoder::new(bytes, len, 4).collect()
    }

    fn encoded(value: i32) -> Vec<u8> {
        let mut out = vec![];
        encode_int(value, &mut out);
        out
    }

    #[test]
    fn int_size_classes() {
        assert_eq!(encoded(0), [139]);
        assert_eq!(encoded(-107), [32]);
        assert_eq!(encoded(107), [246]);
        assert_eq!(encoded(108), [247, 0]);
        assert_eq!(encoded(1131), [250, 255]);
        assert_eq!(encoded(-108), [251, 0]);
        assert_eq!(encoded(-1131), [254, 255]);
        assert_eq!(encoded(1132), [255, 0, 0, 4, 108]);
        assert_eq!(encoded(-1132), [255, 255, 255, 251, 148]);
        assert_eq!(encoded(i32::MIN), [255, 0x80, 0, 0, 0]);
    }

    #[test]
    fn sampled_ints_round_trip() {
        let mut rng = rand::thread_rng();
        let mut values = vec![i32::MIN, i32::MAX, -1132, 1132, -1131, 1131, 0];
        values.extend((0..2000).map(|_| rng.gen_range(-2000..2000)));
        values.extend((0..2000).map(|_| rng.gen::<i32>()));
        for value in values {
            let bytes = encoded(value);
            let expected_len = match value.unsigned_abs() {
                0..=107 => 1,
                108..=1131 => 2,
                _ => 5,
            };
            assert_eq!(bytes.len(), expected_len, "{value}");
            assert_eq!(decode_plain(&bytes), [Token::Int(value)]);
        }
    }

    #[test]
    fn short_int() {
        assert_eq!(
            decode_plain(&[28, 0x80, 0x00, 28, 0x01, 0x00]),
            [Token::Int(-32768), Token::Int(256)]
        );
    }

    #[test]
    fn escape_opcodes() {
        assert_eq!(
            decode_plain(&[12, 16, 12, 38, 15]),
            [
                Token::Op(Opcode::Escape(16)),
                Token::Op(Opcode::Escape(38)),
                Token::Op(Opcode::OneByte(15)),
            ]
        );
    }

    #[test]
    fn rmoveto_endchar() {
        let mut encoder = Encoder::new(4).unwrap();
        for word in ["100", "200", "rmoveto", "endchar"] {
            encoder.push_word(word.as_bytes()).unwrap();
        }
        assert_eq!(encoder.unknown_count(), 0);
        let data = encoder.finish();
        assert_eq!(data.len(), 9);
        let plain = cipher::decrypt(data.iter().copied(), CHARSTRING_SEED).collect::<Vec<_>>();
        assert_eq!(&plain[4..], [239, 247, 92, 21, 14]);
        let tokens = Decoder::new(data.into_iter(), 9, 4).collect::<Vec<_>>();
        assert_eq!(
            tokens,
            [
                Token::Int(100),
                Token::Int(200),
                Token::Op(Opcode::OneByte(21)),
                Token::Op(Opcode::OneByte(14)),
            ]
        );
    }

    #[test]
    fn only_padding_decodes_to_nothing() {
        let data = Encoder::new(4).unwrap().finish();
        assert_eq!(data.len(), 4);
        assert_eq!(Decoder::new(data.into_iter(), 4, 4).count(), 0);
    }

    #[test]
    fn length_counter_stops_decoding() {
        // trailing bytes beyond the declared length are left alone
        let mut bytes = cipher::encrypt([0, 0, 0, 0, 139, 14, 139].into_iter(), CHARSTRING_SEED);
        let tokens = Decoder::new(bytes.by_ref(), 5, 4).collect::<Vec<_>>();
        assert_eq!(tokens, [Token::Int(0)]);
        assert_eq!(bytes.count(), 2);
    }

    #[test]
    fn unknown_words_are_skipped() {
        let mut encoder = Encoder::new(0).unwrap();
        encoder.push_word(b"moveto").unwrap();
        encoder.push_word(b"escape_999").unwrap();
        encoder.push_word(b"99999999999").unwrap();
        encoder.push_word(b"UNKNOWN_15").unwrap();
        assert_eq!(encoder.unknown_count(), 3);
        let plain = cipher::decrypt(encoder.finish().into_iter(), CHARSTRING_SEED)
            .collect::<Vec<_>>();
        // the out of range integer becomes 0
        assert_eq!(plain, [139, 15]);
    }

    #[test]
    fn signed_integers() {
        assert!(is_integer("+12"));
        assert!(is_integer("-0"));
        assert!(!is_integer("-"));
        assert!(!is_integer("1.5"));
        assert!(!is_integer("+-1"));
    }

    #[test]
    fn overflow() {
        let mut encoder = Encoder::new(4).unwrap();
        let result = (0..MAX_CHARSTRING_LEN).try_for_each(|_| encoder.push_int(0));
        assert!(matches!(
            result,
            Err(Error::CharstringOverflow {
                limit: MAX_CHARSTRING_LEN
            })
        ));
        assert!(Encoder::new(70000).is_err());
    }
}
