//! Charstring operators and their mnemonics.

use std::{fmt, sync::OnceLock};

/// Escape opcode for accessing two byte operators.
pub const ESCAPE: u8 = 12;

/// Opcode followed by a 16-bit integer operand.
pub const SHORT_INT: u8 = 28;

/// A charstring command opcode.
///
/// Type 1 and Type 2 operators share one namespace here: the codec only
/// needs to round-trip them, not to interpret them.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum Opcode {
    /// A single byte opcode.
    OneByte(u8),
    /// A two byte opcode: [`ESCAPE`] followed by this byte.
    Escape(u8),
}

use Opcode::{Escape, OneByte};

/// Known operators, sorted by mnemonic.
///
/// This single table drives both directions of the codec.
static OPERATORS: &[(&str, Opcode)] = &[
    ("abs", Escape(9)),
    ("add", Escape(10)),
    ("and", Escape(3)),
    ("blend", OneByte(16)),
    ("callgsubr", OneByte(29)),
    ("callothersubr", Escape(16)),
    ("callsubr", OneByte(10)),
    ("closepath", OneByte(9)),
    ("cntrmask", OneByte(20)),
    ("div", Escape(12)),
    ("dotsection", Escape(0)),
    ("drop", Escape(18)),
    ("dup", Escape(27)),
    ("endchar", OneByte(14)),
    ("eq", Escape(15)),
    ("error", OneByte(0)),
    ("exch", Escape(28)),
    ("flex", Escape(35)),
    ("flex1", Escape(37)),
    ("get", Escape(21)),
    ("hflex", Escape(34)),
    ("hflex1", Escape(36)),
    ("hhcurveto", OneByte(27)),
    ("hintmask", OneByte(19)),
    ("hlineto", OneByte(6)),
    ("hmoveto", OneByte(22)),
    ("hsbw", OneByte(13)),
    ("hstem", OneByte(1)),
    ("hstem3", Escape(2)),
    ("hstemhm", OneByte(18)),
    ("hvcurveto", OneByte(31)),
    ("ifelse", Escape(22)),
    ("index", Escape(29)),
    ("load", Escape(13)),
    ("mul", Escape(24)),
    ("neg", Escape(14)),
    ("not", Escape(5)),
    ("or", Escape(4)),
    ("pop", Escape(17)),
    ("put", Escape(20)),
    ("random", Escape(23)),
    ("rcurveline", OneByte(24)),
    ("return", OneByte(11)),
    ("rlinecurve", OneByte(25)),
    ("rlineto", OneByte(5)),
    ("rmoveto", OneByte(21)),
    ("roll", Escape(30)),
    ("rrcurveto", OneByte(8)),
    ("sbw", Escape(7)),
    ("seac", Escape(6)),
    ("setcurrentpoint", Escape(33)),
    ("sqrt", Escape(26)),
    ("store", Escape(8)),
    ("sub", Escape(11)),
    ("vhcurveto", OneByte(30)),
    ("vlineto", OneByte(7)),
    ("vmoveto", OneByte(4)),
    ("vstem", OneByte(3)),
    ("vstem3", Escape(1)),
    ("vstemhm", OneByte(23)),
    ("vvcurveto", OneByte(26)),
];

/// Opcode to mnemonic lookup, derived from [`OPERATORS`].
struct Names {
    one_byte: [Option<&'static str>; 256],
    escape: [Option<&'static str>; 256],
}

fn names() -> &'static Names {
    static NAMES: OnceLock<Names> = OnceLock::new();
    NAMES.get_or_init(|| {
        let mut names = Names {
            one_byte: [None; 256],
            escape: [None; 256],
        };
        for (name, opcode) in OPERATORS {
            match *opcode {
                OneByte(b) => names.one_byte[b as usize] = Some(*name),
                Escape(b) => names.escape[b as usize] = Some(*name),
            }
        }
        names
    })
}

impl Opcode {
    /// Returns the mnemonic of a known operator.
    pub fn name(self) -> Option<&'static str> {
        match self {
            OneByte(b) => names().one_byte[b as usize],
            Escape(b) => names().escape[b as usize],
        }
    }

    /// Resolves a mnemonic, including the synthetic `escape_<n>`,
    /// `UNKNOWN_12_<n>` and `UNKNOWN_<n>` forms.
    pub fn from_name(name: &str) -> Option<Self> {
        if let Ok(ix) = OPERATORS.binary_search_by(|(key, _)| key.cmp(&name)) {
            return Some(OPERATORS[ix].1);
        }
        if let Some(n) = name.strip_prefix("escape_") {
            parse_byte(n).map(Escape)
        } else if let Some(n) = name.strip_prefix("UNKNOWN_12_") {
            parse_byte(n).map(Escape)
        } else if let Some(n) = name.strip_prefix("UNKNOWN_") {
            parse_byte(n).map(OneByte)
        } else {
            None
        }
    }

    /// Appends the encoded opcode.
    pub fn encode(self, out: &mut Vec<u8>) {
        match self {
            OneByte(b) => out.push(b),
            Escape(b) => out.extend_from_slice(&[ESCAPE, b]),
        }
    }
}

fn parse_byte(digits: &str) -> Option<u8> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Writes the mnemonic, or `escape_<n>` / `UNKNOWN_<n>` for unknown opcodes.
impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.name(), self) {
            (Some(name), _) => f.write_str(name),
            (None, Escape(b)) => write!(f, "escape_{b}"),
            (None, OneByte(b)) => write!(f, "UNKNOWN_{b}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_is_sorted() {
        for pair in OPERATORS.windows(2) {
            assert!(pair[0].0 < pair[1].0, "{} >= {}", pair[0].0, pair[1].0);
        }
    }

    #[test]
    fn table_is_invertible() {
        for (name, opcode) in OPERATORS {
            assert_eq!(opcode.name(), Some(*name));
            assert_eq!(Opcode::from_name(name), Some(*opcode));
        }
    }

    #[test]
    fn every_opcode_round_trips_through_text() {
        for b in 0..=255u8 {
            for opcode in [OneByte(b), Escape(b)] {
                let text = opcode.to_string();
                assert_eq!(Opcode::from_name(&text), Some(opcode), "{text}");
            }
        }
    }

    #[test]
    fn synthetic_names() {
        assert_eq!(OneByte(15).to_string(), "UNKNOWN_15");
        assert_eq!(Escape(38).to_string(), "escape_38");
        assert_eq!(Opcode::from_name("UNKNOWN_12_38"), Some(Escape(38)));
        assert_eq!(Opcode::from_name("UNKNOWN_2"), Some(OneByte(2)));
        assert_eq!(Opcode::from_name("escape_256"), None);
        assert_eq!(Opcode::from_name("escape_+1"), None);
        assert_eq!(Opcode::from_name("escape_"), None);
        assert_eq!(Opcode::from_name("escape"), None);
        assert_eq!(Opcode::from_name("moveto"), None);
    }

    #[test]
    fn type2_operators() {
        assert_eq!(Opcode::from_name("flex"), Some(Escape(35)));
        assert_eq!(Opcode::from_name("hflex1"), Some(Escape(36)));
        assert_eq!(Opcode::from_name("cntrmask"), Some(OneByte(20)));
        assert_eq!(OneByte(SHORT_INT).name(), None);
    }

    #[test]
    fn encode() {
        let mut out = vec![];
        Opcode::from_name("rmoveto").unwrap().encode(&mut out);
        Opcode::from_name("callothersubr").unwrap().encode(&mut out);
        assert_eq!(out, [21, 12, 16]);
    }
}
