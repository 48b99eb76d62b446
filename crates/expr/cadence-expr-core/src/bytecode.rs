//! Byte-code words and their 32-bit wire encoding.
//!
//! In memory a program is a list of [`Word`]s. The NaN-tagged `u32` form only
//! exists at the resource boundary: a word is a float literal unless its top
//! 12 bits are one of the reserved tags below, in which case the low 20 bits
//! carry an opcode id or a variable index. All three tags are NaN or infinity
//! bit patterns, and the compiler never emits non-finite literals.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::DecodeError;
use crate::functions::OpCode;

pub const TAG_SHIFT: u32 = 20;
pub const TAG_MASK: u32 = 0xfff << TAG_SHIFT;
pub const PAYLOAD_MASK: u32 = (1 << TAG_SHIFT) - 1;

pub const FUNCTION_TAG: u32 = 0x7f8 << TAG_SHIFT;
pub const PUSH_VARIABLE_TAG: u32 = 0x7f9 << TAG_SHIFT;
pub const END_TAG: u32 = 0x7fa << TAG_SHIFT;

/// Largest variable index a `PushVariable` word can carry.
pub const MAX_VARIABLE_INDEX: u32 = PAYLOAD_MASK;

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Word {
    Literal(f32),
    PushVariable(u32),
    Call(OpCode),
    End,
}

#[inline]
fn is_reserved(raw: u32) -> bool {
    matches!(raw & TAG_MASK, FUNCTION_TAG | PUSH_VARIABLE_TAG | END_TAG)
}

impl Word {
    pub fn encode(self) -> u32 {
        match self {
            Word::Literal(value) => {
                let raw = value.to_bits();
                debug_assert!(!is_reserved(raw), "literal {value} aliases a tag");
                raw
            }
            Word::PushVariable(index) => {
                debug_assert!(index <= MAX_VARIABLE_INDEX);
                PUSH_VARIABLE_TAG | (index & PAYLOAD_MASK)
            }
            Word::Call(op) => FUNCTION_TAG | op.id(),
            Word::End => END_TAG,
        }
    }

    pub fn decode(raw: u32) -> Result<Word, DecodeError> {
        let payload = raw & PAYLOAD_MASK;
        match raw & TAG_MASK {
            FUNCTION_TAG => OpCode::from_id(payload)
                .map(Word::Call)
                .ok_or(DecodeError::UnknownOpCode(payload)),
            PUSH_VARIABLE_TAG => Ok(Word::PushVariable(payload)),
            END_TAG => Ok(Word::End),
            _ => Ok(Word::Literal(f32::from_bits(raw))),
        }
    }
}

impl fmt::Display for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Word::Literal(v) => write!(f, "push {v}"),
            Word::PushVariable(i) => write!(f, "load ${i}"),
            Word::Call(op) => write!(f, "call {}", op.mnemonic()),
            Word::End => f.write_str("end"),
        }
    }
}

/// Decode a raw word slice without stopping at `End` (used for whole blobs).
pub fn decode_words(raw: &[u32]) -> Result<Vec<Word>, (usize, DecodeError)> {
    raw.iter()
        .enumerate()
        .map(|(i, w)| Word::decode(*w).map_err(|e| (i, e)))
        .collect()
}

/// A compiled expression. Always terminated by exactly one `End`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Program {
    words: Vec<Word>,
}

impl Program {
    /// Callers guarantee `words` ends with the only `End`.
    pub(crate) fn from_words(words: Vec<Word>) -> Self {
        debug_assert_eq!(words.last(), Some(&Word::End));
        Self { words }
    }

    /// Program that pushes a single literal.
    pub fn constant(value: f32) -> Self {
        Self::from_words(vec![Word::Literal(value), Word::End])
    }

    /// Decode the first program found in `raw` (everything up to and including `End`).
    pub fn decode(raw: &[u32]) -> Result<Program, DecodeError> {
        let mut words = Vec::new();
        for w in raw {
            let word = Word::decode(*w)?;
            words.push(word);
            if word == Word::End {
                return Ok(Self { words });
            }
        }
        Err(DecodeError::Unterminated)
    }

    pub fn words(&self) -> &[Word] {
        &self.words
    }

    /// Number of words including the terminating `End`.
    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// `Some(v)` when the program folded down to a single literal.
    pub fn as_constant(&self) -> Option<f32> {
        match self.words.as_slice() {
            [Word::Literal(v), Word::End] => Some(*v),
            _ => None,
        }
    }

    pub fn encode(&self) -> Vec<u32> {
        self.words.iter().map(|w| w.encode()).collect()
    }

    /// Write as many words as fit into `out` and return the number required.
    /// A return value larger than `out.len()` means the output was truncated.
    pub fn encode_into(&self, out: &mut [u32]) -> usize {
        for (slot, word) in out.iter_mut().zip(self.words.iter()) {
            *slot = word.encode();
        }
        self.words.len()
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, word) in self.words.iter().enumerate() {
            writeln!(f, "{i:4}  {word}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_match_wire_format() {
        assert_eq!(Word::Call(OpCode::Add).encode(), 0x7f80_0000);
        assert_eq!(Word::Call(OpCode::Match2d).encode(), 0x7f80_000a);
        assert_eq!(Word::PushVariable(3).encode(), 0x7f90_0003);
        assert_eq!(Word::End.encode(), 0x7fa0_0000);
        assert_eq!(Word::Literal(1.0).encode(), 0x3f80_0000);
    }

    #[test]
    fn decode_classifies_by_top_bits() {
        assert_eq!(Word::decode(0x7f80_0009), Ok(Word::Call(OpCode::Match)));
        assert_eq!(Word::decode(0x7f90_0001), Ok(Word::PushVariable(1)));
        assert_eq!(Word::decode(0x7fa0_0000), Ok(Word::End));
        assert_eq!(Word::decode(0xbf80_0000), Ok(Word::Literal(-1.0)));
        assert_eq!(
            Word::decode(0x7f80_0042),
            Err(DecodeError::UnknownOpCode(0x42))
        );
    }

    #[test]
    fn decode_program_stops_at_end() {
        let raw = [0x4000_0000, 0x7fa0_0000, 0x3f80_0000];
        let program = Program::decode(&raw).unwrap();
        assert_eq!(program.as_constant(), Some(2.0));
        assert_eq!(
            Program::decode(&raw[..1]),
            Err(DecodeError::Unterminated)
        );
    }

    #[test]
    fn encode_into_reports_required_size_when_truncated() {
        let program = Program::from_words(vec![
            Word::PushVariable(0),
            Word::Literal(2.0),
            Word::Call(OpCode::Mul),
            Word::End,
        ]);
        let mut out = [0u32; 2];
        assert_eq!(program.encode_into(&mut out), 4);
        assert_eq!(out, [0x7f90_0000, 0x4000_0000]);
    }

    #[test]
    fn listing_names_each_word() {
        let program = Program::from_words(vec![
            Word::PushVariable(1),
            Word::Call(OpCode::Abs),
            Word::End,
        ]);
        let listing = program.to_string();
        assert!(listing.contains("load $1"));
        assert!(listing.contains("call abs"));
        assert!(listing.trim_end().ends_with("end"));
    }
}
