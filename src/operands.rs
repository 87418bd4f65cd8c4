//! Operand classification.
//!
//! A raw word in an operand position is either a literal (0..=32767), a
//! register reference (32768..=32775), or invalid. Classification happens
//! once, at instruction decode; the executor never sees an unclassified
//! word.

use crate::{REGISTER_BASE, WORD_LIMIT};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    /// A literal value; doubles as a memory address in destination
    /// position.
    Literal(u16),
    /// Register index 0..=7.
    Register(u8),
}

impl Operand {
    /// Classify a raw word. Returns `None` for words past the register
    /// window; the caller turns that into an `InvalidOperand` fault with
    /// instruction context.
    pub fn classify(word: u16) -> Option<Operand> {
        if word >= WORD_LIMIT {
            None
        } else if word >= REGISTER_BASE {
            Some(Operand::Register((word - REGISTER_BASE) as u8))
        } else {
            Some(Operand::Literal(word))
        }
    }

    /// The raw word this operand was decoded from.
    pub fn raw(self) -> u16 {
        match self {
            Operand::Literal(value) => value,
            Operand::Register(index) => REGISTER_BASE + index as u16,
        }
    }
}
