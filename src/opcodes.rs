//! Opcode table and the typed instruction form.
//!
//! Every defined opcode has a fixed total length in words (opcode
//! included); the table drives both operand fetch and pointer
//! advancement. `Instr::decode` turns the raw words at the pointer into a
//! closed tagged variant with classified operand slots, so dispatch in
//! the executor is an exhaustive match and an unrecognised opcode is the
//! only runtime-default case.

use crate::{memory::MemoryImage, operands::Operand, Result, VmError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    Halt,
    Set,
    Push,
    Pop,
    Eq,
    Gt,
    Jmp,
    Jt,
    Jf,
    Add,
    Mult,
    Mod,
    And,
    Or,
    Not,
    Rmem,
    Wmem,
    Call,
    Ret,
    Out,
    In,
    Noop,
}

pub const OPCODE_COUNT: usize = 22;

impl Opcode {
    /// Look up an opcode by its encoded word value.
    pub fn from_word(word: u16) -> Option<Opcode> {
        use Opcode::*;
        Some(match word {
            0 => Halt,
            1 => Set,
            2 => Push,
            3 => Pop,
            4 => Eq,
            5 => Gt,
            6 => Jmp,
            7 => Jt,
            8 => Jf,
            9 => Add,
            10 => Mult,
            11 => Mod,
            12 => And,
            13 => Or,
            14 => Not,
            15 => Rmem,
            16 => Wmem,
            17 => Call,
            18 => Ret,
            19 => Out,
            20 => In,
            21 => Noop,
            _ => return None,
        })
    }

    /// Total instruction length in words, opcode included. JMP's entry is
    /// table completeness only; JMP always sets the pointer explicitly.
    pub fn length(self) -> u16 {
        use Opcode::*;
        match self {
            Halt | Ret | Noop => 1,
            Push | Pop | Jmp | Call | Out | In => 2,
            Set | Jt | Jf | Not | Rmem | Wmem => 3,
            Eq | Gt | Add | Mult | Mod | And | Or => 4,
        }
    }

    pub fn mnemonic(self) -> &'static str {
        use Opcode::*;
        match self {
            Halt => "HALT",
            Set => "SET",
            Push => "PUSH",
            Pop => "POP",
            Eq => "EQ",
            Gt => "GT",
            Jmp => "JMP",
            Jt => "JT",
            Jf => "JF",
            Add => "ADD",
            Mult => "MULT",
            Mod => "MOD",
            And => "AND",
            Or => "OR",
            Not => "NOT",
            Rmem => "RMEM",
            Wmem => "WMEM",
            Call => "CALL",
            Ret => "RET",
            Out => "OUT",
            In => "IN",
            Noop => "NOOP",
        }
    }
}

/// One decoded instruction with classified operand slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instr {
    Halt,
    Set { dst: Operand, src: Operand },
    Push { src: Operand },
    Pop { dst: Operand },
    Eq { dst: Operand, lhs: Operand, rhs: Operand },
    Gt { dst: Operand, lhs: Operand, rhs: Operand },
    Jmp { target: Operand },
    Jt { cond: Operand, target: Operand },
    Jf { cond: Operand, target: Operand },
    Add { dst: Operand, lhs: Operand, rhs: Operand },
    Mult { dst: Operand, lhs: Operand, rhs: Operand },
    Mod { dst: Operand, lhs: Operand, rhs: Operand },
    And { dst: Operand, lhs: Operand, rhs: Operand },
    Or { dst: Operand, lhs: Operand, rhs: Operand },
    Not { dst: Operand, src: Operand },
    Rmem { dst: Operand, addr: Operand },
    Wmem { addr: Operand, src: Operand },
    Call { target: Operand },
    Ret,
    Out { src: Operand },
    In { dst: Operand },
    Noop,
}

impl Instr {
    /// Decode the instruction at `pointer`. An opcode word with no table
    /// entry fails before any operand fetch; an operand word past the
    /// register window fails with the instruction's mnemonic and pointer.
    pub fn decode(memory: &MemoryImage, pointer: u16) -> Result<Instr> {
        let opcode_word = memory.read(pointer);
        let opcode = Opcode::from_word(opcode_word).ok_or(VmError::UnknownOpcode {
            opcode: opcode_word,
            pointer,
        })?;

        let operand = |slot: u16| -> Result<Operand> {
            let word = memory.read(pointer.wrapping_add(slot));
            Operand::classify(word).ok_or(VmError::InvalidOperand {
                opcode: opcode.mnemonic(),
                pointer,
                word,
            })
        };

        use Opcode::*;
        Ok(match opcode {
            Halt => Instr::Halt,
            Set => Instr::Set {
                dst: operand(1)?,
                src: operand(2)?,
            },
            Push => Instr::Push { src: operand(1)? },
            Pop => Instr::Pop { dst: operand(1)? },
            Eq => Instr::Eq {
                dst: operand(1)?,
                lhs: operand(2)?,
                rhs: operand(3)?,
            },
            Gt => Instr::Gt {
                dst: operand(1)?,
                lhs: operand(2)?,
                rhs: operand(3)?,
            },
            Jmp => Instr::Jmp {
                target: operand(1)?,
            },
            Jt => Instr::Jt {
                cond: operand(1)?,
                target: operand(2)?,
            },
            Jf => Instr::Jf {
                cond: operand(1)?,
                target: operand(2)?,
            },
            Add => Instr::Add {
                dst: operand(1)?,
                lhs: operand(2)?,
                rhs: operand(3)?,
            },
            Mult => Instr::Mult {
                dst: operand(1)?,
                lhs: operand(2)?,
                rhs: operand(3)?,
            },
            Mod => Instr::Mod {
                dst: operand(1)?,
                lhs: operand(2)?,
                rhs: operand(3)?,
            },
            And => Instr::And {
                dst: operand(1)?,
                lhs: operand(2)?,
                rhs: operand(3)?,
            },
            Or => Instr::Or {
                dst: operand(1)?,
                lhs: operand(2)?,
                rhs: operand(3)?,
            },
            Not => Instr::Not {
                dst: operand(1)?,
                src: operand(2)?,
            },
            Rmem => Instr::Rmem {
                dst: operand(1)?,
                addr: operand(2)?,
            },
            Wmem => Instr::Wmem {
                addr: operand(1)?,
                src: operand(2)?,
            },
            Call => Instr::Call {
                target: operand(1)?,
            },
            Ret => Instr::Ret,
            Out => Instr::Out { src: operand(1)? },
            In => Instr::In { dst: operand(1)? },
            Noop => Instr::Noop,
        })
    }

    pub fn opcode(&self) -> Opcode {
        use Instr::*;
        match self {
            Halt => Opcode::Halt,
            Set { .. } => Opcode::Set,
            Push { .. } => Opcode::Push,
            Pop { .. } => Opcode::Pop,
            Eq { .. } => Opcode::Eq,
            Gt { .. } => Opcode::Gt,
            Jmp { .. } => Opcode::Jmp,
            Jt { .. } => Opcode::Jt,
            Jf { .. } => Opcode::Jf,
            Add { .. } => Opcode::Add,
            Mult { .. } => Opcode::Mult,
            Mod { .. } => Opcode::Mod,
            And { .. } => Opcode::And,
            Or { .. } => Opcode::Or,
            Not { .. } => Opcode::Not,
            Rmem { .. } => Opcode::Rmem,
            Wmem { .. } => Opcode::Wmem,
            Call { .. } => Opcode::Call,
            Ret => Opcode::Ret,
            Out { .. } => Opcode::Out,
            In { .. } => Opcode::In,
            Noop => Opcode::Noop,
        }
    }

    /// Operand slots in encoding order, for tracing.
    pub fn operands(&self) -> Vec<Operand> {
        use Instr::*;
        match *self {
            Halt | Ret | Noop => Vec::new(),
            Push { src } | Out { src } => vec![src],
            Pop { dst } | In { dst } => vec![dst],
            Jmp { target } | Call { target } => vec![target],
            Set { dst, src } | Not { dst, src } | Rmem { dst, addr: src } => vec![dst, src],
            Wmem { addr, src } => vec![addr, src],
            Jt { cond, target } | Jf { cond, target } => vec![cond, target],
            Eq { dst, lhs, rhs }
            | Gt { dst, lhs, rhs }
            | Add { dst, lhs, rhs }
            | Mult { dst, lhs, rhs }
            | Mod { dst, lhs, rhs }
            | And { dst, lhs, rhs }
            | Or { dst, lhs, rhs } => vec![dst, lhs, rhs],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn length_table_matches_operand_counts() {
        for word in 0..OPCODE_COUNT as u16 {
            let opcode = Opcode::from_word(word).expect("defined opcode");
            assert!((1..=4).contains(&opcode.length()), "{:?}", opcode);
        }
        assert_eq!(Opcode::from_word(22), None);
    }

    #[test]
    fn jmp_keeps_a_table_entry() {
        assert_eq!(Opcode::Jmp.length(), 2);
    }

    #[test]
    fn decode_reads_typed_operands() {
        // SET r0 3
        let memory = MemoryImage::from_words(vec![1, 32768, 3]);
        let instr = Instr::decode(&memory, 0).unwrap();
        assert_eq!(
            instr,
            Instr::Set {
                dst: Operand::Register(0),
                src: Operand::Literal(3),
            }
        );
        assert_eq!(instr.opcode().length(), 3);
    }

    #[test]
    fn unknown_opcode_fails_before_operand_fetch() {
        let memory = MemoryImage::from_words(vec![99, 32776]);
        match Instr::decode(&memory, 0) {
            Err(VmError::UnknownOpcode { opcode, pointer }) => {
                assert_eq!(opcode, 99);
                assert_eq!(pointer, 0);
            }
            other => panic!("expected UnknownOpcode, got {other:?}"),
        }
    }

    #[test]
    fn invalid_operand_carries_context() {
        // ADD r0, 32776, 1
        let memory = MemoryImage::from_words(vec![9, 32768, 32776, 1]);
        match Instr::decode(&memory, 0) {
            Err(VmError::InvalidOperand {
                opcode,
                pointer,
                word,
            }) => {
                assert_eq!(opcode, "ADD");
                assert_eq!(pointer, 0);
                assert_eq!(word, 32776);
            }
            other => panic!("expected InvalidOperand, got {other:?}"),
        }
    }

    #[test]
    fn operands_follow_encoding_order() {
        let memory = MemoryImage::from_words(vec![4, 32768, 7, 32769]);
        let instr = Instr::decode(&memory, 0).unwrap();
        let raw: Vec<u16> = instr.operands().iter().map(|op| op.raw()).collect();
        assert_eq!(raw, vec![32768, 7, 32769]);
    }
}
