//! Interpreter core for a 16-bit-word console virtual machine.
//!
//! The machine executes a little-endian binary image against a
//! word-addressed memory, eight registers, and an unbounded stack. All
//! arithmetic is modulo 32768; operand words at or above
//! [`REGISTER_BASE`] address the register file instead of naming a
//! literal. Character input is cooperative: the run loop suspends at an
//! `IN` instruction whenever the pending-input queue is empty and resumes
//! once the front end feeds another line.

use thiserror::Error;

pub mod decode;
pub mod exec;
pub mod input;
pub mod memory;
pub mod opcodes;
pub mod operands;
pub mod session;
pub mod state;
pub mod trace;

pub use decode::{decode_image, encode_image};
pub use exec::{ExecContext, Machine, RunExit, StepOutcome};
pub use input::InputQueue;
pub use memory::MemoryImage;
pub use opcodes::{Instr, Opcode};
pub use operands::Operand;
pub use session::SessionLog;
pub use state::MachineState;
pub use trace::TraceSink;

/// Arithmetic modulus; also the first word value that no longer names a
/// memory literal.
pub const MODULUS: u16 = 32768;
/// First word value that addresses the register file.
pub const REGISTER_BASE: u16 = 32768;
/// Size of the register file.
pub const REGISTER_COUNT: usize = 8;
/// First invalid word value (one past register 7).
pub const WORD_LIMIT: u16 = REGISTER_BASE + REGISTER_COUNT as u16;
/// Character code appended to every fed input line.
pub const LINE_TERMINATOR: u16 = 10;

pub type Result<T> = std::result::Result<T, VmError>;

/// Fatal conditions. None of these are recoverable in place: each one
/// terminates the run loop and carries enough context (opcode, pointer,
/// implicated word) to diagnose the failing instruction.
#[derive(Debug, Error)]
pub enum VmError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid operand word {word} for {opcode} at pointer {pointer}")]
    InvalidOperand {
        opcode: &'static str,
        pointer: u16,
        word: u16,
    },
    #[error("stack underflow in {opcode} at pointer {pointer}")]
    StackUnderflow { opcode: &'static str, pointer: u16 },
    #[error("unknown opcode {opcode} at pointer {pointer}")]
    UnknownOpcode { opcode: u16, pointer: u16 },
}
