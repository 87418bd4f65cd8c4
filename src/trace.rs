//! Per-instruction debug trace sink.
//!
//! When debug assist is active the front end attaches a sink here and the
//! executor writes one record per instruction, before dispatch: mnemonic,
//! pointer, and each operand's raw word alongside its resolved value.
//! The file is opened append-only so successive runs accumulate.

use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::{opcodes::Instr, state::MachineState, Result};

pub struct TraceSink {
    writer: BufWriter<std::fs::File>,
    path: PathBuf,
    records: u64,
}

impl TraceSink {
    pub fn create(path: &Path) -> Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            writer: BufWriter::new(file),
            path: path.to_path_buf(),
            records: 0,
        })
    }

    pub fn record(&mut self, pointer: u16, instr: &Instr, state: &MachineState) -> Result<()> {
        let args = instr
            .operands()
            .iter()
            .map(|op| format!("{:>8} (val: {:>8})", op.raw(), state.resolve(*op)))
            .collect::<Vec<_>>()
            .join(", ");
        writeln!(
            self.writer,
            "{mnemonic:<4} | pointer: {pointer:>6} | args: {args}",
            mnemonic = instr.opcode().mnemonic(),
        )?;
        self.records += 1;
        Ok(())
    }

    /// Mark an accepted input line in the trace stream, so instruction
    /// records can be correlated with the line that triggered them.
    pub fn record_line(&mut self, line: &str) -> Result<()> {
        writeln!(self.writer, "------------>{line}<------------")?;
        Ok(())
    }

    pub fn records(&self) -> u64 {
        self.records
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn finish(mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}
