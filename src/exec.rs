//! Execution core: the fetch-decode-execute loop.
//!
//! `Machine` owns the memory image, register/stack state, and the
//! pending-input queue for its whole lifetime; everything ambient (the
//! output sink, the optional trace sink) is borrowed per call through
//! [`ExecContext`], so independent machines can run side by side.
//!
//! The only suspension point is `IN` on an empty queue: `step` returns
//! [`StepOutcome::AwaitingInput`] without touching any state, the caller
//! fetches one line out-of-band and calls [`Machine::feed_line`], and the
//! next `step` re-executes the same `IN`. A failing instruction applies
//! none of its side effects: operand classification happens at decode,
//! and the remaining fault checks (stack underflow, zero divisor) run
//! before the first write.

use std::io::Write;

use crate::{
    input::InputQueue,
    memory::MemoryImage,
    opcodes::Instr,
    operands::Operand,
    state::MachineState,
    trace::TraceSink,
    Result, VmError, MODULUS,
};

/// Result of a single fetch-decode-execute cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Running,
    AwaitingInput,
    Halted,
}

/// Result of driving the loop until it cannot continue on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunExit {
    Halted,
    AwaitingInput,
}

/// Caller-owned ambient state for one or more execution steps.
pub struct ExecContext<'a> {
    pub output: &'a mut dyn Write,
    pub trace: Option<&'a mut TraceSink>,
}

impl<'a> ExecContext<'a> {
    pub fn new(output: &'a mut dyn Write) -> Self {
        Self {
            output,
            trace: None,
        }
    }
}

#[derive(Debug)]
pub struct Machine {
    memory: MemoryImage,
    state: MachineState,
    input: InputQueue,
    executed: u64,
}

impl Machine {
    pub fn new(memory: MemoryImage) -> Self {
        Self {
            memory,
            state: MachineState::new(),
            input: InputQueue::new(),
            executed: 0,
        }
    }

    pub fn from_image_bytes(bytes: &[u8]) -> Self {
        Self::new(MemoryImage::from_bytes(bytes))
    }

    /// Enqueue one line of input (character codes plus terminator).
    pub fn feed_line(&mut self, line: &str) {
        self.input.feed_line(line);
    }

    pub fn set_register(&mut self, index: u8, value: u16) {
        self.state.set_register(index, value);
    }

    pub fn state(&self) -> &MachineState {
        &self.state
    }

    pub fn memory(&self) -> &MemoryImage {
        &self.memory
    }

    pub fn pending_input(&self) -> usize {
        self.input.len()
    }

    /// Instructions executed so far. Suspended `IN` attempts do not
    /// count; the instruction executes once input is available.
    pub fn executed(&self) -> u64 {
        self.executed
    }

    /// Drive the loop until the machine halts or needs more input.
    pub fn run(&mut self, ctx: &mut ExecContext<'_>) -> Result<RunExit> {
        loop {
            match self.step(ctx)? {
                StepOutcome::Running => continue,
                StepOutcome::AwaitingInput => return Ok(RunExit::AwaitingInput),
                StepOutcome::Halted => return Ok(RunExit::Halted),
            }
        }
    }

    /// One fetch-decode-execute cycle.
    pub fn step(&mut self, ctx: &mut ExecContext<'_>) -> Result<StepOutcome> {
        if self.state.is_halted() {
            return Ok(StepOutcome::Halted);
        }

        let pointer = self.state.pointer();
        let instr = Instr::decode(&self.memory, pointer)?;

        // Suspend before tracing: a suspended IN has not executed and
        // will be traced once it actually consumes a code.
        if matches!(instr, Instr::In { .. }) && self.input.is_empty() {
            return Ok(StepOutcome::AwaitingInput);
        }

        if let Some(sink) = ctx.trace.as_deref_mut() {
            sink.record(pointer, &instr, &self.state)?;
        }

        let mut next = pointer.wrapping_add(instr.opcode().length());
        match instr {
            Instr::Halt => {
                self.state.halt();
                self.executed += 1;
                return Ok(StepOutcome::Halted);
            }
            Instr::Set { dst, src } => {
                let value = self.state.resolve(src);
                self.write_operand(dst, value);
            }
            Instr::Push { src } => {
                let value = self.state.resolve(src);
                self.state.push(value);
            }
            Instr::Pop { dst } => {
                let value = self.state.pop().ok_or(VmError::StackUnderflow {
                    opcode: "POP",
                    pointer,
                })?;
                self.write_operand(dst, value);
            }
            Instr::Eq { dst, lhs, rhs } => {
                let value = (self.state.resolve(lhs) == self.state.resolve(rhs)) as u16;
                self.write_operand(dst, value);
            }
            Instr::Gt { dst, lhs, rhs } => {
                let value = (self.state.resolve(lhs) > self.state.resolve(rhs)) as u16;
                self.write_operand(dst, value);
            }
            Instr::Jmp { target } => {
                next = self.state.resolve(target);
            }
            Instr::Jt { cond, target } => {
                if self.state.resolve(cond) != 0 {
                    next = self.state.resolve(target);
                }
            }
            Instr::Jf { cond, target } => {
                if self.state.resolve(cond) == 0 {
                    next = self.state.resolve(target);
                }
            }
            Instr::Add { dst, lhs, rhs } => {
                let sum = self.state.resolve(lhs) as u32 + self.state.resolve(rhs) as u32;
                self.write_operand(dst, (sum % MODULUS as u32) as u16);
            }
            Instr::Mult { dst, lhs, rhs } => {
                let product = self.state.resolve(lhs) as u32 * self.state.resolve(rhs) as u32;
                self.write_operand(dst, (product % MODULUS as u32) as u16);
            }
            Instr::Mod { dst, lhs, rhs } => {
                let divisor = self.state.resolve(rhs);
                if divisor == 0 {
                    return Err(VmError::InvalidOperand {
                        opcode: "MOD",
                        pointer,
                        word: rhs.raw(),
                    });
                }
                let value = self.state.resolve(lhs) % divisor;
                self.write_operand(dst, value);
            }
            Instr::And { dst, lhs, rhs } => {
                let value = self.state.resolve(lhs) & self.state.resolve(rhs);
                self.write_operand(dst, value);
            }
            Instr::Or { dst, lhs, rhs } => {
                let value = self.state.resolve(lhs) | self.state.resolve(rhs);
                self.write_operand(dst, value);
            }
            Instr::Not { dst, src } => {
                let value = !self.state.resolve(src) & (MODULUS - 1);
                self.write_operand(dst, value);
            }
            Instr::Rmem { dst, addr } => {
                let value = self.memory.read(self.state.resolve(addr));
                self.write_operand(dst, value);
            }
            Instr::Wmem { addr, src } => {
                let addr = self.state.resolve(addr);
                let value = self.state.resolve(src);
                self.memory.write(addr, value);
            }
            Instr::Call { target } => {
                self.state.push(next);
                next = self.state.resolve(target);
            }
            Instr::Ret => match self.state.pop() {
                Some(address) => next = address,
                None => {
                    self.state.halt();
                    self.executed += 1;
                    return Ok(StepOutcome::Halted);
                }
            },
            Instr::Out { src } => {
                let code = self.state.resolve(src);
                let ch = char::from_u32(code as u32).unwrap_or(char::REPLACEMENT_CHARACTER);
                let mut buf = [0u8; 4];
                ctx.output.write_all(ch.encode_utf8(&mut buf).as_bytes())?;
            }
            Instr::In { dst } => match self.input.pop() {
                Some(code) => self.write_operand(dst, code),
                None => return Ok(StepOutcome::AwaitingInput),
            },
            Instr::Noop => {}
        }

        self.state.set_pointer(next);
        self.executed += 1;
        Ok(StepOutcome::Running)
    }

    /// Resolve an operand in destination position: literals address
    /// memory cells, register references address the register file. The
    /// destination word is never itself resolved through the read path.
    fn write_operand(&mut self, dst: Operand, value: u16) {
        match dst {
            Operand::Literal(addr) => self.memory.write(addr, value),
            Operand::Register(index) => self.state.set_register(index, value),
        }
    }
}
