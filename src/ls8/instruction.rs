// Copyright 2016 Walter Kuppens.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use crate::ls8::alu::{self, AluOp, FLAG_EQUAL};
use crate::ls8::cpu::CPU;
use crate::ls8::error::{CpuError, Result};
use crate::ls8::memory::Memory;
use crate::ls8::opcode::{decode_opcode, Opcode};
use crate::ls8::registers::IS;
use std::io::Write;

/// What the engine should do with the program counter once an instruction
/// has executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    // Advance past the instruction.
    Next,
    // The instruction chose the next address itself.
    Jump(u8),
    Halt,
}

/// All LS-8 instructions are a maximum size of 3 bytes. The first byte is the
/// opcode and the following bytes, present depending on the opcode, are
/// register indices or an immediate value. Missing operands are zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    pub opcode: Opcode,
    pub a: u8,
    pub b: u8,
}

impl Instruction {
    /// Decodes the instruction at `pc`. Only the operand bytes the opcode
    /// needs are read.
    pub fn decode(pc: u8, memory: &Memory) -> Result<Instruction> {
        let byte = memory.read_u8(pc as usize)?;
        let opcode = match decode_opcode(byte) {
            Some(opcode) => opcode,
            None => return Err(CpuError::IllegalInstruction { opcode: byte, pc: pc }),
        };

        let mut operands = [0u8; 2];
        for (offset, operand) in operands.iter_mut().enumerate().take(opcode.operand_count() as usize) {
            *operand = memory.read_u8(pc as usize + 1 + offset)?;
        }

        Ok(Instruction {
            opcode: opcode,
            a: operands[0],
            b: operands[1],
        })
    }

    /// Renders the instruction in assembly form, e.g. "LDI R0,8".
    pub fn disassemble(&self) -> String {
        use crate::ls8::opcode::Opcode::*;

        let mnemonic = self.opcode.mnemonic();
        match self.opcode {
            HLT | RET | IRET => mnemonic.to_string(),
            LDI => format!("{} R{},{}", mnemonic, self.a, self.b),
            LD | ST | ADD | MULT | CMP => format!("{} R{},R{}", mnemonic, self.a, self.b),
            _ => format!("{} R{}", mnemonic, self.a),
        }
    }

    /// Executes the instruction against the CPU. The program counter is left
    /// alone; the returned `Flow` tells the engine how to move it.
    pub fn execute(&self, cpu: &mut CPU) -> Result<Flow> {
        use crate::ls8::opcode::Opcode::*;

        if self.opcode.is_alu() {
            let op = AluOp::from_opcode(self.opcode)?;
            alu::apply(op, &mut cpu.registers, &mut cpu.fl, self.a, self.b)?;
            return Ok(Flow::Next);
        }

        match self.opcode {
            HLT => Ok(Flow::Halt),

            PRN => {
                let value = cpu.registers.get(self.a)?;
                writeln!(cpu.output, "{}", value)?;
                cpu.output.flush()?;
                Ok(Flow::Next)
            },

            PRA => {
                let value = cpu.registers.get(self.a)?;
                write!(cpu.output, "{}", value as char)?;
                cpu.output.flush()?;
                Ok(Flow::Next)
            },

            LDI => {
                cpu.registers.set(self.a, self.b)?;
                Ok(Flow::Next)
            },

            // Loads register A with the value at the address held in register B.
            LD => {
                let addr = cpu.registers.get(self.b)?;
                let value = cpu.memory.read_u8(addr as usize)?;
                cpu.registers.set(self.a, value)?;
                Ok(Flow::Next)
            },

            // Stores register B at the address held in register A.
            ST => {
                let addr = cpu.registers.get(self.a)?;
                let value = cpu.registers.get(self.b)?;
                cpu.memory.write_u8(addr as usize, value)?;
                Ok(Flow::Next)
            },

            PUSH => {
                let value = cpu.registers.get(self.a)?;
                cpu.memory.stack_push_u8(&mut cpu.registers, value)?;
                Ok(Flow::Next)
            },

            POP => {
                let value = cpu.memory.stack_pop_u8(&mut cpu.registers)?;
                cpu.registers.set(self.a, value)?;
                Ok(Flow::Next)
            },

            CALL => {
                let target = cpu.registers.get(self.a)?;
                let ret = cpu.next_pc(self.opcode)?;
                cpu.memory.stack_push_u8(&mut cpu.registers, ret)?;
                Ok(Flow::Jump(target))
            },

            RET => {
                let ret = cpu.memory.stack_pop_u8(&mut cpu.registers)?;
                Ok(Flow::Jump(ret))
            },

            JMP => Ok(Flow::Jump(cpu.registers.get(self.a)?)),

            JEQ => {
                if cpu.fl == FLAG_EQUAL {
                    Ok(Flow::Jump(cpu.registers.get(self.a)?))
                } else {
                    Ok(Flow::Next)
                }
            },

            JNE => {
                if cpu.fl != FLAG_EQUAL {
                    Ok(Flow::Jump(cpu.registers.get(self.a)?))
                } else {
                    Ok(Flow::Next)
                }
            },

            // Undoes the register save performed when the interrupt was
            // raised: R6 down to R0, then the interrupted program counter.
            IRET => {
                for index in (0..=IS).rev() {
                    let value = cpu.memory.stack_pop_u8(&mut cpu.registers)?;
                    cpu.registers.set(index, value)?;
                }
                let ret = cpu.memory.stack_pop_u8(&mut cpu.registers)?;
                cpu.registers.set_interrupt_status(false);
                Ok(Flow::Jump(ret))
            },

            INC | DEC | ADD | MULT | CMP => Err(CpuError::UnsupportedOperation(self.opcode.byte())),
        }
    }
}
