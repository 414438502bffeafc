// Copyright 2016 Walter Kuppens.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use crate::ls8::error::{CpuError, Result};
use crate::ls8::opcode::Opcode;
use crate::ls8::registers::Registers;

// Flag constants for the result of the last comparison. Exactly one of them
// is set after a CMP.
pub const FLAG_EQUAL  : u8 = 0b001;
pub const FLAG_GREATER: u8 = 0b010;
pub const FLAG_LESS   : u8 = 0b100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AluOp {
    Add,
    Mult,
    Cmp,
    Inc,
    Dec,
}

impl AluOp {
    /// Selects the ALU operation an opcode performs. Opcodes that are not
    /// arithmetic have no ALU operation.
    pub fn from_opcode(opcode: Opcode) -> Result<AluOp> {
        match opcode {
            Opcode::ADD  => Ok(AluOp::Add),
            Opcode::MULT => Ok(AluOp::Mult),
            Opcode::CMP  => Ok(AluOp::Cmp),
            Opcode::INC  => Ok(AluOp::Inc),
            Opcode::DEC  => Ok(AluOp::Dec),
            other => Err(CpuError::UnsupportedOperation(other.byte())),
        }
    }
}

/// Applies an ALU operation to the register file. Results wrap around at 8
/// bits. `reg_b` is ignored by INC and DEC.
pub fn apply(op: AluOp, registers: &mut Registers, flags: &mut u8, reg_a: u8, reg_b: u8) -> Result<()> {
    let a = registers.get(reg_a)?;

    let result = match op {
        AluOp::Add  => a.wrapping_add(registers.get(reg_b)?),
        AluOp::Mult => a.wrapping_mul(registers.get(reg_b)?),
        AluOp::Inc  => a.wrapping_add(1),
        AluOp::Dec  => a.wrapping_sub(1),
        AluOp::Cmp  => {
            *flags = compare(a, registers.get(reg_b)?);
            return Ok(());
        },
    };

    registers.set(reg_a, result)
}

/// Returns the flag describing how `a` relates to `b`.
#[inline(always)]
pub fn compare(a: u8, b: u8) -> u8 {
    if a < b {
        FLAG_LESS
    } else if a > b {
        FLAG_GREATER
    } else {
        FLAG_EQUAL
    }
}
