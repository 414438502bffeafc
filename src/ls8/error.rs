// Copyright 2016 Walter Kuppens.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use crate::io::errors;
use thiserror::Error;

/// Fatal conditions raised while the CPU is executing. None of these are
/// recoverable; the run loop stops as soon as one is returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CpuError {
    #[error("illegal instruction {opcode:#010b} at pc {pc:#04X}")]
    IllegalInstruction { opcode: u8, pc: u8 },

    #[error("address {address:#X} is outside of memory (size {size})")]
    AddressOutOfRange { address: usize, size: usize },

    #[error("register index {0} is out of range")]
    RegisterOutOfRange(u8),

    // Only reachable if a non-ALU opcode is routed to the ALU.
    #[error("unsupported ALU operation for opcode {0:#010b}")]
    UnsupportedOperation(u8),

    #[error("stack overflow (sp {sp:#04X})")]
    StackOverflow { sp: u8 },

    #[error("stack underflow (sp {sp:#04X})")]
    StackUnderflow { sp: u8 },

    #[error("program of {size} bytes does not fit in {capacity} bytes of memory")]
    ProgramTooLarge { size: usize, capacity: usize },

    #[error("unable to write program output: {0}")]
    Output(String),
}

impl From<::std::io::Error> for CpuError {
    fn from(err: ::std::io::Error) -> CpuError {
        CpuError::Output(err.to_string())
    }
}

impl CpuError {
    /// Maps an error to the exit code the process should terminate with.
    pub fn exit_code(&self) -> i32 {
        match *self {
            CpuError::IllegalInstruction { .. } => errors::EXIT_ILLEGAL_INSTRUCTION,
            CpuError::AddressOutOfRange { .. } |
            CpuError::RegisterOutOfRange(_) => errors::EXIT_ADDRESS_OUT_OF_RANGE,
            CpuError::UnsupportedOperation(_) => errors::EXIT_UNSUPPORTED_OPERATION,
            CpuError::StackOverflow { .. } |
            CpuError::StackUnderflow { .. } => errors::EXIT_STACK_FAULT,
            CpuError::ProgramTooLarge { .. } => errors::EXIT_INVALID_PROGRAM,
            CpuError::Output(_) => errors::EXIT_FAILURE,
        }
    }
}

pub type Result<T> = ::std::result::Result<T, CpuError>;
