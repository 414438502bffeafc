// Copyright 2016 Walter Kuppens.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use crate::ls8::error::{CpuError, Result};
use crate::ls8::memory::STACK_TOP;

pub const REGISTER_COUNT: usize = 8;

// Reserved registers. R6 latches a pending timer interrupt and R7 holds the
// stack pointer; R0-R5 are free for programs to use.
pub const IS: u8 = 6;
pub const SP: u8 = 7;

/// The general purpose register file. Every register is 8 bits wide and is
/// addressed by the index encoded in an instruction operand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registers {
    reg: [u8; REGISTER_COUNT],
}

impl Registers {
    pub fn new() -> Registers {
        let mut reg = [0; REGISTER_COUNT];
        reg[SP as usize] = STACK_TOP;
        Registers { reg: reg }
    }

    #[inline(always)]
    pub fn get(&self, index: u8) -> Result<u8> {
        self.reg.get(index as usize)
            .copied()
            .ok_or(CpuError::RegisterOutOfRange(index))
    }

    #[inline(always)]
    pub fn set(&mut self, index: u8, value: u8) -> Result<()> {
        match self.reg.get_mut(index as usize) {
            Some(slot) => {
                *slot = value;
                Ok(())
            },
            None => Err(CpuError::RegisterOutOfRange(index)),
        }
    }

    #[inline(always)]
    pub fn sp(&self) -> u8 {
        self.reg[SP as usize]
    }

    #[inline(always)]
    pub fn set_sp(&mut self, value: u8) {
        self.reg[SP as usize] = value;
    }

    /// True while a timer interrupt is pending or being serviced.
    #[inline(always)]
    pub fn interrupt_pending(&self) -> bool {
        self.reg[IS as usize] == 1
    }

    #[inline(always)]
    pub fn set_interrupt_status(&mut self, pending: bool) {
        self.reg[IS as usize] = pending as u8;
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.reg
    }
}

impl Default for Registers {
    fn default() -> Registers {
        Registers::new()
    }
}
