// Copyright 2016 Walter Kuppens.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use crate::ls8::error::{CpuError, Result};
use crate::ls8::registers::Registers;

pub const MEMORY_SIZE: usize = 0x100;

// The top of memory is reserved for I/O. 0xF4 is the first byte of that
// region, so the stack grows downwards from just below it.
pub const STACK_TOP: u8 = 0xF4;

// Holds the address of the timer interrupt handler.
pub const INTERRUPT_VECTOR: usize = 0xF8;

/// Flat byte addressable memory. The stack shares this space with the
/// program and may not grow down into the loaded program image.
#[derive(Clone)]
pub struct Memory {
    ram: [u8; MEMORY_SIZE],

    // Lowest address the stack is allowed to occupy. Everything below it is
    // program code.
    stack_floor: usize,
}

impl Memory {
    pub fn new() -> Memory {
        Memory {
            ram: [0; MEMORY_SIZE],
            stack_floor: 0,
        }
    }

    /// Reads an unsigned 8-bit byte value located at the given address.
    #[inline(always)]
    pub fn read_u8(&self, addr: usize) -> Result<u8> {
        self.ram.get(addr)
            .copied()
            .ok_or(CpuError::AddressOutOfRange { address: addr, size: MEMORY_SIZE })
    }

    /// Writes an unsigned 8-bit byte value to the given address.
    #[inline(always)]
    pub fn write_u8(&mut self, addr: usize, val: u8) -> Result<()> {
        match self.ram.get_mut(addr) {
            Some(cell) => {
                *cell = val;
                Ok(())
            },
            None => Err(CpuError::AddressOutOfRange { address: addr, size: MEMORY_SIZE }),
        }
    }

    /// Copies a program image into memory starting at address 0. The end of
    /// the image becomes the floor of the stack.
    pub fn load(&mut self, program: &[u8]) -> Result<()> {
        if program.len() > MEMORY_SIZE {
            return Err(CpuError::ProgramTooLarge {
                size: program.len(),
                capacity: MEMORY_SIZE,
            });
        }

        self.ram[..program.len()].copy_from_slice(program);
        self.stack_floor = program.len();
        Ok(())
    }

    #[inline(always)]
    pub fn stack_floor(&self) -> usize {
        self.stack_floor
    }

    /// Returns a read-only view of a range of memory, clamped to the end of
    /// memory. Used for dumps and traces.
    pub fn slice(&self, addr: usize, len: usize) -> &[u8] {
        let start = addr.min(MEMORY_SIZE);
        let end = addr.saturating_add(len).min(MEMORY_SIZE);
        &self.ram[start..end]
    }

    // Utility functions for managing the stack.

    /// Pushes an 8-bit number onto the stack.
    pub fn stack_push_u8(&mut self, registers: &mut Registers, value: u8) -> Result<()> {
        let sp = registers.sp();
        let new_sp = match sp.checked_sub(1) {
            Some(new_sp) if new_sp as usize >= self.stack_floor => new_sp,
            _ => return Err(CpuError::StackOverflow { sp: sp }),
        };

        registers.set_sp(new_sp);
        self.write_u8(new_sp as usize, value)
    }

    /// Pops an 8-bit number off the stack.
    pub fn stack_pop_u8(&mut self, registers: &mut Registers) -> Result<u8> {
        let sp = registers.sp();
        if sp >= STACK_TOP {
            return Err(CpuError::StackUnderflow { sp: sp });
        }

        let value = self.read_u8(sp as usize)?;
        registers.set_sp(sp + 1);
        Ok(value)
    }
}

impl Default for Memory {
    fn default() -> Memory {
        Memory::new()
    }
}
