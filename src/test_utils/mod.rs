// Copyright 2016 Walter Kuppens.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Helpers shared by the unit tests: opcode bytes for hand assembled
//! programs, a capturable output sink and a CPU wired to a manual clock.

use crate::ls8::clock::ManualClock;
use crate::ls8::cpu::CPU;
use crate::ls8::ls8::LS8RuntimeOptions;
use crate::ls8::opcode::Opcode;
use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;
use std::time::Duration;

pub const HLT: u8 = Opcode::HLT as u8;
pub const PRN: u8 = Opcode::PRN as u8;
pub const PRA: u8 = Opcode::PRA as u8;
pub const LDI: u8 = Opcode::LDI as u8;
pub const LD: u8 = Opcode::LD as u8;
pub const ST: u8 = Opcode::ST as u8;
pub const ADD: u8 = Opcode::ADD as u8;
pub const MULT: u8 = Opcode::MULT as u8;
pub const CMP: u8 = Opcode::CMP as u8;
pub const INC: u8 = Opcode::INC as u8;
pub const DEC: u8 = Opcode::DEC as u8;
pub const PUSH: u8 = Opcode::PUSH as u8;
pub const POP: u8 = Opcode::POP as u8;
pub const CALL: u8 = Opcode::CALL as u8;
pub const RET: u8 = Opcode::RET as u8;
pub const JMP: u8 = Opcode::JMP as u8;
pub const JEQ: u8 = Opcode::JEQ as u8;
pub const JNE: u8 = Opcode::JNE as u8;
pub const IRET: u8 = Opcode::IRET as u8;

/// An output sink whose contents can be read back after the CPU that owns
/// a clone of it has written to it.
#[derive(Clone, Default)]
pub struct SharedOutput {
    buffer: Rc<RefCell<Vec<u8>>>,
}

impl SharedOutput {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.buffer.borrow()).into_owned()
    }
}

impl Write for SharedOutput {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Quiet options with the timer interrupt enabled at a one second interval.
pub fn test_options() -> LS8RuntimeOptions {
    LS8RuntimeOptions {
        verbose: false,
        trace: false,
        timer_enabled: true,
        timer_interval: Duration::from_secs(1),
    }
}

/// Builds a CPU with the given program loaded, returning handles to its
/// output and clock.
pub fn cpu_with_program(program: &[u8]) -> (CPU, SharedOutput, ManualClock) {
    cpu_with_options(program, test_options())
}

pub fn cpu_with_options(program: &[u8], options: LS8RuntimeOptions) -> (CPU, SharedOutput, ManualClock) {
    let output = SharedOutput::default();
    let clock = ManualClock::new();
    let mut cpu = CPU::with_io(options, Box::new(clock.clone()), Box::new(output.clone()));
    cpu.load(program).unwrap();
    (cpu, output, clock)
}

/// Pads a program with zeros up to `len` bytes so code can be placed at a
/// known address.
pub fn pad_to(program: &mut Vec<u8>, len: usize) {
    assert!(program.len() <= len, "program already longer than {} bytes", len);
    program.resize(len, 0);
}
