// Copyright 2016 Walter Kuppens.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use crate::io::log;
use crate::ls8::cpu::CPU;
use crate::ls8::error::Result;
use std::time::Duration;

pub const DEFAULT_TIMER_INTERVAL_MS: u64 = 1000;

/// Options passed from the command-line that influence how the emulator
/// behaves.
#[derive(Debug, Clone, PartialEq)]
pub struct LS8RuntimeOptions {
    // Prints diagnostic messages to stderr.
    pub verbose: bool,

    // Prints a trace line before every instruction.
    pub trace: bool,

    // When false the timer never raises an interrupt.
    pub timer_enabled: bool,

    // How much time must pass between timer interrupts.
    pub timer_interval: Duration,
}

impl Default for LS8RuntimeOptions {
    fn default() -> LS8RuntimeOptions {
        LS8RuntimeOptions {
            verbose: false,
            trace: false,
            timer_enabled: true,
            timer_interval: Duration::from_millis(DEFAULT_TIMER_INTERVAL_MS),
        }
    }
}

/// A complete machine: a CPU with a program loaded into its memory, plus the
/// options it was started with.
pub struct LS8 {
    pub cpu: CPU,
    pub runtime_options: LS8RuntimeOptions,
}

impl LS8 {
    pub fn new(program: &[u8], runtime_options: LS8RuntimeOptions) -> Result<LS8> {
        LS8::with_cpu(CPU::new(runtime_options.clone()), program, runtime_options)
    }

    /// Builds a machine around an already constructed CPU, which lets callers
    /// choose where output goes and which clock drives the timer.
    pub fn with_cpu(mut cpu: CPU, program: &[u8], runtime_options: LS8RuntimeOptions) -> Result<LS8> {
        cpu.load(program)?;
        log::log("ls8", format!("Stack floor at {:#04X}", cpu.memory.stack_floor()), &runtime_options);

        Ok(LS8 {
            cpu: cpu,
            runtime_options: runtime_options,
        })
    }

    /// Executes a single instruction, servicing a pending interrupt first.
    pub fn step(&mut self) -> Result<()> {
        self.cpu.cycle()
    }

    /// Runs the program until it halts.
    pub fn run(&mut self) -> Result<()> {
        self.cpu.run()
    }

    #[inline(always)]
    pub fn halted(&self) -> bool {
        !self.cpu.is_running()
    }
}
