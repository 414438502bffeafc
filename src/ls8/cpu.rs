// Copyright 2016 Walter Kuppens.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use crate::io::log;
use crate::ls8::alu::{FLAG_EQUAL, FLAG_GREATER, FLAG_LESS};
use crate::ls8::clock::{Clock, MonotonicClock, Timer};
use crate::ls8::error::{CpuError, Result};
use crate::ls8::instruction::{Flow, Instruction};
use crate::ls8::ls8::LS8RuntimeOptions;
use crate::ls8::memory::{Memory, INTERRUPT_VECTOR, MEMORY_SIZE};
use crate::ls8::opcode::Opcode;
use crate::ls8::registers::{Registers, IS};
use std::fmt;
use std::io::{self, Write};

/// The observable execution state of the CPU.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Running,
    ServicingInterrupt,
    Halted,
}

/// This is an implementation of the LS-8, a small 8-bit CPU with 256 bytes of
/// memory, eight registers and a downward growing stack. Instructions are
/// fetched from memory at the program counter, decoded against a fixed
/// opcode table and executed one at a time.
///
/// A timer interrupt is checked between instructions. When it fires the CPU
/// saves its state on the stack and jumps to the handler whose address is
/// stored in the interrupt vector; the handler returns with IRET.
pub struct CPU {
    // The program counter points to the next instruction to be executed. It
    // moves past each instruction automatically unless the instruction is a
    // jump, call or return, which set it directly.
    pub pc: u8,

    // The instruction register holds the opcode most recently fetched.
    pub ir: u8,

    // The flags register records the result of the last CMP. It is not
    // addressable by programs and is only read by the conditional jumps.
    pub fl: u8,

    // R0-R7. R6 is the interrupt status latch and R7 the stack pointer.
    pub registers: Registers,

    pub memory: Memory,

    // PRN and PRA write here.
    pub output: Box<dyn Write>,

    // Cleared by HLT. Once false the CPU executes nothing further.
    running: bool,

    // Set while the instructions of an interrupt handler are executing.
    servicing_interrupt: bool,

    // Number of timer interrupts dispatched since start-up.
    interrupts_serviced: u64,

    timer: Timer,

    // Options passed from the command-line that may influence how the CPU
    // behaves.
    runtime_options: LS8RuntimeOptions,
}

impl CPU {
    /// Creates a CPU that writes to stdout and times interrupts against the
    /// host's monotonic clock.
    pub fn new(runtime_options: LS8RuntimeOptions) -> CPU {
        CPU::with_io(runtime_options, Box::new(MonotonicClock::new()), Box::new(io::stdout()))
    }

    pub fn with_io(runtime_options: LS8RuntimeOptions, clock: Box<dyn Clock>, output: Box<dyn Write>) -> CPU {
        let interval = runtime_options.timer_interval;
        CPU {
            pc: 0,
            ir: 0,
            fl: 0,
            registers: Registers::new(),
            memory: Memory::new(),
            output: output,
            running: true,
            servicing_interrupt: false,
            interrupts_serviced: 0,
            timer: Timer::new(clock, interval),
            runtime_options: runtime_options,
        }
    }

    /// Copies a program image into memory at address 0.
    pub fn load(&mut self, program: &[u8]) -> Result<()> {
        self.memory.load(program)?;
        log::log("cpu", format!("Loaded {} byte program", program.len()), &self.runtime_options);
        Ok(())
    }

    pub fn state(&self) -> State {
        if !self.running {
            State::Halted
        } else if self.servicing_interrupt {
            State::ServicingInterrupt
        } else {
            State::Running
        }
    }

    #[inline(always)]
    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn interrupts_serviced(&self) -> u64 {
        self.interrupts_serviced
    }

    /// Runs until HLT or a fatal error. The timer starts when the run does.
    pub fn run(&mut self) -> Result<()> {
        log::log("cpu", format!("Starting execution (timer interval {:?}, enabled: {})",
                                self.timer.interval(), self.runtime_options.timer_enabled),
                 &self.runtime_options);
        self.timer.reset();

        while self.running {
            self.cycle()?;
        }

        log::log("cpu", format!("Halted at {:#04X} after {} timer interrupts",
                                self.pc, self.interrupts_serviced),
                 &self.runtime_options);
        Ok(())
    }

    /// One iteration of the main loop: service a pending interrupt, execute
    /// the instruction at the program counter, then check the timer.
    pub fn cycle(&mut self) -> Result<()> {
        if !self.running {
            return Ok(());
        }

        if self.registers.interrupt_pending() {
            self.service_interrupt()?;
            if !self.running {
                return Ok(());
            }
        }

        self.step()?;

        if self.running {
            self.poll_timer();
        }
        Ok(())
    }

    /// Fetches, decodes and executes a single instruction, then moves the
    /// program counter. This is the primitive both the main loop and the
    /// interrupt handler loop are built from.
    pub fn step(&mut self) -> Result<()> {
        self.ir = self.memory.read_u8(self.pc as usize)?;
        let instr = Instruction::decode(self.pc, &self.memory)?;

        if self.runtime_options.trace {
            log::trace(format!("{} {}", self.trace(), instr.disassemble()), &self.runtime_options);
        }

        match instr.execute(self)? {
            Flow::Next => self.pc = self.next_pc(instr.opcode)?,
            Flow::Jump(addr) => {
                debug_assert!(instr.opcode.sets_pc(), "{} redirected the pc", instr.opcode.mnemonic());
                self.pc = addr;
            },
            Flow::Halt => self.running = false,
        }
        Ok(())
    }

    /// Saves the program counter and R0-R6 on the stack, jumps to the address
    /// in the interrupt vector and executes the handler until IRET clears the
    /// interrupt status (or the handler halts). The CPU is back in the main
    /// loop state afterwards, even when the handler faults.
    pub fn service_interrupt(&mut self) -> Result<()> {
        self.servicing_interrupt = true;
        let result = self.dispatch_interrupt();
        self.servicing_interrupt = false;
        result
    }

    fn dispatch_interrupt(&mut self) -> Result<()> {
        self.timer.reset();
        self.interrupts_serviced += 1;

        let pc = self.pc;
        self.memory.stack_push_u8(&mut self.registers, pc)?;
        for index in 0..=IS {
            let value = self.registers.get(index)?;
            self.memory.stack_push_u8(&mut self.registers, value)?;
        }

        self.pc = self.memory.read_u8(INTERRUPT_VECTOR)?;
        log::log("cpu", format!("Timer interrupt #{}: {:#04X} -> {:#04X}",
                                self.interrupts_serviced, pc, self.pc),
                 &self.runtime_options);

        while self.running && self.registers.interrupt_pending() {
            self.step()?;
        }
        Ok(())
    }

    /// Latches the interrupt status once the timer interval has elapsed. The
    /// interrupt itself is serviced at the start of the next cycle.
    fn poll_timer(&mut self) {
        if self.runtime_options.timer_enabled && self.timer.expired() {
            self.registers.set_interrupt_status(true);
        }
    }

    /// Address of the instruction following the one at the program counter.
    pub fn next_pc(&self, opcode: Opcode) -> Result<u8> {
        let next = self.pc as usize + opcode.width() as usize;
        if next >= MEMORY_SIZE {
            return Err(CpuError::AddressOutOfRange { address: next, size: MEMORY_SIZE });
        }
        Ok(next as u8)
    }

    /// Returns a one line dump of the CPU state: program counter, flags, the
    /// three bytes at the program counter and every register.
    pub fn trace(&self) -> String {
        let bytes = self.memory.slice(self.pc as usize, 3);
        let byte = |i: usize| bytes.get(i).cloned().unwrap_or(0);

        let mut line = format!("TRACE: {:02X} | {:02X} {:02X} {:02X} {:02X} |",
                               self.pc, self.fl, byte(0), byte(1), byte(2));
        for value in self.registers.as_slice() {
            line.push_str(&format!(" {:02X}", value));
        }
        line
    }

    /// Returns the name of the flag currently set. This function is used to
    /// display flags when the CPU crashes.
    fn fmt_flags(fl: u8) -> &'static str {
        match fl {
            FLAG_EQUAL => "EQUAL",
            FLAG_GREATER => "GREATER",
            FLAG_LESS => "LESS",
            _ => "NONE",
        }
    }
}

impl fmt::Display for CPU {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "CPU Crash State:")?;
        writeln!(f, "    Program Counter:      {:#04X}", self.pc)?;
        writeln!(f, "    Instruction Register: {:#010b}", self.ir)?;
        writeln!(f, "    Flags:                {:#05b} ({})", self.fl, CPU::fmt_flags(self.fl))?;
        writeln!(f, "    Interrupt Status:     {}", self.registers.interrupt_pending())?;
        writeln!(f, "    Stack Pointer:        {:#04X}", self.registers.sp())?;
        for (index, value) in self.registers.as_slice().iter().enumerate() {
            writeln!(f, "    R{}:                   {:#04X}", index, value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ls8::memory::STACK_TOP;
    use crate::test_utils::*;
    use std::time::Duration;

    #[test]
    fn starts_running_at_address_zero() {
        let (cpu, _, _) = cpu_with_program(&[HLT]);
        assert_eq!(cpu.pc, 0);
        assert_eq!(cpu.fl, 0);
        assert_eq!(cpu.state(), State::Running);
        assert_eq!(cpu.registers.sp(), STACK_TOP);
    }

    #[test]
    fn multiplies_and_prints_72() {
        let program = [
            LDI, 0, 8,
            LDI, 1, 9,
            MULT, 0, 1,
            PRN, 0,
            HLT,
        ];
        let (mut cpu, output, _) = cpu_with_program(&program);
        cpu.run().unwrap();

        assert_eq!(output.contents(), "72\n");
        assert_eq!(cpu.state(), State::Halted);
        assert_eq!(cpu.pc, 11);
        assert_eq!(cpu.ir, HLT);
    }

    #[test]
    fn add_mult_cmp_on_five_and_three() {
        let cases: [(u8, u8); 3] = [(ADD, 8), (MULT, 15), (CMP, 5)];
        for &(opcode, expected) in cases.iter() {
            let program = [LDI, 0, 5, LDI, 1, 3, opcode, 0, 1, HLT];
            let (mut cpu, _, _) = cpu_with_program(&program);
            cpu.run().unwrap();
            assert_eq!(cpu.registers.get(0).unwrap(), expected);
        }

        let (mut cpu, _, _) = cpu_with_program(&[LDI, 0, 5, LDI, 1, 3, CMP, 0, 1, HLT]);
        cpu.run().unwrap();
        assert_eq!(cpu.fl, FLAG_GREATER);
    }

    #[test]
    fn prints_characters() {
        let program = [LDI, 0, b'H', PRA, 0, LDI, 0, b'i', PRA, 0, HLT];
        let (mut cpu, output, _) = cpu_with_program(&program);
        cpu.run().unwrap();
        assert_eq!(output.contents(), "Hi");
    }

    #[test]
    fn store_writes_register_b_to_address_in_register_a() {
        let program = [
            LDI, 0, 0x80,
            LDI, 1, 7,
            ST, 0, 1,
            LD, 2, 0,
            HLT,
        ];
        let (mut cpu, _, _) = cpu_with_program(&program);
        cpu.run().unwrap();
        assert_eq!(cpu.memory.read_u8(0x80).unwrap(), 7);
        assert_eq!(cpu.registers.get(2).unwrap(), 7);
    }

    #[test]
    fn push_then_pop_restores_value_and_stack_pointer() {
        let program = [LDI, 0, 42, PUSH, 0, LDI, 0, 0, POP, 0, HLT];
        let (mut cpu, _, _) = cpu_with_program(&program);
        cpu.run().unwrap();
        assert_eq!(cpu.registers.get(0).unwrap(), 42);
        assert_eq!(cpu.registers.sp(), STACK_TOP);
    }

    #[test]
    fn ret_resumes_after_call() {
        let mut program = vec![
            LDI, 1, 10,
            CALL, 1,
            PRN, 0,
            HLT,
        ];
        pad_to(&mut program, 10);
        program.extend_from_slice(&[LDI, 0, 99, RET]);

        let (mut cpu, output, _) = cpu_with_program(&program);
        for _ in 0..2 {
            cpu.step().unwrap();
        }
        assert_eq!(cpu.pc, 10);
        assert_eq!(cpu.memory.read_u8(STACK_TOP as usize - 1).unwrap(), 5);

        cpu.run().unwrap();
        assert_eq!(output.contents(), "99\n");
        assert_eq!(cpu.registers.sp(), STACK_TOP);
    }

    #[test]
    fn nested_calls_unwind_to_caller() {
        let mut program = vec![
            LDI, 0, 5,  // counter
            LDI, 1, 0,  // zero
            LDI, 2, 16, // subroutine
            CALL, 2,
            PRN, 3,
            HLT,
        ];
        pad_to(&mut program, 16);
        program.extend_from_slice(&[
            CMP, 0, 1,  // 16
            LDI, 4, 30, // 19
            JEQ, 4,     // 22
            DEC, 0,     // 24
            INC, 3,     // 26
            CALL, 2,    // 28
            RET,        // 30
        ]);

        let (mut cpu, output, _) = cpu_with_program(&program);
        cpu.run().unwrap();
        assert_eq!(output.contents(), "5\n");
        assert_eq!(cpu.registers.sp(), STACK_TOP);
        assert_eq!(cpu.pc, 13);
    }

    #[test]
    fn conditional_jumps_taken_and_not_taken() {
        let cases = [
            (JEQ, FLAG_EQUAL, 0x40),
            (JEQ, FLAG_LESS, 2),
            (JNE, FLAG_GREATER, 0x40),
            (JNE, FLAG_EQUAL, 2),
            (JNE, 0, 0x40),
        ];
        for &(opcode, flags, expected_pc) in cases.iter() {
            let (mut cpu, _, _) = cpu_with_program(&[opcode, 0]);
            cpu.registers.set(0, 0x40).unwrap();
            cpu.fl = flags;
            cpu.step().unwrap();
            assert_eq!(cpu.pc, expected_pc, "opcode {:#010b} flags {:#05b}", opcode, flags);
        }
    }

    #[test]
    fn jmp_sets_pc_from_register() {
        let (mut cpu, _, _) = cpu_with_program(&[LDI, 3, 0x20, JMP, 3]);
        cpu.step().unwrap();
        cpu.step().unwrap();
        assert_eq!(cpu.pc, 0x20);
    }

    #[test]
    fn illegal_instruction_stops_the_run() {
        let (mut cpu, _, _) = cpu_with_program(&[LDI, 0, 1, 0xFF]);
        assert_eq!(cpu.run(), Err(CpuError::IllegalInstruction { opcode: 0xFF, pc: 3 }));
        assert_eq!(cpu.pc, 3);
        assert_eq!(cpu.ir, 0xFF);
        assert!(format!("{}", cpu).contains("Instruction Register: 0b11111111"));
    }

    #[test]
    fn pop_from_empty_stack_underflows() {
        let (mut cpu, _, _) = cpu_with_program(&[POP, 0, HLT]);
        assert_eq!(cpu.run(), Err(CpuError::StackUnderflow { sp: STACK_TOP }));
    }

    #[test]
    fn unbounded_recursion_overflows_the_stack() {
        let (mut cpu, _, _) = cpu_with_program(&[LDI, 0, 3, CALL, 0]);
        match cpu.run() {
            Err(CpuError::StackOverflow { sp }) => assert_eq!(sp, 5),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn register_operand_out_of_range() {
        let (mut cpu, _, _) = cpu_with_program(&[LDI, 9, 1, HLT]);
        assert_eq!(cpu.run(), Err(CpuError::RegisterOutOfRange(9)));
    }

    #[test]
    fn advancing_past_end_of_memory_is_out_of_range() {
        let (mut cpu, _, _) = cpu_with_program(&[]);
        cpu.pc = 0xFE;
        assert_eq!(cpu.next_pc(Opcode::PRN), Err(CpuError::AddressOutOfRange {
            address: 0x100,
            size: MEMORY_SIZE,
        }));
        assert_eq!(cpu.next_pc(Opcode::HLT), Ok(0xFF));
    }

    // Main loop increments R5 forever; the handler at 0x20 clobbers R0,
    // prints '!' and returns.
    fn interrupt_program() -> Vec<u8> {
        let mut program = vec![INC, 5, JMP, 4];
        pad_to(&mut program, 0x20);
        program.extend_from_slice(&[LDI, 0, b'!', PRA, 0, IRET]);
        program
    }

    fn with_vector(mut cpu: CPU) -> CPU {
        cpu.memory.write_u8(INTERRUPT_VECTOR, 0x20).unwrap();
        cpu
    }

    #[test]
    fn timer_latches_interrupt_after_interval() {
        let (cpu, output, clock) = cpu_with_program(&interrupt_program());
        let mut cpu = with_vector(cpu);

        for _ in 0..10 {
            cpu.cycle().unwrap();
        }
        assert!(!cpu.registers.interrupt_pending());

        clock.advance(Duration::from_millis(1001));
        cpu.cycle().unwrap();
        assert!(cpu.registers.interrupt_pending());
        assert_eq!(cpu.interrupts_serviced(), 0);
        assert_eq!(output.contents(), "");
    }

    #[test]
    fn interrupt_preserves_registers_and_pc() {
        let (cpu, output, _) = cpu_with_program(&interrupt_program());
        let mut cpu = with_vector(cpu);
        for value in 0..6u8 {
            cpu.registers.set(value, value * 11).unwrap();
        }
        cpu.pc = 2;
        cpu.fl = FLAG_LESS;
        let before = cpu.registers.clone();

        cpu.registers.set_interrupt_status(true);
        cpu.service_interrupt().unwrap();

        assert_eq!(output.contents(), "!");
        assert_eq!(cpu.registers, before);
        assert!(!cpu.registers.interrupt_pending());
        assert_eq!(cpu.pc, 2);
        assert_eq!(cpu.fl, FLAG_LESS);
        assert_eq!(cpu.state(), State::Running);
    }

    #[test]
    fn one_dispatch_per_elapsed_interval() {
        let (cpu, output, clock) = cpu_with_program(&interrupt_program());
        let mut cpu = with_vector(cpu);

        clock.advance(Duration::from_secs(5));
        cpu.cycle().unwrap();
        for _ in 0..20 {
            cpu.cycle().unwrap();
        }
        assert_eq!(cpu.interrupts_serviced(), 1);
        assert_eq!(output.contents(), "!");

        clock.advance(Duration::from_millis(1500));
        for _ in 0..20 {
            cpu.cycle().unwrap();
        }
        assert_eq!(cpu.interrupts_serviced(), 2);
        assert_eq!(output.contents(), "!!");
        assert_eq!(cpu.registers.sp(), STACK_TOP);
    }

    #[test]
    fn halt_inside_interrupt_handler_stops_the_cpu() {
        let mut program = vec![INC, 5, JMP, 4];
        pad_to(&mut program, 0x20);
        program.push(HLT);
        let (cpu, _, _) = cpu_with_program(&program);
        let mut cpu = with_vector(cpu);

        cpu.registers.set_interrupt_status(true);
        cpu.cycle().unwrap();
        assert_eq!(cpu.state(), State::Halted);
        assert_eq!(cpu.pc, 0x20);
    }

    #[test]
    fn fault_inside_interrupt_handler_leaves_servicing_state() {
        let mut program = vec![INC, 5, JMP, 4];
        pad_to(&mut program, 0x20);
        program.push(0xFF);
        let (cpu, _, _) = cpu_with_program(&program);
        let mut cpu = with_vector(cpu);

        cpu.registers.set_interrupt_status(true);
        assert_eq!(cpu.cycle(), Err(CpuError::IllegalInstruction { opcode: 0xFF, pc: 0x20 }));
        assert_eq!(cpu.ir, 0xFF);
        assert_eq!(cpu.state(), State::Running);
    }

    #[test]
    fn saving_state_for_an_interrupt_can_overflow_the_stack() {
        // Only four bytes of stack lie between the end of the image and 0xF4.
        let mut program = vec![INC, 5, JMP, 4];
        pad_to(&mut program, 0x20);
        program.extend_from_slice(&[LDI, 0, b'!', PRA, 0, IRET]);
        pad_to(&mut program, STACK_TOP as usize - 4);
        let (cpu, output, _) = cpu_with_program(&program);
        let mut cpu = with_vector(cpu);

        cpu.registers.set_interrupt_status(true);
        assert_eq!(cpu.cycle(), Err(CpuError::StackOverflow { sp: STACK_TOP - 4 }));
        assert_eq!(cpu.registers.sp(), STACK_TOP - 4);
        assert_eq!(cpu.pc, 0);
        assert_eq!(output.contents(), "");
        assert_eq!(cpu.state(), State::Running);
    }

    #[test]
    fn disabled_timer_never_interrupts() {
        let mut options = test_options();
        options.timer_enabled = false;
        let (mut cpu, _, clock) = cpu_with_options(&interrupt_program(), options);

        clock.advance(Duration::from_secs(10));
        for _ in 0..10 {
            cpu.cycle().unwrap();
        }
        assert!(!cpu.registers.interrupt_pending());
        assert_eq!(cpu.interrupts_serviced(), 0);
    }

    #[test]
    fn trace_line_layout() {
        let (mut cpu, _, _) = cpu_with_program(&[LDI, 0, 8, HLT]);
        cpu.step().unwrap();
        assert_eq!(cpu.trace(), "TRACE: 03 | 00 01 00 00 | 08 00 00 00 00 00 00 F4");
    }

    #[test]
    fn crash_state_lists_registers() {
        let (cpu, _, _) = cpu_with_program(&[HLT]);
        let dump = format!("{}", cpu);
        assert!(dump.contains("Program Counter:      0x00"));
        assert!(dump.contains("R7:                   0xF4"));
    }
}
