// Copyright 2016 Walter Kuppens.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use crate::debugger::parser;
use crate::io::log;
use crate::ls8::error::CpuError;
use crate::ls8::ls8::LS8;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::collections::BTreeSet;
use std::io::{self, Write};
use thiserror::Error;

const PROMPT: &str = "(ls8) ";
const DEFAULT_DUMP_LEN: usize = 16;
const DUMP_ROW_LEN: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Step,
    Continue,
    Break,
    Regs,
    Dump,
    Help,
    Quit,
}

#[derive(Debug)]
struct CommandWithArguments {
    command: Command,
    args: Vec<String>,
}

/// Whether the prompt loop should keep going after a command.
#[derive(Debug, PartialEq, Eq)]
enum Prompt {
    Again,
    Exit,
}

#[derive(Error, Debug)]
pub enum DebuggerError {
    #[error(transparent)]
    Cpu(#[from] CpuError),

    #[error("line editor failure: {0}")]
    Readline(#[from] ReadlineError),

    #[error("unable to write debugger output: {0}")]
    Output(#[from] io::Error),
}

pub struct Debugger {
    breakpoints: BTreeSet<u8>,
}

impl Debugger {
    pub fn new() -> Self {
        Debugger {
            breakpoints: BTreeSet::new(),
        }
    }

    /// Reads commands from the terminal and applies them to the machine until
    /// the user quits or closes input. Errors raised by the CPU end the
    /// session the same way they end a normal run.
    pub fn run(&mut self, ls8: &mut LS8) -> Result<(), DebuggerError> {
        let mut editor = DefaultEditor::new()?;
        let stdout = io::stdout();
        let mut stderr = io::stderr();

        log::log("debugger", "Execution stopped at 0x00, type 'help' for commands", &ls8.runtime_options);
        loop {
            let input = match editor.readline(PROMPT) {
                Ok(input) => input,
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
                Err(e) => return Err(e.into()),
            };
            if input.trim().is_empty() {
                continue;
            }
            // History is a convenience; failing to record it is not fatal.
            let _ = editor.add_history_entry(input.as_str());

            match self.interpret(&input) {
                Ok(command) => {
                    if self.execute_command(command, ls8, &mut stdout.lock())? == Prompt::Exit {
                        break;
                    }
                },
                Err(e) => writeln!(stderr, "ls8-rs: {}", e)?,
            }
        }

        Ok(())
    }

    /// Parse a raw input string into a list of arguments and a command. This
    /// function also maps command names to their respective enums.
    fn interpret(&self, input: &str) -> Result<CommandWithArguments, String> {
        let args = parser::input_to_arguments(input)?;

        let command = {
            let raw_command = match args.first() {
                Some(raw_command) => raw_command,
                None => return Err(String::from("no command specified")),
            };

            // Map command strings to the command enum type.
            match raw_command.to_lowercase().as_str() {
                // Full commands.
                "step"     => Command::Step,
                "continue" => Command::Continue,
                "break"    => Command::Break,
                "regs"     => Command::Regs,
                "dump"     => Command::Dump,
                "help"     => Command::Help,
                "quit"     => Command::Quit,
                // Aliases.
                "s" => Command::Step,
                "c" => Command::Continue,
                "b" => Command::Break,
                "r" => Command::Regs,
                "d" => Command::Dump,
                "h" => Command::Help,
                "q" => Command::Quit,
                // Unknown command.
                _ => return Err(format!("unknown command '{}'", raw_command)),
            }
        };

        Ok(CommandWithArguments {
            command: command,
            args: args,
        })
    }

    /// Executes the correct debugger command based on the enum passed.
    fn execute_command(&mut self, command: CommandWithArguments, ls8: &mut LS8, out: &mut dyn Write) -> Result<Prompt, DebuggerError> {
        match command.command {
            Command::Step => self.execute_step(ls8, &command.args, out),
            Command::Continue => self.execute_continue(ls8, out),
            Command::Break => self.execute_break(&command.args, out),
            Command::Regs => self.execute_regs(ls8, out),
            Command::Dump => self.execute_dump(ls8, &command.args, out),
            Command::Help => self.execute_help(out),
            Command::Quit => Ok(Prompt::Exit),
        }
    }

    /// Executes a number of instructions (one by default) and shows where
    /// execution stopped.
    fn execute_step(&mut self, ls8: &mut LS8, args: &[String], out: &mut dyn Write) -> Result<Prompt, DebuggerError> {
        let count = match args.get(1) {
            Some(arg) => match arg.parse::<u32>() {
                Ok(count) => count,
                Err(_) => {
                    writeln!(out, "ls8-rs: '{}' is not a step count", arg)?;
                    return Ok(Prompt::Again);
                },
            },
            None => 1,
        };

        for _ in 0..count {
            if ls8.halted() {
                break;
            }
            ls8.step()?;
        }

        self.report_position(ls8, out)?;
        Ok(Prompt::Again)
    }

    /// Runs until the program halts or reaches a breakpoint. At least one
    /// instruction is executed so continuing from a breakpoint moves on.
    fn execute_continue(&mut self, ls8: &mut LS8, out: &mut dyn Write) -> Result<Prompt, DebuggerError> {
        log::log("debugger", "Starting execution now...", &ls8.runtime_options);
        while !ls8.halted() {
            ls8.step()?;
            if !ls8.halted() && self.breakpoints.contains(&ls8.cpu.pc) {
                writeln!(out, "Breakpoint hit at {:#04X}", ls8.cpu.pc)?;
                break;
            }
        }
        log::log("debugger", "Stopping execution now...", &ls8.runtime_options);

        self.report_position(ls8, out)?;
        Ok(Prompt::Again)
    }

    /// Toggles a breakpoint at the given address.
    fn execute_break(&mut self, args: &[String], out: &mut dyn Write) -> Result<Prompt, DebuggerError> {
        let addr = match args.get(1).map(|arg| parser::parse_number(arg)) {
            Some(Ok(addr)) => addr,
            Some(Err(e)) => {
                writeln!(out, "ls8-rs: {}", e)?;
                return Ok(Prompt::Again);
            },
            None => {
                for addr in self.breakpoints.iter() {
                    writeln!(out, "Breakpoint at {:#04X}", addr)?;
                }
                return Ok(Prompt::Again);
            },
        };

        if self.breakpoints.remove(&addr) {
            writeln!(out, "Breakpoint cleared at {:#04X}", addr)?;
        } else {
            self.breakpoints.insert(addr);
            writeln!(out, "Breakpoint set at {:#04X}", addr)?;
        }
        Ok(Prompt::Again)
    }

    fn execute_regs(&mut self, ls8: &mut LS8, out: &mut dyn Write) -> Result<Prompt, DebuggerError> {
        let cpu = &ls8.cpu;
        writeln!(out, "PC: {:#04X}  IR: {:#010b}  FL: {:#05b}  State: {:?}",
                 cpu.pc, cpu.ir, cpu.fl, cpu.state())?;
        for (index, value) in cpu.registers.as_slice().iter().enumerate() {
            writeln!(out, "R{}: {:#04X} ({})", index, value, value)?;
        }
        Ok(Prompt::Again)
    }

    /// Allows dumping memory starting at a specified memory address.
    fn execute_dump(&mut self, ls8: &mut LS8, args: &[String], out: &mut dyn Write) -> Result<Prompt, DebuggerError> {
        let addr = match args.get(1).map(|arg| parser::parse_number(arg)) {
            Some(Ok(addr)) => addr as usize,
            Some(Err(e)) => {
                writeln!(out, "ls8-rs: {}", e)?;
                return Ok(Prompt::Again);
            },
            None => {
                writeln!(out, "ls8-rs: dump needs an address")?;
                return Ok(Prompt::Again);
            },
        };
        let len = match args.get(2).map(|arg| parser::parse_number(arg)) {
            Some(Ok(len)) => len as usize,
            Some(Err(e)) => {
                writeln!(out, "ls8-rs: {}", e)?;
                return Ok(Prompt::Again);
            },
            None => DEFAULT_DUMP_LEN,
        };

        let bytes = ls8.cpu.memory.slice(addr, len);
        for (row, chunk) in bytes.chunks(DUMP_ROW_LEN).enumerate() {
            let hex: Vec<String> = chunk.iter().map(|b| format!("{:02X}", b)).collect();
            writeln!(out, "{:02X}: {}", addr + row * DUMP_ROW_LEN, hex.join(" "))?;
        }
        Ok(Prompt::Again)
    }

    fn execute_help(&mut self, out: &mut dyn Write) -> Result<Prompt, DebuggerError> {
        writeln!(out, "step [N]        (s) execute N instructions, default 1")?;
        writeln!(out, "continue        (c) run until halt or breakpoint")?;
        writeln!(out, "break [ADDR]    (b) toggle a breakpoint, or list them")?;
        writeln!(out, "regs            (r) show registers")?;
        writeln!(out, "dump ADDR [LEN] (d) show memory")?;
        writeln!(out, "quit            (q) leave the debugger")?;
        Ok(Prompt::Again)
    }

    fn report_position(&self, ls8: &LS8, out: &mut dyn Write) -> io::Result<()> {
        if ls8.halted() {
            writeln!(out, "Program halted at {:#04X}", ls8.cpu.pc)
        } else {
            writeln!(out, "{}", ls8.cpu.trace())
        }
    }
}

impl Default for Debugger {
    fn default() -> Self {
        Debugger::new()
    }
}
