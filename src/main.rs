// Copyright 2016 Walter Kuppens.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

#[macro_use]
extern crate enum_primitive;

mod debugger;
mod io;
mod ls8;
#[cfg(test)]
mod test_utils;

use crate::debugger::debugger::{Debugger, DebuggerError};
use crate::io::binutils::{self, LoadError};
use crate::io::errors::*;
use crate::io::log;
use crate::ls8::error::CpuError;
use crate::ls8::ls8::{LS8, LS8RuntimeOptions};
use getopts::{Matches, Options};
use std::env;
use std::time::Duration;

/// Everything the command-line asked for.
#[derive(Debug)]
struct Invocation {
    program_path: String,
    binary: bool,
    debug: bool,
    runtime_options: LS8RuntimeOptions,
}

fn build_options() -> Options {
    let mut opts = Options::new();
    opts.optflag("h", "help", "print this help menu");
    opts.optflag("v", "verbose", "log emulator activity to stderr");
    opts.optflag("t", "trace", "print a trace line before every instruction");
    opts.optflag("b", "binary", "load PROGRAM as a raw memory image");
    opts.optflag("d", "debug", "start in the interactive debugger");
    opts.optflag("", "no-interrupts", "disable the timer interrupt");
    opts.optopt("i", "interval", "milliseconds between timer interrupts (default 1000)", "MS");
    opts
}

fn print_usage(program: &str, opts: &Options) {
    let brief = format!("Usage: {} [options] PROGRAM", program);
    print!("{}", opts.usage(&brief));
}

/// Turns parsed command-line matches into an invocation. Returns an error
/// message when the arguments don't make sense together.
fn parse_invocation(matches: &Matches) -> Result<Invocation, String> {
    let program_path = match matches.free.len() {
        1 => matches.free[0].clone(),
        0 => return Err(String::from("no program specified")),
        _ => return Err(String::from("only one program may be run at a time")),
    };

    let mut runtime_options = LS8RuntimeOptions::default();
    runtime_options.verbose = matches.opt_present("v");
    runtime_options.trace = matches.opt_present("t");
    runtime_options.timer_enabled = !matches.opt_present("no-interrupts");

    if let Some(raw) = matches.opt_str("i") {
        match raw.parse::<u64>() {
            Ok(ms) if ms > 0 => runtime_options.timer_interval = Duration::from_millis(ms),
            _ => return Err(format!("invalid interval '{}'", raw)),
        }
    }

    Ok(Invocation {
        program_path: program_path,
        binary: matches.opt_present("b"),
        debug: matches.opt_present("d"),
        runtime_options: runtime_options,
    })
}

/// Reports a fatal CPU error along with the state the CPU crashed in and
/// returns the exit code for it.
fn report_cpu_error(e: &CpuError, ls8: &LS8) -> i32 {
    eprintln!("ls8-rs: {} (ir {:#010b}, pc {:#04X})", e, ls8.cpu.ir, ls8.cpu.pc);
    eprint!("{}", ls8.cpu);
    e.exit_code()
}

/// Initializes and starts the emulator. Returns an exit code after which the
/// program unwinds and stops executing. Once the emulator starts executing, the
/// application should only stop due to a HLT instruction or a fatal error.
fn init() -> i32 {
    let args: Vec<String> = env::args().collect();
    let program = args[0].clone();
    let opts = build_options();

    let matches = match opts.parse(&args[1..]) {
        Ok(m) => m,
        Err(f) => {
            eprintln!("ls8-rs: {}", f);
            return EXIT_FAILURE;
        },
    };

    if matches.opt_present("h") {
        print_usage(&program, &opts);
        return EXIT_SUCCESS;
    }

    let invocation = match parse_invocation(&matches) {
        Ok(invocation) => invocation,
        Err(e) => {
            eprintln!("ls8-rs: {}", e);
            print_usage(&program, &opts);
            return EXIT_FAILURE;
        },
    };
    let runtime_options = invocation.runtime_options.clone();

    // Read the program from disk.
    let loaded = if invocation.binary {
        binutils::read_bin(&invocation.program_path)
    } else {
        binutils::read_program(&invocation.program_path)
    };
    let image = match loaded {
        Ok(image) => image,
        Err(e) => {
            eprintln!("ls8-rs: {}: {}", invocation.program_path, e);
            return match e {
                LoadError::Io(_) | LoadError::InvalidLine { .. } => EXIT_INVALID_PROGRAM,
            };
        },
    };
    log::log("main", format!("Read {} bytes from {}", image.len(), invocation.program_path), &runtime_options);

    let mut ls8 = match LS8::new(&image, runtime_options) {
        Ok(ls8) => ls8,
        Err(e) => {
            eprintln!("ls8-rs: {}: {}", invocation.program_path, e);
            return e.exit_code();
        },
    };

    if invocation.debug {
        let mut debugger = Debugger::new();
        return match debugger.run(&mut ls8) {
            Ok(()) => EXIT_SUCCESS,
            Err(DebuggerError::Cpu(e)) => report_cpu_error(&e, &ls8),
            Err(e) => {
                eprintln!("ls8-rs: {}", e);
                EXIT_FAILURE
            },
        };
    }

    match ls8.run() {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => report_cpu_error(&e, &ls8),
    }
}

/// Entry point of the program and wrapper of init. Takes the exit code returned
/// from init and exits with it.
fn main() {
    let exit_code = init();
    std::process::exit(exit_code); // Unwinding done, safe to exit.
}
