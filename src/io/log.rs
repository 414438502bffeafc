// Copyright 2016 Walter Kuppens.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use chrono::{DateTime, Local};
use crate::ls8::ls8::LS8RuntimeOptions;

/// Logs a message to stderr with a given prefix if the emulator was started
/// with the verbose flag set. Stdout belongs to the running program.
pub fn log<P, T>(prefix: P, text: T, runtime_options: &LS8RuntimeOptions) where P: Into<String>, T: Into<String> {
    if runtime_options.verbose {
        eprintln!("{}", format_line(prefix, text));
    }
}

/// Logs an instruction trace line if tracing was requested on the
/// command-line. Tracing is independent of verbose mode.
pub fn trace<T>(text: T, runtime_options: &LS8RuntimeOptions) where T: Into<String> {
    if runtime_options.trace {
        eprintln!("{}", format_line("trace", text));
    }
}

fn format_line<P, T>(prefix: P, text: T) -> String where P: Into<String>, T: Into<String> {
    let local: DateTime<Local> = Local::now();
    format!("[{}] -- [{}] {}", local, prefix.into(), text.into())
}
