// Copyright 2016 Walter Kuppens.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

// Exit codes used throughout the application. These exit codes has specific
// meanings and are used when no OS error codes are available.
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILURE: i32 = 1; // Generic error, including bad usage.
pub const EXIT_INVALID_PROGRAM: i32 = 2; // Unreadable or malformed program.
pub const EXIT_ILLEGAL_INSTRUCTION: i32 = 3;
pub const EXIT_ADDRESS_OUT_OF_RANGE: i32 = 4;
pub const EXIT_STACK_FAULT: i32 = 5;
pub const EXIT_UNSUPPORTED_OPERATION: i32 = 6;
