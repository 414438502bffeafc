// Copyright 2016 Walter Kuppens.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;
use thiserror::Error;

// Marks the rest of a line in a program listing as a comment.
const COMMENT_MARKER: char = '#';

/// Errors that can occur while turning a program file into a memory image.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("unable to read program: {0}")]
    Io(#[from] io::Error),

    #[error("line {line}: '{text}' is not an 8-bit binary number")]
    InvalidLine { line: usize, text: String },
}

/// Reads a binary file at a given path and stores it in a vector of bytes.
pub fn read_bin<P: AsRef<Path>>(path: P) -> Result<Vec<u8>, LoadError> {
    let mut buffer: Vec<u8> = Vec::new();
    let mut file = File::open(path)?;
    file.read_to_end(&mut buffer)?;
    Ok(buffer)
}

/// Reads a program listing at a given path. See `parse_program` for the
/// accepted format.
pub fn read_program<P: AsRef<Path>>(path: P) -> Result<Vec<u8>, LoadError> {
    let file = File::open(path)?;
    parse_program(BufReader::new(file))
}

/// Parses a program listing into raw instruction bytes.
///
/// Each non-blank line holds one byte written in binary as its first token.
/// Everything after that token is ignored, and a '#' begins a comment that
/// runs to the end of the line, so both of these are valid:
///
/// ```text
/// # Load 8 into R0
/// 10000010 # LDI R0,8
/// ```
pub fn parse_program<R: BufRead>(reader: R) -> Result<Vec<u8>, LoadError> {
    let mut program: Vec<u8> = Vec::new();

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let code = match line.find(COMMENT_MARKER) {
            Some(start) => &line[..start],
            None => &line[..],
        };

        let token = match code.split_whitespace().next() {
            Some(token) => token,
            None => continue, // Blank or comment-only line.
        };

        match u8::from_str_radix(token, 2) {
            Ok(byte) => program.push(byte),
            Err(_) => {
                return Err(LoadError::InvalidLine {
                    line: index + 1,
                    text: token.to_string(),
                });
            },
        }
    }

    Ok(program)
}
