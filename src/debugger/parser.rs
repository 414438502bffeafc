// Copyright 2016 Walter Kuppens.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

enum ParseState {
    ScanningForArguments,
    ScanningArgument,
    ScanningQuotedArgument,
}

/// Returns true if the character passed is a whitespace character. Both spaces
/// and tabs are considered whitespace characters.
fn is_whitespace(c: char) -> bool {
    c == ' ' || c == '\t'
}

/// Returns true if the character passed is a quote.
fn is_quote(c: char) -> bool {
    c == '"'
}

fn is_escape(c: char) -> bool {
    c == '\\'
}

/// Parses raw command-line input into a list of separate arguments. Arguments
/// are separated by whitespace, can be quoted, and can have escaped characters
/// inside of them.
pub fn input_to_arguments(input: &str) -> Result<Vec<String>, &'static str> {
    let mut state = ParseState::ScanningForArguments;
    let mut args: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut chars = input.trim_end_matches(|c: char| c == '\n' || c == '\r').chars();

    while let Some(c) = chars.next() {
        // An escaped character is always taken literally, whatever state the
        // scanner is in.
        let (c, escaped) = if is_escape(c) {
            match chars.next() {
                Some(next) => (next, true),
                None => return Err("trailing escape character"),
            }
        } else {
            (c, false)
        };

        match state {
            ParseState::ScanningForArguments => {
                if escaped {
                    current.push(c);
                    state = ParseState::ScanningArgument;
                } else if is_quote(c) {
                    state = ParseState::ScanningQuotedArgument;
                } else if !is_whitespace(c) {
                    current.push(c);
                    state = ParseState::ScanningArgument;
                }
            },
            ParseState::ScanningArgument => {
                if !escaped && is_whitespace(c) {
                    args.push(current.clone());
                    current.clear();
                    state = ParseState::ScanningForArguments;
                } else {
                    current.push(c);
                }
            },
            ParseState::ScanningQuotedArgument => {
                if !escaped && is_quote(c) {
                    args.push(current.clone());
                    current.clear();
                    state = ParseState::ScanningForArguments;
                } else {
                    current.push(c);
                }
            },
        }
    }

    match state {
        ParseState::ScanningForArguments => {},
        ParseState::ScanningArgument => args.push(current),
        ParseState::ScanningQuotedArgument => return Err("quoted arg does not close"),
    }

    Ok(args)
}

/// Parses a number given to a debugger command. Accepts hexadecimal ("0x"),
/// binary ("0b") and decimal notation.
pub fn parse_number(arg: &str) -> Result<u8, String> {
    let lower = arg.to_lowercase();
    let parsed = if lower.starts_with("0x") {
        u8::from_str_radix(&lower[2..], 16)
    } else if lower.starts_with("0b") {
        u8::from_str_radix(&lower[2..], 2)
    } else {
        lower.parse::<u8>()
    };

    parsed.map_err(|_| format!("'{}' is not a number between 0 and 255", arg))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(input: &str) -> Vec<String> {
        input_to_arguments(input).unwrap()
    }

    #[test]
    fn splits_on_whitespace() {
        assert_eq!(args("dump  0x10\t8"), vec!["dump", "0x10", "8"]);
        assert_eq!(args("   step   "), vec!["step"]);
        assert!(args("").is_empty());
    }

    #[test]
    fn quoted_arguments_keep_whitespace() {
        assert_eq!(args("break \"a b\" c"), vec!["break", "a b", "c"]);
        assert_eq!(args("\"\""), vec![""]);
    }

    #[test]
    fn escapes_are_literal() {
        assert_eq!(args("a\\ b"), vec!["a b"]);
        assert_eq!(args("\"say \\\"hi\\\"\""), vec!["say \"hi\""]);
    }

    #[test]
    fn unterminated_quote_is_an_error() {
        assert_eq!(input_to_arguments("dump \"0x10"), Err("quoted arg does not close"));
        assert_eq!(input_to_arguments("dump \\"), Err("trailing escape character"));
    }

    #[test]
    fn strips_line_endings() {
        assert_eq!(args("regs\r\n"), vec!["regs"]);
    }

    #[test]
    fn numbers_in_several_bases() {
        assert_eq!(parse_number("0xF8"), Ok(0xF8));
        assert_eq!(parse_number("0b101"), Ok(5));
        assert_eq!(parse_number("42"), Ok(42));
        assert!(parse_number("256").is_err());
        assert!(parse_number("0xZZ").is_err());
    }
}
