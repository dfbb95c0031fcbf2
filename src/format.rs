//! Format string parsing.
//!
//! A format is a sequence of directives, one per scalar code or `s`, plus the
//! three-character array forms `=<T><E>` (explicit count) and `*<T><E>`
//! (discovered count).

use std::fmt;
use std::str::FromStr;

use crate::types::Code;
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive {
    /// A fixed-width scalar, transferred through a pointer binding.
    Scalar(Code),
    /// A NUL-terminated string with a size-width length prefix.
    Str,
    /// `=`: the count is passed by value on both sides and never written back.
    Explicit { count: Code, elem: Code },
    /// `*`: the count is passed through a pointer, written back on unpack.
    Discovered { count: Code, elem: Code },
}

impl Directive {
    /// Number of arguments the directive consumes.
    pub fn arity(&self) -> usize {
        match self {
            Directive::Scalar(_) | Directive::Str => 1,
            Directive::Explicit { .. } | Directive::Discovered { .. } => 2,
        }
    }

    pub fn as_char(&self) -> char {
        match self {
            Directive::Scalar(code) => code.as_char(),
            Directive::Str => 's',
            Directive::Explicit { .. } => '=',
            Directive::Discovered { .. } => '*',
        }
    }
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Directive::Scalar(code) => write!(f, "{}", code.as_char()),
            Directive::Str => write!(f, "s"),
            Directive::Explicit { count, elem } => {
                write!(f, "={}{}", count.as_char(), elem.as_char())
            }
            Directive::Discovered { count, elem } => {
                write!(f, "*{}{}", count.as_char(), elem.as_char())
            }
        }
    }
}

/// A parsed format string, reusable across calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Format {
    directives: Vec<Directive>,
}

impl Format {
    pub fn parse(fmt: &str) -> Result<Self> {
        let bytes = fmt.as_bytes();
        let mut directives = Vec::new();
        let mut pos = 0;

        while pos < bytes.len() {
            let directive = match bytes[pos] {
                b'=' | b'*' => {
                    let count = array_code(fmt, pos + 1, Code::is_integer)?;
                    let elem = array_code(fmt, pos + 2, Code::is_element)?;
                    let directive = if bytes[pos] == b'=' {
                        Directive::Explicit { count, elem }
                    } else {
                        Directive::Discovered { count, elem }
                    };
                    pos += 2;
                    directive
                }

                b => match Code::from_byte(b) {
                    Some(Code::Str) => Directive::Str,
                    Some(code) => Directive::Scalar(code),
                    None => return Err(format_error(fmt, pos)),
                },
            };

            directives.push(directive);
            pos += 1;
        }

        Ok(Format { directives })
    }

    pub fn directives(&self) -> &[Directive] {
        &self.directives
    }

    /// Total number of arguments the format consumes.
    pub fn arity(&self) -> usize {
        self.directives.iter().map(Directive::arity).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.directives.is_empty()
    }
}

impl FromStr for Format {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Format::parse(s)
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for d in &self.directives {
            write!(f, "{}", d)?;
        }
        Ok(())
    }
}

fn array_code(fmt: &str, pos: usize, accept: fn(Code) -> bool) -> Result<Code> {
    match fmt.as_bytes().get(pos).copied().and_then(Code::from_byte) {
        Some(code) if accept(code) => Ok(code),
        _ => Err(format_error(fmt, pos)),
    }
}

fn format_error(fmt: &str, pos: usize) -> Error {
    Error::Format {
        pos,
        found: fmt.get(pos..).and_then(|rest| rest.chars().next()),
    }
}
