use std::borrow::Cow;
use std::fmt;

#[derive(Debug)]
pub enum Error {
    IO(std::io::Error),
    ShortTransfer {
        want: usize,
        got: usize,
    },
    Format {
        pos: usize,
        found: Option<char>,
    },
    Arity {
        want: usize,
        got: usize,
    },
    Mismatch {
        index: usize,
        directive: char,
        msg: Cow<'static, str>,
    },
    Alloc {
        want: Option<usize>,
        limit: usize,
    },
    InvalidData(Cow<'static, str>),
}

impl Error {
    /// The byte-count sentinel reported for any failed call.
    pub const SENTINEL: isize = -1;
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::IO(e)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::IO(e) => write!(f, "io: {}", e),
            Error::ShortTransfer { want, got } => {
                write!(f, "short transfer: want {} bytes, got {}", want, got)
            }
            Error::Format {
                pos,
                found: Some(c),
            } => write!(f, "unknown format {:?} at {}", c, pos),
            Error::Format { pos, found: None } => {
                write!(f, "unexpected end of format at {}", pos)
            }
            Error::Arity { want, got } => {
                write!(f, "format wants {} arguments, got {}", want, got)
            }
            Error::Mismatch {
                index,
                directive,
                msg,
            } => write!(f, "argument #{} for '{}': {}", index, directive, msg),
            Error::Alloc {
                want: Some(want),
                limit,
            } => write!(f, "allocation of {} bytes exceeds limit {}", want, limit),
            Error::Alloc { want: None, limit } => {
                write!(f, "allocation size overflows (limit {})", limit)
            }
            Error::InvalidData(msg) => write!(f, "invalid data: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::IO(e) => Some(e),
            _ => None,
        }
    }
}
