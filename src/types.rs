//! Type codes and their native widths.

use std::ffi::{c_char, c_int, c_long, c_longlong, c_short};
use std::mem::size_of;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Signed,
    Unsigned,
    Float,
    /// NUL-terminated byte string.
    Bytes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Code {
    Char,
    UChar,
    Short,
    UShort,
    Int,
    UInt,
    Long,
    ULong,
    LongLong,
    ULongLong,
    Size,
    SSize,
    Float,
    Double,
    Str,
}

// c_char is i8 on some targets and u8 on others.
const CHAR_KIND: Kind = if c_char::MIN == 0 {
    Kind::Unsigned
} else {
    Kind::Signed
};

impl Code {
    pub fn from_byte(b: u8) -> Option<Self> {
        Some(match b {
            b'c' => Code::Char,
            b'C' => Code::UChar,
            b'h' => Code::Short,
            b'H' => Code::UShort,
            b'i' => Code::Int,
            b'I' => Code::UInt,
            b'l' => Code::Long,
            b'L' => Code::ULong,
            b'q' => Code::LongLong,
            b'Q' => Code::ULongLong,
            b'z' => Code::Size,
            b'Z' => Code::SSize,
            b'f' => Code::Float,
            b'd' => Code::Double,
            b's' => Code::Str,
            _ => return None,
        })
    }

    pub fn as_char(self) -> char {
        match self {
            Code::Char => 'c',
            Code::UChar => 'C',
            Code::Short => 'h',
            Code::UShort => 'H',
            Code::Int => 'i',
            Code::UInt => 'I',
            Code::Long => 'l',
            Code::ULong => 'L',
            Code::LongLong => 'q',
            Code::ULongLong => 'Q',
            Code::Size => 'z',
            Code::SSize => 'Z',
            Code::Float => 'f',
            Code::Double => 'd',
            Code::Str => 's',
        }
    }

    /// Exact native width, used by pointer and array bindings.
    ///
    /// `s` reports the width of its underlying `char` storage.
    pub const fn width(self) -> usize {
        match self {
            Code::Char | Code::UChar | Code::Str => size_of::<c_char>(),
            Code::Short | Code::UShort => size_of::<c_short>(),
            Code::Int | Code::UInt => size_of::<c_int>(),
            Code::Long | Code::ULong => size_of::<c_long>(),
            Code::LongLong | Code::ULongLong => size_of::<c_longlong>(),
            Code::Size | Code::SSize => size_of::<usize>(),
            Code::Float => size_of::<f32>(),
            Code::Double => size_of::<f64>(),
        }
    }

    /// Width of a value passed by value: the narrow codes are promoted to `int`.
    pub const fn promoted_width(self) -> usize {
        match self {
            Code::Char | Code::UChar | Code::Short | Code::UShort => size_of::<c_int>(),
            other => other.width(),
        }
    }

    pub const fn kind(self) -> Kind {
        match self {
            Code::Char => CHAR_KIND,
            Code::Short | Code::Int | Code::Long | Code::LongLong | Code::SSize => Kind::Signed,
            Code::UChar
            | Code::UShort
            | Code::UInt
            | Code::ULong
            | Code::ULongLong
            | Code::Size => Kind::Unsigned,
            Code::Float | Code::Double => Kind::Float,
            Code::Str => Kind::Bytes,
        }
    }

    /// Kind of a value passed by value. Promotion turns every narrow code into a signed `int`.
    pub const fn promoted_kind(self) -> Kind {
        match self {
            Code::Char | Code::UChar | Code::Short | Code::UShort => Kind::Signed,
            other => other.kind(),
        }
    }

    /// Integer codes, the only ones usable as a count.
    pub const fn is_integer(self) -> bool {
        matches!(self.kind(), Kind::Signed | Kind::Unsigned)
    }

    /// Codes usable as an array element: every integer code, and `s` as `char` storage.
    pub const fn is_element(self) -> bool {
        self.is_integer() || matches!(self, Code::Str)
    }

    /// The code an element of this type is stored as.
    pub const fn element(self) -> Code {
        match self {
            Code::Str => Code::Char,
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_letter_resolves() {
        for b in "cChHiIlLqQzZfds".bytes() {
            let code = Code::from_byte(b).expect("known code");
            assert_eq!(code.as_char() as u8, b);
        }

        for b in "xX=*% 0".bytes() {
            assert!(Code::from_byte(b).is_none());
        }
    }

    #[test]
    fn narrow_codes_promote_to_int() {
        for code in [Code::Char, Code::UChar, Code::Short, Code::UShort] {
            assert_eq!(code.promoted_width(), size_of::<c_int>());
            assert_eq!(code.promoted_kind(), Kind::Signed);
            assert!(code.width() <= size_of::<c_int>());
        }

        assert_eq!(Code::Char.width(), 1);
        assert_eq!(Code::Short.width(), size_of::<c_short>());
        assert_eq!(Code::Long.promoted_width(), size_of::<c_long>());
        assert_eq!(Code::Size.promoted_width(), size_of::<usize>());
    }

    #[test]
    fn element_codes() {
        assert!(!Code::Float.is_element());
        assert!(!Code::Double.is_element());
        assert!(Code::Str.is_element());
        assert!(!Code::Str.is_integer());
        assert_eq!(Code::Str.element(), Code::Char);
        assert_eq!(Code::Int.element(), Code::Int);
    }
}
