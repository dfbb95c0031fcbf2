//! Format-driven binary packing, in the spirit of `printf` but for raw bytes.
//!
//! A format string such as `"is*iC"` describes a sequence of values:
//!
//! | directive | wire layout |
//! |---|---|
//! | `c C h H i I l L q Q z Z f d` | the scalar's native bytes |
//! | `s` | `usize` length (terminator included), then the NUL-terminated bytes |
//! | `=TE` | `usize` count, then `count` elements of type `E`; the count is passed by value |
//! | `*TE` | same layout; on unpack the discovered count is written back through a `T` slot |
//!
//! Widths and byte order are those of the host. A stream is only portable
//! between hosts with identical layouts.
//!
//! ```no_run
//! use std::ffi::{c_int, CString};
//! use std::io::Cursor;
//!
//! let name = CString::new("hello").unwrap();
//! let mut wire = Vec::new();
//! fmtpack::pack!(&mut wire, "is", 42 as c_int, &name).unwrap();
//!
//! let (mut n, mut s): (c_int, CString) = Default::default();
//! fmtpack::unpack!(&mut Cursor::new(wire), "is", &mut n, &mut s).unwrap();
//! assert_eq!(n, 42);
//! ```

mod arg;
mod codec;
mod error;
mod format;
mod io;
mod native;
pub mod types;

mod macros;

use std::io::{Read, Write};

pub use arg::{Arg, Slot};
pub use codec::{Codec, DEFAULT_ALLOC_LIMIT};
pub use error::*;
pub use format::{Directive, Format};
#[cfg(unix)]
pub use io::Fd;
pub use io::Transfer;
pub use native::{Elems, ElemsMut, Native, Scalar, ScalarMut, MAX_WIDTH};

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Packs `args` into `sink` with the default [`Codec`].
pub fn pack<W: Write + ?Sized>(sink: &mut W, fmt: &str, args: &[Arg<'_>]) -> Result<usize> {
    Codec::default().pack(sink, fmt, args)
}

/// Unpacks from `source` into `slots` with the default [`Codec`].
pub fn unpack<R: Read + ?Sized>(
    source: &mut R,
    fmt: &str,
    slots: &mut [Slot<'_>],
) -> Result<usize> {
    Codec::default().unpack(source, fmt, slots)
}

/// Byte count on success, [`Error::SENTINEL`] on failure.
pub fn status(res: &Result<usize>) -> isize {
    match res {
        Ok(n) => *n as isize,
        Err(_) => Error::SENTINEL,
    }
}
