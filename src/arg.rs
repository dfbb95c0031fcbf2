//! Argument binding.
//!
//! Each directive consumes one argument, or two for array directives. An
//! argument binds in one of three modes:
//!
//! - value: an immediate scalar at its promoted width (`c`, `C`, `h` and `H`
//!   are received as `int`),
//! - pointer: a scalar at its exact native width,
//! - array: a buffer of elements at their exact native width.
//!
//! Binding never touches the wire; it only checks each argument against its
//! directive and hands the interpreter a descriptor to transfer.

use std::borrow::Cow;
use std::ffi::{CStr, CString};

use crate::format::Directive;
use crate::native::{Elems, ElemsMut, Scalar, ScalarMut};
use crate::types::{Code, Kind};
use crate::{Error, Result};

/// An argument to pack.
#[derive(Debug, Clone, Copy)]
pub enum Arg<'a> {
    Scalar(Scalar),
    Str(&'a CStr),
    Elems(Elems<'a>),
}

/// An output slot to unpack into.
#[derive(Debug)]
pub enum Slot<'a> {
    /// Immediate count of an `=` directive. Read for validation only.
    Value(Scalar),
    Scalar(ScalarMut<'a>),
    /// Receives the string read off the wire. The payload must be exactly one
    /// NUL-terminated run: an interior NUL fails the directive and leaves the
    /// slot untouched.
    Str(&'a mut CString),
    Elems(ElemsMut<'a>),
}

macro_rules! impl_arg_from {
    ($($t:ty,)+) => {
        $(
        impl<'a> From<$t> for Arg<'a> {
            fn from(v: $t) -> Self {
                Arg::Scalar(v.into())
            }
        }

        impl<'a> From<$t> for Slot<'a> {
            fn from(v: $t) -> Self {
                Slot::Value(v.into())
            }
        }

        impl<'a> From<&'a mut $t> for Slot<'a> {
            fn from(p: &'a mut $t) -> Self {
                Slot::Scalar(p.into())
            }
        }
         )+
    };
}

macro_rules! impl_arg_from_elems {
    ($($t:ty,)+) => {
        $(
        impl<'a> From<&'a [$t]> for Arg<'a> {
            fn from(s: &'a [$t]) -> Self {
                Arg::Elems(s.into())
            }
        }

        impl<'a> From<&'a Vec<$t>> for Arg<'a> {
            fn from(s: &'a Vec<$t>) -> Self {
                Arg::Elems(s.into())
            }
        }

        impl<'a, const N: usize> From<&'a [$t; N]> for Arg<'a> {
            fn from(s: &'a [$t; N]) -> Self {
                Arg::Elems(s.into())
            }
        }

        impl<'a> From<&'a mut Vec<$t>> for Slot<'a> {
            fn from(v: &'a mut Vec<$t>) -> Self {
                Slot::Elems(v.into())
            }
        }
         )+
    };
}

impl_arg_from!(i8, u8, i16, u16, i32, u32, i64, u64, isize, usize, f32, f64,);
impl_arg_from_elems!(i8, u8, i16, u16, i32, u32, i64, u64, isize, usize,);

impl<'a> From<&'a CStr> for Arg<'a> {
    fn from(s: &'a CStr) -> Self {
        Arg::Str(s)
    }
}

impl<'a> From<&'a CString> for Arg<'a> {
    fn from(s: &'a CString) -> Self {
        Arg::Str(s.as_c_str())
    }
}

impl<'a> From<&'a mut CString> for Slot<'a> {
    fn from(s: &'a mut CString) -> Self {
        Slot::Str(s)
    }
}

/// Pack-side descriptor for one directive.
#[derive(Debug)]
pub(crate) enum Bound<'a> {
    Scalar(Scalar),
    Str(&'a CStr),
    Array { count: usize, elems: Elems<'a> },
}

/// Unpack-side descriptor for one directive.
#[derive(Debug)]
pub(crate) enum BoundMut<'s, 'a> {
    Scalar(&'s mut ScalarMut<'a>),
    Str(&'s mut CString),
    Array {
        /// Present for `*`, where the discovered count is written back.
        count: Option<&'s mut ScalarMut<'a>>,
        elems: &'s mut ElemsMut<'a>,
    },
}

struct Cursor {
    index: usize,
    directive: char,
}

impl Cursor {
    fn mismatch(&self, msg: impl Into<Cow<'static, str>>) -> Error {
        Error::Mismatch {
            index: self.index,
            directive: self.directive,
            msg: msg.into(),
        }
    }

    fn check(&self, code: Code, want: (Kind, usize), got: (Kind, usize)) -> Result<()> {
        if want == got {
            return Ok(());
        }

        Err(self.mismatch(format!(
            "'{}' wants {:?} of {} bytes, got {:?} of {} bytes",
            code.as_char(),
            want.0,
            want.1,
            got.0,
            got.1
        )))
    }

    fn next(&mut self) {
        self.index += 1;
    }
}

fn check_arity(directives: &[Directive], got: usize) -> Result<()> {
    let want = directives.iter().map(Directive::arity).sum();
    if want != got {
        return Err(Error::Arity { want, got });
    }
    Ok(())
}

fn value_shape(code: Code) -> (Kind, usize) {
    (code.promoted_kind(), code.promoted_width())
}

fn exact_shape(code: Code) -> (Kind, usize) {
    (code.kind(), code.width())
}

fn elem_shape(code: Code) -> (Kind, usize) {
    exact_shape(code.element())
}

fn bind_value(cur: &Cursor, code: Code, arg: &Arg<'_>) -> Result<Scalar> {
    match arg {
        Arg::Scalar(v) => {
            cur.check(code, value_shape(code), (v.kind(), v.width()))?;
            Ok(*v)
        }
        _ => Err(cur.mismatch("expected a scalar value")),
    }
}

fn bind_ptr(cur: &Cursor, code: Code, arg: &Arg<'_>) -> Result<Scalar> {
    match arg {
        Arg::Scalar(v) => {
            cur.check(code, exact_shape(code), (v.kind(), v.width()))?;
            Ok(*v)
        }
        _ => Err(cur.mismatch("expected a scalar")),
    }
}

fn bind_arr<'a>(cur: &Cursor, code: Code, arg: &Arg<'a>) -> Result<Elems<'a>> {
    match arg {
        Arg::Elems(e) => {
            cur.check(code, elem_shape(code), (e.kind(), e.width()))?;
            Ok(*e)
        }
        _ => Err(cur.mismatch("expected an element buffer")),
    }
}

fn count_of(cur: &Cursor, v: &Scalar, elems: &Elems<'_>) -> Result<usize> {
    let count = v
        .as_count()
        .ok_or_else(|| cur.mismatch("count must be a non-negative integer"))?;
    if count > elems.len() {
        return Err(cur.mismatch(format!(
            "count {} exceeds buffer of {} elements",
            count,
            elems.len()
        )));
    }
    Ok(count)
}

/// Binds pack arguments to `directives`, validating all of them up front.
pub(crate) fn bind_args<'a>(directives: &[Directive], args: &[Arg<'a>]) -> Result<Vec<Bound<'a>>> {
    check_arity(directives, args.len())?;

    let mut bound = Vec::with_capacity(directives.len());
    let mut cur = Cursor {
        index: 0,
        directive: ' ',
    };

    for d in directives {
        cur.directive = d.as_char();
        let b = match *d {
            Directive::Scalar(code) => Bound::Scalar(bind_ptr(&cur, code, &args[cur.index])?),

            Directive::Str => match args[cur.index] {
                Arg::Str(s) => Bound::Str(s),
                _ => return Err(cur.mismatch("expected a C string")),
            },

            Directive::Explicit { count, elem } | Directive::Discovered { count, elem } => {
                let v = if matches!(d, Directive::Explicit { .. }) {
                    bind_value(&cur, count, &args[cur.index])?
                } else {
                    bind_ptr(&cur, count, &args[cur.index])?
                };
                cur.next();
                let elems = bind_arr(&cur, elem, &args[cur.index])?;
                Bound::Array {
                    count: count_of(&cur, &v, &elems)?,
                    elems,
                }
            }
        };

        bound.push(b);
        cur.next();
    }

    Ok(bound)
}

/// Binds unpack slots to `directives`, validating all of them up front.
pub(crate) fn bind_slots<'s, 'a>(
    directives: &[Directive],
    slots: &'s mut [Slot<'a>],
) -> Result<Vec<BoundMut<'s, 'a>>> {
    check_arity(directives, slots.len())?;

    let mut bound = Vec::with_capacity(directives.len());
    let mut cur = Cursor {
        index: 0,
        directive: ' ',
    };
    let mut iter = slots.iter_mut();

    // arity was checked, the iterator yields one slot per consumed argument
    let mut take = || iter.next().ok_or(Error::Arity { want: 0, got: 0 });

    for d in directives {
        cur.directive = d.as_char();
        let b = match *d {
            Directive::Scalar(code) => match take()? {
                Slot::Scalar(p) => {
                    cur.check(code, exact_shape(code), (p.kind(), p.width()))?;
                    BoundMut::Scalar(p)
                }
                _ => return Err(cur.mismatch("expected a scalar slot")),
            },

            Directive::Str => match take()? {
                Slot::Str(s) => BoundMut::Str(s),
                _ => return Err(cur.mismatch("expected a C string slot")),
            },

            Directive::Explicit { count, elem } => {
                match take()? {
                    Slot::Value(v) => {
                        cur.check(count, value_shape(count), (v.kind(), v.width()))?
                    }
                    _ => return Err(cur.mismatch("expected a count value")),
                }
                cur.next();
                BoundMut::Array {
                    count: None,
                    elems: elems_slot(&cur, elem, take()?)?,
                }
            }

            Directive::Discovered { count, elem } => {
                let c = match take()? {
                    Slot::Scalar(p) => {
                        cur.check(count, exact_shape(count), (p.kind(), p.width()))?;
                        p
                    }
                    _ => return Err(cur.mismatch("expected a count slot")),
                };
                cur.next();
                BoundMut::Array {
                    count: Some(c),
                    elems: elems_slot(&cur, elem, take()?)?,
                }
            }
        };

        bound.push(b);
        cur.next();
    }

    Ok(bound)
}

fn elems_slot<'s, 'a>(
    cur: &Cursor,
    code: Code,
    slot: &'s mut Slot<'a>,
) -> Result<&'s mut ElemsMut<'a>> {
    match slot {
        Slot::Elems(e) => {
            cur.check(code, elem_shape(code), (e.kind(), e.width()))?;
            Ok(e)
        }
        _ => Err(cur.mismatch("expected an element buffer slot")),
    }
}
