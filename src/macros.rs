/// Packs a list of values: `pack!(sink, fmt, a, b, ...)`.
///
/// Each value goes through [`Arg::from`](crate::Arg), so scalars are passed by
/// value, strings as `&CStr`/`&CString` and arrays as slices.
#[macro_export]
macro_rules! pack {
    ($sink:expr, $fmt:expr $(, $arg:expr)* $(,)?) => {
        $crate::pack($sink, $fmt, &[$($crate::Arg::from($arg)),*])
    };
}

/// Unpacks into a list of slots: `unpack!(source, fmt, &mut a, &mut b, ...)`.
///
/// Each slot goes through [`Slot::from`](crate::Slot). The count of an `=`
/// directive is passed by value.
#[macro_export]
macro_rules! unpack {
    ($source:expr, $fmt:expr $(, $slot:expr)* $(,)?) => {
        $crate::unpack($source, $fmt, &mut [$($crate::Slot::from($slot)),*])
    };
}
